//! Store behaviour over custom and file backends.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use cartsync_store::{FileBackend, ManualClock, StorageBackend, Store, StoreError};
use chrono::Duration;

/// A backend that can be switched into failing every call.
#[derive(Default)]
struct Flaky {
    entries: HashMap<String, String>,
    broken: Rc<Cell<bool>>,
}

impl Flaky {
    fn check(&self) -> Result<(), StoreError> {
        if self.broken.get() {
            return Err(StoreError::Backend("storage disabled".into()));
        }
        Ok(())
    }
}

impl StorageBackend for Flaky {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.check()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        Ok(self.entries.keys().cloned().collect())
    }
}

#[test]
fn test_failing_backend_degrades_to_absent() {
    let broken = Rc::new(Cell::new(false));
    let backend = Flaky {
        broken: Rc::clone(&broken),
        ..Flaky::default()
    };
    let store = Store::new(backend, ManualClock::default());

    assert!(store.set("finalPayable", &650_i64, None));
    broken.set(true);

    assert!(matches!(
        store.try_get::<i64>("finalPayable"),
        Err(StoreError::Backend(_))
    ));
    assert_eq!(store.get::<i64>("finalPayable"), None);
    assert!(!store.set("finalPayable", &700_i64, None));
    assert!(store.keys().is_empty());

    broken.set(false);
    assert_eq!(store.get::<i64>("finalPayable"), Some(650));
}

#[test]
fn test_shared_custom_backend() {
    let backend = Rc::new(RefCell::new(Flaky::default()));
    let clock = ManualClock::default();
    let tab_a = Store::shared(Rc::clone(&backend), Rc::new(clock.clone()));
    let tab_b = Store::shared(Rc::clone(&backend), Rc::new(clock.clone()));

    tab_a.set("orderId", &"ORD-1", Some(Duration::minutes(30)));
    assert_eq!(tab_b.get::<String>("orderId").as_deref(), Some("ORD-1"));

    clock.advance(Duration::minutes(30));
    assert!(!tab_b.contains("orderId"));
    assert!(backend.borrow().entries.is_empty());
}

#[test]
fn test_file_store_keeps_expiry_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");
    let clock = ManualClock::default();

    {
        let store = Store::new(FileBackend::open(&path).unwrap(), clock.clone());
        store.set("paymentAmount", &650_i64, Some(Duration::minutes(30)));
        store.set("cartItems", &vec!["a", "b"], None);
    }

    clock.advance(Duration::minutes(31));
    let store = Store::new(FileBackend::open(&path).unwrap(), clock.clone());
    assert_eq!(store.get::<i64>("paymentAmount"), None);
    assert_eq!(
        store.get::<Vec<String>>("cartItems"),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(store.keys(), vec!["cartItems".to_string()]);
}
