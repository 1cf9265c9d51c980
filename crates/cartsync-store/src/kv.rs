//! Typed, expiring key/value store with automatic serialization.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Clock, MemoryBackend, StorageBackend, StoreError, SystemClock};

/// The envelope every value is stored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry<T> {
    /// The stored value.
    pub value: T,
    /// When the value was written.
    pub written_at: DateTime<Utc>,
    /// When the value stops being visible, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<T> Entry<T> {
    /// Whether the entry is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Handle to a shared storage backend.
///
/// Clones share the same backend and clock, the way every component on a
/// page shares one `localStorage`. Writes are last-write-wins per key and
/// there are no cross-key transactions.
///
/// Two families of accessors exist:
/// - `set` / `get` / `remove` never fail. Errors are logged and reported as
///   `false` or `None`, and the caller keeps its in-memory default.
/// - `try_set` / `try_get` / `try_remove` return the [`StoreError`] for
///   callers that must tell "absent" from "unreadable".
///
/// # Example
///
/// ```
/// use cartsync_store::Store;
/// use chrono::Duration;
///
/// let store = Store::in_memory();
/// assert!(store.set("orderId", &"ORD-1".to_string(), Some(Duration::minutes(30))));
/// assert_eq!(store.get::<String>("orderId").as_deref(), Some("ORD-1"));
/// ```
#[derive(Clone)]
pub struct Store {
    backend: Rc<RefCell<dyn StorageBackend>>,
    clock: Rc<dyn Clock>,
    prefix: String,
}

impl Store {
    /// Create a store that owns `backend`.
    pub fn new(backend: impl StorageBackend + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            backend: Rc::new(RefCell::new(backend)),
            clock: Rc::new(clock),
            prefix: String::new(),
        }
    }

    /// Create a store over a backend the caller keeps a handle to.
    pub fn shared<B>(backend: Rc<RefCell<B>>, clock: Rc<dyn Clock>) -> Self
    where
        B: StorageBackend + 'static,
    {
        Self {
            backend,
            clock,
            prefix: String::new(),
        }
    }

    /// An empty in-memory store on the system clock.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new(), SystemClock)
    }

    /// Namespace every key with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The store's clock.
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    /// Write `value` under `key`, optionally expiring after `ttl`.
    pub fn try_set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let entry = Entry {
            value,
            written_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        let raw = serde_json::to_string(&entry)?;
        self.backend.borrow_mut().write(&self.full_key(key), raw)
    }

    /// Write `value` under `key`. Returns `false` (and logs) on failure.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match self.try_set(key, value, ttl) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "store write failed");
                false
            }
        }
    }

    /// Read the full entry under `key`.
    ///
    /// An expired entry is evicted and reported as absent.
    pub fn try_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Entry<T>>, StoreError> {
        let full_key = self.full_key(key);
        let raw = self.backend.borrow().read(&full_key)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let entry: Entry<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|_| StoreError::Corrupt(key.to_string()))?;

        if entry.is_expired_at(self.clock.now()) {
            debug!(key = %key, "evicting expired entry");
            self.backend.borrow_mut().delete(&full_key)?;
            return Ok(None);
        }

        let value = serde_json::from_value(entry.value)?;
        Ok(Some(Entry {
            value,
            written_at: entry.written_at,
            expires_at: entry.expires_at,
        }))
    }

    /// Read the value under `key`.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.try_entry(key)?.map(|entry| entry.value))
    }

    /// Read the value under `key`. Failures are logged and read as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed");
                None
            }
        }
    }

    /// Read the value under `key`, or `default` when absent or unreadable.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Whether a live entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.try_entry::<serde_json::Value>(key), Ok(Some(_)))
    }

    /// Delete `key`.
    pub fn try_remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.borrow_mut().delete(&self.full_key(key))
    }

    /// Delete `key`. Returns `false` (and logs) on failure.
    pub fn remove(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "store delete failed");
                false
            }
        }
    }

    /// Keys under this store's prefix, with the prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        match self.backend.borrow().keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!(error = %e, "store key listing failed");
                Vec::new()
            }
        }
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        for key in self.keys() {
            let full_key = self.full_key(&key);
            let raw = match self.backend.borrow().read(&full_key) {
                Ok(Some(raw)) => raw,
                _ => continue,
            };
            let expired = serde_json::from_str::<Entry<serde_json::Value>>(&raw)
                .map(|entry| entry.is_expired_at(now))
                .unwrap_or(false);
            if expired && self.backend.borrow_mut().delete(&full_key).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "purged expired entries");
        }
        removed
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("prefix", &self.prefix)
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

/// Helper to build namespaced store keys.
///
/// # Example
///
/// ```
/// let key = cartsync_store::store_key!("transactionRecord", "ORD-1");
/// assert_eq!(key, "transactionRecord:ORD-1");
/// ```
#[macro_export]
macro_rules! store_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn store_with_clock() -> (Store, ManualClock, Rc<RefCell<MemoryBackend>>) {
        let clock = ManualClock::default();
        let backend = Rc::new(RefCell::new(MemoryBackend::new()));
        let store = Store::shared(Rc::clone(&backend), Rc::new(clock.clone()));
        (store, clock, backend)
    }

    #[test]
    fn test_set_and_get() {
        let (store, _, _) = store_with_clock();
        assert!(store.set("count", &3_u32, None));
        assert_eq!(store.get::<u32>("count"), Some(3));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let (store, _, _) = store_with_clock();
        assert_eq!(store.get::<u32>("missing"), None);
        assert_eq!(store.get_or("missing", 7_u32), 7);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let (store, clock, backend) = store_with_clock();
        store.set("orderId", &"ORD-1", Some(Duration::minutes(10)));

        clock.advance(Duration::minutes(9));
        assert!(store.contains("orderId"));

        clock.advance(Duration::minutes(1));
        assert_eq!(store.get::<String>("orderId"), None);
        assert!(backend.borrow().is_empty());
    }

    #[test]
    fn test_entry_records_write_time() {
        let (store, clock, _) = store_with_clock();
        store.set("k", &1_u8, Some(Duration::seconds(5)));

        let entry = store.try_entry::<u8>("k").unwrap().unwrap();
        assert_eq!(entry.written_at, clock.now());
        assert_eq!(entry.expires_at, Some(clock.now() + Duration::seconds(5)));
    }

    #[test]
    fn test_quota_failure_reports_false() {
        let (store, _, backend) = store_with_clock();
        backend.borrow_mut().set_quota(Some(4));

        assert!(!store.set("cartItems", &vec![1, 2, 3], None));
        assert!(store.try_set("cartItems", &vec![1], None).is_err());
        assert_eq!(store.get::<Vec<u32>>("cartItems"), None);
    }

    #[test]
    fn test_corrupt_entry_reads_as_absent() {
        let (store, _, backend) = store_with_clock();
        backend.borrow_mut().insert_raw("finalPayable", "{oops");

        assert!(matches!(
            store.try_get::<i64>("finalPayable"),
            Err(StoreError::Corrupt(_))
        ));
        assert_eq!(store.get::<i64>("finalPayable"), None);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let (store, _, _) = store_with_clock();
        store.set("k", &"text", None);
        assert!(matches!(
            store.try_get::<u64>("k"),
            Err(StoreError::Serialize(_))
        ));
    }

    #[test]
    fn test_last_write_wins_across_handles() {
        let (store, _, _) = store_with_clock();
        let other_tab = store.clone();

        store.set("paymentAmount", &100_i64, None);
        other_tab.set("paymentAmount", &250_i64, None);
        assert_eq!(store.get::<i64>("paymentAmount"), Some(250));
    }

    #[test]
    fn test_prefix_namespaces_keys() {
        let (store, clock, backend) = store_with_clock();
        let prefixed = Store::shared(Rc::clone(&backend), Rc::new(clock)).with_prefix("shop.");

        prefixed.set("cartItems", &Vec::<u32>::new(), None);
        assert!(backend.borrow().read("shop.cartItems").unwrap().is_some());
        assert_eq!(prefixed.keys(), vec!["cartItems".to_string()]);
        assert!(!store.contains("cartItems"));
    }

    #[test]
    fn test_purge_expired() {
        let (store, clock, _) = store_with_clock();
        store.set("short", &1, Some(Duration::seconds(1)));
        store.set("long", &2, Some(Duration::hours(1)));
        store.set("forever", &3, None);

        clock.advance(Duration::minutes(1));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.keys().len(), 2);
    }

    #[test]
    fn test_remove() {
        let (store, _, _) = store_with_clock();
        store.set("k", &1, None);
        assert!(store.remove("k"));
        assert!(!store.contains("k"));
        // Removing again is not an error.
        assert!(store.remove("k"));
    }

    #[test]
    fn test_store_key_macro() {
        assert_eq!(store_key!("purchaseEventFired", "txn_1"), "purchaseEventFired:txn_1");
        assert_eq!(store_key!("a", 1, "b"), "a:1:b");
    }
}
