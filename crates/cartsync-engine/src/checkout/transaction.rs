//! Transaction identity and purchase event dedupe.
//!
//! An order gets exactly one transaction id no matter how many times its
//! confirmation is processed, and a transaction emits exactly one purchase
//! event. Both facts are persisted with a time-to-live and mirrored in
//! memory so they still hold when storage fails.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cartsync_store::Store;

use crate::checkout::{AnalyticsSink, PurchaseEvent};
use crate::ids::{OrderId, TransactionId};
use crate::keys;
use crate::money::Money;

/// What is remembered about a confirmed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub order_id: OrderId,
    pub payment_method: String,
    /// Amount reported with the purchase event.
    pub tracked_value: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FiredMarker {
    fired_at: DateTime<Utc>,
}

/// Hands out stable transaction ids and gates purchase events.
pub struct TransactionIdentityManager {
    store: Store,
    record_ttl: Duration,
    dedupe_ttl: Duration,
    sink: Box<dyn AnalyticsSink>,
    records: HashMap<OrderId, TransactionRecord>,
    fired: HashMap<TransactionId, DateTime<Utc>>,
}

impl TransactionIdentityManager {
    pub fn new(
        store: Store,
        record_ttl: Duration,
        dedupe_ttl: Duration,
        sink: impl AnalyticsSink + 'static,
    ) -> Self {
        Self {
            store,
            record_ttl,
            dedupe_ttl,
            sink: Box::new(sink),
            records: HashMap::new(),
            fired: HashMap::new(),
        }
    }

    /// The transaction id for `order_id`, created on first call.
    ///
    /// Later calls for the same order return the same id until the record
    /// expires, whatever `payment_method` and `amount` they pass.
    pub fn get_or_create_transaction_id(
        &mut self,
        order_id: &OrderId,
        payment_method: &str,
        amount: Money,
    ) -> TransactionId {
        if let Some(record) = self.record(order_id) {
            debug!(
                order_id = %order_id,
                transaction_id = %record.transaction_id,
                "reusing transaction id"
            );
            return record.transaction_id;
        }

        let record = TransactionRecord {
            transaction_id: TransactionId::for_order(order_id),
            order_id: order_id.clone(),
            payment_method: payment_method.to_string(),
            tracked_value: amount,
            created_at: self.store.now(),
        };
        self.store.set(
            &keys::transaction_record(order_id),
            &record,
            Some(self.record_ttl),
        );
        self.store.set(keys::ORDER_ID, order_id, Some(self.record_ttl));

        info!(
            order_id = %order_id,
            transaction_id = %record.transaction_id,
            payment_method,
            amount = %amount,
            "transaction created"
        );
        let id = record.transaction_id.clone();
        self.records.insert(order_id.clone(), record);
        id
    }

    /// The live record for `order_id`, if any.
    pub fn record(&mut self, order_id: &OrderId) -> Option<TransactionRecord> {
        let key = keys::transaction_record(order_id);
        match self.store.try_get::<TransactionRecord>(&key) {
            Ok(Some(record)) => {
                self.records.insert(order_id.clone(), record.clone());
                return Some(record);
            }
            Ok(None) => {}
            Err(e) => warn!(order_id = %order_id, error = %e, "transaction record unreadable"),
        }

        let now = self.store.now();
        let ttl = self.record_ttl;
        self.records.retain(|_, r| now < r.created_at + ttl);
        self.records.get(order_id).cloned()
    }

    /// The most recently confirmed order, if still remembered.
    pub fn last_order(&self) -> Option<OrderId> {
        self.store.get(keys::ORDER_ID)
    }

    /// Whether a purchase event already went out for `transaction_id`.
    pub fn has_fired(&mut self, transaction_id: &TransactionId) -> bool {
        let now = self.store.now();
        let ttl = self.dedupe_ttl;
        self.fired.retain(|_, fired_at| now < *fired_at + ttl);
        if self.fired.contains_key(transaction_id) {
            return true;
        }

        let key = keys::purchase_event_fired(transaction_id);
        match self.store.try_get::<FiredMarker>(&key) {
            Ok(Some(marker)) => {
                self.fired.insert(transaction_id.clone(), marker.fired_at);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "purchase marker unreadable");
                false
            }
        }
    }

    /// Emit `event` unless one already went out for `transaction_id`.
    ///
    /// Returns whether this call emitted. The event is sent with
    /// `transaction_id` whatever id it carried.
    pub fn mark_event_fired(
        &mut self,
        transaction_id: &TransactionId,
        mut event: PurchaseEvent,
    ) -> bool {
        if self.has_fired(transaction_id) {
            info!(transaction_id = %transaction_id, "purchase event already sent, skipping");
            return false;
        }

        let now = self.store.now();
        self.store.set(
            &keys::purchase_event_fired(transaction_id),
            &FiredMarker { fired_at: now },
            Some(self.dedupe_ttl),
        );
        self.fired.insert(transaction_id.clone(), now);

        if &event.transaction_id != transaction_id {
            warn!(
                expected = %transaction_id,
                found = %event.transaction_id,
                "purchase event carried a different transaction id"
            );
            event.transaction_id = transaction_id.clone();
        }
        self.sink.emit(&event);
        info!(transaction_id = %transaction_id, value = event.value, "purchase event sent");
        true
    }
}

impl std::fmt::Debug for TransactionIdentityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionIdentityManager")
            .field("record_ttl", &self.record_ttl)
            .field("dedupe_ttl", &self.dedupe_ttl)
            .field("records", &self.records.len())
            .field("fired", &self.fired.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::RecordingSink;
    use crate::money::Currency;
    use cartsync_store::{ManualClock, MemoryBackend};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn inr(major: i64) -> Money {
        Money::from_major(major, Currency::INR)
    }

    struct Fixture {
        store: Store,
        clock: ManualClock,
        backend: Rc<RefCell<MemoryBackend>>,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = ManualClock::default();
            let backend = Rc::new(RefCell::new(MemoryBackend::new()));
            let store = Store::shared(Rc::clone(&backend), Rc::new(clock.clone()));
            Self {
                store,
                clock,
                backend,
                sink: RecordingSink::new(),
            }
        }

        fn manager(&self) -> TransactionIdentityManager {
            TransactionIdentityManager::new(
                self.store.clone(),
                Duration::minutes(30),
                Duration::hours(24),
                self.sink.clone(),
            )
        }
    }

    fn event(id: &TransactionId, value: i64) -> PurchaseEvent {
        PurchaseEvent::new(id.clone(), inr(value), &[], true)
    }

    #[test]
    fn test_same_order_same_id() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let order = OrderId::new("ORD-1");

        let first = manager.get_or_create_transaction_id(&order, "card", inr(650));
        let second = manager.get_or_create_transaction_id(&order, "upi", inr(999));
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("txn_ORD-1_"));

        let record = manager.record(&order).unwrap();
        assert_eq!(record.payment_method, "card");
        assert_eq!(record.tracked_value, inr(650));
        assert_eq!(manager.last_order(), Some(order));
    }

    #[test]
    fn test_id_survives_reload() {
        let fx = Fixture::new();
        let order = OrderId::new("ORD-2");
        let first = fx.manager().get_or_create_transaction_id(&order, "card", inr(1));
        let again = fx.manager().get_or_create_transaction_id(&order, "card", inr(1));
        assert_eq!(first, again);
    }

    #[test]
    fn test_distinct_orders_distinct_ids() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let ids: HashSet<TransactionId> = (0..50)
            .map(|i| {
                let order = OrderId::new(format!("ORD-{}", i));
                manager.get_or_create_transaction_id(&order, "card", inr(1))
            })
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_record_expires() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let order = OrderId::new("ORD-3");
        let first = manager.get_or_create_transaction_id(&order, "card", inr(1));

        fx.clock.advance(Duration::minutes(31));
        assert!(manager.record(&order).is_none());
        let second = manager.get_or_create_transaction_id(&order, "card", inr(1));
        assert_ne!(first, second);
    }

    #[test]
    fn test_event_fires_once() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let id = manager.get_or_create_transaction_id(&OrderId::new("ORD-4"), "card", inr(650));

        assert!(manager.mark_event_fired(&id, event(&id, 650)));
        assert!(!manager.mark_event_fired(&id, event(&id, 650)));
        assert!(!fx.manager().mark_event_fired(&id, event(&id, 650)));
        assert_eq!(fx.sink.len(), 1);
        assert_eq!(fx.sink.events()[0].value, 650.0);
    }

    #[test]
    fn test_dedupe_window_expires() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let id = TransactionId::new("txn_old");

        assert!(manager.mark_event_fired(&id, event(&id, 10)));
        fx.clock.advance(Duration::hours(25));
        assert!(manager.mark_event_fired(&id, event(&id, 10)));
        assert_eq!(fx.sink.len(), 2);
    }

    #[test]
    fn test_event_id_is_forced() {
        let fx = Fixture::new();
        let mut manager = fx.manager();
        let id = TransactionId::new("txn_right");
        manager.mark_event_fired(&id, event(&TransactionId::new("txn_wrong"), 10));
        assert_eq!(fx.sink.events()[0].transaction_id, id);
    }

    #[test]
    fn test_idempotent_when_storage_full() {
        let fx = Fixture::new();
        fx.backend.borrow_mut().set_quota(Some(0));
        let mut manager = fx.manager();
        let order = OrderId::new("ORD-5");

        let first = manager.get_or_create_transaction_id(&order, "card", inr(1));
        let second = manager.get_or_create_transaction_id(&order, "card", inr(1));
        assert_eq!(first, second);

        assert!(manager.mark_event_fired(&first, event(&first, 1)));
        assert!(!manager.mark_event_fired(&first, event(&first, 1)));
        assert_eq!(fx.sink.len(), 1);
    }
}
