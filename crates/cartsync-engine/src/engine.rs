//! The checkout engine facade.
//!
//! One [`CheckoutEngine`] stands for one browser tab: it owns in-memory
//! copies of the ledger and payment state, and shares storage with every
//! other engine built over the same backend. Call
//! [`CheckoutEngine::activate`] whenever the tab (re)gains focus so state
//! written by other tabs is picked up.

use serde::Serialize;
use tracing::{debug, info, warn};

use cartsync_store::Store;
use chrono::Duration;

use crate::cart::{CartLedger, DiscountPolicy, LineItem, PriceSnapshot, ProductRecord, Size};
use crate::checkout::{
    AnalyticsSink, PriceSynchronizer, PurchaseEvent, Reconciled, SyncOutcome,
    TransactionIdentityManager, TransactionRecord,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::expiry::{CartState, ExpirationMonitor};
use crate::ids::{OrderId, ProductId, TransactionId};
use crate::money::Money;

/// Result of confirming a purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    /// Amount charged, as locked at checkout.
    pub amount: Money,
    /// Whether this call sent the purchase event.
    pub event_sent: bool,
    /// Whether this was the first confirmation seen for the order.
    pub first_confirmation: bool,
}

/// Cart, pricing and checkout state for one tab.
#[derive(Debug)]
pub struct CheckoutEngine {
    config: EngineConfig,
    policy: DiscountPolicy,
    eligible: bool,
    ledger: CartLedger,
    sync: PriceSynchronizer,
    transactions: TransactionIdentityManager,
}

impl CheckoutEngine {
    /// Build an engine over `store`.
    ///
    /// The engine starts ineligible for promotional pricing. Set
    /// eligibility with [`CheckoutEngine::with_eligibility`], then call
    /// [`CheckoutEngine::activate`] before reading prices.
    pub fn new(
        store: Store,
        config: EngineConfig,
        sink: impl AnalyticsSink + 'static,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let store = if config.key_prefix.is_empty() {
            store
        } else {
            store.with_prefix(config.key_prefix.clone())
        };

        let mut sync =
            PriceSynchronizer::new(store.clone(), config.currency, config.checkout_lock_ttl());
        let expiry = ExpirationMonitor::new(store.clone(), config.cart_ttl());
        let ledger = CartLedger::open_held(store.clone(), expiry, sync.is_locked());
        let transactions = TransactionIdentityManager::new(
            store,
            config.transaction_ttl(),
            config.event_dedupe_ttl(),
            sink,
        );

        Ok(Self {
            policy: config.policy(),
            config,
            eligible: false,
            ledger,
            sync,
            transactions,
        })
    }

    /// Set eligibility without repricing, for use before `activate`.
    pub fn with_eligibility(mut self, eligible: bool) -> Self {
        self.eligible = eligible;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Re-read storage and settle on one consistent payable amount.
    pub fn activate(&mut self) -> Reconciled {
        self.ledger_mut().reload();
        let items = self.current_items();
        let live = (!items.is_empty()).then(|| self.policy.compute_snapshot(&items, self.eligible));
        let reconciled = self.sync.reconcile_from_storage(live);
        debug!(
            items = items.len(),
            payable = %reconciled.payable,
            source = reconciled.source.as_str(),
            "engine activated"
        );
        reconciled
    }

    /// Change promotional eligibility and reprice.
    pub fn set_eligibility(&mut self, eligible: bool) -> PriceSnapshot {
        if self.eligible != eligible {
            info!(eligible, "eligibility changed");
        }
        self.eligible = eligible;
        self.recompute()
    }

    /// Add a product, or replace the quantity and size of one already in
    /// the cart.
    pub fn add_item(&mut self, item: LineItem) -> PriceSnapshot {
        self.ledger_mut().add_or_update(item);
        self.recompute()
    }

    /// Change a product's quantity and size. `None` when the product is
    /// not in the cart.
    pub fn update_item(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
        size: Option<Size>,
    ) -> Option<PriceSnapshot> {
        if !self.ledger_mut().update(product_id, quantity, size) {
            self.sweep_expired();
            return None;
        }
        Some(self.recompute())
    }

    pub fn remove_item(&mut self, product_id: &ProductId) -> PriceSnapshot {
        self.ledger_mut().remove(product_id);
        self.recompute()
    }

    pub fn clear_cart(&mut self) -> PriceSnapshot {
        self.ledger_mut().clear();
        self.recompute()
    }

    /// Replace the cart with `items`.
    pub fn set_bundle(&mut self, items: Vec<LineItem>) -> PriceSnapshot {
        self.ledger_mut().set_all(items);
        self.recompute()
    }

    /// Replace the cart with upstream product records. Records without an
    /// id are skipped.
    pub fn import_records(&mut self, records: &[ProductRecord]) -> PriceSnapshot {
        let items: Vec<LineItem> = records
            .iter()
            .filter_map(|record| LineItem::from_record(record, self.config.currency))
            .collect();
        if items.len() < records.len() {
            warn!(
                skipped = records.len() - items.len(),
                "some product records could not be imported"
            );
        }
        self.set_bundle(items)
    }

    /// Current cart contents.
    pub fn items(&mut self) -> Vec<LineItem> {
        self.current_items()
    }

    /// The current price breakdown.
    pub fn snapshot(&mut self) -> PriceSnapshot {
        self.sweep_expired_on_access();
        self.sync.snapshot().clone()
    }

    /// The amount checkout would charge right now.
    pub fn payable(&mut self) -> Money {
        self.sweep_expired_on_access();
        self.sync.payable()
    }

    /// Whether a checkout holds the payment amount lock.
    pub fn checkout_locked(&mut self) -> bool {
        self.sweep_expired_on_access();
        self.sync.is_locked()
    }

    pub fn cart_state(&mut self) -> CartState {
        let has_items = !self.current_items().is_empty();
        self.ledger_mut().expiry().state(has_items)
    }

    /// Time left before the cart expires, for countdown displays.
    pub fn expires_in(&mut self) -> Option<Duration> {
        if self.current_items().is_empty() {
            return None;
        }
        self.ledger_mut().expiry().remaining()
    }

    /// Lock and return the amount the payment step charges.
    pub fn commit_for_checkout(&mut self) -> Money {
        if self.current_items().is_empty() {
            warn!("committing checkout with an empty cart");
        }
        self.sync.commit_for_checkout()
    }

    /// Release the checkout lock; the payment amount follows the cart again.
    pub fn abandon_checkout(&mut self) -> PriceSnapshot {
        self.sync.release();
        info!("checkout abandoned");
        self.recompute()
    }

    /// Record a successful payment for `order_id`.
    ///
    /// Safe to repeat: the same order always gets the same transaction id,
    /// the purchase event goes out once, and only the first confirmation
    /// clears the cart.
    pub fn confirm_purchase(&mut self, order_id: &OrderId, payment_method: &str) -> ConfirmOutcome {
        let items = self.current_items();
        let existing = self.transactions.record(order_id);
        let first_confirmation = existing.is_none();

        let amount = match &existing {
            Some(record) => record.tracked_value,
            None => self.sync.commit_for_checkout(),
        };
        let transaction_id =
            self.transactions
                .get_or_create_transaction_id(order_id, payment_method, amount);

        let event = PurchaseEvent::new(transaction_id.clone(), amount, &items, self.eligible);
        let event_sent = self.transactions.mark_event_fired(&transaction_id, event);

        if first_confirmation || event_sent {
            self.ledger.clear();
            self.ledger.take_expired();
            self.sync.clear();
            info!(
                order_id = %order_id,
                transaction_id = %transaction_id,
                amount = %amount,
                "purchase confirmed, cart cleared"
            );
        } else {
            debug!(order_id = %order_id, "repeat confirmation ignored");
        }

        ConfirmOutcome {
            order_id: order_id.clone(),
            transaction_id,
            amount,
            event_sent,
            first_confirmation,
        }
    }

    /// The transaction recorded for `order_id`, if still remembered.
    pub fn transaction(&mut self, order_id: &OrderId) -> Option<TransactionRecord> {
        self.transactions.record(order_id)
    }

    /// The most recently confirmed order.
    pub fn last_order(&self) -> Option<OrderId> {
        self.transactions.last_order()
    }

    // A cart being paid for does not lapse until the lock is released or
    // runs out, so confirmation always sees the items and amount it locked.
    fn ledger_mut(&mut self) -> &mut CartLedger {
        let locked = self.sync.is_locked();
        self.ledger.hold_expiry(locked);
        &mut self.ledger
    }

    fn recompute(&mut self) -> PriceSnapshot {
        let items = self.current_items();
        let snapshot = self.policy.compute_snapshot(&items, self.eligible);
        if let SyncOutcome::LockHeld { locked, .. } = self.sync.on_snapshot_changed(snapshot.clone()) {
            debug!(locked = %locked, "cart changed during checkout");
        }
        snapshot
    }

    fn current_items(&mut self) -> Vec<LineItem> {
        let items = self.ledger_mut().items().to_vec();
        self.sweep_expired();
        items
    }

    fn sweep_expired_on_access(&mut self) {
        self.ledger_mut().items();
        self.sweep_expired();
    }

    fn sweep_expired(&mut self) {
        if self.ledger_mut().take_expired() {
            self.sync.clear();
            info!("cart expired, payment amount cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{AmountSource, RecordingSink, TracingSink};
    use crate::keys;
    use crate::money::Currency;
    use cartsync_store::{ManualClock, MemoryBackend};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn inr(major: i64) -> Money {
        Money::from_major(major, Currency::INR)
    }

    fn item(id: &str, price: i64) -> LineItem {
        LineItem::full_price(id, inr(price), 1, None)
    }

    fn engine() -> (CheckoutEngine, Store, ManualClock, RecordingSink) {
        let clock = ManualClock::default();
        let backend = Rc::new(RefCell::new(MemoryBackend::new()));
        let store = Store::shared(backend, Rc::new(clock.clone()));
        let sink = RecordingSink::new();
        let mut engine = CheckoutEngine::new(store.clone(), EngineConfig::default(), sink.clone())
            .unwrap()
            .with_eligibility(true);
        engine.activate();
        (engine, store, clock, sink)
    }

    #[test]
    fn test_add_items_prices_group_promotion() {
        let (mut engine, _, _, _) = engine();
        engine.add_item(item("a", 100));
        engine.add_item(item("b", 250));
        let snapshot = engine.add_item(item("c", 400));

        assert_eq!(snapshot.final_payable, inr(650));
        assert_eq!(engine.payable(), inr(650));
        assert!(matches!(engine.cart_state(), CartState::Active { .. }));
        assert_eq!(engine.expires_in(), Some(Duration::minutes(15)));
    }

    #[test]
    fn test_eligibility_toggle_reprices() {
        let (mut engine, _, _, _) = engine();
        engine.set_bundle(vec![item("a", 100), item("b", 250), item("c", 400)]);
        assert_eq!(engine.set_eligibility(false).final_payable, inr(750));
        assert_eq!(engine.payable(), inr(750));
        assert_eq!(engine.set_eligibility(true).final_payable, inr(650));
    }

    #[test]
    fn test_update_missing_item() {
        let (mut engine, _, _, _) = engine();
        assert!(engine.update_item(&ProductId::new("nope"), 2, None).is_none());

        engine.add_item(item("a", 100));
        let snapshot = engine.update_item(&ProductId::new("a"), 3, Some(Size::L)).unwrap();
        assert_eq!(snapshot.total_mrp, inr(300));
    }

    #[test]
    fn test_checkout_lock_holds_through_edits() {
        let (mut engine, _, _, _) = engine();
        engine.set_bundle(vec![item("a", 100), item("b", 250), item("c", 400)]);
        assert_eq!(engine.commit_for_checkout(), inr(650));

        engine.remove_item(&ProductId::new("c"));
        assert!(engine.checkout_locked());
        assert_eq!(engine.payable(), inr(650));
        assert_eq!(engine.snapshot().final_payable, inr(350));

        engine.abandon_checkout();
        assert!(!engine.checkout_locked());
        assert_eq!(engine.payable(), inr(350));
    }

    #[test]
    fn test_expiry_clears_cart_and_payment() {
        let (mut engine, store, clock, _) = engine();
        engine.add_item(item("a", 100));

        clock.advance(Duration::minutes(16));
        assert!(engine.payable().is_zero());
        assert!(engine.items().is_empty());
        assert_eq!(engine.cart_state(), CartState::Empty);
        assert!(!store.contains(keys::PAYMENT_AMOUNT));
        assert!(!store.contains(keys::FINAL_PAYABLE));
    }

    #[test]
    fn test_confirm_after_cart_window_charges_locked_amount() {
        let (mut engine, _, clock, sink) = engine();
        engine.set_bundle(vec![item("a", 100), item("b", 250), item("c", 400)]);
        assert_eq!(engine.commit_for_checkout(), inr(650));

        clock.advance(Duration::minutes(16));
        let outcome = engine.confirm_purchase(&OrderId::new("ORD-16"), "card");
        assert_eq!(outcome.amount, inr(650));
        assert_eq!(sink.events()[0].value, 650.0);
        assert_eq!(sink.events()[0].items.len(), 3);
    }

    #[test]
    fn test_abandoned_checkout_expires_normally() {
        let (mut engine, _, clock, _) = engine();
        engine.add_item(item("a", 100));
        engine.commit_for_checkout();
        clock.advance(Duration::minutes(10));
        engine.abandon_checkout();

        clock.advance(Duration::minutes(16));
        assert!(engine.items().is_empty());
        assert!(engine.payable().is_zero());
    }

    #[test]
    fn test_confirm_purchase_once() {
        let (mut engine, store, _, sink) = engine();
        engine.set_bundle(vec![item("a", 100), item("b", 250), item("c", 400)]);
        engine.commit_for_checkout();

        let order = OrderId::new("ORD-100");
        let first = engine.confirm_purchase(&order, "card");
        assert!(first.event_sent);
        assert!(first.first_confirmation);
        assert_eq!(first.amount, inr(650));
        assert!(engine.items().is_empty());
        assert!(engine.payable().is_zero());
        assert_eq!(engine.last_order(), Some(order.clone()));
        assert!(!store.contains(keys::CART_EXPIRY));

        // The customer starts a new cart, then the confirmation page reloads.
        engine.add_item(item("d", 90));
        let again = engine.confirm_purchase(&order, "card");
        assert_eq!(again.transaction_id, first.transaction_id);
        assert!(!again.event_sent);
        assert_eq!(again.amount, inr(650));
        assert_eq!(engine.items().len(), 1);

        assert_eq!(sink.len(), 1);
        let events = sink.events();
        let event = &events[0];
        assert_eq!(event.transaction_id, first.transaction_id);
        assert_eq!(event.value, 650.0);
        assert_eq!(event.items.len(), 3);
    }

    #[test]
    fn test_confirm_without_commit_locks_current_amount() {
        let (mut engine, _, _, _) = engine();
        engine.add_item(item("a", 120));
        let outcome = engine.confirm_purchase(&OrderId::new("ORD-7"), "upi");
        assert_eq!(outcome.amount, inr(120));
    }

    #[test]
    fn test_reload_restores_state() {
        let (mut engine, store, _, _) = engine();
        engine.set_bundle(vec![item("a", 10), item("b", 20), item("c", 30)]);
        let before = engine.payable();
        drop(engine);

        let mut reloaded = CheckoutEngine::new(store, EngineConfig::default(), TracingSink)
            .unwrap()
            .with_eligibility(true);
        let view = reloaded.activate();
        assert_eq!(view.source, AmountSource::LiveRecompute);
        assert_eq!(view.payable, before);
        assert_eq!(reloaded.items().len(), 3);
    }

    #[test]
    fn test_import_records_skips_unusable() {
        let (mut engine, _, _, _) = engine();
        let records: Vec<ProductRecord> = serde_json::from_str(
            r#"[
                {"_id": "a", "price": 100},
                {"productId": "b", "mrp": "250", "discountedPrice": 200, "quantity": 2},
                {"price": 10}
            ]"#,
        )
        .unwrap();

        let snapshot = engine.import_records(&records);
        assert_eq!(engine.items().len(), 2);
        assert_eq!(snapshot.total_mrp, inr(600));
        assert_eq!(snapshot.final_payable, inr(500));
    }

    #[test]
    fn test_key_prefix_applied() {
        let clock = ManualClock::default();
        let backend = Rc::new(RefCell::new(MemoryBackend::new()));
        let raw = Store::shared(Rc::clone(&backend), Rc::new(clock));
        let config = EngineConfig {
            key_prefix: "shop1.".into(),
            ..EngineConfig::default()
        };
        let mut engine = CheckoutEngine::new(raw.clone(), config, TracingSink).unwrap();
        engine.add_item(item("a", 100));

        assert!(raw.contains("shop1.cartItems"));
        assert!(!raw.contains(keys::CART_ITEMS));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            group_size: 0,
            ..EngineConfig::default()
        };
        let result = CheckoutEngine::new(Store::in_memory(), config, TracingSink);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
