//! Cart pricing and checkout state synchronization.
//!
//! This crate keeps a storefront's cart, its price breakdown and the amount
//! charged at checkout consistent across page reloads and browser tabs:
//!
//! - **Cart**: the persistent line-item ledger, pricing snapshots and the
//!   "buy N distinct products, cheapest free" promotion
//! - **Expiry**: the sliding cart lifetime
//! - **Checkout**: the locked payment amount, transaction ids and the
//!   once-only purchase event
//!
//! # Example
//!
//! ```rust
//! use cartsync_engine::prelude::*;
//! use cartsync_store::Store;
//!
//! let mut engine = CheckoutEngine::new(Store::in_memory(), EngineConfig::default(), TracingSink)
//!     .unwrap()
//!     .with_eligibility(true);
//! engine.activate();
//!
//! for (id, price) in [("kurta", 100), ("dupatta", 250), ("scarf", 400)] {
//!     engine.add_item(LineItem::full_price(id, Money::from_major(price, Currency::INR), 1, None));
//! }
//! assert_eq!(engine.payable(), Money::from_major(650, Currency::INR));
//!
//! let amount = engine.commit_for_checkout();
//! let outcome = engine.confirm_purchase(&OrderId::new("ORD-1"), "card");
//! assert_eq!(outcome.amount, amount);
//! assert!(outcome.event_sent);
//! ```

pub mod error;
pub mod ids;
pub mod keys;
pub mod money;

pub mod cart;
pub mod checkout;
pub mod config;
pub mod engine;
pub mod expiry;

pub use config::EngineConfig;
pub use engine::{CheckoutEngine, ConfirmOutcome};
pub use error::EngineError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{CheckoutEngine, ConfirmOutcome};
    pub use crate::error::EngineError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{
        compute_snapshot, CartLedger, DiscountPolicy, LineItem, PriceSnapshot, ProductRecord,
        Size,
    };
    pub use crate::expiry::{CartState, ExpirationMonitor};

    // Checkout
    pub use crate::checkout::{
        AmountSource, AnalyticsSink, PaymentAmountRecord, PriceSynchronizer, PurchaseEvent,
        Reconciled, RecordingSink, SyncOutcome, TracingSink, TransactionIdentityManager,
        TransactionRecord,
    };
}
