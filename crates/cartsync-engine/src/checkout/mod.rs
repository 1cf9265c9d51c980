//! Checkout module.
//!
//! Contains the payment amount synchronizer, transaction identity and the
//! purchase analytics event.

mod analytics;
mod sync;
mod transaction;

pub use analytics::{AnalyticsSink, PurchaseEvent, PurchaseItem, RecordingSink, TracingSink};
pub use sync::{
    AmountSource, PaymentAmountRecord, PriceSynchronizer, RecordState, Reconciled, SyncOutcome,
};
pub use transaction::{TransactionIdentityManager, TransactionRecord};
