//! Shopping cart module.
//!
//! Contains the line item type, the persistent ledger, pricing snapshots and
//! the discount policy.

mod discount;
mod ledger;
mod line_item;
mod pricing;
mod record;

pub use discount::{compute_snapshot, DiscountPolicy, DEFAULT_GROUP_SIZE};
pub use ledger::{CartLedger, MAX_QUANTITY_PER_ITEM};
pub use line_item::{LineItem, Size, UnknownSize};
pub use pricing::PriceSnapshot;
pub use record::ProductRecord;
