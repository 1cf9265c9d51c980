//! Persisted key names.
//!
//! Other storefront code reads these keys directly, so the names are a
//! stable contract. A deployment-wide prefix is applied by the
//! [`Store`](cartsync_store::Store), not here.

use crate::ids::{OrderId, TransactionId};

/// Cart line items.
pub const CART_ITEMS: &str = "cartItems";
/// Sliding cart expiry.
pub const CART_EXPIRY: &str = "cartExpiry";
/// Total MRP of the cart.
pub const TOTAL_MRP: &str = "totalMRP";
/// Total item-level discount.
pub const TOTAL_DISCOUNT: &str = "totalDiscount";
/// Group promotion discount.
pub const EXTRA_DISCOUNT: &str = "extraDiscount";
/// Final payable total.
pub const FINAL_PAYABLE: &str = "finalPayable";
/// Canonical amount checkout charges.
pub const PAYMENT_AMOUNT: &str = "paymentAmount";
/// Most recently confirmed order.
pub const ORDER_ID: &str = "orderId";

/// Transaction record for an order.
pub fn transaction_record(order_id: &OrderId) -> String {
    cartsync_store::store_key!("transactionRecord", order_id)
}

/// Dedupe marker for a fired purchase event.
pub fn purchase_event_fired(transaction_id: &TransactionId) -> String {
    cartsync_store::store_key!("purchaseEventFired", transaction_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_order_keys() {
        assert_eq!(
            transaction_record(&OrderId::new("ORD-9")),
            "transactionRecord:ORD-9"
        );
        assert_eq!(
            purchase_event_fired(&TransactionId::new("txn_1")),
            "purchaseEventFired:txn_1"
        );
    }
}
