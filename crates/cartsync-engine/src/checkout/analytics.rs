//! Purchase analytics events and the sinks that receive them.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cart::LineItem;
use crate::ids::{ProductId, TransactionId};
use crate::money::{Currency, Money};

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub item_id: ProductId,
    pub quantity: u32,
    /// Effective unit price in major units.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_variant: Option<String>,
}

/// A completed purchase, as reported to analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub transaction_id: TransactionId,
    /// Amount charged, in major units.
    pub value: f64,
    pub currency: Currency,
    pub items: Vec<PurchaseItem>,
}

impl PurchaseEvent {
    /// Build the event for a charged amount and the lines it covered.
    pub fn new(
        transaction_id: TransactionId,
        value: Money,
        items: &[LineItem],
        eligible: bool,
    ) -> Self {
        Self {
            transaction_id,
            value: value.to_decimal(),
            currency: value.currency,
            items: items
                .iter()
                .map(|item| PurchaseItem {
                    item_id: item.product_id.clone(),
                    quantity: item.quantity,
                    price: item.effective_unit_price(eligible).to_decimal(),
                    item_variant: item.size.map(|s| s.to_string()),
                })
                .collect(),
        }
    }
}

/// Destination for purchase events.
pub trait AnalyticsSink {
    fn emit(&mut self, event: &PurchaseEvent);
}

impl<F> AnalyticsSink for F
where
    F: FnMut(&PurchaseEvent),
{
    fn emit(&mut self, event: &PurchaseEvent) {
        self(event)
    }
}

/// Writes events to the `cartsync::analytics` tracing target as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn emit(&mut self, event: &PurchaseEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(
                target: "cartsync::analytics",
                transaction_id = %event.transaction_id,
                payload = %payload,
                "purchase"
            ),
            Err(e) => warn!(
                target: "cartsync::analytics",
                transaction_id = %event.transaction_id,
                error = %e,
                "purchase event could not be serialized"
            ),
        }
    }
}

/// Keeps every emitted event. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<PurchaseEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PurchaseEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl AnalyticsSink for RecordingSink {
    fn emit(&mut self, event: &PurchaseEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Size;

    #[test]
    fn test_event_payload_shape() {
        let items = vec![
            LineItem::new(
                "kurta",
                Money::from_major(1000, Currency::INR),
                Money::from_major(800, Currency::INR),
                2,
                Some(Size::M),
            ),
            LineItem::full_price("scarf", Money::from_major(300, Currency::INR), 1, None),
        ];
        let event = PurchaseEvent::new(
            TransactionId::new("txn_1"),
            Money::from_major(1900, Currency::INR),
            &items,
            true,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["transactionId"], "txn_1");
        assert_eq!(json["value"], 1900.0);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["items"][0]["itemId"], "kurta");
        assert_eq!(json["items"][0]["price"], 800.0);
        assert_eq!(json["items"][0]["itemVariant"], "M");
        assert!(json["items"][1].get("itemVariant").is_none());
    }

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        let event = PurchaseEvent::new(
            TransactionId::new("txn_2"),
            Money::zero(Currency::INR),
            &[],
            false,
        );
        handle.emit(&event);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].transaction_id.as_str(), "txn_2");
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = 0;
        {
            let mut sink = |_: &PurchaseEvent| seen += 1;
            let event = PurchaseEvent::new(
                TransactionId::new("txn_3"),
                Money::zero(Currency::INR),
                &[],
                false,
            );
            sink.emit(&event);
        }
        assert_eq!(seen, 1);
    }
}
