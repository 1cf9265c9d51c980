//! Adapter from upstream product records.
//!
//! Catalogue and listing endpoints hand out products with a loose bag of
//! price fields (`price`, `mrp`, `salePrice`, `discountedPrice`,
//! `discount`), sometimes as strings and sometimes missing. This is the one
//! place that shape is turned into a [`LineItem`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::cart::{LineItem, Size};
use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// A product as upstream code hands it over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default, alias = "_id", alias = "productId")]
    pub id: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub mrp: Option<Value>,
    #[serde(default)]
    pub sale_price: Option<Value>,
    #[serde(default)]
    pub discounted_price: Option<Value>,
    /// Percentage off `mrp`/`price`.
    #[serde(default)]
    pub discount: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
}

impl ProductRecord {
    /// Product id as a string, if the record carries a usable one.
    pub fn product_id(&self) -> Option<ProductId> {
        match self.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(ProductId::new(s.trim())),
            Value::Number(n) => Some(ProductId::new(n.to_string())),
            _ => None,
        }
    }
}

impl LineItem {
    /// Map an upstream product record into a line item.
    ///
    /// - unit price: the first positive of `mrp`, `price`; otherwise 0.
    /// - discounted price: the first positive of `salePrice`,
    ///   `discountedPrice`, then `price` when `mrp` is also present;
    ///   otherwise `discount` as a percentage of the unit price; otherwise
    ///   the unit price.
    /// - quantity: a positive integer, otherwise 1.
    ///
    /// Returns `None` only when the record has no product id, since a line
    /// item cannot be keyed without one.
    pub fn from_record(record: &ProductRecord, currency: Currency) -> Option<LineItem> {
        let Some(product_id) = record.product_id() else {
            warn!("product record without an id, skipping");
            return None;
        };

        let mrp = positive(&record.mrp);
        let price = positive(&record.price);
        let unit = mrp.or(price).unwrap_or(0.0);
        if mrp.is_none() && price.is_none() {
            warn!(product_id = %product_id, "product record without a usable price, using 0");
        }
        let unit_price = Money::from_decimal(unit, currency);

        let unit_discounted_price = positive(&record.sale_price)
            .or_else(|| positive(&record.discounted_price))
            .or(if mrp.is_some() { price } else { None })
            .map(|amount| Money::from_decimal(amount, currency))
            .or_else(|| {
                numeric(&record.discount)
                    .filter(|percent| *percent > 0.0 && *percent <= 100.0)
                    .map(|percent| unit_price - unit_price.percentage(percent))
            })
            .unwrap_or(unit_price);

        let quantity = numeric(&record.quantity)
            .map(|q| q.round() as i64)
            .unwrap_or(1);

        let size = match &record.size {
            Some(Value::String(label)) => label.parse::<Size>().ok(),
            _ => None,
        };

        Some(LineItem::new(
            product_id,
            unit_price,
            unit_discounted_price,
            quantity,
            size,
        ))
    }
}

/// Parse a JSON number, or a string such as `"₹1,299.00"`.
fn numeric(value: &Option<Value>) -> Option<f64> {
    let parsed = match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn positive(value: &Option<Value>) -> Option<f64> {
    numeric(value).filter(|n| *n > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ProductRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_mrp_and_price() {
        let r = record(json!({"_id": "kurta-1", "mrp": 1299, "price": 999, "size": "L"}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();

        assert_eq!(item.product_id.as_str(), "kurta-1");
        assert_eq!(item.unit_price, Money::from_major(1299, Currency::INR));
        assert_eq!(item.unit_discounted_price, Money::from_major(999, Currency::INR));
        assert_eq!(item.quantity, 1);
        assert_eq!(item.size, Some(Size::L));
    }

    #[test]
    fn test_sale_price_wins() {
        let r = record(json!({"id": 42, "price": 500, "salePrice": "399.50"}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();

        assert_eq!(item.product_id.as_str(), "42");
        assert_eq!(item.unit_price.amount_minor, 50000);
        assert_eq!(item.unit_discounted_price.amount_minor, 39950);
    }

    #[test]
    fn test_discount_percentage() {
        let r = record(json!({"productId": "p", "price": 1000, "discount": 25}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();
        assert_eq!(item.unit_discounted_price, Money::from_major(750, Currency::INR));
    }

    #[test]
    fn test_price_strings_with_symbols() {
        let r = record(json!({"_id": "p", "mrp": "\u{20b9}1,499", "quantity": "2"}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();
        assert_eq!(item.unit_price, Money::from_major(1499, Currency::INR));
        assert_eq!(item.unit_discounted_price, item.unit_price);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_missing_or_garbage_prices_become_zero() {
        let r = record(json!({"_id": "p", "price": "free!", "quantity": -3, "size": "huge"}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();
        assert!(item.unit_price.is_zero());
        assert!(item.unit_discounted_price.is_zero());
        assert_eq!(item.quantity, 1);
        assert_eq!(item.size, None);
    }

    #[test]
    fn test_sale_price_above_mrp_is_clamped() {
        let r = record(json!({"_id": "p", "mrp": 100, "salePrice": 120}));
        let item = LineItem::from_record(&r, Currency::INR).unwrap();
        assert_eq!(item.unit_discounted_price, item.unit_price);
    }

    #[test]
    fn test_record_without_id_is_skipped() {
        let r = record(json!({"price": 100}));
        assert!(LineItem::from_record(&r, Currency::INR).is_none());
    }
}
