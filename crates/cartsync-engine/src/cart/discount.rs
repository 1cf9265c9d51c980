//! Discount policy: item-level discounts plus the group promotion.
//!
//! The group promotion is "buy N distinct products, the cheapest is free".
//! It counts distinct products, not units: a product in quantity 2 counts
//! once toward the threshold and at most one unit of it goes free.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cart::{LineItem, PriceSnapshot};
use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// Default number of distinct products per promotion group.
pub const DEFAULT_GROUP_SIZE: usize = 3;

/// Pricing rules applied to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Distinct products needed per free unit.
    pub group_size: usize,
    /// Currency totals are computed in. `None` takes the first item's.
    pub currency: Option<Currency>,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            currency: None,
        }
    }
}

impl DiscountPolicy {
    /// Policy with a fixed currency.
    pub fn new(group_size: usize, currency: Currency) -> Self {
        Self {
            group_size,
            currency: Some(currency),
        }
    }

    /// Compute the price snapshot for `items`.
    ///
    /// Pure and deterministic: persisting the result is the caller's job.
    /// Invalid items are priced as if sanitized; items in a foreign
    /// currency are priced at zero.
    pub fn compute_snapshot(&self, items: &[LineItem], eligible: bool) -> PriceSnapshot {
        let currency = self
            .currency
            .or_else(|| items.first().map(|i| i.unit_price.currency))
            .unwrap_or_default();
        let zero = Money::zero(currency);

        let mut total_mrp = zero;
        let mut total_discounted_price = zero;
        let mut seen: HashSet<&ProductId> = HashSet::with_capacity(items.len());
        let mut distinct: Vec<(&ProductId, Money)> = Vec::with_capacity(items.len());

        for item in items {
            let priced = item.clone().sanitized();
            let (unit, effective) = if priced.unit_price.currency == currency {
                (priced.unit_price, priced.effective_unit_price(eligible))
            } else {
                warn!(
                    product_id = %item.product_id,
                    currency = %priced.unit_price.currency,
                    expected = %currency,
                    "line item in foreign currency, pricing at zero"
                );
                (zero, zero)
            };

            let quantity = i64::from(priced.quantity);
            total_mrp = total_mrp + unit * quantity;
            total_discounted_price = total_discounted_price + effective * quantity;

            if seen.insert(&item.product_id) {
                distinct.push((&item.product_id, effective));
            }
        }

        let (extra_discount, free_products) = if eligible {
            self.group_promotion(distinct, zero)
        } else {
            (zero, Vec::new())
        };

        PriceSnapshot {
            total_mrp,
            total_discounted_price,
            total_discount: total_mrp - total_discounted_price,
            extra_discount,
            final_payable: (total_discounted_price - extra_discount).clamp_non_negative(),
            free_products,
        }
    }

    /// Sum of the cheapest `floor(distinct / group_size)` effective unit
    /// prices. Equal prices keep insertion order.
    fn group_promotion(
        &self,
        mut distinct: Vec<(&ProductId, Money)>,
        zero: Money,
    ) -> (Money, Vec<ProductId>) {
        if self.group_size == 0 {
            return (zero, Vec::new());
        }
        let groups = distinct.len() / self.group_size;
        if groups == 0 {
            return (zero, Vec::new());
        }

        distinct.sort_by_key(|(_, price)| price.amount_minor);
        distinct
            .into_iter()
            .take(groups)
            .fold((zero, Vec::with_capacity(groups)), |(sum, mut free), (id, price)| {
                free.push(id.clone());
                (sum + price, free)
            })
    }
}

/// Compute a snapshot with the default policy.
pub fn compute_snapshot(items: &[LineItem], eligible: bool) -> PriceSnapshot {
    DiscountPolicy::default().compute_snapshot(items, eligible)
}
