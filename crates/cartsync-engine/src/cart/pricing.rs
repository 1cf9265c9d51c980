//! Cart price snapshots.

use serde::{Deserialize, Serialize};

use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// Complete pricing breakdown for a cart.
///
/// Always derived from a line-item list and the eligibility flag, never
/// edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    /// Sum of `unit_price * quantity`.
    pub total_mrp: Money,
    /// Sum of `effective_unit_price * quantity`.
    pub total_discounted_price: Money,
    /// Item-level discount, `total_mrp - total_discounted_price`.
    pub total_discount: Money,
    /// Group promotion discount.
    pub extra_discount: Money,
    /// `max(0, total_discounted_price - extra_discount)`.
    pub final_payable: Money,
    /// Products whose unit went free under the group promotion, cheapest
    /// first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_products: Vec<ProductId>,
}

impl PriceSnapshot {
    /// Snapshot of an empty cart.
    pub fn empty(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            total_mrp: zero,
            total_discounted_price: zero,
            total_discount: zero,
            extra_discount: zero,
            final_payable: zero,
            free_products: Vec::new(),
        }
    }

    /// Currency the snapshot is expressed in.
    pub fn currency(&self) -> Currency {
        self.final_payable.currency
    }

    /// Whether every total is zero.
    pub fn is_empty(&self) -> bool {
        self.total_mrp.is_zero() && self.final_payable.is_zero()
    }

    /// Everything the customer saves against MRP.
    pub fn savings(&self) -> Money {
        self.total_mrp - self.final_payable
    }

    /// Whether the group promotion applied.
    pub fn has_promotion(&self) -> bool {
        self.extra_discount.is_positive()
    }

    /// Savings as a percentage of MRP.
    pub fn discount_percentage(&self) -> f64 {
        if self.total_mrp.amount_minor == 0 {
            return 0.0;
        }
        (self.savings().amount_minor as f64 / self.total_mrp.amount_minor as f64) * 100.0
    }

    /// Check the snapshot's internal invariants.
    pub fn is_consistent(&self) -> bool {
        let expected_final = (self.total_discounted_price - self.extra_discount).clamp_non_negative();
        !self.final_payable.is_negative()
            && self.final_payable == expected_final
            && self.final_payable.amount_minor <= self.total_mrp.amount_minor
            && self.total_discount == self.total_mrp - self.total_discounted_price
    }
}
