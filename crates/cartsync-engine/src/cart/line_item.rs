//! Line item and size types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ids::ProductId;
use crate::money::Money;

/// Garment size selected for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
    #[serde(rename = "3XL")]
    XXXL,
    #[serde(rename = "Free Size")]
    FreeSize,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::XS => "XS",
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
            Size::XXL => "XXL",
            Size::XXXL => "3XL",
            Size::FreeSize => "Free Size",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a size label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown size: {0}")]
pub struct UnknownSize(pub String);

impl FromStr for Size {
    type Err = UnknownSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "XS" => Ok(Size::XS),
            "S" => Ok(Size::S),
            "M" => Ok(Size::M),
            "L" => Ok(Size::L),
            "XL" => Ok(Size::XL),
            "XXL" | "2XL" => Ok(Size::XXL),
            "XXXL" | "3XL" => Ok(Size::XXXL),
            "FREE" | "FREESIZE" => Ok(Size::FreeSize),
            _ => Err(UnknownSize(s.to_string())),
        }
    }
}

/// A line item in the cart.
///
/// Carries exactly two prices. Whatever shape the upstream catalogue uses
/// is mapped into this one by [`LineItem::from_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product being purchased. Unique within a ledger.
    pub product_id: ProductId,
    /// Undiscounted unit price (MRP).
    pub unit_price: Money,
    /// Unit price after the item-level discount.
    pub unit_discounted_price: Money,
    /// Quantity, at least 1.
    pub quantity: u32,
    /// Selected size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl LineItem {
    /// Create a line item, sanitizing invalid input instead of rejecting it.
    ///
    /// Quantities below 1 become 1, negative prices become 0 and the
    /// discounted price is clamped to `[0, unit_price]`.
    pub fn new(
        product_id: impl Into<ProductId>,
        unit_price: Money,
        unit_discounted_price: Money,
        quantity: i64,
        size: Option<Size>,
    ) -> Self {
        let product_id = product_id.into();
        let quantity = if quantity < 1 {
            warn!(product_id = %product_id, quantity, "invalid line item quantity, using 1");
            1
        } else {
            u32::try_from(quantity).unwrap_or(u32::MAX)
        };

        Self {
            product_id,
            unit_price,
            unit_discounted_price,
            quantity,
            size,
        }
        .sanitized()
    }

    /// Line item with no item-level discount.
    pub fn full_price(
        product_id: impl Into<ProductId>,
        unit_price: Money,
        quantity: i64,
        size: Option<Size>,
    ) -> Self {
        Self::new(product_id, unit_price, unit_price, quantity, size)
    }

    /// Whether the item already satisfies every line item invariant.
    pub fn is_valid(&self) -> bool {
        self.quantity >= 1
            && !self.unit_price.is_negative()
            && !self.unit_discounted_price.is_negative()
            && self.unit_discounted_price.currency == self.unit_price.currency
            && self.unit_discounted_price.amount_minor <= self.unit_price.amount_minor
    }

    /// Return a copy that satisfies every invariant.
    ///
    /// Items restored from storage may have been written by older code or
    /// another tab, so they pass through here before being priced.
    pub fn sanitized(mut self) -> Self {
        if self.is_valid() {
            return self;
        }
        warn!(product_id = %self.product_id, "sanitizing invalid line item");

        self.quantity = self.quantity.max(1);
        self.unit_price = self.unit_price.clamp_non_negative();
        if self.unit_discounted_price.currency != self.unit_price.currency {
            self.unit_discounted_price = self.unit_price;
        }
        self.unit_discounted_price = self
            .unit_discounted_price
            .clamp_non_negative()
            .min(self.unit_price);
        self
    }

    /// Unit price the customer pays for this item.
    pub fn effective_unit_price(&self, eligible: bool) -> Money {
        if eligible {
            self.unit_discounted_price
        } else {
            self.unit_price
        }
    }

    /// `unit_price * quantity`.
    pub fn line_mrp(&self) -> Money {
        self.unit_price * i64::from(self.quantity)
    }

    /// `effective_unit_price * quantity`.
    pub fn line_total(&self, eligible: bool) -> Money {
        self.effective_unit_price(eligible) * i64::from(self.quantity)
    }
}
