//! Product, order and transaction identifiers.
//!
//! All three serialize as bare strings so persisted carts and records stay
//! readable by other tabs and tools.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Catalogue product id; one cart line per product.
    ProductId
);
define_id!(
    /// Order id handed back by the payment flow.
    OrderId
);
define_id!(
    /// Analytics transaction id, derived once per order.
    TransactionId
);

impl TransactionId {
    /// Derive a fresh transaction id for an order.
    ///
    /// The order id keeps ids for distinct orders apart and the random
    /// suffix keeps two derivations for the same order apart. Idempotency
    /// comes from the stored record, not from this derivation.
    pub fn for_order(order_id: &OrderId) -> Self {
        let bytes: [u8; 9] = rand::thread_rng().gen();
        Self(format!("txn_{}_{}", order_id, URL_SAFE_NO_PAD.encode(bytes)))
    }
}
