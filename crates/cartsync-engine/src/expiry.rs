//! Cart expiration.
//!
//! A cart moves `Empty -> Active -> Expired -> Empty`. The expiry slides:
//! every mutation of a non-empty cart pushes it to `now + ttl`. Expiry is
//! evaluated lazily whenever the cart is accessed; [`ExpirationMonitor::remaining`]
//! only feeds countdown displays.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cartsync_store::Store;

use crate::keys;

/// Persisted expiry of the current cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartExpiry {
    pub expires_at: DateTime<Utc>,
}

/// Lifecycle state of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CartState {
    /// No items.
    Empty,
    /// Items present and the expiry is in the future.
    #[serde(rename_all = "camelCase")]
    Active { expires_at: DateTime<Utc> },
    /// Items present but the expiry has passed; the next access clears them.
    #[serde(rename_all = "camelCase")]
    Expired { expired_at: DateTime<Utc> },
}

impl CartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartState::Empty => "empty",
            CartState::Active { .. } => "active",
            CartState::Expired { .. } => "expired",
        }
    }
}

/// Time-boxes the cart ledger.
#[derive(Debug, Clone)]
pub struct ExpirationMonitor {
    store: Store,
    ttl: Duration,
    // Used when the store cannot be read.
    fallback: Option<CartExpiry>,
}

impl ExpirationMonitor {
    /// Create a monitor with a fixed time-to-live.
    pub fn new(store: Store, ttl: Duration) -> Self {
        let fallback = store.get::<CartExpiry>(keys::CART_EXPIRY);
        Self {
            store,
            ttl,
            fallback,
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current expiry, preferring what is in storage so another tab's
    /// refresh is observed.
    pub fn current(&mut self) -> Option<CartExpiry> {
        match self.store.try_get::<CartExpiry>(keys::CART_EXPIRY) {
            Ok(expiry) => {
                self.fallback = expiry;
                expiry
            }
            Err(e) => {
                warn!(error = %e, "cart expiry unreadable, using in-memory copy");
                self.fallback
            }
        }
    }

    /// Start or slide the expiry window to `now + ttl`.
    pub fn touch(&mut self) -> CartExpiry {
        let expiry = CartExpiry {
            expires_at: self.store.now() + self.ttl,
        };
        self.fallback = Some(expiry);
        self.store.set(keys::CART_EXPIRY, &expiry, None);
        debug!(expires_at = %expiry.expires_at, "cart expiry refreshed");
        expiry
    }

    /// Whether the window has passed.
    pub fn is_expired(&mut self) -> bool {
        let now = self.store.now();
        self.current()
            .map(|expiry| now > expiry.expires_at)
            .unwrap_or(false)
    }

    /// Forget the window (cart emptied, expired or purchased).
    pub fn reset(&mut self) {
        self.fallback = None;
        self.store.remove(keys::CART_EXPIRY);
    }

    /// The cart's state given whether it holds items.
    pub fn state(&mut self, has_items: bool) -> CartState {
        if !has_items {
            return CartState::Empty;
        }
        let now = self.store.now();
        match self.current() {
            Some(expiry) if now > expiry.expires_at => CartState::Expired {
                expired_at: expiry.expires_at,
            },
            Some(expiry) => CartState::Active {
                expires_at: expiry.expires_at,
            },
            None => CartState::Active {
                expires_at: now + self.ttl,
            },
        }
    }

    /// Time left before expiry, for countdown displays.
    pub fn remaining(&mut self) -> Option<Duration> {
        let now = self.store.now();
        self.current()
            .map(|expiry| (expiry.expires_at - now).max(Duration::zero()))
    }
}
