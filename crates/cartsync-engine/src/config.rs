//! Engine configuration.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cart::{DiscountPolicy, DEFAULT_GROUP_SIZE};
use crate::error::EngineError;
use crate::money::Currency;

// Ten years.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Tunables for a [`CheckoutEngine`](crate::CheckoutEngine).
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Currency carts are priced in.
    pub currency: Currency,
    /// Distinct products per free unit in the group promotion.
    pub group_size: usize,
    /// Sliding cart lifetime.
    pub cart_ttl_secs: u64,
    /// How long a committed payment amount stays locked.
    pub checkout_lock_ttl_secs: u64,
    /// How long an order keeps its transaction id.
    pub transaction_ttl_secs: u64,
    /// How long a fired purchase event is remembered. Must be at least
    /// `transaction_ttl_secs`, or a confirmation replayed after the marker
    /// lapses would send the event again.
    pub event_dedupe_ttl_secs: u64,
    /// Prepended verbatim to every persisted key, e.g. `"shop1."`.
    pub key_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: Currency::INR,
            group_size: DEFAULT_GROUP_SIZE,
            cart_ttl_secs: 15 * 60,
            checkout_lock_ttl_secs: 30 * 60,
            transaction_ttl_secs: 30 * 60,
            event_dedupe_ttl_secs: 24 * 60 * 60,
            key_prefix: String::new(),
        }
    }
}

impl EngineConfig {
    /// Load from a `.toml` or `.json` file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.group_size == 0 {
            return Err(EngineError::Config("group_size must be at least 1".into()));
        }
        for (name, secs) in [
            ("cart_ttl_secs", self.cart_ttl_secs),
            ("checkout_lock_ttl_secs", self.checkout_lock_ttl_secs),
            ("transaction_ttl_secs", self.transaction_ttl_secs),
            ("event_dedupe_ttl_secs", self.event_dedupe_ttl_secs),
        ] {
            if secs == 0 {
                return Err(EngineError::Config(format!("{} must be positive", name)));
            }
            if secs > MAX_TTL_SECS {
                return Err(EngineError::Config(format!("{} is out of range", name)));
            }
        }
        if self.event_dedupe_ttl_secs < self.transaction_ttl_secs {
            return Err(EngineError::Config(
                "event_dedupe_ttl_secs must be at least transaction_ttl_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn cart_ttl(&self) -> Duration {
        seconds(self.cart_ttl_secs)
    }

    pub fn checkout_lock_ttl(&self) -> Duration {
        seconds(self.checkout_lock_ttl_secs)
    }

    pub fn transaction_ttl(&self) -> Duration {
        seconds(self.transaction_ttl_secs)
    }

    pub fn event_dedupe_ttl(&self) -> Duration {
        seconds(self.event_dedupe_ttl_secs)
    }

    /// The discount policy these settings describe.
    pub fn policy(&self) -> DiscountPolicy {
        DiscountPolicy::new(self.group_size, self.currency)
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}
