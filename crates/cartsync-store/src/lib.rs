//! Expiring key/value storage for the cartsync engine.
//!
//! The store is the only place the engine persists anything. It wraps a raw
//! string backend (in memory, or a JSON file standing in for browser local
//! storage) with typed access, write timestamps and optional expiry.
//!
//! # Example
//!
//! ```rust
//! use cartsync_store::{ManualClock, MemoryBackend, Store};
//! use chrono::Duration;
//!
//! let clock = ManualClock::default();
//! let store = Store::new(MemoryBackend::new(), clock.clone());
//!
//! // Store a value that expires after ten minutes
//! store.set("cartExpiry", &"soon", Some(Duration::minutes(10)));
//!
//! // Expired values read as absent
//! clock.advance(Duration::minutes(11));
//! assert_eq!(store.get::<String>("cartExpiry"), None);
//! ```

mod backend;
mod clock;
mod error;
mod kv;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use kv::{Entry, Store};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Clock, Entry, FileBackend, MemoryBackend, StorageBackend, Store, StoreError};
}
