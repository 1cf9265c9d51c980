//! The persistent cart ledger.

use tracing::{debug, info, warn};

use cartsync_store::Store;

use crate::cart::{LineItem, Size};
use crate::expiry::ExpirationMonitor;
use crate::ids::ProductId;
use crate::keys;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 99;

/// Ordered cart contents, unique by product.
///
/// Every mutation is written through to the store under
/// [`keys::CART_ITEMS`] and slides the expiry window. Every access first
/// checks expiry and clears the ledger when the window has passed; the
/// owner learns about that through [`CartLedger::take_expired`].
///
/// While a checkout is being paid for the owner can hold expiry with
/// [`CartLedger::hold_expiry`]; a window that passes during the hold is
/// slid forward instead of clearing the cart.
#[derive(Debug)]
pub struct CartLedger {
    store: Store,
    expiry: ExpirationMonitor,
    items: Vec<LineItem>,
    expired: bool,
    held: bool,
}

impl CartLedger {
    /// Open the ledger persisted in `store`.
    ///
    /// Expiry is checked before the stored items are returned.
    pub fn open(store: Store, expiry: ExpirationMonitor) -> Self {
        Self::open_held(store, expiry, false)
    }

    /// Open the ledger with expiry already held, for a tab that loads while
    /// a checkout is in flight.
    pub fn open_held(store: Store, expiry: ExpirationMonitor, held: bool) -> Self {
        let mut ledger = Self {
            store,
            expiry,
            items: Vec::new(),
            expired: false,
            held,
        };
        ledger.reload();
        ledger
    }

    /// Re-read the ledger from storage, e.g. when a tab regains focus.
    ///
    /// Unreadable storage keeps the in-memory items.
    pub fn reload(&mut self) {
        if self.expire_if_due() {
            return;
        }

        match self.store.try_get::<Vec<LineItem>>(keys::CART_ITEMS) {
            Ok(Some(items)) => {
                self.items = dedupe(items.into_iter().map(LineItem::sanitized).collect());
            }
            Ok(None) => self.items.clear(),
            Err(e) => {
                warn!(error = %e, "cart items unreadable, keeping in-memory ledger");
            }
        }

        if !self.items.is_empty() && self.expiry.current().is_none() {
            // Items without a window (written by older code): start one now.
            self.expiry.touch();
        }
        debug!(items = self.items.len(), "cart ledger loaded");
    }

    /// Current items.
    pub fn items(&mut self) -> &[LineItem] {
        self.expire_if_due();
        &self.items
    }

    /// Look up an item by product.
    pub fn get(&mut self, product_id: &ProductId) -> Option<&LineItem> {
        self.expire_if_due();
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Number of distinct products.
    pub fn len(&mut self) -> usize {
        self.items().len()
    }

    /// Whether the ledger holds no items.
    pub fn is_empty(&mut self) -> bool {
        self.items().is_empty()
    }

    /// Total units across all items.
    pub fn item_count(&mut self) -> u64 {
        self.items().iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Add a product, or replace the quantity and size of one already in
    /// the ledger.
    pub fn add_or_update(&mut self, item: LineItem) -> &[LineItem] {
        self.expire_if_due();
        let item = cap_quantity(item.sanitized());

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            existing.quantity = item.quantity;
            existing.size = item.size;
        } else {
            debug!(product_id = %item.product_id, "adding product to cart");
            self.items.push(item);
        }

        self.commit();
        &self.items
    }

    /// Change the quantity and size of a product already in the ledger.
    ///
    /// Returns `false` when the product is not present. A quantity of zero
    /// removes the product.
    pub fn update(&mut self, product_id: &ProductId, quantity: u32, size: Option<Size>) -> bool {
        self.expire_if_due();
        if quantity == 0 {
            let present = self.items.iter().any(|i| &i.product_id == product_id);
            self.remove(product_id);
            return present;
        }

        let Some(existing) = self.items.iter_mut().find(|i| &i.product_id == product_id) else {
            return false;
        };
        existing.quantity = quantity.min(MAX_QUANTITY_PER_ITEM);
        existing.size = size;

        self.commit();
        true
    }

    /// Remove a product. Removing a missing product is a no-op.
    pub fn remove(&mut self, product_id: &ProductId) -> &[LineItem] {
        self.expire_if_due();
        let len_before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        if self.items.len() < len_before {
            debug!(product_id = %product_id, "removed product from cart");
            self.commit();
        }
        &self.items
    }

    /// Empty the ledger.
    pub fn clear(&mut self) {
        self.items.clear();
        self.expired = false;
        self.commit();
    }

    /// Replace the whole ledger, e.g. when adding a bundle.
    pub fn set_all(&mut self, items: Vec<LineItem>) -> &[LineItem] {
        self.expire_if_due();
        self.items = dedupe(
            items
                .into_iter()
                .map(|item| cap_quantity(item.sanitized()))
                .collect(),
        );
        self.commit();
        &self.items
    }

    /// Hold or resume expiry.
    pub fn hold_expiry(&mut self, held: bool) {
        self.held = held;
    }

    /// Whether the ledger expired since the last call. Resets the flag.
    pub fn take_expired(&mut self) -> bool {
        std::mem::take(&mut self.expired)
    }

    /// The expiration monitor guarding this ledger.
    pub fn expiry(&mut self) -> &mut ExpirationMonitor {
        &mut self.expiry
    }

    fn expire_if_due(&mut self) -> bool {
        if !self.expiry.is_expired() {
            return false;
        }
        if self.held {
            debug!("cart window passed during checkout, extending");
            self.expiry.touch();
            return false;
        }
        info!(items = self.items.len(), "cart expired, clearing");
        self.items.clear();
        self.store.remove(keys::CART_ITEMS);
        self.expiry.reset();
        self.expired = true;
        true
    }

    fn commit(&mut self) {
        if self.items.is_empty() {
            self.store.remove(keys::CART_ITEMS);
            self.expiry.reset();
        } else {
            self.store.set(keys::CART_ITEMS, &self.items, None);
            self.expiry.touch();
        }
    }
}

fn cap_quantity(mut item: LineItem) -> LineItem {
    item.quantity = item.quantity.min(MAX_QUANTITY_PER_ITEM);
    item
}

/// Keep the first position of each product, with the last quantity and
/// size given for it.
fn dedupe(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut out: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        match out.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = item.quantity;
                existing.size = item.size;
            }
            None => out.push(item),
        }
    }
    out
}
