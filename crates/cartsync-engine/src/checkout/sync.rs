//! Price synchronizer: sole writer of the canonical payment amount.
//!
//! Every snapshot the discount policy produces flows through here on its way
//! to storage. Checkout reads the amount it charges from
//! [`PriceSynchronizer::commit_for_checkout`], which locks the record so
//! later cart changes (this tab or another) cannot move it mid-payment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cartsync_store::Store;

use crate::cart::PriceSnapshot;
use crate::keys;
use crate::money::{Currency, Money};

/// Whether the payment amount may still follow the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordState {
    /// Re-derivable: the next snapshot overwrites it.
    Open,
    /// Committed for checkout: only `release` changes it.
    Locked,
}

/// The single amount checkout is allowed to charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAmountRecord {
    pub amount: Money,
    pub state: RecordState,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAmountRecord {
    pub fn is_locked(&self) -> bool {
        self.state == RecordState::Locked
    }
}

/// Result of feeding a snapshot to the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The payment amount now follows the snapshot.
    Updated { amount: Money },
    /// A checkout is in flight; the locked amount was kept.
    LockHeld { locked: Money, attempted: Money },
}

/// Which source a reconciled amount came from, highest confidence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountSource {
    /// A payment amount locked by an in-flight checkout.
    LockedRecord,
    /// Recomputed from the current ledger.
    LiveRecompute,
    /// A previously stored total; the ledger was empty or unreadable.
    StoredTotal,
    /// Nothing in the cart and nothing stored.
    Empty,
}

impl AmountSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountSource::LockedRecord => "locked record",
            AmountSource::LiveRecompute => "live recompute",
            AmountSource::StoredTotal => "stored total",
            AmountSource::Empty => "empty",
        }
    }
}

/// A consistent view re-derived from storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    /// Snapshot of the current ledger.
    pub snapshot: PriceSnapshot,
    /// Amount checkout would charge.
    pub payable: Money,
    /// Where `payable` came from.
    pub source: AmountSource,
}

/// Owns the payment amount record and the persisted cart totals.
#[derive(Debug)]
pub struct PriceSynchronizer {
    store: Store,
    lock_ttl: Duration,
    snapshot: PriceSnapshot,
    // In-memory copy, used when storage cannot be read.
    record: Option<PaymentAmountRecord>,
    // The last record write failed, so storage holds an older record.
    unpersisted: bool,
}

impl PriceSynchronizer {
    /// Create a synchronizer. Call [`reconcile_from_storage`] before use.
    ///
    /// [`reconcile_from_storage`]: PriceSynchronizer::reconcile_from_storage
    pub fn new(store: Store, currency: Currency, lock_ttl: Duration) -> Self {
        Self {
            store,
            lock_ttl,
            snapshot: PriceSnapshot::empty(currency),
            record: None,
            unpersisted: false,
        }
    }

    /// The last snapshot seen.
    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    /// The current payment amount record.
    pub fn record(&mut self) -> Option<PaymentAmountRecord> {
        let stored = match self.store.try_get::<PaymentAmountRecord>(keys::PAYMENT_AMOUNT) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "payment amount unreadable, using in-memory copy");
                return self.record;
            }
        };

        if self.unpersisted {
            let memory_locked = self.record.map(|r| r.is_locked()).unwrap_or(false);
            match stored.filter(PaymentAmountRecord::is_locked) {
                // Another tab managed to lock; that wins over our unsaved copy.
                Some(_) if !memory_locked => {}
                _ => return self.record,
            }
        }
        self.record = stored;
        self.unpersisted = false;
        stored
    }

    /// Whether a checkout currently holds the lock.
    pub fn is_locked(&mut self) -> bool {
        self.record().map(|r| r.is_locked()).unwrap_or(false)
    }

    /// The amount to show as payable: the record when there is one,
    /// otherwise the last snapshot's total.
    pub fn payable(&mut self) -> Money {
        self.record()
            .map(|r| r.amount)
            .unwrap_or(self.snapshot.final_payable)
    }

    /// Persist a new snapshot and, unless a checkout holds the lock, make
    /// its total the payment amount.
    pub fn on_snapshot_changed(&mut self, snapshot: PriceSnapshot) -> SyncOutcome {
        self.write_totals(&snapshot);
        let attempted = snapshot.final_payable;
        self.snapshot = snapshot;

        match self.record() {
            Some(record) if record.is_locked() => {
                if record.amount != attempted {
                    warn!(
                        locked = %record.amount,
                        attempted = %attempted,
                        "checkout in flight, keeping locked payment amount"
                    );
                }
                SyncOutcome::LockHeld {
                    locked: record.amount,
                    attempted,
                }
            }
            _ => {
                self.write_record(attempted, RecordState::Open);
                SyncOutcome::Updated { amount: attempted }
            }
        }
    }

    /// Lock and return the amount the payment step must charge.
    ///
    /// Calling it again while locked returns the same amount.
    pub fn commit_for_checkout(&mut self) -> Money {
        let amount = match self.record() {
            Some(record) if record.is_locked() => {
                debug!(amount = %record.amount, "checkout already committed");
                return record.amount;
            }
            Some(record) => record.amount,
            None => self.snapshot.final_payable,
        };

        self.write_record(amount, RecordState::Locked);
        info!(amount = %amount, "payment amount committed for checkout");
        amount
    }

    /// Unlock and clear the payment amount, after a purchase or when the
    /// customer abandons checkout.
    pub fn release(&mut self) {
        self.record = None;
        self.unpersisted = false;
        self.store.remove(keys::PAYMENT_AMOUNT);
        debug!("payment amount released");
    }

    /// Clear the payment amount and every persisted total.
    pub fn clear(&mut self) {
        self.release();
        for key in [
            keys::TOTAL_MRP,
            keys::TOTAL_DISCOUNT,
            keys::EXTRA_DISCOUNT,
            keys::FINAL_PAYABLE,
        ] {
            self.store.remove(key);
        }
        self.snapshot = PriceSnapshot::empty(self.snapshot.currency());
    }

    /// Re-derive a consistent view after a page load or tab activation.
    ///
    /// `live` is the snapshot recomputed from the current ledger, or `None`
    /// when the ledger is empty. Sources are tried in order: a locked
    /// record, the live snapshot, then a previously stored total. Sources
    /// are never averaged, and zero never replaces a positive stored amount.
    pub fn reconcile_from_storage(&mut self, live: Option<PriceSnapshot>) -> Reconciled {
        let record = self.record();
        let stored_final = self.store.get::<Money>(keys::FINAL_PAYABLE);

        if let Some(record) = record.filter(PaymentAmountRecord::is_locked) {
            if let Some(live) = &live {
                if live.final_payable != record.amount {
                    warn!(
                        locked = %record.amount,
                        recomputed = %live.final_payable,
                        "stored amounts disagree, locked checkout amount wins"
                    );
                }
            }
            if let Some(live) = live {
                self.snapshot = live;
            }
            return Reconciled {
                snapshot: self.snapshot.clone(),
                payable: record.amount,
                source: AmountSource::LockedRecord,
            };
        }

        if let Some(live) = live {
            let recomputed = live.final_payable;
            let disagreeing = [record.map(|r| r.amount), stored_final]
                .into_iter()
                .flatten()
                .find(|stored| *stored != recomputed);
            if let Some(stored) = disagreeing {
                warn!(
                    stored = %stored,
                    recomputed = %recomputed,
                    "stored amounts disagree, live recompute wins"
                );
            }
            self.on_snapshot_changed(live);
            return Reconciled {
                snapshot: self.snapshot.clone(),
                payable: recomputed,
                source: AmountSource::LiveRecompute,
            };
        }

        let stored = [record.map(|r| r.amount), stored_final]
            .into_iter()
            .flatten()
            .find(Money::is_positive);
        if let Some(stored) = stored {
            warn!(
                stored = %stored,
                "cart is empty but a stored total remains, keeping stored total"
            );
            // payable() and commit_for_checkout() must report this amount too.
            if record.map(|r| r.amount) != Some(stored) {
                self.write_record(stored, RecordState::Open);
            }
            return Reconciled {
                snapshot: self.snapshot.clone(),
                payable: stored,
                source: AmountSource::StoredTotal,
            };
        }

        self.clear();
        Reconciled {
            snapshot: self.snapshot.clone(),
            payable: self.snapshot.final_payable,
            source: AmountSource::Empty,
        }
    }

    fn write_totals(&self, snapshot: &PriceSnapshot) {
        for (key, value) in [
            (keys::TOTAL_MRP, &snapshot.total_mrp),
            (keys::TOTAL_DISCOUNT, &snapshot.total_discount),
            (keys::EXTRA_DISCOUNT, &snapshot.extra_discount),
            (keys::FINAL_PAYABLE, &snapshot.final_payable),
        ] {
            self.store.set(key, value, None);
        }
    }

    fn write_record(&mut self, amount: Money, state: RecordState) {
        let record = PaymentAmountRecord {
            amount,
            state,
            updated_at: self.store.now(),
        };
        let ttl = (state == RecordState::Locked).then_some(self.lock_ttl);
        let persisted = self.store.set(keys::PAYMENT_AMOUNT, &record, ttl);

        self.unpersisted = !persisted;
        self.record = Some(record);
    }
}
