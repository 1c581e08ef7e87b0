//! Record-once semantics over a [`Store`].
//!
//! Two layers keep a value transfer from happening twice:
//!
//! 1. In-flight reservations: a process-wide slot per deposit hash or per
//!    account claim. Only the holder may transfer. The slot frees itself on
//!    drop, unless [`Reservation::poison`] was called because the transfer
//!    went through but the record did not.
//! 2. The store's unique `(source_tx_hash, kind)` insert, which makes the
//!    final record idempotent across restarts.
//! 3. Pending transfers: a transfer that timed out after signing may still
//!    land, so its key is poisoned and a [`PendingTransfer`] is persisted.
//!    Callers check [`ReconciliationLedger::pending`] after reserving.

use alloy::primitives::TxHash;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::ledger::store::{Store, StoreError};
use crate::ledger::types::{
    ClaimKey, LedgerEntry, LedgerFilter, LedgerKind, NewLedgerEntry, PendingTransfer, RecordOutcome, SortOrder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    InFlight,
    Poisoned,
}

/// Exclusive right to perform the transfer for one [`ClaimKey`].
#[derive(Debug)]
pub struct Reservation {
    key: ClaimKey,
    slots: Arc<DashMap<ClaimKey, SlotState>>,
    released: bool,
}

impl Reservation {
    pub fn key(&self) -> ClaimKey {
        self.key
    }

    /// Keep the slot held for the life of the process.
    pub fn poison(mut self) {
        self.slots.insert(self.key, SlotState::Poisoned);
        self.released = true;
        tracing::error!(key = ?self.key, "Reservation poisoned; key blocked until restart");
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.released {
            self.slots.remove_if(&self.key, |_, state| *state == SlotState::InFlight);
        }
    }
}

/// The reconciliation ledger.
pub struct ReconciliationLedger<S> {
    store: Arc<S>,
    slots: Arc<DashMap<ClaimKey, SlotState>>,
}

impl<S> Clone for ReconciliationLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<S: Store> ReconciliationLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            slots: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Claim the in-flight slot for `key`. `None` if another request holds
    /// it (or it was poisoned).
    pub fn reserve(&self, key: ClaimKey) -> Option<Reservation> {
        match self.slots.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(SlotState::InFlight);
                Some(Reservation {
                    key,
                    slots: self.slots.clone(),
                    released: false,
                })
            }
        }
    }

    pub fn is_reserved(&self, key: &ClaimKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Insert the entry unless one already exists for its source and kind,
    /// in which case the existing entry is returned with `created = false`.
    pub async fn record_once(&self, entry: NewLedgerEntry) -> Result<RecordOutcome, StoreError> {
        let (hash, kind) = (entry.source_tx_hash, entry.kind);
        match self.store.create_ledger_entry(entry).await {
            Ok(entry) => {
                tracing::info!(
                    entry_id = %entry.id,
                    account_id = entry.account_id,
                    kind = kind.as_str(),
                    source_tx_hash = %hash,
                    amount = %entry.amount,
                    "Ledger entry recorded"
                );
                Ok(RecordOutcome { created: true, entry })
            }
            Err(StoreError::Duplicate(_)) => {
                let existing = self.store.find_ledger_entry(hash, kind).await?.ok_or_else(|| {
                    StoreError::InvariantViolation(format!(
                        "duplicate reported for {} but no entry found",
                        hash
                    ))
                })?;
                tracing::debug!(source_tx_hash = %hash, kind = kind.as_str(), "Ledger entry already present");
                Ok(RecordOutcome {
                    created: false,
                    entry: existing,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Poison `reservation` and persist `pending` so the key stays blocked
    /// across restarts.
    pub async fn hold_pending(&self, reservation: Reservation, pending: PendingTransfer) -> Result<(), StoreError> {
        reservation.poison();
        tracing::error!(
            key = ?pending.key,
            account_id = pending.account_id,
            amount = %pending.amount,
            transfer_tx_hash = ?pending.transfer_tx_hash,
            "Transfer outcome unknown; key held pending"
        );
        self.store.record_pending_transfer(pending).await
    }

    pub async fn pending(&self, key: ClaimKey) -> Result<Option<PendingTransfer>, StoreError> {
        self.store.find_pending_transfer(key).await
    }

    pub async fn find(&self, source_tx_hash: TxHash, kind: LedgerKind) -> Result<Option<LedgerEntry>, StoreError> {
        self.store.find_ledger_entry(source_tx_hash, kind).await
    }

    /// Newest-first entries of one kind for an account.
    pub async fn history(
        &self,
        account_id: u64,
        kind: LedgerKind,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.store
            .list_ledger_entries(
                LedgerFilter::kind(kind).for_account(account_id),
                SortOrder::NewestFirst,
                limit,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryStore;
    use alloy::primitives::U256;

    fn ledger() -> ReconciliationLedger<MemoryStore> {
        ReconciliationLedger::new(Arc::new(MemoryStore::new(None)))
    }

    fn swap_entry(hash: TxHash) -> NewLedgerEntry {
        NewLedgerEntry {
            account_id: 1,
            kind: LedgerKind::Swap,
            amount: U256::from(10),
            token_symbol: "BRAIN".into(),
            external_ref: Some("ETH:1".into()),
            source_tx_hash: hash,
        }
    }

    #[tokio::test]
    async fn test_record_once_is_idempotent() {
        let ledger = ledger();
        let hash = TxHash::repeat_byte(0x33);

        let first = ledger.record_once(swap_entry(hash)).await.unwrap();
        let second = ledger.record_once(swap_entry(hash)).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.entry.id, second.entry.id);
    }

    #[test]
    fn test_reservation_exclusive_and_released_on_drop() {
        let ledger = ledger();
        let key = ClaimKey::Account(5, LedgerKind::Faucet);

        let held = ledger.reserve(key).unwrap();
        assert!(ledger.reserve(key).is_none());
        assert!(ledger.reserve(ClaimKey::Account(6, LedgerKind::Faucet)).is_some());

        drop(held);
        assert!(!ledger.is_reserved(&key));
        assert!(ledger.reserve(key).is_some());
    }

    #[test]
    fn test_poisoned_reservation_stays_held() {
        let ledger = ledger();
        let key = ClaimKey::Source(TxHash::repeat_byte(1), LedgerKind::Swap);

        ledger.reserve(key).unwrap().poison();
        assert!(ledger.is_reserved(&key));
        assert!(ledger.reserve(key).is_none());
    }

    #[tokio::test]
    async fn test_pending_transfer_blocks_key() {
        let ledger = ledger();
        let key = ClaimKey::Source(TxHash::repeat_byte(4), LedgerKind::Swap);
        let reservation = ledger.reserve(key).unwrap();

        ledger
            .hold_pending(
                reservation,
                PendingTransfer {
                    key,
                    account_id: 1,
                    amount: U256::from(10),
                    transfer_tx_hash: Some(TxHash::repeat_byte(5)),
                    created_at: 1,
                },
            )
            .await
            .unwrap();

        assert!(ledger.reserve(key).is_none());
        let pending = ledger.pending(key).await.unwrap().unwrap();
        assert_eq!(pending.transfer_tx_hash, Some(TxHash::repeat_byte(5)));
        assert!(ledger
            .pending(ClaimKey::Account(1, LedgerKind::Faucet))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_history_filters_account_and_kind() {
        let ledger = ledger();
        ledger.record_once(swap_entry(TxHash::repeat_byte(1))).await.unwrap();
        let mut other = swap_entry(TxHash::repeat_byte(2));
        other.account_id = 2;
        ledger.record_once(other).await.unwrap();

        let history = ledger.history(1, LedgerKind::Swap, 20).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(ledger.find(TxHash::repeat_byte(2), LedgerKind::Swap).await.unwrap().is_some());
    }
}
