//! Persistence port for accounts and ledger entries.

use alloy::primitives::TxHash;
use std::future::Future;

use crate::ledger::types::{
    Account, AccountFilter, AccountUpdate, ClaimKey, LedgerEntry, LedgerFilter, LedgerKind, NewLedgerEntry,
    PendingTransfer, SortOrder,
};

/// Port for the relational store behind the relay.
///
/// Implementations:
/// - `MemoryStore` (DashMap with JSON snapshot persistence)
pub trait Store: Send + Sync + 'static {
    fn find_account(&self, id: u64) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Seed an account (registration happens outside the relay).
    fn insert_account(&self, account: Account) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Apply an update atomically, returning the new state.
    ///
    /// Rejected with [`StoreError::InvariantViolation`] if the result would
    /// have `has_claimed` without a claim timestamp and hash.
    fn update_account(
        &self,
        id: u64,
        update: AccountUpdate,
    ) -> impl Future<Output = Result<Account, StoreError>> + Send;

    fn count_accounts(&self, filter: AccountFilter) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Insert a new entry. Unique on `(source_tx_hash, kind)`: a second
    /// insert fails with [`StoreError::Duplicate`].
    fn create_ledger_entry(
        &self,
        entry: NewLedgerEntry,
    ) -> impl Future<Output = Result<LedgerEntry, StoreError>> + Send;

    fn find_ledger_entry(
        &self,
        source_tx_hash: TxHash,
        kind: LedgerKind,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, StoreError>> + Send;

    fn count_ledger_entries(
        &self,
        filter: LedgerFilter,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn list_ledger_entries(
        &self,
        filter: LedgerFilter,
        order: SortOrder,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>, StoreError>> + Send;

    /// Remember a transfer whose outcome is unknown. Replaces any earlier
    /// record for the same key.
    fn record_pending_transfer(
        &self,
        pending: PendingTransfer,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn find_pending_transfer(
        &self,
        key: ClaimKey,
    ) -> impl Future<Output = Result<Option<PendingTransfer>, StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("account not found: {0}")]
    AccountNotFound(u64),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
