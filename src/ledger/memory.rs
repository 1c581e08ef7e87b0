//! In-memory store with JSON snapshot persistence.
//!
//! With a persistence path, every mutation rewrites the snapshot (temp file
//! then rename) before returning, so a crash never loses a recorded payout.

use alloy::primitives::TxHash;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::ledger::store::{Store, StoreError};
use crate::ledger::types::{
    now_secs, Account, AccountFilter, AccountUpdate, ClaimKey, LedgerEntry, LedgerFilter, LedgerKind,
    NewLedgerEntry, PendingTransfer, SortOrder,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    accounts: Vec<Account>,
    entries: Vec<LedgerEntry>,
    #[serde(default)]
    pending: Vec<PendingTransfer>,
}

/// Thread-safe store over `DashMap`s.
///
/// Ledger entries are keyed by `(source_tx_hash, kind)`, so the uniqueness
/// invariant is enforced by the map's entry API rather than a scan.
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<DashMap<u64, Account>>,
    entries: Arc<DashMap<(TxHash, LedgerKind), LedgerEntry>>,
    pending: Arc<DashMap<ClaimKey, PendingTransfer>>,
    sequence: Arc<AtomicU64>,
    persistence_path: Option<String>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            persistence_path,
            ..Default::default()
        }
    }

    /// Load from a snapshot file if it exists; start empty otherwise.
    ///
    /// Accounts are registered outside the relay. To seed them, write a
    /// snapshot before first start, e.g.
    /// `{"accounts":[{"id":1,"primaryWallet":null,"hasClaimed":false,"claimedAt":null,"claimTxHash":null}],"entries":[]}`,
    /// or call [`Store::insert_account`] from the embedding process.
    pub fn load_from_file(path: &str) -> Result<Self, StoreError> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let file = File::open(path)?;
            let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;

            let mut max_sequence = 0;
            for account in snapshot.accounts {
                store.accounts.insert(account.id, account);
            }
            for entry in snapshot.entries {
                max_sequence = max_sequence.max(entry.sequence);
                store.entries.insert((entry.source_tx_hash, entry.kind), entry);
            }
            for pending in snapshot.pending {
                tracing::warn!(key = ?pending.key, transfer_tx_hash = ?pending.transfer_tx_hash, "Unresolved pending transfer");
                store.pending.insert(pending.key, pending);
            }
            store.sequence.store(max_sequence + 1, Ordering::SeqCst);

            tracing::info!(
                accounts = store.accounts.len(),
                entries = store.entries.len(),
                path = path,
                "Loaded store snapshot"
            );
        }
        Ok(store)
    }

    /// Write a snapshot if a persistence path is configured.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        if let Some((accounts, entries)) = self.persist()? {
            tracing::info!(accounts = accounts, entries = entries, "Saved store snapshot");
        }
        Ok(())
    }

    /// Rewrite the snapshot atomically. Writers are serialized and each one
    /// snapshots after taking the lock, so the last write covers every
    /// mutation that finished before it.
    fn persist(&self) -> Result<Option<(usize, usize)>, StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(None);
        };
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Io("snapshot writer poisoned".to_string()))?;

        let snapshot = Snapshot {
            accounts: self.accounts.iter().map(|r| r.value().clone()).collect(),
            entries: self.entries.iter().map(|r| r.value().clone()).collect(),
            pending: self.pending.iter().map(|r| r.value().clone()).collect(),
        };

        let tmp = format!("{}.tmp", path);
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.to_string()))?
            .sync_all()?;
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path, entries = snapshot.entries.len(), "Store snapshot written");
        Ok(Some((snapshot.accounts.len(), snapshot.entries.len())))
    }
}

impl Store for MemoryStore {
    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|r| r.value().clone()))
    }

    async fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        if !account.is_consistent() {
            return Err(StoreError::InvariantViolation(format!(
                "account {} marked claimed without claim details",
                account.id
            )));
        }
        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(format!("account {}", account.id))),
            Entry::Vacant(slot) => {
                slot.insert(account);
            }
        }
        self.persist()?;
        Ok(())
    }

    async fn update_account(&self, id: u64, update: AccountUpdate) -> Result<Account, StoreError> {
        let next = {
            let mut current = self
                .accounts
                .get_mut(&id)
                .ok_or(StoreError::AccountNotFound(id))?;

            let mut next = current.clone();
            update.apply(&mut next);
            if !next.is_consistent() {
                return Err(StoreError::InvariantViolation(format!(
                    "account {} marked claimed without claim details",
                    id
                )));
            }
            *current = next.clone();
            next
        };
        self.persist()?;
        Ok(next)
    }

    async fn count_accounts(&self, filter: AccountFilter) -> Result<usize, StoreError> {
        Ok(self.accounts.iter().filter(|r| filter.matches(r.value())).count())
    }

    async fn create_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let record = match self.entries.entry((entry.source_tx_hash, entry.kind)) {
            Entry::Occupied(_) => {
                return Err(StoreError::Duplicate(format!(
                    "{} entry for {}",
                    entry.kind.as_str(),
                    entry.source_tx_hash
                )))
            }
            Entry::Vacant(slot) => {
                let record = LedgerEntry {
                    id: Uuid::new_v4(),
                    account_id: entry.account_id,
                    kind: entry.kind,
                    amount: entry.amount,
                    token_symbol: entry.token_symbol,
                    external_ref: entry.external_ref,
                    source_tx_hash: entry.source_tx_hash,
                    created_at: now_secs(),
                    sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
                };
                slot.insert(record.clone());
                record
            }
        };
        self.persist()?;
        Ok(record)
    }

    async fn find_ledger_entry(
        &self,
        source_tx_hash: TxHash,
        kind: LedgerKind,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.entries.get(&(source_tx_hash, kind)).map(|r| r.value().clone()))
    }

    async fn count_ledger_entries(&self, filter: LedgerFilter) -> Result<usize, StoreError> {
        Ok(self.entries.iter().filter(|r| filter.matches(r.value())).count())
    }

    async fn list_ledger_entries(
        &self,
        filter: LedgerFilter,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();

        entries.sort_by_key(|e| (e.created_at, e.sequence));
        if order == SortOrder::NewestFirst {
            entries.reverse();
        }
        entries.truncate(limit);
        Ok(entries)
    }

    async fn record_pending_transfer(&self, pending: PendingTransfer) -> Result<(), StoreError> {
        self.pending.insert(pending.key, pending);
        self.persist()?;
        Ok(())
    }

    async fn find_pending_transfer(&self, key: ClaimKey) -> Result<Option<PendingTransfer>, StoreError> {
        Ok(self.pending.get(&key).map(|r| r.value().clone()))
    }
}
