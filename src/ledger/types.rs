//! Ledger and account records.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A platform account as far as reconciliation cares.
///
/// `has_claimed` implies `claimed_at` and `claim_tx_hash` are set; stores
/// refuse writes that break this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub primary_wallet: Option<Address>,
    pub has_claimed: bool,
    pub claimed_at: Option<u64>,
    pub claim_tx_hash: Option<TxHash>,
}

impl Account {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            primary_wallet: None,
            has_claimed: false,
            claimed_at: None,
            claim_tx_hash: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Address) -> Self {
        self.primary_wallet = Some(wallet);
        self
    }

    pub fn is_consistent(&self) -> bool {
        !self.has_claimed || (self.claimed_at.is_some() && self.claim_tx_hash.is_some())
    }
}

/// Partial account update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub primary_wallet: Option<Address>,
    pub has_claimed: Option<bool>,
    pub claimed_at: Option<u64>,
    pub claim_tx_hash: Option<TxHash>,
}

impl AccountUpdate {
    /// The update written after a confirmed faucet transfer.
    pub fn faucet_claimed(tx_hash: TxHash, at: u64) -> Self {
        Self {
            has_claimed: Some(true),
            claimed_at: Some(at),
            claim_tx_hash: Some(tx_hash),
            ..Default::default()
        }
    }

    pub fn apply(&self, account: &mut Account) {
        if let Some(wallet) = self.primary_wallet {
            account.primary_wallet = Some(wallet);
        }
        if let Some(claimed) = self.has_claimed {
            account.has_claimed = claimed;
        }
        if let Some(at) = self.claimed_at {
            account.claimed_at = Some(at);
        }
        if let Some(hash) = self.claim_tx_hash {
            account.claim_tx_hash = Some(hash);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub has_claimed: Option<bool>,
}

impl AccountFilter {
    pub fn claimed() -> Self {
        Self {
            has_claimed: Some(true),
        }
    }

    pub fn matches(&self, account: &Account) -> bool {
        self.has_claimed.map_or(true, |c| account.has_claimed == c)
    }
}

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Swap,
    Faucet,
    Reward,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Swap => "swap",
            LedgerKind::Faucet => "faucet",
            LedgerKind::Reward => "reward",
        }
    }
}

/// What an in-flight slot protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKey {
    /// A source transaction consumed once per kind (swap deposits).
    Source(TxHash, LedgerKind),
    /// A one-time grant per account (faucet).
    Account(u64, LedgerKind),
}

/// A transfer that was signed but whose outcome is unknown.
///
/// While one exists for a key, no further transfer is attempted for it;
/// an operator resolves it against the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransfer {
    pub key: ClaimKey,
    pub account_id: u64,
    pub amount: U256,
    pub transfer_tx_hash: Option<TxHash>,
    pub created_at: u64,
}

/// An immutable record of a completed value transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: u64,
    pub kind: LedgerKind,
    /// Smallest token unit.
    pub amount: U256,
    pub token_symbol: String,
    pub external_ref: Option<String>,
    pub source_tx_hash: TxHash,
    pub created_at: u64,
    /// Store-assigned insertion order; breaks ties in `created_at`.
    #[serde(default)]
    pub sequence: u64,
}

/// Payload for a new ledger entry. Id, timestamp, and sequence are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub account_id: u64,
    pub kind: LedgerKind,
    pub amount: U256,
    pub token_symbol: String,
    pub external_ref: Option<String>,
    pub source_tx_hash: TxHash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub account_id: Option<u64>,
    pub kind: Option<LedgerKind>,
}

impl LedgerFilter {
    pub fn kind(kind: LedgerKind) -> Self {
        Self {
            account_id: None,
            kind: Some(kind),
        }
    }

    pub fn for_account(mut self, account_id: u64) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.account_id.map_or(true, |id| entry.account_id == id)
            && self.kind.map_or(true, |k| entry.kind == k)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Result of an idempotent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// False when an entry for the same source already existed.
    pub created: bool,
    pub entry: LedgerEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_update_keeps_invariant() {
        let mut account = Account::new(1);
        assert!(account.is_consistent());

        AccountUpdate::faucet_claimed(TxHash::repeat_byte(1), 100).apply(&mut account);
        assert!(account.has_claimed);
        assert!(account.is_consistent());

        let broken = Account {
            has_claimed: true,
            ..Account::new(2)
        };
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_filters() {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id: 7,
            kind: LedgerKind::Swap,
            amount: U256::from(1),
            token_symbol: "BRAIN".into(),
            external_ref: None,
            source_tx_hash: TxHash::ZERO,
            created_at: 0,
            sequence: 0,
        };
        assert!(LedgerFilter::kind(LedgerKind::Swap).matches(&entry));
        assert!(!LedgerFilter::kind(LedgerKind::Faucet).matches(&entry));
        assert!(!LedgerFilter::kind(LedgerKind::Swap).for_account(8).matches(&entry));
        assert!(AccountFilter::claimed().matches(&Account {
            has_claimed: true,
            ..Account::new(1)
        }));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LedgerKind::Reward).unwrap(), "\"reward\"");
    }
}
