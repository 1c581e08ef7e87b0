//! Chain-specific types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::Log;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::chain::revert::{RevertCode, RevertKind};
use crate::config::BlockchainConfig;

/// Shared blockchain configuration.
pub type BlockchainConfigRef = Arc<BlockchainConfig>;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node did not acknowledge a signed transaction in time; it may or
    /// may not have been broadcast.
    #[error("Broadcast not acknowledged after {0} seconds")]
    SendTimeout(u64),

    /// Transaction was not confirmed within the bounded wait.
    #[error("Transaction {tx_hash} not confirmed after {waited_secs} seconds")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    /// Transaction (or its pre-flight simulation) reverted for an unrecognized reason.
    #[error("Transaction reverted{}", describe_revert(.tx_hash, .code))]
    Reverted {
        tx_hash: Option<TxHash>,
        code: Option<RevertCode>,
    },

    /// Transaction reverted for a known contract condition.
    #[error("{}", .kind.message())]
    Rejected {
        kind: RevertKind,
        tx_hash: Option<TxHash>,
    },

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Returned data did not match the contract interface.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing or malformed endpoint/address configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn describe_revert(tx_hash: &Option<TxHash>, code: &Option<RevertCode>) -> String {
    let mut out = String::new();
    if let Some(hash) = tx_hash {
        out.push_str(&format!(" ({})", hash));
    }
    if let Some(code) = code {
        out.push_str(&format!(": {}", code));
    }
    out
}

impl ChainError {
    /// Whether the failure happened after the transaction reached the chain
    /// (as opposed to a transport or configuration problem).
    pub fn is_on_chain(&self) -> bool {
        matches!(
            self,
            ChainError::Reverted { .. }
                | ChainError::Rejected { .. }
                | ChainError::ConfirmationTimeout { .. }
        )
    }

    /// A signed transaction may be on the network even though the call
    /// failed. Repeating the call could execute it twice.
    pub fn may_have_broadcast(&self) -> bool {
        matches!(self, ChainError::SendTimeout(_) | ChainError::ConfirmationTimeout { .. })
    }

    /// Hash of the transaction the error refers to, when known.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            ChainError::ConfirmationTimeout { tx_hash, .. } => Some(*tx_hash),
            ChainError::Reverted { tx_hash, .. } | ChainError::Rejected { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}

/// Result type for blockchain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction was mined and reverted.
    Failed(String),
}

/// Status of the block inclusion of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Success,
    Reverted,
}

/// Raw outcome of a confirmed submission, as seen by the gateway.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: BlockStatus,
    pub logs: Vec<Log>,
}

/// Result of a Signer operation, consumed synchronously by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransactionResult {
    pub transaction_hash: TxHash,
    pub confirmed: bool,
    pub block_status: BlockStatus,
    pub block_number: u64,
    /// Identifier decoded from an emitted event, when the call produces one.
    pub emitted_id: Option<u64>,
}

/// A transaction fetched by hash, reduced to the fields reconciliation trusts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTransaction {
    pub hash: TxHash,
    /// `None` for contract creations.
    pub to: Option<Address>,
    pub value: U256,
}

/// A question as stored by the Q&A contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u64,
    pub asker: Address,
    pub token: Address,
    pub bounty: U256,
    pub deadline: u64,
    pub uri: String,
    pub answered: bool,
}
