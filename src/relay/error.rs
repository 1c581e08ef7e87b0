//! Orchestrator errors.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

use crate::chain::ChainError;
use crate::ledger::StoreError;

/// Why a faucet claim, swap, or admin operation did not go through.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Account {0} not found")]
    AccountNotFound(u64),

    #[error("Faucet already claimed for account {0}")]
    AlreadyClaimed(u64),

    #[error("A wallet address is required")]
    MissingWallet,

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid transaction hash '{0}'")]
    InvalidTransactionHash(String),

    #[error("Insufficient liquidity: need {required}, backend holds {available}")]
    InsufficientLiquidity { required: U256, available: U256 },

    #[error("Transaction {0} has already been processed")]
    DuplicateTransaction(TxHash),

    #[error("Transaction {0} not found")]
    TransactionNotFound(TxHash),

    #[error("Transaction {tx_hash} is not confirmed: {reason}")]
    TransactionNotConfirmed { tx_hash: TxHash, reason: String },

    #[error("Deposit was sent to {}, expected {expected}", display_recipient(.actual))]
    RecipientMismatch { expected: Address, actual: Option<Address> },

    #[error("Deposit carries no value")]
    ZeroValue,

    #[error("A transfer for this request may still be on its way{}; it will not be sent again", display_pending(.0))]
    TransferPending(Option<TxHash>),

    #[error("Swap output overflows")]
    AmountOverflow,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Rate must be greater than 0")]
    InvalidRate,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn display_recipient(actual: &Option<Address>) -> String {
    match actual {
        Some(address) => address.to_string(),
        None => "contract creation".to_string(),
    }
}

fn display_pending(tx_hash: &Option<TxHash>) -> String {
    match tx_hash {
        Some(hash) => format!(" ({})", hash),
        None => String::new(),
    }
}

impl RelayError {
    /// Metric label for the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::AccountNotFound(_) => "account_not_found",
            RelayError::AlreadyClaimed(_) => "already_claimed",
            RelayError::MissingWallet | RelayError::InvalidAddress(_) => "bad_wallet",
            RelayError::InvalidTransactionHash(_) => "bad_tx_hash",
            RelayError::InsufficientLiquidity { .. } => "insufficient_liquidity",
            RelayError::DuplicateTransaction(_) => "duplicate",
            RelayError::TransactionNotFound(_) => "tx_not_found",
            RelayError::TransactionNotConfirmed { .. } => "tx_not_confirmed",
            RelayError::RecipientMismatch { .. } => "recipient_mismatch",
            RelayError::ZeroValue => "zero_value",
            RelayError::TransferPending(_) => "transfer_pending",
            RelayError::AmountOverflow => "overflow",
            RelayError::InvalidAmount(_) | RelayError::InvalidRate => "invalid_input",
            RelayError::Chain(_) => "chain_error",
            RelayError::Store(_) => "store_error",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_mismatch_display() {
        let err = RelayError::RecipientMismatch {
            expected: Address::repeat_byte(0xBE),
            actual: None,
        };
        assert!(err.to_string().contains("contract creation"));
        assert_eq!(err.label(), "recipient_mismatch");
    }
}
