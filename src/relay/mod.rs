//! Swap/Faucet Orchestrator.
//!
//! Composes the chain reader, the transaction signer, and the
//! reconciliation ledger into the user-facing flows:
//!
//! - faucet: one grant per account
//! - swap: one token transfer per native deposit
//! - reward: answer acceptance recorded against the answerer
//!
//! Each flow checks preconditions, performs at most one transfer, and
//! records the result only after the transfer confirmed.

pub mod error;
pub mod faucet;
pub mod reward;
pub mod service;
pub mod swap;

pub use error::{RelayError, RelayResult};
pub use faucet::{ClaimStatus, FaucetReceipt};
pub use reward::RewardReceipt;
pub use service::{AdminReceipt, AdminStatus, BalanceView, FaucetInfo, Relay, SwapQuote};
pub use swap::{SwapHistoryItem, SwapReceipt};
