//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment (SERVER_SIGNER_PRIVATE_KEY) + config (RPC URL, addresses)
//!     → wallet.rs (key loading, nonce tracking)
//!     → client.rs (RPC reads with timeouts and failover)
//!     → transaction.rs (simulate, sign, broadcast, confirm)
//!     → rpc.rs (ContractGateway over the above)
//!
//! ContractGateway (gateway.rs)
//!     → reader.rs (fail-soft display reads)
//!     → signer.rs (state-changing calls, revert mapping, emitted ids)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Confirmation waits are bounded; nothing is resubmitted automatically

pub mod client;
pub mod contracts;
pub mod events;
pub mod gateway;
pub mod mock;
pub mod reader;
pub mod revert;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::ChainClient;
pub use gateway::{ContractAddresses, ContractCall, ContractGateway};
pub use reader::ChainReader;
pub use revert::RevertKind;
pub use rpc::RpcGateway;
pub use signer::Signer;
pub use types::{ChainError, ChainId, ChainResult, ChainTransactionResult};
pub use wallet::Wallet;
