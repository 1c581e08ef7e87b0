//! On-chain reconciliation layer for a Q&A bounty platform.
//!
//! Reads contract state, signs and confirms backend transactions, and keeps a
//! ledger that guarantees each faucet grant and each swap deposit pays out at
//! most once.

pub mod admin;
pub mod chain;
pub mod config;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{Relay, RelayError};
