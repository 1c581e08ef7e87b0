//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (RPC_URL, contract addresses, admin key)
//!     → validation.rs (semantic checks, all errors at once)
//!     → RelayConfig (validated, immutable)
//!     → shared by value / Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the signer and contract bindings are
//!   built from it exactly once
//! - All fields have defaults to allow minimal configs
//! - The signing key is read from the environment by the wallet, never here

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::BlockchainConfig;
pub use schema::ContractsConfig;
pub use schema::ObservabilityConfig;
pub use schema::RelayConfig;
pub use schema::RelaySettings;
