//! Reconciliation ledger.
//!
//! # Data Flow
//! ```text
//! relay (faucet / swap / reward)
//!     → reconcile.rs (reserve in-flight slot, record once)
//!     → store.rs (Store port)
//!     → memory.rs (DashMap + JSON snapshot)
//! ```
//!
//! # Invariants
//! - At most one ledger entry per `(source_tx_hash, kind)`
//! - Entries are written only after the matching transfer confirmed
//! - Entries are never updated or deleted
//! - A key with a pending transfer is never transferred for again
//! - With a persistence path, every mutation reaches disk before it returns

pub mod memory;
pub mod reconcile;
pub mod store;
pub mod types;

pub use memory::MemoryStore;
pub use reconcile::{ReconciliationLedger, Reservation};
pub use store::{Store, StoreError};
pub use types::{
    Account, AccountUpdate, ClaimKey, LedgerEntry, LedgerKind, NewLedgerEntry, PendingTransfer, RecordOutcome,
};
