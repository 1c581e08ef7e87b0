//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Wallet → Gateway → Network check
//!     → Store snapshot → Relay → Listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Stop accepting → Drain in-flight requests → Save store snapshot
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
