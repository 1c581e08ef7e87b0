//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! request
//!     → server.rs (request id, trace, timeout, body limit, metrics)
//!     → auth.rs (X-Account-Id for account routes)
//!     → handlers.rs / admin (call into the relay)
//!     → response.rs (domain error → status + JSON body)
//! ```

pub mod auth;
pub mod handlers;
pub mod response;
pub mod server;

pub use auth::{AuthenticatedAccount, X_ACCOUNT_ID};
pub use response::{ApiError, ApiResult};
pub use server::{AppState, HttpServer};
