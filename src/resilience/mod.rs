//! Resilience helpers.
//!
//! Every external call already carries a deadline (see `chain::client`);
//! this module only supplies the polling schedule for confirmation waits.

pub mod backoff;
