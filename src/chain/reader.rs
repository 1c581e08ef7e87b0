//! Fail-soft chain reads for display paths.
//!
//! Each query stands alone: a failure is logged, counted, and replaced by a
//! neutral value (zero or `None`). Nothing here is used to decide whether
//! value moves; the relay reads the gateway directly for that.

use alloy::primitives::{Address, U256};
use std::sync::Arc;

use crate::chain::gateway::ContractGateway;
use crate::chain::types::{ChainResult, QuestionRecord};
use crate::observability::metrics;

/// Read-only adapter over the contract gateway.
pub struct ChainReader<G> {
    gateway: Arc<G>,
}

impl<G> Clone for ChainReader<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

fn soft<T: Default>(op: &'static str, result: ChainResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(op = op, error = %e, "Chain read failed, using default");
            metrics::record_read_failure(op);
            T::default()
        }
    }
}

impl<G: ContractGateway> ChainReader<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Native balance; zero when unreadable.
    pub async fn native_balance(&self, address: Address) -> U256 {
        soft("native_balance", self.gateway.native_balance(address).await)
    }

    /// Token balance; zero when unreadable.
    pub async fn token_balance(&self, address: Address) -> U256 {
        soft("token_balance", self.gateway.token_balance(address).await)
    }

    pub async fn question_count(&self) -> u64 {
        soft("question_count", self.gateway.question_count().await)
    }

    pub async fn bounty_of(&self, id: u64) -> U256 {
        soft("bounty_of", self.gateway.bounty_of(id).await)
    }

    /// Native balance held by the Q&A contract (escrowed native bounties).
    pub async fn contract_balance(&self) -> U256 {
        let qna = self.gateway.addresses().qna;
        soft("contract_balance", self.gateway.native_balance(qna).await)
    }

    pub async fn faucet_amount(&self) -> U256 {
        soft("faucet_amount", self.gateway.faucet_amount().await)
    }

    pub async fn swap_rate(&self) -> U256 {
        soft("swap_rate", self.gateway.swap_rate().await)
    }

    pub async fn swap_pool_balance(&self) -> U256 {
        soft("swap_pool_balance", self.gateway.swap_pool_balance().await)
    }

    /// A single question; `None` on any read or decode failure.
    pub async fn question(&self, id: u64) -> Option<QuestionRecord> {
        match self.gateway.question(id).await {
            Ok(question) => Some(question),
            Err(e) => {
                tracing::warn!(question_id = id, error = %e, "Failed to read question");
                metrics::record_read_failure("question");
                None
            }
        }
    }

    /// Every readable question, ids `1..=count`, queried sequentially.
    ///
    /// Unreadable ids are skipped. Questions created during the scan may or
    /// may not appear.
    pub async fn list_all_questions(&self) -> Vec<QuestionRecord> {
        let count = self.question_count().await;
        let mut questions = Vec::with_capacity(count.min(1024) as usize);
        for id in 1..=count {
            if let Some(question) = self.question(id).await {
                questions.push(question);
            }
        }
        questions
    }
}
