//! Transaction Signer: the only path that mutates contract state.
//!
//! Every operation builds a [`ContractCall`], hands it to the gateway
//! (simulate, sign, send, confirm), then turns the outcome into a
//! [`ChainTransactionResult`]. Known reverts come back as
//! [`ChainError::Rejected`]; everything else keeps its original error.

use alloy::primitives::{Address, U256};
use std::sync::Arc;

use crate::chain::events::extract_emitted_id;
use crate::chain::gateway::{ContractCall, ContractGateway};
use crate::chain::revert::classify;
use crate::chain::types::{ChainError, ChainResult, ChainTransactionResult};
use crate::observability::metrics;

/// Backend-signed contract operations.
pub struct Signer<G> {
    gateway: Arc<G>,
}

impl<G> Clone for Signer<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

/// Replace a generic revert with its mapped kind when the table knows it.
pub fn map_revert(err: ChainError) -> ChainError {
    match err {
        ChainError::Reverted {
            tx_hash,
            code: Some(code),
        } => match classify(&code) {
            Some(kind) => ChainError::Rejected { kind, tx_hash },
            None => ChainError::Reverted {
                tx_hash,
                code: Some(code),
            },
        },
        other => other,
    }
}

fn outcome_label(err: &ChainError) -> &'static str {
    match err {
        ChainError::Rejected { .. } | ChainError::Reverted { .. } => "reverted",
        ChainError::ConfirmationTimeout { .. } | ChainError::SendTimeout(_) => "timeout",
        _ => "failed",
    }
}

impl<G: ContractGateway> Signer<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub fn backend_address(&self) -> Address {
        self.gateway.backend_address()
    }

    /// Submit one call and wait for its confirmation.
    pub async fn execute(&self, call: ContractCall) -> ChainResult<ChainTransactionResult> {
        let name = call.name();
        let expected_event = call.emitted_event();

        let outcome = match self.gateway.submit(call).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let e = map_revert(e);
                let label = outcome_label(&e);
                metrics::record_transaction(name, label);
                match label {
                    "reverted" => tracing::warn!(call = name, error = %e, "Transaction reverted"),
                    "timeout" => tracing::warn!(call = name, error = %e, "Transaction confirmation timed out"),
                    _ => tracing::error!(call = name, error = %e, "Transaction submission failed"),
                }
                return Err(e);
            }
        };

        metrics::record_transaction(name, "confirmed");

        let mut emitted_id = None;
        if let Some(event) = expected_event {
            emitted_id = extract_emitted_id(&outcome.logs, self.gateway.addresses().qna, event);
            if emitted_id.is_none() {
                tracing::warn!(
                    call = name,
                    tx_hash = %outcome.tx_hash,
                    event = event.name(),
                    "Confirmed transaction carried no decodable identifier"
                );
            }
        }

        Ok(ChainTransactionResult {
            transaction_hash: outcome.tx_hash,
            confirmed: true,
            block_status: outcome.status,
            block_number: outcome.block_number,
            emitted_id,
        })
    }

    /// Ask as the backend. A zero `token` escrows a native bounty.
    pub async fn ask_question(
        &self,
        token: Address,
        bounty: U256,
        deadline: u64,
        uri: String,
    ) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AskQuestion {
            token,
            bounty,
            deadline,
            uri,
        })
        .await
    }

    pub async fn ask_question_on_behalf(
        &self,
        asker: Address,
        token: Address,
        bounty: U256,
        deadline: u64,
        uri: String,
    ) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AskQuestionOnBehalf {
            asker,
            token,
            bounty,
            deadline,
            uri,
        })
        .await
    }

    pub async fn add_bounty(
        &self,
        question_id: u64,
        amount: U256,
        native: bool,
    ) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AddBounty {
            question_id,
            amount,
            native,
        })
        .await
    }

    pub async fn add_bounty_on_behalf(
        &self,
        funder: Address,
        question_id: u64,
        amount: U256,
    ) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AddBountyOnBehalf {
            funder,
            question_id,
            amount,
        })
        .await
    }

    pub async fn reduce_bounty(&self, question_id: u64, new_amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::ReduceBounty {
            question_id,
            new_amount,
        })
        .await
    }

    pub async fn cancel_question(&self, question_id: u64) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::CancelQuestion { question_id }).await
    }

    pub async fn answer_question(&self, question_id: u64, uri: String) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AnswerQuestion { question_id, uri }).await
    }

    pub async fn answer_question_on_behalf(
        &self,
        answerer: Address,
        question_id: u64,
        uri: String,
    ) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AnswerQuestionOnBehalf {
            answerer,
            question_id,
            uri,
        })
        .await
    }

    /// Accept an answer as admin, releasing the bounty to the answerer.
    pub async fn accept_answer(&self, question_id: u64, answer_id: u64) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::AcceptAnswer {
            question_id,
            answer_id,
        })
        .await
    }

    pub async fn fund_bounty(&self, question_id: u64, amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::FundBounty { question_id, amount }).await
    }

    pub async fn approve_token(&self, spender: Address, amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::ApproveToken { spender, amount }).await
    }

    pub async fn transfer_token(&self, to: Address, amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::TransferToken { to, amount }).await
    }

    pub async fn set_faucet_amount(&self, amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::SetFaucetAmount { amount }).await
    }

    pub async fn set_swap_rate(&self, rate: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::SetSwapRate { rate }).await
    }

    pub async fn withdraw_token(&self, amount: U256) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::WithdrawToken { amount }).await
    }

    pub async fn withdraw_native(&self) -> ChainResult<ChainTransactionResult> {
        self.execute(ContractCall::WithdrawNative).await
    }

    /// Current token allowance; a hard read, unlike the display reader.
    pub async fn token_allowance(&self, owner: Address, spender: Address) -> ChainResult<U256> {
        self.gateway.token_allowance(owner, spender).await
    }
}
