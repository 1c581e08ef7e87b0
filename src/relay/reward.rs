//! Answer acceptance with a reward record.

use alloy::primitives::TxHash;
use serde::Serialize;

use crate::chain::ContractGateway;
use crate::ledger::{LedgerKind, NewLedgerEntry, Store};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::service::{format_token, Relay};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardReceipt {
    pub tx_hash: TxHash,
    pub question_id: u64,
    pub answer_id: u64,
    pub bounty: String,
    /// False when the acceptance had already been recorded.
    pub recorded: bool,
}

impl<G: ContractGateway, S: Store> Relay<G, S> {
    /// Accept `answer_id` on behalf of the platform and record the released
    /// bounty against `account_id` (the answerer's account).
    pub async fn accept_answer_with_reward(
        &self,
        account_id: u64,
        question_id: u64,
        answer_id: u64,
    ) -> RelayResult<RewardReceipt> {
        self.ledger
            .store()
            .find_account(account_id)
            .await?
            .ok_or(RelayError::AccountNotFound(account_id))?;

        let bounty = self.gateway.bounty_of(question_id).await?;
        let accepted = self.signer.accept_answer(question_id, answer_id).await?;

        let outcome = self
            .ledger
            .record_once(NewLedgerEntry {
                account_id,
                kind: LedgerKind::Reward,
                amount: bounty,
                token_symbol: self.settings.token_symbol.clone(),
                external_ref: Some(format!("Q:{}/A:{}", question_id, answer_id)),
                source_tx_hash: accepted.transaction_hash,
            })
            .await
            .inspect_err(|e| {
                tracing::error!(
                    tx_hash = %accepted.transaction_hash,
                    question_id = question_id,
                    error = %e,
                    "Answer accepted but reward not recorded"
                )
            })?;

        tracing::info!(
            account_id = account_id,
            question_id = question_id,
            answer_id = answer_id,
            bounty = %bounty,
            tx_hash = %accepted.transaction_hash,
            "Answer accepted"
        );

        Ok(RewardReceipt {
            tx_hash: accepted.transaction_hash,
            question_id,
            answer_id,
            bounty: format_token(bounty),
            recorded: outcome.created,
        })
    }
}
