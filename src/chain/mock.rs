//! In-memory [`ContractGateway`] for tests and local demos.
//!
//! Models just enough contract behaviour for the relay: token balances move
//! on transfers, questions get sequential ids and emit events, and accepted
//! answers cannot be accepted twice. Failures are injected explicitly.

use alloy::primitives::{keccak256, Address, LogData, TxHash, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::chain::contracts::IQnA;
use crate::chain::gateway::{ContractAddresses, ContractCall, ContractGateway, NetworkInfo};
use crate::chain::revert::{normalize_reason, RevertCode, RevertKind};
use crate::chain::types::{
    BlockStatus, ChainError, ChainResult, ConfirmationStatus, ObservedTransaction, QuestionRecord,
    TxOutcome,
};

/// Failure returned by the next submissions until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Known revert.
    Reject(RevertKind),
    /// Unrecognized revert.
    Revert,
    /// Revert carrying an `Error(string)` reason, as a node reports it.
    RevertReason(&'static str),
    /// Mined but not confirmed in time.
    ConfirmationTimeout,
    /// Signed and sent, but the node never acknowledged it.
    SendTimeout,
    /// Node unreachable.
    Rpc,
}

#[derive(Debug, Default)]
struct MockState {
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    faucet_amount: U256,
    swap_rate: U256,
    questions: BTreeMap<u64, QuestionRecord>,
    next_answer_id: u64,
    unreadable_questions: HashSet<u64>,
    claimed_wallets: HashSet<Address>,
    transactions: HashMap<TxHash, ObservedTransaction>,
    confirmations: HashMap<TxHash, ConfirmationStatus>,
    fail_reads: bool,
    failure: Option<MockFailure>,
    log_override: Option<Vec<Log>>,
    submitted: Vec<ContractCall>,
    tx_counter: u64,
    block_number: u64,
}

/// Deterministic in-memory gateway.
pub struct MockGateway {
    backend: Address,
    addresses: ContractAddresses,
    chain_id: u64,
    submit_delay: Option<Duration>,
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            backend: Address::repeat_byte(0xBE),
            addresses: ContractAddresses {
                qna: Address::repeat_byte(0x0A),
                token: Address::repeat_byte(0x0B),
                swap: Address::repeat_byte(0x0C),
            },
            chain_id: 31337,
            submit_delay: None,
            state: Mutex::new(MockState {
                swap_rate: U256::from(1),
                block_number: 1,
                next_answer_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Hold every submission for `delay` before it takes effect, widening
    /// race windows in concurrency tests.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn backend(&self) -> Address {
        self.backend
    }

    pub async fn set_native_balance(&self, address: Address, amount: U256) {
        self.state.lock().await.native.insert(address, amount);
    }

    pub async fn set_token_balance(&self, address: Address, amount: U256) {
        self.state.lock().await.tokens.insert(address, amount);
    }

    pub async fn token_balance_of(&self, address: Address) -> U256 {
        self.state.lock().await.tokens.get(&address).copied().unwrap_or_default()
    }

    pub async fn set_faucet_amount(&self, amount: U256) {
        self.state.lock().await.faucet_amount = amount;
    }

    pub async fn set_swap_rate(&self, rate: U256) {
        self.state.lock().await.swap_rate = rate;
    }

    pub async fn insert_question(&self, question: QuestionRecord) {
        self.state.lock().await.questions.insert(question.id, question);
    }

    /// Make `id` count toward `question_count` but fail to read.
    pub async fn make_question_unreadable(&self, id: u64) {
        self.state.lock().await.unreadable_questions.insert(id);
    }

    /// Register a transaction the node knows about, confirmed by default.
    pub async fn insert_transaction(&self, tx: ObservedTransaction) {
        let mut state = self.state.lock().await;
        state.block_number += 1;
        let block_number = state.block_number;
        state
            .confirmations
            .insert(tx.hash, ConfirmationStatus::Confirmed { block_number });
        state.transactions.insert(tx.hash, tx);
    }

    pub async fn set_confirmation(&self, hash: TxHash, status: ConfirmationStatus) {
        self.state.lock().await.confirmations.insert(hash, status);
    }

    pub async fn mark_wallet_claimed(&self, wallet: Address) {
        self.state.lock().await.claimed_wallets.insert(wallet);
    }

    pub async fn set_fail_reads(&self, fail: bool) {
        self.state.lock().await.fail_reads = fail;
    }

    pub async fn set_failure(&self, failure: Option<MockFailure>) {
        self.state.lock().await.failure = failure;
    }

    /// Replace the logs of subsequent successful submissions.
    pub async fn set_log_override(&self, logs: Option<Vec<Log>>) {
        self.state.lock().await.log_override = logs;
    }

    /// Successful submissions, in order.
    pub async fn submitted(&self) -> Vec<ContractCall> {
        self.state.lock().await.submitted.clone()
    }

    /// Successful token transfers, in order.
    pub async fn transfers(&self) -> Vec<(Address, U256)> {
        self.state
            .lock()
            .await
            .submitted
            .iter()
            .filter_map(|call| match call {
                ContractCall::TransferToken { to, amount } => Some((*to, *amount)),
                _ => None,
            })
            .collect()
    }

    async fn read_guard(&self) -> ChainResult<tokio::sync::MutexGuard<'_, MockState>> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(ChainError::Rpc("mock read failure".to_string()));
        }
        Ok(state)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn rpc_log(address: Address, data: LogData) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        ..Default::default()
    }
}

fn debit(balances: &mut HashMap<Address, U256>, who: Address, amount: U256) -> ChainResult<()> {
    let balance = balances.entry(who).or_default();
    if *balance < amount {
        return Err(ChainError::Rejected {
            kind: RevertKind::InsufficientBalance,
            tx_hash: None,
        });
    }
    *balance -= amount;
    Ok(())
}

fn credit(balances: &mut HashMap<Address, U256>, who: Address, amount: U256) {
    let balance = balances.entry(who).or_default();
    *balance = balance.saturating_add(amount);
}

fn invalid_id() -> ChainError {
    ChainError::Rejected {
        kind: RevertKind::InvalidId,
        tx_hash: None,
    }
}

impl MockState {
    /// Apply a call's effects, returning the logs it emits.
    fn apply(
        &mut self,
        call: &ContractCall,
        backend: Address,
        addresses: &ContractAddresses,
    ) -> ChainResult<Vec<Log>> {
        let mut logs = Vec::new();
        match call {
            ContractCall::AskQuestion {
                token,
                bounty,
                deadline,
                uri,
            }
            | ContractCall::AskQuestionOnBehalf {
                token,
                bounty,
                deadline,
                uri,
                ..
            } => {
                let asker = match call {
                    ContractCall::AskQuestionOnBehalf { asker, .. } => *asker,
                    _ => backend,
                };
                let id = self.questions.keys().next_back().copied().unwrap_or(0) + 1;
                self.questions.insert(
                    id,
                    QuestionRecord {
                        id,
                        asker,
                        token: *token,
                        bounty: *bounty,
                        deadline: *deadline,
                        uri: uri.clone(),
                        answered: false,
                    },
                );
                let event = IQnA::QuestionAsked {
                    questionId: U256::from(id),
                    asker,
                    token: *token,
                    bounty: *bounty,
                    deadline: U256::from(*deadline),
                    uri: uri.clone(),
                };
                logs.push(rpc_log(addresses.qna, event.encode_log_data()));
            }
            ContractCall::AnswerQuestion { question_id, uri }
            | ContractCall::AnswerQuestionOnBehalf { question_id, uri, .. } => {
                let question = self.questions.get(question_id).ok_or_else(invalid_id)?;
                if question.answered {
                    return Err(ChainError::Rejected {
                        kind: RevertKind::NotOpen,
                        tx_hash: None,
                    });
                }
                let answerer = match call {
                    ContractCall::AnswerQuestionOnBehalf { answerer, .. } => *answerer,
                    _ => backend,
                };
                let answer_id = self.next_answer_id;
                self.next_answer_id += 1;
                let event = IQnA::AnswerPosted {
                    questionId: U256::from(*question_id),
                    answerId: U256::from(answer_id),
                    answerer,
                    uri: uri.clone(),
                };
                logs.push(rpc_log(addresses.qna, event.encode_log_data()));
            }
            ContractCall::AcceptAnswer {
                question_id,
                answer_id,
            } => {
                let question = self.questions.get_mut(question_id).ok_or_else(invalid_id)?;
                if question.answered {
                    return Err(ChainError::Rejected {
                        kind: RevertKind::AlreadyAccepted,
                        tx_hash: None,
                    });
                }
                if *answer_id == 0 || *answer_id >= self.next_answer_id {
                    return Err(invalid_id());
                }
                question.answered = true;
                let event = IQnA::AnswerAccepted {
                    questionId: U256::from(*question_id),
                    answerId: U256::from(*answer_id),
                    answerer: Address::ZERO,
                    bounty: question.bounty,
                };
                logs.push(rpc_log(addresses.qna, event.encode_log_data()));
            }
            ContractCall::AddBounty {
                question_id, amount, ..
            }
            | ContractCall::AddBountyOnBehalf {
                question_id, amount, ..
            }
            | ContractCall::FundBounty {
                question_id, amount,
            } => {
                let question = self.questions.get_mut(question_id).ok_or_else(invalid_id)?;
                question.bounty = question.bounty.saturating_add(*amount);
                let event = IQnA::BountyAdded {
                    questionId: U256::from(*question_id),
                    funder: backend,
                    amount: *amount,
                };
                logs.push(rpc_log(addresses.qna, event.encode_log_data()));
            }
            ContractCall::ReduceBounty {
                question_id,
                new_amount,
            } => {
                let question = self.questions.get_mut(question_id).ok_or_else(invalid_id)?;
                question.bounty = *new_amount;
            }
            ContractCall::CancelQuestion { question_id } => {
                self.questions.remove(question_id).ok_or_else(invalid_id)?;
                let event = IQnA::QuestionCancelled {
                    questionId: U256::from(*question_id),
                };
                logs.push(rpc_log(addresses.qna, event.encode_log_data()));
            }
            ContractCall::ApproveToken { spender, amount } => {
                self.allowances.insert((backend, *spender), *amount);
            }
            ContractCall::TransferToken { to, amount } => {
                debit(&mut self.tokens, backend, *amount)?;
                credit(&mut self.tokens, *to, *amount);
            }
            ContractCall::SetFaucetAmount { amount } => self.faucet_amount = *amount,
            ContractCall::SetSwapRate { rate } => self.swap_rate = *rate,
            ContractCall::WithdrawToken { amount } => {
                debit(&mut self.tokens, addresses.swap, *amount)?;
                credit(&mut self.tokens, backend, *amount);
            }
            ContractCall::WithdrawNative => {
                let amount = self.native.remove(&addresses.swap).unwrap_or_default();
                credit(&mut self.native, backend, amount);
            }
        }
        Ok(logs)
    }
}

impl ContractGateway for MockGateway {
    fn backend_address(&self) -> Address {
        self.backend
    }

    fn addresses(&self) -> ContractAddresses {
        self.addresses
    }

    async fn network(&self) -> ChainResult<NetworkInfo> {
        let state = self.read_guard().await?;
        Ok(NetworkInfo {
            chain_id: self.chain_id,
            block_number: state.block_number,
        })
    }

    async fn native_balance(&self, address: Address) -> ChainResult<U256> {
        Ok(self.read_guard().await?.native.get(&address).copied().unwrap_or_default())
    }

    async fn token_balance(&self, owner: Address) -> ChainResult<U256> {
        Ok(self.read_guard().await?.tokens.get(&owner).copied().unwrap_or_default())
    }

    async fn token_allowance(&self, owner: Address, spender: Address) -> ChainResult<U256> {
        Ok(self
            .read_guard()
            .await?
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn question_count(&self) -> ChainResult<u64> {
        let state = self.read_guard().await?;
        let highest = state.questions.keys().next_back().copied().unwrap_or(0);
        let unreadable = state.unreadable_questions.iter().max().copied().unwrap_or(0);
        Ok(highest.max(unreadable))
    }

    async fn question(&self, id: u64) -> ChainResult<QuestionRecord> {
        let state = self.read_guard().await?;
        if state.unreadable_questions.contains(&id) {
            return Err(ChainError::Decode(format!("question {} unreadable", id)));
        }
        state.questions.get(&id).cloned().ok_or_else(invalid_id)
    }

    async fn bounty_of(&self, id: u64) -> ChainResult<U256> {
        let state = self.read_guard().await?;
        state.questions.get(&id).map(|q| q.bounty).ok_or_else(invalid_id)
    }

    async fn faucet_amount(&self) -> ChainResult<U256> {
        Ok(self.read_guard().await?.faucet_amount)
    }

    async fn swap_rate(&self) -> ChainResult<U256> {
        Ok(self.read_guard().await?.swap_rate)
    }

    async fn swap_amount(&self, native_amount: U256) -> ChainResult<U256> {
        Ok(native_amount.saturating_mul(self.read_guard().await?.swap_rate))
    }

    async fn swap_pool_balance(&self) -> ChainResult<U256> {
        let state = self.read_guard().await?;
        Ok(state.tokens.get(&self.addresses.swap).copied().unwrap_or_default())
    }

    async fn has_wallet_claimed(&self, wallet: Address) -> ChainResult<bool> {
        Ok(self.read_guard().await?.claimed_wallets.contains(&wallet))
    }

    async fn transaction(&self, hash: TxHash) -> ChainResult<Option<ObservedTransaction>> {
        Ok(self.read_guard().await?.transactions.get(&hash).cloned())
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> ChainResult<ConfirmationStatus> {
        let state = self.read_guard().await?;
        match state.confirmations.get(&hash) {
            Some(status) => Ok(status.clone()),
            None => Err(ChainError::ConfirmationTimeout {
                tx_hash: hash,
                waited_secs: 0,
            }),
        }
    }

    async fn submit(&self, call: ContractCall) -> ChainResult<TxOutcome> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        state.tx_counter += 1;
        let tx_hash = keccak256(state.tx_counter.to_be_bytes());

        match state.failure {
            Some(MockFailure::Reject(kind)) => {
                return Err(ChainError::Rejected {
                    kind,
                    tx_hash: Some(tx_hash),
                })
            }
            Some(MockFailure::Revert) => {
                return Err(ChainError::Reverted {
                    tx_hash: Some(tx_hash),
                    code: None,
                })
            }
            Some(MockFailure::RevertReason(reason)) => {
                return Err(ChainError::Reverted {
                    tx_hash: Some(tx_hash),
                    code: Some(RevertCode::Reason(normalize_reason(reason))),
                })
            }
            Some(MockFailure::ConfirmationTimeout) => {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: 0,
                })
            }
            Some(MockFailure::SendTimeout) => return Err(ChainError::SendTimeout(0)),
            Some(MockFailure::Rpc) => return Err(ChainError::Rpc("mock node unreachable".to_string())),
            None => {}
        }

        let logs = state.apply(&call, self.backend, &self.addresses)?;
        let logs = state.log_override.clone().unwrap_or(logs);

        state.block_number += 1;
        let block_number = state.block_number;
        state.submitted.push(call);

        Ok(TxOutcome {
            tx_hash,
            block_number,
            status: BlockStatus::Success,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let mock = MockGateway::new();
        let user = Address::repeat_byte(0x77);
        mock.set_token_balance(mock.backend(), U256::from(100)).await;

        mock.submit(ContractCall::TransferToken { to: user, amount: U256::from(40) })
            .await
            .unwrap();

        assert_eq!(mock.token_balance_of(mock.backend()).await, U256::from(60));
        assert_eq!(mock.token_balance_of(user).await, U256::from(40));
        assert_eq!(mock.transfers().await, vec![(user, U256::from(40))]);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_effect() {
        let mock = MockGateway::new();
        let err = mock
            .submit(ContractCall::TransferToken { to: Address::ZERO, amount: U256::from(1) })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::Rejected { kind: RevertKind::InsufficientBalance, .. }
        ));
        assert!(mock.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_ask_emits_sequential_ids() {
        let mock = MockGateway::new();
        let ask = ContractCall::AskQuestion {
            token: Address::ZERO,
            bounty: U256::from(1),
            deadline: 0,
            uri: "ipfs://q".to_string(),
        };
        mock.submit(ask.clone()).await.unwrap();
        let outcome = mock.submit(ask).await.unwrap();

        assert_eq!(outcome.logs.len(), 1);
        assert_eq!(mock.question_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mock = MockGateway::new();
        mock.set_failure(Some(MockFailure::ConfirmationTimeout)).await;
        let err = mock.submit(ContractCall::WithdrawNative).await.unwrap_err();
        assert!(matches!(err, ChainError::ConfirmationTimeout { .. }));

        mock.set_fail_reads(true).await;
        assert!(mock.swap_rate().await.is_err());
    }
}
