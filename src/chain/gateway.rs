//! The contract gateway port.
//!
//! Every contract method the relay uses appears here once, with typed
//! parameters and returns. Reads are plain trait methods; every state change
//! is a [`ContractCall`] value passed to [`ContractGateway::submit`], which
//! is where gas ceilings, targets, and calldata are decided.
//!
//! Implementations:
//! - [`crate::chain::rpc::RpcGateway`] (alloy JSON-RPC)
//! - [`crate::chain::mock::MockGateway`] (in-memory, for tests)

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use std::future::Future;

use crate::chain::contracts::{IBrainToken, IFaucetSwap, IQnA};
use crate::chain::events::QnaEvent;
use crate::chain::types::{
    ChainError, ChainResult, ConfirmationStatus, ObservedTransaction, QuestionRecord, TxOutcome,
};
use crate::config::ContractsConfig;

/// Gas ceiling per complexity tier.
pub mod gas {
    pub const TRANSFER: u64 = 100_000;
    pub const APPROVE: u64 = 120_000;
    pub const ADMIN_SETTER: u64 = 200_000;
    pub const BOUNTY: u64 = 500_000;
    pub const ANSWER: u64 = 1_000_000;
    pub const ASK: u64 = 3_000_000;
}

/// Deployed contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub qna: Address,
    pub token: Address,
    pub swap: Address,
}

impl ContractAddresses {
    pub fn from_config(config: &ContractsConfig) -> ChainResult<Self> {
        Ok(Self {
            qna: parse_address("contracts.qna", &config.qna)?,
            token: parse_address("contracts.token", &config.token)?,
            swap: parse_address("contracts.swap", &config.swap)?,
        })
    }
}

fn parse_address(field: &str, value: &str) -> ChainResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| ChainError::Config(format!("{} is not a valid address '{}': {}", field, value, e)))
}

/// A state-changing contract call.
///
/// Question and answer ids are the contract's sequential ids. A zero `token`
/// on [`ContractCall::AskQuestion`] means a native-currency bounty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    AskQuestion {
        token: Address,
        bounty: U256,
        deadline: u64,
        uri: String,
    },
    AskQuestionOnBehalf {
        asker: Address,
        token: Address,
        bounty: U256,
        deadline: u64,
        uri: String,
    },
    AddBounty {
        question_id: u64,
        amount: U256,
        native: bool,
    },
    AddBountyOnBehalf {
        funder: Address,
        question_id: u64,
        amount: U256,
    },
    ReduceBounty {
        question_id: u64,
        new_amount: U256,
    },
    CancelQuestion {
        question_id: u64,
    },
    AnswerQuestion {
        question_id: u64,
        uri: String,
    },
    AnswerQuestionOnBehalf {
        answerer: Address,
        question_id: u64,
        uri: String,
    },
    AcceptAnswer {
        question_id: u64,
        answer_id: u64,
    },
    FundBounty {
        question_id: u64,
        amount: U256,
    },
    ApproveToken {
        spender: Address,
        amount: U256,
    },
    TransferToken {
        to: Address,
        amount: U256,
    },
    SetFaucetAmount {
        amount: U256,
    },
    SetSwapRate {
        rate: U256,
    },
    WithdrawToken {
        amount: U256,
    },
    WithdrawNative,
}

impl ContractCall {
    /// Operation name for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::AskQuestion { .. } => "ask_question",
            ContractCall::AskQuestionOnBehalf { .. } => "ask_question_on_behalf",
            ContractCall::AddBounty { .. } => "add_bounty",
            ContractCall::AddBountyOnBehalf { .. } => "add_bounty_on_behalf",
            ContractCall::ReduceBounty { .. } => "reduce_bounty",
            ContractCall::CancelQuestion { .. } => "cancel_question",
            ContractCall::AnswerQuestion { .. } => "answer_question",
            ContractCall::AnswerQuestionOnBehalf { .. } => "answer_question_on_behalf",
            ContractCall::AcceptAnswer { .. } => "accept_answer",
            ContractCall::FundBounty { .. } => "fund_bounty",
            ContractCall::ApproveToken { .. } => "approve_token",
            ContractCall::TransferToken { .. } => "transfer_token",
            ContractCall::SetFaucetAmount { .. } => "set_faucet_amount",
            ContractCall::SetSwapRate { .. } => "set_swap_rate",
            ContractCall::WithdrawToken { .. } => "withdraw_token",
            ContractCall::WithdrawNative => "withdraw_native",
        }
    }

    /// Contract the call is sent to.
    pub fn target(&self, addresses: &ContractAddresses) -> Address {
        match self {
            ContractCall::ApproveToken { .. } | ContractCall::TransferToken { .. } => addresses.token,
            ContractCall::SetFaucetAmount { .. }
            | ContractCall::SetSwapRate { .. }
            | ContractCall::WithdrawToken { .. }
            | ContractCall::WithdrawNative => addresses.swap,
            _ => addresses.qna,
        }
    }

    /// Native value attached to the call.
    pub fn value(&self) -> U256 {
        match self {
            ContractCall::AskQuestion { token, bounty, .. } if token.is_zero() => *bounty,
            ContractCall::AddBounty { amount, native: true, .. } => *amount,
            ContractCall::FundBounty { amount, .. } => *amount,
            _ => U256::ZERO,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            ContractCall::TransferToken { .. } => gas::TRANSFER,
            ContractCall::ApproveToken { .. } => gas::APPROVE,
            ContractCall::SetFaucetAmount { .. }
            | ContractCall::SetSwapRate { .. }
            | ContractCall::WithdrawToken { .. }
            | ContractCall::WithdrawNative => gas::ADMIN_SETTER,
            ContractCall::AddBounty { .. }
            | ContractCall::AddBountyOnBehalf { .. }
            | ContractCall::ReduceBounty { .. }
            | ContractCall::CancelQuestion { .. }
            | ContractCall::AcceptAnswer { .. }
            | ContractCall::FundBounty { .. } => gas::BOUNTY,
            ContractCall::AnswerQuestion { .. } | ContractCall::AnswerQuestionOnBehalf { .. } => {
                gas::ANSWER
            }
            ContractCall::AskQuestion { .. } | ContractCall::AskQuestionOnBehalf { .. } => gas::ASK,
        }
    }

    /// Event carrying the identifier this call creates, if any.
    pub fn emitted_event(&self) -> Option<QnaEvent> {
        match self {
            ContractCall::AskQuestion { .. } | ContractCall::AskQuestionOnBehalf { .. } => {
                Some(QnaEvent::QuestionAsked)
            }
            ContractCall::AnswerQuestion { .. } | ContractCall::AnswerQuestionOnBehalf { .. } => {
                Some(QnaEvent::AnswerPosted)
            }
            _ => None,
        }
    }

    /// ABI-encoded calldata.
    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            ContractCall::AskQuestion {
                token,
                bounty,
                deadline,
                uri,
            } => IQnA::askQuestionCall {
                token: *token,
                bounty: *bounty,
                deadline: U256::from(*deadline),
                uri: uri.clone(),
            }
            .abi_encode(),
            ContractCall::AskQuestionOnBehalf {
                asker,
                token,
                bounty,
                deadline,
                uri,
            } => IQnA::askQuestionOnBehalfCall {
                asker: *asker,
                token: *token,
                bounty: *bounty,
                deadline: U256::from(*deadline),
                uri: uri.clone(),
            }
            .abi_encode(),
            ContractCall::AddBounty {
                question_id, amount, ..
            } => IQnA::addBountyCall {
                questionId: U256::from(*question_id),
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::AddBountyOnBehalf {
                funder,
                question_id,
                amount,
            } => IQnA::addBountyOnBehalfCall {
                funder: *funder,
                questionId: U256::from(*question_id),
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::ReduceBounty {
                question_id,
                new_amount,
            } => IQnA::reduceBountyAsAdminCall {
                questionId: U256::from(*question_id),
                newAmount: *new_amount,
            }
            .abi_encode(),
            ContractCall::CancelQuestion { question_id } => IQnA::cancelQuestionAsAdminCall {
                questionId: U256::from(*question_id),
            }
            .abi_encode(),
            ContractCall::AnswerQuestion { question_id, uri } => IQnA::answerQuestionCall {
                questionId: U256::from(*question_id),
                uri: uri.clone(),
            }
            .abi_encode(),
            ContractCall::AnswerQuestionOnBehalf {
                answerer,
                question_id,
                uri,
            } => IQnA::answerQuestionOnBehalfCall {
                answerer: *answerer,
                questionId: U256::from(*question_id),
                uri: uri.clone(),
            }
            .abi_encode(),
            ContractCall::AcceptAnswer {
                question_id,
                answer_id,
            } => IQnA::acceptAnswerAsAdminCall {
                questionId: U256::from(*question_id),
                answerId: U256::from(*answer_id),
            }
            .abi_encode(),
            ContractCall::FundBounty { question_id, .. } => IQnA::fundBountyCall {
                questionId: U256::from(*question_id),
            }
            .abi_encode(),
            ContractCall::ApproveToken { spender, amount } => IBrainToken::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::TransferToken { to, amount } => IBrainToken::transferCall {
                to: *to,
                amount: *amount,
            }
            .abi_encode(),
            ContractCall::SetFaucetAmount { amount } => {
                IFaucetSwap::setFaucetAmountCall { amount: *amount }.abi_encode()
            }
            ContractCall::SetSwapRate { rate } => IFaucetSwap::setSwapRateCall { rate: *rate }.abi_encode(),
            ContractCall::WithdrawToken { amount } => {
                IFaucetSwap::withdrawBrainCall { amount: *amount }.abi_encode()
            }
            ContractCall::WithdrawNative => IFaucetSwap::withdrawEthCall {}.abi_encode(),
        };
        Bytes::from(encoded)
    }
}

/// Chain identity as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub block_number: u64,
}

/// Port for the deployed contracts and the backend wallet.
pub trait ContractGateway: Send + Sync + 'static {
    /// Address of the backend signing wallet.
    fn backend_address(&self) -> Address;

    fn addresses(&self) -> ContractAddresses;

    fn network(&self) -> impl Future<Output = ChainResult<NetworkInfo>> + Send;

    fn native_balance(&self, address: Address) -> impl Future<Output = ChainResult<U256>> + Send;

    fn token_balance(&self, owner: Address) -> impl Future<Output = ChainResult<U256>> + Send;

    fn token_allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = ChainResult<U256>> + Send;

    fn question_count(&self) -> impl Future<Output = ChainResult<u64>> + Send;

    fn question(&self, id: u64) -> impl Future<Output = ChainResult<QuestionRecord>> + Send;

    fn bounty_of(&self, id: u64) -> impl Future<Output = ChainResult<U256>> + Send;

    /// Tokens granted per faucet claim, read live from the swap contract.
    fn faucet_amount(&self) -> impl Future<Output = ChainResult<U256>> + Send;

    /// Tokens per wei of native deposit.
    fn swap_rate(&self) -> impl Future<Output = ChainResult<U256>> + Send;

    /// Contract-side quote for a native amount.
    fn swap_amount(&self, native_amount: U256) -> impl Future<Output = ChainResult<U256>> + Send;

    /// Token balance held by the swap contract.
    fn swap_pool_balance(&self) -> impl Future<Output = ChainResult<U256>> + Send;

    fn has_wallet_claimed(&self, wallet: Address) -> impl Future<Output = ChainResult<bool>> + Send;

    /// Fetch a transaction by hash; `None` if the node does not know it.
    fn transaction(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = ChainResult<Option<ObservedTransaction>>> + Send;

    /// Wait (bounded) for an arbitrary transaction to confirm.
    fn wait_for_confirmation(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = ChainResult<ConfirmationStatus>> + Send;

    /// Sign, submit, and confirm a state-changing call.
    fn submit(&self, call: ContractCall) -> impl Future<Output = ChainResult<TxOutcome>> + Send;
}
