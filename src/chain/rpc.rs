//! JSON-RPC implementation of [`ContractGateway`].

use alloy::consensus::Transaction as _;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use std::sync::Arc;

use crate::chain::client::ChainClient;
use crate::chain::contracts::{IBrainToken, IFaucetSwap, IQnA};
use crate::chain::gateway::{ContractAddresses, ContractCall, ContractGateway, NetworkInfo};
use crate::chain::revert::RevertKind;
use crate::chain::transaction::{PreparedCall, TxSubmitter};
use crate::chain::types::{
    ChainError, ChainResult, ConfirmationStatus, ObservedTransaction, QuestionRecord, TxOutcome,
};
use crate::chain::wallet::Wallet;
use crate::config::RelayConfig;

/// Gateway backed by a live node and the backend wallet.
#[derive(Debug, Clone)]
pub struct RpcGateway {
    submitter: TxSubmitter,
    addresses: ContractAddresses,
}

impl RpcGateway {
    pub fn new(submitter: TxSubmitter, addresses: ContractAddresses) -> Self {
        Self { submitter, addresses }
    }

    /// Build the client, submitter, and bindings from validated config.
    pub async fn connect(config: &RelayConfig, wallet: Wallet) -> ChainResult<Self> {
        let addresses = ContractAddresses::from_config(&config.contracts)?;
        let client = ChainClient::new(Arc::new(config.blockchain.clone())).await?;
        let submitter = TxSubmitter::new(client, wallet)?;

        tracing::info!(
            qna = %addresses.qna,
            token = %addresses.token,
            swap = %addresses.swap,
            backend = %submitter.address(),
            "Contract gateway ready"
        );

        Ok(Self::new(submitter, addresses))
    }

    fn client(&self) -> &ChainClient {
        self.submitter.client()
    }

    /// Encode a view call, execute it, and decode the return value.
    async fn view<C: SolCall + Send>(&self, to: Address, call: C) -> ChainResult<C::Return>
    where
        C::Return: Send,
    {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let output = self.client().call(&tx, None).await?;
        C::abi_decode_returns(&output)
            .map_err(|e| ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }
}

impl ContractGateway for RpcGateway {
    fn backend_address(&self) -> Address {
        self.submitter.address()
    }

    fn addresses(&self) -> ContractAddresses {
        self.addresses
    }

    async fn network(&self) -> ChainResult<NetworkInfo> {
        let chain_id = self.client().get_chain_id().await?;
        let block_number = self.client().get_block_number().await?;
        Ok(NetworkInfo {
            chain_id: chain_id.0,
            block_number,
        })
    }

    async fn native_balance(&self, address: Address) -> ChainResult<U256> {
        self.client().get_balance(address).await
    }

    async fn token_balance(&self, owner: Address) -> ChainResult<U256> {
        self.view(self.addresses.token, IBrainToken::balanceOfCall { account: owner })
            .await
    }

    async fn token_allowance(&self, owner: Address, spender: Address) -> ChainResult<U256> {
        self.view(self.addresses.token, IBrainToken::allowanceCall { owner, spender })
            .await
    }

    async fn question_count(&self) -> ChainResult<u64> {
        let count = self.view(self.addresses.qna, IQnA::questionCountCall {}).await?;
        u64::try_from(count).map_err(|_| ChainError::Decode(format!("question count {} out of range", count)))
    }

    async fn question(&self, id: u64) -> ChainResult<QuestionRecord> {
        let q = self
            .view(
                self.addresses.qna,
                IQnA::getQuestionCall {
                    questionId: U256::from(id),
                },
            )
            .await?;

        // Unknown ids read back as the zero struct
        if q.asker.is_zero() {
            return Err(ChainError::Rejected {
                kind: RevertKind::InvalidId,
                tx_hash: None,
            });
        }

        Ok(QuestionRecord {
            id,
            asker: q.asker,
            token: q.token,
            bounty: q.bounty,
            deadline: u64::try_from(q.deadline).unwrap_or(u64::MAX),
            uri: q.uri,
            answered: q.answered,
        })
    }

    async fn bounty_of(&self, id: u64) -> ChainResult<U256> {
        self.view(
            self.addresses.qna,
            IQnA::bountyOfCall {
                questionId: U256::from(id),
            },
        )
        .await
    }

    async fn faucet_amount(&self) -> ChainResult<U256> {
        self.view(self.addresses.swap, IFaucetSwap::faucetAmountCall {}).await
    }

    async fn swap_rate(&self) -> ChainResult<U256> {
        self.view(self.addresses.swap, IFaucetSwap::swapRateCall {}).await
    }

    async fn swap_amount(&self, native_amount: U256) -> ChainResult<U256> {
        self.view(
            self.addresses.swap,
            IFaucetSwap::getSwapAmountCall {
                ethAmount: native_amount,
            },
        )
        .await
    }

    async fn swap_pool_balance(&self) -> ChainResult<U256> {
        self.view(self.addresses.swap, IFaucetSwap::getBrainBalanceCall {}).await
    }

    async fn has_wallet_claimed(&self, wallet: Address) -> ChainResult<bool> {
        self.view(self.addresses.swap, IFaucetSwap::hasClaimedFaucetCall { account: wallet })
            .await
    }

    async fn transaction(&self, hash: TxHash) -> ChainResult<Option<ObservedTransaction>> {
        let tx = self.client().get_transaction_by_hash(hash).await?;
        Ok(tx.map(|tx| ObservedTransaction {
            hash,
            to: tx.to(),
            value: tx.value(),
        }))
    }

    async fn wait_for_confirmation(&self, hash: TxHash) -> ChainResult<ConfirmationStatus> {
        self.submitter.wait_for_confirmation(hash).await
    }

    async fn submit(&self, call: ContractCall) -> ChainResult<TxOutcome> {
        let prepared = PreparedCall {
            to: call.target(&self.addresses),
            value: call.value(),
            data: call.calldata(),
            gas_limit: call.gas_limit(),
            label: call.name(),
        };
        self.submitter.submit(prepared).await
    }
}
