//! Transaction building, submission, and confirmation monitoring.
//!
//! # Responsibilities
//! - Simulate every call with `eth_call` before it is signed
//! - Allocate nonces and broadcast under a single lock
//! - Wait for the receipt with a bounded, backed-off poll
//!
//! The lock covers nonce allocation and broadcast only. Confirmation waits
//! run concurrently so one slow block does not stall other submissions.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use crate::chain::client::ChainClient;
use crate::chain::revert::revert_from_rpc_error;
use crate::chain::types::{BlockStatus, ChainError, ChainResult, ConfirmationStatus, TxOutcome};
use crate::chain::wallet::Wallet;
use crate::resilience::backoff::PollBackoff;

/// Upper bound on the receipt poll interval.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(8);

/// A fully specified contract call ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    /// Short operation name for logs.
    pub label: &'static str,
}

/// Submits backend-signed transactions and tracks them to confirmation.
#[derive(Clone)]
pub struct TxSubmitter {
    client: ChainClient,
    wallet: Wallet,
    /// Wallet-filled provider used for broadcasting.
    sender: Arc<dyn Provider + Send + Sync>,
    send_lock: Arc<Mutex<()>>,
}

impl TxSubmitter {
    pub fn new(client: ChainClient, wallet: Wallet) -> ChainResult<Self> {
        let url: url::Url = client.config().rpc_url.parse().map_err(|e| {
            ChainError::Config(format!("Invalid RPC URL '{}': {}", client.config().rpc_url, e))
        })?;
        let sender = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(url);

        Ok(Self {
            client,
            wallet,
            sender: Arc::new(sender),
            send_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    /// Simulate, sign, broadcast, and wait for the receipt.
    ///
    /// A reverted receipt is an error; a successful one is returned with its
    /// logs so callers can decode emitted identifiers.
    pub async fn submit(&self, call: PreparedCall) -> ChainResult<TxOutcome> {
        self.simulate(&call).await?;

        let tx_hash = self.broadcast(&call).await?;
        tracing::info!(call = call.label, tx_hash = %tx_hash, "Transaction submitted");

        let receipt = self.await_receipt(tx_hash).await?;
        let block_number = receipt.block_number.unwrap_or_default();

        if !receipt.status() {
            // Replay at the inclusion block to recover the reason
            let code = match self.client.call(&self.simulation_request(&call), Some(block_number)).await {
                Err(ChainError::Reverted { code, .. }) => code,
                _ => None,
            };
            tracing::warn!(
                call = call.label,
                tx_hash = %tx_hash,
                block_number = block_number,
                "Transaction reverted on-chain"
            );
            return Err(ChainError::Reverted {
                tx_hash: Some(tx_hash),
                code,
            });
        }

        tracing::info!(
            call = call.label,
            tx_hash = %tx_hash,
            block_number = block_number,
            "Transaction confirmed"
        );

        Ok(TxOutcome {
            tx_hash,
            block_number,
            status: BlockStatus::Success,
            logs: receipt.inner.logs().to_vec(),
        })
    }

    /// Pre-flight `eth_call` from the backend address.
    pub async fn simulate(&self, call: &PreparedCall) -> ChainResult<()> {
        match self.client.call(&self.simulation_request(call), None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(call = call.label, error = %e, "Simulation failed");
                Err(e)
            }
        }
    }

    fn simulation_request(&self, call: &PreparedCall) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(call.to)
            .with_value(call.value)
            .with_input(call.data.clone())
            .with_gas_limit(call.gas_limit)
    }

    /// Allocate a nonce and broadcast while holding the send lock.
    async fn broadcast(&self, call: &PreparedCall) -> ChainResult<TxHash> {
        let _guard = self.send_lock.lock().await;

        if !self.wallet.is_nonce_synced() {
            let chain_nonce = self.client.get_transaction_count(self.wallet.address()).await?;
            self.wallet.set_nonce(chain_nonce);
        }

        let gas_price = self.client.get_gas_price().await?;
        let gas_price_gwei = gas_price / 1_000_000_000;

        let config = self.client.config();
        if gas_price_gwei > config.max_gas_price_gwei as u128 {
            return Err(ChainError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei: config.max_gas_price_gwei,
            });
        }

        let adjusted_gas_price = (gas_price as f64 * config.gas_price_multiplier) as u128;
        let nonce = self.wallet.get_and_increment_nonce();

        let tx = TransactionRequest::default()
            .with_from(self.wallet.address())
            .with_to(call.to)
            .with_value(call.value)
            .with_input(call.data.clone())
            .with_nonce(nonce)
            .with_gas_price(adjusted_gas_price)
            .with_chain_id(self.wallet.chain_id())
            .with_gas_limit(call.gas_limit);

        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        match timeout(timeout_duration, self.sender.send_transaction(tx)).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => {
                self.wallet.invalidate_nonce();
                if let Some(code) = revert_from_rpc_error(&e) {
                    return Err(ChainError::Reverted {
                        tx_hash: None,
                        code: Some(code),
                    });
                }
                Err(ChainError::Rpc(format!("Failed to send {}: {}", call.label, e)))
            }
            Err(_) => {
                // The node may or may not have accepted it
                self.wallet.invalidate_nonce();
                Err(ChainError::SendTimeout(config.rpc_timeout_secs))
            }
        }
    }

    /// Poll until the transaction has the configured number of
    /// confirmations, or fail with [`ChainError::ConfirmationTimeout`].
    pub async fn await_receipt(&self, tx_hash: TxHash) -> ChainResult<TransactionReceipt> {
        let config = self.client.config();
        let required = self.client.confirmation_blocks().max(1);
        let limit_secs = config.confirmation_timeout_secs;
        let mut backoff = PollBackoff::new(Duration::from_millis(config.poll_interval_ms), MAX_POLL_INTERVAL);

        let result = timeout(Duration::from_secs(limit_secs), async {
            loop {
                match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let current_block = match self.client.get_block_number().await {
                            Ok(block) => block,
                            Err(e) => {
                                tracing::debug!(tx_hash = %tx_hash, error = %e, "Block number poll failed");
                                sleep(backoff.next_delay()).await;
                                continue;
                            }
                        };
                        let tx_block = receipt.block_number.unwrap_or(current_block);
                        let confirmations = current_block.saturating_sub(tx_block).saturating_add(1);

                        if confirmations >= u64::from(required) || !receipt.status() {
                            return Ok::<_, ChainError>(receipt);
                        }

                        tracing::debug!(
                            tx_hash = %tx_hash,
                            confirmations = confirmations,
                            required = required,
                            "Waiting for confirmations"
                        );
                    }
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    // Transient: keep polling until the deadline
                    Err(e) => tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt poll failed"),
                }
                sleep(backoff.next_delay()).await;
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    waited_secs = limit_secs,
                    polls = backoff.attempts(),
                    "Transaction not confirmed in time"
                );
                Err(ChainError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: limit_secs,
                })
            }
        }
    }

    /// Confirmation status of an arbitrary transaction (e.g. a user deposit).
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash) -> ChainResult<ConfirmationStatus> {
        let receipt = self.await_receipt(tx_hash).await?;
        let block_number = receipt.block_number.unwrap_or_default();
        if receipt.status() {
            Ok(ConfirmationStatus::Confirmed { block_number })
        } else {
            Ok(ConfirmationStatus::Failed(format!(
                "Transaction {} reverted in block {}",
                tx_hash, block_number
            )))
        }
    }
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("address", &self.wallet.address())
            .field("client", &self.client)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockchainConfig;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    async fn offline_submitter(confirmation_timeout_secs: u64) -> TxSubmitter {
        let config = BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 1,
            confirmation_timeout_secs,
            poll_interval_ms: 50,
            ..Default::default()
        };
        let client = ChainClient::new(Arc::new(config)).await.unwrap();
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 31337).unwrap();
        TxSubmitter::new(client, wallet).unwrap()
    }

    #[tokio::test]
    async fn test_confirmation_wait_is_bounded() {
        let submitter = offline_submitter(1).await;
        let hash = TxHash::repeat_byte(0x42);

        let err = submitter.await_receipt(hash).await.unwrap_err();
        match err {
            ChainError::ConfirmationTimeout { tx_hash, waited_secs } => {
                assert_eq!(tx_hash, hash);
                assert_eq!(waited_secs, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_submit_fails_before_signing_when_rpc_down() {
        let submitter = offline_submitter(1).await;
        let call = PreparedCall {
            to: Address::repeat_byte(0x01),
            value: U256::ZERO,
            data: Bytes::new(),
            gas_limit: 100_000,
            label: "test",
        };

        let err = submitter.submit(call).await.unwrap_err();
        assert!(matches!(err, ChainError::Rpc(_)));
        assert!(!submitter.wallet.is_nonce_synced());
    }
}
