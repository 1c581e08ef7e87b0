//! Native-for-token swaps against observed deposits.
//!
//! A deposit hash is consumed at most once. The flow:
//!
//! ```text
//! parse → not yet recorded → reserve hash → deposit exists → confirmed
//!     → sent to backend → non-zero value → value × live rate
//!     → backend balance ≥ output → transfer → swap ledger entry
//! ```
//!
//! A transfer whose outcome is unknown leaves the hash pending; it is never
//! transferred for again.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use uuid::Uuid;

use crate::chain::types::ConfirmationStatus;
use crate::chain::{ChainError, ContractGateway};
use crate::ledger::{ClaimKey, LedgerEntry, LedgerKind, NewLedgerEntry, Store};
use crate::observability::metrics;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::service::{format_token, parse_tx_hash, parse_wallet, Relay};

const NATIVE_REF_PREFIX: &str = "ETH:";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    pub success: bool,
    pub message: String,
    pub eth_amount: String,
    pub token_amount: String,
    pub swap_rate: String,
    pub deposit_tx_hash: TxHash,
    pub transfer_tx_hash: TxHash,
    pub wallet_address: Address,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapHistoryItem {
    pub id: Uuid,
    pub token_amount: String,
    pub eth_amount: String,
    pub tx_hash: TxHash,
    pub created_at: u64,
}

impl From<LedgerEntry> for SwapHistoryItem {
    fn from(entry: LedgerEntry) -> Self {
        let eth_amount = entry
            .external_ref
            .as_deref()
            .and_then(|r| r.strip_prefix(NATIVE_REF_PREFIX))
            .unwrap_or("0")
            .to_string();
        Self {
            id: entry.id,
            token_amount: format_token(entry.amount),
            eth_amount,
            tx_hash: entry.source_tx_hash,
            created_at: entry.created_at,
        }
    }
}

impl<G: ContractGateway, S: Store> Relay<G, S> {
    /// Credit `wallet` with tokens for the native value of `deposit_hash`.
    pub async fn swap(&self, account_id: u64, deposit_hash: &str, wallet: &str) -> RelayResult<SwapReceipt> {
        let result = self.swap_inner(account_id, deposit_hash, wallet).await;
        match &result {
            Ok(receipt) => {
                metrics::record_swap("success");
                tracing::info!(
                    account_id = account_id,
                    deposit_tx_hash = %receipt.deposit_tx_hash,
                    transfer_tx_hash = %receipt.transfer_tx_hash,
                    eth_amount = %receipt.eth_amount,
                    "Swap completed"
                );
            }
            Err(e) => {
                metrics::record_swap(e.label());
                tracing::warn!(account_id = account_id, deposit = deposit_hash, error = %e, "Swap rejected");
            }
        }
        result
    }

    async fn swap_inner(&self, account_id: u64, deposit_hash: &str, wallet: &str) -> RelayResult<SwapReceipt> {
        let deposit_hash = parse_tx_hash(deposit_hash)?;
        let wallet = parse_wallet(Some(wallet))?;

        if self.ledger.find(deposit_hash, LedgerKind::Swap).await?.is_some() {
            return Err(RelayError::DuplicateTransaction(deposit_hash));
        }
        let key = ClaimKey::Source(deposit_hash, LedgerKind::Swap);
        self.ensure_not_pending(key).await?;
        let reservation = self
            .ledger
            .reserve(key)
            .ok_or(RelayError::DuplicateTransaction(deposit_hash))?;
        if self.ledger.find(deposit_hash, LedgerKind::Swap).await?.is_some() {
            return Err(RelayError::DuplicateTransaction(deposit_hash));
        }
        self.ensure_not_pending(key).await?;

        let deposit = self
            .gateway
            .transaction(deposit_hash)
            .await?
            .ok_or(RelayError::TransactionNotFound(deposit_hash))?;

        match self.gateway.wait_for_confirmation(deposit_hash).await {
            Ok(ConfirmationStatus::Confirmed { .. }) => {}
            Ok(status) => {
                return Err(RelayError::TransactionNotConfirmed {
                    tx_hash: deposit_hash,
                    reason: format!("{:?}", status),
                })
            }
            Err(ChainError::ConfirmationTimeout { waited_secs, .. }) => {
                return Err(RelayError::TransactionNotConfirmed {
                    tx_hash: deposit_hash,
                    reason: format!("not confirmed after {}s", waited_secs),
                })
            }
            Err(e) => return Err(e.into()),
        }

        let backend = self.backend_address();
        if deposit.to != Some(backend) {
            return Err(RelayError::RecipientMismatch {
                expected: backend,
                actual: deposit.to,
            });
        }
        if deposit.value.is_zero() {
            return Err(RelayError::ZeroValue);
        }

        let rate = self.gateway.swap_rate().await?;
        let token_amount = deposit.value.checked_mul(rate).ok_or(RelayError::AmountOverflow)?;

        let available = self.gateway.token_balance(backend).await?;
        if available < token_amount {
            return Err(RelayError::InsufficientLiquidity {
                required: token_amount,
                available,
            });
        }

        let transfer = match self.signer.transfer_token(wallet, token_amount).await {
            Ok(transfer) => transfer,
            Err(e) => return Err(self.transfer_failed(reservation, account_id, token_amount, e).await),
        };

        let recorded = self
            .ledger
            .record_once(NewLedgerEntry {
                account_id,
                kind: LedgerKind::Swap,
                amount: token_amount,
                token_symbol: self.settings.token_symbol.clone(),
                external_ref: Some(format!("{}{}", NATIVE_REF_PREFIX, deposit.value)),
                source_tx_hash: deposit_hash,
            })
            .await;

        if let Err(e) = recorded {
            tracing::error!(
                deposit_tx_hash = %deposit_hash,
                transfer_tx_hash = %transfer.transaction_hash,
                error = %e,
                "Swap transfer confirmed but not recorded"
            );
            reservation.poison();
            return Err(e.into());
        }
        drop(reservation);

        let eth_amount = format_token(deposit.value);
        let token_amount = format_token(token_amount);
        Ok(SwapReceipt {
            success: true,
            message: format!("Swapped {} ETH for {} {}", eth_amount, token_amount, self.settings.token_symbol),
            eth_amount,
            token_amount,
            swap_rate: rate.to_string(),
            deposit_tx_hash: deposit_hash,
            transfer_tx_hash: transfer.transaction_hash,
            wallet_address: wallet,
        })
    }

    /// Most recent swaps for an account.
    pub async fn swap_history(&self, account_id: u64) -> RelayResult<Vec<SwapHistoryItem>> {
        let entries = self
            .ledger
            .history(account_id, LedgerKind::Swap, self.settings.swap_history_limit)
            .await?;
        Ok(entries.into_iter().map(SwapHistoryItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockFailure, MockGateway};
    use crate::chain::types::ObservedTransaction;
    use crate::config::RelaySettings;
    use crate::ledger::MemoryStore;
    use alloy::primitives::U256;
    use std::sync::Arc;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    struct Fixture {
        mock: Arc<MockGateway>,
        relay: Relay<MockGateway, MemoryStore>,
    }

    async fn fixture(backend_tokens: u64, rate: u64) -> Fixture {
        let mock = Arc::new(MockGateway::new());
        mock.set_token_balance(mock.backend(), U256::from(backend_tokens)).await;
        mock.set_swap_rate(U256::from(rate)).await;
        let relay = Relay::new(mock.clone(), Arc::new(MemoryStore::new(None)), RelaySettings::default());
        Fixture { mock, relay }
    }

    async fn deposit(mock: &MockGateway, byte: u8, to: Option<Address>, value: u64) -> String {
        let hash = TxHash::repeat_byte(byte);
        mock.insert_transaction(ObservedTransaction {
            hash,
            to,
            value: U256::from(value),
        })
        .await;
        hash.to_string()
    }

    #[tokio::test]
    async fn test_swap_credits_value_times_rate() {
        let f = fixture(10_000, 100).await;
        let hash = deposit(&f.mock, 1, Some(f.mock.backend()), 5).await;

        let receipt = f.relay.swap(7, &hash, WALLET).await.unwrap();
        assert_eq!(receipt.swap_rate, "100");
        assert_eq!(f.mock.transfers().await, vec![(WALLET.parse().unwrap(), U256::from(500))]);

        let history = f.relay.swap_history(7).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].eth_amount, "5");
        assert_eq!(history[0].tx_hash.to_string(), hash);
    }

    #[tokio::test]
    async fn test_same_deposit_swapped_once() {
        let f = fixture(10_000, 100).await;
        let hash = deposit(&f.mock, 1, Some(f.mock.backend()), 5).await;

        f.relay.swap(7, &hash, WALLET).await.unwrap();
        let err = f.relay.swap(8, &hash, WALLET).await.unwrap_err();
        assert!(matches!(err, RelayError::DuplicateTransaction(_)));
        assert_eq!(f.mock.transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_and_unconfirmed_deposits() {
        let f = fixture(10_000, 1).await;
        let missing = TxHash::repeat_byte(9).to_string();
        assert!(matches!(
            f.relay.swap(1, &missing, WALLET).await,
            Err(RelayError::TransactionNotFound(_))
        ));

        let hash = deposit(&f.mock, 2, Some(f.mock.backend()), 5).await;
        f.mock
            .set_confirmation(TxHash::repeat_byte(2), ConfirmationStatus::Failed("reverted".into()))
            .await;
        assert!(matches!(
            f.relay.swap(1, &hash, WALLET).await,
            Err(RelayError::TransactionNotConfirmed { .. })
        ));
        assert!(f.mock.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_wrong_recipient_and_zero_value() {
        let f = fixture(10_000, 1).await;

        let foreign = deposit(&f.mock, 3, Some(Address::repeat_byte(0x77)), 5).await;
        assert!(matches!(
            f.relay.swap(1, &foreign, WALLET).await,
            Err(RelayError::RecipientMismatch { .. })
        ));

        let creation = deposit(&f.mock, 4, None, 5).await;
        assert!(matches!(
            f.relay.swap(1, &creation, WALLET).await,
            Err(RelayError::RecipientMismatch { actual: None, .. })
        ));

        let empty = deposit(&f.mock, 5, Some(f.mock.backend()), 0).await;
        assert!(matches!(f.relay.swap(1, &empty, WALLET).await, Err(RelayError::ZeroValue)));
    }

    #[tokio::test]
    async fn test_insufficient_liquidity_allows_retry() {
        let f = fixture(100, 100).await;
        let hash = deposit(&f.mock, 6, Some(f.mock.backend()), 5).await;

        let err = f.relay.swap(1, &hash, WALLET).await.unwrap_err();
        assert!(matches!(err, RelayError::InsufficientLiquidity { .. }));
        assert!(f.relay.swap_history(1).await.unwrap().is_empty());

        f.mock.set_token_balance(f.mock.backend(), U256::from(1_000)).await;
        f.relay.swap(1, &hash, WALLET).await.unwrap();
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_blocks_retry() {
        let f = fixture(10_000, 100).await;
        let hash = deposit(&f.mock, 8, Some(f.mock.backend()), 5).await;
        f.mock.set_failure(Some(MockFailure::ConfirmationTimeout)).await;

        let err = f.relay.swap(7, &hash, WALLET).await.unwrap_err();
        assert!(matches!(err, RelayError::TransferPending(Some(_))));

        f.mock.set_failure(None).await;
        let err = f.relay.swap(7, &hash, WALLET).await.unwrap_err();
        assert!(matches!(err, RelayError::TransferPending(Some(_))));
        assert!(f.mock.transfers().await.is_empty());
        assert!(f.relay.swap_history(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mined_revert_releases_deposit() {
        let f = fixture(10_000, 100).await;
        let hash = deposit(&f.mock, 9, Some(f.mock.backend()), 5).await;
        f.mock.set_failure(Some(MockFailure::Revert)).await;
        assert!(matches!(f.relay.swap(7, &hash, WALLET).await, Err(RelayError::Chain(_))));

        f.mock.set_failure(None).await;
        f.relay.swap(7, &hash, WALLET).await.unwrap();
        assert_eq!(f.mock.transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_overflow_is_rejected() {
        let f = fixture(10, 1).await;
        f.mock.set_swap_rate(U256::MAX).await;
        let hash = deposit(&f.mock, 7, Some(f.mock.backend()), 2).await;

        assert!(matches!(f.relay.swap(1, &hash, WALLET).await, Err(RelayError::AmountOverflow)));
    }

    #[tokio::test]
    async fn test_malformed_inputs() {
        let f = fixture(10, 1).await;
        assert!(matches!(
            f.relay.swap(1, "0xnothex", WALLET).await,
            Err(RelayError::InvalidTransactionHash(_))
        ));
        let hash = TxHash::repeat_byte(1).to_string();
        assert!(matches!(f.relay.swap(1, &hash, "").await, Err(RelayError::MissingWallet)));
    }

    #[test]
    fn test_history_item_strips_native_prefix() {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            account_id: 1,
            kind: LedgerKind::Swap,
            amount: U256::from(10u64).pow(U256::from(18)),
            token_symbol: "BRAIN".into(),
            external_ref: Some("ETH:1000".into()),
            source_tx_hash: TxHash::ZERO,
            created_at: 5,
            sequence: 0,
        };
        let item = SwapHistoryItem::from(entry);
        assert_eq!(item.eth_amount, "1000");
        assert_eq!(item.token_amount, "1.0000");
    }
}
