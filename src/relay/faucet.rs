//! One-time faucet grants.
//!
//! ```text
//! account exists, not claimed → wallet given → reserve account slot
//!     → re-check → live faucet amount → backend balance ≥ amount
//!     → transfer → mark account claimed → faucet ledger entry
//! ```

use alloy::primitives::{Address, TxHash};
use serde::Serialize;

use crate::chain::ContractGateway;
use crate::ledger::types::{now_secs, AccountUpdate};
use crate::ledger::{ClaimKey, LedgerKind, NewLedgerEntry, Store};
use crate::observability::metrics;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::service::{format_token, parse_wallet, Relay};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatus {
    pub has_claimed: bool,
    pub claimed_at: Option<u64>,
    pub tx_hash: Option<TxHash>,
    pub faucet_amount: String,
    pub can_claim: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetReceipt {
    pub success: bool,
    pub message: String,
    pub tx_hash: TxHash,
    pub amount: String,
    pub wallet_address: Address,
}

impl<G: ContractGateway, S: Store> Relay<G, S> {
    /// Grant the faucet amount to `wallet` for `account_id`, at most once.
    pub async fn claim_faucet(&self, account_id: u64, wallet: Option<&str>) -> RelayResult<FaucetReceipt> {
        let result = self.claim_faucet_inner(account_id, wallet).await;
        match &result {
            Ok(receipt) => {
                metrics::record_faucet_claim("success");
                tracing::info!(
                    account_id = account_id,
                    wallet = %receipt.wallet_address,
                    tx_hash = %receipt.tx_hash,
                    "Faucet claimed"
                );
            }
            Err(e) => {
                metrics::record_faucet_claim(e.label());
                tracing::warn!(account_id = account_id, error = %e, "Faucet claim rejected");
            }
        }
        result
    }

    async fn claim_faucet_inner(&self, account_id: u64, wallet: Option<&str>) -> RelayResult<FaucetReceipt> {
        let store = self.ledger.store();

        let account = store
            .find_account(account_id)
            .await?
            .ok_or(RelayError::AccountNotFound(account_id))?;
        if account.has_claimed {
            return Err(RelayError::AlreadyClaimed(account_id));
        }
        let wallet = parse_wallet(wallet)?;
        let key = ClaimKey::Account(account_id, LedgerKind::Faucet);
        self.ensure_not_pending(key).await?;

        // Concurrent claim for the same account: the loser stops here
        let reservation = self.ledger.reserve(key).ok_or(RelayError::AlreadyClaimed(account_id))?;

        // A claim may have completed between the first read and the reservation
        let account = store
            .find_account(account_id)
            .await?
            .ok_or(RelayError::AccountNotFound(account_id))?;
        if account.has_claimed {
            return Err(RelayError::AlreadyClaimed(account_id));
        }
        self.ensure_not_pending(key).await?;

        let amount = self.gateway.faucet_amount().await?;
        let available = self.gateway.token_balance(self.backend_address()).await?;
        if available < amount {
            return Err(RelayError::InsufficientLiquidity {
                required: amount,
                available,
            });
        }

        let transfer = match self.signer.transfer_token(wallet, amount).await {
            Ok(transfer) => transfer,
            Err(e) => return Err(self.transfer_failed(reservation, account_id, amount, e).await),
        };
        let tx_hash = transfer.transaction_hash;

        let mut update = AccountUpdate::faucet_claimed(tx_hash, now_secs());
        if account.primary_wallet.is_none() {
            update.primary_wallet = Some(wallet);
        }

        let recorded = async {
            store.update_account(account_id, update).await?;
            self.ledger
                .record_once(NewLedgerEntry {
                    account_id,
                    kind: LedgerKind::Faucet,
                    amount,
                    token_symbol: self.settings.token_symbol.clone(),
                    external_ref: Some(format!("wallet:{}", wallet)),
                    source_tx_hash: tx_hash,
                })
                .await
        }
        .await;

        if let Err(e) = recorded {
            tracing::error!(
                account_id = account_id,
                tx_hash = %tx_hash,
                error = %e,
                "Faucet transfer confirmed but not recorded"
            );
            reservation.poison();
            return Err(e.into());
        }
        drop(reservation);

        Ok(FaucetReceipt {
            success: true,
            message: "Faucet claimed successfully!".to_string(),
            tx_hash,
            amount: format_token(amount),
            wallet_address: wallet,
        })
    }

    pub async fn claim_status(&self, account_id: u64) -> RelayResult<ClaimStatus> {
        let account = self
            .ledger
            .store()
            .find_account(account_id)
            .await?
            .ok_or(RelayError::AccountNotFound(account_id))?;
        let faucet_amount = self.reader.faucet_amount().await;

        Ok(ClaimStatus {
            has_claimed: account.has_claimed,
            claimed_at: account.claimed_at,
            tx_hash: account.claim_tx_hash,
            faucet_amount: format_token(faucet_amount),
            can_claim: !account.has_claimed,
        })
    }

    /// The swap contract's own per-wallet claim flag.
    pub async fn has_wallet_claimed(&self, wallet: Address) -> RelayResult<bool> {
        Ok(self.gateway.has_wallet_claimed(wallet).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockFailure, MockGateway};
    use crate::chain::RevertKind;
    use crate::config::RelaySettings;
    use crate::ledger::types::LedgerFilter;
    use crate::ledger::{Account, MemoryStore};
    use alloy::primitives::U256;
    use std::sync::Arc;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    async fn setup(backend_tokens: u64, faucet: u64) -> (Arc<MockGateway>, Arc<MemoryStore>, Relay<MockGateway, MemoryStore>) {
        let mock = Arc::new(MockGateway::new());
        mock.set_token_balance(mock.backend(), U256::from(backend_tokens)).await;
        mock.set_faucet_amount(U256::from(faucet)).await;
        let store = Arc::new(MemoryStore::new(None));
        store.insert_account(Account::new(1)).await.unwrap();
        let relay = Relay::new(mock.clone(), store.clone(), RelaySettings::default());
        (mock, store, relay)
    }

    #[tokio::test]
    async fn test_claim_marks_account_and_records_entry() {
        let (mock, store, relay) = setup(1_000, 100).await;

        let receipt = relay.claim_faucet(1, Some(WALLET)).await.unwrap();
        assert!(receipt.success);

        let account = store.find_account(1).await.unwrap().unwrap();
        assert!(account.has_claimed);
        assert_eq!(account.claim_tx_hash, Some(receipt.tx_hash));
        assert_eq!(account.primary_wallet, Some(WALLET.parse().unwrap()));

        let entry = store
            .find_ledger_entry(receipt.tx_hash, LedgerKind::Faucet)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.amount, U256::from(100));
        assert_eq!(mock.transfers().await.len(), 1);

        let status = relay.claim_status(1).await.unwrap();
        assert!(status.has_claimed && !status.can_claim);
    }

    #[tokio::test]
    async fn test_second_claim_rejected() {
        let (mock, _, relay) = setup(1_000, 100).await;
        relay.claim_faucet(1, Some(WALLET)).await.unwrap();

        let err = relay.claim_faucet(1, Some(WALLET)).await.unwrap_err();
        assert!(matches!(err, RelayError::AlreadyClaimed(1)));
        assert_eq!(mock.transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (_, _, relay) = setup(1_000, 100).await;
        assert!(matches!(
            relay.claim_faucet(99, Some(WALLET)).await,
            Err(RelayError::AccountNotFound(99))
        ));
        assert!(matches!(relay.claim_faucet(1, None).await, Err(RelayError::MissingWallet)));
    }

    #[tokio::test]
    async fn test_insufficient_liquidity_leaves_state_untouched() {
        let (mock, store, relay) = setup(50, 100).await;

        let err = relay.claim_faucet(1, Some(WALLET)).await.unwrap_err();
        assert!(matches!(err, RelayError::InsufficientLiquidity { .. }));
        assert!(mock.transfers().await.is_empty());
        assert!(!store.find_account(1).await.unwrap().unwrap().has_claimed);
        assert_eq!(store.count_ledger_entries(LedgerFilter::default()).await.unwrap(), 0);

        // The reservation was released: a funded retry succeeds
        mock.set_token_balance(mock.backend(), U256::from(500)).await;
        relay.claim_faucet(1, Some(WALLET)).await.unwrap();
    }

    #[tokio::test]
    async fn test_chain_failure_is_not_recorded() {
        let (mock, store, relay) = setup(1_000, 100).await;
        mock.set_failure(Some(MockFailure::Reject(RevertKind::InsufficientBalance))).await;

        let err = relay.claim_faucet(1, Some(WALLET)).await.unwrap_err();
        assert!(matches!(err, RelayError::Chain(_)));
        assert!(!store.find_account(1).await.unwrap().unwrap().has_claimed);
    }

    #[tokio::test]
    async fn test_unconfirmed_transfer_blocks_retry() {
        let (mock, store, relay) = setup(1_000, 100).await;
        mock.set_failure(Some(MockFailure::ConfirmationTimeout)).await;

        let err = relay.claim_faucet(1, Some(WALLET)).await.unwrap_err();
        assert!(matches!(err, RelayError::TransferPending(Some(_))));

        mock.set_failure(None).await;
        let err = relay.claim_faucet(1, Some(WALLET)).await.unwrap_err();
        assert!(matches!(err, RelayError::TransferPending(Some(_))));
        assert!(mock.transfers().await.is_empty());
        assert!(store
            .find_pending_transfer(ClaimKey::Account(1, LedgerKind::Faucet))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unacknowledged_send_blocks_retry() {
        let (mock, _, relay) = setup(1_000, 100).await;
        mock.set_failure(Some(MockFailure::SendTimeout)).await;
        assert!(matches!(
            relay.claim_faucet(1, Some(WALLET)).await,
            Err(RelayError::TransferPending(None))
        ));

        mock.set_failure(None).await;
        assert!(relay.claim_faucet(1, Some(WALLET)).await.is_err());
        assert!(mock.transfers().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_node_releases_claim() {
        let (mock, _, relay) = setup(1_000, 100).await;
        mock.set_failure(Some(MockFailure::Rpc)).await;
        assert!(matches!(relay.claim_faucet(1, Some(WALLET)).await, Err(RelayError::Chain(_))));

        mock.set_failure(None).await;
        relay.claim_faucet(1, Some(WALLET)).await.unwrap();
        assert_eq!(mock.transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_primary_wallet_kept() {
        let (_, store, relay) = setup(1_000, 100).await;
        let existing = alloy::primitives::Address::repeat_byte(0x55);
        store.insert_account(Account::new(2).with_wallet(existing)).await.unwrap();

        relay.claim_faucet(2, Some(WALLET)).await.unwrap();
        assert_eq!(store.find_account(2).await.unwrap().unwrap().primary_wallet, Some(existing));
    }
}
