//! The relay: read views, admin operations, and the shared plumbing used by
//! the faucet, swap, and reward flows.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use std::sync::Arc;

use crate::chain::gateway::NetworkInfo;
use crate::chain::{ChainError, ChainReader, ContractGateway, Signer};
use crate::config::RelaySettings;
use crate::ledger::types::{now_secs, AccountFilter};
use crate::ledger::{ClaimKey, PendingTransfer, ReconciliationLedger, Reservation, Store};
use crate::relay::error::{RelayError, RelayResult};

const WEI_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Format an 18-decimal amount with four fractional digits, truncated.
pub fn format_token(amount: U256) -> String {
    let unit = U256::from(WEI_PER_TOKEN);
    let whole = amount / unit;
    let frac = (amount % unit) / U256::from(100_000_000_000_000u64);
    format!("{}.{:04}", whole, u64::try_from(frac).unwrap_or_default())
}

/// Parse a user-supplied 0x address.
pub fn parse_wallet(raw: Option<&str>) -> RelayResult<Address> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RelayError::MissingWallet)?;
    raw.parse()
        .map_err(|_| RelayError::InvalidAddress(raw.to_string()))
}

pub fn parse_tx_hash(raw: &str) -> RelayResult<TxHash> {
    raw.trim()
        .parse()
        .map_err(|_| RelayError::InvalidTransactionHash(raw.to_string()))
}

/// Parse a decimal token amount ("100", "0.5") into the smallest unit.
pub fn parse_token_amount(raw: &str) -> RelayResult<U256> {
    let amount = parse_ether(raw.trim()).map_err(|e| RelayError::InvalidAmount(format!("'{}': {}", raw, e)))?;
    if amount.is_zero() {
        return Err(RelayError::InvalidAmount("amount must be greater than 0".to_string()));
    }
    Ok(amount)
}

/// Faucet and swap overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetInfo {
    pub faucet_amount: String,
    /// Raw `swapRate()`: token base units per wei, the multiplier swaps
    /// and quotes apply. Not scaled to a per-ETH figure.
    pub swap_rate: String,
    pub total_account_claims: usize,
    pub available_tokens: String,
    pub backend_wallet: Address,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub address: Address,
    pub balance: String,
    pub balance_formatted: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub eth_amount: String,
    pub token_amount: String,
    pub rate: String,
}

/// Hash of a confirmed admin transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub backend_wallet: Address,
    pub chain_id: Option<u64>,
    pub block_number: Option<u64>,
    pub native_balance: String,
    pub token_balance: String,
    pub pool_balance: String,
    pub pool_native_balance: String,
    pub faucet_amount: String,
    pub swap_rate: String,
    pub total_account_claims: usize,
}

/// Composes the signer, reader, and ledger.
pub struct Relay<G, S> {
    pub(crate) gateway: Arc<G>,
    pub(crate) signer: Signer<G>,
    pub(crate) reader: ChainReader<G>,
    pub(crate) ledger: ReconciliationLedger<S>,
    pub(crate) settings: RelaySettings,
}

impl<G, S> Clone for Relay<G, S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            signer: self.signer.clone(),
            reader: self.reader.clone(),
            ledger: self.ledger.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<G: ContractGateway, S: Store> Relay<G, S> {
    pub fn new(gateway: Arc<G>, store: Arc<S>, settings: RelaySettings) -> Self {
        Self {
            signer: Signer::new(gateway.clone()),
            reader: ChainReader::new(gateway.clone()),
            ledger: ReconciliationLedger::new(store),
            gateway,
            settings,
        }
    }

    pub fn signer(&self) -> &Signer<G> {
        &self.signer
    }

    pub fn reader(&self) -> &ChainReader<G> {
        &self.reader
    }

    pub fn ledger(&self) -> &ReconciliationLedger<S> {
        &self.ledger
    }

    pub fn backend_address(&self) -> Address {
        self.gateway.backend_address()
    }

    /// Error for a payout transfer that failed. When the transfer may
    /// still land, the reservation's key is held pending rather than
    /// released, so no retry can pay a second time.
    pub(crate) async fn transfer_failed(
        &self,
        reservation: Reservation,
        account_id: u64,
        amount: U256,
        err: ChainError,
    ) -> RelayError {
        if !err.may_have_broadcast() {
            return err.into();
        }
        let transfer_tx_hash = err.tx_hash();
        let pending = PendingTransfer {
            key: reservation.key(),
            account_id,
            amount,
            transfer_tx_hash,
            created_at: now_secs(),
        };
        if let Err(e) = self.ledger.hold_pending(reservation, pending).await {
            tracing::error!(account_id = account_id, error = %e, "Failed to persist pending transfer");
        }
        RelayError::TransferPending(transfer_tx_hash)
    }

    /// Refuse keys whose previous transfer has an unknown outcome.
    pub(crate) async fn ensure_not_pending(&self, key: ClaimKey) -> RelayResult<()> {
        match self.ledger.pending(key).await? {
            Some(pending) => Err(RelayError::TransferPending(pending.transfer_tx_hash)),
            None => Ok(()),
        }
    }

    pub async fn network(&self) -> RelayResult<NetworkInfo> {
        Ok(self.gateway.network().await?)
    }

    /// Faucet/swap stats for display.
    pub async fn info(&self) -> RelayResult<FaucetInfo> {
        let (faucet_amount, rate, pool) = tokio::join!(
            self.reader.faucet_amount(),
            self.reader.swap_rate(),
            self.reader.swap_pool_balance(),
        );
        let claims = self.ledger.store().count_accounts(AccountFilter::claimed()).await?;

        Ok(FaucetInfo {
            faucet_amount: format_token(faucet_amount),
            swap_rate: rate.to_string(),
            total_account_claims: claims,
            available_tokens: format_token(pool),
            backend_wallet: self.backend_address(),
        })
    }

    pub async fn token_balance(&self, address: Address) -> BalanceView {
        let balance = self.reader.token_balance(address).await;
        BalanceView {
            address,
            balance: balance.to_string(),
            balance_formatted: format!("{} {}", format_token(balance), self.settings.token_symbol),
        }
    }

    /// Contract quote for a native amount in wei.
    pub async fn quote(&self, eth_amount: &str) -> RelayResult<SwapQuote> {
        let wei: U256 = eth_amount
            .trim()
            .parse()
            .map_err(|_| RelayError::InvalidAmount(format!("'{}' is not an amount in wei", eth_amount)))?;
        let (amount, rate) = tokio::join!(self.gateway.swap_amount(wei), self.gateway.swap_rate());

        Ok(SwapQuote {
            eth_amount: wei.to_string(),
            token_amount: amount?.to_string(),
            rate: rate?.to_string(),
        })
    }

    /// Where users send native currency to swap.
    pub fn deposit_address(&self) -> Address {
        self.backend_address()
    }

    pub async fn set_swap_rate(&self, rate: U256) -> RelayResult<AdminReceipt> {
        if rate.is_zero() {
            return Err(RelayError::InvalidRate);
        }
        let result = self.signer.set_swap_rate(rate).await?;
        tracing::info!(rate = %rate, tx_hash = %result.transaction_hash, "Swap rate updated");
        Ok(AdminReceipt {
            tx_hash: result.transaction_hash,
            block_number: result.block_number,
        })
    }

    /// Set the faucet grant from a decimal token amount.
    pub async fn set_faucet_amount(&self, amount: &str) -> RelayResult<AdminReceipt> {
        let amount = parse_token_amount(amount)?;
        let result = self.signer.set_faucet_amount(amount).await?;
        tracing::info!(amount = %amount, tx_hash = %result.transaction_hash, "Faucet amount updated");
        Ok(AdminReceipt {
            tx_hash: result.transaction_hash,
            block_number: result.block_number,
        })
    }

    /// Move backend tokens into the swap contract's pool.
    pub async fn fund_pool(&self, amount: &str) -> RelayResult<AdminReceipt> {
        let amount = parse_token_amount(amount)?;
        let available = self.gateway.token_balance(self.backend_address()).await?;
        if available < amount {
            return Err(RelayError::InsufficientLiquidity {
                required: amount,
                available,
            });
        }
        let pool = self.gateway.addresses().swap;
        let result = self.signer.transfer_token(pool, amount).await?;
        tracing::info!(amount = %amount, tx_hash = %result.transaction_hash, "Swap pool funded");
        Ok(AdminReceipt {
            tx_hash: result.transaction_hash,
            block_number: result.block_number,
        })
    }

    pub async fn withdraw_token(&self, amount: &str) -> RelayResult<AdminReceipt> {
        let amount = parse_token_amount(amount)?;
        let result = self.signer.withdraw_token(amount).await?;
        tracing::info!(amount = %amount, tx_hash = %result.transaction_hash, "Tokens withdrawn from pool");
        Ok(AdminReceipt {
            tx_hash: result.transaction_hash,
            block_number: result.block_number,
        })
    }

    pub async fn withdraw_native(&self) -> RelayResult<AdminReceipt> {
        let result = self.signer.withdraw_native().await?;
        tracing::info!(tx_hash = %result.transaction_hash, "Native balance withdrawn from pool");
        Ok(AdminReceipt {
            tx_hash: result.transaction_hash,
            block_number: result.block_number,
        })
    }

    /// Operator view of the backend wallet and pool.
    pub async fn admin_status(&self) -> RelayResult<AdminStatus> {
        let backend = self.backend_address();
        let swap = self.gateway.addresses().swap;
        let network = self.gateway.network().await.ok();
        let (native, tokens, pool, pool_native, faucet_amount, rate) = tokio::join!(
            self.reader.native_balance(backend),
            self.reader.token_balance(backend),
            self.reader.swap_pool_balance(),
            self.reader.native_balance(swap),
            self.reader.faucet_amount(),
            self.reader.swap_rate(),
        );
        let claims = self.ledger.store().count_accounts(AccountFilter::claimed()).await?;

        Ok(AdminStatus {
            backend_wallet: backend,
            chain_id: network.map(|n| n.chain_id),
            block_number: network.map(|n| n.block_number),
            native_balance: native.to_string(),
            token_balance: tokens.to_string(),
            pool_balance: pool.to_string(),
            pool_native_balance: pool_native.to_string(),
            faucet_amount: faucet_amount.to_string(),
            swap_rate: rate.to_string(),
            total_account_claims: claims,
        })
    }
}
