//! Backend signing wallet and nonce tracking.
//!
//! # Security
//! - The private key is loaded ONLY from the environment
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::chain::types::{ChainError, ChainResult};

/// Environment variable holding the backend signer key.
pub const PRIVATE_KEY_ENV_VAR: &str = "SERVER_SIGNER_PRIVATE_KEY";

/// The backend wallet: owner/operator of the contracts and the sender of
/// every relayed transaction.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    /// Next nonce to use. Only meaningful while `synced` is set.
    nonce: Arc<AtomicU64>,
    /// Cleared whenever the local nonce may have drifted from the chain.
    synced: Arc<AtomicBool>,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> ChainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Backend wallet initialized"
        );

        Ok(Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            synced: Arc::new(AtomicBool::new(false)),
            chain_id,
        })
    }

    /// Load the wallet from `SERVER_SIGNER_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> ChainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ChainError::Wallet(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
            })?;

        Self::from_private_key(&private_key, chain_id)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet used by the provider to sign outgoing transactions.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Whether the local nonce is known to match the chain.
    pub fn is_nonce_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    /// Get and increment the nonce atomically.
    pub fn get_and_increment_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Adopt a nonce read from the chain.
    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
        self.synced.store(true, Ordering::SeqCst);
    }

    /// Force a re-read from the chain before the next allocation.
    pub fn invalidate_nonce(&self) {
        self.synced.store(false, Ordering::SeqCst);
    }

    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet = Wallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), 1).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(wallet.ethereum_wallet().default_signer().address(), wallet.address());
    }

    #[test]
    fn test_nonce_management() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        assert!(!wallet.is_nonce_synced());

        wallet.set_nonce(7);
        assert!(wallet.is_nonce_synced());
        assert_eq!(wallet.get_and_increment_nonce(), 7);
        assert_eq!(wallet.get_and_increment_nonce(), 8);
        assert_eq!(wallet.current_nonce(), 9);

        wallet.invalidate_nonce();
        assert!(!wallet.is_nonce_synced());
    }

    #[test]
    fn test_clones_share_nonce() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let clone = wallet.clone();
        wallet.set_nonce(3);
        assert_eq!(clone.get_and_increment_nonce(), 3);
        assert_eq!(wallet.current_nonce(), 4);
    }

    #[test]
    fn test_invalid_private_key() {
        let result = Wallet::from_private_key("invalid_key", 1);
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }
}
