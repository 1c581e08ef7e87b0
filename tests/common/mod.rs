//! Shared fixtures for integration tests.

#![allow(dead_code)]

use alloy::primitives::{Address, TxHash, U256};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use bounty_relay::chain::mock::MockGateway;
use bounty_relay::chain::types::{ObservedTransaction, QuestionRecord};
use bounty_relay::config::{RelayConfig, RelaySettings};
use bounty_relay::http::HttpServer;
use bounty_relay::ledger::{Account, MemoryStore, Store};
use bounty_relay::lifecycle::Shutdown;
use bounty_relay::relay::Relay;

pub const WALLET: &str = "0x00000000000000000000000000000000000000aa";
pub const ADMIN_KEY: &str = "test-admin-key";

/// Seeded accounts 1, 2, and 3 exist and have not claimed.
pub const ACCOUNTS: [u64; 3] = [1, 2, 3];

pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

pub struct Fixture {
    pub mock: Arc<MockGateway>,
    pub store: Arc<MemoryStore>,
    pub relay: Relay<MockGateway, MemoryStore>,
}

/// Relay over `mock` with a funded backend, a 100-token faucet, a rate of
/// 1000 tokens per wei, and the seeded accounts.
pub async fn fixture(mock: MockGateway) -> Fixture {
    let mock = Arc::new(mock);
    mock.set_token_balance(mock.backend(), tokens(1_000_000)).await;
    mock.set_faucet_amount(tokens(100)).await;
    mock.set_swap_rate(U256::from(1000)).await;

    let store = Arc::new(MemoryStore::new(None));
    for id in ACCOUNTS {
        store.insert_account(Account::new(id)).await.unwrap();
    }

    let relay = Relay::new(mock.clone(), store.clone(), RelaySettings::default());
    Fixture { mock, store, relay }
}

/// Register a confirmed deposit of `value` wei to the backend wallet.
pub async fn deposit(mock: &MockGateway, byte: u8, value: u64) -> String {
    deposit_to(mock, byte, Some(mock.backend()), value).await
}

pub async fn deposit_to(mock: &MockGateway, byte: u8, to: Option<Address>, value: u64) -> String {
    let hash = TxHash::repeat_byte(byte);
    mock.insert_transaction(ObservedTransaction {
        hash,
        to,
        value: U256::from(value),
    })
    .await;
    hash.to_string()
}

pub fn question(id: u64, bounty: U256) -> QuestionRecord {
    QuestionRecord {
        id,
        asker: Address::repeat_byte(0x11),
        token: Address::repeat_byte(0x0B),
        bounty,
        deadline: 0,
        uri: format!("ipfs://question-{id}"),
        answered: false,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `relay` on an ephemeral port. Admin routes are enabled with
/// [`ADMIN_KEY`] unless `admin` is false.
pub async fn spawn_server(relay: Relay<MockGateway, MemoryStore>, admin: bool) -> TestServer {
    let mut config = RelayConfig::default();
    config.admin.enabled = admin;
    config.admin.api_key = ADMIN_KEY.to_string();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, relay);
    let signalled = shutdown.signalled();
    tokio::spawn(async move {
        let _ = server.run(listener, signalled).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestServer { addr, client, shutdown }
}
