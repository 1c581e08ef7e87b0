//! bounty-relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     BOUNTY RELAY                     │
//!   HTTP request  │  ┌────────┐    ┌──────────────┐    ┌──────────────┐  │
//!   ──────────────┼─▶│  http  │───▶│    relay     │───▶│    ledger    │  │
//!                 │  │ admin  │    │ faucet/swap/ │    │ reserve +    │  │
//!                 │  └────────┘    │   reward     │    │ record once  │  │
//!                 │                └──────┬───────┘    └──────────────┘  │
//!                 │                       │                              │
//!                 │              ┌────────┴────────┐                     │
//!                 │              ▼                 ▼                     │
//!                 │       ┌────────────┐    ┌────────────┐               │
//!                 │       │   reader   │    │   signer   │               │
//!                 │       │ fail-soft  │    │ submit +   │               │
//!                 │       │   views    │    │  confirm   │               │
//!                 │       └─────┬──────┘    └─────┬──────┘               │
//!                 │             └───────┬─────────┘                      │
//!                 │                     ▼                                │
//!                 │            ┌─────────────────┐                       │
//!                 │            │ ContractGateway │──────────────────────┼──▶ JSON-RPC
//!                 │            └─────────────────┘                       │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use bounty_relay::chain::{ContractGateway, RpcGateway, Wallet};
use bounty_relay::config::loader::load_config;
use bounty_relay::http::HttpServer;
use bounty_relay::ledger::MemoryStore;
use bounty_relay::lifecycle::{signals, Shutdown};
use bounty_relay::observability::{logging, metrics};
use bounty_relay::relay::Relay;

#[derive(Parser)]
#[command(name = "bounty-relay")]
#[command(about = "On-chain faucet, swap, and bounty relay", long_about = None)]
struct Args {
    /// Path to a TOML config file. Without one, defaults plus environment apply.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bounty-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_id = config.blockchain.chain_id,
        request_timeout_secs = config.timeouts.request_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The signing key is required; without it nothing can be paid out
    let wallet = Wallet::from_env(config.blockchain.chain_id)?;
    let gateway = Arc::new(RpcGateway::connect(&config, wallet).await?);

    match gateway.network().await {
        Ok(network) if network.chain_id == config.blockchain.chain_id => tracing::info!(
            chain_id = network.chain_id,
            block_number = network.block_number,
            "Connected to network"
        ),
        Ok(network) => tracing::warn!(
            expected = config.blockchain.chain_id,
            actual = network.chain_id,
            "Connected to an unexpected network"
        ),
        Err(e) => tracing::warn!(error = %e, "Network check failed; continuing"),
    }

    let store = Arc::new(match &config.store.persistence_path {
        Some(path) => MemoryStore::load_from_file(path)?,
        None => MemoryStore::new(None),
    });

    let relay = Relay::new(gateway, store.clone(), config.relay.clone());
    let server = HttpServer::new(&config, relay);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());
    server.run(listener, shutdown.signalled()).await?;

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to save store snapshot");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
