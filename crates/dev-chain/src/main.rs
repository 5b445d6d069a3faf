//! Development chain server for local testing of the auction client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::utils::parse_ether;
use anyhow::{anyhow, Result};
use clap::Parser;
use parking_lot::RwLock;
use tracing::info;

use auction_dev_chain::{dev_accounts, spawn_block_producer, start, ChainConfig, DevChain};

#[derive(Parser)]
#[command(name = "dev-chain")]
#[command(about = "Local chain hosting the English auction contract")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Number of unlocked accounts (the first one owns the auction)
    #[arg(long, default_value = "3")]
    accounts: u8,

    /// Initial balance per account, in ether
    #[arg(long, default_value = "100")]
    balance: String,

    /// First block at which bids are accepted
    #[arg(long, default_value = "0")]
    start_block: u64,

    /// Interval between produced blocks, in milliseconds (0 disables)
    #[arg(long, default_value = "2000")]
    block_time_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dev_chain=info".parse()?)
                .add_directive("auction_dev_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = ChainConfig {
        accounts: dev_accounts(cli.accounts),
        initial_balance: parse_ether(&cli.balance)
            .map_err(|e| anyhow!("Invalid balance {:?}: {}", cli.balance, e))?,
        start_block: cli.start_block,
        ..Default::default()
    };

    let chain = DevChain::new(&config)?;
    for (i, account) in chain.accounts().iter().enumerate() {
        info!("Account {}: {}{}", i, account, if i == 0 { " (owner)" } else { "" });
    }
    info!("Auction contract: {}", chain.contract_address());

    let state = Arc::new(RwLock::new(chain));
    let (_, handle) = start(cli.listen, state.clone()).await?;

    let producer = (cli.block_time_ms > 0)
        .then(|| spawn_block_producer(state, Duration::from_millis(cli.block_time_ms)));

    info!("Dev chain running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    if let Some(producer) = producer {
        producer.abort();
    }
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
