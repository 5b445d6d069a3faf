//! CLI for interacting with an on-chain English auction.
//!
//! This binary provides commands for:
//! - Showing the auction page
//! - Bidding, withdrawing and ending the auction
//! - Watching the auction live in an interactive session

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use auction_types::Address;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use auction_client::{render, spawn_subscription, AuctionClient, BidInput, ClientConfig, RpcProvider};

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for an on-chain English auction")]
struct Cli {
    /// Chain RPC endpoint
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account to request from the wallet
    #[arg(long, global = true)]
    account: Option<Address>,

    /// Auction contract address
    #[arg(long, global = true)]
    contract: Option<Address>,

    /// Gas ceiling attached to every transaction
    #[arg(long, global = true)]
    gas_limit: Option<u64>,

    /// Block polling interval for `watch`
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the auction page
    Status,

    /// Place a bid
    Bid {
        /// Bid amount in ether (decimal)
        #[arg(long)]
        amount: String,
    },

    /// Withdraw a losing bid, or the proceeds as owner
    Withdraw,

    /// End the auction (owner only)
    End,

    /// Follow the auction and accept commands on stdin
    Watch,
}

impl Cli {
    /// File values first, then flags.
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(rpc) = &self.rpc {
            config.rpc_endpoint = rpc.clone();
        }
        if self.account.is_some() {
            config.account = self.account;
        }
        if self.contract.is_some() {
            config.contract_address = self.contract;
        }
        if let Some(gas_limit) = self.gas_limit {
            config.gas_limit = gas_limit;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        Ok(config)
    }
}

type Client = AuctionClient<RpcProvider>;

fn print_page(client: &Client, input: &BidInput) {
    println!("{}", render(&client.view(), client.contract_address(), input));
}

async fn status_cmd(client: &Client) -> Result<()> {
    // Failures are reported as notices; the page shows what could be read.
    let _ = client.sync().await;
    print_page(client, &BidInput::default());
    Ok(())
}

async fn bid_cmd(client: &Client, amount: &str) -> Result<()> {
    client.connect().await?;
    let receipt = client.submit_bid(amount).await?;
    println!("Bid confirmed in block {}", receipt.block_number);
    println!("  Tx: {}", receipt.tx_hash);

    let mut input = BidInput::default();
    input.set(amount);
    let _ = client.sync().await;
    print_page(client, &input);
    Ok(())
}

async fn withdraw_cmd(client: &Client) -> Result<()> {
    client.connect().await?;
    let receipt = client.withdraw().await?;
    println!("Withdrawal confirmed in block {}", receipt.block_number);
    println!("  Tx: {}", receipt.tx_hash);
    Ok(())
}

async fn end_cmd(client: &Client) -> Result<()> {
    client.connect().await?;
    let receipt = client.end_auction().await?;
    println!("Auction ended in block {}", receipt.block_number);
    println!("  Tx: {}", receipt.tx_hash);
    Ok(())
}

async fn watch_cmd(client: Arc<Client>, config: &ClientConfig) -> Result<()> {
    let mut view_rx = client.subscribe_view();
    let mut notice_rx = client.subscribe_notices();

    let _ = client.sync().await;

    let runner = match client.provider() {
        Some(provider) => {
            let (rx, poller) = spawn_subscription(provider.clone(), config.poll_interval());
            let session = client.clone();
            let run = tokio::spawn(async move { session.run(rx).await });
            Some((poller, run))
        }
        None => None,
    };

    let mut input = BidInput::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_page(&client, &input);
    println!("Commands: bid <amount> | withdraw | end | refresh | quit");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("bid"), Some(amount)) => {
                        input.set(amount);
                        let _ = client.submit_bid(input.as_str()).await;
                    }
                    (Some("withdraw"), None) => {
                        let _ = client.withdraw().await;
                    }
                    (Some("end"), None) => {
                        let _ = client.end_auction().await;
                    }
                    (Some("refresh"), None) => {
                        let _ = client.sync().await;
                    }
                    (Some("quit"), None) => break,
                    (None, _) => {}
                    _ => println!("Unknown command: {}", line.trim()),
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_page(&client, &input);
            }
            notice = notice_rx.recv() => match notice {
                Ok(notice) if notice.error.is_revert() => {
                    eprintln!("! {} rejected by the auction: {}", notice.operation, notice.error)
                }
                Ok(notice) => eprintln!("! {}", notice),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Notices dropped"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some((poller, run)) = runner {
        poller.abort();
        run.abort();
    }
    info!("Watch session ended");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?)
                .add_directive("auction_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.client_config()?;

    let provider = match RpcProvider::connect(&config).await {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(endpoint = %config.rpc_endpoint, error = %e, "No wallet provider available");
            None
        }
    };
    let client = Arc::new(AuctionClient::new(provider, config.gas_limit));

    match cli.command {
        Commands::Status => status_cmd(&client).await?,
        Commands::Bid { amount } => bid_cmd(&client, &amount).await?,
        Commands::Withdraw => withdraw_cmd(&client).await?,
        Commands::End => end_cmd(&client).await?,
        Commands::Watch => watch_cmd(client, &config).await?,
    }

    Ok(())
}
