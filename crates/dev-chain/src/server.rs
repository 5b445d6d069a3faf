//! JSON-RPC server exposing the development chain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use auction_types::{
    Address, AuctionPhase, BlockInfo, LogEntry, Transaction, TxReceipt, Wei,
};
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chain::{ChainError, DevChain};

/// Error code for a reverted transaction.
pub const EXECUTION_REVERTED: i32 = 3;

/// Error code for a rejected wallet request.
pub const USER_REJECTED: i32 = 4001;

/// Error code for any other chain error.
pub const CHAIN_ERROR: i32 = -32000;

/// Chain state shared between the RPC server and the block producer.
pub type SharedChain = Arc<RwLock<DevChain>>;

/// RPC API definition for the development chain.
#[rpc(server)]
pub trait DevChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    // ============ Chain / Wallet Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get contract logs at or after a block.
    #[method(name = "chain_getLogs")]
    async fn chain_get_logs(&self, from_block: u64) -> Result<Vec<LogEntry>, ErrorObjectOwned>;

    /// Get an account balance.
    #[method(name = "chain_getBalance")]
    async fn chain_get_balance(&self, account: Address) -> Result<Wei, ErrorObjectOwned>;

    /// Ask the wallet for account access.
    #[method(name = "wallet_requestAccounts")]
    async fn wallet_request_accounts(
        &self,
        account: Option<Address>,
    ) -> Result<Vec<Address>, ErrorObjectOwned>;

    // ============ Contract Reads ============

    #[method(name = "auction_getContractAddress")]
    async fn auction_get_contract_address(&self) -> Result<Address, ErrorObjectOwned>;

    #[method(name = "auction_getHighestBid")]
    async fn auction_get_highest_bid(&self) -> Result<Wei, ErrorObjectOwned>;

    #[method(name = "auction_getHighestBidder")]
    async fn auction_get_highest_bidder(&self) -> Result<Address, ErrorObjectOwned>;

    #[method(name = "auction_bids")]
    async fn auction_bids(&self, account: Address) -> Result<Wei, ErrorObjectOwned>;

    #[method(name = "auction_getOwner")]
    async fn auction_get_owner(&self) -> Result<Address, ErrorObjectOwned>;

    #[method(name = "auction_isEnded")]
    async fn auction_is_ended(&self) -> Result<bool, ErrorObjectOwned>;

    #[method(name = "auction_getPhase")]
    async fn auction_get_phase(&self) -> Result<AuctionPhase, ErrorObjectOwned>;

    // ============ Contract Writes ============

    /// Execute a state-changing call and mine it.
    #[method(name = "auction_sendTransaction")]
    async fn auction_send_transaction(
        &self,
        tx: Transaction,
    ) -> Result<TxReceipt, ErrorObjectOwned>;
}

/// Implementation of the development chain RPC server.
pub struct DevChainServer {
    state: SharedChain,
}

impl DevChainServer {
    pub fn new(state: SharedChain) -> Self {
        Self { state }
    }

    fn rpc_error(err: ChainError) -> ErrorObjectOwned {
        match &err {
            ChainError::Reverted(reason) => {
                ErrorObjectOwned::owned(EXECUTION_REVERTED, reason.to_string(), None::<()>)
            }
            ChainError::UserRejected => {
                ErrorObjectOwned::owned(USER_REJECTED, err.to_string(), None::<()>)
            }
            _ => ErrorObjectOwned::owned(CHAIN_ERROR, err.to_string(), None::<()>),
        }
    }
}

#[async_trait]
impl DevChainApiServer for DevChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        Ok(state.advance_block())
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        Ok(self.state.read().block_info())
    }

    async fn chain_get_logs(&self, from_block: u64) -> Result<Vec<LogEntry>, ErrorObjectOwned> {
        Ok(self.state.read().logs_since(from_block))
    }

    async fn chain_get_balance(&self, account: Address) -> Result<Wei, ErrorObjectOwned> {
        Ok(self.state.read().balance_of(&account))
    }

    async fn wallet_request_accounts(
        &self,
        account: Option<Address>,
    ) -> Result<Vec<Address>, ErrorObjectOwned> {
        self.state
            .read()
            .request_accounts(account)
            .map_err(Self::rpc_error)
    }

    async fn auction_get_contract_address(&self) -> Result<Address, ErrorObjectOwned> {
        Ok(self.state.read().contract_address())
    }

    async fn auction_get_highest_bid(&self) -> Result<Wei, ErrorObjectOwned> {
        Ok(self.state.read().contract().get_highest_bid())
    }

    async fn auction_get_highest_bidder(&self) -> Result<Address, ErrorObjectOwned> {
        Ok(self.state.read().contract().get_highest_bidder())
    }

    async fn auction_bids(&self, account: Address) -> Result<Wei, ErrorObjectOwned> {
        Ok(self.state.read().contract().bid_of(&account))
    }

    async fn auction_get_owner(&self) -> Result<Address, ErrorObjectOwned> {
        Ok(self.state.read().contract().get_owner())
    }

    async fn auction_is_ended(&self) -> Result<bool, ErrorObjectOwned> {
        Ok(self.state.read().contract().is_ended())
    }

    async fn auction_get_phase(&self) -> Result<AuctionPhase, ErrorObjectOwned> {
        Ok(self.state.read().phase())
    }

    async fn auction_send_transaction(
        &self,
        tx: Transaction,
    ) -> Result<TxReceipt, ErrorObjectOwned> {
        let call = tx.call;
        let from = tx.from;
        let mut state = self.state.write();
        state.submit(tx).map_err(|e| {
            info!(call = call.name(), %from, error = %e, "Transaction failed");
            Self::rpc_error(e)
        })
    }
}

/// Start the RPC server on `addr`, returning the bound address.
pub async fn start(addr: SocketAddr, state: SharedChain) -> Result<(SocketAddr, ServerHandle)> {
    let server = Server::builder().build(addr).await?;
    let local_addr = server.local_addr()?;
    let handle = server.start(DevChainServer::new(state).into_rpc());

    info!("Dev chain RPC listening on {}", local_addr);
    Ok((local_addr, handle))
}

/// Spawn a task that advances the chain by one block every `interval`.
pub fn spawn_block_producer(state: SharedChain, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let block = state.write().advance_block();
            debug!(height = block.height, "Block produced");
        }
    })
}
