//! Provider interfaces consumed by the auction client.
//!
//! A wallet provider grants account access and reports chain progress; the
//! auction contract exposes the reads and writes the client relays. One
//! provider handle is shared by every operation of a session.

use async_trait::async_trait;
use auction_types::{Address, LogEntry, Transaction, TxReceipt, Wei};

use crate::error::ClientError;

/// Wallet side of a provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account access. The first entry is the active account.
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError>;

    /// Latest block height.
    async fn block_number(&self) -> Result<u64, ClientError>;

    /// Contract logs recorded at or after `from_block`.
    async fn logs_since(&self, from_block: u64) -> Result<Vec<LogEntry>, ClientError>;
}

/// Contract side of a provider.
#[async_trait]
pub trait AuctionContract: Send + Sync {
    /// Address of the auction contract.
    fn contract_address(&self) -> Address;

    async fn get_highest_bid(&self) -> Result<Wei, ClientError>;

    async fn get_highest_bidder(&self) -> Result<Address, ClientError>;

    async fn bids(&self, account: Address) -> Result<Wei, ClientError>;

    async fn get_owner(&self) -> Result<Address, ClientError>;

    async fn is_ended(&self) -> Result<bool, ClientError>;

    /// Submit a state-changing call and wait for its receipt.
    async fn send(&self, tx: Transaction) -> Result<TxReceipt, ClientError>;
}

/// A provider offering both the wallet and the contract interface.
pub trait Provider: WalletProvider + AuctionContract {}

impl<T: WalletProvider + AuctionContract> Provider for T {}
