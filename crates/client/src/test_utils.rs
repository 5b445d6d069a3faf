//! In-memory provider for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use auction_types::{
    Address, AuctionCall, AuctionEvent, LogEntry, Transaction, TxHash, TxReceipt, Wei,
};
use parking_lot::{Mutex, MutexGuard};

use crate::error::ClientError;
use crate::provider::{AuctionContract, WalletProvider};

pub const CONTRACT: Address = Address::new([0xaa; 20]);
pub const OWNER: Address = Address::new([1u8; 20]);
pub const USER1: Address = Address::new([2u8; 20]);
pub const USER2: Address = Address::new([3u8; 20]);

/// Mutable chain state behind [`FakeProvider`].
#[derive(Default)]
pub struct FakeState {
    pub accounts: Vec<Address>,
    pub block: u64,
    pub logs: Vec<LogEntry>,
    pub owner: Address,
    pub highest_bid: Wei,
    pub highest_bidder: Address,
    pub bids: HashMap<Address, Wei>,
    pub ended: bool,
    /// Fail every read with a provider error
    pub fail_reads: bool,
    /// Revert every transaction with this message
    pub revert: Option<String>,
    pub sent: Vec<Transaction>,
}

/// Provider that applies calls without enforcing auction rules.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn with_accounts(accounts: &[Address]) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.state();
            state.accounts = accounts.to_vec();
            state.owner = OWNER;
        }
        provider
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn set_block(&self, height: u64) {
        self.state().block = height;
    }

    pub fn push_log(&self, log: LogEntry) {
        self.state().logs.push(log);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn revert_with(&self, message: &str) {
        self.state().revert = Some(message.to_string());
    }

    fn read<T>(&self, f: impl FnOnce(&FakeState) -> T) -> Result<T, ClientError> {
        let state = self.state();
        if state.fail_reads {
            return Err(ClientError::Provider("connection refused".into()));
        }
        Ok(f(&state))
    }
}

#[async_trait]
impl WalletProvider for FakeProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.read(|s| s.accounts.clone())
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        self.read(|s| s.block)
    }

    async fn logs_since(&self, from_block: u64) -> Result<Vec<LogEntry>, ClientError> {
        self.read(|s| {
            s.logs
                .iter()
                .filter(|log| log.block_number >= from_block)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl AuctionContract for FakeProvider {
    fn contract_address(&self) -> Address {
        CONTRACT
    }

    async fn get_highest_bid(&self) -> Result<Wei, ClientError> {
        self.read(|s| s.highest_bid)
    }

    async fn get_highest_bidder(&self) -> Result<Address, ClientError> {
        self.read(|s| s.highest_bidder)
    }

    async fn bids(&self, account: Address) -> Result<Wei, ClientError> {
        self.read(|s| s.bids.get(&account).copied().unwrap_or_default())
    }

    async fn get_owner(&self) -> Result<Address, ClientError> {
        self.read(|s| s.owner)
    }

    async fn is_ended(&self) -> Result<bool, ClientError> {
        self.read(|s| s.ended)
    }

    async fn send(&self, tx: Transaction) -> Result<TxReceipt, ClientError> {
        let mut state = self.state();
        if let Some(message) = state.revert.clone() {
            return Err(ClientError::Reverted(message));
        }

        let event = match tx.call {
            AuctionCall::Bid => {
                state.highest_bid = tx.value;
                state.highest_bidder = tx.from;
                state.bids.insert(tx.from, tx.value);
                AuctionEvent::Bid {
                    bidder: tx.from,
                    amount: tx.value,
                }
            }
            AuctionCall::Withdraw => AuctionEvent::Withdraw {
                recipient: tx.from,
                amount: state.bids.remove(&tx.from).unwrap_or_default(),
            },
            AuctionCall::EndAuction => {
                state.ended = true;
                AuctionEvent::AuctionEnded {
                    winner: state.highest_bidder,
                    amount: state.highest_bid,
                }
            }
        };

        state.block += 1;
        state.sent.push(tx);

        Ok(TxReceipt {
            tx_hash: TxHash::repeat_byte(state.sent.len() as u8),
            block_number: state.block,
            gas_used: 21_000,
            events: vec![event],
        })
    }
}
