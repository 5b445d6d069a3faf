//! Core type definitions for the English auction.
//!
//! This crate provides the data structures shared by the reference contract,
//! the development chain and the client: amounts, calls, events, receipts and
//! the transaction hash used to identify submitted calls.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use alloy_primitives::{Address, B256, U256};

// =========================
// AMOUNTS
// =========================

/// Amount in the contract's smallest currency unit (wei).
pub type Wei = U256;

/// Number of decimals between ether and wei.
pub const ETHER_DECIMALS: u8 = 18;

/// Gas ceiling attached to every state-changing call.
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Transaction hash.
pub type TxHash = B256;

// =========================
// AUCTION LIFECYCLE
// =========================

/// Lifecycle of the auction as observed from outside the contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionPhase {
    /// Start block not reached yet
    NotStarted,
    /// Accepting bids
    Open,
    /// Ended by the owner; irreversible
    Ended,
}

/// State-changing contract functions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuctionCall {
    /// `bid()` payable
    Bid,
    /// `withdraw()`
    Withdraw,
    /// `endAuction()`, owner only
    EndAuction,
}

impl AuctionCall {
    /// Solidity-style function name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuctionCall::Bid => "bid",
            AuctionCall::Withdraw => "withdraw",
            AuctionCall::EndAuction => "endAuction",
        }
    }
}

/// Events emitted by the auction contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuctionEvent {
    Bid { bidder: Address, amount: Wei },
    Withdraw { recipient: Address, amount: Wei },
    AuctionEnded { winner: Address, amount: Wei },
}

/// Discriminant of [`AuctionEvent`], used to route notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Bid,
    Withdraw,
    AuctionEnded,
}

impl AuctionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AuctionEvent::Bid { .. } => EventKind::Bid,
            AuctionEvent::Withdraw { .. } => EventKind::Withdraw,
            AuctionEvent::AuctionEnded { .. } => EventKind::AuctionEnded,
        }
    }
}

// =========================
// CHAIN TYPES
// =========================

/// A state-changing call as submitted by a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Address,
    pub call: AuctionCall,
    /// Value attached to the call (only `bid` is payable)
    pub value: Wei,
    pub gas_limit: u64,
}

impl Transaction {
    /// Build a call with no attached value.
    pub fn new(from: Address, call: AuctionCall, gas_limit: u64) -> Self {
        Self {
            from,
            call,
            value: Wei::ZERO,
            gas_limit,
        }
    }

    /// Attach a value to the call.
    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}

/// Receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// Events emitted by the call, in emission order
    pub events: Vec<AuctionEvent>,
}

/// An event as recorded in the chain log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub block_number: u64,
    pub tx_hash: TxHash,
    pub event: AuctionEvent,
}

/// Block info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Compute the hash identifying a transaction.
///
/// H = SHA256(sender || nonce_le || borsh(call) || value_be)
pub fn compute_tx_hash(
    sender: &Address,
    nonce: u64,
    call: &AuctionCall,
    value: &Wei,
) -> std::io::Result<TxHash> {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_slice());
    hasher.update(nonce.to_le_bytes());
    hasher.update(borsh::to_vec(call)?);
    hasher.update(value.to_be_bytes::<32>());
    let digest: [u8; 32] = hasher.finalize().into();
    Ok(TxHash::from(digest))
}
