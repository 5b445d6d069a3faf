//! Contract storage for the English auction.

use auction_types::{Address, AuctionPhase, Wei};
use std::collections::HashMap;

use crate::genesis::{AuctionGenesisConfig, GenesisValidationError};

/// Auction contract state.
///
/// In a deployed contract these would be storage slots; this is the
/// in-memory equivalent hosted by the development chain.
#[derive(Debug, Clone)]
pub struct AuctionState {
    /// Deploying account
    pub owner: Address,

    /// First block at which bids are accepted
    pub start_block: u64,

    /// Current highest bid
    pub highest_bid: Wei,

    /// Current highest bidder (zero address until the first bid)
    pub highest_bidder: Address,

    /// Outstanding bid per account
    pub bids: HashMap<Address, Wei>,

    /// Set once by `endAuction`
    pub ended: bool,

    /// Whether the owner already collected the winning bid
    pub proceeds_withdrawn: bool,

    /// Funds held by the contract
    pub balance: Wei,
}

impl AuctionState {
    /// Deploy a new auction.
    pub fn deploy(config: &AuctionGenesisConfig) -> Result<Self, GenesisValidationError> {
        config.validate()?;
        Ok(Self {
            owner: config.owner,
            start_block: config.start_block,
            highest_bid: Wei::ZERO,
            highest_bidder: Address::ZERO,
            bids: HashMap::new(),
            ended: false,
            proceeds_withdrawn: false,
            balance: Wei::ZERO,
        })
    }

    /// `getHighestBid()`
    pub fn get_highest_bid(&self) -> Wei {
        self.highest_bid
    }

    /// `getHighestBidder()`
    pub fn get_highest_bidder(&self) -> Address {
        self.highest_bidder
    }

    /// `bids(address)`
    pub fn bid_of(&self, account: &Address) -> Wei {
        self.bids.get(account).copied().unwrap_or(Wei::ZERO)
    }

    /// `getOwner()`
    pub fn get_owner(&self) -> Address {
        self.owner
    }

    /// `isEnded()`
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Phase of the auction at the given block.
    pub fn phase(&self, block_height: u64) -> AuctionPhase {
        if self.ended {
            AuctionPhase::Ended
        } else if block_height < self.start_block {
            AuctionPhase::NotStarted
        } else {
            AuctionPhase::Open
        }
    }
}
