//! Deployment configuration for the auction contract.

use auction_types::Address;
use serde::{Deserialize, Serialize};

/// Parameters fixed when the contract is deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Deploying account; owns the auction for the contract's lifetime
    pub owner: Address,
    /// First block at which bids are accepted
    pub start_block: u64,
}

impl AuctionGenesisConfig {
    /// Deploy with bidding open from the first block.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            start_block: 0,
        }
    }

    /// Delay bidding until `start_block`.
    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.start_block = start_block;
        self
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.owner == Address::ZERO {
            return Err(GenesisValidationError::ZeroOwner);
        }
        Ok(())
    }
}

/// Errors in genesis configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Owner must not be the zero address")]
    ZeroOwner,
}
