//! Reference English auction contract.
//!
//! This crate holds the logic the auction client talks to:
//!
//! - Strictly increasing bids from non-owner accounts
//! - Custody of bid funds and withdrawal of superseded bids
//! - Owner-only, irreversible termination of the auction
//!
//! # Architecture
//!
//! - `handlers`: Business logic for each state-changing call
//! - `state`: Contract storage and read accessors
//! - `genesis`: Deployment configuration
//! - `error`: Revert reasons
//!
//! # Example
//!
//! ```ignore
//! use auction_contract::{handlers, AuctionGenesisConfig, AuctionState, CallContext};
//!
//! let mut state = AuctionState::deploy(&AuctionGenesisConfig::new(owner))?;
//! let ctx = CallContext { sender: bidder, block_height: 1, value: amount };
//! let effects = handlers::handle_call(&mut state, &ctx, AuctionCall::Bid)?;
//! ```

pub mod error;
pub mod genesis;
pub mod handlers;
pub mod state;

pub use error::ContractError;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError};
pub use handlers::{CallContext, CallEffects, HandlerResult};
pub use state::AuctionState;
