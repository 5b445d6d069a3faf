//! Client SDK for an on-chain English auction.
//!
//! This crate provides:
//! - An [`AuctionClient`] that relays bids, withdrawals and the owner's
//!   `endAuction` call through a wallet provider
//! - An immutable view of the auction, refreshed on events and new blocks
//! - A single persistent chain subscription per session
//! - Amount parsing and 4-significant-digit formatting
//! - A text renderer for the auction page

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod provider;
pub mod render;
pub mod rpc;
pub mod units;
pub mod view;

#[cfg(test)]
mod test_utils;

pub use client::{AuctionClient, Notice, Operation};
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{spawn_subscription, ChainNotification};
pub use provider::{AuctionContract, Provider, WalletProvider};
pub use render::render;
pub use rpc::RpcProvider;
pub use units::{format_amount, parse_amount};
pub use view::{AuctionView, BidInput, RefreshToken, ViewStore};
