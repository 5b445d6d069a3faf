//! Local development chain for the English auction.
//!
//! Hosts one deployed auction contract with a handful of unlocked, funded
//! accounts, mines one block per transaction and serves everything over
//! JSON-RPC so the client can run end to end without a real network.

pub mod chain;
pub mod server;

pub use chain::{dev_accounts, ChainConfig, ChainError, DevChain};
pub use server::{spawn_block_producer, start, DevChainServer, SharedChain};
