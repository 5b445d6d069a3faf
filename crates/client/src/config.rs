//! Client configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use auction_types::{Address, DEFAULT_GAS_LIMIT};
use serde::{Deserialize, Serialize};

/// Configuration for the auction client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the chain
    pub rpc_endpoint: String,
    /// Auction contract address (discovered from the chain when unset)
    pub contract_address: Option<Address>,
    /// Account to request from the wallet (the wallet's default when unset)
    pub account: Option<Address>,
    /// Gas ceiling attached to every transaction
    pub gas_limit: u64,
    /// Block polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:9944".to_string(),
            contract_address: None,
            account: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            poll_interval_ms: 1000,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
