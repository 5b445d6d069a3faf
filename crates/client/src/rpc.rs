//! JSON-RPC provider backed by a jsonrpsee HTTP client.

use async_trait::async_trait;
use auction_types::{Address, BlockInfo, LogEntry, Transaction, TxReceipt, Wei};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::ClientError as RpcError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::provider::{AuctionContract, WalletProvider};

/// Error code the chain uses for a reverted transaction.
pub const EXECUTION_REVERTED: i32 = 3;

/// Error code the wallet uses for a rejected request.
pub const USER_REJECTED: i32 = 4001;

/// Provider talking to the chain over JSON-RPC.
pub struct RpcProvider {
    client: HttpClient,
    contract: Address,
    /// Account requested from the wallet
    account: Option<Address>,
}

impl RpcProvider {
    /// Build a provider for the configured endpoint.
    ///
    /// The contract address is discovered from the chain when not configured.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = HttpClientBuilder::default()
            .build(&config.rpc_endpoint)
            .map_err(map_rpc_error)?;

        let contract = match config.contract_address {
            Some(address) => address,
            None => client
                .request("auction_getContractAddress", rpc_params![])
                .await
                .map_err(map_rpc_error)?,
        };

        debug!(endpoint = %config.rpc_endpoint, %contract, "RPC provider ready");

        Ok(Self {
            client,
            contract,
            account: config.account,
        })
    }
}

/// Map a JSON-RPC failure onto the client's error taxonomy.
pub fn map_rpc_error(err: RpcError) -> ClientError {
    match err {
        RpcError::Call(obj) if obj.code() == EXECUTION_REVERTED => {
            ClientError::Reverted(obj.message().to_string())
        }
        RpcError::Call(obj) if obj.code() == USER_REJECTED => {
            ClientError::AccessDenied(obj.message().to_string())
        }
        other => ClientError::Provider(other.to_string()),
    }
}

#[async_trait]
impl WalletProvider for RpcProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.client
            .request("wallet_requestAccounts", rpc_params![self.account])
            .await
            .map_err(map_rpc_error)
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        let info: BlockInfo = self
            .client
            .request("chain_getBlockInfo", rpc_params![])
            .await
            .map_err(map_rpc_error)?;
        Ok(info.height)
    }

    async fn logs_since(&self, from_block: u64) -> Result<Vec<LogEntry>, ClientError> {
        self.client
            .request("chain_getLogs", rpc_params![from_block])
            .await
            .map_err(map_rpc_error)
    }
}

#[async_trait]
impl AuctionContract for RpcProvider {
    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn get_highest_bid(&self) -> Result<Wei, ClientError> {
        self.client
            .request("auction_getHighestBid", rpc_params![])
            .await
            .map_err(map_rpc_error)
    }

    async fn get_highest_bidder(&self) -> Result<Address, ClientError> {
        self.client
            .request("auction_getHighestBidder", rpc_params![])
            .await
            .map_err(map_rpc_error)
    }

    async fn bids(&self, account: Address) -> Result<Wei, ClientError> {
        self.client
            .request("auction_bids", rpc_params![account])
            .await
            .map_err(map_rpc_error)
    }

    async fn get_owner(&self) -> Result<Address, ClientError> {
        self.client
            .request("auction_getOwner", rpc_params![])
            .await
            .map_err(map_rpc_error)
    }

    async fn is_ended(&self) -> Result<bool, ClientError> {
        self.client
            .request("auction_isEnded", rpc_params![])
            .await
            .map_err(map_rpc_error)
    }

    async fn send(&self, tx: Transaction) -> Result<TxReceipt, ClientError> {
        self.client
            .request("auction_sendTransaction", rpc_params![tx])
            .await
            .map_err(map_rpc_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    fn call_error(code: i32, message: &str) -> RpcError {
        RpcError::Call(ErrorObjectOwned::owned(code, message.to_string(), None::<()>))
    }

    #[test]
    fn test_revert_code_maps_to_reverted() {
        let err = map_rpc_error(call_error(3, "Owner cannot call this function."));
        assert_eq!(
            err,
            ClientError::Reverted("Owner cannot call this function.".into())
        );
        assert!(err.is_revert());
    }

    #[test]
    fn test_user_rejected_maps_to_access_denied() {
        let err = map_rpc_error(call_error(4001, "User rejected the request."));
        assert!(matches!(err, ClientError::AccessDenied(_)));
    }

    #[test]
    fn test_other_codes_map_to_provider() {
        let err = map_rpc_error(call_error(-32000, "Out of gas"));
        assert!(matches!(err, ClientError::Provider(msg) if msg.contains("Out of gas")));
    }
}
