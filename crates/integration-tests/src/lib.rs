//! End-to-end integration tests for the English auction.
//!
//! These tests drive the auction client against the development chain:
//! 1. In process, through a provider wrapping the shared chain
//! 2. Over JSON-RPC, through the dev chain server and `RpcProvider`

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::utils::parse_ether;
use async_trait::async_trait;
use auction_client::{
    render, spawn_subscription, AuctionClient, AuctionContract, BidInput, ClientConfig,
    ClientError, RpcProvider, WalletProvider,
};
use auction_dev_chain::{dev_accounts, ChainConfig, ChainError, DevChain, SharedChain};
use auction_types::{Address, AuctionPhase, LogEntry, Transaction, TxReceipt, Wei};
use parking_lot::RwLock;

/// Provider that talks to an in-process chain as one unlocked account.
pub struct LocalProvider {
    chain: SharedChain,
    account: Option<Address>,
}

impl LocalProvider {
    pub fn new(chain: SharedChain, account: Option<Address>) -> Self {
        Self { chain, account }
    }
}

fn map_chain_error(err: ChainError) -> ClientError {
    match err {
        ChainError::Reverted(reason) => ClientError::Reverted(reason.to_string()),
        ChainError::UserRejected => {
            ClientError::AccessDenied(ChainError::UserRejected.to_string())
        }
        other => ClientError::Provider(other.to_string()),
    }
}

#[async_trait]
impl WalletProvider for LocalProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ClientError> {
        self.chain
            .read()
            .request_accounts(self.account)
            .map_err(map_chain_error)
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        Ok(self.chain.read().block_info().height)
    }

    async fn logs_since(&self, from_block: u64) -> Result<Vec<LogEntry>, ClientError> {
        Ok(self.chain.read().logs_since(from_block))
    }
}

#[async_trait]
impl AuctionContract for LocalProvider {
    fn contract_address(&self) -> Address {
        self.chain.read().contract_address()
    }

    async fn get_highest_bid(&self) -> Result<Wei, ClientError> {
        Ok(self.chain.read().contract().get_highest_bid())
    }

    async fn get_highest_bidder(&self) -> Result<Address, ClientError> {
        Ok(self.chain.read().contract().get_highest_bidder())
    }

    async fn bids(&self, account: Address) -> Result<Wei, ClientError> {
        Ok(self.chain.read().contract().bid_of(&account))
    }

    async fn get_owner(&self) -> Result<Address, ClientError> {
        Ok(self.chain.read().contract().get_owner())
    }

    async fn is_ended(&self) -> Result<bool, ClientError> {
        Ok(self.chain.read().contract().is_ended())
    }

    async fn send(&self, tx: Transaction) -> Result<TxReceipt, ClientError> {
        self.chain.write().submit(tx).map_err(map_chain_error)
    }
}

/// Fresh chain with three funded accounts: owner, user 1 and user 2.
pub fn local_chain() -> (SharedChain, [Address; 3]) {
    let config = ChainConfig::default();
    let chain = DevChain::new(&config).expect("default chain config is valid");
    let accounts = dev_accounts(3);
    (
        Arc::new(RwLock::new(chain)),
        [accounts[0], accounts[1], accounts[2]],
    )
}

/// Client acting as `account` on `chain`.
pub fn local_client(chain: &SharedChain, account: Address) -> AuctionClient<LocalProvider> {
    let provider = LocalProvider::new(chain.clone(), Some(account));
    AuctionClient::new(Some(Arc::new(provider)), auction_types::DEFAULT_GAS_LIMIT)
}

fn ether(amount: &str) -> Wei {
    parse_ether(amount).unwrap()
}

fn revert_reason(result: Result<TxReceipt, ClientError>) -> String {
    match result {
        Err(ClientError::Reverted(reason)) => reason,
        other => panic!("expected a revert, got {:?}", other),
    }
}

/// Full lifecycle through the client: rules come from the contract only.
#[tokio::test]
async fn test_auction_lifecycle_through_client() {
    let (chain, [owner, user1, user2]) = local_chain();

    let owner_client = local_client(&chain, owner);
    let user1_client = local_client(&chain, user1);
    let user2_client = local_client(&chain, user2);
    for client in [&owner_client, &user1_client, &user2_client] {
        client.sync().await.unwrap();
    }

    assert!(owner_client.view().is_owner);
    assert!(!user1_client.view().is_owner);
    assert_eq!(chain.read().contract().get_owner(), owner);

    // The owner may not bid.
    let before = owner_client.view();
    assert_eq!(
        revert_reason(owner_client.submit_bid("1").await),
        "Owner cannot call this function."
    );
    assert_eq!(owner_client.view(), before);

    // User 1 bids 5 ether.
    user1_client.submit_bid("5").await.unwrap();
    let view = user1_client.view();
    assert_eq!(view.my_bid, ether("5"));
    assert_eq!(view.my_bid_display(), "5.000");
    assert_eq!(view.highest_bid_display(), "5.000");
    assert_eq!(view.highest_bidder_label(), "Me");

    // Lower and equal bids are rejected by the contract.
    assert_eq!(
        revert_reason(user2_client.submit_bid("3").await),
        "There is already a higher or equal bid."
    );
    assert_eq!(
        revert_reason(user2_client.submit_bid("5").await),
        "There is already a higher or equal bid."
    );

    // User 2 outbids, user 1 reclaims their bid.
    user2_client.submit_bid("6").await.unwrap();
    assert_eq!(
        revert_reason(user2_client.withdraw().await),
        "Highest bidder cannot withdraw."
    );

    user1_client.withdraw().await.unwrap();
    assert_eq!(user1_client.view().my_bid, Wei::ZERO);
    assert_eq!(chain.read().balance_of(&user1), ether("100"));

    // Only the owner ends the auction, and only once.
    assert_eq!(
        revert_reason(user1_client.end_auction().await),
        "Only owner can call this function."
    );
    owner_client.end_auction().await.unwrap();
    assert!(owner_client.view().is_ended);
    assert_eq!(chain.read().phase(), AuctionPhase::Ended);

    assert_eq!(
        revert_reason(user1_client.submit_bid("10").await),
        "Auction is already ended."
    );
    assert_eq!(
        revert_reason(owner_client.end_auction().await),
        "Auction is already ended."
    );

    // The owner collects the winning bid exactly once.
    owner_client.withdraw().await.unwrap();
    assert_eq!(chain.read().balance_of(&owner), ether("106"));
    assert_eq!(
        revert_reason(owner_client.withdraw().await),
        "Nothing to withdraw."
    );

    user2_client.sync().await.unwrap();
    let page = render(
        &user2_client.view(),
        user2_client.contract_address(),
        &BidInput::default(),
    );
    assert!(page.contains("Auction is ended"));
    assert!(page.contains("Highest bidder: Me"));
    assert!(page.contains("Highest bid: 6.000"));
}

/// Another account's bid reaches a watching client through the subscription.
#[tokio::test]
async fn test_subscription_refreshes_watching_client() {
    let (chain, [_, user1, user2]) = local_chain();

    let watcher = Arc::new(local_client(&chain, user1));
    watcher.sync().await.unwrap();

    let provider = watcher.provider().cloned().unwrap();
    let (rx, poller) = spawn_subscription(provider, Duration::from_millis(10));
    let session = watcher.clone();
    let runner = tokio::spawn(async move { session.run(rx).await });

    let bidder = local_client(&chain, user2);
    bidder.sync().await.unwrap();
    bidder.submit_bid("2.5").await.unwrap();

    let mut views = watcher.subscribe_view();
    tokio::time::timeout(Duration::from_secs(5), async {
        while views.borrow_and_update().highest_bidder != user2 {
            views.changed().await.unwrap();
        }
    })
    .await
    .expect("watcher saw the new highest bid");

    let view = watcher.view();
    assert_eq!(view.highest_bid, ether("2.5"));
    assert_eq!(view.highest_bid_display(), "2.500");
    assert_eq!(view.my_bid, Wei::ZERO);

    poller.abort();
    runner.abort();
}

/// A provider that cannot be reached leaves the client usable but empty.
#[tokio::test]
async fn test_client_without_provider() {
    let client: AuctionClient<LocalProvider> =
        AuctionClient::new(None, auction_types::DEFAULT_GAS_LIMIT);
    let mut notices = client.subscribe_notices();

    assert_eq!(client.sync().await, Err(ClientError::ProviderUnavailable));
    assert_eq!(
        client.submit_bid("1").await.unwrap_err(),
        ClientError::ProviderUnavailable
    );
    assert!(notices.recv().await.is_ok());
    assert_eq!(client.view().account, None);
}

/// The same scenario over JSON-RPC, including error code mapping.
#[tokio::test]
async fn test_client_over_rpc() {
    let (chain, [owner, user1, _]) = local_chain();
    let (addr, handle) = auction_dev_chain::start("127.0.0.1:0".parse().unwrap(), chain.clone())
        .await
        .unwrap();

    let rpc_client = |account: Address| {
        let config = ClientConfig {
            rpc_endpoint: format!("http://{}", addr),
            account: Some(account),
            ..Default::default()
        };
        async move {
            let provider = RpcProvider::connect(&config).await.unwrap();
            AuctionClient::new(Some(Arc::new(provider)), config.gas_limit)
        }
    };

    let owner_client = rpc_client(owner).await;
    let user1_client = rpc_client(user1).await;
    owner_client.sync().await.unwrap();
    user1_client.sync().await.unwrap();

    assert_eq!(
        owner_client.contract_address(),
        Some(chain.read().contract_address())
    );
    assert!(owner_client.view().is_owner);

    assert_eq!(
        revert_reason(owner_client.submit_bid("1").await),
        "Owner cannot call this function."
    );

    let receipt = user1_client.submit_bid("5").await.unwrap();
    assert_eq!(receipt.block_number, chain.read().block_info().height);
    assert_eq!(user1_client.view().highest_bidder_label(), "Me");
    assert_eq!(user1_client.view().highest_bid_display(), "5.000");

    // Unlocked accounts only.
    let stranger = rpc_client(Address::repeat_byte(0x42)).await;
    assert!(matches!(
        stranger.connect().await,
        Err(ClientError::AccessDenied(_))
    ));

    handle.stop().unwrap();
}
