//! Auction client: relays reads and writes between a provider and the view.
//!
//! Every operation is contained at its own boundary. A failure is logged,
//! published as a [`Notice`] and returned, and the view keeps its previous
//! values. The client never checks auction rules itself; a rule violation
//! only surfaces as a reverted transaction.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::utils::format_ether;
use auction_types::{
    Address, AuctionCall, AuctionEvent, EventKind, Transaction, TxReceipt, Wei,
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

use crate::error::ClientError;
use crate::events::ChainNotification;
use crate::provider::Provider;
use crate::units::parse_amount;
use crate::view::{AuctionView, RefreshToken, ViewStore, ViewUpdate};

/// Pending notices kept for slow subscribers.
const NOTICE_CAPACITY: usize = 32;

/// Client operations, named as in the contract ABI where they map to a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Connect,
    ReadHighestBid,
    ReadHighestBidder,
    ReadMyBid,
    ReadOwner,
    ReadIsEnded,
    SubmitBid,
    Withdraw,
    EndAuction,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::ReadHighestBid => "getHighestBid",
            Operation::ReadHighestBidder => "getHighestBidder",
            Operation::ReadMyBid => "bids",
            Operation::ReadOwner => "getOwner",
            Operation::ReadIsEnded => "isEnded",
            Operation::SubmitBid => "bid",
            Operation::Withdraw => "withdraw",
            Operation::EndAuction => "endAuction",
        };
        f.write_str(name)
    }
}

/// A failed operation, as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub operation: Operation,
    pub error: ClientError,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

/// Client for a single auction contract.
pub struct AuctionClient<P> {
    /// Shared by every operation of the session
    provider: Option<Arc<P>>,
    view: ViewStore,
    gas_limit: u64,
    notices: broadcast::Sender<Notice>,
}

impl<P: Provider + 'static> AuctionClient<P> {
    /// Create a client. `None` stands for an environment without a wallet.
    pub fn new(provider: Option<Arc<P>>, gas_limit: u64) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            provider,
            view: ViewStore::new(),
            gas_limit,
            notices,
        }
    }

    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    pub fn contract_address(&self) -> Option<Address> {
        self.provider.as_ref().map(|p| p.contract_address())
    }

    /// Current view snapshot.
    pub fn view(&self) -> AuctionView {
        self.view.snapshot()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<AuctionView> {
        self.view.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    // =========================
    // ACCOUNT
    // =========================

    /// Request account access and record the first account.
    pub async fn connect(&self) -> Result<Address, ClientError> {
        let token = self.view.begin();
        let result = async {
            let accounts = self.require_provider()?.request_accounts().await?;
            let account = accounts
                .first()
                .copied()
                .ok_or_else(|| ClientError::AccessDenied("no accounts available".into()))?;

            if self.view.snapshot().account != Some(account) {
                info!(%account, "Account connected");
            }
            self.view.apply(token, ViewUpdate::Account(account));
            Ok::<_, ClientError>(account)
        }
        .await;

        self.report(Operation::Connect, result)
    }

    // =========================
    // READS
    // =========================

    pub async fn read_highest_bid(&self) -> Result<Wei, ClientError> {
        self.read_highest_bid_as(self.view.begin()).await
    }

    pub async fn read_highest_bidder(&self) -> Result<Address, ClientError> {
        self.read_highest_bidder_as(self.view.begin()).await
    }

    pub async fn read_my_bid(&self) -> Result<Wei, ClientError> {
        self.read_my_bid_as(self.view.begin()).await
    }

    /// Read the owner and record whether the connected account holds it.
    pub async fn read_owner(&self) -> Result<bool, ClientError> {
        let token = self.view.begin();
        let result = async {
            let account = self.require_account()?;
            let owner = self.require_provider()?.get_owner().await?;
            let is_owner = owner == account;
            self.view.apply(token, ViewUpdate::Owner(is_owner));
            Ok::<_, ClientError>(is_owner)
        }
        .await;

        self.report(Operation::ReadOwner, result)
    }

    pub async fn read_is_ended(&self) -> Result<bool, ClientError> {
        self.read_is_ended_as(self.view.begin()).await
    }

    /// Re-read my bid, the highest bid and bidder, and the ended flag.
    ///
    /// All four reads run concurrently under one token.
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        let token = self.view.begin();
        let (my_bid, highest_bid, highest_bidder, ended) = tokio::join!(
            self.read_my_bid_as(token),
            self.read_highest_bid_as(token),
            self.read_highest_bidder_as(token),
            self.read_is_ended_as(token),
        );

        my_bid?;
        highest_bid?;
        highest_bidder?;
        ended?;
        Ok(())
    }

    /// Connect, then re-read the owner flag and every auction field.
    pub async fn sync(&self) -> Result<(), ClientError> {
        self.connect().await?;
        let (owner, refresh) = tokio::join!(self.read_owner(), self.refresh_all());
        owner?;
        refresh
    }

    async fn read_highest_bid_as(&self, token: RefreshToken) -> Result<Wei, ClientError> {
        let result = async {
            let amount = self.require_provider()?.get_highest_bid().await?;
            self.view.apply(token, ViewUpdate::HighestBid(amount));
            Ok::<_, ClientError>(amount)
        }
        .await;

        self.report(Operation::ReadHighestBid, result)
    }

    async fn read_highest_bidder_as(&self, token: RefreshToken) -> Result<Address, ClientError> {
        let result = async {
            let bidder = self.require_provider()?.get_highest_bidder().await?;
            self.view.apply(token, ViewUpdate::HighestBidder(bidder));
            Ok::<_, ClientError>(bidder)
        }
        .await;

        self.report(Operation::ReadHighestBidder, result)
    }

    async fn read_my_bid_as(&self, token: RefreshToken) -> Result<Wei, ClientError> {
        let result = async {
            let account = self.require_account()?;
            let amount = self.require_provider()?.bids(account).await?;
            self.view.apply(token, ViewUpdate::MyBid(amount));
            Ok::<_, ClientError>(amount)
        }
        .await;

        self.report(Operation::ReadMyBid, result)
    }

    async fn read_is_ended_as(&self, token: RefreshToken) -> Result<bool, ClientError> {
        let result = async {
            let ended = self.require_provider()?.is_ended().await?;
            self.view.apply(token, ViewUpdate::Ended(ended));
            Ok::<_, ClientError>(ended)
        }
        .await;

        self.report(Operation::ReadIsEnded, result)
    }

    // =========================
    // TRANSACTIONS
    // =========================

    /// Bid `amount` ether from the connected account.
    pub async fn submit_bid(&self, amount: &str) -> Result<TxReceipt, ClientError> {
        let result = async {
            let value = parse_amount(amount)?;
            self.transact(AuctionCall::Bid, value).await
        }
        .await;

        self.finish(Operation::SubmitBid, result).await
    }

    /// Reclaim the connected account's outstanding funds.
    pub async fn withdraw(&self) -> Result<TxReceipt, ClientError> {
        let result = self.transact(AuctionCall::Withdraw, Wei::ZERO).await;
        self.finish(Operation::Withdraw, result).await
    }

    /// End the auction. Only the owner's call succeeds.
    pub async fn end_auction(&self) -> Result<TxReceipt, ClientError> {
        let result = self.transact(AuctionCall::EndAuction, Wei::ZERO).await;
        self.finish(Operation::EndAuction, result).await
    }

    async fn transact(&self, call: AuctionCall, value: Wei) -> Result<TxReceipt, ClientError> {
        let provider = self.require_provider()?;
        let account = self.require_account()?;

        let tx = Transaction::new(account, call, self.gas_limit).with_value(value);
        let receipt = provider.send(tx).await?;

        info!(
            call = call.name(),
            %account,
            value = %format_ether(value),
            block = receipt.block_number,
            tx_hash = %receipt.tx_hash,
            "Transaction confirmed"
        );

        Ok(receipt)
    }

    /// Report a transaction outcome and refresh from its confirmation events.
    async fn finish(
        &self,
        operation: Operation,
        result: Result<TxReceipt, ClientError>,
    ) -> Result<TxReceipt, ClientError> {
        let receipt = self.report(operation, result)?;
        for event in &receipt.events {
            self.handle_event(event).await;
        }
        Ok(receipt)
    }

    // =========================
    // NOTIFICATIONS
    // =========================

    /// Refresh the fields a contract event may have changed.
    pub async fn handle_event(&self, event: &AuctionEvent) {
        match event.kind() {
            EventKind::Bid | EventKind::Withdraw => {
                let token = self.view.begin();
                // Failures are already reported by each read.
                let _ = tokio::join!(
                    self.read_my_bid_as(token),
                    self.read_highest_bid_as(token),
                    self.read_highest_bidder_as(token),
                );
            }
            EventKind::AuctionEnded => {
                let _ = self.read_is_ended().await;
            }
        }
    }

    pub async fn handle_notification(&self, notification: ChainNotification) {
        match notification {
            ChainNotification::NewBlock(_) => {
                let _ = self.sync().await;
            }
            ChainNotification::Contract(log) => self.handle_event(&log.event).await,
        }
    }

    /// Drive the client from a chain subscription until it closes.
    pub async fn run(&self, mut notifications: mpsc::Receiver<ChainNotification>) {
        while let Some(notification) = notifications.recv().await {
            self.handle_notification(notification).await;
        }
        info!("Chain subscription closed");
    }

    // =========================
    // HELPERS
    // =========================

    fn require_provider(&self) -> Result<&Arc<P>, ClientError> {
        self.provider.as_ref().ok_or(ClientError::ProviderUnavailable)
    }

    fn require_account(&self) -> Result<Address, ClientError> {
        self.view.snapshot().account.ok_or(ClientError::NotConnected)
    }

    fn report<T>(
        &self,
        operation: Operation,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        if let Err(error) = &result {
            warn!(%operation, %error, "Operation failed");
            // No subscribers is not an error.
            let _ = self.notices.send(Notice {
                operation,
                error: error.clone(),
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeProvider, CONTRACT, OWNER, USER1, USER2};
    use auction_types::{LogEntry, TxHash, DEFAULT_GAS_LIMIT};

    fn ether(n: u64) -> Wei {
        Wei::from(n) * Wei::from(10u64).pow(Wei::from(18u64))
    }

    fn client_for(accounts: &[Address]) -> (Arc<FakeProvider>, AuctionClient<FakeProvider>) {
        let provider = Arc::new(FakeProvider::with_accounts(accounts));
        let client = AuctionClient::new(Some(provider.clone()), DEFAULT_GAS_LIMIT);
        (provider, client)
    }

    #[tokio::test]
    async fn test_missing_provider_is_reported() {
        let client: AuctionClient<FakeProvider> = AuctionClient::new(None, DEFAULT_GAS_LIMIT);
        let mut notices = client.subscribe_notices();

        assert_eq!(client.connect().await, Err(ClientError::ProviderUnavailable));
        assert_eq!(client.view().account, None);
        assert_eq!(client.contract_address(), None);

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.operation, Operation::Connect);
        assert_eq!(notice.error, ClientError::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_empty_account_list_is_access_denied() {
        let (_, client) = client_for(&[]);
        assert!(matches!(
            client.connect().await,
            Err(ClientError::AccessDenied(_))
        ));
        assert_eq!(client.view().account, None);
    }

    #[tokio::test]
    async fn test_account_reads_need_connection() {
        let (_, client) = client_for(&[USER1]);
        assert_eq!(client.read_my_bid().await, Err(ClientError::NotConnected));
        assert_eq!(client.read_owner().await, Err(ClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_sync_populates_view() {
        let (provider, client) = client_for(&[OWNER]);
        {
            let mut state = provider.state();
            state.highest_bid = ether(2);
            state.highest_bidder = USER2;
        }

        client.sync().await.unwrap();

        let view = client.view();
        assert_eq!(view.account, Some(OWNER));
        assert!(view.is_owner);
        assert_eq!(view.highest_bid, ether(2));
        assert_eq!(view.highest_bidder, USER2);
        assert!(!view.is_ended);
        assert_eq!(client.contract_address(), Some(CONTRACT));
    }

    #[tokio::test]
    async fn test_bid_refreshes_from_receipt() {
        let (provider, client) = client_for(&[USER1]);
        client.connect().await.unwrap();

        let receipt = client.submit_bid("5").await.unwrap();
        assert_eq!(receipt.events.len(), 1);

        let view = client.view();
        assert_eq!(view.my_bid, ether(5));
        assert_eq!(view.highest_bid, ether(5));
        assert_eq!(view.my_bid_display(), "5.000");
        assert_eq!(view.highest_bidder_label(), "Me");

        let state = provider.state();
        let sent = &state.sent;
        assert_eq!(sent[0].value, ether(5));
        assert_eq!(sent[0].gas_limit, 300_000);
        assert_eq!(sent[0].call, AuctionCall::Bid);
    }

    #[tokio::test]
    async fn test_invalid_amount_sends_nothing() {
        let (provider, client) = client_for(&[USER1]);
        client.connect().await.unwrap();

        let err = client.submit_bid("five").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAmount { .. }));
        assert!(provider.state().sent.is_empty());
    }

    #[tokio::test]
    async fn test_revert_leaves_view_and_emits_notice() {
        let (provider, client) = client_for(&[OWNER]);
        client.sync().await.unwrap();
        let before = client.view();

        provider.revert_with("Owner cannot call this function.");
        let mut notices = client.subscribe_notices();

        let err = client.submit_bid("1").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Reverted("Owner cannot call this function.".into())
        );
        assert_eq!(client.view(), before);

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.operation, Operation::SubmitBid);
        assert!(notice.error.is_revert());
        assert!(notice.to_string().contains("Owner cannot call this function."));
    }

    #[tokio::test]
    async fn test_failed_read_keeps_previous_value() {
        let (provider, client) = client_for(&[USER1]);
        provider.state().highest_bid = ether(3);
        client.sync().await.unwrap();

        provider.state().highest_bid = ether(4);
        provider.fail_reads(true);

        assert!(client.read_highest_bid().await.is_err());
        assert_eq!(client.view().highest_bid, ether(3));
    }

    #[tokio::test]
    async fn test_end_auction_refreshes_ended() {
        let (_, client) = client_for(&[OWNER]);
        client.sync().await.unwrap();

        client.end_auction().await.unwrap();
        assert!(client.view().is_ended);
    }

    #[tokio::test]
    async fn test_withdraw_refreshes_my_bid() {
        let (_, client) = client_for(&[USER1]);
        client.connect().await.unwrap();
        client.submit_bid("2").await.unwrap();

        client.withdraw().await.unwrap();
        assert_eq!(client.view().my_bid, Wei::ZERO);
    }

    #[tokio::test]
    async fn test_new_block_picks_up_account_change() {
        let (provider, client) = client_for(&[USER1]);
        provider.state().bids.insert(USER1, ether(1));
        client.sync().await.unwrap();
        assert_eq!(client.view().my_bid, ether(1));

        provider.state().accounts = vec![USER2];
        client.handle_notification(ChainNotification::NewBlock(1)).await;

        let view = client.view();
        assert_eq!(view.account, Some(USER2));
        assert_eq!(view.my_bid, Wei::ZERO);
    }

    #[tokio::test]
    async fn test_contract_event_refreshes_highest_bid() {
        let (provider, client) = client_for(&[USER1]);
        client.sync().await.unwrap();

        {
            let mut state = provider.state();
            state.highest_bid = ether(7);
            state.highest_bidder = USER2;
        }
        let log = LogEntry {
            block_number: 1,
            tx_hash: TxHash::ZERO,
            event: AuctionEvent::Bid {
                bidder: USER2,
                amount: ether(7),
            },
        };
        client.handle_notification(ChainNotification::Contract(log)).await;

        let view = client.view();
        assert_eq!(view.highest_bid, ether(7));
        assert_eq!(view.highest_bidder, USER2);
    }
}
