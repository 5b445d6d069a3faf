//! Immutable auction view model and the store that sequences its updates.
//!
//! Every refresh cycle takes a [`RefreshToken`] from a monotonically
//! increasing counter. Each field remembers the token of its last applied
//! update, and an update carrying an older token is dropped, so a slow read
//! issued early can never overwrite the result of a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use auction_types::{Address, Wei};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::units::format_amount;

/// Snapshot of the auction as last read from the contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuctionView {
    /// Connected account
    pub account: Option<Address>,
    pub highest_bid: Wei,
    pub highest_bidder: Address,
    pub is_ended: bool,
    /// Whether the connected account owns the auction
    pub is_owner: bool,
    /// Connected account's outstanding bid
    pub my_bid: Wei,
}

impl AuctionView {
    /// Return a new view with `update` applied.
    pub fn with(&self, update: &ViewUpdate) -> Self {
        let mut next = self.clone();
        match *update {
            ViewUpdate::Account(account) => {
                if next.account != Some(account) {
                    // Account-bound fields belong to the previous account.
                    next.my_bid = Wei::ZERO;
                    next.is_owner = false;
                }
                next.account = Some(account);
            }
            ViewUpdate::HighestBid(amount) => next.highest_bid = amount,
            ViewUpdate::HighestBidder(bidder) => next.highest_bidder = bidder,
            ViewUpdate::Ended(ended) => next.is_ended = ended,
            ViewUpdate::Owner(owner) => next.is_owner = owner,
            ViewUpdate::MyBid(amount) => next.my_bid = amount,
        }
        next
    }

    pub fn highest_bid_display(&self) -> String {
        format_amount(self.highest_bid)
    }

    pub fn my_bid_display(&self) -> String {
        format_amount(self.my_bid)
    }

    /// `null` for no bidder, `Me` for the connected account, else the address.
    pub fn highest_bidder_label(&self) -> String {
        if self.highest_bidder == Address::ZERO {
            "null".to_string()
        } else if Some(self.highest_bidder) == self.account {
            "Me".to_string()
        } else {
            format_address(&self.highest_bidder)
        }
    }
}

/// Lowercase `0x`-prefixed hex form of an address.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// View fields updated independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewField {
    Account,
    HighestBid,
    HighestBidder,
    Ended,
    Owner,
    MyBid,
}

/// A single field update produced by a successful read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewUpdate {
    Account(Address),
    HighestBid(Wei),
    HighestBidder(Address),
    Ended(bool),
    Owner(bool),
    MyBid(Wei),
}

impl ViewUpdate {
    pub fn field(&self) -> ViewField {
        match self {
            ViewUpdate::Account(_) => ViewField::Account,
            ViewUpdate::HighestBid(_) => ViewField::HighestBid,
            ViewUpdate::HighestBidder(_) => ViewField::HighestBidder,
            ViewUpdate::Ended(_) => ViewField::Ended,
            ViewUpdate::Owner(_) => ViewField::Owner,
            ViewUpdate::MyBid(_) => ViewField::MyBid,
        }
    }
}

/// Sequence number of a refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

impl RefreshToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Holds the current view and publishes every new snapshot.
pub struct ViewStore {
    sender: watch::Sender<AuctionView>,
    next_token: AtomicU64,
    /// Token of the last applied update per field
    applied: Mutex<HashMap<ViewField, RefreshToken>>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AuctionView::default());
        Self {
            sender,
            next_token: AtomicU64::new(1),
            applied: Mutex::new(HashMap::new()),
        }
    }

    /// Start a refresh cycle.
    pub fn begin(&self) -> RefreshToken {
        RefreshToken(self.next_token.fetch_add(1, Ordering::SeqCst))
    }

    /// Apply an update read under `token`.
    ///
    /// Returns false, leaving the view untouched, when a newer cycle already
    /// updated the same field.
    pub fn apply(&self, token: RefreshToken, update: ViewUpdate) -> bool {
        let field = update.field();
        let mut applied = self.applied.lock();

        if let Some(last) = applied.get(&field) {
            if token < *last {
                debug!(
                    ?field,
                    token = token.value(),
                    last = last.value(),
                    "Discarding stale read"
                );
                return false;
            }
        }
        applied.insert(field, token);

        let current = self.sender.borrow().clone();
        if let ViewUpdate::Account(account) = &update {
            if current.account != Some(*account) {
                // Reads begun for the previous account must not land on this one.
                for bound in [ViewField::MyBid, ViewField::Owner] {
                    let last = applied.entry(bound).or_insert(token);
                    *last = (*last).max(token);
                }
            }
        }

        let next = current.with(&update);
        self.sender.send_replace(next);
        true
    }

    /// Current view.
    pub fn snapshot(&self) -> AuctionView {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AuctionView> {
        self.sender.subscribe()
    }
}

/// Bid amount as typed by the user.
///
/// The input is kept after a successful submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BidInput {
    pub amount: String,
}

impl BidInput {
    pub fn set(&mut self, amount: &str) {
        self.amount = amount.trim().to_string();
    }

    pub fn as_str(&self) -> &str {
        &self.amount
    }
}
