//! Text rendering of the auction page.

use std::fmt::Write;

use auction_types::Address;

use crate::view::{format_address, AuctionView, BidInput};

/// Render the auction page for `view`.
pub fn render(view: &AuctionView, contract: Option<Address>, input: &BidInput) -> String {
    let mut out = String::new();

    // writeln! into a String cannot fail
    if view.is_owner {
        let _ = writeln!(out, "[End Auction] [Withdraw]");
    }

    let account = view
        .account
        .as_ref()
        .map(format_address)
        .unwrap_or_else(|| "not connected".to_string());
    let _ = writeln!(out, "Connected account: {}", account);

    if !view.is_owner {
        let _ = writeln!(out, "My bid: {}", view.my_bid_display());
    }

    let status = if view.is_ended {
        "Auction is ended"
    } else {
        "Auction is not ended"
    };
    let _ = writeln!(out, "{}", status);
    let _ = writeln!(out, "Highest bid: {}", view.highest_bid_display());
    let _ = writeln!(out, "Highest bidder: {}", view.highest_bidder_label());

    let contract = contract
        .as_ref()
        .map(format_address)
        .unwrap_or_else(|| "unknown".to_string());
    let _ = writeln!(out, "Auction address: {}", contract);

    if !view.is_owner {
        let _ = writeln!(out, "Bid amount: [{}] [Submit]", input.as_str());
    }

    out
}
