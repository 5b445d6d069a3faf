//! Contract revert reasons.

use thiserror::Error;

/// Reasons a contract call reverts.
///
/// The display strings are the revert messages callers match on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("Owner cannot call this function.")]
    OwnerNotAllowed,

    #[error("Only owner can call this function.")]
    NotOwner,

    #[error("There is already a higher or equal bid.")]
    BidTooLow,

    #[error("Auction has not started.")]
    NotStarted,

    #[error("Auction is already ended.")]
    AlreadyEnded,

    #[error("Auction is not ended.")]
    NotEnded,

    #[error("Highest bidder cannot withdraw.")]
    HighestBidderCannotWithdraw,

    #[error("Nothing to withdraw.")]
    NothingToWithdraw,

    #[error("Bid value must be greater than zero.")]
    ZeroValue,

    #[error("Function is not payable.")]
    NotPayable,
}
