//! Call handlers for the auction contract.
//!
//! These functions implement the business logic for each call type. A handler
//! either returns the full set of effects or reverts without touching state.

use crate::error::ContractError;
use crate::state::AuctionState;
use auction_types::{Address, AuctionCall, AuctionEvent, AuctionPhase, Wei};
use tracing::debug;

/// Context provided by the chain for each call.
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Height of the block the call executes in
    pub block_height: u64,
    /// Value attached to the call
    pub value: Wei,
}

/// Observable outcome of a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallEffects {
    /// Events emitted, in order
    pub events: Vec<AuctionEvent>,
    /// Funds the contract sends out
    pub payouts: Vec<(Address, Wei)>,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, ContractError>;

/// Dispatch a call to its handler.
pub fn handle_call(
    state: &mut AuctionState,
    ctx: &CallContext,
    call: AuctionCall,
) -> HandlerResult<CallEffects> {
    if call != AuctionCall::Bid && !ctx.value.is_zero() {
        return Err(ContractError::NotPayable);
    }

    let effects = match call {
        AuctionCall::Bid => handle_bid(state, ctx)?,
        AuctionCall::Withdraw => handle_withdraw(state, ctx)?,
        AuctionCall::EndAuction => handle_end_auction(state, ctx)?,
    };

    debug!(
        call = call.name(),
        sender = %ctx.sender,
        events = effects.events.len(),
        "Call executed"
    );

    Ok(effects)
}

/// Handle `bid()`.
///
/// The attached value replaces the sender's previous bid, which is refunded.
pub fn handle_bid(state: &mut AuctionState, ctx: &CallContext) -> HandlerResult<CallEffects> {
    if ctx.sender == state.owner {
        return Err(ContractError::OwnerNotAllowed);
    }

    match state.phase(ctx.block_height) {
        AuctionPhase::NotStarted => return Err(ContractError::NotStarted),
        AuctionPhase::Ended => return Err(ContractError::AlreadyEnded),
        AuctionPhase::Open => {}
    }

    if ctx.value.is_zero() {
        return Err(ContractError::ZeroValue);
    }

    // Strictly greater than the current highest bid
    if ctx.value <= state.highest_bid {
        return Err(ContractError::BidTooLow);
    }

    let mut effects = CallEffects::default();

    let previous = state.bids.insert(ctx.sender, ctx.value).unwrap_or(Wei::ZERO);
    if !previous.is_zero() {
        effects.payouts.push((ctx.sender, previous));
    }

    state.balance = state.balance + ctx.value - previous;
    state.highest_bid = ctx.value;
    state.highest_bidder = ctx.sender;

    effects.events.push(AuctionEvent::Bid {
        bidder: ctx.sender,
        amount: ctx.value,
    });

    Ok(effects)
}

/// Handle `withdraw()`.
///
/// Losing bidders reclaim their outstanding bid. The owner collects the
/// winning bid once the auction has ended.
pub fn handle_withdraw(state: &mut AuctionState, ctx: &CallContext) -> HandlerResult<CallEffects> {
    let amount = if ctx.sender == state.owner {
        if !state.ended {
            return Err(ContractError::NotEnded);
        }
        if state.proceeds_withdrawn || state.highest_bid.is_zero() {
            return Err(ContractError::NothingToWithdraw);
        }

        // The winning bid stays recorded in `bids` for display.
        state.proceeds_withdrawn = true;
        state.highest_bid
    } else {
        if ctx.sender == state.highest_bidder {
            return Err(ContractError::HighestBidderCannotWithdraw);
        }

        let amount = state.bid_of(&ctx.sender);
        if amount.is_zero() {
            return Err(ContractError::NothingToWithdraw);
        }

        state.bids.remove(&ctx.sender);
        amount
    };

    state.balance -= amount;

    Ok(CallEffects {
        events: vec![AuctionEvent::Withdraw {
            recipient: ctx.sender,
            amount,
        }],
        payouts: vec![(ctx.sender, amount)],
    })
}

/// Handle `endAuction()`.
pub fn handle_end_auction(
    state: &mut AuctionState,
    ctx: &CallContext,
) -> HandlerResult<CallEffects> {
    if ctx.sender != state.owner {
        return Err(ContractError::NotOwner);
    }
    if state.ended {
        return Err(ContractError::AlreadyEnded);
    }

    state.ended = true;

    Ok(CallEffects {
        events: vec![AuctionEvent::AuctionEnded {
            winner: state.highest_bidder,
            amount: state.highest_bid,
        }],
        payouts: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::AuctionGenesisConfig;

    const OWNER: Address = Address::new([1u8; 20]);
    const USER_ONE: Address = Address::new([2u8; 20]);
    const USER_TWO: Address = Address::new([3u8; 20]);

    fn ether(n: u64) -> Wei {
        Wei::from(n) * Wei::from(10u64).pow(Wei::from(18u64))
    }

    fn ctx(sender: Address, value: Wei) -> CallContext {
        CallContext {
            sender,
            block_height: 1,
            value,
        }
    }

    fn deploy() -> AuctionState {
        AuctionState::deploy(&AuctionGenesisConfig::new(OWNER)).unwrap()
    }

    #[test]
    fn test_bid_success() {
        let mut state = deploy();

        let effects = handle_call(&mut state, &ctx(USER_ONE, ether(5)), AuctionCall::Bid).unwrap();

        assert_eq!(state.bid_of(&USER_ONE), ether(5));
        assert_eq!(state.get_highest_bid(), ether(5));
        assert_eq!(state.get_highest_bidder(), USER_ONE);
        assert_eq!(state.balance, ether(5));
        assert_eq!(
            effects.events,
            vec![AuctionEvent::Bid {
                bidder: USER_ONE,
                amount: ether(5)
            }]
        );
        assert!(effects.payouts.is_empty());
    }

    #[test]
    fn test_owner_bid_rejected() {
        let mut state = deploy();

        let err = handle_call(&mut state, &ctx(OWNER, ether(5)), AuctionCall::Bid).unwrap_err();

        assert!(err.to_string().contains("Owner cannot call this function."));
        assert_eq!(state.get_highest_bid(), Wei::ZERO);
    }

    #[test]
    fn test_lower_or_equal_bid_rejected() {
        let mut state = deploy();
        handle_call(&mut state, &ctx(USER_ONE, ether(5)), AuctionCall::Bid).unwrap();

        let lower = handle_call(&mut state, &ctx(USER_TWO, ether(3)), AuctionCall::Bid);
        let equal = handle_call(&mut state, &ctx(USER_TWO, ether(5)), AuctionCall::Bid);

        for result in [lower, equal] {
            let err = result.unwrap_err();
            assert!(err.to_string().contains("There is already a higher or equal bid."));
        }
        assert_eq!(state.get_highest_bid(), ether(5));
        assert_eq!(state.get_highest_bidder(), USER_ONE);
        assert_eq!(state.bid_of(&USER_TWO), Wei::ZERO);
    }

    #[test]
    fn test_rebid_refunds_previous_bid() {
        let mut state = deploy();
        handle_call(&mut state, &ctx(USER_ONE, ether(2)), AuctionCall::Bid).unwrap();

        let effects = handle_call(&mut state, &ctx(USER_ONE, ether(4)), AuctionCall::Bid).unwrap();

        assert_eq!(effects.payouts, vec![(USER_ONE, ether(2))]);
        assert_eq!(state.bid_of(&USER_ONE), ether(4));
        assert_eq!(state.balance, ether(4));
    }

    #[test]
    fn test_bid_before_start_block() {
        let config = AuctionGenesisConfig::new(OWNER).with_start_block(10);
        let mut state = AuctionState::deploy(&config).unwrap();

        let result = handle_call(&mut state, &ctx(USER_ONE, ether(1)), AuctionCall::Bid);
        assert_eq!(result, Err(ContractError::NotStarted));
    }

    #[test]
    fn test_zero_bid_rejected() {
        let mut state = deploy();
        let result = handle_call(&mut state, &ctx(USER_ONE, Wei::ZERO), AuctionCall::Bid);
        assert_eq!(result, Err(ContractError::ZeroValue));
    }

    #[test]
    fn test_losing_bidder_withdraws() {
        let mut state = deploy();
        handle_call(&mut state, &ctx(USER_ONE, ether(1)), AuctionCall::Bid).unwrap();
        handle_call(&mut state, &ctx(USER_TWO, ether(2)), AuctionCall::Bid).unwrap();

        let effects =
            handle_call(&mut state, &ctx(USER_ONE, Wei::ZERO), AuctionCall::Withdraw).unwrap();

        assert_eq!(effects.payouts, vec![(USER_ONE, ether(1))]);
        assert_eq!(state.bid_of(&USER_ONE), Wei::ZERO);
        assert_eq!(state.balance, ether(2));

        let again = handle_call(&mut state, &ctx(USER_ONE, Wei::ZERO), AuctionCall::Withdraw);
        assert_eq!(again, Err(ContractError::NothingToWithdraw));
    }

    #[test]
    fn test_highest_bidder_cannot_withdraw() {
        let mut state = deploy();
        handle_call(&mut state, &ctx(USER_ONE, ether(1)), AuctionCall::Bid).unwrap();

        let result = handle_call(&mut state, &ctx(USER_ONE, Wei::ZERO), AuctionCall::Withdraw);
        assert_eq!(result, Err(ContractError::HighestBidderCannotWithdraw));
    }

    #[test]
    fn test_owner_withdraws_proceeds_once_after_end() {
        let mut state = deploy();
        handle_call(&mut state, &ctx(USER_ONE, ether(3)), AuctionCall::Bid).unwrap();

        let early = handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::Withdraw);
        assert_eq!(early, Err(ContractError::NotEnded));

        handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::EndAuction).unwrap();
        let effects =
            handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::Withdraw).unwrap();
        assert_eq!(effects.payouts, vec![(OWNER, ether(3))]);
        assert_eq!(state.balance, Wei::ZERO);

        let twice = handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::Withdraw);
        assert_eq!(twice, Err(ContractError::NothingToWithdraw));
    }

    #[test]
    fn test_end_auction_owner_only_and_final() {
        let mut state = deploy();

        let not_owner =
            handle_call(&mut state, &ctx(USER_ONE, Wei::ZERO), AuctionCall::EndAuction);
        assert_eq!(not_owner, Err(ContractError::NotOwner));

        let effects =
            handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::EndAuction).unwrap();
        assert!(state.is_ended());
        assert_eq!(
            effects.events,
            vec![AuctionEvent::AuctionEnded {
                winner: Address::ZERO,
                amount: Wei::ZERO
            }]
        );

        let again = handle_call(&mut state, &ctx(OWNER, Wei::ZERO), AuctionCall::EndAuction);
        assert_eq!(again, Err(ContractError::AlreadyEnded));

        // Bids are rejected regardless of amount once ended
        let bid = handle_call(&mut state, &ctx(USER_TWO, ether(1_000)), AuctionCall::Bid);
        assert_eq!(bid, Err(ContractError::AlreadyEnded));
    }

    #[test]
    fn test_value_on_non_payable_call() {
        let mut state = deploy();
        let result = handle_call(&mut state, &ctx(OWNER, ether(1)), AuctionCall::EndAuction);
        assert_eq!(result, Err(ContractError::NotPayable));
        assert!(!state.is_ended());
    }
}
