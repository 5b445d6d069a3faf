//! In-memory chain hosting a single auction contract.

use std::collections::HashMap;

use auction_contract::{handlers, AuctionGenesisConfig, AuctionState, CallContext, ContractError};
use auction_types::{
    compute_tx_hash, Address, AuctionCall, AuctionPhase, BlockInfo, LogEntry, Transaction,
    TxReceipt, Wei, ETHER_DECIMALS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Seconds added to the timestamp per block.
pub const BLOCK_TIME_SECS: u64 = 12;

/// Errors returned by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("VM Exception while processing transaction: revert {0}")]
    Reverted(#[from] ContractError),

    #[error("User rejected the request.")]
    UserRejected,

    #[error("Unknown account {0}")]
    UnknownAccount(Address),

    #[error("Out of gas: limit {limit}, required {required}")]
    OutOfGas { limit: u64, required: u64 },

    #[error("Insufficient funds: balance {balance}, value {value}")]
    InsufficientFunds { balance: Wei, value: Wei },

    #[error("Invalid chain configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Configuration for a development chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Unlocked accounts; the first deploys and owns the auction
    pub accounts: Vec<Address>,
    /// Balance credited to every account at genesis
    pub initial_balance: Wei,
    /// Address the contract is deployed at
    pub contract_address: Address,
    /// First block at which bids are accepted
    pub start_block: u64,
    /// Timestamp of the genesis block
    pub genesis_timestamp: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            accounts: dev_accounts(3),
            initial_balance: Wei::from(100u64) * Wei::from(10u64).pow(Wei::from(ETHER_DECIMALS)),
            contract_address: Address::repeat_byte(0xaa),
            start_block: 0,
            genesis_timestamp: 0,
        }
    }
}

impl ChainConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.accounts.is_empty() {
            return Err(ChainError::InvalidConfig("At least one account required".into()));
        }
        if self.accounts.contains(&self.contract_address) {
            return Err(ChainError::InvalidConfig(
                "Contract address collides with an account".into(),
            ));
        }
        Ok(())
    }
}

/// Deterministic development accounts `0x0101..01`, `0x0202..02`, ...
pub fn dev_accounts(count: u8) -> Vec<Address> {
    (1..=count).map(Address::repeat_byte).collect()
}

/// Intrinsic gas charged for each call.
pub fn intrinsic_gas(call: AuctionCall) -> u64 {
    match call {
        AuctionCall::Bid => 60_000,
        AuctionCall::Withdraw => 35_000,
        AuctionCall::EndAuction => 30_000,
    }
}

/// Development chain state.
#[derive(Debug)]
pub struct DevChain {
    /// Deployed auction contract
    contract: AuctionState,
    contract_address: Address,
    /// Unlocked accounts, in genesis order
    accounts: Vec<Address>,
    balances: HashMap<Address, Wei>,
    nonces: HashMap<Address, u64>,
    block_height: u64,
    timestamp: u64,
    /// Contract event log
    logs: Vec<LogEntry>,
}

impl DevChain {
    /// Create a chain and deploy the auction from the first account.
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        config.validate()?;

        let genesis = AuctionGenesisConfig::new(config.accounts[0])
            .with_start_block(config.start_block);
        let contract = AuctionState::deploy(&genesis)
            .map_err(|e| ChainError::InvalidConfig(e.to_string()))?;

        let balances = config
            .accounts
            .iter()
            .map(|account| (*account, config.initial_balance))
            .collect();

        info!(
            owner = %genesis.owner,
            contract = %config.contract_address,
            accounts = config.accounts.len(),
            "Auction contract deployed"
        );

        Ok(Self {
            contract,
            contract_address: config.contract_address,
            accounts: config.accounts.clone(),
            balances,
            nonces: HashMap::new(),
            block_height: 0,
            timestamp: config.genesis_timestamp,
            logs: Vec::new(),
        })
    }

    /// Advance the chain by one empty block.
    pub fn advance_block(&mut self) -> BlockInfo {
        self.block_height += 1;
        self.timestamp += BLOCK_TIME_SECS;
        self.block_info()
    }

    pub fn block_info(&self) -> BlockInfo {
        BlockInfo {
            height: self.block_height,
            timestamp: self.timestamp,
        }
    }

    pub fn contract(&self) -> &AuctionState {
        &self.contract
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn balance_of(&self, account: &Address) -> Wei {
        if *account == self.contract_address {
            return self.contract.balance;
        }
        self.balances.get(account).copied().unwrap_or(Wei::ZERO)
    }

    /// Phase of the auction at the current block.
    pub fn phase(&self) -> AuctionPhase {
        self.contract.phase(self.block_height)
    }

    /// Wallet account authorization.
    ///
    /// Grants the requested account if it is unlocked, or the default
    /// (first) account when none is requested.
    pub fn request_accounts(&self, requested: Option<Address>) -> Result<Vec<Address>, ChainError> {
        match requested {
            Some(account) if self.accounts.contains(&account) => Ok(vec![account]),
            Some(_) => Err(ChainError::UserRejected),
            None => Ok(self.accounts.first().copied().into_iter().collect()),
        }
    }

    /// Contract logs recorded at or after `from_block`.
    pub fn logs_since(&self, from_block: u64) -> Vec<LogEntry> {
        self.logs
            .iter()
            .filter(|log| log.block_number >= from_block)
            .cloned()
            .collect()
    }

    /// Execute a transaction and mine it in a new block.
    ///
    /// A failing transaction leaves all state untouched.
    pub fn submit(&mut self, tx: Transaction) -> Result<TxReceipt, ChainError> {
        if !self.accounts.contains(&tx.from) {
            return Err(ChainError::UnknownAccount(tx.from));
        }

        let required = intrinsic_gas(tx.call);
        if tx.gas_limit < required {
            return Err(ChainError::OutOfGas {
                limit: tx.gas_limit,
                required,
            });
        }

        let balance = self.balance_of(&tx.from);
        if balance < tx.value {
            return Err(ChainError::InsufficientFunds {
                balance,
                value: tx.value,
            });
        }

        let nonce = self.nonces.get(&tx.from).copied().unwrap_or(0);
        let tx_hash = compute_tx_hash(&tx.from, nonce, &tx.call, &tx.value)
            .map_err(|e| ChainError::Encoding(e.to_string()))?;

        let ctx = CallContext {
            sender: tx.from,
            block_height: self.block_height + 1,
            value: tx.value,
        };

        // The handler only mutates the contract on success.
        let effects = handlers::handle_call(&mut self.contract, &ctx, tx.call)?;

        *self.balances.entry(tx.from).or_insert(Wei::ZERO) -= tx.value;
        for (recipient, amount) in &effects.payouts {
            *self.balances.entry(*recipient).or_insert(Wei::ZERO) += *amount;
        }
        self.nonces.insert(tx.from, nonce + 1);

        let block = self.advance_block();
        for event in &effects.events {
            self.logs.push(LogEntry {
                block_number: block.height,
                tx_hash,
                event: event.clone(),
            });
        }

        info!(
            call = tx.call.name(),
            from = %tx.from,
            block = block.height,
            tx_hash = %tx_hash,
            "Transaction mined"
        );

        Ok(TxReceipt {
            tx_hash,
            block_number: block.height,
            gas_used: required,
            events: effects.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::AuctionEvent;

    fn ether(n: u64) -> Wei {
        Wei::from(n) * Wei::from(10u64).pow(Wei::from(ETHER_DECIMALS))
    }

    fn setup() -> (DevChain, Address, Address, Address) {
        let config = ChainConfig::default();
        let chain = DevChain::new(&config).unwrap();
        let [owner, one, two] = [config.accounts[0], config.accounts[1], config.accounts[2]];
        (chain, owner, one, two)
    }

    fn bid(from: Address, amount: Wei) -> Transaction {
        Transaction::new(from, AuctionCall::Bid, auction_types::DEFAULT_GAS_LIMIT).with_value(amount)
    }

    #[test]
    fn test_first_account_owns_contract() {
        let (chain, owner, _, _) = setup();
        assert_eq!(chain.contract().get_owner(), owner);
        assert_eq!(chain.phase(), AuctionPhase::Open);
    }

    #[test]
    fn test_bid_moves_funds_and_mines_block() {
        let (mut chain, _, one, _) = setup();

        let receipt = chain.submit(bid(one, ether(5))).unwrap();

        assert_eq!(receipt.block_number, 1);
        assert_eq!(chain.block_info().height, 1);
        assert_eq!(chain.balance_of(&one), ether(95));
        assert_eq!(chain.balance_of(&chain.contract_address()), ether(5));
        assert_eq!(
            receipt.events,
            vec![AuctionEvent::Bid {
                bidder: one,
                amount: ether(5)
            }]
        );
        assert_eq!(chain.logs_since(1).len(), 1);
        assert!(chain.logs_since(2).is_empty());
    }

    #[test]
    fn test_revert_leaves_state_untouched() {
        let (mut chain, owner, _, _) = setup();

        let err = chain.submit(bid(owner, ether(5))).unwrap_err();

        assert!(err.to_string().contains("Owner cannot call this function."));
        assert_eq!(chain.block_info().height, 0);
        assert_eq!(chain.balance_of(&owner), ether(100));
        assert!(chain.logs_since(0).is_empty());
    }

    #[test]
    fn test_gas_limit_enforced() {
        let (mut chain, _, one, _) = setup();
        let tx = Transaction::new(one, AuctionCall::Bid, 21_000).with_value(ether(1));

        let result = chain.submit(tx);
        assert_eq!(
            result,
            Err(ChainError::OutOfGas {
                limit: 21_000,
                required: 60_000
            })
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let (mut chain, _, one, _) = setup();
        let result = chain.submit(bid(one, ether(1_000)));
        assert!(matches!(result, Err(ChainError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_withdraw_returns_funds() {
        let (mut chain, _, one, two) = setup();
        chain.submit(bid(one, ether(5))).unwrap();
        chain.submit(bid(two, ether(6))).unwrap();

        let tx = Transaction::new(one, AuctionCall::Withdraw, auction_types::DEFAULT_GAS_LIMIT);
        chain.submit(tx).unwrap();

        assert_eq!(chain.balance_of(&one), ether(100));
        assert_eq!(chain.balance_of(&chain.contract_address()), ether(6));
    }

    #[test]
    fn test_request_accounts() {
        let (chain, owner, one, _) = setup();

        assert_eq!(chain.request_accounts(None).unwrap(), vec![owner]);
        assert_eq!(chain.request_accounts(Some(one)).unwrap(), vec![one]);
        assert_eq!(
            chain.request_accounts(Some(Address::repeat_byte(0x42))),
            Err(ChainError::UserRejected)
        );
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let (mut chain, _, _, _) = setup();
        let stranger = Address::repeat_byte(0x42);
        let result = chain.submit(bid(stranger, ether(1)));
        assert_eq!(result, Err(ChainError::UnknownAccount(stranger)));
    }

    #[test]
    fn test_empty_config_rejected() {
        let config = ChainConfig {
            accounts: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(DevChain::new(&config), Err(ChainError::InvalidConfig(_))));
    }
}
