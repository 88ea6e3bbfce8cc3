//! Fungible token ledger
//!
//! Balance accounting primitive used for both the base token and (wrapped by
//! the lock accounting) the derivative token.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: the sum of all balances equals `total_supply`
//! 2. **No negatives**: no operation drives a balance below zero
//! 3. **Atomicity**: an operation applies fully or not at all

use crate::models::actor::Address;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during ledger operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: U256,
        available: U256,
    },
}

/// Fungible balance ledger
///
/// # Example
/// ```
/// use token_lock_sim_core::{Address, Ledger};
/// use primitive_types::U256;
///
/// let admin = Address::new("admin");
/// let alice = Address::new("alice");
/// let mut ledger = Ledger::new("PLN", admin.clone(), U256::from(1_000u64));
///
/// ledger.transfer(&admin, &alice, U256::from(300u64)).unwrap();
/// assert_eq!(ledger.balance_of(&alice), U256::from(300u64));
/// assert_eq!(ledger.total_supply(), U256::from(1_000u64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Token symbol, used only in logs
    symbol: String,
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
}

impl Ledger {
    /// Create a ledger whose whole initial supply belongs to `admin`
    pub fn new(symbol: impl Into<String>, admin: Address, initial_supply: U256) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(admin, initial_supply);
        Self {
            symbol: symbol.into(),
            total_supply: initial_supply,
            balances,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Balance of `account`; zero for accounts never seen
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Create an explicit zero entry for `account` if it has none
    pub fn seed_account(&mut self, account: &Address) {
        self.balances.entry(account.clone()).or_default();
    }

    /// All explicit balance entries in address order
    pub fn balances(&self) -> &BTreeMap<Address, U256> {
        &self.balances
    }

    /// Move `amount` from `from` to `to`; supply unchanged
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_balance(from, amount)?;
        *self.balances.entry(from.clone()).or_default() -= amount;
        *self.balances.entry(to.clone()).or_default() += amount;
        debug!(token = %self.symbol, %from, %to, %amount, "transfer");
        Ok(())
    }

    /// Create `amount` new tokens in `to`
    pub fn mint(&mut self, to: &Address, amount: U256) {
        self.total_supply += amount;
        *self.balances.entry(to.clone()).or_default() += amount;
        debug!(token = %self.symbol, %to, %amount, supply = %self.total_supply, "mint");
    }

    /// Destroy `amount` tokens held by `from`
    pub fn burn(&mut self, from: &Address, amount: U256) -> Result<(), LedgerError> {
        self.ensure_balance(from, amount)?;
        *self.balances.entry(from.clone()).or_default() -= amount;
        self.total_supply -= amount;
        debug!(token = %self.symbol, %from, %amount, supply = %self.total_supply, "burn");
        Ok(())
    }

    /// Sum of every balance entry
    pub fn sum_of_balances(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::zero(), |acc, balance| acc + *balance)
    }

    /// `true` when balances add up to the recorded supply
    pub fn is_conserved(&self) -> bool {
        self.sum_of_balances() == self.total_supply
    }

    fn ensure_balance(&self, account: &Address, required: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(account);
        if available < required {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                required,
                available,
            });
        }
        Ok(())
    }
}
