//! Non-transferable derivative token
//!
//! Thin wrapper over [`Ledger`] that only lets tokens move to or from the
//! lock pool or the portfolio manager. Ordinary holders cannot trade it.

use super::LockError;
use crate::models::actor::{lock_pool_address, portfolio_manager_address, Address};
use crate::models::ledger::Ledger;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeLedger {
    inner: Ledger,
    pool: Address,
    manager: Address,
}

impl DerivativeLedger {
    /// Empty ledger; the lock pool is the nominal admin of zero supply
    pub(crate) fn new() -> Self {
        let pool = lock_pool_address();
        Self {
            inner: Ledger::new("vePLN", pool.clone(), U256::zero()),
            pool,
            manager: portfolio_manager_address(),
        }
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.inner.balance_of(account)
    }

    pub fn total_supply(&self) -> U256 {
        self.inner.total_supply()
    }

    pub fn balances(&self) -> &BTreeMap<Address, U256> {
        self.inner.balances()
    }

    pub fn is_conserved(&self) -> bool {
        self.inner.is_conserved()
    }

    /// `true` if a transfer between these accounts is permitted
    pub fn is_authorized(&self, from: &Address, to: &Address) -> bool {
        [from, to]
            .into_iter()
            .any(|account| *account == self.pool || *account == self.manager)
    }

    pub(crate) fn transfer(&mut self, from: &Address, to: &Address, amount: U256) -> Result<(), LockError> {
        if !self.is_authorized(from, to) {
            return Err(LockError::UnauthorizedTransfer {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(self.inner.transfer(from, to, amount)?)
    }

    pub(crate) fn mint(&mut self, to: &Address, amount: U256) {
        self.inner.mint(to, amount);
    }

    pub(crate) fn burn(&mut self, from: &Address, amount: U256) -> Result<(), LockError> {
        Ok(self.inner.burn(from, amount)?)
    }

    /// Burn everything `from` holds, returning the amount burned
    pub(crate) fn burn_all(&mut self, from: &Address) -> U256 {
        let balance = self.inner.balance_of(from);
        if !balance.is_zero() {
            // Burning exactly the current balance cannot fail
            let _ = self.inner.burn(from, balance);
        }
        balance
    }

    pub(crate) fn seed_account(&mut self, account: &Address) {
        self.inner.seed_account(account);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_to_holder_transfer_rejected() {
        let mut ledger = DerivativeLedger::new();
        let a = Address::new("a");
        let b = Address::new("b");
        ledger.mint(&a, U256::from(5u64));
        let err = ledger.transfer(&a, &b, U256::one()).unwrap_err();
        assert_eq!(
            err,
            LockError::UnauthorizedTransfer {
                from: a.clone(),
                to: b
            }
        );
        assert_eq!(ledger.balance_of(&a), U256::from(5u64));
    }

    #[test]
    fn test_transfer_to_manager_allowed() {
        let mut ledger = DerivativeLedger::new();
        let a = Address::new("a");
        ledger.mint(&a, U256::from(5u64));
        ledger
            .transfer(&a, &portfolio_manager_address(), U256::from(2u64))
            .unwrap();
        assert_eq!(ledger.balance_of(&portfolio_manager_address()), U256::from(2u64));
    }
}
