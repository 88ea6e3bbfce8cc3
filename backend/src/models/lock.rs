//! Lock records and the protocol-wide inflation reserve
//!
//! A [`LockRecord`] remembers every deposit separately, together with the
//! base-token supply at the time of that deposit, because inflation
//! protection is computed per deposit at unlock time.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// One deposit (initial lock or top-up) into a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDetail {
    /// Base-token total supply when the deposit was made
    pub supply_at_deposit: U256,
    /// Base tokens deposited
    pub amount: U256,
}

/// An actor's lock
///
/// Invariant: `amount == lock_detail.iter().map(|d| d.amount).sum()`.
///
/// # Example
/// ```
/// use token_lock_sim_core::models::lock::LockRecord;
/// use primitive_types::U256;
///
/// let mut lock = LockRecord::new(1_000, U256::from(50u64), U256::from(10_000u64));
/// lock.add_deposit(U256::from(25u64), U256::from(12_000u64));
/// assert_eq!(lock.amount(), U256::from(75u64));
/// assert_eq!(lock.lock_detail().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    lock_end: u64,
    amount: U256,
    lock_detail: Vec<LockDetail>,
}

impl LockRecord {
    pub fn new(lock_end: u64, amount: U256, supply_at_deposit: U256) -> Self {
        Self {
            lock_end,
            amount,
            lock_detail: vec![LockDetail {
                supply_at_deposit,
                amount,
            }],
        }
    }

    pub fn lock_end(&self) -> u64 {
        self.lock_end
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Deposits in the order they were made
    pub fn lock_detail(&self) -> &[LockDetail] {
        &self.lock_detail
    }

    /// Append a top-up deposit
    pub fn add_deposit(&mut self, amount: U256, supply_at_deposit: U256) {
        self.lock_detail.push(LockDetail {
            supply_at_deposit,
            amount,
        });
        self.amount += amount;
    }

    pub(crate) fn set_lock_end(&mut self, lock_end: u64) {
        self.lock_end = lock_end;
    }

    /// `true` once `now` has reached the lock end
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.lock_end
    }

    /// Seconds until the lock ends, zero once expired
    pub fn remaining(&self, now: u64) -> u64 {
        self.lock_end.saturating_sub(now)
    }

    /// `true` when `amount` matches the sum of the deposit entries
    pub fn is_consistent(&self) -> bool {
        let sum = self
            .lock_detail
            .iter()
            .fold(U256::zero(), |acc, d| acc + d.amount);
        sum == self.amount
    }
}

/// Protocol-wide inflation reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InflationInfo {
    /// Base tokens earmarked for inflation protection owed to lockers
    pub reserved_amount: U256,
    /// Base-token total supply at the last recomputation
    pub recorded_supply: U256,
}
