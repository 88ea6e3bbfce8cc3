//! Lock accounting
//!
//! Swaps base tokens for the derivative (locked) token, keeps one
//! [`LockRecord`] per actor and maintains the protocol-wide inflation reserve
//! that funds inflation protection at unlock time.
//!
//! # Swap Flow
//!
//! ```text
//! create_lock / increase_lock:
//!     base:       actor ──amount──▶ lock pool      (escrow, not destroyed)
//!     derivative: ∅     ──amount──▶ actor          (mint)
//!
//! unlock:
//!     base:       lock pool ──principal──▶ actor   (escrow release)
//!     base:       ∅         ──protection─▶ actor   (mint)
//!     derivative: actor     ──balance────▶ ∅       (burn)
//! ```
//!
//! # Critical Invariants
//!
//! - **Validation first**: every fallible check runs before the first mutation,
//!   so an error leaves ledgers, locks and the reserve untouched
//! - **Lock detail sum**: `lock.amount == Σ lock_detail[i].amount`
//! - **Reserve non-negative**: the reserve saturates at zero

mod derivative;

pub use derivative::DerivativeLedger;

use crate::core::fixed::mul_div;
use crate::models::actor::Address;
use crate::models::ledger::{Ledger, LedgerError};
use crate::models::lock::{InflationInfo, LockRecord};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during lock operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("{0} already has a lock")]
    LockAlreadyExists(Address),

    #[error("{0} has no lock")]
    NoExistingLock(Address),

    #[error("New lock end {requested} must be after current lock end {current}")]
    LockNotExtended { current: u64, requested: u64 },

    #[error("Lock still active until {lock_end} (now {now})")]
    LockStillActive { lock_end: u64, now: u64 },

    #[error("Lock of {0} holds nothing")]
    EmptyLock(Address),

    #[error("{0} holds no derivative tokens")]
    NoLockedBalance(Address),

    #[error("Derivative token transfer from {from} to {to} is not allowed")]
    UnauthorizedTransfer { from: Address, to: Address },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Before/after view of one inflation reserve recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflationUpdate {
    pub recorded_supply: U256,
    pub current_supply: U256,
    pub reserved_before: U256,
    pub reserved_after: U256,
}

/// What an unlock paid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockOutcome {
    /// Escrowed base tokens returned
    pub principal: U256,
    /// Newly minted inflation protection
    pub protection: U256,
    /// Derivative tokens burned
    pub derivative_burned: U256,
    pub inflation: InflationUpdate,
}

/// Lock records, inflation reserve and the derivative token
///
/// # Example
/// ```
/// use token_lock_sim_core::accounting::LockAccounting;
/// use token_lock_sim_core::core::fixed::tokens;
/// use token_lock_sim_core::{Address, Ledger};
///
/// let admin = Address::new("admin");
/// let mut base = Ledger::new("PLN", admin.clone(), tokens(1_000));
/// let mut locks = LockAccounting::new(base.total_supply());
///
/// locks.create_lock(&mut base, &admin, 500, tokens(100)).unwrap();
/// assert_eq!(locks.derivative().balance_of(&admin), tokens(100));
/// assert_eq!(base.balance_of(&admin), tokens(900));
/// assert!(locks.has_lock(&admin));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockAccounting {
    locks: BTreeMap<Address, LockRecord>,
    inflation: InflationInfo,
    derivative: DerivativeLedger,
    pool: Address,
}

impl LockAccounting {
    /// Create lock accounting for a base token whose supply is currently
    /// `base_supply`
    pub fn new(base_supply: U256) -> Self {
        Self {
            locks: BTreeMap::new(),
            inflation: InflationInfo {
                reserved_amount: U256::zero(),
                recorded_supply: base_supply,
            },
            derivative: DerivativeLedger::new(),
            pool: crate::models::actor::lock_pool_address(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Escrow account holding locked base tokens
    pub fn pool(&self) -> &Address {
        &self.pool
    }

    pub fn derivative(&self) -> &DerivativeLedger {
        &self.derivative
    }

    pub fn inflation_info(&self) -> InflationInfo {
        self.inflation
    }

    pub fn lock(&self, actor: &Address) -> Option<&LockRecord> {
        self.locks.get(actor)
    }

    pub fn locks(&self) -> &BTreeMap<Address, LockRecord> {
        &self.locks
    }

    pub fn has_lock(&self, actor: &Address) -> bool {
        self.locks.contains_key(actor)
    }

    pub fn has_expired_lock(&self, actor: &Address, now: u64) -> bool {
        self.locks.get(actor).is_some_and(|lock| lock.is_expired(now))
    }

    /// Total base tokens held by all locks
    pub fn total_locked(&self) -> U256 {
        self.locks
            .values()
            .fold(U256::zero(), |acc, lock| acc + lock.amount())
    }

    // ========================================================================
    // Lock Lifecycle
    // ========================================================================

    /// Open a lock of `amount` base tokens ending at `lock_end`
    pub fn create_lock(
        &mut self,
        base: &mut Ledger,
        actor: &Address,
        lock_end: u64,
        amount: U256,
    ) -> Result<(), LockError> {
        if self.locks.contains_key(actor) {
            return Err(LockError::LockAlreadyExists(actor.clone()));
        }
        let supply = base.total_supply();
        base.transfer(actor, &self.pool, amount)?;
        self.derivative.mint(actor, amount);
        self.locks
            .insert(actor.clone(), LockRecord::new(lock_end, amount, supply));
        debug!(%actor, %amount, lock_end, %supply, "lock created");
        Ok(())
    }

    /// Top up an existing lock; returns the new locked total
    pub fn increase_lock(
        &mut self,
        base: &mut Ledger,
        actor: &Address,
        amount: U256,
    ) -> Result<U256, LockError> {
        if !self.locks.contains_key(actor) {
            return Err(LockError::NoExistingLock(actor.clone()));
        }
        let supply = base.total_supply();
        base.transfer(actor, &self.pool, amount)?;
        self.derivative.mint(actor, amount);
        let lock = self
            .locks
            .get_mut(actor)
            .ok_or_else(|| LockError::NoExistingLock(actor.clone()))?;
        lock.add_deposit(amount, supply);
        debug!(%actor, %amount, total = %lock.amount(), "lock increased");
        Ok(lock.amount())
    }

    /// Push the lock end further out; returns the previous lock end
    pub fn extend_lock(&mut self, actor: &Address, new_lock_end: u64) -> Result<u64, LockError> {
        let lock = self
            .locks
            .get_mut(actor)
            .ok_or_else(|| LockError::NoExistingLock(actor.clone()))?;
        let current = lock.lock_end();
        if new_lock_end <= current {
            return Err(LockError::LockNotExtended {
                current,
                requested: new_lock_end,
            });
        }
        lock.set_lock_end(new_lock_end);
        debug!(%actor, old = current, new = new_lock_end, "lock extended");
        Ok(current)
    }

    /// Close an expired lock, paying principal plus inflation protection
    ///
    /// Protection is computed per deposit, in deposit order: a deposit made
    /// at supply `s` earns `amount * (current - s) / current` when
    /// `s <= current`. Deposits made at a higher supply than today's earn
    /// nothing.
    pub fn unlock(
        &mut self,
        base: &mut Ledger,
        actor: &Address,
        now: u64,
    ) -> Result<UnlockOutcome, LockError> {
        let lock = self
            .locks
            .get(actor)
            .ok_or_else(|| LockError::NoExistingLock(actor.clone()))?;
        if now < lock.lock_end() {
            return Err(LockError::LockStillActive {
                lock_end: lock.lock_end(),
                now,
            });
        }
        if lock.amount().is_zero() {
            return Err(LockError::EmptyLock(actor.clone()));
        }
        let derivative_balance = self.derivative.balance_of(actor);
        if derivative_balance.is_zero() {
            return Err(LockError::NoLockedBalance(actor.clone()));
        }
        let principal = lock.amount();

        // Last fallible step; everything below is infallible
        base.transfer(&self.pool, actor, principal)?;

        let inflation = self.process_inflation(base.total_supply());
        let current_supply = base.total_supply();
        let protection = self
            .locks
            .get(actor)
            .map(|lock| Self::inflation_protection(lock, current_supply))
            .unwrap_or_default();

        if protection > self.inflation.reserved_amount {
            warn!(
                %actor,
                %protection,
                reserved = %self.inflation.reserved_amount,
                "inflation reserve short of protection payout"
            );
        }
        self.inflation.reserved_amount = self.inflation.reserved_amount.saturating_sub(protection);

        if !protection.is_zero() {
            base.mint(actor, protection);
        }
        self.derivative.burn_all(actor);
        self.locks.remove(actor);

        debug!(%actor, %principal, %protection, "unlocked");
        Ok(UnlockOutcome {
            principal,
            protection,
            derivative_burned: derivative_balance,
            inflation,
        })
    }

    /// Protection owed to `lock` at `current_supply`
    pub fn inflation_protection(lock: &LockRecord, current_supply: U256) -> U256 {
        lock.lock_detail()
            .iter()
            .filter(|detail| detail.supply_at_deposit <= current_supply)
            .fold(U256::zero(), |acc, detail| {
                acc + mul_div(
                    detail.amount,
                    current_supply - detail.supply_at_deposit,
                    current_supply,
                )
            })
    }

    /// Recompute the inflation reserve against the current base supply
    ///
    /// ```text
    /// locked   = derivative_supply + reserved
    /// unlocked = recorded_supply - locked + reserved
    /// share    = |current - recorded| * locked / unlocked
    /// ```
    ///
    /// A contraction adds `share` to the reserve, an expansion removes it
    /// (never below zero).
    fn process_inflation(&mut self, current_supply: U256) -> InflationUpdate {
        let recorded = self.inflation.recorded_supply;
        let reserved_before = self.inflation.reserved_amount;

        if current_supply != recorded {
            let locked = self.derivative.total_supply() + reserved_before;
            let unlocked = recorded.saturating_sub(locked) + reserved_before;
            let delta = if current_supply > recorded {
                current_supply - recorded
            } else {
                recorded - current_supply
            };
            let share = mul_div(delta, locked, unlocked);

            if current_supply < recorded {
                self.inflation.reserved_amount = reserved_before + share;
            } else {
                self.inflation.reserved_amount = reserved_before - share.min(reserved_before);
            }
            self.inflation.recorded_supply = current_supply;
        }

        InflationUpdate {
            recorded_supply: recorded,
            current_supply,
            reserved_before,
            reserved_after: self.inflation.reserved_amount,
        }
    }

    // ========================================================================
    // Derivative Token Movements
    // ========================================================================

    /// Restricted derivative-token transfer
    pub fn transfer_derivative(
        &mut self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), LockError> {
        self.derivative.transfer(from, to, amount)
    }

    /// Burn derivative tokens held by `from` (portfolio penalties)
    pub(crate) fn burn_derivative(&mut self, from: &Address, amount: U256) -> Result<(), LockError> {
        self.derivative.burn(from, amount)
    }

    /// Create explicit zero entries for `account`
    pub(crate) fn seed_account(&mut self, account: &Address) {
        self.derivative.seed_account(account);
    }
}
