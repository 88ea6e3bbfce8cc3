//! Reward engine
//!
//! Side-effect-free calculator for everything the protocol pays out on top
//! of principal: the issuance-limited reward scalar, the lock boost, portfolio
//! returns relative to the benchmark, and the final withdrawal split.
//!
//! The engine never mutates state. It reads the ledgers, locks and
//! portfolios through a [`RewardContext`] and returns values; the simulation
//! manager applies them.
//!
//! # Fixed Point
//!
//! - Returns are fractions scaled by `RETURN_BASE` (10^25)
//! - Boost, issuance rates and the allowed-inflation scalar use `BASE` (10^18)

mod schedule;

pub use schedule::{IssuanceSchedule, IssuanceSegment, ScheduleError};

use crate::accounting::LockAccounting;
use crate::core::fixed::{mul_div, SignedValue, BASE, RETURN_BASE};
use crate::core::time::SECONDS_PER_YEAR;
use crate::models::actor::{Address, TokenType};
use crate::models::ledger::Ledger;
use crate::models::portfolio::{Portfolio, PortfolioError, PortfolioModel, Track};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while computing rewards
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("No benchmark reference recorded for {0}")]
    BenchmarkNotInitialized(Address),

    #[error("Portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),
}

/// How the lock boost is applied to the sign of a derivative-track return
///
/// The exact polarity rule awaits product sign-off, so both readings are
/// available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostPolarity {
    /// Gains and losses are both scaled by `1 + boost`
    #[default]
    AmplifyBoth,
    /// Only gains are scaled; losses pass through unchanged
    RewardOnly,
}

/// Tunable reward parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardParams {
    pub schedule: IssuanceSchedule,
    /// Timestamp the schedule's elapsed time is measured from
    pub schedule_epoch: u64,
    /// Remaining lock time at which the boost is maximal
    pub max_lock_duration: u64,
    /// Boost of a lock holding all derivative supply at maximum duration
    pub max_boost: U256,
    pub boost_polarity: BoostPolarity,
    /// Owner share of a delegator's positive reward, in percent
    pub delegator_fee_percent: u64,
}

impl RewardParams {
    pub fn new(schedule: IssuanceSchedule, schedule_epoch: u64) -> Self {
        Self {
            schedule,
            schedule_epoch,
            max_lock_duration: 4 * SECONDS_PER_YEAR,
            max_boost: BASE,
            boost_polarity: BoostPolarity::default(),
            delegator_fee_percent: 20,
        }
    }
}

/// Read-only view of the state rewards are computed from
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    pub base: &'a Ledger,
    pub locks: &'a LockAccounting,
    pub portfolios: &'a PortfolioModel,
    pub prices: &'a [U256],
    pub now: u64,
}

/// Result of a withdrawal calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawOutcome {
    pub token: TokenType,
    /// Deposited tokens being withdrawn
    pub principal: U256,
    /// Reward (positive) or realized loss (negative)
    pub reward: SignedValue,
    /// Everything paid to the withdrawing actor: principal plus their reward
    /// share, or principal minus the loss
    pub pollinator_payout: U256,
    /// Owner fee on a delegator's positive reward
    pub owner_fee: U256,
}

/// Reward calculator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEngine {
    params: RewardParams,
}

impl RewardEngine {
    pub fn new(params: RewardParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RewardParams {
        &self.params
    }

    /// Fraction (18-decimal, at most 1.0) of a portfolio's gains that the
    /// issuance schedule can currently fund
    ///
    /// ```text
    /// budget   = curve(now - epoch) * (base_supply - reserved)
    /// share    = budget * portfolio_deposits / total_delegated
    /// exposure = portfolio_units * current_unit_value
    /// allowed  = min(1, share / exposure)
    /// ```
    pub fn allowed_inflation(
        &self,
        ctx: &RewardContext<'_>,
        portfolio: &Portfolio,
        current_value: U256,
    ) -> U256 {
        let elapsed = ctx.now.saturating_sub(self.params.schedule_epoch);
        let rate = self.params.schedule.rate_at(elapsed);
        let reserved = ctx.locks.inflation_info().reserved_amount;
        let free_supply = ctx.base.total_supply().saturating_sub(reserved);
        let budget = mul_div(rate, free_supply, BASE);

        let stake = portfolio.total_deposited();
        let total_stake = ctx.portfolios.total_delegated().max(stake);
        let budget_share = mul_div(budget, stake, total_stake);

        let exposure = mul_div(portfolio.total_balance(), current_value, BASE);
        if exposure.is_zero() {
            return BASE;
        }
        mul_div(budget_share, BASE, exposure).min(BASE)
    }

    /// Boost (18-decimal) earned by `actor`'s lock
    ///
    /// Linear in remaining lock time (capped at the maximum lock duration)
    /// and in the lock's share of all derivative supply. Zero without a lock,
    /// for an empty lock, and once the lock has expired.
    pub fn lock_boost_rate(&self, ctx: &RewardContext<'_>, actor: &Address) -> U256 {
        let Some(lock) = ctx.locks.lock(actor) else {
            return U256::zero();
        };
        let supply = ctx.locks.derivative().total_supply();
        if lock.amount().is_zero() || supply.is_zero() || self.params.max_lock_duration == 0 {
            return U256::zero();
        }
        let remaining = lock.remaining(ctx.now).min(self.params.max_lock_duration);
        let time_factor = mul_div(
            self.params.max_boost,
            U256::from(remaining),
            U256::from(self.params.max_lock_duration),
        );
        mul_div(time_factor, lock.amount().min(supply), supply)
    }

    /// Return of `actor`'s whole position in `owner`'s portfolio
    pub fn total_return_for_portfolio(
        &self,
        ctx: &RewardContext<'_>,
        owner: &Address,
        actor: &Address,
    ) -> Result<SignedValue, RewardError> {
        let portfolio = ctx.portfolios.portfolio(owner)?;
        let position = portfolio
            .position(actor)
            .ok_or_else(|| PortfolioError::NoPosition {
                owner: owner.clone(),
                actor: actor.clone(),
            })?;
        let current = portfolio.unit_value(ctx.prices)?;
        Ok(Self::track_return(position.combined(), current))
    }

    /// Benchmark-adjusted, boost-adjusted return of one deposit track
    pub fn per_token_return_for_portfolio(
        &self,
        ctx: &RewardContext<'_>,
        owner: &Address,
        actor: &Address,
        token: TokenType,
    ) -> Result<SignedValue, RewardError> {
        let portfolio = ctx.portfolios.portfolio(owner)?;
        let position = portfolio
            .position(actor)
            .ok_or_else(|| PortfolioError::NoPosition {
                owner: owner.clone(),
                actor: actor.clone(),
            })?;
        let current = portfolio.unit_value(ctx.prices)?;
        let raw = Self::track_return(position.track(token), current);

        let reference = position
            .benchmark_ref()
            .ok_or_else(|| RewardError::BenchmarkNotInitialized(actor.clone()))?;
        let benchmark_now = ctx
            .portfolios
            .get_benchmark_value(ctx.prices)?
            .ok_or_else(|| RewardError::BenchmarkNotInitialized(actor.clone()))?;
        let adjusted = raw.sub(Self::relative_change(reference, benchmark_now));

        if token == TokenType::Base {
            return Ok(adjusted);
        }
        let boost = self.lock_boost_rate(ctx, actor);
        let boosted = match (self.params.boost_polarity, adjusted.is_positive) {
            (BoostPolarity::RewardOnly, false) => adjusted,
            _ => adjusted.scale(BASE + boost, BASE),
        };
        Ok(boosted)
    }

    /// Split a withdrawal of `amount` deposited tokens into payouts
    pub fn withdraw_amount(
        &self,
        ctx: &RewardContext<'_>,
        owner: &Address,
        actor: &Address,
        amount: U256,
        token: TokenType,
    ) -> Result<WithdrawOutcome, RewardError> {
        let portfolio = ctx.portfolios.portfolio(owner)?;
        let deposited = portfolio
            .position(actor)
            .map(|p| p.track(token).deposited)
            .unwrap_or_default();
        if amount > deposited {
            return Err(PortfolioError::InsufficientDeposit {
                token,
                requested: amount,
                deposited,
            }
            .into());
        }

        let ret = self.per_token_return_for_portfolio(ctx, owner, actor, token)?;
        if !ret.is_positive {
            let loss = mul_div(amount, ret.magnitude, RETURN_BASE).min(amount);
            return Ok(WithdrawOutcome {
                token,
                principal: amount,
                reward: SignedValue::negative(loss),
                pollinator_payout: amount - loss,
                owner_fee: U256::zero(),
            });
        }

        let gross = mul_div(amount, ret.magnitude, RETURN_BASE);
        let current = portfolio.unit_value(ctx.prices)?;
        let allowed = self.allowed_inflation(ctx, portfolio, current);
        let reward = mul_div(gross, allowed, BASE);
        let owner_fee = if actor == owner {
            U256::zero()
        } else {
            mul_div(
                reward,
                U256::from(self.params.delegator_fee_percent),
                U256::from(100u64),
            )
        };
        Ok(WithdrawOutcome {
            token,
            principal: amount,
            reward: SignedValue::positive(reward),
            pollinator_payout: amount + reward - owner_fee,
            owner_fee,
        })
    }

    /// Return of a track whose units are now worth `current` each
    ///
    /// Entry price per unit is `deposited * BASE / balance`. An empty track
    /// has no return.
    fn track_return(track: Track, current: U256) -> SignedValue {
        if track.balance.is_zero() {
            return SignedValue::zero();
        }
        let previous = mul_div(track.deposited, BASE, track.balance);
        Self::relative_change(previous, current)
    }

    /// `(current - previous) / previous` in `RETURN_BASE` fixed point
    fn relative_change(previous: U256, current: U256) -> SignedValue {
        if previous.is_zero() {
            return SignedValue::zero();
        }
        SignedValue::difference(current, previous).scale(RETURN_BASE, previous)
    }
}
