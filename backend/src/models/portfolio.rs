//! Portfolio model
//!
//! Tracks what each actor has deposited into each manager's portfolio, split
//! into a base-token track and a derivative-token track, plus the benchmark
//! portfolio every return is measured against.
//!
//! # Units
//!
//! A portfolio is a basket: `quantities[i]` is how much of asset `i` one
//! portfolio unit holds (18-decimal fixed point). Prices are base-token value
//! per asset unit, also 18-decimal. The value of one unit is therefore
//! `Σ quantities[i] * prices[i] / BASE`, denominated in base tokens.
//!
//! Depositing `amount` tokens buys `amount * BASE / unit_value` units, so a
//! track's average entry price per unit is `deposited * BASE / balance`.

use crate::core::fixed::{mul_div, BASE};
use crate::models::actor::{Address, TokenType};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during portfolio operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortfolioError {
    #[error("Portfolio already exists for owner {0}")]
    PortfolioAlreadyExists(Address),

    #[error("No portfolio owned by {0}")]
    UnknownPortfolio(Address),

    #[error("{actor} has no position in the portfolio of {owner}")]
    NoPosition { owner: Address, actor: Address },

    #[error("Insufficient {token:?} deposit: requested {requested}, deposited {deposited}")]
    InsufficientDeposit {
        token: TokenType,
        requested: U256,
        deposited: U256,
    },

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Price vector has {got} entries, expected {expected}")]
    PriceVectorMismatch { expected: usize, got: usize },
}

/// One deposit track of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Track {
    /// Tokens deposited and not yet withdrawn
    pub deposited: U256,
    /// Portfolio units bought with those tokens
    pub balance: U256,
}

/// An actor's stake in one portfolio
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    tracks: BTreeMap<TokenType, Track>,
    /// Deposit-weighted benchmark unit value at deposit time
    benchmark_ref: Option<U256>,
}

impl Position {
    pub fn track(&self, token: TokenType) -> Track {
        self.tracks.get(&token).copied().unwrap_or_default()
    }

    /// Both tracks combined
    pub fn combined(&self) -> Track {
        self.tracks.values().fold(Track::default(), |acc, t| Track {
            deposited: acc.deposited + t.deposited,
            balance: acc.balance + t.balance,
        })
    }

    pub fn benchmark_ref(&self) -> Option<U256> {
        self.benchmark_ref
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(|t| t.deposited.is_zero() && t.balance.is_zero())
    }
}

/// Value of one basket unit at `prices`
pub fn basket_value(quantities: &[U256], prices: &[U256]) -> Result<U256, PortfolioError> {
    check_prices(quantities.len(), prices)?;
    Ok(quantities
        .iter()
        .zip(prices)
        .fold(U256::zero(), |acc, (q, p)| acc + mul_div(*q, *p, BASE)))
}

/// Convert allocation weights into per-unit quantities worth `unit_value`
///
/// `allocation[i] / Σ allocation` of the unit value goes to asset `i`.
pub fn allocation_to_quantities(
    allocation: &[u64],
    prices: &[U256],
    unit_value: U256,
) -> Result<Vec<U256>, PortfolioError> {
    check_prices(allocation.len(), prices)?;
    let total: u64 = allocation.iter().sum();
    if total == 0 {
        return Err(PortfolioError::InvalidAllocation(
            "allocation weights sum to zero".to_string(),
        ));
    }
    allocation
        .iter()
        .zip(prices)
        .map(|(weight, price)| {
            if price.is_zero() {
                return Err(PortfolioError::InvalidAllocation(
                    "cannot allocate to an asset priced at zero".to_string(),
                ));
            }
            let value_share = mul_div(unit_value, U256::from(*weight), U256::from(total));
            Ok(mul_div(value_share, BASE, *price))
        })
        .collect()
}

fn check_prices(expected: usize, prices: &[U256]) -> Result<(), PortfolioError> {
    if prices.len() != expected {
        return Err(PortfolioError::PriceVectorMismatch {
            expected,
            got: prices.len(),
        });
    }
    Ok(())
}

/// The reference basket returns are measured against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    quantities: Vec<U256>,
}

impl Benchmark {
    /// Benchmark worth exactly one token per unit at `prices`
    pub fn new(allocation: &[u64], prices: &[U256]) -> Result<Self, PortfolioError> {
        Ok(Self {
            quantities: allocation_to_quantities(allocation, prices, BASE)?,
        })
    }

    /// Current benchmark unit value
    pub fn value(&self, prices: &[U256]) -> Result<U256, PortfolioError> {
        basket_value(&self.quantities, prices)
    }

    pub fn quantities(&self) -> &[U256] {
        &self.quantities
    }
}

/// A manager-owned portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    owner: Address,
    quantities: Vec<U256>,
    positions: BTreeMap<Address, Position>,
}

impl Portfolio {
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn quantities(&self) -> &[U256] {
        &self.quantities
    }

    pub fn positions(&self) -> &BTreeMap<Address, Position> {
        &self.positions
    }

    pub fn position(&self, actor: &Address) -> Option<&Position> {
        self.positions.get(actor)
    }

    /// Current value of one unit
    pub fn unit_value(&self, prices: &[U256]) -> Result<U256, PortfolioError> {
        basket_value(&self.quantities, prices)
    }

    /// Tokens deposited across every position and track
    pub fn total_deposited(&self) -> U256 {
        self.positions
            .values()
            .fold(U256::zero(), |acc, p| acc + p.combined().deposited)
    }

    /// Portfolio units held across every position and track
    pub fn total_balance(&self) -> U256 {
        self.positions
            .values()
            .fold(U256::zero(), |acc, p| acc + p.combined().balance)
    }
}

/// Every portfolio in the simulated economy, keyed by owner
///
/// # Example
/// ```
/// use token_lock_sim_core::models::portfolio::PortfolioModel;
/// use token_lock_sim_core::{Address, TokenType};
/// use token_lock_sim_core::core::fixed::tokens;
///
/// let prices = vec![tokens(2), tokens(5)];
/// let manager = Address::new("manager");
/// let mut model = PortfolioModel::new(2);
/// model.create_portfolio(&manager, &[50, 50], &prices).unwrap();
/// model
///     .deposit(&manager, &manager, TokenType::Base, tokens(100), &prices, None)
///     .unwrap();
/// assert_eq!(model.total_delegated(), tokens(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioModel {
    asset_count: usize,
    portfolios: BTreeMap<Address, Portfolio>,
    benchmark: Option<Benchmark>,
}

impl PortfolioModel {
    pub fn new(asset_count: usize) -> Self {
        Self {
            asset_count,
            portfolios: BTreeMap::new(),
            benchmark: None,
        }
    }

    pub fn asset_count(&self) -> usize {
        self.asset_count
    }

    pub fn set_benchmark(&mut self, benchmark: Benchmark) {
        self.benchmark = Some(benchmark);
    }

    pub fn benchmark(&self) -> Option<&Benchmark> {
        self.benchmark.as_ref()
    }

    /// Current benchmark unit value, `None` before the benchmark exists
    pub fn get_benchmark_value(&self, prices: &[U256]) -> Result<Option<U256>, PortfolioError> {
        self.benchmark.as_ref().map(|b| b.value(prices)).transpose()
    }

    pub fn portfolio(&self, owner: &Address) -> Result<&Portfolio, PortfolioError> {
        self.portfolios
            .get(owner)
            .ok_or_else(|| PortfolioError::UnknownPortfolio(owner.clone()))
    }

    pub fn portfolios(&self) -> &BTreeMap<Address, Portfolio> {
        &self.portfolios
    }

    pub fn has_portfolio(&self, owner: &Address) -> bool {
        self.portfolios.contains_key(owner)
    }

    /// Tokens deposited across all portfolios
    pub fn total_delegated(&self) -> U256 {
        self.portfolios
            .values()
            .fold(U256::zero(), |acc, p| acc + p.total_deposited())
    }

    /// Open a portfolio worth one token per unit at `prices`
    pub fn create_portfolio(
        &mut self,
        owner: &Address,
        allocation: &[u64],
        prices: &[U256],
    ) -> Result<(), PortfolioError> {
        if self.portfolios.contains_key(owner) {
            return Err(PortfolioError::PortfolioAlreadyExists(owner.clone()));
        }
        self.check_asset_count(allocation.len())?;
        let quantities = allocation_to_quantities(allocation, prices, BASE)?;
        self.portfolios.insert(
            owner.clone(),
            Portfolio {
                owner: owner.clone(),
                quantities,
                positions: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Record a deposit of `amount` tokens by `actor` into `owner`'s portfolio
    ///
    /// Returns the units bought. When a benchmark value is supplied the
    /// position's benchmark reference becomes the deposit-weighted average of
    /// the old reference and the current value.
    pub fn deposit(
        &mut self,
        owner: &Address,
        actor: &Address,
        token: TokenType,
        amount: U256,
        prices: &[U256],
        benchmark_value: Option<U256>,
    ) -> Result<U256, PortfolioError> {
        let portfolio = self
            .portfolios
            .get_mut(owner)
            .ok_or_else(|| PortfolioError::UnknownPortfolio(owner.clone()))?;
        let unit_value = portfolio.unit_value(prices)?;
        if unit_value.is_zero() {
            return Err(PortfolioError::InvalidAllocation(
                "portfolio unit value is zero".to_string(),
            ));
        }
        let units = mul_div(amount, BASE, unit_value);

        let position = portfolio.positions.entry(actor.clone()).or_default();
        let previous_total = position.combined().deposited;
        if let Some(current) = benchmark_value {
            let weighted = match position.benchmark_ref {
                Some(old) if !previous_total.is_zero() => {
                    (old * previous_total + current * amount) / (previous_total + amount)
                }
                _ => current,
            };
            position.benchmark_ref = Some(weighted);
        }
        let track = position.tracks.entry(token).or_default();
        track.deposited += amount;
        track.balance += units;
        Ok(units)
    }

    /// Remove `amount` deposited tokens from a track, with a proportional
    /// share of its units; returns the units removed
    pub fn withdraw(
        &mut self,
        owner: &Address,
        actor: &Address,
        token: TokenType,
        amount: U256,
    ) -> Result<U256, PortfolioError> {
        let portfolio = self
            .portfolios
            .get_mut(owner)
            .ok_or_else(|| PortfolioError::UnknownPortfolio(owner.clone()))?;
        let position = portfolio
            .positions
            .get_mut(actor)
            .ok_or_else(|| PortfolioError::NoPosition {
                owner: owner.clone(),
                actor: actor.clone(),
            })?;
        let track = position.track(token);
        if amount > track.deposited {
            return Err(PortfolioError::InsufficientDeposit {
                token,
                requested: amount,
                deposited: track.deposited,
            });
        }
        let units = mul_div(track.balance, amount, track.deposited);
        let entry = position.tracks.entry(token).or_default();
        entry.deposited -= amount;
        entry.balance -= units;
        if position.is_empty() {
            portfolio.positions.remove(actor);
        }
        Ok(units)
    }

    /// Change the basket composition without changing the unit value
    pub fn rebalance(
        &mut self,
        owner: &Address,
        allocation: &[u64],
        prices: &[U256],
    ) -> Result<(), PortfolioError> {
        self.check_asset_count(allocation.len())?;
        let portfolio = self
            .portfolios
            .get_mut(owner)
            .ok_or_else(|| PortfolioError::UnknownPortfolio(owner.clone()))?;
        let unit_value = portfolio.unit_value(prices)?;
        portfolio.quantities = allocation_to_quantities(allocation, prices, unit_value)?;
        Ok(())
    }

    fn check_asset_count(&self, got: usize) -> Result<(), PortfolioError> {
        if got != self.asset_count {
            return Err(PortfolioError::InvalidAllocation(format!(
                "expected {} weights, got {}",
                self.asset_count, got
            )));
        }
        Ok(())
    }
}
