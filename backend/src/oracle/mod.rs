//! Price oracle boundary
//!
//! The engine never fetches prices itself. Each round it asks a
//! [`PriceOracle`] for the current prices of the tracked assets and submits
//! them back, the way the on-chain price consumer would receive them. The
//! submission is where a real chain can reject a price vector.
//!
//! Prices are 18-decimal base-token values per asset unit.

use crate::core::fixed::BASE;
use crate::rng::RngManager;
use primitive_types::U256;
use thiserror::Error;

/// Errors raised by a price oracle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Price submission rejected: {0}")]
    Rejected(String),
}

/// Source and sink of per-round prices
pub trait PriceOracle {
    /// Current price of each asset, in the order given
    fn get_prices(&mut self, assets: &[String]) -> Result<Vec<U256>, OracleError>;

    /// Hand prices to the price-consuming collaborator
    fn submit_prices(&mut self, _assets: &[String], _prices: &[U256]) -> Result<(), OracleError> {
        Ok(())
    }
}

/// Fixed price vector
///
/// # Example
/// ```
/// use token_lock_sim_core::oracle::{PriceOracle, StaticPriceOracle};
/// use token_lock_sim_core::core::fixed::tokens;
///
/// let assets = vec!["ETH".to_string(), "BTC".to_string()];
/// let mut oracle = StaticPriceOracle::new(assets.clone(), vec![tokens(2_000), tokens(40_000)]);
/// assert_eq!(oracle.get_prices(&assets).unwrap()[1], tokens(40_000));
/// ```
#[derive(Debug, Clone)]
pub struct StaticPriceOracle {
    assets: Vec<String>,
    prices: Vec<U256>,
    reject_submissions: Option<String>,
}

impl StaticPriceOracle {
    pub fn new(assets: Vec<String>, prices: Vec<U256>) -> Self {
        assert_eq!(assets.len(), prices.len(), "one price per asset");
        Self {
            assets,
            prices,
            reject_submissions: None,
        }
    }

    /// Every asset priced at one token
    pub fn flat(assets: Vec<String>) -> Self {
        let prices = vec![BASE; assets.len()];
        Self::new(assets, prices)
    }

    /// Make every `submit_prices` call fail with `reason`
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject_submissions = Some(reason.into());
        self
    }

    pub fn set_price(&mut self, asset: &str, price: U256) -> Result<(), OracleError> {
        let i = self.position(asset)?;
        self.prices[i] = price;
        Ok(())
    }

    fn position(&self, asset: &str) -> Result<usize, OracleError> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .ok_or_else(|| OracleError::UnknownAsset(asset.to_string()))
    }
}

impl PriceOracle for StaticPriceOracle {
    fn get_prices(&mut self, assets: &[String]) -> Result<Vec<U256>, OracleError> {
        assets
            .iter()
            .map(|asset| self.position(asset).map(|i| self.prices[i]))
            .collect()
    }

    fn submit_prices(&mut self, _assets: &[String], _prices: &[U256]) -> Result<(), OracleError> {
        match &self.reject_submissions {
            Some(reason) => Err(OracleError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Deterministic random walk
///
/// Every `get_prices` call moves each price by a uniformly drawn step of at
/// most `max_step_bps` basis points up or down. Prices never fall below 1 wei.
#[derive(Debug, Clone)]
pub struct RandomWalkOracle {
    assets: Vec<String>,
    prices: Vec<U256>,
    max_step_bps: u64,
    rng: RngManager,
}

impl RandomWalkOracle {
    pub fn new(assets: Vec<String>, initial: Vec<U256>, max_step_bps: u64, seed: u64) -> Self {
        assert_eq!(assets.len(), initial.len(), "one price per asset");
        Self {
            assets,
            prices: initial,
            max_step_bps,
            rng: RngManager::new(seed),
        }
    }

    fn step(&mut self) {
        for price in self.prices.iter_mut() {
            let bps = self.rng.range(0, self.max_step_bps + 1);
            let delta = *price * U256::from(bps) / U256::from(10_000u64);
            *price = if self.rng.chance(0.5) {
                *price + delta
            } else {
                price.saturating_sub(delta).max(U256::one())
            };
        }
    }
}

impl PriceOracle for RandomWalkOracle {
    fn get_prices(&mut self, assets: &[String]) -> Result<Vec<U256>, OracleError> {
        self.step();
        assets
            .iter()
            .map(|asset| {
                self.assets
                    .iter()
                    .position(|a| a == asset)
                    .map(|i| self.prices[i])
                    .ok_or_else(|| OracleError::UnknownAsset(asset.clone()))
            })
            .collect()
    }
}
