//! Simulation configuration
//!
//! Plain data, loadable from JSON, validated once when the
//! [`SimulationManager`](super::SimulationManager) is built.

use crate::core::fixed::{tokens, BASE};
use crate::core::time::SECONDS_PER_YEAR;
use crate::models::actor::Address;
use crate::rewards::{BoostPolarity, IssuanceSegment};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

fn default_max_lock_duration() -> u64 {
    4 * SECONDS_PER_YEAR
}

fn default_max_boost() -> U256 {
    BASE
}

fn default_delegator_fee_percent() -> u64 {
    20
}

/// Complete simulation configuration
///
/// # Fields
///
/// * `seed` - Seed for handler order and every handler decision
/// * `identities` - Test identities; the first is the admin holding the initial supply
/// * `assets` / `benchmark_allocation` - Tracked assets and the benchmark's weights
/// * `issuance_schedule` - Reward curve, evaluated from `schedule_epoch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// RNG seed for deterministic simulation
    pub seed: u64,

    /// Available test identities, admin first
    pub identities: Vec<Address>,

    /// Base-token supply minted to the admin (18 decimals)
    pub initial_supply: U256,

    /// Tracked asset symbols
    pub assets: Vec<String>,

    /// Benchmark weights, one per asset
    pub benchmark_allocation: Vec<u64>,

    /// Piecewise issuance curve
    pub issuance_schedule: Vec<IssuanceSegment>,

    /// Reference timestamp for the schedule; defaults to `start_time`
    #[serde(default)]
    pub schedule_epoch: Option<u64>,

    /// Clock value at construction
    pub start_time: u64,

    /// Seconds the clock advances after each round
    pub round_duration: u64,

    /// Number of identities registered as portfolio managers at init
    pub managers: usize,

    /// Number of identities registered as delegators at init; `None` means
    /// every identity not used as admin or manager
    #[serde(default)]
    pub delegators: Option<usize>,

    #[serde(default = "default_max_lock_duration")]
    pub max_lock_duration: u64,

    #[serde(default = "default_max_boost")]
    pub max_boost: U256,

    #[serde(default)]
    pub boost_polarity: BoostPolarity,

    #[serde(default = "default_delegator_fee_percent")]
    pub delegator_fee_percent: u64,
}

impl SimulationConfig {
    /// Sensible defaults around a given identity list
    ///
    /// 94,000,000 tokens of supply, three equally weighted assets, a 5%
    /// issuance curve that is flat for a year and tapers to zero by year
    /// four, daily rounds and two managers.
    pub fn new(seed: u64, identities: Vec<Address>) -> Self {
        let five_percent = BASE / U256::from(20u64);
        Self {
            seed,
            identities,
            initial_supply: tokens(94_000_000),
            assets: vec!["WETH".to_string(), "WBTC".to_string(), "LINK".to_string()],
            benchmark_allocation: vec![1, 1, 1],
            issuance_schedule: vec![
                IssuanceSegment {
                    max_time: SECONDS_PER_YEAR,
                    offset_x: 0,
                    offset_y: five_percent,
                    rate: U256::zero(),
                    descending: false,
                },
                IssuanceSegment {
                    max_time: 4 * SECONDS_PER_YEAR,
                    offset_x: 0,
                    offset_y: five_percent,
                    rate: five_percent / U256::from(3 * SECONDS_PER_YEAR),
                    descending: true,
                },
            ],
            schedule_epoch: None,
            start_time: 1_700_000_000,
            round_duration: 24 * 60 * 60,
            managers: 2,
            delegators: None,
            max_lock_duration: default_max_lock_duration(),
            max_boost: default_max_boost(),
            boost_polarity: BoostPolarity::default(),
            delegator_fee_percent: default_delegator_fee_percent(),
        }
    }

    /// `count` generated identities named `0x…01`, `0x…02`, …
    pub fn generated_identities(count: usize) -> Vec<Address> {
        (1..=count)
            .map(|i| Address::new(format!("0x{:040x}", i)))
            .collect()
    }

    /// Admin identity (first in the list)
    pub fn admin(&self) -> Option<&Address> {
        self.identities.first()
    }

    pub fn effective_schedule_epoch(&self) -> u64 {
        self.schedule_epoch.unwrap_or(self.start_time)
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identities_are_distinct() {
        let ids = SimulationConfig::generated_identities(3);
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert!(ids[0].as_str().starts_with("0x"));
    }

    #[test]
    fn test_json_defaults_apply() {
        let json = r#"{
            "seed": 7,
            "identities": ["admin", "alice"],
            "initial_supply": "0x3e8",
            "assets": ["A"],
            "benchmark_allocation": [1],
            "issuance_schedule": [],
            "start_time": 0,
            "round_duration": 60,
            "managers": 1
        }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.initial_supply, U256::from(1_000u64));
        assert_eq!(config.delegator_fee_percent, 20);
        assert_eq!(config.max_boost, BASE);
        assert_eq!(config.effective_schedule_epoch(), 0);
    }
}
