//! Checkpoint - Snapshot and Digest of Simulation State
//!
//! Captures the complete economic state of a run (ledgers, locks, inflation
//! reserve, portfolios, clock, RNG) as a serializable value. The SHA-256 of
//! its canonical JSON is the run's state digest: two runs with the same seed
//! and inputs must produce the same digest after every round.
//!
//! # Critical Invariants
//!
//! - **Conservation**: sum of balances equals total supply, for both tokens
//! - **Escrow Backing**: the lock pool holds exactly the locked principal and
//!   portfolio escrows hold exactly the deposited tokens
//! - **Lock Detail Sum**: every lock amount equals the sum of its deposits

use crate::accounting::LockAccounting;
use crate::models::actor::{portfolio_manager_address, portfolio_pool_address, TokenType};
use crate::models::ledger::Ledger;
use crate::models::portfolio::PortfolioModel;
use crate::orchestrator::engine::{SimulationError, SimulationManager};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete simulation state at a round boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Last completed round
    pub round: u64,

    pub timestamp: u64,

    /// RNG state at time of snapshot (CRITICAL for determinism)
    pub rng_state: u64,

    pub prices: Vec<U256>,

    pub base: Ledger,

    /// Lock records, inflation reserve and the derivative ledger
    pub locks: LockAccounting,

    pub portfolios: PortfolioModel,

    /// SHA256 hash of the config the run was started with
    pub config_hash: String,
}

impl SimulationManager {
    /// Capture the current state
    pub fn snapshot(&self) -> Result<StateSnapshot, SimulationError> {
        Ok(StateSnapshot {
            round: self.round(),
            timestamp: self.now(),
            rng_state: self.context().rng.get_state(),
            prices: self.prices().to_vec(),
            base: self.base_ledger().clone(),
            locks: self.lock_accounting().clone(),
            portfolios: self.portfolios().clone(),
            config_hash: compute_digest(self.config())?,
        })
    }

    /// SHA-256 of the current snapshot
    pub fn state_digest(&self) -> Result<String, SimulationError> {
        compute_digest(&self.snapshot()?)
    }
}

// ============================================================================
// Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of any serializable value
///
/// Uses canonical JSON serialization with sorted keys to ensure
/// deterministic hashing regardless of map iteration order.
pub fn compute_digest<T: Serialize>(value: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(value)
        .map_err(|e| SimulationError::SerializationError(format!("State serialization failed: {}", e)))?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value))
        .map_err(|e| SimulationError::SerializationError(format!("State serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation
// ============================================================================

fn deposits_of(portfolios: &PortfolioModel, token: TokenType) -> U256 {
    portfolios
        .portfolios()
        .values()
        .flat_map(|p| p.positions().values())
        .fold(U256::zero(), |acc, position| acc + position.track(token).deposited)
}

/// Validate state snapshot integrity
///
/// Checks critical invariants:
/// - Ledger conservation (base and derivative)
/// - Lock pool backs every lock
/// - Portfolio escrows back every deposit
/// - Lock detail sums
pub fn validate_snapshot(snapshot: &StateSnapshot) -> Result<(), SimulationError> {
    fn invalid(msg: String) -> Result<(), SimulationError> {
        Err(SimulationError::StateValidationError(msg))
    }

    // 1. Conservation
    if !snapshot.base.is_conserved() {
        return invalid(format!(
            "Base ledger not conserved: balances {} vs supply {}",
            snapshot.base.sum_of_balances(),
            snapshot.base.total_supply()
        ));
    }
    if !snapshot.locks.derivative().is_conserved() {
        return invalid("Derivative ledger not conserved".to_string());
    }

    // 2. Lock escrow
    let pool_balance = snapshot.base.balance_of(snapshot.locks.pool());
    let locked = snapshot.locks.total_locked();
    if pool_balance != locked {
        return invalid(format!(
            "Lock pool holds {} but locks total {}",
            pool_balance, locked
        ));
    }

    // 3. Portfolio escrow
    let base_escrow = snapshot.base.balance_of(&portfolio_pool_address());
    let base_deposits = deposits_of(&snapshot.portfolios, TokenType::Base);
    if base_escrow != base_deposits {
        return invalid(format!(
            "Portfolio pool holds {} PLN but deposits total {}",
            base_escrow, base_deposits
        ));
    }
    let derivative_escrow = snapshot.locks.derivative().balance_of(&portfolio_manager_address());
    let derivative_deposits = deposits_of(&snapshot.portfolios, TokenType::Derivative);
    if derivative_escrow != derivative_deposits {
        return invalid(format!(
            "Portfolio manager holds {} vePLN but deposits total {}",
            derivative_escrow, derivative_deposits
        ));
    }

    // 4. Lock detail sums
    for (actor, lock) in snapshot.locks.locks() {
        if !lock.is_consistent() {
            return invalid(format!("Lock detail of {} does not sum to its amount", actor));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_digest_deterministic() {
        #[derive(Serialize)]
        struct Sample {
            value: i32,
            name: String,
        }

        let a = Sample {
            value: 42,
            name: "test".to_string(),
        };
        let b = Sample {
            value: 42,
            name: "test".to_string(),
        };

        assert_eq!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
    }

    #[test]
    fn test_compute_digest_ignores_map_order() {
        let a: serde_json::Value = serde_json::json!({"x": 1, "y": 2});
        let b: serde_json::Value = serde_json::json!({"y": 2, "x": 1});
        assert_eq!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
    }

    #[test]
    fn test_compute_digest_differs_on_change() {
        let a = serde_json::json!({"value": 42});
        let b = serde_json::json!({"value": 43});
        assert_ne!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
    }
}
