//! Token Lock Simulator Core - Rust Engine
//!
//! Off-chain model of a token-locking and reward-issuance protocol with
//! deterministic, seed-replayable execution. A test harness drives it round
//! by round and diffs its read accessors against on-chain state.
//!
//! # Architecture
//!
//! - **core**: Fixed-point arithmetic and the simulation clock
//! - **models**: Domain types (Ledger, LockRecord, Portfolio, Event)
//! - **accounting**: Lock records, derivative token, inflation reserve
//! - **rewards**: Issuance schedule, boost, returns, withdrawal split
//! - **oracle**: Price source boundary
//! - **orchestrator**: Simulation manager, round driver, handlers, snapshots
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All token values are U256 in 18-decimal fixed point
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Every operation validates before it mutates

// Module declarations
pub mod accounting;
pub mod core;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod rewards;
pub mod rng;

// Re-exports for convenience
pub use accounting::{LockAccounting, LockError, UnlockOutcome};
pub use core::fixed::{mul_div, tokens, SignedValue, BASE, RETURN_BASE};
pub use core::time::{Clock, SimClock};
pub use models::{
    actor::{Address, Pollinator, Role, TokenType},
    event::{Event, EventLog},
    ledger::{Ledger, LedgerError},
    lock::{InflationInfo, LockRecord},
    portfolio::{PortfolioError, PortfolioModel},
};
pub use oracle::{OracleError, PriceOracle, RandomWalkOracle, StaticPriceOracle};
pub use orchestrator::{
    RoundDriver, RoundError, RoundReport, SimulationConfig, SimulationError, SimulationManager,
};
pub use rewards::{BoostPolarity, RewardEngine, RewardError, WithdrawOutcome};
pub use rng::RngManager;
