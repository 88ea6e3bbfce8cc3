//! Orchestrator - simulation container and round loop
//!
//! See `engine.rs` for the simulation manager, `driver.rs` for the shuffled
//! handler execution and `handlers.rs` for the built-in actor behaviors.

pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod engine;
pub mod handlers;

pub use checkpoint::{compute_digest, validate_snapshot, StateSnapshot};
pub use config::SimulationConfig;
pub use driver::{ActionHandler, ActionOutcome, RoundDriver};
pub use engine::{
    RoundError, MAX_LOCK_DURATION_LIMIT, RoundReport, SimulationContext, SimulationError, SimulationManager, SimulationStatus,
};
