//! Round driver
//!
//! Holds the fixed set of per-round action handlers and runs them in a fresh
//! random order every round. The order is a Fisher–Yates permutation of the
//! handler set drawn from the simulation's seeded RNG, so every handler runs
//! exactly once per round and a seed fully determines the sequence.

use crate::orchestrator::engine::{RoundError, SimulationError, SimulationManager};
use crate::orchestrator::handlers;
use crate::rng::RngManager;
use tracing::debug;

/// What a handler did this round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// State was changed; the string describes the action
    Applied(String),
    /// Nothing eligible to act on
    Skipped(String),
}

/// One kind of actor activity, invoked once per round
///
/// Handlers receive the whole simulation and drive it only through its
/// public operations. Expected "nothing to do" situations are reported as
/// [`ActionOutcome::Skipped`]; an `Err` fails the round.
pub trait ActionHandler {
    /// Stable identifier used in handler-order diagnostics
    fn name(&self) -> &str;

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError>;
}

/// Handler names in execution order, and each handler's outcome
pub type RoundExecution = (Vec<String>, Vec<(String, ActionOutcome)>);

/// Shuffles and runs the handler set
#[derive(Default)]
pub struct RoundDriver {
    handlers: Vec<Box<dyn ActionHandler>>,
}

impl RoundDriver {
    pub fn new(handlers: Vec<Box<dyn ActionHandler>>) -> Self {
        Self { handlers }
    }

    /// The seven built-in handlers
    pub fn with_default_handlers() -> Self {
        Self::new(handlers::default_handlers())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    /// Random permutation of handler indices
    pub fn permutation(&self, rng: &mut RngManager) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.handlers.len()).collect();
        rng.shuffle(&mut order);
        order
    }

    /// Run every handler once, in a freshly shuffled order
    ///
    /// Stops at the first handler error; handlers that already ran keep
    /// their effects.
    pub fn execute_round(&mut self, sim: &mut SimulationManager) -> Result<RoundExecution, RoundError> {
        let order = self.permutation(sim.rng_mut());
        let names: Vec<String> = order
            .iter()
            .map(|&i| self.handlers[i].name().to_string())
            .collect();
        sim.record_round_start(names.clone());

        let mut outcomes = Vec::with_capacity(order.len());
        for (&index, name) in order.iter().zip(&names) {
            let outcome = self.handlers[index]
                .execute(sim)
                .map_err(|source| RoundError::Handler {
                    handler: name.clone(),
                    source,
                })?;
            match &outcome {
                ActionOutcome::Applied(detail) => debug!(handler = %name, %detail, "handler applied"),
                ActionOutcome::Skipped(reason) => {
                    debug!(handler = %name, %reason, "handler skipped");
                    sim.record_skip(name, reason);
                }
            }
            outcomes.push((name.clone(), outcome));
        }
        Ok((names, outcomes))
    }
}
