//! Round execution tests
//!
//! Critical invariants tested:
//! - Every handler runs exactly once per round, in a shuffled order
//! - Same seed + same inputs = same handler order and same state
//! - Price submission failures carry the attempted prices and assets
//! - Long randomized runs keep ledgers conserved and escrows backed

use token_lock_sim_core::orchestrator::{
    validate_snapshot, ActionHandler, ActionOutcome, RoundReport, MAX_LOCK_DURATION_LIMIT,
};
use token_lock_sim_core::{
    Event, OracleError, RandomWalkOracle, RoundDriver, RoundError, SimulationConfig, SimulationError,
    SimulationManager, StaticPriceOracle, BASE,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn config(seed: u64) -> SimulationConfig {
    SimulationConfig::new(seed, SimulationConfig::generated_identities(8))
}

fn create_sim(seed: u64) -> SimulationManager {
    let config = config(seed);
    let oracle = RandomWalkOracle::new(
        config.assets.clone(),
        vec![BASE; config.assets.len()],
        300,
        seed,
    );
    let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();
    sim.init().unwrap();
    sim
}

fn run(sim: &mut SimulationManager, rounds: usize) -> Vec<RoundReport> {
    (0..rounds).map(|_| sim.run_round().unwrap()).collect()
}

struct Failing;

impl ActionHandler for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn execute(&mut self, _sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        Err(SimulationError::InvalidConfig("boom".to_string()))
    }
}

// ============================================================================
// Shuffle
// ============================================================================

#[test]
fn test_each_handler_runs_once_per_round() {
    let mut sim = create_sim(42);
    for report in run(&mut sim, 10) {
        let mut order = report.handler_order.clone();
        order.sort();
        order.dedup();
        assert_eq!(order.len(), 7, "round {}: {:?}", report.round, report.handler_order);
        assert_eq!(report.outcomes.len(), 7);
    }
}

#[test]
fn test_handler_order_varies_between_rounds() {
    let mut sim = create_sim(42);
    let reports = run(&mut sim, 10);
    let first = &reports[0].handler_order;
    assert!(reports.iter().any(|r| &r.handler_order != first));
}

#[test]
fn test_round_started_event_records_order() {
    let mut sim = create_sim(7);
    let report = sim.run_round().unwrap();

    let started: Vec<&Event> = sim.event_log().events_of_type("RoundStarted");
    assert_eq!(started.len(), 1);
    match started[0] {
        Event::RoundStarted { round, handler_order, .. } => {
            assert_eq!(*round, 1);
            assert_eq!(handler_order, &report.handler_order);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_order_and_state() {
    let mut a = create_sim(2024);
    let mut b = create_sim(2024);

    for _ in 0..15 {
        let ra = a.run_round().unwrap();
        let rb = b.run_round().unwrap();
        assert_eq!(ra.handler_order, rb.handler_order);
        assert_eq!(ra.outcomes, rb.outcomes);
        assert_eq!(a.state_digest().unwrap(), b.state_digest().unwrap());
    }
    assert_eq!(a.base_ledger(), b.base_ledger());
}

#[test]
fn test_different_seed_different_order() {
    let mut a = create_sim(1);
    let mut b = create_sim(2);

    let orders_a: Vec<Vec<String>> = run(&mut a, 5).into_iter().map(|r| r.handler_order).collect();
    let orders_b: Vec<Vec<String>> = run(&mut b, 5).into_iter().map(|r| r.handler_order).collect();
    assert_ne!(orders_a, orders_b);
}

// ============================================================================
// Round Lifecycle
// ============================================================================

#[test]
fn test_round_advances_clock_and_counter() {
    let mut sim = create_sim(3);
    let start = sim.now();

    let first = sim.run_round().unwrap();
    let second = sim.run_round().unwrap();

    assert_eq!(first.round, 1);
    assert_eq!(first.timestamp, start);
    assert_eq!(second.round, 2);
    assert_eq!(second.timestamp, start + 86_400);
    assert_eq!(sim.now(), start + 2 * 86_400);
}

#[test]
fn test_round_before_init_fails() {
    let config = config(1);
    let oracle = StaticPriceOracle::flat(config.assets.clone());
    let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();

    let err = sim.run_round().unwrap_err();
    assert_eq!(err, RoundError::Simulation(SimulationError::NotInitialized));
}

#[test]
fn test_rejected_prices_carry_diagnostics() {
    let config = config(1);
    let assets = config.assets.clone();
    let oracle = StaticPriceOracle::flat(assets.clone()).rejecting("stale round");
    let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();
    sim.init().unwrap();
    let start = sim.now();

    let err = sim.run_round().unwrap_err();

    assert_eq!(
        err,
        RoundError::PriceSubmission {
            source: OracleError::Rejected("stale round".to_string()),
            prices: vec![BASE; assets.len()],
            assets: assets.clone(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("WETH"), "{}", message);
    assert_eq!(sim.now(), start, "failed round does not advance time");
    assert!(sim.event_log().events_of_type("RoundStarted").is_empty());
}

#[test]
fn test_unknown_asset_fails_round() {
    let config = config(1);
    let oracle = StaticPriceOracle::flat(vec!["WETH".to_string()]);
    let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();

    assert!(matches!(
        sim.init(),
        Err(SimulationError::Oracle(OracleError::UnknownAsset(_)))
    ));
}

#[test]
fn test_handler_failure_names_handler() {
    let config = config(1);
    let oracle = StaticPriceOracle::flat(config.assets.clone());
    let driver = RoundDriver::new(vec![Box::new(Failing)]);
    let mut sim = SimulationManager::with_driver(config, Box::new(oracle), driver).unwrap();
    sim.init().unwrap();

    match sim.run_round().unwrap_err() {
        RoundError::Handler { handler, source } => {
            assert_eq!(handler, "failing");
            assert_eq!(source, SimulationError::InvalidConfig("boom".to_string()));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

// ============================================================================
// Long Runs
// ============================================================================

#[test]
fn test_long_run_preserves_invariants() {
    let mut sim = create_sim(99);

    for _ in 0..60 {
        sim.run_round().unwrap();
        let snapshot = sim.snapshot().unwrap();
        validate_snapshot(&snapshot).unwrap();
    }

    assert!(!sim.event_log().events_of_type("LockCreated").is_empty());
    assert!(!sim.event_log().events_of_type("PortfolioCreated").is_empty());
}

#[test]
fn test_long_run_over_lock_expiry() {
    let mut sim = create_sim(5);
    for _ in 0..30 {
        sim.run_round().unwrap();
    }
    // Jump past every lock so unlocks become possible
    sim.clock_mut().advance(5 * 31_536_000);
    for _ in 0..30 {
        sim.run_round().unwrap();
        validate_snapshot(&sim.snapshot().unwrap()).unwrap();
    }
}

#[test]
fn test_lock_duration_bounds_run_cleanly() {
    for max_lock_duration in [1, MAX_LOCK_DURATION_LIMIT] {
        let mut config = config(11);
        config.max_lock_duration = max_lock_duration;
        let oracle = StaticPriceOracle::flat(config.assets.clone());
        let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();
        sim.init().unwrap();

        for _ in 0..20 {
            sim.run_round().unwrap();
        }
        assert!(!sim.event_log().events_of_type("LockCreated").is_empty());
        validate_snapshot(&sim.snapshot().unwrap()).unwrap();
    }
}
