//! Simulation Manager
//!
//! Owns the whole simulated world for one test run: the base-token ledger,
//! lock accounting (with the derivative token), the portfolio model, the
//! reward engine, the price oracle, the actor registry and the round driver.
//!
//! # Lifecycle
//!
//! ```text
//! new(config, oracle)          uninitialized
//!   └─ init()                  initialized      (idempotent)
//!        └─ run_round() ...    running          (repeatable)
//! ```
//!
//! # Round
//!
//! ```text
//! 1. Fetch prices for every tracked asset
//! 2. Submit them to the price consumer (rejection fails the round with
//!    the attempted prices and asset list attached)
//! 3. Shuffle the handler set (Fisher–Yates) and run each handler once
//! 4. Advance the clock by one round duration
//! ```
//!
//! # Determinism
//!
//! All randomness flows through the context's seeded `RngManager`. Same
//! seed + same config + same oracle = identical handler order and state.
//!
//! # Example
//!
//! ```rust
//! use token_lock_sim_core::orchestrator::{SimulationConfig, SimulationManager};
//! use token_lock_sim_core::oracle::StaticPriceOracle;
//!
//! let config = SimulationConfig::new(42, SimulationConfig::generated_identities(6));
//! let oracle = StaticPriceOracle::flat(config.assets.clone());
//! let mut sim = SimulationManager::new(config, Box::new(oracle)).unwrap();
//!
//! sim.init().unwrap();
//! let report = sim.run_round().unwrap();
//! assert_eq!(report.round, 1);
//! ```

use crate::accounting::{LockAccounting, LockError, UnlockOutcome};
use crate::core::fixed::SignedValue;
use crate::core::time::{Clock, SimClock, SECONDS_PER_YEAR};
use crate::models::actor::{portfolio_manager_address, portfolio_pool_address, Address, Pollinator, Role, TokenType};
use crate::models::event::{Event, EventLog};
use crate::models::ledger::{Ledger, LedgerError};
use crate::models::lock::{InflationInfo, LockRecord};
use crate::models::portfolio::{Benchmark, PortfolioError, PortfolioModel};
use crate::oracle::{OracleError, PriceOracle};
use crate::orchestrator::config::SimulationConfig;
use crate::orchestrator::driver::{ActionOutcome, RoundDriver};
use crate::rewards::{IssuanceSchedule, RewardContext, RewardEngine, RewardError, RewardParams, WithdrawOutcome};
use crate::rng::RngManager;
use primitive_types::U256;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Longest lock duration a config may ask for
pub const MAX_LOCK_DURATION_LIMIT: u64 = 100 * SECONDS_PER_YEAR;

// ============================================================================
// Errors
// ============================================================================

/// Simulation error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Simulation has not been initialized")]
    NotInitialized,

    #[error("Delegator sample size {0} must be in (0, 1]")]
    SampleSizeInvalid(f64),

    #[error("Requested {requested} pollinators but only {available} identities are available")]
    PollinatorCapacityExceeded { requested: usize, available: usize },

    #[error("Unknown actor: {0}")]
    UnknownActor(Address),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("Reward error: {0}")]
    Reward(#[from] RewardError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// Failure of a whole round
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoundError {
    /// The price consumer rejected the round's prices
    #[error("price submission rejected for assets {assets:?} at prices {prices:?}: {source}")]
    PriceSubmission {
        source: OracleError,
        prices: Vec<U256>,
        assets: Vec<String>,
    },

    /// Prices could not be fetched
    #[error("price retrieval failed: {0}")]
    Oracle(OracleError),

    /// A handler failed; the round stops at that handler
    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: String,
        source: SimulationError,
    },

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

// ============================================================================
// Context & Reports
// ============================================================================

/// Per-run state threaded through every component: randomness, identities,
/// time and the round counter
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub seed: u64,
    pub rng: RngManager,
    pub identities: Vec<Address>,
    pub clock: SimClock,
    pub round: u64,
}

impl SimulationContext {
    pub fn new(seed: u64, identities: Vec<Address>, start_time: u64) -> Self {
        Self {
            seed,
            rng: RngManager::new(seed),
            identities,
            clock: SimClock::new(start_time),
            round: 0,
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    Uninitialized,
    Initialized,
    Running,
}

/// Outcome of a single round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    /// Clock value while the handlers ran
    pub timestamp: u64,
    pub prices: Vec<U256>,
    /// Handler names in execution order
    pub handler_order: Vec<String>,
    pub outcomes: Vec<(String, ActionOutcome)>,
}

// ============================================================================
// Simulation Manager
// ============================================================================

/// Main container managing simulation state and the round loop
pub struct SimulationManager {
    config: SimulationConfig,
    context: SimulationContext,
    status: SimulationStatus,

    base: Ledger,
    locks: LockAccounting,
    portfolios: PortfolioModel,
    rewards: RewardEngine,

    oracle: Box<dyn PriceOracle>,
    driver: RoundDriver,

    pollinators: Vec<Pollinator>,
    /// Prices of the current round (or those fetched at init)
    prices: Vec<U256>,

    event_log: EventLog,
}

impl SimulationManager {
    /// Build a manager with the default handler set
    pub fn new(config: SimulationConfig, oracle: Box<dyn PriceOracle>) -> Result<Self, SimulationError> {
        Self::with_driver(config, oracle, RoundDriver::with_default_handlers())
    }

    /// Build a manager with a custom handler set
    pub fn with_driver(
        config: SimulationConfig,
        oracle: Box<dyn PriceOracle>,
        driver: RoundDriver,
    ) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let schedule = IssuanceSchedule::new(config.issuance_schedule.clone())
            .map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;
        let mut params = RewardParams::new(schedule, config.effective_schedule_epoch());
        params.max_lock_duration = config.max_lock_duration;
        params.max_boost = config.max_boost;
        params.boost_polarity = config.boost_polarity;
        params.delegator_fee_percent = config.delegator_fee_percent;

        let admin = config.identities[0].clone();
        let base = Ledger::new("PLN", admin, config.initial_supply);
        let locks = LockAccounting::new(base.total_supply());
        let portfolios = PortfolioModel::new(config.assets.len());
        let context = SimulationContext::new(config.seed, config.identities.clone(), config.start_time);

        Ok(Self {
            config,
            context,
            status: SimulationStatus::Uninitialized,
            base,
            locks,
            portfolios,
            rewards: RewardEngine::new(params),
            oracle,
            driver,
            pollinators: Vec::new(),
            prices: Vec::new(),
            event_log: EventLog::new(),
        })
    }

    fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
        if config.identities.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "at least one identity (the admin) is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in &config.identities {
            if !seen.insert(id) {
                return Err(SimulationError::InvalidConfig(format!("Duplicate identity: {}", id)));
            }
        }

        if config.assets.is_empty() {
            return Err(SimulationError::InvalidConfig("at least one asset is required".to_string()));
        }

        if config.benchmark_allocation.len() != config.assets.len() {
            return Err(SimulationError::InvalidConfig(format!(
                "benchmark allocation has {} weights for {} assets",
                config.benchmark_allocation.len(),
                config.assets.len()
            )));
        }

        if config.max_lock_duration == 0 || config.max_lock_duration > MAX_LOCK_DURATION_LIMIT {
            return Err(SimulationError::InvalidConfig(format!(
                "max_lock_duration must be in 1..={} seconds, got {}",
                MAX_LOCK_DURATION_LIMIT, config.max_lock_duration
            )));
        }

        if config.delegator_fee_percent > 100 {
            return Err(SimulationError::InvalidConfig(
                "delegator_fee_percent must be <= 100".to_string(),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.status != SimulationStatus::Uninitialized
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn rng_mut(&mut self) -> &mut RngManager {
        &mut self.context.rng
    }

    pub fn clock(&self) -> &SimClock {
        &self.context.clock
    }

    /// External inputs may move time forward between rounds
    pub fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.context.clock
    }

    pub fn now(&self) -> u64 {
        self.context.clock.now()
    }

    pub fn round(&self) -> u64 {
        self.context.round
    }

    pub fn admin(&self) -> &Address {
        &self.context.identities[0]
    }

    pub fn assets(&self) -> &[String] {
        &self.config.assets
    }

    pub fn prices(&self) -> &[U256] {
        &self.prices
    }

    pub fn base_ledger(&self) -> &Ledger {
        &self.base
    }

    pub fn lock_accounting(&self) -> &LockAccounting {
        &self.locks
    }

    pub fn portfolios(&self) -> &PortfolioModel {
        &self.portfolios
    }

    pub fn reward_engine(&self) -> &RewardEngine {
        &self.rewards
    }

    pub fn pollinators(&self) -> &[Pollinator] {
        &self.pollinators
    }

    pub fn pollinators_with_role(&self, role: Role) -> Vec<Address> {
        self.pollinators
            .iter()
            .filter(|p| p.role == role)
            .map(|p| p.address.clone())
            .collect()
    }

    /// Registered pollinator entry for `address`, if it has a role
    pub fn pollinator(&self, address: &Address) -> Option<&Pollinator> {
        self.pollinators.iter().find(|p| &p.address == address)
    }

    fn require_identity(&self, address: &Address) -> Result<(), SimulationError> {
        if self.context.identities.contains(address) {
            Ok(())
        } else {
            Err(SimulationError::UnknownActor(address.clone()))
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    fn log_event(&mut self, event: Event) {
        self.event_log.log(event);
    }

    // ========================================================================
    // Read accessors for on-chain comparison
    // ========================================================================

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.base.balance_of(account)
    }

    pub fn derivative_balance_of(&self, account: &Address) -> U256 {
        self.locks.derivative().balance_of(account)
    }

    pub fn get_total_supply(&self) -> U256 {
        self.base.total_supply()
    }

    pub fn get_derivative_total_supply(&self) -> U256 {
        self.locks.derivative().total_supply()
    }

    pub fn has_lock(&self, actor: &Address) -> bool {
        self.locks.has_lock(actor)
    }

    pub fn has_expired_lock(&self, actor: &Address) -> bool {
        self.locks.has_expired_lock(actor, self.now())
    }

    pub fn lock(&self, actor: &Address) -> Option<&LockRecord> {
        self.locks.lock(actor)
    }

    pub fn inflation_info(&self) -> InflationInfo {
        self.locks.inflation_info()
    }

    // ========================================================================
    // Initialization & Actor Registry
    // ========================================================================

    /// Seed every identity, spread the admin's balance and set up the
    /// benchmark. A second call does nothing.
    ///
    /// The admin's balance is split into `identities.len()` equal shares;
    /// every other identity receives one share and the admin keeps the rest
    /// (its own share plus the division remainder).
    pub fn init(&mut self) -> Result<(), SimulationError> {
        if self.is_initialized() {
            debug!("init called on an initialized simulation; ignoring");
            return Ok(());
        }

        let identities = self.context.identities.clone();
        let managers = self.config.managers;
        let delegators = self
            .config
            .delegators
            .unwrap_or_else(|| identities.len().saturating_sub(1 + managers));
        self.check_pollinator_capacity(managers, delegators)?;

        let prices = self.oracle.get_prices(&self.config.assets)?;
        let benchmark = Benchmark::new(&self.config.benchmark_allocation, &prices)?;

        let admin = identities[0].clone();
        let share = self.base.balance_of(&admin) / U256::from(identities.len());

        for id in &identities {
            self.base.seed_account(id);
            self.locks.seed_account(id);
        }
        for id in identities.iter().skip(1) {
            self.base.transfer(&admin, id, share)?;
        }

        self.portfolios.set_benchmark(benchmark);
        self.prices = prices;

        self.ensure_pollinators(managers, Role::Manager)?;
        self.ensure_pollinators(delegators, Role::Delegator)?;

        self.status = SimulationStatus::Initialized;
        self.log_event(Event::Initialized {
            round: self.context.round,
            identities: identities.len(),
            share_per_identity: share,
        });
        info!(identities = identities.len(), %share, "simulation initialized");
        Ok(())
    }

    /// Make sure at least `count` pollinators have `role`, registering
    /// unassigned identities (never the admin) as needed
    pub fn ensure_pollinators(&mut self, count: usize, role: Role) -> Result<Vec<Address>, SimulationError> {
        let existing = self.pollinators.iter().filter(|p| p.role == role).count();
        if existing < count {
            let needed = count - existing;
            let free: Vec<Address> = self
                .context
                .identities
                .iter()
                .skip(1)
                .filter(|id| self.pollinator(id).is_none())
                .take(needed)
                .cloned()
                .collect();
            if free.len() < needed {
                return Err(SimulationError::PollinatorCapacityExceeded {
                    requested: count,
                    available: existing + free.len(),
                });
            }
            self.pollinators
                .extend(free.into_iter().map(|address| Pollinator::new(address, role)));
        }
        Ok(self.pollinators_with_role(role))
    }

    /// Fails like [`ensure_pollinators`](Self::ensure_pollinators) would for
    /// `managers` then `delegators`, without registering anyone
    fn check_pollinator_capacity(&self, managers: usize, delegators: usize) -> Result<(), SimulationError> {
        let mut free = self
            .context
            .identities
            .iter()
            .skip(1)
            .filter(|id| self.pollinator(id).is_none())
            .count();
        for (count, role) in [(managers, Role::Manager), (delegators, Role::Delegator)] {
            let existing = self.pollinators.iter().filter(|p| p.role == role).count();
            let needed = count.saturating_sub(existing);
            if needed > free {
                return Err(SimulationError::PollinatorCapacityExceeded {
                    requested: count,
                    available: existing + free,
                });
            }
            free -= needed;
        }
        Ok(())
    }

    /// Random subset of delegators of size `ceil(fraction * delegators)`
    pub fn sample_delegators(&mut self, fraction: f64) -> Result<Vec<Address>, SimulationError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(SimulationError::SampleSizeInvalid(fraction));
        }
        let mut delegators = self.pollinators_with_role(Role::Delegator);
        let count = (fraction * delegators.len() as f64).ceil() as usize;
        self.context.rng.shuffle(&mut delegators);
        delegators.truncate(count);
        Ok(delegators)
    }

    // ========================================================================
    // Supply Administration
    // ========================================================================

    /// Mint base tokens (models protocol issuance outside the engine)
    pub fn mint_base(&mut self, to: &Address, amount: U256) {
        self.base.mint(to, amount);
        self.log_event(Event::SupplyMinted {
            round: self.context.round,
            to: to.clone(),
            amount,
        });
    }

    /// Burn base tokens (models supply contraction outside the engine)
    pub fn burn_base(&mut self, from: &Address, amount: U256) -> Result<(), SimulationError> {
        self.base.burn(from, amount)?;
        self.log_event(Event::SupplyBurned {
            round: self.context.round,
            from: from.clone(),
            amount,
        });
        Ok(())
    }

    // ========================================================================
    // Lock Operations
    // ========================================================================

    pub fn create_lock(&mut self, actor: &Address, lock_end: u64, amount: U256) -> Result<(), SimulationError> {
        let supply = self.base.total_supply();
        self.locks.create_lock(&mut self.base, actor, lock_end, amount)?;
        self.log_event(Event::LockCreated {
            round: self.context.round,
            actor: actor.clone(),
            amount,
            lock_end,
            supply_at_deposit: supply,
        });
        Ok(())
    }

    pub fn increase_lock(&mut self, actor: &Address, amount: U256) -> Result<U256, SimulationError> {
        let supply = self.base.total_supply();
        let new_total = self.locks.increase_lock(&mut self.base, actor, amount)?;
        self.log_event(Event::LockIncreased {
            round: self.context.round,
            actor: actor.clone(),
            amount,
            new_total,
            supply_at_deposit: supply,
        });
        Ok(new_total)
    }

    pub fn extend_lock(&mut self, actor: &Address, new_lock_end: u64) -> Result<(), SimulationError> {
        let old_lock_end = self.locks.extend_lock(actor, new_lock_end)?;
        self.log_event(Event::LockExtended {
            round: self.context.round,
            actor: actor.clone(),
            old_lock_end,
            new_lock_end,
        });
        Ok(())
    }

    pub fn unlock(&mut self, actor: &Address) -> Result<UnlockOutcome, SimulationError> {
        let now = self.now();
        let outcome = self.locks.unlock(&mut self.base, actor, now)?;
        let round = self.context.round;
        self.log_event(Event::InflationProcessed {
            round,
            recorded_supply: outcome.inflation.recorded_supply,
            current_supply: outcome.inflation.current_supply,
            reserved_before: outcome.inflation.reserved_before,
            reserved_after: outcome.inflation.reserved_after,
        });
        self.log_event(Event::Unlocked {
            round,
            actor: actor.clone(),
            principal: outcome.principal,
            protection: outcome.protection,
            derivative_burned: outcome.derivative_burned,
        });
        Ok(outcome)
    }

    // ========================================================================
    // Portfolio Operations
    // ========================================================================

    pub fn create_portfolio(&mut self, owner: &Address, allocation: &[u64]) -> Result<(), SimulationError> {
        self.require_identity(owner)?;
        self.portfolios.create_portfolio(owner, allocation, &self.prices)?;
        self.log_event(Event::PortfolioCreated {
            round: self.context.round,
            owner: owner.clone(),
            allocation: allocation.to_vec(),
        });
        Ok(())
    }

    /// Deposit `amount` of `token` from `actor` into `owner`'s portfolio
    ///
    /// Base tokens move to the portfolio pool; derivative tokens move to the
    /// portfolio manager, the one holder allowed to receive them.
    pub fn delegate(
        &mut self,
        actor: &Address,
        owner: &Address,
        token: TokenType,
        amount: U256,
    ) -> Result<U256, SimulationError> {
        let unit_value = self.portfolios.portfolio(owner)?.unit_value(&self.prices)?;
        if unit_value.is_zero() {
            return Err(PortfolioError::InvalidAllocation("portfolio unit value is zero".to_string()).into());
        }
        let benchmark_value = self.portfolios.get_benchmark_value(&self.prices)?;

        match token {
            TokenType::Base => self.base.transfer(actor, &portfolio_pool_address(), amount)?,
            TokenType::Derivative => {
                self.locks
                    .transfer_derivative(actor, &portfolio_manager_address(), amount)?
            }
        }
        let units = self
            .portfolios
            .deposit(owner, actor, token, amount, &self.prices, benchmark_value)?;

        self.log_event(Event::Delegated {
            round: self.context.round,
            actor: actor.clone(),
            owner: owner.clone(),
            token,
            amount,
            units,
        });
        Ok(units)
    }

    /// Withdraw `amount` deposited `token` and settle rewards or losses
    ///
    /// Principal comes back from escrow. Positive rewards are minted in base
    /// tokens to the actor and, for delegators, the owner fee to the owner.
    /// Losses are burned out of escrow before the remainder is returned.
    pub fn withdraw(
        &mut self,
        actor: &Address,
        owner: &Address,
        token: TokenType,
        amount: U256,
    ) -> Result<WithdrawOutcome, SimulationError> {
        let outcome = self.withdraw_amount(owner, actor, amount, token)?;

        let escrow = match token {
            TokenType::Base => portfolio_pool_address(),
            TokenType::Derivative => portfolio_manager_address(),
        };
        let escrowed = match token {
            TokenType::Base => self.base.balance_of(&escrow),
            TokenType::Derivative => self.locks.derivative().balance_of(&escrow),
        };
        if escrowed < outcome.principal {
            return Err(LedgerError::InsufficientBalance {
                account: escrow,
                required: outcome.principal,
                available: escrowed,
            }
            .into());
        }

        self.portfolios.withdraw(owner, actor, token, amount)?;

        let returned = if outcome.reward.is_positive {
            outcome.principal
        } else {
            outcome.pollinator_payout
        };
        let loss = outcome.principal - returned;
        match token {
            TokenType::Base => {
                self.base.transfer(&escrow, actor, returned)?;
                if !loss.is_zero() {
                    self.base.burn(&escrow, loss)?;
                }
            }
            TokenType::Derivative => {
                self.locks.transfer_derivative(&escrow, actor, returned)?;
                if !loss.is_zero() {
                    self.locks.burn_derivative(&escrow, loss)?;
                }
            }
        }
        if outcome.reward.is_positive {
            let actor_reward = outcome.pollinator_payout - outcome.principal;
            if !actor_reward.is_zero() {
                self.base.mint(actor, actor_reward);
            }
            if !outcome.owner_fee.is_zero() {
                self.base.mint(owner, outcome.owner_fee);
            }
        }

        self.log_event(Event::Withdrawn {
            round: self.context.round,
            actor: actor.clone(),
            owner: owner.clone(),
            token,
            amount,
            reward: outcome.reward,
            pollinator_payout: outcome.pollinator_payout,
            owner_fee: outcome.owner_fee,
        });
        Ok(outcome)
    }

    pub fn rebalance(&mut self, owner: &Address, allocation: &[u64]) -> Result<(), SimulationError> {
        self.portfolios.rebalance(owner, allocation, &self.prices)?;
        self.log_event(Event::Rebalanced {
            round: self.context.round,
            owner: owner.clone(),
            allocation: allocation.to_vec(),
        });
        Ok(())
    }

    // ========================================================================
    // Reward Views
    // ========================================================================

    fn reward_context(&self) -> RewardContext<'_> {
        RewardContext {
            base: &self.base,
            locks: &self.locks,
            portfolios: &self.portfolios,
            prices: &self.prices,
            now: self.context.clock.now(),
        }
    }

    /// Allowed-inflation scalar of `owner`'s portfolio at current prices
    pub fn allowed_inflation(&self, owner: &Address) -> Result<U256, SimulationError> {
        let portfolio = self.portfolios.portfolio(owner)?;
        let current = portfolio.unit_value(&self.prices)?;
        Ok(self
            .rewards
            .allowed_inflation(&self.reward_context(), portfolio, current))
    }

    pub fn lock_boost_rate(&self, actor: &Address) -> U256 {
        self.rewards.lock_boost_rate(&self.reward_context(), actor)
    }

    pub fn total_return_for_portfolio(&self, owner: &Address, actor: &Address) -> Result<SignedValue, SimulationError> {
        Ok(self
            .rewards
            .total_return_for_portfolio(&self.reward_context(), owner, actor)?)
    }

    pub fn per_token_return_for_portfolio(
        &self,
        owner: &Address,
        actor: &Address,
        token: TokenType,
    ) -> Result<SignedValue, SimulationError> {
        Ok(self
            .rewards
            .per_token_return_for_portfolio(&self.reward_context(), owner, actor, token)?)
    }

    pub fn withdraw_amount(
        &self,
        owner: &Address,
        actor: &Address,
        amount: U256,
        token: TokenType,
    ) -> Result<WithdrawOutcome, SimulationError> {
        Ok(self
            .rewards
            .withdraw_amount(&self.reward_context(), owner, actor, amount, token)?)
    }

    // ========================================================================
    // Round Loop
    // ========================================================================

    /// Execute one round
    ///
    /// # Returns
    ///
    /// * `Ok(RoundReport)` - every handler ran
    /// * `Err(RoundError)` - price retrieval/submission or a handler failed
    pub fn run_round(&mut self) -> Result<RoundReport, RoundError> {
        if !self.is_initialized() {
            return Err(SimulationError::NotInitialized.into());
        }
        self.context.round += 1;
        let round = self.context.round;
        let timestamp = self.now();

        // STEP 1-2: PRICES
        let assets = self.config.assets.clone();
        let prices = self.oracle.get_prices(&assets).map_err(RoundError::Oracle)?;
        if let Err(source) = self.oracle.submit_prices(&assets, &prices) {
            return Err(RoundError::PriceSubmission {
                source,
                prices,
                assets,
            });
        }
        self.prices = prices.clone();
        self.log_event(Event::PricesSubmitted {
            round,
            assets,
            prices: prices.clone(),
        });

        // STEP 3: HANDLERS
        let mut driver = std::mem::take(&mut self.driver);
        let result = driver.execute_round(self);
        self.driver = driver;
        let (handler_order, outcomes) = result?;

        // STEP 4: TIME
        let round_duration = self.config.round_duration;
        self.context.clock.advance(round_duration);
        self.status = SimulationStatus::Running;

        info!(round, timestamp, handlers = ?handler_order, "round complete");
        Ok(RoundReport {
            round,
            timestamp,
            prices,
            handler_order,
            outcomes,
        })
    }

    pub(crate) fn record_round_start(&mut self, handler_order: Vec<String>) {
        let event = Event::RoundStarted {
            round: self.context.round,
            timestamp: self.now(),
            handler_order,
        };
        self.log_event(event);
    }

    pub(crate) fn record_skip(&mut self, handler: &str, reason: &str) {
        let event = Event::HandlerSkipped {
            round: self.context.round,
            handler: handler.to_string(),
            reason: reason.to_string(),
        };
        self.log_event(event);
    }
}
