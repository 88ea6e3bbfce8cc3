//! RewardEngine tests
//!
//! Fixture: two assets A and B priced at 1.0. The manager's portfolio holds
//! only A, the benchmark holds only B, so moving the prices apart produces a
//! known benchmark-relative return.

use primitive_types::U256;
use token_lock_sim_core::models::portfolio::Benchmark;
use token_lock_sim_core::rewards::{
    IssuanceSchedule, IssuanceSegment, RewardContext, RewardParams,
};
use token_lock_sim_core::{
    mul_div, tokens, Address, BoostPolarity, Ledger, LockAccounting, PortfolioError, PortfolioModel,
    RewardEngine, RewardError, SignedValue, TokenType, BASE, RETURN_BASE,
};

const NOW: u64 = 1_700_000_000;
const YEAR: u64 = 31_536_000;

// ============================================================================
// Test Helpers
// ============================================================================

struct World {
    base: Ledger,
    locks: LockAccounting,
    portfolios: PortfolioModel,
    admin: Address,
    owner: Address,
    actor: Address,
}

impl World {
    fn new() -> Self {
        let admin = Address::new("admin");
        let owner = Address::new("manager");
        let actor = Address::new("delegator");
        let base = Ledger::new("PLN", admin.clone(), tokens(1_000_000));
        let locks = LockAccounting::new(base.total_supply());

        let start = flat();
        let mut portfolios = PortfolioModel::new(2);
        portfolios.set_benchmark(Benchmark::new(&[0, 1], &start).unwrap());
        portfolios.create_portfolio(&owner, &[1, 0], &start).unwrap();

        Self {
            base,
            locks,
            portfolios,
            admin,
            owner,
            actor,
        }
    }

    fn deposit(&mut self, actor: &Address, token: TokenType, amount: U256) {
        let bench = self.portfolios.get_benchmark_value(&flat()).unwrap();
        self.portfolios
            .deposit(&self.owner, actor, token, amount, &flat(), bench)
            .unwrap();
    }

    fn lock(&mut self, actor: &Address, amount: U256, lock_end: u64) {
        self.base.transfer(&self.admin, actor, amount).unwrap();
        self.locks.create_lock(&mut self.base, actor, lock_end, amount).unwrap();
    }

    fn ctx<'a>(&'a self, prices: &'a [U256]) -> RewardContext<'a> {
        RewardContext {
            base: &self.base,
            locks: &self.locks,
            portfolios: &self.portfolios,
            prices,
            now: NOW,
        }
    }
}

fn flat() -> Vec<U256> {
    vec![BASE, BASE]
}

/// A +20%, B +10%
fn rally() -> Vec<U256> {
    vec![tokens(12) / U256::from(10u64), tokens(11) / U256::from(10u64)]
}

/// A -20%, B flat
fn slump() -> Vec<U256> {
    vec![tokens(8) / U256::from(10u64), BASE]
}

fn engine_with_rate(rate: U256) -> RewardEngine {
    let schedule = IssuanceSchedule::new(vec![IssuanceSegment {
        max_time: 10 * YEAR,
        offset_x: 0,
        offset_y: rate,
        rate: U256::zero(),
        descending: false,
    }])
    .unwrap();
    let mut params = RewardParams::new(schedule, NOW - YEAR);
    params.max_lock_duration = 4 * YEAR;
    params.max_boost = BASE;
    RewardEngine::new(params)
}

/// 10% issuance: budget dwarfs any test exposure
fn engine() -> RewardEngine {
    engine_with_rate(BASE / U256::from(10u64))
}

fn ten_percent() -> U256 {
    RETURN_BASE / U256::from(10u64)
}

// ============================================================================
// Returns
// ============================================================================

#[test]
fn test_total_return_ignores_benchmark() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();

    let ret = engine()
        .total_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor)
        .unwrap();

    assert_eq!(ret, SignedValue::positive(RETURN_BASE / U256::from(5u64)));
}

#[test]
fn test_total_return_no_position() {
    let w = World::new();
    let prices = flat();
    let err = engine()
        .total_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor)
        .unwrap_err();
    assert!(matches!(err, RewardError::Portfolio(PortfolioError::NoPosition { .. })));
}

#[test]
fn test_per_token_return_subtracts_benchmark() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();

    let ret = engine()
        .per_token_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor, TokenType::Base)
        .unwrap();

    assert_eq!(ret, SignedValue::positive(ten_percent()));
}

#[test]
fn test_per_token_return_can_go_negative_against_benchmark() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    // A flat, B +10%
    let prices = vec![BASE, tokens(11) / U256::from(10u64)];

    let ret = engine()
        .per_token_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor, TokenType::Base)
        .unwrap();

    assert_eq!(ret, SignedValue::negative(ten_percent()));
}

#[test]
fn test_benchmark_not_initialized() {
    let mut w = World::new();
    w.portfolios
        .deposit(&w.owner, &w.actor, TokenType::Base, tokens(100), &flat(), None)
        .unwrap();
    let prices = rally();

    let err = engine()
        .per_token_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor, TokenType::Base)
        .unwrap_err();

    assert_eq!(err, RewardError::BenchmarkNotInitialized(w.actor.clone()));
}

// ============================================================================
// Boost
// ============================================================================

#[test]
fn test_lock_boost_zero_without_lock() {
    let w = World::new();
    let prices = flat();
    assert_eq!(engine().lock_boost_rate(&w.ctx(&prices), &w.actor), U256::zero());
}

#[test]
fn test_lock_boost_full_for_sole_max_lock() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW + 4 * YEAR);
    let prices = flat();

    assert_eq!(engine().lock_boost_rate(&w.ctx(&prices), &w.actor), BASE);
}

#[test]
fn test_lock_boost_scales_with_time_and_share() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW + 2 * YEAR);
    w.lock(&Address::new("whale"), tokens(300), NOW + 4 * YEAR);
    let prices = flat();

    // half the max duration, a quarter of the supply
    assert_eq!(
        engine().lock_boost_rate(&w.ctx(&prices), &w.actor),
        BASE / U256::from(8u64)
    );
}

#[test]
fn test_lock_boost_capped_at_max_duration() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW + 10 * YEAR);
    let prices = flat();

    assert_eq!(engine().lock_boost_rate(&w.ctx(&prices), &w.actor), BASE);
}

#[test]
fn test_lock_boost_zero_once_expired() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW - 1);
    let prices = flat();

    assert_eq!(engine().lock_boost_rate(&w.ctx(&prices), &w.actor), U256::zero());
}

#[test]
fn test_boost_applies_to_derivative_track_only() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW + 4 * YEAR);
    w.deposit(&actor, TokenType::Base, tokens(100));
    w.deposit(&actor, TokenType::Derivative, tokens(100));
    let prices = rally();
    let engine = engine();
    let ctx = w.ctx(&prices);

    let base = engine
        .per_token_return_for_portfolio(&ctx, &w.owner, &w.actor, TokenType::Base)
        .unwrap();
    let derivative = engine
        .per_token_return_for_portfolio(&ctx, &w.owner, &w.actor, TokenType::Derivative)
        .unwrap();

    assert_eq!(base, SignedValue::positive(ten_percent()));
    assert_eq!(derivative, SignedValue::positive(ten_percent() * U256::from(2u64)));
}

#[test]
fn test_boost_polarity_on_losses() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.lock(&actor, tokens(100), NOW + 4 * YEAR);
    w.deposit(&actor, TokenType::Derivative, tokens(100));
    let prices = slump();
    let twenty_percent = RETURN_BASE / U256::from(5u64);

    let amplified = engine()
        .per_token_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor, TokenType::Derivative)
        .unwrap();
    assert_eq!(amplified, SignedValue::negative(twenty_percent * U256::from(2u64)));

    let mut params = engine().params().clone();
    params.boost_polarity = BoostPolarity::RewardOnly;
    let reward_only = RewardEngine::new(params);
    let plain = reward_only
        .per_token_return_for_portfolio(&w.ctx(&prices), &w.owner, &w.actor, TokenType::Derivative)
        .unwrap();
    assert_eq!(plain, SignedValue::negative(twenty_percent));
}

// ============================================================================
// Allowed Inflation
// ============================================================================

#[test]
fn test_allowed_inflation_capped_at_one() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();
    let portfolio = w.portfolios.portfolio(&w.owner).unwrap();
    let value = portfolio.unit_value(&prices).unwrap();

    assert_eq!(engine().allowed_inflation(&w.ctx(&prices), portfolio, value), BASE);
}

#[test]
fn test_allowed_inflation_limited_by_budget() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();
    let portfolio = w.portfolios.portfolio(&w.owner).unwrap();
    let value = portfolio.unit_value(&prices).unwrap();

    // 1e-6 of 1M supply = 1 token budget against 120 tokens of exposure
    let engine = engine_with_rate(BASE / U256::from(1_000_000u64));
    let allowed = engine.allowed_inflation(&w.ctx(&prices), portfolio, value);

    assert_eq!(allowed, mul_div(tokens(1), BASE, tokens(120)));
}

#[test]
fn test_allowed_inflation_zero_after_schedule_ends() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();
    let portfolio = w.portfolios.portfolio(&w.owner).unwrap();
    let value = portfolio.unit_value(&prices).unwrap();

    let schedule = IssuanceSchedule::new(vec![IssuanceSegment {
        max_time: YEAR / 2,
        offset_x: 0,
        offset_y: BASE,
        rate: U256::zero(),
        descending: false,
    }])
    .unwrap();
    let engine = RewardEngine::new(RewardParams::new(schedule, NOW - YEAR));

    assert_eq!(engine.allowed_inflation(&w.ctx(&prices), portfolio, value), U256::zero());
}

// ============================================================================
// Withdraw Amount
// ============================================================================

#[test]
fn test_withdraw_amount_delegator_pays_owner_fee() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();

    let out = engine()
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.actor, tokens(50), TokenType::Base)
        .unwrap();

    assert_eq!(out.principal, tokens(50));
    assert_eq!(out.reward, SignedValue::positive(tokens(5)));
    assert_eq!(out.owner_fee, tokens(1));
    assert_eq!(out.pollinator_payout, tokens(54));
}

#[test]
fn test_withdraw_amount_owner_keeps_everything() {
    let mut w = World::new();
    let owner = w.owner.clone();
    w.deposit(&owner, TokenType::Base, tokens(100));
    let prices = rally();

    let out = engine()
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.owner, tokens(50), TokenType::Base)
        .unwrap();

    assert_eq!(out.owner_fee, U256::zero());
    assert_eq!(out.pollinator_payout, tokens(55));
}

#[test]
fn test_withdraw_amount_scaled_by_allowed_inflation() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = rally();
    let engine = engine_with_rate(BASE / U256::from(1_000_000u64));

    let out = engine
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.actor, tokens(50), TokenType::Base)
        .unwrap();

    let allowed = mul_div(tokens(1), BASE, tokens(120));
    let reward = mul_div(tokens(5), allowed, BASE);
    assert_eq!(out.reward, SignedValue::positive(reward));
    assert_eq!(out.owner_fee, reward / U256::from(5u64));
}

#[test]
fn test_withdraw_amount_loss_short_circuits() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = slump();

    let out = engine()
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.actor, tokens(50), TokenType::Base)
        .unwrap();

    assert_eq!(out.reward, SignedValue::negative(tokens(10)));
    assert_eq!(out.pollinator_payout, tokens(40));
    assert_eq!(out.owner_fee, U256::zero());
}

#[test]
fn test_withdraw_amount_more_than_deposited() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(10));
    let prices = flat();

    let err = engine()
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.actor, tokens(11), TokenType::Base)
        .unwrap_err();

    assert!(matches!(
        err,
        RewardError::Portfolio(PortfolioError::InsufficientDeposit { .. })
    ));
}

#[test]
fn test_withdraw_amount_zero_return_pays_principal() {
    let mut w = World::new();
    let actor = w.actor.clone();
    w.deposit(&actor, TokenType::Base, tokens(100));
    let prices = flat();

    let out = engine()
        .withdraw_amount(&w.ctx(&prices), &w.owner, &w.actor, tokens(100), TokenType::Base)
        .unwrap();

    assert!(out.reward.is_zero());
    assert_eq!(out.pollinator_payout, tokens(100));
}
