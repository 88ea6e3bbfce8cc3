//! Built-in action handlers
//!
//! Each handler models one kind of actor behavior. A handler picks its actor
//! and amounts with the simulation RNG, checks eligibility up front and
//! reports [`ActionOutcome::Skipped`] when nobody can act, so a round never
//! fails for lack of candidates.
//!
//! | Handler                    | Action                                               |
//! |----------------------------|------------------------------------------------------|
//! | `lock_and_redelegate`      | create/increase/extend a lock, delegate new vePLN    |
//! | `delegate`                 | delegator deposits base tokens into a portfolio      |
//! | `delegate_derivative_same` | top up vePLN in a portfolio the actor already uses   |
//! | `delegate_derivative_random` | deposit vePLN into a random portfolio              |
//! | `manager_rebalance`        | manager creates or rebalances their portfolio        |
//! | `delegator_withdraw`       | delegator withdraws part of a deposit track          |
//! | `unlock_expired`           | unlock an expired, fully held lock                   |

use crate::models::actor::{Address, Role, TokenType};
use crate::orchestrator::driver::{ActionHandler, ActionOutcome};
use crate::orchestrator::engine::{SimulationError, SimulationManager};
use crate::rng::RngManager;
use primitive_types::U256;

const DAY: u64 = 86_400;

/// Every built-in handler, in declaration order
pub fn default_handlers() -> Vec<Box<dyn ActionHandler>> {
    vec![
        Box::new(LockAndRedelegate),
        Box::new(Delegate),
        Box::new(DelegateDerivativeSame),
        Box::new(DelegateDerivativeRandom),
        Box::new(ManagerRebalance),
        Box::new(DelegatorWithdraw),
        Box::new(UnlockExpired),
    ]
}

/// Random share of `total` between `min_pct` and `max_pct` percent
fn portion(rng: &mut RngManager, total: U256, min_pct: u64, max_pct: u64) -> U256 {
    let pct = rng.range(min_pct, max_pct + 1);
    total * U256::from(pct) / U256::from(100u64)
}

fn random_allocation(rng: &mut RngManager, assets: usize) -> Vec<u64> {
    (0..assets).map(|_| rng.range(1, 11)).collect()
}

fn pick(sim: &mut SimulationManager, candidates: &[Address]) -> Option<Address> {
    sim.rng_mut().pick(candidates).cloned()
}

fn portfolio_owners(sim: &SimulationManager) -> Vec<Address> {
    sim.portfolios().portfolios().keys().cloned().collect()
}

fn skipped(reason: &str) -> Result<ActionOutcome, SimulationError> {
    Ok(ActionOutcome::Skipped(reason.to_string()))
}

// ============================================================================
// Locking
// ============================================================================

/// Open or grow a lock, then put the newly minted vePLN to work
pub struct LockAndRedelegate;

impl ActionHandler for LockAndRedelegate {
    fn name(&self) -> &str {
        "lock_and_redelegate"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let candidates: Vec<Address> = sim
            .pollinators()
            .iter()
            .map(|p| p.address.clone())
            .filter(|a| !sim.balance_of(a).is_zero())
            .collect();
        let Some(actor) = pick(sim, &candidates) else {
            return skipped("no pollinator holds base tokens");
        };

        let now = sim.now();
        let max_duration = sim.reward_engine().params().max_lock_duration;
        let balance = sim.balance_of(&actor);

        let minted = match sim.lock(&actor).map(|lock| lock.lock_end()) {
            None => {
                let amount = portion(sim.rng_mut(), balance, 5, 25);
                if amount.is_zero() {
                    return skipped("lock amount rounds to zero");
                }
                let duration = sim
                    .rng_mut()
                    .range(DAY.min(max_duration), max_duration.saturating_add(1));
                sim.create_lock(&actor, now.saturating_add(duration), amount)?;
                amount
            }
            Some(lock_end) if sim.rng_mut().chance(0.5) => {
                let new_end = lock_end.max(now).saturating_add(sim.rng_mut().range(DAY, 30 * DAY + 1));
                sim.extend_lock(&actor, new_end)?;
                return Ok(ActionOutcome::Applied(format!("{} extended lock to {}", actor, new_end)));
            }
            Some(_) => {
                let amount = portion(sim.rng_mut(), balance, 1, 10);
                if amount.is_zero() {
                    return skipped("lock top-up rounds to zero");
                }
                sim.increase_lock(&actor, amount)?;
                amount
            }
        };

        let owners = portfolio_owners(sim);
        match pick(sim, &owners) {
            Some(owner) => {
                sim.delegate(&actor, &owner, TokenType::Derivative, minted)?;
                Ok(ActionOutcome::Applied(format!(
                    "{} locked {} and delegated it to {}",
                    actor, minted, owner
                )))
            }
            None => Ok(ActionOutcome::Applied(format!("{} locked {}", actor, minted))),
        }
    }
}

/// Unlock an expired lock whose derivative tokens are all back in the
/// actor's hands
pub struct UnlockExpired;

impl ActionHandler for UnlockExpired {
    fn name(&self) -> &str {
        "unlock_expired"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let now = sim.now();
        let candidates: Vec<Address> = sim
            .lock_accounting()
            .locks()
            .iter()
            .filter(|(actor, lock)| {
                lock.is_expired(now)
                    && !lock.amount().is_zero()
                    && sim.derivative_balance_of(actor) >= lock.amount()
            })
            .map(|(actor, _)| actor.clone())
            .collect();
        let Some(actor) = pick(sim, &candidates) else {
            return skipped("no expired lock is fully held");
        };
        let outcome = sim.unlock(&actor)?;
        Ok(ActionOutcome::Applied(format!(
            "{} unlocked {} with {} protection",
            actor, outcome.principal, outcome.protection
        )))
    }
}

// ============================================================================
// Delegation
// ============================================================================

/// A delegator deposits base tokens into a random portfolio
pub struct Delegate;

impl ActionHandler for Delegate {
    fn name(&self) -> &str {
        "delegate"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let owners = portfolio_owners(sim);
        let Some(owner) = pick(sim, &owners) else {
            return skipped("no portfolio exists");
        };
        let candidates: Vec<Address> = sim
            .pollinators_with_role(Role::Delegator)
            .into_iter()
            .filter(|a| !sim.balance_of(a).is_zero())
            .collect();
        let Some(actor) = pick(sim, &candidates) else {
            return skipped("no delegator holds base tokens");
        };
        let balance = sim.balance_of(&actor);
        let amount = portion(sim.rng_mut(), balance, 1, 10);
        if amount.is_zero() {
            return skipped("delegation rounds to zero");
        }
        sim.delegate(&actor, &owner, TokenType::Base, amount)?;
        Ok(ActionOutcome::Applied(format!("{} delegated {} PLN to {}", actor, amount, owner)))
    }
}

/// Holders of idle vePLN, paired with the portfolios they already use
fn derivative_holders(sim: &SimulationManager) -> Vec<(Address, Vec<Address>)> {
    sim.pollinators()
        .iter()
        .map(|p| p.address.clone())
        .filter(|a| !sim.derivative_balance_of(a).is_zero())
        .map(|actor| {
            let used = sim
                .portfolios()
                .portfolios()
                .iter()
                .filter(|(_, portfolio)| portfolio.position(&actor).is_some())
                .map(|(owner, _)| owner.clone())
                .collect();
            (actor, used)
        })
        .collect()
}

fn delegate_derivative(
    sim: &mut SimulationManager,
    actor: &Address,
    owner: &Address,
) -> Result<ActionOutcome, SimulationError> {
    let balance = sim.derivative_balance_of(actor);
    let amount = portion(sim.rng_mut(), balance, 10, 100);
    if amount.is_zero() {
        return skipped("vePLN delegation rounds to zero");
    }
    sim.delegate(actor, owner, TokenType::Derivative, amount)?;
    Ok(ActionOutcome::Applied(format!("{} delegated {} vePLN to {}", actor, amount, owner)))
}

/// Add idle vePLN to a portfolio the actor is already in
pub struct DelegateDerivativeSame;

impl ActionHandler for DelegateDerivativeSame {
    fn name(&self) -> &str {
        "delegate_derivative_same"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let candidates: Vec<(Address, Vec<Address>)> = derivative_holders(sim)
            .into_iter()
            .filter(|(_, used)| !used.is_empty())
            .collect();
        if candidates.is_empty() {
            return skipped("no vePLN holder has an existing position");
        }
        let i = sim.rng_mut().index(candidates.len());
        let (actor, used) = &candidates[i];
        let j = sim.rng_mut().index(used.len());
        delegate_derivative(sim, actor, &used[j])
    }
}

/// Put idle vePLN into any portfolio
pub struct DelegateDerivativeRandom;

impl ActionHandler for DelegateDerivativeRandom {
    fn name(&self) -> &str {
        "delegate_derivative_random"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let owners = portfolio_owners(sim);
        let Some(owner) = pick(sim, &owners) else {
            return skipped("no portfolio exists");
        };
        let holders: Vec<Address> = derivative_holders(sim).into_iter().map(|(a, _)| a).collect();
        let Some(actor) = pick(sim, &holders) else {
            return skipped("nobody holds idle vePLN");
        };
        delegate_derivative(sim, &actor, &owner)
    }
}

// ============================================================================
// Portfolio Management
// ============================================================================

/// A manager opens their portfolio or shifts its composition
pub struct ManagerRebalance;

impl ActionHandler for ManagerRebalance {
    fn name(&self) -> &str {
        "manager_rebalance"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let managers = sim.pollinators_with_role(Role::Manager);
        let Some(manager) = pick(sim, &managers) else {
            return skipped("no manager registered");
        };
        let assets = sim.assets().len();
        let allocation = random_allocation(sim.rng_mut(), assets);
        if sim.portfolios().has_portfolio(&manager) {
            sim.rebalance(&manager, &allocation)?;
            Ok(ActionOutcome::Applied(format!("{} rebalanced to {:?}", manager, allocation)))
        } else {
            sim.create_portfolio(&manager, &allocation)?;
            Ok(ActionOutcome::Applied(format!("{} opened portfolio {:?}", manager, allocation)))
        }
    }
}

/// A delegator pulls part of one deposit track out of a portfolio
pub struct DelegatorWithdraw;

impl ActionHandler for DelegatorWithdraw {
    fn name(&self) -> &str {
        "delegator_withdraw"
    }

    fn execute(&mut self, sim: &mut SimulationManager) -> Result<ActionOutcome, SimulationError> {
        let mut candidates: Vec<(Address, Address, TokenType, U256)> = Vec::new();
        for (owner, portfolio) in sim.portfolios().portfolios() {
            for (actor, position) in portfolio.positions() {
                if actor == owner {
                    continue;
                }
                for token in TokenType::ALL {
                    let deposited = position.track(token).deposited;
                    if !deposited.is_zero() {
                        candidates.push((owner.clone(), actor.clone(), token, deposited));
                    }
                }
            }
        }
        if candidates.is_empty() {
            return skipped("no delegated position to withdraw");
        }
        let i = sim.rng_mut().index(candidates.len());
        let (owner, actor, token, deposited) = candidates.swap_remove(i);
        let amount = portion(sim.rng_mut(), deposited, 25, 100).max(U256::one()).min(deposited);
        let outcome = sim.withdraw(&actor, &owner, token, amount)?;
        Ok(ActionOutcome::Applied(format!(
            "{} withdrew {} {:?} from {} (reward {}, fee {})",
            actor, amount, token, owner, outcome.reward, outcome.owner_fee
        )))
    }
}
