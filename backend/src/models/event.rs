//! Event logging for simulation replay and diagnostics.
//!
//! Every state change the simulation manager applies is recorded as an
//! [`Event`]. The log is what a test harness diffs against chain history when
//! a comparison fails, and it is what makes a seeded run explainable.
//!
//! # Event Types
//!
//! - **Round**: round boundaries, handler order, submitted prices, skips
//! - **Lock**: created, increased, extended, unlocked, inflation recomputed
//! - **Portfolio**: created, delegated, withdrawn, rebalanced
//! - **Supply**: administrative mint/burn of the base token
//!
//! # Example
//!
//! ```rust
//! use token_lock_sim_core::models::event::{Event, EventLog};
//! use token_lock_sim_core::Address;
//! use primitive_types::U256;
//!
//! let mut log = EventLog::new();
//! log.log(Event::LockExtended {
//!     round: 3,
//!     actor: Address::new("alice"),
//!     old_lock_end: 100,
//!     new_lock_end: 200,
//! });
//! assert_eq!(log.events_of_type("LockExtended").len(), 1);
//! assert_eq!(log.events_in_round(3).len(), 1);
//! ```

use crate::core::fixed::SignedValue;
use crate::models::actor::{Address, TokenType};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// All events carry the round they happened in. Events are logged in the
/// order they occur within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Identities seeded and the admin balance distributed
    Initialized {
        round: u64,
        identities: usize,
        share_per_identity: U256,
    },

    /// A round began; handlers will run in `handler_order`
    RoundStarted {
        round: u64,
        timestamp: u64,
        handler_order: Vec<String>,
    },

    /// Prices accepted by the price consumer
    PricesSubmitted {
        round: u64,
        assets: Vec<String>,
        prices: Vec<U256>,
    },

    /// A handler found nothing to do
    HandlerSkipped {
        round: u64,
        handler: String,
        reason: String,
    },

    LockCreated {
        round: u64,
        actor: Address,
        amount: U256,
        lock_end: u64,
        supply_at_deposit: U256,
    },

    LockIncreased {
        round: u64,
        actor: Address,
        amount: U256,
        new_total: U256,
        supply_at_deposit: U256,
    },

    LockExtended {
        round: u64,
        actor: Address,
        old_lock_end: u64,
        new_lock_end: u64,
    },

    /// Inflation reserve recomputed ahead of an unlock
    InflationProcessed {
        round: u64,
        recorded_supply: U256,
        current_supply: U256,
        reserved_before: U256,
        reserved_after: U256,
    },

    Unlocked {
        round: u64,
        actor: Address,
        principal: U256,
        protection: U256,
        derivative_burned: U256,
    },

    PortfolioCreated {
        round: u64,
        owner: Address,
        allocation: Vec<u64>,
    },

    Delegated {
        round: u64,
        actor: Address,
        owner: Address,
        token: TokenType,
        amount: U256,
        units: U256,
    },

    Withdrawn {
        round: u64,
        actor: Address,
        owner: Address,
        token: TokenType,
        amount: U256,
        reward: SignedValue,
        pollinator_payout: U256,
        owner_fee: U256,
    },

    Rebalanced {
        round: u64,
        owner: Address,
        allocation: Vec<u64>,
    },

    SupplyMinted {
        round: u64,
        to: Address,
        amount: U256,
    },

    SupplyBurned {
        round: u64,
        from: Address,
        amount: U256,
    },
}

impl Event {
    /// Round in which this event occurred
    pub fn round(&self) -> u64 {
        match self {
            Event::Initialized { round, .. }
            | Event::RoundStarted { round, .. }
            | Event::PricesSubmitted { round, .. }
            | Event::HandlerSkipped { round, .. }
            | Event::LockCreated { round, .. }
            | Event::LockIncreased { round, .. }
            | Event::LockExtended { round, .. }
            | Event::InflationProcessed { round, .. }
            | Event::Unlocked { round, .. }
            | Event::PortfolioCreated { round, .. }
            | Event::Delegated { round, .. }
            | Event::Withdrawn { round, .. }
            | Event::Rebalanced { round, .. }
            | Event::SupplyMinted { round, .. }
            | Event::SupplyBurned { round, .. } => *round,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Initialized { .. } => "Initialized",
            Event::RoundStarted { .. } => "RoundStarted",
            Event::PricesSubmitted { .. } => "PricesSubmitted",
            Event::HandlerSkipped { .. } => "HandlerSkipped",
            Event::LockCreated { .. } => "LockCreated",
            Event::LockIncreased { .. } => "LockIncreased",
            Event::LockExtended { .. } => "LockExtended",
            Event::InflationProcessed { .. } => "InflationProcessed",
            Event::Unlocked { .. } => "Unlocked",
            Event::PortfolioCreated { .. } => "PortfolioCreated",
            Event::Delegated { .. } => "Delegated",
            Event::Withdrawn { .. } => "Withdrawn",
            Event::Rebalanced { .. } => "Rebalanced",
            Event::SupplyMinted { .. } => "SupplyMinted",
            Event::SupplyBurned { .. } => "SupplyBurned",
        }
    }

    /// Acting address, if the event has one
    pub fn actor(&self) -> Option<&Address> {
        match self {
            Event::LockCreated { actor, .. }
            | Event::LockIncreased { actor, .. }
            | Event::LockExtended { actor, .. }
            | Event::Unlocked { actor, .. }
            | Event::Delegated { actor, .. }
            | Event::Withdrawn { actor, .. } => Some(actor),
            Event::PortfolioCreated { owner, .. } | Event::Rebalanced { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_in_round(&self, round: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.round() == round).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_actor(&self, actor: &Address) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.actor() == Some(actor))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_for_actor_filters_by_address() {
        let alice = Address::new("alice");
        let mut log = EventLog::new();
        log.log(Event::LockExtended {
            round: 1,
            actor: alice.clone(),
            old_lock_end: 1,
            new_lock_end: 2,
        });
        log.log(Event::SupplyMinted {
            round: 1,
            to: alice.clone(),
            amount: U256::one(),
        });
        assert_eq!(log.events_for_actor(&alice).len(), 1);
        assert_eq!(log.events_in_round(1).len(), 2);
    }
}
