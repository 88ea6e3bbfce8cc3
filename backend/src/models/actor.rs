//! Actor identities and roles
//!
//! Every participant (admin, portfolio managers, delegators, strategies and
//! the protocol's own escrow accounts) is identified by an [`Address`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
///
/// Opaque string, usually a hex wallet address supplied by the test harness.
/// Ordered so ledgers iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Escrow account holding base tokens swapped into locks
pub fn lock_pool_address() -> Address {
    Address::new("protocol:lock_pool")
}

/// Account holding base tokens delegated to portfolios
pub fn portfolio_pool_address() -> Address {
    Address::new("protocol:portfolio_pool")
}

/// Portfolio manager contract; the only non-pool holder allowed to move
/// derivative tokens
pub fn portfolio_manager_address() -> Address {
    Address::new("protocol:portfolio_manager")
}

/// Which deposit track a token amount belongs to
///
/// Used as a map key wherever balances are kept per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// The primary fungible token
    Base,
    /// The non-transferable locked token
    Derivative,
}

impl TokenType {
    pub const ALL: [TokenType; 2] = [TokenType::Base, TokenType::Derivative];
}

/// Role a pollinator plays in the simulated economy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Owns and rebalances a portfolio
    Manager,
    /// Delegates tokens to other actors' portfolios
    Delegator,
    /// Automated strategy account
    Strategy,
}

/// A simulated participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pollinator {
    pub address: Address,
    pub role: Role,
}

impl Pollinator {
    pub fn new(address: Address, role: Role) -> Self {
        Self { address, role }
    }
}
