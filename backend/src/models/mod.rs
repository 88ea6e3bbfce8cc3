//! Domain models for the token-lock simulation

pub mod actor;
pub mod event;
pub mod ledger;
pub mod lock;
pub mod portfolio;

// Re-exports
pub use actor::{Address, Pollinator, Role, TokenType};
pub use event::{Event, EventLog};
pub use ledger::{Ledger, LedgerError};
pub use lock::{InflationInfo, LockDetail, LockRecord};
pub use portfolio::{Benchmark, Portfolio, PortfolioError, PortfolioModel, Position, Track};
