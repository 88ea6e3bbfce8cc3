//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, deterministic random number generation.
//! All randomness in the engine (handler order, actor selection, amounts,
//! price walks) MUST go through this module so a run is replayable from its seed.

mod xorshift;

pub use xorshift::RngManager;
