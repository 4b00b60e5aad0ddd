//! Core domain types for the fuse execution-safety core.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `Symbol`, `Interval`, `JobKey`: identifiers for instruments and signal loops
//! - `Price`, `Qty`: precision-safe numeric types
//! - `SymbolFilters`: per-symbol exchange constraints (step, minimums, tick)
//! - `OrderSide`, `PositionSide`, `MarginMode`: trading enums

pub mod decimal;
pub mod error;
pub mod filters;
pub mod order;
pub mod symbol;

pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use filters::SymbolFilters;
pub use order::{MarginMode, OrderSide, OrderType, PositionSide, TimeInForce};
pub use symbol::{Interval, JobKey, Symbol};

/// Current wall-clock time as Unix milliseconds.
///
/// Guard and ledger timestamps are plain `u64` ms so that TTL logic can be
/// driven with explicit clocks in tests.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
