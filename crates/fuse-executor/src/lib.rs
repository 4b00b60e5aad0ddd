//! Order execution and the trade engine facade.
//!
//! `OrderExecutor` places sized orders (hedge-leg tagging, reduce-only
//! semantics) and implements the idempotent close-everything operation.
//! `TradeEngine` composes the guard, margin enforcer, sizer, and executor
//! behind the surface the strategy/GUI layer calls.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;

pub use config::{EngineConfig, JobSpec, MarginSettings, SizingSettings};
pub use engine::{OpenOutcome, SkipReason, TradeEngine};
pub use error::{EngineError, EngineResult};
pub use executor::{CloseStatus, OrderExecutor, SymbolCloseReport};
