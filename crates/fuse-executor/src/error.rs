//! Engine error types.

use fuse_exchange::ExchangeError;
use fuse_margin::MarginError;
use fuse_registry::RegistryError;
use thiserror::Error;

/// Failures surfaced by the engine facade. Sizing rejections are not
/// errors; they come back as structured outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("margin enforcement failed: {0}")]
    Margin(#[from] MarginError),

    #[error("exchange call failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("symbol constraints unavailable: {0}")]
    Registry(#[from] RegistryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
