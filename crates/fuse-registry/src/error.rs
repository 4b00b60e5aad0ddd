//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The exchange lists no such symbol.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// Metadata could not be fetched (network / exchange down).
    #[error("exchange metadata unavailable: {0}")]
    Unavailable(String),

    /// Metadata arrived but a required filter field was missing or malformed.
    #[error("filter parse error for {symbol}: {detail}")]
    Parse { symbol: String, detail: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
