//! Error types for fuse-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid quantity: {0}")]
    InvalidQty(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse_error_converts() {
        let err: CoreError = "not-a-number"
            .parse::<rust_decimal::Decimal>()
            .unwrap_err()
            .into();
        assert!(matches!(err, CoreError::DecimalParse(_)));
        assert!(err.to_string().starts_with("Decimal parse error"));
    }
}
