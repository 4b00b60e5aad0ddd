//! Margin enforcement error types.

use fuse_core::MarginMode;
use fuse_exchange::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarginError {
    /// The symbol is in the wrong mode and carries live exposure; changing
    /// mode under an open position is exchange-rejected and must not be
    /// attempted. Requires manual intervention.
    #[error(
        "{symbol} is {current:?} with open exposure {open_amt}; refusing to trade until margin \
         mode can be changed to {wanted}"
    )]
    ConflictingExposure {
        symbol: String,
        current: Option<MarginMode>,
        wanted: MarginMode,
        open_amt: rust_decimal::Decimal,
    },

    /// The exchange refused the change while open orders/positions exist.
    #[error("exchange refused margin change for {symbol}: {detail}")]
    ChangeRefused { symbol: String, detail: String },

    /// Set+verify cycles exhausted without the mode converging.
    #[error("margin mode for {symbol} is {observed:?} after {attempts} attempts; wanted {wanted}")]
    VerificationFailed {
        symbol: String,
        observed: Option<MarginMode>,
        wanted: MarginMode,
        attempts: u32,
    },

    /// Network/exchange failure on a call the enforcer cannot degrade.
    #[error("margin enforcement transport error: {0}")]
    Transport(#[from] ExchangeError),
}

pub type MarginResult<T> = Result<T, MarginError>;
