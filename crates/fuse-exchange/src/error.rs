//! Exchange error taxonomy.
//!
//! The enforcer and closer branch on specific exchange rejections, so the
//! classification lives here as typed predicates instead of ad-hoc string
//! matching at every call site.

use thiserror::Error;

/// Exchange rejected a margin-type change because nothing needed changing.
/// Treated as success by the enforcer.
pub const CODE_NO_NEED_TO_CHANGE: i64 = -4046;

/// Exchange refused a margin-type change while open orders/positions exist.
pub const CODE_MARGIN_CHANGE_REFUSED: i64 = -4048;

/// `reduceOnly` parameter sent when not required.
pub const CODE_REDUCE_ONLY_NOT_REQUIRED: i64 = -1106;

/// Reduce-only order rejected (would not decrease exposure).
pub const CODE_REDUCE_ONLY_REJECTED: i64 = -2022;

/// Errors surfaced by the exchange boundary.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Network failure or exchange unavailable. Guard checks degrade to
    /// permissive on this variant; sizing/order calls surface it.
    #[error("transport error: {0}")]
    Transport(String),

    /// Typed rejection from the exchange, with its error code when known.
    #[error("exchange rejected ({code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },

    /// Response arrived but could not be interpreted.
    #[error("invalid exchange response: {0}")]
    InvalidResponse(String),
}

impl ExchangeError {
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: Some(code),
            message: message.into(),
        }
    }

    fn matches(&self, code: i64, needle: &str) -> bool {
        match self {
            Self::Rejected { code: Some(c), .. } if *c == code => true,
            Self::Rejected { message, .. } => message.to_ascii_lowercase().contains(needle),
            _ => false,
        }
    }

    /// "No need to change margin type" — success in disguise.
    pub fn is_no_change_needed(&self) -> bool {
        self.matches(CODE_NO_NEED_TO_CHANGE, "no need to change margin type")
    }

    /// Margin change refused while open orders/positions exist.
    pub fn is_margin_change_refused(&self) -> bool {
        self.matches(CODE_MARGIN_CHANGE_REFUSED, "cannot be changed")
    }

    /// The reduce-only rejection class that triggers the closer's
    /// limit-IOC fallback.
    pub fn is_reduce_only_rejected(&self) -> bool {
        self.matches(CODE_REDUCE_ONLY_NOT_REQUIRED, "reduceonly")
            || self.matches(CODE_REDUCE_ONLY_REJECTED, "reduce only")
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
