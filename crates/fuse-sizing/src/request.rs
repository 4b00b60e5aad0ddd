//! Sizing request/result types.

use fuse_core::{OrderSide, Price, Qty, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the caller wants the position sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeIntent {
    /// Percent of available balance to commit as margin.
    PercentOfBalance(Decimal),
    /// Explicit quantity; snapped down to the step grid, never up.
    Quantity(Qty),
}

/// A request to size one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub intent: SizeIntent,
    /// Account leverage for the symbol. Values below 1 are treated as 1.
    pub leverage: i64,
    /// Current price used for notional math.
    pub price: Price,
    pub reduce_only: bool,
}

impl SizingRequest {
    /// Leverage as a positive decimal multiplier.
    pub fn effective_leverage(&self) -> Decimal {
        Decimal::from(self.leverage.max(1))
    }
}

/// How the accepted quantity was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Explicit quantity, snapped to step.
    Quantity,
    /// Percent-of-balance arithmetic.
    Percent,
    /// Percent result was below the exchange minimum and got lifted to it.
    PercentBumpedToMinimum,
    /// Explicit quantity was below the exchange minimum and got lifted to it.
    FallbackMinimum,
}

/// An accepted, filter-compliant order size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedOrder {
    pub qty: Qty,
    /// qty × price at sizing time.
    pub notional: Decimal,
    pub mode: SizingMode,
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Requested size lands below minQty/minNotional and the policy does
    /// not allow lifting it.
    BelowExchangeMinimum,
    /// No usable price (zero or negative).
    NoPriceAvailable,
    /// Percent or quantity was zero/negative, or rounded down to zero.
    InvalidSize,
}

/// Numbers behind a rejection, for the caller to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingDiagnostics {
    pub price: Price,
    pub step_size: Qty,
    pub min_qty: Qty,
    pub min_notional: Decimal,
    /// Smallest legal quantity at this price.
    pub need_qty: Qty,
    /// Notional of the smallest legal quantity.
    pub need_notional: Decimal,
    pub leverage: Decimal,
    pub available_balance: Decimal,
    /// Margin the request would have committed (percent intents only).
    pub margin_budget: Option<Decimal>,
}

/// Structured rejection. Not an error type: an expected, user-facing
/// outcome the GUI renders as "you need at least X%".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingRejection {
    pub reason: RejectReason,
    /// Percent of balance that would have cleared the exchange minimum.
    pub required_percent: Option<Decimal>,
    pub diagnostics: Option<SizingDiagnostics>,
}

impl SizingRejection {
    pub fn bare(reason: RejectReason) -> Self {
        Self {
            reason,
            required_percent: None,
            diagnostics: None,
        }
    }
}

/// Outcome of sizing one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SizingResult {
    Sized(SizedOrder),
    Rejected(SizingRejection),
}

impl SizingResult {
    pub fn is_sized(&self) -> bool {
        matches!(self, Self::Sized(_))
    }

    pub fn sized(&self) -> Option<&SizedOrder> {
        match self {
            Self::Sized(order) => Some(order),
            Self::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&SizingRejection> {
        match self {
            Self::Sized(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}
