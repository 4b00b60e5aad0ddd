//! Position sizing.
//!
//! Converts a sizing intent (percent-of-balance or explicit quantity) into
//! a concrete, exchange-filter-compliant order quantity, or a structured
//! rejection that tells the caller exactly how much percent would have been
//! required.

pub mod request;
pub mod sizer;

pub use request::{
    RejectReason, SizeIntent, SizedOrder, SizingDiagnostics, SizingMode, SizingRejection,
    SizingRequest, SizingResult,
};
pub use sizer::{PositionSizer, SizingPolicy};
