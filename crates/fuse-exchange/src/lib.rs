//! Exchange account interface boundary.
//!
//! The raw HTTP/WebSocket client lives outside this core; this crate pins
//! down the handful of operations and response fields the core actually
//! consumes, as typed structs validated at the boundary rather than raw
//! JSON maps passed through.

pub mod api;
pub mod error;
pub mod types;

pub use api::ExchangeAccount;
pub use error::{ExchangeError, ExchangeResult};
pub use types::{BookTicker, LivePosition, OrderAck, OrderRequest, RawPositionInfo};
