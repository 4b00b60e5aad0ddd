//! Structured logging for the fuse execution-safety core.
//!
//! Guard denials, margin retries, and close-all reports are all traced;
//! this crate wires the subscriber once at startup.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
