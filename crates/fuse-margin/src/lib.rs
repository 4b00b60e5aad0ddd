//! Margin mode enforcement.
//!
//! Guarantees a symbol is in the desired margin mode (and leverage) before
//! any order is sized, verifying against read-after-write races and
//! blocking when live exposure makes the change unsafe.

pub mod enforcer;
pub mod error;

pub use enforcer::{MarginEnforcer, MAX_SET_VERIFY_ATTEMPTS, VERIFY_BACKOFF};
pub use error::{MarginError, MarginResult};
