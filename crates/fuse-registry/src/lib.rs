//! Per-symbol trading constraint provider.
//!
//! Fetches exchange metadata (lot step, minimum quantity, minimum notional,
//! price tick) and caches it per symbol for the process lifetime. Callers
//! may force a refresh when the exchange rejects a quantity the cached
//! filters said was legal.

pub mod cache;
pub mod client;
pub mod error;

pub use cache::{FetchFilters, FiltersProvider};
pub use client::FiltersClient;
pub use error::{RegistryError, RegistryResult};
