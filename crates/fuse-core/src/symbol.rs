//! Instrument and signal-loop identifiers.
//!
//! A signal loop is identified by `(Symbol, Interval)`; the guard keys its
//! tables by these plus the order side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange instrument symbol (e.g., "BTCUSDT").
///
/// Normalized to uppercase on construction so that table lookups never
/// depend on caller casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Candle interval a signal loop runs on (e.g., "5m", "1h").
///
/// Treated as an opaque token; the core never parses it into a duration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(String);

impl Interval {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Interval {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A configured signal source: one long-running loop per symbol+interval.
///
/// Used by reconciliation to reseed the guard ledger for every loop that
/// trades a symbol the exchange reports live exposure on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub symbol: Symbol,
    pub interval: Interval,
}

impl JobKey {
    pub fn new(symbol: impl Into<Symbol>, interval: impl Into<Interval>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::new(" btcusdt "), Symbol::new("BTCUSDT"));
        assert_eq!(Symbol::new("ethusdt").as_str(), "ETHUSDT");
    }

    #[test]
    fn test_interval_is_case_sensitive() {
        // "1m" and "1M" are different Binance intervals (minute vs month)
        assert_ne!(Interval::new("1m"), Interval::new("1M"));
    }

    #[test]
    fn test_job_key_display() {
        let job = JobKey::new("btcusdt", "5m");
        assert_eq!(job.to_string(), "BTCUSDT@5m");
    }
}
