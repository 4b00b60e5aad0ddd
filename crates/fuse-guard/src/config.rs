//! Guard configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the duplicate-open guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Ledger entry TTL in seconds; 0 disables expiry. Tolerates external
    /// closes the guard was never told about.
    #[serde(default = "default_ledger_ttl_secs")]
    pub ledger_ttl_secs: u64,
    /// Pending-attempt TTL in seconds. Bounds the staleness of a stuck
    /// reservation when an open attempt crashes mid-flight; tuned to a
    /// typical order round trip, much shorter than the ledger TTL.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    /// When enabled, any interval holding a side for a symbol blocks every
    /// other interval from opening that same side (no cross-interval
    /// pyramiding).
    #[serde(default)]
    pub strict_symbol_side: bool,
}

fn default_ledger_ttl_secs() -> u64 {
    180
}

fn default_pending_ttl_secs() -> u64 {
    45
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            ledger_ttl_secs: default_ledger_ttl_secs(),
            pending_ttl_secs: default_pending_ttl_secs(),
            strict_symbol_side: false,
        }
    }
}

impl GuardConfig {
    pub fn ledger_ttl_ms(&self) -> u64 {
        self.ledger_ttl_secs * 1000
    }

    pub fn pending_ttl_ms(&self) -> u64 {
        self.pending_ttl_secs * 1000
    }
}
