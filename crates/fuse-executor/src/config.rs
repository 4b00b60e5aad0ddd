//! Engine configuration.

use fuse_core::{JobKey, MarginMode};
use fuse_guard::GuardConfig;
use fuse_sizing::SizingPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One configured signal source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Instrument symbol (e.g., "BTCUSDT"); normalized on use.
    pub symbol: String,
    /// Candle interval the loop runs on (e.g., "5m").
    pub interval: String,
}

impl JobSpec {
    pub fn job_key(&self) -> JobKey {
        JobKey::new(self.symbol.as_str(), self.interval.as_str())
    }
}

/// Margin settings applied before every open attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginSettings {
    /// Desired margin mode for every traded symbol.
    #[serde(default)]
    pub mode: MarginMode,
    /// Account leverage. Default: 5.
    #[serde(default = "default_leverage")]
    pub leverage: u32,
}

fn default_leverage() -> u32 {
    5
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self {
            mode: MarginMode::default(),
            leverage: default_leverage(),
        }
    }
}

/// Sizing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingSettings {
    /// When true, a below-minimum size is lifted to the exchange minimum
    /// instead of rejected (flexible policy).
    #[serde(default)]
    pub auto_bump_to_minimum: bool,
    /// Cap on the lift, as percent of balance. Default: 5.
    #[serde(default = "default_max_auto_bump_percent")]
    pub max_auto_bump_percent: Decimal,
}

fn default_max_auto_bump_percent() -> Decimal {
    Decimal::from(5)
}

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            auto_bump_to_minimum: false,
            max_auto_bump_percent: default_max_auto_bump_percent(),
        }
    }
}

impl SizingSettings {
    pub fn policy(&self) -> SizingPolicy {
        if self.auto_bump_to_minimum {
            SizingPolicy::Flexible {
                max_auto_bump_percent: self.max_auto_bump_percent,
            }
        } else {
            SizingPolicy::Strict
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configured signal loops.
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
    #[serde(default)]
    pub margin: MarginSettings,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub sizing: SizingSettings,
}

impl EngineConfig {
    /// Parse from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Job keys for reconciliation.
    pub fn job_keys(&self) -> Vec<JobKey> {
        self.jobs.iter().map(|j| j.job_key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.jobs.is_empty());
        assert_eq!(config.margin.leverage, 5);
        assert_eq!(config.margin.mode, MarginMode::Isolated);
        assert_eq!(config.guard.ledger_ttl_secs, 180);
        assert_eq!(config.guard.pending_ttl_secs, 45);
        assert!(!config.guard.strict_symbol_side);
        assert_eq!(config.sizing.policy(), SizingPolicy::Strict);
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[jobs]]
            symbol = "btcusdt"
            interval = "5m"

            [[jobs]]
            symbol = "ETHUSDT"
            interval = "1h"

            [margin]
            mode = "cross"
            leverage = 10

            [guard]
            ledger_ttl_secs = 300
            strict_symbol_side = true

            [sizing]
            auto_bump_to_minimum = true
            max_auto_bump_percent = "2.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.jobs.len(), 2);
        // Symbols normalize when converted to job keys
        assert_eq!(config.job_keys()[0], JobKey::new("BTCUSDT", "5m"));
        assert_eq!(config.margin.mode, MarginMode::Cross);
        assert_eq!(config.margin.leverage, 10);
        assert_eq!(config.guard.ledger_ttl_secs, 300);
        assert!(config.guard.strict_symbol_side);
        // Pending TTL falls back to its default when omitted
        assert_eq!(config.guard.pending_ttl_secs, 45);
        assert_eq!(
            config.sizing.policy(),
            SizingPolicy::Flexible {
                max_auto_bump_percent: dec!(2.5)
            }
        );
    }
}
