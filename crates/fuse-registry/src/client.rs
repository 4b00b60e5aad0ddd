//! HTTP client for the futures exchange-info endpoint.

use crate::cache::FetchFilters;
use crate::error::{RegistryError, RegistryResult};
use fuse_core::{Price, Qty, Symbol, SymbolFilters};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for metadata requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for fetching per-symbol filters from exchange metadata.
pub struct FiltersClient {
    client: reqwest::Client,
    exchange_info_url: String,
}

impl FiltersClient {
    /// Create a new filters client.
    ///
    /// # Arguments
    /// * `exchange_info_url` - Full URL of the exchange-info endpoint
    ///   (e.g., "https://fapi.binance.com/fapi/v1/exchangeInfo").
    pub fn new(exchange_info_url: impl Into<String>) -> RegistryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            exchange_info_url: exchange_info_url.into(),
        })
    }

    async fn fetch_exchange_info(&self) -> RegistryResult<serde_json::Value> {
        debug!(url = %self.exchange_info_url, "fetching exchange info");

        let response = self
            .client
            .get(&self.exchange_info_url)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Unavailable(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| RegistryError::Unavailable(format!("failed to parse response: {e}")))
    }
}

impl FetchFilters for FiltersClient {
    async fn fetch_filters(&self, symbol: &Symbol) -> RegistryResult<SymbolFilters> {
        let info = self.fetch_exchange_info().await?;

        let symbols = info
            .get("symbols")
            .and_then(|s| s.as_array())
            .ok_or_else(|| RegistryError::Parse {
                symbol: symbol.to_string(),
                detail: "exchangeInfo has no symbols array".to_string(),
            })?;

        let entry = symbols
            .iter()
            .find(|s| {
                s.get("symbol").and_then(|v| v.as_str()) == Some(symbol.as_str())
            })
            .ok_or_else(|| RegistryError::SymbolNotFound(symbol.to_string()))?;

        let filters = parse_symbol_filters(symbol, entry)?;
        info!(%symbol, step = %filters.step_size, min_qty = %filters.min_qty,
              min_notional = %filters.min_notional, tick = %filters.tick_size,
              "fetched symbol filters");
        Ok(filters)
    }
}

/// Extract `SymbolFilters` from one exchangeInfo symbol entry.
///
/// LOT_SIZE supplies step/minQty, PRICE_FILTER the tick; the notional
/// floor appears as either MIN_NOTIONAL.minNotional or NOTIONAL.notional
/// depending on endpoint generation.
pub fn parse_symbol_filters(
    symbol: &Symbol,
    entry: &serde_json::Value,
) -> RegistryResult<SymbolFilters> {
    let mut step_size: Option<Decimal> = None;
    let mut min_qty: Option<Decimal> = None;
    let mut tick_size: Option<Decimal> = None;
    let mut min_notional: Option<Decimal> = None;

    let parse_field = |f: &serde_json::Value, key: &str| -> Option<Decimal> {
        f.get(key).and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
    };

    for f in entry
        .get("filters")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
    {
        match f.get("filterType").and_then(|v| v.as_str()) {
            Some("LOT_SIZE") => {
                step_size = parse_field(f, "stepSize");
                min_qty = parse_field(f, "minQty");
            }
            Some("PRICE_FILTER") => {
                tick_size = parse_field(f, "tickSize");
            }
            Some("MIN_NOTIONAL") | Some("NOTIONAL") => {
                min_notional = parse_field(f, "notional").or_else(|| parse_field(f, "minNotional"));
            }
            _ => {}
        }
    }

    let step_size = step_size.ok_or_else(|| RegistryError::Parse {
        symbol: symbol.to_string(),
        detail: "missing LOT_SIZE.stepSize".to_string(),
    })?;

    Ok(SymbolFilters {
        step_size: Qty::new(step_size),
        min_qty: Qty::new(min_qty.unwrap_or(step_size)),
        min_notional: min_notional.unwrap_or(Decimal::ZERO),
        tick_size: Price::new(tick_size.unwrap_or(Decimal::ZERO)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_entry() -> serde_json::Value {
        serde_json::json!({
            "symbol": "BTCUSDT",
            "filters": [
                {"filterType": "PRICE_FILTER", "tickSize": "0.10", "minPrice": "556.80"},
                {"filterType": "LOT_SIZE", "stepSize": "0.001", "minQty": "0.001", "maxQty": "1000"},
                {"filterType": "NOTIONAL", "notional": "100"}
            ]
        })
    }

    #[test]
    fn test_parse_symbol_filters() {
        let sym = Symbol::new("BTCUSDT");
        let filters = parse_symbol_filters(&sym, &sample_entry()).unwrap();
        assert_eq!(filters.step_size.inner(), dec!(0.001));
        assert_eq!(filters.min_qty.inner(), dec!(0.001));
        assert_eq!(filters.min_notional, dec!(100));
        assert_eq!(filters.tick_size.inner(), dec!(0.10));
    }

    #[test]
    fn test_parse_legacy_min_notional_spelling() {
        let entry = serde_json::json!({
            "symbol": "ETHUSDT",
            "filters": [
                {"filterType": "LOT_SIZE", "stepSize": "0.01", "minQty": "0.01"},
                {"filterType": "MIN_NOTIONAL", "minNotional": "5.0"}
            ]
        });
        let filters = parse_symbol_filters(&Symbol::new("ETHUSDT"), &entry).unwrap();
        assert_eq!(filters.min_notional, dec!(5.0));
        // No PRICE_FILTER: tick defaults to zero (no snapping)
        assert!(filters.tick_size.is_zero());
    }

    #[test]
    fn test_parse_missing_lot_size_fails() {
        let entry = serde_json::json!({"symbol": "X", "filters": []});
        let err = parse_symbol_filters(&Symbol::new("X"), &entry).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
    }

    #[test]
    fn test_min_qty_defaults_to_step() {
        let entry = serde_json::json!({
            "symbol": "X",
            "filters": [{"filterType": "LOT_SIZE", "stepSize": "0.1"}]
        });
        let filters = parse_symbol_filters(&Symbol::new("X"), &entry).unwrap();
        assert_eq!(filters.min_qty.inner(), dec!(0.1));
    }
}
