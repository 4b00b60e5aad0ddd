//! Filter cache keyed by symbol.

use crate::error::RegistryResult;
use dashmap::DashMap;
use fuse_core::{Symbol, SymbolFilters};
use tracing::debug;

/// Source of truth for symbol filters (the metadata endpoint, or a fixture
/// in tests).
#[allow(async_fn_in_trait)]
pub trait FetchFilters: Send + Sync {
    async fn fetch_filters(&self, symbol: &Symbol) -> RegistryResult<SymbolFilters>;
}

/// Caching constraint provider.
///
/// Filters are immutable within a process lifetime, so a hit never goes to
/// the network. The cache is sharded per key (`DashMap`), so populating one
/// symbol never blocks readers of another.
pub struct FiltersProvider<F: FetchFilters> {
    fetcher: F,
    cache: DashMap<Symbol, SymbolFilters>,
}

impl<F: FetchFilters> FiltersProvider<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: DashMap::new(),
        }
    }

    /// Get filters for a symbol, fetching and caching on first use.
    pub async fn get(&self, symbol: &Symbol) -> RegistryResult<SymbolFilters> {
        if let Some(cached) = self.cache.get(symbol) {
            return Ok(cached.clone());
        }
        let filters = self.fetcher.fetch_filters(symbol).await?;
        self.cache.insert(symbol.clone(), filters.clone());
        debug!(%symbol, "cached symbol filters");
        Ok(filters)
    }

    /// Force a re-fetch, replacing any cached value.
    pub async fn refresh(&self, symbol: &Symbol) -> RegistryResult<SymbolFilters> {
        let filters = self.fetcher.fetch_filters(symbol).await?;
        self.cache.insert(symbol.clone(), filters.clone());
        Ok(filters)
    }

    /// Whether a symbol is already cached.
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.cache.contains_key(symbol)
    }

    /// Drop one cached entry.
    pub fn invalidate(&self, symbol: &Symbol) {
        self.cache.remove(symbol);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use fuse_core::{Price, Qty};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingFetcher {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FetchFilters for CountingFetcher {
        async fn fetch_filters(&self, symbol: &Symbol) -> RegistryResult<SymbolFilters> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RegistryError::Unavailable("offline".to_string()));
            }
            if symbol.as_str() == "NOPE" {
                return Err(RegistryError::SymbolNotFound(symbol.to_string()));
            }
            Ok(SymbolFilters {
                step_size: Qty::new(dec!(0.001)),
                min_qty: Qty::new(dec!(0.001)),
                min_notional: dec!(5),
                tick_size: Price::new(dec!(0.01)),
            })
        }
    }

    #[tokio::test]
    async fn test_get_caches_after_first_fetch() {
        let provider = FiltersProvider::new(CountingFetcher::new(false));
        let sym = Symbol::new("BTCUSDT");

        let a = provider.get(&sym).await.unwrap();
        let b = provider.get(&sym).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(provider.fetcher.calls(), 1);
        assert!(provider.contains(&sym));
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let provider = FiltersProvider::new(CountingFetcher::new(false));
        let sym = Symbol::new("BTCUSDT");

        provider.get(&sym).await.unwrap();
        provider.refresh(&sym).await.unwrap();
        assert_eq!(provider.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_not_cached() {
        let provider = FiltersProvider::new(CountingFetcher::new(false));
        let sym = Symbol::new("NOPE");

        assert!(matches!(
            provider.get(&sym).await,
            Err(RegistryError::SymbolNotFound(_))
        ));
        assert!(!provider.contains(&sym));
        // A later call retries rather than serving a cached failure
        let _ = provider.get(&sym).await;
        assert_eq!(provider.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_unavailable() {
        let provider = FiltersProvider::new(CountingFetcher::new(true));
        let err = provider.get(&Symbol::new("BTCUSDT")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let provider = FiltersProvider::new(CountingFetcher::new(false));
        let sym = Symbol::new("BTCUSDT");
        provider.get(&sym).await.unwrap();
        provider.invalidate(&sym);
        assert!(!provider.contains(&sym));
        provider.get(&sym).await.unwrap();
        assert_eq!(provider.fetcher.calls(), 2);
    }
}
