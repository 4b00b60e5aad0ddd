//! The shared guard instance wrapping `GuardState` for concurrent loops.

use crate::config::GuardConfig;
use crate::state::{DenyReason, GuardState};
use fuse_core::{now_ms, Interval, JobKey, OrderSide, Symbol};
use fuse_exchange::{ExchangeAccount, LivePosition};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Duplicate-open guard shared by every signal loop.
///
/// All state lives behind one exclusive lock; every public method holds it
/// for its full critical section. The one network call (the defensive
/// position check in `can_open`) runs *between* two critical sections so a
/// slow exchange cannot stall unrelated symbols, and the reservation is
/// re-validated after the fetch so exactly one racing caller wins.
pub struct OpenGuard<E> {
    state: Mutex<GuardState>,
    exchange: Option<Arc<E>>,
}

impl<E: ExchangeAccount> OpenGuard<E> {
    pub fn new(config: GuardConfig, exchange: Option<Arc<E>>) -> Self {
        Self {
            state: Mutex::new(GuardState::new(config)),
            exchange,
        }
    }

    /// May this loop open `(symbol, interval, side)`?
    ///
    /// On success the slot is reserved as a pending attempt; the caller
    /// must conclude it with `end_open`. On any denial this is a no-op.
    pub async fn can_open(&self, symbol: &Symbol, interval: &Interval, side: OrderSide) -> bool {
        // Local checks first; cheap denial without touching the network.
        if let Err(reason) = self
            .state
            .lock()
            .check_open(symbol, interval, side, now_ms())
        {
            debug!(%symbol, %interval, %side, %reason, "open denied");
            return false;
        }

        // Defensive live check, lock released. Degrades to permissive on
        // transport errors: the exchange's own rejection is the backstop,
        // and the guard must not hard-block every symbol when the exchange
        // is unreachable.
        let live_same_side = match &self.exchange {
            Some(exchange) => match exchange.position_info(Some(symbol)).await {
                Ok(positions) => positions
                    .iter()
                    .any(|p| &p.symbol == symbol && p.side() == Some(side)),
                Err(error) => {
                    warn!(%symbol, %side, %error,
                          "defensive position check failed; permitting attempt");
                    false
                }
            },
            None => false,
        };

        let mut state = self.state.lock();
        if live_same_side {
            // Backfill so the next attempt is denied without asking again.
            state.record_live(symbol, interval, side);
            debug!(%symbol, %interval, %side, reason = %DenyReason::LiveSameSide, "open denied");
            return false;
        }

        // Re-run the checks: another loop may have reserved while the lock
        // was released. Exactly one of two racing callers passes this.
        match state.try_reserve(symbol, interval, side, now_ms()) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%symbol, %interval, %side, %reason, "open denied on re-check");
                false
            }
        }
    }

    /// Low-level coalescing primitive: reserve `(symbol, side)` for `ttl`.
    pub fn begin_open(
        &self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        ttl: Duration,
    ) -> bool {
        self.state
            .lock()
            .begin_open(symbol, interval, side, ttl.as_millis() as u64, now_ms())
    }

    /// Conclude an open attempt, promoting it to the ledger on success.
    pub fn end_open(&self, symbol: &Symbol, interval: &Interval, side: OrderSide, success: bool) {
        self.state
            .lock()
            .end_open(symbol, interval, side, success, now_ms());
    }

    /// Record an open confirmed out-of-band (e.g., a trade-update push).
    pub fn mark_opened(&self, symbol: &Symbol, interval: &Interval, side: OrderSide) {
        self.state.lock().mark_opened(symbol, interval, side, now_ms());
    }

    /// Record a close confirmed out-of-band.
    pub fn mark_closed(&self, symbol: &Symbol, interval: &Interval, side: OrderSide) {
        self.state.lock().mark_closed(symbol, interval, side);
    }

    /// Reseed the ledger from live positions already fetched from the
    /// exchange. Safe to call with anything, including an empty slice;
    /// callers skip the whole pass on fetch errors.
    pub fn reconcile_with_exchange(&self, live_positions: &[LivePosition], known_jobs: &[JobKey]) {
        let live: Vec<(Symbol, OrderSide)> = live_positions
            .iter()
            .filter_map(|p| p.side().map(|side| (p.symbol.clone(), side)))
            .collect();
        self.state.lock().reconcile(&live, known_jobs, now_ms());
    }

    /// Drop all guard state.
    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Run a closure against the locked state (introspection for tests and
    /// status displays).
    pub fn with_state<R>(&self, f: impl FnOnce(&mut GuardState) -> R) -> R {
        f(&mut self.state.lock())
    }
}
