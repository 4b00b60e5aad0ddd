//! Margin mode enforcer.
//!
//! The exchange's margin-mode mutation is not read-your-writes: a set that
//! succeeded can still be followed by a stale read. The enforcer converges
//! with a bounded set+verify loop instead of trusting either call alone.

use crate::error::{MarginError, MarginResult};
use fuse_core::{MarginMode, Symbol};
use fuse_exchange::ExchangeAccount;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded set+verify cycles before giving up.
pub const MAX_SET_VERIFY_ATTEMPTS: u32 = 5;

/// Backoff between verify cycles.
pub const VERIFY_BACKOFF: Duration = Duration::from_millis(200);

/// Leverage bounds accepted by the exchange.
const MIN_LEVERAGE: u32 = 1;
const MAX_LEVERAGE: u32 = 125;

/// Enforces margin mode and leverage before order flow.
pub struct MarginEnforcer<E> {
    exchange: Arc<E>,
}

impl<E: ExchangeAccount> MarginEnforcer<E> {
    pub fn new(exchange: Arc<E>) -> Self {
        Self { exchange }
    }

    /// Guarantee `symbol` is in `wanted` mode, applying `leverage` once the
    /// mode is correct. Leverage failures are non-fatal; margin mode
    /// correctness is the safety-critical half of this step.
    pub async fn ensure(
        &self,
        symbol: &Symbol,
        wanted: MarginMode,
        leverage: Option<u32>,
    ) -> MarginResult<()> {
        let (current, open_amt) = self.probe(symbol, wanted).await?;

        if current == Some(wanted) {
            debug!(%symbol, mode = %wanted, "margin mode already correct");
            self.apply_leverage(symbol, leverage).await;
            return Ok(());
        }

        // Changing mode under an open position is exchange-rejected; fail
        // fast instead of attempting it.
        if open_amt > Decimal::ZERO {
            return Err(MarginError::ConflictingExposure {
                symbol: symbol.to_string(),
                current,
                wanted,
                open_amt,
            });
        }

        // Mode changes are only accepted with a clean order book.
        self.cancel_resting_orders(symbol).await;

        let mut observed = current;
        for attempt in 1..=MAX_SET_VERIFY_ATTEMPTS {
            match self.exchange.change_margin_mode(symbol, wanted).await {
                Ok(()) => {}
                Err(e) if e.is_no_change_needed() => {
                    debug!(%symbol, mode = %wanted, "exchange reports no change needed");
                }
                Err(e) if e.is_margin_change_refused() => {
                    return Err(MarginError::ChangeRefused {
                        symbol: symbol.to_string(),
                        detail: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(%symbol, attempt, error = %e, "margin mode set failed, will re-verify");
                }
            }

            match self.probe(symbol, wanted).await {
                Ok((now, _)) => {
                    observed = now;
                    if now == Some(wanted) {
                        info!(%symbol, mode = %wanted, attempt, "margin mode converged");
                        self.apply_leverage(symbol, leverage).await;
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!(%symbol, attempt, error = %e, "margin verify read failed");
                }
            }

            if attempt < MAX_SET_VERIFY_ATTEMPTS {
                tokio::time::sleep(VERIFY_BACKOFF).await;
            }
        }

        Err(MarginError::VerificationFailed {
            symbol: symbol.to_string(),
            observed,
            wanted,
            attempts: MAX_SET_VERIFY_ATTEMPTS,
        })
    }

    /// Read current margin mode and summed absolute exposure for a symbol.
    ///
    /// Hedge accounts report one row per leg; if any row already carries the
    /// wanted mode, the wanted mode wins (rows cannot disagree on a real
    /// account, but a stale mixed read must not trigger a pointless set).
    async fn probe(
        &self,
        symbol: &Symbol,
        wanted: MarginMode,
    ) -> MarginResult<(Option<MarginMode>, Decimal)> {
        let positions = self.exchange.position_info(Some(symbol)).await?;

        let mut current: Option<MarginMode> = None;
        let mut open_amt = Decimal::ZERO;
        for position in positions.iter().filter(|p| &p.symbol == symbol) {
            open_amt += position.position_amt.abs();
            if position.margin_mode == Some(wanted) {
                current = Some(wanted);
            } else if current.is_none() {
                current = position.margin_mode;
            }
        }
        Ok((current, open_amt))
    }

    async fn cancel_resting_orders(&self, symbol: &Symbol) {
        match self.exchange.open_orders_count(symbol).await {
            Ok(0) => {}
            Ok(n) => {
                info!(%symbol, count = n, "cancelling resting orders before margin change");
                if let Err(e) = self.exchange.cancel_all_orders(symbol).await {
                    warn!(%symbol, error = %e, "cancel-all failed before margin change");
                }
            }
            Err(e) => {
                warn!(%symbol, error = %e, "open-orders probe failed before margin change");
            }
        }
    }

    async fn apply_leverage(&self, symbol: &Symbol, leverage: Option<u32>) {
        let Some(lev) = leverage else { return };
        let lev = lev.clamp(MIN_LEVERAGE, MAX_LEVERAGE);
        if let Err(e) = self.exchange.change_leverage(symbol, lev).await {
            // Non-fatal: a wrong leverage sizes conservatively or gets the
            // order rejected; a wrong margin mode is the real hazard.
            warn!(%symbol, leverage = lev, error = %e, "leverage change failed, continuing");
        }
    }
}
