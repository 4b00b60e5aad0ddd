//! The trade engine facade.
//!
//! Everything the strategy/GUI layer calls goes through here:
//! guard permission → margin convergence → sizing → order placement,
//! with the guard reservation finalized or released on every path.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::{OrderExecutor, SymbolCloseReport};
use fuse_core::{Interval, OrderSide, Symbol};
use fuse_exchange::{ExchangeAccount, OrderAck};
use fuse_guard::OpenGuard;
use fuse_margin::MarginEnforcer;
use fuse_registry::{FetchFilters, FiltersProvider};
use fuse_sizing::{PositionSizer, SizeIntent, SizedOrder, SizingRejection, SizingRequest, SizingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Why an attempt never reached sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The guard denied the slot (duplicate, opposite side, or in-flight
    /// attempt elsewhere).
    DuplicateOpen,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOpen => write!(f, "duplicate open"),
        }
    }
}

/// Outcome of one open attempt. A skipped or rejected attempt is a no-op:
/// no order was sent and no state was left behind.
#[derive(Debug)]
pub enum OpenOutcome {
    /// Order placed and the guard ledger updated.
    Opened { ack: OrderAck, sized: SizedOrder },
    /// The guard denied the attempt.
    Skipped { reason: SkipReason },
    /// The sizer rejected the attempt (structured, user-facing).
    Rejected { rejection: SizingRejection },
    /// Margin/exchange/metadata failure.
    Failed { error: EngineError },
}

impl OpenOutcome {
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened { .. })
    }
}

/// Composition root for the execution-safety core.
pub struct TradeEngine<E, F: FetchFilters> {
    exchange: Arc<E>,
    guard: OpenGuard<E>,
    margin: MarginEnforcer<E>,
    sizer: PositionSizer,
    executor: OrderExecutor<E, F>,
    config: EngineConfig,
}

impl<E: ExchangeAccount, F: FetchFilters> TradeEngine<E, F> {
    pub fn new(config: EngineConfig, exchange: Arc<E>, filters: Arc<FiltersProvider<F>>) -> Self {
        let guard = OpenGuard::new(config.guard.clone(), Some(Arc::clone(&exchange)));
        let margin = MarginEnforcer::new(Arc::clone(&exchange));
        let sizer = PositionSizer::new(config.sizing.policy());
        let executor = OrderExecutor::new(Arc::clone(&exchange), filters);
        Self {
            exchange,
            guard,
            margin,
            sizer,
            executor,
            config,
        }
    }

    pub fn guard(&self) -> &OpenGuard<E> {
        &self.guard
    }

    pub fn executor(&self) -> &OrderExecutor<E, F> {
        &self.executor
    }

    /// Attempt to open `(symbol, interval, side)` with the given intent.
    pub async fn attempt_open(
        &self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        intent: SizeIntent,
    ) -> OpenOutcome {
        if !self.guard.can_open(symbol, interval, side).await {
            return OpenOutcome::Skipped {
                reason: SkipReason::DuplicateOpen,
            };
        }

        // From here the reservation is held; every path must conclude it.
        let outcome = self.open_reserved(symbol, side, intent).await;
        let success = outcome.is_opened();
        self.guard.end_open(symbol, interval, side, success);

        if let OpenOutcome::Opened { sized, ack } = &outcome {
            info!(%symbol, %interval, %side, qty = %sized.qty,
                  order_id = ack.order_id, "open confirmed");
        }
        outcome
    }

    async fn open_reserved(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        intent: SizeIntent,
    ) -> OpenOutcome {
        if let Err(e) = self
            .margin
            .ensure(
                symbol,
                self.config.margin.mode,
                Some(self.config.margin.leverage),
            )
            .await
        {
            return OpenOutcome::Failed { error: e.into() };
        }

        let price = match self.exchange.last_price(symbol).await {
            Ok(px) => px,
            Err(e) => return OpenOutcome::Failed { error: e.into() },
        };
        let filters = match self.executor_filters().get(symbol).await {
            Ok(f) => f,
            Err(e) => return OpenOutcome::Failed { error: e.into() },
        };
        let balance = match self.exchange.available_balance().await {
            Ok(b) => b,
            Err(e) => return OpenOutcome::Failed { error: e.into() },
        };

        let request = SizingRequest {
            symbol: symbol.clone(),
            side,
            intent,
            leverage: self.config.margin.leverage as i64,
            price,
            reduce_only: false,
        };
        let sized = match self.sizer.size(&request, &filters, balance) {
            SizingResult::Sized(sized) => sized,
            SizingResult::Rejected(rejection) => {
                return OpenOutcome::Rejected { rejection };
            }
        };

        let hedge_mode = match self.exchange.dual_side().await {
            Ok(dual) => dual,
            Err(e) => {
                warn!(%symbol, error = %e, "dual-side probe failed, assuming one-way");
                false
            }
        };

        match self
            .executor
            .place(symbol, side, &sized, hedge_mode, None, false)
            .await
        {
            Ok(ack) => OpenOutcome::Opened { ack, sized },
            Err(e) => OpenOutcome::Failed { error: e.into() },
        }
    }

    /// A leg was closed outside the engine (manual close, trade-update
    /// push); release the guard slot.
    pub fn notify_external_close(&self, symbol: &Symbol, interval: &Interval, side: OrderSide) {
        self.guard.mark_closed(symbol, interval, side);
    }

    /// Close every open position, reporting per symbol. Guard entries for
    /// closed legs drain via `notify_external_close` or ledger TTL.
    pub async fn close_all(&self) -> Result<Vec<SymbolCloseReport>, EngineError> {
        Ok(self.executor.close_all().await?)
    }

    /// Reseed the guard ledger from live exchange state. Never fails:
    /// a reconciliation pass is always safe to skip.
    pub async fn reconcile(&self) {
        match self.exchange.position_info(None).await {
            Ok(positions) => {
                self.guard
                    .reconcile_with_exchange(&positions, &self.config.job_keys());
            }
            Err(e) => {
                warn!(error = %e, "reconcile skipped: position fetch failed");
            }
        }
    }

    fn executor_filters(&self) -> &FiltersProvider<F> {
        self.executor.filters()
    }
}
