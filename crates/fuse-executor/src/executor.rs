//! Order placement and the two-tier closer.

use fuse_core::{OrderSide, PositionSide, Price, Qty, Symbol, SymbolFilters};
use fuse_exchange::{ExchangeAccount, ExchangeResult, LivePosition, OrderAck, OrderRequest};
use fuse_registry::{FetchFilters, FiltersProvider};
use fuse_sizing::SizedOrder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Crossing factors for the marketable-limit fallback: sell a touch under
/// the bid, buy a touch over the ask, so the IOC fills against the book.
fn sell_cross_factor() -> Decimal {
    Decimal::new(999, 3) // 0.999
}

fn buy_cross_factor() -> Decimal {
    Decimal::new(1001, 3) // 1.001
}

/// Per-symbol outcome of a close operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCloseReport {
    pub symbol: Symbol,
    pub status: CloseStatus,
}

/// How a symbol's close went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CloseStatus {
    /// All legs closed; `orders` orders were placed.
    Closed { orders: u32 },
    /// Nothing to do.
    Skipped { reason: String },
    /// At least one leg could not be closed.
    Failed { errors: Vec<String> },
}

impl CloseStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Places orders and closes positions.
pub struct OrderExecutor<E, F: FetchFilters> {
    exchange: Arc<E>,
    filters: Arc<FiltersProvider<F>>,
}

impl<E: ExchangeAccount, F: FetchFilters> OrderExecutor<E, F> {
    pub fn new(exchange: Arc<E>, filters: Arc<FiltersProvider<F>>) -> Self {
        Self { exchange, filters }
    }

    pub fn filters(&self) -> &FiltersProvider<F> {
        &self.filters
    }

    /// Place a sized market order.
    ///
    /// In hedge mode every order must carry a leg tag; when the caller
    /// supplies none it is inferred from the side (BUY opens LONG, SELL
    /// opens SHORT). Skipping the inference opens positions on the wrong
    /// leg, silently.
    pub async fn place(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        sized: &SizedOrder,
        hedge_mode: bool,
        position_side: Option<PositionSide>,
        reduce_only: bool,
    ) -> ExchangeResult<OrderAck> {
        let mut request = OrderRequest::market(symbol.clone(), side, sized.qty);
        if reduce_only {
            request = request.reduce_only();
        }
        if hedge_mode {
            let leg = position_side.unwrap_or_else(|| side.entry_leg());
            request = request.with_position_side(leg);
        }

        debug!(%symbol, %side, qty = %sized.qty, mode = ?sized.mode, "placing order");
        let ack = self.exchange.place_order(&request).await?;
        info!(%symbol, %side, qty = %sized.qty, order_id = ack.order_id, "order placed");
        Ok(ack)
    }

    /// Close every live leg for one symbol.
    ///
    /// Each leg gets a reduce-only market order sized to exactly offset it,
    /// rounded *up* to the step so the close is always full; a fractional
    /// over-close is rejected gracefully by reduce-only semantics. When the
    /// exchange rejects the reduce-only market order, fall back to a
    /// marketable limit IOC priced through the spread.
    pub async fn close_symbol(&self, symbol: &Symbol) -> SymbolCloseReport {
        let positions = match self.exchange.position_info(Some(symbol)).await {
            Ok(positions) => positions,
            Err(e) => {
                return SymbolCloseReport {
                    symbol: symbol.clone(),
                    status: CloseStatus::Failed {
                        errors: vec![format!("position fetch failed: {e}")],
                    },
                }
            }
        };

        let legs: Vec<&LivePosition> = positions
            .iter()
            .filter(|p| &p.symbol == symbol && !p.is_flat())
            .collect();
        if legs.is_empty() {
            return SymbolCloseReport {
                symbol: symbol.clone(),
                status: CloseStatus::Skipped {
                    reason: "already flat".to_string(),
                },
            };
        }

        // Closing must not fail because metadata is briefly unavailable;
        // zeroed filters just skip the snapping and lifting.
        let filters = match self.filters.get(symbol).await {
            Ok(filters) => filters,
            Err(e) => {
                warn!(%symbol, error = %e, "filters unavailable for close, proceeding unsnapped");
                SymbolFilters {
                    step_size: Qty::ZERO,
                    min_qty: Qty::ZERO,
                    min_notional: Decimal::ZERO,
                    tick_size: Price::ZERO,
                }
            }
        };

        let hedge_mode = match self.exchange.dual_side().await {
            Ok(dual) => dual,
            Err(e) => {
                warn!(%symbol, error = %e, "dual-side probe failed, assuming one-way");
                false
            }
        };

        let mut closed = 0u32;
        let mut errors = Vec::new();
        for leg in legs {
            match self.close_leg(symbol, leg, &filters, hedge_mode).await {
                Ok(()) => closed += 1,
                Err(detail) => errors.push(detail),
            }
        }

        let status = if errors.is_empty() {
            CloseStatus::Closed { orders: closed }
        } else {
            CloseStatus::Failed { errors }
        };
        SymbolCloseReport {
            symbol: symbol.clone(),
            status,
        }
    }

    async fn close_leg(
        &self,
        symbol: &Symbol,
        leg: &LivePosition,
        filters: &SymbolFilters,
        hedge_mode: bool,
    ) -> Result<(), String> {
        // Offset the signed amount: long legs sell, short legs buy.
        let close_side = match leg.side() {
            Some(open_side) => open_side.opposite(),
            None => return Ok(()),
        };

        let mut qty = leg.abs_qty().ceil_to_step(filters.step_size);
        if filters.min_qty.is_positive() && qty < filters.min_qty {
            qty = filters.min_qty.ceil_to_step(filters.step_size);
        }
        if filters.min_notional > Decimal::ZERO && leg.mark_price.is_positive() {
            let need = Qty::new(filters.min_notional / leg.mark_price.inner())
                .ceil_to_step(filters.step_size);
            if qty < need {
                qty = need;
            }
        }
        if !qty.is_positive() {
            return Ok(());
        }

        let mut request = OrderRequest::market(symbol.clone(), close_side, qty).reduce_only();
        if hedge_mode {
            request = request.with_position_side(close_side.reducing_leg());
        }

        match self.exchange.place_order(&request).await {
            Ok(ack) => {
                info!(%symbol, side = %close_side, %qty, order_id = ack.order_id, "leg closed");
                Ok(())
            }
            Err(e) if e.is_reduce_only_rejected() => {
                debug!(%symbol, error = %e, "reduce-only market rejected, trying limit IOC");
                self.close_leg_limit_ioc(symbol, close_side, qty, filters, hedge_mode)
                    .await
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Second tier: a reduce-only limit IOC priced to cross the spread.
    async fn close_leg_limit_ioc(
        &self,
        symbol: &Symbol,
        close_side: OrderSide,
        qty: Qty,
        filters: &SymbolFilters,
        hedge_mode: bool,
    ) -> Result<(), String> {
        let raw_price = match self.exchange.book_ticker(symbol).await {
            Ok(book) => match close_side {
                OrderSide::Sell => Price::new(book.bid.inner() * sell_cross_factor()),
                OrderSide::Buy => Price::new(book.ask.inner() * buy_cross_factor()),
            },
            Err(e) => {
                warn!(%symbol, error = %e, "book ticker unavailable, using last price");
                match self.exchange.last_price(symbol).await {
                    Ok(px) => px,
                    Err(e) => return Err(format!("no price for limit fallback: {e}")),
                }
            }
        };
        if !raw_price.is_positive() {
            return Err("no usable price for limit fallback".to_string());
        }

        let price = filters.snap_price_for_order(raw_price, close_side == OrderSide::Buy);
        let mut request =
            OrderRequest::limit_ioc(symbol.clone(), close_side, qty, price).reduce_only();
        if hedge_mode {
            request = request.with_position_side(close_side.reducing_leg());
        }

        match self.exchange.place_order(&request).await {
            Ok(ack) => {
                info!(%symbol, side = %close_side, %qty, %price, order_id = ack.order_id,
                      "leg closed via limit IOC fallback");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Close everything: cancel resting orders for every symbol with
    /// exposure, then close symbol by symbol. One symbol's failure never
    /// stops the others.
    pub async fn close_all(&self) -> ExchangeResult<Vec<SymbolCloseReport>> {
        let positions = self.exchange.position_info(None).await?;

        let symbols: BTreeSet<Symbol> = positions
            .iter()
            .filter(|p| !p.is_flat())
            .map(|p| p.symbol.clone())
            .collect();

        let mut reports = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            // Closing the book must not race with resting orders.
            if let Err(e) = self.exchange.cancel_all_orders(&symbol).await {
                warn!(%symbol, error = %e, "cancel-all failed before close");
            }
            reports.push(self.close_symbol(&symbol).await);
        }
        Ok(reports)
    }
}
