//! The exchange account trait consumed by the core.
//!
//! Components are generic over an implementation of this trait; production
//! wires in the real REST client, tests wire in scripted mocks.

use crate::error::ExchangeResult;
use crate::types::{BookTicker, LivePosition, OrderAck, OrderRequest};
use fuse_core::{MarginMode, Price, Symbol};
use rust_decimal::Decimal;

/// Account-level exchange operations the execution core depends on.
///
/// Every method maps to a single upstream endpoint; implementations must
/// translate wire errors into the `ExchangeError` taxonomy so callers can
/// branch on rejection classes without string matching.
#[allow(async_fn_in_trait)]
pub trait ExchangeAccount: Send + Sync {
    /// Live positions, optionally filtered to one symbol.
    /// Flat rows (positionAmt == 0) may be included; callers filter.
    async fn position_info(&self, symbol: Option<&Symbol>) -> ExchangeResult<Vec<LivePosition>>;

    /// Available margin balance in the quote asset.
    async fn available_balance(&self) -> ExchangeResult<Decimal>;

    /// Last traded price for a symbol.
    async fn last_price(&self, symbol: &Symbol) -> ExchangeResult<Price>;

    /// Current top-of-book quotes for a symbol.
    async fn book_ticker(&self, symbol: &Symbol) -> ExchangeResult<BookTicker>;

    /// Whether the account is in hedge (dual-side) mode.
    async fn dual_side(&self) -> ExchangeResult<bool>;

    /// Number of resting open orders for a symbol.
    async fn open_orders_count(&self, symbol: &Symbol) -> ExchangeResult<usize>;

    /// Cancel all resting orders for a symbol.
    async fn cancel_all_orders(&self, symbol: &Symbol) -> ExchangeResult<()>;

    /// Request a margin-mode change. A "no need to change" rejection is
    /// surfaced as-is; the enforcer treats it as success.
    async fn change_margin_mode(&self, symbol: &Symbol, mode: MarginMode) -> ExchangeResult<()>;

    /// Set leverage for a symbol.
    async fn change_leverage(&self, symbol: &Symbol, leverage: u32) -> ExchangeResult<()>;

    /// Submit an order.
    async fn place_order(&self, request: &OrderRequest) -> ExchangeResult<OrderAck>;
}
