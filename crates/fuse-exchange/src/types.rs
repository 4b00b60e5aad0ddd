//! Typed exchange payloads.
//!
//! Raw wire structs carry the exchange's field names and string-encoded
//! decimals; parsed structs are what the core consumes. Validation happens
//! here, once, at the boundary.

use crate::error::{ExchangeError, ExchangeResult};
use fuse_core::{MarginMode, OrderSide, OrderType, PositionSide, Price, Qty, Symbol, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw position row from the positions endpoint.
///
/// Only the fields the core consumes; everything else is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPositionInfo {
    pub symbol: String,
    /// Signed quantity: positive = long, negative = short.
    #[serde(rename = "positionAmt")]
    pub position_amt: String,
    #[serde(rename = "entryPrice", default)]
    pub entry_price: Option<String>,
    #[serde(rename = "markPrice", default)]
    pub mark_price: Option<String>,
    #[serde(rename = "marginType", default)]
    pub margin_type: Option<String>,
    #[serde(default)]
    pub leverage: Option<String>,
}

impl RawPositionInfo {
    /// Parse into a validated `LivePosition`.
    pub fn parse(&self) -> ExchangeResult<LivePosition> {
        let amt: Decimal = self
            .position_amt
            .parse()
            .map_err(|e| ExchangeError::InvalidResponse(format!("positionAmt: {e}")))?;

        let parse_px = |s: &Option<String>| -> Price {
            s.as_deref()
                .and_then(|v| v.parse().ok())
                .map(Price::new)
                .unwrap_or(Price::ZERO)
        };

        Ok(LivePosition {
            symbol: Symbol::new(&self.symbol),
            position_amt: amt,
            entry_price: parse_px(&self.entry_price),
            mark_price: parse_px(&self.mark_price),
            margin_mode: self.margin_type.as_deref().and_then(MarginMode::from_wire),
            leverage: self
                .leverage
                .as_deref()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(0),
        })
    }
}

/// One live position leg as the core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePosition {
    pub symbol: Symbol,
    /// Signed quantity; sign encodes the side.
    pub position_amt: Decimal,
    pub entry_price: Price,
    pub mark_price: Price,
    pub margin_mode: Option<MarginMode>,
    pub leverage: u32,
}

impl LivePosition {
    /// Side of this leg, `None` when flat.
    pub fn side(&self) -> Option<OrderSide> {
        OrderSide::from_signed_amount(self.position_amt)
    }

    /// Unsigned quantity of this leg.
    pub fn abs_qty(&self) -> Qty {
        Qty::new(self.position_amt.abs())
    }

    pub fn is_flat(&self) -> bool {
        self.position_amt.is_zero()
    }
}

/// Top-of-book quotes, used to price the closer's marketable limit fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTicker {
    pub bid: Price,
    pub ask: Price,
}

/// Order submission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Qty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_side: Option<PositionSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
}

impl OrderRequest {
    /// Market order.
    pub fn market(symbol: Symbol, side: OrderSide, quantity: Qty) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            reduce_only: None,
            position_side: None,
            price: None,
            time_in_force: None,
        }
    }

    /// Limit order with immediate-or-cancel semantics (a marketable limit
    /// when priced through the spread).
    pub fn limit_ioc(symbol: Symbol, side: OrderSide, quantity: Qty, price: Price) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            reduce_only: None,
            position_side: None,
            price: Some(price),
            time_in_force: Some(TimeInForce::ImmediateOrCancel),
        }
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = Some(true);
        self
    }

    pub fn with_position_side(mut self, leg: PositionSide) -> Self {
        self.position_side = Some(leg);
        self
    }

    pub fn is_reduce_only(&self) -> bool {
        self.reduce_only == Some(true)
    }
}

/// Order confirmation from the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: Symbol,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_raw_position_parse() {
        let raw: RawPositionInfo = serde_json::from_str(
            r#"{
                "symbol": "btcusdt",
                "positionAmt": "-0.250",
                "entryPrice": "61000.5",
                "markPrice": "60990.0",
                "marginType": "isolated",
                "leverage": "10"
            }"#,
        )
        .unwrap();

        let pos = raw.parse().unwrap();
        assert_eq!(pos.symbol, Symbol::new("BTCUSDT"));
        assert_eq!(pos.side(), Some(OrderSide::Sell));
        assert_eq!(pos.abs_qty().inner(), dec!(0.250));
        assert_eq!(pos.margin_mode, Some(MarginMode::Isolated));
        assert_eq!(pos.leverage, 10);
    }

    #[test]
    fn test_raw_position_parse_rejects_garbage_amt() {
        let raw = RawPositionInfo {
            symbol: "BTCUSDT".to_string(),
            position_amt: "not-a-number".to_string(),
            entry_price: None,
            mark_price: None,
            margin_type: None,
            leverage: None,
        };
        assert!(raw.parse().is_err());
    }

    #[test]
    fn test_flat_position_has_no_side() {
        let raw = RawPositionInfo {
            symbol: "BTCUSDT".to_string(),
            position_amt: "0".to_string(),
            entry_price: None,
            mark_price: None,
            margin_type: None,
            leverage: None,
        };
        let pos = raw.parse().unwrap();
        assert!(pos.is_flat());
        assert_eq!(pos.side(), None);
    }

    #[test]
    fn test_order_request_serialization_omits_unset() {
        let req = OrderRequest::market(Symbol::new("ETHUSDT"), OrderSide::Buy, Qty::new(dec!(0.5)));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "MARKET");
        assert_eq!(json["side"], "BUY");
        assert!(json.get("price").is_none());
        assert!(json.get("reduceOnly").is_none());
        assert!(json.get("timeInForce").is_none());
    }

    #[test]
    fn test_limit_ioc_carries_price_and_tif() {
        let req = OrderRequest::limit_ioc(
            Symbol::new("ETHUSDT"),
            OrderSide::Sell,
            Qty::new(dec!(0.5)),
            Price::new(dec!(2500.25)),
        )
        .reduce_only();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["timeInForce"], "IOC");
        assert_eq!(json["reduceOnly"], true);
        assert_eq!(json["price"], "2500.25");
    }
}
