//! Per-symbol trading constraints from exchange metadata.

use crate::{Price, Qty};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading constraints for one symbol.
///
/// Sourced from the exchange's LOT_SIZE, PRICE_FILTER and NOTIONAL filters.
/// Immutable once fetched within a process lifetime; refreshed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// Quantity granularity (LOT_SIZE.stepSize).
    pub step_size: Qty,
    /// Minimum order quantity (LOT_SIZE.minQty).
    pub min_qty: Qty,
    /// Minimum order notional, price × qty (NOTIONAL.notional).
    pub min_notional: Decimal,
    /// Price granularity (PRICE_FILTER.tickSize).
    pub tick_size: Price,
}

impl SymbolFilters {
    /// The smallest quantity the exchange will accept at `price`:
    /// `max(minQty, ceil_to_step(minNotional / price))`.
    ///
    /// Returns `Qty::ZERO` when price is not positive (caller rejects
    /// upstream with `NoPriceAvailable`).
    pub fn min_legal_qty(&self, price: Price) -> Qty {
        if !price.is_positive() {
            return Qty::ZERO;
        }
        let by_notional = Qty::new(self.min_notional / price.inner()).ceil_to_step(self.step_size);
        if by_notional > self.min_qty {
            by_notional
        } else {
            self.min_qty
        }
    }

    /// Whether a quantity passes every filter at the given price.
    pub fn accepts(&self, qty: Qty, price: Price) -> bool {
        qty.is_positive()
            && qty.is_step_aligned(self.step_size)
            && qty >= self.min_qty
            && qty.notional(price) >= self.min_notional
    }

    /// Snap a limit price to tick in the fill-favoring direction:
    /// up for buys (pay more), down for sells (receive less).
    pub fn snap_price_for_order(&self, price: Price, is_buy: bool) -> Price {
        if is_buy {
            price.ceil_to_tick(self.tick_size)
        } else {
            price.floor_to_tick(self.tick_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn filters() -> SymbolFilters {
        SymbolFilters {
            step_size: Qty::new(dec!(0.001)),
            min_qty: Qty::new(dec!(0.001)),
            min_notional: dec!(5),
            tick_size: Price::new(dec!(0.01)),
        }
    }

    #[test]
    fn test_min_legal_qty_driven_by_notional() {
        // 5 / 100 = 0.05, already step aligned
        let q = filters().min_legal_qty(Price::new(dec!(100)));
        assert_eq!(q.inner(), dec!(0.05));
    }

    #[test]
    fn test_min_legal_qty_ceils_to_step() {
        // 5 / 30000 = 0.000166.. -> ceil to 0.001
        let q = filters().min_legal_qty(Price::new(dec!(30000)));
        assert_eq!(q.inner(), dec!(0.001));
    }

    #[test]
    fn test_min_legal_qty_driven_by_min_qty() {
        let mut f = filters();
        f.min_qty = Qty::new(dec!(1));
        // notional floor would need only 0.05, but minQty dominates
        let q = f.min_legal_qty(Price::new(dec!(100)));
        assert_eq!(q.inner(), dec!(1));
    }

    #[test]
    fn test_accepts() {
        let f = filters();
        let px = Price::new(dec!(100));
        assert!(f.accepts(Qty::new(dec!(0.05)), px));
        // below notional floor
        assert!(!f.accepts(Qty::new(dec!(0.04)), px));
        // off-grid
        assert!(!f.accepts(Qty::new(dec!(0.0505)), px));
        assert!(!f.accepts(Qty::ZERO, px));
    }

    #[test]
    fn test_snap_price_direction() {
        let f = filters();
        let px = Price::new(dec!(100.011));
        assert_eq!(f.snap_price_for_order(px, true).inner(), dec!(100.02));
        assert_eq!(f.snap_price_for_order(px, false).inner(), dec!(100.01));
    }
}
