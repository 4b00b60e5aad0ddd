//! The sizing algorithm.
//!
//! All arithmetic is exact decimal; step and notional comparisons must
//! never flip on binary-float drift.

use crate::request::{
    RejectReason, SizeIntent, SizedOrder, SizingDiagnostics, SizingMode, SizingRejection,
    SizingRequest, SizingResult,
};
use fuse_core::{Qty, SymbolFilters};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Small affordability cushion for fees/rounding when checking whether the
/// wallet covers the minimum legal order.
const AFFORD_CUSHION_NUM: i64 = 101;
const AFFORD_CUSHION_DEN: i64 = 100;

/// Sizing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum SizingPolicy {
    /// Reject anything below the exchange minimum; never inflate a position
    /// beyond what the user asked for. Used for fresh percent-sized opens.
    Strict,
    /// Lift a below-minimum size to the exchange minimum when the wallet
    /// can afford it and the lift stays under the cap.
    Flexible {
        /// Maximum percent of balance the bump may reach.
        max_auto_bump_percent: Decimal,
    },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self::Strict
    }
}

impl SizingPolicy {
    /// Flexible policy with the default 5% bump cap.
    pub fn flexible() -> Self {
        Self::Flexible {
            max_auto_bump_percent: Decimal::from(5),
        }
    }
}

/// Converts sizing intents into filter-compliant quantities.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSizer {
    policy: SizingPolicy,
}

impl PositionSizer {
    pub fn new(policy: SizingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SizingPolicy {
        self.policy
    }

    /// Size one request against the symbol's filters and the available
    /// balance (quote asset).
    pub fn size(
        &self,
        request: &SizingRequest,
        filters: &SymbolFilters,
        available_balance: Decimal,
    ) -> SizingResult {
        let price = request.price;
        if !price.is_positive() {
            return SizingResult::Rejected(SizingRejection::bare(RejectReason::NoPriceAvailable));
        }

        let leverage = request.effective_leverage();

        let (snapped, mut mode, margin_budget) = match request.intent {
            SizeIntent::Quantity(qty) => {
                if !qty.is_positive() {
                    return SizingResult::Rejected(SizingRejection::bare(RejectReason::InvalidSize));
                }
                (qty.floor_to_step(filters.step_size), SizingMode::Quantity, None)
            }
            SizeIntent::PercentOfBalance(percent) => {
                if percent <= Decimal::ZERO {
                    return SizingResult::Rejected(SizingRejection::bare(RejectReason::InvalidSize));
                }
                let budget = available_balance * percent / Decimal::ONE_HUNDRED;
                let target_notional = budget * leverage;
                let raw = Qty::new(target_notional / price.inner());
                (raw.floor_to_step(filters.step_size), SizingMode::Percent, Some(budget))
            }
        };

        let need_qty = filters.min_legal_qty(price);
        let need_notional = need_qty.notional(price);

        let mut qty = snapped;
        if qty < need_qty {
            let denom = available_balance * leverage;
            let required_percent = if denom > Decimal::ZERO {
                Some(need_notional / denom * Decimal::ONE_HUNDRED)
            } else {
                None
            };

            let bumped = match self.policy {
                SizingPolicy::Strict => false,
                SizingPolicy::Flexible { max_auto_bump_percent } => self.can_bump(
                    request,
                    leverage,
                    need_notional,
                    available_balance,
                    required_percent,
                    max_auto_bump_percent,
                ),
            };

            if !bumped {
                debug!(
                    symbol = %request.symbol,
                    %snapped,
                    %need_qty,
                    ?required_percent,
                    "sizing rejected below exchange minimum"
                );
                return SizingResult::Rejected(SizingRejection {
                    reason: RejectReason::BelowExchangeMinimum,
                    required_percent,
                    diagnostics: Some(SizingDiagnostics {
                        price,
                        step_size: filters.step_size,
                        min_qty: filters.min_qty,
                        min_notional: filters.min_notional,
                        need_qty,
                        need_notional,
                        leverage,
                        available_balance,
                        margin_budget,
                    }),
                });
            }

            qty = need_qty;
            mode = match mode {
                SizingMode::Percent => SizingMode::PercentBumpedToMinimum,
                _ => SizingMode::FallbackMinimum,
            };
        }

        if !qty.is_positive() {
            // Filters with zero minimums and a size that floored to nothing.
            return SizingResult::Rejected(SizingRejection::bare(RejectReason::InvalidSize));
        }

        SizingResult::Sized(SizedOrder {
            qty,
            notional: qty.notional(price),
            mode,
        })
    }

    /// Flexible-policy bump gate: the wallet must cover the minimum legal
    /// order's margin (with a small cushion) and the lift must stay under
    /// the configured percent cap. Reduce-only requests are never lifted —
    /// over-closing is the closer's business, not the sizer's.
    fn can_bump(
        &self,
        request: &SizingRequest,
        leverage: Decimal,
        need_notional: Decimal,
        available_balance: Decimal,
        required_percent: Option<Decimal>,
        max_auto_bump_percent: Decimal,
    ) -> bool {
        if request.reduce_only {
            return false;
        }
        let required_percent = match required_percent {
            Some(p) => p,
            None => return false,
        };
        let required_margin = need_notional / leverage;
        let cushion = Decimal::from(AFFORD_CUSHION_NUM) / Decimal::from(AFFORD_CUSHION_DEN);
        required_margin <= available_balance * cushion && required_percent <= max_auto_bump_percent
    }
}
