//! Pure guard state: ledger, active counts, pending attempts.
//!
//! All methods take an explicit `now_ms` so TTL behavior is testable
//! without sleeping. TTL expiry is evaluated lazily at the top of every
//! state-reading call; there is no background timer mutating these tables.

use crate::config::GuardConfig;
use fuse_core::{Interval, JobKey, OrderSide, Symbol};
use std::collections::HashMap;
use std::fmt;

/// Why an open attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The opposite side is active on this exact (symbol, interval).
    OppositeSideActive,
    /// A ledger entry already exists for this exact key.
    AlreadyOpen,
    /// An attempt for this (symbol, side) is already in flight.
    PendingSameSide,
    /// An attempt for the opposite side of this symbol is in flight.
    PendingOppositeSide,
    /// The ledger holds the opposite side on this (symbol, interval).
    OppositeSideLedger,
    /// Strict mode: another interval already holds this symbol+side.
    StrictSymbolSide,
    /// The exchange already reports a live position on this side.
    LiveSameSide,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OppositeSideActive => write!(f, "opposite side active"),
            Self::AlreadyOpen => write!(f, "already open"),
            Self::PendingSameSide => write!(f, "attempt already pending"),
            Self::PendingOppositeSide => write!(f, "opposite-side attempt pending"),
            Self::OppositeSideLedger => write!(f, "opposite side in ledger"),
            Self::StrictSymbolSide => write!(f, "symbol+side held by another interval"),
            Self::LiveSameSide => write!(f, "live position on this side"),
        }
    }
}

/// An in-flight, not-yet-confirmed open reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttempt {
    pub reserved_at_ms: u64,
    pub expires_at_ms: u64,
    pub interval: Interval,
}

/// Per-(symbol, interval) open counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SideCounts {
    buy: u32,
    sell: u32,
}

impl SideCounts {
    fn get(&self, side: OrderSide) -> u32 {
        match side {
            OrderSide::Buy => self.buy,
            OrderSide::Sell => self.sell,
        }
    }

    fn bump(&mut self, side: OrderSide) {
        match side {
            OrderSide::Buy => self.buy += 1,
            OrderSide::Sell => self.sell += 1,
        }
    }

    fn drop_one(&mut self, side: OrderSide) {
        match side {
            OrderSide::Buy => self.buy = self.buy.saturating_sub(1),
            OrderSide::Sell => self.sell = self.sell.saturating_sub(1),
        }
    }

    fn is_empty(&self) -> bool {
        self.buy == 0 && self.sell == 0
    }
}

/// The guard's tables. Owned exclusively by `OpenGuard`; nothing else
/// mutates them.
#[derive(Debug)]
pub struct GuardState {
    config: GuardConfig,
    /// Confirmed opens: (symbol, interval, side) -> last-open timestamp.
    ledger: HashMap<(Symbol, Interval, OrderSide), u64>,
    /// Open counters per loop, for opposite-side exclusion.
    active: HashMap<(Symbol, Interval), SideCounts>,
    /// In-flight attempts: at most one per (symbol, side).
    pending: HashMap<(Symbol, OrderSide), PendingAttempt>,
}

impl GuardState {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            ledger: HashMap::new(),
            active: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Drop expired ledger entries (and their active counts) and expired
    /// pending attempts. Called at the top of every state-reading method.
    pub fn expire(&mut self, now_ms: u64) {
        let ttl_ms = self.config.ledger_ttl_ms();
        if ttl_ms > 0 {
            let expired: Vec<_> = self
                .ledger
                .iter()
                .filter(|(_, &stamped)| now_ms.saturating_sub(stamped) > ttl_ms)
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                self.ledger.remove(&key);
                let (symbol, interval, side) = key;
                self.drop_active(&symbol, &interval, side, 1);
            }
        }

        self.pending.retain(|_, attempt| attempt.expires_at_ms > now_ms);
    }

    /// All local deny checks for an open attempt, in order. Does not
    /// mutate anything beyond lazy expiry.
    pub fn check_open(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        now_ms: u64,
    ) -> Result<(), DenyReason> {
        self.expire(now_ms);

        let opposite = side.opposite();
        if let Some(counts) = self.active.get(&(symbol.clone(), interval.clone())) {
            if counts.get(opposite) > 0 {
                return Err(DenyReason::OppositeSideActive);
            }
        }

        if self
            .ledger
            .contains_key(&(symbol.clone(), interval.clone(), side))
        {
            return Err(DenyReason::AlreadyOpen);
        }

        if self.pending.contains_key(&(symbol.clone(), side)) {
            return Err(DenyReason::PendingSameSide);
        }
        if self.pending.contains_key(&(symbol.clone(), opposite)) {
            return Err(DenyReason::PendingOppositeSide);
        }

        for (s, i, ss) in self.ledger.keys() {
            if s != symbol {
                continue;
            }
            if i == interval && *ss == opposite {
                return Err(DenyReason::OppositeSideLedger);
            }
            if self.config.strict_symbol_side && *ss == side && i != interval {
                return Err(DenyReason::StrictSymbolSide);
            }
        }

        Ok(())
    }

    /// Run the full deny checks and, on success, reserve the pending slot
    /// for `(symbol, side)` with the configured pending TTL.
    pub fn try_reserve(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        now_ms: u64,
    ) -> Result<(), DenyReason> {
        self.check_open(symbol, interval, side, now_ms)?;
        self.insert_pending(symbol, interval, side, self.config.pending_ttl_ms(), now_ms);
        Ok(())
    }

    /// Low-level coalescing primitive: reserve `(symbol, side)` for
    /// `ttl_ms`, with none of the ledger/active checks. Returns false if a
    /// live reservation already exists.
    pub fn begin_open(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        ttl_ms: u64,
        now_ms: u64,
    ) -> bool {
        self.expire(now_ms);
        if self.pending.contains_key(&(symbol.clone(), side)) {
            return false;
        }
        self.insert_pending(symbol, interval, side, ttl_ms, now_ms);
        true
    }

    /// Conclude an open attempt: release the reservation and, on success,
    /// promote it to a ledger entry with an active-count increment.
    pub fn end_open(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        success: bool,
        now_ms: u64,
    ) {
        self.pending.remove(&(symbol.clone(), side));
        if success {
            self.mark_opened(symbol, interval, side, now_ms);
        }
    }

    /// Record a confirmed open (out-of-band or via `end_open`).
    pub fn mark_opened(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        now_ms: u64,
    ) {
        let prior = self
            .ledger
            .insert((symbol.clone(), interval.clone(), side), now_ms);
        if prior.is_none() {
            self.active
                .entry((symbol.clone(), interval.clone()))
                .or_default()
                .bump(side);
        }
    }

    /// Record a confirmed close (out-of-band notification).
    pub fn mark_closed(&mut self, symbol: &Symbol, interval: &Interval, side: OrderSide) {
        let removed = self
            .ledger
            .remove(&(symbol.clone(), interval.clone(), side));
        if removed.is_some() {
            self.drop_active(symbol, interval, side, 1);
        }
    }

    /// Backfill the active table from a live-exchange observation, so the
    /// next check doesn't need to ask the exchange again.
    pub fn record_live(&mut self, symbol: &Symbol, interval: &Interval, side: OrderSide) {
        self.active
            .entry((symbol.clone(), interval.clone()))
            .or_default()
            .bump(side);
    }

    /// Reseed the ledger from ground truth: for every live `(symbol, side)`
    /// the exchange reports, re-stamp entries for every configured job
    /// trading that symbol.
    pub fn reconcile(&mut self, live: &[(Symbol, OrderSide)], jobs: &[JobKey], now_ms: u64) {
        self.expire(now_ms);
        for (symbol, side) in live {
            for job in jobs.iter().filter(|j| &j.symbol == symbol) {
                self.ledger
                    .insert((symbol.clone(), job.interval.clone(), *side), now_ms);
            }
        }
    }

    /// Clear every table.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.active.clear();
        self.pending.clear();
    }

    // ----- introspection (used by the wrapper and tests)

    pub fn pending_attempt(&self, symbol: &Symbol, side: OrderSide) -> Option<&PendingAttempt> {
        self.pending.get(&(symbol.clone(), side))
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    pub fn active_count(&self, symbol: &Symbol, interval: &Interval, side: OrderSide) -> u32 {
        self.active
            .get(&(symbol.clone(), interval.clone()))
            .map(|c| c.get(side))
            .unwrap_or(0)
    }

    fn insert_pending(
        &mut self,
        symbol: &Symbol,
        interval: &Interval,
        side: OrderSide,
        ttl_ms: u64,
        now_ms: u64,
    ) {
        self.pending.insert(
            (symbol.clone(), side),
            PendingAttempt {
                reserved_at_ms: now_ms,
                expires_at_ms: now_ms.saturating_add(ttl_ms),
                interval: interval.clone(),
            },
        );
    }

    fn drop_active(&mut self, symbol: &Symbol, interval: &Interval, side: OrderSide, n: u32) {
        if let Some(counts) = self.active.get_mut(&(symbol.clone(), interval.clone())) {
            for _ in 0..n {
                counts.drop_one(side);
            }
            if counts.is_empty() {
                self.active.remove(&(symbol.clone(), interval.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GuardState {
        GuardState::new(GuardConfig::default())
    }

    fn btc() -> Symbol {
        Symbol::new("BTCUSDT")
    }

    fn iv(s: &str) -> Interval {
        Interval::new(s)
    }

    #[test]
    fn test_duplicate_signal_coalesces() {
        let mut s = state();
        // First reserves, second is denied immediately
        assert!(s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_000).is_ok());
        assert_eq!(
            s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_001),
            Err(DenyReason::PendingSameSide)
        );
    }

    #[test]
    fn test_pending_blocks_opposite_side() {
        let mut s = state();
        assert!(s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_000).is_ok());
        assert_eq!(
            s.try_reserve(&btc(), &iv("5m"), OrderSide::Sell, 1_001),
            Err(DenyReason::PendingOppositeSide)
        );
        // Another interval, same side: also blocked by the (symbol, side) key
        assert_eq!(
            s.try_reserve(&btc(), &iv("1h"), OrderSide::Buy, 1_002),
            Err(DenyReason::PendingSameSide)
        );
    }

    #[test]
    fn test_end_open_success_promotes_to_ledger() {
        let mut s = state();
        s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_000).unwrap();
        s.end_open(&btc(), &iv("5m"), OrderSide::Buy, true, 2_000);

        assert!(s.pending_attempt(&btc(), OrderSide::Buy).is_none());
        assert_eq!(s.ledger_len(), 1);
        assert_eq!(s.active_count(&btc(), &iv("5m"), OrderSide::Buy), 1);

        // Exact duplicate now denied by the ledger
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Buy, 2_001),
            Err(DenyReason::AlreadyOpen)
        );
        // Opposite side on the same loop denied by the active table
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Sell, 2_002),
            Err(DenyReason::OppositeSideActive)
        );
    }

    #[test]
    fn test_end_open_failure_releases_slot() {
        let mut s = state();
        s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_000).unwrap();
        s.end_open(&btc(), &iv("5m"), OrderSide::Buy, false, 2_000);

        assert_eq!(s.ledger_len(), 0);
        assert!(s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 2_001).is_ok());
    }

    #[test]
    fn test_cross_interval_pyramiding_allowed_by_default() {
        let mut s = state();
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);
        // Same side on another interval is fine when strict mode is off
        assert!(s.check_open(&btc(), &iv("1h"), OrderSide::Buy, 1_001).is_ok());
    }

    #[test]
    fn test_strict_symbol_side_blocks_other_intervals() {
        let mut s = GuardState::new(GuardConfig {
            strict_symbol_side: true,
            ..GuardConfig::default()
        });
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);

        assert_eq!(
            s.check_open(&btc(), &iv("1h"), OrderSide::Buy, 1_001),
            Err(DenyReason::StrictSymbolSide)
        );
        // Opposite side on another interval is not the strict check's business
        assert!(s.check_open(&btc(), &iv("1h"), OrderSide::Sell, 1_002).is_ok());
    }

    #[test]
    fn test_ledger_ttl_expiry_boundaries() {
        let ttl_secs = 180u64;
        let mut s = GuardState::new(GuardConfig {
            ledger_ttl_secs: ttl_secs,
            ..GuardConfig::default()
        });
        let opened_at = 10_000u64;
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, opened_at);

        let ttl_ms = ttl_secs * 1000;
        // Present just before the TTL elapses
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Buy, opened_at + ttl_ms - 1),
            Err(DenyReason::AlreadyOpen)
        );
        // Absent just after
        assert!(s
            .check_open(&btc(), &iv("5m"), OrderSide::Buy, opened_at + ttl_ms + 1)
            .is_ok());
        // Expiry also released the active count
        assert_eq!(s.active_count(&btc(), &iv("5m"), OrderSide::Buy), 0);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let mut s = GuardState::new(GuardConfig {
            ledger_ttl_secs: 0,
            ..GuardConfig::default()
        });
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 0);
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Buy, u64::MAX / 2),
            Err(DenyReason::AlreadyOpen)
        );
    }

    #[test]
    fn test_pending_ttl_recovers_stuck_reservation() {
        let mut s = state();
        let pending_ttl_ms = s.config().pending_ttl_ms();
        s.try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_000).unwrap();

        // Still reserved one tick before expiry
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Buy, 1_000 + pending_ttl_ms - 1),
            Err(DenyReason::PendingSameSide)
        );
        // Recovered after the TTL: the attempt never resolved (crash/hang)
        assert!(s
            .try_reserve(&btc(), &iv("5m"), OrderSide::Buy, 1_001 + pending_ttl_ms)
            .is_ok());
    }

    #[test]
    fn test_begin_open_is_pure_coalescer() {
        let mut s = state();
        // Ledger entry does not stop begin_open; only the pending key does
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);
        assert!(s.begin_open(&btc(), &iv("5m"), OrderSide::Buy, 45_000, 1_001));
        assert!(!s.begin_open(&btc(), &iv("1h"), OrderSide::Buy, 45_000, 1_002));
        // Custom TTL honored
        assert!(!s.begin_open(&btc(), &iv("5m"), OrderSide::Buy, 45_000, 46_000));
        assert!(s.begin_open(&btc(), &iv("5m"), OrderSide::Buy, 45_000, 46_002));
    }

    #[test]
    fn test_mark_closed_clears_conflicts() {
        let mut s = state();
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);
        s.mark_closed(&btc(), &iv("5m"), OrderSide::Buy);

        assert_eq!(s.ledger_len(), 0);
        assert_eq!(s.active_count(&btc(), &iv("5m"), OrderSide::Buy), 0);
        assert!(s.check_open(&btc(), &iv("5m"), OrderSide::Sell, 1_001).is_ok());
    }

    #[test]
    fn test_mark_closed_unknown_key_is_noop() {
        let mut s = state();
        s.mark_closed(&btc(), &iv("5m"), OrderSide::Buy);
        assert_eq!(s.ledger_len(), 0);
    }

    #[test]
    fn test_reconcile_reseeds_configured_jobs() {
        let mut s = state();
        let jobs = vec![JobKey::new("BTCUSDT", "1h"), JobKey::new("ETHUSDT", "1h")];
        let live = vec![(btc(), OrderSide::Buy)];

        s.reconcile(&live, &jobs, 5_000);

        // Opposite side now conflicts via the ledger scan
        assert_eq!(
            s.check_open(&btc(), &iv("1h"), OrderSide::Sell, 5_001),
            Err(DenyReason::OppositeSideLedger)
        );
        // Unrelated symbol unaffected
        assert!(s
            .check_open(&Symbol::new("ETHUSDT"), &iv("1h"), OrderSide::Buy, 5_001)
            .is_ok());
    }

    #[test]
    fn test_reconcile_restamps_existing_entries() {
        let ttl_ms = GuardConfig::default().ledger_ttl_ms();
        let mut s = state();
        let jobs = vec![JobKey::new("BTCUSDT", "5m")];
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);

        // Re-stamp pushes expiry out from the reconcile time
        s.reconcile(&[(btc(), OrderSide::Buy)], &jobs, 2_000);
        assert_eq!(
            s.check_open(&btc(), &iv("5m"), OrderSide::Buy, 2_000 + ttl_ms - 1),
            Err(DenyReason::AlreadyOpen)
        );
    }

    #[test]
    fn test_reset() {
        let mut s = state();
        s.mark_opened(&btc(), &iv("5m"), OrderSide::Buy, 1_000);
        s.try_reserve(&btc(), &iv("5m"), OrderSide::Sell, 1_000).ok();
        s.reset();
        assert_eq!(s.ledger_len(), 0);
        assert!(s.check_open(&btc(), &iv("5m"), OrderSide::Buy, 1_001).is_ok());
    }
}
