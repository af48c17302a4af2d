//! Layered circuit-breaker / safety gate (C7).
//!
//! Global and per-market scopes trip independently. A trip blocks
//! [`CircuitBreaker::can_trade`] for its scope only — a market-scoped trip
//! never blocks other markets, but a global trip blocks everything. The
//! monitoring loop and `can_trade` share the same lazy auto-reset check, so
//! `can_trade` never blocks on the loop and the loop never blocks on a
//! caller.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::market::MarketKey;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BreakerScope {
    Global,
    Market(MarketKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCategory {
    Volatility,
    Liquidity,
    Spread,
    Loss,
    ConsecutiveFailures,
    Manual,
}

#[derive(Debug, Clone)]
pub struct TripEvent {
    pub category: TripCategory,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A single condition evaluation, supplying whatever live metric the
/// caller has in hand. The breaker itself never fetches these values; a
/// caller (typically the engine, informed by [`crate::features::FeatureEngine`]
/// signals) supplies them on the request path.
#[derive(Debug, Clone)]
pub enum Condition {
    Volatility { scope: BreakerScope, value: f64 },
    LiquidityFloor { scope: BreakerScope, value: Decimal },
    SpreadCeiling { scope: BreakerScope, value: f64 },
    ConsecutiveFailures { scope: BreakerScope },
    LossWindow { scope: BreakerScope },
    Manual { scope: BreakerScope, reason: String },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub max_volatility: f64,
    pub min_liquidity: Decimal,
    pub max_spread: f64,
    pub max_loss_pct_hourly: f64,
    pub max_loss_pct_daily: f64,
    pub max_loss_pct_weekly: f64,
    pub max_consecutive_failures: u32,
    pub cooldown_ms: u64,
    pub auto_reset: bool,
    pub poll_interval_ms: u64,
}

impl BreakerConfig {
    /// Tight limits, short fuse: suited to unproven venues or capital
    /// preservation mode.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_volatility: 0.15,
            min_liquidity: Decimal::new(1000, 0),
            max_spread: 0.03,
            max_loss_pct_hourly: 1.0,
            max_loss_pct_daily: 2.0,
            max_loss_pct_weekly: 5.0,
            max_consecutive_failures: 3,
            cooldown_ms: 15 * 60_000,
            auto_reset: true,
            poll_interval_ms: 5_000,
        }
    }

    #[must_use]
    pub fn moderate() -> Self {
        Self {
            max_volatility: 0.25,
            min_liquidity: Decimal::new(500, 0),
            max_spread: 0.05,
            max_loss_pct_hourly: 2.0,
            max_loss_pct_daily: 5.0,
            max_loss_pct_weekly: 10.0,
            max_consecutive_failures: 5,
            cooldown_ms: 10 * 60_000,
            auto_reset: true,
            poll_interval_ms: 5_000,
        }
    }

    /// Wide limits: suited to well-proven venues where the operator
    /// accepts deeper drawdowns before the gate closes.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_volatility: 0.40,
            min_liquidity: Decimal::new(200, 0),
            max_spread: 0.08,
            max_loss_pct_hourly: 4.0,
            max_loss_pct_daily: 10.0,
            max_loss_pct_weekly: 20.0,
            max_consecutive_failures: 8,
            cooldown_ms: 5 * 60_000,
            auto_reset: true,
            poll_interval_ms: 5_000,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::moderate()
    }
}

struct LossWindow {
    budget_pct: f64,
    used_pct: f64,
    window_start: DateTime<Utc>,
    period: Duration,
}

impl LossWindow {
    fn new(budget_pct: f64, period: Duration) -> Self {
        Self { budget_pct, used_pct: 0.0, window_start: Utc::now(), period }
    }

    fn roll_if_elapsed(&mut self, now: DateTime<Utc>) {
        if now - self.window_start >= self.period {
            self.window_start = now;
            self.used_pct = 0.0;
        }
    }

    fn record_loss(&mut self, pnl_pct: f64) -> bool {
        self.roll_if_elapsed(Utc::now());
        self.used_pct += pnl_pct.abs();
        self.used_pct > self.budget_pct
    }
}

struct ScopeState {
    tripped: bool,
    last_trip: Option<TripEvent>,
    history: VecDeque<TripEvent>,
    consecutive_failures: u32,
    hourly: LossWindow,
    daily: LossWindow,
    weekly: LossWindow,
}

impl ScopeState {
    fn new(config: &BreakerConfig) -> Self {
        Self {
            tripped: false,
            last_trip: None,
            history: VecDeque::new(),
            consecutive_failures: 0,
            hourly: LossWindow::new(config.max_loss_pct_hourly, Duration::hours(1)),
            daily: LossWindow::new(config.max_loss_pct_daily, Duration::days(1)),
            weekly: LossWindow::new(config.max_loss_pct_weekly, Duration::weeks(1)),
        }
    }

    fn push_history(&mut self, event: TripEvent) {
        self.history.push_back(event.clone());
        while self.history.len() > 100 {
            self.history.pop_front();
        }
        self.last_trip = Some(event);
    }
}

#[derive(Debug, Clone)]
pub struct BreakerStateSnapshot {
    pub tripped: bool,
    pub last_trip: Option<TripEvent>,
    pub history: Vec<TripEvent>,
    pub consecutive_failures: u32,
}

pub struct TradeOutcome {
    pub success: bool,
    pub pnl_pct: Option<f64>,
}

/// Global + per-market trip logic.
pub struct CircuitBreaker {
    config: BreakerConfig,
    scopes: DashMap<BreakerScope, Mutex<ScopeState>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self { config, scopes: DashMap::new(), monitor: Mutex::new(None) }
    }

    fn scope_entry(&self, scope: &BreakerScope) -> Arc<()> {
        self.scopes.entry(scope.clone()).or_insert_with(|| Mutex::new(ScopeState::new(&self.config)));
        Arc::new(())
    }

    fn with_scope<R>(&self, scope: &BreakerScope, f: impl FnOnce(&mut ScopeState) -> R) -> R {
        let _ = self.scope_entry(scope);
        let entry = self.scopes.get(scope).expect("scope just inserted");
        let mut state = entry.lock();
        f(&mut state)
    }

    /// Lazy auto-reset: if tripped, `auto_reset` is set, and the cooldown
    /// has elapsed since the last trip, the scope closes. Shared by
    /// `can_trade` and the monitoring loop so neither blocks the other.
    fn resolve_open(&self, state: &mut ScopeState) -> bool {
        if state.tripped && self.config.auto_reset {
            if let Some(trip) = &state.last_trip {
                let elapsed = Utc::now() - trip.at;
                if elapsed >= Duration::milliseconds(self.config.cooldown_ms as i64) {
                    state.tripped = false;
                }
            }
        }
        state.tripped
    }

    /// `CanTrade`: `market` (if given) is checked in addition to the
    /// global scope; either being open blocks the trade.
    #[must_use]
    pub fn can_trade(&self, market: Option<&MarketKey>) -> (bool, Option<TripCategory>) {
        let global_open = self.with_scope(&BreakerScope::Global, |s| self.resolve_open(s));
        if global_open {
            let cat = self.with_scope(&BreakerScope::Global, |s| s.last_trip.as_ref().map(|t| t.category));
            return (false, cat);
        }
        if let Some(market) = market {
            let scope = BreakerScope::Market(market.clone());
            let open = self.with_scope(&scope, |s| self.resolve_open(s));
            if open {
                let cat = self.with_scope(&scope, |s| s.last_trip.as_ref().map(|t| t.category));
                return (false, cat);
            }
        }
        (true, None)
    }

    /// Evaluate a single condition against its scope's configured
    /// threshold; breach trips the scope and the return value reports it.
    pub fn check_condition(&self, condition: Condition) -> bool {
        match condition {
            Condition::Volatility { scope, value } => {
                let breach = value > self.config.max_volatility;
                if breach {
                    self.trip(&scope, TripCategory::Volatility, format!("volatility {value:.3} exceeds {:.3}", self.config.max_volatility));
                }
                breach
            }
            Condition::LiquidityFloor { scope, value } => {
                let breach = value < self.config.min_liquidity;
                if breach {
                    self.trip(&scope, TripCategory::Liquidity, format!("liquidity {value} below floor {}", self.config.min_liquidity));
                }
                breach
            }
            Condition::SpreadCeiling { scope, value } => {
                let breach = value > self.config.max_spread;
                if breach {
                    self.trip(&scope, TripCategory::Spread, format!("spread {value:.3} exceeds {:.3}", self.config.max_spread));
                }
                breach
            }
            Condition::ConsecutiveFailures { scope } => self.with_scope(&scope, |s| s.consecutive_failures >= self.config.max_consecutive_failures),
            Condition::LossWindow { scope } => self.with_scope(&scope, |s| {
                s.hourly.roll_if_elapsed(Utc::now());
                s.daily.roll_if_elapsed(Utc::now());
                s.weekly.roll_if_elapsed(Utc::now());
                s.hourly.used_pct > s.hourly.budget_pct || s.daily.used_pct > s.daily.budget_pct || s.weekly.used_pct > s.weekly.budget_pct
            }),
            Condition::Manual { scope, reason } => {
                self.trip(&scope, TripCategory::Manual, reason);
                true
            }
        }
    }

    /// `RecordTrade`: updates consecutive-failure and loss-window state;
    /// trips on breach.
    pub fn record_trade(&self, scope: BreakerScope, outcome: TradeOutcome) {
        let mut breach_loss = false;
        self.with_scope(&scope, |s| {
            if outcome.success {
                s.consecutive_failures = 0;
            } else {
                s.consecutive_failures += 1;
            }
            if let Some(pnl) = outcome.pnl_pct {
                if pnl < 0.0 {
                    let h = s.hourly.record_loss(pnl);
                    let d = s.daily.record_loss(pnl);
                    let w = s.weekly.record_loss(pnl);
                    breach_loss = h || d || w;
                }
            }
        });

        let failures_breach = self.with_scope(&scope, |s| s.consecutive_failures >= self.config.max_consecutive_failures);
        if failures_breach {
            self.trip(&scope, TripCategory::ConsecutiveFailures, format!("{} consecutive failures", self.config.max_consecutive_failures));
        }
        if breach_loss {
            self.trip(&scope, TripCategory::Loss, "loss window budget exceeded".into());
        }
    }

    pub fn trip(&self, scope: &BreakerScope, category: TripCategory, reason: String) {
        self.with_scope(scope, |s| {
            s.tripped = true;
            s.push_history(TripEvent { category, reason, at: Utc::now() });
        });
    }

    /// Explicit reset: the only way to close a scope when `auto_reset` is
    /// false, and always available regardless of the cooldown.
    pub fn reset(&self, scope: &BreakerScope) {
        self.with_scope(scope, |s| {
            s.tripped = false;
            s.consecutive_failures = 0;
        });
    }

    #[must_use]
    pub fn get_state(&self, scope: &BreakerScope) -> BreakerStateSnapshot {
        self.with_scope(scope, |s| BreakerStateSnapshot {
            tripped: s.tripped,
            last_trip: s.last_trip.clone(),
            history: s.history.iter().cloned().collect(),
            consecutive_failures: s.consecutive_failures,
        })
    }

    /// Polls every known scope's lazy auto-reset on a fixed cadence,
    /// independent of the request path. `CanTrade` callers never wait on
    /// this loop; it exists so a scope can close even with no incoming
    /// traffic to trigger the lazy check.
    pub fn start_monitoring(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let period = StdDuration::from_millis(this.config.poll_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let scopes: Vec<BreakerScope> = this.scopes.iter().map(|e| e.key().clone()).collect();
                for scope in scopes {
                    this.with_scope(&scope, |s| {
                        this.resolve_open(s);
                    });
                }
            }
        });
        *self.monitor.lock() = Some(handle);
    }

    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.monitor.lock().take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Default)]
pub struct BreakerStats {
    pub scopes_tripped: usize,
    pub total_scopes: usize,
}

impl CircuitBreaker {
    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        let total = self.scopes.len();
        let tripped = self.scopes.iter().filter(|e| e.value().lock().tripped).count();
        BreakerStats { scopes_tripped: tripped, total_scopes: total }
    }
}

#[allow(dead_code)]
fn _assert_send_sync() {
    fn assert<T: Send + Sync>() {}
    assert::<CircuitBreaker>();
}

/// Per-venue/market fee/reliability tables live elsewhere (scorer, risk);
/// the breaker's only external dependency is its own config.
pub type VenueName = String;
#[allow(dead_code)]
type _VenueTable = HashMap<VenueName, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn daily_loss_trip_scenario() {
        // spec §8 scenario 6: daily maxLossPct=3, four trades of
        // -1,-1,-0.5,-0.7. After three, still tradeable; after four, tripped
        // with category=loss; after cooldown with autoReset, tradeable again.
        let mut config = BreakerConfig::moderate();
        config.max_loss_pct_daily = 3.0;
        config.cooldown_ms = 20;
        config.auto_reset = true;
        let breaker = CircuitBreaker::new(config);

        for pnl in [-1.0, -1.0, -0.5] {
            breaker.record_trade(BreakerScope::Global, TradeOutcome { success: false, pnl_pct: Some(pnl) });
        }
        assert!(breaker.can_trade(None).0);

        breaker.record_trade(BreakerScope::Global, TradeOutcome { success: false, pnl_pct: Some(-0.7) });
        let (ok, category) = breaker.can_trade(None);
        assert!(!ok);
        assert_eq!(category, Some(TripCategory::Loss));

        tokio::time::sleep(StdDuration::from_millis(30)).await;
        assert!(breaker.can_trade(None).0);
    }

    #[test]
    fn market_scoped_trip_does_not_block_other_markets() {
        let breaker = CircuitBreaker::new(BreakerConfig::moderate());
        let m1 = MarketKey::new("v1", "a");
        let m2 = MarketKey::new("v1", "b");
        breaker.trip(&BreakerScope::Market(m1.clone()), TripCategory::Manual, "test".into());

        assert!(!breaker.can_trade(Some(&m1)).0);
        assert!(breaker.can_trade(Some(&m2)).0);
    }

    #[test]
    fn global_trip_blocks_everything() {
        let breaker = CircuitBreaker::new(BreakerConfig::moderate());
        breaker.trip(&BreakerScope::Global, TripCategory::Manual, "halt".into());
        let m = MarketKey::new("v1", "a");
        assert!(!breaker.can_trade(Some(&m)).0);
    }

    #[test]
    fn explicit_reset_required_without_auto_reset() {
        let mut config = BreakerConfig::moderate();
        config.auto_reset = false;
        let breaker = CircuitBreaker::new(config);
        breaker.trip(&BreakerScope::Global, TripCategory::Manual, "halt".into());
        assert!(!breaker.can_trade(None).0);
        breaker.reset(&BreakerScope::Global);
        assert!(breaker.can_trade(None).0);
    }

    #[test]
    fn consecutive_failures_trip_after_threshold() {
        let mut config = BreakerConfig::moderate();
        config.max_consecutive_failures = 3;
        let breaker = CircuitBreaker::new(config);
        for _ in 0..3 {
            breaker.record_trade(BreakerScope::Global, TradeOutcome { success: false, pnl_pct: None });
        }
        assert!(!breaker.can_trade(None).0);
    }
}
