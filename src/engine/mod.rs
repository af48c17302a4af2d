//! C8 OpportunityEngine: orchestrates scan cycles, real-time price updates,
//! and opportunity lifecycle across every other collaborator in the core.
//!
//! The engine is the only component that talks to a [`MarketFeed`] and the
//! only one that mutates the active-opportunity set; everything else
//! ([`MarketMatcher`], [`OpportunityScorer`], [`RiskModeler`],
//! [`CircuitBreaker`], [`Analytics`]) is a pure or near-pure collaborator it
//! drives.

pub mod discovery;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tracing::warn;
use uuid::Uuid;

use crate::analytics::{AggregateStats, Analytics};
use crate::breaker::{BreakerScope, CircuitBreaker, TradeOutcome};
use crate::error::{EngineError, Result};
use crate::linker::MarketLinker;
use crate::market::{Market, MarketKey};
use crate::matcher::MarketMatcher;
use crate::normalize::OutcomeNormalizer;
use crate::opportunity::{Action, ExecutionPlan, Opportunity, OpportunityLeg, OpportunityOutcome, OpportunityStatus};
use crate::ports::{
    AnalyticsStore, FairValueProvider, LinkStore, MarketFeed, PlatformPairStats, PriceUpdate, StatsWindow,
};
use crate::risk::{RiskBreakdown, RiskModeler};
use crate::scorer::OpportunityScorer;

/// Tunables owned by the engine itself rather than any one collaborator:
/// the venue universe to scan, the per-venue fee table, scan cadence, and
/// per-family on/off switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub venues: Vec<String>,
    pub search_query: String,
    pub min_edge_pct: f64,
    pub min_liquidity: Decimal,
    pub include_internal: bool,
    pub include_cross_platform: bool,
    pub include_edge: bool,
    pub fee_rates: HashMap<String, f64>,
    pub default_fee_rate: f64,
    pub venue_timeout_ms: u64,
    pub scan_deadline_ms: u64,
    pub opportunity_ttl_ms: u64,
    pub scan_interval_ms: u64,
    pub default_bankroll: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            venues: Vec::new(),
            search_query: String::new(),
            min_edge_pct: 1.0,
            min_liquidity: Decimal::from(100),
            include_internal: true,
            include_cross_platform: true,
            include_edge: false,
            fee_rates: HashMap::new(),
            default_fee_rate: 0.0,
            venue_timeout_ms: 5_000,
            scan_deadline_ms: 15_000,
            opportunity_ttl_ms: 5 * 60 * 1000,
            scan_interval_ms: 30_000,
            default_bankroll: Decimal::from(10_000),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn fee_rate(&self, venue: &str) -> f64 {
        self.fee_rates.get(venue).copied().unwrap_or(self.default_fee_rate)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Score,
    EdgePct,
    Confidence,
    Liquidity,
}

/// Per-call overrides for [`OpportunityEngine::scan`]; `None` falls back to
/// the engine's [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub venues: Option<Vec<String>>,
    pub sort: SortKey,
}

/// Lifecycle notifications a caller can subscribe to instead of polling
/// [`OpportunityEngine::get_active`].
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Discovered(Opportunity),
    Updated(Opportunity),
    Expired(Uuid),
    Taken(Uuid),
    Closed(Uuid),
}

struct RealtimeHandle {
    stop_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

/// A fingerprint identifying "the same opportunity" across scan cycles:
/// same kind, same set of (market, normalized side) legs. Used to decide
/// whether a freshly-discovered candidate updates an existing active
/// opportunity in place or is genuinely new.
fn fingerprint(opp: &Opportunity) -> String {
    let mut legs: Vec<String> = opp.markets.iter().map(|l| format!("{}#{:?}", l.market.as_str(), l.normalized)).collect();
    legs.sort();
    format!("{:?}|{}", opp.kind, legs.join(","))
}

/// Orchestrates scan cycles, the real-time price-update path, and
/// opportunity lifecycle transitions. Cheap to clone via `Arc`; intended to
/// be constructed once per process and shared across the CLI/app layer.
pub struct OpportunityEngine {
    config: EngineConfig,
    feed: Arc<dyn MarketFeed>,
    normalizer: OutcomeNormalizer,
    matcher: MarketMatcher,
    linker: MarketLinker,
    scorer: OpportunityScorer,
    risk: RiskModeler,
    breaker: Arc<CircuitBreaker>,
    analytics: Analytics<dyn AnalyticsStore>,
    fair_value: Option<Arc<dyn FairValueProvider>>,
    active: DashMap<Uuid, Opportunity>,
    scan_lock: AsyncMutex<()>,
    opportunity_locks: DashMap<Uuid, Arc<AsyncMutex<()>>>,
    events: broadcast::Sender<EngineEvent>,
    realtime: SyncMutex<Option<RealtimeHandle>>,
}

impl OpportunityEngine {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        config: EngineConfig,
        feed: Arc<dyn MarketFeed>,
        link_store: Arc<dyn LinkStore>,
        analytics_store: Arc<dyn AnalyticsStore>,
        matcher: MarketMatcher,
        scorer: OpportunityScorer,
        risk: RiskModeler,
        breaker: Arc<CircuitBreaker>,
        fair_value: Option<Arc<dyn FairValueProvider>>,
    ) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            config,
            feed,
            normalizer: OutcomeNormalizer::new(),
            matcher,
            linker: MarketLinker::new(link_store),
            scorer,
            risk,
            breaker,
            analytics: Analytics::new(analytics_store),
            fair_value,
            active: DashMap::new(),
            scan_lock: AsyncMutex::new(()),
            opportunity_locks: DashMap::new(),
            events,
            realtime: SyncMutex::new(None),
        }
    }

    /// Rebuild the linker's adjacency from the store. Must be called once
    /// before the first scan.
    pub async fn load(&self) -> Result<()> {
        self.linker.load().await
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn log_store_err(result: Result<()>, context: &'static str) {
        if let Err(e) = result {
            warn!(error = %e, context, "store write failed, continuing best-effort");
        }
    }

    fn opportunity_lock(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.opportunity_locks.entry(id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).value())
    }

    // ---- scan cycle ----------------------------------------------------

    /// Run one full scan cycle: fan out a per-venue market fetch (bounded
    /// by `scan_deadline_ms` overall and `venue_timeout_ms` per venue,
    /// failures/timeouts degrading to an empty result for that venue rather
    /// than aborting the cycle), run the three discovery families, score
    /// and sort the results, merge them into the active set, and sweep
    /// expired opportunities. At most one scan runs at a time.
    pub async fn scan(&self, opts: &ScanOptions) -> Vec<Opportunity> {
        let _permit = self.scan_lock.lock().await;

        let venues = opts.venues.clone().unwrap_or_else(|| self.config.venues.clone());
        let overall_deadline = Duration::from_millis(self.config.scan_deadline_ms);
        let per_venue_timeout = Duration::from_millis(self.config.venue_timeout_ms);

        let mut join_set = JoinSet::new();
        for venue in venues {
            let feed = Arc::clone(&self.feed);
            let query = self.config.search_query.clone();
            join_set.spawn(async move {
                let result = feed.search_markets(&query, &venue, per_venue_timeout).await;
                (venue, result)
            });
        }

        let mut markets = Vec::new();
        let fetch_all = async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((_, Ok(found))) => markets.extend(found),
                    Ok((venue, Err(e))) => warn!(venue, error = %e, "market fetch failed this cycle, treating as empty"),
                    Err(e) => warn!(error = %e, "market-fetch task panicked"),
                }
            }
        };
        if tokio::time::timeout(overall_deadline, fetch_all).await.is_err() {
            warn!("scan deadline exceeded, proceeding with markets gathered so far");
            join_set.abort_all();
        }

        self.expire_stale(Utc::now()).await;

        let discovered = self.discover(&markets).await;
        let mut merged = self.merge_into_active(discovered).await;
        Self::sort_by(&mut merged, opts.sort);
        merged
    }

    async fn discover(&self, markets: &[Market]) -> Vec<Opportunity> {
        let markets_by_key: HashMap<MarketKey, Market> = markets.iter().map(|m| (m.key(), m.clone())).collect();
        let groups = self.matcher.find_matches(markets).await;

        let mut found = Vec::new();
        found.extend(discovery::internal_arbitrage(markets, &self.normalizer, &self.config));
        found.extend(discovery::cross_platform_arbitrage(&groups, &markets_by_key, &self.normalizer, &self.config));

        if self.config.include_edge {
            if let Some(provider) = &self.fair_value {
                let mut estimates = HashMap::new();
                for market in markets {
                    if let Some(estimate) = provider.fair_value(market).await {
                        estimates.insert(market.key(), estimate);
                    }
                }
                found.extend(discovery::edge_vs_fair_value(markets, &estimates, &self.normalizer, &self.config));
            }
        }

        for opp in &mut found {
            self.price_opportunity(opp);
        }
        found
    }

    /// Score, size, and build an execution plan for a freshly-discovered
    /// opportunity. Shared by both the scan path and the realtime
    /// price-update path.
    fn price_opportunity(&self, opp: &mut Opportunity) {
        let breakdown = self.scorer.score(opp);
        opp.score = breakdown.total;
        opp.kelly_fraction = self.scorer.calculate_kelly(opp.edge_pct.to_f64().unwrap_or(0.0), opp.confidence, None);

        let size = self.scorer.get_optimal_size(opp, self.config.default_bankroll);
        opp.estimated_slippage = if opp.markets.is_empty() {
            0.0
        } else {
            opp.markets.iter().map(|l| self.scorer.estimate_slippage(l.market.venue(), l.liquidity, size, 0.0)).sum::<f64>()
                / opp.markets.len() as f64
        };

        let plan = self.scorer.estimate_execution(opp, size);
        for step in &plan.steps {
            if let Some(leg) = opp.markets.iter_mut().find(|l| l.market == step.market) {
                leg.recommended_size = step.size;
            }
        }
        opp.execution = Some(plan);
    }

    /// Merge freshly-discovered candidates into the active set. A
    /// candidate whose (kind, legs) fingerprint matches an existing active
    /// opportunity updates it in place (keeping its id and discovery time);
    /// otherwise it is a new opportunity.
    async fn merge_into_active(&self, discovered: Vec<Opportunity>) -> Vec<Opportunity> {
        let mut merged = Vec::with_capacity(discovered.len());
        for mut opp in discovered {
            let existing_id = self
                .active
                .iter()
                .find(|e| e.value().is_active() && fingerprint(e.value()) == fingerprint(&opp))
                .map(|e| *e.key());

            if let Some(id) = existing_id {
                opp.id = id;
                if let Some(existing) = self.active.get(&id) {
                    opp.discovered_at = existing.discovered_at;
                }
                self.active.insert(id, opp.clone());
                let _ = self.events.send(EngineEvent::Updated(opp.clone()));
            } else {
                self.active.insert(opp.id, opp.clone());
                Self::log_store_err(self.analytics.record_discovery(&opp).await, "record_discovery");
                let _ = self.events.send(EngineEvent::Discovered(opp.clone()));
            }
            merged.push(opp);
        }
        merged
    }

    async fn expire_stale(&self, now: DateTime<Utc>) {
        let expired: Vec<Uuid> = self
            .active
            .iter()
            .filter(|e| e.value().is_active() && e.value().is_expired_at(now))
            .map(|e| *e.key())
            .collect();

        for id in expired {
            if let Some((_, mut opp)) = self.active.remove(&id) {
                if opp.transition(OpportunityStatus::Expired).is_ok() {
                    Self::log_store_err(self.analytics.record_expiry(&opp).await, "record_expiry");
                    let _ = self.events.send(EngineEvent::Expired(id));
                }
            }
        }
    }

    fn sort_by(opportunities: &mut [Opportunity], key: SortKey) {
        opportunities.sort_by(|a, b| {
            let (x, y) = match key {
                SortKey::Score => (a.score, b.score),
                SortKey::EdgePct => (a.edge_pct.to_f64().unwrap_or(0.0), b.edge_pct.to_f64().unwrap_or(0.0)),
                SortKey::Confidence => (a.confidence, b.confidence),
                SortKey::Liquidity => (a.total_liquidity.to_f64().unwrap_or(0.0), b.total_liquidity.to_f64().unwrap_or(0.0)),
            };
            y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    // ---- queries ---------------------------------------------------------

    #[must_use]
    pub fn get_active(&self) -> Vec<Opportunity> {
        self.active.iter().filter(|e| e.value().is_active()).map(|e| e.value().clone()).collect()
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Opportunity> {
        self.active.get(&id).map(|e| e.value().clone())
    }

    pub fn estimate_execution(&self, opp: &Opportunity, size: Decimal) -> ExecutionPlan {
        self.scorer.estimate_execution(opp, size)
    }

    pub fn model_risk(&self, opp: &Opportunity, size: Decimal, avg_exec_time_ms: f64) -> RiskBreakdown {
        self.risk.model_risk(&opp.markets, size, avg_exec_time_ms)
    }

    pub async fn get_analytics(&self, window: StatsWindow) -> Result<AggregateStats> {
        self.analytics.get_stats(window).await
    }

    pub async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>> {
        self.analytics.get_platform_pairs().await
    }

    // ---- linking -----------------------------------------------------

    pub async fn link_markets(&self, a: MarketKey, b: MarketKey, confidence: f64) -> Result<()> {
        self.linker.link(a, b, confidence, crate::ports::LinkSource::Manual).await?;
        Ok(())
    }

    pub async fn unlink_markets(&self, a: &MarketKey, b: &MarketKey) -> Result<bool> {
        self.linker.unlink(a, b).await
    }

    #[must_use]
    pub fn get_linked_markets(&self, market: &MarketKey) -> Vec<MarketKey> {
        self.linker.get_identity(market)
    }

    // ---- lifecycle -----------------------------------------------------

    /// Transition an active opportunity to `Taken`, refused if the global
    /// circuit breaker is currently tripped.
    pub async fn mark_taken(&self, id: Uuid, fill_prices: Vec<Decimal>) -> Result<Opportunity> {
        let (allowed, category) = self.breaker.can_trade(None);
        if !allowed {
            return Err(EngineError::Invariant(format!("circuit breaker tripped: {category:?}")).into());
        }

        let lock = self.opportunity_lock(id);
        let _guard = lock.lock().await;

        let mut entry = self.active.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        entry.transition(OpportunityStatus::Taken)?;
        entry.outcome = Some(OpportunityOutcome { taken: true, fill_prices, realized_pnl: None, closed_at: None, notes: None });
        let snapshot = entry.value().clone();
        drop(entry);

        Self::log_store_err(self.analytics.record_taken(&snapshot).await, "record_taken");
        let _ = self.events.send(EngineEvent::Taken(id));
        Ok(snapshot)
    }

    /// Close a taken opportunity with its realized outcome, removing it
    /// from the active set and feeding the result back into the circuit
    /// breaker's per-scope loss tracking.
    pub async fn record_outcome(&self, id: Uuid, realized_pnl: Decimal, notes: Option<String>) -> Result<Opportunity> {
        let lock = self.opportunity_lock(id);
        let _guard = lock.lock().await;

        let mut entry = self.active.get_mut(&id).ok_or(EngineError::NotFound(id))?;
        entry.transition(OpportunityStatus::Closed)?;
        let outcome = entry.outcome.get_or_insert_with(|| OpportunityOutcome {
            taken: true,
            fill_prices: Vec::new(),
            realized_pnl: None,
            closed_at: None,
            notes: None,
        });
        outcome.realized_pnl = Some(realized_pnl);
        outcome.closed_at = Some(Utc::now());
        outcome.notes = notes.clone();
        let snapshot = entry.value().clone();
        drop(entry);
        self.active.remove(&id);
        self.opportunity_locks.remove(&id);

        Self::log_store_err(self.analytics.record_outcome(&snapshot, realized_pnl).await, "record_outcome");

        let pnl_pct = (realized_pnl / snapshot.total_liquidity.max(Decimal::ONE)).to_f64();
        self.breaker.record_trade(BreakerScope::Global, TradeOutcome { success: realized_pnl >= Decimal::ZERO, pnl_pct });
        if let Some(market) = snapshot.markets.first().map(|l| l.market.clone()) {
            self.breaker.record_trade(BreakerScope::Market(market), TradeOutcome { success: realized_pnl >= Decimal::ZERO, pnl_pct });
        }

        let _ = self.events.send(EngineEvent::Closed(id));
        Ok(snapshot)
    }

    // ---- realtime --------------------------------------------------------

    /// Start the real-time price-update loop: subscribes to
    /// [`MarketFeed::subscribe`] for the configured venues and re-scores
    /// only the active opportunities touched by each update. A no-op if
    /// realtime is already running.
    pub fn start_realtime(self: &Arc<Self>) {
        let mut guard = self.realtime.lock();
        if guard.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut updates = engine.feed.subscribe(&engine.config.venues);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    maybe_update = updates.recv() => {
                        match maybe_update {
                            Some(update) => engine.handle_price_update(update).await,
                            None => break,
                        }
                    }
                }
            }
        });

        *guard = Some(RealtimeHandle { stop_tx, task });
    }

    /// Signal the real-time loop to stop and join it. A no-op if realtime
    /// isn't running.
    pub async fn stop_realtime(&self) {
        let handle = self.realtime.lock().take();
        if let Some(handle) = handle {
            let _ = handle.stop_tx.send(true);
            let _ = handle.task.await;
        }
    }

    async fn handle_price_update(&self, update: PriceUpdate) {
        let key = MarketKey::new(&update.venue, &update.market_id);
        let affected: Vec<Uuid> = self
            .active
            .iter()
            .filter(|e| e.value().is_active() && e.value().markets.iter().any(|l| l.market == key))
            .map(|e| *e.key())
            .collect();

        for id in affected {
            let lock = self.opportunity_lock(id);
            let _guard = lock.lock().await;
            let Some(mut entry) = self.active.get_mut(&id) else { continue };

            for leg in &mut entry.markets {
                if leg.market == key {
                    leg.price = update.price;
                }
            }
            if entry.markets.len() > 1 {
                entry.edge_pct = Decimal::try_from(recompute_edge_pct(&entry.markets)).unwrap_or(entry.edge_pct);
                entry.profit_per_100 = entry.edge_pct;
            }
            let breakdown = self.scorer.score(&entry);
            entry.score = breakdown.total;

            if entry.edge_pct.to_f64().unwrap_or(0.0) < self.config.min_edge_pct {
                let mut opp = entry.value().clone();
                drop(entry);
                if opp.transition(OpportunityStatus::Expired).is_ok() {
                    self.active.remove(&id);
                    Self::log_store_err(self.analytics.record_expiry(&opp).await, "record_expiry");
                    let _ = self.events.send(EngineEvent::Expired(id));
                }
            } else {
                let snapshot = entry.value().clone();
                drop(entry);
                let _ = self.events.send(EngineEvent::Updated(snapshot));
            }
        }
    }
}

/// Recompute an opportunity's edge from its legs' current prices: a hedge
/// (all `Buy`) nets `1 - sum(prices)`, a spread (one `Buy`, one `Sell`)
/// nets `sell - buy`. Single-leg edge-vs-fair-value opportunities aren't
/// recomputed here since that requires a fresh fair-value estimate, not
/// just a price tick.
fn recompute_edge_pct(legs: &[OpportunityLeg]) -> f64 {
    let mut buy_sum = Decimal::ZERO;
    let mut sell_sum = Decimal::ZERO;
    for leg in legs {
        match leg.action {
            Action::Buy => buy_sum += leg.price,
            Action::Sell => sell_sum += leg.price,
        }
    }
    if sell_sum > Decimal::ZERO {
        ((sell_sum - buy_sum) * Decimal::from(100)).to_f64().unwrap_or(0.0)
    } else {
        ((Decimal::ONE - buy_sum) * Decimal::from(100)).to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::MockMarketFeed;
    use crate::market::Outcome;
    use crate::matcher::MatcherConfig;
    use crate::risk::RiskConfig;
    use crate::scorer::ScorerConfig;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn market(venue: &str, yes: Decimal, no: Decimal, vol: Decimal) -> Market {
        Market {
            venue: venue.into(),
            market_id: "m1".into(),
            question: "Will X win the election?".into(),
            slug: None,
            outcomes: vec![Outcome::new("Yes", yes, vol), Outcome::new("No", no, vol)],
            volume_24h: vol,
            liquidity: vol,
            end_date: None,
        }
    }

    fn engine(feed: Arc<dyn MarketFeed>) -> OpportunityEngine {
        let store = Arc::new(MemoryStore::new());
        OpportunityEngine::new(
            EngineConfig { venues: vec!["kalshi".into()], min_edge_pct: 1.0, min_liquidity: dec!(500), ..EngineConfig::default() },
            feed,
            store.clone(),
            store,
            MarketMatcher::new(MatcherConfig::default(), None),
            OpportunityScorer::new(ScorerConfig::default()),
            RiskModeler::new(RiskConfig::default()),
            Arc::new(CircuitBreaker::new(crate::breaker::BreakerConfig::default())),
            None,
        )
    }

    #[tokio::test]
    async fn scan_discovers_and_scores_internal_arbitrage() {
        let feed = Arc::new(MockMarketFeed::with_markets(vec![market("kalshi", dec!(0.48), dec!(0.50), dec!(2000))]));
        let eng = engine(feed);
        eng.load().await.unwrap();

        let found = eng.scan(&ScanOptions::default()).await;
        assert_eq!(found.len(), 1);
        assert!(found[0].score > 0.0);
        assert_eq!(eng.get_active().len(), 1);
    }

    #[tokio::test]
    async fn repeated_scan_updates_rather_than_duplicates() {
        let feed = Arc::new(MockMarketFeed::with_markets(vec![market("kalshi", dec!(0.48), dec!(0.50), dec!(2000))]));
        let eng = engine(feed);
        eng.load().await.unwrap();

        eng.scan(&ScanOptions::default()).await;
        eng.scan(&ScanOptions::default()).await;
        assert_eq!(eng.get_active().len(), 1);
    }

    #[tokio::test]
    async fn mark_taken_then_record_outcome_closes_opportunity() {
        let feed = Arc::new(MockMarketFeed::with_markets(vec![market("kalshi", dec!(0.48), dec!(0.50), dec!(2000))]));
        let eng = engine(feed);
        eng.load().await.unwrap();
        let found = eng.scan(&ScanOptions::default()).await;
        let id = found[0].id;

        let taken = eng.mark_taken(id, vec![dec!(0.48), dec!(0.50)]).await.unwrap();
        assert_eq!(taken.status, OpportunityStatus::Taken);

        let closed = eng.record_outcome(id, dec!(5), None).await.unwrap();
        assert_eq!(closed.status, OpportunityStatus::Closed);
        assert!(eng.get(id).is_none());
    }

    #[tokio::test]
    async fn sum_at_least_one_yields_no_opportunities() {
        let feed = Arc::new(MockMarketFeed::with_markets(vec![market("kalshi", dec!(0.55), dec!(0.50), dec!(2000))]));
        let eng = engine(feed);
        eng.load().await.unwrap();
        let found = eng.scan(&ScanOptions::default()).await;
        assert!(found.is_empty());
    }
}
