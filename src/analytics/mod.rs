//! Discovery/outcome recording and aggregate performance queries (C10).
//!
//! A thin service over [`AnalyticsStore`]. Every write method here returns
//! `Result<()>` so direct callers/tests see real fallibility; the engine,
//! per spec §7 and §4.9, calls these and only logs failures rather than
//! propagating them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::opportunity::{Opportunity, OpportunityStatus};
use crate::ports::{AnalyticsStore, AttributionRecord, OpportunityRecord, PlatformPairStats, StatsWindow};

#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub total_opportunities: u64,
    pub taken: u64,
    pub wins: u64,
    pub total_profit: Decimal,
    pub avg_edge: Decimal,
    pub win_rate: f64,
}

#[derive(Debug, Clone)]
pub struct StrategyPerformance {
    pub kind: String,
    pub samples: u64,
    pub win_rate: f64,
    pub avg_profit: Decimal,
}

/// One bucket of a decay curve: age since discovery -> realized outcome
/// rate, used to understand how opportunity quality decays with latency.
#[derive(Debug, Clone, Copy)]
pub struct DecayBucket {
    pub age_secs_floor: i64,
    pub samples: u64,
    pub win_rate: f64,
}

pub struct Analytics<S: AnalyticsStore + ?Sized> {
    store: std::sync::Arc<S>,
}

impl<S: AnalyticsStore + ?Sized> Analytics<S> {
    #[must_use]
    pub fn new(store: std::sync::Arc<S>) -> Self {
        Self { store }
    }

    pub async fn record_discovery(&self, opp: &Opportunity) -> Result<()> {
        self.store.record_opportunity(&OpportunityRecord::from_opportunity(opp)).await
    }

    pub async fn record_taken(&self, opp: &Opportunity) -> Result<()> {
        self.store.update_opportunity(&OpportunityRecord::from_opportunity(opp)).await?;
        self.upsert_pair_for(opp, true, None).await
    }

    pub async fn record_expiry(&self, opp: &Opportunity) -> Result<()> {
        self.store.update_opportunity(&OpportunityRecord::from_opportunity(opp)).await
    }

    pub async fn record_outcome(&self, opp: &Opportunity, realized_pnl: Decimal) -> Result<()> {
        self.store.update_opportunity(&OpportunityRecord::from_opportunity(opp)).await?;
        self.upsert_pair_for(opp, false, Some(realized_pnl)).await
    }

    async fn upsert_pair_for(&self, opp: &Opportunity, taken: bool, outcome_pnl: Option<Decimal>) -> Result<()> {
        let venues: Vec<&str> = {
            let mut v: Vec<&str> = opp.markets.iter().map(|l| l.market.venue()).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        if venues.len() < 2 {
            return Ok(());
        }
        let (a, b) = (venues[0].to_string(), venues[1].to_string());
        let edge_pct = opp.edge_pct;
        self.store
            .upsert_platform_pair(
                &a,
                &b,
                Box::new(move |stats: &mut PlatformPairStats| {
                    stats.total_opportunities += 1;
                    if taken {
                        stats.taken += 1;
                    }
                    if let Some(pnl) = outcome_pnl {
                        if pnl > Decimal::ZERO {
                            stats.wins += 1;
                        }
                        stats.total_profit += pnl;
                    }
                    let n = Decimal::from(stats.total_opportunities.max(1));
                    stats.avg_edge = (stats.avg_edge * (n - Decimal::ONE) + edge_pct) / n;
                    stats.last_updated = Some(Utc::now());
                }),
            )
            .await
    }

    pub async fn record_attribution(&self, record: &AttributionRecord) -> Result<()> {
        self.store.record_attribution(record).await
    }

    pub async fn get_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRecord>> {
        self.store.get_opportunity(id).await
    }

    pub async fn get_opportunities(&self, status: Option<OpportunityStatus>, window: StatsWindow) -> Result<Vec<OpportunityRecord>> {
        self.store.list_opportunities(status, window).await
    }

    pub async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>> {
        self.store.get_platform_pairs().await
    }

    /// `GetStats`: recomputed from the store on every call, per spec's "no
    /// in-memory summary is authoritative" guarantee.
    pub async fn get_stats(&self, window: StatsWindow) -> Result<AggregateStats> {
        let records = self.store.list_opportunities(None, window).await?;
        let total_opportunities = records.len() as u64;
        let taken = records.iter().filter(|r| r.taken).count() as u64;
        let wins = records.iter().filter(|r| r.realized_pnl.is_some_and(|p| p > Decimal::ZERO)).count() as u64;
        let total_profit: Decimal = records.iter().filter_map(|r| r.realized_pnl).sum();
        let avg_edge = if total_opportunities > 0 {
            records.iter().map(|r| r.edge_pct).sum::<Decimal>() / Decimal::from(total_opportunities)
        } else {
            Decimal::ZERO
        };
        let win_rate = if taken > 0 { wins as f64 / taken as f64 } else { 0.0 };

        Ok(AggregateStats { total_opportunities, taken, wins, total_profit, avg_edge, win_rate })
    }

    /// Strategies (opportunity kinds) with at least `min_samples` closed
    /// trades, ranked by win rate.
    pub async fn get_best_strategies(&self, window: StatsWindow, min_samples: u64) -> Result<Vec<StrategyPerformance>> {
        let records = self.store.list_opportunities(None, window).await?;
        let mut by_kind: std::collections::HashMap<String, Vec<&OpportunityRecord>> = std::collections::HashMap::new();
        for r in &records {
            if r.realized_pnl.is_some() {
                by_kind.entry(r.kind.clone()).or_default().push(r);
            }
        }

        let mut out: Vec<StrategyPerformance> = by_kind
            .into_iter()
            .filter(|(_, v)| v.len() as u64 >= min_samples)
            .map(|(kind, v)| {
                let samples = v.len() as u64;
                let wins = v.iter().filter(|r| r.realized_pnl.is_some_and(|p| p > Decimal::ZERO)).count() as u64;
                let total: Decimal = v.iter().filter_map(|r| r.realized_pnl).sum();
                StrategyPerformance {
                    kind,
                    samples,
                    win_rate: wins as f64 / samples as f64,
                    avg_profit: total / Decimal::from(samples),
                }
            })
            .collect();

        out.sort_by(|a, b| b.win_rate.partial_cmp(&a.win_rate).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    /// Performance attribution bucketed by edge source (opportunity kind).
    pub async fn attribution_by_edge_source(&self, window: StatsWindow) -> Result<Vec<StrategyPerformance>> {
        self.get_best_strategies(window, 1).await
    }

    /// Performance bucketed by hour-of-day the opportunity was discovered.
    pub async fn attribution_by_hour(&self, window: StatsWindow) -> Result<Vec<(u32, u64, f64)>> {
        self.bucket_by(window, |r| r.discovered_at.format("%H").to_string().parse().unwrap_or(0))
    }

    /// Performance bucketed by day-of-week the opportunity was discovered.
    pub async fn attribution_by_day(&self, window: StatsWindow) -> Result<Vec<(u32, u64, f64)>> {
        self.bucket_by(window, |r| r.discovered_at.format("%u").to_string().parse().unwrap_or(0))
    }

    /// Performance bucketed by edge-percent decile (0-9: 0-10%, 10-20%, ...).
    pub async fn attribution_by_edge_bucket(&self, window: StatsWindow) -> Result<Vec<(u32, u64, f64)>> {
        self.bucket_by(window, |r| {
            let edge: f64 = r.edge_pct.to_string().parse().unwrap_or(0.0);
            (edge / 10.0).floor().clamp(0.0, 9.0) as u32
        })
    }

    /// Performance bucketed by liquidity decile ($0-5k, $5-10k, ... capped).
    pub async fn attribution_by_liquidity_bucket(&self, window: StatsWindow) -> Result<Vec<(u32, u64, f64)>> {
        self.bucket_by(window, |r| {
            let liquidity: f64 = r.total_liquidity.to_string().parse().unwrap_or(0.0);
            (liquidity / 5_000.0).floor().clamp(0.0, 9.0) as u32
        })
    }

    /// Performance bucketed by confidence decile.
    pub async fn attribution_by_confidence_bucket(&self, window: StatsWindow) -> Result<Vec<(u32, u64, f64)>> {
        self.bucket_by(window, |r| (r.confidence * 10.0).floor().clamp(0.0, 9.0) as u32)
    }

    fn bucket_key<F>(records: &[OpportunityRecord], keyer: F) -> Vec<(u32, u64, f64)>
    where
        F: Fn(&OpportunityRecord) -> u32,
    {
        let mut buckets: std::collections::BTreeMap<u32, (u64, u64)> = std::collections::BTreeMap::new();
        for r in records.iter().filter(|r| r.realized_pnl.is_some()) {
            let key = keyer(r);
            let entry = buckets.entry(key).or_insert((0, 0));
            entry.0 += 1;
            if r.realized_pnl.is_some_and(|p| p > Decimal::ZERO) {
                entry.1 += 1;
            }
        }
        buckets.into_iter().map(|(k, (n, w))| (k, n, w as f64 / n.max(1) as f64)).collect()
    }

    async fn bucket_by<F>(&self, window: StatsWindow, keyer: F) -> Result<Vec<(u32, u64, f64)>>
    where
        F: Fn(&OpportunityRecord) -> u32,
    {
        let records = self.store.list_opportunities(None, window).await?;
        Ok(Self::bucket_key(&records, keyer))
    }

    /// Decay curve: win rate as a function of age-at-close, bucketed into
    /// 5-minute windows.
    pub async fn decay_curve(&self, window: StatsWindow) -> Result<Vec<DecayBucket>> {
        let records = self.store.list_opportunities(None, window).await?;
        let mut buckets: std::collections::BTreeMap<i64, (u64, u64)> = std::collections::BTreeMap::new();
        for r in records.iter().filter(|r| r.realized_pnl.is_some()) {
            let closed_at = match r.status {
                OpportunityStatus::Closed => r.expires_at,
                _ => continue,
            };
            let age = (closed_at - r.discovered_at).num_seconds();
            let floor = (age / 300) * 300;
            let entry = buckets.entry(floor).or_insert((0, 0));
            entry.0 += 1;
            if r.realized_pnl.is_some_and(|p| p > Decimal::ZERO) {
                entry.1 += 1;
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(floor, (n, w))| DecayBucket { age_secs_floor: floor, samples: n, win_rate: w as f64 / n.max(1) as f64 })
            .collect())
    }

    pub async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        self.store.cleanup(older_than_days).await
    }

    pub async fn correlation_rules(&self) -> Result<Vec<crate::ports::CorrelationRule>> {
        self.store.correlation_rules().await
    }

    /// Best-effort wrapper: logs and swallows a failure instead of
    /// propagating, matching the engine's own call-site contract (§7) so
    /// callers that don't want to handle `Result` can opt into it directly.
    pub async fn try_record_discovery(&self, opp: &Opportunity) {
        if let Err(e) = self.record_discovery(opp).await {
            warn!(opportunity_id = %opp.id, error = %e, "failed to record opportunity discovery");
        }
    }
}

#[allow(dead_code)]
fn _unused_timestamp_hint(_: DateTime<Utc>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketKey;
    use crate::opportunity::{Action, NormalizedSide, OpportunityKind, OpportunityLeg};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[derive(Default)]
    struct MemAnalyticsStore {
        opportunities: Mutex<Vec<OpportunityRecord>>,
        pairs: Mutex<Vec<PlatformPairStats>>,
    }

    #[async_trait]
    impl AnalyticsStore for MemAnalyticsStore {
        async fn record_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
            self.opportunities.lock().push(record.clone());
            Ok(())
        }
        async fn update_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
            let mut rows = self.opportunities.lock();
            if let Some(existing) = rows.iter_mut().find(|r| r.id == record.id) {
                *existing = record.clone();
            } else {
                rows.push(record.clone());
            }
            Ok(())
        }
        async fn get_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRecord>> {
            Ok(self.opportunities.lock().iter().find(|r| r.id == id).cloned())
        }
        async fn list_opportunities(&self, status: Option<OpportunityStatus>, _window: StatsWindow) -> Result<Vec<OpportunityRecord>> {
            Ok(self
                .opportunities
                .lock()
                .iter()
                .filter(|r| status.is_none_or(|s| r.status == s))
                .cloned()
                .collect())
        }
        async fn upsert_platform_pair(&self, a: &str, b: &str, f: Box<dyn FnOnce(&mut PlatformPairStats) + Send>) -> Result<()> {
            let mut pairs = self.pairs.lock();
            if let Some(existing) = pairs.iter_mut().find(|p| p.platform_a == a && p.platform_b == b) {
                f(existing);
            } else {
                let mut stats = PlatformPairStats { platform_a: a.into(), platform_b: b.into(), ..Default::default() };
                f(&mut stats);
                pairs.push(stats);
            }
            Ok(())
        }
        async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>> {
            Ok(self.pairs.lock().clone())
        }
        async fn record_attribution(&self, _record: &AttributionRecord) -> Result<()> {
            Ok(())
        }
        async fn correlation_rules(&self) -> Result<Vec<crate::ports::CorrelationRule>> {
            Ok(Vec::new())
        }
        async fn cleanup(&self, _older_than_days: i64) -> Result<u64> {
            Ok(0)
        }
    }

    fn opportunity() -> Opportunity {
        let now = Utc::now();
        Opportunity {
            id: Uuid::new_v4(),
            kind: OpportunityKind::CrossPlatform,
            markets: vec![
                OpportunityLeg {
                    market: MarketKey::new("v1", "m"),
                    outcome_label: "Yes".into(),
                    normalized: NormalizedSide::Yes,
                    action: Action::Buy,
                    price: dec!(0.4),
                    liquidity: dec!(1000),
                    volume_24h: dec!(1000),
                    recommended_size: Decimal::ZERO,
                },
                OpportunityLeg {
                    market: MarketKey::new("v2", "m"),
                    outcome_label: "No".into(),
                    normalized: NormalizedSide::No,
                    action: Action::Buy,
                    price: dec!(0.45),
                    liquidity: dec!(1000),
                    volume_24h: dec!(1000),
                    recommended_size: Decimal::ZERO,
                },
            ],
            edge_pct: dec!(15.0),
            profit_per_100: dec!(15.0),
            score: 80.0,
            confidence: 0.9,
            kelly_fraction: 0.1,
            estimated_slippage: 0.01,
            total_liquidity: dec!(2000),
            execution: None,
            discovered_at: now,
            expires_at: now + chrono::Duration::minutes(5),
            status: OpportunityStatus::Active,
            outcome: None,
            match_verification: None,
        }
    }

    #[tokio::test]
    async fn record_discovery_then_get_stats() {
        let store = Arc::new(MemAnalyticsStore::default());
        let analytics = Analytics::new(store);
        let opp = opportunity();
        analytics.record_discovery(&opp).await.unwrap();
        let stats = analytics.get_stats(StatsWindow::AllTime).await.unwrap();
        assert_eq!(stats.total_opportunities, 1);
    }

    #[tokio::test]
    async fn record_outcome_updates_platform_pair_stats() {
        let store = Arc::new(MemAnalyticsStore::default());
        let analytics = Analytics::new(store);
        let mut opp = opportunity();
        analytics.record_discovery(&opp).await.unwrap();
        opp.status = OpportunityStatus::Closed;
        analytics.record_outcome(&opp, dec!(5.0)).await.unwrap();

        let pairs = analytics.get_platform_pairs().await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].wins, 1);
        assert_eq!(pairs[0].total_profit, dec!(5.0));
    }

    #[tokio::test]
    async fn best_strategies_respects_min_samples() {
        let store = Arc::new(MemAnalyticsStore::default());
        let analytics = Analytics::new(store);
        let mut opp = opportunity();
        opp.status = OpportunityStatus::Closed;
        analytics.record_discovery(&opp).await.unwrap();
        analytics.record_outcome(&opp, dec!(3.0)).await.unwrap();

        let none = analytics.get_best_strategies(StatsWindow::AllTime, 5).await.unwrap();
        assert!(none.is_empty());

        let some = analytics.get_best_strategies(StatsWindow::AllTime, 1).await.unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].win_rate, 1.0);
    }
}
