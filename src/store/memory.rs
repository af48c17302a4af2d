//! In-memory `Store` adapter — ephemeral deployments and tests.
//!
//! Mirrors the teacher's `core/store/memory.rs` shape: a
//! `parking_lot::RwLock`-guarded map per table, no background tasks, no
//! persistence across restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::opportunity::OpportunityStatus;
use crate::ports::{
    AnalyticsStore, AttributionRecord, CorrelationRule, LinkRecord, LinkStore, OpportunityRecord, PlatformPairStats, StatsWindow,
};

fn window_cutoff(window: StatsWindow) -> Option<DateTime<Utc>> {
    match window {
        StatsWindow::LastHour => Some(Utc::now() - Duration::hours(1)),
        StatsWindow::LastDay => Some(Utc::now() - Duration::days(1)),
        StatsWindow::LastWeek => Some(Utc::now() - Duration::weeks(1)),
        StatsWindow::AllTime => None,
    }
}

/// In-memory store for tests and single-process/ephemeral deployments.
#[derive(Default)]
pub struct MemoryStore {
    links: RwLock<HashMap<String, LinkRecord>>,
    opportunities: RwLock<HashMap<Uuid, OpportunityRecord>>,
    platform_pairs: RwLock<HashMap<(String, String), PlatformPairStats>>,
    attributions: RwLock<HashMap<Uuid, AttributionRecord>>,
    correlation_rules: RwLock<Vec<CorrelationRule>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed built-in correlation rules (elections, BTC-price deadlines,
    /// Fed-rate decisions, ...) at construction, per Design Notes §9's
    /// "expose them as pluggable predicates rather than hard-code rule
    /// lists" — callers provide the table, the store only stores it.
    #[must_use]
    pub fn with_correlation_rules(rules: Vec<CorrelationRule>) -> Self {
        Self { correlation_rules: RwLock::new(rules), ..Self::default() }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn save_link(&self, link: &LinkRecord) -> Result<()> {
        // Keyed by the record's own `id` (callers, i.e. `MarketLinker`,
        // already derive it from the sorted market pair), matching
        // `SqliteStore`'s keying and making `delete_link(&link.id)` work.
        self.links.write().insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn delete_link(&self, id: &str) -> Result<bool> {
        Ok(self.links.write().remove(id).is_some())
    }

    async fn all_links(&self) -> Result<Vec<LinkRecord>> {
        Ok(self.links.read().values().cloned().collect())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn record_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
        self.opportunities.write().insert(record.id, record.clone());
        Ok(())
    }

    async fn update_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
        self.opportunities.write().insert(record.id, record.clone());
        Ok(())
    }

    async fn get_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRecord>> {
        Ok(self.opportunities.read().get(&id).cloned())
    }

    async fn list_opportunities(&self, status: Option<OpportunityStatus>, window: StatsWindow) -> Result<Vec<OpportunityRecord>> {
        let cutoff = window_cutoff(window);
        Ok(self
            .opportunities
            .read()
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .filter(|r| cutoff.is_none_or(|c| r.discovered_at >= c))
            .cloned()
            .collect())
    }

    async fn upsert_platform_pair(&self, a: &str, b: &str, f: Box<dyn FnOnce(&mut PlatformPairStats) + Send>) -> Result<()> {
        let mut pairs = self.platform_pairs.write();
        let entry = pairs.entry((a.to_string(), b.to_string())).or_insert_with(|| PlatformPairStats {
            platform_a: a.to_string(),
            platform_b: b.to_string(),
            ..Default::default()
        });
        f(entry);
        Ok(())
    }

    async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>> {
        Ok(self.platform_pairs.read().values().cloned().collect())
    }

    async fn record_attribution(&self, record: &AttributionRecord) -> Result<()> {
        self.attributions.write().insert(record.opportunity_id, record.clone());
        Ok(())
    }

    async fn correlation_rules(&self) -> Result<Vec<CorrelationRule>> {
        Ok(self.correlation_rules.read().clone())
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let mut opportunities = self.opportunities.write();
        let before = opportunities.len();
        opportunities.retain(|_, r| r.discovered_at >= cutoff);
        let removed = (before - opportunities.len()) as u64;

        let mut attributions = self.attributions.write();
        attributions.retain(|id, _| opportunities.contains_key(id));

        Ok(removed)
    }
}
