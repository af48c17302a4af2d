//! `Store`: the small relational-style interface used by the linker and
//! analytics. Table shapes are logical (spec.md §6), not DDL; adapters are
//! free to choose their own schema as long as these operations hold.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::market::MarketKey;
use crate::opportunity::{Opportunity, OpportunityStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    Manual,
    Auto,
    Semantic,
    Slug,
}

/// A row of `market_links(id, market_a, market_b, confidence, source,
/// created_at, metadata)`.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: String,
    pub market_a: MarketKey,
    pub market_b: MarketKey,
    pub confidence: f64,
    pub source: LinkSource,
    pub created_at: DateTime<Utc>,
    /// Free-form provenance (e.g. the matcher similarity/method that
    /// produced an auto/semantic link), stored opaque to the store.
    pub metadata: Option<String>,
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn save_link(&self, link: &LinkRecord) -> Result<()>;
    async fn delete_link(&self, id: &str) -> Result<bool>;
    async fn all_links(&self) -> Result<Vec<LinkRecord>>;
}

/// A row of `opportunities(...)`, flattened for storage.
#[derive(Debug, Clone)]
pub struct OpportunityRecord {
    pub id: Uuid,
    pub kind: String,
    pub markets_json: String,
    pub edge_pct: Decimal,
    pub profit_per_100: Decimal,
    pub score: f64,
    pub confidence: f64,
    pub total_liquidity: Decimal,
    pub status: OpportunityStatus,
    pub discovered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub taken: bool,
    pub fill_prices_json: Option<String>,
    pub realized_pnl: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl OpportunityRecord {
    #[must_use]
    pub fn from_opportunity(opp: &Opportunity) -> Self {
        let fill_prices_json = opp
            .outcome
            .as_ref()
            .map(|o| serde_json::to_string(&o.fill_prices.iter().map(ToString::to_string).collect::<Vec<_>>()).unwrap_or_default());
        Self {
            id: opp.id,
            kind: format!("{:?}", opp.kind).to_lowercase(),
            markets_json: serde_json::to_string(
                &opp.markets.iter().map(|l| l.market.as_str().to_string()).collect::<Vec<_>>(),
            )
            .unwrap_or_default(),
            edge_pct: opp.edge_pct,
            profit_per_100: opp.profit_per_100,
            score: opp.score,
            confidence: opp.confidence,
            total_liquidity: opp.total_liquidity,
            status: opp.status,
            discovered_at: opp.discovered_at,
            expires_at: opp.expires_at,
            taken: opp.outcome.as_ref().is_some_and(|o| o.taken),
            fill_prices_json,
            realized_pnl: opp.outcome.as_ref().and_then(|o| o.realized_pnl),
            closed_at: opp.outcome.as_ref().and_then(|o| o.closed_at),
            notes: opp.outcome.as_ref().and_then(|o| o.notes.clone()),
        }
    }
}

/// Aggregate stats for a pair of venues, `platform_pair_stats(platform_a,
/// platform_b, total_opportunities, taken, wins, total_profit, avg_edge,
/// last_updated)`.
#[derive(Debug, Clone, Default)]
pub struct PlatformPairStats {
    pub platform_a: String,
    pub platform_b: String,
    pub total_opportunities: u64,
    pub taken: u64,
    pub wins: u64,
    pub total_profit: Decimal,
    pub avg_edge: Decimal,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct AttributionRecord {
    pub opportunity_id: Uuid,
    pub edge_source: String,
    pub discovered_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub expected_slippage: f64,
    pub actual_slippage: Option<f64>,
    pub fill_rate: Option<f64>,
    pub execution_time_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CorrelationRule {
    pub id: String,
    pub pattern_a: String,
    pub pattern_b: String,
    pub rule_type: String,
    pub correlation: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Statistics window for aggregate queries.
#[derive(Debug, Clone, Copy)]
pub enum StatsWindow {
    LastHour,
    LastDay,
    LastWeek,
    AllTime,
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn record_opportunity(&self, record: &OpportunityRecord) -> Result<()>;
    async fn update_opportunity(&self, record: &OpportunityRecord) -> Result<()>;
    async fn get_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRecord>>;
    async fn list_opportunities(&self, status: Option<OpportunityStatus>, window: StatsWindow) -> Result<Vec<OpportunityRecord>>;

    async fn upsert_platform_pair(&self, a: &str, b: &str, f: Box<dyn FnOnce(&mut PlatformPairStats) + Send>) -> Result<()>;
    async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>>;

    async fn record_attribution(&self, record: &AttributionRecord) -> Result<()>;

    async fn correlation_rules(&self) -> Result<Vec<CorrelationRule>>;

    /// Delete opportunity/attribution rows older than `older_than_days`.
    async fn cleanup(&self, older_than_days: i64) -> Result<u64>;
}

/// Composed persistence capability; adapters typically implement both
/// halves over the same backing connection.
pub trait Store: LinkStore + AnalyticsStore {}
impl<T: LinkStore + AnalyticsStore> Store for T {}
