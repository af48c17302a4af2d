//! SQLite-backed `Store` adapter, feature-gated behind `sqlite`.
//!
//! Uses a blocking diesel connection pool via `spawn_blocking`, the same
//! pattern the teacher uses for its own sqlite persistence adapter: async
//! trait methods that hand the actual query off to a blocking thread.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::market::MarketKey;
use crate::opportunity::OpportunityStatus;
use crate::ports::{
    AnalyticsStore, AttributionRecord, CorrelationRule, LinkRecord, LinkSource, LinkStore, OpportunityRecord, PlatformPairStats,
    StatsWindow,
};

use super::db::model::{AttributionRow, CorrelationRuleRow, MarketLinkRow, OpportunityRow, PlatformPairRow};
use super::db::schema::{correlation_rules, market_links, opportunities, opportunity_attribution, platform_pair_stats};
use super::db::DbPool;

fn status_to_str(status: OpportunityStatus) -> &'static str {
    match status {
        OpportunityStatus::Active => "active",
        OpportunityStatus::Taken => "taken",
        OpportunityStatus::Expired => "expired",
        OpportunityStatus::Closed => "closed",
    }
}

fn status_from_str(s: &str) -> OpportunityStatus {
    match s {
        "taken" => OpportunityStatus::Taken,
        "expired" => OpportunityStatus::Expired,
        "closed" => OpportunityStatus::Closed,
        _ => OpportunityStatus::Active,
    }
}

fn source_to_str(source: LinkSource) -> &'static str {
    match source {
        LinkSource::Manual => "manual",
        LinkSource::Auto => "auto",
        LinkSource::Semantic => "semantic",
        LinkSource::Slug => "slug",
    }
}

fn source_from_str(s: &str) -> LinkSource {
    match s {
        "manual" => LinkSource::Manual,
        "semantic" => LinkSource::Semantic,
        "slug" => LinkSource::Slug,
        _ => LinkSource::Auto,
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

impl From<&LinkRecord> for MarketLinkRow {
    // Persists `(market_a, market_b)` in sorted order so the table's
    // `UNIQUE (market_a, market_b)` constraint enforces "unique(a,b) after
    // sort" regardless of which order the caller passed the pair in.
    fn from(r: &LinkRecord) -> Self {
        let (a, b) = if r.market_a <= r.market_b { (&r.market_a, &r.market_b) } else { (&r.market_b, &r.market_a) };
        Self {
            id: r.id.clone(),
            market_a: a.as_str().to_string(),
            market_b: b.as_str().to_string(),
            confidence: r.confidence,
            source: source_to_str(r.source).to_string(),
            created_at: r.created_at.to_rfc3339(),
            metadata: r.metadata.clone(),
        }
    }
}

impl From<MarketLinkRow> for LinkRecord {
    fn from(r: MarketLinkRow) -> Self {
        Self {
            id: r.id,
            market_a: MarketKey::from(r.market_a.as_str()),
            market_b: MarketKey::from(r.market_b.as_str()),
            confidence: r.confidence,
            source: source_from_str(&r.source),
            created_at: ts(&r.created_at),
            metadata: r.metadata,
        }
    }
}

impl From<&OpportunityRecord> for OpportunityRow {
    fn from(r: &OpportunityRecord) -> Self {
        Self {
            id: r.id.to_string(),
            kind: r.kind.clone(),
            markets_json: r.markets_json.clone(),
            edge_pct: r.edge_pct.to_string(),
            profit_per_100: r.profit_per_100.to_string(),
            score: r.score,
            confidence: r.confidence,
            total_liquidity: r.total_liquidity.to_string(),
            status: status_to_str(r.status).to_string(),
            discovered_at: r.discovered_at.to_rfc3339(),
            expires_at: r.expires_at.to_rfc3339(),
            taken: r.taken,
            fill_prices_json: r.fill_prices_json.clone(),
            realized_pnl: r.realized_pnl.map(|d| d.to_string()),
            closed_at: r.closed_at.map(|d| d.to_rfc3339()),
            notes: r.notes.clone(),
        }
    }
}

impl From<OpportunityRow> for OpportunityRecord {
    fn from(r: OpportunityRow) -> Self {
        Self {
            id: Uuid::parse_str(&r.id).unwrap_or_default(),
            kind: r.kind,
            markets_json: r.markets_json,
            edge_pct: dec(&r.edge_pct),
            profit_per_100: dec(&r.profit_per_100),
            score: r.score,
            confidence: r.confidence,
            total_liquidity: dec(&r.total_liquidity),
            status: status_from_str(&r.status),
            discovered_at: ts(&r.discovered_at),
            expires_at: ts(&r.expires_at),
            taken: r.taken,
            fill_prices_json: r.fill_prices_json,
            realized_pnl: r.realized_pnl.map(|s| dec(&s)),
            closed_at: r.closed_at.map(|s| ts(&s)),
            notes: r.notes,
        }
    }
}

impl From<PlatformPairRow> for PlatformPairStats {
    fn from(r: PlatformPairRow) -> Self {
        Self {
            platform_a: r.platform_a,
            platform_b: r.platform_b,
            total_opportunities: r.total_opportunities as u64,
            taken: r.taken as u64,
            wins: r.wins as u64,
            total_profit: dec(&r.total_profit),
            avg_edge: dec(&r.avg_edge),
            last_updated: r.last_updated.map(|s| ts(&s)),
        }
    }
}

impl From<&PlatformPairStats> for PlatformPairRow {
    fn from(s: &PlatformPairStats) -> Self {
        Self {
            platform_a: s.platform_a.clone(),
            platform_b: s.platform_b.clone(),
            total_opportunities: s.total_opportunities as i64,
            taken: s.taken as i64,
            wins: s.wins as i64,
            total_profit: s.total_profit.to_string(),
            avg_edge: s.avg_edge.to_string(),
            last_updated: s.last_updated.map(|d| d.to_rfc3339()),
        }
    }
}

impl From<&AttributionRecord> for AttributionRow {
    fn from(r: &AttributionRecord) -> Self {
        Self {
            opportunity_id: r.opportunity_id.to_string(),
            edge_source: r.edge_source.clone(),
            discovered_at: r.discovered_at.to_rfc3339(),
            executed_at: r.executed_at.map(|d| d.to_rfc3339()),
            closed_at: r.closed_at.map(|d| d.to_rfc3339()),
            expected_slippage: r.expected_slippage,
            actual_slippage: r.actual_slippage,
            fill_rate: r.fill_rate,
            execution_time_ms: r.execution_time_ms.map(|v| v as i64),
        }
    }
}

impl From<CorrelationRuleRow> for CorrelationRule {
    fn from(r: CorrelationRuleRow) -> Self {
        Self {
            id: r.id,
            pattern_a: r.pattern_a,
            pattern_b: r.pattern_b,
            rule_type: r.rule_type,
            correlation: r.correlation,
            description: r.description,
            created_at: ts(&r.created_at),
        }
    }
}

/// SQLite-backed persistence, behind a blocking connection pool.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Opens (and, via embedded migrations, prepares) the database at
    /// `database_url`.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be built.
    pub fn connect(database_url: &str) -> Result<Self> {
        Ok(Self { pool: super::db::create_pool(database_url)? })
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| StoreError::Connection(e.to_string()).into())
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn save_link(&self, link: &LinkRecord) -> Result<()> {
        let row = MarketLinkRow::from(link);
        let mut conn = self.conn()?;
        tokio::task::block_in_place(|| {
            diesel::insert_into(market_links::table)
                .values(&row)
                .on_conflict(market_links::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(())
    }

    async fn delete_link(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let id = id.to_string();
        let affected = tokio::task::block_in_place(|| {
            diesel::delete(market_links::table.filter(market_links::id.eq(&id)))
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(affected > 0)
    }

    async fn all_links(&self) -> Result<Vec<LinkRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<MarketLinkRow> = tokio::task::block_in_place(|| {
            market_links::table.load(&mut conn).map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(rows.into_iter().map(LinkRecord::from).collect())
    }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
    async fn record_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
        let row = OpportunityRow::from(record);
        let mut conn = self.conn()?;
        tokio::task::block_in_place(|| {
            diesel::insert_into(opportunities::table)
                .values(&row)
                .on_conflict(opportunities::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(())
    }

    async fn update_opportunity(&self, record: &OpportunityRecord) -> Result<()> {
        self.record_opportunity(record).await
    }

    async fn get_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRecord>> {
        let mut conn = self.conn()?;
        let id = id.to_string();
        let row: Option<OpportunityRow> = tokio::task::block_in_place(|| {
            opportunities::table
                .filter(opportunities::id.eq(&id))
                .first(&mut conn)
                .optional()
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(row.map(OpportunityRecord::from))
    }

    async fn list_opportunities(&self, status: Option<OpportunityStatus>, window: StatsWindow) -> Result<Vec<OpportunityRecord>> {
        let mut conn = self.conn()?;
        let cutoff = match window {
            StatsWindow::LastHour => Some(Utc::now() - chrono::Duration::hours(1)),
            StatsWindow::LastDay => Some(Utc::now() - chrono::Duration::days(1)),
            StatsWindow::LastWeek => Some(Utc::now() - chrono::Duration::weeks(1)),
            StatsWindow::AllTime => None,
        };
        let rows: Vec<OpportunityRow> = tokio::task::block_in_place(|| {
            let mut query = opportunities::table.into_boxed();
            if let Some(s) = status {
                query = query.filter(opportunities::status.eq(status_to_str(s)));
            }
            if let Some(c) = cutoff {
                query = query.filter(opportunities::discovered_at.ge(c.to_rfc3339()));
            }
            query.load(&mut conn).map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(rows.into_iter().map(OpportunityRecord::from).collect())
    }

    async fn upsert_platform_pair(&self, a: &str, b: &str, f: Box<dyn FnOnce(&mut PlatformPairStats) + Send>) -> Result<()> {
        let mut conn = self.conn()?;
        let (a, b) = (a.to_string(), b.to_string());
        tokio::task::block_in_place(|| {
            let existing: Option<PlatformPairRow> = platform_pair_stats::table
                .filter(platform_pair_stats::platform_a.eq(&a))
                .filter(platform_pair_stats::platform_b.eq(&b))
                .first(&mut conn)
                .optional()
                .map_err(|e| StoreError::Query(e.to_string()))?;

            let mut stats = existing.map(PlatformPairStats::from).unwrap_or(PlatformPairStats {
                platform_a: a.clone(),
                platform_b: b.clone(),
                ..Default::default()
            });
            f(&mut stats);
            let row = PlatformPairRow::from(&stats);

            diesel::insert_into(platform_pair_stats::table)
                .values(&row)
                .on_conflict((platform_pair_stats::platform_a, platform_pair_stats::platform_b))
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(())
    }

    async fn get_platform_pairs(&self) -> Result<Vec<PlatformPairStats>> {
        let mut conn = self.conn()?;
        let rows: Vec<PlatformPairRow> = tokio::task::block_in_place(|| {
            platform_pair_stats::table.load(&mut conn).map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(rows.into_iter().map(PlatformPairStats::from).collect())
    }

    async fn record_attribution(&self, record: &AttributionRecord) -> Result<()> {
        let row = AttributionRow::from(record);
        let mut conn = self.conn()?;
        tokio::task::block_in_place(|| {
            diesel::insert_into(opportunity_attribution::table)
                .values(&row)
                .on_conflict(opportunity_attribution::opportunity_id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(())
    }

    async fn correlation_rules(&self) -> Result<Vec<CorrelationRule>> {
        let mut conn = self.conn()?;
        let rows: Vec<CorrelationRuleRow> = tokio::task::block_in_place(|| {
            correlation_rules::table.load(&mut conn).map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(rows.into_iter().map(CorrelationRule::from).collect())
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<u64> {
        let mut conn = self.conn()?;
        let cutoff = (Utc::now() - chrono::Duration::days(older_than_days)).to_rfc3339();
        let affected = tokio::task::block_in_place(|| {
            let stale_ids: Vec<String> = opportunities::table
                .filter(opportunities::discovered_at.lt(&cutoff))
                .select(opportunities::id)
                .load(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))?;

            diesel::delete(opportunity_attribution::table.filter(opportunity_attribution::opportunity_id.eq_any(&stale_ids)))
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))?;

            diesel::delete(opportunities::table.filter(opportunities::discovered_at.lt(&cutoff)))
                .execute(&mut conn)
                .map_err(|e| StoreError::Query(e.to_string()))
        })?;
        Ok(affected as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketKey;
    use rust_decimal_macros::dec;

    // `connect` runs the embedded migrations, so a fresh `:memory:` handle
    // already has every table from `migrations/`.
    fn store() -> SqliteStore {
        SqliteStore::connect(":memory:").unwrap()
    }

    #[tokio::test]
    async fn save_then_load_link_round_trips() {
        let store = store();
        let link = LinkRecord {
            id: "id-1".into(),
            market_a: MarketKey::new("kalshi", "a"),
            market_b: MarketKey::new("polymarket", "b"),
            confidence: 0.95,
            source: LinkSource::Auto,
            created_at: Utc::now(),
            metadata: None,
        };
        store.save_link(&link).await.unwrap();
        let all = store.all_links().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].confidence, 0.95);
    }

    #[tokio::test]
    async fn upsert_platform_pair_persists_across_calls() {
        let store = store();
        store
            .upsert_platform_pair("kalshi", "polymarket", Box::new(|s: &mut PlatformPairStats| s.total_opportunities += 1))
            .await
            .unwrap();
        store
            .upsert_platform_pair("kalshi", "polymarket", Box::new(|s: &mut PlatformPairStats| s.total_opportunities += 1))
            .await
            .unwrap();
        let pairs = store.get_platform_pairs().await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].total_opportunities, 2);
    }

    #[tokio::test]
    async fn record_and_fetch_opportunity() {
        let store = store();
        let rec = OpportunityRecord {
            id: Uuid::new_v4(),
            kind: "internal".into(),
            markets_json: "[]".into(),
            edge_pct: dec!(2.0),
            profit_per_100: dec!(2.0),
            score: 70.0,
            confidence: 0.8,
            total_liquidity: dec!(1000),
            status: OpportunityStatus::Active,
            discovered_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
            taken: false,
            fill_prices_json: None,
            realized_pnl: None,
            closed_at: None,
            notes: None,
        };
        store.record_opportunity(&rec).await.unwrap();
        let fetched = store.get_opportunity(rec.id).await.unwrap().unwrap();
        assert_eq!(fetched.score, 70.0);
        assert_eq!(fetched.status, OpportunityStatus::Active);
    }
}
