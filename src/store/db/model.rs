//! Diesel row types for the sqlite store. Money/decimal columns round-trip
//! as text to avoid floating-point drift; timestamps round-trip as RFC3339.

use diesel::prelude::*;

use super::schema::{correlation_rules, market_links, opportunities, opportunity_attribution, platform_pair_stats};

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = market_links)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketLinkRow {
    pub id: String,
    pub market_a: String,
    pub market_b: String,
    pub confidence: f64,
    pub source: String,
    pub created_at: String,
    pub metadata: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = opportunities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OpportunityRow {
    pub id: String,
    pub kind: String,
    pub markets_json: String,
    pub edge_pct: String,
    pub profit_per_100: String,
    pub score: f64,
    pub confidence: f64,
    pub total_liquidity: String,
    pub status: String,
    pub discovered_at: String,
    pub expires_at: String,
    pub taken: bool,
    pub fill_prices_json: Option<String>,
    pub realized_pnl: Option<String>,
    pub closed_at: Option<String>,
    pub notes: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = platform_pair_stats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlatformPairRow {
    pub platform_a: String,
    pub platform_b: String,
    pub total_opportunities: i64,
    pub taken: i64,
    pub wins: i64,
    pub total_profit: String,
    pub avg_edge: String,
    pub last_updated: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = opportunity_attribution)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttributionRow {
    pub opportunity_id: String,
    pub edge_source: String,
    pub discovered_at: String,
    pub executed_at: Option<String>,
    pub closed_at: Option<String>,
    pub expected_slippage: f64,
    pub actual_slippage: Option<f64>,
    pub fill_rate: Option<f64>,
    pub execution_time_ms: Option<i64>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = correlation_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CorrelationRuleRow {
    pub id: String,
    pub pattern_a: String,
    pub pattern_b: String,
    pub rule_type: String,
    pub correlation: f64,
    pub description: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_link_row_is_insertable() {
        let _row = MarketLinkRow {
            id: "1".into(),
            market_a: "kalshi:a".into(),
            market_b: "polymarket:b".into(),
            confidence: 0.9,
            source: "auto".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            metadata: None,
        };
    }

    #[test]
    fn opportunity_row_is_insertable() {
        let _row = OpportunityRow {
            id: "1".into(),
            kind: "crossplatform".into(),
            markets_json: "[]".into(),
            edge_pct: "5.0".into(),
            profit_per_100: "5.0".into(),
            score: 80.0,
            confidence: 0.9,
            total_liquidity: "1000".into(),
            status: "active".into(),
            discovered_at: "2026-01-01T00:00:00Z".into(),
            expires_at: "2026-01-01T00:05:00Z".into(),
            taken: false,
            fill_prices_json: None,
            realized_pnl: None,
            closed_at: None,
            notes: None,
        };
    }

    #[test]
    fn platform_pair_row_default() {
        let row = PlatformPairRow { platform_a: "kalshi".into(), platform_b: "polymarket".into(), ..Default::default() };
        assert_eq!(row.total_opportunities, 0);
    }
}
