//! `MarketFeed`: the core's only window onto venue market state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::market::Market;

/// A single price tick for one (venue, market, outcome). Implementations
/// may buffer or coalesce updates, but must not reorder updates for a
/// given (venue, marketID).
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    pub venue: String,
    pub market_id: String,
    pub outcome_id: Option<String>,
    pub price: Decimal,
    pub previous_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Fetch active markets for a venue, subject to the caller's deadline.
    /// Transient failures are the caller's responsibility to treat as an
    /// empty result for the cycle, per the engine's error-handling contract.
    async fn search_markets(&self, query: &str, venue: &str, deadline: std::time::Duration) -> Result<Vec<Market>>;

    /// Subscribe to a live price-update stream for the given venues.
    fn subscribe(&self, venues: &[String]) -> mpsc::Receiver<PriceUpdate>;
}
