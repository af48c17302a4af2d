//! In-memory `MarketFeed` for tests and `arbitrex scan --mock` demos.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::market::Market;
use crate::ports::{MarketFeed, PriceUpdate};

/// Holds a fixed catalogue of markets per venue and replays queued price
/// updates verbatim when `subscribe` is called. Deterministic, so it makes
/// a good fixture for engine-level tests.
#[derive(Default)]
pub struct MockMarketFeed {
    markets: RwLock<Vec<Market>>,
    updates: RwLock<Vec<PriceUpdate>>,
}

impl MockMarketFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_markets(markets: Vec<Market>) -> Self {
        Self { markets: RwLock::new(markets), updates: RwLock::default() }
    }

    pub fn push_market(&self, market: Market) {
        self.markets.write().push(market);
    }

    pub fn queue_update(&self, update: PriceUpdate) {
        self.updates.write().push(update);
    }
}

#[async_trait]
impl MarketFeed for MockMarketFeed {
    async fn search_markets(&self, _query: &str, venue: &str, _deadline: std::time::Duration) -> Result<Vec<Market>> {
        Ok(self.markets.read().iter().filter(|m| m.venue.eq_ignore_ascii_case(venue)).cloned().collect())
    }

    fn subscribe(&self, venues: &[String]) -> mpsc::Receiver<PriceUpdate> {
        let (tx, rx) = mpsc::channel(128);
        let updates: Vec<PriceUpdate> = self
            .updates
            .read()
            .iter()
            .filter(|u| venues.iter().any(|v| v.eq_ignore_ascii_case(&u.venue)))
            .cloned()
            .collect();
        tokio::spawn(async move {
            for update in updates {
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn market(venue: &str) -> Market {
        Market {
            venue: venue.into(),
            market_id: "1".into(),
            question: "Will X happen?".into(),
            slug: None,
            outcomes: vec![crate::market::Outcome::new("Yes", dec!(0.5), dec!(100))],
            volume_24h: dec!(100),
            liquidity: dec!(100),
            end_date: None,
        }
    }

    #[tokio::test]
    async fn search_markets_filters_by_venue() {
        let feed = MockMarketFeed::with_markets(vec![market("kalshi"), market("polymarket")]);
        let found = feed.search_markets("", "kalshi", std::time::Duration::from_secs(1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].venue, "kalshi");
    }

    #[tokio::test]
    async fn subscribe_replays_queued_updates_for_requested_venues() {
        let feed = MockMarketFeed::new();
        feed.queue_update(PriceUpdate {
            venue: "kalshi".into(),
            market_id: "1".into(),
            outcome_id: None,
            price: dec!(0.6),
            previous_price: Some(dec!(0.5)),
            timestamp: Utc::now(),
        });
        feed.queue_update(PriceUpdate {
            venue: "polymarket".into(),
            market_id: "1".into(),
            outcome_id: None,
            price: dec!(0.4),
            previous_price: None,
            timestamp: Utc::now(),
        });
        let mut rx = feed.subscribe(&["kalshi".to_string()]);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.venue, "kalshi");
        assert!(rx.recv().await.is_none());
    }
}
