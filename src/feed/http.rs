//! HTTP-polling `MarketFeed` backed by `reqwest`.
//!
//! Each venue is reachable at a configured base URL serving
//! `GET {base}/markets?query=...` → `[WireMarket]` JSON. There is no
//! standard prediction-market wire protocol across venues, so this adapter
//! expects a venue-side shim that normalizes to [`WireMarket`]; it is
//! deliberately the simplest possible contract rather than a vendor SDK.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{FeedError, Result};
use crate::market::{Market, Outcome};
use crate::ports::{MarketFeed, PriceUpdate};

#[derive(Debug, Deserialize)]
struct WireOutcome {
    name: String,
    price: Decimal,
    #[serde(default)]
    volume_24h: Decimal,
}

#[derive(Debug, Deserialize)]
struct WireMarket {
    market_id: String,
    question: String,
    #[serde(default)]
    slug: Option<String>,
    outcomes: Vec<WireOutcome>,
    #[serde(default)]
    volume_24h: Decimal,
    #[serde(default)]
    liquidity: Decimal,
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
}

impl WireMarket {
    fn into_market(self, venue: &str) -> Market {
        Market {
            venue: venue.to_string(),
            market_id: self.market_id,
            question: self.question,
            slug: self.slug,
            outcomes: self.outcomes.into_iter().map(|o| Outcome::new(o.name, o.price, o.volume_24h)).collect(),
            volume_24h: self.volume_24h,
            liquidity: self.liquidity,
            end_date: self.end_date,
        }
    }
}

/// Polls each venue's HTTP endpoint for market search, and (for
/// `subscribe`) re-polls on a fixed interval and emits a [`PriceUpdate`]
/// for every outcome whose price moved.
pub struct HttpMarketFeed {
    client: reqwest::Client,
    venue_urls: HashMap<String, String>,
    poll_interval: Duration,
}

impl HttpMarketFeed {
    #[must_use]
    pub fn new(venue_urls: HashMap<String, String>, poll_interval: Duration) -> Self {
        Self { client: reqwest::Client::new(), venue_urls, poll_interval }
    }

    fn base_url(&self, venue: &str) -> Option<&str> {
        self.venue_urls.get(venue).map(String::as_str)
    }
}

#[async_trait]
impl MarketFeed for HttpMarketFeed {
    async fn search_markets(&self, query: &str, venue: &str, deadline: Duration) -> Result<Vec<Market>> {
        let Some(base) = self.base_url(venue) else {
            return Ok(Vec::new());
        };

        let request = self.client.get(format!("{base}/markets")).query(&[("query", query)]).timeout(deadline);

        let response = match request.send().await {
            Ok(r) => r,
            Err(source) if source.is_timeout() => return Err(FeedError::Timeout { venue: venue.to_string() }.into()),
            Err(source) => return Err(FeedError::Request { venue: venue.to_string(), source }.into()),
        };

        let wire: Vec<WireMarket> = response
            .json()
            .await
            .map_err(|e| FeedError::Malformed { venue: venue.to_string(), reason: e.to_string() })?;

        Ok(wire.into_iter().map(|m| m.into_market(venue)).collect())
    }

    fn subscribe(&self, venues: &[String]) -> mpsc::Receiver<PriceUpdate> {
        let (tx, rx) = mpsc::channel(256);
        let client = self.client.clone();
        let venues: Vec<(String, String)> =
            venues.iter().filter_map(|v| self.base_url(v).map(|u| (v.clone(), u.to_string()))).collect();
        let interval = self.poll_interval;

        tokio::spawn(async move {
            let mut last_prices: HashMap<(String, String, String), Decimal> = HashMap::new();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for (venue, base) in &venues {
                    let response = client.get(format!("{base}/markets")).send().await;
                    let markets: Vec<WireMarket> = match response {
                        Ok(r) => match r.json().await {
                            Ok(m) => m,
                            Err(e) => {
                                warn!(venue, error = %e, "malformed response during subscribe poll");
                                continue;
                            }
                        },
                        Err(e) => {
                            debug!(venue, error = %e, "poll request failed, skipping this tick");
                            continue;
                        }
                    };

                    for market in markets {
                        for outcome in &market.outcomes {
                            let key = (venue.clone(), market.market_id.clone(), outcome.name.clone());
                            let previous = last_prices.insert(key, outcome.price);
                            if previous.is_some_and(|p| p != outcome.price) {
                                let update = PriceUpdate {
                                    venue: venue.clone(),
                                    market_id: market.market_id.clone(),
                                    outcome_id: Some(outcome.name.clone()),
                                    price: outcome.price,
                                    previous_price: previous,
                                    timestamp: Utc::now(),
                                };
                                if tx.send(update).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        rx
    }
}
