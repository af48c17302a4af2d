//! Application wiring: turns a loaded [`Config`] into a running
//! [`OpportunityEngine`] with concrete adapters plugged into its ports.
//!
//! Mirrors the teacher's `app::App` / `infrastructure::bootstrap` split: one
//! place that knows how to construct every collaborator from configuration,
//! kept separate from the CLI layer that drives it.

pub mod config;
pub mod status_file;

pub use config::{Config, FeedBackend, StoreBackend};
pub use status_file::StatusWriter;

use std::sync::Arc;

use crate::breaker::CircuitBreaker;
use crate::engine::OpportunityEngine;
use crate::error::Result;
use crate::feed::{HttpMarketFeed, MockMarketFeed};
use crate::matcher::MarketMatcher;
use crate::ports::{AnalyticsStore, LinkStore, MarketFeed};
use crate::risk::RiskModeler;
use crate::scorer::OpportunityScorer;
use crate::store::MemoryStore;
#[cfg(feature = "sqlite")]
use crate::store::SqliteStore;

/// Everything `main` needs to drive the engine: the engine itself plus a
/// shared handle to the breaker (so the CLI can poll it for status).
pub struct App {
    pub engine: Arc<OpportunityEngine>,
    pub breaker: Arc<CircuitBreaker>,
}

impl App {
    /// Build the full collaborator graph from a loaded config. Does not
    /// start the real-time loop or the breaker's monitoring loop; callers
    /// decide whether this is a one-shot scan or a long-running process.
    pub async fn build(config: &Config) -> Result<Self> {
        let feed: Arc<dyn MarketFeed> = match config.feed.backend {
            FeedBackend::Http => {
                Arc::new(HttpMarketFeed::new(config.feed.venue_urls.clone(), std::time::Duration::from_millis(config.feed.poll_interval_ms)))
            }
            FeedBackend::Mock => Arc::new(MockMarketFeed::new()),
        };

        let (link_store, analytics_store): (Arc<dyn LinkStore>, Arc<dyn AnalyticsStore>) = match config.store.backend {
            StoreBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
            #[cfg(feature = "sqlite")]
            StoreBackend::Sqlite => {
                let store = Arc::new(SqliteStore::connect(&config.store.database_url)?);
                (store.clone(), store)
            }
        };

        let matcher = MarketMatcher::new(config.matcher.clone(), None);
        let scorer = OpportunityScorer::new(config.scorer.clone());
        let risk = RiskModeler::new(config.risk.clone());
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));

        let engine = Arc::new(OpportunityEngine::new(
            config.engine.clone(),
            feed,
            link_store,
            analytics_store,
            matcher,
            scorer,
            risk,
            Arc::clone(&breaker),
            None,
        ));
        engine.load().await?;

        Ok(Self { engine, breaker })
    }
}
