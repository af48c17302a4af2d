//! Shared fixtures for the integration suite: builders for `Market` and a
//! fully-wired `OpportunityEngine` over in-memory collaborators, mirroring
//! the teacher's `tests/support/market.rs` builder-function convention.

#![allow(dead_code)]

use std::sync::Arc;

use arbitrex::breaker::{BreakerConfig, CircuitBreaker};
use arbitrex::engine::{EngineConfig, OpportunityEngine};
use arbitrex::feed::MockMarketFeed;
use arbitrex::market::{Market, Outcome};
use arbitrex::matcher::{MarketMatcher, MatcherConfig};
use arbitrex::ports::MarketFeed;
use arbitrex::risk::{RiskConfig, RiskModeler};
use arbitrex::scorer::{OpportunityScorer, ScorerConfig};
use arbitrex::store::MemoryStore;
use rust_decimal::Decimal;

/// A binary market with the given yes/no prices and a shared 24h volume.
pub fn binary_market(venue: &str, market_id: &str, question: &str, yes: Decimal, no: Decimal, vol: Decimal) -> Market {
    Market {
        venue: venue.into(),
        market_id: market_id.into(),
        question: question.into(),
        slug: None,
        outcomes: vec![Outcome::new("Yes", yes, vol), Outcome::new("No", no, vol)],
        volume_24h: vol,
        liquidity: vol,
        end_date: None,
    }
}

/// An `OpportunityEngine` over a `MockMarketFeed` seeded with `markets`,
/// backed by a fresh `MemoryStore`, and every collaborator at its defaults.
pub fn engine_with_markets(config: EngineConfig, markets: Vec<Market>) -> OpportunityEngine {
    engine_with_feed(config, Arc::new(MockMarketFeed::with_markets(markets)))
}

/// Same as [`engine_with_markets`] but takes an already-constructed feed so
/// the caller can keep a handle to it (e.g. to queue price updates for the
/// realtime path).
pub fn engine_with_feed(config: EngineConfig, feed: Arc<dyn MarketFeed>) -> OpportunityEngine {
    let store = Arc::new(MemoryStore::new());
    OpportunityEngine::new(
        config,
        feed,
        store.clone(),
        store,
        MarketMatcher::new(MatcherConfig::default(), None),
        OpportunityScorer::new(ScorerConfig::default()),
        RiskModeler::new(RiskConfig::default()),
        Arc::new(CircuitBreaker::new(BreakerConfig::default())),
        None,
    )
}
