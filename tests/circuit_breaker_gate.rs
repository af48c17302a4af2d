//! End-to-end coverage of the circuit breaker gating `mark_taken`: once the
//! global scope is tripped, the engine must refuse to take a freshly
//! discovered opportunity even though it's sitting right there in the
//! active set.

mod support;

use arbitrex::breaker::{BreakerConfig, BreakerScope, CircuitBreaker, TripCategory};
use arbitrex::engine::{EngineConfig, OpportunityEngine, ScanOptions};
use arbitrex::feed::MockMarketFeed;
use arbitrex::matcher::{MarketMatcher, MatcherConfig};
use arbitrex::risk::{RiskConfig, RiskModeler};
use arbitrex::scorer::{OpportunityScorer, ScorerConfig};
use arbitrex::store::MemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn mark_taken_is_refused_while_the_global_breaker_is_tripped() {
    let market = support::binary_market("kalshi", "1", "Will it rain tomorrow?", dec!(0.40), dec!(0.50), dec!(5000));
    let store = Arc::new(MemoryStore::new());
    let breaker = Arc::new(CircuitBreaker::new(BreakerConfig::default()));
    breaker.trip(&BreakerScope::Global, TripCategory::Manual, "test trip".into());

    let engine = OpportunityEngine::new(
        EngineConfig { venues: vec!["kalshi".into()], ..Default::default() },
        Arc::new(MockMarketFeed::with_markets(vec![market])),
        store.clone(),
        store,
        MarketMatcher::new(MatcherConfig::default(), None),
        OpportunityScorer::new(ScorerConfig::default()),
        RiskModeler::new(RiskConfig::default()),
        breaker,
        None,
    );
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    let id = found.first().expect("an internal arbitrage opportunity").id;

    let result = engine.mark_taken(id, vec![dec!(0.40), dec!(0.50)]).await;
    assert!(result.is_err(), "tripped breaker must refuse mark_taken");
    assert!(engine.get_active().iter().any(|o| o.id == id), "a refused opportunity stays active");
}
