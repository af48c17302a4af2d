//! End-to-end coverage of manual linking surviving an engine restart: link
//! two markets through the engine, rebuild a fresh engine over the same
//! store, and confirm the identity group and the unlink path both persist
//! correctly across the reload.

use arbitrex::engine::EngineConfig;
use arbitrex::market::MarketKey;
use arbitrex::store::MemoryStore;
use std::sync::Arc;

#[tokio::test]
async fn a_manual_link_survives_reload_and_unlink_actually_removes_it() {
    let store = Arc::new(MemoryStore::new());
    let a = MarketKey::new("kalshi", "1");
    let b = MarketKey::new("polymarket", "2");

    let linked_engine = build_engine_over(store.clone());
    linked_engine.load().await.unwrap();
    linked_engine.link_markets(a.clone(), b.clone(), 0.95).await.unwrap();
    assert!(linked_engine.get_linked_markets(&a).contains(&b));

    let reloaded = build_engine_over(store.clone());
    reloaded.load().await.unwrap();
    assert!(reloaded.get_linked_markets(&a).contains(&b), "manual link must survive a reload from the same store");

    reloaded.unlink_markets(&a, &b).await.unwrap();
    assert!(!reloaded.get_linked_markets(&a).contains(&b));

    let after_unlink_reload = build_engine_over(store);
    after_unlink_reload.load().await.unwrap();
    assert!(
        !after_unlink_reload.get_linked_markets(&a).contains(&b),
        "an unlinked pair must not resurrect on the next reload"
    );
}

fn build_engine_over(store: Arc<MemoryStore>) -> arbitrex::engine::OpportunityEngine {
    use arbitrex::breaker::{BreakerConfig, CircuitBreaker};
    use arbitrex::feed::MockMarketFeed;
    use arbitrex::matcher::{MarketMatcher, MatcherConfig};
    use arbitrex::risk::{RiskConfig, RiskModeler};
    use arbitrex::scorer::{OpportunityScorer, ScorerConfig};

    arbitrex::engine::OpportunityEngine::new(
        EngineConfig::default(),
        Arc::new(MockMarketFeed::new()),
        store.clone(),
        store,
        MarketMatcher::new(MatcherConfig::default(), None),
        OpportunityScorer::new(ScorerConfig::default()),
        RiskModeler::new(RiskConfig::default()),
        Arc::new(CircuitBreaker::new(BreakerConfig::default())),
        None,
    )
}
