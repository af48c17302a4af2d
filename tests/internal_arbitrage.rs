//! End-to-end coverage of the internal-arbitrage discovery path: a single
//! venue's own Yes/No prices summing to less than 1 at zero fees is a free
//! lunch the engine must surface from a real `scan`, not from a
//! hand-constructed `Opportunity`.

mod support;

use arbitrex::engine::{EngineConfig, ScanOptions};
use arbitrex::opportunity::OpportunityKind;
use rust_decimal_macros::dec;

#[tokio::test]
async fn scan_surfaces_internal_arbitrage_when_yes_plus_no_under_one() {
    let market = support::binary_market("kalshi", "1", "Will it rain tomorrow?", dec!(0.40), dec!(0.50), dec!(5000));

    let config = EngineConfig { venues: vec!["kalshi".into()], min_edge_pct: 1.0, min_liquidity: dec!(100), ..Default::default() };
    let engine = support::engine_with_markets(config, vec![market]);
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    let internal = found.iter().find(|o| o.kind == OpportunityKind::Internal).expect("internal arbitrage opportunity");

    assert!(internal.edge_pct > dec!(0));
    assert_eq!(engine.get_active().len(), 1);
    assert_eq!(engine.get(internal.id).map(|o| o.id), Some(internal.id));
}

#[tokio::test]
async fn scan_finds_nothing_when_yes_plus_no_is_at_least_one() {
    let market = support::binary_market("kalshi", "1", "Will it rain tomorrow?", dec!(0.55), dec!(0.50), dec!(5000));

    let config = EngineConfig { venues: vec!["kalshi".into()], ..Default::default() };
    let engine = support::engine_with_markets(config, vec![market]);
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    assert!(found.iter().all(|o| o.kind != OpportunityKind::Internal));
}
