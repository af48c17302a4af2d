//! End-to-end coverage of cross-platform discovery: the same event priced
//! differently on two venues should surface a `CrossPlatform` opportunity
//! from a real `scan` (matcher -> discovery -> scoring), and a
//! same-event-different-year pair should bucket together for verification
//! without producing a tradable opportunity.

mod support;

use arbitrex::engine::{EngineConfig, ScanOptions};
use arbitrex::opportunity::OpportunityKind;
use rust_decimal_macros::dec;

#[tokio::test]
async fn scan_surfaces_cross_platform_arbitrage_for_the_same_event_on_two_venues() {
    let a = support::binary_market("kalshi", "1", "Will the Fed cut rates in March?", dec!(0.30), dec!(0.72), dec!(5000));
    let b = support::binary_market("polymarket", "2", "Will the Fed cut rates in March?", dec!(0.55), dec!(0.47), dec!(5000));

    let config = EngineConfig { venues: vec!["kalshi".into(), "polymarket".into()], ..Default::default() };
    let engine = support::engine_with_markets(config, vec![a, b]);
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    let cross = found.iter().find(|o| o.kind == OpportunityKind::CrossPlatform);
    assert!(cross.is_some(), "expected a cross-platform opportunity, found: {found:?}");
}

#[tokio::test]
async fn scan_does_not_trade_a_year_mismatched_pair_across_venues() {
    let a = support::binary_market("kalshi", "1", "Will X win the 2028 election?", dec!(0.40), dec!(0.65), dec!(5000));
    let b = support::binary_market("polymarket", "2", "Will X win the 2024 election?", dec!(0.60), dec!(0.45), dec!(5000));

    let config = EngineConfig { venues: vec!["kalshi".into(), "polymarket".into()], ..Default::default() };
    let engine = support::engine_with_markets(config, vec![a, b]);
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    assert!(
        found.iter().all(|o| o.kind != OpportunityKind::CrossPlatform),
        "a year-only difference must not be treated as the same market: {found:?}"
    );
}
