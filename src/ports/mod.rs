//! External capability traits.
//!
//! The core never assumes a concrete venue SDK, database engine, embedding
//! backend, or order router. It consumes these traits; `crate::store` and
//! `crate::feed` ship example adapters, but a deployment may swap in its
//! own.

mod executor;
mod feed;
mod store;

pub use executor::{Executor, Fill, LegOutcome};
pub use feed::{MarketFeed, PriceUpdate};
pub use store::{
    AnalyticsStore, AttributionRecord, CorrelationRule, LinkRecord, LinkSource, LinkStore, OpportunityRecord, PlatformPairStats,
    StatsWindow, Store,
};

use async_trait::async_trait;

use crate::market::Market;

/// Optional text-embedding backend used by the matcher's semantic path.
/// Absent entirely is legal — the matcher falls back to token-overlap
/// matching when no embedder is wired.
#[async_trait]
pub trait EmbeddingsService: Send + Sync {
    async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>>;
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

/// Rolling tick/order-book signals for a market, consumed by the breaker
/// and (optionally) the scorer. Never blocks: absent data is "no signal,
/// do not filter," not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureSignals {
    pub liquidity_score: f64,
    pub trend_strength: f64,
    pub buy_pressure: f64,
    pub sell_pressure: f64,
}

#[async_trait]
pub trait FeatureEngine: Send + Sync {
    async fn get_features(&self, market: &crate::market::MarketKey, outcome: Option<&str>) -> Option<FeatureSignals>;
}

/// Fair-value estimate for a market, used by the "edge vs fair value"
/// discovery family. Absent entirely makes that family inert, per spec.
#[async_trait]
pub trait FairValueProvider: Send + Sync {
    async fn fair_value(&self, market: &Market) -> Option<FairValueEstimate>;
}

#[derive(Debug, Clone, Copy)]
pub struct FairValueEstimate {
    pub fair_price: rust_decimal::Decimal,
    pub confidence: f64,
}
