//! FeatureEngine collaborator (C9): trait lives in [`crate::ports`]; this
//! module only supplies the always-legal absent implementation.
//!
//! Per Design Notes §9, "absent data never blocks" is structural here — a
//! caller holding `Option<Arc<dyn FeatureEngine>>` and finding `None`
//! behaves identically to calling [`NullFeatureEngine`] and getting back
//! `None` from every market. Both are provided so callers can choose
//! whichever reads better at the call site.

use async_trait::async_trait;

use crate::market::MarketKey;
use crate::ports::{FeatureEngine, FeatureSignals};

/// Always returns `None`: "no signal, do not filter."
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFeatureEngine;

#[async_trait]
impl FeatureEngine for NullFeatureEngine {
    async fn get_features(&self, _market: &MarketKey, _outcome: Option<&str>) -> Option<FeatureSignals> {
        None
    }
}
