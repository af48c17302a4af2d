//! `Executor`: downstream order-routing collaborator (out of scope here).
//!
//! The core only defines the contract; it never calls `Executor` itself —
//! a real executor consults the [`crate::breaker::CircuitBreaker`] via
//! `can_trade` before each leg and reports outcomes back through
//! `Analytics::record_outcome`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::opportunity::Opportunity;

#[derive(Debug, Clone)]
pub struct Fill {
    pub opportunity_id: Uuid,
    pub legs: Vec<LegOutcome>,
}

#[derive(Debug, Clone)]
pub struct LegOutcome {
    pub market_id: String,
    pub fill_price: Decimal,
    pub filled: bool,
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, opportunity: &Opportunity) -> Result<Fill>;
}
