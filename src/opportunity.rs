//! Opportunity lifecycle domain type.
//!
//! An `Opportunity` is a fully-specified, time-bounded, priced arbitrage
//! plan. Three families are defined by [`OpportunityKind`]. Status
//! transitions are one-way: `Active -> {Taken, Expired, Closed}`,
//! `Taken -> Closed`; once a status leaves `Active` the opportunity is
//! removed from the engine's active set by the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::market::MarketKey;
use crate::matcher::VerificationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunityKind {
    Internal,
    CrossPlatform,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunityStatus {
    Active,
    Taken,
    Expired,
    Closed,
}

impl OpportunityStatus {
    /// Whether a transition from `self` to `next` is legal per the engine's
    /// lifecycle invariant.
    #[must_use]
    pub fn can_transition_to(self, next: OpportunityStatus) -> bool {
        matches!(
            (self, next),
            (OpportunityStatus::Active, OpportunityStatus::Taken)
                | (OpportunityStatus::Active, OpportunityStatus::Expired)
                | (OpportunityStatus::Active, OpportunityStatus::Closed)
                | (OpportunityStatus::Taken, OpportunityStatus::Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedSide {
    Yes,
    No,
    Other,
}

/// A single leg of an opportunity.
#[derive(Debug, Clone)]
pub struct OpportunityLeg {
    pub market: MarketKey,
    pub outcome_label: String,
    pub normalized: NormalizedSide,
    pub action: Action,
    pub price: Decimal,
    pub liquidity: Decimal,
    pub volume_24h: Decimal,
    pub recommended_size: Decimal,
}

/// One step of an [`ExecutionPlan`].
#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub market: MarketKey,
    pub action: Action,
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskClass {
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
    pub total_cost: Decimal,
    pub estimated_profit: Decimal,
    pub time_sensitivity_secs: u32,
    pub risk_class: RiskClass,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OpportunityOutcome {
    pub taken: bool,
    pub fill_prices: Vec<Decimal>,
    pub realized_pnl: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Opportunity {
    pub id: Uuid,
    pub kind: OpportunityKind,
    pub markets: Vec<OpportunityLeg>,
    pub edge_pct: Decimal,
    pub profit_per_100: Decimal,
    pub score: f64,
    pub confidence: f64,
    pub kelly_fraction: f64,
    pub estimated_slippage: f64,
    pub total_liquidity: Decimal,
    pub execution: Option<ExecutionPlan>,
    pub discovered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: OpportunityStatus,
    pub outcome: Option<OpportunityOutcome>,
    pub match_verification: Option<VerificationReport>,
}

impl Opportunity {
    /// Attempt a lifecycle transition, enforcing the one-way invariant.
    pub fn transition(&mut self, next: OpportunityStatus) -> Result<(), crate::error::EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(crate::error::EngineError::Invariant(format!(
                "illegal status transition {:?} -> {:?} for opportunity {}",
                self.status, next, self.id
            )));
        }
        self.status = next;
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OpportunityStatus::Active
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_become_taken_expired_or_closed() {
        assert!(OpportunityStatus::Active.can_transition_to(OpportunityStatus::Taken));
        assert!(OpportunityStatus::Active.can_transition_to(OpportunityStatus::Expired));
        assert!(OpportunityStatus::Active.can_transition_to(OpportunityStatus::Closed));
    }

    #[test]
    fn taken_can_only_become_closed() {
        assert!(OpportunityStatus::Taken.can_transition_to(OpportunityStatus::Closed));
        assert!(!OpportunityStatus::Taken.can_transition_to(OpportunityStatus::Active));
        assert!(!OpportunityStatus::Taken.can_transition_to(OpportunityStatus::Expired));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [OpportunityStatus::Expired, OpportunityStatus::Closed] {
            for next in [
                OpportunityStatus::Active,
                OpportunityStatus::Taken,
                OpportunityStatus::Expired,
                OpportunityStatus::Closed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
