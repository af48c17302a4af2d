//! Opportunity scoring, sizing, slippage and Kelly sizing (C5).
//!
//! Every function here is a pure computation over an [`Opportunity`]'s
//! already-discovered legs: the scorer never touches a feed, a store, or
//! the clock. Determinism (spec §8: identical inputs yield identical
//! scores for a fixed fee/reliability table) falls out of that for free.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::opportunity::{Action, ExecutionPlan, ExecutionStep, Opportunity, OpportunityKind, RiskClass};

/// Per-venue constants the scorer needs. Defaults approximate "a
/// well-behaved major venue"; deployments override per their own venue
/// roster. Deserializable so a deployment's `[scorer]` config table can
/// override any of these per spec's "fee tables ... should be exposed as
/// configuration" resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub venue_reliability: HashMap<String, f64>,
    pub venue_slippage_factor: HashMap<String, f64>,
    pub default_reliability: f64,
    pub default_slippage_factor: f64,
    pub min_liquidity_floor: Decimal,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            venue_reliability: HashMap::new(),
            venue_slippage_factor: HashMap::new(),
            default_reliability: 0.95,
            default_slippage_factor: 1.0,
            min_liquidity_floor: Decimal::new(500, 0),
        }
    }
}

impl ScorerConfig {
    fn reliability(&self, venue: &str) -> f64 {
        self.venue_reliability.get(venue).copied().unwrap_or(self.default_reliability)
    }

    fn slippage_factor(&self, venue: &str) -> f64 {
        self.venue_slippage_factor.get(venue).copied().unwrap_or(self.default_slippage_factor)
    }
}

/// The four weighted components plus penalties, summing (after clamping)
/// to [`ScoreBreakdown::total`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub edge_score: f64,
    pub liquidity_score: f64,
    pub confidence_score: f64,
    pub execution_score: f64,
    pub penalties: f64,
    pub total: f64,
}

fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

pub struct OpportunityScorer {
    config: ScorerConfig,
}

impl Default for OpportunityScorer {
    fn default() -> Self {
        Self::new(ScorerConfig::default())
    }
}

impl OpportunityScorer {
    #[must_use]
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// `Score`: edge/liquidity/confidence/execution weighted sum minus
    /// penalties, clamped to `[0, 100]`.
    #[must_use]
    pub fn score(&self, opp: &Opportunity) -> ScoreBreakdown {
        self.score_with_imbalance(opp, None)
    }

    /// As [`Self::score`], but an optional order-book imbalance signal
    /// (positive = buy pressure, negative = sell pressure) nudges the
    /// confidence component by up to +/-5 points when it agrees or
    /// disagrees with the opportunity's dominant buy direction.
    #[must_use]
    pub fn score_with_imbalance(&self, opp: &Opportunity, imbalance: Option<f64>) -> ScoreBreakdown {
        let edge_pct = dec_to_f64(opp.edge_pct);
        let total_liquidity = dec_to_f64(opp.total_liquidity);

        let edge_score = (edge_pct / 10.0).min(1.0) * 40.0;
        let liquidity_score = (total_liquidity / 50_000.0).min(1.0) * 25.0;

        let mut confidence_score = opp.confidence * 25.0;
        if let Some(imb) = imbalance {
            let buy_legs = opp.markets.iter().filter(|l| l.action == Action::Buy).count();
            let sell_legs = opp.markets.len() - buy_legs;
            let dominant_buy = buy_legs >= sell_legs;
            let agreement = if dominant_buy { imb } else { -imb };
            confidence_score = (confidence_score + agreement.clamp(-1.0, 1.0) * 5.0).clamp(0.0, 25.0);
        }

        let mut execution_score = 10.0_f64;
        for leg in &opp.markets {
            execution_score *= self.config.reliability(leg.market.venue());
        }
        if opp.markets.iter().any(|l| l.action == Action::Sell) {
            execution_score *= 0.9;
        }

        let mut penalties = 0.0_f64;

        if total_liquidity < dec_to_f64(self.config.min_liquidity_floor) * 5.0 {
            penalties += 5.0;
        }

        let venues: std::collections::HashSet<&str> = opp.markets.iter().map(|l| l.market.venue()).collect();
        if venues.len() > 1 {
            penalties += 3.0 * (venues.len() as f64 - 1.0);
        }

        let slippage_at_100 = self.estimate_slippage_for_opportunity(opp, Decimal::ONE_HUNDRED);
        if slippage_at_100 > 0.02 {
            penalties += 5.0_f64.min((slippage_at_100 - 0.02) * 250.0);
        }

        if opp.kind == OpportunityKind::Edge && opp.confidence < 0.7 {
            penalties += 5.0_f64.min((0.7 - opp.confidence) * 50.0);
        }

        let total = (edge_score + liquidity_score + confidence_score + execution_score - penalties).clamp(0.0, 100.0);

        ScoreBreakdown { edge_score, liquidity_score, confidence_score, execution_score, penalties, total }
    }

    /// `sqrt(size/liquidity) * 2 + spread/2`, clamped to 50%, times the
    /// venue's slippage factor.
    #[must_use]
    pub fn estimate_slippage(&self, venue: &str, liquidity: Decimal, size: Decimal, spread: f64) -> f64 {
        let liquidity = dec_to_f64(liquidity).max(1e-9);
        let size = dec_to_f64(size).max(0.0);
        let base = (size / liquidity).sqrt() * 2.0 + spread / 2.0;
        base.min(0.5) * self.config.slippage_factor(venue)
    }

    fn estimate_slippage_for_opportunity(&self, opp: &Opportunity, size: Decimal) -> f64 {
        if opp.markets.is_empty() {
            return 0.0;
        }
        let total: f64 = opp
            .markets
            .iter()
            .map(|leg| self.estimate_slippage(leg.market.venue(), leg.liquidity, size, 0.0))
            .sum();
        total / opp.markets.len() as f64
    }

    /// Build a naive sequential execution plan sized at `size` per leg,
    /// buys before sells (matching [`crate::risk::RiskModeler::optimize_sequence`]'s
    /// convention).
    #[must_use]
    pub fn estimate_execution(&self, opp: &Opportunity, size: Decimal) -> ExecutionPlan {
        let mut legs: Vec<usize> = (0..opp.markets.len()).collect();
        legs.sort_by_key(|&i| opp.markets[i].action == Action::Sell);

        let mut steps = Vec::with_capacity(legs.len());
        let mut total_cost = Decimal::ZERO;
        let mut warnings = Vec::new();

        for &i in &legs {
            let leg = &opp.markets[i];
            let slippage = self.estimate_slippage(leg.market.venue(), leg.liquidity, size, 0.0);
            let effective_price = leg.price * (Decimal::ONE + Decimal::try_from(slippage).unwrap_or_default());
            steps.push(ExecutionStep { market: leg.market.clone(), action: leg.action, price: effective_price, size });
            total_cost += effective_price * size;
            if slippage > 0.05 {
                warnings.push(format!("leg {} estimated slippage {:.1}% exceeds 5%", leg.market, slippage * 100.0));
            }
        }

        let estimated_profit = opp.profit_per_100 * (size / Decimal::ONE_HUNDRED);
        let risk_class = if opp.score >= 75.0 {
            RiskClass::Low
        } else if opp.score >= 50.0 {
            RiskClass::Medium
        } else if opp.score >= 25.0 {
            RiskClass::High
        } else {
            RiskClass::Extreme
        };

        ExecutionPlan {
            steps,
            total_cost,
            estimated_profit,
            time_sensitivity_secs: if opp.kind == OpportunityKind::Internal { 30 } else { 120 },
            risk_class,
            warnings,
        }
    }

    /// `p = 0.5 + (edge*confidence)/2`; full Kelly `= 2p - 1`; apply a
    /// `0.25 * confidence` safety factor, cap at 0.25. `win_rate`, when
    /// supplied, replaces the edge-derived `p` estimate outright.
    #[must_use]
    pub fn calculate_kelly(&self, edge_pct: f64, confidence: f64, win_rate: Option<f64>) -> f64 {
        let edge_fraction = edge_pct / 100.0;
        let p = win_rate.unwrap_or(0.5 + (edge_fraction * confidence) / 2.0).clamp(0.0, 1.0);
        let full_kelly = (2.0 * p - 1.0).max(0.0);
        (full_kelly * 0.25 * confidence).min(0.25)
    }

    /// `min(dynamicKellySize, 5% of liquidity, slippageMax, 10% of bankroll)`.
    #[must_use]
    pub fn get_optimal_size(&self, opp: &Opportunity, bankroll: Decimal) -> Decimal {
        let kelly = self.calculate_kelly(dec_to_f64(opp.edge_pct), opp.confidence, None);
        let kelly_size = bankroll * Decimal::try_from(kelly).unwrap_or_default();

        let liquidity_cap = opp.total_liquidity * Decimal::new(5, 2); // 5%
        let bankroll_cap = bankroll * Decimal::new(10, 2); // 10%
        let slippage_cap = self.slippage_max(opp);

        kelly_size.min(liquidity_cap).min(bankroll_cap).min(slippage_cap).max(Decimal::ZERO)
    }

    /// Largest size whose average cross-leg slippage stays under 2%,
    /// found by doubling search then bisection (liquidity-bounded, so this
    /// always terminates).
    fn slippage_max(&self, opp: &Opportunity) -> Decimal {
        if opp.markets.is_empty() {
            return Decimal::ZERO;
        }
        let liquidity_ceiling = opp.markets.iter().map(|l| l.liquidity).fold(Decimal::MAX, Decimal::min);
        if liquidity_ceiling <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut lo = Decimal::ZERO;
        let mut hi = liquidity_ceiling;
        for _ in 0..40 {
            let mid = (lo + hi) / Decimal::TWO;
            if self.estimate_slippage_for_opportunity(opp, mid) <= 0.02 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketKey;
    use crate::opportunity::{NormalizedSide, OpportunityLeg, OpportunityStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn leg(venue: &str, action: Action, price: Decimal, liquidity: Decimal) -> OpportunityLeg {
        OpportunityLeg {
            market: MarketKey::new(venue, "m"),
            outcome_label: "Yes".into(),
            normalized: NormalizedSide::Yes,
            action,
            price,
            liquidity,
            volume_24h: liquidity,
            recommended_size: Decimal::ZERO,
        }
    }

    fn opportunity(legs: Vec<OpportunityLeg>, edge_pct: Decimal, confidence: f64) -> Opportunity {
        let now = Utc::now();
        Opportunity {
            id: Uuid::new_v4(),
            kind: OpportunityKind::Internal,
            markets: legs,
            edge_pct,
            profit_per_100: edge_pct,
            score: 0.0,
            confidence,
            kelly_fraction: 0.0,
            estimated_slippage: 0.0,
            total_liquidity: dec!(2000),
            execution: None,
            discovered_at: now,
            expires_at: now + chrono::Duration::minutes(5),
            status: OpportunityStatus::Active,
            outcome: None,
            match_verification: None,
        }
    }

    #[test]
    fn score_is_deterministic() {
        let scorer = OpportunityScorer::default();
        let opp = opportunity(
            vec![leg("v1", Action::Buy, dec!(0.48), dec!(2000)), leg("v1", Action::Buy, dec!(0.50), dec!(2000))],
            dec!(2.0),
            0.9,
        );
        let a = scorer.score(&opp);
        let b = scorer.score(&opp);
        assert_eq!(a, b);
    }

    #[test]
    fn cross_venue_complexity_penalizes_score() {
        let scorer = OpportunityScorer::default();
        let single_venue = opportunity(
            vec![leg("v1", Action::Buy, dec!(0.48), dec!(2000)), leg("v1", Action::Buy, dec!(0.50), dec!(2000))],
            dec!(2.0),
            0.9,
        );
        let cross_venue = opportunity(
            vec![leg("v1", Action::Buy, dec!(0.48), dec!(2000)), leg("v2", Action::Buy, dec!(0.50), dec!(2000))],
            dec!(2.0),
            0.9,
        );
        assert!(scorer.score(&single_venue).total > scorer.score(&cross_venue).total);
    }

    #[test]
    fn kelly_is_capped_at_quarter() {
        let scorer = OpportunityScorer::default();
        let kelly = scorer.calculate_kelly(100.0, 1.0, None);
        assert!(kelly <= 0.25);
    }

    #[test]
    fn kelly_is_zero_for_zero_edge() {
        let scorer = OpportunityScorer::default();
        let kelly = scorer.calculate_kelly(0.0, 0.5, None);
        assert_eq!(kelly, 0.0);
    }

    #[test]
    fn slippage_grows_with_size_relative_to_liquidity() {
        let scorer = OpportunityScorer::default();
        let small = scorer.estimate_slippage("v1", dec!(10_000), dec!(100), 0.0);
        let large = scorer.estimate_slippage("v1", dec!(10_000), dec!(5_000), 0.0);
        assert!(large > small);
    }

    #[test]
    fn optimal_size_never_exceeds_bankroll_cap() {
        let scorer = OpportunityScorer::default();
        let opp = opportunity(
            vec![leg("v1", Action::Buy, dec!(0.48), dec!(2000)), leg("v1", Action::Buy, dec!(0.50), dec!(2000))],
            dec!(20.0),
            0.95,
        );
        let bankroll = dec!(1000);
        let size = scorer.get_optimal_size(&opp, bankroll);
        assert!(size <= bankroll * dec!(0.10));
    }
}
