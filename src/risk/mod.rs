//! Execution/timing/platform/liquidity/correlation risk modeling (C6).

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::opportunity::{Action, NormalizedSide, OpportunityLeg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            RiskLevel::Low
        } else if score < 40.0 {
            RiskLevel::Medium
        } else if score < 60.0 {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub execution: f64,
    pub timing: f64,
    pub platform: f64,
    pub liquidity: f64,
    pub correlation: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self { execution: 0.30, timing: 0.20, platform: 0.15, liquidity: 0.25, correlation: 0.10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub venue_platform_risk: HashMap<String, f64>,
    pub default_platform_risk: f64,
    pub venue_chain: HashMap<String, String>,
    pub chain_withdrawal_risk: HashMap<String, f64>,
    pub default_withdrawal_risk: f64,
    pub counterparty_risk: f64,
    pub weights: RiskWeights,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            venue_platform_risk: HashMap::new(),
            default_platform_risk: 15.0,
            venue_chain: HashMap::new(),
            chain_withdrawal_risk: HashMap::new(),
            default_withdrawal_risk: 10.0,
            counterparty_risk: 5.0,
            weights: RiskWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiskBreakdown {
    pub execution: f64,
    pub timing: f64,
    pub platform: f64,
    pub liquidity: f64,
    pub correlation: f64,
    pub aggregate: f64,
    pub level: RiskLevel,
}

fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

pub struct RiskModeler {
    config: RiskConfig,
}

impl Default for RiskModeler {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskModeler {
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// `sqrt(size/liquidity) * 2`, clamped to 50%. (The scorer's sibling
    /// formula additionally folds in a spread term; the risk model only
    /// cares about the size/liquidity relationship.)
    #[must_use]
    pub fn estimate_slippage(&self, leg: &OpportunityLeg, size: Decimal) -> f64 {
        let liquidity = dec_to_f64(leg.liquidity).max(1e-9);
        let size = dec_to_f64(size).max(0.0);
        ((size / liquidity).sqrt() * 2.0).min(0.5)
    }

    fn fill_probability_one(&self, leg: &OpportunityLeg, size: Decimal) -> f64 {
        let liquidity = dec_to_f64(leg.liquidity).max(0.0);
        let size = dec_to_f64(size).max(1e-9);
        let mut p = (liquidity / size).min(1.0);
        if leg.action == Action::Sell {
            p *= 0.95;
        }
        let price = dec_to_f64(leg.price);
        if !(0.05..=0.95).contains(&price) {
            p *= 0.8;
        }
        p.clamp(0.0, 1.0)
    }

    /// Per-leg fill probability.
    #[must_use]
    pub fn calculate_fill_probability(&self, legs: &[OpportunityLeg], size: Decimal) -> Vec<f64> {
        legs.iter().map(|l| self.fill_probability_one(l, size)).collect()
    }

    /// `(1 - prod(p)) * 50 + partial * 30` where `partial` is the sum over
    /// legs of the probability that every *other* leg fills but this one
    /// doesn't.
    #[must_use]
    pub fn execution_risk(&self, legs: &[OpportunityLeg], size: Decimal) -> f64 {
        if legs.is_empty() {
            return 0.0;
        }
        let probs = self.calculate_fill_probability(legs, size);
        let all_fill: f64 = probs.iter().product();

        let mut partial = 0.0;
        for (i, &pi) in probs.iter().enumerate() {
            let others: f64 = probs.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, p)| *p).product();
            partial += others * (1.0 - pi);
        }

        ((1.0 - all_fill) * 50.0 + partial * 30.0).clamp(0.0, 100.0)
    }

    /// `avgSlippage * 200 + volatility * 100`, volatility being
    /// `sqrt(avgExecTimeMs / 1000) * 0.005`.
    #[must_use]
    pub fn timing_risk(&self, legs: &[OpportunityLeg], size: Decimal, avg_exec_time_ms: f64) -> f64 {
        if legs.is_empty() {
            return 0.0;
        }
        let slippages: Vec<f64> = legs.iter().map(|l| self.estimate_slippage(l, size)).collect();
        let avg_slippage = slippages.iter().sum::<f64>() / slippages.len() as f64;
        let volatility = (avg_exec_time_ms / 1000.0).max(0.0).sqrt() * 0.005;
        (avg_slippage * 200.0 + volatility * 100.0).clamp(0.0, 100.0)
    }

    /// Average of per-venue risk constants plus chain-dependent withdrawal
    /// risk plus a flat counterparty term.
    #[must_use]
    pub fn platform_risk(&self, legs: &[OpportunityLeg]) -> f64 {
        if legs.is_empty() {
            return 0.0;
        }
        let venues: Vec<&str> = legs.iter().map(|l| l.market.venue()).collect();
        let avg_venue_risk = venues
            .iter()
            .map(|v| self.config.venue_platform_risk.get(*v).copied().unwrap_or(self.config.default_platform_risk))
            .sum::<f64>()
            / venues.len() as f64;

        let chains: std::collections::HashSet<&str> = venues
            .iter()
            .map(|v| self.config.venue_chain.get(*v).map(String::as_str).unwrap_or("unknown"))
            .collect();
        let avg_withdrawal_risk = chains
            .iter()
            .map(|c| self.config.chain_withdrawal_risk.get(*c).copied().unwrap_or(self.config.default_withdrawal_risk))
            .sum::<f64>()
            / chains.len() as f64;

        (avg_venue_risk + avg_withdrawal_risk + self.config.counterparty_risk).clamp(0.0, 100.0)
    }

    /// Bucketed on `min(liquidity / size)` across legs: ample liquidity is
    /// low risk, thin liquidity relative to size is high risk.
    #[must_use]
    pub fn liquidity_risk(&self, legs: &[OpportunityLeg], size: Decimal) -> f64 {
        if legs.is_empty() || size <= Decimal::ZERO {
            return 0.0;
        }
        let size_f = dec_to_f64(size).max(1e-9);
        let min_ratio = legs.iter().map(|l| dec_to_f64(l.liquidity) / size_f).fold(f64::MAX, f64::min);

        if min_ratio >= 10.0 {
            10.0
        } else if min_ratio >= 5.0 {
            25.0
        } else if min_ratio >= 2.0 {
            45.0
        } else if min_ratio >= 1.0 {
            65.0
        } else {
            90.0
        }
    }

    /// Pairwise correlation coefficients (`+0.8` same event/direction,
    /// `-0.95` opposite-outcome hedge, `0.7` same question cross-venue,
    /// `0.3` otherwise), averaged and rescaled from `[-1, 1]` onto `[0,
    /// 100]` — a hedge lowers correlation risk, stacking the same
    /// direction raises it.
    #[must_use]
    pub fn correlation_risk(&self, legs: &[OpportunityLeg]) -> f64 {
        if legs.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut pairs = 0;
        for i in 0..legs.len() {
            for j in (i + 1)..legs.len() {
                total += pairwise_correlation(&legs[i], &legs[j]);
                pairs += 1;
            }
        }
        let avg = total / pairs as f64;
        (((avg + 1.0) / 2.0) * 100.0).clamp(0.0, 100.0)
    }

    /// Full risk model: every dimension plus the weighted aggregate and
    /// its [`RiskLevel`].
    #[must_use]
    pub fn model_risk(&self, legs: &[OpportunityLeg], size: Decimal, avg_exec_time_ms: f64) -> RiskBreakdown {
        let execution = self.execution_risk(legs, size);
        let timing = self.timing_risk(legs, size, avg_exec_time_ms);
        let platform = self.platform_risk(legs);
        let liquidity = self.liquidity_risk(legs, size);
        let correlation = self.correlation_risk(legs);

        let w = self.config.weights;
        let aggregate = execution * w.execution
            + timing * w.timing
            + platform * w.platform
            + liquidity * w.liquidity
            + correlation * w.correlation;

        RiskBreakdown { execution, timing, platform, liquidity, correlation, aggregate, level: RiskLevel::from_score(aggregate) }
    }

    /// Binary search over `[0, balance]` for the largest size whose
    /// aggregate risk stays `<= max_risk`.
    #[must_use]
    pub fn calculate_position_limit(&self, legs: &[OpportunityLeg], max_risk: f64, balance: Decimal) -> Decimal {
        if legs.is_empty() || balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut lo = Decimal::ZERO;
        let mut hi = balance;
        for _ in 0..40 {
            let mid = (lo + hi) / Decimal::TWO;
            let risk = self.model_risk(legs, mid, 500.0).aggregate;
            if risk <= max_risk {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Execution sequencing: buys before sells; within a side, higher
    /// liquidity-ratio and lower slippage go first. Returns a permutation
    /// of `0..legs.len()`.
    #[must_use]
    pub fn optimize_sequence(&self, legs: &[OpportunityLeg]) -> Vec<usize> {
        let default_size = Decimal::ONE_HUNDRED;
        let mut order: Vec<usize> = (0..legs.len()).collect();
        order.sort_by(|&a, &b| {
            let la = &legs[a];
            let lb = &legs[b];
            let sell_a = la.action == Action::Sell;
            let sell_b = lb.action == Action::Sell;
            sell_a.cmp(&sell_b).then_with(|| {
                let ratio_a = dec_to_f64(la.liquidity) / dec_to_f64(default_size).max(1e-9);
                let ratio_b = dec_to_f64(lb.liquidity) / dec_to_f64(default_size).max(1e-9);
                ratio_b.partial_cmp(&ratio_a).unwrap_or(std::cmp::Ordering::Equal)
            }).then_with(|| {
                let slip_a = self.estimate_slippage(la, default_size);
                let slip_b = self.estimate_slippage(lb, default_size);
                slip_a.partial_cmp(&slip_b).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        order
    }
}

fn pairwise_correlation(a: &OpportunityLeg, b: &OpportunityLeg) -> f64 {
    let same_venue = a.market.venue() == b.market.venue();
    let same_direction = a.normalized == b.normalized && a.action == b.action;
    let opposite_outcome = matches!(
        (a.normalized, b.normalized),
        (NormalizedSide::Yes, NormalizedSide::No) | (NormalizedSide::No, NormalizedSide::Yes)
    );

    if opposite_outcome {
        -0.95
    } else if same_direction {
        0.8
    } else if !same_venue {
        0.7
    } else {
        0.3
    }
}
