//! The three opportunity-discovery families (spec §4.8 step 2).
//!
//! Pure functions over already-fetched markets and match groups: no feed,
//! store, or clock access beyond `Utc::now()` for timestamping. Kept
//! separate from [`super::OpportunityEngine`] because this is the single
//! largest slice of the scan cycle's logic and reads better on its own.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::market::{Market, MarketKey};
use crate::matcher::MatchGroup;
use crate::normalize::OutcomeNormalizer;
use crate::opportunity::{Action, NormalizedSide, Opportunity, OpportunityKind, OpportunityLeg, OpportunityStatus};
use crate::ports::FairValueEstimate;

use super::EngineConfig;

fn leg(market: &Market, outcome_label: &str, normalized: NormalizedSide, action: Action, price: Decimal, liquidity: Decimal, volume_24h: Decimal) -> OpportunityLeg {
    OpportunityLeg {
        market: market.key(),
        outcome_label: outcome_label.to_string(),
        normalized,
        action,
        price,
        liquidity,
        volume_24h,
        recommended_size: Decimal::ZERO,
    }
}

fn new_opportunity(kind: OpportunityKind, legs: Vec<OpportunityLeg>, edge_pct: f64, confidence: f64, total_liquidity: Decimal, ttl_ms: u64) -> Opportunity {
    let now = Utc::now();
    Opportunity {
        id: Uuid::new_v4(),
        kind,
        markets: legs,
        edge_pct: Decimal::try_from(edge_pct).unwrap_or_default(),
        profit_per_100: Decimal::try_from(edge_pct).unwrap_or_default(),
        score: 0.0,
        confidence,
        kelly_fraction: 0.0,
        estimated_slippage: 0.0,
        total_liquidity,
        execution: None,
        discovered_at: now,
        expires_at: now + Duration::milliseconds(ttl_ms as i64),
        status: OpportunityStatus::Active,
        outcome: None,
        match_verification: None,
    }
}

/// Internal arbitrage: binary markets priced so YES + NO < 1 after fees.
pub fn internal_arbitrage(markets: &[Market], normalizer: &OutcomeNormalizer, config: &EngineConfig) -> Vec<Opportunity> {
    if !config.include_internal {
        return Vec::new();
    }
    let mut out = Vec::new();
    for market in markets {
        if !market.is_binary() {
            continue;
        }
        let Some(yes) = normalizer.find_yes(market) else { continue };
        let Some(no) = normalizer.find_no(market) else { continue };

        let sum = yes.price + no.price;
        if sum >= Decimal::ONE {
            continue;
        }
        let fee_rate = config.fee_rate(&market.venue);
        let sum_f = sum.to_f64().unwrap_or(1.0);
        let gross_edge = (1.0 - sum_f) * 100.0;
        let edge_pct = gross_edge - sum_f * fee_rate * 100.0;
        if edge_pct < config.min_edge_pct {
            continue;
        }
        let min_vol = yes.volume_24h.min(no.volume_24h);
        if min_vol < config.min_liquidity {
            continue;
        }

        let legs = vec![
            leg(market, &yes.name, NormalizedSide::Yes, Action::Buy, yes.price, market.liquidity, yes.volume_24h),
            leg(market, &no.name, NormalizedSide::No, Action::Buy, no.price, market.liquidity, no.volume_24h),
        ];
        out.push(new_opportunity(OpportunityKind::Internal, legs, edge_pct, 0.9, market.liquidity, config.opportunity_ttl_ms));
    }
    out
}

/// Cross-platform arbitrage: for each non-`needs_review` match group
/// spanning >= 2 venues, compute the YES-spread and the buy-YES/buy-NO
/// hedge strategy and keep whichever has the larger fee-adjusted edge.
pub fn cross_platform_arbitrage(
    groups: &[MatchGroup],
    markets_by_key: &HashMap<MarketKey, Market>,
    normalizer: &OutcomeNormalizer,
    config: &EngineConfig,
) -> Vec<Opportunity> {
    if !config.include_cross_platform {
        return Vec::new();
    }
    let mut out = Vec::new();

    for group in groups {
        if group.needs_review || group.venue_count() < 2 {
            continue;
        }

        // One representative market per venue, first occurrence wins
        // (spec §4.3's "input order, earliest candidate" determinism).
        let mut by_venue: HashMap<&str, &Market> = HashMap::new();
        for key in &group.markets {
            if let Some(m) = markets_by_key.get(key) {
                by_venue.entry(m.venue.as_str()).or_insert(m);
            }
        }
        let venues: Vec<&Market> = by_venue.into_values().collect();
        if venues.len() < 2 {
            continue;
        }

        for i in 0..venues.len() {
            for j in (i + 1)..venues.len() {
                let (a, b) = (venues[i], venues[j]);
                if !a.is_binary() || !b.is_binary() {
                    continue;
                }
                let (Some(yes_a), Some(yes_b)) = (normalizer.find_yes(a), normalizer.find_yes(b)) else { continue };
                let (Some(no_a), Some(no_b)) = (normalizer.find_no(a), normalizer.find_no(b)) else { continue };

                let (cheap, cheap_yes, expensive, expensive_yes, expensive_no) = if yes_a.price <= yes_b.price {
                    (a, yes_a, b, yes_b, no_b)
                } else {
                    (b, yes_b, a, yes_a, no_a)
                };

                let fee_sum = config.fee_rate(&cheap.venue) + config.fee_rate(&expensive.venue);

                let spread_edge = (expensive_yes.price - cheap_yes.price).to_f64().unwrap_or(0.0) * 100.0 - fee_sum * 100.0;
                let hedge_cost = cheap_yes.price + expensive_no.price;
                let hedge_edge = (Decimal::ONE - hedge_cost).to_f64().unwrap_or(0.0) * 100.0 - fee_sum * 100.0;

                let (edge_pct, legs) = if hedge_edge >= spread_edge {
                    (
                        hedge_edge,
                        vec![
                            leg(cheap, &cheap_yes.name, NormalizedSide::Yes, Action::Buy, cheap_yes.price, cheap.liquidity, cheap_yes.volume_24h),
                            leg(expensive, &expensive_no.name, NormalizedSide::No, Action::Buy, expensive_no.price, expensive.liquidity, expensive_no.volume_24h),
                        ],
                    )
                } else {
                    (
                        spread_edge,
                        vec![
                            leg(cheap, &cheap_yes.name, NormalizedSide::Yes, Action::Buy, cheap_yes.price, cheap.liquidity, cheap_yes.volume_24h),
                            leg(expensive, &expensive_yes.name, NormalizedSide::Yes, Action::Sell, expensive_yes.price, expensive.liquidity, expensive_yes.volume_24h),
                        ],
                    )
                };

                if edge_pct < config.min_edge_pct {
                    continue;
                }
                let min_liq = legs.iter().map(|l| l.volume_24h).fold(Decimal::MAX, Decimal::min);
                if min_liq < config.min_liquidity {
                    continue;
                }

                let total_liquidity: Decimal = legs.iter().map(|l| l.liquidity).sum();
                let mut opp = new_opportunity(OpportunityKind::CrossPlatform, legs, edge_pct, group.similarity, total_liquidity, config.opportunity_ttl_ms);
                opp.match_verification = group.verification.clone();
                out.push(opp);
            }
        }
    }

    out
}

/// Edge vs. fair value: single-leg opportunities against an external
/// fair-value estimate. Inert (returns nothing) when no estimate is
/// supplied for a market, which is the behavior when no provider is wired
/// at all (the engine simply never calls this with any estimates).
pub fn edge_vs_fair_value(
    markets: &[Market],
    estimates: &HashMap<MarketKey, FairValueEstimate>,
    normalizer: &OutcomeNormalizer,
    config: &EngineConfig,
) -> Vec<Opportunity> {
    if !config.include_edge {
        return Vec::new();
    }
    let mut out = Vec::new();
    for market in markets {
        let Some(estimate) = estimates.get(&market.key()) else { continue };
        let Some(yes) = normalizer.find_yes(market) else { continue };

        let diff = (estimate.fair_price - yes.price).abs();
        let fee_rate = config.fee_rate(&market.venue);
        let edge_pct = diff.to_f64().unwrap_or(0.0) * 100.0 - fee_rate * 100.0;
        if edge_pct < config.min_edge_pct || yes.volume_24h < config.min_liquidity {
            continue;
        }

        let buy_yes = estimate.fair_price > yes.price;
        let leg = if buy_yes {
            leg(market, &yes.name, NormalizedSide::Yes, Action::Buy, yes.price, market.liquidity, yes.volume_24h)
        } else {
            match normalizer.find_no(market) {
                Some(no) => leg(market, &no.name, NormalizedSide::No, Action::Buy, no.price, market.liquidity, no.volume_24h),
                None => continue,
            }
        };

        out.push(new_opportunity(OpportunityKind::Edge, vec![leg], edge_pct, estimate.confidence, market.liquidity, config.opportunity_ttl_ms));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Outcome;
    use crate::matcher::MatchMethod;
    use rust_decimal_macros::dec;

    fn market(venue: &str, yes: Decimal, no: Decimal, vol: Decimal) -> Market {
        Market {
            venue: venue.into(),
            market_id: "m".into(),
            question: "Will X win?".into(),
            slug: None,
            outcomes: vec![Outcome::new("Yes", yes, vol), Outcome::new("No", no, vol)],
            volume_24h: vol,
            liquidity: vol,
            end_date: None,
        }
    }

    #[test]
    fn internal_arb_scenario_fee_zero() {
        let config = EngineConfig { min_edge_pct: 1.0, min_liquidity: dec!(500), ..EngineConfig::default() };
        let normalizer = OutcomeNormalizer::new();
        let m = market("v1", dec!(0.48), dec!(0.50), dec!(2000));
        let opps = internal_arbitrage(&[m], &normalizer, &config);
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].edge_pct, dec!(2.0));
        assert_eq!(opps[0].confidence, 0.9);
    }

    #[test]
    fn internal_arb_zero_when_sum_at_least_one() {
        let config = EngineConfig::default();
        let normalizer = OutcomeNormalizer::new();
        let m = market("v1", dec!(0.55), dec!(0.50), dec!(2000));
        let opps = internal_arbitrage(&[m], &normalizer, &config);
        assert!(opps.is_empty());
    }

    #[test]
    fn cross_platform_verified_scenario() {
        let config = EngineConfig { min_edge_pct: 1.0, min_liquidity: dec!(500), ..EngineConfig::default() };
        let normalizer = OutcomeNormalizer::new();
        let a = market("v1", dec!(0.40), dec!(0.60), dec!(1000));
        let b = market("v2", dec!(0.55), dec!(0.45), dec!(1000));
        let mut markets_by_key = HashMap::new();
        markets_by_key.insert(a.key(), a.clone());
        markets_by_key.insert(b.key(), b.clone());

        let group = MatchGroup {
            canonical_id: "g".into(),
            markets: vec![a.key(), b.key()],
            method: MatchMethod::Slug,
            similarity: 1.0,
            verification: None,
            needs_review: false,
        };

        let opps = cross_platform_arbitrage(&[group], &markets_by_key, &normalizer, &config);
        assert_eq!(opps.len(), 1);
        assert!((opps[0].edge_pct.to_f64().unwrap() - 15.0).abs() < 1e-6);
    }

    #[test]
    fn cross_platform_needs_review_suppresses_opportunities() {
        let config = EngineConfig { min_edge_pct: 1.0, min_liquidity: dec!(500), ..EngineConfig::default() };
        let normalizer = OutcomeNormalizer::new();
        let a = market("v1", dec!(0.40), dec!(0.60), dec!(1000));
        let b = market("v2", dec!(0.55), dec!(0.45), dec!(1000));
        let mut markets_by_key = HashMap::new();
        markets_by_key.insert(a.key(), a.clone());
        markets_by_key.insert(b.key(), b.clone());

        let group = MatchGroup {
            canonical_id: "g".into(),
            markets: vec![a.key(), b.key()],
            method: MatchMethod::Text,
            similarity: 0.8,
            verification: None,
            needs_review: true,
        };

        let opps = cross_platform_arbitrage(&[group], &markets_by_key, &normalizer, &config);
        assert!(opps.is_empty());
    }
}
