//! Outcome-label normalization (C2).
//!
//! Maps venue-specific outcome labels ("Yes", "Will happen", "Under 50",
//! ...) to the canonical set `{Yes, No, Other}`, with inverse-semantics
//! detection (e.g. "Will NOT happen" maps to `No` with `is_inverse = true`
//! describing the label's relationship to the raw text, not the resolved
//! value).

use dashmap::DashMap;

use crate::market::{Market, Outcome};

/// Canonical outcome value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedLabel {
    Yes,
    No,
    Other,
}

/// Result of normalizing a single label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedOutcome {
    pub normalized: NormalizedLabel,
    pub is_inverse: bool,
    pub confidence: f64,
}

const YES_PATTERNS: &[&str] = &[
    "yes", "y", "true", "will happen", "will occur", "win", "above", "over", "pass",
];
const NO_PATTERNS: &[&str] = &[
    "no", "n", "false", "will not happen", "won't happen", "lose", "below", "under", "fail",
];
const INVERSE_PREFIXES: &[&str] = &["not ", "won't ", "will not ", "non-", "un"];

/// Maps venue-specific outcome labels to the canonical set, with a small
/// mutable alias table layered on top of the fixed pattern tables.
pub struct OutcomeNormalizer {
    aliases: DashMap<String, NormalizedOutcome>,
}

impl Default for OutcomeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            aliases: DashMap::new(),
        }
    }

    /// Register a custom alias that takes priority over the fixed tables.
    pub fn add_alias(&self, label: &str, outcome: NormalizedOutcome) {
        self.aliases.insert(label.trim().to_lowercase(), outcome);
    }

    #[must_use]
    pub fn normalize(&self, label: &str) -> NormalizedOutcome {
        let key = label.trim().to_lowercase();
        if let Some(alias) = self.aliases.get(&key) {
            return *alias;
        }

        let (stripped, is_inverse) = strip_inverse_prefix(&key);

        if let Some(conf) = match_confidence(stripped, YES_PATTERNS) {
            let normalized = if is_inverse { NormalizedLabel::No } else { NormalizedLabel::Yes };
            return NormalizedOutcome { normalized, is_inverse, confidence: conf };
        }
        if let Some(conf) = match_confidence(stripped, NO_PATTERNS) {
            let normalized = if is_inverse { NormalizedLabel::Yes } else { NormalizedLabel::No };
            return NormalizedOutcome { normalized, is_inverse, confidence: conf };
        }

        NormalizedOutcome {
            normalized: NormalizedLabel::Other,
            is_inverse: false,
            confidence: 0.5,
        }
    }

    /// `FindYes`: (a) high-confidence YES match; (b) any YES match;
    /// (c) outcome[0] on binary markets.
    #[must_use]
    pub fn find_yes<'a>(&self, market: &'a Market) -> Option<&'a Outcome> {
        self.find_best(market, NormalizedLabel::Yes)
            .or_else(|| if market.is_binary() { market.outcomes.first() } else { None })
    }

    /// `FindNo`: symmetric to `find_yes`, falling back to outcome[1].
    #[must_use]
    pub fn find_no<'a>(&self, market: &'a Market) -> Option<&'a Outcome> {
        self.find_best(market, NormalizedLabel::No)
            .or_else(|| if market.is_binary() { market.outcomes.get(1) } else { None })
    }

    fn find_best<'a>(&self, market: &'a Market, want: NormalizedLabel) -> Option<&'a Outcome> {
        let mut best: Option<(&Outcome, f64)> = None;
        for outcome in &market.outcomes {
            let n = self.normalize(&outcome.name);
            if n.normalized == want {
                match best {
                    Some((_, conf)) if conf >= n.confidence => {}
                    _ => best = Some((outcome, n.confidence)),
                }
            }
        }
        best.map(|(o, _)| o)
    }

    /// Two labels are equivalent: for `Other`, decided by case-insensitive
    /// label equality; otherwise by matching normalized value and inverse flag.
    #[must_use]
    pub fn are_equivalent(&self, a: &str, b: &str) -> bool {
        let na = self.normalize(a);
        let nb = self.normalize(b);
        if na.normalized == NormalizedLabel::Other || nb.normalized == NormalizedLabel::Other {
            return a.trim().eq_ignore_ascii_case(b.trim());
        }
        na.normalized == nb.normalized && na.is_inverse == nb.is_inverse
    }

    /// Two labels are inverse of one another (Yes vs No after resolving
    /// prefixes), used to detect hedges across markets.
    #[must_use]
    pub fn are_inverse(&self, a: &str, b: &str) -> bool {
        let na = self.normalize(a);
        let nb = self.normalize(b);
        matches!(
            (na.normalized, nb.normalized),
            (NormalizedLabel::Yes, NormalizedLabel::No) | (NormalizedLabel::No, NormalizedLabel::Yes)
        )
    }
}

fn strip_inverse_prefix(label: &str) -> (&str, bool) {
    for prefix in INVERSE_PREFIXES {
        if let Some(rest) = label.strip_prefix(prefix) {
            return (rest, true);
        }
    }
    (label, false)
}

fn match_confidence(label: &str, table: &[&str]) -> Option<f64> {
    if table.contains(&label) {
        Some(if label.len() > 1 { 0.95 } else { 0.7 })
    } else {
        None
    }
}

/// Implied probability of an outcome is simply its price (markets price in
/// probability terms already); exposed for callers that want the concept
/// spelled out rather than reading `.price` directly.
#[must_use]
pub fn implied_probability(price: rust_decimal::Decimal) -> rust_decimal::Decimal {
    price
}

/// Overround (vig): sum of all outcome prices minus 1. Positive overround
/// means the market is priced above fair value in aggregate.
#[must_use]
pub fn overround(market: &Market) -> rust_decimal::Decimal {
    market.outcomes.iter().map(|o| o.price).sum::<rust_decimal::Decimal>()
        - rust_decimal::Decimal::ONE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    fn binary_market(yes_label: &str, no_label: &str) -> Market {
        Market {
            venue: "v".into(),
            market_id: "m".into(),
            question: "q".into(),
            slug: None,
            outcomes: vec![
                Outcome::new(yes_label, dec!(0.4), dec!(100)),
                Outcome::new(no_label, dec!(0.5), dec!(100)),
            ],
            volume_24h: dec!(200),
            liquidity: dec!(1000),
            end_date: None,
        }
    }

    #[test]
    fn normalizes_plain_yes_no() {
        let n = OutcomeNormalizer::new();
        assert_eq!(n.normalize("Yes").normalized, NormalizedLabel::Yes);
        assert_eq!(n.normalize("No").normalized, NormalizedLabel::No);
    }

    #[test]
    fn inverse_prefix_flips_value() {
        let n = OutcomeNormalizer::new();
        let r = n.normalize("Will Not Happen");
        assert_eq!(r.normalized, NormalizedLabel::No);
        assert!(r.is_inverse);
    }

    #[test]
    fn unrecognized_label_is_other_with_half_confidence() {
        let n = OutcomeNormalizer::new();
        let r = n.normalize("Blue");
        assert_eq!(r.normalized, NormalizedLabel::Other);
        assert_eq!(r.confidence, 0.5);
    }

    #[test]
    fn find_yes_falls_back_to_first_outcome_on_binary_market() {
        let n = OutcomeNormalizer::new();
        let m = binary_market("Team A", "Team B");
        assert_eq!(n.find_yes(&m).unwrap().name, "Team A");
        assert_eq!(n.find_no(&m).unwrap().name, "Team B");
    }

    #[test]
    fn find_yes_prefers_recognized_label_over_position() {
        let n = OutcomeNormalizer::new();
        let m = binary_market("No", "Yes");
        assert_eq!(n.find_yes(&m).unwrap().name, "Yes");
        assert_eq!(n.find_no(&m).unwrap().name, "No");
    }

    #[test]
    fn custom_alias_takes_priority() {
        let n = OutcomeNormalizer::new();
        n.add_alias(
            "Hodl",
            NormalizedOutcome { normalized: NormalizedLabel::Yes, is_inverse: false, confidence: 1.0 },
        );
        assert_eq!(n.normalize("hodl").normalized, NormalizedLabel::Yes);
    }

    #[test]
    fn are_inverse_detects_yes_no_pair() {
        let n = OutcomeNormalizer::new();
        assert!(n.are_inverse("Yes", "No"));
        assert!(!n.are_inverse("Yes", "Yes"));
    }

    #[test]
    fn overround_is_sum_minus_one() {
        let m = binary_market("Yes", "No");
        assert_eq!(overround(&m), dec!(-0.1));
    }
}
