//! Shared market data model.
//!
//! Markets are read-only inputs pulled from a [`crate::ports::MarketFeed`];
//! the engine never owns or mutates them. [`MarketKey`] is the canonical
//! cross-component reference used everywhere a market identity needs to be
//! threaded through (matching, linking, opportunities, analytics).

mod key;

pub use key::MarketKey;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A single outcome within a market.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub name: String,
    pub price: Decimal,
    pub volume_24h: Decimal,
}

impl Outcome {
    #[must_use]
    pub fn new(name: impl Into<String>, price: Decimal, volume_24h: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            volume_24h,
        }
    }
}

/// A market as reported by a venue, read-only within the core.
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub venue: String,
    pub market_id: String,
    pub question: String,
    pub slug: Option<String>,
    pub outcomes: Vec<Outcome>,
    pub volume_24h: Decimal,
    pub liquidity: Decimal,
    pub end_date: Option<DateTime<Utc>>,
}

impl Market {
    #[must_use]
    pub fn key(&self) -> MarketKey {
        MarketKey::new(&self.venue, &self.market_id)
    }

    /// A market is binary iff it has exactly two outcomes.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.outcomes.len() == 2
    }

    #[must_use]
    pub fn outcome_by_name(&self, name: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market {
            venue: "Polymarket".into(),
            market_id: "abc-123".into(),
            question: "Will it rain tomorrow?".into(),
            slug: Some("will-it-rain".into()),
            outcomes: vec![
                Outcome::new("Yes", dec!(0.40), dec!(1000)),
                Outcome::new("No", dec!(0.55), dec!(1000)),
            ],
            volume_24h: dec!(2000),
            liquidity: dec!(5000),
            end_date: None,
        }
    }

    #[test]
    fn key_is_lowercase_canonical() {
        assert_eq!(market().key().as_str(), "polymarket:abc-123");
    }

    #[test]
    fn is_binary_true_for_two_outcomes() {
        assert!(market().is_binary());
    }

    #[test]
    fn outcome_by_name_is_case_insensitive() {
        let m = market();
        assert_eq!(m.outcome_by_name("YES").unwrap().price, dec!(0.40));
    }
}
