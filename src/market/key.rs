//! Canonical `"<venue>:<marketID>"` market identity.

use std::fmt;

/// The pair (venue, marketID) rendered in canonical lowercase form.
///
/// All cross-component references (matcher, linker, opportunities,
/// analytics) use `MarketKey`, never a raw `(venue, id)` pair, so a single
/// normalization point governs equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketKey(String);

impl MarketKey {
    #[must_use]
    pub fn new(venue: &str, market_id: &str) -> Self {
        Self(format!("{}:{}", venue.trim().to_lowercase(), market_id.trim().to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into (venue, marketID) as they were canonicalized.
    #[must_use]
    pub fn parts(&self) -> (&str, &str) {
        self.0.split_once(':').unwrap_or((&self.0, ""))
    }

    #[must_use]
    pub fn venue(&self) -> &str {
        self.parts().0
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarketKey {
    /// Parse an already-canonical `"venue:id"` string (e.g. round-tripped
    /// from storage). Does not re-lowercase the id portion if it wasn't
    /// already, by design: this is for trusted round-trips, use `new` for
    /// fresh venue/id pairs.
    fn from(s: &str) -> Self {
        Self(s.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_case_and_whitespace() {
        let k = MarketKey::new(" Polymarket ", "ABC-123");
        assert_eq!(k.as_str(), "polymarket:abc-123");
    }

    #[test]
    fn parts_round_trip() {
        let k = MarketKey::new("Kalshi", "XYZ");
        assert_eq!(k.parts(), ("kalshi", "xyz"));
        assert_eq!(k.venue(), "kalshi");
    }
}
