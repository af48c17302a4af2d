//! Entity extraction for match verification.
//!
//! Expressed as a table of `(Regex, EntityClass)` rules compiled once at
//! [`EntityExtractor`] construction, per the design note that regex-heavy
//! extraction should stay data-driven and precompiled rather than ad hoc.

use std::collections::HashSet;

use regex::Regex;

const PERSONS: &[&str] = &[
    "trump", "biden", "harris", "vance", "desantis", "newsom", "musk", "powell",
];
const TEAMS: &[&str] = &[
    "lakers", "celtics", "warriors", "chiefs", "eagles", "yankees", "dodgers", "cowboys",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySet {
    pub years: HashSet<String>,
    pub dates: HashSet<String>,
    pub thresholds: HashSet<String>,
    pub persons: HashSet<String>,
    pub teams: HashSet<String>,
    pub numbers: HashSet<String>,
}

pub struct EntityExtractor {
    year_re: Regex,
    month_day_re: Regex,
    threshold_pct_re: Regex,
    threshold_dollar_re: Regex,
    number_re: Regex,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            year_re: Regex::new(r"\b(20[2-3][0-9])\b").unwrap(),
            month_day_re: Regex::new(
                r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t|tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s*\d{0,2}\b",
            )
            .unwrap(),
            threshold_pct_re: Regex::new(r"\b(\d+(?:\.\d+)?)\s*(%|percent|bps?|basis points)\b").unwrap(),
            threshold_dollar_re: Regex::new(r"\$\s*(\d+(?:\.\d+)?)\s*(k|m|b)?\b").unwrap(),
            number_re: Regex::new(r"\b(\d+(?:\.\d+)?)\b").unwrap(),
        }
    }

    /// Extract all entity classes from a (lowercased) question text.
    #[must_use]
    pub fn extract(&self, question_lower: &str) -> EntitySet {
        let mut set = EntitySet::default();

        for m in self.year_re.find_iter(question_lower) {
            let y: i32 = m.as_str().parse().unwrap_or(0);
            if (2020..=2039).contains(&y) {
                set.years.insert(m.as_str().to_string());
            }
        }
        for m in self.month_day_re.find_iter(question_lower) {
            set.dates.insert(m.as_str().trim().to_string());
        }
        for c in self.threshold_pct_re.captures_iter(question_lower) {
            set.thresholds.insert(format!("{}{}", &c[1], &c[2]));
        }
        for c in self.threshold_dollar_re.captures_iter(question_lower) {
            set.thresholds.insert(format!("${}{}", &c[1], c.get(2).map_or("", |m| m.as_str())));
        }
        for person in PERSONS {
            if question_lower.contains(person) {
                set.persons.insert((*person).to_string());
            }
        }
        for team in TEAMS {
            if question_lower.contains(team) {
                set.teams.insert((*team).to_string());
            }
        }
        for (i, m) in self.number_re.find_iter(question_lower).enumerate() {
            if i >= 10 {
                break;
            }
            set.numbers.insert(m.as_str().to_string());
        }

        set
    }
}

/// A single entity-class disagreement found during verification.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchWarning {
    pub class: &'static str,
    pub a: String,
    pub b: String,
}

/// Critical classes whose non-empty-vs-non-empty disagreement reduces
/// confidence and sets `needs_review`.
const CRITICAL_CLASSES: &[&str] = &["year", "date", "threshold", "person", "team"];

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub entities_a: EntitySet,
    pub entities_b: EntitySet,
    pub warnings: Vec<MismatchWarning>,
    pub confidence: f64,
    pub verified: bool,
    pub needs_review: bool,
}

/// Two numeric-ish string values are "the same" if within 10% relative
/// difference of one another.
fn numbers_close(a: &str, b: &str) -> bool {
    let parse = |s: &str| -> Option<f64> { s.trim_matches(|c: char| !c.is_ascii_digit() && c != '.').parse().ok() };
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) if x != 0.0 || y != 0.0 => {
            let denom = x.abs().max(y.abs()).max(1e-9);
            (x - y).abs() / denom <= 0.10
        }
        _ => a == b,
    }
}

fn disagreement(class: &'static str, a: &HashSet<String>, b: &HashSet<String>) -> Option<MismatchWarning> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let agrees = a.iter().any(|x| b.iter().any(|y| x == y || numbers_close(x, y)));
    if agrees {
        None
    } else {
        Some(MismatchWarning {
            class,
            a: a.iter().cloned().collect::<Vec<_>>().join(","),
            b: b.iter().cloned().collect::<Vec<_>>().join(","),
        })
    }
}

/// Compare two entity sets class-by-class and produce a verification
/// report. Penalties per critical-class mismatch are 0.3–0.5; two or more
/// warnings, or confidence < 0.7, yields `verified = false`.
#[must_use]
pub fn verify(a: &EntitySet, b: &EntitySet) -> VerificationReport {
    let mut warnings = Vec::new();
    let mut confidence = 1.0_f64;

    let checks: &[(&'static str, &HashSet<String>, &HashSet<String>, f64)] = &[
        ("year", &a.years, &b.years, 0.5),
        ("date", &a.dates, &b.dates, 0.4),
        ("threshold", &a.thresholds, &b.thresholds, 0.4),
        ("person", &a.persons, &b.persons, 0.5),
        ("team", &a.teams, &b.teams, 0.3),
    ];

    for (class, sa, sb, penalty) in checks {
        if let Some(w) = disagreement(class, sa, sb) {
            confidence -= penalty;
            warnings.push(w);
        }
    }

    confidence = confidence.clamp(0.0, 1.0);
    let needs_review = !warnings.is_empty();
    let verified = warnings.len() < 2 && confidence >= 0.7;

    VerificationReport {
        entities_a: a.clone(),
        entities_b: b.clone(),
        warnings,
        confidence,
        verified,
        needs_review,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_year_in_range() {
        let ex = EntityExtractor::new();
        let set = ex.extract("will X win the 2028 election");
        assert!(set.years.contains("2028"));
    }

    #[test]
    fn ignores_years_outside_range() {
        let ex = EntityExtractor::new();
        let set = ex.extract("founded in 1999 and reopening in 2050");
        assert!(set.years.is_empty());
    }

    #[test]
    fn extracts_percent_threshold() {
        let ex = EntityExtractor::new();
        let set = ex.extract("will cpi exceed 3.5% in march");
        assert!(set.thresholds.contains("3.5%"));
    }

    #[test]
    fn year_mismatch_sets_needs_review() {
        let ex = EntityExtractor::new();
        let a = ex.extract("will x win the 2028 election");
        let b = ex.extract("will x win the 2024 election");
        let report = verify(&a, &b);
        assert!(report.needs_review);
        assert!(!report.verified);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn identical_questions_verify_clean() {
        let ex = EntityExtractor::new();
        let a = ex.extract("will x win the 2028 election");
        let b = ex.extract("will x win the 2028 election");
        let report = verify(&a, &b);
        assert!(report.verified);
        assert!(!report.needs_review);
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn numeric_thresholds_within_ten_percent_agree() {
        let ex = EntityExtractor::new();
        let a = ex.extract("will inflation exceed 3.0%");
        let b = ex.extract("will inflation exceed 3.1%");
        let report = verify(&a, &b);
        assert!(report.verified);
    }
}
