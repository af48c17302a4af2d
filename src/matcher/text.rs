//! Question-text normalization, tokenization, and canonical-ID derivation.

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("sept", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
    ("us", "united states"),
    ("uk", "united kingdom"),
    ("fed", "federal reserve"),
    ("fomc", "federal reserve"),
    ("gdp", "gross domestic product"),
    ("cpi", "consumer price index"),
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "will", "be", "to", "of", "in", "on", "at",
    "for", "and", "or", "by", "with", "as", "it", "this", "that", "has", "have", "had", "do",
    "does", "did", "if", "than", "then", "what", "who", "which",
];

/// Lowercase, expand domain abbreviations, drop punctuation, collapse
/// whitespace.
#[must_use]
pub fn normalize_question(question: &str) -> String {
    let lower = question.to_lowercase();
    let expanded = expand_abbreviations(&lower);
    let no_symbols = replace_numeric_suffixes(&expanded);
    let no_punct: String = no_symbols
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    no_punct.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn expand_abbreviations(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
        if let Some((_, full)) = ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == bare) {
            words.push((*full).to_string());
        } else {
            words.push(word.to_string());
        }
    }
    words.join(" ")
}

fn replace_numeric_suffixes(text: &str) -> String {
    text.replace('%', " percent ").replace('$', " dollar ").replace("bp", " bp ")
}

/// Split on whitespace, drop stop words and single-character tokens.
#[must_use]
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// First 8 tokens joined by `_`; stable and dependency-free.
///
/// Bare 4-digit year tokens are collapsed to a `YEAR` placeholder first so
/// that same-event questions differing only by year ("...2028 election"
/// vs "...2024 election") still land in the same bucket for pairwise
/// verification — the actual year values are compared (and can still
/// trigger `needsReview`) by entity verification, not by bucketing.
#[must_use]
pub fn canonical_id(tokens: &[String]) -> String {
    tokens
        .iter()
        .take(8)
        .map(|t| if is_year_token(t) { "year" } else { t.as_str() })
        .collect::<Vec<_>>()
        .join("_")
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4 && token.parse::<u32>().map(|y| (1900..=2099).contains(&y)).unwrap_or(false)
}

/// Jaccard similarity of two token sets.
#[must_use]
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let sa: HashSet<&String> = a.iter().collect();
    let sb: HashSet<&String> = b.iter().collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_abbreviations_and_punctuation() {
        let n = normalize_question("Will the FED raise rates by 50bp in Jan 2028?");
        assert!(n.contains("federal reserve"));
        assert!(n.contains("january"));
        assert!(!n.contains('?'));
    }

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("will the us win a war");
        assert_eq!(tokens, vec!["win", "war"]);
    }

    #[test]
    fn canonical_id_takes_first_eight_tokens() {
        let tokens: Vec<String> = (1..=10).map(|i| format!("t{i}")).collect();
        assert_eq!(canonical_id(&tokens), "t1_t2_t3_t4_t5_t6_t7_t8");
    }

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a = vec!["a".to_string(), "b".to_string()];
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sets_is_zero() {
        let a = vec!["a".to_string()];
        let b = vec!["b".to_string()];
        assert_eq!(jaccard(&a, &b), 0.0);
    }
}
