//! Cross-venue market identity matching (C3).

mod entities;
mod text;

pub use entities::{EntitySet, MismatchWarning, VerificationReport};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::cache::Cache;
use crate::market::{Market, MarketKey};
use crate::ports::{cosine_similarity, EmbeddingsService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Manual,
    Slug,
    Semantic,
    Text,
}

#[derive(Debug, Clone)]
pub struct MatchGroup {
    pub canonical_id: String,
    pub markets: Vec<MarketKey>,
    pub method: MatchMethod,
    pub similarity: f64,
    pub verification: Option<VerificationReport>,
    pub needs_review: bool,
}

impl MatchGroup {
    #[must_use]
    pub fn venue_count(&self) -> usize {
        self.markets.iter().map(MarketKey::venue).collect::<std::collections::HashSet<_>>().len()
    }
}

#[derive(Debug, Clone)]
pub struct PairMatch {
    pub matches: bool,
    pub similarity: f64,
    pub method: MatchMethod,
    pub verification: Option<VerificationReport>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub semantic_matching: bool,
    pub similarity_threshold: f64,
    pub overlap_threshold: f64,
    /// Toggles the Jaccard token-overlap fallback (step 5d). Exists so
    /// startup validation can detect "both matching methods disabled but
    /// cross-platform requested" (spec §7 Fatal) — with this off and
    /// `semantic_matching` off, no cross-venue match can ever be produced.
    pub text_matching: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { semantic_matching: true, similarity_threshold: 0.85, overlap_threshold: 0.5, text_matching: true }
    }
}

/// Decides whether two venue markets represent the same event.
pub struct MarketMatcher {
    config: MatcherConfig,
    extractor: entities::EntityExtractor,
    manual_links: RwLock<Vec<(MarketKey, MarketKey)>>,
    embeddings: Option<Arc<dyn EmbeddingsService>>,
    embedding_cache: Cache<String, Vec<f32>>,
}

impl MarketMatcher {
    #[must_use]
    pub fn new(config: MatcherConfig, embeddings: Option<Arc<dyn EmbeddingsService>>) -> Self {
        Self {
            config,
            extractor: entities::EntityExtractor::new(),
            manual_links: RwLock::new(Vec::new()),
            embeddings,
            embedding_cache: Cache::new(10_000),
        }
    }

    pub fn add_manual_link(&self, a: MarketKey, b: MarketKey) {
        let mut links = self.manual_links.write();
        if !links.iter().any(|(x, y)| (x == &a && y == &b) || (x == &b && y == &a)) {
            links.push((a, b));
        }
    }

    pub fn remove_manual_link(&self, a: &MarketKey, b: &MarketKey) {
        self.manual_links
            .write()
            .retain(|(x, y)| !((x == a && y == b) || (x == b && y == a)));
    }

    fn is_manually_linked(&self, a: &MarketKey, b: &MarketKey) -> bool {
        self.manual_links.read().iter().any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Verify a candidate match by extracting and comparing entity sets.
    #[must_use]
    pub fn verify_match(&self, a: &Market, b: &Market) -> VerificationReport {
        let ea = self.extractor.extract(&a.question.to_lowercase());
        let eb = self.extractor.extract(&b.question.to_lowercase());
        entities::verify(&ea, &eb)
    }

    /// Ordered pairwise matching attempts per spec §4.3 step 5.
    pub async fn are_matching(&self, a: &Market, b: &Market) -> PairMatch {
        let ka = a.key();
        let kb = b.key();

        if self.is_manually_linked(&ka, &kb) {
            return PairMatch { matches: true, similarity: 1.0, method: MatchMethod::Manual, verification: None };
        }

        if let (Some(sa), Some(sb)) = (&a.slug, &b.slug) {
            if !sa.is_empty() && sa == sb {
                return PairMatch { matches: true, similarity: 1.0, method: MatchMethod::Slug, verification: None };
            }
        }

        if self.config.semantic_matching {
            if let Some(embeddings) = &self.embeddings {
                if let (Ok(ea), Ok(eb)) = (
                    self.embed_cached(embeddings.as_ref(), &a.question).await,
                    self.embed_cached(embeddings.as_ref(), &b.question).await,
                ) {
                    let sim = cosine_similarity(&ea, &eb);
                    if sim >= self.config.similarity_threshold {
                        let report = self.verify_match(a, b);
                        return PairMatch {
                            matches: report.verified,
                            similarity: sim,
                            method: MatchMethod::Semantic,
                            verification: Some(report),
                        };
                    }
                }
            }
        }

        let ta = text::tokenize(&text::normalize_question(&a.question));
        let tb = text::tokenize(&text::normalize_question(&b.question));
        let overlap = text::jaccard(&ta, &tb);
        if self.config.text_matching && overlap >= self.config.overlap_threshold {
            let report = self.verify_match(a, b);
            return PairMatch {
                matches: report.confidence >= 0.5,
                similarity: overlap,
                method: MatchMethod::Text,
                verification: Some(report),
            };
        }

        PairMatch { matches: false, similarity: overlap, method: MatchMethod::Text, verification: None }
    }

    async fn embed_cached(&self, embeddings: &dyn EmbeddingsService, text: &str) -> crate::error::Result<Vec<f32>> {
        let key = text.to_string();
        if let Some(hit) = self.embedding_cache.get(&key) {
            return Ok(hit);
        }
        let vector = embeddings.embed(text).await?;
        self.embedding_cache.set(key, vector.clone(), Some(Duration::from_secs(3600)));
        Ok(vector)
    }

    /// Fast grouping + pairwise verification + manual-link sweep.
    ///
    /// Markets are processed in the order received; tie-breaks on
    /// similarity prefer the earliest candidate.
    pub async fn find_matches(&self, markets: &[Market]) -> Vec<MatchGroup> {
        let canonical_ids: Vec<String> = markets
            .iter()
            .map(|m| text::canonical_id(&text::tokenize(&text::normalize_question(&m.question))))
            .collect();

        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, cid) in canonical_ids.iter().enumerate() {
            buckets.entry(cid.clone()).or_default().push(idx);
        }

        let mut groups = Vec::new();
        let mut already_grouped: std::collections::HashSet<MarketKey> = std::collections::HashSet::new();

        for (cid, indices) in &buckets {
            let venues: std::collections::HashSet<&str> = indices.iter().map(|&i| markets[i].venue.as_str()).collect();

            if venues.len() < 2 {
                // Single-venue bucket: still emitted, used for internal arbitrage.
                let keys: Vec<MarketKey> = indices.iter().map(|&i| markets[i].key()).collect();
                for k in &keys {
                    already_grouped.insert(k.clone());
                }
                groups.push(MatchGroup {
                    canonical_id: cid.clone(),
                    markets: keys,
                    method: MatchMethod::Text,
                    similarity: 1.0,
                    verification: None,
                    needs_review: false,
                });
                continue;
            }

            // The bucket itself is the candidate group (spec §4.3 step 4);
            // pairwise matching (step 5) and verification (step 6) decide
            // *how confidently* it was matched and whether it needs review,
            // not whether a member is excluded — a verification mismatch
            // keeps both markets in the group but flags it, which is what
            // suppresses downstream cross-platform opportunities.
            let mut best_method = MatchMethod::Text;
            let mut best_similarity = 0.0_f64;
            let mut best_verification: Option<VerificationReport> = None;
            let mut needs_review = false;

            for i in 0..indices.len() {
                for &cand in &indices[i + 1..] {
                    let pm = self.are_matching(&markets[indices[i]], &markets[cand]).await;
                    if let Some(v) = &pm.verification {
                        if v.needs_review {
                            needs_review = true;
                        }
                    }
                    if pm.similarity >= best_similarity {
                        best_similarity = pm.similarity;
                        best_method = pm.method;
                        if pm.verification.is_some() {
                            best_verification = pm.verification.clone();
                        }
                    }
                }
            }

            let keys: Vec<MarketKey> = indices.iter().map(|&i| markets[i].key()).collect();
            for k in &keys {
                already_grouped.insert(k.clone());
            }
            groups.push(MatchGroup {
                canonical_id: cid.clone(),
                markets: keys,
                method: best_method,
                similarity: best_similarity,
                verification: best_verification,
                needs_review,
            });
        }

        // Manual-link sweep: append groups for hand-curated pairs not
        // already captured by the bucketing pass above.
        let manual = self.manual_links.read().clone();
        for (a, b) in manual {
            if already_grouped.contains(&a) && already_grouped.contains(&b) {
                continue;
            }
            groups.push(MatchGroup {
                canonical_id: format!("manual_{a}_{b}"),
                markets: vec![a, b],
                method: MatchMethod::Manual,
                similarity: 1.0,
                verification: None,
                needs_review: false,
            });
        }

        groups
    }
}
