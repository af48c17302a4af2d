//! Persistent market identity graph (C4).
//!
//! Confirmed matches are edges in an undirected graph keyed by
//! [`MarketKey`]. The graph is authoritative in memory (a `DashMap`
//! adjacency list rebuilt from the store at startup) and durable via
//! [`LinkStore`]; `get_identity` walks the graph to find the transitive
//! closure of a market's cross-venue identity.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;

use crate::error::Result;
use crate::market::MarketKey;
use crate::ports::{LinkRecord, LinkSource, LinkStore};

#[derive(Debug, Clone)]
pub struct Link {
    pub id: String,
    pub a: MarketKey,
    pub b: MarketKey,
    pub confidence: f64,
    pub source: LinkSource,
}

/// Link IDs are derived from the sorted `(a,b)` pair rather than generated
/// randomly, so `Link` is idempotent on duplicate input across restarts and
/// writers, not just within one process's `get_link` check (spec §4.4).
#[must_use]
pub fn link_id(a: &MarketKey, b: &MarketKey) -> String {
    if a <= b {
        format!("{}|{}", a.as_str(), b.as_str())
    } else {
        format!("{}|{}", b.as_str(), a.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkerStats {
    pub markets: usize,
    pub links: usize,
    pub identity_groups: usize,
}

/// Tracks confirmed identity relationships between markets across venues.
pub struct MarketLinker {
    store: Arc<dyn LinkStore>,
    adjacency: DashMap<MarketKey, Vec<(MarketKey, String)>>,
    links: DashMap<String, Link>,
}

impl MarketLinker {
    #[must_use]
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store, adjacency: DashMap::new(), links: DashMap::new() }
    }

    /// Rebuild the in-memory adjacency cache from the backing store.
    /// Must be called once at startup before any reads are trusted.
    pub async fn load(&self) -> Result<()> {
        self.adjacency.clear();
        self.links.clear();
        for record in self.store.all_links().await? {
            self.insert_local(record.id.clone(), record.market_a, record.market_b, record.confidence, record.source);
        }
        Ok(())
    }

    fn insert_local(&self, id: String, a: MarketKey, b: MarketKey, confidence: f64, source: LinkSource) {
        self.adjacency.entry(a.clone()).or_default().push((b.clone(), id.clone()));
        self.adjacency.entry(b.clone()).or_default().push((a.clone(), id.clone()));
        self.links.insert(id.clone(), Link { id, a, b, confidence, source });
    }

    fn remove_local(&self, id: &str) -> Option<Link> {
        let link = self.links.remove(id).map(|(_, l)| l)?;
        if let Some(mut edges) = self.adjacency.get_mut(&link.a) {
            edges.retain(|(_, eid)| eid != id);
        }
        if let Some(mut edges) = self.adjacency.get_mut(&link.b) {
            edges.retain(|(_, eid)| eid != id);
        }
        Some(link)
    }

    pub async fn link(&self, a: MarketKey, b: MarketKey, confidence: f64, source: LinkSource) -> Result<Link> {
        if a == b {
            return Err(crate::error::EngineError::InvalidLink("cannot link a market to itself".into()).into());
        }
        if let Some(existing) = self.get_link(&a, &b) {
            return Ok(existing);
        }
        let id = link_id(&a, &b);
        let record = LinkRecord { id: id.clone(), market_a: a.clone(), market_b: b.clone(), confidence, source, created_at: Utc::now(), metadata: None };
        self.store.save_link(&record).await?;
        self.insert_local(id, a, b, confidence, source);
        Ok(self.links.get(&record.id).map(|l| l.clone()).unwrap())
    }

    pub async fn unlink(&self, a: &MarketKey, b: &MarketKey) -> Result<bool> {
        let Some(link) = self.get_link(a, b) else {
            return Ok(false);
        };
        self.store.delete_link(&link.id).await?;
        self.remove_local(&link.id);
        Ok(true)
    }

    #[must_use]
    pub fn get_link(&self, a: &MarketKey, b: &MarketKey) -> Option<Link> {
        self.adjacency.get(a)?.iter().find(|(other, _)| other == b).and_then(|(_, id)| self.links.get(id).map(|l| l.clone()))
    }

    #[must_use]
    pub fn are_linked(&self, a: &MarketKey, b: &MarketKey) -> bool {
        self.get_link(a, b).is_some()
    }

    /// Direct neighbors of a market (one hop).
    #[must_use]
    pub fn get_links(&self, market: &MarketKey) -> Vec<Link> {
        self.adjacency
            .get(market)
            .map(|edges| edges.iter().filter_map(|(_, id)| self.links.get(id).map(|l| l.clone())).collect())
            .unwrap_or_default()
    }

    /// Transitive closure of a market's cross-venue identity via BFS.
    /// Results are sorted by confidence descending (the edge confidence
    /// by which each node was first reached); the queried market itself
    /// always leads with confidence 1.0, making it the primary.
    #[must_use]
    pub fn get_identity(&self, market: &MarketKey) -> Vec<MarketKey> {
        let mut best_confidence: std::collections::HashMap<MarketKey, f64> = std::collections::HashMap::new();
        let mut queue = VecDeque::new();
        best_confidence.insert(market.clone(), 1.0);
        queue.push_back(market.clone());

        while let Some(current) = queue.pop_front() {
            if let Some(edges) = self.adjacency.get(&current) {
                for (neighbor, link_id) in edges.iter() {
                    let confidence = self.links.get(link_id).map_or(0.0, |l| l.confidence);
                    let improved = match best_confidence.get(neighbor) {
                        Some(existing) => confidence > *existing,
                        None => true,
                    };
                    if improved {
                        best_confidence.insert(neighbor.clone(), confidence);
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        let mut result: Vec<(MarketKey, f64)> = best_confidence.into_iter().collect();
        result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        result.into_iter().map(|(k, _)| k).collect()
    }

    pub async fn update_confidence(&self, a: &MarketKey, b: &MarketKey, confidence: f64) -> Result<bool> {
        let Some(link) = self.get_link(a, b) else {
            return Ok(false);
        };
        let record = LinkRecord { id: link.id.clone(), market_a: link.a, market_b: link.b, confidence, source: link.source, created_at: Utc::now(), metadata: None };
        self.store.save_link(&record).await?;
        if let Some(mut entry) = self.links.get_mut(&link.id) {
            entry.confidence = confidence;
        }
        Ok(true)
    }

    /// Merge two identity groups by linking their representative markets.
    /// Every member of `group_b` becomes transitively linked to
    /// `group_a`'s representative.
    pub async fn merge(&self, representative: &MarketKey, group_b: &[MarketKey], confidence: f64) -> Result<()> {
        for member in group_b {
            if member != representative {
                self.link(representative.clone(), member.clone(), confidence, LinkSource::Manual).await?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn all_links(&self) -> Vec<Link> {
        self.links.iter().map(|e| e.value().clone()).collect()
    }

    #[must_use]
    pub fn stats(&self) -> LinkerStats {
        let mut seen = HashSet::new();
        let mut groups = 0usize;
        for entry in self.adjacency.iter() {
            let key = entry.key();
            if seen.contains(key) {
                continue;
            }
            let identity = self.get_identity(key);
            for m in &identity {
                seen.insert(m.clone());
            }
            groups += 1;
        }
        LinkerStats { markets: self.adjacency.len(), links: self.links.len(), identity_groups: groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemLinkStore {
        rows: Mutex<Vec<LinkRecord>>,
    }

    #[async_trait]
    impl LinkStore for MemLinkStore {
        async fn save_link(&self, link: &LinkRecord) -> Result<()> {
            let mut rows = self.rows.lock();
            rows.retain(|r| r.id != link.id);
            rows.push(link.clone());
            Ok(())
        }
        async fn delete_link(&self, id: &str) -> Result<bool> {
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|r| r.id != id);
            Ok(rows.len() != before)
        }
        async fn all_links(&self) -> Result<Vec<LinkRecord>> {
            Ok(self.rows.lock().clone())
        }
    }

    fn key(s: &str) -> MarketKey {
        MarketKey::new("venue", s)
    }

    #[tokio::test]
    async fn link_and_query_are_symmetric() {
        let linker = MarketLinker::new(Arc::new(MemLinkStore::default()));
        linker.link(key("a"), key("b"), 0.9, LinkSource::Auto).await.unwrap();
        assert!(linker.are_linked(&key("a"), &key("b")));
        assert!(linker.are_linked(&key("b"), &key("a")));
    }

    #[tokio::test]
    async fn identity_is_transitive_closure() {
        let linker = MarketLinker::new(Arc::new(MemLinkStore::default()));
        linker.link(key("a"), key("b"), 0.9, LinkSource::Auto).await.unwrap();
        linker.link(key("b"), key("c"), 0.9, LinkSource::Auto).await.unwrap();
        let identity = linker.get_identity(&key("a"));
        assert_eq!(identity.len(), 3);
        assert!(identity.contains(&key("c")));
    }

    #[tokio::test]
    async fn unlink_removes_edge_both_directions() {
        let linker = MarketLinker::new(Arc::new(MemLinkStore::default()));
        linker.link(key("a"), key("b"), 0.9, LinkSource::Auto).await.unwrap();
        assert!(linker.unlink(&key("a"), &key("b")).await.unwrap());
        assert!(!linker.are_linked(&key("a"), &key("b")));
        assert!(linker.get_links(&key("a")).is_empty());
        assert!(linker.get_links(&key("b")).is_empty());
    }

    #[test]
    fn link_id_is_order_independent() {
        assert_eq!(link_id(&key("a"), &key("b")), link_id(&key("b"), &key("a")));
    }

    #[tokio::test]
    async fn unlink_removes_persisted_row_not_just_in_memory_edge() {
        let store = Arc::new(MemLinkStore::default());
        let linker = MarketLinker::new(store.clone());
        linker.link(key("a"), key("b"), 0.9, LinkSource::Auto).await.unwrap();
        linker.unlink(&key("a"), &key("b")).await.unwrap();
        assert!(store.rows.lock().is_empty());

        // A fresh linker loading from the same store must not resurrect
        // the deleted link.
        let reloaded = MarketLinker::new(store);
        reloaded.load().await.unwrap();
        assert!(!reloaded.are_linked(&key("a"), &key("b")));
    }

    #[tokio::test]
    async fn load_rebuilds_adjacency_from_store() {
        let store = Arc::new(MemLinkStore::default());
        {
            let linker = MarketLinker::new(store.clone());
            linker.link(key("a"), key("b"), 0.9, LinkSource::Auto).await.unwrap();
        }
        let linker = MarketLinker::new(store);
        linker.load().await.unwrap();
        assert!(linker.are_linked(&key("a"), &key("b")));
    }
}
