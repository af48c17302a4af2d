//! Intrusive doubly-linked LRU store: O(1) get/insert/evict without an
//! external crate dependency.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Slot<K, V> {
    key: K,
    value: V,
    expires_at: Option<Instant>,
    prev: Option<usize>,
    next: Option<usize>,
}

pub enum GetResult<V> {
    Hit(V),
    Expired(V),
    Miss,
}

/// A slab-backed doubly linked list ordered MRU (head) to LRU (tail).
pub struct LruStore<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<K: Clone + Eq + Hash, V: Clone> LruStore<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    fn is_expired(slot: &Slot<K, V>) -> bool {
        slot.expires_at.is_some_and(|t| Instant::now() >= t)
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    pub fn get_promote(&mut self, key: &K) -> GetResult<V> {
        let Some(&idx) = self.index.get(key) else {
            return GetResult::Miss;
        };
        let expired = Self::is_expired(self.slots[idx].as_ref().unwrap());
        if expired {
            let (_, v) = self.remove_idx(idx);
            return GetResult::Expired(v);
        }
        self.promote(idx);
        GetResult::Hit(self.slots[idx].as_ref().unwrap().value.clone())
    }

    pub fn contains_live(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&idx) => !Self::is_expired(self.slots[idx].as_ref().unwrap()),
            None => false,
        }
    }

    /// Insert or overwrite. Returns the evicted (key, value) if a new key
    /// insertion pushed the store over capacity.
    pub fn insert(&mut self, key: K, value: V, ttl: Option<Duration>) -> Option<(K, V)> {
        let expires_at = ttl.filter(|d| !d.is_zero()).map(|d| Instant::now() + d);
        // ttl == Some(0) still expires immediately per the "expiresAt=0 means
        // no expiry" contract being about *absence*, not a zero duration; a
        // caller passing an explicit zero duration wants immediate expiry.
        let expires_at = if ttl == Some(Duration::ZERO) { Some(Instant::now()) } else { expires_at };

        if let Some(&idx) = self.index.get(&key) {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.value = value;
            slot.expires_at = expires_at;
            self.promote(idx);
            return None;
        }

        let idx = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(Slot { key: key.clone(), value, expires_at, prev: None, next: None });
                i
            }
            None => {
                self.slots.push(Some(Slot { key: key.clone(), value, expires_at, prev: None, next: None }));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, idx);
        self.push_front(idx);

        if self.index.len() > self.capacity {
            self.evict_lru()
        } else {
            None
        }
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let tail = self.tail?;
        Some(self.remove_idx(tail))
    }

    fn remove_idx(&mut self, idx: usize) -> (K, V) {
        self.detach(idx);
        let slot = self.slots[idx].take().unwrap();
        self.index.remove(&slot.key);
        self.free.push(idx);
        (slot.key, slot.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let &idx = self.index.get(key)?;
        Some(self.remove_idx(idx).1)
    }

    pub fn drain(&mut self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.index.keys().cloned().collect();
        keys.into_iter().filter_map(|k| self.remove(&k).map(|v| (k, v))).collect()
    }

    pub fn drain_expired(&mut self) -> Vec<(K, V)> {
        let expired: Vec<K> = self
            .index
            .iter()
            .filter(|(_, &idx)| Self::is_expired(self.slots[idx].as_ref().unwrap()))
            .map(|(k, _)| k.clone())
            .collect();
        expired.into_iter().filter_map(|k| self.remove(&k).map(|v| (k, v))).collect()
    }
}
