use std::collections::HashMap;
use std::hash::Hash;

/// Dual-indexed map giving hashed lookup and insertion/touch-order
/// iteration, per spec.md §4.9. Not internally synchronized — callers that
/// share one instance across threads must supply their own lock, matching
/// the "thread-safety: external synchronization required" note in the spec.
pub struct OrderedLruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> OrderedLruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        OrderedLruCache {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Moves `k` to the most-recently-used position and returns its value.
    pub fn get(&mut self, k: &K) -> Option<&V> {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(k) {
            entry.1 = tick;
            Some(&entry.0)
        } else {
            None
        }
    }

    /// Inserts or replaces `k`, evicting the least-recently-touched entry if
    /// this put would push the cache over capacity.
    pub fn put(&mut self, k: K, v: V) {
        let tick = self.tick();
        if self.entries.contains_key(&k) {
            self.entries.insert(k, (v, tick));
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(lru_key) = self
                .entries
                .iter()
                .min_by_key(|(_, (_, t))| *t)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&lru_key);
            }
        }
        self.entries.insert(k, (v, tick));
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.entries.contains_key(k)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates most-recently-used first.
    pub fn iter_mru(&self) -> impl Iterator<Item = (&K, &V)> {
        let mut items: Vec<_> = self.entries.iter().map(|(k, (v, t))| (k, v, *t)).collect();
        items.sort_by(|a, b| b.2.cmp(&a.2));
        items.into_iter().map(|(k, v, _)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_touched() {
        let mut cache = OrderedLruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a"); // touch a, b is now LRU
        cache.put("c", 3); // evicts b
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&"a"));
        assert!(cache.contains_key(&"c"));
        assert!(!cache.contains_key(&"b"));
    }

    #[test]
    fn mru_iteration_order() {
        let mut cache = OrderedLruCache::new(3);
        cache.put(1, "one");
        cache.put(2, "two");
        cache.put(3, "three");
        cache.get(&1);
        let order: Vec<_> = cache.iter_mru().map(|(k, _)| *k).collect();
        assert_eq!(order[0], 1);
    }
}
