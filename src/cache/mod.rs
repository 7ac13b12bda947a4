//! The result cache shared by every matching task of a run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::*;

use crate::MatchingSolution;

mod key;
pub use key::*;

/// Hit and miss counts of a [`ResultCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Solutions keyed by [`CacheKey`], shared by reference between tasks.
///
/// Concurrent `get` and `insert_if_absent` calls are safe. Nothing stops two
/// tasks from missing the same key and both computing it; the first insert
/// wins and the second result is dropped, which only costs the duplicated
/// work since both results are equivalent.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, Arc<MatchingSolution>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<MatchingSolution>> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `solution` unless the key is already present. Returns whether
    /// the solution was stored.
    pub fn insert_if_absent(&self, key: CacheKey, solution: MatchingSolution) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.contains_key(&key) {
            debug!("Cache already holds a solution for this key, dropping the new one");
            return false;
        }
        entries.insert(key, Arc::new(solution));
        true
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_smiles, AtomMapping, MatchOrigin, MatcherFlags, RingHints, Scores};
    use std::thread;

    fn entry(id: &str, stereo: f64) -> (CacheKey, MatchingSolution) {
        let mut query = parse_smiles("CCO").unwrap();
        query.set_id(id);
        let target = parse_smiles("CCN").unwrap();
        let key = CacheKey::new(&KeyInputs {
            query: &query,
            target: &target,
            flags: MatcherFlags::default(),
            hints: RingHints::default(),
        });
        let solution = MatchingSolution {
            query_position: 0,
            target_position: 0,
            query: Arc::new(query),
            target: Arc::new(target),
            mapping: AtomMapping::from_pairs([(0, 0), (1, 1)]).unwrap(),
            scores: Scores {
                stereo,
                ..Scores::default()
            },
            origin: MatchOrigin::Cache,
        };
        (key, solution)
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let cache = ResultCache::new();
        let (key, first) = entry("a", 1.0);
        let (_, second) = entry("a", 5.0);
        assert!(cache.get(&key).is_none());
        assert!(cache.insert_if_absent(key.clone(), first));
        assert!(!cache.insert_if_absent(key.clone(), second));
        assert_eq!(cache.get(&key).unwrap().stereo_score(), 1.0);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResultCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let (key, solution) = entry(&format!("m{}", i % 4), i as f64);
                    cache.get(&key);
                    cache.insert_if_absent(key.clone(), solution);
                    assert!(cache.get(&key).is_some());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().hits + cache.stats().misses, 16);
    }
}
