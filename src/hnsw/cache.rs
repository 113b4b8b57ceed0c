//! Construction-time distance cache.
//!
//! A symmetric bounded cache mapping node-id pairs to their distance. Keys
//! are canonicalized to `(min, max)` so lookups are order-insensitive. The
//! cache is consulted only while the graph is being built (neighbour
//! selection re-examines the same pairs many times) and is never persisted.

use std::collections::HashMap;

/// Bounded `(i, j) → distance` cache with hit-rate accounting.
#[derive(Debug)]
pub struct DistanceCache {
    map: HashMap<(i32, i32), f32>,
    capacity: usize,
    hits: u64,
    calls: u64,
}

impl DistanceCache {
    /// Creates a cache with an advisory capacity. The map is pre-allocated
    /// up to a modest bound; `capacity` limits how many entries are kept.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity.min(1 << 16)),
            capacity,
            hits: 0,
            calls: 0,
        }
    }

    #[inline]
    fn key(i: i32, j: i32) -> (i32, i32) {
        if i <= j {
            (i, j)
        } else {
            (j, i)
        }
    }

    /// Returns the cached distance for `(i, j)`, computing and inserting it
    /// on a miss. Insertion is skipped once the cache is at capacity.
    pub fn get_or_compute<F>(&mut self, i: i32, j: i32, compute: F) -> f32
    where
        F: FnOnce() -> f32,
    {
        self.calls += 1;
        let key = Self::key(i, j);
        if let Some(&d) = self.map.get(&key) {
            self.hits += 1;
            return d;
        }
        let d = compute();
        if self.map.len() < self.capacity {
            self.map.insert(key, d);
        }
        d
    }

    /// Changes the advisory capacity. Unless `preserve` is set, all entries
    /// are dropped; the hit counters survive either way.
    pub fn resize(&mut self, new_capacity: usize, preserve: bool) {
        self.capacity = new_capacity;
        if !preserve {
            self.map.clear();
        } else if self.map.len() > new_capacity {
            // Shrinking below the current population: keep an arbitrary prefix.
            let keep: Vec<((i32, i32), f32)> = self
                .map
                .iter()
                .take(new_capacity)
                .map(|(&k, &v)| (k, v))
                .collect();
            self.map = keep.into_iter().collect();
        }
    }

    /// Fraction of calls served from the cache, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.hits as f64 / self.calls as f64
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_keying() {
        let mut cache = DistanceCache::new(16);
        let d1 = cache.get_or_compute(3, 7, || 0.25);
        // Reversed order must hit the same entry, not recompute.
        let d2 = cache.get_or_compute(7, 3, || panic!("should have been cached"));
        assert_eq!(d1, d2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_rate_bounds_and_growth() {
        let mut cache = DistanceCache::new(16);
        assert_eq!(cache.hit_rate(), 0.0);
        cache.get_or_compute(0, 1, || 0.5);
        assert_eq!(cache.hit_rate(), 0.0);
        let before = cache.hit_rate();
        cache.get_or_compute(0, 1, || unreachable!());
        cache.get_or_compute(1, 0, || unreachable!());
        assert!(cache.hit_rate() > before);
        assert!(cache.hit_rate() <= 1.0);
    }

    #[test]
    fn test_capacity_bounds_insertions() {
        let mut cache = DistanceCache::new(2);
        cache.get_or_compute(0, 1, || 0.1);
        cache.get_or_compute(0, 2, || 0.2);
        cache.get_or_compute(0, 3, || 0.3);
        assert_eq!(cache.len(), 2);
        // Uncached pair recomputes every time.
        let d = cache.get_or_compute(0, 3, || 0.9);
        assert_eq!(d, 0.9);
    }

    #[test]
    fn test_resize_drops_entries() {
        let mut cache = DistanceCache::new(8);
        cache.get_or_compute(0, 1, || 0.1);
        cache.resize(8, false);
        assert!(cache.is_empty());
        let d = cache.get_or_compute(0, 1, || 0.7);
        assert_eq!(d, 0.7);
    }

    #[test]
    fn test_resize_preserving_keeps_entries() {
        let mut cache = DistanceCache::new(8);
        cache.get_or_compute(0, 1, || 0.1);
        cache.resize(16, true);
        let d = cache.get_or_compute(0, 1, || unreachable!());
        assert_eq!(d, 0.1);
    }
}
