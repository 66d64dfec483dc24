//! Best-k collector with per-key deduplication.
//!
//! Search keeps two synchronized views of the current best candidates:
//!
//! - a hash map from key to the closest hit seen for that key, and
//! - an ordered set of (distance, key) pairs giving O(log k) access to the
//!   current worst kept entry and the final ascending output.
//!
//! Every map entry has exactly one ordered entry and vice versa. Distances
//! are ordered with [`f32::total_cmp`]; NaN distances are rejected by the
//! caller's ceiling test before they reach this type, so total order and
//! numeric order agree for everything stored here.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::record::{Neighbor, VectorRecord};

/// Ordered-set entry: distance first, key as the tie-break.
#[derive(Debug, Clone)]
struct RankedKey<K> {
    distance: f32,
    key: K,
}

impl<K: Ord> Ord for RankedKey<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl<K: Ord> PartialOrd for RankedKey<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> PartialEq for RankedKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl<K: Ord> Eq for RankedKey<K> {}

#[derive(Debug)]
struct BestHit<'a, K> {
    distance: f32,
    record: &'a VectorRecord<K>,
}

/// Capacity-bounded collector of the best candidates seen so far.
#[derive(Debug)]
pub(crate) struct NeighborSet<'a, K> {
    limit: usize,
    best: HashMap<K, BestHit<'a, K>>,
    ranked: BTreeSet<RankedKey<K>>,
}

impl<'a, K: Clone + Ord + Hash> NeighborSet<'a, K> {
    /// Creates a collector keeping at most `limit` entries.
    ///
    /// `expected` caps the initial map allocation; callers pass the record
    /// count so an unbounded limit does not translate into an unbounded
    /// allocation.
    pub fn new(limit: usize, expected: usize) -> Self {
        Self {
            limit,
            best: HashMap::with_capacity(limit.min(expected)),
            ranked: BTreeSet::new(),
        }
    }

    /// Number of distinct keys currently kept.
    pub fn len(&self) -> usize {
        self.best.len()
    }

    /// True once `limit` distinct keys are kept.
    pub fn is_full(&self) -> bool {
        self.best.len() >= self.limit
    }

    /// Distance of the worst kept entry, if any.
    pub fn worst_distance(&self) -> Option<f32> {
        self.ranked.last().map(|entry| entry.distance)
    }

    /// Offers a candidate that already passed the scope filter and the
    /// distance ceiling.
    ///
    /// A candidate whose key is already kept replaces the old hit only when
    /// strictly closer. A new key is admitted while the collector has room;
    /// once full it must be strictly closer than the current worst, which is
    /// then evicted.
    pub fn offer(&mut self, distance: f32, record: &'a VectorRecord<K>) {
        let key = record.key();
        if let Some(entry) = self.best.get_mut(key) {
            if distance < entry.distance {
                let stale = RankedKey {
                    distance: entry.distance,
                    key: key.clone(),
                };
                self.ranked.remove(&stale);
                entry.distance = distance;
                entry.record = record;
                self.ranked.insert(RankedKey {
                    distance,
                    key: key.clone(),
                });
            }
            return;
        }

        if self.best.len() < self.limit {
            self.admit(distance, record);
            return;
        }

        let Some(worst) = self.ranked.last() else {
            return; // limit is zero
        };
        if distance < worst.distance {
            if let Some(evicted) = self.ranked.pop_last() {
                self.best.remove(&evicted.key);
            }
            self.admit(distance, record);
        }
    }

    fn admit(&mut self, distance: f32, record: &'a VectorRecord<K>) {
        self.best
            .insert(record.key().clone(), BestHit { distance, record });
        self.ranked.insert(RankedKey {
            distance,
            key: record.key().clone(),
        });
    }

    /// Drains the collector into hits ordered ascending by distance, ties by
    /// key order.
    pub fn into_ranked(self) -> Vec<Neighbor<'a, K>> {
        let mut best = self.best;
        let mut hits = Vec::with_capacity(self.ranked.len());
        for entry in self.ranked {
            if let Some(hit) = best.remove(&entry.key) {
                hits.push(Neighbor {
                    distance: entry.distance,
                    record: hit.record,
                });
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &'static str) -> VectorRecord<&'static str> {
        VectorRecord::new(vec![0.0], key)
    }

    #[test]
    fn keeps_closest_hit_per_key() {
        let a = record("a");
        let mut set = NeighborSet::new(10, 10);
        set.offer(5.0, &a);
        set.offer(1.0, &a);
        set.offer(3.0, &a);

        let hits = set.into_ranked();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 1.0);
    }

    #[test]
    fn full_set_evicts_the_worst() {
        let a = record("a");
        let b = record("b");
        let c = record("c");
        let mut set = NeighborSet::new(2, 10);
        set.offer(1.0, &a);
        set.offer(2.0, &b);
        set.offer(1.5, &c);

        let hits = set.into_ranked();
        let keys: Vec<_> = hits.iter().map(|hit| *hit.record.key()).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn equal_to_worst_is_not_admitted() {
        let a = record("a");
        let b = record("b");
        let mut set = NeighborSet::new(1, 10);
        set.offer(1.0, &a);
        set.offer(1.0, &b);

        let hits = set.into_ranked();
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].record.key(), "a");
    }

    #[test]
    fn equal_distances_order_by_key() {
        let b = record("b");
        let a = record("a");
        let mut set = NeighborSet::new(10, 10);
        set.offer(2.0, &b);
        set.offer(2.0, &a);

        let keys: Vec<_> = set.into_ranked().iter().map(|hit| *hit.record.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn replacement_updates_the_ranking() {
        let a = record("a");
        let b = record("b");
        let mut set = NeighborSet::new(2, 10);
        set.offer(5.0, &a);
        set.offer(1.0, &b);
        set.offer(0.5, &a);

        assert_eq!(set.worst_distance(), Some(1.0));
        let keys: Vec<_> = set.into_ranked().iter().map(|hit| *hit.record.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn zero_limit_stays_empty() {
        let a = record("a");
        let mut set = NeighborSet::new(0, 10);
        set.offer(0.1, &a);
        assert!(set.is_full());
        assert_eq!(set.len(), 0);
        assert!(set.into_ranked().is_empty());
    }
}
