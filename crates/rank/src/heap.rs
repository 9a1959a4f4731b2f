use crate::error::{RankError, Result};
use prospect_core::{normalize_identity_key, ScoredCandidate, SCORE_MAX, SCORE_MIN};
use prospect_core::{CoreError, QualityStats};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Outcome of attempting to add a candidate to the heap.
#[derive(Debug)]
pub enum AddOutcome<P> {
    Added,

    /// Accepted at capacity; carries the entry it displaced.
    Replaced { evicted: ScoredCandidate<P> },

    /// Identity key already present; rejected regardless of score.
    Duplicate,

    /// Score below the heap's minimum acceptable score.
    BelowMinimum,

    /// Heap full and the score does not strictly beat the current worst.
    WorseThanWorst,
}

impl<P> AddOutcome<P> {
    pub fn accepted(&self) -> bool {
        matches!(self, AddOutcome::Added | AddOutcome::Replaced { .. })
    }
}

struct Entry<P> {
    scored: ScoredCandidate<P>,
    key: String,
    seq: u64,
}

/// Bounded top-K store over scored candidates, deduplicated by normalized
/// identity key.
///
/// Capacity should be oversized (2-3x the requested result count) so that
/// later phases can fall back to next-best entries without re-running the
/// search.
pub struct RankingHeap<P> {
    capacity: usize,
    min_score: f64,
    entries: Vec<Entry<P>>,
    seen: HashSet<String>,
    next_seq: u64,
}

impl<P> RankingHeap<P> {
    pub fn new(capacity: usize, min_score: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(RankError::CoreError(CoreError::InvalidConfiguration(
                "heap capacity must be at least 1".into(),
            )));
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&min_score) {
            return Err(RankError::CoreError(CoreError::InvalidConfiguration(
                format!("heap min_score {min_score} outside score range"),
            )));
        }
        Ok(Self {
            capacity,
            min_score,
            entries: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            next_seq: 0,
        })
    }

    /// Attempt to admit a scored candidate.
    ///
    /// Duplicates are rejected unconditionally. Under capacity, anything at
    /// or above the minimum is admitted. At capacity, the candidate must
    /// strictly beat the current worst score; ties keep the incumbent.
    pub fn add(&mut self, scored: ScoredCandidate<P>) -> AddOutcome<P> {
        let key = scored.identity_key();

        if self.seen.contains(&key) {
            return AddOutcome::Duplicate;
        }
        if scored.score < self.min_score {
            return AddOutcome::BelowMinimum;
        }

        if self.entries.len() < self.capacity {
            self.insert(scored, key);
            self.assert_invariants();
            return AddOutcome::Added;
        }

        let worst_idx = self.worst_index();
        if scored.score > self.entries[worst_idx].scored.score {
            let evicted = self.entries.swap_remove(worst_idx);
            self.seen.remove(&evicted.key);
            self.insert(scored, key);
            self.assert_invariants();
            return AddOutcome::Replaced {
                evicted: evicted.scored,
            };
        }

        AddOutcome::WorseThanWorst
    }

    /// Current entries in rank order: descending score, ties by earliest
    /// insertion. Never mutates the heap; calling it twice without an
    /// intervening `add` yields identical sequences.
    pub fn top(&self, limit: Option<usize>) -> impl Iterator<Item = &ScoredCandidate<P>> + '_ {
        let mut ranked: Vec<&Entry<P>> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            b.scored
                .score
                .partial_cmp(&a.scored.score)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        ranked
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|e| &e.scored)
    }

    pub fn stats(&self) -> QualityStats {
        let scores: Vec<f64> = self.entries.iter().map(|e| e.scored.score).collect();
        QualityStats::from_scores(&scores)
    }

    /// Percentage of capacity currently occupied.
    pub fn capacity_utilization(&self) -> f64 {
        self.entries.len() as f64 / self.capacity as f64 * 100.0
    }

    /// Purge every entry scoring below `threshold`, releasing their keys.
    /// Used when an independent re-evaluation tightens standards after the
    /// initial collection.
    pub fn remove_below(&mut self, threshold: f64) -> usize {
        let before = self.entries.len();
        let seen = &mut self.seen;
        self.entries.retain(|e| {
            if e.scored.score < threshold {
                seen.remove(&e.key);
                false
            } else {
                true
            }
        });
        self.assert_invariants();
        before - self.entries.len()
    }

    /// Targeted eviction by identity key (raw or already normalized).
    pub fn remove(&mut self, identity_key: &str) -> bool {
        let key = normalize_identity_key(identity_key);
        let Some(idx) = self.entries.iter().position(|e| e.key == key) else {
            return false;
        };
        self.entries.swap_remove(idx);
        self.seen.remove(&key);
        self.assert_invariants();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn contains(&self, identity_key: &str) -> bool {
        self.seen.contains(&normalize_identity_key(identity_key))
    }

    fn insert(&mut self, scored: ScoredCandidate<P>, key: String) {
        self.seen.insert(key.clone());
        self.entries.push(Entry {
            scored,
            key,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Index of the entry to evict: lowest score, newest insertion among
    /// equal-worst so established ranks stay stable.
    fn worst_index(&self) -> usize {
        let mut worst = 0;
        for (idx, entry) in self.entries.iter().enumerate().skip(1) {
            let current = &self.entries[worst];
            match entry
                .scored
                .score
                .partial_cmp(&current.scored.score)
                .unwrap_or(Ordering::Equal)
            {
                Ordering::Less => worst = idx,
                Ordering::Equal if entry.seq > current.seq => worst = idx,
                _ => {}
            }
        }
        worst
    }

    /// Structural invariants; a violation is a programming defect and must
    /// fail loudly rather than silently continue.
    fn assert_invariants(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "heap overflow: {} entries with capacity {}",
            self.entries.len(),
            self.capacity
        );
        assert!(
            self.entries.len() == self.seen.len(),
            "heap dedup desync: {} entries vs {} seen keys",
            self.entries.len(),
            self.seen.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use prospect_core::Candidate;
    use std::collections::BTreeMap;

    fn scored(url: &str, score: f64) -> ScoredCandidate<()> {
        ScoredCandidate::new(Candidate::new(url, "label", ()), score, BTreeMap::new())
    }

    fn top_scores(heap: &RankingHeap<()>) -> Vec<f64> {
        heap.top(None).map(|s| s.score).collect()
    }

    #[test]
    fn capacity_three_eviction_sequence() {
        let mut heap = RankingHeap::new(3, 5.0).expect("heap");

        assert!(matches!(
            heap.add(scored("https://x/a", 4.0)),
            AddOutcome::BelowMinimum
        ));
        assert!(matches!(heap.add(scored("https://x/b", 6.0)), AddOutcome::Added));
        assert!(matches!(heap.add(scored("https://x/c", 7.0)), AddOutcome::Added));
        assert!(matches!(heap.add(scored("https://x/d", 8.0)), AddOutcome::Added));

        match heap.add(scored("https://x/e", 9.0)) {
            AddOutcome::Replaced { evicted } => assert_eq!(evicted.score, 6.0),
            other => panic!("expected Replaced, got {other:?}"),
        }

        assert_eq!(top_scores(&heap), vec![9.0, 8.0, 7.0]);
        assert!(!heap.contains("https://x/b"));
    }

    #[test]
    fn trailing_slash_variants_are_duplicates() {
        let mut heap = RankingHeap::new(5, 0.0).expect("heap");
        assert!(heap.add(scored("https://x/in/jdoe/", 6.0)).accepted());
        assert!(matches!(
            heap.add(scored("https://x/in/jdoe", 9.0)),
            AddOutcome::Duplicate
        ));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn tie_on_worst_score_keeps_incumbent() {
        let mut heap = RankingHeap::new(2, 0.0).expect("heap");
        heap.add(scored("https://x/a", 5.0));
        heap.add(scored("https://x/b", 7.0));
        assert!(matches!(
            heap.add(scored("https://x/c", 5.0)),
            AddOutcome::WorseThanWorst
        ));
        assert!(heap.contains("https://x/a"));
    }

    #[test]
    fn top_is_stable_for_equal_scores() {
        let mut heap = RankingHeap::new(4, 0.0).expect("heap");
        heap.add(scored("https://x/a", 6.0));
        heap.add(scored("https://x/b", 6.0));
        heap.add(scored("https://x/c", 8.0));

        let keys: Vec<String> = heap.top(None).map(|s| s.identity_key()).collect();
        assert_eq!(keys, vec!["https://x/c", "https://x/a", "https://x/b"]);

        // Restartable and idempotent.
        let again: Vec<String> = heap.top(None).map(|s| s.identity_key()).collect();
        assert_eq!(keys, again);
    }

    #[test]
    fn top_respects_limit() {
        let mut heap = RankingHeap::new(5, 0.0).expect("heap");
        for (i, score) in [3.0, 9.0, 6.0].iter().enumerate() {
            heap.add(scored(&format!("https://x/{i}"), *score));
        }
        assert_eq!(
            heap.top(Some(2)).map(|s| s.score).collect::<Vec<_>>(),
            vec![9.0, 6.0]
        );
    }

    #[test]
    fn stats_on_empty_heap_are_all_zeros() {
        let heap: RankingHeap<()> = RankingHeap::new(3, 0.0).expect("heap");
        assert_eq!(heap.stats(), QualityStats::default());
        assert_eq!(heap.capacity_utilization(), 0.0);
    }

    #[test]
    fn capacity_utilization_is_a_percentage() {
        let mut heap = RankingHeap::new(4, 0.0).expect("heap");
        heap.add(scored("https://x/a", 5.0));
        heap.add(scored("https://x/b", 5.0));
        assert_eq!(heap.capacity_utilization(), 50.0);
    }

    #[test]
    fn remove_below_purges_and_releases_keys() {
        let mut heap = RankingHeap::new(5, 0.0).expect("heap");
        heap.add(scored("https://x/a", 3.0));
        heap.add(scored("https://x/b", 6.0));
        heap.add(scored("https://x/c", 4.5));

        assert_eq!(heap.remove_below(5.0), 2);
        assert_eq!(heap.len(), 1);
        assert!(heap.add(scored("https://x/a", 7.0)).accepted());
    }

    #[test]
    fn remove_by_key_normalizes() {
        let mut heap = RankingHeap::new(3, 0.0).expect("heap");
        heap.add(scored("https://x/in/jdoe", 6.0));
        assert!(heap.remove("https://x/in/JDoe/"));
        assert!(!heap.remove("https://x/in/jdoe"));
        assert!(heap.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(RankingHeap::<()>::new(0, 0.0).is_err());
        assert!(RankingHeap::<()>::new(3, 11.0).is_err());
    }

    #[test]
    fn replacement_never_lowers_the_worst_score() {
        let mut heap = RankingHeap::new(3, 0.0).expect("heap");
        for (i, score) in [5.0, 6.0, 7.0].iter().enumerate() {
            heap.add(scored(&format!("https://x/{i}"), *score));
        }
        let worst_before = heap.stats().min;
        match heap.add(scored("https://x/new", 8.0)) {
            AddOutcome::Replaced { evicted } => {
                assert!(heap.stats().min >= evicted.score);
                assert_eq!(evicted.score, worst_before);
            }
            other => panic!("expected Replaced, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_add_sequence(
            ops in prop::collection::vec((0usize..20, 0.0f64..10.0), 0..200),
            capacity in 1usize..12,
        ) {
            let mut heap = RankingHeap::new(capacity, 2.0).expect("heap");
            for (id, score) in ops {
                // Mixed-case and trailing-slash variants of the same key.
                let url = if id % 2 == 0 {
                    format!("https://x/in/user{}", id)
                } else {
                    format!("https://x/in/USER{}/", id - 1)
                };
                heap.add(scored(&url, score));

                prop_assert!(heap.len() <= capacity);
                let keys: std::collections::HashSet<String> =
                    heap.top(None).map(|s| s.identity_key()).collect();
                prop_assert_eq!(keys.len(), heap.len());
            }
        }
    }
}
