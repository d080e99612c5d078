use std::collections::HashMap;

/// Grouping side of the analyze job: counts occurrences per aggregation key.
///
/// Each worker owns one `CountMap` for its partition; the driver merges the
/// partials. Merging is associative and commutative, so worker completion
/// order never affects the final totals.
#[derive(Debug, Default)]
pub struct CountMap {
    counts: HashMap<String, u64>,
}

impl CountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `key`.
    pub fn add(&mut self, key: &str) {
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Folds another partition's counts into this one, summing per key.
    pub fn merge(&mut self, other: CountMap) {
        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Final emission: every key exactly once, sorted lexicographically so
    /// the line-oriented sink is deterministic across runs.
    pub fn into_sorted(self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self.counts.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sum_to_input_size() {
        let mut map = CountMap::new();
        let keys = ["a", "b", "a", "c", "a", "b"];
        for k in keys {
            map.add(k);
        }
        let entries = map.into_sorted();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().map(|(_, c)| c).sum::<u64>(), keys.len() as u64);
        assert_eq!(entries[0], ("a".to_string(), 3));
    }

    #[test]
    fn merge_sums_shared_keys() {
        let mut left = CountMap::new();
        left.add("a");
        left.add("b");
        let mut right = CountMap::new();
        right.add("a");

        left.merge(right);
        let entries = left.into_sorted();
        assert_eq!(entries, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }

    #[test]
    fn merge_order_is_irrelevant() {
        let partials = || {
            let mut p1 = CountMap::new();
            p1.add("x");
            p1.add("y");
            let mut p2 = CountMap::new();
            p2.add("x");
            let mut p3 = CountMap::new();
            p3.add("z");
            (p1, p2, p3)
        };

        let (p1, p2, p3) = partials();
        let mut forward = CountMap::new();
        forward.merge(p1);
        forward.merge(p2);
        forward.merge(p3);

        let (p1, p2, p3) = partials();
        let mut backward = CountMap::new();
        backward.merge(p3);
        backward.merge(p2);
        backward.merge(p1);

        assert_eq!(forward.into_sorted(), backward.into_sorted());
    }
}
