//! Reciprocal Rank Fusion over ranked id lists.

use std::collections::HashMap;

/// The RRF constant: `score(d) = Σ 1 / (RRF_K + rank + 1)` with 0-based
/// ranks.
pub const RRF_K: usize = 60;

/// Fuses ranked id lists into a single ranking of at most `limit` ids.
///
/// Ties are resolved by first appearance: ids are compared by the order in
/// which they are first seen while scanning the lists front to back, first
/// list first. Given identical inputs the output is identical.
#[must_use]
pub fn rrf_fuse(lists: &[&[String]], limit: usize) -> Vec<String> {
    let mut scores: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut first_seen = 0usize;

    for list in lists {
        for (rank, id) in list.iter().enumerate() {
            let entry = scores.entry(id.as_str()).or_insert_with(|| {
                let order = first_seen;
                first_seen += 1;
                (0.0, order)
            });
            entry.0 += 1.0 / (RRF_K + rank + 1) as f64;
        }
    }

    let mut ranked: Vec<(&str, f64, usize)> = scores
        .into_iter()
        .map(|(id, (score, order))| (id, score, order))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(id, ..)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_agreeing_lists_rank_shared_id_first() {
        let bm25 = ids(&["a", "b"]);
        let knn = ids(&["a", "c"]);
        let fused = rrf_fuse(&[&bm25, &knn], 10);
        assert_eq!(fused[0], "a");
        // a: 1/61 + 1/61; b and c: 1/62 each, b seen before c.
        assert_eq!(fused, ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_limit_respected() {
        let bm25 = ids(&["a", "b", "c", "d"]);
        let knn = ids(&["d", "c", "b", "a"]);
        let fused = rrf_fuse(&[&bm25, &knn], 2);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_tie_broken_by_first_appearance() {
        // b and c receive identical scores; b appears first in the first
        // list, so it wins.
        let bm25 = ids(&["b", "c"]);
        let knn = ids(&["c", "b"]);
        let fused = rrf_fuse(&[&bm25, &knn], 10);
        assert_eq!(fused, ids(&["b", "c"]));
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let bm25 = ids(&["x", "y", "z"]);
        let knn = ids(&["y", "x"]);
        let first = rrf_fuse(&[&bm25, &knn], 10);
        let second = rrf_fuse(&[&bm25, &knn], 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_list_preserves_order() {
        let bm25 = ids(&["a", "b", "c"]);
        let fused = rrf_fuse(&[&bm25], 10);
        assert_eq!(fused, bm25);
    }

    #[test]
    fn test_empty_lists_fuse_to_empty() {
        let empty: Vec<String> = Vec::new();
        assert!(rrf_fuse(&[&empty, &empty], 10).is_empty());
    }

    #[test]
    fn test_rrf_score_formula() {
        // Rank 0 contributes 1/61, rank 1 contributes 1/62: an id at rank 1
        // in both lists (2/62) must beat an id at rank 0 in one list
        // (1/61).
        let bm25 = ids(&["solo", "both"]);
        let knn = ids(&["other", "both"]);
        let fused = rrf_fuse(&[&bm25, &knn], 10);
        assert_eq!(fused[0], "both");
    }
}
