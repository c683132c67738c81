//! Hybrid-search fusion helpers backing `resolveForwardFuzzy` and
//! `hybridSearch` (§6.1/§4.9): reciprocal rank fusion across ranked id
//! lists, and min-max score normalization. These are exported for adapter
//! crates implementing `Provider::hybrid_search` (out of scope for the
//! core) as well as for the engine's own fan-out across union member
//! types during fuzzy resolution.

use std::collections::HashMap;

/// Reciprocal rank fusion: combine several ranked id lists (best match
/// first) into one fused score per id.
///
/// `score(id) = sum over lists containing id of weight / (k + rank + 1)`,
/// where `rank` is the zero-based position in that list. `k` damps the
/// influence of rank differences near the top (a typical default is
/// `60.0`, matching common RRF defaults); `weights` lets forward-fuzzy and
/// full-text lists be weighted asymmetrically, as `hybridSearch`'s
/// `ftsWeight`/`semanticWeight` options in §6.1 require. Ids absent from
/// `weights.len()`-many lists are simply never awarded a contribution from
/// the missing lists.
pub fn reciprocal_rank_fusion(rank_lists: &[Vec<String>], weights: &[f64], k: f64) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    let uniform_weight = 1.0;

    for (list_idx, list) in rank_lists.iter().enumerate() {
        let weight = weights.get(list_idx).copied().unwrap_or(uniform_weight);
        for (rank, id) in list.iter().enumerate() {
            *scores.entry(id.clone()).or_insert(0.0) += weight / (k + rank as f64 + 1.0);
        }
    }

    let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Min-max normalize a slice of scores into `[0.0, 1.0]`. A slice with
/// zero range (including a single element) normalizes to all `1.0`.
pub fn normalize_scores(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= f64::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_rewards_top_ranked_across_lists() {
        let fts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let semantic = vec!["b".to_string(), "a".to_string(), "d".to_string()];
        let fused = reciprocal_rank_fusion(&[fts, semantic], &[1.0, 1.0], 60.0);
        // "a" and "b" each appear near the top of both lists, so they
        // should outrank "c"/"d" which appear in only one list.
        let top_two: Vec<&str> = fused.iter().take(2).map(|(id, _)| id.as_str()).collect();
        assert!(top_two.contains(&"a"));
        assert!(top_two.contains(&"b"));
    }

    #[test]
    fn rrf_weights_skew_the_fusion() {
        let fts = vec!["a".to_string()];
        let semantic = vec!["z".to_string()];
        let fused = reciprocal_rank_fusion(&[fts, semantic], &[10.0, 0.1], 60.0);
        assert_eq!(fused[0].0, "a");
    }

    #[test]
    fn normalize_handles_constant_input() {
        let normalized = normalize_scores(&[5.0, 5.0, 5.0]);
        assert_eq!(normalized, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalize_min_max() {
        let normalized = normalize_scores(&[0.0, 5.0, 10.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }
}
