//! Binary-relevance ranking metrics.
//!
//! Every function is total: empty rankings, empty relevant sets and `k = 0`
//! all yield 0. A relevant id repeated in a ranking counts once, at its first
//! position, so no metric can exceed 1.

use crate::types::MetricsResult;
use passage_protocol::Candidate;
use std::collections::HashSet;

/// `1 / rank` of the first relevant item (1-based), or 0.
#[must_use]
pub fn reciprocal_rank(ranked: &[Candidate], relevant: &HashSet<String>) -> f64 {
    first_relevant_rank(ranked, relevant).map_or(0.0, |rank| 1.0 / rank as f64)
}

/// 1-based rank of the first relevant item.
#[must_use]
pub fn first_relevant_rank(ranked: &[Candidate], relevant: &HashSet<String>) -> Option<usize> {
    ranked
        .iter()
        .position(|c| relevant.contains(&c.id))
        .map(|idx| idx + 1)
}

/// Discounted cumulative gain over the top `k`, gain 1 per relevant hit,
/// discount `1 / log2(rank + 2)` with 0-based rank.
#[must_use]
pub fn dcg_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    let mut seen = HashSet::new();
    ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, c)| relevant.contains(&c.id) && seen.insert(c.id.as_str()))
        .map(|(rank, _)| discount(rank))
        .sum()
}

/// Ideal DCG: every relevant item ranked first, up to `min(relevant_count, k)`.
#[must_use]
pub fn idcg_at_k(relevant_count: usize, k: usize) -> f64 {
    (0..relevant_count.min(k)).map(discount).sum()
}

#[must_use]
pub fn ndcg_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    let idcg = idcg_at_k(relevant.len(), k);
    if idcg == 0.0 {
        return 0.0;
    }
    dcg_at_k(ranked, relevant, k) / idcg
}

/// Relevant hits in the top `k`, divided by `k`.
#[must_use]
pub fn precision_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hits_at_k(ranked, relevant, k) as f64 / k as f64
}

/// Relevant hits in the top `k`, divided by the size of the relevant set.
#[must_use]
pub fn recall_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits_at_k(ranked, relevant, k) as f64 / relevant.len() as f64
}

#[must_use]
pub fn f1_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    harmonic_mean(
        precision_at_k(ranked, relevant, k),
        recall_at_k(ranked, relevant, k),
    )
}

/// 1 if any relevant item appears in the top `k`, else 0.
#[must_use]
pub fn hit_rate_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> f64 {
    if hits_at_k(ranked, relevant, k) > 0 {
        1.0
    } else {
        0.0
    }
}

/// All six metrics for one ranked list.
#[must_use]
pub fn compute_metrics(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> MetricsResult {
    let precision = precision_at_k(ranked, relevant, k);
    let recall = recall_at_k(ranked, relevant, k);

    MetricsResult {
        mrr: reciprocal_rank(ranked, relevant),
        ndcg: ndcg_at_k(ranked, relevant, k),
        precision_at_k: precision,
        recall_at_k: recall,
        f1_at_k: harmonic_mean(precision, recall),
        hit_rate: hit_rate_at_k(ranked, relevant, k),
    }
}

fn hits_at_k(ranked: &[Candidate], relevant: &HashSet<String>, k: usize) -> usize {
    let mut found = HashSet::new();
    for candidate in ranked.iter().take(k) {
        if relevant.contains(&candidate.id) {
            found.insert(candidate.id.as_str());
        }
    }
    found.len()
}

fn discount(rank: usize) -> f64 {
    1.0 / (rank as f64 + 2.0).log2()
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranked(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Candidate::new(*id, 1.0 - i as f64 * 0.1))
            .collect()
    }

    fn relevant(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn reciprocal_rank_of_second_item() {
        assert!(approx(
            reciprocal_rank(&ranked(&["a", "b", "c"]), &relevant(&["b"])),
            0.5
        ));
        assert_eq!(reciprocal_rank(&ranked(&["a"]), &relevant(&["z"])), 0.0);
    }

    #[test]
    fn ndcg_is_one_for_ideal_order() {
        let list = ranked(&["r1", "r2", "x", "y"]);
        let rel = relevant(&["r1", "r2"]);
        assert!(approx(ndcg_at_k(&list, &rel, 2), 1.0));
        assert!(approx(ndcg_at_k(&list, &rel, 10), 1.0));
    }

    #[test]
    fn ndcg_penalizes_late_hits() {
        let list = ranked(&["x", "r1"]);
        let rel = relevant(&["r1"]);
        // dcg = 1/log2(3), idcg = 1
        assert!(approx(ndcg_at_k(&list, &rel, 5), 1.0 / 3f64.log2()));
    }

    #[test]
    fn precision_recall_f1_hit_rate() {
        let list = ranked(&["a", "x", "b", "y", "c"]);
        let rel = relevant(&["a", "b", "z", "w"]);

        assert!(approx(precision_at_k(&list, &rel, 4), 0.5));
        assert!(approx(recall_at_k(&list, &rel, 4), 0.5));
        assert!(approx(f1_at_k(&list, &rel, 4), 0.5));
        assert_eq!(hit_rate_at_k(&list, &rel, 1), 1.0);
        assert_eq!(hit_rate_at_k(&ranked(&["x"]), &rel, 1), 0.0);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        let empty: Vec<Candidate> = Vec::new();
        let none = HashSet::new();
        let m = compute_metrics(&empty, &none, 5);
        assert_eq!(m, MetricsResult::default());

        let m = compute_metrics(&ranked(&["a"]), &relevant(&["a"]), 0);
        assert_eq!(m.precision_at_k, 0.0);
        assert_eq!(m.ndcg, 0.0);
        assert_eq!(m.hit_rate, 0.0);
        assert!(approx(m.mrr, 1.0));
    }

    #[test]
    fn duplicate_hits_count_once() {
        let list = ranked(&["a", "a", "a"]);
        let rel = relevant(&["a"]);
        assert!(approx(recall_at_k(&list, &rel, 3), 1.0));
        assert!(approx(ndcg_at_k(&list, &rel, 3), 1.0));
        assert!(approx(precision_at_k(&list, &rel, 3), 1.0 / 3.0));
    }

    proptest! {
        #[test]
        fn metrics_stay_in_unit_interval(
            list in prop::collection::vec("[a-f]", 0..12),
            rel in prop::collection::hash_set("[a-f]", 0..6),
            k in 0usize..15,
        ) {
            let list: Vec<Candidate> = list.into_iter().map(|id| Candidate::new(id, 0.0)).collect();
            let m = compute_metrics(&list, &rel, k);
            for value in [m.mrr, m.ndcg, m.precision_at_k, m.recall_at_k, m.f1_at_k, m.hit_rate] {
                prop_assert!((0.0..=1.0 + 1e-12).contains(&value), "{m:?}");
            }
        }

        #[test]
        fn ndcg_is_one_when_relevant_come_first(
            rel in prop::collection::hash_set("[a-f]", 1..6),
            extra in 0usize..5,
        ) {
            let mut list: Vec<Candidate> = rel.iter().map(|id| Candidate::new(id.clone(), 1.0)).collect();
            list.extend((0..extra).map(|i| Candidate::new(format!("noise-{i}"), 0.0)));
            let k = rel.len() + extra;
            prop_assert!((ndcg_at_k(&list, &rel, k) - 1.0).abs() < 1e-9);
        }
    }
}
