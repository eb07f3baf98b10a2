use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ground truth for one query. `relevant_ids` is the complete relevant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalQuery {
    pub query: String,
    pub relevant_ids: HashSet<String>,
}

impl EvalQuery {
    pub fn new<I, S>(query: impl Into<String>, relevant_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            relevant_ids: relevant_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ranking quality for one query, or the mean over a query set. All fields are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    pub mrr: f64,
    pub ndcg: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_at_k: f64,
    pub hit_rate: f64,
}

impl MetricsResult {
    /// Field-wise mean; an empty input yields all zeros.
    #[must_use]
    pub fn mean<'a>(items: impl IntoIterator<Item = &'a MetricsResult>) -> Self {
        let mut sum = Self::default();
        let mut count = 0usize;
        for item in items {
            sum.mrr += item.mrr;
            sum.ndcg += item.ndcg;
            sum.precision_at_k += item.precision_at_k;
            sum.recall_at_k += item.recall_at_k;
            sum.f1_at_k += item.f1_at_k;
            sum.hit_rate += item.hit_rate;
            count += 1;
        }
        if count == 0 {
            return Self::default();
        }

        let n = count as f64;
        Self {
            mrr: sum.mrr / n,
            ndcg: sum.ndcg / n,
            precision_at_k: sum.precision_at_k / n,
            recall_at_k: sum.recall_at_k / n,
            f1_at_k: sum.f1_at_k / n,
            hit_rate: sum.hit_rate / n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMetrics {
    pub query: String,
    /// 1-based rank of the first relevant hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_rank: Option<usize>,
    pub retrieved: usize,
    #[serde(flatten)]
    pub metrics: MetricsResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub k: usize,
    pub queries: usize,
    pub metrics: MetricsResult,
    pub cases: Vec<CaseMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    #[serde(rename = "tie")]
    Tie,
}

/// Percentage change from A to B per metric. `+∞` when A is 0 and B is not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub mrr: f64,
    pub ndcg: f64,
    pub precision_at_k: f64,
    pub recall_at_k: f64,
    pub f1_at_k: f64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub name: String,
    pub metrics: MetricsResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestResult {
    pub k: usize,
    pub a: StrategyMetrics,
    pub b: StrategyMetrics,
    pub winner: Winner,
    pub deltas: MetricDeltas,
}
