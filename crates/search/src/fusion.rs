use crate::query_shape::QueryShape;
use passage_protocol::{Candidate, FusionStrategy, FusionWeights};
use std::cmp::Ordering;
use std::collections::HashMap;

/// RRF constant k (typically 60). Larger values flatten the rank curve.
pub const DEFAULT_RRF_K: f64 = 60.0;

const SHORT_QUERY_MAX_WORDS: usize = 3;
const LONG_QUERY_MIN_WORDS: usize = 15;
const CJK_LEXICAL_BONUS: f64 = 0.1;
const CJK_LEXICAL_CAP: f64 = 0.6;

/// How two rankings should be merged.
#[derive(Debug, Clone, Copy)]
pub struct FuseOptions<'a> {
    pub strategy: FusionStrategy,
    /// Explicit weights win over adaptive ones.
    pub weights: Option<FusionWeights>,
    /// When set and no weights are given, weights are derived from the query shape.
    pub query: Option<&'a str>,
    pub rrf_k: f64,
}

impl Default for FuseOptions<'_> {
    fn default() -> Self {
        Self {
            strategy: FusionStrategy::Rrf,
            weights: None,
            query: None,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl<'a> FuseOptions<'a> {
    #[must_use]
    pub fn strategy(mut self, strategy: FusionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn weights(mut self, weights: FusionWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    #[must_use]
    pub fn rrf_k(mut self, k: f64) -> Self {
        self.rrf_k = k;
        self
    }

    /// Weights this fusion run will use.
    #[must_use]
    pub fn resolved_weights(&self) -> FusionWeights {
        match (self.weights, self.query) {
            (Some(weights), _) => weights,
            (None, Some(query)) => compute_adaptive_weights(query),
            (None, None) => FusionWeights::default(),
        }
    }
}

/// Fuse a lexical and a vector ranking into one list.
///
/// Dispatches once on the strategy tag; neither algorithm touches a store.
#[must_use]
pub fn fuse(lexical: &[Candidate], vector: &[Candidate], options: FuseOptions<'_>) -> Vec<Candidate> {
    let weights = options.resolved_weights();
    log::debug!(
        "Fusing {} lexical + {} vector candidates via {} (lexical={:.2}, vector={:.2})",
        lexical.len(),
        vector.len(),
        options.strategy.as_str(),
        weights.lexical_weight,
        weights.vector_weight
    );

    match options.strategy {
        FusionStrategy::Rrf => fuse_by_rrf(lexical, vector, weights, options.rrf_k),
        FusionStrategy::Score => fuse_by_score(lexical, vector, weights),
    }
}

/// Reciprocal Rank Fusion.
///
/// RRF formula: score(d) = Σ weight_i / (k + rank_i(d) + 1), with 0-based ranks.
///
/// Returns the union of both inputs sorted by fused score descending. Ties keep
/// first-seen order, and the lexical list is walked first.
#[must_use]
pub fn fuse_by_rrf(
    lexical: &[Candidate],
    vector: &[Candidate],
    weights: FusionWeights,
    k: f64,
) -> Vec<Candidate> {
    let mut board = ScoreBoard::with_capacity(lexical.len() + vector.len());

    for (rank, candidate) in lexical.iter().enumerate() {
        board.add(&candidate.id, weights.lexical_weight / (k + rank as f64 + 1.0));
    }
    for (rank, candidate) in vector.iter().enumerate() {
        board.add(&candidate.id, weights.vector_weight / (k + rank as f64 + 1.0));
    }

    board.into_ranked()
}

/// Linear fusion of min-max normalized scores.
///
/// Each list is normalized on its own; an empty or constant list uses a range of 1.
/// A candidate missing from one list gets 0 from that side.
#[must_use]
pub fn fuse_by_score(
    lexical: &[Candidate],
    vector: &[Candidate],
    weights: FusionWeights,
) -> Vec<Candidate> {
    let mut board = ScoreBoard::with_capacity(lexical.len() + vector.len());

    for (candidate, norm) in lexical.iter().zip(min_max_normalize(lexical)) {
        board.add(&candidate.id, weights.lexical_weight * norm);
    }
    for (candidate, norm) in vector.iter().zip(min_max_normalize(vector)) {
        board.add(&candidate.id, weights.vector_weight * norm);
    }

    board.into_ranked()
}

/// Determine fusion weights from the query shape.
///
/// - default: vector-favored (0.3 lexical / 0.7 vector)
/// - short (≤3 words): balanced 0.5 / 0.5, exact terms match well lexically
/// - long (≥15 words): 0.2 / 0.8, descriptive queries are semantic
/// - CJK: +0.1 lexical (capped at 0.6), vector = 1 − lexical
#[must_use]
pub fn compute_adaptive_weights(query: &str) -> FusionWeights {
    let shape = QueryShape::of(query);

    let mut weights = if shape.word_count <= SHORT_QUERY_MAX_WORDS {
        FusionWeights::new(0.5, 0.5)
    } else if shape.word_count >= LONG_QUERY_MIN_WORDS {
        FusionWeights::new(0.2, 0.8)
    } else {
        FusionWeights::default()
    };

    if shape.has_cjk {
        weights.lexical_weight = (weights.lexical_weight + CJK_LEXICAL_BONUS).min(CJK_LEXICAL_CAP);
        weights.vector_weight = 1.0 - weights.lexical_weight;
    }

    weights
}

fn min_max_normalize(candidates: &[Candidate]) -> Vec<f64> {
    let Some(first) = candidates.first() else {
        return Vec::new();
    };

    let (min, max) = candidates
        .iter()
        .fold((first.score, first.score), |(min, max), c| {
            (min.min(c.score), max.max(c.score))
        });
    let range = max - min;
    let range = if range == 0.0 { 1.0 } else { range };

    candidates.iter().map(|c| (c.score - min) / range).collect()
}

/// Accumulates per-id scores while remembering first-seen order.
struct ScoreBoard {
    order: HashMap<String, usize>,
    entries: Vec<Candidate>,
}

impl ScoreBoard {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            order: HashMap::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    fn add(&mut self, id: &str, contribution: f64) {
        if let Some(&slot) = self.order.get(id) {
            self.entries[slot].score += contribution;
            return;
        }
        self.order.insert(id.to_string(), self.entries.len());
        self.entries.push(Candidate::new(id, contribution));
    }

    fn into_ranked(self) -> Vec<Candidate> {
        let mut fused = self.entries;
        // sort_by is stable, so equal scores keep insertion order.
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        fused
    }
}
