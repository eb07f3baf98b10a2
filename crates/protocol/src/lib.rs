//! Value types shared by the retrieval engine and the offline evaluation harness.
//!
//! Nothing here owns a resource: every type is created and consumed within a
//! single retrieval or evaluation call.

use serde::{Deserialize, Serialize};

/// Minimal unit produced by one search strategy: an identifier and its score.
///
/// No ordering is implied until a list of candidates is sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub score: f64,
}

impl Candidate {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// A hydrated passage returned to callers of the retriever.
///
/// `similarity` is a fused score after hybrid retrieval: it is meaningful for
/// ordering within one result list only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub id: String,
    pub parent_id: String,
    pub parent_title: String,
    pub content: String,
    pub similarity: f64,
}

/// Relative weights applied to the lexical and vector rankings during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub lexical_weight: f64,
    pub vector_weight: f64,
}

impl FusionWeights {
    #[must_use]
    pub const fn new(lexical_weight: f64, vector_weight: f64) -> Self {
        Self {
            lexical_weight,
            vector_weight,
        }
    }
}

impl Default for FusionWeights {
    /// Vector-favored split used when no query shape is available.
    fn default() -> Self {
        Self::new(0.3, 0.7)
    }
}

/// Algorithm used to merge the lexical and vector rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    /// Reciprocal-rank fusion.
    #[default]
    Rrf,
    /// Min-max normalized linear score fusion.
    Score,
}

impl FusionStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rrf => "rrf",
            Self::Score => "score",
        }
    }
}

impl std::str::FromStr for FusionStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rrf" => Ok(Self::Rrf),
            "score" => Ok(Self::Score),
            other => Err(format!("unknown fusion strategy '{other}' (expected rrf|score)")),
        }
    }
}

/// Which retrieval path a caller asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    #[default]
    Hybrid,
    Vector,
}

impl SearchStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Vector => "vector",
        }
    }
}
