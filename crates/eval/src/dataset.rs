//! On-disk evaluation inputs: labeled query sets and recorded rankings.

use crate::evaluate::RankingSource;
use crate::types::EvalQuery;
use anyhow::{Context, Result};
use async_trait::async_trait;
use passage_protocol::{Candidate, FusionStrategy};
use passage_search::{fuse, FuseOptions, DEFAULT_RRF_K};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DATASET_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvalDataset {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub cases: Vec<EvalDatasetCase>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvalDatasetCase {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub relevant_ids: Vec<String>,
}

impl EvalDataset {
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != DATASET_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported eval dataset schema_version {} (expected {DATASET_SCHEMA_VERSION})",
                self.schema_version
            );
        }
        if self.cases.is_empty() {
            anyhow::bail!("Eval dataset must contain at least one case");
        }

        let mut seen = HashSet::new();
        for case in &self.cases {
            if case.id.trim().is_empty() {
                anyhow::bail!("Eval dataset case id must not be empty");
            }
            if !seen.insert(case.id.as_str()) {
                anyhow::bail!("Eval dataset case id '{}' is duplicated", case.id);
            }
            if case.query.trim().is_empty() {
                anyhow::bail!("Eval dataset case '{}' query must not be empty", case.id);
            }
            if case.relevant_ids.iter().all(|id| id.trim().is_empty()) {
                anyhow::bail!(
                    "Eval dataset case '{}' relevant_ids must not be empty",
                    case.id
                );
            }
        }
        Ok(())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let dataset: Self = serde_json::from_slice(bytes).context("Eval dataset is not valid JSON")?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read eval dataset {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Invalid eval dataset {}", path.display()))
    }

    #[must_use]
    pub fn queries(&self) -> Vec<EvalQuery> {
        self.cases
            .iter()
            .map(|case| {
                EvalQuery::new(
                    case.query.clone(),
                    case.relevant_ids
                        .iter()
                        .map(|id| id.trim())
                        .filter(|id| !id.is_empty()),
                )
            })
            .collect()
    }
}

/// Rankings captured from one retrieval strategy, keyed by query text.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordedRun {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rankings: Vec<RecordedRanking>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordedRanking {
    pub query: String,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl RecordedRun {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let run: Self = serde_json::from_slice(bytes).context("Recorded run is not valid JSON")?;
        if run.schema_version != DATASET_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported recorded run schema_version {} (expected {DATASET_SCHEMA_VERSION})",
                run.schema_version
            );
        }
        Ok(run)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read recorded run {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Invalid recorded run {}", path.display()))
    }

    /// Recorded ranking for `query`; empty when the query was not recorded.
    #[must_use]
    pub fn ranking(&self, query: &str) -> &[Candidate] {
        self.rankings
            .iter()
            .find(|r| r.query == query)
            .map(|r| r.candidates.as_slice())
            .unwrap_or_default()
    }

    fn index(&self) -> HashMap<&str, &[Candidate]> {
        self.rankings
            .iter()
            .map(|r| (r.query.as_str(), r.candidates.as_slice()))
            .collect()
    }

    /// Queries in `queries` with no recorded ranking.
    #[must_use]
    pub fn missing<'q>(&self, queries: &'q [EvalQuery]) -> Vec<&'q str> {
        let index = self.index();
        queries
            .iter()
            .map(|q| q.query.as_str())
            .filter(|q| !index.contains_key(q))
            .collect()
    }
}

#[async_trait]
impl RankingSource for RecordedRun {
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        Ok(self.ranking(query).iter().take(k).cloned().collect())
    }
}

/// Replays recorded lexical and vector rankings through the fusion code, so
/// fusion changes can be measured offline.
pub struct FusedRun<'a> {
    pub lexical: &'a RecordedRun,
    pub vector: &'a RecordedRun,
    pub strategy: FusionStrategy,
    pub rrf_k: f64,
}

impl<'a> FusedRun<'a> {
    pub fn new(lexical: &'a RecordedRun, vector: &'a RecordedRun, strategy: FusionStrategy) -> Self {
        Self {
            lexical,
            vector,
            strategy,
            rrf_k: DEFAULT_RRF_K,
        }
    }

    #[must_use]
    pub fn rrf_k(mut self, k: f64) -> Self {
        self.rrf_k = k;
        self
    }
}

#[async_trait]
impl RankingSource for FusedRun<'_> {
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let options = FuseOptions::default()
            .strategy(self.strategy)
            .query(query)
            .rrf_k(self.rrf_k);
        let mut fused = fuse(self.lexical.ranking(query), self.vector.ranking(query), options);
        fused.truncate(k);
        Ok(fused)
    }
}
