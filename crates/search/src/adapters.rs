//! Contracts for the collaborators the retriever depends on.
//!
//! Implementations live outside this crate (full-text index, ANN index,
//! embedding model, relational store, log table). They report failures with
//! `anyhow`; the retriever maps them onto [`crate::SearchError`].

use async_trait::async_trait;
use passage_protocol::Candidate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Visibility filters shared by both search paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchScope {
    pub owner_id: Option<String>,
    /// Parent-collection ids the search is restricted to. Empty means unrestricted.
    pub scope_ids: Vec<String>,
}

impl SearchScope {
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        !self.scope_ids.is_empty()
    }
}

/// Ranked keyword search over the full-text index.
///
/// Results are ordered by lexical relevance, best first.
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        scope: &SearchScope,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// Approximate nearest-neighbor search over passage embeddings.
///
/// Scores are cosine similarities in `[threshold, 1]`, best first.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        threshold: f64,
        scope: &SearchScope,
    ) -> anyhow::Result<Vec<Candidate>>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    pub id: String,
    pub parent_id: String,
    pub content: String,
}

/// The document (or other collection) a passage belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub id: String,
    pub title: String,
    /// `None` for legacy/shared records, which are visible to every owner.
    pub owner_id: Option<String>,
}

/// Batched id lookups. Ids with no record are simply absent from the map.
#[async_trait]
pub trait PassageStore: Send + Sync {
    async fn find_passages(&self, ids: &[String]) -> anyhow::Result<HashMap<String, PassageRecord>>;

    async fn find_parents(&self, ids: &[String]) -> anyhow::Result<HashMap<String, ParentRecord>>;
}

/// One row of the append-only retrieval log. Never carries the raw query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalLogRecord {
    pub workspace_id: Option<String>,
    pub user_id: Option<String>,
    pub query_fingerprint: String,
    pub result_ids: Vec<String>,
    pub scores: Vec<f64>,
    pub strategy: String,
    pub threshold: f64,
    pub result_count: usize,
}

#[async_trait]
pub trait RetrievalLogSink: Send + Sync {
    async fn insert(&self, record: RetrievalLogRecord) -> anyhow::Result<()>;
}
