#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use passage_search::{
    Candidate, Embedder, LexicalSearch, ParentRecord, PassageRecord, PassageStore,
    RetrievalLogRecord, RetrievalLogSink, Retriever, SearchScope, VectorSearch,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Barrier};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub limit: usize,
    pub threshold: Option<f64>,
    pub scope: SearchScope,
}

/// Scripted search backend: returns a fixed ranking and records every call.
#[derive(Default)]
pub struct ScriptedSearch {
    results: Vec<Candidate>,
    fail_with: Option<String>,
    barrier: Option<Arc<Barrier>>,
    ignore_limit: bool,
    pub calls: Mutex<Vec<SearchCall>>,
}

impl ScriptedSearch {
    pub fn returning(items: &[(&str, f64)]) -> Self {
        Self {
            results: items.iter().map(|(id, s)| Candidate::new(*id, *s)).collect(),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Block inside `search` until every party of the barrier has arrived.
    pub fn gated(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Return every scripted result regardless of the requested limit.
    pub fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn run(&self, limit: usize, threshold: Option<f64>, scope: &SearchScope) -> Result<Vec<Candidate>> {
        self.calls.lock().unwrap().push(SearchCall {
            limit,
            threshold,
            scope: scope.clone(),
        });
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        let take = if self.ignore_limit { usize::MAX } else { limit };
        Ok(self.results.iter().take(take).cloned().collect())
    }
}

/// Full-text backend whose every query times out with a typed io error.
pub struct TimedOutSearch;

#[async_trait]
impl LexicalSearch for TimedOutSearch {
    async fn search(&self, _query: &str, _limit: usize, _scope: &SearchScope) -> Result<Vec<Candidate>> {
        Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "fts timed out").into())
    }
}

#[async_trait]
impl LexicalSearch for ScriptedSearch {
    async fn search(&self, _query: &str, limit: usize, scope: &SearchScope) -> Result<Vec<Candidate>> {
        self.run(limit, None, scope).await
    }
}

#[async_trait]
impl VectorSearch for ScriptedSearch {
    async fn search(
        &self,
        _embedding: &[f32],
        limit: usize,
        threshold: f64,
        scope: &SearchScope,
    ) -> Result<Vec<Candidate>> {
        self.run(limit, Some(threshold), scope).await
    }
}

pub struct StubEmbedder;

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32, 1.0, 0.0, 0.0])
    }
}

#[derive(Default)]
pub struct MemoryStore {
    passages: HashMap<String, PassageRecord>,
    parents: HashMap<String, ParentRecord>,
    pub passage_lookups: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn passage(mut self, id: &str, parent_id: &str) -> Self {
        self.passages.insert(
            id.to_string(),
            PassageRecord {
                id: id.to_string(),
                parent_id: parent_id.to_string(),
                content: format!("{id} body"),
            },
        );
        self
    }

    pub fn parent(mut self, id: &str, owner_id: Option<&str>) -> Self {
        self.parents.insert(
            id.to_string(),
            ParentRecord {
                id: id.to_string(),
                title: format!("{id} title"),
                owner_id: owner_id.map(str::to_string),
            },
        );
        self
    }

    /// Passages p1..=pN, all under one shared parent.
    pub fn with_shared_passages(n: usize) -> Self {
        let mut store = Self::default().parent("doc", None);
        for i in 1..=n {
            store = store.passage(&format!("p{i}"), "doc");
        }
        store
    }
}

#[async_trait]
impl PassageStore for MemoryStore {
    async fn find_passages(&self, ids: &[String]) -> Result<HashMap<String, PassageRecord>> {
        self.passage_lookups.lock().unwrap().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| self.passages.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn find_parents(&self, ids: &[String]) -> Result<HashMap<String, ParentRecord>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.parents.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}

pub struct ChannelSink(pub mpsc::UnboundedSender<RetrievalLogRecord>);

#[async_trait]
impl RetrievalLogSink for ChannelSink {
    async fn insert(&self, record: RetrievalLogRecord) -> Result<()> {
        self.0.send(record)?;
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl RetrievalLogSink for FailingSink {
    async fn insert(&self, _record: RetrievalLogRecord) -> Result<()> {
        anyhow::bail!("retrieval_logs table is read-only")
    }
}

/// Never completes; proves the caller does not wait on the log write.
pub struct HangingSink;

#[async_trait]
impl RetrievalLogSink for HangingSink {
    async fn insert(&self, _record: RetrievalLogRecord) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub struct Harness {
    pub lexical: Arc<ScriptedSearch>,
    pub vector: Arc<ScriptedSearch>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(lexical: ScriptedSearch, vector: ScriptedSearch, store: MemoryStore) -> Self {
        Self {
            lexical: Arc::new(lexical),
            vector: Arc::new(vector),
            store: Arc::new(store),
        }
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            self.lexical.clone(),
            self.vector.clone(),
            Arc::new(StubEmbedder),
            self.store.clone(),
        )
    }
}

pub fn ids(passages: &[passage_search::RankedPassage]) -> Vec<&str> {
    passages.iter().map(|p| p.id.as_str()).collect()
}
