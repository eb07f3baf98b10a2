use crate::adapters::{
    Embedder, LexicalSearch, PassageStore, RetrievalLogRecord, RetrievalLogSink, SearchScope,
    VectorSearch,
};
use crate::config::RetrievalConfig;
use crate::error::{Result, SearchError};
use crate::fusion::{self, FuseOptions};
use crate::hydration::hydrate;
use crate::retrieval_log::{query_fingerprint, RetrievalLogger};
use crate::threshold::compute_threshold;
use passage_protocol::{Candidate, FusionStrategy, FusionWeights, RankedPassage, SearchStrategy};
use std::sync::Arc;

/// Per-call knobs. Everything is optional; unset fields fall back to the
/// retriever's [`RetrievalConfig`] or to query-adaptive values.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f64>,
    /// Wins over `threshold` and over the adaptive threshold.
    pub threshold_override: Option<f64>,
    pub scope_ids: Vec<String>,
    pub owner_id: Option<String>,
    pub strategy: Option<SearchStrategy>,
    pub workspace_threshold_offset: Option<f64>,
    pub fusion: Option<FusionStrategy>,
    pub weights: Option<FusionWeights>,
    pub workspace_id: Option<String>,
    pub user_id: Option<String>,
}

impl RetrieveOptions {
    fn scope(&self) -> SearchScope {
        SearchScope {
            owner_id: self.owner_id.clone(),
            scope_ids: self.scope_ids.clone(),
        }
    }
}

/// Query string in, ranked and hydrated passages out.
///
/// Holds no mutable state; concurrent calls are independent.
pub struct Retriever {
    lexical: Arc<dyn LexicalSearch>,
    vector: Arc<dyn VectorSearch>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn PassageStore>,
    logger: RetrievalLogger,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        lexical: Arc<dyn LexicalSearch>,
        vector: Arc<dyn VectorSearch>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn PassageStore>,
    ) -> Self {
        Self {
            lexical,
            vector,
            embedder,
            store,
            logger: RetrievalLogger::disabled(),
            config: RetrievalConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn RetrievalLogSink>) -> Self {
        self.logger = RetrievalLogger::new(sink);
        self
    }

    /// Threshold precedence: explicit override, then explicit threshold, then adaptive.
    #[must_use]
    pub fn resolve_threshold(&self, query: &str, options: &RetrieveOptions) -> f64 {
        if let Some(threshold) = options.threshold_override {
            return threshold;
        }
        if let Some(threshold) = options.threshold {
            return threshold;
        }
        let offset = options
            .workspace_threshold_offset
            .unwrap_or(self.config.workspace_threshold_offset);
        compute_threshold(query, offset)
    }

    /// Main entry point.
    ///
    /// Runs vector-only retrieval when asked to, or when the query is scoped
    /// to parent collections; hybrid otherwise. A log record is dispatched in
    /// the background and never delays or fails the call.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> Result<Vec<RankedPassage>> {
        ensure_query(query)?;

        let threshold = self.resolve_threshold(query, &options);
        let top_k = self.top_k(&options);
        let strategy = if options.strategy == Some(SearchStrategy::Vector)
            || options.scope().is_scoped()
        {
            SearchStrategy::Vector
        } else {
            SearchStrategy::Hybrid
        };

        log::debug!(
            "Retrieve: strategy={}, top_k={}, threshold={:.3}",
            strategy.as_str(),
            top_k,
            threshold
        );

        let results = match strategy {
            SearchStrategy::Vector => self.vector_only(query, top_k, threshold, &options).await?,
            SearchStrategy::Hybrid => self.hybrid(query, top_k, threshold, &options).await?,
        };

        self.log_retrieval(query, &options, strategy, threshold, &results);

        log::info!("Retrieval completed: {} results", results.len());
        Ok(results)
    }

    /// Lexical and vector search joined concurrently, fused, truncated to `top_k`.
    pub async fn hybrid_search(
        &self,
        query: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<RankedPassage>> {
        ensure_query(query)?;

        let threshold = self.resolve_threshold(query, &options);
        let top_k = self.top_k(&options);
        self.hybrid(query, top_k, threshold, &options).await
    }

    async fn hybrid(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
        options: &RetrieveOptions,
    ) -> Result<Vec<RankedPassage>> {
        // Over-fetch so fusion still has top_k after overlapping ids merge.
        let limit = top_k.saturating_mul(self.config.over_fetch);
        let scope = options.scope();

        let (lexical, vector) = tokio::join!(
            self.lexical.search(query, limit, &scope),
            self.vector_candidates(query, limit, threshold, &scope),
        );
        let lexical = sanitize(lexical.map_err(SearchError::lexical)?, "lexical");
        let vector = sanitize(vector?, "vector");
        log::debug!("Lexical: {} results, Vector: {} results", lexical.len(), vector.len());

        let mut fuse_options = FuseOptions::default()
            .strategy(options.fusion.unwrap_or(self.config.fusion))
            .query(query)
            .rrf_k(self.config.rrf_k);
        if let Some(weights) = options.weights {
            fuse_options = fuse_options.weights(weights);
        }

        let mut fused = fusion::fuse(&lexical, &vector, fuse_options);
        fused.truncate(top_k);

        hydrate(self.store.as_ref(), &fused, options.owner_id.as_deref()).await
    }

    async fn vector_only(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
        options: &RetrieveOptions,
    ) -> Result<Vec<RankedPassage>> {
        let scope = options.scope();
        let mut candidates = sanitize(
            self.vector_candidates(query, top_k, threshold, &scope).await?,
            "vector",
        );
        candidates.truncate(top_k);
        hydrate(self.store.as_ref(), &candidates, options.owner_id.as_deref()).await
    }

    async fn vector_candidates(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
        scope: &SearchScope,
    ) -> Result<Vec<Candidate>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(SearchError::embedding)?;
        self.vector
            .search(&embedding, limit, threshold, scope)
            .await
            .map_err(SearchError::vector)
    }

    fn top_k(&self, options: &RetrieveOptions) -> usize {
        options.top_k.unwrap_or(self.config.default_top_k).max(1)
    }

    fn log_retrieval(
        &self,
        query: &str,
        options: &RetrieveOptions,
        strategy: SearchStrategy,
        threshold: f64,
        results: &[RankedPassage],
    ) {
        if !self.config.log_retrievals || !self.logger.is_enabled() {
            return;
        }

        self.logger.dispatch(RetrievalLogRecord {
            workspace_id: options.workspace_id.clone(),
            user_id: options.user_id.clone(),
            query_fingerprint: query_fingerprint(query),
            result_ids: results.iter().map(|r| r.id.clone()).collect(),
            scores: results.iter().map(|r| r.similarity).collect(),
            strategy: strategy.as_str().to_string(),
            threshold,
            result_count: results.len(),
        });
    }
}

fn ensure_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    Ok(())
}

/// Adapter-boundary guard: non-finite scores never reach fusion.
fn sanitize(candidates: Vec<Candidate>, source: &str) -> Vec<Candidate> {
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .collect();
    if kept.len() < before {
        log::debug!(
            "Dropped {} {source} candidates with non-finite scores",
            before - kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_non_finite_scores() {
        let kept = sanitize(
            vec![
                Candidate::new("a", 0.5),
                Candidate::new("b", f64::NAN),
                Candidate::new("c", f64::INFINITY),
                Candidate::new("d", -0.2),
            ],
            "test",
        );
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(ensure_query("   "), Err(SearchError::EmptyQuery)));
        assert!(ensure_query("q").is_ok());
    }
}
