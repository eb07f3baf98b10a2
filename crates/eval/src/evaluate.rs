use crate::metrics::{compute_metrics, first_relevant_rank};
use crate::types::{CaseMetrics, EvalQuery, EvalReport, MetricsResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use passage_protocol::Candidate;
use passage_search::{RetrieveOptions, Retriever};

/// Anything that can produce a ranking for a query: the live retriever, a
/// recorded run, or a plain closure in tests.
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Candidate>>;
}

#[async_trait]
impl<F> RankingSource for F
where
    F: Fn(&str, usize) -> Vec<Candidate> + Send + Sync,
{
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        Ok(self(query, k))
    }
}

/// Evaluates the live retriever with its default options and `top_k = k`.
pub struct LiveRetrieval<'a>(pub &'a Retriever);

#[async_trait]
impl RankingSource for LiveRetrieval<'_> {
    async fn rank(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let passages = self
            .0
            .retrieve(
                query,
                RetrieveOptions {
                    top_k: Some(k),
                    ..RetrieveOptions::default()
                },
            )
            .await?;
        Ok(passages
            .into_iter()
            .map(|p| Candidate::new(p.id, p.similarity))
            .collect())
    }
}

/// Mean metrics of `source` over `queries`. An empty query set yields zeros.
pub async fn evaluate_retrieval<S>(queries: &[EvalQuery], source: &S, k: usize) -> Result<MetricsResult>
where
    S: RankingSource + ?Sized,
{
    Ok(evaluate_cases(queries, source, k).await?.metrics)
}

/// Like [`evaluate_retrieval`], keeping the per-query breakdown.
pub async fn evaluate_cases<S>(queries: &[EvalQuery], source: &S, k: usize) -> Result<EvalReport>
where
    S: RankingSource + ?Sized,
{
    let mut cases = Vec::with_capacity(queries.len());

    for eval_query in queries {
        let ranked = source
            .rank(&eval_query.query, k)
            .await
            .with_context(|| format!("Eval retrieval failed for query '{}'", eval_query.query))?;

        let metrics = compute_metrics(&ranked, &eval_query.relevant_ids, k);
        log::debug!(
            "Eval '{}': mrr={:.3} ndcg={:.3} recall={:.3}",
            eval_query.query,
            metrics.mrr,
            metrics.ndcg,
            metrics.recall_at_k
        );

        cases.push(CaseMetrics {
            query: eval_query.query.clone(),
            first_rank: first_relevant_rank(&ranked, &eval_query.relevant_ids),
            retrieved: ranked.len(),
            metrics,
        });
    }

    Ok(EvalReport {
        k,
        queries: queries.len(),
        metrics: MetricsResult::mean(cases.iter().map(|c| &c.metrics)),
        cases,
    })
}
