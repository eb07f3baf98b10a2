//! # Passage Eval
//!
//! Offline ranking-quality measurement for retrieval strategies: MRR, NDCG@K,
//! Precision@K, Recall@K, F1@K and HitRate@K against labeled query sets, plus
//! paired A/B comparison. Runs against recorded rankings or the live
//! [`passage_search::Retriever`]; never on the request path.

mod dataset;
mod evaluate;
pub mod metrics;
mod types;

pub use ab_test::{ab_test, percent_change, pick_winner, Contender, TIE_TOLERANCE};
pub use dataset::{
    EvalDataset, EvalDatasetCase, FusedRun, RecordedRanking, RecordedRun, DATASET_SCHEMA_VERSION,
};
pub use evaluate::{evaluate_cases, evaluate_retrieval, LiveRetrieval, RankingSource};
pub use types::{
    AbTestResult, CaseMetrics, EvalQuery, EvalReport, MetricDeltas, MetricsResult,
    StrategyMetrics, Winner,
};
