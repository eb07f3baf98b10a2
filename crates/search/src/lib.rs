//! # Passage Search
//!
//! Hybrid retrieval core: lexical and vector search run concurrently, their
//! rankings are fused (RRF or normalized-score fusion) with query-adaptive
//! weights, and the surviving ids are hydrated into passages.
//!
//! ```text
//! query ──> threshold ──┬──> LexicalSearch ──┐
//!                       └──> Embedder ──> VectorSearch ──┤
//!                                                        v
//!                                                  fusion::fuse
//!                                                        │
//!                                                  hydration ──> RankedPassage[]
//! ```

mod adapters;
mod config;
mod error;
mod fusion;
mod hybrid;
mod hydration;
mod query_shape;
mod retrieval_log;
mod threshold;

pub use adapters::{
    Embedder, LexicalSearch, ParentRecord, PassageRecord, PassageStore, RetrievalLogRecord,
    RetrievalLogSink, SearchScope, VectorSearch,
};
pub use config::RetrievalConfig;
pub use error::{Result, SearchError};
pub use fusion::{
    compute_adaptive_weights, fuse, fuse_by_rrf, fuse_by_score, FuseOptions, DEFAULT_RRF_K,
};
pub use hybrid::{RetrieveOptions, Retriever};
pub use hydration::hydrate;
pub use query_shape::{is_cjk, QueryShape};
pub use retrieval_log::{query_fingerprint, RetrievalLogger};
pub use threshold::{compute_threshold, BASE_THRESHOLD, MAX_THRESHOLD, MIN_THRESHOLD};

pub use passage_protocol::{
    Candidate, FusionStrategy, FusionWeights, RankedPassage, SearchStrategy,
};
