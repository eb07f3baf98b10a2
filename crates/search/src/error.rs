use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Lexical search error: {0:#}")]
    Lexical(#[source] anyhow::Error),

    #[error("Vector search error: {0:#}")]
    Vector(#[source] anyhow::Error),

    #[error("Embedding error: {0:#}")]
    Embedding(#[source] anyhow::Error),

    #[error("Passage store error: {0:#}")]
    Store(#[source] anyhow::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl SearchError {
    pub(crate) fn lexical(err: anyhow::Error) -> Self {
        Self::Lexical(err)
    }

    pub(crate) fn vector(err: anyhow::Error) -> Self {
        Self::Vector(err)
    }

    pub(crate) fn embedding(err: anyhow::Error) -> Self {
        Self::Embedding(err)
    }

    pub(crate) fn store(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}
