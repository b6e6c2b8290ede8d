use thiserror::Error;

use crate::types::DocId;

#[derive(Debug, Error)]
pub enum DocIdError {
    #[error("document id is empty")]
    Empty,

    #[error("document id is {len} bytes long (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("document id '{0}' must not start with '.'")]
    LeadingDot(String),

    #[error("document id '{id}' contains invalid character {ch:?}")]
    InvalidChar { id: String, ch: char },
}

/// Failures of `build`: the chunk/vector batch is rejected as a whole and
/// nothing is persisted.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("empty input: {chunks} chunks, {vectors} vectors")]
    EmptyInput { chunks: usize, vectors: usize },

    #[error("chunk/vector count mismatch: {chunks} chunks vs {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector {index} has {actual} components, expected {expected}")]
    DimensionMismatch { index: usize, expected: usize, actual: usize },

    #[error("vectors have zero components")]
    ZeroDimension,

    #[error("dimension {dimension} exceeds the store limit")]
    DimensionTooLarge { dimension: usize },

    #[error("chunk {index} has no text")]
    EmptyChunk { index: usize },

    #[error("vector {index} contains a non-finite component")]
    NonFiniteComponent { index: usize },

    #[error("vector {index} has zero norm and cannot be normalized")]
    ZeroNorm { index: usize },

    #[error("vector {index} normalized to norm {norm}, not unit length")]
    NotUnitLength { index: usize, norm: f32 },

    #[error("{count} chunks exceed the store limit")]
    TooManyChunks { count: usize },

    #[error("I/O error while persisting store: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no store for document '{doc_id}'")]
    NotFound { doc_id: DocId },

    #[error("store for document '{doc_id}' is corrupt: {reason}")]
    CorruptStore { doc_id: DocId, reason: String },

    #[error("I/O error while reading store: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query has {actual} components, store dimension is {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query contains a non-finite component")]
    NonFiniteQuery,

    #[error("query has zero norm and the store is normalized")]
    ZeroNormQuery,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document format '{extension}' ({path})")]
    UnsupportedFormat { path: String, extension: String },

    #[error("failed to read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
