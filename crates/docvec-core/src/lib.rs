//! docvec-core
//!
//! Shared data model, error taxonomy and collaborator traits for the docvec
//! document store and retrieval engine, plus the chunkers, plain-text loader
//! and configuration used by the ingestion side.

pub mod chunking;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use error::{BuildError, ConfigError, DocIdError, DocumentError, LoadError, RetrievalError, SearchError};
pub use traits::{Chunker, Embedder, VectorIndexer, VectorSnapshot};
pub use types::{ChunkRecord, DocId, QueryResult, Retrieval, ScoreThreshold, StoreMeta};
