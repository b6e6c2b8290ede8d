use crate::error::{BuildError, LoadError, SearchError};
use crate::types::{DocId, QueryResult, StoreMeta};

/// Maps texts to fixed-dimension vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d384`).
    fn id(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Splits extracted document text into chunks. Implementations never emit
/// empty or whitespace-only chunks.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Per-document vector index with build-once, load-many semantics.
pub trait VectorIndexer: Send + Sync {
    type Snapshot: VectorSnapshot;

    /// Validate, index and persist a complete chunk/vector batch, replacing
    /// any previous store for `doc_id`.
    fn build(
        &self,
        doc_id: &DocId,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self::Snapshot, BuildError>;

    fn load(&self, doc_id: &DocId) -> Result<Self::Snapshot, LoadError>;
}

/// An immutable, loaded store.
pub trait VectorSnapshot {
    fn meta(&self) -> &StoreMeta;

    /// Exact k-nearest-neighbour search. `k == 0` yields no results.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<QueryResult>, SearchError>;
}
