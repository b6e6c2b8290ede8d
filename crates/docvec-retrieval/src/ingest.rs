use std::path::Path;

use thiserror::Error;

use docvec_core::loader::load_text;
use docvec_core::{BuildError, Chunker, DocId, DocIdError, DocumentError, Embedder, VectorIndexer, VectorSnapshot};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("cannot derive a document id: {0}")]
    DocId(#[from] DocIdError),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub doc_id: DocId,
    pub chunks: usize,
    pub dimension: usize,
    pub embedder_id: String,
}

/// Text -> chunks -> batched embeddings -> one store build per document.
pub struct Ingestor<VI>
where
    VI: VectorIndexer,
{
    chunker: Box<dyn Chunker>,
    embedder: Box<dyn Embedder>,
    store: VI,
    batch_size: usize,
}

impl<VI> Ingestor<VI>
where
    VI: VectorIndexer,
{
    pub fn new(chunker: Box<dyn Chunker>, embedder: Box<dyn Embedder>, store: VI) -> Self {
        Self { chunker, embedder, store, batch_size: 32 }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn store(&self) -> &VI {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Chunk and embed `text`, then replace the store for `doc_id`.
    #[tracing::instrument(skip_all, fields(doc_id = %doc_id, embedder = self.embedder.id()))]
    pub fn ingest_text(&self, doc_id: &DocId, text: &str) -> Result<IngestReport, IngestError> {
        let chunks = self.chunker.chunk(text);
        let vectors = self.embed_all(&chunks)?;
        let snapshot = self.store.build(doc_id, chunks, vectors)?;
        let meta = snapshot.meta();
        Ok(IngestReport {
            doc_id: doc_id.clone(),
            chunks: meta.chunk_count as usize,
            dimension: meta.dimension as usize,
            embedder_id: self.embedder.id().to_string(),
        })
    }

    /// Load a supported text file and ingest it. Without an explicit id the
    /// file stem is used.
    pub fn ingest_file(&self, path: &Path, doc_id: Option<DocId>) -> Result<IngestReport, IngestError> {
        let text = load_text(path)?;
        let doc_id = match doc_id {
            Some(id) => id,
            None => DocId::from_path(path)?,
        };
        self.ingest_text(&doc_id, &text)
    }

    fn embed_all(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let embedded = self
                .embedder
                .embed_batch(batch)
                .map_err(|e| IngestError::Embedding(format!("{e:#}")))?;
            // Counts must line up per batch, not only in total.
            if embedded.len() != batch.len() {
                return Err(IngestError::Build(BuildError::LengthMismatch {
                    chunks: batch.len(),
                    vectors: embedded.len(),
                }));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
