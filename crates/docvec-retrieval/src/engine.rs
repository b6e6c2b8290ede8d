use docvec_core::{DocId, Embedder, Retrieval, RetrievalError, ScoreThreshold, VectorIndexer, VectorSnapshot};

/// Embeds a query, loads the document's store and ranks its chunks.
/// Holds no per-request state.
pub struct RetrievalEngine<VI>
where
    VI: VectorIndexer,
{
    store: VI,
    embedder: Box<dyn Embedder>,
}

impl<VI> RetrievalEngine<VI>
where
    VI: VectorIndexer,
{
    pub fn new(store: VI, embedder: Box<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &VI {
        &self.store
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Top-`k` chunks of `doc_id` for `query`, optionally cut by `threshold`.
    ///
    /// Ranks are dense after filtering. `Retrieval::Empty` means the store
    /// exists but nothing survived; a missing store is `NotFound`.
    #[tracing::instrument(skip_all, fields(doc_id = %doc_id, k = k))]
    pub fn retrieve(
        &self,
        doc_id: &DocId,
        query: &str,
        k: usize,
        threshold: Option<ScoreThreshold>,
    ) -> Result<Retrieval, RetrievalError> {
        let mut vectors = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| RetrievalError::EmbeddingFailure(format!("{e:#}")))?;
        if vectors.is_empty() {
            return Err(RetrievalError::EmbeddingFailure(format!(
                "embedder '{}' returned no vectors",
                self.embedder.id()
            )));
        }
        if vectors.len() > 1 {
            tracing::warn!(count = vectors.len(), "embedder returned several vectors for one query, using the first");
        }
        let query_vector = vectors.swap_remove(0);

        let snapshot = self.store.load(doc_id)?;
        let mut results = snapshot.search(&query_vector, k)?;
        if let Some(threshold) = threshold {
            let before = results.len();
            results.retain(|r| threshold.admits(r));
            for (rank, r) in results.iter_mut().enumerate() {
                r.rank = rank as u32;
            }
            tracing::debug!(kept = results.len(), dropped = before - results.len(), "applied threshold");
        }
        Ok(Retrieval::from_results(results))
    }
}
