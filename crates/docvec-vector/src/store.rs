//! In-memory document store: validated chunk texts plus a flat exact index.

use std::cmp::Ordering;

use docvec_core::{BuildError, ChunkRecord, DocId, QueryResult, SearchError, StoreMeta, VectorSnapshot};

use crate::math::{cosine, is_unit, l2_norm, normalize_in_place, squared_l2};

/// Row-major vector matrix with cached norms.
#[derive(Debug, Clone)]
pub(crate) struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
    norms: Vec<f32>,
}

impl FlatIndex {
    fn new(dimension: usize, data: Vec<f32>) -> Self {
        let norms = data.chunks_exact(dimension).map(l2_norm).collect();
        Self { dimension, data, norms }
    }

    #[inline]
    pub(crate) fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    fn len(&self) -> usize {
        self.norms.len()
    }
}

/// One document's chunks and vectors, immutable once built or loaded.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    meta: StoreMeta,
    texts: Vec<String>,
    index: FlatIndex,
}

impl DocumentStore {
    /// Validate a chunk/vector batch and build the index in memory.
    ///
    /// Checks run in a fixed order so the reported error is deterministic:
    /// emptiness, counts, dimension, then per-chunk content.
    pub fn build(
        doc_id: DocId,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
        normalize: bool,
        built_at_ms: i64,
    ) -> Result<Self, BuildError> {
        if chunks.is_empty() || vectors.is_empty() {
            return Err(BuildError::EmptyInput { chunks: chunks.len(), vectors: vectors.len() });
        }
        if chunks.len() != vectors.len() {
            return Err(BuildError::LengthMismatch { chunks: chunks.len(), vectors: vectors.len() });
        }
        let chunk_count =
            u32::try_from(chunks.len()).map_err(|_| BuildError::TooManyChunks { count: chunks.len() })?;
        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(BuildError::ZeroDimension);
        }
        let dim_u32 = u32::try_from(dimension).map_err(|_| BuildError::DimensionTooLarge { dimension })?;

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (index, (text, mut vector)) in chunks.iter().zip(vectors).enumerate() {
            if vector.len() != dimension {
                return Err(BuildError::DimensionMismatch { index, expected: dimension, actual: vector.len() });
            }
            if text.trim().is_empty() {
                return Err(BuildError::EmptyChunk { index });
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(BuildError::NonFiniteComponent { index });
            }
            if normalize {
                if !normalize_in_place(&mut vector) {
                    return Err(BuildError::ZeroNorm { index });
                }
                if !is_unit(&vector) {
                    return Err(BuildError::NotUnitLength { index, norm: l2_norm(&vector) });
                }
            }
            data.extend_from_slice(&vector);
        }

        let meta = StoreMeta { doc_id, dimension: dim_u32, normalized: normalize, chunk_count, built_at_ms };
        Ok(Self::from_parts(meta, chunks, data))
    }

    /// Assemble a store from already validated parts.
    pub(crate) fn from_parts(meta: StoreMeta, texts: Vec<String>, data: Vec<f32>) -> Self {
        let index = FlatIndex::new(meta.dimension as usize, data);
        Self { meta, texts, index }
    }

    #[must_use]
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    #[must_use]
    pub fn doc_id(&self) -> &DocId {
        &self.meta.doc_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub(crate) fn vector(&self, i: usize) -> &[f32] {
        self.index.row(i)
    }

    #[must_use]
    pub fn chunk(&self, i: usize) -> Option<ChunkRecord> {
        let text = self.texts.get(i)?;
        Some(ChunkRecord { index: i as u32, text: text.clone(), vector: self.index.row(i).to_vec() })
    }

    pub fn records(&self) -> impl Iterator<Item = ChunkRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.chunk(i))
    }

    /// Exact nearest neighbours by squared Euclidean distance, ascending,
    /// ties broken by lower chunk index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<QueryResult>, SearchError> {
        let dimension = self.index.dimension;
        if query.len() != dimension {
            return Err(SearchError::DimensionMismatch { expected: dimension, actual: query.len() });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(SearchError::NonFiniteQuery);
        }
        let mut q = query.to_vec();
        if self.meta.normalized && !normalize_in_place(&mut q) {
            return Err(SearchError::ZeroNormQuery);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> =
            (0..self.index.len()).map(|i| (squared_l2(&q, self.index.row(i)), i)).collect();
        let order = |a: &(f32, usize), b: &(f32, usize)| -> Ordering { a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)) };
        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(order);

        let q_norm = l2_norm(&q);
        let results = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, i))| QueryResult {
                index: i as u32,
                text: self.texts[i].clone(),
                score,
                similarity: cosine(&q, self.index.row(i), q_norm, self.index.norms[i]),
                rank: rank as u32,
            })
            .collect();
        tracing::debug!(doc_id = %self.meta.doc_id, k, "searched store");
        Ok(results)
    }
}

impl VectorSnapshot for DocumentStore {
    fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<QueryResult>, SearchError> {
        DocumentStore::search(self, query, k)
    }
}
