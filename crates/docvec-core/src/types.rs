//! Domain types shared by the store, the retrieval engine and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::DocIdError;

const MAX_DOC_ID_LEN: usize = 128;

/// Key scoping one document's chunk/vector store.
///
/// Valid ids are 1..=128 characters from `[A-Za-z0-9._-]` and never start
/// with `.`, so an id can be used verbatim as a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DocIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DocIdError::Empty);
        }
        if raw.len() > MAX_DOC_ID_LEN {
            return Err(DocIdError::TooLong { len: raw.len(), max: MAX_DOC_ID_LEN });
        }
        if raw.starts_with('.') {
            return Err(DocIdError::LeadingDot(raw));
        }
        if let Some(ch) = raw.chars().find(|c| !is_id_char(*c)) {
            return Err(DocIdError::InvalidChar { id: raw, ch });
        }
        Ok(Self(raw))
    }

    /// Derive an id from a file stem, replacing anything outside the allowed
    /// alphabet with `_`.
    pub fn from_path(path: &Path) -> Result<Self, DocIdError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut out: String = stem
            .chars()
            .map(|c| if is_id_char(c) { c } else { '_' })
            .collect();
        if out.starts_with('.') {
            out.replace_range(0..1, "_");
        }
        out.truncate(MAX_DOC_ID_LEN);
        Self::new(out)
    }

    /// Content-addressed id: the first 16 hex chars of the BLAKE3 digest.
    #[must_use]
    pub fn from_content(bytes: &[u8]) -> Self {
        let hex = blake3::hash(bytes).to_hex();
        Self(hex.as_str()[..16].to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocId {
    type Error = DocIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for DocId {
    type Err = DocIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// One chunk of a document together with its embedding.
///
/// - `index`: 0-based position of the chunk in the source document
/// - `text`: non-empty chunk text
/// - `vector`: embedding, exactly `dimension` components of the owning store
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub index: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Header of a persisted store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub doc_id: DocId,
    pub dimension: u32,
    pub normalized: bool,
    pub chunk_count: u32,
    pub built_at_ms: i64,
}

/// A ranked search hit.
///
/// `score` is the squared Euclidean distance to the query (lower is better)
/// and drives the ranking. `similarity` is the cosine similarity (higher is
/// better) reported alongside so callers can threshold on either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub index: u32,
    pub text: String,
    pub score: f32,
    pub similarity: f32,
    pub rank: u32,
}

/// Explicit cut-off applied after ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreThreshold {
    /// Keep results whose squared distance is `<=` the bound.
    MaxDistance(f32),
    /// Keep results whose cosine similarity is `>=` the bound.
    MinSimilarity(f32),
}

impl ScoreThreshold {
    #[must_use]
    pub fn admits(&self, result: &QueryResult) -> bool {
        match *self {
            Self::MaxDistance(bound) => result.score <= bound,
            Self::MinSimilarity(bound) => result.similarity >= bound,
        }
    }
}

/// Outcome of a retrieval. `Empty` is a valid answer, not an error: the
/// document exists but nothing in it passed the ranking and filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Hits(Vec<QueryResult>),
    Empty,
}

impl Retrieval {
    #[must_use]
    pub fn from_results(results: Vec<QueryResult>) -> Self {
        if results.is_empty() {
            Self::Empty
        } else {
            Self::Hits(results)
        }
    }

    #[must_use]
    pub fn results(&self) -> &[QueryResult] {
        match self {
            Self::Hits(results) => results,
            Self::Empty => &[],
        }
    }

    #[must_use]
    pub fn into_results(self) -> Vec<QueryResult> {
        match self {
            Self::Hits(results) => results,
            Self::Empty => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
