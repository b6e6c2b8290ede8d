//! File-backed collection of document stores, one `<doc_id>.dvs` per document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use docvec_core::{BuildError, DocId, LoadError, StoreMeta, VectorIndexer};

use crate::codec::{self, FILE_EXTENSION};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
    normalize: bool,
}

impl StoreDir {
    /// Open (creating if needed) a store directory. Stores built through it
    /// are L2-normalized unless changed with [`StoreDir::with_normalize`].
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, normalize: true })
    }

    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn path_for(&self, doc_id: &DocId) -> PathBuf {
        self.root.join(format!("{doc_id}.{FILE_EXTENSION}"))
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.path_for(doc_id).is_file()
    }

    /// Ids of all persisted stores, sorted.
    pub fn doc_ids(&self) -> io::Result<Vec<DocId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(FILE_EXTENSION) || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            match DocId::new(stem) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping store file with invalid id"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    #[tracing::instrument(skip_all, fields(doc_id = %doc_id, chunks = chunks.len()))]
    pub fn build(
        &self,
        doc_id: &DocId,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<DocumentStore, BuildError> {
        let built_at_ms = chrono::Utc::now().timestamp_millis();
        let store = DocumentStore::build(doc_id.clone(), chunks, vectors, self.normalize, built_at_ms)?;
        let bytes = codec::encode(&store);
        self.write_atomic(doc_id, &bytes)?;
        tracing::info!(
            chunks = store.len(),
            dimension = store.meta().dimension,
            normalized = store.meta().normalized,
            bytes = bytes.len(),
            "built store"
        );
        Ok(store)
    }

    #[tracing::instrument(skip_all, fields(doc_id = %doc_id))]
    pub fn load(&self, doc_id: &DocId) -> Result<DocumentStore, LoadError> {
        let path = self.path_for(doc_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound { doc_id: doc_id.clone() })
            }
            Err(e) => return Err(LoadError::Io(e)),
        };
        let store = codec::decode(&bytes, doc_id)
            .map_err(|e| LoadError::CorruptStore { doc_id: doc_id.clone(), reason: e.to_string() })?;
        tracing::info!(chunks = store.len(), "loaded store");
        Ok(store)
    }

    pub fn meta(&self, doc_id: &DocId) -> Result<StoreMeta, LoadError> {
        self.load(doc_id).map(|store| store.meta().clone())
    }

    #[tracing::instrument(skip_all, fields(doc_id = %doc_id))]
    pub fn remove(&self, doc_id: &DocId) -> Result<(), LoadError> {
        match fs::remove_file(self.path_for(doc_id)) {
            Ok(()) => {
                tracing::info!("removed store");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(LoadError::NotFound { doc_id: doc_id.clone() }),
            Err(e) => Err(LoadError::Io(e)),
        }
    }

    /// Write to a uniquely named temp file in the same directory, fsync it,
    /// then rename over the final path.
    fn write_atomic(&self, doc_id: &DocId, bytes: &[u8]) -> io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{doc_id}."))
            .suffix(".tmp")
            .tempfile_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(doc_id)).map_err(|e| e.error)?;
        #[cfg(unix)]
        {
            if let Err(e) = fs::File::open(&self.root).and_then(|dir| dir.sync_all()) {
                tracing::warn!(dir = %self.root.display(), error = %e, "directory fsync after rename failed");
            }
        }
        Ok(())
    }
}

impl VectorIndexer for StoreDir {
    type Snapshot = DocumentStore;

    fn build(
        &self,
        doc_id: &DocId,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<DocumentStore, BuildError> {
        StoreDir::build(self, doc_id, chunks, vectors)
    }

    fn load(&self, doc_id: &DocId) -> Result<DocumentStore, LoadError> {
        StoreDir::load(self, doc_id)
    }
}
