//! Embedding providers: a deterministic hash embedder for tests and offline
//! use, and a BGE-M3 embedder backed by candle.

use anyhow::Result;

use docvec_core::config::{EmbeddingProvider, EmbeddingSettings};
use docvec_core::Embedder;

mod bge;
mod device;
mod hash;
mod pool;
mod tokenize;

pub use bge::BgeM3Embedder;
pub use device::select_device;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// `APP_USE_FAKE_EMBEDDINGS=1` (or `true`) forces the hash embedder.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder selected by the settings.
pub fn default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if fake_embeddings_forced() || settings.provider == EmbeddingProvider::Hash {
        tracing::info!(dimension = settings.dimension, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dimension)?));
    }
    Ok(Box::new(BgeM3Embedder::load(&settings.model_dir, settings.max_len, settings.batch_size)?))
}
