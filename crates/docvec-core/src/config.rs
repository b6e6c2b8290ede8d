use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunking::{ParagraphChunker, WordWindowChunker};
use crate::error::ConfigError;
use crate::traits::Chunker;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "APP_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding one `<doc_id>.dvs` file per document.
    pub dir: PathBuf,
    /// L2-normalize vectors at build time (and queries at search time).
    pub normalize: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { dir: PathBuf::from("data/vector_store"), normalize: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_k: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Words,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub strategy: ChunkStrategy,
    pub chunk_words: usize,
    pub overlap_words: usize,
    /// Paragraph strategy only: paragraphs above this estimate are windowed.
    pub max_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { strategy: ChunkStrategy::Words, chunk_words: 300, overlap_words: 50, max_tokens: 500 }
    }
}

impl ChunkingSettings {
    #[must_use]
    pub fn build(&self) -> Box<dyn Chunker> {
        match self.strategy {
            ChunkStrategy::Words => Box::new(WordWindowChunker::new(self.chunk_words, self.overlap_words)),
            ChunkStrategy::Paragraph => Box::new(ParagraphChunker::new(
                self.max_tokens,
                self.chunk_words,
                self.overlap_words,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingProvider {
    #[serde(rename = "hash")]
    Hash,
    #[serde(rename = "bge-m3")]
    BgeM3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Output dimension of the hash embedder; the model reports its own.
    pub dimension: usize,
    pub model_dir: PathBuf,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            dimension: 384,
            model_dir: PathBuf::from("models/bge-m3"),
            max_len: 256,
            batch_size: 32,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if self.chunking.chunk_words == 0 {
            return invalid("chunking.chunk_words must be > 0".into());
        }
        if self.chunking.overlap_words >= self.chunking.chunk_words {
            return invalid(format!(
                "chunking.overlap_words ({}) must be < chunking.chunk_words ({})",
                self.chunking.overlap_words, self.chunking.chunk_words
            ));
        }
        if self.embedding.dimension == 0 {
            return invalid("embedding.dimension must be > 0".into());
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding.batch_size must be > 0".into());
        }
        if self.retrieval.default_k == 0 {
            return invalid("retrieval.default_k must be > 0".into());
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Merge defaults, `<dir>/config.toml`, `<dir>/config.<env>.toml` and
    /// `APP_*` env vars (`__` separates nested keys, e.g. `APP_STORE__DIR`).
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join(CONFIG_FILE)));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    /// Load an explicit config file; relative paths inside resolve against
    /// the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Invalid(format!("config file {} not found", path.display())));
        }
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { figment, base_dir })
    }

    pub fn get<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(self.figment.extract_inner(key)?)
    }

    /// Typed, validated settings with paths expanded and resolved.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings: Settings = self.figment.extract()?;
        settings.store.dir = resolve_with_base(&self.base_dir, settings.store.dir.to_string_lossy());
        settings.embedding.model_dir =
            resolve_with_base(&self.base_dir, settings.embedding.model_dir.to_string_lossy());
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
