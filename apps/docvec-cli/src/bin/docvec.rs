//! `docvec`: ingest documents into per-document vector stores and query them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use docvec_core::config::{Config, Settings};
use docvec_core::loader::is_supported;
use docvec_core::{DocId, Retrieval, ScoreThreshold};
use docvec_embed::default_embedder;
use docvec_retrieval::{Ingestor, RetrievalEngine};
use docvec_vector::StoreDir;

#[derive(Parser)]
#[command(name = "docvec")]
#[command(about = "Per-document embedding store and similarity retrieval")]
#[command(version)]
struct Cli {
    /// Config file (default: ./config.toml plus ./config.<RUST_ENV>.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Correlation id recorded on every log line of this request
    #[arg(long, global = true)]
    trace_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and store one document
    Ingest {
        file: PathBuf,

        /// Store id (default: sanitized file stem)
        #[arg(long)]
        doc_id: Option<DocId>,

        /// Keep raw vectors instead of L2-normalizing them
        #[arg(long)]
        no_normalize: bool,
    },

    /// Ingest every supported file under a directory, one store per file
    IngestDir {
        dir: PathBuf,

        #[arg(long)]
        no_normalize: bool,
    },

    /// Retrieve the chunks of a document closest to a query
    Query {
        doc_id: DocId,

        query: String,

        /// Number of results (default: retrieval.default_k)
        #[arg(short, long = "top-k")]
        k: Option<usize>,

        #[command(flatten)]
        threshold: ThresholdArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a store's metadata and chunk previews
    Inspect {
        doc_id: DocId,

        #[arg(long)]
        json: bool,
    },

    /// List stored documents
    List,

    /// Delete a document's store
    Remove { doc_id: DocId },
}

#[derive(Args)]
#[group(multiple = false)]
struct ThresholdArgs {
    /// Keep results with squared distance <= this
    #[arg(long)]
    max_distance: Option<f32>,

    /// Keep results with cosine similarity >= this
    #[arg(long)]
    min_similarity: Option<f32>,
}

impl ThresholdArgs {
    fn threshold(&self) -> Option<ScoreThreshold> {
        self.max_distance
            .map(ScoreThreshold::MaxDistance)
            .or(self.min_similarity.map(ScoreThreshold::MinSimilarity))
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    Ok(config.settings()?)
}

fn open_store(settings: &Settings, no_normalize: bool) -> Result<StoreDir> {
    let dir = StoreDir::open(&settings.store.dir)
        .with_context(|| format!("opening store directory {}", settings.store.dir.display()))?;
    Ok(dir.with_normalize(settings.store.normalize && !no_normalize))
}

fn ingestor(settings: &Settings, store: StoreDir) -> Result<Ingestor<StoreDir>> {
    let embedder = default_embedder(&settings.embedding)?;
    Ok(Ingestor::new(settings.chunking.build(), embedder, store).with_batch_size(settings.embedding.batch_size))
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

fn cmd_ingest(settings: &Settings, file: &Path, doc_id: Option<DocId>, no_normalize: bool) -> Result<()> {
    let ingestor = ingestor(settings, open_store(settings, no_normalize)?)?;
    let report = ingestor
        .ingest_file(file, doc_id)
        .with_context(|| format!("ingesting {}", file.display()))?;
    println!(
        "ingested {} as '{}' ({} chunks, dimension {}, embedder {})",
        file.display(),
        report.doc_id,
        report.chunks,
        report.dimension,
        report.embedder_id
    );
    Ok(())
}

fn cmd_ingest_dir(settings: &Settings, dir: &Path, no_normalize: bool) -> Result<()> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    if files.is_empty() {
        println!("no supported files under {}", dir.display());
        return Ok(());
    }

    let ingestor = ingestor(settings, open_store(settings, no_normalize)?)?;
    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut seen = HashSet::new();
    let mut stored = 0usize;
    let mut failed = 0usize;
    for path in &files {
        pb.set_message(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
        let result = DocId::from_path(path)
            .map_err(anyhow::Error::from)
            .and_then(|id| {
                if !seen.insert(id.clone()) {
                    tracing::warn!(doc_id = %id, path = %path.display(), "duplicate document id, replacing earlier store");
                }
                ingestor.ingest_file(path, Some(id)).map_err(anyhow::Error::from)
            });
        match result {
            Ok(_) => stored += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "skipping file");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    println!("ingested {stored} of {} files ({failed} failed)", files.len());
    Ok(())
}

fn cmd_query(
    settings: &Settings,
    doc_id: &DocId,
    query: &str,
    k: Option<usize>,
    threshold: Option<ScoreThreshold>,
    as_json: bool,
) -> Result<()> {
    let engine = RetrievalEngine::new(open_store(settings, false)?, default_embedder(&settings.embedding)?);
    let k = k.unwrap_or(settings.retrieval.default_k);
    let retrieval = engine.retrieve(doc_id, query, k, threshold)?;

    if as_json {
        let status = if retrieval.is_empty() { "empty" } else { "hits" };
        let out = json!({ "doc_id": doc_id, "query": query, "status": status, "results": retrieval.results() });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    match retrieval {
        Retrieval::Empty => println!("no results for '{doc_id}'"),
        Retrieval::Hits(hits) => {
            for hit in hits {
                println!(
                    "#{} [chunk {}] distance={:.4} similarity={:.4}\n    {}",
                    hit.rank + 1,
                    hit.index,
                    hit.score,
                    hit.similarity,
                    preview(&hit.text, 200)
                );
            }
        }
    }
    Ok(())
}

fn cmd_inspect(settings: &Settings, doc_id: &DocId, as_json: bool) -> Result<()> {
    let store = open_store(settings, false)?.load(doc_id)?;
    let meta = store.meta();
    if as_json {
        let chunks: Vec<_> = store
            .records()
            .map(|r| json!({ "index": r.index, "text": r.text }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "meta": meta, "chunks": chunks }))?);
        return Ok(());
    }
    let built = chrono::DateTime::from_timestamp_millis(meta.built_at_ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| meta.built_at_ms.to_string());
    println!("doc_id:     {}", meta.doc_id);
    println!("chunks:     {}", meta.chunk_count);
    println!("dimension:  {}", meta.dimension);
    println!("normalized: {}", meta.normalized);
    println!("built_at:   {built}");
    for (i, text) in store.texts().iter().enumerate() {
        println!("  [{i}] {}", preview(text, 80));
    }
    Ok(())
}

fn cmd_list(settings: &Settings) -> Result<()> {
    let store = open_store(settings, false)?;
    let ids = store.doc_ids()?;
    if ids.is_empty() {
        println!("no documents in {}", store.root().display());
        return Ok(());
    }
    for id in ids {
        match store.meta(&id) {
            Ok(meta) => println!("{id}\t{} chunks\tdim {}", meta.chunk_count, meta.dimension),
            Err(e) => println!("{id}\tunreadable: {e}"),
        }
    }
    Ok(())
}

fn cmd_remove(settings: &Settings, doc_id: &DocId) -> Result<()> {
    open_store(settings, false)?.remove(doc_id)?;
    println!("removed '{doc_id}'");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let trace_id = cli
        .trace_id
        .clone()
        .unwrap_or_else(|| format!("{:x}", chrono::Utc::now().timestamp_micros()));
    let span = tracing::info_span!("request", trace_id = %trace_id);
    let _guard = span.enter();

    let settings = load_settings(cli.config.as_deref())?;
    tracing::debug!(store = %settings.store.dir.display(), provider = ?settings.embedding.provider, "settings loaded");

    match &cli.command {
        Commands::Ingest { file, doc_id, no_normalize } => {
            cmd_ingest(&settings, file, doc_id.clone(), *no_normalize)
        }
        Commands::IngestDir { dir, no_normalize } => cmd_ingest_dir(&settings, dir, *no_normalize),
        Commands::Query { doc_id, query, k, threshold, json } => {
            cmd_query(&settings, doc_id, query, *k, threshold.threshold(), *json)
        }
        Commands::Inspect { doc_id, json } => cmd_inspect(&settings, doc_id, *json),
        Commands::List => cmd_list(&settings),
        Commands::Remove { doc_id } => cmd_remove(&settings, doc_id),
    }
}
