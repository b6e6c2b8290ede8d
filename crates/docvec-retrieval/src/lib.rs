//! Query-side retrieval over per-document stores, and the ingestion
//! pipeline that feeds them.

mod engine;
mod ingest;

pub use engine::RetrievalEngine;
pub use ingest::{IngestError, IngestReport, Ingestor};
