//! Binary store format (little-endian):
//!
//! ```text
//! magic "DVS1" | version u32 | doc_id (u32 len + utf8) | built_at_ms i64
//! dimension u32 | normalized u8 | chunk_count u32
//! chunk_count x { text_len u32 | text utf8 | dimension x f32 }
//! xxhash64(seed 0) of everything above, u64
//! ```

use std::hash::Hasher;

use thiserror::Error;
use twox_hash::XxHash64;

use docvec_core::{DocId, StoreMeta};

use crate::math::{l2_norm, UNIT_NORM_TOLERANCE};
use crate::store::DocumentStore;

pub const MAGIC: &[u8; 4] = b"DVS1";
pub const VERSION: u32 = 1;
pub const FILE_EXTENSION: &str = "dvs";

const FOOTER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("checksum mismatch (stored {stored:#018x}, computed {computed:#018x})")]
    ChecksumMismatch { stored: u64, computed: u64 },
    #[error("truncated data while reading {0}")]
    Truncated(&'static str),
    #[error("{0} trailing bytes after last chunk")]
    TrailingBytes(usize),
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("invalid document id recorded in store: {0}")]
    InvalidDocId(String),
    #[error("store records document '{found}', expected '{expected}'")]
    DocIdMismatch { expected: String, found: String },
    #[error("zero dimension")]
    ZeroDimension,
    #[error("zero chunk count")]
    ZeroChunks,
    #[error("invalid normalized flag {0}")]
    InvalidFlag(u8),
    #[error("chunk {0} has empty text")]
    EmptyText(usize),
    #[error("chunk {0} has a non-finite vector component")]
    NonFinite(usize),
    #[error("chunk {index} has norm {norm} in a normalized store")]
    NotUnitLength { index: usize, norm: f32 },
}

fn checksum(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

pub fn encode(store: &DocumentStore) -> Vec<u8> {
    let meta = store.meta();
    let dim = meta.dimension as usize;
    let id = meta.doc_id.as_str().as_bytes();
    let text_bytes: usize = store.texts().iter().map(String::len).sum();
    let mut out =
        Vec::with_capacity(41 + id.len() + text_bytes + store.len() * (4 + dim * 4) + FOOTER_LEN);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(id.len() as u32).to_le_bytes());
    out.extend_from_slice(id);
    out.extend_from_slice(&meta.built_at_ms.to_le_bytes());
    out.extend_from_slice(&meta.dimension.to_le_bytes());
    out.push(u8::from(meta.normalized));
    out.extend_from_slice(&meta.chunk_count.to_le_bytes());
    for (i, text) in store.texts().iter().enumerate() {
        out.extend_from_slice(&(text.len() as u32).to_le_bytes());
        out.extend_from_slice(text.as_bytes());
        for x in store.vector(i) {
            out.extend_from_slice(&x.to_le_bytes());
        }
    }
    let sum = checksum(&out);
    out.extend_from_slice(&sum.to_le_bytes());
    out
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Truncated(what))?;
        let slice = self.buf.get(self.pos..end).ok_or(DecodeError::Truncated(what))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        self.array(what).map(u32::from_le_bytes)
    }

    fn i64(&mut self, what: &'static str) -> Result<i64, DecodeError> {
        self.array(what).map(i64::from_le_bytes)
    }

    fn str(&mut self, what: &'static str) -> Result<&'a str, DecodeError> {
        let len = self.u32(what)? as usize;
        std::str::from_utf8(self.take(len, what)?).map_err(|_| DecodeError::InvalidUtf8(what))
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Decode and fully validate a store file recorded for `expected`.
pub fn decode(bytes: &[u8], expected: &DocId) -> Result<DocumentStore, DecodeError> {
    if bytes.len() < MAGIC.len() {
        return Err(DecodeError::Truncated("magic"));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    if bytes.len() < MAGIC.len() + FOOTER_LEN {
        return Err(DecodeError::Truncated("checksum"));
    }
    let (payload, footer) = bytes.split_at(bytes.len() - FOOTER_LEN);
    let mut stored = [0u8; FOOTER_LEN];
    stored.copy_from_slice(footer);
    let stored = u64::from_le_bytes(stored);
    let computed = checksum(payload);
    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    let mut r = Reader { buf: payload, pos: MAGIC.len() };
    let version = r.u32("version")?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let raw_id = r.str("doc_id")?;
    let doc_id = DocId::new(raw_id).map_err(|e| DecodeError::InvalidDocId(e.to_string()))?;
    if &doc_id != expected {
        return Err(DecodeError::DocIdMismatch { expected: expected.to_string(), found: doc_id.to_string() });
    }
    let built_at_ms = r.i64("built_at_ms")?;
    let dimension = r.u32("dimension")?;
    if dimension == 0 {
        return Err(DecodeError::ZeroDimension);
    }
    let normalized = match r.u8("normalized")? {
        0 => false,
        1 => true,
        other => return Err(DecodeError::InvalidFlag(other)),
    };
    let chunk_count = r.u32("chunk_count")?;
    if chunk_count == 0 {
        return Err(DecodeError::ZeroChunks);
    }

    let dim = dimension as usize;
    let count = chunk_count as usize;
    // Every chunk needs at least its length prefix and vector.
    let min_chunk = 4usize.saturating_add(dim.saturating_mul(4));
    if count.saturating_mul(min_chunk) > r.remaining() {
        return Err(DecodeError::Truncated("chunks"));
    }

    let mut texts = Vec::with_capacity(count);
    let mut data = Vec::with_capacity(count * dim);
    for index in 0..count {
        let text = r.str("chunk text")?;
        if text.trim().is_empty() {
            return Err(DecodeError::EmptyText(index));
        }
        texts.push(text.to_string());
        let start = data.len();
        for raw in r.take(dim * 4, "vector")?.chunks_exact(4) {
            let x = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            if !x.is_finite() {
                return Err(DecodeError::NonFinite(index));
            }
            data.push(x);
        }
        if normalized {
            let norm = l2_norm(&data[start..]);
            if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(DecodeError::NotUnitLength { index, norm });
            }
        }
    }
    if r.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(r.remaining()));
    }

    let meta = StoreMeta { doc_id, dimension, normalized, chunk_count, built_at_ms };
    Ok(DocumentStore::from_parts(meta, texts, data))
}
