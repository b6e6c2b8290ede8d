//! Plain-text document loading for the ingestion side.

use std::fs;
use std::path::Path;

use crate::error::DocumentError;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv"];

#[must_use]
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
}

/// Read a supported document as text. Bytes that are not valid UTF-8 are
/// decoded lossily rather than rejected.
pub fn load_text(path: &Path) -> Result<String, DocumentError> {
    if !is_supported(path) {
        return Err(DocumentError::UnsupportedFormat {
            path: path.display().to_string(),
            extension: extension_of(path).unwrap_or_default(),
        });
    }
    let bytes = fs::read(path).map_err(|source| DocumentError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
