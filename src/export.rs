//! Writes downloaded exports to disk.

use crate::error::{DeskError, Result};
use crate::types::{DocumentResult, ExportFormat, ExportPayload};
use std::fs;
use std::path::{Path, PathBuf};

pub fn document_stem(document_id: i64) -> String {
    format!("document_{}", document_id)
}

pub fn batch_stem(batch_id: &str) -> String {
    let safe: String = batch_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("batch_{}_results", safe)
}

/// `dir/stem.ext`, or `dir/stem_2.ext`, `dir/stem_3.ext`, … if taken.
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut p = dir.join(format!("{}.{}", stem, ext));
    let mut counter = 2u32;
    while p.exists() {
        p = dir.join(format!("{}_{}.{}", stem, counter, ext));
        counter += 1;
    }
    p
}

/// Save an export payload. JSON is pretty-printed, CSV bytes are written untouched.
pub fn save_export(
    dir: &Path,
    stem: &str,
    format: ExportFormat,
    payload: &ExportPayload,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = unique_path(dir, stem, format.as_str());
    let bytes = match payload {
        ExportPayload::Json(v) => serde_json::to_vec_pretty(v)
            .map_err(|e| DeskError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?,
        ExportPayload::Bytes(b) => b.clone(),
    };
    fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), "export saved");
    Ok(path)
}

/// Read a saved JSON export back into a field-map.
pub fn load_document_export(path: &Path) -> Result<DocumentResult> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| DeskError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
