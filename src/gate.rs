//! Client-side checks that run before anything is sent to the backend.

use crate::error::UploadRejection;
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_BATCH_FILES: usize = 20;
pub const MAX_BATCH_BYTES: u64 = 50 * 1024 * 1024;

pub const SINGLE_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];
pub const BATCH_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg", "application/zip"];

/// A file the user picked, described the way a browser file input would (name, MIME type, size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    pub size: u64,
}

impl FileCandidate {
    /// Stat a local file and guess its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, UploadRejection> {
        let name = path
            .file_name()
            .and_then(|o| o.to_str())
            .unwrap_or("")
            .to_string();
        let metadata = fs::metadata(path).map_err(|e| UploadRejection::Unreadable {
            name: name.clone(),
            reason: if e.kind() == std::io::ErrorKind::NotFound {
                "file not found".to_string()
            } else {
                e.to_string()
            },
        })?;
        if !metadata.is_file() {
            return Err(UploadRejection::Unreadable {
                name,
                reason: "not a regular file".to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            mime: guess_mime(path),
            name,
            size: metadata.len(),
        })
    }
}

/// Empty string when the extension is unknown, like `File.type` in a browser.
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("")
        .to_string()
}

/// Single upload: type first, then size.
pub fn check_single(file: &FileCandidate) -> Result<(), UploadRejection> {
    if !SINGLE_TYPES.contains(&file.mime.as_str()) {
        return Err(UploadRejection::UnsupportedType {
            name: file.name.clone(),
        });
    }
    if file.size > MAX_FILE_BYTES {
        return Err(UploadRejection::FileTooLarge {
            name: file.name.clone(),
            size: file.size,
        });
    }
    Ok(())
}

/// Batch upload: count, combined size, then each file's type (first offender is reported).
pub fn check_batch(files: &[FileCandidate]) -> Result<(), UploadRejection> {
    if files.is_empty() {
        return Err(UploadRejection::EmptyBatch);
    }
    if files.len() > MAX_BATCH_FILES {
        return Err(UploadRejection::TooManyFiles { count: files.len() });
    }
    let total: u64 = files.iter().map(|f| f.size).sum();
    if total > MAX_BATCH_BYTES {
        return Err(UploadRejection::BatchTooLarge { total });
    }
    if let Some(bad) = files
        .iter()
        .find(|f| !BATCH_TYPES.contains(&f.mime.as_str()))
    {
        return Err(UploadRejection::UnsupportedBatchType {
            name: bad.name.clone(),
        });
    }
    Ok(())
}
