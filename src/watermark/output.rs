//! Output artifact allocation and atomic writes.
//!
//! Every call writes to a fresh, uniquely named file carrying the source's
//! extension. Content goes to a temporary file in the same directory first and
//! is renamed into place only once fully written, so a failed call leaves no
//! partial output behind.

use super::{BackendKind, WatermarkError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A newly produced watermarked file, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub kind: BackendKind,
}

/// Lowercased extension of `source`, if any.
pub fn source_extension(source: &Path) -> Option<String> {
    source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Allocate a unique output path in `dir` with the same extension as `source`.
pub fn allocate_output_path(dir: &Path, source: &Path) -> PathBuf {
    let stem = Uuid::new_v4().simple().to_string();
    match source_extension(source) {
        Some(ext) if !ext.is_empty() => dir.join(format!("{}.{}", stem, ext)),
        _ => dir.join(stem),
    }
}

/// Write `path` atomically through `write`.
///
/// The closure receives a temporary file next to `path`; the temporary is
/// removed if the closure or the final rename fails.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), WatermarkError>
where
    F: FnOnce(&mut std::fs::File) -> Result<(), WatermarkError>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| WatermarkError::failure(format!("create temp file in {}", dir.display()), e))?;

    write(temp.as_file_mut())?;
    temp.as_file_mut()
        .flush()
        .map_err(|e| WatermarkError::failure("flush output", e))?;

    temp.persist(path)
        .map_err(|e| WatermarkError::failure(format!("persist {}", path.display()), e.error))?;
    Ok(())
}

/// Write `bytes` to `path` atomically.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), WatermarkError> {
    write_atomic(path, |file| {
        file.write_all(bytes)
            .map_err(|e| WatermarkError::failure("write output", e))
    })
}
