//! # Atomic File Replacement
//!
//! Writes go to a `NamedTempFile` created in the destination's own directory
//! (rename is only atomic within one filesystem), are flushed and synced, and
//! are then persisted over the destination path.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised while replacing a file.
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    /// Creating, writing or syncing the temporary file failed.
    #[error("I/O error while staging {path}: {source}")]
    Stage {
        /// Final destination of the write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Renaming the staged file over the destination failed.
    #[error("failed to replace {path}: {source}")]
    Persist {
        /// Final destination of the write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Replaces `path` with the bytes produced by `fill`.
///
/// `fill` receives the open temporary file. If it fails, the temporary file is
/// removed and `path` is left untouched.
pub fn write_with<F>(path: &Path, fill: F) -> Result<(), AtomicWriteError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let stage_err = |source: io::Error| AtomicWriteError::Stage {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(stage_err)?;
    fill(staged.as_file_mut()).map_err(stage_err)?;
    staged.as_file_mut().flush().map_err(stage_err)?;
    staged.as_file().sync_all().map_err(stage_err)?;

    staged
        .persist(path)
        .map_err(|e| AtomicWriteError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    Ok(())
}

/// Replaces `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AtomicWriteError> {
    write_with(path, |file| file.write_all(bytes))
}

/// Copies `src` over `dest` without ever exposing a partially copied `dest`.
pub fn copy_atomic(src: &Path, dest: &Path) -> Result<u64, AtomicWriteError> {
    let mut copied = 0;
    write_with(dest, |file| {
        let mut reader = File::open(src)?;
        copied = io::copy(&mut reader, file)?;
        Ok(())
    })?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"[\"2024-01-01\"]").unwrap();

        write_atomic(&path, b"[\"2024-01-02\",\"2024-01-01\"]").unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "[\"2024-01-02\",\"2024-01-01\"]");
    }

    #[test]
    fn failed_fill_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"old").unwrap();

        let result = write_with(&path, |file| {
            file.write_all(b"half")?;
            Err(io::Error::new(io::ErrorKind::Other, "encoder blew up"))
        });

        assert!(matches!(result, Err(AtomicWriteError::Stage { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        // Only the original file remains; the staged temp file was cleaned up.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn copy_atomic_reports_bytes_copied() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("disruptions.csv");
        let dest = dir.path().join("copy.csv");
        std::fs::write(&src, b"id\nTIMS-1\n").unwrap();

        let copied = copy_atomic(&src, &dest).unwrap();

        assert_eq!(copied, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"id\nTIMS-1\n");
    }

    #[test]
    fn copy_atomic_missing_source_is_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = copy_atomic(&dir.path().join("nope"), &dir.path().join("dest"));
        assert!(matches!(result, Err(AtomicWriteError::Stage { .. })));
        assert!(!dir.path().join("dest").exists());
    }
}
