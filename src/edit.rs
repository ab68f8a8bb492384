use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Whole-file rewrite with before-content verification.
///
/// Engines read a file, build the full mutated document in memory, and only
/// then hand the buffer to a `Rewrite`. Nothing touches disk until every rule
/// pass has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Rewrite does nothing until apply() is called"]
pub struct Rewrite {
    /// Path of the file being rewritten
    pub file: PathBuf,
    /// What the file must still contain when the write happens
    pub expected_before: ContentVerification,
    /// Complete new content
    pub new_content: Vec<u8>,
}

/// Verification strategy for the bytes a rewrite was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVerification {
    /// Exact bytes required
    Exact(Vec<u8>),
    /// xxh3 hash of the expected bytes (used for anything over 1KB)
    Hash(u64),
    /// Whatever is on disk (or nothing) may be replaced
    Any,
}

impl ContentVerification {
    pub fn matches(&self, content: &[u8]) -> bool {
        match self {
            ContentVerification::Exact(expected) => content == expected.as_slice(),
            ContentVerification::Hash(expected_hash) => xxh3_64(content) == *expected_hash,
            ContentVerification::Any => true,
        }
    }

    pub fn from_content(content: &[u8]) -> Self {
        if content.len() > 1024 {
            ContentVerification::Hash(xxh3_64(content))
        } else {
            ContentVerification::Exact(content.to_vec())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("{file} changed on disk after it was read; refusing to overwrite")]
    ConcurrentModification { file: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of applying a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RewriteResult should be checked"]
pub enum RewriteResult {
    /// New content differs from the old and was written
    Written { file: PathBuf, bytes: usize },
    /// New content equals the old; the file was rewritten with identical bytes
    Unchanged { file: PathBuf },
}

impl Rewrite {
    /// Build a rewrite of `file` from the `original` bytes it was computed from.
    pub fn new(file: impl Into<PathBuf>, original: &[u8], new_content: impl Into<Vec<u8>>) -> Self {
        Self {
            file: file.into(),
            expected_before: ContentVerification::from_content(original),
            new_content: new_content.into(),
        }
    }

    /// Rewrite of a file whose previous content does not matter.
    pub fn overwrite(file: impl Into<PathBuf>, new_content: impl Into<Vec<u8>>) -> Self {
        Self {
            file: file.into(),
            expected_before: ContentVerification::Any,
            new_content: new_content.into(),
        }
    }

    /// Verify the file still holds the expected content, then replace it
    /// atomically. The write always happens, even when content is unchanged.
    pub fn apply(&self) -> Result<RewriteResult, EditError> {
        let current = match fs::read(&self.file) {
            Ok(bytes) => Some(bytes),
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    && self.expected_before == ContentVerification::Any =>
            {
                None
            }
            Err(e) => return Err(EditError::Io(e)),
        };

        if let Some(current) = &current {
            if !self.expected_before.matches(current) {
                return Err(EditError::ConcurrentModification {
                    file: self.file.clone(),
                });
            }
        }

        atomic_write(&self.file, &self.new_content)?;

        if current.as_deref() == Some(self.new_content.as_slice()) {
            Ok(RewriteResult::Unchanged {
                file: self.file.clone(),
            })
        } else {
            Ok(RewriteResult::Written {
                file: self.file.clone(),
                bytes: self.new_content.len(),
            })
        }
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Tempfile in the same directory so the rename stays on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(EditError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    // Keep the original file's permissions across the rename
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
