use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the lock file created in a root while an operation runs on it.
pub const LOCK_FILE_NAME: &str = ".mule-patcher.lock";

/// Keeps fixed-name targets inside the selected root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical path of the selected root
    workspace_root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside the selected folder: {path} (folder: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("another operation is already running on {root} (remove {lock} if it is stale)")]
    Locked { root: PathBuf, lock: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[source] std::io::Error),

    #[error("Failed to create lock file: {0}")]
    Lock(#[source] std::io::Error),
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root` (canonicalized, so symlinks
    /// in the root path itself are resolved).
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root
            .as_ref()
            .canonicalize()
            .map_err(SafetyError::Canonicalize)?;
        Ok(Self { workspace_root })
    }

    /// Check that an existing `path` resolves inside the root.
    ///
    /// Relative paths are joined onto the root. Returns the canonical path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = absolute.canonicalize().map_err(SafetyError::Canonicalize)?;
        if !canonical.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical,
                workspace: self.workspace_root.clone(),
            });
        }
        Ok(canonical)
    }

    /// Resolve a fixed-name target under the root.
    ///
    /// Missing targets are returned as plain joined paths; existing ones must
    /// pass [`validate_path`](Self::validate_path). Symlinks are checked
    /// without following them so a link pointing outside is rejected rather
    /// than acted on.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, SafetyError> {
        let joined = self.workspace_root.join(name);
        match fs::symlink_metadata(&joined) {
            Ok(_) => self.validate_path(&joined).map(|_| joined),
            Err(_) => Ok(joined),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

/// Scoped exclusive lock on a root directory.
///
/// Held for the duration of one orchestrated operation; the lock file is
/// removed when the guard drops.
#[derive(Debug)]
#[must_use = "the lock is released as soon as ScopeLock is dropped"]
pub struct ScopeLock {
    lock_path: PathBuf,
}

impl ScopeLock {
    pub fn acquire(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = root.as_ref().to_path_buf();
        let lock_path = root.join(LOCK_FILE_NAME);

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SafetyError::Locked {
                    root,
                    lock: lock_path,
                })
            }
            Err(e) => return Err(SafetyError::Lock(e)),
        };

        // Best effort: the pid only helps a human decide whether the lock is stale
        let _ = writeln!(file, "{}", std::process::id());

        tracing::debug!(lock = %lock_path.display(), "acquired scope lock");
        Ok(Self { lock_path })
    }
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(lock = %self.lock_path.display(), error = %e, "failed to release scope lock");
        }
    }
}
