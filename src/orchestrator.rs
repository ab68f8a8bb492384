//! The three user-facing operations.
//!
//! Each operation checks its precondition, takes the root's [`ScopeLock`],
//! then drives the engines and collects everything they report into one
//! [`OperationLog`]. Files are handled strictly one after another.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::cleaner;
use crate::config::RuleBook;
use crate::log::{OperationLog, Outcome};
use crate::policy;
use crate::safety::{SafetyError, ScopeLock, WorkspaceGuard};
use crate::text;
use crate::xml::{patch_descriptor, PomRules};

pub const DESCRIPTOR_FILE: &str = "pom.xml";
pub const POLICIES_FOLDER: &str = "policies";

/// Preconditions that stop an operation before anything is touched.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Position on the Folder where the POM is ! ({} not found)", .root.join(DESCRIPTOR_FILE).display())]
    MissingDescriptor { root: PathBuf },

    #[error("Position on the Folder where the policies are ! ({} is not a 'policies' folder)", .root.display())]
    NotPoliciesFolder { root: PathBuf },

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

#[derive(Debug, Clone, Copy)]
pub struct Orchestrator<'a> {
    rules: &'a RuleBook,
}

impl<'a> Orchestrator<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// Patch `pom.xml`, reset the manifest and clean build output.
    ///
    /// A descriptor that fails to parse, or a malformed rule fragment, is
    /// logged and ends the operation with nothing written.
    pub fn main_changes(&self, root: &Path) -> Result<OperationLog, OperationError> {
        let guard = WorkspaceGuard::new(root)?;
        let descriptor = guard.resolve(DESCRIPTOR_FILE)?;
        if !descriptor.is_file() {
            return Err(OperationError::MissingDescriptor {
                root: root.to_path_buf(),
            });
        }
        let _lock = ScopeLock::acquire(guard.workspace_root())?;

        let mut log = OperationLog::new();
        log.section("POM");
        if let Err(err) = patch_descriptor(&descriptor, &PomRules::from_book(self.rules), &mut log) {
            log.error(format!("Error: {err}"));
            return Ok(log);
        }
        log.section("POM done");

        cleaner::clean(&guard, &mut log);
        log.section("main changes are done");
        Ok(log)
    }

    /// Bump `assetVersion` in every JSON file under a `policies` folder.
    pub fn policy_changes(&self, root: &Path) -> Result<OperationLog, OperationError> {
        let guard = WorkspaceGuard::new(root)?;
        if guard.workspace_root().file_name() != Some(OsStr::new(POLICIES_FOLDER)) {
            return Err(OperationError::NotPoliciesFolder {
                root: root.to_path_buf(),
            });
        }
        let _lock = ScopeLock::acquire(guard.workspace_root())?;

        let mut log = OperationLog::new();
        log.section("changing policies");
        for file in files_with_extension(guard.workspace_root(), "json", &mut log) {
            policy::update_policy_file(&file, &self.rules.replace_policies, &mut log);
        }
        log.section("changing policies done");
        Ok(log)
    }

    /// Apply every expression rule to every XML file under `root`.
    pub fn expression_changes(&self, root: &Path) -> Result<OperationLog, OperationError> {
        let guard = WorkspaceGuard::new(root)?;
        let _lock = ScopeLock::acquire(guard.workspace_root())?;

        let mut log = OperationLog::new();
        log.section("changing expressions");
        for file in files_with_extension(guard.workspace_root(), "xml", &mut log) {
            text::substitute_all(&file, &self.rules.replace_data_weave_expressions, &mut log);
        }
        log.section("changing expressions done");
        Ok(log)
    }
}

/// Regular files under `root` whose extension matches ignoring ASCII case,
/// in path order. Unreadable entries are logged and skipped.
fn files_with_extension(root: &Path, extension: &str, log: &mut OperationLog) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log.error(format!("Error: {err}"));
                continue;
            }
        };
        let matches = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(root = %root.display(), extension, count = files.len(), "collected files");
    if files.is_empty() {
        log.push(
            Outcome::Info,
            format!("No *.{extension} files under {}", root.display()),
        );
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_main_requires_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        let book = RuleBook::default();

        let err = Orchestrator::new(&book).main_changes(dir.path()).unwrap_err();
        assert!(matches!(err, OperationError::MissingDescriptor { .. }));
        assert!(err.to_string().starts_with("Position on the Folder where the POM is !"));
        assert!(dir.path().join("target").exists());
    }

    #[test]
    fn test_policies_requires_sentinel_folder() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("policies-old");
        fs::create_dir(&other).unwrap();
        let book = RuleBook::default();

        let err = Orchestrator::new(&book).policy_changes(&other).unwrap_err();
        assert!(matches!(err, OperationError::NotPoliciesFolder { .. }));
    }

    #[test]
    fn test_lock_blocks_overlapping_operation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        let book = RuleBook::default();
        let _held = ScopeLock::acquire(dir.path().canonicalize().unwrap()).unwrap();

        let err = Orchestrator::new(&book)
            .expression_changes(dir.path())
            .unwrap_err();
        assert!(matches!(err, OperationError::Safety(SafetyError::Locked { .. })));
    }

    #[test]
    fn test_extension_match_ignores_case_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("b/nested/z.XML"), "").unwrap();
        fs::write(dir.path().join("a.xml"), "").unwrap();
        fs::write(dir.path().join("a.xml.bak"), "").unwrap();
        fs::create_dir(dir.path().join("dir.xml")).unwrap();

        let mut log = OperationLog::new();
        let files = files_with_extension(dir.path(), "xml", &mut log);
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            [PathBuf::from("a.xml"), PathBuf::from("b/nested/z.XML")]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_expressions_use_expression_rules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("flow.xml"), "#[vars.old]").unwrap();
        let book = RuleBook {
            replace_dependencies: [("vars.old", "wrong")].into_iter().collect(),
            replace_data_weave_expressions: [("vars.old", "vars.new")].into_iter().collect(),
            ..RuleBook::default()
        };

        let log = Orchestrator::new(&book)
            .expression_changes(dir.path())
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("flow.xml")).unwrap(),
            "#[vars.new]"
        );
        assert_eq!(log.count(Outcome::Replaced), 1);
        assert!(!dir.path().join(crate::safety::LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_broken_descriptor_stops_before_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), "<project>").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        let book = RuleBook::default();

        let log = Orchestrator::new(&book).main_changes(dir.path()).unwrap();
        assert!(log.has_errors());
        assert!(dir.path().join("target").exists());
        assert!(!dir.path().join(cleaner::MANIFEST_FILE).exists());
        assert!(!log.contains("main changes are done"));
    }
}
