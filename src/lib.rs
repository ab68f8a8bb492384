//! Mule Patcher: rule-driven migration of Mule application projects
//!
//! Rewrites a project's build descriptor (`pom.xml`), policy manifests and
//! flow XML from a declarative rule book, then resets `mule-artifact.json`
//! and removes generated build output.
//!
//! # Architecture
//!
//! Every engine reads a file, mutates a fresh in-memory document, and hands
//! the fully serialized result to a single primitive: [`Rewrite`]. Each
//! decision taken along the way is appended to an [`OperationLog`].
//!
//! # Safety
//!
//! - Nothing is written until every rule pass over a document succeeded
//! - Writes verify the file did not change since it was read
//! - Atomic file writes (tempfile + fsync + rename)
//! - Fixed-name targets must stay inside the selected folder
//! - One operation per folder at a time ([`ScopeLock`])
//!
//! # Example
//!
//! ```no_run
//! use mule_patcher::{load_from_path, Orchestrator};
//! use std::path::Path;
//!
//! let rules = load_from_path("config.json")?;
//! let log = Orchestrator::new(&rules).main_changes(Path::new("my-app"))?;
//! print!("{log}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleaner;
pub mod config;
pub mod edit;
pub mod log;
pub mod orchestrator;
pub mod policy;
pub mod safety;
pub mod text;
pub mod xml;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, ConfigFormat, Rule, RuleBook, RuleSet};
pub use edit::{atomic_write, EditError, Rewrite, RewriteResult};
pub use log::{LogLine, OperationLog, Outcome};
pub use orchestrator::{OperationError, Orchestrator};
pub use policy::{apply_version, PolicyError, PolicyUpdate};
pub use safety::{SafetyError, ScopeLock, WorkspaceGuard};
pub use text::{Substitution, TextError};
pub use xml::{apply_rules, Document, ElementQuery, PomRules, XmlError};
