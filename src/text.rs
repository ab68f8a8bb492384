//! Literal substring substitution over whole files.
//!
//! The presence check ignores case while the replacement itself is
//! exact-case. A file that only holds a differently-cased occurrence is
//! reported as found and rewritten with its content unchanged.
//!
//! Case is folded one character at a time through its simple uppercase
//! mapping, so characters like the Kelvin sign only match themselves.

use std::path::Path;

use thiserror::Error;

use crate::config::RuleSet;
use crate::edit::{EditError, Rewrite};
use crate::log::{OperationLog, Outcome};

#[derive(Error, Debug)]
pub enum TextError {
    #[error("search text is empty")]
    EmptySearch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("write error: {0}")]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// No occurrence in any case; the file was not written
    NotFound,
    /// Found ignoring case; `occurrences` counts exact-case replacements
    Replaced { occurrences: usize },
}

impl Substitution {
    pub fn found(self) -> bool {
        matches!(self, Substitution::Replaced { .. })
    }
}

fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let haystack: String = haystack.chars().map(fold_case).collect();
    let needle: String = needle.chars().map(fold_case).collect();
    haystack.contains(&needle)
}

/// Replace every exact-case occurrence of `search` in the file at `path`.
pub fn replace(path: &Path, search: &str, replacement: &str) -> Result<Substitution, TextError> {
    if search.is_empty() {
        return Err(TextError::EmptySearch);
    }

    let original = std::fs::read(path)?;
    let content = std::str::from_utf8(&original)?;
    if !contains_ignore_case(content, search) {
        return Ok(Substitution::NotFound);
    }

    let occurrences = content.matches(search).count();
    let updated = content.replace(search, replacement);
    let written = Rewrite::new(path, &original, updated).apply()?;
    tracing::debug!(path = %path.display(), occurrences, result = ?written, "substitution written");

    Ok(Substitution::Replaced { occurrences })
}

/// Apply every rule to one file, each independently, logging one line per
/// rule.
pub fn substitute_all(path: &Path, rules: &RuleSet, log: &mut OperationLog) {
    let file = path.display();
    for rule in rules {
        match replace(path, &rule.key, &rule.value) {
            Ok(Substitution::Replaced { occurrences }) => {
                log.push(
                    Outcome::Replaced,
                    format!("Replaced '{}' with '{}' in {file}", rule.key, rule.value),
                );
                if occurrences == 0 {
                    log.push(
                        Outcome::Info,
                        format!(
                            "'{}' only matched ignoring case in {file}; content left as is",
                            rule.key
                        ),
                    );
                }
            }
            Ok(Substitution::NotFound) => log.push(
                Outcome::NotFound,
                format!("'{}' not found in {file}", rule.key),
            ),
            Err(err) => log.error(format!("Error replacing '{}' in {file}: {err}", rule.key)),
        }
    }
}
