//! Append-only operation trace.
//!
//! Every decision an engine makes (matched, updated, inserted, removed, not
//! found) lands here as one human-readable line. The log is the only record
//! of what an operation did, so lines are never reordered or dropped. Each
//! appended line is mirrored to `tracing` for embedders that collect
//! structured logs.

use std::fmt;

/// Classification of a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Banner bracketing a pass (e.g. `properties`, `POM done`)
    Section,
    /// Existing node or key rewritten in place
    Updated,
    /// New node synthesized under a known container
    Added,
    /// Node removed from the document
    Removed,
    /// Rule key had no match in the document
    NotFound,
    /// Text substitution performed on a file
    Replaced,
    /// Cleanup target deleted
    Deleted,
    /// Cleanup target did not exist
    Absent,
    /// Informational line with no mutation attached
    Info,
    /// File-level or step-level failure
    Error,
}

impl Outcome {
    pub fn is_error(self) -> bool {
        matches!(self, Outcome::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub outcome: Outcome,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "OperationLog is the only record of what an operation changed"]
pub struct OperationLog {
    lines: Vec<LogLine>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: Outcome, message: impl Into<String>) {
        let message = message.into();
        match outcome {
            Outcome::Error => tracing::error!(target: "mule_patcher::log", "{message}"),
            Outcome::NotFound | Outcome::Absent => {
                tracing::warn!(target: "mule_patcher::log", "{message}")
            }
            Outcome::Section => tracing::trace!(target: "mule_patcher::log", "{message}"),
            _ => tracing::debug!(target: "mule_patcher::log", ?outcome, "{message}"),
        }
        self.lines.push(LogLine { outcome, message });
    }

    pub fn section(&mut self, message: impl Into<String>) {
        self.push(Outcome::Section, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Outcome::Error, message);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|line| line.outcome.is_error())
    }

    /// Count lines with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.lines
            .iter()
            .filter(|line| line.outcome == outcome)
            .count()
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.message.contains(needle))
    }
}

impl fmt::Display for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.message)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a OperationLog {
    type Item = &'a LogLine;
    type IntoIter = std::slice::Iter<'a, LogLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
