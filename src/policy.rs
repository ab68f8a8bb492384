//! Version bumps for API policy manifests.
//!
//! A policy manifest is a JSON object naming its asset in `assetId`; the
//! matching rule supplies the new `assetVersion`. Key order is preserved
//! and the document is always re-serialized with two-space indentation.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::config::RuleSet;
use crate::edit::{EditError, Rewrite};
use crate::log::{OperationLog, Outcome};

pub const ASSET_ID: &str = "assetId";
pub const ASSET_VERSION: &str = "assetVersion";

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy document is not a JSON object")]
    NotAnObject,

    #[error("no version rule for asset '{0}'")]
    UnknownAsset(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("write error: {0}")]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyUpdate {
    /// Document has no `assetId`; left as is
    NoAssetId,
    Updated { asset_id: String, version: String },
}

/// Set `assetVersion` from the rule keyed by the document's `assetId`.
///
/// An asset with no rule is an error, never a silent skip.
pub fn apply_version(document: &mut Value, rules: &RuleSet) -> Result<PolicyUpdate, PolicyError> {
    let object = document.as_object_mut().ok_or(PolicyError::NotAnObject)?;

    let asset_id = match object.get(ASSET_ID) {
        None => return Ok(PolicyUpdate::NoAssetId),
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };

    let version = rules
        .lookup(&asset_id)
        .ok_or_else(|| PolicyError::UnknownAsset(asset_id.clone()))?
        .to_string();
    object.insert(ASSET_VERSION.to_string(), Value::String(version.clone()));

    Ok(PolicyUpdate::Updated { asset_id, version })
}

/// Update one policy file and log the outcome. Failures are logged, not
/// returned, so a scan over many files carries on.
pub fn update_policy_file(path: &Path, rules: &RuleSet, log: &mut OperationLog) {
    match rewrite_policy(path, rules) {
        Ok(PolicyUpdate::Updated { asset_id, .. }) => log.push(
            Outcome::Updated,
            format!("Key '{asset_id}' updated successfully!"),
        ),
        Ok(PolicyUpdate::NoAssetId) => {
            tracing::debug!(path = %path.display(), "policy without assetId rewritten unchanged");
        }
        Err((asset_id, err)) => log.error(format!("Error updating key '{asset_id}': {err}")),
    }
}

fn rewrite_policy(path: &Path, rules: &RuleSet) -> Result<PolicyUpdate, (String, PolicyError)> {
    let original = std::fs::read(path).map_err(|e| (String::new(), PolicyError::from(e)))?;
    let mut document: Value =
        serde_json::from_slice(strip_bom(&original)).map_err(|e| (String::new(), PolicyError::from(e)))?;

    let update = apply_version(&mut document, rules).map_err(|err| {
        let asset_id = match &err {
            PolicyError::UnknownAsset(id) => id.clone(),
            _ => String::new(),
        };
        (asset_id, err)
    })?;

    let asset_id = match &update {
        PolicyUpdate::Updated { asset_id, .. } => asset_id.clone(),
        PolicyUpdate::NoAssetId => String::new(),
    };
    let serialized = serde_json::to_string_pretty(&document).map_err(|e| (asset_id.clone(), PolicyError::from(e)))?;
    let written = Rewrite::new(path, &original, serialized)
        .apply()
        .map_err(|e| (asset_id, PolicyError::from(e)))?;
    tracing::debug!(path = %path.display(), result = ?written, "policy written");

    Ok(update)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
