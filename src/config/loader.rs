use crate::config::schema::{RuleBook, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialization format of a rule configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` selects TOML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path),
                source,
            },
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule config JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule config JSON: {}", source),
            },
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule config ({}): {}", path.display(), source),
                None => write!(f, "invalid rule config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str, format: ConfigFormat) -> Result<RuleBook, ConfigError> {
    let book: RuleBook = match format {
        ConfigFormat::Json => serde_json::from_str(input)
            .map_err(|source| ConfigError::Json { path: None, source })?,
        ConfigFormat::Toml => toml_edit::de::from_str(input)
            .map_err(|source| ConfigError::Toml { path: None, source })?,
    };
    book.validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(book)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleBook, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(&contents);
    load_from_str(contents, ConfigFormat::from_path(path)).map_err(|error| error.with_path(path))
}
