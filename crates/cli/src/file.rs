//! Reading and writing configuration documents.
//!
//! The file extension picks the serialization: `.json`, or `.yaml`/`.yml`.
//! Both are read into a `serde_json::Value` so the converter sees one raw
//! tree type; key order is kept as written.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("could not write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("unsupported file format for '{path}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat { path: String },
}

/// Serialization of a document on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Json,
    Yaml,
}

impl FileFormat {
    /// Format implied by the extension of `path`. A path without extension
    /// takes `fallback` when one is given.
    pub fn detect(path: &Path, fallback: Option<FileFormat>) -> Result<Self, FileError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match (extension.as_deref(), fallback) {
            (Some("json"), _) => Ok(FileFormat::Json),
            (Some("yaml" | "yml"), _) => Ok(FileFormat::Yaml),
            (None, Some(format)) => Ok(format),
            _ => Err(FileError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

pub fn load(path: &Path) -> Result<Value, FileError> {
    let display = || path.display().to_string();
    let format = FileFormat::detect(path, None)?;
    let text = std::fs::read_to_string(path).map_err(|source| FileError::Read {
        path: display(),
        source,
    })?;
    let value = match format {
        FileFormat::Json => serde_json::from_str(&text).map_err(|source| FileError::Json {
            path: display(),
            source,
        })?,
        FileFormat::Yaml => serde_yaml::from_str(&text).map_err(|source| FileError::Yaml {
            path: display(),
            source,
        })?,
    };
    debug!(path = %path.display(), ?format, "loaded document");
    Ok(value)
}

/// Writes `value` to `path`. `fallback` applies when `path` has no
/// extension.
pub fn save(path: &Path, value: &Value, fallback: FileFormat) -> Result<FileFormat, FileError> {
    let display = || path.display().to_string();
    let format = FileFormat::detect(path, Some(fallback))?;
    let text = match format {
        FileFormat::Json => {
            let mut text = serde_json::to_string_pretty(value).map_err(|source| FileError::Json {
                path: display(),
                source,
            })?;
            text.push('\n');
            text
        }
        FileFormat::Yaml => serde_yaml::to_string(value).map_err(|source| FileError::Yaml {
            path: display(),
            source,
        })?,
    };
    std::fs::write(path, text).map_err(|source| FileError::Write {
        path: display(),
        source,
    })?;
    debug!(path = %path.display(), ?format, "saved document");
    Ok(format)
}
