//! core::manifest
//!
//! Folding the normalized settings schema into the plugin manifest.
//!
//! # Design
//!
//! The manifest is treated as an opaque JSON document: only the
//! `configuration` key is replaced, every other key keeps its value and its
//! position. Output uses 2-space indentation and ends with a newline.
//!
//! Writes are atomic (temp file in the same directory, then rename), so a
//! failed run never leaves a half-written manifest behind. The temp file is
//! removed on every failure and the manifest keeps its permission bits.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Key under which the normalized schema is stored.
pub const CONFIGURATION_KEY: &str = "configuration";

/// Errors from manifest operations. All of them are fatal.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write manifest '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read the manifest at `path`, set its `configuration` to `schema`, and
/// write it back in place.
///
/// Returns the merged document.
pub fn merge(path: &Path, schema: &Value) -> Result<Value, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|e| ManifestError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let document: Value = serde_json::from_str(&contents).map_err(|e| ManifestError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let merged = merge_document(document, schema.clone()).map_err(|message| {
        ManifestError::Parse {
            path: path.to_path_buf(),
            message,
        }
    })?;

    write_atomic(path, &render(&merged))?;
    tracing::debug!(path = %path.display(), "manifest updated");

    Ok(merged)
}

/// Set `configuration` on an already-parsed manifest document.
///
/// An existing `configuration` key keeps its position; a new one is appended.
///
/// # Errors
///
/// Returns a message if the document root is not a JSON object.
pub fn merge_document(document: Value, schema: Value) -> Result<Value, String> {
    match document {
        Value::Object(mut map) => {
            map.insert(CONFIGURATION_KEY.to_string(), schema);
            Ok(Value::Object(map))
        }
        other => Err(format!(
            "manifest root must be a JSON object, found {}",
            kind(&other)
        )),
    }
}

/// Serialize a document the way manifests are stored on disk.
pub fn render(document: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are always strings.
    let mut out = serde_json::to_string_pretty(document).unwrap_or_default();
    out.push('\n');
    out
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), ManifestError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let write = || -> Result<(), (PathBuf, std::io::Error)> {
        let on_temp = |e| (temp_path.clone(), e);
        let permissions = fs::metadata(path).ok().map(|m| m.permissions());

        let mut file = fs::File::create(&temp_path).map_err(on_temp)?;
        file.write_all(contents.as_bytes()).map_err(on_temp)?;
        file.sync_all().map_err(on_temp)?;
        if let Some(permissions) = permissions {
            file.set_permissions(permissions).map_err(on_temp)?;
        }
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| (path.to_path_buf(), e))
    };

    write().map_err(|(failed, source)| {
        let _ = fs::remove_file(&temp_path);
        ManifestError::Write {
            path: failed,
            source,
        }
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
