//! sf-document: the network document format.
//!
//! A document is the editor's save file: a list of elements, each with a
//! `class`, a unique `name`, a canvas position and class-specific fields, and
//! a list of connections between element ports. [`to_network`] types and
//! validates it; [`from_network`] writes a network back out.

mod convert;
mod fields;
pub mod migrate;
pub mod schema;

pub use convert::{build_network, from_network, to_network};
pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;

use sf_network::ValidationError;
use std::path::Path;
use tracing::debug;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Element '{element}' has unknown class '{class}'")]
    UnknownClass { element: String, class: String },

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Unsupported document format: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fill in a missing name from the file stem.
fn finish_load(path: &Path, doc: Document) -> DocumentResult<Document> {
    let mut doc = migrate_to_latest(doc)?;
    if doc.name.is_empty()
        && let Some(stem) = path.file_stem()
    {
        doc.name = stem.to_string_lossy().into_owned();
    }
    debug!(path = %path.display(), elements = doc.elements.len(), "document loaded");
    Ok(doc)
}

pub fn parse_json(content: &str) -> DocumentResult<Document> {
    migrate_to_latest(serde_json::from_str(content)?)
}

pub fn parse_yaml(content: &str) -> DocumentResult<Document> {
    migrate_to_latest(serde_yaml::from_str(content)?)
}

pub fn load_json(path: &Path) -> DocumentResult<Document> {
    let content = std::fs::read_to_string(path)?;
    finish_load(path, serde_json::from_str(&content)?)
}

pub fn save_json(path: &Path, doc: &Document) -> DocumentResult<()> {
    let content = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_yaml(path: &Path) -> DocumentResult<Document> {
    let content = std::fs::read_to_string(path)?;
    finish_load(path, serde_yaml::from_str(&content)?)
}

pub fn save_yaml(path: &Path, doc: &Document) -> DocumentResult<()> {
    let content = serde_yaml::to_string(doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> DocumentResult<Format> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(Format::Json),
        Some("yaml" | "yml") => Ok(Format::Yaml),
        _ => Err(DocumentError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Load a `.json`, `.yaml` or `.yml` document.
pub fn load(path: &Path) -> DocumentResult<Document> {
    match format_of(path)? {
        Format::Json => load_json(path),
        Format::Yaml => load_yaml(path),
    }
}

pub fn save(path: &Path, doc: &Document) -> DocumentResult<()> {
    match format_of(path)? {
        Format::Json => save_json(path, doc),
        Format::Yaml => save_yaml(path, doc),
    }
}
