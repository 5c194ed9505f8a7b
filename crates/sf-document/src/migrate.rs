//! Schema migration.

use crate::DocumentError;
use crate::schema::Document;
use serde_json::Value;
use tracing::info;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut doc: Document) -> Result<Document, DocumentError> {
    if doc.version > LATEST_VERSION {
        return Err(DocumentError::Migration {
            what: format!(
                "document version {} is newer than supported version {LATEST_VERSION}",
                doc.version
            ),
        });
    }
    while doc.version < LATEST_VERSION {
        let from = doc.version;
        doc = migrate_one_version(doc)?;
        info!(from, to = doc.version, "document migrated");
    }
    Ok(doc)
}

fn migrate_one_version(doc: Document) -> Result<Document, DocumentError> {
    match doc.version {
        0 => migrate_v0_to_v1(doc),
        v => Err(DocumentError::Migration {
            what: format!("No migration path from version {v}"),
        }),
    }
}

/// The editor's raw dump: unset fields saved as `""` or `null`.
fn migrate_v0_to_v1(mut doc: Document) -> Result<Document, DocumentError> {
    for e in &mut doc.elements {
        e.fields.retain(|_, v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        });
    }
    doc.version = 1;
    Ok(doc)
}
