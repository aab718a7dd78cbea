//! JSON wire format for document payloads.
//!
//! The format stored at `{collection}/{language}/{uuid}`:
//! ```text
//! {
//!   "class": "gitdoc.document",
//!   "uuid": "7f0c6a4e-...",
//!   "language": "en",
//!   "title": "Hello",
//!   "timestamp": "2024-05-01T12:00:00Z",
//!   "parent_rev": "",
//!   "fields": { "body": { "class": "gitdoc.field.text", "items": [...] } }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::error::{DocumentError, DocumentResult};
use crate::document::fields::FieldSet;
use crate::document::revision::{DocumentData, RevisionId};

/// class tag identifying a document payload
pub const DOCUMENT_CLASS: &str = "gitdoc.document";

#[derive(Serialize, Deserialize)]
struct DocumentJson {
    class: String,
    uuid: Uuid,
    language: String,
    #[serde(default)]
    title: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    parent_rev: String,
    // BTreeMap keeps key order stable so identical documents hash identically
    #[serde(default)]
    fields: BTreeMap<String, FieldSet>,
}

/// serialize a document to JSON bytes
pub fn serialize_document(data: &DocumentData) -> DocumentResult<Vec<u8>> {
    let json = DocumentJson {
        class: DOCUMENT_CLASS.to_string(),
        uuid: data.uuid,
        language: data.language.clone(),
        title: data.title.clone(),
        timestamp: data.timestamp,
        parent_rev: data
            .parent
            .as_ref()
            .map(|parent| parent.as_str().to_string())
            .unwrap_or_default(),
        fields: data.fields.clone(),
    };

    Ok(serde_json::to_vec_pretty(&json)?)
}

/// deserialize a document from JSON bytes
pub fn deserialize_document(bytes: &[u8]) -> DocumentResult<DocumentData> {
    let json: DocumentJson = serde_json::from_slice(bytes)?;

    if json.class != DOCUMENT_CLASS {
        return Err(DocumentError::InvalidDocument(format!(
            "unexpected class '{}'",
            json.class
        )));
    }

    Ok(DocumentData {
        uuid: json.uuid,
        language: json.language,
        title: json.title,
        timestamp: json.timestamp,
        parent: (!json.parent_rev.is_empty()).then(|| RevisionId::new(json.parent_rev)),
        fields: json.fields,
    })
}
