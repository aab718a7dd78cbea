//! Document layer error types

use thiserror::Error;
use uuid::Uuid;

use crate::storage::{CommitId, StorageError};

/// errors raised by documents, collections and their drivers
#[derive(Debug, Error)]
pub enum DocumentError {
    /// no visible revision for the requested selector
    #[error("document {uuid} ({language}) not found in collection '{collection}'")]
    DocumentNotFound {
        collection: String,
        uuid: Uuid,
        language: String,
    },

    /// driver-level miss, translated to `DocumentNotFound` by `Collection`
    #[error("no {selector} record for {uuid} ({language})")]
    RecordNotFound {
        uuid: Uuid,
        language: String,
        selector: String,
    },

    #[error("cannot save a commit with no revisions")]
    EmptyCommit,

    #[error("'{operation}' is not supported by the {realization} driver")]
    Unsupported {
        operation: &'static str,
        realization: &'static str,
    },

    #[error("collection '{collection}' is pinned to commit {commit} and cannot be written")]
    ReadOnly { collection: String, commit: CommitId },

    /// stored payload isn't a document
    #[error("invalid document payload: {0}")]
    InvalidDocument(String),

    #[error("cannot decode field items of class '{class}': {reason}")]
    FieldDecode { class: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DocumentError {
    /// check if this error means the document isn't visible
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentError::DocumentNotFound { .. })
    }

    pub(crate) fn is_record_not_found(&self) -> bool {
        matches!(self, DocumentError::RecordNotFound { .. })
    }
}

/// result type alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
