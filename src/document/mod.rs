//! Document model: revisions, fields and their JSON payload.

mod codec;
mod error;
mod fields;
mod revision;
mod set;

pub use codec::{deserialize_document, serialize_document, DOCUMENT_CLASS};
pub use error::{DocumentError, DocumentResult};
pub use fields::{FieldItem, FieldSet, TextField};
pub use revision::{DocumentData, DocumentView, DraftRevision, Revision, RevisionId};
pub use set::RevisionSet;
