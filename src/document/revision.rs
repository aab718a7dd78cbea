//! Draft and sealed revisions.
//!
//! `DraftRevision` is the only editable form and is produced by
//! `Collection::create_document` / `Collection::new_revision`. `Revision` is
//! read-only and carries the id the driver assigned when it was saved.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::document::error::DocumentResult;
use crate::document::fields::{FieldItem, FieldSet};
use crate::storage::CommitId;

/// identifier of a saved revision
///
/// a ULID for the table realization, the commit id for the git one
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// generate a fresh, time-ordered id
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<CommitId> for RevisionId {
    fn from(id: CommitId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// content shared by drafts and saved revisions
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentData {
    pub uuid: Uuid,
    pub language: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// revision this one was derived from, `None` for a document's first
    pub parent: Option<RevisionId>,
    pub fields: BTreeMap<String, FieldSet>,
}

impl DocumentData {
    pub(crate) fn new(language: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            language: language.into(),
            title: String::new(),
            timestamp: Utc::now(),
            parent: None,
            fields: BTreeMap::new(),
        }
    }
}

/// Read access common to drafts and saved revisions.
pub trait DocumentView {
    fn data(&self) -> &DocumentData;

    fn uuid(&self) -> Uuid {
        self.data().uuid
    }

    fn language(&self) -> &str {
        &self.data().language
    }

    fn title(&self) -> &str {
        &self.data().title
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.data().timestamp
    }

    fn parent(&self) -> Option<&RevisionId> {
        self.data().parent.as_ref()
    }

    /// the tagged field stored under `name`
    fn field(&self, name: &str) -> Option<&FieldSet> {
        self.data().fields.get(name)
    }

    /// typed items of field `name`; an absent field has no items
    fn items<T: FieldItem>(&self, name: &str) -> DocumentResult<Vec<T>> {
        match self.field(name) {
            Some(set) => set.decode(),
            None => Ok(Vec::new()),
        }
    }

    fn field_names(&self) -> Vec<&str> {
        self.data().fields.keys().map(String::as_str).collect()
    }
}

/// An unsaved, editable revision.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRevision {
    data: DocumentData,
}

impl DraftRevision {
    pub(crate) fn new(data: DocumentData) -> Self {
        Self { data }
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.data.title = title.into();
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, field: FieldSet) -> &mut Self {
        self.data.fields.insert(name.into(), field);
        self
    }

    pub fn set_items<T: FieldItem>(&mut self, name: impl Into<String>, items: &[T]) -> &mut Self {
        self.set_field(name, FieldSet::from_items(items))
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldSet> {
        self.data.fields.remove(name)
    }

    pub(crate) fn into_data(self) -> DocumentData {
        self.data
    }
}

impl DocumentView for DraftRevision {
    fn data(&self) -> &DocumentData {
        &self.data
    }
}

/// A saved, immutable revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    id: RevisionId,
    data: DocumentData,
}

impl Revision {
    pub(crate) fn new(id: RevisionId, data: DocumentData) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> &RevisionId {
        &self.id
    }

    /// editable copy whose parent is this revision
    pub(crate) fn derive(&self) -> DraftRevision {
        DraftRevision::new(DocumentData {
            parent: Some(self.id.clone()),
            timestamp: Utc::now(),
            ..self.data.clone()
        })
    }
}

impl DocumentView for Revision {
    fn data(&self) -> &DocumentData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fields::TextField;

    #[test]
    fn test_new_document_defaults() {
        let draft = DraftRevision::new(DocumentData::new("en"));
        assert_eq!(draft.language(), "en");
        assert_eq!(draft.title(), "");
        assert!(draft.parent().is_none());
        assert!(draft.field_names().is_empty());
    }

    #[test]
    fn test_draft_editing() {
        let mut draft = DraftRevision::new(DocumentData::new("en"));
        draft
            .set_title("Hello")
            .set_items("body", &[TextField::new("first paragraph")]);

        assert_eq!(draft.title(), "Hello");
        let body: Vec<TextField> = draft.items("body").unwrap();
        assert_eq!(body, vec![TextField::new("first paragraph")]);
        assert!(draft.items::<TextField>("missing").unwrap().is_empty());

        assert!(draft.remove_field("body").is_some());
        assert!(draft.field("body").is_none());
    }

    #[test]
    fn test_derive_links_parent() {
        let mut data = DocumentData::new("en");
        data.title = "A".to_string();
        let saved = Revision::new(RevisionId::new("r1"), data);

        let draft = saved.derive();
        assert_eq!(draft.uuid(), saved.uuid());
        assert_eq!(draft.title(), "A");
        assert_eq!(draft.parent(), Some(&RevisionId::new("r1")));
        assert!(draft.timestamp() >= saved.timestamp());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(RevisionId::generate(), RevisionId::generate());
    }
}
