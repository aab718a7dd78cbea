//! Ordered result of a bulk load.

use uuid::Uuid;

use crate::document::revision::{DocumentView, Revision};

/// revisions in the order their uuids were requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisionSet {
    revisions: Vec<Revision>,
}

impl RevisionSet {
    pub fn get(&self, uuid: Uuid) -> Option<&Revision> {
        self.revisions.iter().find(|revision| revision.uuid() == uuid)
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.get(uuid).is_some()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.revisions.iter()
    }

    pub fn uuids(&self) -> Vec<Uuid> {
        self.revisions.iter().map(DocumentView::uuid).collect()
    }
}

impl FromIterator<Revision> for RevisionSet {
    fn from_iter<I: IntoIterator<Item = Revision>>(iter: I) -> Self {
        Self {
            revisions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RevisionSet {
    type Item = Revision;
    type IntoIter = std::vec::IntoIter<Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.into_iter()
    }
}

impl<'a> IntoIterator for &'a RevisionSet {
    type Item = &'a Revision;
    type IntoIter = std::slice::Iter<'a, Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}
