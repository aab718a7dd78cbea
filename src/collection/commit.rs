//! Batch of revisions saved together.

use crate::document::DraftRevision;

const DEFAULT_MESSAGE: &str = "No message";
const DEFAULT_AUTHOR: &str = "Anonymous <anonymous>";

/// An immutable batch of staged revisions plus author and message.
///
/// Every `with_*` call returns a new value; the receiver is left untouched.
///
/// ```ignore
/// let commit = Commit::new()
///     .with_message("Add landing pages")
///     .with_author("Editor <editor@example.com>")
///     .with_revision(home)
///     .with_revision(about);
/// collection.save_commit(&commit, true)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    message: String,
    author: String,
    revisions: Vec<DraftRevision>,
}

impl Default for Commit {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            revisions: Vec::new(),
        }
    }
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(&self, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..self.clone()
        }
    }

    pub fn with_author(&self, author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            ..self.clone()
        }
    }

    pub fn with_revision(&self, revision: DraftRevision) -> Self {
        let mut next = self.clone();
        next.revisions.push(revision);
        next
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// staged revisions, in the order they were added
    pub fn revisions(&self) -> &[DraftRevision] {
        &self.revisions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DraftRevision> {
        self.revisions.iter()
    }

    pub fn count(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl<'a> IntoIterator for &'a Commit {
    type Item = &'a DraftRevision;
    type IntoIter = std::slice::Iter<'a, DraftRevision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentData, DocumentView};

    fn draft(title: &str) -> DraftRevision {
        let mut draft = DraftRevision::new(DocumentData::new("en"));
        draft.set_title(title);
        draft
    }

    #[test]
    fn test_defaults() {
        let commit = Commit::new();
        assert_eq!(commit.message(), "No message");
        assert_eq!(commit.author(), "Anonymous <anonymous>");
        assert!(commit.is_empty());
        assert_eq!(commit.count(), 0);
    }

    #[test]
    fn test_with_returns_new_value() {
        let empty = Commit::new();
        let one = empty.with_revision(draft("first"));
        let two = one.with_revision(draft("second")).with_message("two docs");

        assert_eq!(empty.count(), 0);
        assert_eq!(one.count(), 1);
        assert_eq!(one.message(), "No message");
        assert_eq!(two.count(), 2);
        assert_eq!(two.message(), "two docs");

        let renamed = two.with_author("Editor <ed>");
        assert_eq!(two.author(), "Anonymous <anonymous>");
        assert_eq!(renamed.author(), "Editor <ed>");
    }

    #[test]
    fn test_iterates_in_append_order() {
        let commit = Commit::new()
            .with_revision(draft("a"))
            .with_revision(draft("b"))
            .with_revision(draft("c"));

        let titles: Vec<&str> = commit.iter().map(|rev| rev.title()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!((&commit).into_iter().count(), 3);
    }
}
