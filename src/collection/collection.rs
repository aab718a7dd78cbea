//! Document-level revision manager.

use std::sync::Arc;

use uuid::Uuid;

use crate::collection::commit::Commit;
use crate::collection::driver::{CollectionDriver, CollectionScope};
use crate::collection::git::GitDriver;
use crate::document::{
    DocumentData, DocumentError, DocumentResult, DocumentView, DraftRevision, Revision, RevisionId,
    RevisionSet,
};
use crate::storage::CommitId;

/// A named collection of documents in one language on one branch.
///
/// Handles are cheap to clone. `for_language` and `make_branch` return new
/// handles over the same driver and leave the receiver as it was.
pub struct Collection<D> {
    driver: Arc<D>,
    name: String,
    language: String,
    base_language: String,
    branch: String,
    // set on read-only handles from `at_commit`
    pinned: Option<CommitId>,
}

impl<D> Clone for Collection<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            name: self.name.clone(),
            language: self.language.clone(),
            base_language: self.base_language.clone(),
            branch: self.branch.clone(),
            pinned: self.pinned,
        }
    }
}

impl<D: CollectionDriver> Collection<D> {
    pub fn new(
        driver: Arc<D>,
        name: impl Into<String>,
        language: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        let language = language.into();
        Self {
            driver,
            name: name.into(),
            base_language: language.clone(),
            language,
            branch: branch.into(),
            pinned: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// language this collection was created with
    pub fn base_language(&self) -> &str {
        &self.base_language
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The commit a read-only handle is pinned to.
    pub fn pinned(&self) -> Option<CommitId> {
        self.pinned
    }

    fn scope(&self) -> CollectionScope {
        CollectionScope {
            name: self.name.clone(),
            language: self.language.clone(),
            branch: self.branch.clone(),
        }
    }

    /// translate a driver miss into the caller-facing error
    fn not_found(&self, uuid: Uuid, error: DocumentError) -> DocumentError {
        if error.is_record_not_found() {
            DocumentError::DocumentNotFound {
                collection: self.name.clone(),
                uuid,
                language: self.language.clone(),
            }
        } else {
            error
        }
    }

    fn writable(&self) -> DocumentResult<()> {
        match self.pinned {
            Some(commit) => Err(DocumentError::ReadOnly {
                collection: self.name.clone(),
                commit,
            }),
            None => Ok(()),
        }
    }

    pub fn initialize_schema(&self) -> DocumentResult<()> {
        self.driver.initialize_schema(&self.scope())
    }

    /// A fresh draft: new uuid, empty title, no parent.
    pub fn create_document(&self) -> DraftRevision {
        DraftRevision::new(DocumentData::new(self.language.clone()))
    }

    pub fn create_commit(&self, message: impl Into<String>, author: impl Into<String>) -> Commit {
        Commit::new().with_message(message).with_author(author)
    }

    /// Draft derived from `parent`, or from the current default if `None`.
    ///
    /// When the document has no revision in this language yet, the base
    /// language's default seeds the draft instead. That draft starts a new
    /// history: it takes this collection's language and has no parent.
    pub fn new_revision(&self, uuid: Uuid, parent: Option<&RevisionId>) -> DocumentResult<DraftRevision> {
        let scope = self.scope();
        let source = match parent {
            Some(revision) => self.driver.load_revision_data(&scope, uuid, revision),
            None => self.driver.load_default_revision_data(&scope, uuid, true),
        };

        match source {
            Ok(revision) => Ok(revision.derive()),
            Err(e) if e.is_record_not_found() && parent.is_none() && self.language != self.base_language => {
                let base = CollectionScope {
                    language: self.base_language.clone(),
                    ..scope
                };
                let fallback = self
                    .driver
                    .load_default_revision_data(&base, uuid, true)
                    .map_err(|e| self.not_found(uuid, e))?;

                let mut data = fallback.derive().into_data();
                data.language = self.language.clone();
                data.parent = None;
                Ok(DraftRevision::new(data))
            }
            Err(e) => Err(self.not_found(uuid, e)),
        }
    }

    /// The default revision, hidden if archived unless `include_archived`.
    pub fn load(&self, uuid: Uuid, include_archived: bool) -> DocumentResult<Revision> {
        self.driver
            .load_default_revision_data(&self.scope(), uuid, include_archived)
            .map_err(|e| self.not_found(uuid, e))
    }

    pub fn load_revision(&self, uuid: Uuid, revision: &RevisionId) -> DocumentResult<Revision> {
        self.driver
            .load_revision_data(&self.scope(), uuid, revision)
            .map_err(|e| self.not_found(uuid, e))
    }

    /// The most recent write, default or not.
    pub fn load_latest_revision(&self, uuid: Uuid) -> DocumentResult<Revision> {
        self.driver
            .load_latest_revision_data(&self.scope(), uuid)
            .map_err(|e| self.not_found(uuid, e))
    }

    /// Found revisions in input order. Missing uuids are left out.
    pub fn load_multiple(&self, uuids: &[Uuid], include_archived: bool) -> DocumentResult<RevisionSet> {
        let revisions = self
            .driver
            .load_multiple_default_revision_data(&self.scope(), uuids, include_archived)?;
        Ok(revisions.into_iter().collect())
    }

    /// Save one revision as its own commit.
    pub fn save(&self, revision: DraftRevision, set_default: bool) -> DocumentResult<RevisionId> {
        let mut ids = self.save_commit(&Commit::new().with_revision(revision), set_default)?;
        ids.pop().ok_or(DocumentError::EmptyCommit)
    }

    /// Save every staged revision as one atomic unit.
    pub fn save_commit(&self, commit: &Commit, set_default: bool) -> DocumentResult<Vec<RevisionId>> {
        self.writable()?;
        if commit.is_empty() {
            return Err(DocumentError::EmptyCommit);
        }
        self.driver.persist(&self.scope(), commit, set_default)
    }

    pub fn set_default_revision(&self, uuid: Uuid, language: &str, revision: &RevisionId) -> DocumentResult<()> {
        self.writable()?;
        self.driver
            .set_default_revision(&self.scope(), uuid, language, revision)
            .map_err(|e| self.not_found(uuid, e))
    }

    /// Hide `revision` from default loads.
    ///
    /// The memory driver flags the row; the git driver deletes the path at
    /// the tip. Either way `load(uuid, true)` still finds it.
    pub fn archive(&self, revision: &Revision) -> DocumentResult<()> {
        self.writable()?;
        self.driver
            .set_archived(&self.scope(), revision)
            .map_err(|e| self.not_found(revision.uuid(), e))
    }

    /// Same collection and branch, different language.
    pub fn for_language(&self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self.clone()
        }
    }

    /// Fork this collection's branch and return a handle bound to the fork.
    ///
    /// On a pinned handle the fork starts at the pinned commit and is
    /// writable.
    pub fn make_branch(&self, name: &str) -> DocumentResult<Self> {
        self.driver.make_branch(&self.scope(), name)?;
        Ok(Self {
            branch: name.to_string(),
            pinned: None,
            ..self.clone()
        })
    }
}

impl Collection<GitDriver> {
    /// Read-only handle over this collection as of `commitish`.
    ///
    /// The commit-ish is resolved once, so a branch name pins its current
    /// tip. Saves, archives and default changes through the handle fail
    /// with `ReadOnly`.
    pub fn at_commit(&self, commitish: &str) -> DocumentResult<Self> {
        let commit = self.driver.repository().get_commit_for_branch(commitish)?;
        Ok(Self {
            branch: commit.to_string(),
            pinned: Some(commit),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::git::GitDriver;
    use crate::collection::memory::MemoryDriver;
    use crate::config::StoreConfig;
    use crate::document::TextField;
    use crate::storage::{Repository, StorageError};
    use tempfile::TempDir;

    fn memory() -> Collection<MemoryDriver> {
        let collection = Collection::new(Arc::new(MemoryDriver::new()), "coll", "en", "main");
        collection.initialize_schema().unwrap();
        collection
    }

    fn git() -> (TempDir, Collection<GitDriver>) {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(StoreConfig::new(dir.path().join("store"))).unwrap();
        let collection = Collection::new(Arc::new(GitDriver::new(repository)), "coll", "en", "main");
        collection.initialize_schema().unwrap();
        (dir, collection)
    }

    fn save_new<D: CollectionDriver>(collection: &Collection<D>, title: &str) -> (Uuid, RevisionId) {
        let mut doc = collection.create_document();
        doc.set_title(title);
        let uuid = doc.uuid();
        let id = collection.save(doc, true).unwrap();
        (uuid, id)
    }

    // ==================== shared behavior ====================

    fn check_create_and_load<D: CollectionDriver>(collection: &Collection<D>) {
        let doc = collection.create_document();
        assert_eq!(doc.language(), "en");
        assert_eq!(doc.title(), "");
        assert!(doc.parent().is_none());

        let uuid = doc.uuid();
        let id = collection.save(doc, true).unwrap();

        let loaded = collection.load(uuid, false).unwrap();
        assert_eq!(loaded.uuid(), uuid);
        assert_eq!(loaded.language(), "en");
        assert_eq!(loaded.id(), &id);
    }

    fn check_new_revision_becomes_default<D: CollectionDriver>(collection: &Collection<D>) {
        let (uuid, first) = save_new(collection, "A");

        let mut next = collection.new_revision(uuid, None).unwrap();
        assert_eq!(next.parent(), Some(&first));
        next.set_title("B");
        let second = collection.save(next, true).unwrap();

        assert_eq!(collection.load(uuid, false).unwrap().id(), &second);
        assert_eq!(collection.load_latest_revision(uuid).unwrap().id(), &second);
        assert_eq!(collection.load(uuid, false).unwrap().title(), "B");
    }

    fn check_archive<D: CollectionDriver>(collection: &Collection<D>) {
        let (uuid, _) = save_new(collection, "archived");
        let (other, _) = save_new(collection, "kept");

        let revision = collection.load(uuid, false).unwrap();
        collection.archive(&revision).unwrap();

        let hidden = collection.load(uuid, false);
        assert!(matches!(
            hidden,
            Err(DocumentError::DocumentNotFound { uuid: missing, ref collection, ref language })
                if missing == uuid && collection == "coll" && language == "en"
        ));
        assert_eq!(collection.load(uuid, true).unwrap(), revision);
        assert_eq!(collection.load_latest_revision(uuid).unwrap(), revision);
        assert_eq!(collection.load(other, false).unwrap().title(), "kept");
    }

    fn check_load_multiple_archived<D: CollectionDriver>(collection: &Collection<D>) {
        let (x, _) = save_new(collection, "x");
        let (y, _) = save_new(collection, "y");
        collection.archive(&collection.load(x, false).unwrap()).unwrap();

        let visible = collection.load_multiple(&[x, y], false).unwrap();
        assert_eq!(visible.uuids(), vec![y]);

        let all = collection.load_multiple(&[x, y], true).unwrap();
        assert_eq!(all.uuids(), vec![x, y]);
        assert_eq!(all.get(x).unwrap().title(), "x");
    }

    fn check_non_default_save<D: CollectionDriver>(collection: &Collection<D>) {
        let (uuid, first) = save_new(collection, "A");

        let mut next = collection.new_revision(uuid, None).unwrap();
        next.set_title("draft");
        let second = collection.save(next, false).unwrap();

        assert_eq!(collection.load(uuid, false).unwrap().id(), &first);
        assert_eq!(collection.load(uuid, false).unwrap().title(), "A");
        assert_eq!(collection.load_latest_revision(uuid).unwrap().id(), &second);
        assert_eq!(collection.load_revision(uuid, &second).unwrap().title(), "draft");
        assert_eq!(collection.load_revision(uuid, &first).unwrap().title(), "A");

        // a default save supersedes the pending one
        let mut last = collection.new_revision(uuid, Some(&second)).unwrap();
        last.set_title("published");
        let third = collection.save(last, true).unwrap();
        assert_eq!(collection.load(uuid, false).unwrap().id(), &third);
        assert_eq!(collection.load_latest_revision(uuid).unwrap().id(), &third);

        // never made default: only visible as latest
        let mut hidden = collection.create_document();
        hidden.set_title("unpublished");
        let hidden_uuid = hidden.uuid();
        collection.save(hidden, false).unwrap();
        assert!(collection.load(hidden_uuid, true).unwrap_err().is_not_found());
        assert_eq!(collection.load_latest_revision(hidden_uuid).unwrap().title(), "unpublished");
    }

    fn check_collections_are_isolated<D: CollectionDriver>(collection: &Collection<D>) {
        let other = Collection::new(Arc::clone(&collection.driver), "other", "en", collection.branch());
        other.initialize_schema().unwrap();
        let (uuid, _) = save_new(collection, "mine");

        assert!(matches!(
            other.load(uuid, false),
            Err(DocumentError::DocumentNotFound { collection: ref name, .. }) if name == "other"
        ));
        assert!(other.load_latest_revision(uuid).unwrap_err().is_not_found());
        assert!(other.load_multiple(&[uuid], true).unwrap().is_empty());

        let revision = collection.load(uuid, false).unwrap();
        assert!(other.archive(&revision).unwrap_err().is_not_found());
        assert_eq!(collection.load(uuid, false).unwrap(), revision);

        // same uuid, independent histories
        let mut twin = collection.new_revision(uuid, None).unwrap();
        twin.set_title("theirs");
        other.save(twin, true).unwrap();
        assert_eq!(other.load(uuid, false).unwrap().title(), "theirs");
        assert_eq!(collection.load(uuid, false).unwrap().title(), "mine");
    }

    fn check_load_multiple<D: CollectionDriver>(collection: &Collection<D>) {
        let (x, _) = save_new(collection, "x");
        let (y, _) = save_new(collection, "y");
        let z = Uuid::new_v4();

        let set = collection.load_multiple(&[y, z, x], false).unwrap();
        assert_eq!(set.uuids(), vec![y, x]);
        assert_eq!(set.get(x).unwrap().title(), "x");
        assert!(!set.contains(z));
    }

    fn check_branching_lineage<D: CollectionDriver>(collection: &Collection<D>) {
        let (uuid, doc1) = save_new(collection, "A");

        let mut doc2 = collection.new_revision(uuid, Some(&doc1)).unwrap();
        let title = format!("{}B", doc2.title());
        doc2.set_title(title);
        collection.save(doc2, true).unwrap();

        let mut doc3 = collection.new_revision(uuid, Some(&doc1)).unwrap();
        let title = format!("{}C", doc3.title());
        doc3.set_title(title);
        assert_eq!(doc3.parent(), Some(&doc1));
        collection.save(doc3, true).unwrap();

        assert_eq!(collection.load_latest_revision(uuid).unwrap().title(), "AC");
    }

    fn check_empty_commit<D: CollectionDriver>(collection: &Collection<D>) {
        let result = collection.save_commit(&Commit::new(), true);
        assert!(matches!(result, Err(DocumentError::EmptyCommit)));
    }

    fn check_save_commit<D: CollectionDriver>(collection: &Collection<D>) {
        let mut a = collection.create_document();
        a.set_title("a").set_items("body", &[TextField::new("alpha")]);
        let b = collection.create_document();
        let (ua, ub) = (a.uuid(), b.uuid());

        let commit = collection
            .create_commit("two at once", "Editor <ed>")
            .with_revision(a)
            .with_revision(b);
        let ids = collection.save_commit(&commit, true).unwrap();

        assert_eq!(ids.len(), 2);
        let loaded = collection.load(ua, false).unwrap();
        assert_eq!(loaded.items::<TextField>("body").unwrap(), vec![TextField::new("alpha")]);
        assert!(collection.load(ub, false).is_ok());
    }

    fn check_missing_document<D: CollectionDriver>(collection: &Collection<D>) {
        let uuid = Uuid::new_v4();
        assert!(collection.load(uuid, false).unwrap_err().is_not_found());
        assert!(collection.load_latest_revision(uuid).unwrap_err().is_not_found());
        assert!(collection.new_revision(uuid, None).unwrap_err().is_not_found());
        assert!(collection
            .load_revision(uuid, &RevisionId::new("0000"))
            .unwrap_err()
            .is_not_found());
    }

    fn check_language_variants<D: CollectionDriver>(collection: &Collection<D>) {
        let (uuid, english) = save_new(collection, "Hello");
        let german = collection.for_language("de");
        assert_eq!(collection.language(), "en");
        assert_eq!(german.base_language(), "en");

        assert!(german.load(uuid, false).unwrap_err().is_not_found());

        // no german revision yet: seeded from english, own history
        let mut draft = german.new_revision(uuid, None).unwrap();
        assert_eq!(draft.language(), "de");
        assert_eq!(draft.title(), "Hello");
        assert!(draft.parent().is_none());
        draft.set_title("Hallo");
        german.save(draft, true).unwrap();

        assert_eq!(german.load(uuid, false).unwrap().title(), "Hallo");
        assert_eq!(collection.load(uuid, false).unwrap().title(), "Hello");
        assert_eq!(collection.load(uuid, false).unwrap().id(), &english);
    }

    fn check_make_branch<D: CollectionDriver>(collection: &Collection<D>) {
        let (shared, _) = save_new(collection, "shared");
        let feature = collection.make_branch("feature").unwrap();
        assert_eq!(feature.branch(), "feature");
        assert_eq!(collection.branch(), "main");

        let (on_feature, _) = save_new(&feature, "feature only");
        let (on_main, _) = save_new(collection, "main only");

        assert!(feature.load(shared, false).is_ok());
        assert!(collection.load(on_feature, false).unwrap_err().is_not_found());
        assert!(feature.load(on_main, false).unwrap_err().is_not_found());

        assert!(matches!(
            collection.make_branch("feature"),
            Err(DocumentError::Storage(StorageError::BranchCreation { .. }))
        ));
    }

    macro_rules! driver_tests {
        ($($name:ident => $check:ident),* $(,)?) => {
            mod memory_driver {
                use super::*;
                $(#[test] fn $name() { $check(&memory()); })*
            }

            mod git_driver {
                use super::*;
                $(#[test] fn $name() { let (_dir, collection) = git(); $check(&collection); })*
            }
        };
    }

    driver_tests! {
        create_and_load => check_create_and_load,
        new_revision_becomes_default => check_new_revision_becomes_default,
        archive_hides_document => check_archive,
        load_multiple_with_archived => check_load_multiple_archived,
        non_default_save_keeps_default => check_non_default_save,
        collections_are_isolated => check_collections_are_isolated,
        load_multiple_keeps_order => check_load_multiple,
        lineage_follows_explicit_parent => check_branching_lineage,
        empty_commit_rejected => check_empty_commit,
        save_commit_is_atomic => check_save_commit,
        missing_document => check_missing_document,
        language_variants_are_independent => check_language_variants,
        make_branch_isolates => check_make_branch,
    }

    // ==================== realization-specific ====================

    #[test]
    fn test_memory_set_default_to_pending() {
        let collection = memory();
        let (uuid, _) = save_new(&collection, "A");

        let mut next = collection.new_revision(uuid, None).unwrap();
        next.set_title("draft");
        let second = collection.save(next, false).unwrap();

        collection.set_default_revision(uuid, "en", &second).unwrap();
        assert_eq!(collection.load(uuid, false).unwrap().title(), "draft");
    }

    #[test]
    fn test_memory_set_default_unknown_revision() {
        let collection = memory();
        let (uuid, _) = save_new(&collection, "A");
        let result = collection.set_default_revision(uuid, "en", &RevisionId::new("missing"));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_git_set_default_revision_unsupported() {
        let (_dir, collection) = git();
        let (uuid, first) = save_new(&collection, "A");
        assert!(matches!(
            collection.set_default_revision(uuid, "en", &first),
            Err(DocumentError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_git_at_commit_is_read_only_snapshot() {
        let (_dir, collection) = git();
        let (uuid, first) = save_new(&collection, "A");
        let mut next = collection.new_revision(uuid, None).unwrap();
        next.set_title("B");
        collection.save(next, true).unwrap();
        let (later, _) = save_new(&collection, "later");

        let pinned = collection.at_commit(first.as_str()).unwrap();
        assert_eq!(pinned.pinned().map(RevisionId::from), Some(first.clone()));
        assert_eq!(pinned.load(uuid, false).unwrap().title(), "A");
        assert_eq!(pinned.load(uuid, false).unwrap().id(), &first);
        assert!(pinned.load(later, false).unwrap_err().is_not_found());

        assert!(matches!(
            pinned.save(pinned.create_document(), true),
            Err(DocumentError::ReadOnly { .. })
        ));
        let current = collection.load(uuid, false).unwrap();
        assert!(matches!(pinned.archive(&current), Err(DocumentError::ReadOnly { .. })));

        let fork = pinned.make_branch("from-first").unwrap();
        assert!(fork.pinned().is_none());
        assert_eq!(fork.load(uuid, false).unwrap().title(), "A");
        save_new(&fork, "on fork");
        assert_eq!(collection.load(uuid, false).unwrap().title(), "B");
    }

    #[test]
    fn test_git_at_commit_unknown() {
        let (_dir, collection) = git();
        assert!(matches!(
            collection.at_commit("no-such-commit"),
            Err(DocumentError::Storage(StorageError::RefNotFound(_)))
        ));
    }

    #[test]
    fn test_git_revive_archived_document() {
        let (_dir, collection) = git();
        let (uuid, first) = save_new(&collection, "A");
        collection.archive(&collection.load(uuid, false).unwrap()).unwrap();

        let revived = collection.new_revision(uuid, None).unwrap();
        assert_eq!(revived.parent(), Some(&first));
        collection.save(revived, true).unwrap();

        assert_eq!(collection.load(uuid, false).unwrap().title(), "A");
    }

    #[test]
    fn test_git_commit_author_and_message() {
        let (_dir, collection) = git();
        let commit = collection
            .create_commit("Publish", "Editor <ed@example.com>")
            .with_revision(collection.create_document());
        let ids = collection.save_commit(&commit, true).unwrap();

        let info = collection
            .driver()
            .repository()
            .commit_info(ids[0].as_str())
            .unwrap();
        assert_eq!(info.committer, "Editor <ed@example.com>");
        assert_eq!(info.message.trim_end(), "Publish");
    }

    #[test]
    fn test_git_invalid_author_rejected() {
        let (_dir, collection) = git();
        let commit = collection
            .create_commit("Publish", "no brackets")
            .with_revision(collection.create_document());
        assert!(matches!(
            collection.save_commit(&commit, true),
            Err(DocumentError::Storage(StorageError::InvalidCommitter(_)))
        ));
    }
}
