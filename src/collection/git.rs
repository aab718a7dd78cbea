//! Content-store realization on top of the storage engine.
//!
//! Each collection owns the directory `{collection}/` on its branch. The
//! default revision of (uuid, language) is the payload at
//! `{collection}/{language}/{uuid}`. A revision saved without becoming the
//! default waits next to it at `{uuid}.latest` until the next default save
//! clears it. A revision's id is the newest commit at or before the read
//! point that touched its path. Archiving deletes the default path at the
//! tip; the content stays reachable in history.
//!
//! Finding that commit walks first-parent history back from the read point,
//! so a load costs time proportional to the number of commits since the
//! document last changed. `load_multiple` pays that walk once per document
//! it returns.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::collection::commit::Commit;
use crate::collection::driver::{CollectionDriver, CollectionScope};
use crate::document::{
    deserialize_document, serialize_document, DocumentError, DocumentResult, DocumentView, Revision,
    RevisionId,
};
use crate::storage::{CommitId, Repository, StorageError, Writes};

const REALIZATION: &str = "git";
const PENDING_SUFFIX: &str = ".latest";

/// Driver storing one JSON payload per document variant.
#[derive(Clone)]
pub struct GitDriver {
    repository: Repository,
}

impl GitDriver {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// where the default revision of a document variant lives in the tree
    pub fn document_path(collection: &str, language: &str, uuid: Uuid) -> String {
        format!("{}/{}/{}", collection, language, uuid)
    }

    /// where a revision saved without `set_default` waits
    pub fn pending_path(collection: &str, language: &str, uuid: Uuid) -> String {
        format!("{}{}", Self::document_path(collection, language, uuid), PENDING_SUFFIX)
    }

    fn missing(uuid: Uuid, language: &str, selector: impl Into<String>) -> DocumentError {
        DocumentError::RecordNotFound {
            uuid,
            language: language.to_string(),
            selector: selector.into(),
        }
    }

    /// the revision at `path` as of `point`
    fn revision_at(&self, path: &str, point: CommitId, payload: Vec<u8>) -> DocumentResult<Revision> {
        let introduced = self
            .repository
            .history(path, &point.to_string())?
            .next()
            .transpose()?
            .unwrap_or(point);

        let data = deserialize_document(&payload)?;
        Ok(Revision::new(RevisionId::from(introduced), data))
    }

    fn load_path(&self, path: &str, point: CommitId) -> DocumentResult<Option<Revision>> {
        match self.repository.load(path, &point.to_string()) {
            Ok(payload) => self.revision_at(path, point, payload).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// last default revision before the path was deleted from the branch
    fn load_archived(&self, scope: &CollectionScope, uuid: Uuid) -> DocumentResult<Revision> {
        let path = Self::document_path(&scope.name, &scope.language, uuid);
        let deleted = self
            .repository
            .history(&path, &scope.branch)?
            .next()
            .transpose()?
            .ok_or_else(|| Self::missing(uuid, &scope.language, "archived"))?;

        let before = self
            .repository
            .commit_info(&deleted.to_string())?
            .parent
            .ok_or_else(|| Self::missing(uuid, &scope.language, "archived"))?;

        self.load_path(&path, before)?
            .ok_or_else(|| Self::missing(uuid, &scope.language, "archived"))
    }

    fn tip(&self, scope: &CollectionScope) -> DocumentResult<CommitId> {
        Ok(self.repository.get_commit_for_branch(&scope.branch)?)
    }

    fn unsupported(operation: &'static str) -> DocumentError {
        DocumentError::Unsupported {
            operation,
            realization: REALIZATION,
        }
    }
}

impl CollectionDriver for GitDriver {
    fn realization(&self) -> &'static str {
        REALIZATION
    }

    /// Nothing to create: the tree is schemaless. Fails if the branch
    /// doesn't resolve.
    fn initialize_schema(&self, scope: &CollectionScope) -> DocumentResult<()> {
        self.tip(scope).map(|_| ())
    }

    fn load_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        include_archived: bool,
    ) -> DocumentResult<Revision> {
        let tip = self.tip(scope)?;
        let path = Self::document_path(&scope.name, &scope.language, uuid);
        match self.load_path(&path, tip)? {
            Some(revision) => Ok(revision),
            None if include_archived => self.load_archived(scope, uuid),
            None => Err(Self::missing(uuid, &scope.language, "default")),
        }
    }

    /// The pending revision if there is one, else the default, archived or not.
    fn load_latest_revision_data(&self, scope: &CollectionScope, uuid: Uuid) -> DocumentResult<Revision> {
        let tip = self.tip(scope)?;
        let pending = Self::pending_path(&scope.name, &scope.language, uuid);
        if let Some(revision) = self.load_path(&pending, tip)? {
            return Ok(revision);
        }

        let path = Self::document_path(&scope.name, &scope.language, uuid);
        match self.load_path(&path, tip)? {
            Some(revision) => Ok(revision),
            None => self.load_archived(scope, uuid),
        }
    }

    fn load_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        revision: &RevisionId,
    ) -> DocumentResult<Revision> {
        let selector = format!("revision {}", revision);
        let point = match self.repository.get_commit_for_branch(revision.as_str()) {
            Ok(point) => point,
            Err(StorageError::RefNotFound(_)) => return Err(Self::missing(uuid, &scope.language, selector)),
            Err(e) => return Err(e.into()),
        };

        let pending = self.load_path(&Self::pending_path(&scope.name, &scope.language, uuid), point)?;
        let default = self.load_path(&Self::document_path(&scope.name, &scope.language, uuid), point)?;

        // prefer whichever path this very commit wrote
        let wanted = RevisionId::from(point);
        match (pending, default) {
            (Some(pending), _) if pending.id() == &wanted => Ok(pending),
            (_, Some(default)) => Ok(default),
            (Some(pending), None) => Ok(pending),
            (None, None) => Err(Self::missing(uuid, &scope.language, selector)),
        }
    }

    fn load_multiple_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuids: &[Uuid],
        include_archived: bool,
    ) -> DocumentResult<Vec<Revision>> {
        let tip = self.tip(scope)?;
        let paths: Vec<String> = uuids
            .iter()
            .map(|&uuid| Self::document_path(&scope.name, &scope.language, uuid))
            .collect();

        let payloads: HashMap<String, Vec<u8>> =
            self.repository.load_multiple(paths.clone(), &tip.to_string()).collect();

        let mut found = Vec::with_capacity(uuids.len());
        for (&uuid, path) in uuids.iter().zip(&paths) {
            let loaded = match payloads.get(path) {
                Some(payload) => self.revision_at(path, tip, payload.clone()),
                None if include_archived => self.load_archived(scope, uuid),
                None => continue,
            };
            match loaded {
                Ok(revision) => found.push(revision),
                Err(e) if e.is_record_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// The default is whatever sits at the document path, so re-pointing it
    /// would mint a new commit and with it a new revision id.
    fn set_default_revision(
        &self,
        _scope: &CollectionScope,
        _uuid: Uuid,
        _language: &str,
        _revision: &RevisionId,
    ) -> DocumentResult<()> {
        Err(Self::unsupported("set_default_revision"))
    }

    fn persist(
        &self,
        scope: &CollectionScope,
        commit: &Commit,
        set_default: bool,
    ) -> DocumentResult<Vec<RevisionId>> {
        let mut writes = Writes::new();
        for draft in commit {
            let (language, uuid) = (draft.language(), draft.uuid());
            let payload = serialize_document(draft.data())?;
            let pending = Self::pending_path(&scope.name, language, uuid);

            if set_default {
                writes.insert(Self::document_path(&scope.name, language, uuid), Some(payload));
                writes.insert(pending, None);
            } else {
                writes.insert(pending, Some(payload));
            }
        }

        let id = self
            .repository
            .commit(&writes, commit.author(), commit.message(), &scope.branch, &scope.branch)?;

        debug!(
            collection = %scope.name,
            branch = %scope.branch,
            revisions = commit.count(),
            set_default,
            commit = %id.short(),
            "persisted revisions"
        );
        Ok(vec![RevisionId::from(id); commit.count()])
    }

    fn set_archived(&self, scope: &CollectionScope, revision: &Revision) -> DocumentResult<()> {
        let path = Self::document_path(&scope.name, revision.language(), revision.uuid());
        match self.repository.load(&path, &scope.branch) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(Self::missing(revision.uuid(), revision.language(), "current"))
            }
            Err(e) => return Err(e.into()),
        }

        self.repository.delete(&[path], &scope.branch)?;
        Ok(())
    }

    fn make_branch(&self, scope: &CollectionScope, name: &str) -> DocumentResult<()> {
        self.repository.create_branch(&scope.branch, name)?;
        Ok(())
    }
}
