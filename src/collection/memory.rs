//! In-memory realization with explicit revision flags.
//!
//! Every revision is a row carrying `latest`, `default` and `archived`.
//! Per (uuid, language) exactly one row is `latest` and at most one is
//! `default`; `archived` never touches either flag.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::collection::commit::Commit;
use crate::collection::driver::{CollectionDriver, CollectionScope};
use crate::document::{DocumentData, DocumentError, DocumentResult, DocumentView, Revision, RevisionId};
use crate::storage::{BranchName, StorageError};

#[derive(Debug, Clone)]
struct RevisionRow {
    id: RevisionId,
    data: DocumentData,
    latest: bool,
    default: bool,
    archived: bool,
}

impl RevisionRow {
    fn is_variant(&self, uuid: Uuid, language: &str) -> bool {
        self.data.uuid == uuid && self.data.language == language
    }

    fn to_revision(&self) -> Revision {
        Revision::new(self.id.clone(), self.data.clone())
    }
}

/// A tiny table: insert, filtered update, filtered find.
#[derive(Debug, Clone, Default)]
struct MemoryTable {
    rows: Vec<RevisionRow>,
}

impl MemoryTable {
    fn insert(&mut self, row: RevisionRow) {
        self.rows.push(row);
    }

    fn find<'a>(&'a self, filter: impl Fn(&RevisionRow) -> bool + 'a) -> impl Iterator<Item = &'a RevisionRow> + 'a {
        self.rows.iter().filter(move |row| filter(row))
    }

    /// apply `change` to every matching row, returning how many matched
    fn update(&mut self, filter: impl Fn(&RevisionRow) -> bool, mut change: impl FnMut(&mut RevisionRow)) -> usize {
        let mut matched = 0;
        for row in self.rows.iter_mut().filter(|row| filter(row)) {
            change(row);
            matched += 1;
        }
        matched
    }
}

type BranchTables = HashMap<String, MemoryTable>;

/// Flag-based driver keeping every table in process memory.
///
/// Tables are keyed by collection name, then branch. A write holds the
/// write lock for the whole commit, which is its transaction unit.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    tables: RwLock<HashMap<String, BranchTables>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, scope: &CollectionScope, f: impl FnOnce(&MemoryTable) -> Option<T>) -> Option<T> {
        let tables = self.tables.read();
        tables
            .get(&scope.name)
            .and_then(|branches| branches.get(&scope.branch))
            .and_then(f)
    }

    fn missing(uuid: Uuid, language: &str, selector: impl Into<String>) -> DocumentError {
        DocumentError::RecordNotFound {
            uuid,
            language: language.to_string(),
            selector: selector.into(),
        }
    }
}

impl CollectionDriver for MemoryDriver {
    fn realization(&self) -> &'static str {
        "memory"
    }

    fn initialize_schema(&self, scope: &CollectionScope) -> DocumentResult<()> {
        let mut tables = self.tables.write();
        tables
            .entry(scope.name.clone())
            .or_default()
            .entry(scope.branch.clone())
            .or_default();
        Ok(())
    }

    fn load_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        include_archived: bool,
    ) -> DocumentResult<Revision> {
        self.read(scope, |table| {
            table
                .find(|row| {
                    row.is_variant(uuid, &scope.language) && row.default && (include_archived || !row.archived)
                })
                .next()
                .map(RevisionRow::to_revision)
        })
        .ok_or_else(|| Self::missing(uuid, &scope.language, "default"))
    }

    fn load_latest_revision_data(&self, scope: &CollectionScope, uuid: Uuid) -> DocumentResult<Revision> {
        self.read(scope, |table| {
            table
                .find(|row| row.is_variant(uuid, &scope.language) && row.latest)
                .next()
                .map(RevisionRow::to_revision)
        })
        .ok_or_else(|| Self::missing(uuid, &scope.language, "latest"))
    }

    fn load_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        revision: &RevisionId,
    ) -> DocumentResult<Revision> {
        self.read(scope, |table| {
            table
                .find(|row| row.data.uuid == uuid && &row.id == revision)
                .next()
                .map(RevisionRow::to_revision)
        })
        .ok_or_else(|| Self::missing(uuid, &scope.language, format!("revision {}", revision)))
    }

    fn load_multiple_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuids: &[Uuid],
        include_archived: bool,
    ) -> DocumentResult<Vec<Revision>> {
        let mut found = Vec::with_capacity(uuids.len());
        for &uuid in uuids {
            match self.load_default_revision_data(scope, uuid, include_archived) {
                Ok(revision) => found.push(revision),
                Err(e) if e.is_record_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    fn set_default_revision(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        language: &str,
        revision: &RevisionId,
    ) -> DocumentResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&scope.name)
            .and_then(|branches| branches.get_mut(&scope.branch))
            .ok_or_else(|| Self::missing(uuid, language, format!("revision {}", revision)))?;

        if table.find(|row| row.is_variant(uuid, language) && &row.id == revision).next().is_none() {
            return Err(Self::missing(uuid, language, format!("revision {}", revision)));
        }

        table.update(
            |row| row.is_variant(uuid, language),
            |row| row.default = &row.id == revision,
        );
        Ok(())
    }

    fn persist(
        &self,
        scope: &CollectionScope,
        commit: &Commit,
        set_default: bool,
    ) -> DocumentResult<Vec<RevisionId>> {
        let mut tables = self.tables.write();
        let table = tables
            .entry(scope.name.clone())
            .or_default()
            .entry(scope.branch.clone())
            .or_default();

        let mut ids = Vec::with_capacity(commit.count());
        for draft in commit {
            let id = RevisionId::generate();
            let (uuid, language) = (draft.uuid(), draft.language().to_string());

            table.insert(RevisionRow {
                id: id.clone(),
                data: draft.clone().into_data(),
                latest: true,
                default: set_default,
                archived: false,
            });

            let is_older = |row: &RevisionRow| row.is_variant(uuid, &language) && row.id != id;
            table.update(is_older, |row| row.latest = false);
            if set_default {
                table.update(is_older, |row| row.default = false);
            }

            ids.push(id);
        }

        debug!(
            collection = %scope.name,
            branch = %scope.branch,
            revisions = ids.len(),
            set_default,
            author = commit.author(),
            "persisted revisions"
        );
        Ok(ids)
    }

    fn set_archived(&self, scope: &CollectionScope, revision: &Revision) -> DocumentResult<()> {
        let mut tables = self.tables.write();
        let matched = tables
            .get_mut(&scope.name)
            .and_then(|branches| branches.get_mut(&scope.branch))
            .map(|table| table.update(|row| &row.id == revision.id(), |row| row.archived = true))
            .unwrap_or(0);

        if matched == 0 {
            return Err(Self::missing(
                revision.uuid(),
                revision.language(),
                format!("revision {}", revision.id()),
            ));
        }
        Ok(())
    }

    fn make_branch(&self, scope: &CollectionScope, name: &str) -> DocumentResult<()> {
        let branch = BranchName::new(name).map_err(StorageError::from)?;

        let mut tables = self.tables.write();
        let branches = tables.entry(scope.name.clone()).or_default();
        if branches.contains_key(branch.as_str()) {
            return Err(StorageError::BranchCreation {
                name: name.to_string(),
                reason: "branch already exists".to_string(),
            }
            .into());
        }

        let snapshot = branches.get(&scope.branch).cloned().unwrap_or_default();
        branches.insert(branch.as_str().to_string(), snapshot);
        debug!(collection = %scope.name, from = %scope.branch, branch = %branch, "copied table for branch");
        Ok(())
    }
}
