//! Boundary between `Collection` and a storage realization.
//!
//! Drivers report misses as `DocumentError::RecordNotFound`; `Collection`
//! turns those into `DocumentNotFound` for the caller.

use uuid::Uuid;

use crate::collection::commit::Commit;
use crate::document::{DocumentResult, Revision, RevisionId};

/// Which collection, language and branch an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionScope {
    pub name: String,
    pub language: String,
    pub branch: String,
}

/// The surface every storage realization implements.
pub trait CollectionDriver: Send + Sync {
    /// short name used in `Unsupported` errors and logs
    fn realization(&self) -> &'static str;

    fn initialize_schema(&self, scope: &CollectionScope) -> DocumentResult<()>;

    fn load_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        include_archived: bool,
    ) -> DocumentResult<Revision>;

    fn load_latest_revision_data(&self, scope: &CollectionScope, uuid: Uuid) -> DocumentResult<Revision>;

    fn load_revision_data(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        revision: &RevisionId,
    ) -> DocumentResult<Revision>;

    /// Found revisions in `uuids` order; misses are skipped, never raised.
    fn load_multiple_default_revision_data(
        &self,
        scope: &CollectionScope,
        uuids: &[Uuid],
        include_archived: bool,
    ) -> DocumentResult<Vec<Revision>>;

    fn set_default_revision(
        &self,
        scope: &CollectionScope,
        uuid: Uuid,
        language: &str,
        revision: &RevisionId,
    ) -> DocumentResult<()>;

    /// Write every staged revision as one unit. Returns the ids assigned,
    /// in staging order.
    fn persist(
        &self,
        scope: &CollectionScope,
        commit: &Commit,
        set_default: bool,
    ) -> DocumentResult<Vec<RevisionId>>;

    fn set_archived(&self, scope: &CollectionScope, revision: &Revision) -> DocumentResult<()>;

    /// Fork `scope.branch` into `name`.
    fn make_branch(&self, scope: &CollectionScope, name: &str) -> DocumentResult<()>;
}
