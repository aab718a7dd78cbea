//! Branch-bound view of a repository.

use crate::storage::commit::History;
use crate::storage::error::StorageResult;
use crate::storage::repository::{LoadMultiple, Repository, Writes};
use crate::storage::types::{BranchName, CommitId};

/// A repository handle plus a branch name.
///
/// Every operation resolves the branch when it runs; the handle itself
/// never pins a commit.
#[derive(Clone)]
pub struct Branch {
    repository: Repository,
    name: BranchName,
}

impl Branch {
    pub(crate) fn new(repository: Repository, name: BranchName) -> Self {
        Self { repository, name }
    }

    pub fn name(&self) -> &BranchName {
        &self.name
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Current tip of this branch.
    pub fn tip(&self) -> StorageResult<CommitId> {
        self.repository.get_commit_for_branch(self.name.as_str())
    }

    /// Commit `writes` on top of this branch's tip.
    pub fn commit(&self, writes: &Writes, committer: &str, message: &str) -> StorageResult<CommitId> {
        let name = self.name.as_str();
        self.repository.commit(writes, committer, message, name, name)
    }

    pub fn load(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.repository.load(path, self.name.as_str())
    }

    pub fn load_multiple<I, S>(&self, paths: I) -> LoadMultiple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repository.load_multiple(paths, self.name.as_str())
    }

    pub fn history(&self, path: &str) -> StorageResult<History> {
        self.repository.history(path, self.name.as_str())
    }

    pub fn delete(&self, paths: &[String]) -> StorageResult<CommitId> {
        self.repository.delete(paths, self.name.as_str())
    }

    /// Create `name` at this branch's tip and return a handle to it.
    pub fn create_branch(&self, name: &str) -> StorageResult<Branch> {
        self.repository.create_branch(self.name.as_str(), name)?;
        self.repository.branch(name)
    }
}
