//!  Ref resolution and branch creation.
//!
//!  Branches are plain `refs/heads/*` pointers. They are created here and
//!  only ever advanced by the import session.

use git2::{ErrorCode, Repository};

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{BranchName, CommitId};

/// Manages Git references (branches).
pub struct RefManager;

impl RefManager {
    /// Resolve a branch name or any commit-ish to a concrete commit id.
    pub fn resolve(repo: &Repository, commitish: &str) -> StorageResult<CommitId> {
        let object = repo
            .revparse_single(commitish)
            .map_err(|_| StorageError::RefNotFound(commitish.to_string()))?;

        let commit = object
            .peel_to_commit()
            .map_err(|_| StorageError::RefNotFound(commitish.to_string()))?;

        Ok(CommitId::new(commit.id()))
    }

    /// Check if a branch exists.
    pub fn branch_exists(repo: &Repository, branch: &BranchName) -> bool {
        repo.find_reference(&branch.as_ref_path()).is_ok()
    }

    /// Create a new branch pointing to the given commit.
    ///
    /// Never moves an existing branch.
    pub fn create_branch(repo: &Repository, branch: &BranchName, target: CommitId) -> StorageResult<()> {
        let message = format!("branch: created from {}", target.short());
        repo.reference(&branch.as_ref_path(), target.raw(), false, &message)
            .map_err(|e| StorageError::BranchCreation {
                name: branch.to_string(),
                reason: if e.code() == ErrorCode::Exists {
                    "branch already exists".to_string()
                } else {
                    e.message().to_string()
                },
            })?;

        Ok(())
    }

    /// Point HEAD at a branch (so plain `git log` in the store shows it).
    pub fn set_head(repo: &Repository, branch: &BranchName) -> StorageResult<()> {
        repo.set_head(&branch.as_ref_path())?;
        Ok(())
    }
}
