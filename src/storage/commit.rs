//!  Commit inspection and path history.
//!
//!  Every branch is a single-parent chain, so history is a first-parent
//!  walk. A commit "touches" a path when the blob id there differs from its
//!  parent's, which includes the path appearing or disappearing.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use git2::{ErrorCode, Oid, Repository as GitRepo};

use crate::storage::error::StorageResult;
use crate::storage::repository::Repository;
use crate::storage::types::CommitId;

/// information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub parent: Option<CommitId>,
    pub message: String,
    pub committer: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// create CommitInfo from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let committer = commit.committer();
        let time = commit.time();
        let timestamp = Utc
            .timestamp_opt(time.seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);

        Self {
            id: CommitId::new(commit.id()),
            parent: commit.parent_ids().next().map(CommitId::new),
            message: commit.message().unwrap_or("").to_string(),
            committer: format!(
                "{} <{}>",
                committer.name().unwrap_or(""),
                committer.email().unwrap_or("")
            ),
            timestamp,
        }
    }

    /// check if this is the root commit of the log
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// blob id stored at `path` in `commit`, if any
pub(crate) fn entry_at(commit: &git2::Commit<'_>, path: &str) -> StorageResult<Option<Oid>> {
    let tree = commit.tree()?;
    match tree.get_path(Path::new(path)) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// whether `commit` changed `path` relative to its first parent
fn touches(repo: &GitRepo, oid: Oid, path: &str) -> StorageResult<(bool, Option<Oid>)> {
    let commit = repo.find_commit(oid)?;
    let here = entry_at(&commit, path)?;
    let parent = commit.parent_ids().next();
    let before = match parent {
        Some(parent) => entry_at(&repo.find_commit(parent)?, path)?,
        None => None,
    };
    Ok((here != before, parent))
}

/// Lazy, newest-first walk over the commits that modified one path.
///
/// Each step takes the repository handle only for as long as it needs to
/// look at one commit, so a long walk never holds up other readers.
pub struct History {
    repository: Repository,
    path: String,
    next: Option<Oid>,
}

impl History {
    pub(crate) fn new(repository: Repository, path: impl Into<String>, start: CommitId) -> Self {
        Self {
            repository,
            path: path.into(),
            next: Some(start.raw()),
        }
    }
}

impl Iterator for History {
    type Item = StorageResult<CommitId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let oid = self.next.take()?;
            let path = &self.path;
            match self.repository.with_repo(|repo| touches(repo, oid, path)) {
                Ok((touched, parent)) => {
                    self.next = parent;
                    if touched {
                        return Some(Ok(CommitId::new(oid)));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
