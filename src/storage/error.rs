//! Storage layer error types
//!
//! All errors that can occur during storage operations are defined here
//! We use `thiserror` for ergonomic error definition and better error messages

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::InvalidNameError;

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// the backing repository could not be created or opened
    #[error("cannot initialize storage at {path}: {reason}")]
    StorageInit { path: PathBuf, reason: String },

    /// committer identity doesn't look like `Name <token>`
    #[error("invalid committer '{0}': expected a name followed by <token>")]
    InvalidCommitter(String),

    /// branch name rejected before it reached the backing engine
    #[error("invalid branch name: {0}")]
    InvalidBranchName(#[from] InvalidNameError),

    /// path can't be written through the import stream
    #[error("invalid record path: '{0}'")]
    InvalidPath(String),

    /// nothing stored at this path at this point in history
    #[error("no record at '{path}' for commit '{commit}'")]
    RecordNotFound { path: String, commit: String },

    /// a branch name or commit-ish could not be resolved
    #[error("cannot resolve ref: {0}")]
    RefNotFound(String),

    /// ref creation collided with an existing branch or was refused
    #[error("cannot create branch '{name}': {reason}")]
    BranchCreation { name: String, reason: String },

    /// the external process could not be started or talked to
    #[error("process '{command}' failed: {source}")]
    Process {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// the import session ran but rejected the stream
    #[error("commit on '{branch}' failed with exit code {code:?}: {stderr}")]
    CommitFailed {
        branch: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl StorageError {
    /// check if this error indicates the record doesn't exist
    ///
    /// Only point lookups produce this; failures to resolve refs, create
    /// branches or write commits are never "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::RecordNotFound { .. })
    }

    /// check if this error comes from the caller's input rather than the engine
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidCommitter(_)
                | StorageError::InvalidBranchName(_)
                | StorageError::InvalidPath(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
