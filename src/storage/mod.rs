//! storage layer for gitdoc
//!
//! this module turns a bare git repository into versioned path -> payload
//! storage. The revision layer above uses this API and never touches git2
//! directly.
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Repository / Branch                       │
//! │   (commit, load, load_multiple, history, create_branch)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ fast_import │       │    refs     │       │   commit    │
//!  │  (writes)   │       │ (branches)  │       │  (history)  │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!         │
//!         ▼
//!  ┌─────────────┐       ┌─────────────┐
//!  │   process   │◄──────│    lock     │
//!  │ (git child) │       │  ("commit") │
//!  └─────────────┘       └─────────────┘
//!  ```
//!
//! # Usage
//!
//! ```ignore
//! use gitdoc::config::StoreConfig;
//! use gitdoc::storage::{Repository, Writes};
//!
//! let repo = Repository::init(StoreConfig::new("./store"))?;
//!
//! let mut writes = Writes::new();
//! writes.insert("en/doc".to_string(), Some(b"{}".to_vec()));
//! let id = repo.commit(&writes, "Me <me>", "add doc", "main", "main")?;
//!
//! let payload = repo.load("en/doc", &id.to_string())?;
//! ```

mod branch;
mod commit;
mod error;
mod fast_import;
mod lock;
mod process;
mod refs;
mod repository;
mod types;

// Re-export public API
pub use branch::Branch;
pub use commit::{CommitInfo, History};
pub use error::{StorageError, StorageResult};
pub use repository::{LoadMultiple, Repository, Writes};
pub use types::{BranchName, CommitId, Committer, InvalidNameError};

