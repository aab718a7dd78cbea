//! Revision management over pluggable storage.
//!
//! `Collection` owns the document-level semantics (default, latest,
//! archived, language fallback) and talks to storage only through a
//! `CollectionDriver`. Two drivers ship with the crate:
//!
//! - `MemoryDriver`: rows with explicit `latest`/`default`/`archived` flags
//! - `GitDriver`: one payload per document at `{collection}/{language}/{uuid}`
//!   in a `Repository`, with a sibling path for a pending non-default revision

mod collection;
mod commit;
mod driver;
mod git;
mod memory;

pub use collection::Collection;
pub use commit::Commit;
pub use driver::{CollectionDriver, CollectionScope};
pub use git::GitDriver;
pub use memory::MemoryDriver;
