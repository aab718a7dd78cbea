//! gitdoc - A Versioned Document Store on Git
//!
//! Documents are never edited in place: every change is a new immutable
//! revision, and revisions are saved in atomic, author-stamped commits.
//! The storage engine turns a bare Git repository into path -> payload
//! storage with branches and per-path history; collections manage
//! revisions (default, latest, archived) on top of it or on an in-memory
//! flag table.
//!
//! # Example
//!
//! ```no_run
//! use gitdoc::config::StoreConfig;
//! use gitdoc::document::DocumentView;
//! use gitdoc::store::DocumentStore;
//!
//! let store = DocumentStore::open(StoreConfig::new("./content")).unwrap();
//! let pages = store.collection("pages", "en").unwrap();
//!
//! let mut page = pages.create_document();
//! page.set_title("Home");
//! let uuid = page.uuid();
//! pages.save(page, true).unwrap();
//!
//! let mut next = pages.new_revision(uuid, None).unwrap();
//! next.set_title("Welcome");
//! pages.save(next, true).unwrap();
//! ```

pub mod collection;
pub mod config;
pub mod document;
pub mod storage;
pub mod store;
