//! Store API - entry point tying configuration, repository and collections.

use std::sync::Arc;

use tracing::info;

use crate::collection::{Collection, GitDriver};
use crate::config::StoreConfig;
use crate::document::DocumentResult;
use crate::storage::{Repository, StorageError, StorageResult};

/// An open document store.
///
/// Construct one per repository and hand out collections from it; there is
/// no process-wide instance. Each collection name gets its own directory in
/// the repository, so collections never see each other's documents.
///
/// ```no_run
/// use gitdoc::config::StoreConfig;
/// use gitdoc::store::DocumentStore;
///
/// let store = DocumentStore::open(StoreConfig::new("./content")).unwrap();
/// let pages = store.collection("pages", "en").unwrap();
///
/// let mut page = pages.create_document();
/// page.set_title("Home");
/// pages.save(page, true).unwrap();
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    driver: Arc<GitDriver>,
}

impl DocumentStore {
    /// Open the repository at `config.path`, initializing it when
    /// `create_if_missing` is set.
    pub fn open(config: StoreConfig) -> StorageResult<Self> {
        if !config.create_if_missing && !config.path.exists() {
            return Err(StorageError::StorageInit {
                path: config.path.clone(),
                reason: "store not found".to_string(),
            });
        }

        let repository = Repository::open_or_init(config)?;
        info!(path = %repository.path().display(), "opened document store");
        Ok(Self::from_repository(repository))
    }

    pub fn from_repository(repository: Repository) -> Self {
        Self {
            driver: Arc::new(GitDriver::new(repository)),
        }
    }

    pub fn repository(&self) -> &Repository {
        self.driver.repository()
    }

    pub fn config(&self) -> &StoreConfig {
        self.repository().config()
    }

    /// Collection `name` in `language` on the default branch.
    pub fn collection(&self, name: &str, language: &str) -> DocumentResult<Collection<GitDriver>> {
        let branch = self.config().default_branch.clone();
        self.collection_on(name, language, &branch)
    }

    /// Collection `name` in `language` on an existing `branch`.
    pub fn collection_on(
        &self,
        name: &str,
        language: &str,
        branch: &str,
    ) -> DocumentResult<Collection<GitDriver>> {
        let collection = Collection::new(Arc::clone(&self.driver), name, language, branch);
        collection.initialize_schema()?;
        Ok(collection)
    }
}
