//! Store configuration.

use std::path::PathBuf;

/// Configuration for a document store and its backing repository.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory of the bare backing repository.
    pub path: PathBuf,
    /// Branch created when the repository is initialized.
    pub default_branch: String,
    /// Git executable used for the streaming import session.
    pub git_binary: PathBuf,
    /// Identity used for the root commit and for deletions.
    pub system_committer: String,
    /// Initialize the repository if it doesn't exist yet.
    pub create_if_missing: bool,
    /// Ask the import session for statistics instead of running quietly.
    pub verbose: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".gitdoc"),
            default_branch: "main".to_string(),
            git_binary: PathBuf::from("git"),
            system_committer: "System User <system>".to_string(),
            create_if_missing: true,
            verbose: false,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the default branch name.
    pub fn default_branch(mut self, name: impl Into<String>) -> Self {
        self.default_branch = name.into();
        self
    }

    /// Set the git executable.
    pub fn git_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.git_binary = binary.into();
        self
    }

    /// Set the committer used for system commits.
    pub fn system_committer(mut self, committer: impl Into<String>) -> Self {
        self.system_committer = committer.into();
        self
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Set verbose flag.
    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }
}
