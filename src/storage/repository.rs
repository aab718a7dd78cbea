//!   Core repository wrapper.
//!
//!  This is the central component of the storage layer. It owns one bare
//!  Git repository and turns it into opaque path -> payload storage:
//!
//!  - writes go through a single `git fast-import` session per commit,
//!    serialized by the process-wide "commit" lock
//!  - point lookups, ref resolution, branch creation and history are
//!    answered in-process through `git2`
//!
//!  Reads never take the commit lock. A read that resolves a branch name
//!  more than once (for example `load_multiple`) may observe different tips
//!  if another writer advances the branch in between.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use git2::{ErrorCode, Repository as GitRepo, RepositoryInitOptions};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::storage::branch::Branch;
use crate::storage::commit::{CommitInfo, History};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fast_import::{self, ImportStream};
use crate::storage::lock::{self, COMMIT_LOCK};
use crate::storage::process::GitProcess;
use crate::storage::refs::RefManager;
use crate::storage::types::{BranchName, CommitId, Committer};

/// Paths to write in one commit: `Some(payload)` creates or replaces,
/// `None` deletes.
pub type Writes = BTreeMap<String, Option<Vec<u8>>>;

/// The storage engine handle.
///
/// Clone this to share it - it uses Arc internally.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

struct RepositoryInner {
    // git2::Repository is Send but not Sync, so reads are serialized on
    // this mutex. It is never held across an import session.
    repo: Mutex<GitRepo>,
    config: StoreConfig,
}

impl Repository {
    /// Open an existing repository.
    pub fn open(config: StoreConfig) -> StorageResult<Self> {
        let path = fs::canonicalize(&config.path).map_err(|e| StorageError::StorageInit {
            path: config.path.clone(),
            reason: e.to_string(),
        })?;

        let repo = GitRepo::open_bare(&path).map_err(|e| StorageError::StorageInit {
            path: path.clone(),
            reason: e.message().to_string(),
        })?;

        Ok(Self::from_parts(repo, StoreConfig { path, ..config }))
    }

    /// Initialize a repository, creating the directory if it's absent.
    ///
    /// A fresh repository gets an empty root commit on the default branch so
    /// every later commit has a parent to resolve. Calling this on an
    /// initialized repository leaves it untouched.
    pub fn init(config: StoreConfig) -> StorageResult<Self> {
        let init_error = |reason: String| StorageError::StorageInit {
            path: config.path.clone(),
            reason,
        };

        fs::create_dir_all(&config.path).map_err(|e| init_error(e.to_string()))?;
        // another process may have replaced the directory between the two calls
        let path = fs::canonicalize(&config.path).map_err(|e| init_error(e.to_string()))?;
        if !path.is_dir() {
            return Err(init_error("not a directory".to_string()));
        }

        let default_branch = BranchName::new(config.default_branch.as_str())?;

        let repo = match GitRepo::open_bare(&path) {
            Ok(repo) => repo,
            Err(_) => {
                let mut opts = RepositoryInitOptions::new();
                opts.bare(true).initial_head(default_branch.as_str());
                GitRepo::init_opts(&path, &opts).map_err(|e| init_error(e.message().to_string()))?
            }
        };

        let repository = Self::from_parts(repo, StoreConfig { path, ..config });

        let initialized =
            repository.with_repo(|repo| Ok(RefManager::branch_exists(repo, &default_branch)))?;
        if !initialized {
            let committer = repository.inner.config.system_committer.clone();
            let root = repository.commit(
                &Writes::new(),
                &committer,
                "Initialize new repository",
                default_branch.as_str(),
                "",
            )?;
            repository.with_repo(|repo| RefManager::set_head(repo, &default_branch))?;
            info!(path = %repository.path().display(), branch = %default_branch, root = %root.short(), "initialized document repository");
        }

        Ok(repository)
    }

    /// Open or initialize a repository, depending on `create_if_missing`.
    pub fn open_or_init(config: StoreConfig) -> StorageResult<Self> {
        if config.create_if_missing {
            Self::init(config)
        } else {
            Self::open(config)
        }
    }

    fn from_parts(repo: GitRepo, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                repo: Mutex::new(repo),
                config,
            }),
        }
    }

    /// Get the repository path.
    pub fn path(&self) -> &Path {
        &self.inner.config.path
    }

    /// The configuration this repository was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Execute a function with access to the repository.
    pub fn with_repo<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&GitRepo) -> StorageResult<T>,
    {
        let repo = self.inner.repo.lock();
        f(&repo)
    }

    /// A handle bound to one branch.
    pub fn branch(&self, name: &str) -> StorageResult<Branch> {
        Ok(Branch::new(self.clone(), BranchName::new(name)?))
    }

    /// A handle bound to the configured default branch.
    pub fn default_branch(&self) -> StorageResult<Branch> {
        self.branch(&self.inner.config.default_branch)
    }

    // ==================== Writes ====================

    /// Atomically apply `writes` as one commit on `branch`.
    ///
    /// `parent` may be a branch name or a commit id; an empty string makes
    /// this a root commit. The returned id is read back from the branch tip
    /// once the import session has exited.
    ///
    /// A commit id that is behind the current tip of `branch` would move the
    /// branch backwards. fast-import refuses that update, so the call fails
    /// with `CommitFailed` and the branch stays where it was.
    pub fn commit(
        &self,
        writes: &Writes,
        committer: &str,
        message: &str,
        branch: &str,
        parent: &str,
    ) -> StorageResult<CommitId> {
        let committer = Committer::parse(committer)
            .ok_or_else(|| StorageError::InvalidCommitter(committer.to_string()))?;
        let branch = BranchName::new(branch)?;
        for path in writes.keys() {
            validate_path(path)?;
        }

        lock::synchronize(COMMIT_LOCK, || {
            let parent = if parent.is_empty() {
                None
            } else {
                Some(self.get_commit_for_branch(parent)?)
            };

            self.run_import(&branch, &committer, message, parent, writes)?;

            let id = self.get_commit_for_branch(branch.as_str())?;
            debug!(
                branch = %branch,
                parent = ?parent.map(|p| p.short()),
                writes = writes.values().filter(|w| w.is_some()).count(),
                deletes = writes.values().filter(|w| w.is_none()).count(),
                commit = %id.short(),
                "committed"
            );
            Ok(id)
        })
    }

    /// Commit that removes every path in `paths` from `branch`.
    pub fn delete(&self, paths: &[String], branch: &str) -> StorageResult<CommitId> {
        let writes: Writes = paths.iter().map(|path| (path.clone(), None)).collect();
        let message = format!("Delete {}", paths.join(", "));
        let committer = self.inner.config.system_committer.clone();
        self.commit(&writes, &committer, &message, branch, branch)
    }

    fn run_import(
        &self,
        branch: &BranchName,
        committer: &Committer,
        message: &str,
        parent: Option<CommitId>,
        writes: &Writes,
    ) -> StorageResult<()> {
        let config = &self.inner.config;
        let mut process = GitProcess::spawn(
            &config.git_binary,
            self.path(),
            &fast_import::session_args(config.verbose),
        )?;
        let command = process.command().to_string();

        let written = process
            .stdin()
            .and_then(|stdin| write_session(stdin, branch, committer, message, parent, writes));

        let output = process.finish()?;
        if !output.success() {
            return Err(StorageError::CommitFailed {
                branch: branch.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        if config.verbose {
            debug!(stats = %output.stderr, stdout = %output.output(), "import session finished");
        }

        written.map_err(|source| StorageError::Process { command, source })
    }

    // ==================== Reads ====================

    /// Payload stored at `path` as of `commitish`.
    pub fn load(&self, path: &str, commitish: &str) -> StorageResult<Vec<u8>> {
        self.with_repo(|repo| {
            let spec = format!("{}:{}", commitish, path);
            repo.revparse_single(&spec)
                .and_then(|object| object.peel_to_blob())
                .map(|blob| blob.content().to_vec())
                .map_err(|e| {
                    if e.code() == ErrorCode::NotFound {
                        debug!(path, commit = commitish, "no record");
                    } else {
                        warn!(path, commit = commitish, error = %e, "lookup failed, treating as missing");
                    }
                    StorageError::RecordNotFound {
                        path: path.to_string(),
                        commit: commitish.to_string(),
                    }
                })
        })
    }

    /// Lazily look up several paths; missing ones are skipped.
    pub fn load_multiple<I, S>(&self, paths: I, commitish: &str) -> LoadMultiple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LoadMultiple {
            repository: self.clone(),
            commitish: commitish.to_string(),
            paths: paths.into_iter().map(Into::into).collect::<Vec<_>>().into_iter(),
        }
    }

    /// Resolve a branch name or any commit-ish to a commit id.
    pub fn get_commit_for_branch(&self, reference: &str) -> StorageResult<CommitId> {
        self.with_repo(|repo| RefManager::resolve(repo, reference))
    }

    /// Details of one commit.
    pub fn commit_info(&self, commitish: &str) -> StorageResult<CommitInfo> {
        let id = self.get_commit_for_branch(commitish)?;
        self.with_repo(|repo| {
            let commit = repo.find_commit(id.raw())?;
            Ok(CommitInfo::from_git2(&commit))
        })
    }

    /// Create branch `name` at the current tip of `start`.
    pub fn create_branch(&self, start: &str, name: &str) -> StorageResult<()> {
        let creation_error = |reason: String| StorageError::BranchCreation {
            name: name.to_string(),
            reason,
        };

        let branch = BranchName::new(name).map_err(|e| creation_error(e.to_string()))?;
        let target = self
            .get_commit_for_branch(start)
            .map_err(|e| creation_error(e.to_string()))?;

        self.with_repo(|repo| RefManager::create_branch(repo, &branch, target))?;
        info!(branch = %branch, from = start, at = %target.short(), "created branch");
        Ok(())
    }

    /// Commits on `branch` that modified `path`, newest first.
    pub fn history(&self, path: &str, branch: &str) -> StorageResult<History> {
        let start = self.get_commit_for_branch(branch)?;
        Ok(History::new(self.clone(), path, start))
    }
}

fn validate_path(path: &str) -> StorageResult<()> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.starts_with('"')
        || path.ends_with('/')
        || path.contains('\n')
        || path.contains("//");
    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn write_session<W: Write>(
    out: W,
    branch: &BranchName,
    committer: &Committer,
    message: &str,
    parent: Option<CommitId>,
    writes: &Writes,
) -> io::Result<()> {
    let mut stream = ImportStream::new(out);
    stream.header(branch, committer, Utc::now(), message)?;
    if let Some(parent) = parent {
        stream.from(parent)?;
    }
    for (path, payload) in writes {
        if let Some(payload) = payload {
            stream.modify(path, payload)?;
        }
    }
    for (path, payload) in writes {
        if payload.is_none() {
            stream.delete(path)?;
        }
    }
    stream.done()
}

/// Iterator returned by [`Repository::load_multiple`].
///
/// Each step is an independent lookup against `commitish`, resolved anew.
pub struct LoadMultiple {
    repository: Repository,
    commitish: String,
    paths: std::vec::IntoIter<String>,
}

impl Iterator for LoadMultiple {
    type Item = (String, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.paths.by_ref() {
            if let Ok(payload) = self.repository.load(&path, &self.commitish) {
                return Some((path, payload));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ME: &str = "Me <me>";

    fn setup() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(StoreConfig::new(dir.path().join("store"))).unwrap();
        (dir, repo)
    }

    fn writes(entries: &[(&str, &str)]) -> Writes {
        entries
            .iter()
            .map(|(path, payload)| (path.to_string(), Some(payload.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn test_init_creates_root_commit() {
        let (_dir, repo) = setup();

        let root = repo.commit_info("main").unwrap();
        assert!(root.is_root());
        assert_eq!(root.committer, "System User <system>");
        assert!(root.message.starts_with("Initialize new repository"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path().join("store"));

        let first = Repository::init(config.clone()).unwrap();
        let root = first.get_commit_for_branch("main").unwrap();
        drop(first);

        let second = Repository::init(config.clone()).unwrap();
        assert_eq!(second.get_commit_for_branch("main").unwrap(), root);

        let opened = Repository::open(config).unwrap();
        assert_eq!(opened.get_commit_for_branch("main").unwrap(), root);
    }

    #[test]
    fn test_open_missing_fails() {
        let dir = TempDir::new().unwrap();
        let result = Repository::open(StoreConfig::new(dir.path().join("missing")));
        assert!(matches!(result, Err(StorageError::StorageInit { .. })));
    }

    #[test]
    fn test_init_on_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"not a directory").unwrap();

        let result = Repository::init(StoreConfig::new(&file));
        assert!(matches!(result, Err(StorageError::StorageInit { .. })));
    }

    #[test]
    fn test_commit_and_load() {
        let (_dir, repo) = setup();

        let id = repo
            .commit(
                &writes(&[("doc1", "{\"hello\":\"world\"}"), ("doc2", "{\"goodbye\":\"world\"}")]),
                ME,
                "Test commit",
                "main",
                "main",
            )
            .unwrap();

        assert_eq!(repo.load("doc1", "main").unwrap(), b"{\"hello\":\"world\"}");
        assert_eq!(repo.load("doc2", &id.to_string()).unwrap(), b"{\"goodbye\":\"world\"}");
    }

    #[test]
    fn test_load_missing_is_record_not_found() {
        let (_dir, repo) = setup();
        repo.commit(&writes(&[("doc1", "a")]), ME, "Test commit", "main", "main")
            .unwrap();

        let result = repo.load("doc3", "main");
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
    }

    #[test]
    fn test_multibyte_payload_round_trip() {
        let (_dir, repo) = setup();
        let payload = "{\"title\":\"日本語のドキュメント ✓\"}";

        let id = repo
            .commit(&writes(&[("ja/doc", payload)]), ME, "Ünïcode message", "main", "main")
            .unwrap();

        assert_eq!(repo.load("ja/doc", &id.to_string()).unwrap(), payload.as_bytes());
        assert_eq!(repo.commit_info(&id.to_string()).unwrap().message.trim_end(), "Ünïcode message");
    }

    #[test]
    fn test_delete_keeps_history() {
        let (_dir, repo) = setup();

        let written = repo
            .commit(&writes(&[("en/doc", "v1")]), ME, "add", "main", "main")
            .unwrap();
        let deleted = repo.delete(&["en/doc".to_string()], "main").unwrap();

        assert!(repo.load("en/doc", &deleted.to_string()).unwrap_err().is_not_found());
        assert_eq!(repo.load("en/doc", &written.to_string()).unwrap(), b"v1");
        assert_eq!(repo.load("en/doc", &format!("{}^", deleted)).unwrap(), b"v1");
    }

    #[test]
    fn test_mixed_writes_and_deletes_in_one_commit() {
        let (_dir, repo) = setup();
        repo.commit(&writes(&[("a", "1"), ("b", "2")]), ME, "first", "main", "main")
            .unwrap();

        let mut batch = writes(&[("c", "3")]);
        batch.insert("a".to_string(), None);
        repo.commit(&batch, ME, "second", "main", "main").unwrap();

        assert!(repo.load("a", "main").is_err());
        assert_eq!(repo.load("b", "main").unwrap(), b"2");
        assert_eq!(repo.load("c", "main").unwrap(), b"3");
    }

    #[test]
    fn test_invalid_committer_rejected_before_write() {
        let (_dir, repo) = setup();
        let before = repo.get_commit_for_branch("main").unwrap();

        let result = repo.commit(&writes(&[("doc", "x")]), "nobody", "msg", "main", "main");
        assert!(matches!(result, Err(StorageError::InvalidCommitter(_))));
        assert_eq!(repo.get_commit_for_branch("main").unwrap(), before);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let (_dir, repo) = setup();
        let result = repo.commit(&writes(&[("bad\npath", "x")]), ME, "msg", "main", "main");
        assert!(matches!(result, Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_sequential_commits_chain() {
        let (_dir, repo) = setup();

        let first = repo.commit(&writes(&[("a", "1")]), ME, "one", "main", "main").unwrap();
        let second = repo.commit(&writes(&[("a", "2")]), ME, "two", "main", "main").unwrap();

        let info = repo.commit_info(&second.to_string()).unwrap();
        assert_eq!(info.parent, Some(first));
        assert_eq!(info.committer, ME);
        assert_eq!(repo.get_commit_for_branch("main").unwrap(), second);
    }

    #[test]
    fn test_parent_accepts_commit_id() {
        let (_dir, repo) = setup();
        let first = repo.commit(&writes(&[("a", "1")]), ME, "one", "main", "main").unwrap();

        let second = repo
            .commit(&writes(&[("a", "2")]), ME, "two", "main", &first.to_string())
            .unwrap();
        assert_eq!(repo.commit_info(&second.to_string()).unwrap().parent, Some(first));
    }

    #[test]
    fn test_stale_parent_on_same_branch_fails() {
        let (_dir, repo) = setup();
        let first = repo.commit(&writes(&[("a", "1")]), ME, "one", "main", "main").unwrap();
        let second = repo.commit(&writes(&[("a", "2")]), ME, "two", "main", "main").unwrap();

        let result = repo.commit(&writes(&[("a", "3")]), ME, "three", "main", &first.to_string());
        assert!(matches!(result, Err(StorageError::CommitFailed { .. })));
        assert_eq!(repo.get_commit_for_branch("main").unwrap(), second);
        assert_eq!(repo.load("a", "main").unwrap(), b"2");
    }

    #[test]
    fn test_unresolvable_parent_is_fatal() {
        let (_dir, repo) = setup();
        let result = repo.commit(&writes(&[("a", "1")]), ME, "one", "main", "no-such-branch");
        assert!(matches!(result, Err(StorageError::RefNotFound(_))));
    }

    #[test]
    fn test_branch_isolation() {
        let (_dir, repo) = setup();
        repo.commit(&writes(&[("shared", "base")]), ME, "base", "main", "main")
            .unwrap();

        repo.create_branch("main", "feature").unwrap();
        repo.commit(&writes(&[("only-feature", "f")]), ME, "f", "feature", "feature")
            .unwrap();
        repo.commit(&writes(&[("only-main", "m")]), ME, "m", "main", "main")
            .unwrap();

        assert_eq!(repo.load("shared", "feature").unwrap(), b"base");
        assert!(repo.load("only-feature", "main").is_err());
        assert!(repo.load("only-main", "feature").is_err());
        assert_eq!(repo.load("only-feature", "feature").unwrap(), b"f");
        assert_eq!(repo.load("only-main", "main").unwrap(), b"m");
    }

    #[test]
    fn test_create_branch_collision() {
        let (_dir, repo) = setup();
        repo.create_branch("main", "feature").unwrap();

        let result = repo.create_branch("main", "feature");
        assert!(matches!(result, Err(StorageError::BranchCreation { .. })));
    }

    #[test]
    fn test_create_branch_from_unknown_start() {
        let (_dir, repo) = setup();
        let result = repo.create_branch("nowhere", "feature");
        assert!(matches!(result, Err(StorageError::BranchCreation { .. })));
    }

    #[test]
    fn test_history_newest_first_and_filtered() {
        let (_dir, repo) = setup();

        let c1 = repo.commit(&writes(&[("p", "1")]), ME, "p1", "main", "main").unwrap();
        repo.commit(&writes(&[("q", "1")]), ME, "q1", "main", "main").unwrap();
        let c3 = repo.commit(&writes(&[("p", "2")]), ME, "p2", "main", "main").unwrap();
        // rewriting identical content is not a modification
        repo.commit(&writes(&[("p", "2"), ("q", "2")]), ME, "q2", "main", "main")
            .unwrap();
        let c5 = repo.delete(&["p".to_string()], "main").unwrap();

        let history: Vec<CommitId> = repo
            .history("p", "main")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(history, vec![c5, c3, c1]);
    }

    #[test]
    fn test_history_of_unknown_branch_is_fatal() {
        let (_dir, repo) = setup();
        assert!(matches!(
            repo.history("p", "nope"),
            Err(StorageError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_load_multiple_skips_missing() {
        let (_dir, repo) = setup();
        repo.commit(&writes(&[("x", "X"), ("y", "Y")]), ME, "xy", "main", "main")
            .unwrap();

        let found: Vec<(String, Vec<u8>)> = repo.load_multiple(["y", "z", "x"], "main").collect();

        assert_eq!(
            found,
            vec![
                ("y".to_string(), b"Y".to_vec()),
                ("x".to_string(), b"X".to_vec()),
            ]
        );
    }

    #[test]
    fn test_concurrent_commits_are_serialized() {
        let (_dir, repo) = setup();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    let path = format!("doc{}", i);
                    repo.commit(&writes(&[(path.as_str(), "v")]), ME, "parallel", "main", "main")
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..4 {
            assert_eq!(repo.load(&format!("doc{}", i), "main").unwrap(), b"v");
        }
    }
}
