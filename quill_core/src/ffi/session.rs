use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tracing::{debug, info};

use crate::{
    config::{BusyPolicy, CoreConfig},
    diff::DiffEngine,
    integrate::IntegrationEngine,
    logging,
    repository::Repository,
    review::ReviewResolver,
    BranchInfo, Error, FileDiffRecord, IntegrationResult, RepositorySnapshot, ReviewCandidate,
};

use super::{lock::MutationLock, CoreError};

type Result<T> = std::result::Result<T, CoreError>;

/// High-level handle exposed to hosts via `UniFFI`.
///
/// Every call opens a fresh view of the repository. Cherry-picks and merges
/// are serialized through the session's mutation lock and a lock file in the
/// git directory, so sessions opened separately on one repository exclude
/// each other too. Reads never wait on either.
#[derive(Debug, uniffi::Object)]
pub struct CoreSession {
    root: PathBuf,
    lock_path: PathBuf,
    busy_policy: BusyPolicy,
    diff_engine: DiffEngine,
    review: ReviewResolver,
    integration: IntegrationEngine,
    mutation: Mutex<()>,
}

impl CoreSession {
    fn new(repository: &Repository, config: &CoreConfig) -> Self {
        let diff_engine = DiffEngine::from_config(&config.diff);
        Self {
            root: repository.root().to_path_buf(),
            lock_path: MutationLock::path_in(repository.common_dir()),
            busy_policy: config.integration.busy_policy,
            review: ReviewResolver::from_config(&config.review),
            integration: IntegrationEngine::from_config(&config.integration, diff_engine.clone()),
            diff_engine,
            mutation: Mutex::new(()),
        }
    }

    fn with_repository<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> crate::Result<T>,
    {
        let repository = Repository::open(&self.root).map_err(CoreError::from)?;
        op(&repository).map_err(CoreError::from)
    }

    fn with_mutation<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> crate::Result<T>,
    {
        let _guard = self.acquire_mutation()?;
        self.with_repository(op)
    }

    fn acquire_mutation(&self) -> Result<MutationGuard<'_>> {
        let session = self.lock_session()?;
        let repository = MutationLock::acquire(&self.lock_path, &self.root, self.busy_policy)
            .map_err(CoreError::from)?;
        Ok(MutationGuard {
            _repository: repository,
            _session: session,
        })
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, ()>> {
        match self.busy_policy {
            BusyPolicy::Wait => Ok(self.mutation.lock()?),
            BusyPolicy::Reject => match self.mutation.try_lock() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    debug!(root = %self.root.display(), "mutation rejected, repository busy");
                    Err(CoreError::from(Error::RepositoryBusy {
                        path: self.root.display().to_string(),
                    }))
                }
                Err(TryLockError::Poisoned(_)) => Err(CoreError::from(Error::LockPoisoned)),
            },
        }
    }
}

/// Both halves of the mutation lock; the file is released first.
struct MutationGuard<'a> {
    _repository: MutationLock,
    _session: MutexGuard<'a, ()>,
}

#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
impl CoreSession {
    /// Structured diff between two references.
    ///
    /// # Errors
    ///
    /// Returns an error when either reference is unknown or the diff fails.
    pub fn compare(&self, old: String, new: String) -> Result<Vec<FileDiffRecord>> {
        self.with_repository(|repo| self.diff_engine.compare(repo, &old, &new))
    }

    /// Structured diff of a commit against its first parent.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown references or root commits.
    pub fn diff_commit(&self, reference: String) -> Result<Vec<FileDiffRecord>> {
        self.with_repository(|repo| self.diff_engine.diff_commit(repo, &reference))
    }

    /// Commits on `target` missing from `working`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when either reference is unknown.
    pub fn review_branch(
        &self,
        target: String,
        working: String,
        limit: Option<u32>,
    ) -> Result<Vec<ReviewCandidate>> {
        self.with_repository(|repo| self.review.review_branch(repo, &target, &working, limit))
    }

    /// Cherry-pick a commit onto the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository is busy, detached, dirty, the
    /// commit is unknown, or a rollback failed.
    pub fn cherry_pick(&self, commit: String) -> Result<IntegrationResult> {
        self.with_mutation(|repo| self.integration.cherry_pick(repo, &commit))
    }

    /// Merge a branch into the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository is busy, detached, dirty, the
    /// source is unknown, or a rollback failed.
    pub fn integrate_branch(&self, source: String) -> Result<IntegrationResult> {
        self.with_mutation(|repo| self.integration.integrate_branch(repo, &source))
    }

    /// Capture the current repository snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when git state cannot be read.
    pub fn snapshot(&self) -> Result<RepositorySnapshot> {
        self.with_repository(Repository::snapshot)
    }

    /// List local branches.
    ///
    /// # Errors
    ///
    /// Returns an error when branches cannot be enumerated.
    pub fn branches(&self) -> Result<Vec<BranchInfo>> {
        self.with_repository(Repository::branches)
    }
}

/// Open a repository session with default configuration.
///
/// # Errors
///
/// Returns an error when the repository cannot be opened.
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn open(path: String) -> Result<Arc<CoreSession>> {
    open_session(Path::new(&path), &CoreConfig::default())
}

/// Open a repository session configured from a TOML file.
///
/// # Errors
///
/// Returns an error when the configuration is invalid or the repository
/// cannot be opened.
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn open_with_config(path: String, config_path: String) -> Result<Arc<CoreSession>> {
    let config = CoreConfig::load_from_file(&config_path).map_err(CoreError::from)?;
    logging::init(&config.logging);
    open_session(Path::new(&path), &config)
}

/// Install the tracing subscriber for the given filter directive.
///
/// Returns `false` when a subscriber was already installed.
#[uniffi::export]
pub fn init_logging(level: String) -> bool {
    logging::init(&crate::config::LoggingConfig { level })
}

fn open_session(path: &Path, config: &CoreConfig) -> Result<Arc<CoreSession>> {
    let repository = Repository::open(path).map_err(CoreError::from)?;
    info!(root = %repository.root().display(), "session opened");
    Ok(Arc::new(CoreSession::new(&repository, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Repository as GitRepository};
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let temp = TempDir::new().expect("tempdir");
        let repo = GitRepository::init(temp.path()).expect("init repo");
        std::fs::write(temp.path().join("chapter.md"), "Once.\n").expect("write file");

        let mut index = repo.index().expect("index");
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .expect("stage");
        index.write().expect("write index");
        let tree = repo
            .find_tree(index.write_tree().expect("write tree"))
            .expect("find tree");
        let signature = git2::Signature::now("Test User", "test@example.com").expect("signature");
        repo.commit(Some("HEAD"), &signature, &signature, "Initial", &tree, &[])
            .expect("commit");
        temp
    }

    fn session(temp: &TempDir, busy_policy: BusyPolicy) -> Arc<CoreSession> {
        let mut config = CoreConfig::default();
        config.integration.busy_policy = busy_policy;
        open_session(temp.path(), &config).expect("open session")
    }

    #[test]
    fn busy_repository_rejects_mutations() {
        let temp = init_repo();
        let session = session(&temp, BusyPolicy::Reject);

        let _held = session.mutation.lock().expect("hold lock");
        let err = session
            .integrate_branch("HEAD".into())
            .expect_err("repository busy");
        assert!(matches!(err, CoreError::RepositoryBusy { .. }));
    }

    #[test]
    fn reads_do_not_take_the_mutation_lock() {
        let temp = init_repo();
        let session = session(&temp, BusyPolicy::Reject);

        let _held = session.mutation.lock().expect("hold lock");
        let snapshot = session.snapshot().expect("snapshot while busy");
        assert!(snapshot.head.is_some());
        assert!(session
            .review_branch("HEAD".into(), "HEAD".into(), None)
            .expect("review while busy")
            .is_empty());
    }

    #[test]
    fn waiting_policy_queues_behind_running_mutation() {
        let temp = init_repo();
        let session = session(&temp, BusyPolicy::Wait);

        let guard = session.mutation.lock().expect("hold lock");
        let worker = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || session.integrate_branch("HEAD".into()))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(guard);

        let result = worker.join().expect("join worker").expect("merge");
        assert!(matches!(result, IntegrationResult::NoOp { .. }));
    }

    #[test]
    fn sessions_on_one_repository_exclude_each_other() {
        let temp = init_repo();
        let first = session(&temp, BusyPolicy::Reject);
        let second = session(&temp, BusyPolicy::Reject);

        let held = first.acquire_mutation().expect("hold lock");
        let err = second
            .integrate_branch("HEAD".into())
            .expect_err("repository busy");
        assert!(matches!(err, CoreError::RepositoryBusy { .. }));

        drop(held);
        let result = second.integrate_branch("HEAD".into()).expect("merge");
        assert!(matches!(result, IntegrationResult::NoOp { .. }));
        assert!(!first.lock_path.exists());
    }

    #[test]
    fn waiting_session_queues_behind_another_session() {
        let temp = init_repo();
        let first = session(&temp, BusyPolicy::Reject);
        let second = session(&temp, BusyPolicy::Wait);

        let held = first.acquire_mutation().expect("hold lock");
        let worker = std::thread::spawn(move || second.integrate_branch("HEAD".into()));
        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(held);

        let result = worker.join().expect("join worker").expect("merge");
        assert!(matches!(result, IntegrationResult::NoOp { .. }));
    }

    #[test]
    fn open_rejects_non_repositories() {
        let temp = TempDir::new().expect("tempdir");
        let err = open(temp.path().display().to_string()).expect_err("not a repository");
        assert!(matches!(err, CoreError::NotARepository { .. }));
    }
}
