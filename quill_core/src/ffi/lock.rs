//! Repository-wide mutation lock shared by every session on the same
//! repository.
//!
//! The lock is a file created exclusively inside the git directory, the same
//! way git guards its own refs and index with `*.lock` files. Dropping the
//! guard removes the file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{config::BusyPolicy, Error, Result};

const LOCK_FILE: &str = "quill-mutation.lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Held for the duration of one cherry-pick or merge.
#[derive(Debug)]
pub(crate) struct MutationLock {
    path: PathBuf,
}

impl MutationLock {
    /// Location of the lock file for a repository whose git directory is
    /// `git_dir`.
    pub(crate) fn path_in(git_dir: &Path) -> PathBuf {
        git_dir.join(LOCK_FILE)
    }

    /// Take the lock at `path`, rejecting or polling while another holder
    /// has it according to `policy`. `root` names the repository in errors.
    pub(crate) fn acquire(path: &Path, root: &Path, policy: BusyPolicy) -> Result<Self> {
        loop {
            match Self::try_acquire(path)? {
                Some(lock) => return Ok(lock),
                None if policy == BusyPolicy::Reject => {
                    debug!(lock = %path.display(), "lock file held by another session");
                    return Err(Error::RepositoryBusy {
                        path: root.display().to_string(),
                    });
                }
                None => thread::sleep(RETRY_INTERVAL),
            }
        }
    }

    fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let io_error = |source| Error::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(err) => return Err(io_error(err)),
        };
        writeln!(file, "{}", std::process::id()).map_err(io_error)?;
        Ok(Some(Self {
            path: path.to_path_buf(),
        }))
    }
}

impl Drop for MutationLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), %err, "could not remove mutation lock");
        }
    }
}
