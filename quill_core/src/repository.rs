//! Repository access built on top of libgit2, and the [`VersionEngine`]
//! implementation the core drives.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{
    build::CheckoutBuilder, BranchType, Delta, DiffFindOptions, DiffOptions, ErrorClass,
    ErrorCode, Oid, Patch, Repository as GitRepository, ResetType, Status, StatusOptions,
};
use quill_engine_api::{
    ApplyOutcome, CommitMeta, EngineError, EngineResult, Identity, LineOrigin, MergeOutcome,
    NewCommit, RawChangeKind, RawDiffOptions, RawFileDiff, RawHunk, RawLine, VersionEngine,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    api::{BranchInfo, CommitRef, RepositoryInfo, RepositorySnapshot, WorkspaceStatus},
    Error, Result,
};

type GitResult<T> = std::result::Result<T, git2::Error>;

/// Lightweight handle to a repository that Quill operates on.
pub struct Repository {
    inner: GitRepository,
    root: PathBuf,
}

impl Repository {
    /// Open a repository from the given filesystem path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be canonicalized, does not resolve
    /// to a git repository, or if libgit2 reports an unsupported repository
    /// layout (such as a bare repository).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let original = path.as_ref();
        let canonical = std::fs::canonicalize(original).map_err(|source| Error::Io {
            path: display_path(original),
            source,
        })?;

        let repo = match GitRepository::discover(&canonical) {
            Ok(repo) => repo,
            Err(err)
                if err.class() == ErrorClass::Repository && err.code() == ErrorCode::NotFound =>
            {
                return Err(Error::NotARepository {
                    path: display_path(&canonical),
                })
            }
            Err(err) => return Err(Error::from(err)),
        };

        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::BareRepository {
                path: display_path(&canonical),
            })?;

        debug!(root = %root.display(), "opened repository");
        Ok(Self { inner: repo, root })
    }

    /// Returns the absolute path to the repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Git directory shared by every worktree of this repository.
    #[must_use]
    pub fn common_dir(&self) -> &Path {
        self.inner.commondir()
    }

    /// Returns repository metadata.
    ///
    /// # Errors
    ///
    /// Propagates errors from querying the repository default branch.
    pub fn info(&self) -> Result<RepositoryInfo> {
        Ok(RepositoryInfo {
            root: display_path(&self.root),
            default_branch: self.default_branch()?,
        })
    }

    /// Returns the current workspace status.
    ///
    /// # Errors
    ///
    /// Propagates libgit2 status enumeration failures.
    pub fn workspace_status(&self) -> Result<WorkspaceStatus> {
        let current_branch = self.current_branch()?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .renames_head_to_index(true)
            .renames_index_to_workdir(true);

        let statuses = self.inner.statuses(Some(&mut opts))?;
        let dirty = statuses
            .iter()
            .any(|entry| entry.status() != Status::CURRENT);

        Ok(WorkspaceStatus {
            current_branch,
            dirty,
        })
    }

    /// Captures a snapshot of the repository and workspace state.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieving repository metadata, workspace status, or
    /// the head commit fails.
    pub fn snapshot(&self) -> Result<RepositorySnapshot> {
        let head = self.head_commit()?.map(|(branch, commit)| {
            let id = commit.id().to_string();
            match branch {
                Some(name) => CommitRef::new(id, name),
                None => CommitRef::from_id(id),
            }
        });

        Ok(RepositorySnapshot {
            info: self.info()?,
            workspace: self.workspace_status()?,
            head,
        })
    }

    /// Local branches sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if branches cannot be enumerated or a tip cannot be
    /// peeled to a commit.
    pub fn branches(&self) -> Result<Vec<BranchInfo>> {
        let mut branches = Vec::new();
        for entry in self.inner.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()?.map(str::to_owned) else {
                warn!("skipping branch with a non-UTF-8 name");
                continue;
            };
            let tip = branch.get().peel_to_commit()?;
            branches.push(BranchInfo {
                is_head: branch.is_head(),
                tip: CommitRef::new(tip.id().to_string(), name.clone()),
                name,
            });
        }
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    fn default_branch(&self) -> Result<Option<String>> {
        let reference = match self.inner.find_reference("refs/remotes/origin/HEAD") {
            Ok(reference) => reference,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(Error::from(err)),
        };

        Ok(reference
            .symbolic_target()
            .and_then(|target| target.rsplit('/').next().map(str::to_owned)))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        self.head_branch_name().map_err(Error::from)
    }

    fn head_branch_name(&self) -> GitResult<Option<String>> {
        let head = match self.inner.head() {
            Ok(head) => head,
            Err(err) if is_unborn(&err) => {
                return Ok(self
                    .inner
                    .find_reference("HEAD")?
                    .symbolic_target()
                    .and_then(|target| target.strip_prefix("refs/heads/"))
                    .map(str::to_owned))
            }
            Err(err) => return Err(err),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(str::to_owned))
        } else {
            Ok(None)
        }
    }

    fn head_commit(&self) -> Result<Option<(Option<String>, git2::Commit<'_>)>> {
        let head = match self.inner.head() {
            Ok(head) => head,
            Err(err) if is_unborn(&err) => return Ok(None),
            Err(err) => return Err(Error::from(err)),
        };

        let branch = if head.is_branch() {
            head.shorthand().map(str::to_owned)
        } else {
            None
        };

        let resolved = head.resolve()?;
        let commit = resolved.peel_to_commit()?;
        Ok(Some((branch, commit)))
    }

    fn find_commit(&self, id: &str) -> GitResult<git2::Commit<'_>> {
        self.inner.find_commit(Oid::from_str(id)?)
    }

    fn collect_raw_diff(
        &self,
        old: &str,
        new: &str,
        options: &RawDiffOptions,
    ) -> GitResult<Vec<RawFileDiff>> {
        let old_tree = self.find_commit(old)?.tree()?;
        let new_tree = self.find_commit(new)?.tree()?;

        let mut diff_opts = DiffOptions::new();
        diff_opts
            .context_lines(options.context_lines)
            .include_unmodified(options.detect_copies);
        let mut diff =
            self.inner
                .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut diff_opts))?;

        if options.detect_renames || options.detect_copies {
            let mut find_opts = DiffFindOptions::new();
            find_opts
                .renames(options.detect_renames)
                .copies(options.detect_copies)
                .copies_from_unmodified(options.detect_copies)
                .remove_unmodified(true);
            diff.find_similar(Some(&mut find_opts))?;
        }

        let mut files = Vec::new();
        for index in 0..diff.deltas().len() {
            let Some(patch) = Patch::from_diff(&diff, index)? else {
                if let Some(delta) = diff.get_delta(index) {
                    if let Some(kind) = change_kind(&delta) {
                        files.push(binary_file(&delta, kind));
                    }
                }
                continue;
            };

            let delta = patch.delta();
            let Some(kind) = change_kind(&delta) else {
                continue;
            };
            if delta.flags().is_binary() {
                files.push(binary_file(&delta, kind));
                continue;
            }

            let mut hunks = Vec::with_capacity(patch.num_hunks());
            for hunk_index in 0..patch.num_hunks() {
                let (hunk, line_count) = patch.hunk(hunk_index)?;
                let mut lines = Vec::with_capacity(line_count);
                for line_index in 0..line_count {
                    let line = patch.line_in_hunk(hunk_index, line_index)?;
                    if let Some(raw) = raw_line(&line) {
                        lines.push(raw);
                    }
                }
                hunks.push(RawHunk {
                    old_start: hunk.old_start(),
                    old_lines: hunk.old_lines(),
                    new_start: hunk.new_start(),
                    new_lines: hunk.new_lines(),
                    section: hunk_section(hunk.header()),
                    lines,
                });
            }

            let kind = if kind == RawChangeKind::Modified
                && hunks.is_empty()
                && delta.old_file().mode() != delta.new_file().mode()
            {
                RawChangeKind::ModeChanged
            } else {
                kind
            };

            let (old_path, new_path) = delta_paths(&delta, kind);
            files.push(RawFileDiff {
                kind,
                old_path,
                new_path,
                is_binary: false,
                hunks,
            });
        }

        Ok(files)
    }

    fn walk_difference(&self, target: &str, base: &str) -> GitResult<Vec<CommitMeta>> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.push(Oid::from_str(target)?)?;
        revwalk.hide(Oid::from_str(base)?)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.inner.find_commit(oid?)?;
            commits.push(commit_meta(&commit));
        }
        Ok(commits)
    }

    fn descends(&self, ancestor: &str, descendant: &str) -> GitResult<bool> {
        let ancestor = Oid::from_str(ancestor)?;
        let descendant = Oid::from_str(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        self.inner.graph_descendant_of(descendant, ancestor)
    }

    fn cherry_pick_in_memory(&self, commit: &str, onto: &str) -> GitResult<ApplyOutcome> {
        let commit = self.find_commit(commit)?;
        let onto = self.find_commit(onto)?;
        let mut index = if commit.parent_count() == 0 {
            // A root commit's change-set is its whole tree.
            let empty = self.inner.find_tree(self.inner.treebuilder(None)?.write()?)?;
            self.inner
                .merge_trees(&empty, &onto.tree()?, &commit.tree()?, None)?
        } else {
            let mainline = u32::from(commit.parent_count() > 1);
            self.inner.cherrypick_commit(&commit, &onto, mainline, None)?
        };
        if index.has_conflicts() {
            return Ok(ApplyOutcome::Conflicted {
                paths: conflict_paths(&index)?,
            });
        }

        let tree = index.write_tree_to(&self.inner)?;
        Ok(ApplyOutcome::Clean {
            tree: tree.to_string(),
        })
    }

    fn merge_in_memory(&self, source: &str, onto: &str) -> GitResult<MergeOutcome> {
        if self.descends(source, onto)? {
            return Ok(MergeOutcome::UpToDate);
        }
        if self.descends(onto, source)? {
            return Ok(MergeOutcome::FastForward {
                target: source.to_owned(),
            });
        }

        let source_commit = self.find_commit(source)?;
        let onto_commit = self.find_commit(onto)?;
        let mut index = self.inner.merge_commits(&onto_commit, &source_commit, None)?;
        if index.has_conflicts() {
            return Ok(MergeOutcome::Conflicted {
                paths: conflict_paths(&index)?,
            });
        }

        let tree = index.write_tree_to(&self.inner)?;
        Ok(MergeOutcome::Merged {
            tree: tree.to_string(),
        })
    }

    fn write_commit(&self, commit: &NewCommit<'_>) -> GitResult<CommitMeta> {
        let tree = self.inner.find_tree(Oid::from_str(commit.tree)?)?;
        let author = match commit.author_time {
            Some(seconds) => git2::Signature::new(
                &commit.author.name,
                &commit.author.email,
                &git2::Time::new(seconds, 0),
            )?,
            None => git2::Signature::now(&commit.author.name, &commit.author.email)?,
        };
        let committer = git2::Signature::now(&commit.committer.name, &commit.committer.email)?;

        let parents = commit
            .parents
            .iter()
            .map(|id| self.find_commit(id))
            .collect::<GitResult<Vec<_>>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let oid = self
            .inner
            .commit(None, &author, &committer, commit.message, &tree, &parent_refs)?;
        info!(sha = %oid, "created commit");
        Ok(commit_meta(&self.inner.find_commit(oid)?))
    }

    fn tracked_modifications(&self) -> GitResult<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = self.inner.statuses(Some(&mut opts))?;
        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|entry| {
                let status = entry.status();
                status != Status::CURRENT && !status.intersects(Status::WT_NEW | Status::IGNORED)
            })
            .filter_map(|entry| entry.path().map(str::to_owned))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn move_branch(&self, branch: &str, new_tip: &str, expected_tip: &str) -> GitResult<()> {
        let refname = format!("refs/heads/{branch}");
        let new_oid = Oid::from_str(new_tip)?;
        let expected_oid = Oid::from_str(expected_tip)?;

        let current = self.inner.find_reference(&refname)?.peel_to_commit()?.id();
        if current != expected_oid {
            return Err(git2::Error::from_str(&format!(
                "{branch} moved to {current} while expecting {expected_oid}"
            )));
        }

        let target = self.inner.find_commit(new_oid)?;
        if self.head_branch_name()?.as_deref() == Some(branch) {
            self.inner
                .checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))?;
        }
        self.inner.reference_matching(
            &refname,
            new_oid,
            true,
            expected_oid,
            &format!("quill: advance {branch}"),
        )?;
        Ok(())
    }

    fn reset_branch(&self, branch: &str, tip: &str, written: Option<&str>) -> GitResult<bool> {
        let refname = format!("refs/heads/{branch}");
        let commit = self.find_commit(tip)?;
        let written = written.map(Oid::from_str).transpose()?;

        let current = self.inner.find_reference(&refname)?.peel_to_commit()?.id();
        if current != commit.id() && Some(current) != written {
            return Ok(false);
        }

        if current != commit.id() {
            self.inner.reference_matching(
                &refname,
                commit.id(),
                true,
                current,
                &format!("quill: restore {branch}"),
            )?;
        }
        if self.head_branch_name()?.as_deref() == Some(branch) {
            self.inner.reset(
                commit.as_object(),
                ResetType::Hard,
                Some(CheckoutBuilder::new().force()),
            )?;
        }
        Ok(true)
    }
}

impl VersionEngine for Repository {
    #[instrument(skip(self))]
    fn resolve(&self, reference: &str) -> EngineResult<CommitMeta> {
        let object = match self.inner.revparse_single(reference) {
            Ok(object) => object,
            Err(err) if is_lookup_failure(&err) => return Err(EngineError::not_found(reference)),
            Err(err) => return Err(engine_failure(&err)),
        };
        let commit = object
            .peel_to_commit()
            .map_err(|_| EngineError::not_found(reference))?;
        Ok(commit_meta(&commit))
    }

    #[instrument(skip(self, options))]
    fn raw_diff(
        &self,
        old: &str,
        new: &str,
        options: &RawDiffOptions,
    ) -> EngineResult<Vec<RawFileDiff>> {
        self.collect_raw_diff(old, new, options)
            .map_err(|err| engine_failure(&err))
    }

    #[instrument(skip(self))]
    fn ancestry_difference(&self, target: &str, base: &str) -> EngineResult<Vec<CommitMeta>> {
        self.walk_difference(target, base)
            .map_err(|err| engine_failure(&err))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> EngineResult<bool> {
        self.descends(ancestor, descendant)
            .map_err(|err| engine_failure(&err))
    }

    #[instrument(skip(self))]
    fn apply_commit(&self, commit: &str, onto: &str) -> EngineResult<ApplyOutcome> {
        self.cherry_pick_in_memory(commit, onto)
            .map_err(|err| engine_failure(&err))
    }

    #[instrument(skip(self))]
    fn merge_branch(&self, source: &str, onto: &str) -> EngineResult<MergeOutcome> {
        self.merge_in_memory(source, onto)
            .map_err(|err| engine_failure(&err))
    }

    #[instrument(skip(self, commit), fields(tree = commit.tree))]
    fn create_commit(&self, commit: &NewCommit<'_>) -> EngineResult<CommitMeta> {
        self.write_commit(commit).map_err(|err| engine_failure(&err))
    }

    fn head_branch(&self) -> EngineResult<Option<String>> {
        self.head_branch_name().map_err(|err| engine_failure(&err))
    }

    fn dirty_paths(&self) -> EngineResult<Vec<String>> {
        self.tracked_modifications()
            .map_err(|err| engine_failure(&err))
    }

    #[instrument(skip(self))]
    fn advance_branch(&self, branch: &str, new_tip: &str, expected_tip: &str) -> EngineResult<()> {
        self.move_branch(branch, new_tip, expected_tip)
            .map_err(|err| engine_failure(&err))?;
        info!(branch, new_tip, "branch advanced");
        Ok(())
    }

    #[instrument(skip(self))]
    fn restore_branch(
        &self,
        branch: &str,
        tip: &str,
        written: Option<&str>,
    ) -> EngineResult<bool> {
        let restored = self
            .reset_branch(branch, tip, written)
            .map_err(|err| engine_failure(&err))?;
        if restored {
            warn!(branch, tip, "branch restored");
        } else {
            warn!(branch, tip, "branch moved by another writer, left untouched");
        }
        Ok(restored)
    }
}

fn is_unborn(err: &git2::Error) -> bool {
    matches!(
        (err.class(), err.code()),
        (
            ErrorClass::Reference,
            ErrorCode::NotFound | ErrorCode::UnbornBranch
        )
    )
}

fn is_lookup_failure(err: &git2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous
    )
}

fn engine_failure(err: &git2::Error) -> EngineError {
    EngineError::failure(err.message())
}

fn commit_meta(commit: &git2::Commit<'_>) -> CommitMeta {
    let author = commit.author();
    CommitMeta {
        id: commit.id().to_string(),
        tree: commit.tree_id().to_string(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
        summary: commit.summary().unwrap_or_default().to_owned(),
        message: commit.message().unwrap_or_default().to_owned(),
        author: Identity::new(
            author.name().unwrap_or_default(),
            author.email().unwrap_or_default(),
        ),
        time: author.when().seconds(),
    }
}

fn change_kind(delta: &git2::DiffDelta<'_>) -> Option<RawChangeKind> {
    match delta.status() {
        Delta::Added => Some(RawChangeKind::Added),
        Delta::Deleted => Some(RawChangeKind::Deleted),
        Delta::Modified => Some(RawChangeKind::Modified),
        Delta::Renamed => Some(RawChangeKind::Renamed),
        Delta::Copied => Some(RawChangeKind::Copied),
        Delta::Typechange => Some(RawChangeKind::ModeChanged),
        Delta::Unmodified
        | Delta::Ignored
        | Delta::Untracked
        | Delta::Unreadable
        | Delta::Conflicted => None,
    }
}

fn binary_file(delta: &git2::DiffDelta<'_>, kind: RawChangeKind) -> RawFileDiff {
    let (old_path, new_path) = delta_paths(delta, kind);
    RawFileDiff {
        kind,
        old_path,
        new_path,
        is_binary: true,
        hunks: Vec::new(),
    }
}

/// Old and new paths, dropping the side that does not exist.
fn delta_paths(
    delta: &git2::DiffDelta<'_>,
    kind: RawChangeKind,
) -> (Option<String>, Option<String>) {
    let old_path = delta
        .old_file()
        .path()
        .map(display_path)
        .filter(|_| kind != RawChangeKind::Added);
    let new_path = delta
        .new_file()
        .path()
        .map(display_path)
        .filter(|_| kind != RawChangeKind::Deleted);
    (old_path, new_path)
}

fn raw_line(line: &git2::DiffLine<'_>) -> Option<RawLine> {
    let origin = match line.origin() {
        ' ' => LineOrigin::Context,
        '+' => LineOrigin::Addition,
        '-' => LineOrigin::Deletion,
        '=' | '>' | '<' => LineOrigin::NoNewline,
        _ => return None,
    };

    let text = String::from_utf8_lossy(line.content());
    let content = match origin {
        LineOrigin::NoNewline => text.trim().to_owned(),
        _ => text.strip_suffix('\n').unwrap_or(&*text).to_owned(),
    };

    Some(RawLine {
        origin,
        content,
        old_lineno: line.old_lineno(),
        new_lineno: line.new_lineno(),
    })
}

fn hunk_section(header: &[u8]) -> Option<String> {
    let header = String::from_utf8_lossy(header);
    let section = header.splitn(3, "@@").nth(2)?.trim();
    (!section.is_empty()).then(|| section.to_owned())
}

fn conflict_paths(index: &git2::Index) -> GitResult<Vec<String>> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn display_path(path: &Path) -> String {
    path.to_path_buf()
        .into_os_string()
        .to_string_lossy()
        .into_owned()
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
