#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;

use git2::{build::CheckoutBuilder, IndexAddOption, Oid, Repository as GitRepository};
use tempfile::TempDir;

/// Throwaway repository whose initial branch is `main`.
pub struct Fixture {
    pub temp: TempDir,
    pub repo: GitRepository,
    clock: Cell<i64>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("tempdir");
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = GitRepository::init_opts(temp.path(), &opts).expect("init repo");
        Self {
            temp,
            repo,
            clock: Cell::new(1_700_000_000),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, contents).expect("write file");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path().join(relative)).expect("read file")
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.path().join(relative)).expect("remove file");
    }

    pub fn rename(&self, from: &str, to: &str) {
        std::fs::rename(self.path().join(from), self.path().join(to)).expect("rename file");
    }

    /// Stage everything, including deletions, and commit on HEAD.
    pub fn commit(&self, message: &str) -> String {
        self.commit_as(message, "Test Author", "author@example.com")
    }

    pub fn commit_as(&self, message: &str, name: &str, email: &str) -> String {
        let mut index = self.repo.index().expect("index");
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .expect("stage additions");
        index.update_all(["*"], None).expect("stage deletions");
        index.write().expect("write index");
        let tree = self
            .repo
            .find_tree(index.write_tree().expect("write tree"))
            .expect("find tree");

        let seconds = self.clock.get();
        self.clock.set(seconds + 60);
        let signature =
            git2::Signature::new(name, email, &git2::Time::new(seconds, 0)).expect("signature");

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .expect("commit")
            .to_string()
    }

    /// Parentless commit holding a single file, reachable from no ref.
    pub fn orphan_commit(&self, relative: &str, contents: &str, message: &str) -> String {
        let blob = self.repo.blob(contents.as_bytes()).expect("write blob");
        let mut builder = self.repo.treebuilder(None).expect("tree builder");
        builder
            .insert(relative, blob, 0o100_644)
            .expect("insert blob");
        let tree = self
            .repo
            .find_tree(builder.write().expect("write tree"))
            .expect("find tree");

        let seconds = self.clock.get();
        self.clock.set(seconds + 60);
        let signature = git2::Signature::new(
            "Test Author",
            "author@example.com",
            &git2::Time::new(seconds, 0),
        )
        .expect("signature");
        self.repo
            .commit(None, &signature, &signature, message, &tree, &[])
            .expect("commit")
            .to_string()
    }

    pub fn branch(&self, name: &str, at: &str) {
        let commit = self.find_commit(at);
        self.repo.branch(name, &commit, true).expect("create branch");
    }

    pub fn checkout(&self, name: &str) {
        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .expect("set head");
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .expect("checkout head");
    }

    pub fn detach(&self, at: &str) {
        self.repo
            .set_head_detached(Oid::from_str(at).expect("oid"))
            .expect("detach head");
    }

    pub fn tip(&self, branch: &str) -> String {
        self.repo
            .find_reference(&format!("refs/heads/{branch}"))
            .expect("find branch")
            .peel_to_commit()
            .expect("peel branch")
            .id()
            .to_string()
    }

    pub fn find_commit(&self, id: &str) -> git2::Commit<'_> {
        self.repo
            .find_commit(Oid::from_str(id).expect("oid"))
            .expect("find commit")
    }
}
