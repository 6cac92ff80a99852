mod common;

use std::cell::RefCell;

use common::Fixture;
use quill_core::{
    config::IntegrationConfig, diff::DiffEngine, integrate::IntegrationEngine,
    repository::Repository, Error, IntegrationResult, Result, VersionEngine,
};
use quill_engine_api::{
    ApplyOutcome, CommitMeta, EngineResult, MergeOutcome, NewCommit, RawDiffOptions, RawFileDiff,
};

fn engine() -> IntegrationEngine {
    IntegrationEngine::from_config(
        &IntegrationConfig {
            committer_name: "Editorial Desk".into(),
            committer_email: "desk@example.com".into(),
            ..IntegrationConfig::default()
        },
        DiffEngine::new(),
    )
}

/// `main` and `feature` share a base holding `a.md` and `b.md`.
fn diverged_fixture() -> (Fixture, String) {
    let fixture = Fixture::new();
    fixture.write("a.md", "Hello\n");
    fixture.write("b.md", "World\n");
    let base = fixture.commit("Base");
    fixture.branch("feature", &base);
    (fixture, base)
}

#[test]
fn clean_cherry_pick_advances_branch() -> Result<()> {
    let (fixture, base) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("b.md", "Wide world\n");
    let picked = fixture.commit_as("Widen the world", "Ada Writer", "ada@example.com");

    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");
    assert_ne!(tip, base);

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, &picked)?;

    let IntegrationResult::Applied {
        new_commit,
        fast_forward,
        ..
    } = result
    else {
        panic!("expected applied, got {result:?}");
    };
    assert!(!fast_forward);
    assert_eq!(new_commit.name, "main");
    assert_eq!(fixture.tip("main"), new_commit.id);

    let created = fixture.find_commit(&new_commit.id);
    assert_eq!(created.parent_id(0).expect("parent").to_string(), tip);
    assert_eq!(created.author().name(), Some("Ada Writer"));
    assert_eq!(created.committer().name(), Some("Editorial Desk"));
    assert!(created
        .message()
        .expect("message")
        .contains(&format!("(cherry picked from commit {picked})")));

    assert_eq!(fixture.read("a.md"), "Hello there\n");
    assert_eq!(fixture.read("b.md"), "Wide world\n");

    let files = DiffEngine::new().compare(&repository, &tip, &new_commit.id)?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].new_path, "b.md");
    Ok(())
}

#[test]
fn root_commit_is_picked_against_the_empty_tree() -> Result<()> {
    let (fixture, base) = diverged_fixture();
    let orphan = fixture.orphan_commit("appendix.md", "Sources\n", "Start appendix");
    fixture.checkout("main");

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, &orphan)?;

    let IntegrationResult::Applied { new_commit, .. } = result else {
        panic!("expected applied, got {result:?}");
    };
    assert_eq!(fixture.tip("main"), new_commit.id);
    assert_eq!(fixture.read("appendix.md"), "Sources\n");
    assert_eq!(fixture.read("a.md"), "Hello\n");

    let files = DiffEngine::new().compare(&repository, &base, &new_commit.id)?;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].new_path, "appendix.md");
    Ok(())
}

/// Delegates to a real repository, but lands a commit on `main` from a
/// second handle just before the branch is advanced.
struct InterleavedWriter<'a> {
    repository: &'a Repository,
    fixture: &'a Fixture,
    interleaved: RefCell<Option<String>>,
}

impl VersionEngine for InterleavedWriter<'_> {
    fn resolve(&self, reference: &str) -> EngineResult<CommitMeta> {
        self.repository.resolve(reference)
    }

    fn raw_diff(
        &self,
        old: &str,
        new: &str,
        options: &RawDiffOptions,
    ) -> EngineResult<Vec<RawFileDiff>> {
        self.repository.raw_diff(old, new, options)
    }

    fn ancestry_difference(&self, target: &str, base: &str) -> EngineResult<Vec<CommitMeta>> {
        self.repository.ancestry_difference(target, base)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> EngineResult<bool> {
        self.repository.is_ancestor(ancestor, descendant)
    }

    fn apply_commit(&self, commit: &str, onto: &str) -> EngineResult<ApplyOutcome> {
        self.repository.apply_commit(commit, onto)
    }

    fn merge_branch(&self, source: &str, onto: &str) -> EngineResult<MergeOutcome> {
        self.repository.merge_branch(source, onto)
    }

    fn create_commit(&self, commit: &NewCommit<'_>) -> EngineResult<CommitMeta> {
        self.repository.create_commit(commit)
    }

    fn head_branch(&self) -> EngineResult<Option<String>> {
        self.repository.head_branch()
    }

    fn dirty_paths(&self) -> EngineResult<Vec<String>> {
        self.repository.dirty_paths()
    }

    fn advance_branch(&self, branch: &str, new_tip: &str, expected_tip: &str) -> EngineResult<()> {
        self.fixture.write("c.md", "Written elsewhere\n");
        let id = self.fixture.commit("Concurrent edit");
        *self.interleaved.borrow_mut() = Some(id);
        self.repository.advance_branch(branch, new_tip, expected_tip)
    }

    fn restore_branch(
        &self,
        branch: &str,
        tip: &str,
        written: Option<&str>,
    ) -> EngineResult<bool> {
        self.repository.restore_branch(branch, tip, written)
    }
}

#[test]
fn concurrent_commit_survives_a_failed_cherry_pick() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("b.md", "Wide world\n");
    let picked = fixture.commit("Widen the world");
    fixture.checkout("main");

    let repository = Repository::open(fixture.path())?;
    let writer = InterleavedWriter {
        repository: &repository,
        fixture: &fixture,
        interleaved: RefCell::new(None),
    };
    let result = engine().cherry_pick(&writer, &picked)?;

    let IntegrationResult::Failed { cause } = result else {
        panic!("expected failed, got {result:?}");
    };
    assert!(cause.contains("left untouched"));

    let interleaved = writer.interleaved.borrow().clone().expect("interleaved commit");
    assert_eq!(fixture.tip("main"), interleaved);
    assert_eq!(fixture.read("c.md"), "Written elsewhere\n");
    assert_eq!(fixture.read("b.md"), "World\n");
    Ok(())
}

#[test]
fn conflicting_cherry_pick_leaves_tip_unchanged() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("a.md", "Goodbye\n");
    let picked = fixture.commit("Say goodbye");

    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, &picked)?;

    let IntegrationResult::Conflict {
        conflicting_paths,
        previews,
    } = result
    else {
        panic!("expected conflict, got {result:?}");
    };
    assert_eq!(conflicting_paths, vec!["a.md"]);
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].new_path, "a.md");

    assert_eq!(fixture.tip("main"), tip);
    assert_eq!(fixture.read("a.md"), "Hello there\n");
    Ok(())
}

#[test]
fn picking_a_contained_commit_is_a_no_op() -> Result<()> {
    let (fixture, base) = diverged_fixture();
    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, &base)?;
    assert!(matches!(result, IntegrationResult::NoOp { .. }));
    assert_eq!(fixture.tip("main"), tip);
    Ok(())
}

#[test]
fn unknown_commit_is_reported() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("main");

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, "not-a-commit");
    assert!(matches!(
        result,
        Err(Error::CommitNotFound { ref reference }) if reference == "not-a-commit"
    ));
    Ok(())
}

#[test]
fn detached_head_is_rejected() -> Result<()> {
    let (fixture, base) = diverged_fixture();
    fixture.detach(&base);

    let repository = Repository::open(fixture.path())?;
    let result = engine().integrate_branch(&repository, "feature");
    assert!(matches!(result, Err(Error::DetachedState)));
    Ok(())
}

#[test]
fn dirty_working_tree_is_rejected() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("b.md", "Wide world\n");
    let picked = fixture.commit("Widen the world");
    fixture.checkout("main");
    fixture.write("a.md", "unsaved edit\n");

    let repository = Repository::open(fixture.path())?;
    let result = engine().cherry_pick(&repository, &picked);
    assert!(matches!(
        result,
        Err(Error::DirtyWorkingTree { ref paths }) if paths == &["a.md"]
    ));
    assert_eq!(fixture.read("a.md"), "unsaved edit\n");
    Ok(())
}

#[test]
fn fast_forward_moves_branch_to_source() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("c.md", "Epilogue\n");
    let source_tip = fixture.commit("Add epilogue");
    fixture.checkout("main");

    let repository = Repository::open(fixture.path())?;
    let result = engine().integrate_branch(&repository, "feature")?;
    assert!(matches!(
        result,
        IntegrationResult::Applied { ref new_commit, fast_forward: true, .. }
            if new_commit.id == source_tip
    ));
    assert_eq!(fixture.tip("main"), source_tip);
    assert_eq!(fixture.read("c.md"), "Epilogue\n");
    Ok(())
}

#[test]
fn merging_an_ancestor_is_a_no_op() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");

    let repository = Repository::open(fixture.path())?;
    let result = engine().integrate_branch(&repository, "feature")?;
    assert!(matches!(result, IntegrationResult::NoOp { .. }));
    assert_eq!(fixture.tip("main"), tip);
    Ok(())
}

#[test]
fn diverged_branches_get_a_merge_commit() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("b.md", "Wide world\n");
    let source_tip = fixture.commit("Widen the world");
    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");

    let repository = Repository::open(fixture.path())?;
    let result = engine().integrate_branch(&repository, "feature")?;

    let IntegrationResult::Applied {
        new_commit,
        fast_forward,
        ..
    } = result
    else {
        panic!("expected applied, got {result:?}");
    };
    assert!(!fast_forward);
    assert_eq!(fixture.tip("main"), new_commit.id);

    let merge = fixture.find_commit(&new_commit.id);
    let parents: Vec<String> = merge.parent_ids().map(|id| id.to_string()).collect();
    assert_eq!(parents, vec![tip, source_tip]);
    assert_eq!(merge.message(), Some("Merge branch 'feature'"));
    assert_eq!(fixture.read("a.md"), "Hello there\n");
    assert_eq!(fixture.read("b.md"), "Wide world\n");
    Ok(())
}

#[test]
fn merge_conflict_leaves_tip_unchanged() -> Result<()> {
    let (fixture, _) = diverged_fixture();
    fixture.checkout("feature");
    fixture.write("a.md", "Goodbye\n");
    fixture.commit("Say goodbye");
    fixture.checkout("main");
    fixture.write("a.md", "Hello there\n");
    let tip = fixture.commit("Greet warmly");

    let repository = Repository::open(fixture.path())?;
    let result = engine().integrate_branch(&repository, "feature")?;
    assert_eq!(result.conflicting_paths(), Some(&["a.md".to_owned()][..]));
    assert_eq!(fixture.tip("main"), tip);
    assert_eq!(fixture.read("a.md"), "Hello there\n");
    Ok(())
}
