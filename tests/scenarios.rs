use std::{fs, path::Path};

use lib::{Error, MergeOutcome, Repository};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

/// Runs one command the way the binary does: open, act, flush.
fn with_repo<T>(dir: &Path, f: impl FnOnce(&mut Repository) -> lib::Result<T>) -> lib::Result<T> {
    let mut repo = Repository::open(dir)?;
    let out = f(&mut repo)?;
    repo.flush()?;
    Ok(out)
}

fn add_and_commit(dir: &Path, name: &str, content: &str, message: &str) {
    write(dir, name, content);
    with_repo(dir, |r| r.add(name)).unwrap();
    with_repo(dir, |r| r.commit(message)).unwrap();
}

#[test]
fn merge_takes_the_other_side_without_conflict() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();

    add_and_commit(dir, "a.txt", "hello", "add a");
    with_repo(dir, |r| r.branch("feature")).unwrap();
    add_and_commit(dir, "b.txt", "b", "add b on master");

    with_repo(dir, |r| r.checkout_branch("feature")).unwrap();
    assert!(!dir.join("b.txt").exists());
    add_and_commit(dir, "a.txt", "world", "edit a");

    with_repo(dir, |r| r.checkout_branch("master")).unwrap();
    assert_eq!(read(dir, "a.txt"), "hello");
    let outcome = with_repo(dir, |r| r.merge("feature")).unwrap();
    let (commit, conflict) = match outcome {
        MergeOutcome::Merged { commit, conflict } => (commit, conflict),
        other => panic!("expected a merge commit, got {:?}", other),
    };
    assert!(!conflict);
    assert_eq!(read(dir, "a.txt"), "world");
    assert_eq!(read(dir, "b.txt"), "b");

    let repo = Repository::open(dir).unwrap();
    let merge = repo.commit_by_id(commit).unwrap();
    assert_eq!(repo.refs().head_commit(), commit);
    assert_eq!(merge.message(), "Merged feature into master.");
    let (first, second) = (merge.parent().unwrap(), merge.second_parent().unwrap());
    assert_ne!(first, second);
    assert_eq!(Some(second), repo.refs().branch("feature"));
    assert!(repo.index().is_empty());
}

#[test]
fn merge_marks_conflicting_edits() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "base\n", "add a");
    add_and_commit(dir, "calm.txt", "calm\n", "add calm");
    with_repo(dir, |r| r.branch("other")).unwrap();
    add_and_commit(dir, "a.txt", "master\n", "master edit");

    with_repo(dir, |r| r.checkout_branch("other")).unwrap();
    add_and_commit(dir, "a.txt", "other\n", "other edit");
    with_repo(dir, |r| r.checkout_branch("master")).unwrap();

    let outcome = with_repo(dir, |r| r.merge("other")).unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged { conflict: true, .. }));
    assert_eq!(
        read(dir, "a.txt"),
        "<<<<<<< HEAD\nmaster\n=======\nother\n>>>>>>>\n"
    );
    let marked: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().unwrap().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| read(dir, name).contains("<<<<<<<"))
        .collect();
    assert_eq!(marked, vec!["a.txt".to_string()]);

    // the conflicted file was committed with the marker content
    let repo = Repository::open(dir).unwrap();
    let head = repo.head_commit().unwrap();
    assert!(head.is_merge());
    let content = repo.blob_content(head.blob("a.txt").unwrap()).unwrap();
    assert_eq!(content, fs::read(dir.join("a.txt")).unwrap());
}

#[test]
fn merge_conflict_against_a_deletion() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "base\n", "add a");
    with_repo(dir, |r| r.branch("other")).unwrap();
    add_and_commit(dir, "a.txt", "mine\n", "edit a");
    with_repo(dir, |r| r.checkout_branch("other")).unwrap();
    with_repo(dir, |r| r.rm("a.txt")).unwrap();
    with_repo(dir, |r| r.commit("drop a")).unwrap();
    with_repo(dir, |r| r.checkout_branch("master")).unwrap();

    let outcome = with_repo(dir, |r| r.merge("other")).unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged { conflict: true, .. }));
    assert_eq!(read(dir, "a.txt"), "<<<<<<< HEAD\nmine\n=======\n>>>>>>>\n");
}

#[test]
fn merge_removes_files_the_other_side_deleted() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "add a");
    add_and_commit(dir, "b.txt", "b", "add b");
    with_repo(dir, |r| r.branch("other")).unwrap();
    add_and_commit(dir, "c.txt", "c", "add c");
    with_repo(dir, |r| r.checkout_branch("other")).unwrap();
    with_repo(dir, |r| r.rm("b.txt")).unwrap();
    with_repo(dir, |r| r.commit("drop b")).unwrap();
    with_repo(dir, |r| r.checkout_branch("master")).unwrap();

    let outcome = with_repo(dir, |r| r.merge("other")).unwrap();
    assert!(matches!(outcome, MergeOutcome::Merged { conflict: false, .. }));
    assert!(!dir.join("b.txt").exists());
    let head = Repository::open(dir).unwrap().head_commit().unwrap();
    let files: Vec<&str> = head.files().keys().map(String::as_str).collect();
    assert_eq!(files, vec!["a.txt", "c.txt"]);
}

#[test]
fn merge_fast_forwards_and_detects_ancestors() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "add a");
    with_repo(dir, |r| r.branch("ahead")).unwrap();
    with_repo(dir, |r| r.checkout_branch("ahead")).unwrap();
    add_and_commit(dir, "b.txt", "b", "add b");
    let ahead_tip = Repository::open(dir).unwrap().refs().head_commit();
    with_repo(dir, |r| r.checkout_branch("master")).unwrap();

    let commits_before = Repository::open(dir).unwrap().global_log().unwrap().len();
    let outcome = with_repo(dir, |r| r.merge("ahead")).unwrap();
    assert_eq!(outcome, MergeOutcome::FastForwarded);
    let repo = Repository::open(dir).unwrap();
    assert_eq!(repo.refs().head(), "master");
    assert_eq!(repo.refs().head_commit(), ahead_tip);
    assert_eq!(repo.global_log().unwrap().len(), commits_before);
    assert_eq!(read(dir, "b.txt"), "b");

    // now master contains ahead entirely
    with_repo(dir, |r| r.checkout_branch("ahead")).unwrap();
    add_and_commit(dir, "c.txt", "c", "add c");
    with_repo(dir, |r| r.checkout_branch("master")).unwrap();
    with_repo(dir, |r| r.branch("old")).unwrap();
    with_repo(dir, |r| r.merge("ahead")).unwrap();
    let outcome = with_repo(dir, |r| r.merge("old")).unwrap();
    assert_eq!(outcome, MergeOutcome::AlreadyMerged);
}

#[test]
fn merge_preconditions() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "add a");
    with_repo(dir, |r| r.branch("other")).unwrap();

    assert!(matches!(
        with_repo(dir, |r| r.merge("nope")),
        Err(Error::NoSuchBranch)
    ));
    assert!(matches!(
        with_repo(dir, |r| r.merge("master")),
        Err(Error::MergeWithSelf)
    ));

    write(dir, "staged.txt", "s");
    with_repo(dir, |r| r.add("staged.txt")).unwrap();
    assert!(matches!(
        with_repo(dir, |r| r.merge("other")),
        Err(Error::UncommittedChanges)
    ));
    with_repo(dir, |r| r.rm("staged.txt")).unwrap();

    // staged.txt is still on disk and now untracked
    assert!(matches!(
        with_repo(dir, |r| r.merge("other")),
        Err(Error::UntrackedFileConflict)
    ));
    assert_eq!(read(dir, "staged.txt"), "s");
}

#[test]
fn removing_an_unknown_file_leaves_the_index_alone() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    write(dir, "staged.txt", "s");
    with_repo(dir, |r| r.add("staged.txt")).unwrap();
    write(dir, "stray.txt", "x");

    let before = Repository::open(dir).unwrap().index().clone();
    let err = with_repo(dir, |r| r.rm("stray.txt")).unwrap_err();
    assert!(matches!(err, Error::NothingToRemove));
    assert_eq!(err.to_string(), "No reason to remove the file.");
    assert_eq!(Repository::open(dir).unwrap().index(), &before);
    assert!(dir.join("stray.txt").exists());
}

#[test]
fn snapshot_round_trip_through_reset() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    write(dir, "a.txt", "a");
    write(dir, "b.txt", "b");
    with_repo(dir, |r| r.add("a.txt")).unwrap();
    with_repo(dir, |r| r.add("b.txt")).unwrap();
    let original = with_repo(dir, |r| r.commit("snapshot")).unwrap();

    let initial = Repository::open(dir).unwrap().log().unwrap().pop().unwrap();
    with_repo(dir, |r| r.reset(&initial.uid().to_string())).unwrap();
    assert!(!dir.join("a.txt").exists());

    let prefix = original.uid().short(8);
    for name in original.files().keys() {
        with_repo(dir, |r| r.checkout_file_in(&prefix, name)).unwrap();
        with_repo(dir, |r| r.add(name)).unwrap();
    }
    let again = with_repo(dir, |r| r.commit("snapshot again")).unwrap();
    assert_eq!(again.files(), original.files());
}

#[test]
fn checkout_and_reset_refuse_to_clobber_untracked_files() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "add a");
    with_repo(dir, |r| r.branch("other")).unwrap();
    write(dir, "loose.txt", "precious");

    assert!(matches!(
        with_repo(dir, |r| r.checkout_branch("other")),
        Err(Error::UntrackedFileConflict)
    ));
    let head = Repository::open(dir).unwrap().refs().head_commit().to_string();
    assert!(matches!(
        with_repo(dir, |r| r.reset(&head)),
        Err(Error::UntrackedFileConflict)
    ));
    assert_eq!(read(dir, "loose.txt"), "precious");
    assert_eq!(Repository::open(dir).unwrap().refs().head(), "master");
}

#[test]
fn checkout_errors() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "add a");
    assert!(matches!(
        with_repo(dir, |r| r.checkout_branch("nope")),
        Err(Error::NoSuchCheckoutBranch)
    ));
    assert!(matches!(
        with_repo(dir, |r| r.checkout_branch("master")),
        Err(Error::AlreadyOnBranch)
    ));
    assert!(matches!(
        with_repo(dir, |r| r.checkout_file("missing.txt")),
        Err(Error::FileNotInCommit)
    ));
    assert!(matches!(
        with_repo(dir, |r| r.checkout_file_in("ffffffffffff", "a.txt")),
        Err(Error::AmbiguousOrNotFound(_))
    ));

    write(dir, "a.txt", "scribbled");
    with_repo(dir, |r| r.checkout_file("a.txt")).unwrap();
    assert_eq!(read(dir, "a.txt"), "a");
}

#[test]
fn log_find_and_branches() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "a.txt", "a", "same message");
    add_and_commit(dir, "b.txt", "b", "same message");

    let repo = Repository::open(dir).unwrap();
    let log: Vec<String> = repo
        .log()
        .unwrap()
        .iter()
        .map(|c| c.message().to_string())
        .collect();
    assert_eq!(log, vec!["same message", "same message", "initial commit"]);
    assert_eq!(repo.global_log().unwrap().len(), 3);
    assert_eq!(repo.find("same message").unwrap().len(), 2);
    assert!(matches!(repo.find("nothing"), Err(Error::NoMatchingCommit)));

    with_repo(dir, |r| r.branch("x")).unwrap();
    assert!(matches!(with_repo(dir, |r| r.branch("x")), Err(Error::BranchExists)));
    assert!(matches!(
        with_repo(dir, |r| r.rm_branch("master")),
        Err(Error::CannotDeleteCurrent)
    ));
    with_repo(dir, |r| r.rm_branch("x")).unwrap();
    assert!(matches!(
        with_repo(dir, |r| r.rm_branch("x")),
        Err(Error::NoSuchBranch)
    ));
}

#[test]
fn status_reports_every_section() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    Repository::init(dir).unwrap();
    add_and_commit(dir, "tracked.txt", "t", "add tracked");
    add_and_commit(dir, "doomed.txt", "d", "add doomed");
    add_and_commit(dir, "vanished.txt", "v", "add vanished");
    with_repo(dir, |r| r.branch("other")).unwrap();

    write(dir, "new.txt", "n");
    with_repo(dir, |r| r.add("new.txt")).unwrap();
    with_repo(dir, |r| r.rm("doomed.txt")).unwrap();
    write(dir, "tracked.txt", "changed");
    fs::remove_file(dir.join("vanished.txt")).unwrap();
    write(dir, "loose.txt", "l");

    let status = Repository::open(dir).unwrap().status().unwrap();
    assert_eq!(
        status.to_string(),
        "=== Branches ===\n*master\nother\n\n\
         === Staged Files ===\nnew.txt\n\n\
         === Removed Files ===\ndoomed.txt\n\n\
         === Modifications Not Staged For Commit ===\n\
         tracked.txt (modified)\nvanished.txt (deleted)\n\n\
         === Untracked Files ===\nloose.txt\n\n"
    );
}
