use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

fn revlet(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_revlet"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

/// Asserts what a command printed on stdout and whether it exited cleanly.
fn expect(dir: &Path, args: &[&str], printed: &str, success: bool) -> Output {
    let output = revlet(dir, args);
    assert_eq!(stdout(&output), printed, "stdout of {:?}", args);
    assert_eq!(output.status.success(), success, "exit status of {:?}", args);
    output
}

fn expect_success(dir: &Path, args: &[&str]) -> Output {
    let output = revlet(dir, args);
    assert!(output.status.success(), "exit status of {:?}", args);
    output
}

#[test]
fn test_argument_errors_exit_nonzero() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    expect(dir, &["init"], "", true);

    expect(dir, &[], "Please enter a command.\n", false);
    expect(dir, &["bogus"], "No command with that name exists.\n", false);
    expect(dir, &["commit"], "Incorrect operands.\n", false);
    expect(dir, &["checkout"], "Incorrect operands.\n", false);
    expect(dir, &["checkout", "--", "a.txt", "b.txt"], "Incorrect operands.\n", false);
    expect(dir, &["add", "a.txt", "b.txt"], "Incorrect operands.\n", false);
}

#[test]
fn test_user_errors_exit_zero() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    expect(dir, &["status"], "Not in an initialized Gitlet directory.\n", true);
    expect(dir, &["init"], "", true);
    expect(
        dir,
        &["init"],
        "A Gitlet version-control system already exists in the current directory.\n",
        true,
    );
    expect(dir, &["rm", "nope"], "No reason to remove the file.\n", true);
    expect(dir, &["commit", ""], "Please enter a commit message.\n", true);
    expect(dir, &["commit", "nothing"], "No changes added to the commit.\n", true);
    expect(dir, &["merge", "nope"], "A branch with that name does not exist.\n", true);
}

#[test]
fn test_state_is_kept_only_after_success() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    expect(dir, &["init"], "", true);
    fs::write(dir.join("a.txt"), "hello").unwrap();
    expect(dir, &["add", "a.txt"], "", true);
    expect(dir, &["rm", "b.txt"], "No reason to remove the file.\n", true);
    expect(dir, &["branch", "side"], "", true);
    expect(
        dir,
        &["status"],
        "=== Branches ===\n*master\nside\n\n\
         === Staged Files ===\na.txt\n\n\
         === Removed Files ===\n\n\
         === Modifications Not Staged For Commit ===\n\n\
         === Untracked Files ===\n\n",
        true,
    );

    expect(dir, &["commit", "add a"], "", true);
    let log = stdout(&expect_success(dir, &["log"]));
    assert!(log.starts_with("===\ncommit "));
    assert!(log.contains("\nadd a\n\n===\n"));
    assert!(log.ends_with("\ninitial commit\n\n"));
    expect(dir, &["find", "no such message"], "Found no commit with that message.\n", true);
}

#[test]
fn test_merge_conflict_is_reported() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    expect(dir, &["init"], "", true);
    fs::write(dir.join("a.txt"), "base\n").unwrap();
    expect(dir, &["add", "a.txt"], "", true);
    expect(dir, &["commit", "add a"], "", true);
    expect(dir, &["branch", "other"], "", true);
    fs::write(dir.join("a.txt"), "master\n").unwrap();
    expect(dir, &["add", "a.txt"], "", true);
    expect(dir, &["commit", "master edit"], "", true);
    expect(dir, &["checkout", "other"], "", true);
    fs::write(dir.join("a.txt"), "other\n").unwrap();
    expect(dir, &["add", "a.txt"], "", true);
    expect(dir, &["commit", "other edit"], "", true);
    expect(dir, &["checkout", "master"], "", true);

    expect(dir, &["merge", "other"], "Encountered a merge conflict.\n", true);
    assert_eq!(
        fs::read_to_string(dir.join("a.txt")).unwrap(),
        "<<<<<<< HEAD\nmaster\n=======\nother\n>>>>>>>\n"
    );
    expect(
        dir,
        &["merge", "other"],
        "Given branch is an ancestor of the current branch.\n",
        true,
    );
}

#[test]
fn test_dir_option_selects_the_repository() {
    let tempdir = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let repo = tempdir.path().to_str().unwrap();
    expect(elsewhere.path(), &["-C", repo, "init"], "", true);
    assert!(tempdir.path().join(".rev").is_dir());
    assert!(!elsewhere.path().join(".rev").exists());
    expect(
        elsewhere.path(),
        &["status", "--dir", repo],
        "=== Branches ===\n*master\n\n\
         === Staged Files ===\n\n\
         === Removed Files ===\n\n\
         === Modifications Not Staged For Commit ===\n\n\
         === Untracked Files ===\n\n",
        true,
    );
}

#[test]
fn test_fatal_errors_go_to_stderr() {
    let tempdir = tempfile::tempdir().unwrap();
    let dir = tempdir.path();
    expect(dir, &["init"], "", true);
    fs::write(dir.join(".rev").join("HEAD"), "ghost").unwrap();
    let output = expect(dir, &["status"], "", false);
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("fatal: corrupt repository state"), "{}", stderr);
}
