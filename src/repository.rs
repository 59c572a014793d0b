//! The version-control engine.
//!
//! A [`Repository`] is opened once per command. It owns the mutable state
//! (the staging [`Index`] and the branch [`Refs`]), checks every
//! precondition of an operation before touching anything, and only writes
//! that state back when [`Repository::flush`] is called. Blobs and commits
//! are write-once and go straight to their stores.

use std::path::Path;

use chrono::Local;

use crate::{
    blob::Blob,
    commit::Commit,
    commit_graph::CommitGraph,
    dot_rev::{read_json, write_json, DotRev},
    error::{Error, Result},
    index::{Index, Removal},
    merge::{self, Resolution},
    object_id::ObjectId,
    object_store::{directory::DirectoryObjectStore, JsonStore, ObjectStore},
    refs::Refs,
    status::Status,
    workdir::WorkDir,
};

pub struct Repository {
    dot_rev: DotRev,
    work_dir: WorkDir,
    blobs: DirectoryObjectStore,
    commits: DirectoryObjectStore,
    staging: DirectoryObjectStore,
    index: Index,
    refs: Refs,
}

/// How a merge finished, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The target is already reachable from head; nothing changed.
    AlreadyMerged,
    /// Head was an ancestor of the target; the current branch now points at
    /// the target's tip.
    FastForwarded,
    /// A two-parent merge commit was created.
    Merged { commit: ObjectId, conflict: bool },
}

impl Repository {
    /// Creates a repository in `work_dir` holding only the initial commit on
    /// the default branch.
    pub fn init(work_dir: &Path) -> Result<Self> {
        let dot_rev = DotRev::init(work_dir)?;
        let initial = Commit::initial()?;
        dot_rev.commits()?.insert_json(initial.uid(), &initial)?;
        let repository = Self::assemble(work_dir, dot_rev, Index::default(), Refs::new(initial.uid()))?;
        repository.flush()?;
        Ok(repository)
    }

    pub fn open(work_dir: &Path) -> Result<Self> {
        let dot_rev = DotRev::existing(work_dir)?;
        let index = read_json(&dot_rev.index_path())?;
        let refs = Refs::load(&dot_rev)?;
        Self::assemble(work_dir, dot_rev, index, refs)
    }

    fn assemble(work_dir: &Path, dot_rev: DotRev, index: Index, refs: Refs) -> Result<Self> {
        Ok(Repository {
            work_dir: WorkDir::new(work_dir.to_path_buf(), dot_rev.ignores()?),
            blobs: dot_rev.blobs()?,
            commits: dot_rev.commits()?,
            staging: dot_rev.staging()?,
            dot_rev,
            index,
            refs,
        })
    }

    /// Persists the index and the branch table.
    pub fn flush(&self) -> Result<()> {
        write_json(&self.index, &self.dot_rev.index_path())?;
        self.refs.save(&self.dot_rev)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn work_dir(&self) -> &WorkDir {
        &self.work_dir
    }

    pub fn commit_by_id(&self, id: ObjectId) -> Result<Commit> {
        self.commits.read_json(id)
    }

    pub fn head_commit(&self) -> Result<Commit> {
        self.commit_by_id(self.refs.head_commit())
    }

    /// Looks a commit up by its id or any unique prefix of it.
    pub fn resolve_commit(&self, prefix: &str) -> Result<Commit> {
        let id = self.commits.resolve_prefix(prefix)?;
        self.commit_by_id(id)
    }

    /// Stored content of a blob.
    pub fn blob_content(&self, id: ObjectId) -> Result<Vec<u8>> {
        match self.blobs.read(id)? {
            Some(content) => Ok(content),
            None => self.staging.read(id)?.ok_or(Error::MissingObject(id)),
        }
    }

    fn graph(&self) -> CommitGraph<impl Fn(ObjectId) -> Result<Commit> + '_> {
        CommitGraph::new(move |id| self.commit_by_id(id))
    }

    pub fn add(&mut self, name: &str) -> Result<()> {
        let blob = self.work_dir.blob(name)?.ok_or(Error::FileDoesNotExist)?;
        let head = self.head_commit()?;
        self.index
            .stage_add(&blob, &head, &mut self.staging, &self.blobs)
    }

    pub fn rm(&mut self, name: &str) -> Result<()> {
        let head = self.head_commit()?;
        if self.index.stage_remove(name, &head, &mut self.staging)? == Removal::Untracked {
            self.work_dir.delete(name)?;
        }
        Ok(())
    }

    pub fn commit(&mut self, message: &str) -> Result<Commit> {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if self.index.is_empty() {
            return Err(Error::NoChanges);
        }
        self.commit_index(message, None)
    }

    /// Turns the index into a child of the head commit and advances the
    /// current branch to it.
    fn commit_index(&mut self, message: &str, second_parent: Option<ObjectId>) -> Result<Commit> {
        let head = self.head_commit()?;
        let commit = Commit::child(
            message,
            &head,
            second_parent,
            self.index.staged(),
            self.index.removed(),
            Local::now().fixed_offset(),
        )?;
        self.index.flush_staged(&mut self.staging, &mut self.blobs)?;
        if !self.commits.insert_json(commit.uid(), &commit)? {
            log::warn!("commit {} already stored", commit.uid());
        }
        self.refs.move_current_branch(commit.uid());
        self.index.clear(&mut self.staging)?;
        log::info!("committed {} on {}", commit.uid(), self.refs.head());
        Ok(commit)
    }

    /// The head commit and its first-parent ancestry.
    pub fn log(&self) -> Result<Vec<Commit>> {
        self.graph().first_parent_chain(&self.head_commit()?)
    }

    /// Every commit ever made, in id order.
    pub fn global_log(&self) -> Result<Vec<Commit>> {
        self.commits
            .ids()?
            .into_iter()
            .map(|id| self.commit_by_id(id))
            .collect()
    }

    /// Ids of the commits carrying exactly `message`.
    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        let found: Vec<ObjectId> = self
            .global_log()?
            .into_iter()
            .filter(|commit| commit.message() == message)
            .map(|commit| commit.uid())
            .collect();
        if found.is_empty() {
            return Err(Error::NoMatchingCommit);
        }
        Ok(found)
    }

    pub fn status(&self) -> Result<Status> {
        Status::compute(&self.refs, &self.index, &self.head_commit()?, &self.work_dir)
    }

    /// Restores the head commit's version of `name`.
    pub fn checkout_file(&self, name: &str) -> Result<()> {
        self.work_dir
            .checkout_file(&self.head_commit()?, name, &self.blobs)
    }

    /// Restores the version of `name` from the commit `prefix` names.
    pub fn checkout_file_in(&self, prefix: &str, name: &str) -> Result<()> {
        let commit = self.resolve_commit(prefix)?;
        self.work_dir.checkout_file(&commit, name, &self.blobs)
    }

    pub fn checkout_branch(&mut self, name: &str) -> Result<()> {
        let target = self.refs.branch(name).ok_or(Error::NoSuchCheckoutBranch)?;
        if self.refs.head() == name {
            return Err(Error::AlreadyOnBranch);
        }
        let head = self.head_commit()?;
        self.work_dir.ensure_no_untracked(&head, &self.index)?;
        let target = self.commit_by_id(target)?;
        self.work_dir.materialize(&target, &self.blobs)?;
        self.index.clear(&mut self.staging)?;
        self.refs.switch_head(name)
    }

    pub fn branch(&mut self, name: &str) -> Result<()> {
        self.refs.create_branch(name)
    }

    pub fn rm_branch(&mut self, name: &str) -> Result<()> {
        self.refs.delete_branch(name)
    }

    /// Moves the current branch to the commit `prefix` names and checks it
    /// out.
    pub fn reset(&mut self, prefix: &str) -> Result<()> {
        let target = self.resolve_commit(prefix)?;
        let head = self.head_commit()?;
        self.work_dir.ensure_no_untracked(&head, &self.index)?;
        self.move_to(&target)
    }

    fn move_to(&mut self, target: &Commit) -> Result<()> {
        self.work_dir.materialize(target, &self.blobs)?;
        self.index.clear(&mut self.staging)?;
        self.refs.move_current_branch(target.uid());
        Ok(())
    }

    /// Merges the branch `name` into the current branch.
    pub fn merge(&mut self, name: &str) -> Result<MergeOutcome> {
        if !self.index.is_empty() {
            return Err(Error::UncommittedChanges);
        }
        let target = self.refs.branch(name).ok_or(Error::NoSuchBranch)?;
        if self.refs.head() == name {
            return Err(Error::MergeWithSelf);
        }
        let head = self.head_commit()?;
        self.work_dir.ensure_no_untracked(&head, &self.index)?;

        let target = self.commit_by_id(target)?;
        let split = self.graph().split_point(&head, &target)?;
        if split.uid() == target.uid() {
            return Ok(MergeOutcome::AlreadyMerged);
        }
        if split.uid() == head.uid() {
            self.move_to(&target)?;
            return Ok(MergeOutcome::FastForwarded);
        }

        let mut take_target = Vec::new();
        let mut conflict = false;
        for (file, resolution) in merge::plan(&split, &head, &target) {
            match resolution {
                Resolution::TakeTarget(blob) => {
                    self.index.stage_stored(&file, blob);
                    take_target.push(file);
                }
                Resolution::Remove => self.rm(&file)?,
                Resolution::Conflict { head: ours, target: theirs } => {
                    conflict = true;
                    let ours = self.optional_content(ours)?;
                    let theirs = self.optional_content(theirs)?;
                    let content = merge::conflict_content(&ours, &theirs);
                    self.work_dir.write(&file, &content)?;
                    let blob = Blob::new(file, content);
                    self.index
                        .stage_add(&blob, &head, &mut self.staging, &self.blobs)?;
                }
            }
        }

        let message = format!("Merged {} into {}.", name, self.refs.head());
        let commit = self.commit_index(&message, Some(target.uid()))?;
        for file in take_target {
            self.work_dir.checkout_file(&commit, &file, &self.blobs)?;
        }
        Ok(MergeOutcome::Merged {
            commit: commit.uid(),
            conflict,
        })
    }

    fn optional_content(&self, blob: Option<ObjectId>) -> Result<Vec<u8>> {
        match blob {
            Some(id) => self.blob_content(id),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_init_and_reopen() {
    let tempdir = tempfile::tempdir().unwrap();
    let repo = Repository::init(tempdir.path()).unwrap();
    let head = repo.head_commit().unwrap();
    assert!(head.is_initial());
    assert!(matches!(
        Repository::init(tempdir.path()),
        Err(Error::AlreadyInitialized)
    ));
    let reopened = Repository::open(tempdir.path()).unwrap();
    assert_eq!(reopened.head_commit().unwrap(), head);
    assert_eq!(reopened.refs().head(), "master");
}

#[test]
fn test_open_uninitialized() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Repository::open(tempdir.path()),
        Err(Error::NotInitialized)
    ));
}

#[test]
fn test_commit_preconditions() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path()).unwrap();
    assert!(matches!(repo.commit("nothing"), Err(Error::NoChanges)));
    write(tempdir.path(), "a.txt", "hello");
    repo.add("a.txt").unwrap();
    assert!(matches!(repo.commit(""), Err(Error::EmptyMessage)));
    assert!(matches!(repo.add("missing.txt"), Err(Error::FileDoesNotExist)));
    let commit = repo.commit("add a").unwrap();
    assert!(repo.index().is_empty());
    assert_eq!(repo.refs().head_commit(), commit.uid());
    assert_eq!(
        repo.blob_content(commit.blob("a.txt").unwrap()).unwrap(),
        b"hello"
    );
}

#[test]
fn test_removal_only_commit() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path()).unwrap();
    write(tempdir.path(), "a.txt", "hello");
    repo.add("a.txt").unwrap();
    repo.commit("add a").unwrap();
    repo.rm("a.txt").unwrap();
    assert!(!tempdir.path().join("a.txt").exists());
    let commit = repo.commit("drop a").unwrap();
    assert!(commit.files().is_empty());
}

#[test]
fn test_flush_round_trip() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path()).unwrap();
    write(tempdir.path(), "a.txt", "hello");
    repo.add("a.txt").unwrap();
    repo.branch("side").unwrap();
    repo.flush().unwrap();
    let reopened = Repository::open(tempdir.path()).unwrap();
    assert_eq!(reopened.index(), repo.index());
    assert_eq!(reopened.refs().branch("side"), Some(repo.refs().head_commit()));
}

#[test]
fn test_unflushed_state_is_discarded() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(tempdir.path()).unwrap();
    repo.branch("side").unwrap();
    drop(repo);
    let reopened = Repository::open(tempdir.path()).unwrap();
    assert_eq!(reopened.refs().branch("side"), None);
}
