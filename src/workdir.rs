use std::{
    collections::BTreeSet,
    fs::{read_dir, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    blob::Blob,
    commit::Commit,
    error::{Error, Result},
    index::Index,
    object_store::ObjectStore,
};

/// Names in the working directory that scans never report.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ignores {
    set: BTreeSet<String>,
}

impl Ignores {
    pub fn contains(&self, name: &str) -> bool {
        self.set.contains(name)
    }
}

impl FromIterator<String> for Ignores {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Ignores {
            set: iter.into_iter().collect(),
        }
    }
}

/// The plain files directly inside the working directory.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
    ignores: Ignores,
}

impl WorkDir {
    pub fn new(root: PathBuf, ignores: Ignores) -> Self {
        Self { root, ignores }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every plain, non-ignored file, sorted.
    pub fn files(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!("skipping non utf-8 file name {:?}", entry.file_name());
                continue;
            };
            if !self.ignores.contains(&name) {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// The on-disk file `name` captured as a blob, or `None` when there is
    /// no such plain file.
    pub fn blob(&self, name: &str) -> Result<Option<Blob>> {
        if name.is_empty() || name.contains(['/', '\\']) || self.ignores.contains(name) {
            return Ok(None);
        }
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Blob::new(name, std::fs::read(path)?)))
    }

    pub fn write(&self, name: &str, content: &[u8]) -> Result<()> {
        log::debug!("writing {} into {:?}", name, self.root);
        let mut f = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.root.join(name))?;
        f.write_all(content)?;
        Ok(())
    }

    /// Deletes `name`, tolerating a file the user already deleted.
    pub fn delete(&self, name: &str) -> Result<()> {
        log::debug!("deleting {} from {:?}", name, self.root);
        match std::fs::remove_file(self.root.join(name)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Writes the stored content of `name` as tracked by `commit`.
    pub fn checkout_file<S>(&self, commit: &Commit, name: &str, blobs: &S) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        let id = commit.blob(name).ok_or(Error::FileNotInCommit)?;
        let content = blobs.read(id)?.ok_or(Error::MissingObject(id))?;
        self.write(name, &content)
    }

    /// Replaces the working directory with the snapshot of `commit`.
    ///
    /// Every plain file is deleted first, so callers must have ruled out
    /// untracked files beforehand.
    pub fn materialize<S>(&self, commit: &Commit, blobs: &S) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        log::info!("materializing {} into {:?}", commit.uid(), self.root);
        for name in self.files()? {
            std::fs::remove_file(self.root.join(&name))?;
        }
        for name in commit.files().keys() {
            self.checkout_file(commit, name, blobs)?;
        }
        Ok(())
    }

    /// Files on disk that neither `head` tracks nor `index` stages.
    pub fn untracked(&self, head: &Commit, index: &Index) -> Result<BTreeSet<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|name| head.blob(name).is_none() && !index.staged().contains_key(name))
            .collect())
    }

    /// Fails with [`Error::UntrackedFileConflict`] when a destructive
    /// operation would clobber an untracked file.
    pub fn ensure_no_untracked(&self, head: &Commit, index: &Index) -> Result<()> {
        let untracked = self.untracked(head, index)?;
        if untracked.is_empty() {
            Ok(())
        } else {
            log::debug!("untracked files in the way: {:?}", untracked);
            Err(Error::UntrackedFileConflict)
        }
    }
}

#[cfg(test)]
use crate::object_store::in_memory::InMemoryObjectStore;

#[test]
fn test_files_skips_directories_and_ignores() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tempdir.path().join(".rev")).unwrap();
    std::fs::write(tempdir.path().join("a.txt"), "a").unwrap();
    std::fs::write(tempdir.path().join("skip.me"), "s").unwrap();
    let work_dir = WorkDir::new(
        tempdir.path().into(),
        ["skip.me".to_string()].into_iter().collect(),
    );
    assert_eq!(
        work_dir.files().unwrap(),
        ["a.txt".to_string()].into_iter().collect()
    );
    assert!(work_dir.blob("skip.me").unwrap().is_none());
    assert!(work_dir.blob(".rev").unwrap().is_none());
    assert_eq!(work_dir.blob("a.txt").unwrap().unwrap().content(), b"a");
}

#[test]
fn test_materialize_and_untracked() {
    let tempdir = tempfile::tempdir().unwrap();
    let work_dir = WorkDir::new(tempdir.path().into(), Ignores::default());
    let mut blobs = InMemoryObjectStore::new();
    let keep = Blob::new("keep.txt", "kept");
    blobs.insert(keep.uid(), keep.content()).unwrap();
    let commit = Commit::child(
        "one file",
        &Commit::initial().unwrap(),
        None,
        &[("keep.txt".to_string(), keep.uid())].into(),
        &BTreeSet::new(),
        chrono::Utc::now().fixed_offset(),
    )
    .unwrap();

    work_dir.write("old.txt", b"old").unwrap();
    let index = Index::default();
    assert_eq!(
        work_dir.untracked(&commit, &index).unwrap(),
        ["old.txt".to_string()].into_iter().collect()
    );
    assert!(matches!(
        work_dir.ensure_no_untracked(&commit, &index),
        Err(Error::UntrackedFileConflict)
    ));

    work_dir.materialize(&commit, &blobs).unwrap();
    assert!(!tempdir.path().join("old.txt").exists());
    assert_eq!(std::fs::read(tempdir.path().join("keep.txt")).unwrap(), b"kept");
    work_dir.ensure_no_untracked(&commit, &index).unwrap();
}

#[test]
fn test_checkout_missing_file() {
    let tempdir = tempfile::tempdir().unwrap();
    let work_dir = WorkDir::new(tempdir.path().into(), Ignores::default());
    let blobs = InMemoryObjectStore::new();
    assert!(matches!(
        work_dir.checkout_file(&Commit::initial().unwrap(), "nope", &blobs),
        Err(Error::FileNotInCommit)
    ));
    work_dir.delete("nope").unwrap();
}
