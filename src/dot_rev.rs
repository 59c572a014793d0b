use std::{
    fs::{create_dir, create_dir_all, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    object_store::directory::DirectoryObjectStore,
    workdir::Ignores,
};

/// Name of the directory marking an initialized repository.
pub const DOT_REV: &str = ".rev";

/// A wrapper for the path of the .rev directory which has a number of utilities defined on it.
///
/// ```text
/// .rev/
///   HEAD              current branch name
///   branches/<name>   commit id the branch points at
///   index             staged additions and removals
///   ignores           names the working directory scans skip
///   objects/blobs     committed file contents
///   objects/commits   commits
///   objects/staging   contents staged but not committed yet
/// ```
#[derive(Debug, Clone)]
pub struct DotRev {
    root: PathBuf,
}

impl DotRev {
    /// The `.rev` directory itself.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Creates an empty layout inside `work_dir`.
    pub fn init(work_dir: &Path) -> Result<Self> {
        let root = work_dir.join(DOT_REV);
        if root.try_exists()? {
            return Err(Error::AlreadyInitialized);
        }
        log::info!("initializing repository layout at {:?}", root);
        create_dir_all(&root)?;
        create_dir(root.join("branches"))?;
        let objects = root.join("objects");
        create_dir(&objects)?;
        for area in ["blobs", "commits", "staging"] {
            create_dir(objects.join(area))?;
        }
        let dot_rev = DotRev { root };
        write_json(&Ignores::default(), &dot_rev.ignores_path())?;
        Ok(dot_rev)
    }

    /// Opens the layout inside `work_dir`, failing if it was never initialized.
    pub fn existing(work_dir: &Path) -> Result<Self> {
        let root = work_dir.join(DOT_REV);
        if !root.is_dir() {
            return Err(Error::NotInitialized);
        }
        Ok(DotRev { root })
    }

    pub fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    pub fn branches_path(&self) -> PathBuf {
        self.root.join("branches")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn ignores_path(&self) -> PathBuf {
        self.root.join("ignores")
    }

    pub fn blobs(&self) -> Result<DirectoryObjectStore> {
        Ok(DirectoryObjectStore::new(self.root.join("objects").join("blobs"))?)
    }

    pub fn commits(&self) -> Result<DirectoryObjectStore> {
        Ok(DirectoryObjectStore::new(self.root.join("objects").join("commits"))?)
    }

    pub fn staging(&self) -> Result<DirectoryObjectStore> {
        Ok(DirectoryObjectStore::new(self.root.join("objects").join("staging"))?)
    }

    pub fn ignores(&self) -> Result<Ignores> {
        read_json(&self.ignores_path())
    }
}

pub(crate) fn read_json<A: for<'de> Deserialize<'de>>(path: &Path) -> Result<A> {
    Ok(serde_json::from_reader(
        File::options().read(true).open(path)?,
    )?)
}

/// Replaces the contents of `path` with the JSON encoding of `thing` and
/// syncs it to disk.
pub(crate) fn write_json<A: Serialize>(thing: &A, path: &Path) -> Result<()> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    serde_json::to_writer_pretty(&mut file, thing)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}

/// Replaces the contents of `path` with `text` and syncs it to disk.
pub(crate) fn write_text(text: &str, path: &Path) -> Result<()> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[test]
fn test_init_then_existing() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DotRev::existing(tempdir.path()),
        Err(Error::NotInitialized)
    ));
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    assert!(dot_rev.branches_path().is_dir());
    assert_eq!(dot_rev.ignores().unwrap(), Ignores::default());
    assert!(matches!(
        DotRev::init(tempdir.path()),
        Err(Error::AlreadyInitialized)
    ));
    assert_eq!(DotRev::existing(tempdir.path()).unwrap().root(), dot_rev.root());
}

#[test]
fn test_write_json_truncates() {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join("thing");
    write_json(&vec!["a long entry", "another one"], &path).unwrap();
    write_json(&vec!["short"], &path).unwrap();
    let back: Vec<String> = read_json(&path).unwrap();
    assert_eq!(back, vec!["short"]);
}
