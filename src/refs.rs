//! Branch pointers and HEAD.
//!
//! Each branch lives in its own file under `.rev/branches`, holding the id of
//! the commit it points at. `.rev/HEAD` holds the name of the checked-out
//! branch. [`Refs`] is loaded once per command, mutated in memory and written
//! back with [`Refs::save`].

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{read_dir, read_to_string, remove_file},
    io::ErrorKind,
};

use crate::{
    dot_rev::{read_json, write_json, write_text, DotRev},
    error::{Error, Result},
    object_id::ObjectId,
};

/// Branch every new repository starts on.
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refs {
    head: String,
    branches: BTreeMap<String, ObjectId>,
    deleted: BTreeSet<String>,
}

impl Refs {
    /// A fresh table with a single branch pointing at `initial`.
    pub fn new(initial: ObjectId) -> Self {
        Refs {
            head: DEFAULT_BRANCH.to_string(),
            branches: [(DEFAULT_BRANCH.to_string(), initial)].into(),
            deleted: BTreeSet::new(),
        }
    }

    pub fn load(dot_rev: &DotRev) -> Result<Self> {
        let head = read_to_string(dot_rev.head_path())?.trim().to_string();
        let mut branches = BTreeMap::new();
        for entry in read_dir(dot_rev.branches_path())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            branches.insert(name, read_json(&entry.path())?);
        }
        if !branches.contains_key(&head) {
            return Err(Error::Corrupt(format!("HEAD names unknown branch {}", head)));
        }
        Ok(Refs {
            head,
            branches,
            deleted: BTreeSet::new(),
        })
    }

    pub fn save(&self, dot_rev: &DotRev) -> Result<()> {
        let dir = dot_rev.branches_path();
        for name in &self.deleted {
            let path = dir.join(name);
            log::info!("deleting branch file {:?}", path);
            match remove_file(path) {
                Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
                _ => {}
            }
        }
        for (name, id) in &self.branches {
            write_json(id, &dir.join(name))?;
        }
        write_text(&self.head, &dot_rev.head_path())
    }

    /// Name of the checked-out branch.
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Commit the checked-out branch points at.
    pub fn head_commit(&self) -> ObjectId {
        self.branches[&self.head]
    }

    pub fn branch(&self, name: &str) -> Option<ObjectId> {
        self.branches.get(name).copied()
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.branches.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Points a new branch at the current commit.
    pub fn create_branch(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.branches.contains_key(name) {
            return Err(Error::BranchExists);
        }
        log::info!("creating branch {} at {}", name, self.head_commit());
        self.branches.insert(name.to_string(), self.head_commit());
        self.deleted.remove(name);
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(Error::NoSuchBranch);
        }
        if self.head == name {
            return Err(Error::CannotDeleteCurrent);
        }
        log::info!("deleting branch {}", name);
        self.branches.remove(name);
        self.deleted.insert(name.to_string());
        Ok(())
    }

    /// Points the checked-out branch at `commit`.
    pub fn move_current_branch(&mut self, commit: ObjectId) {
        log::info!("moving {} to {}", self.head, commit);
        self.branches.insert(self.head.clone(), commit);
    }

    /// Checks out another branch without moving any branch pointer.
    pub fn switch_head(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(Error::NoSuchCheckoutBranch);
        }
        log::info!("switching HEAD from {} to {}", self.head, name);
        self.head = name.to_string();
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control);
    if plain {
        Ok(())
    } else {
        Err(Error::InvalidBranchName(name.to_string()))
    }
}

#[test]
fn test_create_and_delete() {
    let initial = ObjectId::of_parts([b"initial".as_slice()]);
    let mut refs = Refs::new(initial);
    refs.create_branch("feature").unwrap();
    assert_eq!(refs.branch("feature"), Some(initial));
    assert!(matches!(refs.create_branch("feature"), Err(Error::BranchExists)));
    assert!(matches!(refs.delete_branch("nope"), Err(Error::NoSuchBranch)));
    assert!(matches!(
        refs.delete_branch(DEFAULT_BRANCH),
        Err(Error::CannotDeleteCurrent)
    ));
    refs.delete_branch("feature").unwrap();
    assert_eq!(refs.branch("feature"), None);
    assert!(matches!(
        refs.create_branch("../escape"),
        Err(Error::InvalidBranchName(_))
    ));
}

#[test]
fn test_move_and_switch() {
    let initial = ObjectId::of_parts([b"initial".as_slice()]);
    let next = ObjectId::of_parts([b"next".as_slice()]);
    let mut refs = Refs::new(initial);
    refs.create_branch("feature").unwrap();
    refs.switch_head("feature").unwrap();
    refs.move_current_branch(next);
    assert_eq!(refs.head(), "feature");
    assert_eq!(refs.head_commit(), next);
    assert_eq!(refs.branch(DEFAULT_BRANCH), Some(initial));
    assert!(matches!(
        refs.switch_head("nope"),
        Err(Error::NoSuchCheckoutBranch)
    ));
}

#[test]
fn test_save_and_load() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    let initial = ObjectId::of_parts([b"initial".as_slice()]);
    let mut refs = Refs::new(initial);
    refs.create_branch("gone").unwrap();
    refs.create_branch("kept").unwrap();
    refs.save(&dot_rev).unwrap();
    refs.delete_branch("gone").unwrap();
    refs.switch_head("kept").unwrap();
    refs.save(&dot_rev).unwrap();

    let loaded = Refs::load(&dot_rev).unwrap();
    assert_eq!(loaded.head(), "kept");
    let names: Vec<&str> = loaded.branches().map(|(name, _)| name).collect();
    assert_eq!(names, vec![DEFAULT_BRANCH, "kept"]);
    assert!(!dot_rev.branches_path().join("gone").exists());
}
