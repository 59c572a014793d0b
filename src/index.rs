use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    blob::Blob,
    commit::Commit,
    error::{Error, Result},
    object_id::ObjectId,
    object_store::ObjectStore,
};

/// The staging index: pending additions and pending removals, consumed by
/// the next commit.
///
/// A name is never both staged and removed; every mutation below keeps the
/// two collections disjoint.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    staged: BTreeMap<String, ObjectId>,
    removed: BTreeSet<String>,
}

/// What [`Index::stage_remove`] did with a file name.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Removal {
    /// The name was only staged; its pending addition was dropped.
    Unstaged,
    /// The name is tracked by the current commit and is now pending
    /// removal. The working copy should be deleted.
    Untracked,
}

impl Index {
    pub fn staged(&self) -> &BTreeMap<String, ObjectId> {
        &self.staged
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.removed.is_empty()
    }

    /// Stages `blob` against the commit at `head`.
    ///
    /// A blob identical to the tracked version is not staged: any earlier
    /// staged version of the file is dropped and a pending removal is
    /// cancelled. Otherwise the blob's bytes are kept in `staging` (unless
    /// `blobs` already has them) until the next commit flushes them.
    pub fn stage_add<S, B>(
        &mut self,
        blob: &Blob,
        head: &Commit,
        staging: &mut S,
        blobs: &B,
    ) -> Result<()>
    where
        S: ObjectStore,
        B: ObjectStore,
        Error: From<S::Error> + From<B::Error>,
    {
        let name = blob.file_name();
        self.removed.remove(name);
        if head.blob(name) == Some(blob.uid()) {
            log::info!("{} matches the current commit, nothing to stage", name);
            if let Some(previous) = self.staged.remove(name) {
                staging.remove(previous)?;
            }
            return Ok(());
        }
        if let Some(previous) = self.staged.insert(name.to_string(), blob.uid()) {
            if previous != blob.uid() {
                staging.remove(previous)?;
            }
        }
        if !blobs.has(blob.uid())? {
            staging.insert(blob.uid(), blob.content())?;
        }
        log::info!("staged {} as {}", name, blob.uid());
        Ok(())
    }

    /// Stages the removal of `name`.
    ///
    /// Fails with [`Error::NothingToRemove`] unless the file is staged or
    /// tracked by `head`. A staged entry is always dropped; a tracked file
    /// is additionally recorded as removed.
    pub fn stage_remove<S>(&mut self, name: &str, head: &Commit, staging: &mut S) -> Result<Removal>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        let tracked = head.blob(name).is_some();
        if !tracked && !self.staged.contains_key(name) {
            return Err(Error::NothingToRemove);
        }
        if let Some(previous) = self.staged.remove(name) {
            staging.remove(previous)?;
        }
        if tracked {
            log::info!("marking {} for removal", name);
            self.removed.insert(name.to_string());
            Ok(Removal::Untracked)
        } else {
            log::info!("unstaged {}", name);
            Ok(Removal::Unstaged)
        }
    }

    /// Records an already stored blob as staged, without touching the
    /// staging area. Used by merge to take the other side's version.
    pub fn stage_stored(&mut self, name: &str, blob: ObjectId) {
        self.removed.remove(name);
        self.staged.insert(name.to_string(), blob);
    }

    /// Moves every staged blob from `staging` into `blobs`.
    pub fn flush_staged<S, B>(&self, staging: &mut S, blobs: &mut B) -> Result<()>
    where
        S: ObjectStore,
        B: ObjectStore,
        Error: From<S::Error> + From<B::Error>,
    {
        for uid in self.staged.values() {
            if let Some(content) = staging.read(*uid)? {
                blobs.insert(*uid, &content)?;
                staging.remove(*uid)?;
            } else if !blobs.has(*uid)? {
                return Err(Error::MissingObject(*uid));
            }
        }
        Ok(())
    }

    /// Empties the index and discards whatever is left in `staging`.
    pub fn clear<S>(&mut self, staging: &mut S) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        for uid in staging.ids()? {
            staging.remove(uid)?;
        }
        self.staged.clear();
        self.removed.clear();
        Ok(())
    }
}

#[cfg(test)]
use crate::object_store::in_memory::InMemoryObjectStore;

#[cfg(test)]
fn tracking(files: &[(&str, &str)]) -> Commit {
    let staged = files
        .iter()
        .map(|(name, content)| (name.to_string(), Blob::new(*name, *content).uid()))
        .collect();
    Commit::child(
        "tracked",
        &Commit::initial().unwrap(),
        None,
        &staged,
        &BTreeSet::new(),
        chrono::Utc::now().fixed_offset(),
    )
    .unwrap()
}

#[test]
fn test_stage_new_file() {
    let head = tracking(&[]);
    let (mut staging, blobs) = (InMemoryObjectStore::new(), InMemoryObjectStore::new());
    let mut index = Index::default();
    let blob = Blob::new("a.txt", "hello");
    index.stage_add(&blob, &head, &mut staging, &blobs).unwrap();
    assert_eq!(index.staged().get("a.txt"), Some(&blob.uid()));
    assert_eq!(staging.read(blob.uid()).unwrap().unwrap(), b"hello");
}

#[test]
fn test_restaging_replaces_previous_version() {
    let head = tracking(&[]);
    let (mut staging, blobs) = (InMemoryObjectStore::new(), InMemoryObjectStore::new());
    let mut index = Index::default();
    let v1 = Blob::new("a.txt", "one");
    let v2 = Blob::new("a.txt", "two");
    index.stage_add(&v1, &head, &mut staging, &blobs).unwrap();
    index.stage_add(&v2, &head, &mut staging, &blobs).unwrap();
    assert_eq!(index.staged().len(), 1);
    assert_eq!(index.staged().get("a.txt"), Some(&v2.uid()));
    assert_eq!(staging.ids().unwrap(), vec![v2.uid()]);
}

#[test]
fn test_staging_unchanged_file_drops_entry_and_removal() {
    let head = tracking(&[("a.txt", "hello")]);
    let (mut staging, blobs) = (InMemoryObjectStore::new(), InMemoryObjectStore::new());
    let mut index = Index::default();
    index
        .stage_add(&Blob::new("a.txt", "changed"), &head, &mut staging, &blobs)
        .unwrap();
    index
        .stage_add(&Blob::new("a.txt", "hello"), &head, &mut staging, &blobs)
        .unwrap();
    assert!(index.is_empty());
    assert!(staging.ids().unwrap().is_empty());

    index.stage_remove("a.txt", &head, &mut staging).unwrap();
    assert!(index.removed().contains("a.txt"));
    index
        .stage_add(&Blob::new("a.txt", "hello"), &head, &mut staging, &blobs)
        .unwrap();
    assert!(index.is_empty());
}

#[test]
fn test_stage_remove() {
    let head = tracking(&[("tracked.txt", "x")]);
    let (mut staging, blobs) = (InMemoryObjectStore::new(), InMemoryObjectStore::new());
    let mut index = Index::default();

    assert!(matches!(
        index.stage_remove("nothing.txt", &head, &mut staging),
        Err(Error::NothingToRemove)
    ));
    assert!(index.is_empty());

    let fresh = Blob::new("new.txt", "n");
    index.stage_add(&fresh, &head, &mut staging, &blobs).unwrap();
    assert_eq!(
        index.stage_remove("new.txt", &head, &mut staging).unwrap(),
        Removal::Unstaged
    );
    assert!(index.is_empty());
    assert!(!staging.has(fresh.uid()).unwrap());

    assert_eq!(
        index.stage_remove("tracked.txt", &head, &mut staging).unwrap(),
        Removal::Untracked
    );
    assert!(index.removed().contains("tracked.txt"));
    assert!(index.staged().is_empty());
}

#[test]
fn test_flush_and_clear() {
    let head = tracking(&[]);
    let (mut staging, mut blobs) = (InMemoryObjectStore::new(), InMemoryObjectStore::new());
    let mut index = Index::default();
    let blob = Blob::new("a.txt", "hello");
    index.stage_add(&blob, &head, &mut staging, &blobs).unwrap();
    index.flush_staged(&mut staging, &mut blobs).unwrap();
    assert!(blobs.has(blob.uid()).unwrap());
    assert!(!staging.has(blob.uid()).unwrap());

    // already stored blobs are not copied into staging again
    let mut again = Index::default();
    again.stage_add(&blob, &head, &mut staging, &blobs).unwrap();
    assert!(staging.ids().unwrap().is_empty());
    again.clear(&mut staging).unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_index_serde() {
    let mut index = Index::default();
    index.stage_stored("a.txt", Blob::new("a.txt", "a").uid());
    let json = serde_json::to_string(&index).unwrap();
    let back: Index = serde_json::from_str(&json).unwrap();
    assert_eq!(index, back);
}
