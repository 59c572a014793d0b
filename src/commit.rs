use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, object_id::ObjectId};

/// Rendering used for commit dates, e.g. `Thu Jan 01 00:00:00 1970 +0000`.
pub const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

/// Message of the commit every repository starts from.
pub const INITIAL_MESSAGE: &str = "initial commit";

/// A particular snapshot of the tracked files, plus its lineage.
///
/// `files` always holds the complete snapshot rather than a diff against
/// the parent, so looking up a file never walks the graph.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    message: String,
    date: String,
    uid: ObjectId,
    parent: Option<ObjectId>,
    second_parent: Option<ObjectId>,
    files: BTreeMap<String, ObjectId>,
}

impl Commit {
    /// The parentless root commit, dated at the UNIX epoch.
    pub fn initial() -> Result<Self> {
        let epoch = DateTime::<Utc>::UNIX_EPOCH.fixed_offset();
        Self::build(INITIAL_MESSAGE.to_string(), epoch, None, None, BTreeMap::new())
    }

    /// Derives a child of `parent`: its snapshot minus `removed`, with every
    /// entry of `staged` upserted.
    pub fn child(
        message: &str,
        parent: &Commit,
        second_parent: Option<ObjectId>,
        staged: &BTreeMap<String, ObjectId>,
        removed: &BTreeSet<String>,
        date: DateTime<FixedOffset>,
    ) -> Result<Self> {
        let mut files = parent.files.clone();
        for name in removed {
            files.remove(name);
        }
        for (name, blob) in staged {
            files.insert(name.clone(), *blob);
        }
        Self::build(
            message.to_string(),
            date,
            Some(parent.uid),
            second_parent,
            files,
        )
    }

    fn build(
        message: String,
        date: DateTime<FixedOffset>,
        parent: Option<ObjectId>,
        second_parent: Option<ObjectId>,
        files: BTreeMap<String, ObjectId>,
    ) -> Result<Self> {
        let date = date.format(DATE_FORMAT).to_string();
        let parent_hex = parent.map(|p| p.to_string()).unwrap_or_default();
        let serialized_files = serde_json::to_vec(&files)?;
        // the second parent does not take part in the identity
        let uid = ObjectId::of_parts([
            date.as_bytes(),
            message.as_bytes(),
            parent_hex.as_bytes(),
            serialized_files.as_slice(),
        ]);
        Ok(Commit {
            message,
            date,
            uid,
            parent,
            second_parent,
            files,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn uid(&self) -> ObjectId {
        self.uid
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn second_parent(&self) -> Option<ObjectId> {
        self.second_parent
    }

    /// Both parents, first parent first.
    pub fn parents(&self) -> impl Iterator<Item = ObjectId> {
        self.parent.into_iter().chain(self.second_parent)
    }

    pub fn files(&self) -> &BTreeMap<String, ObjectId> {
        &self.files
    }

    /// The blob tracked under `name`, if any.
    pub fn blob(&self, name: &str) -> Option<ObjectId> {
        self.files.get(name).copied()
    }

    pub fn is_initial(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_merge(&self) -> bool {
        self.second_parent.is_some()
    }
}

/// The `log` rendering of a single commit.
impl Display for Commit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "===")?;
        writeln!(f, "commit {}", self.uid)?;
        if let (Some(first), Some(second)) = (self.parent, self.second_parent) {
            writeln!(f, "Merge: {} {}", first.short(7), second.short(7))?;
        }
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "{}", self.message)
    }
}

#[cfg(test)]
fn at(secs: i64) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap().fixed_offset()
}

#[test]
fn test_initial_commit() {
    let initial = Commit::initial().unwrap();
    assert_eq!(initial.date(), "Thu Jan 01 00:00:00 1970 +0000");
    assert_eq!(initial.message(), INITIAL_MESSAGE);
    assert!(initial.is_initial());
    assert!(initial.files().is_empty());
    assert_eq!(initial, Commit::initial().unwrap());
}

#[test]
fn test_child_applies_removals_then_stages() {
    let a = ObjectId::of_parts([b"a".as_slice()]);
    let b = ObjectId::of_parts([b"b".as_slice()]);
    let a2 = ObjectId::of_parts([b"a2".as_slice()]);
    let initial = Commit::initial().unwrap();
    let first = Commit::child(
        "two files",
        &initial,
        None,
        &[("a".to_string(), a), ("b".to_string(), b)].into(),
        &BTreeSet::new(),
        at(100),
    )
    .unwrap();
    let second = Commit::child(
        "edit a, drop b",
        &first,
        None,
        &[("a".to_string(), a2)].into(),
        &["b".to_string()].into(),
        at(200),
    )
    .unwrap();
    assert_eq!(second.parent(), Some(first.uid()));
    assert_eq!(second.files().len(), 1);
    assert_eq!(second.blob("a"), Some(a2));
    assert_eq!(second.blob("b"), None);
    // parents keep their own snapshot
    assert_eq!(first.blob("a"), Some(a));
}

#[test]
fn test_second_parent_not_in_identity() {
    let initial = Commit::initial().unwrap();
    let empty = BTreeMap::new();
    let none = BTreeSet::new();
    let x = ObjectId::of_parts([b"x".as_slice()]);
    let y = ObjectId::of_parts([b"y".as_slice()]);
    let m1 = Commit::child("merge", &initial, Some(x), &empty, &none, at(5)).unwrap();
    let m2 = Commit::child("merge", &initial, Some(y), &empty, &none, at(5)).unwrap();
    assert_eq!(m1.uid(), m2.uid());
    let m3 = Commit::child("merge!", &initial, Some(y), &empty, &none, at(5)).unwrap();
    assert_ne!(m1.uid(), m3.uid());
}

#[test]
fn test_display_merge_line() {
    let initial = Commit::initial().unwrap();
    let other = ObjectId::of_parts([b"other".as_slice()]);
    let merge = Commit::child(
        "Merged b into master.",
        &initial,
        Some(other),
        &BTreeMap::new(),
        &BTreeSet::new(),
        at(0),
    )
    .unwrap();
    let rendered = merge.to_string();
    assert!(rendered.starts_with(&format!("===\ncommit {}\nMerge: ", merge.uid())));
    assert!(rendered.contains(&format!("{} {}", initial.uid().short(7), other.short(7))));
    assert!(rendered.ends_with("Merged b into master.\n"));
    assert!(!initial.to_string().contains("Merge:"));
}
