//! Three-way merge classification.
//!
//! Given the split point, the current head and the merge target, every file
//! present in any of the three snapshots is classified by comparing blob ids.
//! Files whose outcome is "keep what head has" produce no [`Resolution`].

use std::collections::{BTreeMap, BTreeSet};

use crate::{commit::Commit, object_id::ObjectId};

/// How a single file is resolved when it cannot simply stay as head has it.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Resolution {
    /// Stage the target's blob and write it into the working directory.
    TakeTarget(ObjectId),
    /// Head still has the split version and the target deleted the file.
    Remove,
    /// Both sides changed the file differently. `None` stands for a side
    /// that deleted it.
    Conflict {
        head: Option<ObjectId>,
        target: Option<ObjectId>,
    },
}

/// Classifies one file given its blob in the split, head and target
/// snapshots.
pub fn classify(
    split: Option<ObjectId>,
    head: Option<ObjectId>,
    target: Option<ObjectId>,
) -> Option<Resolution> {
    if head == target || target == split {
        // converged edits, or nothing to take from the target
        return None;
    }
    match (split, head, target) {
        (_, h, Some(t)) if h == split => Some(Resolution::TakeTarget(t)),
        (_, _, None) if head == split => Some(Resolution::Remove),
        // head deleted a file the target went on to change
        (Some(_), None, Some(t)) => Some(Resolution::TakeTarget(t)),
        _ => Some(Resolution::Conflict { head, target }),
    }
}

/// The resolutions for every file that needs one, keyed by file name.
pub fn plan(split: &Commit, head: &Commit, target: &Commit) -> BTreeMap<String, Resolution> {
    let names: BTreeSet<&String> = split
        .files()
        .keys()
        .chain(head.files().keys())
        .chain(target.files().keys())
        .collect();
    let mut resolutions = BTreeMap::new();
    for name in names {
        let resolution = classify(split.blob(name), head.blob(name), target.blob(name));
        log::debug!("merge classified {} as {:?}", name, resolution);
        if let Some(resolution) = resolution {
            resolutions.insert(name.clone(), resolution);
        }
    }
    resolutions
}

/// The file content written for a conflicted file.
pub fn conflict_content(head: &[u8], target: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len() + target.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(head);
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(target);
    out.extend_from_slice(b">>>>>>>\n");
    out
}

#[cfg(test)]
fn id(s: &str) -> Option<ObjectId> {
    Some(ObjectId::of_parts([s.as_bytes()]))
}

#[test]
fn test_classify_table() {
    use Resolution::*;
    let (s, h, t) = (id("split"), id("head"), id("target"));

    // never existed on either side any more
    assert_eq!(classify(s, None, None), None);
    // head deleted it, target changed it
    assert_eq!(classify(s, None, t), Some(TakeTarget(t.unwrap())));
    // head deleted it, target untouched
    assert_eq!(classify(s, None, s), None);
    // head changed it, target deleted it
    assert_eq!(classify(s, h, None), Some(Conflict { head: h, target: None }));
    // head untouched, target deleted it
    assert_eq!(classify(s, s, None), Some(Remove));
    // only head changed it
    assert_eq!(classify(s, h, s), None);
    // only target changed it
    assert_eq!(classify(s, s, t), Some(TakeTarget(t.unwrap())));
    // both made the same change
    assert_eq!(classify(s, h, h), None);
    // both changed it differently
    assert_eq!(classify(s, h, t), Some(Conflict { head: h, target: t }));
}

#[test]
fn test_classify_files_missing_from_split() {
    use Resolution::*;
    let (h, t) = (id("head"), id("target"));
    assert_eq!(classify(None, None, t), Some(TakeTarget(t.unwrap())));
    assert_eq!(classify(None, h, None), None);
    assert_eq!(classify(None, h, h), None);
    assert_eq!(classify(None, h, t), Some(Conflict { head: h, target: t }));
}

#[test]
fn test_plan_covers_union_of_snapshots() {
    use chrono::Utc;
    let initial = Commit::initial().unwrap();
    let snapshot = |files: &[(&str, &str)]| {
        let staged = files
            .iter()
            .map(|(name, content)| (name.to_string(), id(content).unwrap()))
            .collect();
        Commit::child(
            "snap",
            &initial,
            None,
            &staged,
            &BTreeSet::new(),
            Utc::now().fixed_offset(),
        )
        .unwrap()
    };
    let split = snapshot(&[("same", "1"), ("gone", "g"), ("edited", "e")]);
    let head = snapshot(&[("same", "1"), ("gone", "g"), ("edited", "e"), ("mine", "m")]);
    let target = snapshot(&[("same", "1"), ("edited", "e2"), ("theirs", "t")]);
    let resolutions = plan(&split, &head, &target);
    let expected: BTreeMap<String, Resolution> = [
        ("edited".to_string(), Resolution::TakeTarget(id("e2").unwrap())),
        ("gone".to_string(), Resolution::Remove),
        ("theirs".to_string(), Resolution::TakeTarget(id("t").unwrap())),
    ]
    .into();
    assert_eq!(resolutions, expected);
}

#[test]
fn test_conflict_content() {
    assert_eq!(
        conflict_content(b"mine\n", b""),
        b"<<<<<<< HEAD\nmine\n=======\n>>>>>>>\n".to_vec()
    );
}
