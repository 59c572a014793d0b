use std::{collections::BTreeSet, fmt::Display};

use crate::{
    blob::Blob, commit::Commit, error::Result, index::Index, refs::Refs, workdir::WorkDir,
};

/// Why a file shows up under "Modifications Not Staged For Commit".
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Change {
    Modified,
    Deleted,
}

/// A report of branches, the index and the working directory.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Status {
    pub current_branch: String,
    pub branches: Vec<String>,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<(String, Change)>,
    pub untracked: Vec<String>,
}

impl Status {
    pub fn compute(refs: &Refs, index: &Index, head: &Commit, work_dir: &WorkDir) -> Result<Self> {
        let on_disk = work_dir.files()?;
        let disk_uid = |name: &str| -> Result<_> { Ok(work_dir.blob(name)?.map(|b: Blob| b.uid())) };

        let mut modified = Vec::new();
        let names: BTreeSet<&String> = head.files().keys().chain(index.staged().keys()).collect();
        for name in names {
            let change = match (index.staged().get(name.as_str()), head.blob(name)) {
                (Some(staged), _) => match disk_uid(name)? {
                    None => Some(Change::Deleted),
                    Some(uid) if uid != *staged => Some(Change::Modified),
                    Some(_) => None,
                },
                (None, Some(_)) if index.removed().contains(name.as_str()) => None,
                (None, Some(tracked)) => match disk_uid(name)? {
                    None => Some(Change::Deleted),
                    Some(uid) if uid != tracked => Some(Change::Modified),
                    Some(_) => None,
                },
                (None, None) => None,
            };
            if let Some(change) = change {
                modified.push((name.clone(), change));
            }
        }

        let untracked = on_disk
            .into_iter()
            .filter(|name| {
                !index.staged().contains_key(name)
                    && (head.blob(name).is_none() || index.removed().contains(name))
            })
            .collect();

        Ok(Status {
            current_branch: refs.head().to_string(),
            branches: refs.branches().map(|(name, _)| name.to_string()).collect(),
            staged: index.staged().keys().cloned().collect(),
            removed: index.removed().iter().cloned().collect(),
            modified,
            untracked,
        })
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for branch in &self.branches {
            if *branch == self.current_branch {
                writeln!(f, "*{}", branch)?;
            } else {
                writeln!(f, "{}", branch)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "=== Staged Files ===")?;
        for name in &self.staged {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Removed Files ===")?;
        for name in &self.removed {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Modifications Not Staged For Commit ===")?;
        for (name, change) in &self.modified {
            let change = match change {
                Change::Modified => "modified",
                Change::Deleted => "deleted",
            };
            writeln!(f, "{} ({})", name, change)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Untracked Files ===")?;
        for name in &self.untracked {
            writeln!(f, "{}", name)?;
        }
        writeln!(f)
    }
}

#[test]
fn test_display_sections() {
    let status = Status {
        current_branch: "master".into(),
        branches: vec!["master".into(), "other".into()],
        staged: vec!["a.txt".into()],
        removed: vec![],
        modified: vec![("b.txt".into(), Change::Deleted)],
        untracked: vec!["c.txt".into()],
    };
    assert_eq!(
        status.to_string(),
        "=== Branches ===\n*master\nother\n\n\
         === Staged Files ===\na.txt\n\n\
         === Removed Files ===\n\n\
         === Modifications Not Staged For Commit ===\nb.txt (deleted)\n\n\
         === Untracked Files ===\nc.txt\n\n"
    );
}
