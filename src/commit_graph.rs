//! Traversals over the commit DAG.
//!
//! Every commit has zero, one or two parents and the graph is rooted at a
//! single initial commit. The traversals here never look at storage
//! directly; they are handed a loader which turns an id into a [`Commit`].

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::{
    commit::Commit,
    error::{Error, Result},
    object_id::ObjectId,
};

pub struct CommitGraph<F> {
    load: F,
}

impl<F> CommitGraph<F>
where
    F: Fn(ObjectId) -> Result<Commit>,
{
    pub fn new(load: F) -> Self {
        Self { load }
    }

    /// Every commit reachable from `start` through first and second parent
    /// links, `start` included.
    pub fn ancestors(&self, start: &Commit) -> Result<BTreeSet<ObjectId>> {
        let mut seen = BTreeSet::new();
        seen.insert(start.uid());
        let mut pending: Vec<ObjectId> = start.parents().collect();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let commit = (self.load)(id)?;
            pending.extend(commit.parents().filter(|p| !seen.contains(p)));
        }
        log::debug!("{} has {} ancestors", start.uid(), seen.len());
        Ok(seen)
    }

    /// The split point used as the three-way merge base of `head` and
    /// `target`.
    ///
    /// Collects the ancestors of `head`, then walks breadth first from
    /// `target` (first parent queued before second parent) and returns the
    /// first commit that `head` can also reach. This is the first common
    /// ancestor in that visiting order, which is the lowest one for the
    /// shallow merge lattices this tool produces but is not guaranteed to
    /// be a true lowest common ancestor in an arbitrary DAG.
    pub fn split_point(&self, head: &Commit, target: &Commit) -> Result<Commit> {
        let head_ancestors = self.ancestors(head)?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(target.uid());
        queue.push_back(target.clone());
        while let Some(commit) = queue.pop_front() {
            if head_ancestors.contains(&commit.uid()) {
                log::debug!(
                    "split point of {} and {} is {}",
                    head.uid(),
                    target.uid(),
                    commit.uid()
                );
                return Ok(commit);
            }
            for parent in commit.parents() {
                if visited.insert(parent) {
                    queue.push_back((self.load)(parent)?);
                }
            }
        }
        Err(Error::NoCommonAncestor(head.uid(), target.uid()))
    }

    /// `start` followed by its first-parent chain down to the initial commit.
    pub fn first_parent_chain(&self, start: &Commit) -> Result<Vec<Commit>> {
        let mut chain = vec![start.clone()];
        while let Some(parent) = chain.last().and_then(Commit::parent) {
            chain.push((self.load)(parent)?);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod fixture {
    use std::collections::{BTreeMap, BTreeSet, HashMap};

    use chrono::{DateTime, Utc};

    use super::*;

    /// An in-memory history built one commit at a time.
    pub struct History {
        pub commits: HashMap<ObjectId, Commit>,
        pub initial: Commit,
        clock: i64,
    }

    impl History {
        pub fn new() -> Self {
            let initial = Commit::initial().unwrap();
            let mut commits = HashMap::new();
            commits.insert(initial.uid(), initial.clone());
            History {
                commits,
                initial,
                clock: 0,
            }
        }

        pub fn commit(&mut self, message: &str, parent: &Commit, second: Option<&Commit>) -> Commit {
            self.clock += 1;
            let date = DateTime::<Utc>::from_timestamp(self.clock, 0)
                .unwrap()
                .fixed_offset();
            let commit = Commit::child(
                message,
                parent,
                second.map(Commit::uid),
                &BTreeMap::new(),
                &BTreeSet::new(),
                date,
            )
            .unwrap();
            self.commits.insert(commit.uid(), commit.clone());
            commit
        }

        pub fn graph(&self) -> CommitGraph<impl Fn(ObjectId) -> Result<Commit> + '_> {
            CommitGraph::new(move |id| {
                self.commits
                    .get(&id)
                    .cloned()
                    .ok_or(Error::MissingObject(id))
            })
        }
    }
}

#[test]
fn test_ancestors_include_root_and_merge_parents() {
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let a = h.commit("a", &root, None);
    let b = h.commit("b", &root, None);
    let m = h.commit("m", &a, Some(&b));
    let ancestors = h.graph().ancestors(&m).unwrap();
    let expected: BTreeSet<ObjectId> = [root.uid(), a.uid(), b.uid(), m.uid()].into();
    assert_eq!(ancestors, expected);
    assert!(h.graph().ancestors(&root).unwrap().contains(&root.uid()));
}

#[test]
fn test_split_point_linear() {
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let a = h.commit("a", &root, None);
    let b = h.commit("b", &a, None);
    let graph = h.graph();
    // target behind head: the target itself
    assert_eq!(graph.split_point(&b, &a).unwrap().uid(), a.uid());
    // head behind target: head is the split point (fast-forward)
    assert_eq!(graph.split_point(&a, &b).unwrap().uid(), a.uid());
}

#[test]
fn test_split_point_divergent() {
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let base = h.commit("base", &root, None);
    let left = h.commit("left", &base, None);
    let right = h.commit("right", &base, None);
    let right2 = h.commit("right2", &right, None);
    assert_eq!(h.graph().split_point(&left, &right2).unwrap().uid(), base.uid());
}

#[test]
fn test_split_point_after_previous_merge() {
    // master: root - a - m(a, b2) - c
    // other:  root - b1 - b2 - b3
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let a = h.commit("a", &root, None);
    let b1 = h.commit("b1", &root, None);
    let b2 = h.commit("b2", &b1, None);
    let m = h.commit("m", &a, Some(&b2));
    let c = h.commit("c", &m, None);
    let b3 = h.commit("b3", &b2, None);
    assert_eq!(h.graph().split_point(&c, &b3).unwrap().uid(), b2.uid());
}

#[test]
fn test_first_parent_chain() {
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let a = h.commit("a", &root, None);
    let side = h.commit("side", &root, None);
    let m = h.commit("m", &a, Some(&side));
    let chain: Vec<String> = h
        .graph()
        .first_parent_chain(&m)
        .unwrap()
        .iter()
        .map(|c| c.message().to_string())
        .collect();
    assert_eq!(chain, vec!["m", "a", "initial commit"]);
}

#[test]
fn test_missing_parent_is_reported() {
    let mut h = fixture::History::new();
    let root = h.initial.clone();
    let a = h.commit("a", &root, None);
    h.commits.remove(&root.uid());
    assert!(matches!(
        h.graph().ancestors(&a),
        Err(Error::MissingObject(_))
    ));
}
