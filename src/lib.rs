//! # Revision Control
//!
//! A single-user, local version-control engine: a content addressed object
//! store, an immutable commit graph, a staging index, branches and a
//! three-way merge.

mod hex;

/// A captured snapshot of one file.
pub mod blob;
/// Immutable commits holding a complete snapshot plus their parents.
pub mod commit;
/// Ancestor queries over the commit DAG.
pub mod commit_graph;
/// The `.rev` directory layout and its JSON helpers.
pub mod dot_rev;
pub mod error;
/// Pending additions and removals.
pub mod index;
pub mod merge;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`ObjectId`](object_id::ObjectId).
pub mod object_store;
pub mod refs;
pub mod repository;
pub mod status;
/// The working directory as seen by the engine.
pub mod workdir;

pub use error::{Error, Result};
pub use repository::{MergeOutcome, Repository};
