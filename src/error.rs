use std::convert::Infallible;

use derive_more::{Display, From};

use crate::object_id::ObjectId;

/// Everything that can go wrong while running a repository operation.
///
/// Most variants are expected, user-facing conditions which are checked
/// before anything is mutated. The rest (see [`Error::is_fatal`]) mean the
/// persisted repository is no longer in the shape we expect.
#[derive(Debug, Display, From)]
pub enum Error {
    #[display(fmt = "Not in an initialized Gitlet directory.")]
    NotInitialized,
    #[display(fmt = "A Gitlet version-control system already exists in the current directory.")]
    AlreadyInitialized,
    #[display(fmt = "File does not exist.")]
    FileDoesNotExist,
    #[display(fmt = "No reason to remove the file.")]
    NothingToRemove,
    #[display(fmt = "Please enter a commit message.")]
    EmptyMessage,
    #[display(fmt = "No changes added to the commit.")]
    NoChanges,
    #[display(fmt = "A branch with that name already exists.")]
    BranchExists,
    #[display(fmt = "A branch with that name does not exist.")]
    NoSuchBranch,
    #[display(fmt = "Invalid branch name {:?}.", _0)]
    InvalidBranchName(String),
    #[display(fmt = "No such branch exists.")]
    NoSuchCheckoutBranch,
    #[display(fmt = "Cannot remove the current branch.")]
    CannotDeleteCurrent,
    #[display(fmt = "No need to checkout the current branch.")]
    AlreadyOnBranch,
    #[display(fmt = "There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedFileConflict,
    #[display(fmt = "You have uncommitted changes.")]
    UncommittedChanges,
    #[display(fmt = "Cannot merge a branch with itself.")]
    MergeWithSelf,
    #[display(fmt = "No commit with that id exists.")]
    AmbiguousOrNotFound(String),
    #[display(fmt = "File does not exist in that commit.")]
    FileNotInCommit,
    #[display(fmt = "Found no commit with that message.")]
    NoMatchingCommit,

    #[from]
    #[display(fmt = "io error: {}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "serialization error: {}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "missing object {}", _0)]
    MissingObject(ObjectId),
    #[display(fmt = "malformed object id {:?}", _0)]
    MalformedId(String),
    #[display(fmt = "corrupt repository state: {}", _0)]
    Corrupt(String),
    #[display(fmt = "commits {} and {} share no history", _0, _1)]
    NoCommonAncestor(ObjectId, ObjectId),
}

impl Error {
    /// Whether this error means the on-disk state is already inconsistent.
    /// Fatal errors abort the process instead of being reported as a
    /// regular message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::IO(_)
                | Error::Serde(_)
                | Error::MissingObject(_)
                | Error::MalformedId(_)
                | Error::Corrupt(_)
                | Error::NoCommonAncestor(..)
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_user_errors_are_not_fatal() {
    assert!(!Error::NothingToRemove.is_fatal());
    assert!(!Error::AmbiguousOrNotFound("abc".into()).is_fatal());
    assert_eq!(Error::NothingToRemove.to_string(), "No reason to remove the file.");
    let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    assert!(Error::from(io).is_fatal());
}
