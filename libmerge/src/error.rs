//! Error types for the merge engine.
//!
//! `anyhow` for the ambient result type, with a small enum of errors that
//! call sites sometimes need to match on rather than just propagate and
//! display.

use crate::oid::ObjectId;
use std::fmt::{self, Display, Formatter};

pub type MergeResult<T> = Result<T, MergeGenericError>;
pub type MergeGenericError = anyhow::Error;

/// Errors with enough structure that a caller may want to match on them,
/// as opposed to just bubbling them up and displaying them.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(test, derive(PartialEq))]
pub enum MergeError {
    #[error("object `{0}` not found in object store")]
    ObjectNotFound(ObjectId),
    #[error("object `{0}` is not a {1}")]
    UnexpectedObjectKind(ObjectId, &'static str),
    #[error("no common ancestor between `{0}` and `{1}`")]
    NoCommonAncestor(ObjectId, ObjectId),
    #[error("too many merge bases between `{0}` and `{1}` (limit is {2})")]
    TooManyBases(ObjectId, ObjectId, usize),
    #[error("`{0}` and `{1}` have multiple merge bases, which the resolve strategy does not support")]
    MultipleMergeBasesNotSupported(ObjectId, ObjectId),
    #[error("recursive merge-base computation produced conflicts")]
    ConflictsDuringMergeBaseCalculation,
    #[error("index is dirty at `{0}`, refusing to merge")]
    DirtyIndex(crate::path::RepoPath),
    #[error("working tree is dirty at `{0}`, refusing to merge")]
    DirtyWorktree(crate::path::RepoPath),
    #[error("could not delete `{0}` during checkout")]
    CouldNotDelete(crate::path::RepoPath),
    #[error("invalid merge configuration: {0}")]
    InvalidConfig(String),
}

pub trait MergeErrorExt {
    fn try_into_merge_error(self) -> MergeResult<MergeError>;
}

impl MergeErrorExt for MergeGenericError {
    fn try_into_merge_error(self) -> MergeResult<MergeError> {
        self.downcast::<MergeError>()
    }
}

pub trait MergeResultExt {
    /// soft failures populate unmerged paths and let the walk continue;
    /// everything else aborts the whole merge.
    fn is_fatal(&self) -> bool;
}

impl MergeResultExt for MergeGenericError {
    fn is_fatal(&self) -> bool {
        match self.downcast_ref::<MergeError>() {
            Some(err) => matches!(
                err,
                MergeError::DirtyIndex(..)
                    | MergeError::DirtyWorktree(..)
                    | MergeError::CouldNotDelete(..)
                    | MergeError::ConflictsDuringMergeBaseCalculation
                    | MergeError::TooManyBases(..)
            ),
            // an error we don't recognise came from some external collaborator
            // (object store, revision walker, ...); treat it as fatal
            None => true,
        }
    }
}

impl<T> MergeResultExt for MergeResult<T> {
    fn is_fatal(&self) -> bool {
        match self {
            Ok(..) => false,
            Err(err) => err.is_fatal(),
        }
    }
}

/// One unmerged path recorded by the tree walk when it hits a soft conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConflict {
    pub path: crate::path::RepoPath,
    pub kind: PathConflictKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathConflictKind {
    ContentConflict,
    RenameConflict,
    FileDirectoryConflict,
    DeleteModifyConflict,
    ModifyDeleteConflict,
    SubmoduleConflict,
}

impl Display for PathConflictKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathConflictKind::ContentConflict => "content conflict",
            PathConflictKind::RenameConflict => "rename conflict",
            PathConflictKind::FileDirectoryConflict => "file/directory conflict",
            PathConflictKind::DeleteModifyConflict => "deleted in one side, modified in the other",
            PathConflictKind::ModifyDeleteConflict => "modified in one side, deleted in the other",
            PathConflictKind::SubmoduleConflict => "submodule conflict",
        };
        write!(f, "{}", s)
    }
}
