//! Scoped acquisition of the repository's index (§5 "shared resource
//! policy"): "acquisition is scoped; release on all exit paths... If a
//! caller passes its own already-locked index, the engine uses it without
//! re-locking and does not release it."
//!
//! There's no on-disk lock file here -- index I/O is itself an external
//! concern -- so this models the RAII shape with an in-memory mutex
//! instead of a lock file on disk.

use crate::index::Index;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

/// Either a lock this merge call acquired itself (released on drop), one
/// the caller already held (left alone on drop), or a private index this
/// call created for itself (in-core mode, recursive sub-merges: glossary
/// "in-core mode").
pub enum IndexHandle<'a> {
    Locked(MutexGuard<'a, Index>),
    Borrowed(&'a mut Index),
    Owned(Index),
}

impl<'a> Deref for IndexHandle<'a> {
    type Target = Index;

    fn deref(&self) -> &Index {
        match self {
            IndexHandle::Locked(guard) => guard,
            IndexHandle::Borrowed(index) => index,
            IndexHandle::Owned(index) => index,
        }
    }
}

impl<'a> DerefMut for IndexHandle<'a> {
    fn deref_mut(&mut self) -> &mut Index {
        match self {
            IndexHandle::Locked(guard) => guard,
            IndexHandle::Borrowed(index) => index,
            IndexHandle::Owned(index) => index,
        }
    }
}

/// What the merger was handed: its own shared index to lock, an index the
/// caller already owns and has locked on our behalf, or nothing at all (a
/// fresh private index is created on acquisition).
pub enum IndexSource<'a> {
    Shared(&'a Mutex<Index>),
    Provided(&'a mut Index),
    Fresh,
}

impl<'a> IndexSource<'a> {
    pub fn acquire(self) -> IndexHandle<'a> {
        match self {
            IndexSource::Shared(mutex) => IndexHandle::Locked(mutex.lock()),
            IndexSource::Provided(index) => IndexHandle::Borrowed(index),
            IndexSource::Fresh => IndexHandle::Owned(Index::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_source_acquires_and_releases_the_lock() {
        let mutex = Mutex::new(Index::new());
        {
            let mut handle = IndexSource::Shared(&mutex).acquire();
            handle.add_entry(crate::index::IndexEntry::resolved(
                "a".into(),
                crate::mode::FileMode::Regular,
                crate::oid::hash_bytes("a"),
                0,
            ));
        }
        // lock must have been released: a fresh acquisition succeeds
        let handle = IndexSource::Shared(&mutex).acquire();
        assert_eq!(handle.iter().count(), 1);
    }

    #[test]
    fn fresh_source_starts_from_an_empty_private_index() {
        let handle = IndexSource::Fresh.acquire();
        assert_eq!(handle.iter().count(), 0);
    }

    #[test]
    fn provided_source_mutates_caller_owned_index_in_place() {
        let mut index = Index::new();
        {
            let mut handle = IndexSource::Provided(&mut index).acquire();
            handle.add_entry(crate::index::IndexEntry::resolved(
                "a".into(),
                crate::mode::FileMode::Regular,
                crate::oid::hash_bytes("a"),
                0,
            ));
        }
        assert_eq!(index.iter().count(), 1);
    }
}
