//! The object store is an external collaborator (§6): the merge engine reads
//! and writes blobs/trees/commits through this trait and never touches a
//! filesystem, pack file, or on-disk index format directly. Callers wire up
//! a real backend; [`InMemoryObjectStore`] is the reference implementation
//! used by this crate's own tests and is a reasonable starting point for a
//! caller that just wants something working.

use crate::error::{MergeError, MergeResult};
use crate::oid::{hash_bytes, ObjectId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

pub trait ObjectStore: Send + Sync {
    /// reads the raw bytes of an object, failing if it doesn't exist or
    /// isn't of the expected kind.
    fn read(&self, id: &ObjectId, expected: ObjectKind) -> MergeResult<Vec<u8>>;

    /// inserts a new object, returning its id. inserting the same bytes
    /// twice must return the same id (content addressing).
    fn insert(&self, kind: ObjectKind, bytes: &[u8]) -> MergeResult<ObjectId>;

    /// flush any buffered writes. a no-op for purely in-memory stores.
    fn flush(&self) -> MergeResult<()> {
        Ok(())
    }
}

/// A trivial thread-safe in-memory object store, keyed by the hash of
/// `"{kind} {len}\0{bytes}"`, mirroring git's own loose-object framing
/// closely enough that ids are stable and collision-free for our purposes.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<FxHashMap<ObjectId, (ObjectKind, Arc<[u8]>)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn framed(kind: ObjectKind, bytes: &[u8]) -> Vec<u8> {
        let mut framed = format!("{} {}\0", kind.as_str(), bytes.len()).into_bytes();
        framed.extend_from_slice(bytes);
        framed
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId, expected: ObjectKind) -> MergeResult<Vec<u8>> {
        let objects = self.objects.read();
        match objects.get(id) {
            Some((kind, bytes)) if *kind == expected => Ok(bytes.to_vec()),
            Some(_) => Err(MergeError::UnexpectedObjectKind(*id, expected.as_str()).into()),
            None => Err(MergeError::ObjectNotFound(*id).into()),
        }
    }

    fn insert(&self, kind: ObjectKind, bytes: &[u8]) -> MergeResult<ObjectId> {
        let framed = Self::framed(kind, bytes);
        let id = hash_bytes(&framed);
        self.objects.write().entry(id).or_insert_with(|| (kind, Arc::from(bytes)));
        Ok(id)
    }
}
