//! The working tree is an optional external collaborator (§4.5 slot
//! `T_WORK`): attached only when the merge isn't running in-core. The
//! engine never reads or writes files itself -- it asks this trait whether
//! a path's on-disk state matches what the index expects (§4.5.2).

use crate::error::MergeResult;
use crate::mode::FileMode;
use crate::oid::ObjectId;
use crate::path::RepoPath;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkTreeStatus {
    pub mode: FileMode,
    pub oid: ObjectId,
    pub size: u64,
    pub mtime: i64,
}

pub trait WorkingTreeView: Send + Sync {
    /// `None` means the path doesn't exist on disk.
    fn status(&self, path: &RepoPath) -> Option<WorkTreeStatus>;
}

/// §4.5.2: a path's work-tree entry is dirty iff it differs from the ours
/// `IndexEntry` (size, timestamp, or content hash). An empty directory
/// where ours is MISSING is never dirty.
pub fn is_dirty(
    work: &dyn WorkingTreeView,
    path: &RepoPath,
    ours_mode: Option<FileMode>,
    ours_oid: Option<ObjectId>,
    ours_size: u64,
) -> bool {
    match (work.status(path), ours_mode, ours_oid) {
        (None, None, _) => false,
        (None, Some(_), _) => true,
        (Some(_), None, _) => true,
        (Some(status), Some(mode), Some(oid)) => {
            status.mode != mode || status.oid != oid || status.size != ours_size
        }
    }
}

/// The write side of the same collaborator (§4.5.3 "writing merged
/// content", §4.6.1 revert, §5 ordering of deletions/checkouts). Never
/// invoked in in-core mode -- see [`NullWorkingTree`].
pub trait WorkingTreeWriter: Send + Sync {
    /// writes `bytes` to `path` at `mode`, creating parent directories as
    /// needed (§4.5.3: "`mkdirs` parents as needed").
    fn checkout(&self, path: &RepoPath, mode: FileMode, bytes: &[u8]) -> MergeResult<()>;

    /// removes `path`. Per §5, callers must invoke this in reverse path
    /// order across a whole merge so that `dir/file` is gone before `dir`
    /// is attempted.
    fn delete(&self, path: &RepoPath) -> MergeResult<()>;
}

/// The in-core merge's working-tree collaborator: every operation is a
/// no-op, since an in-core merge touches only the object store and an
/// in-memory index (glossary "in-core mode").
#[derive(Default)]
pub struct NullWorkingTree;

impl WorkingTreeView for NullWorkingTree {
    fn status(&self, _path: &RepoPath) -> Option<WorkTreeStatus> {
        None
    }
}

impl WorkingTreeWriter for NullWorkingTree {
    fn checkout(&self, _path: &RepoPath, _mode: FileMode, _bytes: &[u8]) -> MergeResult<()> {
        Ok(())
    }

    fn delete(&self, _path: &RepoPath) -> MergeResult<()> {
        Ok(())
    }
}

/// A reference working-tree backend for tests and for callers that want a
/// working "on-disk" merge without actually touching the filesystem. Not
/// meant for production use -- a real caller wires up a backend over the
/// actual repository checkout.
#[derive(Default)]
pub struct InMemoryWorkingTree {
    files: RwLock<FxHashMap<RepoPath, (FileMode, ObjectId, Vec<u8>)>>,
}

impl InMemoryWorkingTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: RepoPath, mode: FileMode, bytes: Vec<u8>) {
        let oid = crate::oid::hash_bytes(&bytes);
        self.files.write().insert(path, (mode, oid, bytes));
    }

    pub fn contains(&self, path: &RepoPath) -> bool {
        self.files.read().contains_key(path)
    }

    pub fn read(&self, path: &RepoPath) -> Option<Vec<u8>> {
        self.files.read().get(path).map(|(_, _, bytes)| bytes.clone())
    }
}

impl WorkingTreeView for InMemoryWorkingTree {
    fn status(&self, path: &RepoPath) -> Option<WorkTreeStatus> {
        self.files.read().get(path).map(|(mode, oid, bytes)| WorkTreeStatus {
            mode: *mode,
            oid: *oid,
            size: bytes.len() as u64,
            mtime: 0,
        })
    }
}

impl WorkingTreeWriter for InMemoryWorkingTree {
    fn checkout(&self, path: &RepoPath, mode: FileMode, bytes: &[u8]) -> MergeResult<()> {
        let oid = crate::oid::hash_bytes(bytes);
        self.files.write().insert(path.clone(), (mode, oid, bytes.to_vec()));
        Ok(())
    }

    fn delete(&self, path: &RepoPath) -> MergeResult<()> {
        self.files.write().remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeWorkTree(HashMap<String, WorkTreeStatus>);

    impl WorkingTreeView for FakeWorkTree {
        fn status(&self, path: &RepoPath) -> Option<WorkTreeStatus> {
            self.0.get(path.as_str()).copied()
        }
    }

    #[test]
    fn missing_on_both_sides_is_clean() {
        let work = FakeWorkTree(HashMap::new());
        assert!(!is_dirty(&work, &"a".into(), None, None, 0));
    }

    #[test]
    fn matching_entry_is_clean() {
        let oid = crate::oid::hash_bytes("content");
        let mut map = HashMap::new();
        map.insert(
            "a".to_owned(),
            WorkTreeStatus { mode: FileMode::Regular, oid, size: 7, mtime: 0 },
        );
        let work = FakeWorkTree(map);
        assert!(!is_dirty(&work, &"a".into(), Some(FileMode::Regular), Some(oid), 7));
    }

    #[test]
    fn size_mismatch_is_dirty() {
        let oid = crate::oid::hash_bytes("content");
        let mut map = HashMap::new();
        map.insert(
            "a".to_owned(),
            WorkTreeStatus { mode: FileMode::Regular, oid, size: 999, mtime: 0 },
        );
        let work = FakeWorkTree(map);
        assert!(is_dirty(&work, &"a".into(), Some(FileMode::Regular), Some(oid), 7));
    }

    #[test]
    fn in_memory_working_tree_roundtrips_checkout_and_delete() {
        let work = InMemoryWorkingTree::new();
        let path = RepoPath::from("a/b");
        work.checkout(&path, FileMode::Regular, b"hi").unwrap();
        assert_eq!(work.read(&path).as_deref(), Some(&b"hi"[..]));
        work.delete(&path).unwrap();
        assert!(!work.contains(&path));
    }
}
