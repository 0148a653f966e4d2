//! The revision walker is an external collaborator (§6): `markStart`,
//! `setFilter(MERGE_BASE)`, `next()`. The engine only ever asks it one
//! question -- "what are the minimal common ancestors of these two
//! commits" -- so the trait here exposes exactly that, with
//! [`CommitGraphRevWalker`] as a reference implementation any caller can
//! start from before wiring up their own commit-graph machinery.
//!
//! How the walker enumerates minimal bases (the DAG-walk algorithm itself)
//! is explicitly out of scope (§9 Non-goals); the implementation below
//! favors an obviously-correct ancestor-set reduction over the
//! incremental priority-queue generation real revision walkers use, since
//! that performance characteristic isn't part of the contract.

use crate::commit::CommitRef;
use crate::error::MergeResult;
use crate::object_store::ObjectStore;
use crate::oid::ObjectId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

pub trait RevisionWalker {
    /// minimal common ancestors of `a` and `b`: commits reachable from both
    /// that are not themselves reachable from another common ancestor.
    fn merge_bases(&self, a: ObjectId, b: ObjectId) -> MergeResult<Vec<ObjectId>>;
}

pub struct CommitGraphRevWalker<'s> {
    store: &'s dyn ObjectStore,
}

impl<'s> CommitGraphRevWalker<'s> {
    pub fn new(store: &'s dyn ObjectStore) -> Self {
        Self { store }
    }

    fn ancestors(&self, start: ObjectId) -> MergeResult<FxHashSet<ObjectId>> {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        seen.insert(start);
        while let Some(oid) = queue.pop_front() {
            for parent in CommitRef::new(self.store, oid).parents()? {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(seen)
    }
}

impl<'s> RevisionWalker for CommitGraphRevWalker<'s> {
    fn merge_bases(&self, a: ObjectId, b: ObjectId) -> MergeResult<Vec<ObjectId>> {
        if a == b {
            return Ok(vec![a]);
        }
        let ancestors_a = self.ancestors(a)?;
        let ancestors_b = self.ancestors(b)?;
        let common: FxHashSet<ObjectId> =
            ancestors_a.intersection(&ancestors_b).copied().collect();
        if common.is_empty() {
            return Ok(Vec::new());
        }

        // a common ancestor `c` is non-minimal if it is itself an ancestor
        // of some other common ancestor `c2`; drop those, keeping only the
        // "closest" common ancestors to `a`/`b`.
        let mut dominated: FxHashSet<ObjectId> = FxHashSet::default();
        let mut ancestor_cache: FxHashMap<ObjectId, FxHashSet<ObjectId>> = FxHashMap::default();
        for &c2 in &common {
            let ancestors_of_c2 = match ancestor_cache.get(&c2) {
                Some(set) => set.clone(),
                None => {
                    let set = self.ancestors(c2)?;
                    ancestor_cache.insert(c2, set.clone());
                    set
                }
            };
            for &c in &common {
                if c != c2 && ancestors_of_c2.contains(&c) {
                    dominated.insert(c);
                }
            }
        }

        let mut minimal: Vec<ObjectId> = common.difference(&dominated).copied().collect();
        minimal.sort();
        Ok(minimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{Commit, CommitMessage, ObjectStoreCommitExt, Signature};
    use crate::object_store::InMemoryObjectStore;
    use chrono::{FixedOffset, TimeZone};
    use smallvec::{smallvec, SmallVec};

    fn sig(t: i64) -> Signature {
        Signature {
            name: "t".into(),
            email: "t@t".into(),
            time: FixedOffset::east_opt(0).unwrap().timestamp_opt(t, 0).unwrap(),
        }
    }

    fn commit(store: &InMemoryObjectStore, t: i64, parents: SmallVec<[ObjectId; 2]>) -> ObjectId {
        let commit = Commit {
            tree: crate::oid::EMPTY_TREE_SHA1,
            parents,
            author: sig(t),
            committer: sig(t),
            message: CommitMessage::new_subject(format!("commit at {}", t)),
        };
        store.insert_commit(&commit).unwrap()
    }

    #[test]
    fn linear_history_has_single_merge_base() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, 0, smallvec![]);
        let b = commit(&store, 1, smallvec![a]);
        let c = commit(&store, 2, smallvec![b]);
        let walker = CommitGraphRevWalker::new(&store);
        assert_eq!(walker.merge_bases(b, c).unwrap(), vec![b]);
    }

    // a - c
    //   X
    // b - d
    #[test]
    fn criss_cross_has_two_minimal_bases() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, 0, smallvec![]);
        let b = commit(&store, 0, smallvec![]);
        let c = commit(&store, 1, smallvec![a, b]);
        let d = commit(&store, 1, smallvec![a, b]);
        let walker = CommitGraphRevWalker::new(&store);
        let mut bases = walker.merge_bases(c, d).unwrap();
        bases.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(bases, expected);
    }

    #[test]
    fn unrelated_histories_have_no_common_ancestor() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, 0, smallvec![]);
        let b = commit(&store, 0, smallvec![]);
        let walker = CommitGraphRevWalker::new(&store);
        assert!(walker.merge_bases(a, b).unwrap().is_empty());
    }
}
