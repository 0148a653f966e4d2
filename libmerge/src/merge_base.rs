//! C7: merge-base discovery and recursive virtual-base synthesis (§4.1).
//!
//! This module only knows about commits and the revision walker; it has no
//! dependency on [`crate::merger`]. The "merge the trees of current and
//! next" half of the recursive step (§4.1 step 4) is supplied by the caller
//! as a closure, so the actual three-way tree merge -- and the decision of
//! what `ignoreConflicts=true` means at the tree-walk level -- stays owned
//! by C6. [`crate::merger::ThreeWayMerger`] is what plugs that closure in.

use crate::commit::{Commit, CommitMessage, CommitRef, Signature};
use crate::error::{MergeError, MergeResult};
use crate::object_store::ObjectStore;
use crate::oid::ObjectId;
use crate::revwalk::RevisionWalker;
use chrono::Duration;
use smallvec::smallvec;

/// §4.1 step 1: "If |B| > MAX_BASES (200), fail with TOO_MANY_BASES."
pub const MAX_BASES: usize = 200;

const VIRTUAL_AUTHOR_NAME: &str = "merge-base synthesis";
const VIRTUAL_AUTHOR_EMAIL: &str = "merge-base-synthesis@invalid";

/// What a single merge-base computation resolves to (§4.1 contract: "a
/// single best ancestor commit", "the sentinel no common ancestor", or "a
/// synthesized virtual commit").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeBase {
    Commit(ObjectId),
    NoCommonAncestor,
}

impl MergeBase {
    /// "treated as an empty tree" (§4.1 step 2) when there's no ancestor.
    pub fn tree(self, store: &dyn ObjectStore) -> MergeResult<ObjectId> {
        match self {
            MergeBase::Commit(oid) => CommitRef::new(store, oid).tree(),
            MergeBase::NoCommonAncestor => Ok(crate::oid::EMPTY_TREE_SHA1),
        }
    }
}

/// The `resolve` strategy (§4.7): single-base behavior only, fails soft
/// (raised, per §7 "base-resolution errors") if the walker reports more than
/// one minimal common ancestor.
pub fn resolve_single(walker: &dyn RevisionWalker, a: ObjectId, b: ObjectId) -> MergeResult<MergeBase> {
    let bases = walker.merge_bases(a, b)?;
    match bases.len() {
        0 => Ok(MergeBase::NoCommonAncestor),
        1 => Ok(MergeBase::Commit(bases[0])),
        _ => Err(MergeError::MultipleMergeBasesNotSupported(a, b).into()),
    }
}

/// The `recursive` strategy (§4.7): reduces any number of minimal common
/// ancestors to a single virtual base (§4.1 step 4) by recursively merging
/// pairs of bases. `merge_trees(base, ours, theirs)` must perform that
/// merge in ignore-conflicts mode and return the resulting tree id, failing
/// only when a structural conflict is left unresolved -- this function
/// doesn't interpret that failure further, it just propagates it.
pub fn resolve_recursive(
    walker: &dyn RevisionWalker,
    store: &dyn ObjectStore,
    a: ObjectId,
    b: ObjectId,
    merge_trees: &mut dyn FnMut(ObjectId, ObjectId, ObjectId) -> MergeResult<ObjectId>,
) -> MergeResult<MergeBase> {
    let bases = walker.merge_bases(a, b)?;
    trace!("resolve_recursive({}, {}): {} base(s)", a, b, bases.len());
    if bases.len() > MAX_BASES {
        return Err(MergeError::TooManyBases(a, b, MAX_BASES).into());
    }
    match bases.len() {
        0 => Ok(MergeBase::NoCommonAncestor),
        1 => Ok(MergeBase::Commit(bases[0])),
        _ => {
            debug!("resolve_recursive({}, {}): criss-cross, synthesizing virtual base", a, b);
            Ok(MergeBase::Commit(reduce(walker, store, bases, merge_trees)?))
        }
    }
}

/// §4.1 step 4: `current <- B[0]`, then fold each remaining base in,
/// synthesizing a new virtual `current` at each step.
fn reduce(
    walker: &dyn RevisionWalker,
    store: &dyn ObjectStore,
    mut bases: Vec<ObjectId>,
    merge_trees: &mut dyn FnMut(ObjectId, ObjectId, ObjectId) -> MergeResult<ObjectId>,
) -> MergeResult<ObjectId> {
    let mut current = bases.remove(0);
    for next in bases {
        // "recursively compute base(current, next) at depth+1"
        let nested = resolve_recursive(walker, store, current, next, merge_trees)?;
        let nested_tree = nested.tree(store)?;
        let current_tree = CommitRef::new(store, current).tree()?;
        let next_tree = CommitRef::new(store, next).tree()?;
        let merged_tree = merge_trees(nested_tree, current_tree, next_tree)?;
        current = synthesize_virtual_commit(store, merged_tree, current, next)?;
    }
    Ok(current)
}

/// §4.1 step 4 last two bullets: "synthesize a commit object with the
/// merged tree and parents {current, next}... author/committer =
/// deterministic placeholder; commit time = max(parents.time)+1."
///
/// Intended as local to the walker, never written to durable storage, but
/// this engine has no structural home for that distinction: there is
/// exactly one [`ObjectStore`] collaborator, not a separate durable store
/// and a walker-local scratch store. Inserting through the same store is
/// harmless -- the store is content-addressed, so a virtual commit that
/// happens to collide with a real one just dedupes -- see DESIGN.md.
fn synthesize_virtual_commit(
    store: &dyn ObjectStore,
    tree: ObjectId,
    current: ObjectId,
    next: ObjectId,
) -> MergeResult<ObjectId> {
    let current_time = CommitRef::new(store, current).load()?.committer.time;
    let next_time = CommitRef::new(store, next).load()?.committer.time;
    let time = current_time.max(next_time) + Duration::seconds(1);
    let signature = Signature {
        name: VIRTUAL_AUTHOR_NAME.to_owned(),
        email: VIRTUAL_AUTHOR_EMAIL.to_owned(),
        time,
    };
    let commit = Commit {
        tree,
        parents: smallvec![current, next],
        author: signature.clone(),
        committer: signature,
        message: CommitMessage::new_subject("virtual merge base"),
    };
    // `ObjectStoreCommitExt::insert_commit` requires `Self: Sized` (it's
    // meant for concrete store types), which a `&dyn ObjectStore` doesn't
    // satisfy; go through the base trait method directly instead.
    store.insert(crate::object_store::ObjectKind::Commit, &commit.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::InMemoryObjectStore;
    use crate::commit::ObjectStoreCommitExt;
    use crate::revwalk::CommitGraphRevWalker;
    use crate::tree::ObjectStoreExt;
    use chrono::{FixedOffset, TimeZone};
    use smallvec::SmallVec;

    fn sig(t: i64) -> Signature {
        Signature {
            name: "t".into(),
            email: "t@t".into(),
            time: FixedOffset::east_opt(0).unwrap().timestamp_opt(t, 0).unwrap(),
        }
    }

    fn commit(store: &InMemoryObjectStore, tree: ObjectId, t: i64, parents: SmallVec<[ObjectId; 2]>) -> ObjectId {
        let commit = Commit { tree, parents, author: sig(t), committer: sig(t), message: CommitMessage::new_subject("c") };
        store.insert_commit(&commit).unwrap()
    }

    #[test]
    fn single_common_ancestor_resolves_directly() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let b = commit(&store, crate::oid::EMPTY_TREE_SHA1, 1, smallvec![a]);
        let c = commit(&store, crate::oid::EMPTY_TREE_SHA1, 2, smallvec![b]);
        let walker = CommitGraphRevWalker::new(&store);

        let mut never_called = |_: ObjectId, _: ObjectId, _: ObjectId| -> MergeResult<ObjectId> {
            panic!("merge_trees should not run when there's a single minimal base")
        };
        assert_eq!(
            resolve_recursive(&walker, &store, b, c, &mut never_called).unwrap(),
            MergeBase::Commit(b)
        );
    }

    #[test]
    fn unrelated_histories_resolve_to_no_common_ancestor() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let b = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let walker = CommitGraphRevWalker::new(&store);
        let mut never_called = |_: ObjectId, _: ObjectId, _: ObjectId| -> MergeResult<ObjectId> {
            panic!("merge_trees should not run with no common ancestor")
        };
        assert_eq!(resolve_recursive(&walker, &store, a, b, &mut never_called).unwrap(), MergeBase::NoCommonAncestor);
    }

    #[test]
    fn resolve_single_rejects_criss_cross_histories() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let b = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let c = commit(&store, crate::oid::EMPTY_TREE_SHA1, 1, smallvec![a, b]);
        let d = commit(&store, crate::oid::EMPTY_TREE_SHA1, 1, smallvec![a, b]);
        let walker = CommitGraphRevWalker::new(&store);
        let err = resolve_single(&walker, c, d).unwrap_err();
        assert_eq!(
            err.downcast::<MergeError>().unwrap(),
            MergeError::MultipleMergeBasesNotSupported(c, d)
        );
    }

    // criss-cross: two minimal bases a, b reduce to one virtual commit whose
    // parents are exactly {a, b} and whose tree is whatever `merge_trees`
    // (a stand-in for a real ignore-conflicts three-way tree merge) returns.
    #[test]
    fn criss_cross_reduces_to_a_single_virtual_base() {
        let store = InMemoryObjectStore::new();
        let a = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let b = commit(&store, crate::oid::EMPTY_TREE_SHA1, 0, smallvec![]);
        let c = commit(&store, crate::oid::EMPTY_TREE_SHA1, 1, smallvec![a, b]);
        let d = commit(&store, crate::oid::EMPTY_TREE_SHA1, 1, smallvec![a, b]);
        let walker = CommitGraphRevWalker::new(&store);

        let synthesized_tree = store.insert_blob(b"doesn't matter, just a placeholder tree id").unwrap();
        let mut merge_trees = |_base: ObjectId, _ours: ObjectId, _theirs: ObjectId| -> MergeResult<ObjectId> {
            Ok(synthesized_tree)
        };

        let base = resolve_recursive(&walker, &store, c, d, &mut merge_trees).unwrap();
        let MergeBase::Commit(virtual_oid) = base else { panic!("expected a synthesized commit") };
        let synthesized = CommitRef::new(&store, virtual_oid).load().unwrap();
        assert_eq!(synthesized.tree, synthesized_tree);
        let mut parents: Vec<_> = synthesized.parents.into_iter().collect();
        parents.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(parents, expected);
    }

    #[test]
    fn exceeding_max_bases_is_fatal() {
        struct ManyBasesWalker(ObjectId);
        impl RevisionWalker for ManyBasesWalker {
            fn merge_bases(&self, _a: ObjectId, _b: ObjectId) -> MergeResult<Vec<ObjectId>> {
                Ok(vec![self.0; MAX_BASES + 1])
            }
        }
        let store = InMemoryObjectStore::new();
        let walker = ManyBasesWalker(crate::oid::hash_bytes("x"));
        let mut never_called = |_: ObjectId, _: ObjectId, _: ObjectId| -> MergeResult<ObjectId> {
            panic!("must fail before attempting any reduction")
        };
        let err =
            resolve_recursive(&walker, &store, crate::oid::hash_bytes("a"), crate::oid::hash_bytes("b"), &mut never_called)
                .unwrap_err();
        assert_eq!(
            err.downcast::<MergeError>().unwrap(),
            MergeError::TooManyBases(crate::oid::hash_bytes("a"), crate::oid::hash_bytes("b"), MAX_BASES)
        );
    }
}
