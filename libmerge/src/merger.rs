//! C6: the three-way merger (§4.6). Orchestrates merge-base discovery (C7),
//! rename reconciliation (C4), and tree-walk triage (C5); persists the
//! result as index entries and, on a clean merge, a new tree object.

use crate::attributes::{AttributeProvider, NullAttributeProvider};
use crate::commit::CommitRef;
use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::index::{Index, Stage};
use crate::lockfile::IndexSource;
use crate::merge_algorithm::ContentMergeStrategy;
use crate::merge_base::{self, MergeBase};
use crate::object_store::ObjectStore;
use crate::oid::ObjectId;
use crate::path::RepoPath;
use crate::rename::{self, ExactRenameDetector, RenameDetector, RenameResolver, SideState};
use crate::revwalk::RevisionWalker;
use crate::tree::{ObjectStoreExt, Tree, TreeEntry};
use crate::tree_walk::{TreeWalk, TreeWalkInputs, WalkOutcome};
use crate::worktree::{NullWorkingTree, WorkingTreeView, WorkingTreeWriter};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// §4.7: which of the two base-resolution behaviors a merger should use.
/// `OneSided` never constructs a [`ThreeWayMerger`] at all -- see
/// [`crate::strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseStrategy {
    /// the `resolve` strategy: fails if the tips have multiple merge bases.
    Resolve,
    /// the `recursive` strategy: synthesizes a virtual base when needed.
    Recursive,
}

/// A fatal, non-conflict reason a path's checkout/delete/index-dirty check
/// failed (§4.5.5, §7 "path fatalities"). Distinct from the soft conflict
/// kinds in `error::PathConflictKind`, which populate `unmerged_paths` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFailureKind {
    DirtyIndex,
    DirtyWorktree,
    CouldNotDelete,
}

/// §4.6 operation 1's return shape.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub cleanly_merged: bool,
    pub result_tree_id: Option<ObjectId>,
    pub unmerged_paths: Vec<RepoPath>,
    pub failing_paths: FxHashMap<RepoPath, PathFailureKind>,
    pub merge_results: FxHashMap<RepoPath, Vec<u8>>,
    pub to_be_checked_out: Vec<RepoPath>,
    pub to_be_deleted: Vec<RepoPath>,
    pub modified_files: Vec<RepoPath>,
}

impl MergeOutcome {
    fn failed(failing_paths: FxHashMap<RepoPath, PathFailureKind>) -> Self {
        Self { cleanly_merged: false, failing_paths, ..Default::default() }
    }
}

/// Everything the merger borrows from the caller's repository (§6). Built
/// fresh for each [`crate::strategy::MergeStrategy::new_merger`] call.
pub struct RepoHandle<'a> {
    pub store: &'a dyn ObjectStore,
    pub walker: &'a dyn RevisionWalker,
    pub attributes: &'a dyn AttributeProvider,
    pub work_view: Option<&'a dyn WorkingTreeView>,
    pub work_writer: Option<&'a dyn WorkingTreeWriter>,
    pub index: IndexSource<'a>,
    /// glossary "in-core mode": no working tree or on-disk index touched.
    pub in_core: bool,
}

impl<'a> RepoHandle<'a> {
    /// A handle wired up for an in-core merge: fresh private index, no
    /// working tree, no attribute lookups.
    pub fn in_core(store: &'a dyn ObjectStore, walker: &'a dyn RevisionWalker) -> Self {
        Self {
            store,
            walker,
            attributes: &NullAttributeProvider,
            work_view: None,
            work_writer: None,
            index: IndexSource::Fresh,
            in_core: true,
        }
    }
}

/// C6. See module docs and §4.6.
pub struct ThreeWayMerger<'a> {
    store: &'a dyn ObjectStore,
    walker: &'a dyn RevisionWalker,
    attributes: &'a dyn AttributeProvider,
    work_view: Option<&'a dyn WorkingTreeView>,
    work_writer: Option<&'a dyn WorkingTreeWriter>,
    index_source: IndexSource<'a>,
    base_strategy: BaseStrategy,
    forced_base: Option<ObjectId>,
    config: MergeConfig,
}

impl<'a> ThreeWayMerger<'a> {
    pub fn new(repo: RepoHandle<'a>, base_strategy: BaseStrategy) -> Self {
        Self {
            store: repo.store,
            walker: repo.walker,
            attributes: repo.attributes,
            work_view: repo.work_view,
            work_writer: repo.work_writer,
            index_source: repo.index,
            base_strategy,
            forced_base: None,
            config: MergeConfig { in_core: repo.in_core, ..Default::default() },
        }
    }

    /// §4.6 operation 2: force the base instead of computing it via §4.1.
    pub fn set_base(&mut self, base: ObjectId) {
        self.forced_base = Some(base);
    }

    /// §4.6 operation 3.
    pub fn set_working_tree(&mut self, view: &'a dyn WorkingTreeView, writer: &'a dyn WorkingTreeWriter) {
        self.work_view = Some(view);
        self.work_writer = Some(writer);
    }

    /// §4.6 operation 4.
    pub fn set_content_merge_strategy(&mut self, strategy: ContentMergeStrategy) {
        self.config.content_merge_strategy = strategy;
    }

    /// §4.6 operation 5.
    pub fn set_commit_names(&mut self, names: crate::merge_result::CommitNames) {
        self.config.commit_names = names;
    }

    /// §4.6 operation 1.
    pub fn merge(mut self, base_tip: ObjectId, ours_tip: ObjectId, theirs_tip: ObjectId) -> MergeResult<MergeOutcome> {
        debug!("ThreeWayMerger::merge(base={}, ours={}, theirs={})", base_tip, ours_tip, theirs_tip);

        // step 1: resolve the base.
        let base_tree = self.resolve_base_tree(base_tip, ours_tip, theirs_tip)?;
        let ours_tree = CommitRef::new(self.store, ours_tip).tree()?;
        let theirs_tree = CommitRef::new(self.store, theirs_tip).tree()?;

        // step 2: rename table (§4.2), against the resolved trees.
        let (renames, ours_touched, theirs_touched) =
            self.build_rename_table(base_tree, ours_tree, theirs_tree)?;

        // step 3: acquire the index, snapshotting it for the dirty check and
        // for §4.6.1 revert.
        let mut index_handle = self.index_source_take().acquire();
        let pre_merge_snapshot = if self.config.in_core { None } else { Some(index_handle.clone()) };

        // step 4: run the walk.
        let walk_result = {
            let inputs = TreeWalkInputs {
                store: self.store,
                attributes: self.attributes,
                index: &mut index_handle,
                pre_merge_index: pre_merge_snapshot.as_ref(),
                work_view: self.work_view,
                work_writer: self.work_writer,
            };
            let walk =
                TreeWalk::new(inputs, &self.config, &renames, base_tree, &ours_touched, &theirs_touched)?;
            walk.run(base_tree, ours_tree, theirs_tree)
        };

        let outcome = match walk_result {
            Ok(outcome) => outcome,
            Err(err) => {
                // step 5: a fatal path failure (DIRTY_INDEX/DIRTY_WORKTREE)
                // aborts the merge and reverts, but is reported through the
                // result rather than raised (§4.5.5, §7).
                return match err.downcast::<MergeError>() {
                    Ok(MergeError::DirtyIndex(path)) => {
                        warn!("ThreeWayMerger::merge: dirty index at `{}`, reverting", path);
                        self.revert(&[], pre_merge_snapshot.as_ref())?;
                        Ok(MergeOutcome::failed(FxHashMap::from_iter([(path, PathFailureKind::DirtyIndex)])))
                    }
                    Ok(MergeError::DirtyWorktree(path)) => {
                        warn!("ThreeWayMerger::merge: dirty worktree at `{}`, reverting", path);
                        self.revert(&[], pre_merge_snapshot.as_ref())?;
                        Ok(MergeOutcome::failed(FxHashMap::from_iter([(path, PathFailureKind::DirtyWorktree)])))
                    }
                    Ok(other) => Err(other.into()),
                    Err(generic) => Err(generic),
                };
            }
        };

        // step 6: execute queued deletions (reverse path order), then
        // checkouts (path order); §5.
        if let Err(failure) = self.apply_checkouts_and_deletions(&outcome, &index_handle) {
            self.revert(&outcome.modified_files, pre_merge_snapshot.as_ref())?;
            return Ok(MergeOutcome::failed(failure));
        }

        // step 7: "commit" the index builder. Our in-memory `Index` has no
        // separate durable-commit step beyond releasing the lock (dropping
        // `index_handle` does that); nothing here can fail.

        // step 8: a clean walk gets a new tree object; otherwise report the
        // unmerged/failing state with no tree.
        if outcome.unmerged_paths.is_empty() {
            let tree_id = build_tree_from_index(self.store, &index_handle)?;
            info!("ThreeWayMerger::merge: clean merge, tree {}", tree_id);
            Ok(MergeOutcome {
                cleanly_merged: true,
                result_tree_id: Some(tree_id),
                unmerged_paths: Vec::new(),
                failing_paths: FxHashMap::default(),
                merge_results: outcome.merge_results_text,
                to_be_checked_out: outcome.to_be_checked_out,
                to_be_deleted: outcome.to_be_deleted,
                modified_files: outcome.modified_files,
            })
        } else {
            info!("ThreeWayMerger::merge: {} unmerged path(s)", outcome.unmerged_paths.len());
            Ok(MergeOutcome {
                cleanly_merged: false,
                result_tree_id: None,
                unmerged_paths: outcome.unmerged_paths,
                failing_paths: FxHashMap::default(),
                merge_results: outcome.merge_results_text,
                to_be_checked_out: outcome.to_be_checked_out,
                to_be_deleted: outcome.to_be_deleted,
                modified_files: outcome.modified_files,
            })
        }
    }

    fn index_source_take(&mut self) -> IndexSource<'a> {
        std::mem::replace(&mut self.index_source, IndexSource::Fresh)
    }

    /// §4.1: the authoritative base is always re-derived from `ours`/`theirs`
    /// history via the configured [`BaseStrategy`], overridable with
    /// [`Self::set_base`]. `base_tip` -- the base commit the *operation
    /// signature* accepts -- is honored only as a fallback for the
    /// `NoCommonAncestor` case, where a caller with knowledge the revision
    /// walker lacks (e.g. a shallow clone) can still supply something better
    /// than an empty tree; see DESIGN.md.
    fn resolve_base_tree(
        &mut self,
        base_tip: ObjectId,
        ours_tip: ObjectId,
        theirs_tip: ObjectId,
    ) -> MergeResult<ObjectId> {
        if let Some(oid) = self.forced_base {
            return CommitRef::new(self.store, oid).tree();
        }
        let computed = match self.base_strategy {
            BaseStrategy::Resolve => merge_base::resolve_single(self.walker, ours_tip, theirs_tip)?,
            BaseStrategy::Recursive => {
                let store = self.store;
                let walker = self.walker;
                let mut merge_trees = |base: ObjectId, ours: ObjectId, theirs: ObjectId| {
                    merge_ignoring_conflicts(store, walker, base, ours, theirs)
                };
                merge_base::resolve_recursive(walker, store, ours_tip, theirs_tip, &mut merge_trees)?
            }
        };
        match computed {
            MergeBase::NoCommonAncestor => {
                debug!("ThreeWayMerger::resolve_base_tree: no common ancestor, falling back to caller's base_tip");
                CommitRef::new(self.store, base_tip).tree()
            }
            resolved => resolved.tree(self.store),
        }
    }

    /// §4.2: builds the rename table from each side's diff against base.
    #[allow(clippy::type_complexity)]
    fn build_rename_table(
        &self,
        base_tree: ObjectId,
        ours_tree: ObjectId,
        theirs_tree: ObjectId,
    ) -> MergeResult<(
        Vec<rename::RenameEntry>,
        FxHashMap<RepoPath, rename::PathChange>,
        FxHashMap<RepoPath, rename::PathChange>,
    )> {
        let ours_diff = rename::diff_trees(self.store, base_tree, ours_tree)?;
        let theirs_diff = rename::diff_trees(self.store, base_tree, theirs_tree)?;

        let mut ours_detector = ExactRenameDetector::default();
        ours_detector.set_break_score(self.config.break_score);
        ours_detector.add_all(&ours_diff.deletions, &ours_diff.additions);
        let ours_renames = ours_detector.compute();

        let mut theirs_detector = ExactRenameDetector::default();
        theirs_detector.set_break_score(self.config.break_score);
        theirs_detector.add_all(&theirs_diff.deletions, &theirs_diff.additions);
        let theirs_renames = theirs_detector.compute();

        let (ours_deletions, ours_touched) = rename::leaf_changes(self.store, base_tree, ours_tree)?;
        let (theirs_deletions, theirs_touched) = rename::leaf_changes(self.store, base_tree, theirs_tree)?;
        let ours_state = SideState { deletions: &ours_deletions, additions_and_modifications: &ours_touched };
        let theirs_state = SideState { deletions: &theirs_deletions, additions_and_modifications: &theirs_touched };

        let entries = RenameResolver::resolve(ours_renames, theirs_renames, &ours_state, &theirs_state);
        Ok((entries, ours_touched, theirs_touched))
    }

    /// §5 ordering: deletions first in reverse path order, then checkouts
    /// in path order. On I/O failure, the failing path is reported as
    /// `COULD_NOT_DELETE` rather than raised (§4.5.5).
    fn apply_checkouts_and_deletions(
        &self,
        outcome: &WalkOutcome,
        index: &Index,
    ) -> Result<(), FxHashMap<RepoPath, PathFailureKind>> {
        if self.config.in_core {
            return Ok(());
        }
        let writer = match self.work_writer {
            Some(w) => w,
            None => return Ok(()),
        };

        let mut deletions = outcome.to_be_deleted.clone();
        deletions.sort_by(|a, b| b.cmp(a));
        for path in &deletions {
            if writer.delete(path).is_err() {
                return Err(FxHashMap::from_iter([(path.clone(), PathFailureKind::CouldNotDelete)]));
            }
        }

        let mut checkouts = outcome.to_be_checked_out.clone();
        checkouts.sort();
        for path in &checkouts {
            // the walk already staged the resolved entry for any path it
            // queued a checkout for; look its mode/oid back up from there.
            let Some(entry) = index.find(path, Stage::Resolved) else { continue };
            let bytes = match self.store.read_blob(&entry.oid) {
                Ok(bytes) => bytes,
                Err(_) => return Err(FxHashMap::from_iter([(path.clone(), PathFailureKind::CouldNotDelete)])),
            };
            if writer.checkout(path, entry.mode, &bytes).is_err() {
                return Err(FxHashMap::from_iter([(path.clone(), PathFailureKind::CouldNotDelete)]));
            }
        }
        Ok(())
    }

    /// §4.6.1.
    fn revert(&self, modified_files: &[RepoPath], pre_merge_index: Option<&Index>) -> MergeResult<()> {
        if self.config.in_core {
            return Ok(());
        }
        let (Some(writer), Some(pre_merge_index)) = (self.work_writer, pre_merge_index) else { return Ok(()) };
        for path in modified_files {
            if let Some(entry) = pre_merge_index.find(path, Stage::Resolved) {
                let bytes = self.store.read_blob(&entry.oid)?;
                writer.checkout(path, entry.mode, &bytes)?;
            }
        }
        Ok(())
    }
}

/// §4.1 step 4's "merge the trees... in a mode that ignores conflicts":
/// a self-contained in-core three-way tree merge over raw tree ids (not
/// commits), using C4+C5 directly rather than going through a whole
/// [`ThreeWayMerger`] recursion. A structural conflict -- anything still
/// unmerged after the walk -- is the "tree-structure conflicts remain
/// unresolvable" case and fails with `CONFLICTS_DURING_MERGE_BASE_CALCULATION`.
fn merge_ignoring_conflicts(
    store: &dyn ObjectStore,
    walker: &dyn RevisionWalker,
    base_tree: ObjectId,
    ours_tree: ObjectId,
    theirs_tree: ObjectId,
) -> MergeResult<ObjectId> {
    let _ = walker;
    let config = MergeConfig { in_core: true, ignore_conflicts: true, ..Default::default() };
    let attributes = NullAttributeProvider;
    let mut index = Index::new();

    let ours_diff = rename::diff_trees(store, base_tree, ours_tree)?;
    let theirs_diff = rename::diff_trees(store, base_tree, theirs_tree)?;
    let mut ours_detector = ExactRenameDetector::default();
    ours_detector.add_all(&ours_diff.deletions, &ours_diff.additions);
    let mut theirs_detector = ExactRenameDetector::default();
    theirs_detector.add_all(&theirs_diff.deletions, &theirs_diff.additions);
    let (ours_deletions, ours_touched) = rename::leaf_changes(store, base_tree, ours_tree)?;
    let (theirs_deletions, theirs_touched) = rename::leaf_changes(store, base_tree, theirs_tree)?;
    let ours_state = SideState { deletions: &ours_deletions, additions_and_modifications: &ours_touched };
    let theirs_state = SideState { deletions: &theirs_deletions, additions_and_modifications: &theirs_touched };
    let renames =
        RenameResolver::resolve(ours_detector.compute(), theirs_detector.compute(), &ours_state, &theirs_state);

    let inputs = TreeWalkInputs {
        store,
        attributes: &attributes,
        index: &mut index,
        pre_merge_index: None,
        work_view: None,
        work_writer: None,
    };
    let walk = TreeWalk::new(inputs, &config, &renames, base_tree, &ours_touched, &theirs_touched)?;
    let outcome = walk.run(base_tree, ours_tree, theirs_tree)?;

    if !outcome.unmerged_paths.is_empty() {
        return Err(MergeError::ConflictsDuringMergeBaseCalculation.into());
    }
    build_tree_from_index(store, &index)
}

enum TreeNode {
    Blob(crate::mode::FileMode, ObjectId),
    Dir(BTreeMap<String, TreeNode>),
}

fn insert_path(root: &mut BTreeMap<String, TreeNode>, components: &[&str], mode: crate::mode::FileMode, oid: ObjectId) {
    match components {
        [] => {}
        [last] => {
            root.insert((*last).to_owned(), TreeNode::Blob(mode, oid));
        }
        [first, rest @ ..] => {
            let node = root.entry((*first).to_owned()).or_insert_with(|| TreeNode::Dir(BTreeMap::new()));
            if let TreeNode::Dir(map) = node {
                insert_path(map, rest, mode, oid);
            }
        }
    }
}

fn build_tree_node(store: &dyn ObjectStore, map: &BTreeMap<String, TreeNode>) -> MergeResult<ObjectId> {
    let mut entries = Vec::with_capacity(map.len());
    for (name, node) in map {
        match node {
            TreeNode::Blob(mode, oid) => entries.push(TreeEntry { name: name.clone(), mode: *mode, oid: *oid }),
            TreeNode::Dir(sub) => {
                let oid = build_tree_node(store, sub)?;
                entries.push(TreeEntry { name: name.clone(), mode: crate::mode::FileMode::Subtree, oid });
            }
        }
    }
    store.insert_tree(&Tree::new(entries))
}

/// Reassembles a tree object from an index's resolved (stage-0) entries
/// (§4.6 step 8), nesting paths back into subtrees bottom-up.
fn build_tree_from_index(store: &dyn ObjectStore, index: &Index) -> MergeResult<ObjectId> {
    let mut root: BTreeMap<String, TreeNode> = BTreeMap::new();
    for entry in index.resolved_entries() {
        let components: Vec<&str> = entry.path.components().collect();
        if components.is_empty() {
            continue;
        }
        insert_path(&mut root, &components, entry.mode, entry.oid);
    }
    build_tree_node(store, &root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{Commit, CommitMessage, ObjectStoreCommitExt, Signature};
    use crate::mode::FileMode;
    use crate::object_store::InMemoryObjectStore;
    use crate::revwalk::CommitGraphRevWalker;
    use chrono::{FixedOffset, TimeZone};
    use smallvec::{smallvec, SmallVec};

    fn sig(t: i64) -> Signature {
        Signature { name: "t".into(), email: "t@t".into(), time: FixedOffset::east_opt(0).unwrap().timestamp_opt(t, 0).unwrap() }
    }

    fn commit_with_tree(store: &InMemoryObjectStore, tree: ObjectId, t: i64, parents: SmallVec<[ObjectId; 2]>) -> ObjectId {
        let commit =
            Commit { tree, parents, author: sig(t), committer: sig(t), message: CommitMessage::new_subject("c") };
        store.insert_commit(&commit).unwrap()
    }

    fn blob(store: &InMemoryObjectStore, content: &str) -> ObjectId {
        store.insert_blob(content.as_bytes()).unwrap()
    }

    fn tree_with(store: &InMemoryObjectStore, entries: Vec<TreeEntry>) -> ObjectId {
        store.insert_tree(&Tree::new(entries)).unwrap()
    }

    // S1: trivial take-theirs, end to end through the merger.
    #[test]
    fn trivial_take_theirs_produces_clean_merge_with_new_tree() {
        let store = InMemoryObjectStore::new();
        let x = blob(&store, "X\n");
        let y = blob(&store, "Y\n");
        let base_tree = tree_with(&store, vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: x }]);
        let theirs_tree = tree_with(&store, vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: y }]);
        let base = commit_with_tree(&store, base_tree, 0, smallvec![]);
        let ours = commit_with_tree(&store, base_tree, 1, smallvec![base]);
        let theirs = commit_with_tree(&store, theirs_tree, 1, smallvec![base]);

        let walker = CommitGraphRevWalker::new(&store);
        let repo = RepoHandle::in_core(&store, &walker);
        let merger = ThreeWayMerger::new(repo, BaseStrategy::Recursive);
        let outcome = merger.merge(base, ours, theirs).unwrap();

        assert!(outcome.cleanly_merged);
        let tree = store.read_tree(&outcome.result_tree_id.unwrap()).unwrap();
        assert_eq!(tree.find("a").unwrap().oid, y);
    }

    // S3: overlapping edits leave the merge unclean with no tree.
    #[test]
    fn overlapping_edits_leave_merge_unclean() {
        let store = InMemoryObjectStore::new();
        let base_blob = blob(&store, "1\n2\n3\n");
        let ours_blob = blob(&store, "1\nONE\n3\n");
        let theirs_blob = blob(&store, "1\nOTHER\n3\n");
        let base_tree = tree_with(&store, vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: base_blob }]);
        let ours_tree = tree_with(&store, vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: ours_blob }]);
        let theirs_tree = tree_with(&store, vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: theirs_blob }]);
        let base = commit_with_tree(&store, base_tree, 0, smallvec![]);
        let ours = commit_with_tree(&store, ours_tree, 1, smallvec![base]);
        let theirs = commit_with_tree(&store, theirs_tree, 1, smallvec![base]);

        let walker = CommitGraphRevWalker::new(&store);
        let repo = RepoHandle::in_core(&store, &walker);
        let merger = ThreeWayMerger::new(repo, BaseStrategy::Recursive);
        let outcome = merger.merge(base, ours, theirs).unwrap();

        assert!(!outcome.cleanly_merged);
        assert!(outcome.result_tree_id.is_none());
        assert_eq!(outcome.unmerged_paths, vec![RepoPath::from("a")]);
        assert!(outcome.merge_results.contains_key(&RepoPath::from("a")));
    }

    // S6: criss-cross histories synthesize a virtual base and still merge
    // cleanly under the recursive strategy.
    #[test]
    fn criss_cross_merges_cleanly_under_recursive_strategy() {
        let store = InMemoryObjectStore::new();
        let root_tree = tree_with(&store, vec![]);
        let root = commit_with_tree(&store, root_tree, 0, smallvec![]);

        let a_blob = blob(&store, "a\n");
        let a_tree = tree_with(&store, vec![TreeEntry { name: "f".into(), mode: FileMode::Regular, oid: a_blob }]);
        let a = commit_with_tree(&store, a_tree, 1, smallvec![root]);

        let b_blob = blob(&store, "a\n");
        let b = commit_with_tree(&store, root_tree, 1, smallvec![root]);
        let _ = b_blob;

        // two branches c, d both merge a and b (criss-cross): c keeps a's
        // tree, d keeps a's tree too but via a different parent order, so
        // {a, b} end up as the two minimal merge bases of c and d.
        let c = commit_with_tree(&store, a_tree, 2, smallvec![a, b]);
        let d = commit_with_tree(&store, a_tree, 2, smallvec![b, a]);

        let walker = CommitGraphRevWalker::new(&store);
        let repo = RepoHandle::in_core(&store, &walker);
        let merger = ThreeWayMerger::new(repo, BaseStrategy::Recursive);
        let outcome = merger.merge(a, c, d).unwrap();
        assert!(outcome.cleanly_merged);
    }

    #[test]
    fn resolve_strategy_rejects_criss_cross_histories() {
        let store = InMemoryObjectStore::new();
        let root_tree = tree_with(&store, vec![]);
        let root = commit_with_tree(&store, root_tree, 0, smallvec![]);
        let a = commit_with_tree(&store, root_tree, 1, smallvec![root]);
        let b = commit_with_tree(&store, root_tree, 1, smallvec![root]);
        let c = commit_with_tree(&store, root_tree, 2, smallvec![a, b]);
        let d = commit_with_tree(&store, root_tree, 2, smallvec![a, b]);

        let walker = CommitGraphRevWalker::new(&store);
        let repo = RepoHandle::in_core(&store, &walker);
        let merger = ThreeWayMerger::new(repo, BaseStrategy::Resolve);
        let err = merger.merge(a, c, d).unwrap_err();
        assert_eq!(
            err.downcast::<MergeError>().unwrap(),
            MergeError::MultipleMergeBasesNotSupported(c, d)
        );
    }

    // S5: rename + content edit merges cleanly; the renamed path's content
    // is compared against its true pre-rename base, not an empty one.
    #[test]
    fn rename_plus_edit_merges_cleanly() {
        let store = InMemoryObjectStore::new();
        let original = blob(&store, "1\n2\n3\n");
        let edited = blob(&store, "1\n2\nEDITED\n");
        let base_tree =
            tree_with(&store, vec![TreeEntry { name: "foo".into(), mode: FileMode::Regular, oid: original }]);
        let ours_tree = tree_with(&store, vec![TreeEntry { name: "bar".into(), mode: FileMode::Regular, oid: original }]);
        let theirs_tree =
            tree_with(&store, vec![TreeEntry { name: "foo".into(), mode: FileMode::Regular, oid: edited }]);
        let base = commit_with_tree(&store, base_tree, 0, smallvec![]);
        let ours = commit_with_tree(&store, ours_tree, 1, smallvec![base]);
        let theirs = commit_with_tree(&store, theirs_tree, 1, smallvec![base]);

        let walker = CommitGraphRevWalker::new(&store);
        let repo = RepoHandle::in_core(&store, &walker);
        let merger = ThreeWayMerger::new(repo, BaseStrategy::Recursive);
        let outcome = merger.merge(base, ours, theirs).unwrap();

        assert!(outcome.cleanly_merged);
        let tree = store.read_tree(&outcome.result_tree_id.unwrap()).unwrap();
        assert!(tree.find("foo").is_none());
        let bar_oid = tree.find("bar").unwrap().oid;
        assert_eq!(store.read_blob(&bar_oid).unwrap(), b"1\n2\nEDITED\n");
    }
}
