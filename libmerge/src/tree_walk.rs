//! C5: lock-step tree-walk triage (§4.5).
//!
//! Walks `{base, ours, theirs}` together in canonical path order, consults
//! the index and (optionally) the working tree at each path, and decides
//! one of: ignore, keep, take-theirs, delete, content-merge, or unmerged.
//! Rename integration (§4.5.4) is folded in before the main descent: a
//! non-conflicting rename suppresses the source path, redirects the target
//! path's base operand to the source's pre-rename content, and redirects
//! the non-renaming side's operand to whatever that side actually did to
//! the source (left it alone, or edited it in place) so that a
//! rename-plus-edit (S5) still content-merges against the right three
//! operands instead of seeing the non-renaming side as having deleted the
//! target.

use crate::attributes::AttributeProvider;
use crate::config::MergeConfig;
use crate::error::{MergeError, PathConflictKind};
use crate::index::{Index, IndexEntry, Stage};
use crate::merge_algorithm::MergeAlgorithm;
use crate::mode::FileMode;
use crate::oid::ObjectId;
use crate::path::RepoPath;
use crate::rename::{PathChange, RenameConflictKind, RenameEntry, Side};
use crate::sequence::Sequence;
use crate::tree::{ObjectStoreExt, Tree, TreeEntry};
use crate::worktree::{WorkingTreeView, WorkingTreeWriter};
use rustc_hash::{FxHashMap, FxHashSet};

/// A single side's state at a path during the walk: `None` stands for
/// `MISSING` (mode 0, §3 "TreeEntry").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub mode: Option<FileMode>,
    pub oid: Option<ObjectId>,
}

impl Slot {
    pub const MISSING: Slot = Slot { mode: None, oid: None };

    fn from_entry(entry: Option<&TreeEntry>) -> Self {
        match entry {
            Some(e) => Slot { mode: Some(e.mode), oid: Some(e.oid) },
            None => Slot::MISSING,
        }
    }

    fn non_tree(&self) -> bool {
        matches!(self.mode, Some(m) if !m.is_tree())
    }

    fn is_tree(&self) -> bool {
        matches!(self.mode, Some(m) if m.is_tree())
    }

    fn is_missing(&self) -> bool {
        self.mode.is_none()
    }
}

/// Everything the walk needs from its external collaborators, gathered in
/// one place so [`TreeWalk::new`] doesn't take a dozen separate parameters.
pub struct TreeWalkInputs<'a> {
    pub store: &'a dyn crate::object_store::ObjectStore,
    pub attributes: &'a dyn AttributeProvider,
    pub index: &'a mut Index,
    /// the pre-merge on-disk index, consulted for the dirty-index check
    /// (§4.5 row 2). `None` when the caller supplied a fresh in-core index.
    pub pre_merge_index: Option<&'a Index>,
    pub work_view: Option<&'a dyn WorkingTreeView>,
    pub work_writer: Option<&'a dyn WorkingTreeWriter>,
}

/// Outcome of a completed walk (feeds directly into C6's public result
/// shape, §4.6 operation 1).
#[derive(Default)]
pub struct WalkOutcome {
    pub unmerged_paths: Vec<RepoPath>,
    pub failing_paths: FxHashMap<RepoPath, PathConflictKind>,
    pub merge_results_text: FxHashMap<RepoPath, Vec<u8>>,
    pub modified_files: Vec<RepoPath>,
    pub to_be_deleted: Vec<RepoPath>,
    pub to_be_checked_out: Vec<RepoPath>,
    pub clean: bool,
}

pub struct TreeWalk<'a> {
    store: &'a dyn crate::object_store::ObjectStore,
    attributes: &'a dyn AttributeProvider,
    index: &'a mut Index,
    pre_merge_index: Option<&'a Index>,
    work_view: Option<&'a dyn WorkingTreeView>,
    work_writer: Option<&'a dyn WorkingTreeWriter>,
    config: &'a MergeConfig,
    renames: &'a [RenameEntry],
    algorithm: MergeAlgorithm<crate::diff_driver::SimilarDiffDriver>,
    /// source paths of non-conflicting renames: suppressed at their old
    /// location (§4.5.4 "suppress default triage").
    suppressed_sources: FxHashSet<RepoPath>,
    /// target path -> base-tree entry to use instead of the target's own
    /// (nonexistent, pre-rename) base entry.
    rename_base_override: FxHashMap<RepoPath, Slot>,
    /// target path -> ours operand to use in place of the (missing) literal
    /// entry at that path, when theirs did the renaming (§4.5.4).
    rename_ours_override: FxHashMap<RepoPath, Slot>,
    /// target path -> theirs operand to use in place of the (missing)
    /// literal entry at that path, when ours did the renaming (§4.5.4).
    rename_theirs_override: FxHashMap<RepoPath, Slot>,
    outcome: WalkOutcome,
    fatal: Option<MergeError>,
}

impl<'a> TreeWalk<'a> {
    pub fn new(
        inputs: TreeWalkInputs<'a>,
        config: &'a MergeConfig,
        renames: &'a [RenameEntry],
        base_tree_root: ObjectId,
        ours_touched: &'a FxHashMap<RepoPath, PathChange>,
        theirs_touched: &'a FxHashMap<RepoPath, PathChange>,
    ) -> crate::error::MergeResult<Self> {
        let mut suppressed_sources = FxHashSet::default();
        let mut rename_base_override = FxHashMap::default();
        let mut rename_ours_override = FxHashMap::default();
        let mut rename_theirs_override = FxHashMap::default();

        for entry in renames {
            if entry.conflict_kind != RenameConflictKind::None {
                continue;
            }
            let Some(target) = &entry.chosen_target else { continue };
            suppressed_sources.insert(entry.source.clone());
            let base_entry = lookup_path(inputs.store, base_tree_root, &entry.source)?;
            let base_slot = Slot::from_entry(base_entry.as_ref());
            rename_base_override.insert(target.clone(), base_slot);

            // A one-sided rename's non-renaming side kept `source` around
            // (conflict_kind == None already rules out it having deleted
            // it, see classify_one_sided): carry whatever that side did to
            // it -- nothing, or an in-place edit -- to the target, instead
            // of letting the walk see a plain absence there.
            if entry.targets.len() == 1 {
                let renaming_side = *entry.targets.keys().next().unwrap();
                let opposing_touched = match renaming_side {
                    Side::Ours => theirs_touched.get(&entry.source),
                    Side::Theirs => ours_touched.get(&entry.source),
                };
                let opposing_slot = match opposing_touched {
                    Some(change) => Slot { mode: Some(change.mode), oid: Some(change.oid) },
                    None => base_slot,
                };
                match renaming_side {
                    Side::Ours => { rename_theirs_override.insert(target.clone(), opposing_slot); }
                    Side::Theirs => { rename_ours_override.insert(target.clone(), opposing_slot); }
                }
            }
        }

        Ok(Self {
            store: inputs.store,
            attributes: inputs.attributes,
            index: inputs.index,
            pre_merge_index: inputs.pre_merge_index,
            work_view: inputs.work_view,
            work_writer: inputs.work_writer,
            config,
            renames,
            algorithm: MergeAlgorithm::new(crate::diff_driver::SimilarDiffDriver),
            suppressed_sources,
            rename_base_override,
            rename_ours_override,
            rename_theirs_override,
            outcome: WalkOutcome::default(),
            fatal: None,
        })
    }

    /// Runs the full walk and returns `true` iff every path resolved
    /// without conflict (the §4.5 contract's return value).
    pub fn run(
        mut self,
        base: ObjectId,
        ours: ObjectId,
        theirs: ObjectId,
    ) -> crate::error::MergeResult<WalkOutcome> {
        debug!("TreeWalk::run(base={}, ours={}, theirs={})", base, ours, theirs);
        self.record_rename_conflicts()?;

        let base_tree = self.store.read_tree(&base)?;
        let ours_tree = self.store.read_tree(&ours)?;
        let theirs_tree = self.store.read_tree(&theirs)?;
        self.walk_level(&RepoPath::empty(), &base_tree, &ours_tree, &theirs_tree)?;

        if let Some(err) = self.fatal.take() {
            warn!("TreeWalk::run: fatal path failure, aborting: {}", err);
            return Err(err.into());
        }

        self.outcome.unmerged_paths = self.index.unmerged_paths();
        self.outcome.clean = self.outcome.failing_paths.is_empty() && self.outcome.unmerged_paths.is_empty();
        trace!("TreeWalk::run: {} unmerged path(s)", self.outcome.unmerged_paths.len());
        Ok(self.outcome)
    }

    /// §4.5.4 last paragraph: record stages at every path a *conflicting*
    /// rename touches, independent of the main per-path descent (a
    /// conflicting rename's target may not even exist as a literal
    /// same-named triple the main walk would otherwise visit together).
    fn record_rename_conflicts(&mut self) -> crate::error::MergeResult<()> {
        for entry in self.renames {
            if entry.conflict_kind == RenameConflictKind::None {
                continue;
            }
            for target in entry.targets.values() {
                self.record_unmerged(target, PathConflictKind::RenameConflict);
            }
            self.record_unmerged(&entry.source, PathConflictKind::RenameConflict);

            if matches!(
                entry.conflict_kind,
                RenameConflictKind::RenameVsAdd | RenameConflictKind::BothSidesDifferent
            ) {
                if let Some(target) = entry.targets.get(&Side::Theirs) {
                    self.outcome.to_be_checked_out.push(target.clone());
                }
            }
        }
        Ok(())
    }

    fn record_unmerged(&mut self, path: &RepoPath, kind: PathConflictKind) {
        if !self.outcome.unmerged_paths.contains(path) {
            self.outcome.unmerged_paths.push(path.clone());
        }
        self.outcome.failing_paths.entry(path.clone()).or_insert(kind);
    }

    /// Merge-joins three sorted entry lists by directory-aware name order
    /// and dispatches each distinct name to [`Self::visit`].
    fn walk_level(
        &mut self,
        prefix: &RepoPath,
        base: &Tree,
        ours: &Tree,
        theirs: &Tree,
    ) -> crate::error::MergeResult<()> {
        let mut names: Vec<(&str, bool)> = Vec::new();
        let mut seen = FxHashSet::default();
        for tree in [base, ours, theirs] {
            for e in &tree.entries {
                if seen.insert(e.name.as_str()) {
                    names.push(e.cmp_key());
                }
            }
        }
        names.sort_by(|a, b| RepoPath::path_cmp_explicit(a.0, a.1, b.0, b.1));

        for (name, _) in names {
            let path = prefix.join(name);
            let base_e = base.find(name);
            let ours_e = ours.find(name);
            let theirs_e = theirs.find(name);
            self.visit(&path, base_e, ours_e, theirs_e)?;
            if self.fatal.is_some() {
                return Ok(());
            }
        }
        Ok(())
    }

    fn visit(
        &mut self,
        path: &RepoPath,
        base_e: Option<&TreeEntry>,
        ours_e: Option<&TreeEntry>,
        theirs_e: Option<&TreeEntry>,
    ) -> crate::error::MergeResult<()> {
        if self.suppressed_sources.contains(path) {
            self.outcome.to_be_deleted.push(path.clone());
            self.index.remove_path(path);
            return Ok(());
        }

        let base_slot =
            self.rename_base_override.get(path).copied().unwrap_or_else(|| Slot::from_entry(base_e));
        let ours_slot =
            self.rename_ours_override.get(path).copied().unwrap_or_else(|| Slot::from_entry(ours_e));
        let theirs_slot =
            self.rename_theirs_override.get(path).copied().unwrap_or_else(|| Slot::from_entry(theirs_e));

        // row 1: never existed anywhere
        if base_slot.is_missing() && ours_slot.is_missing() && theirs_slot.is_missing() {
            return Ok(());
        }

        // row 2: dirty index aborts the whole merge
        if !self.config.in_core {
            if let Some(pre_merge) = self.pre_merge_index {
                if let Some(existing) = pre_merge.find(path, Stage::Resolved) {
                    let matches_ours =
                        ours_slot.oid == Some(existing.oid) && ours_slot.mode == Some(existing.mode);
                    if !matches_ours {
                        self.fatal = Some(MergeError::DirtyIndex(path.clone()));
                        return Ok(());
                    }
                }
            }
        }

        // row 3: identical content+mode on both sides -> keep, no checkout
        if ours_slot.non_tree()
            && theirs_slot.non_tree()
            && ours_slot.oid == theirs_slot.oid
            && ours_slot.mode == theirs_slot.mode
        {
            self.keep_ours(path, ours_slot);
            return Ok(());
        }

        // row 4: same content, different mode -> try a mode merge
        if ours_slot.oid.is_some() && ours_slot.oid == theirs_slot.oid && ours_slot.mode != theirs_slot.mode {
            match mode_merge(base_slot.mode, ours_slot.mode, theirs_slot.mode) {
                Some(mode) => {
                    self.resolve_content(path, mode, ours_slot.oid.unwrap());
                    if mode != ours_slot.mode.unwrap() {
                        self.queue_checkout(path);
                    }
                }
                None => self.record_three_stages(path, base_slot, ours_slot, theirs_slot, PathConflictKind::ContentConflict),
            }
            return Ok(());
        }

        // row 5: theirs unchanged vs base -> keep ours (whole subtree, if ours
        // is a directory here: the well-known tree-level fast path, same
        // shortcut git's own unpack-trees takes instead of descending).
        if base_slot.mode == theirs_slot.mode && base_slot.oid == theirs_slot.oid {
            if ours_slot.is_tree() {
                self.adopt_subtree(path, ours_slot.oid.unwrap())?;
            } else if !ours_slot.is_missing() {
                self.keep_ours(path, ours_slot);
            }
            return Ok(());
        }

        // row 6: ours unchanged vs base -> take theirs, whole subtree if
        // theirs is a directory here.
        if base_slot.mode == ours_slot.mode && base_slot.oid == ours_slot.oid {
            if theirs_slot.is_tree() {
                self.adopt_subtree(path, theirs_slot.oid.unwrap())?;
            } else if theirs_slot.non_tree() {
                self.resolve_content(path, theirs_slot.mode.unwrap(), theirs_slot.oid.unwrap());
                self.queue_checkout(path);
            } else if ours_slot.is_tree() {
                self.queue_delete_subtree(path, ours_slot.oid.unwrap())?;
            } else if !ours_slot.is_missing() {
                let dirty = self.ours_worktree_dirty(path, ours_slot);
                if dirty {
                    self.fatal = Some(MergeError::DirtyWorktree(path.clone()));
                    return Ok(());
                }
                self.index.remove_path(path);
                self.outcome.to_be_deleted.push(path.clone());
            }
            return Ok(());
        }

        // row 7: file/folder conflict at a subtree boundary
        let ours_is_tree = ours_slot.is_tree();
        let theirs_is_tree = theirs_slot.is_tree();
        if ours_is_tree != theirs_is_tree && !(ours_slot.is_missing() && theirs_slot.is_missing()) {
            self.record_three_stages(
                path,
                base_slot,
                ours_slot,
                theirs_slot,
                PathConflictKind::FileDirectoryConflict,
            );
            return Ok(());
        }

        // row 8: both sides are subtrees -> descend
        if ours_is_tree && theirs_is_tree {
            let base_tree = self.tree_for(base_slot)?;
            let ours_tree = self.tree_for(ours_slot)?;
            let theirs_tree = self.tree_for(theirs_slot)?;
            return self.walk_level(path, &base_tree, &ours_tree, &theirs_tree);
        }

        // row 10: modify/delete -- exactly one side deleted a path the
        // other side changed
        if ours_slot.is_missing() != theirs_slot.is_missing() {
            let checkout_theirs = ours_slot.is_missing() && theirs_slot.non_tree();
            self.record_three_stages(path, base_slot, ours_slot, theirs_slot, if ours_slot.is_missing() {
                PathConflictKind::DeleteModifyConflict
            } else {
                PathConflictKind::ModifyDeleteConflict
            });
            // a MergeResult is still computed purely for caller inspection
            // (§4.5 row 10), always under the CONFLICT strategy regardless
            // of the configured knob.
            if ours_slot.non_tree() && theirs_slot.non_tree() {
                self.compute_and_record_text(path, base_slot, ours_slot, theirs_slot);
            } else if let Some(present) = [ours_slot, theirs_slot].into_iter().find(|s| s.non_tree()) {
                self.outcome.merge_results_text.entry(path.clone()).or_insert_with(|| {
                    self.store.read_blob(&present.oid.unwrap()).unwrap_or_default()
                });
            }
            if checkout_theirs {
                self.queue_checkout(path);
            }
            return Ok(());
        }

        // row 9: both sides touched the same blob path
        if ours_slot.non_tree() && theirs_slot.non_tree() {
            if ours_slot.mode == Some(FileMode::Gitlink) || theirs_slot.mode == Some(FileMode::Gitlink) {
                self.record_three_stages(path, base_slot, ours_slot, theirs_slot, PathConflictKind::SubmoduleConflict);
                return Ok(());
            }

            if self.ours_worktree_dirty(path, ours_slot) {
                self.fatal = Some(MergeError::DirtyWorktree(path.clone()));
                return Ok(());
            }

            let attrs = self.attributes.attributes_for(path);
            if !attrs.is_content_mergeable() {
                use crate::merge_algorithm::ContentMergeStrategy as S;
                match self.config.content_merge_strategy {
                    S::Ours => self.keep_ours(path, ours_slot),
                    S::Theirs => {
                        self.resolve_content(path, theirs_slot.mode.unwrap(), theirs_slot.oid.unwrap());
                        self.queue_checkout(path);
                    }
                    S::Conflict => self.record_three_stages(
                        path,
                        base_slot,
                        ours_slot,
                        theirs_slot,
                        PathConflictKind::ContentConflict,
                    ),
                }
                return Ok(());
            }

            self.content_merge(path, base_slot, ours_slot, theirs_slot)?;
            return Ok(());
        }

        // anything left over is a structural shape we don't expect to
        // reach given the rows above have exhausted the decision table.
        bug!("unreachable tree-walk row at {:?}: base={:?} ours={:?} theirs={:?}", path, base_slot, ours_slot, theirs_slot)
    }

    fn tree_for(&self, slot: Slot) -> crate::error::MergeResult<Tree> {
        match slot.oid {
            Some(oid) => self.store.read_tree(&oid),
            None => Ok(Tree::default()),
        }
    }

    /// Takes a whole subtree wholesale (rows 5/6's tree-level fast path):
    /// every leaf under `oid` is staged resolved and queued for checkout,
    /// without walking it again blob-by-blob against the other two sides.
    fn adopt_subtree(&mut self, prefix: &RepoPath, oid: ObjectId) -> crate::error::MergeResult<()> {
        let tree = self.store.read_tree(&oid)?;
        for entry in &tree.entries {
            let path = prefix.join(&entry.name);
            if entry.mode.is_tree() {
                self.adopt_subtree(&path, entry.oid)?;
            } else {
                self.resolve_content(&path, entry.mode, entry.oid);
                self.queue_checkout(&path);
            }
        }
        Ok(())
    }

    /// The deletion counterpart of [`Self::adopt_subtree`]: the whole
    /// subtree at `oid` vanished (the other side deleted it while this side
    /// left it untouched), so every leaf under it is queued for deletion.
    fn queue_delete_subtree(&mut self, prefix: &RepoPath, oid: ObjectId) -> crate::error::MergeResult<()> {
        let tree = self.store.read_tree(&oid)?;
        for entry in &tree.entries {
            let path = prefix.join(&entry.name);
            if entry.mode.is_tree() {
                self.queue_delete_subtree(&path, entry.oid)?;
            } else {
                let slot = Slot { mode: Some(entry.mode), oid: Some(entry.oid) };
                if self.ours_worktree_dirty(&path, slot) {
                    self.fatal = Some(MergeError::DirtyWorktree(path));
                    return Ok(());
                }
                self.index.remove_path(&path);
                self.outcome.to_be_deleted.push(path);
            }
        }
        Ok(())
    }

    fn keep_ours(&mut self, path: &RepoPath, ours: Slot) {
        if let (Some(mode), Some(oid)) = (ours.mode, ours.oid) {
            let length = self.store.read_blob(&oid).map(|b| b.len() as u64).unwrap_or(0);
            self.index.add_entry(IndexEntry::resolved(path.clone(), mode, oid, length));
        }
    }

    fn resolve_content(&mut self, path: &RepoPath, mode: FileMode, oid: ObjectId) {
        let length = self.store.read_blob(&oid).map(|b| b.len() as u64).unwrap_or(0);
        self.index.add_entry(IndexEntry::resolved(path.clone(), mode, oid, length));
        self.outcome.modified_files.push(path.clone());
    }

    fn queue_checkout(&mut self, path: &RepoPath) {
        self.outcome.to_be_checked_out.push(path.clone());
    }

    fn record_three_stages(
        &mut self,
        path: &RepoPath,
        base: Slot,
        ours: Slot,
        theirs: Slot,
        kind: PathConflictKind,
    ) {
        self.index.remove_path(path);
        if let (Some(mode), Some(oid)) = (base.mode, base.oid) {
            self.index.add_entry(IndexEntry::staged(path.clone(), mode, oid, Stage::Base));
        }
        if let (Some(mode), Some(oid)) = (ours.mode, ours.oid) {
            self.index.add_entry(IndexEntry::staged(path.clone(), mode, oid, Stage::Ours));
        }
        if let (Some(mode), Some(oid)) = (theirs.mode, theirs.oid) {
            self.index.add_entry(IndexEntry::staged(path.clone(), mode, oid, Stage::Theirs));
        }
        self.outcome.failing_paths.entry(path.clone()).or_insert(kind);
    }

    fn content_merge(
        &mut self,
        path: &RepoPath,
        base: Slot,
        ours: Slot,
        theirs: Slot,
    ) -> crate::error::MergeResult<()> {
        let base_bytes = match base.oid {
            Some(oid) => self.store.read_blob(&oid)?,
            None => Vec::new(),
        };
        let ours_bytes = self.store.read_blob(&ours.oid.unwrap())?;
        let theirs_bytes = self.store.read_blob(&theirs.oid.unwrap())?;

        if Sequence::new(&base_bytes).is_binary()
            || Sequence::new(&ours_bytes).is_binary()
            || Sequence::new(&theirs_bytes).is_binary()
        {
            self.record_three_stages(path, base, ours, theirs, PathConflictKind::ContentConflict);
            return Ok(());
        }

        let result = self.algorithm.merge(
            Sequence::new(&base_bytes),
            Sequence::new(&ours_bytes),
            Sequence::new(&theirs_bytes),
            self.config.content_merge_strategy,
        );

        if result.contains_conflicts {
            let formatter = crate::merge_result::MergeFormatter::new(&self.config.commit_names);
            let mut out = Vec::new();
            formatter.format(&result, &mut out).expect("writing to a Vec cannot fail");

            if self.config.ignore_conflicts {
                // §4.1 step 4: accept the conflict-marked content as stage-0
                // instead of leaving the path unmerged.
                let mode = mode_merge(base.mode, ours.mode, theirs.mode).unwrap_or(ours.mode.unwrap());
                let oid = self.store.insert_blob(&out)?;
                self.index.add_entry(IndexEntry::resolved(path.clone(), mode, oid, out.len() as u64));
                self.outcome.modified_files.push(path.clone());
                return Ok(());
            }

            self.record_three_stages(path, base, ours, theirs, PathConflictKind::ContentConflict);
            self.outcome.merge_results_text.insert(path.clone(), out);
            return Ok(());
        }

        let mut merged = Vec::new();
        result.write_resolved(&mut merged).expect("writing to a Vec cannot fail");
        let mode = mode_merge(base.mode, ours.mode, theirs.mode).unwrap_or(ours.mode.unwrap());
        let oid = self.store.insert_blob(&merged)?;
        if let Some(writer) = self.work_writer {
            if !self.config.in_core {
                writer.checkout(path, mode, &merged)?;
            }
        }
        self.index.add_entry(IndexEntry::resolved(path.clone(), mode, oid, merged.len() as u64));
        self.outcome.modified_files.push(path.clone());
        Ok(())
    }

    fn compute_and_record_text(&mut self, path: &RepoPath, base: Slot, ours: Slot, theirs: Slot) {
        let base_bytes = base.oid.and_then(|o| self.store.read_blob(&o).ok()).unwrap_or_default();
        let ours_bytes = ours.oid.and_then(|o| self.store.read_blob(&o).ok()).unwrap_or_default();
        let theirs_bytes = theirs.oid.and_then(|o| self.store.read_blob(&o).ok()).unwrap_or_default();
        let result = self.algorithm.merge(
            Sequence::new(&base_bytes),
            Sequence::new(&ours_bytes),
            Sequence::new(&theirs_bytes),
            crate::merge_algorithm::ContentMergeStrategy::Conflict,
        );
        let formatter = crate::merge_result::MergeFormatter::new(&self.config.commit_names);
        let mut out = Vec::new();
        formatter.format(&result, &mut out).expect("writing to a Vec cannot fail");
        self.outcome.merge_results_text.insert(path.clone(), out);
    }

    fn ours_worktree_dirty(&self, path: &RepoPath, ours: Slot) -> bool {
        if self.config.in_core {
            return false;
        }
        match self.work_view {
            None => false,
            Some(view) => {
                let size = ours.oid.and_then(|o| self.store.read_blob(&o).ok()).map(|b| b.len() as u64).unwrap_or(0);
                crate::worktree::is_dirty(view, path, ours.mode, ours.oid, size)
            }
        }
    }

}

/// §4.5.1 mode merge: `mO=mT -> mO`; `mB=mO -> (mT missing ? mO : mT)`;
/// `mB=mT -> (mO missing ? mT : mO)`; else conflict.
fn mode_merge(base: Option<FileMode>, ours: Option<FileMode>, theirs: Option<FileMode>) -> Option<FileMode> {
    if ours == theirs {
        return ours;
    }
    if base == ours {
        return Some(theirs.unwrap_or_else(|| ours.expect("mO must be present when mB=mO and mO!=mT")));
    }
    if base == theirs {
        return Some(ours.unwrap_or_else(|| theirs.expect("mT must be present when mB=mT and mO!=mT")));
    }
    None
}

fn lookup_path(
    store: &dyn crate::object_store::ObjectStore,
    root: ObjectId,
    path: &RepoPath,
) -> crate::error::MergeResult<Option<TreeEntry>> {
    let components: Vec<&str> = path.components().collect();
    if components.is_empty() {
        return Ok(None);
    }
    let mut current = root;
    for (i, component) in components.iter().enumerate() {
        let tree = store.read_tree(&current)?;
        match tree.find(component) {
            None => return Ok(None),
            Some(entry) => {
                if i == components.len() - 1 {
                    return Ok(Some(entry.clone()));
                }
                if !entry.mode.is_tree() {
                    return Ok(None);
                }
                current = entry.oid;
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::NullAttributeProvider;
    use crate::object_store::InMemoryObjectStore;

    fn blob(store: &InMemoryObjectStore, content: &str) -> ObjectId {
        store.insert_blob(content.as_bytes()).unwrap()
    }

    fn entry(name: &str, mode: FileMode, oid: ObjectId) -> TreeEntry {
        TreeEntry { name: name.to_owned(), mode, oid }
    }

    fn run_walk(
        store: &InMemoryObjectStore,
        base: ObjectId,
        ours: ObjectId,
        theirs: ObjectId,
    ) -> (Index, WalkOutcome) {
        let config = MergeConfig { in_core: true, ..Default::default() };
        let mut index = Index::new();
        let outcome = {
            let attrs = NullAttributeProvider;
            let inputs = TreeWalkInputs {
                store,
                attributes: &attrs,
                index: &mut index,
                pre_merge_index: None,
                work_view: None,
                work_writer: None,
            };
            let walk = TreeWalk::new(inputs, &config, &[], base).unwrap();
            walk.run(base, ours, theirs).unwrap()
        };
        (index, outcome)
    }

    // S1: trivial take-theirs
    #[test]
    fn unchanged_ours_takes_theirs_cleanly() {
        let store = InMemoryObjectStore::new();
        let x = blob(&store, "X\n");
        let y = blob(&store, "Y\n");
        let base = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, x)])).unwrap();
        let theirs = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, y)])).unwrap();

        let (index, outcome) = run_walk(&store, base, base, theirs);
        assert!(outcome.clean);
        assert_eq!(outcome.modified_files, vec![RepoPath::from("a")]);
        assert_eq!(index.find(&"a".into(), Stage::Resolved).unwrap().oid, y);
    }

    // S3: overlapping edits conflict
    #[test]
    fn overlapping_edits_are_recorded_unmerged() {
        let store = InMemoryObjectStore::new();
        let base_blob = blob(&store, "1\n2\n3\n");
        let ours_blob = blob(&store, "1\nONE\n3\n");
        let theirs_blob = blob(&store, "1\nOTHER\n3\n");
        let base = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, base_blob)])).unwrap();
        let ours = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, ours_blob)])).unwrap();
        let theirs = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, theirs_blob)])).unwrap();

        let (index, outcome) = run_walk(&store, base, ours, theirs);
        assert!(!outcome.clean);
        assert_eq!(outcome.unmerged_paths, vec![RepoPath::from("a")]);
        assert_eq!(index.entries_at(&"a".into()).len(), 3);
    }

    // S4: file/folder conflict
    #[test]
    fn file_folder_conflict_does_not_descend() {
        let store = InMemoryObjectStore::new();
        let x = blob(&store, "x\n");
        let y = blob(&store, "y\n");
        let base = store.insert_tree(&Tree::new(vec![entry("x", FileMode::Regular, x)])).unwrap();
        let inner = store.insert_tree(&Tree::new(vec![entry("y", FileMode::Regular, y)])).unwrap();
        let ours = store.insert_tree(&Tree::new(vec![entry("x", FileMode::Subtree, inner)])).unwrap();
        let modified = blob(&store, "modified\n");
        let theirs = store.insert_tree(&Tree::new(vec![entry("x", FileMode::Regular, modified)])).unwrap();

        let (index, outcome) = run_walk(&store, base, ours, theirs);
        assert!(!outcome.clean);
        assert_eq!(outcome.unmerged_paths, vec![RepoPath::from("x")]);
        assert_eq!(index.entries_at(&"x".into()).len(), 3);
    }

    // tree-level fast path (rows 5/6): ours leaves a directory untouched,
    // theirs rewrites its contents wholesale -> adopted without descending
    // leaf-by-leaf against ours.
    #[test]
    fn unchanged_directory_adopts_the_other_sides_whole_subtree() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "a\n");
        let b = blob(&store, "b\n");
        let a2 = blob(&store, "a2\n");
        let c = blob(&store, "c\n");

        let base_dir =
            store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, a), entry("b", FileMode::Regular, b)])).unwrap();
        let theirs_dir = store
            .insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, a2), entry("c", FileMode::Regular, c)]))
            .unwrap();

        let base = store.insert_tree(&Tree::new(vec![entry("dir", FileMode::Subtree, base_dir)])).unwrap();
        let ours = base;
        let theirs = store.insert_tree(&Tree::new(vec![entry("dir", FileMode::Subtree, theirs_dir)])).unwrap();

        let (index, outcome) = run_walk(&store, base, ours, theirs);
        assert!(outcome.clean);
        assert_eq!(index.find(&"dir/a".into(), Stage::Resolved).unwrap().oid, a2);
        assert_eq!(index.find(&"dir/c".into(), Stage::Resolved).unwrap().oid, c);
        assert!(index.find(&"dir/b".into(), Stage::Resolved).is_none());
        assert!(outcome.to_be_checked_out.contains(&RepoPath::from("dir/a")));
        assert!(outcome.to_be_checked_out.contains(&RepoPath::from("dir/c")));
    }

    #[test]
    fn unchanged_directory_is_recursively_deleted_when_the_other_side_removes_it() {
        let store = InMemoryObjectStore::new();
        let a = blob(&store, "a\n");
        let b = blob(&store, "b\n");
        let base_dir =
            store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, a), entry("b", FileMode::Regular, b)])).unwrap();
        let base = store.insert_tree(&Tree::new(vec![entry("dir", FileMode::Subtree, base_dir)])).unwrap();
        let ours = base;
        let theirs = store.insert_tree(&Tree::new(vec![])).unwrap();

        let (index, outcome) = run_walk(&store, base, ours, theirs);
        assert!(outcome.clean);
        assert!(index.find(&"dir/a".into(), Stage::Resolved).is_none());
        assert!(index.find(&"dir/b".into(), Stage::Resolved).is_none());
        assert!(outcome.to_be_deleted.contains(&RepoPath::from("dir/a")));
        assert!(outcome.to_be_deleted.contains(&RepoPath::from("dir/b")));
    }

    // §4.1 ignoreConflicts=true: a textual conflict becomes a stage-0 blob
    // carrying markers, not an unmerged path.
    #[test]
    fn ignore_conflicts_absorbs_textual_conflicts_as_stage_zero() {
        let store = InMemoryObjectStore::new();
        let base_blob = blob(&store, "1\n2\n3\n");
        let ours_blob = blob(&store, "1\nONE\n3\n");
        let theirs_blob = blob(&store, "1\nOTHER\n3\n");
        let base = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, base_blob)])).unwrap();
        let ours = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, ours_blob)])).unwrap();
        let theirs = store.insert_tree(&Tree::new(vec![entry("a", FileMode::Regular, theirs_blob)])).unwrap();

        let config = MergeConfig { in_core: true, ignore_conflicts: true, ..Default::default() };
        let mut index = Index::new();
        let outcome = {
            let attrs = NullAttributeProvider;
            let inputs = TreeWalkInputs {
                store: &store,
                attributes: &attrs,
                index: &mut index,
                pre_merge_index: None,
                work_view: None,
                work_writer: None,
            };
            let walk = TreeWalk::new(inputs, &config, &[], base).unwrap();
            walk.run(base, ours, theirs).unwrap()
        };

        assert!(outcome.clean);
        let resolved = index.find(&"a".into(), Stage::Resolved).unwrap();
        let bytes = store.read_blob(&resolved.oid).unwrap();
        assert_eq!(bytes, b"1\n<<<<<<< ours\nONE\n=======\nOTHER\n>>>>>>> theirs\n3\n");
    }

    #[test]
    fn mode_merge_picks_the_changed_side() {
        assert_eq!(mode_merge(Some(FileMode::Regular), Some(FileMode::Regular), Some(FileMode::Executable)), Some(FileMode::Executable));
        assert_eq!(mode_merge(Some(FileMode::Regular), Some(FileMode::Executable), Some(FileMode::Regular)), Some(FileMode::Executable));
        assert_eq!(mode_merge(Some(FileMode::Regular), Some(FileMode::Executable), Some(FileMode::Symlink)), None);
    }
}
