//! C4: rename detection and reconciliation (§4.2).

use crate::mode::FileMode;
use crate::object_store::ObjectStore;
use crate::oid::ObjectId;
use crate::path::RepoPath;
use crate::tree::{ObjectStoreExt, Tree};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Ours,
    Theirs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    pub path: RepoPath,
    pub mode: FileMode,
    pub oid: ObjectId,
}

/// A one-sided diff against base, split into the two shapes a rename
/// detector needs: files that vanished, and files that appeared.
#[derive(Debug, Default)]
pub struct SideDiff {
    pub deletions: Vec<PathChange>,
    pub additions: Vec<PathChange>,
}

/// recursively diffs `base` against `other`, classifying every leaf path as
/// deleted (present in base, absent in other), added (absent in base,
/// present in other), or neither (unchanged/modified in place -- modified
/// paths don't participate in rename correlation and are skipped).
pub fn diff_trees(store: &dyn ObjectStore, base: ObjectId, other: ObjectId) -> anyhow::Result<SideDiff> {
    let mut diff = SideDiff::default();
    diff_trees_into(store, base, other, &RepoPath::empty(), &mut diff)?;
    Ok(diff)
}

fn diff_trees_into(
    store: &dyn ObjectStore,
    base: ObjectId,
    other: ObjectId,
    prefix: &RepoPath,
    out: &mut SideDiff,
) -> anyhow::Result<()> {
    if base == other {
        return Ok(());
    }
    let base_tree = store.read_tree(&base)?;
    let other_tree = store.read_tree(&other)?;
    let base_by_name: FxHashMap<&str, _> =
        base_tree.entries.iter().map(|e| (e.name.as_str(), e)).collect();
    let other_by_name: FxHashMap<&str, _> =
        other_tree.entries.iter().map(|e| (e.name.as_str(), e)).collect();

    for entry in &base_tree.entries {
        let path = prefix.join(&entry.name);
        match other_by_name.get(entry.name.as_str()) {
            None => record_missing(entry.mode, entry.oid, path, &mut out.deletions),
            Some(other_entry) => {
                if entry.mode.is_tree() && other_entry.mode.is_tree() {
                    diff_trees_into(store, entry.oid, other_entry.oid, &path, out)?;
                } else if entry.mode != other_entry.mode || entry.oid != other_entry.oid {
                    // present on both sides but changed in place: a
                    // modification, not a delete+add pair, so it's not
                    // rename-correlation material (§4.2 step 1).
                    if entry.mode.is_tree() {
                        record_missing(entry.mode, entry.oid, path.clone(), &mut out.deletions);
                        record_missing(other_entry.mode, other_entry.oid, path, &mut out.additions);
                    }
                }
            }
        }
    }
    for entry in &other_tree.entries {
        if !base_by_name.contains_key(entry.name.as_str()) {
            let path = prefix.join(&entry.name);
            record_missing(entry.mode, entry.oid, path, &mut out.additions);
        }
    }
    Ok(())
}

fn record_missing(mode: FileMode, oid: ObjectId, path: RepoPath, bucket: &mut Vec<PathChange>) {
    // directory renames are out of scope (§4.2 step 1): only leaf blobs
    // participate in rename correlation.
    if mode.is_file() {
        bucket.push(PathChange { path, mode, oid });
    }
}

/// Every leaf path `other` deleted or touched (added or modified in place)
/// relative to `base`. Unlike [`diff_trees`] -- which only records the
/// delete+add shape rename correlation needs -- this also reports plain
/// in-place modifications, since §4.2 step 4's conflict classification
/// needs to know "does the other side still contain the source path as
/// modified/added" for a leaf that was never deleted.
pub fn leaf_changes(
    store: &dyn ObjectStore,
    base: ObjectId,
    other: ObjectId,
) -> anyhow::Result<(Vec<PathChange>, FxHashMap<RepoPath, PathChange>)> {
    let mut deletions = Vec::new();
    let mut touched = FxHashMap::default();
    leaf_changes_into(store, base, other, &RepoPath::empty(), &mut deletions, &mut touched)?;
    Ok((deletions, touched))
}

fn leaf_changes_into(
    store: &dyn ObjectStore,
    base: ObjectId,
    other: ObjectId,
    prefix: &RepoPath,
    deletions: &mut Vec<PathChange>,
    touched: &mut FxHashMap<RepoPath, PathChange>,
) -> anyhow::Result<()> {
    if base == other {
        return Ok(());
    }
    let base_tree = store.read_tree(&base)?;
    let other_tree = store.read_tree(&other)?;
    let base_by_name: FxHashMap<&str, _> =
        base_tree.entries.iter().map(|e| (e.name.as_str(), e)).collect();

    for entry in &other_tree.entries {
        let path = prefix.join(&entry.name);
        match base_by_name.get(entry.name.as_str()) {
            None => record_touched(entry.mode, entry.oid, path, touched),
            Some(base_entry) => {
                if entry.mode.is_tree() && base_entry.mode.is_tree() {
                    leaf_changes_into(store, base_entry.oid, entry.oid, &path, deletions, touched)?;
                } else if entry.mode != base_entry.mode || entry.oid != base_entry.oid {
                    record_touched(entry.mode, entry.oid, path, touched);
                }
            }
        }
    }
    for entry in &base_tree.entries {
        let path = prefix.join(&entry.name);
        if !other_tree.find(&entry.name).is_some() && entry.mode.is_file() {
            deletions.push(PathChange { path, mode: entry.mode, oid: entry.oid });
        }
    }
    Ok(())
}

fn record_touched(mode: FileMode, oid: ObjectId, path: RepoPath, out: &mut FxHashMap<RepoPath, PathChange>) {
    if mode.is_file() {
        out.insert(path.clone(), PathChange { path, mode, oid });
    }
}

/// A rename pairing proposed by the detector, prior to cross-side
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePair {
    pub source: RepoPath,
    pub target: RepoPath,
    pub oid: ObjectId,
    pub mode: FileMode,
}

/// The external rename-detector contract (§6): `addAll` feeds it the
/// deletions/additions observed on one side, `setBreakScore` tunes the
/// similarity threshold below which a modify is treated as delete+add, and
/// `compute` returns the correlated rename pairs.
pub trait RenameDetector {
    fn add_all(&mut self, deletions: &[PathChange], additions: &[PathChange]);
    fn set_break_score(&mut self, score: u8);
    fn compute(&mut self) -> Vec<RenamePair>;
}

/// Reference detector: pairs a deletion with an addition only when their
/// blob content is identical. A full similarity index (the "break score"
/// knob genuinely changing behavior) is exactly the kind of
/// content-comparison machinery the diff algorithm's own non-goal note
/// covers ("beyond its contract") -- callers that need fuzzy rename
/// detection supply their own `RenameDetector`.
#[derive(Default)]
pub struct ExactRenameDetector {
    deletions: Vec<PathChange>,
    additions: Vec<PathChange>,
    break_score: u8,
}

impl RenameDetector for ExactRenameDetector {
    fn add_all(&mut self, deletions: &[PathChange], additions: &[PathChange]) {
        self.deletions.extend_from_slice(deletions);
        self.additions.extend_from_slice(additions);
    }

    fn set_break_score(&mut self, score: u8) {
        self.break_score = score;
    }

    fn compute(&mut self) -> Vec<RenamePair> {
        let _ = self.break_score; // reference detector doesn't do fuzzy matching
        let mut used_additions = vec![false; self.additions.len()];
        let mut pairs = Vec::new();
        for deletion in &self.deletions {
            if let Some((idx, addition)) = self
                .additions
                .iter()
                .enumerate()
                .find(|(idx, a)| !used_additions[*idx] && a.oid == deletion.oid)
            {
                used_additions[idx] = true;
                pairs.push(RenamePair {
                    source: deletion.path.clone(),
                    target: addition.path.clone(),
                    oid: addition.oid,
                    mode: addition.mode,
                });
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameClassification {
    NoRename,
    RenameInOurs,
    RenameInTheirs,
    RenameBothEqual,
    RenameConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameConflictKind {
    None,
    BothSidesDifferent,
    RenameVsAdd,
    RenameVsDelete,
    MultipleRenamesToSameTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub source: RepoPath,
    /// target path per side, only present where that side actually renamed
    /// `source`.
    pub targets: FxHashMap<Side, RepoPath>,
    pub classification: RenameClassification,
    pub conflict_kind: RenameConflictKind,
    pub chosen_target: Option<RepoPath>,
}

/// What the tree walk needs to know about `other`'s tree to decide whether
/// a rename conflicts with a concurrent add/delete/modify at the same path.
pub struct SideState<'a> {
    pub deletions: &'a [PathChange],
    pub additions_and_modifications: &'a FxHashMap<RepoPath, PathChange>,
}

pub struct RenameResolver;

impl RenameResolver {
    /// Builds the rename table described in §4.2, given each side's raw
    /// rename proposals (already computed by a `RenameDetector`) and enough
    /// of each side's change-set to classify conflicts.
    pub fn resolve(
        ours_renames: Vec<RenamePair>,
        theirs_renames: Vec<RenamePair>,
        ours_state: &SideState<'_>,
        theirs_state: &SideState<'_>,
    ) -> Vec<RenameEntry> {
        // step 1: filter out no-op renames (source == target)
        let ours_renames: Vec<_> = ours_renames.into_iter().filter(|r| r.source != r.target).collect();
        let theirs_renames: Vec<_> =
            theirs_renames.into_iter().filter(|r| r.source != r.target).collect();

        // step 2/3: baseRenames[source][side] = target, targets[side][target] = source
        let mut base_renames: FxHashMap<RepoPath, FxHashMap<Side, RepoPath>> = FxHashMap::default();
        for r in &ours_renames {
            base_renames.entry(r.source.clone()).or_default().insert(Side::Ours, r.target.clone());
        }
        for r in &theirs_renames {
            base_renames.entry(r.source.clone()).or_default().insert(Side::Theirs, r.target.clone());
        }

        let mut target_sources: FxHashMap<RepoPath, Vec<RepoPath>> = FxHashMap::default();
        for r in ours_renames.iter().chain(theirs_renames.iter()) {
            target_sources.entry(r.target.clone()).or_default().push(r.source.clone());
        }

        let mut entries = Vec::new();
        for (source, mut targets) in base_renames {
            let ours_target = targets.get(&Side::Ours).cloned();
            let theirs_target = targets.get(&Side::Theirs).cloned();

            let (classification, conflict_kind, chosen, drop_side) = match (&ours_target, &theirs_target)
            {
                (Some(a), Some(b)) if a == b => (RenameClassification::RenameBothEqual, RenameConflictKind::None, Some(a.clone()), None),
                (Some(a), Some(b)) => {
                    // both sides renamed the source, to different targets
                    let ours_has_source = ours_state.additions_and_modifications.contains_key(&source);
                    let theirs_has_source = theirs_state.additions_and_modifications.contains_key(&source);
                    if ours_has_source && !theirs_has_source {
                        (RenameClassification::RenameInTheirs, RenameConflictKind::None, Some(b.clone()), Some(Side::Ours))
                    } else if theirs_has_source && !ours_has_source {
                        (RenameClassification::RenameInOurs, RenameConflictKind::None, Some(a.clone()), Some(Side::Theirs))
                    } else {
                        (RenameClassification::RenameConflict, RenameConflictKind::BothSidesDifferent, None, None)
                    }
                }
                (Some(target), None) => classify_one_sided(
                    Side::Ours,
                    target,
                    &source,
                    theirs_state,
                ),
                (None, Some(target)) => classify_one_sided(
                    Side::Theirs,
                    target,
                    &source,
                    ours_state,
                ),
                (None, None) => unreachable!("baseRenames entry with no side set"),
            };

            if let Some(side) = drop_side {
                targets.remove(&side);
            }

            let mut entry = RenameEntry {
                source,
                targets,
                classification,
                conflict_kind,
                chosen_target: chosen,
            };

            // step 4 last bullet: two distinct sources renamed to the same target
            if let Some(target) = entry.chosen_target.clone() {
                if let Some(sources) = target_sources.get(&target) {
                    if sources.len() > 1 {
                        entry.classification = RenameClassification::RenameConflict;
                        entry.conflict_kind = RenameConflictKind::MultipleRenamesToSameTarget;
                        entry.chosen_target = None;
                    }
                }
            }

            entries.push(entry);
        }
        entries
    }
}

fn classify_one_sided(
    renaming_side: Side,
    target: &RepoPath,
    source: &RepoPath,
    other_state: &SideState<'_>,
) -> (RenameClassification, RenameConflictKind, Option<RepoPath>, Option<Side>) {
    let other_side = match renaming_side {
        Side::Ours => Side::Theirs,
        Side::Theirs => Side::Ours,
    };
    let other_deleted_source = other_state.deletions.iter().any(|d| &d.path == source);
    let other_touched_target = other_state.additions_and_modifications.contains_key(target);

    if other_touched_target {
        // RENAME_VS_ADD: drop the rename on the conflicting side.
        return (RenameClassification::RenameConflict, RenameConflictKind::RenameVsAdd, None, Some(renaming_side));
    }
    if other_deleted_source {
        return (RenameClassification::RenameConflict, RenameConflictKind::RenameVsDelete, None, None);
    }
    let classification = match renaming_side {
        Side::Ours => RenameClassification::RenameInOurs,
        Side::Theirs => RenameClassification::RenameInTheirs,
    };
    let _ = other_side;
    (classification, RenameConflictKind::None, Some(target.clone()), None)
}
