//! C2: turns two edit lists (base→ours, base→theirs) into a chunked
//! [`MergeResult`] (§4.3).

use crate::diff_driver::{DiffDriver, Edit};
use crate::merge_result::{Chunk, ChunkSource, ConflictState, MergeResult};
use crate::sequence::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMergeStrategy {
    Conflict,
    Ours,
    Theirs,
}

pub struct MergeAlgorithm<D> {
    driver: D,
}

impl<D: DiffDriver> MergeAlgorithm<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn merge<'a>(
        &self,
        base: Sequence<'a>,
        ours: Sequence<'a>,
        theirs: Sequence<'a>,
        strategy: ContentMergeStrategy,
    ) -> MergeResult<'a> {
        let mut eo = self.driver.diff(&base, &ours);
        let mut et = self.driver.diff(&base, &theirs);
        eo.push(Edit::SENTINEL);
        et.push(Edit::SENTINEL);

        let mut chunks = Vec::new();
        let mut act_base = 0usize;
        let mut i = 0usize;
        let mut j = 0usize;
        let mut contains_conflicts = false;

        loop {
            let o = eo[i];
            let t = et[j];
            if o.is_sentinel() && t.is_sentinel() {
                break;
            }

            let next_diff = o.begin_a.min(t.begin_a);
            if act_base < next_diff {
                chunks.push(Chunk {
                    source: ChunkSource::Base,
                    begin: act_base,
                    end: next_diff,
                    conflict_state: ConflictState::NoConflict,
                });
                act_base = next_diff;
            }

            let o_touches = o.begin_a == next_diff && !o.is_sentinel();
            let t_touches = t.begin_a == next_diff && !t.is_sentinel();

            if o_touches && (!t_touches || o.end_a <= t.begin_a) {
                chunks.push(Chunk {
                    source: ChunkSource::Ours,
                    begin: o.begin_b,
                    end: o.end_b,
                    conflict_state: ConflictState::NoConflict,
                });
                act_base = o.end_a;
                i += 1;
            } else if t_touches && (!o_touches || t.end_a <= o.begin_a) {
                chunks.push(Chunk {
                    source: ChunkSource::Theirs,
                    begin: t.begin_b,
                    end: t.end_b,
                    conflict_state: ConflictState::NoConflict,
                });
                act_base = t.end_a;
                j += 1;
            } else {
                // overlap: coalesce runs of consecutive edits on each side
                // whose base ranges chain into one another, then align both
                // sides' widened base ranges to the same [group_begin, group_end).
                let (o_first, o_last, t_first, t_last, group_begin, group_end) =
                    self.coalesce(&eo, &et, i, j);

                let ours_b_begin =
                    eo[o_first].begin_b - (eo[o_first].begin_a - group_begin);
                let ours_b_end = eo[o_last].end_b + (group_end - eo[o_last].end_a);
                let theirs_b_begin =
                    et[t_first].begin_b - (et[t_first].begin_a - group_begin);
                let theirs_b_end = et[t_last].end_b + (group_end - et[t_last].end_a);

                chunks.push(Chunk {
                    source: ChunkSource::Ours,
                    begin: ours_b_begin,
                    end: ours_b_end,
                    conflict_state: ConflictState::FirstConflicting,
                });
                chunks.push(Chunk {
                    source: ChunkSource::Theirs,
                    begin: theirs_b_begin,
                    end: theirs_b_end,
                    conflict_state: ConflictState::NextConflicting,
                });
                contains_conflicts = true;

                act_base = group_end;
                i = o_last + 1;
                j = t_last + 1;
            }
        }

        if act_base < base.line_count() {
            chunks.push(Chunk {
                source: ChunkSource::Base,
                begin: act_base,
                end: base.line_count(),
                conflict_state: ConflictState::NoConflict,
            });
        }

        if contains_conflicts && strategy != ContentMergeStrategy::Conflict {
            collapse_conflicts(&mut chunks, strategy);
            contains_conflicts = false;
        }

        MergeResult { base, ours, theirs, chunks, contains_conflicts }
    }

    /// Expands the overlapping-edit group starting at `eo[i]`/`et[j]` until
    /// neither side has a further edit whose base range reaches into the
    /// group, returning the first/last edit index on each side and the
    /// group's combined `[begin_a, end_a)`.
    fn coalesce(
        &self,
        eo: &[Edit],
        et: &[Edit],
        i: usize,
        j: usize,
    ) -> (usize, usize, usize, usize, usize, usize) {
        let mut o_last = i;
        let mut t_last = j;
        let mut group_begin = eo[i].begin_a.min(et[j].begin_a);
        let mut group_end = eo[i].end_a.max(et[j].end_a);
        loop {
            let mut changed = false;
            while !eo[o_last + 1].is_sentinel() && eo[o_last + 1].begin_a < group_end {
                o_last += 1;
                group_end = group_end.max(eo[o_last].end_a);
                changed = true;
            }
            while !et[t_last + 1].is_sentinel() && et[t_last + 1].begin_a < group_end {
                t_last += 1;
                group_end = group_end.max(et[t_last].end_a);
                changed = true;
            }
            if !changed {
                break;
            }
        }
        group_begin = group_begin.min(eo[i].begin_a).min(et[j].begin_a);
        (i, o_last, j, t_last, group_begin, group_end)
    }
}

fn collapse_conflicts(chunks: &mut Vec<Chunk>, strategy: ContentMergeStrategy) {
    let keep = match strategy {
        ContentMergeStrategy::Ours => ChunkSource::Ours,
        ContentMergeStrategy::Theirs => ChunkSource::Theirs,
        ContentMergeStrategy::Conflict => unreachable!(),
    };
    chunks.retain(|c| c.conflict_state == ConflictState::NoConflict || c.source == keep);
    for chunk in chunks.iter_mut() {
        chunk.conflict_state = ConflictState::NoConflict;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_driver::SimilarDiffDriver;

    fn alg() -> MergeAlgorithm<SimilarDiffDriver> {
        MergeAlgorithm::new(SimilarDiffDriver)
    }

    // S1: trivial take-theirs
    #[test]
    fn unchanged_ours_takes_theirs_cleanly() {
        let result = alg().merge(
            Sequence::new(b"X\n"),
            Sequence::new(b"X\n"),
            Sequence::new(b"Y\n"),
            ContentMergeStrategy::Conflict,
        );
        assert!(!result.contains_conflicts);
        let mut out = Vec::new();
        result.write_resolved(&mut out).unwrap();
        assert_eq!(out, b"Y\n");
    }

    // S2: non-overlapping edits on opposite ends interleave cleanly
    #[test]
    fn non_overlapping_edits_interleave() {
        let base = b"1\n2\n3\n4\n5\n";
        let ours = b"one\n2\n3\n4\n5\n";
        let theirs = b"1\n2\n3\n4\nfive\n";
        let result = alg().merge(
            Sequence::new(base),
            Sequence::new(ours),
            Sequence::new(theirs),
            ContentMergeStrategy::Conflict,
        );
        assert!(!result.contains_conflicts);
        let mut out = Vec::new();
        result.write_resolved(&mut out).unwrap();
        assert_eq!(out, b"one\n2\n3\n4\nfive\n");
    }

    // S3: both sides rewrite the same line -> one conflict group
    #[test]
    fn overlapping_edit_is_flagged_conflicting() {
        let base = b"1\n2\n3\n";
        let ours = b"1\nONE-EDIT\n3\n";
        let theirs = b"1\nOTHER-EDIT\n3\n";
        let result = alg().merge(
            Sequence::new(base),
            Sequence::new(ours),
            Sequence::new(theirs),
            ContentMergeStrategy::Conflict,
        );
        assert!(result.contains_conflicts);
        let conflicting: Vec<_> = result
            .chunks
            .iter()
            .filter(|c| c.conflict_state != ConflictState::NoConflict)
            .collect();
        assert_eq!(conflicting.len(), 2);
        assert_eq!(conflicting[0].conflict_state, ConflictState::FirstConflicting);
        assert_eq!(conflicting[0].source, ChunkSource::Ours);
        assert_eq!(conflicting[1].conflict_state, ConflictState::NextConflicting);
        assert_eq!(conflicting[1].source, ChunkSource::Theirs);
    }

    #[test]
    fn ours_strategy_collapses_conflict_to_ours_side() {
        let base = b"1\n2\n3\n";
        let ours = b"1\nONE-EDIT\n3\n";
        let theirs = b"1\nOTHER-EDIT\n3\n";
        let result = alg().merge(
            Sequence::new(base),
            Sequence::new(ours),
            Sequence::new(theirs),
            ContentMergeStrategy::Ours,
        );
        assert!(!result.contains_conflicts);
        let mut out = Vec::new();
        result.write_resolved(&mut out).unwrap();
        assert_eq!(out, b"1\nONE-EDIT\n3\n");
    }
}
