//! The diff algorithm itself is an external contract (§6, §9 Non-goals: "the
//! spec does not describe the diff algorithm... beyond its contract"). This
//! module defines that contract and one concrete driver backed by the
//! `similar` crate's Myers implementation.

use crate::sequence::Sequence;

/// A half-open replacement of `[begin_a, end_a)` in the base sequence by
/// `[begin_b, end_b)` in the other sequence. An edit list returned by a
/// `DiffDriver` must be monotonically increasing in `begin_a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub begin_a: usize,
    pub end_a: usize,
    pub begin_b: usize,
    pub end_b: usize,
}

impl Edit {
    /// the sentinel edit C2 step 2 appends to the end of every edit list so
    /// the parallel walk never needs to special-case running off the end.
    pub const SENTINEL: Edit =
        Edit { begin_a: usize::MAX, end_a: usize::MAX, begin_b: usize::MAX, end_b: usize::MAX };

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

pub trait DiffDriver {
    /// diff `a` against `b`, producing the edits that turn `a` into `b`.
    fn diff(&self, a: &Sequence, b: &Sequence) -> Vec<Edit>;
}

/// Reference driver: line-level Myers diff via `similar`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarDiffDriver;

impl DiffDriver for SimilarDiffDriver {
    fn diff(&self, a: &Sequence, b: &Sequence) -> Vec<Edit> {
        let a_lines: Vec<&[u8]> = (0..a.line_count()).map(|i| a.line(i)).collect();
        let b_lines: Vec<&[u8]> = (0..b.line_count()).map(|i| b.line(i)).collect();
        let ops = similar::capture_diff_slices(similar::Algorithm::Myers, &a_lines, &b_lines);
        ops.into_iter()
            .filter_map(|op| match op {
                similar::DiffOp::Equal { .. } => None,
                similar::DiffOp::Delete { old_index, old_len, new_index } => Some(Edit {
                    begin_a: old_index,
                    end_a: old_index + old_len,
                    begin_b: new_index,
                    end_b: new_index,
                }),
                similar::DiffOp::Insert { old_index, new_index, new_len } => Some(Edit {
                    begin_a: old_index,
                    end_a: old_index,
                    begin_b: new_index,
                    end_b: new_index + new_len,
                }),
                similar::DiffOp::Replace { old_index, old_len, new_index, new_len } => Some(Edit {
                    begin_a: old_index,
                    end_a: old_index + old_len,
                    begin_b: new_index,
                    end_b: new_index + new_len,
                }),
            })
            .collect()
    }
}
