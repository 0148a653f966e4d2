//! The result of a content merge (§3 "MergeResult", §4.4 formatter).

use crate::sequence::Sequence;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    Base = 0,
    Ours = 1,
    Theirs = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictState {
    NoConflict,
    FirstConflicting,
    NextConflicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub source: ChunkSource,
    pub begin: usize,
    pub end: usize,
    pub conflict_state: ConflictState,
}

/// An ordered list of chunks covering `[0, base.line_count())` of the base
/// sequence plus the replacements inserted at conflict points, together
/// with the three sequences the chunks index into.
pub struct MergeResult<'a> {
    pub base: Sequence<'a>,
    pub ours: Sequence<'a>,
    pub theirs: Sequence<'a>,
    pub chunks: Vec<Chunk>,
    pub contains_conflicts: bool,
}

impl<'a> MergeResult<'a> {
    fn sequence_for(&self, source: ChunkSource) -> &Sequence<'a> {
        match source {
            ChunkSource::Base => &self.base,
            ChunkSource::Ours => &self.ours,
            ChunkSource::Theirs => &self.theirs,
        }
    }

    /// Concatenates every chunk's lines, ignoring conflict markers. Only
    /// meaningful (and only called) when `contains_conflicts` is false: for
    /// a clean merge this equals the blob inserted as the result.
    pub fn write_resolved(&self, out: &mut impl Write) -> io::Result<()> {
        debug_assert!(!self.contains_conflicts);
        for chunk in &self.chunks {
            self.sequence_for(chunk.source).write_range(out, chunk.begin, chunk.end)?;
        }
        Ok(())
    }
}

/// User-facing labels substituted into conflict markers.
#[derive(Debug, Clone)]
pub struct CommitNames {
    pub base: String,
    pub ours: String,
    pub theirs: String,
}

impl Default for CommitNames {
    fn default() -> Self {
        Self { base: "base".to_owned(), ours: "ours".to_owned(), theirs: "theirs".to_owned() }
    }
}

/// Renders a `MergeResult` to a byte stream with `<<<<<<<`/`=======`/`>>>>>>>`
/// conflict markers (§4.4). Line terminator is always LF.
pub struct MergeFormatter<'n> {
    names: &'n CommitNames,
}

impl<'n> MergeFormatter<'n> {
    pub fn new(names: &'n CommitNames) -> Self {
        Self { names }
    }

    pub fn format(&self, result: &MergeResult<'_>, out: &mut impl Write) -> io::Result<()> {
        let mut in_conflict = false;
        let mut conflict_group_index = 0usize;
        let mut last_conflicting_source = ChunkSource::Theirs;

        for chunk in &result.chunks {
            match chunk.conflict_state {
                ConflictState::NoConflict => {
                    if in_conflict {
                        self.write_trailer(out, last_conflicting_source)?;
                        in_conflict = false;
                    }
                }
                ConflictState::FirstConflicting => {
                    writeln!(out, "<<<<<<< {}", self.label(chunk.source))?;
                    in_conflict = true;
                    conflict_group_index = 0;
                }
                ConflictState::NextConflicting => {
                    if conflict_group_index == 0 {
                        writeln!(out, "=======")?;
                    } else {
                        writeln!(out, "======= {}", self.label(chunk.source))?;
                    }
                    conflict_group_index += 1;
                    last_conflicting_source = chunk.source;
                }
            }
            result.sequence_for(chunk.source).write_range(out, chunk.begin, chunk.end)?;
        }
        if in_conflict {
            self.write_trailer(out, last_conflicting_source)?;
        }
        Ok(())
    }

    fn write_trailer(&self, out: &mut impl Write, source: ChunkSource) -> io::Result<()> {
        writeln!(out, ">>>>>>> {}", self.label(source))
    }

    fn label(&self, source: ChunkSource) -> &str {
        match source {
            ChunkSource::Base => &self.names.base,
            ChunkSource::Ours => &self.names.ours,
            ChunkSource::Theirs => &self.names.theirs,
        }
    }
}
