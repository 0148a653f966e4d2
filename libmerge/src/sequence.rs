//! Line-oriented view over blob bytes (§3 "Sequence", §4.3).
//!
//! A `Sequence` never copies its backing bytes; it just records line
//! boundaries. Lines keep their trailing `\n` (if present) so that
//! reassembling a sequence from its lines byte-for-byte reconstructs the
//! original blob, including a missing final newline.

/// NUL bytes are checked for in the first 8 KiB, matching git's own binary
/// heuristic (`buffer_is_binary`).
const BINARY_SNIFF_LEN: usize = 8 * 1024;

pub struct Sequence<'a> {
    bytes: &'a [u8],
    /// half-open byte ranges, one per line
    lines: Vec<(usize, usize)>,
}

impl<'a> Sequence<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                lines.push((start, i + 1));
                start = i + 1;
            }
        }
        if start < bytes.len() {
            lines.push((start, bytes.len()));
        }
        Self { bytes, lines }
    }

    pub fn is_binary(&self) -> bool {
        is_binary(self.bytes)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, i: usize) -> &'a [u8] {
        let (start, end) = self.lines[i];
        &self.bytes[start..end]
    }

    /// writes lines `[begin, end)` to `out`, exactly as they appear in the
    /// backing blob (including any trailing newline, or the lack of one on
    /// the very last line).
    pub fn write_range(&self, out: &mut impl std::io::Write, begin: usize, end: usize) -> std::io::Result<()> {
        for i in begin..end {
            out.write_all(self.line(i))?;
        }
        Ok(())
    }
}

pub fn is_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_lf_keeping_terminators() {
        let seq = Sequence::new(b"a\nb\nc");
        assert_eq!(seq.line_count(), 3);
        assert_eq!(seq.line(0), b"a\n");
        assert_eq!(seq.line(2), b"c");
    }

    #[test]
    fn empty_blob_has_no_lines() {
        assert_eq!(Sequence::new(b"").line_count(), 0);
    }

    #[test]
    fn detects_binary_via_leading_nul() {
        assert!(Sequence::new(b"abc\0def").is_binary());
        assert!(!Sequence::new(b"abcdef\n").is_binary());
    }

    #[test]
    fn nul_outside_sniff_window_is_not_detected() {
        let mut bytes = vec![b'a'; BINARY_SNIFF_LEN + 10];
        bytes[BINARY_SNIFF_LEN + 5] = 0;
        assert!(!is_binary(&bytes));
    }

    #[test]
    fn write_range_reconstructs_exact_bytes() {
        let original: &[u8] = b"line one\nline two\nline three";
        let seq = Sequence::new(original);
        let mut out = Vec::new();
        seq.write_range(&mut out, 0, seq.line_count()).unwrap();
        assert_eq!(out, original);
    }
}
