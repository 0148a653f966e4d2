//! File modes.
//!
//! Discriminants match git's on-disk mode values; the ordering of variants
//! is significant (see [`FileMode::cmp`] usage throughout the tree walk):
//! during a lockstep walk over several trees we want subtrees ordered after
//! the file-ish variants that share the same leading path component, so
//! `"foo"` the file sorts before `"foo/"` the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Subtree,
    Gitlink,
}

impl FileMode {
    pub const REG: u32 = 0o100644;
    pub const EXEC: u32 = 0o100755;
    pub const LINK: u32 = 0o120000;
    pub const TREE: u32 = 0o040000;
    pub const GITLINK: u32 = 0o160000;

    pub fn from_raw(mode: u32) -> Option<Self> {
        match mode {
            0 => None,
            Self::REG => Some(Self::Regular),
            Self::EXEC => Some(Self::Executable),
            Self::LINK => Some(Self::Symlink),
            Self::TREE => Some(Self::Subtree),
            Self::GITLINK => Some(Self::Gitlink),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Regular => Self::REG,
            Self::Executable => Self::EXEC,
            Self::Symlink => Self::LINK,
            Self::Subtree => Self::TREE,
            Self::Gitlink => Self::GITLINK,
        }
    }

    pub fn is_file(self) -> bool {
        matches!(self, Self::Regular | Self::Executable | Self::Symlink)
    }

    pub fn is_tree(self) -> bool {
        matches!(self, Self::Subtree)
    }

    pub fn is_gitlink(self) -> bool {
        matches!(self, Self::Gitlink)
    }

    /// can two non-identical raw modes of this logical kind be merged by
    /// simply picking "the more permissive" of the two? only meaningful for
    /// the regular/executable pair -- see §4.5.1 of the merge engine's mode
    /// resolution rules.
    pub fn is_regular_or_executable(self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }
}

impl PartialOrd for FileMode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileMode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(m: &FileMode) -> u8 {
            match m {
                FileMode::Regular | FileMode::Executable | FileMode::Symlink => 0,
                FileMode::Gitlink => 1,
                FileMode::Subtree => 2,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.raw())
    }
}
