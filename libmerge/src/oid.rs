//! Content-addressed object identifiers.
//!
//! The merge engine is agnostic to which digest a repository uses: legacy
//! 20-byte SHA-1 and the newer 32-byte SHA-256 object format both show up in
//! the wild, and nothing in the merge algorithm cares which one it is as
//! long as equality and hex round-tripping work. `ObjectId` is therefore a
//! small tagged union rather than a bare `[u8; 20]`.

use crate::error::MergeGenericError;
use sha1::digest::Output;
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// hash of an empty blob under SHA-1: e69de29bb2d1d6434b8b29ae775ad8c2e48c5391
pub const EMPTY_BLOB_SHA1: ObjectId = ObjectId::Sha1([
    0xe6, 0x9d, 0xe2, 0x9b, 0xb2, 0xd1, 0xd6, 0x43, 0x4b, 0x8b, 0x29, 0xae, 0x77, 0x5a, 0xd8, 0xc2,
    0xe4, 0x8c, 0x53, 0x91,
]);

/// hash of an empty tree under SHA-1: 4b825dc642cb6eb9a060e54bf8d69288fbee4904
pub const EMPTY_TREE_SHA1: ObjectId = ObjectId::Sha1([
    0x4b, 0x82, 0x5d, 0xc6, 0x42, 0xcb, 0x6e, 0xb9, 0xa0, 0x60, 0xe5, 0x4b, 0xf8, 0xd6, 0x92, 0x88,
    0xfb, 0xee, 0x49, 0x04,
]);

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
pub enum ObjectId {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl ObjectId {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ObjectId::Sha1(b) => b.as_slice(),
            ObjectId::Sha256(b) => b.as_slice(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    pub fn short(&self) -> String {
        let hex = self.to_hex();
        hex[..7.min(hex.len())].to_owned()
    }
}

impl From<Output<Sha1>> for ObjectId {
    fn from(bytes: Output<Sha1>) -> Self {
        ObjectId::Sha1(bytes.as_slice().try_into().expect("sha1 digest is 20 bytes"))
    }
}

#[cfg(test)]
impl<'a> From<&'a str> for ObjectId {
    fn from(s: &'a str) -> Self {
        Self::from_str(s).unwrap()
    }
}

impl FromStr for ObjectId {
    type Err = MergeGenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end();
        let bytes = hex::decode(s)?;
        match bytes.len() {
            20 => Ok(ObjectId::Sha1(bytes.try_into().unwrap())),
            32 => Ok(ObjectId::Sha256(bytes.try_into().unwrap())),
            n => anyhow::bail!("object id has invalid byte length {} (expected 20 or 32)", n),
        }
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.short())
        } else {
            write!(f, "{}", self.to_hex())
        }
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for ObjectId {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let bytes: Vec<u8> = (0..20).map(|_| u8::arbitrary(g)).collect();
        ObjectId::Sha1(bytes.try_into().unwrap())
    }
}

/// Hash raw bytes the same way a content-addressed store would when it
/// inserts a new blob: git-style, no prefix applied here (callers that need
/// the `"blob <len>\0"` style prefix should apply it before hashing, which is
/// exactly what the in-memory object store in [`crate::object_store`] does).
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    ObjectId::from(hasher.finalize())
}
