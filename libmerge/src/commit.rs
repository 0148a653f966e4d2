//! Commits: the opaque DAG nodes the merge engine reasons about.
//!
//! The engine only ever needs a commit's tree and its parents; a real
//! history-aware caller is free to store arbitrarily more (the revision
//! walker's enumeration and merge-base filtering are external concerns
//! handled behind [`crate::revwalk::RevisionWalker`]).

use crate::error::MergeResult;
use crate::object_store::{ObjectKind, ObjectStore};
use crate::oid::ObjectId;
use chrono::{DateTime, FixedOffset, TimeZone};
use smallvec::SmallVec;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: DateTime<FixedOffset>,
}

impl Signature {
    fn serialize(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.time.timestamp(),
            self.time.format("%z")
        )
    }

    fn deserialize(s: &str) -> MergeResult<Self> {
        let open = s.rfind('<').ok_or_else(|| anyhow::anyhow!("malformed signature"))?;
        let close = s.rfind('>').ok_or_else(|| anyhow::anyhow!("malformed signature"))?;
        let name = s[..open].trim().to_owned();
        let email = s[open + 1..close].to_owned();
        let rest = s[close + 1..].trim();
        let mut parts = rest.split_whitespace();
        let unix: i64 = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("malformed signature timestamp"))?
            .parse()?;
        let offset_str =
            parts.next().ok_or_else(|| anyhow::anyhow!("malformed signature offset"))?;
        let sign = if offset_str.starts_with('-') { -1 } else { 1 };
        let digits = &offset_str[1..];
        let hours: i32 = digits[..2].parse()?;
        let minutes: i32 = digits[2..4].parse()?;
        let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| anyhow::anyhow!("invalid timezone offset"))?;
        let time = offset
            .timestamp_opt(unix, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid commit timestamp"))?;
        Ok(Self { name, email, time })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub subject: String,
    pub body: String,
}

impl CommitMessage {
    pub fn new_subject(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), body: String::new() }
    }

    fn serialize(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }

    fn deserialize(s: &str) -> Self {
        match s.split_once("\n\n") {
            Some((subject, body)) => Self { subject: subject.to_owned(), body: body.to_owned() },
            None => Self { subject: s.to_owned(), body: String::new() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: SmallVec<[ObjectId; 2]>,
    pub author: Signature,
    pub committer: Signature,
    pub message: CommitMessage,
}

impl Commit {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author.serialize()));
        out.push_str(&format!("committer {}\n", self.committer.serialize()));
        out.push('\n');
        out.push_str(&self.message.serialize());
        out.into_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> MergeResult<Self> {
        let text = std::str::from_utf8(bytes)?;
        let (header, message) =
            text.split_once("\n\n").ok_or_else(|| anyhow::anyhow!("malformed commit object"))?;
        let mut tree = None;
        let mut parents = SmallVec::new();
        let mut author = None;
        let mut committer = None;
        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(ObjectId::from_str(rest)?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_str(rest)?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Signature::deserialize(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Signature::deserialize(rest)?);
            }
        }
        Ok(Self {
            tree: tree.ok_or_else(|| anyhow::anyhow!("commit missing tree"))?,
            parents,
            author: author.ok_or_else(|| anyhow::anyhow!("commit missing author"))?,
            committer: committer.ok_or_else(|| anyhow::anyhow!("commit missing committer"))?,
            message: CommitMessage::deserialize(message),
        })
    }
}

/// An `ObjectId` known to refer to a commit, plus lazy access to its tree
/// and parents through whichever [`ObjectStore`] the caller is using. The
/// engine treats commits purely as DAG nodes: it never inspects the author,
/// committer, or message except when synthesizing a virtual merge base
/// (§4.1 step 4), where it needs to fabricate a `Commit` of its own.
#[derive(Clone, Copy)]
pub struct CommitRef<'s> {
    store: &'s dyn ObjectStore,
    oid: ObjectId,
}

impl<'s> CommitRef<'s> {
    pub fn new(store: &'s dyn ObjectStore, oid: ObjectId) -> Self {
        Self { store, oid }
    }

    pub fn oid(&self) -> ObjectId {
        self.oid
    }

    pub fn load(&self) -> MergeResult<Commit> {
        let bytes = self.store.read(&self.oid, ObjectKind::Commit)?;
        Commit::deserialize(&bytes)
    }

    pub fn tree(&self) -> MergeResult<ObjectId> {
        Ok(self.load()?.tree)
    }

    pub fn parents(&self) -> MergeResult<SmallVec<[ObjectId; 2]>> {
        Ok(self.load()?.parents)
    }
}

pub trait ObjectStoreCommitExt: ObjectStore {
    fn insert_commit(&self, commit: &Commit) -> MergeResult<ObjectId>
    where
        Self: Sized,
    {
        self.insert(ObjectKind::Commit, &commit.serialize())
    }
}

impl<T: ObjectStore + ?Sized> ObjectStoreCommitExt for T {}
