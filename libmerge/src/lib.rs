//! Three-way content merge engine (§1-§2): merge-base discovery (C7), tree
//! triage (C5), content-level line merge (C1-C3), and rename reconciliation
//! (C4), orchestrated by the three-way merger (C6) behind a strategy
//! dispatch (C8).
//!
//! Everything this crate doesn't own -- object storage, the DAG walker,
//! on-disk index format, working-tree I/O, attribute lookup, line-ending
//! transforms -- is a trait in [`object_store`], [`revwalk`], [`index`],
//! [`worktree`], or [`attributes`] that a caller implements (§6).

#[macro_use]
extern crate log;

#[macro_use]
mod macros;

pub mod attributes;
pub mod commit;
pub mod config;
pub mod diff_driver;
pub mod error;
pub mod index;
pub mod lockfile;
pub mod merge_algorithm;
pub mod merge_base;
pub mod merge_result;
pub mod merger;
pub mod mode;
pub mod object_store;
pub mod oid;
pub mod path;
pub mod rename;
pub mod revwalk;
pub mod sequence;
pub mod strategy;
pub mod tree;
pub mod tree_walk;
pub mod worktree;
