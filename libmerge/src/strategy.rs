//! C8: strategy dispatch (§4.7). A strategy is a factory with a `name` and
//! a `new_merger` constructor; three ship with the engine (`resolve`,
//! `recursive`, `one-sided`). Per §9 "global state": the name→strategy
//! registry is explicit and caller-owned, not a module-global singleton.

use crate::error::MergeResult;
use crate::merger::{BaseStrategy, MergeOutcome, RepoHandle, ThreeWayMerger};
use crate::oid::ObjectId;
use rustc_hash::FxHashMap;

/// §4.7: "a strategy is a factory with `name` and `newMerger(repo, inCore)`".
pub trait MergeStrategy {
    fn name(&self) -> &str;

    fn new_merger<'a>(&self, repo: RepoHandle<'a>, in_core: bool) -> Box<dyn Merger<'a> + 'a>;
}

/// What every strategy's merger hands back: a single `merge` call consuming
/// itself, matching [`ThreeWayMerger::merge`]'s by-value receiver.
pub trait Merger<'a> {
    fn merge(self: Box<Self>, base_tip: ObjectId, ours_tip: ObjectId, theirs_tip: ObjectId) -> MergeResult<MergeOutcome>;
}

impl<'a> Merger<'a> for ThreeWayMerger<'a> {
    fn merge(self: Box<Self>, base_tip: ObjectId, ours_tip: ObjectId, theirs_tip: ObjectId) -> MergeResult<MergeOutcome> {
        ThreeWayMerger::merge(*self, base_tip, ours_tip, theirs_tip)
    }
}

/// §4.7 `resolve`: single-base behavior, fails soft (raises
/// `MULTIPLE_MERGE_BASES_NOT_SUPPORTED`) on a criss-cross history.
pub struct ResolveStrategy;

impl MergeStrategy for ResolveStrategy {
    fn name(&self) -> &str {
        "resolve"
    }

    fn new_merger<'a>(&self, mut repo: RepoHandle<'a>, in_core: bool) -> Box<dyn Merger<'a> + 'a> {
        repo.in_core = in_core;
        Box::new(ThreeWayMerger::new(repo, BaseStrategy::Resolve))
    }
}

/// §4.7 `recursive`: the default strategy; synthesizes a virtual base (C7)
/// when the tips have more than one minimal merge base.
pub struct RecursiveStrategy;

impl MergeStrategy for RecursiveStrategy {
    fn name(&self) -> &str {
        "recursive"
    }

    fn new_merger<'a>(&self, mut repo: RepoHandle<'a>, in_core: bool) -> Box<dyn Merger<'a> + 'a> {
        repo.in_core = in_core;
        Box::new(ThreeWayMerger::new(repo, BaseStrategy::Recursive))
    }
}

/// §4.7 `one-sided`: "ignore the merge entirely; result tree = input `i`
/// (0=base, 1=ours, 2=theirs). Always cleanly-merged if `i < 2`." Never
/// constructs a [`ThreeWayMerger`] -- there's no walk, no rename table, no
/// index I/O to run.
pub struct OneSidedStrategy {
    pub which: OneSidedInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneSidedInput {
    Base = 0,
    Ours = 1,
    Theirs = 2,
}

impl MergeStrategy for OneSidedStrategy {
    fn name(&self) -> &str {
        match self.which {
            OneSidedInput::Base => "one-sided-base",
            OneSidedInput::Ours => "one-sided-ours",
            OneSidedInput::Theirs => "one-sided-theirs",
        }
    }

    fn new_merger<'a>(&self, _repo: RepoHandle<'a>, _in_core: bool) -> Box<dyn Merger<'a> + 'a> {
        Box::new(OneSidedMerger { which: self.which })
    }
}

struct OneSidedMerger {
    which: OneSidedInput,
}

impl<'a> Merger<'a> for OneSidedMerger {
    fn merge(self: Box<Self>, base_tip: ObjectId, ours_tip: ObjectId, theirs_tip: ObjectId) -> MergeResult<MergeOutcome> {
        let (tree_id, cleanly_merged) = match self.which {
            OneSidedInput::Base => (base_tip, true),
            OneSidedInput::Ours => (ours_tip, true),
            OneSidedInput::Theirs => (theirs_tip, false),
        };
        Ok(MergeOutcome { cleanly_merged, result_tree_id: Some(tree_id), ..Default::default() })
    }
}

/// §9 "the merge driver registry... is module-global in the source;
/// specify it as an explicit, caller-owned registry passed into the
/// merger. No singletons." Keyed by [`MergeStrategy::name`].
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: FxHashMap<String, Box<dyn MergeStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three strategies the engine ships with (§4.7), registered under
    /// their canonical names.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ResolveStrategy));
        registry.register(Box::new(RecursiveStrategy));
        registry.register(Box::new(OneSidedStrategy { which: OneSidedInput::Base }));
        registry.register(Box::new(OneSidedStrategy { which: OneSidedInput::Ours }));
        registry.register(Box::new(OneSidedStrategy { which: OneSidedInput::Theirs }));
        registry
    }

    pub fn register(&mut self, strategy: Box<dyn MergeStrategy>) {
        self.strategies.insert(strategy.name().to_owned(), strategy);
    }

    pub fn get(&self, name: &str) -> Option<&dyn MergeStrategy> {
        self.strategies.get(name).map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::NullAttributeProvider;
    use crate::mode::FileMode;
    use crate::object_store::InMemoryObjectStore;
    use crate::revwalk::CommitGraphRevWalker;
    use crate::tree::{ObjectStoreExt, Tree, TreeEntry};

    fn repo<'a>(store: &'a InMemoryObjectStore, walker: &'a CommitGraphRevWalker<'a>) -> RepoHandle<'a> {
        RepoHandle::in_core(store, walker)
    }

    #[test]
    fn registry_looks_strategies_up_by_name() {
        let registry = StrategyRegistry::with_builtins();
        assert!(registry.get("resolve").is_some());
        assert!(registry.get("recursive").is_some());
        assert!(registry.get("one-sided-ours").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn one_sided_ours_reports_ours_tree_clean() {
        let store = InMemoryObjectStore::new();
        let blob = store.insert_blob(b"x").unwrap();
        let base_tree = store.insert_tree(&Tree::new(vec![])).unwrap();
        let ours_tree = store
            .insert_tree(&Tree::new(vec![TreeEntry { name: "a".into(), mode: FileMode::Regular, oid: blob }]))
            .unwrap();
        let theirs_tree = base_tree;

        let walker = CommitGraphRevWalker::new(&store);
        let _attrs = NullAttributeProvider;
        let strategy = OneSidedStrategy { which: OneSidedInput::Ours };
        let merger = strategy.new_merger(repo(&store, &walker), true);
        let outcome = merger.merge(base_tree, ours_tree, theirs_tree).unwrap();

        assert!(outcome.cleanly_merged);
        assert_eq!(outcome.result_tree_id, Some(ours_tree));
    }

    #[test]
    fn one_sided_theirs_is_never_reported_clean() {
        let store = InMemoryObjectStore::new();
        let base_tree = store.insert_tree(&Tree::new(vec![])).unwrap();
        let walker = CommitGraphRevWalker::new(&store);
        let strategy = OneSidedStrategy { which: OneSidedInput::Theirs };
        let merger = strategy.new_merger(repo(&store, &walker), true);
        let outcome = merger.merge(base_tree, base_tree, base_tree).unwrap();

        assert!(!outcome.cleanly_merged);
        assert_eq!(outcome.result_tree_id, Some(base_tree));
    }
}
