//! Attribute lookup is an optional external collaborator (§6): per-path
//! `merge=`/`text=`/`filter=` settings. A lookup failure is explicitly
//! non-fatal (treated as "no attributes").

use crate::path::RepoPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAttribute {
    /// refuse textual merging; path is always recorded as a conflict.
    Binary,
    /// delegate to a named external merge driver (opaque to this engine).
    Driver,
}

#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub merge: Option<MergeAttribute>,
    pub text: Option<bool>,
    pub filter: Option<String>,
}

impl Attributes {
    pub fn is_content_mergeable(&self) -> bool {
        !matches!(self.merge, Some(MergeAttribute::Binary) | Some(MergeAttribute::Driver))
    }
}

pub trait AttributeProvider: Send + Sync {
    /// a lookup failure should be swallowed by the implementation and
    /// reported as `Attributes::default()` (no attributes) rather than
    /// propagated, per §6's error-mapping note.
    fn attributes_for(&self, path: &RepoPath) -> Attributes;
}

#[derive(Default)]
pub struct NullAttributeProvider;

impl AttributeProvider for NullAttributeProvider {
    fn attributes_for(&self, _path: &RepoPath) -> Attributes {
        Attributes::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_reports_no_attributes() {
        let provider = NullAttributeProvider;
        let attrs = provider.attributes_for(&"any/path".into());
        assert!(attrs.is_content_mergeable());
    }

    #[test]
    fn binary_attribute_is_not_content_mergeable() {
        let attrs = Attributes { merge: Some(MergeAttribute::Binary), ..Default::default() };
        assert!(!attrs.is_content_mergeable());
    }
}
