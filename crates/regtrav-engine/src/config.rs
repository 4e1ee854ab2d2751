//! Traversal configuration.

use indexmap::IndexSet;
use regtrav_core::NodeId;

/// Settings fixed before any run.
#[derive(Clone, Debug)]
pub struct TraversalConfig {
    pub(crate) forward: bool,
    pub(crate) can_traverse_caret: bool,
    pub(crate) ignore_match_boundary_assertions: bool,
    pub(crate) can_traverse_lookarounds: bool,
    pub(crate) traversable_lookbehinds: Option<IndexSet<NodeId>>,
    pub(crate) build_dfa: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            forward: true,
            can_traverse_caret: false,
            ignore_match_boundary_assertions: false,
            can_traverse_lookarounds: false,
            traversable_lookbehinds: None,
            build_dfa: false,
        }
    }
}

impl TraversalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match left-to-right (`true`) or right-to-left.
    pub fn forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Shorthand for `forward(false)`.
    pub fn reverse(self) -> Self {
        self.forward(false)
    }

    /// Allow passing the start anchor (`^` forward, `$` reverse).
    pub fn can_traverse_caret(mut self, yes: bool) -> Self {
        self.can_traverse_caret = yes;
        self
    }

    pub fn ignore_match_boundary_assertions(mut self, yes: bool) -> Self {
        self.ignore_match_boundary_assertions = yes;
        self
    }

    /// Descend into lookahead bodies instead of reporting the assertion.
    pub fn can_traverse_lookarounds(mut self, yes: bool) -> Self {
        self.can_traverse_lookarounds = yes;
        self
    }

    /// Restrict which lookbehinds may be passed. Unrestricted by default.
    pub fn traversable_lookbehinds(mut self, lookbehinds: impl IntoIterator<Item = NodeId>) -> Self {
        self.traversable_lookbehinds = Some(lookbehinds.into_iter().collect());
        self
    }

    /// Track conditional back-references for DFA construction.
    pub fn build_dfa(mut self, yes: bool) -> Self {
        self.build_dfa = yes;
        self
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub(crate) fn lookbehind_traversable(&self, node: NodeId) -> bool {
        self.traversable_lookbehinds
            .as_ref()
            .is_none_or(|set| set.contains(&node))
    }
}
