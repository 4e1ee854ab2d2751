//! Successors reported to the automaton builder.

use regtrav_core::{BitSet, NodeId};

use crate::captures::CaptureBoundaries;
use crate::guard::Guard;

/// Where a transition leads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Target {
    Node(NodeId),
    /// Marker for an empty mandatory iteration that escaped its copy.
    EmptyState,
}

impl Target {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::EmptyState => None,
        }
    }
}

/// Position assertions passed on the way to a successor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Anchors {
    pub caret: bool,
    pub dollar: bool,
    pub match_begin: bool,
    pub match_end: bool,
}

impl Anchors {
    pub fn is_empty(&self) -> bool {
        !(self.caret || self.dollar || self.match_begin || self.match_end)
    }
}

impl std::fmt::Display for Anchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (set, label) in [
            (self.caret, "^"),
            (self.match_begin, "\\A"),
            (self.dollar, "$"),
            (self.match_end, "\\z"),
        ] {
            if set {
                f.write_str(label)?;
            }
        }
        Ok(())
    }
}

/// A successor as seen by the visitor. Borrows engine buffers.
#[derive(Clone, Copy, Debug)]
pub struct Successor<'a> {
    pub target: Target,
    /// Canonical guard list.
    pub guards: &'a [Guard],
    pub captures: &'a CaptureBoundaries,
    /// Lookaround assertions open on the path, outermost first.
    pub lookarounds: &'a [NodeId],
    pub anchors: Anchors,
    pub(crate) matched_condition_groups: Option<&'a BitSet>,
}

impl Successor<'_> {
    /// Condition groups known to have matched on this path. DFA mode only.
    pub fn matched_condition_groups(&self) -> Option<&BitSet> {
        self.matched_condition_groups
    }

    pub fn to_owned(&self) -> OwnedSuccessor {
        OwnedSuccessor {
            target: self.target,
            guards: self.guards.to_vec(),
            captures: self.captures.clone(),
            lookarounds: self.lookarounds.to_vec(),
            anchors: self.anchors,
            matched_condition_groups: self.matched_condition_groups.cloned(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OwnedSuccessor {
    pub target: Target,
    pub guards: Vec<Guard>,
    pub captures: CaptureBoundaries,
    pub lookarounds: Vec<NodeId>,
    pub anchors: Anchors,
    pub matched_condition_groups: Option<BitSet>,
}
