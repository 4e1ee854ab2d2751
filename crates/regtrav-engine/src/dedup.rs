//! Deduplication of traversal states.
//!
//! Two paths that reach the same node with the same key have the same future,
//! so only the first (highest priority) one is explored.

use indexmap::IndexSet;
use regtrav_core::{BitSet, NodeId};

use crate::captures::CaptureBoundaries;
use crate::guard::{Guard, GuardKind};
use crate::successor::{Anchors, Successor, Target};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DedupKey {
    pub target: Target,
    pub anchors: Anchors,
    pub lookarounds: Vec<NodeId>,
    /// Canonical guards without capture updates.
    pub guards: Vec<Guard>,
    /// Zero-width slots of iterations open on the path. Sequence keys only.
    pub zero_width: Vec<u32>,
    /// Observable capture state, when captures are observable at all.
    pub captures: Option<CaptureBoundaries>,
}

impl DedupKey {
    /// Key of a reported successor. `observable` masks the capture boundaries
    /// that can influence matching; `None` leaves captures out.
    pub fn of(successor: &Successor<'_>, observable: Option<&BitSet>) -> Self {
        let captures = observable.map(|mask| {
            let mut c = successor.captures.masked(mask);
            c.first_group = None;
            c
        });
        Self {
            target: successor.target,
            anchors: successor.anchors,
            lookarounds: successor.lookarounds.to_vec(),
            guards: successor
                .guards
                .iter()
                .copied()
                .filter(|g| g.kind() != GuardKind::UpdateCaptureGroup)
                .collect(),
            zero_width: Vec::new(),
            captures,
        }
    }
}

#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: IndexSet<DedupKey>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: DedupKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
