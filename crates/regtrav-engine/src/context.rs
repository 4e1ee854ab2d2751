//! Mutable traversal state.
//!
//! Everything a run mutates lives here, so one engine can be reused across
//! runs and a nested search only needs a second context over the same tree.

use regtrav_core::{Ast, BitSet, NodeId, NodeKind, PositionAssertionKind};

use crate::captures::{CaptureBoundaries, CaptureLog, CaptureOp};
use crate::config::TraversalConfig;
use crate::dedup::{DedupIndex, DedupKey};
use crate::guard::{Guard, GuardLog, canonicalize};
use crate::path::{Action, Mark, Path, PathElement};
use crate::successor::{Anchors, Successor, Target};

pub(crate) struct TraversalContext {
    pub(crate) path: Path,
    pub(crate) guards: GuardLog,
    pub(crate) captures: CaptureLog,
    pub(crate) dedup: DedupIndex,
    /// Successors reported in the current run.
    pub(crate) found: usize,

    // Derived views, recomputed lazily.
    dirty: bool,
    canonical: Vec<Guard>,
    canonical_scratch: Vec<bool>,
    boundaries: CaptureBoundaries,
    lookarounds: Vec<NodeId>,
    anchors: Anchors,
    matched_conditions: BitSet,
    left_loops: Vec<(u32, u32)>,
}

impl TraversalContext {
    pub(crate) fn new(ast: &Ast) -> Self {
        Self {
            path: Path::new(),
            guards: GuardLog::new(),
            captures: CaptureLog::new(),
            dedup: DedupIndex::new(),
            found: 0,
            dirty: true,
            canonical: Vec::new(),
            canonical_scratch: Vec::new(),
            boundaries: CaptureBoundaries::new(ast.boundary_count()),
            lookarounds: Vec::new(),
            anchors: Anchors::default(),
            matched_conditions: BitSet::new(ast.capture_group_count() as usize),
            left_loops: Vec::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.path.clear();
        self.guards.clear();
        self.captures.clear();
        self.dedup.clear();
        self.found = 0;
        self.dirty = true;
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            guards: self.guards.len() as u32,
            captures: self.captures.len() as u32,
        }
    }

    pub(crate) fn push(&mut self, element: PathElement) {
        let mark = self.mark();
        self.path.push(element, mark);
        self.dirty = true;
    }

    /// Pop the top element and undo its effects.
    pub(crate) fn pop(&mut self) -> Option<PathElement> {
        let (element, mark) = self.path.pop()?;
        self.guards.truncate(mark.guards as usize);
        self.captures.truncate(mark.captures as usize);
        self.dirty = true;
        Some(element)
    }

    /// Undo the effects of the top element but keep it, with a new action.
    pub(crate) fn rewrite_top(&mut self, action: Action) {
        let (Some(top), Some(mark)) = (self.path.top(), self.path.top_mark()) else {
            return;
        };
        self.guards.truncate(mark.guards as usize);
        self.captures.truncate(mark.captures as usize);
        self.path.replace_top(top.with_action(action));
        self.dirty = true;
    }

    pub(crate) fn push_guard(&mut self, guard: Guard) {
        self.guards.push(guard);
        self.dirty = true;
    }

    pub(crate) fn push_capture(&mut self, op: CaptureOp) {
        self.captures.push(op);
        self.dirty = true;
    }

    /// Guards pushed by the top element.
    pub(crate) fn top_guards(&self) -> &[Guard] {
        let from = self.path.top_mark().map_or(0, |m| m.guards as usize);
        self.guards.since(from)
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Recompute canonical guards, capture boundaries, open lookarounds and
    /// anchors if anything changed since the last call.
    pub(crate) fn refresh(&mut self, ast: &Ast, config: &TraversalConfig) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        self.left_loops.clear();
        self.lookarounds.clear();
        self.anchors = Anchors::default();
        for (element, mark) in self.path.iter_marked() {
            let node = ast.node(element.node());
            match (element.action(), &node.kind) {
                (Action::PassThrough | Action::Escape, NodeKind::Group(g)) => {
                    if let Some(q) = g.quantifier.and_then(|q| q.index) {
                        self.left_loops.push((q, mark.guards));
                    }
                }
                (Action::None, NodeKind::LookAhead(s) | NodeKind::LookBehind(s)) => {
                    if config.can_traverse_lookarounds && !s.negated {
                        self.lookarounds.push(node.id);
                    }
                }
                (Action::None, NodeKind::MatchFound) => {
                    if let Some(owner) = node.parent {
                        self.lookarounds.retain(|&l| l != owner);
                    }
                }
                (Action::None, NodeKind::PositionAssertion(kind)) => match kind {
                    PositionAssertionKind::Caret => self.anchors.caret = true,
                    PositionAssertionKind::Dollar => self.anchors.dollar = true,
                    PositionAssertionKind::MatchBegin => {
                        self.anchors.match_begin |= !config.ignore_match_boundary_assertions
                    }
                    PositionAssertionKind::MatchEnd => {
                        self.anchors.match_end |= !config.ignore_match_boundary_assertions
                    }
                },
                _ => {}
            }
        }

        canonicalize(
            self.guards.as_slice(),
            &self.left_loops,
            &mut self.canonical_scratch,
            &mut self.canonical,
        );
        self.boundaries.replay(self.captures.as_slice());

        if config.build_dfa {
            self.matched_conditions.clear();
            for n in ast.condition_groups().iter() {
                let closing = if config.forward { 2 * n + 1 } else { 2 * n };
                let matched = self.captures.boundary_state(closing) == Some(true)
                    || self
                        .canonical
                        .contains(&Guard::check_group_matched(n as u16));
                if matched {
                    self.matched_conditions.insert(n);
                }
            }
        }
    }

    pub(crate) fn canonical_guards(&self) -> &[Guard] {
        &self.canonical
    }

    pub(crate) fn anchors(&self) -> Anchors {
        self.anchors
    }

    pub(crate) fn lookarounds(&self) -> &[NodeId] {
        &self.lookarounds
    }

    /// View of the current state as a successor. Call `refresh` first.
    pub(crate) fn successor(&self, target: Target, config: &TraversalConfig) -> Successor<'_> {
        Successor {
            target,
            guards: &self.canonical,
            captures: &self.boundaries,
            lookarounds: &self.lookarounds,
            anchors: self.anchors,
            matched_condition_groups: config.build_dfa.then_some(&self.matched_conditions),
        }
    }

    /// Dedup key of the current state. Call `refresh` first.
    ///
    /// `observable` masks the capture boundaries that can influence matching;
    /// `None` leaves captures out of the key. Sequence keys (`intermediate`)
    /// also record which zero-width iterations are open.
    pub(crate) fn key(
        &self,
        ast: &Ast,
        target: Target,
        intermediate: bool,
        observable: Option<&BitSet>,
    ) -> DedupKey {
        let view = Successor {
            target,
            guards: &self.canonical,
            captures: &self.boundaries,
            lookarounds: &self.lookarounds,
            anchors: self.anchors,
            matched_condition_groups: None,
        };
        let mut key = DedupKey::of(&view, observable);
        if intermediate {
            key.zero_width = self
                .path
                .iter()
                .filter(|e| e.action() == Action::Enter)
                .filter_map(|e| ast.node(e.node()).as_group()?.zero_width_index())
                .collect();
        }
        key
    }
}
