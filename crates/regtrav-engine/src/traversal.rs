//! Successor search over the syntax tree.
//!
//! A run starts at a node the automaton builder already reached and walks
//! every epsilon route forward (or backward) until it hits something that
//! consumes input or ends a match. Each such node, together with the
//! conditions collected on the way, is one successor.
//!
//! The search is a depth-first backtracking walk over an explicit path
//! stack: alternatives are tried in priority order, so successors come out
//! in the order a backtracking matcher would try them.

use regtrav_core::{
    Ast, BitSet, NodeId, NodeKind, PositionAssertionKind, Sequence, boundary_end, boundary_start,
};

use crate::Result;
use crate::captures::CaptureOp;
use crate::config::TraversalConfig;
use crate::context::TraversalContext;
use crate::error::TraversalError;
use crate::guard::{Guard, GuardKind, Iteration, Verdict};
use crate::invariants::{ensure_parent, unexpected_parent};
use crate::path::{Action, PathElement};
use crate::successor::{OwnedSuccessor, Successor, Target};
use crate::trace::{NoopTracer, Prune, Tracer};

/// Receives successors and lookahead scope changes.
///
/// `enter_lookahead`/`leave_lookahead` bracket the part of the search that
/// runs inside a traversable lookahead body, including re-entries while the
/// search backtracks out of a finished lookahead.
pub trait Visitor {
    fn visit(&mut self, successor: &Successor<'_>);

    fn enter_lookahead(&mut self, _assertion: NodeId) {}

    fn leave_lookahead(&mut self, _assertion: NodeId) {}
}

struct FnVisitor<F>(F);

impl<F: FnMut(&Successor<'_>)> Visitor for FnVisitor<F> {
    fn visit(&mut self, successor: &Successor<'_>) {
        (self.0)(successor)
    }
}

/// What the search loop does next.
enum Step {
    Advance(NodeId),
    Retreat,
    Done,
}

/// Reusable successor search over one tree.
pub struct Traversal<'a> {
    ast: &'a Ast,
    config: TraversalConfig,
    ctx: TraversalContext,
    /// Capture boundaries that can change how the rest of the pattern matches.
    /// `None` when no boundary can.
    observable: Option<BitSet>,
}

impl<'a> Traversal<'a> {
    pub fn new(ast: &'a Ast, config: TraversalConfig) -> Self {
        let observable = observable_captures(ast, &config);
        Self {
            ast,
            config,
            ctx: TraversalContext::new(ast),
            observable,
        }
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Capture boundaries that distinguish successors; `None` when captures
    /// cannot influence matching.
    pub fn observable_captures(&self) -> Option<&BitSet> {
        self.observable.as_ref()
    }

    /// No path, guards or captures are left over from a previous run.
    pub fn is_idle(&self) -> bool {
        self.ctx.path.is_empty() && self.ctx.guards.is_empty() && self.ctx.captures.is_empty()
    }

    /// Report every successor of `start` to `visit`, in priority order.
    ///
    /// Returns the number of successors reported.
    pub fn run(&mut self, start: NodeId, visit: impl FnMut(&Successor<'_>)) -> Result<usize> {
        self.run_with(start, &mut FnVisitor(visit), &mut NoopTracer)
    }

    /// Collect the successors of `start`. Nothing is returned if the run fails.
    pub fn run_collect(&mut self, start: NodeId) -> Result<Vec<OwnedSuccessor>> {
        let mut out = Vec::new();
        self.run(start, |s| out.push(s.to_owned()))?;
        Ok(out)
    }

    /// Run with a custom visitor and tracer.
    ///
    /// The tracer is generic, so `NoopTracer` calls are optimized away
    /// while `PrintTracer` collects a readable log of the search.
    pub fn run_with<V: Visitor, T: Tracer>(
        &mut self,
        start: NodeId,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Result<usize> {
        self.ctx.clear();
        if let Err(e) = self.search(start, visitor, tracer) {
            self.ctx.clear();
            return Err(e);
        }

        let found = self.ctx.found;
        let depth = self.ctx.path.len();
        self.ctx.clear();
        if depth != 0 {
            return Err(TraversalError::UnbalancedPath { depth });
        }
        tracer.trace_done(found);
        Ok(found)
    }

    fn search<V: Visitor, T: Tracer>(
        &mut self,
        start: NodeId,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Result<()> {
        let mut step = self.seed(start, tracer)?;
        loop {
            step = match step {
                Step::Advance(node) => self.advance(node, visitor, tracer)?,
                Step::Retreat => self.retreat(visitor, tracer),
                Step::Done => break,
            };
        }
        while !self.ctx.path.is_empty() {
            self.pop(visitor, tracer);
        }
        Ok(())
    }

    /// First step of a run.
    ///
    /// The body group of a subtree is entered; any other term has already
    /// been reached by the caller and is left.
    fn seed<T: Tracer>(&mut self, start: NodeId, tracer: &mut T) -> Result<Step> {
        let ast = self.ast;
        if start.index() >= ast.len() {
            return Err(TraversalError::InvalidStart {
                node: start,
                kind: "unknown node",
            });
        }
        let node = ast.node(start);
        match &node.kind {
            NodeKind::Root(_) | NodeKind::Sequence(_) | NodeKind::MatchFound => {
                Err(TraversalError::InvalidStart {
                    node: start,
                    kind: node.kind_name(),
                })
            }
            NodeKind::Group(_)
                if node
                    .parent
                    .is_some_and(|p| ast.node(p).is_subtree_root()) =>
            {
                Ok(Step::Advance(start))
            }
            _ => Ok(self.advance_term(start, tracer)),
        }
    }

    // ========================================================================
    // Moving forward
    // ========================================================================

    fn advance<V: Visitor, T: Tracer>(
        &mut self,
        id: NodeId,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Result<Step> {
        let ast = self.ast;
        let node = ast.node(id);
        tracer.trace_advance(id);

        if node.is_dead() {
            tracer.trace_prune(id, Prune::Dead);
            return Ok(Step::Retreat);
        }

        let step = match &node.kind {
            NodeKind::Sequence(seq) => self.advance_sequence(id, seq, tracer),
            NodeKind::Group(group) => match group.alternatives.first() {
                None => Step::Retreat,
                Some(&first) => {
                    if self.push_group_enter(id, 0, tracer) {
                        Step::Advance(first)
                    } else {
                        tracer.trace_prune(id, Prune::Contradiction);
                        Step::Retreat
                    }
                }
            },
            NodeKind::CharacterClass(_) => self.consume(id, false, visitor, tracer),
            NodeKind::BackReference(b) => self.consume(id, b.may_match_empty, visitor, tracer),
            NodeKind::AtomicGroup(_) => {
                self.push_plain(id, tracer);
                self.found(Target::Node(id), visitor, tracer)
            }
            NodeKind::SubexpressionCall(_) => return Err(TraversalError::UnexpandedCall(id)),
            NodeKind::PositionAssertion(kind) => {
                self.push_plain(id, tracer);
                let start_anchor = if self.config.forward {
                    PositionAssertionKind::Caret
                } else {
                    PositionAssertionKind::Dollar
                };
                if *kind == start_anchor && !self.config.can_traverse_caret {
                    tracer.trace_prune(id, Prune::StartAnchor);
                    Step::Retreat
                } else {
                    self.advance_term(id, tracer)
                }
            }
            NodeKind::LookAhead(s) => {
                self.push_plain(id, tracer);
                if !self.config.can_traverse_lookarounds || s.negated {
                    self.found(Target::Node(id), visitor, tracer)
                } else {
                    visitor.enter_lookahead(id);
                    Step::Advance(s.body)
                }
            }
            NodeKind::LookBehind(s) => {
                self.push_plain(id, tracer);
                if !self.config.can_traverse_lookarounds || s.negated {
                    self.found(Target::Node(id), visitor, tracer)
                } else if self.config.lookbehind_traversable(id) {
                    Step::Advance(s.body)
                } else {
                    tracer.trace_prune(id, Prune::Lookbehind);
                    Step::Retreat
                }
            }
            NodeKind::MatchFound => {
                self.push_plain(id, tracer);
                let owner = ensure_parent(ast, id);
                match &ast.node(owner).kind {
                    NodeKind::LookAhead(s)
                        if self.config.can_traverse_lookarounds && !s.negated =>
                    {
                        visitor.leave_lookahead(owner);
                        self.advance_term(owner, tracer)
                    }
                    NodeKind::LookBehind(s)
                        if self.config.can_traverse_lookarounds
                            && !s.negated
                            && self.config.lookbehind_traversable(owner) =>
                    {
                        self.advance_term(owner, tracer)
                    }
                    NodeKind::Root(_) => {
                        let step = self.found(Target::Node(id), visitor, tracer);
                        if self.match_is_final() {
                            Step::Done
                        } else {
                            step
                        }
                    }
                    _ => self.found(Target::Node(id), visitor, tracer),
                }
            }
            NodeKind::Root(s) => Step::Advance(s.body),
        };
        Ok(step)
    }

    fn advance_sequence<T: Tracer>(&mut self, id: NodeId, seq: &Sequence, tracer: &mut T) -> Step {
        let ast = self.ast;
        self.ctx.refresh(ast, &self.config);
        let key = self
            .ctx
            .key(ast, Target::Node(id), true, self.observable.as_ref());
        if !self.ctx.dedup.insert(key) {
            tracer.trace_dedup_hit(Target::Node(id));
            return Step::Retreat;
        }

        let first = if self.config.forward {
            seq.terms.first()
        } else {
            seq.terms.last()
        };
        if let Some(&term) = first {
            return Step::Advance(term);
        }

        let group = ast.enclosing_group(id);
        if seq.pass_through {
            return self.pass_through(group, tracer);
        }
        if !self.push_group_exit(group, tracer) {
            tracer.trace_prune(group, Prune::Contradiction);
            return Step::Retreat;
        }
        if ast.group(group).is_loop() {
            Step::Advance(group)
        } else {
            self.advance_term(group, tracer)
        }
    }

    /// Move past `term`: to its next sibling, or out of the enclosing
    /// groups until one has a next sibling, loops back, or a subtree ends.
    fn advance_term<T: Tracer>(&mut self, term: NodeId, tracer: &mut T) -> Step {
        let ast = self.ast;
        let mut term = term;
        loop {
            let parent = ensure_parent(ast, term);
            match &ast.node(parent).kind {
                NodeKind::Sequence(seq) => {
                    let index = ast.node(term).seq_index as usize;
                    let next = if self.config.forward {
                        seq.terms.get(index + 1)
                    } else {
                        index.checked_sub(1).and_then(|i| seq.terms.get(i))
                    };
                    if let Some(&next) = next {
                        return Step::Advance(next);
                    }
                    let group = ast.enclosing_group(parent);
                    if !self.push_group_exit(group, tracer) {
                        tracer.trace_prune(group, Prune::Contradiction);
                        return Step::Retreat;
                    }
                    if ast.group(group).is_loop() {
                        return Step::Advance(group);
                    }
                    term = group;
                }
                NodeKind::Root(s)
                | NodeKind::LookAhead(s)
                | NodeKind::LookBehind(s)
                | NodeKind::AtomicGroup(s) => return Step::Advance(s.match_found),
                _ => unexpected_parent(ast, term, parent),
            }
        }
    }

    /// Leave a quantified group through its synthetic empty branch.
    ///
    /// The `Enter` element of the branch stays on the path as `PassThrough`,
    /// without the enter effects.
    fn pass_through<T: Tracer>(&mut self, group_id: NodeId, tracer: &mut T) -> Step {
        if let Some(top) = self.ctx.path.top() {
            tracer.trace_pop(top);
            self.ctx.rewrite_top(Action::PassThrough);
            tracer.trace_push(top.with_action(Action::PassThrough));
        }

        let group = self.ast.group(group_id);
        if let Some(q) = group.quantifier
            && group.is_loop()
        {
            let reentry = self
                .ctx
                .path
                .below_top()
                .is_some_and(|e| e.is_group_action(group_id, Action::Exit));
            let consistent = match (reentry, q.index) {
                (false, _) => q.min == 0,
                (true, Some(index)) if q.min > 1 => {
                    self.push_counter_check(GuardKind::CountGeMin, index, q.min)
                }
                _ => true,
            };
            if !consistent {
                tracer.trace_prune(group_id, Prune::Contradiction);
                return Step::Retreat;
            }
        }
        self.advance_term(group_id, tracer)
    }

    /// Report `target` unless an equivalent successor was reported already.
    fn found<V: Visitor, T: Tracer>(
        &mut self,
        target: Target,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Step {
        let ast = self.ast;
        self.ctx.refresh(ast, &self.config);
        let key = self.ctx.key(ast, target, false, self.observable.as_ref());
        if !self.ctx.dedup.insert(key) {
            tracer.trace_dedup_hit(target);
            return Step::Retreat;
        }
        let successor = self.ctx.successor(target, &self.config);
        tracer.trace_successor(&successor);
        visitor.visit(&successor);
        self.ctx.found += 1;
        Step::Retreat
    }

    fn consume<V: Visitor, T: Tracer>(
        &mut self,
        id: NodeId,
        may_match_empty: bool,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Step {
        self.push_plain(id, tracer);
        if !may_match_empty && self.past_match_end() {
            tracer.trace_prune(id, Prune::PastMatchEnd);
            return Step::Retreat;
        }
        self.found(Target::Node(id), visitor, tracer)
    }

    /// The path crossed the end-of-match assertion, so nothing can be consumed.
    fn past_match_end(&self) -> bool {
        if self.config.ignore_match_boundary_assertions {
            return false;
        }
        let boundary = if self.config.forward {
            PositionAssertionKind::MatchEnd
        } else {
            PositionAssertionKind::MatchBegin
        };
        self.ctx.path.iter().any(|e| {
            e.action() == Action::None
                && matches!(
                    self.ast.node(e.node()).kind,
                    NodeKind::PositionAssertion(k) if k == boundary
                )
        })
    }

    /// A whole-pattern match that no lower-priority route can beat.
    ///
    /// Only unconditional: nothing left to check at match time.
    fn match_is_final(&self) -> bool {
        let anchors = self.ctx.anchors();
        let end_anchor = if self.config.forward {
            anchors.dollar || anchors.match_end
        } else {
            anchors.caret || anchors.match_begin
        };
        !end_anchor && self.ctx.lookarounds().is_empty() && self.ctx.canonical_guards().is_empty()
    }

    // ========================================================================
    // Group effects
    // ========================================================================

    fn push_plain<T: Tracer>(&mut self, id: NodeId, tracer: &mut T) {
        let element = PathElement::plain(id);
        self.ctx.push(element);
        tracer.trace_push(element);
    }

    /// Push `Enter(group, alt)` with its effects. Returns `false` if the
    /// effects contradict the path; the element stays pushed either way.
    fn push_group_enter<T: Tracer>(&mut self, group_id: NodeId, alt: u16, tracer: &mut T) -> bool {
        let ast = self.ast;
        let flavor = ast.flavor();
        let group = ast.group(group_id);
        let reentry = self
            .ctx
            .path
            .top()
            .is_some_and(|e| e.is_group_action(group_id, Action::Exit));

        let element = PathElement::new(group_id, Action::Enter, alt);
        self.ctx.push(element);
        tracer.trace_push(element);

        let mut consistent = true;

        if let Some(n) = group.capture {
            let boundary = if self.config.forward {
                boundary_start(n)
            } else {
                boundary_end(n)
            };
            self.update_capture(boundary);
            if flavor.supports_recursive_backreferences && ast.is_recursively_referenced(n) {
                self.ctx.push_guard(Guard::update_recursive_backref(n));
            }
        }

        if group.quantifier.is_some() && !flavor.nested_capture_groups_kept_on_loop_reentry {
            for n in group.enclosed_captures.clone() {
                self.ctx
                    .push_capture(CaptureOp::Clear(boundary_start(n) as u32));
                self.ctx.push_capture(CaptureOp::Clear(boundary_end(n) as u32));
            }
        }

        if let Some(n) = group.conditional_backref {
            let check = if alt == 0 {
                Guard::check_group_matched(n)
            } else {
                Guard::check_group_not_matched(n)
            };
            consistent &= self.push_group_check(check);
        }

        if let Some(q) = group.quantifier
            && let Some(index) = q.index
        {
            if reentry {
                if let Some(max) = q.max {
                    consistent &= self.push_counter_check(GuardKind::CountLtMax, index, max);
                }
                self.ctx.push_guard(Guard::count_inc(index));
            } else {
                self.ctx.push_guard(Guard::count_set1(index));
            }
        }

        if let Some(z) = group.zero_width_index()
            && self.checks_empty_iterations(group_id)
        {
            self.ctx.push_guard(Guard::enter_zero_width(z));
        }

        consistent
    }

    /// Push `Exit(group)` with its effects. Returns `false` if the effects
    /// contradict the path; the element stays pushed either way.
    fn push_group_exit<T: Tracer>(&mut self, group_id: NodeId, tracer: &mut T) -> bool {
        let element = PathElement::new(group_id, Action::Exit, 0);
        self.ctx.push(element);
        tracer.trace_push(element);
        self.group_exit_effects(group_id, false)
    }

    /// Effects shared by a normal exit and an escape.
    fn group_exit_effects(&mut self, group_id: NodeId, escape: bool) -> bool {
        let ast = self.ast;
        let flavor = ast.flavor();
        let group = ast.group(group_id);

        if let Some(n) = group.capture {
            let boundary = if self.config.forward {
                boundary_end(n)
            } else {
                boundary_start(n)
            };
            self.update_capture(boundary);
            if flavor.uses_last_group_result_field && n != 0 {
                self.ctx.push_capture(CaptureOp::LastGroup(n));
            }
        }

        let Some(z) = group.zero_width_index() else {
            return true;
        };
        if !self.checks_empty_iterations(group_id) {
            return true;
        }

        let iteration = self
            .ctx
            .guards
            .iteration(z, flavor.empty_checks_monitor_capture_groups);
        if escape {
            self.ctx.push_guard(Guard::escape_zero_width(z));
            return iteration != Iteration::EmptyCapturesChanged;
        }
        match iteration {
            Iteration::Unknown | Iteration::EmptyCapturesChanged => {
                self.ctx.push_guard(Guard::exit_zero_width(z));
                true
            }
            Iteration::Empty => {
                // A mandatory iteration may be empty; its empty check is dropped.
                if let Some(q) = group.quantifier
                    && group.is_loop()
                    && q.min > 0
                    && !flavor.empty_checks_on_mandatory_loop_iterations
                    && let Some(index) = q.index
                {
                    match self.ctx.guards.check_counter(GuardKind::CountLtMin, index, q.min) {
                        Verdict::Holds => {
                            self.ctx.push_guard(Guard::escape_zero_width(z));
                            return true;
                        }
                        Verdict::Unknown => {
                            self.ctx.push_guard(Guard::count_lt_min(index));
                            self.ctx.push_guard(Guard::escape_zero_width(z));
                            return true;
                        }
                        Verdict::Fails => {}
                    }
                }
                self.ctx.push_guard(Guard::exit_zero_width(z));
                false
            }
        }
    }

    fn checks_empty_iterations(&self, group_id: NodeId) -> bool {
        !self.ast.group(group_id).is_mandatory_copy()
            || self.ast.flavor().empty_checks_on_mandatory_loop_iterations
    }

    fn update_capture(&mut self, boundary: usize) {
        self.ctx.push_capture(CaptureOp::Update(boundary as u32));
        let ast = self.ast;
        if ast.flavor().empty_checks_monitor_capture_groups
            && ast.zero_width_quantifiable_count() > 0
        {
            self.ctx.push_guard(Guard::update_capture_group(boundary));
        }
    }

    /// Push a counter check unless the path already decides it.
    fn push_counter_check(&mut self, kind: GuardKind, q: u32, bound: u32) -> bool {
        match self.ctx.guards.check_counter(kind, q, bound) {
            Verdict::Holds => true,
            Verdict::Fails => false,
            Verdict::Unknown => {
                self.ctx.push_guard(Guard::new(kind, q));
                true
            }
        }
    }

    /// Push a group-matched check unless the path already decides it.
    fn push_group_check(&mut self, check: Guard) -> bool {
        let n = check.operand() as u16;
        let closing = if self.config.forward {
            boundary_end(n)
        } else {
            boundary_start(n)
        };
        let wants_matched = check.kind() == GuardKind::CheckGroupMatched;
        if let Some(matched) = self.ctx.captures.boundary_state(closing) {
            return matched == wants_matched;
        }
        match self.ctx.guards.check_group(check) {
            Verdict::Holds => true,
            Verdict::Fails => false,
            Verdict::Unknown => {
                self.ctx.push_guard(check);
                true
            }
        }
    }

    // ========================================================================
    // Backtracking
    // ========================================================================

    /// Unwind the path to the most recent untried choice.
    fn retreat<V: Visitor, T: Tracer>(&mut self, visitor: &mut V, tracer: &mut T) -> Step {
        let ast = self.ast;
        while let Some(top) = self.ctx.path.top() {
            let id = top.node();
            match top.action() {
                Action::Enter | Action::PassThrough => {
                    let next = top.alt_index() as usize + 1;
                    self.pop(visitor, tracer);
                    if let Some(&alt) = ast.group(id).alternatives.get(next) {
                        if self.push_group_enter(id, next as u16, tracer) {
                            return Step::Advance(alt);
                        }
                        tracer.trace_prune(id, Prune::Contradiction);
                    }
                }
                Action::Exit => match self.escape(id, visitor, tracer) {
                    // The escape element is on top now; unwind it next.
                    Some(Step::Retreat) => {}
                    Some(step) => return step,
                    None => self.pop(visitor, tracer),
                },
                Action::None | Action::Escape => self.pop(visitor, tracer),
            }
        }
        Step::Done
    }

    /// Leave a loop whose last iteration failed its empty check.
    ///
    /// Applies when the flavor lets such an iteration fall through to the
    /// rest of the pattern instead of backtracking into it.
    fn escape<V: Visitor, T: Tracer>(
        &mut self,
        group_id: NodeId,
        visitor: &mut V,
        tracer: &mut T,
    ) -> Option<Step> {
        let ast = self.ast;
        let group = ast.group(group_id);
        let z = group.zero_width_index()?;
        if !ast.flavor().failing_empty_checks_dont_backtrack
            || !self
                .ctx
                .top_guards()
                .contains(&Guard::exit_zero_width(z))
        {
            return None;
        }

        self.pop(visitor, tracer);
        let element = PathElement::new(group_id, Action::Escape, 0);
        self.ctx.push(element);
        tracer.trace_push(element);

        if !self.group_exit_effects(group_id, true) {
            tracer.trace_prune(group_id, Prune::Contradiction);
            return Some(Step::Retreat);
        }
        if group.is_mandatory_copy() {
            return Some(self.found(Target::EmptyState, visitor, tracer));
        }
        Some(self.advance_term(group_id, tracer))
    }

    /// Pop the top element, keeping the visitor's lookahead scope in sync.
    fn pop<V: Visitor, T: Tracer>(&mut self, visitor: &mut V, tracer: &mut T) {
        let Some(element) = self.ctx.pop() else {
            return;
        };
        tracer.trace_pop(element);
        if element.action() != Action::None || !self.config.can_traverse_lookarounds {
            return;
        }

        let ast = self.ast;
        let node = ast.node(element.node());
        match &node.kind {
            NodeKind::LookAhead(s) if !s.negated => visitor.leave_lookahead(node.id),
            NodeKind::MatchFound => {
                if let Some(owner) = node.parent
                    && let NodeKind::LookAhead(s) = &ast.node(owner).kind
                    && !s.negated
                {
                    visitor.enter_lookahead(owner);
                }
            }
            _ => {}
        }
    }
}

/// Capture boundaries a successor's key must distinguish.
fn observable_captures(ast: &Ast, config: &TraversalConfig) -> Option<BitSet> {
    let count = ast.boundary_count();
    let mut mask = BitSet::new(count);
    if ast.flavor().matches_transitions_step_by_step {
        for b in 0..count {
            mask.insert(b);
        }
        return Some(mask);
    }

    let conditions = config.build_dfa && ast.has_conditional_back_references();
    if !ast.has_back_references() && !conditions {
        return None;
    }
    let mut groups = ast.referenced_groups().clone();
    if conditions {
        groups.union_with(ast.condition_groups());
    }
    for n in groups.iter() {
        mask.insert(2 * n);
        mask.insert(2 * n + 1);
    }
    Some(mask)
}
