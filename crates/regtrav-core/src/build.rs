//! Tree builder.
//!
//! Lowers an `Expr` description into an `Ast` arena. This is a construction
//! helper for embedders and tests, not a regex parser.
//!
//! Lowering runs in two phases:
//! - **Shape**: nodes are allocated in pre-order, parents linked, pass-through
//!   sequences inserted and loop counter slots assigned.
//! - **Analysis**: post-passes over the arena mark dead nodes, compute
//!   empty-match facts, assign zero-width slots and enclosed ranges.

use std::ops::Range;

use crate::ast::{
    Ast, BackReference, CharacterClass, Group, Node, NodeKind, PositionAssertionKind, Quantifier,
    Sequence, Subtree,
};
use crate::bitset::BitSet;
use crate::flavor::Flavor;
use crate::{Error, GroupNumber, NodeId, Result};

// ============================================================================
// Expression description
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Class {
        ranges: Vec<(char, char)>,
        label: String,
    },
    Seq(Vec<Expr>),
    /// Non-capturing group of alternatives.
    Alt(Vec<Expr>),
    Capture(GroupNumber, Box<Expr>),
    Repeat {
        body: Box<Expr>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        /// Expand into copies instead of a counted loop.
        unroll: bool,
    },
    LookAhead {
        body: Box<Expr>,
        negated: bool,
    },
    LookBehind {
        body: Box<Expr>,
        negated: bool,
    },
    Assertion(PositionAssertionKind),
    BackRef(Vec<GroupNumber>),
    Atomic(Box<Expr>),
    Conditional {
        group: GroupNumber,
        yes: Box<Expr>,
        no: Box<Expr>,
    },
    Call(GroupNumber),
}

pub fn lit(c: char) -> Expr {
    Expr::Class {
        ranges: vec![(c, c)],
        label: c.to_string(),
    }
}

/// Sequence of literals.
pub fn text(s: &str) -> Expr {
    Expr::Seq(s.chars().map(lit).collect())
}

pub fn class(label: &str, ranges: &[(char, char)]) -> Expr {
    Expr::Class {
        ranges: ranges.to_vec(),
        label: label.to_string(),
    }
}

/// A class that matches nothing, e.g. `[^\x00-\x{10FFFF}]`.
pub fn empty_class() -> Expr {
    Expr::Class {
        ranges: Vec::new(),
        label: "[]".to_string(),
    }
}

pub fn empty() -> Expr {
    Expr::Seq(Vec::new())
}

pub fn seq(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Seq(items.into_iter().collect())
}

pub fn alt(branches: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Alt(branches.into_iter().collect())
}

pub fn cap(group: GroupNumber, body: Expr) -> Expr {
    Expr::Capture(group, Box::new(body))
}

pub fn repeat(body: Expr, min: u32, max: Option<u32>) -> Expr {
    quantify(body, min, max, true, false)
}

pub fn repeat_lazy(body: Expr, min: u32, max: Option<u32>) -> Expr {
    quantify(body, min, max, false, false)
}

/// Bounded repetition expanded into `min` mandatory copies followed by
/// optional copies (or a loop when `max` is unbounded).
pub fn unrolled(body: Expr, min: u32, max: Option<u32>) -> Expr {
    quantify(body, min, max, true, true)
}

pub fn star(body: Expr) -> Expr {
    repeat(body, 0, None)
}

pub fn plus(body: Expr) -> Expr {
    repeat(body, 1, None)
}

pub fn opt(body: Expr) -> Expr {
    repeat(body, 0, Some(1))
}

pub fn star_lazy(body: Expr) -> Expr {
    repeat_lazy(body, 0, None)
}

pub fn plus_lazy(body: Expr) -> Expr {
    repeat_lazy(body, 1, None)
}

pub fn opt_lazy(body: Expr) -> Expr {
    repeat_lazy(body, 0, Some(1))
}

fn quantify(body: Expr, min: u32, max: Option<u32>, greedy: bool, unroll: bool) -> Expr {
    Expr::Repeat {
        body: Box::new(body),
        min,
        max,
        greedy,
        unroll,
    }
}

pub fn lookahead(body: Expr) -> Expr {
    Expr::LookAhead {
        body: Box::new(body),
        negated: false,
    }
}

pub fn neg_lookahead(body: Expr) -> Expr {
    Expr::LookAhead {
        body: Box::new(body),
        negated: true,
    }
}

pub fn lookbehind(body: Expr) -> Expr {
    Expr::LookBehind {
        body: Box::new(body),
        negated: false,
    }
}

pub fn neg_lookbehind(body: Expr) -> Expr {
    Expr::LookBehind {
        body: Box::new(body),
        negated: true,
    }
}

pub fn caret() -> Expr {
    Expr::Assertion(PositionAssertionKind::Caret)
}

pub fn dollar() -> Expr {
    Expr::Assertion(PositionAssertionKind::Dollar)
}

pub fn match_begin() -> Expr {
    Expr::Assertion(PositionAssertionKind::MatchBegin)
}

pub fn match_end() -> Expr {
    Expr::Assertion(PositionAssertionKind::MatchEnd)
}

pub fn backref(group: GroupNumber) -> Expr {
    Expr::BackRef(vec![group])
}

/// Back-reference to whichever of several same-named groups matched.
pub fn backref_any(groups: &[GroupNumber]) -> Expr {
    Expr::BackRef(groups.to_vec())
}

pub fn atomic(body: Expr) -> Expr {
    Expr::Atomic(Box::new(body))
}

pub fn conditional(group: GroupNumber, yes: Expr, no: Expr) -> Expr {
    Expr::Conditional {
        group,
        yes: Box::new(yes),
        no: Box::new(no),
    }
}

pub fn call(group: GroupNumber) -> Expr {
    Expr::Call(group)
}

// ============================================================================
// Builder
// ============================================================================

pub struct AstBuilder {
    flavor: Flavor,
}

impl AstBuilder {
    pub fn new(flavor: Flavor) -> Self {
        Self { flavor }
    }

    pub fn build(&self, pattern: &Expr) -> Result<Ast> {
        let mut lowering = Lowering::new(self.flavor);
        let root = lowering.alloc(None, 0);
        let body = lowering.lower_group(
            root,
            0,
            GroupShape {
                branches: branches_of(pattern),
                capture: Some(0),
                quantifier: None,
                conditional: None,
                family: None,
            },
        )?;
        let match_found = lowering.alloc(Some(root), 1);
        lowering.set(
            root,
            NodeKind::Root(Subtree {
                body,
                match_found,
                negated: false,
            }),
        );
        lowering.finish(root);
        lowering.finish(match_found);
        lowering.into_ast(root)
    }
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new(Flavor::default())
    }
}

impl Ast {
    /// Shorthand for `AstBuilder::new(flavor).build(pattern)`.
    pub fn build(pattern: &Expr, flavor: Flavor) -> Result<Ast> {
        AstBuilder::new(flavor).build(pattern)
    }
}

fn branches_of(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Alt(branches) => branches.iter().collect(),
        other => vec![other],
    }
}

/// One term of a sequence after flattening.
enum Item<'e> {
    Expr(&'e Expr),
    Copy {
        body: &'e Expr,
        quantifier: Quantifier,
        family: u32,
    },
}

struct GroupShape<'e> {
    branches: Vec<&'e Expr>,
    capture: Option<GroupNumber>,
    quantifier: Option<Quantifier>,
    conditional: Option<GroupNumber>,
    family: Option<u32>,
}

struct Lowering {
    flavor: Flavor,
    nodes: Vec<Node>,
    /// Exclusive end of each node's pre-order subtree.
    ends: Vec<u32>,
    /// Unrolled copies of the same quantifier share a family.
    families: Vec<Option<u32>>,
    family_count: u32,
    quantifier_count: u32,
    max_group: GroupNumber,
    open_captures: Vec<GroupNumber>,
    referenced: Vec<GroupNumber>,
    recursive: Vec<GroupNumber>,
    conditions: Vec<GroupNumber>,
    calls: Vec<GroupNumber>,
}

impl Lowering {
    fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            nodes: Vec::new(),
            ends: Vec::new(),
            families: Vec::new(),
            family_count: 0,
            quantifier_count: 0,
            max_group: 0,
            open_captures: Vec::new(),
            referenced: Vec::new(),
            recursive: Vec::new(),
            conditions: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Reserve the next id. The kind is filled in by `set` once children exist.
    fn alloc(&mut self, parent: Option<NodeId>, seq_index: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            parent,
            seq_index,
            dead: false,
            kind: NodeKind::MatchFound,
        });
        self.ends.push(id.0 + 1);
        self.families.push(None);
        id
    }

    fn set(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    fn finish(&mut self, id: NodeId) {
        self.ends[id.index()] = self.nodes.len() as u32;
    }

    fn leaf(&mut self, parent: NodeId, seq_index: u32, kind: NodeKind) -> NodeId {
        let id = self.alloc(Some(parent), seq_index);
        self.set(id, kind);
        id
    }

    fn check_reference(&self, group: GroupNumber) -> Result<()> {
        if group == 0 {
            return Err(Error::ReservedGroup);
        }
        Ok(())
    }

    fn flatten<'e>(&mut self, expr: &'e Expr, out: &mut Vec<Item<'e>>) -> Result<()> {
        match expr {
            Expr::Seq(items) => {
                for item in items {
                    self.flatten(item, out)?;
                }
            }
            Expr::Repeat {
                body,
                min,
                max,
                greedy,
                unroll: true,
            } => {
                check_range(*min, *max)?;
                let body: &'e Expr = body;
                let family = self.family_count;
                self.family_count += 1;
                let copy = |mandatory: bool| Quantifier {
                    min: u32::from(mandatory),
                    max: Some(1),
                    greedy: *greedy,
                    index: None,
                    zero_width_index: None,
                    mandatory,
                    unrolled: true,
                };
                for _ in 0..*min {
                    out.push(Item::Copy {
                        body,
                        quantifier: copy(true),
                        family,
                    });
                }
                match max {
                    Some(max) => {
                        for _ in *min..*max {
                            out.push(Item::Copy {
                                body,
                                quantifier: copy(false),
                                family,
                            });
                        }
                    }
                    None => out.push(Item::Copy {
                        body,
                        quantifier: Quantifier {
                            min: 0,
                            max: None,
                            greedy: *greedy,
                            index: None,
                            zero_width_index: None,
                            mandatory: false,
                            unrolled: false,
                        },
                        family,
                    }),
                }
            }
            other => out.push(Item::Expr(other)),
        }
        Ok(())
    }

    fn lower_sequence(&mut self, parent: NodeId, alt_index: u32, expr: &Expr) -> Result<NodeId> {
        let id = self.alloc(Some(parent), alt_index);
        let mut items = Vec::new();
        self.flatten(expr, &mut items)?;
        let mut terms = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let index = i as u32;
            let term = match item {
                Item::Expr(e) => self.lower_term(id, index, e)?,
                Item::Copy {
                    body,
                    quantifier,
                    family,
                } => {
                    let shape = quantified_shape(body, quantifier, Some(family));
                    self.lower_group(id, index, shape)?
                }
            };
            terms.push(term);
        }
        self.set(
            id,
            NodeKind::Sequence(Sequence {
                terms,
                pass_through: false,
            }),
        );
        self.finish(id);
        Ok(id)
    }

    fn pass_through(&mut self, parent: NodeId, alt_index: u32) -> NodeId {
        self.leaf(
            parent,
            alt_index,
            NodeKind::Sequence(Sequence {
                terms: Vec::new(),
                pass_through: true,
            }),
        )
    }

    fn lower_group(&mut self, parent: NodeId, seq_index: u32, shape: GroupShape) -> Result<NodeId> {
        // Only the root body (whose parent is the root, id 0) may be group 0.
        if shape.capture == Some(0) && parent != NodeId(0) {
            return Err(Error::ReservedGroup);
        }
        let id = self.alloc(Some(parent), seq_index);
        self.families[id.index()] = shape.family;

        let mut quantifier = shape.quantifier;
        if let Some(q) = quantifier.as_mut()
            && !q.unrolled
        {
            q.index = Some(self.quantifier_count);
            self.quantifier_count += 1;
        }

        if let Some(n) = shape.capture {
            self.max_group = self.max_group.max(n);
            self.open_captures.push(n);
        }
        if let Some(n) = shape.conditional {
            self.check_reference(n)?;
            self.conditions.push(n);
        }

        let pass_through = quantifier.is_some_and(|q| !q.mandatory);
        let lazy = quantifier.is_some_and(|q| !q.greedy);
        let mut alternatives = Vec::with_capacity(shape.branches.len() + 1);
        if pass_through && lazy {
            alternatives.push(self.pass_through(id, 0));
        }
        for branch in shape.branches {
            let alt_index = alternatives.len() as u32;
            alternatives.push(self.lower_sequence(id, alt_index, branch)?);
        }
        if pass_through && !lazy {
            let alt_index = alternatives.len() as u32;
            alternatives.push(self.pass_through(id, alt_index));
        }

        if shape.capture.is_some() {
            self.open_captures.pop();
        }

        self.set(
            id,
            NodeKind::Group(Group {
                alternatives,
                quantifier,
                capture: shape.capture,
                enclosed_captures: 0..0,
                enclosed_zero_width: 0..0,
                conditional_backref: shape.conditional,
            }),
        );
        self.finish(id);
        Ok(id)
    }

    fn lower_subtree(
        &mut self,
        parent: NodeId,
        seq_index: u32,
        body: &Expr,
        negated: bool,
        make: fn(Subtree) -> NodeKind,
    ) -> Result<NodeId> {
        let id = self.alloc(Some(parent), seq_index);
        let group = self.lower_group(
            id,
            0,
            GroupShape {
                branches: branches_of(body),
                capture: None,
                quantifier: None,
                conditional: None,
                family: None,
            },
        )?;
        let match_found = self.leaf(id, 1, NodeKind::MatchFound);
        self.set(
            id,
            make(Subtree {
                body: group,
                match_found,
                negated,
            }),
        );
        self.finish(id);
        Ok(id)
    }

    fn lower_term(&mut self, parent: NodeId, index: u32, expr: &Expr) -> Result<NodeId> {
        match expr {
            Expr::Class { ranges, label } => Ok(self.leaf(
                parent,
                index,
                NodeKind::CharacterClass(CharacterClass {
                    ranges: ranges.clone(),
                    label: label.clone(),
                }),
            )),
            Expr::Seq(_) | Expr::Alt(_) => self.lower_group(
                parent,
                index,
                GroupShape {
                    branches: branches_of(expr),
                    capture: None,
                    quantifier: None,
                    conditional: None,
                    family: None,
                },
            ),
            Expr::Capture(n, body) => self.lower_group(
                parent,
                index,
                GroupShape {
                    branches: branches_of(body),
                    capture: Some(*n),
                    quantifier: None,
                    conditional: None,
                    family: None,
                },
            ),
            Expr::Repeat {
                body,
                min,
                max,
                greedy,
                ..
            } => {
                check_range(*min, *max)?;
                let quantifier = match (*min, *max) {
                    (1, Some(1)) => None,
                    (0, Some(1)) => Some(Quantifier {
                        min: 0,
                        max: Some(1),
                        greedy: *greedy,
                        index: None,
                        zero_width_index: None,
                        mandatory: false,
                        unrolled: true,
                    }),
                    (min, max) => Some(Quantifier {
                        min,
                        max,
                        greedy: *greedy,
                        index: None,
                        zero_width_index: None,
                        mandatory: false,
                        unrolled: false,
                    }),
                };
                match quantifier {
                    Some(q) => self.lower_group(parent, index, quantified_shape(body, q, None)),
                    None => self.lower_term(parent, index, body),
                }
            }
            Expr::LookAhead { body, negated } => {
                self.lower_subtree(parent, index, body, *negated, NodeKind::LookAhead)
            }
            Expr::LookBehind { body, negated } => {
                self.lower_subtree(parent, index, body, *negated, NodeKind::LookBehind)
            }
            Expr::Atomic(body) => {
                self.lower_subtree(parent, index, body, false, NodeKind::AtomicGroup)
            }
            Expr::Assertion(kind) => Ok(self.leaf(parent, index, NodeKind::PositionAssertion(*kind))),
            Expr::BackRef(groups) => {
                let mut recursive = false;
                for &g in groups {
                    self.check_reference(g)?;
                    self.referenced.push(g);
                    if self.open_captures.contains(&g) {
                        recursive = true;
                        self.recursive.push(g);
                    }
                }
                Ok(self.leaf(
                    parent,
                    index,
                    NodeKind::BackReference(BackReference {
                        groups: groups.clone(),
                        may_match_empty: true,
                        recursive,
                    }),
                ))
            }
            Expr::Conditional { group, yes, no } => self.lower_group(
                parent,
                index,
                GroupShape {
                    branches: vec![yes, no],
                    capture: None,
                    quantifier: None,
                    conditional: Some(*group),
                    family: None,
                },
            ),
            Expr::Call(group) => {
                self.check_reference(*group)?;
                self.calls.push(*group);
                Ok(self.leaf(parent, index, NodeKind::SubexpressionCall(*group)))
            }
        }
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    fn into_ast(mut self, root: NodeId) -> Result<Ast> {
        let count = self.max_group + 1;
        for &group in self
            .referenced
            .iter()
            .chain(&self.conditions)
            .chain(&self.calls)
        {
            if group >= count {
                return Err(Error::UnknownGroup { group, count });
            }
        }

        self.mark_dead();
        self.patch_back_references(count);
        let zero_width_count = self.assign_zero_width_slots();
        self.compute_enclosed_ranges();

        let set_of = |groups: &[GroupNumber]| {
            let mut set = BitSet::new(count as usize);
            for &g in groups {
                set.insert(g as usize);
            }
            set
        };

        Ok(Ast {
            referenced_groups: set_of(&self.referenced),
            recursively_referenced_groups: set_of(&self.recursive),
            condition_groups: set_of(&self.conditions),
            nodes: self.nodes,
            root,
            flavor: self.flavor,
            capture_group_count: count,
            quantifier_count: self.quantifier_count,
            zero_width_quantifiable_count: zero_width_count,
        })
    }

    /// Children have larger ids than parents, so a reverse scan sees them first.
    fn mark_dead(&mut self) {
        for i in (0..self.nodes.len()).rev() {
            let nodes = &self.nodes;
            let dead = match &nodes[i].kind {
                NodeKind::CharacterClass(c) => c.matches_nothing(),
                NodeKind::Sequence(s) => s.terms.iter().any(|t| nodes[t.index()].dead),
                NodeKind::Group(g) => {
                    !g.alternatives.is_empty()
                        && g.alternatives.iter().all(|a| nodes[a.index()].dead)
                }
                NodeKind::LookAhead(s) | NodeKind::LookBehind(s) | NodeKind::AtomicGroup(s) => {
                    !s.negated && nodes[s.body.index()].dead
                }
                _ => false,
            };
            self.nodes[i].dead = dead;
        }
    }

    fn empty_flags(&self) -> Vec<bool> {
        let mut empty = vec![false; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            empty[i] = !node.dead
                && match &node.kind {
                    NodeKind::CharacterClass(_) => false,
                    NodeKind::BackReference(b) => b.may_match_empty,
                    NodeKind::Sequence(s) => s.terms.iter().all(|t| empty[t.index()]),
                    NodeKind::Group(g) => g.alternatives.iter().any(|a| empty[a.index()]),
                    NodeKind::Root(s) | NodeKind::AtomicGroup(s) => empty[s.body.index()],
                    _ => true,
                };
        }
        empty
    }

    /// A back-reference can match empty when a referenced group can, or when
    /// references to unmatched groups succeed.
    fn patch_back_references(&mut self, count: u16) {
        for node in &mut self.nodes {
            if let NodeKind::BackReference(b) = &mut node.kind {
                b.may_match_empty = false;
            }
        }
        let empty = self.empty_flags();
        let mut group_empty = vec![false; count as usize];
        for node in &self.nodes {
            if let NodeKind::Group(g) = &node.kind
                && let Some(n) = g.capture
            {
                group_empty[n as usize] |= empty[node.id.index()];
            }
        }
        let unmatched_succeeds = !self.flavor.backreferences_to_unmatched_groups_fail;
        for node in &mut self.nodes {
            if let NodeKind::BackReference(b) = &mut node.kind {
                b.may_match_empty =
                    unmatched_succeeds || b.groups.iter().any(|&g| group_empty[g as usize]);
            }
        }
    }

    /// Quantified groups whose body can match empty get a zero-width slot.
    /// Copies of one unrolled quantifier share their slot.
    fn assign_zero_width_slots(&mut self) -> u32 {
        let empty = self.empty_flags();
        let mut family_slots: Vec<Option<u32>> = vec![None; self.family_count as usize];
        let mut next = 0;
        for i in 0..self.nodes.len() {
            let nodes = &self.nodes;
            let NodeKind::Group(g) = &nodes[i].kind else {
                continue;
            };
            if g.quantifier.is_none() {
                continue;
            }
            let body_empty = g.alternatives.iter().any(|a| {
                let pass = matches!(&nodes[a.index()].kind, NodeKind::Sequence(s) if s.pass_through);
                !pass && empty[a.index()]
            });
            if !body_empty {
                continue;
            }
            let slot = match self.families[i] {
                Some(f) => *family_slots[f as usize].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                }),
                None => {
                    next += 1;
                    next - 1
                }
            };
            if let NodeKind::Group(g) = &mut self.nodes[i].kind
                && let Some(q) = g.quantifier.as_mut()
            {
                q.zero_width_index = Some(slot);
            }
        }
        next
    }

    fn compute_enclosed_ranges(&mut self) {
        for i in 0..self.nodes.len() {
            if !matches!(self.nodes[i].kind, NodeKind::Group(_)) {
                continue;
            }
            let inner = &self.nodes[i + 1..self.ends[i] as usize];
            let captures = span(inner.iter().filter_map(|n| n.as_group()?.capture));
            let zero_width = span(inner.iter().filter_map(|n| n.as_group()?.zero_width_index()));
            if let NodeKind::Group(g) = &mut self.nodes[i].kind {
                g.enclosed_captures = captures;
                g.enclosed_zero_width = zero_width;
            }
        }
    }
}

fn quantified_shape(body: &Expr, quantifier: Quantifier, family: Option<u32>) -> GroupShape<'_> {
    let (branches, capture) = match body {
        Expr::Capture(n, inner) => (branches_of(inner), Some(*n)),
        other => (branches_of(other), None),
    };
    GroupShape {
        branches,
        capture,
        quantifier: Some(quantifier),
        conditional: None,
        family,
    }
}

fn check_range(min: u32, max: Option<u32>) -> Result<()> {
    match max {
        Some(max) if max < min || max == 0 => Err(Error::InvalidQuantifier { min, max }),
        _ => Ok(()),
    }
}

/// Smallest half-open range covering all values, or an empty range.
fn span<T>(values: impl Iterator<Item = T>) -> Range<T>
where
    T: Copy + Ord + Default + std::ops::Add<Output = T> + From<u8>,
{
    let mut bounds: Option<(T, T)> = None;
    for v in values {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        });
    }
    match bounds {
        Some((lo, hi)) => lo..hi + T::from(1),
        None => T::default()..T::default(),
    }
}
