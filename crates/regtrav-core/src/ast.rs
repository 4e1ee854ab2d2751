//! Arena-backed regex syntax tree.
//!
//! All nodes live in one `Vec` indexed by `NodeId`. Parent and child links
//! are ids, so the tree has back-pointers without ownership cycles. The shape
//! is immutable once built; only `dead` flags are computed at build time.

use std::ops::Range;

use crate::bitset::BitSet;
use crate::flavor::Flavor;
use crate::{GroupNumber, NodeId};

// ============================================================================
// Node payloads
// ============================================================================

/// Repetition descriptor attached to a quantified group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantifier {
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
    pub greedy: bool,
    /// Counter slot. Assigned to loops only.
    pub index: Option<u32>,
    /// Empty-iteration guard slot. Assigned when the body can match empty.
    pub zero_width_index: Option<u32>,
    /// One of the first `min` unrolled copies.
    pub mandatory: bool,
    /// One copy of an expanded quantifier rather than a loop.
    pub unrolled: bool,
}

impl Quantifier {
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }
}

/// Ordered list of terms.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    pub terms: Vec<NodeId>,
    /// Synthetic empty branch that skips (or leaves) the enclosing quantified group.
    pub pass_through: bool,
}

/// Group of alternatives, optionally quantified and/or capturing.
#[derive(Clone, Debug, Default)]
pub struct Group {
    /// Sequence node ids, in priority order.
    pub alternatives: Vec<NodeId>,
    pub quantifier: Option<Quantifier>,
    pub capture: Option<GroupNumber>,
    /// Capture groups nested strictly inside this group.
    pub enclosed_captures: Range<GroupNumber>,
    /// Zero-width guard slots nested strictly inside this group.
    pub enclosed_zero_width: Range<u32>,
    /// `(?(n)yes|no)`: first alternative requires group `n` matched, second requires it unmatched.
    pub conditional_backref: Option<GroupNumber>,
}

impl Group {
    /// A quantified group that is not an unrolled copy.
    #[inline]
    pub fn is_loop(&self) -> bool {
        self.quantifier.is_some_and(|q| !q.unrolled)
    }

    #[inline]
    pub fn is_mandatory_copy(&self) -> bool {
        self.quantifier.is_some_and(|q| q.unrolled && q.mandatory)
    }

    #[inline]
    pub fn zero_width_index(&self) -> Option<u32> {
        self.quantifier.and_then(|q| q.zero_width_index)
    }

    #[inline]
    pub fn has_enclosed_captures(&self) -> bool {
        !self.enclosed_captures.is_empty()
    }
}

/// Set of code point ranges. Consumable.
#[derive(Clone, Debug, Default)]
pub struct CharacterClass {
    /// Inclusive ranges.
    pub ranges: Vec<(char, char)>,
    /// Display label, e.g. `a` or `[0-9]`.
    pub label: String,
}

impl CharacterClass {
    pub fn matches_nothing(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PositionAssertionKind {
    /// `^`
    Caret,
    /// `$`
    Dollar,
    /// `\A`
    MatchBegin,
    /// `\z`
    MatchEnd,
}

/// Root of a nested subtree: the whole pattern, a lookaround or an atomic group.
#[derive(Clone, Copy, Debug)]
pub struct Subtree {
    /// The body `Group`.
    pub body: NodeId,
    /// The `MatchFound` marker ending the subtree.
    pub match_found: NodeId,
    pub negated: bool,
}

#[derive(Clone, Debug)]
pub struct BackReference {
    pub groups: Vec<GroupNumber>,
    pub may_match_empty: bool,
    /// Occurs inside one of the groups it references.
    pub recursive: bool,
}

/// Node payload.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Root(Subtree),
    Sequence(Sequence),
    Group(Group),
    CharacterClass(CharacterClass),
    PositionAssertion(PositionAssertionKind),
    LookAhead(Subtree),
    LookBehind(Subtree),
    BackReference(BackReference),
    AtomicGroup(Subtree),
    /// Must be expanded before traversal.
    SubexpressionCall(GroupNumber),
    MatchFound,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Position inside the parent sequence (terms only).
    pub seq_index: u32,
    pub dead: bool,
    pub kind: NodeKind,
}

impl Node {
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Root(_) => "root",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Group(_) => "group",
            NodeKind::CharacterClass(_) => "character class",
            NodeKind::PositionAssertion(_) => "position assertion",
            NodeKind::LookAhead(_) => "lookahead",
            NodeKind::LookBehind(_) => "lookbehind",
            NodeKind::BackReference(_) => "back-reference",
            NodeKind::AtomicGroup(_) => "atomic group",
            NodeKind::SubexpressionCall(_) => "subexpression call",
            NodeKind::MatchFound => "match found",
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match &self.kind {
            NodeKind::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Subtree payload for root, lookaround and atomic nodes.
    pub fn subtree(&self) -> Option<&Subtree> {
        match &self.kind {
            NodeKind::Root(s)
            | NodeKind::LookAhead(s)
            | NodeKind::LookBehind(s)
            | NodeKind::AtomicGroup(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_subtree_root(&self) -> bool {
        self.subtree().is_some()
    }

    #[inline]
    pub fn is_lookaround(&self) -> bool {
        matches!(self.kind, NodeKind::LookAhead(_) | NodeKind::LookBehind(_))
    }

    #[inline]
    pub fn is_match_found(&self) -> bool {
        matches!(self.kind, NodeKind::MatchFound)
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Immutable regex syntax tree.
#[derive(Clone, Debug)]
pub struct Ast {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) flavor: Flavor,
    pub(crate) capture_group_count: u16,
    pub(crate) quantifier_count: u32,
    pub(crate) zero_width_quantifiable_count: u32,
    /// Groups targeted by back-references.
    pub(crate) referenced_groups: BitSet,
    /// Groups referenced from inside themselves.
    pub(crate) recursively_referenced_groups: BitSet,
    /// Groups tested by conditional groups.
    pub(crate) condition_groups: BitSet,
}

impl Ast {
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.ensure_node(id)
    }

    /// Node as a `Group`. Panics if it is not one.
    #[inline]
    pub fn group(&self, id: NodeId) -> &Group {
        self.ensure_group(id)
    }

    /// Node as a `Sequence`. Panics if it is not one.
    #[inline]
    pub fn sequence(&self, id: NodeId) -> &Sequence {
        self.ensure_sequence(id)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The `Root` node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The body group of the whole pattern (capture group 0).
    pub fn root_group(&self) -> NodeId {
        self.ensure_subtree(self.root).body
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    #[inline]
    pub fn flavor(&self) -> &Flavor {
        &self.flavor
    }

    /// Number of capture groups including group 0.
    #[inline]
    pub fn capture_group_count(&self) -> u16 {
        self.capture_group_count
    }

    /// Number of capture boundaries (two per group).
    #[inline]
    pub fn boundary_count(&self) -> usize {
        2 * self.capture_group_count as usize
    }

    #[inline]
    pub fn quantifier_count(&self) -> u32 {
        self.quantifier_count
    }

    #[inline]
    pub fn zero_width_quantifiable_count(&self) -> u32 {
        self.zero_width_quantifiable_count
    }

    pub fn has_back_references(&self) -> bool {
        !self.referenced_groups.is_empty()
    }

    pub fn has_conditional_back_references(&self) -> bool {
        !self.condition_groups.is_empty()
    }

    pub fn referenced_groups(&self) -> &BitSet {
        &self.referenced_groups
    }

    pub fn condition_groups(&self) -> &BitSet {
        &self.condition_groups
    }

    pub fn is_recursively_referenced(&self, group: GroupNumber) -> bool {
        self.recursively_referenced_groups.contains(group as usize)
    }

    /// The group owning sequence `seq`.
    pub fn enclosing_group(&self, seq: NodeId) -> NodeId {
        self.ensure_parent(seq)
    }

    /// The subtree root whose `MatchFound` is `id`, if `id` is one.
    pub fn match_found_owner(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id);
        if !node.is_match_found() {
            return None;
        }
        node.parent
    }

    /// First character class with the given label, in pre-order.
    pub fn find_class(&self, label: &str) -> Option<NodeId> {
        self.find_classes(label).next()
    }

    /// All character classes with the given label, in pre-order.
    pub fn find_classes<'a>(&'a self, label: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes.iter().filter_map(move |n| match &n.kind {
            NodeKind::CharacterClass(c) if c.label == label => Some(n.id),
            _ => None,
        })
    }

    /// First node matching `pred`, in pre-order.
    pub fn find(&self, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.nodes.iter().find(|n| pred(n)).map(|n| n.id)
    }

    /// Short display label for traces and dumps.
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Root(_) => "root".to_string(),
            NodeKind::Sequence(s) if s.pass_through => format!("pass{id}"),
            NodeKind::Sequence(_) => format!("seq{id}"),
            NodeKind::Group(g) => match g.capture {
                Some(n) => format!("cap{n}{id}"),
                None => format!("group{id}"),
            },
            NodeKind::CharacterClass(c) => c.label.clone(),
            NodeKind::PositionAssertion(kind) => match kind {
                PositionAssertionKind::Caret => "^".to_string(),
                PositionAssertionKind::Dollar => "$".to_string(),
                PositionAssertionKind::MatchBegin => "\\A".to_string(),
                PositionAssertionKind::MatchEnd => "\\z".to_string(),
            },
            NodeKind::LookAhead(s) if s.negated => format!("(?!){id}"),
            NodeKind::LookAhead(_) => format!("(?=){id}"),
            NodeKind::LookBehind(s) if s.negated => format!("(?<!){id}"),
            NodeKind::LookBehind(_) => format!("(?<=){id}"),
            NodeKind::BackReference(b) => b
                .groups
                .iter()
                .map(|g| format!("\\{g}"))
                .collect::<Vec<_>>()
                .join("|"),
            NodeKind::AtomicGroup(_) => format!("(?>){id}"),
            NodeKind::SubexpressionCall(g) => format!("\\g<{g}>"),
            NodeKind::MatchFound => match node.parent.map(|p| &self.node(p).kind) {
                Some(NodeKind::Root(_)) | None => "match".to_string(),
                Some(_) => format!("match{}", node.parent.map_or(id, |p| p)),
            },
        }
    }
}
