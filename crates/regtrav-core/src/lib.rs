#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for regtrav.
//!
//! Three layers:
//! - **Tree model** (`ast`): arena of regex syntax nodes addressed by `NodeId`
//! - **Policy** (`flavor`): per-dialect matching semantics as plain data
//! - **Construction** (`build`): lowers an `Expr` description into an `Ast`

pub mod ast;
pub mod bitset;
pub mod build;
pub mod flavor;

mod invariants;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod flavor_tests;

pub use ast::{
    Ast, BackReference, CharacterClass, Group, Node, NodeKind, PositionAssertionKind, Quantifier,
    Sequence, Subtree,
};
pub use bitset::BitSet;
pub use build::{AstBuilder, Expr};
pub use flavor::Flavor;

// ============================================================================
// Common Types
// ============================================================================

/// Index of a node in the `Ast` arena.
///
/// Ids are dense and assigned once, in pre-order, when the tree is built.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capture group number. Group 0 is the whole match.
pub type GroupNumber = u16;

/// Boundary index of a capture group's start offset.
#[inline]
pub fn boundary_start(group: GroupNumber) -> usize {
    2 * group as usize
}

/// Boundary index of a capture group's end offset.
#[inline]
pub fn boundary_end(group: GroupNumber) -> usize {
    2 * group as usize + 1
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while configuring a flavor or building a tree.
///
/// These are rejected before any traversal starts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown regex flavor `{0}`")]
    UnknownFlavor(String),

    #[error("malformed flavor policy: {0}")]
    FlavorJson(#[from] serde_json::Error),

    #[error("reference to capture group {group}, but the pattern has {count} groups")]
    UnknownGroup { group: GroupNumber, count: u16 },

    #[error("capture group number 0 is reserved for the whole match")]
    ReservedGroup,

    #[error("unsupported quantifier range {{{min},{max}}}")]
    InvalidQuantifier { min: u32, max: u32 },
}

/// Result type for configuration and construction.
pub type Result<T> = std::result::Result<T, Error>;
