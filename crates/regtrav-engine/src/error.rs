//! Errors that abort a traversal run.

use regtrav_core::NodeId;

/// Fatal invariant violations. The tree or the caller is malformed; no
/// partial result of the run is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraversalError {
    /// Subexpression calls must be expanded before traversal.
    #[error("subexpression call {0} reached during traversal")]
    UnexpandedCall(NodeId),

    #[error("cannot start a traversal at {kind} {node}")]
    InvalidStart { node: NodeId, kind: &'static str },

    #[error("path not empty after traversal ({depth} elements left)")]
    UnbalancedPath { depth: usize },
}
