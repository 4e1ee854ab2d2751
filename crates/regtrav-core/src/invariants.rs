//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::NodeId;
use crate::ast::{Ast, Group, Node, NodeKind, Sequence, Subtree};

impl Ast {
    pub(crate) fn ensure_node(&self, id: NodeId) -> &Node {
        self.nodes.get(id.index()).unwrap_or_else(|| {
            panic!(
                "Ast: node {id} not found (arena has {} nodes)",
                self.nodes.len()
            )
        })
    }

    pub(crate) fn ensure_group(&self, id: NodeId) -> &Group {
        match &self.ensure_node(id).kind {
            NodeKind::Group(g) => g,
            other => panic!("Ast: node {id} expected to be a group, found {other:?}"),
        }
    }

    pub(crate) fn ensure_sequence(&self, id: NodeId) -> &Sequence {
        match &self.ensure_node(id).kind {
            NodeKind::Sequence(s) => s,
            other => panic!("Ast: node {id} expected to be a sequence, found {other:?}"),
        }
    }

    pub(crate) fn ensure_subtree(&self, id: NodeId) -> &Subtree {
        self.ensure_node(id)
            .subtree()
            .unwrap_or_else(|| panic!("Ast: node {id} expected to be a subtree root"))
    }

    pub(crate) fn ensure_parent(&self, id: NodeId) -> NodeId {
        self.ensure_node(id)
            .parent
            .unwrap_or_else(|| panic!("Ast: node {id} has no parent"))
    }
}
