//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use regtrav_core::{Ast, NodeId};

pub(crate) fn ensure_parent(ast: &Ast, id: NodeId) -> NodeId {
    ast.parent(id).unwrap_or_else(|| {
        panic!(
            "Traversal: {} {id} has no parent (only the root may be parentless)",
            ast.node(id).kind_name()
        )
    })
}

pub(crate) fn unexpected_parent(ast: &Ast, term: NodeId, parent: NodeId) -> ! {
    panic!(
        "Traversal: term {term} sits under a {} node {parent} \
         (terms belong to sequences or subtree roots)",
        ast.node(parent).kind_name()
    )
}
