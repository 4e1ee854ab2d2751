//! Human-readable rendering of successor lists.
//!
//! One line per successor:
//!
//! ```text
//! b [inc(q0)] upd={2} look=[(?=)#4] anchors=^
//! ```
//!
//! Empty parts are omitted.

use std::fmt::Write as _;

use regtrav_core::Ast;

use crate::successor::{OwnedSuccessor, Target};

pub fn format_successors(ast: &Ast, successors: &[OwnedSuccessor]) -> String {
    let mut out = String::new();
    for s in successors {
        out.push_str(&format_successor(ast, s));
        out.push('\n');
    }
    out
}

pub fn format_successor(ast: &Ast, s: &OwnedSuccessor) -> String {
    let mut line = match s.target {
        Target::Node(id) => ast.describe(id),
        Target::EmptyState => "<empty>".to_string(),
    };

    if !s.guards.is_empty() {
        let guards: Vec<String> = s.guards.iter().map(|g| g.to_string()).collect();
        write!(line, " [{}]", guards.join(", ")).ok();
    }
    if !s.captures.updates.is_empty() {
        write!(line, " upd={:?}", s.captures.updates).ok();
    }
    if !s.captures.clears.is_empty() {
        write!(line, " clr={:?}", s.captures.clears).ok();
    }
    if let Some(g) = s.captures.last_group {
        write!(line, " last={g}").ok();
    }
    if !s.lookarounds.is_empty() {
        let labels: Vec<String> = s.lookarounds.iter().map(|&l| ast.describe(l)).collect();
        write!(line, " look=[{}]", labels.join(", ")).ok();
    }
    if !s.anchors.is_empty() {
        write!(line, " anchors={}", s.anchors).ok();
    }
    if let Some(cond) = &s.matched_condition_groups
        && !cond.is_empty()
    {
        write!(line, " cond={cond:?}").ok();
    }
    line
}
