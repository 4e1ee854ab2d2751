//! Tracing infrastructure for debugging traversals.
//!
//! # Design: Zero-Cost Abstraction
//!
//! With `NoopTracer` every trait method is an `#[inline(always)]` empty
//! function, so the calls and their arguments vanish from the search loop.
//!
//! Display-only state (the current indentation) lives in the tracer, not in
//! the traversal context.

use regtrav_core::{Ast, NodeId};

use crate::path::{Action, PathElement};
use crate::successor::{Successor, Target};

/// Why a branch was abandoned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Prune {
    Dead,
    Contradiction,
    StartAnchor,
    PastMatchEnd,
    Lookbehind,
}

impl Prune {
    fn as_str(self) -> &'static str {
        match self {
            Self::Dead => "dead",
            Self::Contradiction => "contradiction",
            Self::StartAnchor => "start anchor",
            Self::PastMatchEnd => "past match end",
            Self::Lookbehind => "lookbehind",
        }
    }
}

/// Tracer trait for traversal instrumentation.
///
/// Each method is called at a specific point during a run:
/// - `trace_advance` - before a node is processed
/// - `trace_push` / `trace_pop` - when the path changes
/// - `trace_prune` - when a branch is abandoned without a successor
/// - `trace_dedup_hit` - when a state was already explored
/// - `trace_successor` - after a successor is reported
/// - `trace_done` - when the run ends
pub trait Tracer {
    fn trace_advance(&mut self, node: NodeId);

    fn trace_push(&mut self, element: PathElement);

    fn trace_pop(&mut self, element: PathElement);

    fn trace_prune(&mut self, node: NodeId, reason: Prune);

    fn trace_dedup_hit(&mut self, target: Target);

    fn trace_successor(&mut self, successor: &Successor<'_>);

    fn trace_done(&mut self, found: usize);
}

/// No-op tracer that gets optimized away completely.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_advance(&mut self, _node: NodeId) {}

    #[inline(always)]
    fn trace_push(&mut self, _element: PathElement) {}

    #[inline(always)]
    fn trace_pop(&mut self, _element: PathElement) {}

    #[inline(always)]
    fn trace_prune(&mut self, _node: NodeId, _reason: Prune) {}

    #[inline(always)]
    fn trace_dedup_hit(&mut self, _target: Target) {}

    #[inline(always)]
    fn trace_successor(&mut self, _successor: &Successor<'_>) {}

    #[inline(always)]
    fn trace_done(&mut self, _found: usize) {}
}

/// Tracer that collects one line per event.
pub struct PrintTracer<'a> {
    ast: &'a Ast,
    lines: Vec<String>,
    /// Path depth, mirrored from push/pop events.
    depth: usize,
}

impl<'a> PrintTracer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            lines: Vec::new(),
            depth: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn dump(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn line(&mut self, text: String) {
        self.lines.push(format!("{}{text}", "  ".repeat(self.depth)));
    }

    fn element(&self, element: PathElement) -> String {
        let label = self.ast.describe(element.node());
        match element.action() {
            Action::None => label,
            Action::Enter => format!("enter {label}/{}", element.alt_index()),
            Action::PassThrough => format!("pass {label}"),
            Action::Exit => format!("exit {label}"),
            Action::Escape => format!("escape {label}"),
        }
    }

    fn target(&self, target: Target) -> String {
        match target {
            Target::Node(id) => self.ast.describe(id),
            Target::EmptyState => "<empty>".to_string(),
        }
    }
}

impl Tracer for PrintTracer<'_> {
    fn trace_advance(&mut self, node: NodeId) {
        let label = self.ast.describe(node);
        self.line(format!("advance {label}"));
    }

    fn trace_push(&mut self, element: PathElement) {
        let text = self.element(element);
        self.line(format!("push {text}"));
        self.depth += 1;
    }

    fn trace_pop(&mut self, element: PathElement) {
        self.depth = self.depth.saturating_sub(1);
        let text = self.element(element);
        self.line(format!("pop {text}"));
    }

    fn trace_prune(&mut self, node: NodeId, reason: Prune) {
        let label = self.ast.describe(node);
        self.line(format!("prune {label} ({})", reason.as_str()));
    }

    fn trace_dedup_hit(&mut self, target: Target) {
        let label = self.target(target);
        self.line(format!("dedup {label}"));
    }

    fn trace_successor(&mut self, successor: &Successor<'_>) {
        let mut text = format!("found {}", self.target(successor.target));
        if !successor.guards.is_empty() {
            let guards: Vec<String> = successor.guards.iter().map(|g| g.to_string()).collect();
            text.push_str(&format!(" [{}]", guards.join(", ")));
        }
        self.line(text);
    }

    fn trace_done(&mut self, found: usize) {
        self.depth = 0;
        self.line(format!("done ({found} found)"));
    }
}
