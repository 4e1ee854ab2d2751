use regtrav_core::build::*;
use regtrav_core::{Ast, Flavor, NodeId};

use crate::dump::format_successors;
use crate::{Successor, Traversal, TraversalConfig, Visitor};

fn build(pattern: Expr) -> Ast {
    Ast::build(&pattern, Flavor::ECMASCRIPT).unwrap()
}

fn run(ast: &Ast, config: TraversalConfig, start: NodeId) -> String {
    let mut traversal = Traversal::new(ast, config);
    let successors = traversal.run_collect(start).unwrap();
    assert!(traversal.is_idle());
    format_successors(ast, &successors)
}

fn traversable() -> TraversalConfig {
    TraversalConfig::new().can_traverse_lookarounds(true)
}

/// Records successors and lookahead scope changes in order.
struct Recorder<'a> {
    ast: &'a Ast,
    events: Vec<String>,
}

impl Visitor for Recorder<'_> {
    fn visit(&mut self, successor: &Successor<'_>) {
        let label = successor
            .target
            .node()
            .map_or("<empty>".to_string(), |id| self.ast.describe(id));
        self.events.push(format!("visit {label}"));
    }

    fn enter_lookahead(&mut self, assertion: NodeId) {
        let label = self.ast.describe(assertion);
        self.events.push(format!("enter {label}"));
    }

    fn leave_lookahead(&mut self, assertion: NodeId) {
        let label = self.ast.describe(assertion);
        self.events.push(format!("leave {label}"));
    }
}

#[test]
fn lookahead_is_terminal_by_default() {
    let ast = build(seq([lit('x'), lookahead(lit('a')), lit('b')]));

    insta::assert_snapshot!(run(&ast, TraversalConfig::default(), ast.find_class("x").unwrap()), @"(?=)#4");
}

#[test]
fn lookahead_body_is_entered() {
    let ast = build(seq([lit('x'), lookahead(lit('a')), lit('b')]));

    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("x").unwrap()), @"a look=[(?=)#4]");
}

#[test]
fn finished_lookahead_is_closed() {
    let ast = build(seq([lit('x'), lookahead(alt([lit('a'), empty()])), lit('b')]));

    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("x").unwrap()), @r"
    a look=[(?=)#4]
    b
    ");
}

#[test]
fn visitor_sees_lookahead_scope() {
    let ast = build(seq([lit('x'), lookahead(alt([lit('a'), empty()])), lit('b')]));
    let mut traversal = Traversal::new(&ast, traversable());
    let mut recorder = Recorder {
        ast: &ast,
        events: Vec::new(),
    };
    traversal
        .run_with(
            ast.find_class("x").unwrap(),
            &mut recorder,
            &mut crate::NoopTracer,
        )
        .unwrap();

    insta::assert_snapshot!(recorder.events.join("\n"), @r"
    enter (?=)#4
    visit a
    leave (?=)#4
    visit b
    enter (?=)#4
    leave (?=)#4
    ");
}

#[test]
fn negative_lookaround_is_terminal() {
    let ast = build(seq([lit('x'), neg_lookahead(lit('a')), lit('b')]));
    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("x").unwrap()), @"(?!)#4");

    let ast = build(seq([lit('x'), neg_lookbehind(lit('a')), lit('b')]));
    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("x").unwrap()), @"(?<!)#4");
}

#[test]
fn lookbehind_body_is_entered() {
    let ast = build(seq([lit('x'), lookbehind(lit('a')), lit('b')]));
    let x = ast.find_class("x").unwrap();

    insta::assert_snapshot!(run(&ast, traversable(), x), @"a look=[(?<=)#4]");
    let only_other = traversable().traversable_lookbehinds([NodeId(99)]);
    insta::assert_snapshot!(run(&ast, only_other, x), @"");
    let allowed = traversable().traversable_lookbehinds([NodeId(4)]);
    insta::assert_snapshot!(run(&ast, allowed, x), @"a look=[(?<=)#4]");
}

#[test]
fn finished_lookbehind_is_closed() {
    let ast = build(seq([lit('x'), lookbehind(alt([lit('a'), empty()])), lit('b')]));
    let x = ast.find_class("x").unwrap();

    insta::assert_snapshot!(run(&ast, traversable(), x), @r"
    a look=[(?<=)#4]
    b
    ");
    // Run from inside the body: the assertion is left.
    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("a").unwrap()), @"b");
}

#[test]
fn lookahead_body_as_its_own_search() {
    let ast = build(seq([lookahead(alt([lit('a'), empty()])), lit('b')]));
    let body = NodeId(4);
    assert_eq!(ast.describe(body), "group#4");

    insta::assert_snapshot!(run(&ast, TraversalConfig::default(), body), @r"
    a
    match#3
    ");
}

#[test]
fn lookahead_start_is_left() {
    let ast = build(seq([lookahead(lit('a')), lit('b')]));

    insta::assert_snapshot!(run(&ast, traversable(), NodeId(3)), @"b");
}

#[test]
fn atomic_group_is_terminal() {
    let ast = build(seq([lit('a'), atomic(lit('b'))]));

    insta::assert_snapshot!(run(&ast, traversable(), ast.find_class("a").unwrap()), @"(?>)#4");
}
