use indoc::indoc;

use crate::build::*;
use crate::{Ast, Error, Flavor, NodeId, NodeKind};

fn build(pattern: Expr) -> Ast {
    Ast::build(&pattern, Flavor::ECMASCRIPT).unwrap()
}

fn dump(ast: &Ast) -> String {
    let mut out = String::new();
    dump_node(ast, ast.root(), 0, &mut out);
    out
}

fn dump_node(ast: &Ast, id: NodeId, depth: usize, out: &mut String) {
    let node = ast.node(id);
    out.push_str(&"  ".repeat(depth));
    out.push_str(&ast.describe(id));
    if let NodeKind::Group(g) = &node.kind {
        if let Some(q) = g.quantifier {
            let max = q.max.map_or(String::new(), |m| m.to_string());
            out.push_str(&format!(" {{{},{max}}}", q.min));
            if !q.greedy {
                out.push_str(" lazy");
            }
            if let Some(i) = q.index {
                out.push_str(&format!(" q{i}"));
            }
            if let Some(z) = q.zero_width_index {
                out.push_str(&format!(" zw{z}"));
            }
            if q.mandatory {
                out.push_str(" mandatory");
            } else if q.unrolled {
                out.push_str(" copy");
            }
        }
        if let Some(n) = g.conditional_backref {
            out.push_str(&format!(" if{n}"));
        }
    }
    if node.is_dead() {
        out.push_str(" dead");
    }
    out.push('\n');

    let children: Vec<NodeId> = match &node.kind {
        NodeKind::Root(s) | NodeKind::LookAhead(s) | NodeKind::LookBehind(s) | NodeKind::AtomicGroup(s) => {
            vec![s.body, s.match_found]
        }
        NodeKind::Group(g) => g.alternatives.clone(),
        NodeKind::Sequence(s) => s.terms.clone(),
        _ => Vec::new(),
    };
    for child in children {
        assert_eq!(ast.parent(child), Some(id), "parent link of {child}");
        dump_node(ast, child, depth + 1, out);
    }
}

#[test]
fn alternation_in_sequence() {
    let ast = build(seq([lit('a'), alt([lit('b'), lit('c')])]));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          a
          group#4
            seq#5
              b
            seq#7
              c
      match
    ");
    assert_eq!(ast.len(), 10);
    assert_eq!(ast.capture_group_count(), 1);
    assert_eq!(ast.root_group(), NodeId(1));
}

#[test]
fn greedy_loop_puts_pass_through_last() {
    let ast = build(seq([star(cap(1, text("ab"))), lit('c')]));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          cap1#3 {0,} q0
            seq#4
              a
              b
            pass#7
          c
      match
    ");
    assert_eq!(ast.quantifier_count(), 1);
    assert_eq!(ast.zero_width_quantifiable_count(), 0);
    assert_eq!(ast.capture_group_count(), 2);
}

#[test]
fn lazy_loop_puts_pass_through_first() {
    let ast = build(star_lazy(lit('a')));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          group#3 {0,} lazy q0
            pass#4
            seq#5
              a
      match
    ");
}

#[test]
fn optional_is_a_single_copy() {
    let ast = build(opt(lit('a')));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          group#3 {0,1} copy
            seq#4
              a
            pass#6
      match
    ");
    assert_eq!(ast.quantifier_count(), 0);
}

#[test]
fn exact_single_repeat_is_inlined() {
    let ast = build(repeat(lit('a'), 1, Some(1)));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          a
      match
    ");
}

#[test]
fn unrolled_bounded_quantifier() {
    let ast = build(unrolled(lit('a'), 2, Some(3)));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          group#3 {1,1} mandatory
            seq#4
              a
          group#6 {1,1} mandatory
            seq#7
              a
          group#9 {0,1} copy
            seq#10
              a
            pass#12
      match
    ");
}

#[test]
fn unrolled_copies_share_zero_width_slot() {
    let ast = build(unrolled(opt(lit('a')), 2, None));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          group#3 {1,1} zw0 mandatory
            seq#4
              group#5 {0,1} copy
                seq#6
                  a
                pass#8
          group#9 {1,1} zw0 mandatory
            seq#10
              group#11 {0,1} copy
                seq#12
                  a
                pass#14
          group#15 {0,} q0 zw0
            seq#16
              group#17 {0,1} copy
                seq#18
                  a
                pass#20
            pass#21
      match
    ");
    assert_eq!(ast.zero_width_quantifiable_count(), 1);
}

#[test]
fn nested_zero_width_ranges() {
    let ast = build(star(seq([star(opt(lit('a'))), cap(1, opt(lit('b')))])));

    let outer = ast.group(NodeId(3));
    assert_eq!(outer.zero_width_index(), Some(0));
    assert_eq!(outer.enclosed_zero_width, 1..2);
    assert_eq!(outer.enclosed_captures, 1..2);

    let inner = ast.group(NodeId(5));
    assert!(inner.is_loop());
    assert_eq!(inner.zero_width_index(), Some(1));
    assert_eq!(inner.enclosed_zero_width, 0..0);
}

#[test]
fn enclosed_captures_cover_nested_groups() {
    let ast = build(seq([plus(seq([cap(1, lit('a')), cap(2, lit('b'))])), cap(3, lit('c'))]));

    let root_group = ast.group(ast.root_group());
    assert_eq!(root_group.capture, Some(0));
    assert_eq!(root_group.enclosed_captures, 1..4);

    let lp = ast.group(NodeId(3));
    assert_eq!(lp.quantifier.map(|q| q.min), Some(1));
    assert_eq!(lp.enclosed_captures, 1..3);
    assert!(lp.has_enclosed_captures());
}

#[test]
fn lookahead_subtree_layout() {
    let ast = build(seq([lookahead(text("ab")), lit('c')]));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          (?=)#3
            group#4
              seq#5
                a
                b
            match#3
          c
      match
    ");
    assert_eq!(ast.match_found_owner(NodeId(8)), Some(NodeId(3)));
    assert_eq!(ast.match_found_owner(NodeId(10)), Some(ast.root()));
    assert_eq!(ast.match_found_owner(NodeId(9)), None);
}

#[test]
fn dead_propagation() {
    let ast = build(alt([seq([lit('a'), empty_class()]), lit('b')]));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2 dead
          a
          [] dead
        seq#5
          b
      match
    ");

    let all_dead = build(seq([lit('a'), empty_class()]));
    assert!(all_dead.node(all_dead.root_group()).is_dead());
}

#[test]
fn negative_lookahead_of_dead_body_is_live() {
    let ast = build(seq([neg_lookahead(empty_class()), lookahead(empty_class())]));

    let neg = ast.find(|n| matches!(&n.kind, NodeKind::LookAhead(s) if s.negated)).unwrap();
    let pos = ast.find(|n| matches!(&n.kind, NodeKind::LookAhead(s) if !s.negated)).unwrap();
    assert!(!ast.node(neg).is_dead());
    assert!(ast.node(pos).is_dead());
}

#[test]
fn loop_with_dead_body_stays_live() {
    let ast = build(star(empty_class()));
    assert!(!ast.node(NodeId(3)).is_dead());
    assert!(ast.node(NodeId(4)).is_dead());
}

#[test]
fn back_reference_empty_match_depends_on_flavor() {
    let pattern = seq([cap(1, lit('a')), backref(1)]);

    let js = Ast::build(&pattern, Flavor::ECMASCRIPT).unwrap();
    let py = Ast::build(&pattern, Flavor::PYTHON).unwrap();
    let may_match_empty = |ast: &Ast| {
        ast.iter()
            .find_map(|n| match &n.kind {
                NodeKind::BackReference(b) => Some(b.may_match_empty),
                _ => None,
            })
            .unwrap()
    };
    assert!(may_match_empty(&js));
    assert!(!may_match_empty(&py));

    let optional = Ast::build(&seq([cap(1, opt(lit('a'))), backref(1)]), Flavor::PYTHON).unwrap();
    assert!(may_match_empty(&optional));
    assert!(optional.has_back_references());
    assert!(optional.referenced_groups().contains(1));
}

#[test]
fn recursive_back_reference_detected() {
    let ast = build(star(cap(1, seq([lit('a'), backref(1)]))));

    assert!(ast.is_recursively_referenced(1));
    let node = ast.find(|n| matches!(n.kind, NodeKind::BackReference(_))).unwrap();
    let NodeKind::BackReference(b) = &ast.node(node).kind else {
        unreachable!()
    };
    assert!(b.recursive);
}

#[test]
fn conditional_group() {
    let ast = build(seq([opt(cap(1, lit('a'))), conditional(1, lit('b'), lit('c'))]));

    insta::assert_snapshot!(dump(&ast), @r"
    root
      cap0#1
        seq#2
          cap1#3 {0,1} copy
            seq#4
              a
            pass#6
          group#7 if1
            seq#8
              b
            seq#10
              c
      match
    ");
    assert!(ast.has_conditional_back_references());
    assert!(ast.condition_groups().contains(1));
}

#[test]
fn find_class_by_label() {
    let ast = build(seq([lit('x'), class("[0-9]", &[('0', '9')]), lit('x')]));

    assert_eq!(ast.find_class("x"), Some(NodeId(3)));
    assert_eq!(ast.find_classes("x").collect::<Vec<_>>(), [NodeId(3), NodeId(5)]);
    let NodeKind::CharacterClass(digits) = &ast.node(NodeId(4)).kind else {
        unreachable!()
    };
    assert!(digits.contains('7'));
    assert!(!digits.contains('a'));
}

#[test]
fn unknown_group_rejected() {
    let err = Ast::build(&seq([cap(1, lit('a')), backref(2)]), Flavor::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownGroup { group: 2, count: 2 }));

    let err = Ast::build(&conditional(3, lit('a'), empty()), Flavor::default()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"reference to capture group 3, but the pattern has 1 groups");
}

#[test]
fn reserved_group_rejected() {
    let err = Ast::build(&cap(0, lit('a')), Flavor::default()).unwrap_err();
    assert!(matches!(err, Error::ReservedGroup));

    let err = Ast::build(&star(cap(0, lit('a'))), Flavor::default()).unwrap_err();
    assert!(matches!(err, Error::ReservedGroup));

    let err = Ast::build(&backref(0), Flavor::default()).unwrap_err();
    assert!(matches!(err, Error::ReservedGroup));
}

#[test]
fn invalid_quantifier_rejected() {
    let err = Ast::build(&repeat(lit('a'), 3, Some(2)), Flavor::default()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"unsupported quantifier range {3,2}");

    let err = Ast::build(&unrolled(lit('a'), 0, Some(0)), Flavor::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidQuantifier { min: 0, max: 0 }));
}

#[test]
fn describe_labels() {
    let ast = build(seq([
        caret(),
        match_begin(),
        backref_any(&[1, 2]),
        cap(1, empty()),
        cap(2, empty()),
        atomic(lit('a')),
        lookbehind(lit('b')),
        neg_lookahead(lit('c')),
        call(1),
        match_end(),
        dollar(),
    ]));

    let labels: Vec<String> = ast
        .sequence(NodeId(2))
        .terms
        .iter()
        .map(|&t| ast.describe(t))
        .collect();
    assert_eq!(
        labels.join(" "),
        indoc! {r"
            ^ \A \1|\2 cap1#6 cap2#8 (?>)#10 (?<=)#15 (?!)#20 \g<1> \z $"
        }
        .trim()
    );
}
