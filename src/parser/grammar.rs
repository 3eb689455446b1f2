//! Alternative-ordering policy (spec C7): at each `Alt` node, children are
//! ranked so the predictive parser tries the alternative most likely to be
//! correct first, without needing unbounded lookahead.

use crate::grammar::first::FirstTable;
use crate::grammar::{GrammarNode, EPS};

/// Longest possible sequence length an alternative could produce, used as
/// a tie-break so `'is' 'not'` is attempted before the shorter `'is'`.
fn longest_seq(node: &GrammarNode) -> usize {
    match node {
        GrammarNode::Leaf(_) => 1,
        GrammarNode::Seq(children) => children.len().max(children.iter().map(longest_seq).max().unwrap_or(0)),
        GrammarNode::Alt(children) => children.iter().map(longest_seq).max().unwrap_or(0),
        GrammarNode::Opt(inner) | GrammarNode::Star(inner) | GrammarNode::Plus(inner) => longest_seq(inner),
    }
}

/// Sort key for one alternative: `(has_no_eps, longest_span, avoids_generic_name)`,
/// compared lexicographically and sorted descending so the first element
/// wins ties in order of significance, matching the policy in spec 4.4.
fn sort_key(first: &FirstTable, node: &GrammarNode) -> (bool, usize, bool) {
    let fs = first.of_node(node);
    let has_no_eps = !fs.contains(EPS);
    let avoids_generic_name = !fs.contains("NAME");
    (has_no_eps, longest_seq(node), avoids_generic_name)
}

/// Return the children of an `Alt` node in try-order: a stable sort by
/// descending `sort_key`, so equal-keyed alternatives keep their original
/// relative (grammar source) order. This ordering is a pure function of
/// the grammar: the same grammar always yields the same order.
pub fn ordered_alternatives<'n>(first: &FirstTable, children: &'n [GrammarNode]) -> Vec<&'n GrammarNode> {
    let mut indexed: Vec<(usize, &GrammarNode)> = children.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let ka = sort_key(first, a);
        let kb = sort_key(first, b);
        kb.cmp(&ka).then(ia.cmp(ib))
    });
    indexed.into_iter().map(|(_, node)| node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::loader::load_str;

    #[test]
    fn longer_alternative_with_shared_prefix_is_tried_first() {
        let g = load_str("file_input: NEWLINE\ncomp_op: '<'|'>'|'=='|'is'|'is' 'not'|'not' 'in'\n", "file_input").unwrap();
        let first = FirstTable::new(&g);
        match g.production("comp_op").unwrap() {
            GrammarNode::Alt(children) => {
                let ordered = ordered_alternatives(&first, children);
                let is_not_pos = ordered
                    .iter()
                    .position(|n| {
                        longest_seq(n) == 2 && matches!(n, GrammarNode::Seq(c) if matches!(&c[0], GrammarNode::Leaf(l) if l == "'is'"))
                    })
                    .unwrap();
                let is_pos = ordered
                    .iter()
                    .position(|n| matches!(n, GrammarNode::Seq(c) if c.len() == 1 && matches!(&c[0], GrammarNode::Leaf(l) if l == "'is'")))
                    .unwrap();
                assert!(is_not_pos < is_pos, "'is' 'not' must be tried before bare 'is'");
            }
            other => panic!("expected Alt, got {other:?}"),
        }
    }

    #[test]
    fn nullable_alternative_is_tried_last() {
        let g = load_str("file_input: NEWLINE\nfoo: bar | baz\nbar: NAME\nbaz: [NUMBER]\n", "file_input").unwrap();
        let first = FirstTable::new(&g);
        match g.production("foo").unwrap() {
            GrammarNode::Alt(children) => {
                let ordered = ordered_alternatives(&first, children);
                assert!(matches!(ordered.last().unwrap(), GrammarNode::Seq(c) if matches!(&c[0], GrammarNode::Leaf(l) if l == "baz")));
            }
            other => panic!("expected Alt, got {other:?}"),
        }
    }

    #[test]
    fn keyword_literal_is_tried_before_generic_name_alternative() {
        let g = load_str(
            "file_input: NEWLINE\nsmall_stmt: 'import' NAME | expr_stmt\nexpr_stmt: NAME\n",
            "file_input",
        )
        .unwrap();
        let first = FirstTable::new(&g);
        match g.production("small_stmt").unwrap() {
            GrammarNode::Alt(children) => {
                let ordered = ordered_alternatives(&first, children);
                assert!(matches!(ordered[0], GrammarNode::Seq(c) if matches!(&c[0], GrammarNode::Leaf(l) if l == "'import'")));
            }
            other => panic!("expected Alt, got {other:?}"),
        }
    }

    #[test]
    fn ordering_is_deterministic_across_repeated_calls() {
        let g = load_str("file_input: NEWLINE\ncomp_op: '<'|'is'|'is' 'not'\n", "file_input").unwrap();
        let first = FirstTable::new(&g);
        match g.production("comp_op").unwrap() {
            GrammarNode::Alt(children) => {
                let a = ordered_alternatives(&first, children);
                let b = ordered_alternatives(&first, children);
                assert_eq!(format!("{a:?}"), format!("{b:?}"));
            }
            other => panic!("expected Alt, got {other:?}"),
        }
    }
}
