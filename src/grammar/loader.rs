//! Loader for the Python-style EBNF meta-grammar file format: reassembles
//! continuation lines, tokenizes each production's body, and builds the
//! `GrammarNode` tree for it.

use std::collections::{HashMap, HashSet};

use super::{collect_leaves, is_quoted_literal, Grammar, GrammarNode};
use crate::error::{GrammarError, GrammarErrorKind};

const NT_CHARS_EXTRA: char = '_';

fn is_nt_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == NT_CHARS_EXTRA
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyTok {
    Name(String),
    Literal(String),
    Sym(char),
}

const META_SYMS: [char; 7] = ['[', ']', '(', ')', '*', '+', '|'];

/// Tokenize one logical production line (`name: body`) into the production
/// name and its body token list.
fn lex_production(line: &str, line_num: u32) -> Result<(String, Vec<BodyTok>), GrammarError> {
    let chars: Vec<char> = line.chars().collect();
    let n = chars.len();
    let mut i = 0;

    while i < n && is_nt_char(chars[i]) {
        i += 1;
    }
    if i == 0 || i == n || chars[i] != ':' {
        return Err(GrammarError { kind: GrammarErrorKind::MalformedProduction, line: line_num });
    }
    let name: String = chars[..i].iter().collect();
    i += 1;

    let mut toks = Vec::new();
    while i < n {
        while i < n && (chars[i] == ' ' || chars[i] == '\t') {
            i += 1;
        }
        if i >= n {
            break;
        }
        let start = i;
        while i < n && is_nt_char(chars[i]) {
            i += 1;
        }
        if start < i {
            toks.push(BodyTok::Name(chars[start..i].iter().collect()));
            continue;
        }
        if META_SYMS.contains(&chars[i]) {
            toks.push(BodyTok::Sym(chars[i]));
            i += 1;
            continue;
        }
        if chars[i] == '\'' {
            let qstart = i;
            i += 1;
            while i < n && chars[i] != '\'' {
                i += 1;
            }
            if i >= n {
                return Err(GrammarError { kind: GrammarErrorKind::UnclosedQuote, line: line_num });
            }
            i += 1;
            toks.push(BodyTok::Literal(chars[qstart..i].iter().collect()));
            continue;
        }
        return Err(GrammarError { kind: GrammarErrorKind::MalformedProduction, line: line_num });
    }

    Ok((name, toks))
}

/// Parse a single alternative (no top-level `|`) into its sequence of
/// children, recursing into bracketed groups.
fn parse_seq(toks: &[BodyTok], pos: &mut usize, line: u32) -> Result<Vec<GrammarNode>, GrammarError> {
    let mut out = Vec::new();
    while *pos < toks.len() {
        match &toks[*pos] {
            BodyTok::Sym(']') | BodyTok::Sym(')') | BodyTok::Sym('|') => break,
            BodyTok::Sym('[') => {
                *pos += 1;
                let inner = parse_alt(toks, pos, line)?;
                match toks.get(*pos) {
                    Some(BodyTok::Sym(']')) => *pos += 1,
                    _ => return Err(GrammarError { kind: GrammarErrorKind::UnbalancedBrackets, line }),
                }
                out.push(GrammarNode::Opt(Box::new(inner)));
            }
            BodyTok::Sym('(') => {
                *pos += 1;
                let inner = parse_alt(toks, pos, line)?;
                match toks.get(*pos) {
                    Some(BodyTok::Sym(')')) => *pos += 1,
                    _ => return Err(GrammarError { kind: GrammarErrorKind::UnbalancedBrackets, line }),
                }
                match toks.get(*pos) {
                    Some(BodyTok::Sym('*')) => {
                        *pos += 1;
                        out.push(GrammarNode::Star(Box::new(inner)));
                    }
                    Some(BodyTok::Sym('+')) => {
                        *pos += 1;
                        out.push(GrammarNode::Plus(Box::new(inner)));
                    }
                    _ => out.push(inner),
                }
            }
            BodyTok::Sym('*') | BodyTok::Sym('+') => {
                return Err(GrammarError { kind: GrammarErrorKind::MalformedProduction, line })
            }
            BodyTok::Sym(_) => unreachable!("lex_production only emits meta symbols from META_SYMS"),
            BodyTok::Name(_) | BodyTok::Literal(_) => {
                let leaf = match &toks[*pos] {
                    BodyTok::Name(s) => s.clone(),
                    BodyTok::Literal(s) => s.clone(),
                    _ => unreachable!(),
                };
                *pos += 1;
                let mut node = GrammarNode::Leaf(leaf);
                match toks.get(*pos) {
                    Some(BodyTok::Sym('*')) => {
                        *pos += 1;
                        node = GrammarNode::Star(Box::new(GrammarNode::Seq(vec![node])));
                    }
                    Some(BodyTok::Sym('+')) => {
                        *pos += 1;
                        node = GrammarNode::Plus(Box::new(GrammarNode::Seq(vec![node])));
                    }
                    _ => {}
                }
                out.push(node);
            }
        }
    }
    if out.is_empty() {
        return Err(GrammarError { kind: GrammarErrorKind::EmptyAlternative, line });
    }
    Ok(out)
}

/// Parse a possibly-`|`-separated sequence of alternatives.
fn parse_alt(toks: &[BodyTok], pos: &mut usize, line: u32) -> Result<GrammarNode, GrammarError> {
    let mut alts = vec![parse_seq(toks, pos, line)?];
    while matches!(toks.get(*pos), Some(BodyTok::Sym('|'))) {
        *pos += 1;
        alts.push(parse_seq(toks, pos, line)?);
    }
    if alts.len() > 1 {
        Ok(GrammarNode::Alt(alts.into_iter().map(GrammarNode::Seq).collect()))
    } else {
        Ok(GrammarNode::Seq(alts.into_iter().next().unwrap()))
    }
}

fn build_tree(toks: &[BodyTok], line: u32) -> Result<GrammarNode, GrammarError> {
    let mut pos = 0;
    let node = parse_alt(toks, &mut pos, line)?;
    if pos != toks.len() {
        return Err(GrammarError { kind: GrammarErrorKind::UnbalancedBrackets, line });
    }
    Ok(node)
}

/// Reassemble a grammar file's physical lines into logical production
/// lines: blank/`#`-only lines are dropped, in-line `#` comments are
/// truncated, and lines starting with whitespace continue the previous
/// production.
fn reassemble_lines(text: &str) -> Vec<(String, u32)> {
    let mut logical = Vec::new();
    let mut current: Option<(String, u32)> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_num = idx as u32 + 1;
        let stripped = raw_line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let line = match raw_line.find('#') {
            Some(p) => &raw_line[..p],
            None => raw_line,
        };
        if raw_line.starts_with(' ') || raw_line.starts_with('\t') {
            if let Some((acc, _)) = current.as_mut() {
                acc.push(' ');
                acc.push_str(line.trim());
            }
        } else {
            if let Some(done) = current.take() {
                logical.push(done);
            }
            current = Some((line.trim_end().to_string(), line_num));
        }
    }
    if let Some(done) = current.take() {
        logical.push(done);
    }
    logical
}

/// Load a grammar from already-decoded text, starting at `start_symbol`.
pub fn load_str(text: &str, start_symbol: &str) -> Result<Grammar, GrammarError> {
    let mut productions: HashMap<String, GrammarNode> = HashMap::new();

    for (line, line_num) in reassemble_lines(text) {
        let (name, toks) = lex_production(&line, line_num)?;
        let tree = build_tree(&toks, line_num)?;
        if productions.insert(name.clone(), tree).is_some() {
            return Err(GrammarError { kind: GrammarErrorKind::DuplicateProduction(name), line: line_num });
        }
    }

    let mut special_terminals = HashSet::new();
    for tree in productions.values() {
        let mut leaves = Vec::new();
        collect_leaves(tree, &mut leaves);
        for leaf in leaves {
            if is_quoted_literal(leaf) {
                special_terminals.insert(leaf.to_string());
            }
        }
    }

    for tree in productions.values() {
        let mut leaves = Vec::new();
        collect_leaves(tree, &mut leaves);
        for leaf in leaves {
            let is_terminal = crate::token::kind_by_name(leaf).is_some() || is_quoted_literal(leaf);
            if !is_terminal && !productions.contains_key(leaf) {
                return Err(GrammarError {
                    kind: GrammarErrorKind::UndeclaredNonterminal(leaf.to_string()),
                    line: 0,
                });
            }
        }
    }

    if !productions.contains_key(start_symbol) {
        return Err(GrammarError {
            kind: GrammarErrorKind::MissingStartSymbol(start_symbol.to_string()),
            line: 0,
        });
    }

    log::info!("loaded grammar: {} productions, {} special terminals", productions.len(), special_terminals.len());
    Ok(Grammar { productions, special_terminals, start_symbol: start_symbol.to_string() })
}

/// Load a grammar from raw bytes (UTF-8 only; grammar files are not
/// expected to carry the PEP-263 encoding machinery source files do).
pub fn load(bytes: &[u8], start_symbol: &str) -> Result<Grammar, GrammarError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| GrammarError { kind: GrammarErrorKind::MalformedProduction, line: 0 })?;
    load_str(text, start_symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarNode as N;
    use expect_test::{expect, Expect};

    /// Snapshot a production's tree shape via its `Debug` rendering.
    fn check_tree(grammar_src: &str, production: &str, expect: Expect) {
        let g = load_str(grammar_src, "file_input").unwrap();
        let tree = g.production(production).unwrap();
        expect.assert_eq(&format!("{tree:?}"));
    }

    #[test]
    fn loads_star_production() {
        let g = load_str("file_input: NEWLINE\nexpr: xor_expr ('|' xor_expr)*\n", "file_input").unwrap();
        let tree = g.production("expr").unwrap();
        match tree {
            N::Seq(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], N::Leaf("xor_expr".to_string()));
                match &children[1] {
                    N::Star(inner) => match inner.as_ref() {
                        N::Seq(inner_children) => {
                            assert_eq!(inner_children[0], N::Leaf("'|'".to_string()));
                            assert_eq!(inner_children[1], N::Leaf("xor_expr".to_string()));
                        }
                        _ => panic!("expected Seq inside Star"),
                    },
                    other => panic!("expected Star, got {other:?}"),
                }
            }
            other => panic!("expected Seq root, got {other:?}"),
        }
    }

    #[test]
    fn plus_is_distinct_from_star() {
        let g = load_str("file_input: NEWLINE\nblock: (NEWLINE)+\n", "file_input").unwrap();
        match g.production("block").unwrap() {
            N::Seq(children) => assert!(matches!(children[0], N::Plus(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comp_op_alternatives_collected_in_source_order() {
        let g = load_str(
            "file_input: NEWLINE\ncomp_op: '<'|'>'|'=='|'is'|'is' 'not'|'not' 'in'\n",
            "file_input",
        )
        .unwrap();
        match g.production("comp_op").unwrap() {
            N::Alt(alts) => assert_eq!(alts.len(), 6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn continuation_lines_are_joined() {
        let g = load_str("file_input: NAME\n    NEWLINE\n", "file_input").unwrap();
        match g.production("file_input").unwrap() {
            N::Seq(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inline_comment_is_truncated() {
        let g = load_str("file_input: NAME # trailing remark\n", "file_input").unwrap();
        match g.production("file_input").unwrap() {
            N::Seq(children) => assert_eq!(children.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        let err = load_str("file_input: 'abc\n", "file_input").unwrap_err();
        assert_eq!(err.kind, GrammarErrorKind::UnclosedQuote);
    }

    #[test]
    fn undeclared_nonterminal_is_an_error() {
        let err = load_str("file_input: missing_rule\n", "file_input").unwrap_err();
        assert!(matches!(err.kind, GrammarErrorKind::UndeclaredNonterminal(ref n) if n == "missing_rule"));
    }

    #[test]
    fn missing_start_symbol_is_an_error() {
        let err = load_str("other: NAME\n", "file_input").unwrap_err();
        assert!(matches!(err.kind, GrammarErrorKind::MissingStartSymbol(ref n) if n == "file_input"));
    }

    #[test]
    fn special_terminals_collects_quoted_literals_only() {
        let g = load_str("file_input: NEWLINE\nstmt: 'pass' NAME\n", "file_input").unwrap();
        assert!(g.special_terminals.contains("'pass'"));
        assert_eq!(g.special_terminals.len(), 1);
    }

    #[test]
    fn expr_production_tree_shape_snapshot() {
        check_tree(
            "file_input: NEWLINE\nexpr: xor_expr ('|' xor_expr)*\nxor_expr: NAME\n",
            "expr",
            expect![[r#"Seq([Leaf("xor_expr"), Star(Seq([Leaf("'|'"), Leaf("xor_expr")]))])"#]],
        );
    }
}
