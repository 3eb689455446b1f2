//! Parser engine (C6): a token-stream cursor plus a recognizer for each
//! shape of [`GrammarNode`], assembling a [`Cst`] as it goes.
//!
//! Failure is "null, not exception": every recognizer returns an `Option`
//! and restores the cursor to its entry position on `None`, so a failed
//! subrule never leaves partial output attached to the tree (per-subrule
//! results are threaded up through return values, not mutated into the
//! arena until the whole production succeeds).

pub mod grammar;

use std::collections::HashSet;

use crate::cst::{Cst, NodeId};
use crate::grammar::first::FirstTable;
use crate::grammar::{is_quoted_literal, literal_text, Grammar, GrammarNode, EPS};
use crate::token::{kind_by_name, lookup_operator, Token, TokenKind};

/// Parses one token stream against one grammar. Holds a single mutable
/// cursor; never shared, never retained after [`Parser::finish`] returns.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    first: FirstTable<'g>,
    tokens: Vec<Token>,
    pos: usize,
    cst: Cst,
}

impl<'g> Parser<'g> {
    pub fn new(tokens: Vec<Token>, grammar: &'g Grammar) -> Self {
        assert!(!tokens.is_empty(), "token stream must end with ENDMARKER");
        Parser { grammar, first: FirstTable::new(grammar), tokens, pos: 0, cst: Cst::new() }
    }

    // --- Cursor primitives (spec C6) -----------------------------------

    /// The current token. Never advances past the final `ENDMARKER`.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The set of grammar-leaf strings the current token could satisfy:
    /// its kind name, plus the quoted form of its literal text when that
    /// literal is a registered special terminal.
    pub fn peek_gstr(&self) -> HashSet<String> {
        let tok = self.peek();
        let mut set = HashSet::with_capacity(2);
        set.insert(tok.kind.name().to_string());
        if let Some(text) = &tok.text {
            if !text.is_empty() {
                let quoted = format!("'{text}'");
                if self.grammar.special_terminals.contains(&quoted) {
                    set.insert(quoted);
                }
            }
        }
        set
    }

    /// Returns the current token and advances the cursor (never past the
    /// final `ENDMARKER`).
    pub fn get(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// True iff the current token's kind matches `kind` and, when `literal`
    /// is given, its text equals it exactly. When `kind` is `NAME` and no
    /// literal is given, excludes identifiers whose text is itself a
    /// registered special terminal (so a bare `NAME` rule doesn't
    /// incidentally also match `'def'`).
    pub fn test(&self, kind: TokenKind, literal: Option<&str>) -> bool {
        let tok = self.peek();
        if tok.kind != kind {
            return false;
        }
        match literal {
            Some(expected) => tok.text() == expected,
            None if kind == TokenKind::NAME => {
                let quoted = format!("'{}'", tok.text());
                !self.grammar.special_terminals.contains(&quoted)
            }
            None => true,
        }
    }

    // --- Recognizer (spec C6/C7) ----------------------------------------

    /// Recognize a single grammar-tree node, returning the CST children it
    /// produced, or `None` (with the cursor restored) on failure.
    pub fn recognize(&mut self, node: &GrammarNode) -> Option<Vec<NodeId>> {
        match node {
            GrammarNode::Leaf(name) => self.recognize_leaf(name).map(|id| vec![id]),
            GrammarNode::Seq(children) => self.recognize_seq(children),
            GrammarNode::Alt(children) => self.recognize_alt(children),
            GrammarNode::Opt(inner) => Some(self.recognize(inner).unwrap_or_default()),
            GrammarNode::Star(inner) => Some(self.recognize_repeat(inner)),
            GrammarNode::Plus(inner) => {
                let start = self.pos;
                let children = self.recognize_repeat(inner);
                if children.is_empty() {
                    self.pos = start;
                    None
                } else {
                    Some(children)
                }
            }
        }
    }

    fn recognize_seq(&mut self, children: &[GrammarNode]) -> Option<Vec<NodeId>> {
        let start = self.pos;
        let mut out = Vec::new();
        for child in children {
            match self.recognize(child) {
                Some(mut ids) => out.append(&mut ids),
                None => {
                    self.pos = start;
                    return None;
                }
            }
        }
        Some(out)
    }

    fn recognize_alt(&mut self, children: &[GrammarNode]) -> Option<Vec<NodeId>> {
        let start = self.pos;
        for child in grammar::ordered_alternatives(&self.first, children) {
            if let Some(ids) = self.recognize(child) {
                return Some(ids);
            }
            self.pos = start;
        }
        None
    }

    /// Shared by `Star` (stop on first failure) and `Plus` (same loop,
    /// caller enforces the >=1 requirement).
    fn recognize_repeat(&mut self, inner: &GrammarNode) -> Vec<NodeId> {
        let mut out = Vec::new();
        loop {
            let start = self.pos;
            match self.recognize(inner) {
                Some(mut ids) => out.append(&mut ids),
                None => {
                    self.pos = start;
                    break;
                }
            }
        }
        out
    }

    fn recognize_leaf(&mut self, name: &str) -> Option<NodeId> {
        if self.grammar.is_nonterminal(name) {
            return self.entry(name);
        }
        let (kind, literal) = if is_quoted_literal(name) {
            let text = literal_text(name);
            (lookup_operator(text).unwrap_or(TokenKind::NAME), Some(text))
        } else {
            let kind = kind_by_name(name)
                .unwrap_or_else(|| panic!("leaf '{name}' is neither a nonterminal, a quoted literal, nor a known kind name"));
            (kind, None)
        };
        if self.test(kind, literal) {
            let tok = self.get();
            Some(self.cst.push_leaf(tok.kind.name(), tok))
        } else {
            None
        }
    }

    /// Per-nonterminal entry (spec C7): a FIRST-disjoint short-circuit
    /// check, then the root recognizer, wrapped into a labeled interior
    /// node on success.
    fn entry(&mut self, name: &str) -> Option<NodeId> {
        let first = self.first.of_name(name);
        let lookahead = self.peek_gstr();
        if lookahead.is_disjoint(&first) && !first.contains(EPS) {
            return None;
        }
        let start = self.pos;
        let tree = self
            .grammar
            .production(name)
            .unwrap_or_else(|| panic!("nonterminal '{name}' has no production (grammar invariant violated)"));
        match self.recognize(tree) {
            Some(children) => Some(self.cst.push_interior(name, children)),
            None => {
                self.pos = start;
                None
            }
        }
    }

    /// Parse the grammar's start symbol. Consumes the parser.
    pub fn parse(mut self) -> Option<Cst> {
        let start_symbol = self.grammar.start_symbol.clone();
        log::debug!("parsing from start symbol '{start_symbol}'");
        match self.entry(&start_symbol) {
            Some(root) => {
                self.cst.set_root(root);
                Some(self.cst)
            }
            None => {
                log::warn!(
                    "parse failed at token {:?} (line {})",
                    self.peek().kind,
                    self.peek().line
                );
                None
            }
        }
    }
}
