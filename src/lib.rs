//! A tokenizer, EBNF grammar loader, FIRST-set analyzer, and predictive
//! recursive-descent parser for Python source text.
//!
//! The front end is three tightly coupled pieces: [`tokenizer`] turns bytes
//! into a token stream; [`grammar`] loads a Python-style meta-grammar file
//! into an EBNF tree per production and computes FIRST sets over it; and
//! [`parser`] drives a top-down predictive parse of a token stream against
//! a loaded grammar, producing a [`cst::Cst`].

pub mod cst;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod token;
pub mod tokenizer;

pub use cst::{Cst, CstNode, NodeId};
pub use error::{EncodingError, GrammarError, GrammarErrorKind, TokenizeError, TokenizeErrorKind};
pub use grammar::first::FirstTable;
pub use grammar::{Grammar, GrammarNode};
pub use parser::Parser;
pub use token::{Token, TokenKind};

/// One end-to-end front-end instance: a loaded grammar plus its derived
/// FIRST table, ready to parse any number of token streams.
pub struct Frontend {
    grammar: Grammar,
}

impl Frontend {
    /// Load a grammar file (raw bytes) and build the front end from it.
    pub fn load(grammar_bytes: &[u8], start_symbol: &str) -> Result<Self, GrammarError> {
        let grammar = grammar::loader::load(grammar_bytes, start_symbol)?;
        Ok(Frontend { grammar })
    }

    pub fn load_str(grammar_src: &str, start_symbol: &str) -> Result<Self, GrammarError> {
        let grammar = grammar::loader::load_str(grammar_src, start_symbol)?;
        Ok(Frontend { grammar })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Tokenize `source` and parse it from the grammar's start symbol.
    /// Returns `Ok(None)` for a clean parse failure (no production
    /// matched); tokenizer errors are propagated as `Err`.
    pub fn parse(&self, source: &[u8]) -> Result<Option<Cst>, TokenizeError> {
        let tokens = tokenizer::tokenize(source)?;
        Ok(Parser::new(tokens, &self.grammar).parse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_tokenize_and_parse() {
        let fe = Frontend::load_str("file_input: NAME '=' NUMBER NEWLINE ENDMARKER\n", "file_input").unwrap();
        let cst = fe.parse(b"a=1\n").unwrap().unwrap();
        assert_eq!(cst.get(cst.root()).kind, "file_input");
    }

    #[test]
    fn end_to_end_reports_null_parse_on_mismatch() {
        let fe = Frontend::load_str("file_input: NUMBER ENDMARKER\n", "file_input").unwrap();
        assert!(fe.parse(b"a\n").unwrap().is_none());
    }

    #[test]
    fn end_to_end_propagates_tokenizer_errors() {
        let fe = Frontend::load_str("file_input: NAME ENDMARKER\n", "file_input").unwrap();
        assert!(fe.parse(b"$\n").is_err());
    }
}
