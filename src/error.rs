//! Error types surfaced by the tokenizer and grammar loader.
//!
//! Parse failures are not modeled here: a recognizer failing is ordinary
//! control flow (a `None` result), not an error — see [`crate::parser`].

use thiserror::Error;

/// A fatal error raised while detecting the source encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("BOM mismatch: byte-order mark indicates {bom:?} but the coding comment names {declared:?}")]
    BomMismatch { bom: String, declared: String },
}

/// A fatal error raised while tokenizing source text. Carries the byte
/// offset and line number at which scanning stopped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at offset {offset} (line {line})")]
pub struct TokenizeError {
    pub kind: TokenizeErrorKind,
    pub offset: usize,
    pub line: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeErrorKind {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("unknown token")]
    UnknownToken,
    #[error("EOL while scanning string literal")]
    UnterminatedString,
    #[error("unterminated triple-quoted string")]
    UnterminatedTripleString,
    #[error("invalid exponent in numeric literal")]
    InvalidExponent,
}

/// A fatal error raised while loading a grammar file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} (line {line})")]
pub struct GrammarError {
    pub kind: GrammarErrorKind,
    pub line: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarErrorKind {
    #[error("unclosed quote in grammar literal")]
    UnclosedQuote,
    #[error("malformed production: expected 'NAME : body'")]
    MalformedProduction,
    #[error("duplicate production for nonterminal '{0}'")]
    DuplicateProduction(String),
    #[error("unbalanced brackets in production body")]
    UnbalancedBrackets,
    #[error("empty alternative in production body")]
    EmptyAlternative,
    #[error("undeclared nonterminal '{0}' referenced but never defined")]
    UndeclaredNonterminal(String),
    #[error("no start symbol '{0}' defined in grammar")]
    MissingStartSymbol(String),
}
