//! Token kinds and the static tables that define them.
//!
//! The kind enumeration mirrors CPython's `Include/token.h` ordering: 54
//! values from `ENDMARKER` through `ERRORTOKEN`. The enumeration is part of
//! the external interface because grammar files reference kinds by name
//! (`NAME`, `NUMBER`, `STRING`, `NEWLINE`, `INDENT`, `DEDENT`, `ENDMARKER`).

use std::fmt;

/// A token kind. Fixed, 54-value enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum TokenKind {
    ENDMARKER = 0,
    NAME,
    NUMBER,
    STRING,
    NEWLINE,
    INDENT,
    DEDENT,
    LPAR,
    RPAR,
    LSQB,
    RSQB,
    COLON,
    COMMA,
    SEMI,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    VBAR,
    AMPER,
    LESS,
    GREATER,
    EQUAL,
    DOT,
    PERCENT,
    LBRACE,
    RBRACE,
    EQEQUAL,
    NOTEQUAL,
    LESSEQUAL,
    GREATEREQUAL,
    TILDE,
    CIRCUMFLEX,
    LEFTSHIFT,
    RIGHTSHIFT,
    DOUBLESTAR,
    PLUSEQUAL,
    MINEQUAL,
    STAREQUAL,
    SLASHEQUAL,
    PERCENTEQUAL,
    AMPEREQUAL,
    VBAREQUAL,
    CIRCUMFLEXEQUAL,
    LEFTSHIFTEQUAL,
    RIGHTSHIFTEQUAL,
    DOUBLESTAREQUAL,
    DOUBLESLASH,
    DOUBLESLASHEQUAL,
    AT,
    RARROW,
    ELLIPSIS,
    OP,
    ERRORTOKEN,
}

/// Number of distinct token kinds.
pub const N_TOKENS: usize = 54;

impl TokenKind {
    /// The canonical name used in grammar files and diagnostics.
    pub fn name(self) -> &'static str {
        TOK_NAMES[self as usize]
    }

    /// True for the synthetic kinds that carry no source-derived text of
    /// their own (`NEWLINE` is not included: it always carries `"\n"`).
    pub fn is_synthetic(self) -> bool {
        matches!(self, TokenKind::INDENT | TokenKind::DEDENT | TokenKind::ENDMARKER)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `kind -> canonical name`, indexed by discriminant.
pub static TOK_NAMES: [&str; N_TOKENS] = [
    "ENDMARKER",
    "NAME",
    "NUMBER",
    "STRING",
    "NEWLINE",
    "INDENT",
    "DEDENT",
    "LPAR",
    "RPAR",
    "LSQB",
    "RSQB",
    "COLON",
    "COMMA",
    "SEMI",
    "PLUS",
    "MINUS",
    "STAR",
    "SLASH",
    "VBAR",
    "AMPER",
    "LESS",
    "GREATER",
    "EQUAL",
    "DOT",
    "PERCENT",
    "LBRACE",
    "RBRACE",
    "EQEQUAL",
    "NOTEQUAL",
    "LESSEQUAL",
    "GREATEREQUAL",
    "TILDE",
    "CIRCUMFLEX",
    "LEFTSHIFT",
    "RIGHTSHIFT",
    "DOUBLESTAR",
    "PLUSEQUAL",
    "MINEQUAL",
    "STAREQUAL",
    "SLASHEQUAL",
    "PERCENTEQUAL",
    "AMPEREQUAL",
    "VBAREQUAL",
    "CIRCUMFLEXEQUAL",
    "LEFTSHIFTEQUAL",
    "RIGHTSHIFTEQUAL",
    "DOUBLESTAREQUAL",
    "DOUBLESLASH",
    "DOUBLESLASHEQUAL",
    "AT",
    "RARROW",
    "ELLIPSIS",
    "OP",
    "ERRORTOKEN",
];

/// Operator/punctuator spelling -> kind, grouped by spelling length so callers
/// doing maximal munch can walk 3, then 2, then 1 character tables in order.
pub static OPERATORS_3: &[(&str, TokenKind)] = &[
    ("<<=", TokenKind::LEFTSHIFTEQUAL),
    (">>=", TokenKind::RIGHTSHIFTEQUAL),
    ("**=", TokenKind::DOUBLESTAREQUAL),
    ("//=", TokenKind::DOUBLESLASHEQUAL),
    ("...", TokenKind::ELLIPSIS),
];

pub static OPERATORS_2: &[(&str, TokenKind)] = &[
    ("==", TokenKind::EQEQUAL),
    ("!=", TokenKind::NOTEQUAL),
    ("<>", TokenKind::NOTEQUAL),
    ("<=", TokenKind::LESSEQUAL),
    ("<<", TokenKind::LEFTSHIFT),
    (">=", TokenKind::GREATEREQUAL),
    (">>", TokenKind::RIGHTSHIFT),
    ("+=", TokenKind::PLUSEQUAL),
    ("-=", TokenKind::MINEQUAL),
    ("->", TokenKind::RARROW),
    ("**", TokenKind::DOUBLESTAR),
    ("*=", TokenKind::STAREQUAL),
    ("//", TokenKind::DOUBLESLASH),
    ("/=", TokenKind::SLASHEQUAL),
    ("|=", TokenKind::VBAREQUAL),
    ("%=", TokenKind::PERCENTEQUAL),
    ("&=", TokenKind::AMPEREQUAL),
    ("^=", TokenKind::CIRCUMFLEXEQUAL),
];

pub static OPERATORS_1: &[(&str, TokenKind)] = &[
    ("(", TokenKind::LPAR),
    (")", TokenKind::RPAR),
    ("[", TokenKind::LSQB),
    ("]", TokenKind::RSQB),
    (":", TokenKind::COLON),
    (",", TokenKind::COMMA),
    (";", TokenKind::SEMI),
    ("+", TokenKind::PLUS),
    ("-", TokenKind::MINUS),
    ("*", TokenKind::STAR),
    ("/", TokenKind::SLASH),
    ("|", TokenKind::VBAR),
    ("&", TokenKind::AMPER),
    ("<", TokenKind::LESS),
    (">", TokenKind::GREATER),
    ("=", TokenKind::EQUAL),
    (".", TokenKind::DOT),
    ("%", TokenKind::PERCENT),
    ("{", TokenKind::LBRACE),
    ("}", TokenKind::RBRACE),
    ("^", TokenKind::CIRCUMFLEX),
    ("~", TokenKind::TILDE),
    ("@", TokenKind::AT),
];

/// Look up an operator spelling by exact text, trying the 3, 2, then 1
/// character tables in order. Used both by the tokenizer (to find the
/// longest matching prefix at a cursor) and by the parser (to resolve a
/// quoted grammar literal like `'<<='` to its kind).
pub fn lookup_operator(spelling: &str) -> Option<TokenKind> {
    for table in [OPERATORS_3, OPERATORS_2, OPERATORS_1] {
        if let Some((_, kind)) = table.iter().find(|(s, _)| *s == spelling) {
            return Some(*kind);
        }
    }
    None
}

/// Resolve a bare terminal-kind name (`NAME`, `NUMBER`, ...) appearing in a
/// grammar file to its `TokenKind`.
pub fn kind_by_name(name: &str) -> Option<TokenKind> {
    TOK_NAMES.iter().position(|&n| n == name).map(|i| TOKEN_KIND_TABLE[i])
}

/// Index-aligned with `TOK_NAMES`/discriminants, used by `kind_by_name`.
static TOKEN_KIND_TABLE: [TokenKind; N_TOKENS] = [
    TokenKind::ENDMARKER,
    TokenKind::NAME,
    TokenKind::NUMBER,
    TokenKind::STRING,
    TokenKind::NEWLINE,
    TokenKind::INDENT,
    TokenKind::DEDENT,
    TokenKind::LPAR,
    TokenKind::RPAR,
    TokenKind::LSQB,
    TokenKind::RSQB,
    TokenKind::COLON,
    TokenKind::COMMA,
    TokenKind::SEMI,
    TokenKind::PLUS,
    TokenKind::MINUS,
    TokenKind::STAR,
    TokenKind::SLASH,
    TokenKind::VBAR,
    TokenKind::AMPER,
    TokenKind::LESS,
    TokenKind::GREATER,
    TokenKind::EQUAL,
    TokenKind::DOT,
    TokenKind::PERCENT,
    TokenKind::LBRACE,
    TokenKind::RBRACE,
    TokenKind::EQEQUAL,
    TokenKind::NOTEQUAL,
    TokenKind::LESSEQUAL,
    TokenKind::GREATEREQUAL,
    TokenKind::TILDE,
    TokenKind::CIRCUMFLEX,
    TokenKind::LEFTSHIFT,
    TokenKind::RIGHTSHIFT,
    TokenKind::DOUBLESTAR,
    TokenKind::PLUSEQUAL,
    TokenKind::MINEQUAL,
    TokenKind::STAREQUAL,
    TokenKind::SLASHEQUAL,
    TokenKind::PERCENTEQUAL,
    TokenKind::AMPEREQUAL,
    TokenKind::VBAREQUAL,
    TokenKind::CIRCUMFLEXEQUAL,
    TokenKind::LEFTSHIFTEQUAL,
    TokenKind::RIGHTSHIFTEQUAL,
    TokenKind::DOUBLESTAREQUAL,
    TokenKind::DOUBLESLASH,
    TokenKind::DOUBLESLASHEQUAL,
    TokenKind::AT,
    TokenKind::RARROW,
    TokenKind::ELLIPSIS,
    TokenKind::OP,
    TokenKind::ERRORTOKEN,
];

/// A single token. Immutable after emission.
///
/// `text` is `None` for the synthetic kinds (`INDENT`, `DEDENT`, `ENDMARKER`)
/// that carry no source text, avoiding an allocation for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub text: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize, line: u32, text: Option<String>) -> Self {
        debug_assert!(start <= end);
        Token { kind, start, end, line, text }
    }

    /// The literal text, or `""` for synthetic tokens.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_align_with_discriminants() {
        assert_eq!(TokenKind::ENDMARKER.name(), "ENDMARKER");
        assert_eq!(TokenKind::ERRORTOKEN.name(), "ERRORTOKEN");
        assert_eq!(TokenKind::NAME as usize, 1);
    }

    #[test]
    fn operator_lookup_is_exact_and_prefers_nothing_shorter() {
        assert_eq!(lookup_operator("<<="), Some(TokenKind::LEFTSHIFTEQUAL));
        assert_eq!(lookup_operator("<<"), Some(TokenKind::LEFTSHIFT));
        assert_eq!(lookup_operator("<"), Some(TokenKind::LESS));
        assert_eq!(lookup_operator("<>"), Some(TokenKind::NOTEQUAL));
        assert_eq!(lookup_operator("$"), None);
    }

    #[test]
    fn kind_by_name_roundtrips() {
        assert_eq!(kind_by_name("NAME"), Some(TokenKind::NAME));
        assert_eq!(kind_by_name("NUMBER"), Some(TokenKind::NUMBER));
        assert_eq!(kind_by_name("nope"), None);
    }

    #[test]
    fn synthetic_tokens_carry_no_text() {
        let t = Token::new(TokenKind::INDENT, 3, 3, 1, None);
        assert_eq!(t.text(), "");
        assert!(t.kind.is_synthetic());
    }
}
