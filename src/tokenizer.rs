//! Tokenizer for Python source text.
//!
//! Converts raw bytes into an ordered, non-restartable sequence of
//! [`Token`]s, synthesizing `INDENT`/`DEDENT`/`NEWLINE`/`ENDMARKER` the way
//! CPython's own tokenizer does. No regex; a single character-at-a-time
//! scan over a cursor, matching the structure of the reference
//! implementation this was ported from.

use crate::error::{EncodingError, TokenizeError, TokenizeErrorKind};
use crate::token::{lookup_operator, Token, TokenKind};

const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];
const BOM_UTF16_LE: &[u8] = &[0xFF, 0xFE];
const BOM_UTF16_BE: &[u8] = &[0xFE, 0xFF];
const BOM_UTF32_BE: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];
const BOM_UTF32_LE: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];

/// BOM kinds in the order they must be tried: longer BOMs before shorter
/// ones that are a byte-for-byte prefix of them (UTF-32-LE contains the
/// UTF-16-LE BOM as its first two bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bom {
    Utf32Le,
    Utf32Be,
    Utf16Le,
    Utf16Be,
    Utf8,
}

impl Bom {
    fn name(self) -> &'static str {
        match self {
            Bom::Utf32Le | Bom::Utf32Be => "utf32",
            Bom::Utf16Le | Bom::Utf16Be => "utf16",
            Bom::Utf8 => "utf8",
        }
    }
}

fn detect_bom(bytes: &[u8]) -> Option<(Bom, usize)> {
    if bytes.starts_with(BOM_UTF32_LE) {
        Some((Bom::Utf32Le, BOM_UTF32_LE.len()))
    } else if bytes.starts_with(BOM_UTF32_BE) {
        Some((Bom::Utf32Be, BOM_UTF32_BE.len()))
    } else if bytes.starts_with(BOM_UTF16_LE) {
        Some((Bom::Utf16Le, BOM_UTF16_LE.len()))
    } else if bytes.starts_with(BOM_UTF16_BE) {
        Some((Bom::Utf16Be, BOM_UTF16_BE.len()))
    } else if bytes.starts_with(BOM_UTF8) {
        Some((Bom::Utf8, BOM_UTF8.len()))
    } else {
        None
    }
}

/// Scan the first two physical lines of `bytes` (after any BOM) for a
/// PEP-263 `coding:`/`coding=` magic comment. Returns the case-folded
/// encoding name it declares, if any.
fn scan_magic_comment(bytes: &[u8]) -> Option<String> {
    let mut line_number = 1u32;
    let mut i = 0usize;
    let mut line_start = 0usize;
    let mut eol = false;

    while i < bytes.len() && line_number <= 2 {
        match bytes[i] {
            b'\n' => {
                line_number += 1;
                eol = true;
            }
            b'\r' => {
                i += 1;
                continue;
            }
            _ => {}
        }
        if eol {
            eol = false;
            if bytes.get(line_start) == Some(&b'#') {
                if let Ok(line) = std::str::from_utf8(&bytes[line_start..i]) {
                    if let Some(encoding) = parse_coding_comment(line) {
                        return Some(encoding);
                    }
                }
            }
            line_start = i + 1;
        }
        i += 1;
    }
    None
}

fn parse_coding_comment(line: &str) -> Option<String> {
    let pos = line.find("coding:").or_else(|| line.find("coding="))?;
    let rest = &line[pos + "coding:".len()..];
    let rest = rest.trim_start_matches(' ');
    let end = rest.find(' ').unwrap_or(rest.len());
    Some(rest[..end].to_lowercase())
}

/// Detect the source encoding per PEP-263: a BOM prefix takes priority,
/// falling back to a `coding:`/`coding=` magic comment in the first two
/// lines, falling back to UTF-8. Fails if a BOM and a magic comment both
/// appear and disagree (ignoring dashes).
fn detect_encoding(bytes: &[u8]) -> Result<(String, usize), EncodingError> {
    let bom = detect_bom(bytes);
    let bom_start = bom.map(|(_, len)| len).unwrap_or(0);
    let declared = scan_magic_comment(bytes);

    if let (Some((bom, _)), Some(declared)) = (bom, &declared) {
        if declared.replace('-', "") != bom.name() {
            return Err(EncodingError::BomMismatch { bom: bom.name().to_string(), declared: declared.clone() });
        }
    }

    let encoding = declared.or_else(|| bom.map(|(b, _)| b.name().to_string())).unwrap_or_else(|| "utf-8".to_string());
    Ok((encoding, bom_start))
}

/// Decode `bytes` to a `String` using BOM-directed decoding for UTF-16/32 and
/// plain UTF-8 otherwise (including when a magic comment names a different
/// 8-bit codec: this tokenizer only natively supports the Unicode
/// Transformation Formats, consistent with its declared external interface).
fn decode_source(bytes: &[u8]) -> Result<String, TokenizeError> {
    let (_encoding, bom_len) = detect_encoding(bytes).map_err(|e| TokenizeError {
        kind: TokenizeErrorKind::Encoding(e),
        offset: 0,
        line: 1,
    })?;
    let body = &bytes[bom_len..];

    let bad_utf8 = || TokenizeError { kind: TokenizeErrorKind::UnknownToken, offset: bom_len, line: 1 };

    if bytes.starts_with(BOM_UTF32_LE) {
        let mut s = String::new();
        for chunk in body.chunks_exact(4) {
            let cp = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            s.push(char::from_u32(cp).ok_or_else(bad_utf8)?);
        }
        Ok(s)
    } else if bytes.starts_with(BOM_UTF32_BE) {
        let mut s = String::new();
        for chunk in body.chunks_exact(4) {
            let cp = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            s.push(char::from_u32(cp).ok_or_else(bad_utf8)?);
        }
        Ok(s)
    } else if bytes.starts_with(BOM_UTF16_LE) {
        let units: Vec<u16> = body.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        String::from_utf16(&units).map_err(|_| bad_utf8())
    } else if bytes.starts_with(BOM_UTF16_BE) {
        let units: Vec<u16> = body.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        String::from_utf16(&units).map_err(|_| bad_utf8())
    } else {
        std::str::from_utf8(body).map(|s| s.to_string()).map_err(|_| bad_utf8())
    }
}

const WHITESPACE: [char; 2] = [' ', '\t'];

/// All recognized string-literal prefix+quote spellings, sorted longest
/// first so a greedy scan finds the maximal munch.
fn string_prefix_at(text: &str, byte_pos: usize) -> Option<&'static str> {
    const PREFIXES: &[&str] =
        &["r", "R", "u", "U", "b", "B", "br", "BR", "bR", "Br", "rb", "RB", "rB", "Rb"];
    const QUOTES: &[&str] = &["\"\"\"", "'''", "\"", "'"];

    let rest = &text[byte_pos..];
    let mut best: Option<&'static str> = None;
    for quote in QUOTES {
        for prefix in PREFIXES.iter().chain(std::iter::once(&"")) {
            let combined_len = prefix.len() + quote.len();
            if best.map_or(true, |b| combined_len > b.len())
                && rest.starts_with(prefix)
                && rest[prefix.len()..].starts_with(quote)
            {
                let full: &'static str = if prefix.is_empty() {
                    quote
                } else {
                    Box::leak(format!("{prefix}{quote}").into_boxed_str())
                };
                best = Some(full);
            }
        }
    }
    best
}

fn closing_quote(start_tok: &str) -> &'static str {
    if start_tok.ends_with("'''") {
        "'''"
    } else if start_tok.ends_with("\"\"\"") {
        "\"\"\""
    } else if start_tok.ends_with('"') {
        "\""
    } else if start_tok.ends_with('\'') {
        "'"
    } else {
        unreachable!("string_prefix_at only returns quote-terminated spellings")
    }
}

/// A cursor over the decoded source, indexed by character position with
/// byte-offset lookup for token boundaries.
struct Cursor<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Cursor { text, chars: text.char_indices().collect() }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn byte_offset(&self, i: usize) -> usize {
        self.chars.get(i).map(|&(b, _)| b).unwrap_or(self.text.len())
    }

    fn at(&self, i: usize) -> Option<char> {
        self.chars.get(i).map(|&(_, c)| c)
    }

    fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.text[self.byte_offset(from)..self.byte_offset(to)]
    }
}

/// Tokenize a full Python source file. Fails fast: no partial token list is
/// returned on error.
pub fn tokenize(bytes: &[u8]) -> Result<Vec<Token>, TokenizeError> {
    let source = decode_source(bytes)?;
    log::debug!("tokenizing {} bytes ({} chars)", bytes.len(), source.chars().count());
    tokenize_str(&source)
}

/// Tokenize already-decoded source text.
pub fn tokenize_str(source: &str) -> Result<Vec<Token>, TokenizeError> {
    let cur = Cursor::new(source);
    let n = cur.len();

    let mut toks: Vec<Token> = Vec::new();
    let mut i = 0usize;
    let mut line_start = true;
    let mut indent_stack: Vec<usize> = vec![0];
    let mut line_num: u32 = 1;
    let mut level: i32 = 0;

    let err = |kind: TokenizeErrorKind, i: usize, line: u32| TokenizeError { kind, offset: i, line };

    while i < n {
        let c = cur.at(i).unwrap();

        if WHITESPACE.contains(&c) {
            let mut p = i;
            while p < n && WHITESPACE.contains(&cur.at(p).unwrap()) {
                p += 1;
            }
            if line_start {
                line_start = false;
                let next = cur.at(p);
                if matches!(next, Some('#') | Some('\n')) || next.is_none() {
                    while p < n && cur.at(p) != Some('\n') {
                        p += 1;
                    }
                    i = p;
                } else {
                    let dist = p - i;
                    if level == 0 {
                        let top = *indent_stack.last().unwrap();
                        if dist > top {
                            toks.push(Token::new(TokenKind::INDENT, cur.byte_offset(i), cur.byte_offset(p), line_num, None));
                            indent_stack.push(dist);
                        } else {
                            while dist < *indent_stack.last().unwrap() {
                                indent_stack.pop();
                                toks.push(Token::new(TokenKind::DEDENT, cur.byte_offset(i), cur.byte_offset(p), line_num, None));
                            }
                        }
                    }
                    i = p;
                }
            } else {
                i = p;
            }
        } else if c == '\n' {
            if level == 0 && !line_start && toks.last().map_or(true, |t| t.kind != TokenKind::NEWLINE) {
                let off = cur.byte_offset(i);
                toks.push(Token::new(TokenKind::NEWLINE, off, off + 1, line_num, Some("\n".to_string())));
            }
            line_num += 1;
            if level == 0 {
                line_start = true;
            }
            i += 1;
        } else if line_start {
            line_start = false;
            while *indent_stack.last().unwrap() > 0 {
                indent_stack.pop();
                let off = cur.byte_offset(i);
                toks.push(Token::new(TokenKind::DEDENT, off, off, line_num, None));
            }
        } else if c == '\\' && cur.at(i + 1) == Some('\n') {
            line_num += 1;
            i += 2;
        } else if c == '#' {
            let mut p = i;
            while p < n && cur.at(p) != Some('\n') {
                p += 1;
            }
            i = p;
        } else if c.is_ascii_digit() || (c == '.' && cur.at(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let mut p = i;
            if c == '0' && matches!(cur.at(i + 1), Some('x') | Some('X') | Some('b') | Some('B') | Some('o') | Some('O')) {
                p = i + 2;
                match cur.at(i + 1).unwrap() {
                    'x' | 'X' => while p < n && cur.at(p).unwrap().is_ascii_hexdigit() { p += 1 },
                    'b' | 'B' => while p < n && matches!(cur.at(p), Some('0') | Some('1')) { p += 1 },
                    'o' | 'O' => while p < n && matches!(cur.at(p), Some(d) if ('0'..='7').contains(&d)) { p += 1 },
                    _ => unreachable!(),
                }
            } else {
                while p < n && cur.at(p).unwrap().is_ascii_digit() {
                    p += 1;
                }
                if cur.at(p) == Some('.') {
                    p += 1;
                    while p < n && cur.at(p).unwrap().is_ascii_digit() {
                        p += 1;
                    }
                }
                if matches!(cur.at(p), Some('e') | Some('E')) {
                    p += 1;
                    if matches!(cur.at(p), Some('+') | Some('-')) {
                        p += 1;
                    }
                    if !cur.at(p).is_some_and(|d| d.is_ascii_digit()) {
                        return Err(err(TokenizeErrorKind::InvalidExponent, cur.byte_offset(p), line_num));
                    }
                    while p < n && cur.at(p).unwrap().is_ascii_digit() {
                        p += 1;
                    }
                }
                if matches!(cur.at(p), Some('j') | Some('J')) {
                    p += 1;
                }
            }
            toks.push(Token::new(TokenKind::NUMBER, cur.byte_offset(i), cur.byte_offset(p), line_num, Some(cur.slice(i, p).to_string())));
            i = p;
        } else if let Some(op_len) = operator_len_at(&cur, i, n) {
            let spelling = cur.slice(i, i + op_len);
            let kind = lookup_operator(spelling).expect("operator_len_at only reports matched spellings");
            toks.push(Token::new(kind, cur.byte_offset(i), cur.byte_offset(i + op_len), line_num, Some(spelling.to_string())));
            if op_len == 1 {
                match spelling {
                    "(" | "[" | "{" => level += 1,
                    ")" | "]" | "}" => level -= 1,
                    _ => {}
                }
            }
            i += op_len;
        } else if let Some(start_tok) = string_prefix_at(cur.text, cur.byte_offset(i)) {
            let quote = closing_quote(start_tok);
            let start_len_chars = start_tok.chars().count();
            let mut p = i + start_len_chars;

            if quote.len() == 1 {
                let q = quote.chars().next().unwrap();
                while p < n && cur.at(p) != Some('\n') && cur.at(p) != Some(q) {
                    p += 1;
                }
                if cur.at(p) == Some('\n') {
                    return Err(err(TokenizeErrorKind::UnterminatedString, cur.byte_offset(p), line_num));
                }
            } else {
                loop {
                    if p >= n {
                        return Err(err(TokenizeErrorKind::UnterminatedTripleString, cur.byte_offset(p), line_num));
                    }
                    if cur.slice(p, n).starts_with(quote) {
                        break;
                    }
                    if cur.at(p) == Some('\n') {
                        line_num += 1;
                    }
                    p += 1;
                }
            }
            p += quote.chars().count();
            toks.push(Token::new(TokenKind::STRING, cur.byte_offset(i), cur.byte_offset(p), line_num, Some(cur.slice(i, p).to_string())));
            i = p;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut p = i;
            while p < n && cur.at(p).is_some_and(|d| d.is_ascii_alphanumeric() || d == '_') {
                p += 1;
            }
            toks.push(Token::new(TokenKind::NAME, cur.byte_offset(i), cur.byte_offset(p), line_num, Some(cur.slice(i, p).to_string())));
            i = p;
        } else {
            return Err(err(TokenizeErrorKind::UnknownToken, cur.byte_offset(i), line_num));
        }
    }

    while *indent_stack.last().unwrap() > 0 {
        indent_stack.pop();
        let off = cur.byte_offset(i);
        toks.push(Token::new(TokenKind::DEDENT, off, off, line_num, None));
    }
    let off = cur.byte_offset(i);
    toks.push(Token::new(TokenKind::ENDMARKER, off, off, line_num, None));

    log::trace!("produced {} tokens, final bracket level {}", toks.len(), level);
    Ok(toks)
}

/// Longest matching operator spelling (3, then 2, then 1 characters) at
/// character position `i`, or `None` if nothing matches.
fn operator_len_at(cur: &Cursor, i: usize, n: usize) -> Option<usize> {
    for len in [3usize, 2, 1] {
        if i + len <= n {
            let spelling = cur.slice(i, i + len);
            if lookup_operator(spelling).is_some() {
                return Some(len);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    fn kinds(toks: &[Token]) -> Vec<TokenKind> {
        toks.iter().map(|t| t.kind).collect()
    }

    /// Render a token stream as one `KIND("text")` line per token, for
    /// snapshot comparison.
    fn check_tokenize(input: &str, expect: Expect) {
        let toks = tokenize_str(input).unwrap();
        let rendered: String = toks.iter().map(|t| format!("{:?}({:?})\n", t.kind, t.text())).collect();
        expect.assert_eq(&rendered);
    }

    #[test]
    fn scenario_simple_assignment() {
        let toks = tokenize_str("a=1\n").unwrap();
        assert_eq!(kinds(&toks), vec![TokenKind::NAME, TokenKind::EQUAL, TokenKind::NUMBER, TokenKind::NEWLINE, TokenKind::ENDMARKER]);
        assert_eq!(toks[0].text(), "a");
        assert_eq!(toks[2].text(), "1");
    }

    #[test]
    fn scenario_def_with_indent() {
        let toks = tokenize_str("def f():\n    pass\n").unwrap();
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::NAME,
                TokenKind::NAME,
                TokenKind::LPAR,
                TokenKind::RPAR,
                TokenKind::COLON,
                TokenKind::NEWLINE,
                TokenKind::INDENT,
                TokenKind::NAME,
                TokenKind::NEWLINE,
                TokenKind::DEDENT,
                TokenKind::ENDMARKER,
            ]
        );
        assert_eq!(toks[0].text(), "def");
        assert_eq!(toks[1].text(), "f");
    }

    #[test]
    fn scenario_bracket_suppresses_newline() {
        let toks = tokenize_str("(1,\n 2)\n").unwrap();
        assert_eq!(
            kinds(&toks),
            vec![
                TokenKind::LPAR,
                TokenKind::NUMBER,
                TokenKind::COMMA,
                TokenKind::NUMBER,
                TokenKind::RPAR,
                TokenKind::NEWLINE,
                TokenKind::ENDMARKER,
            ]
        );
    }

    #[test]
    fn scenario_numeric_bases() {
        let toks = tokenize_str("0x1F + 0b10\n").unwrap();
        assert_eq!(toks[0].kind, TokenKind::NUMBER);
        assert_eq!(toks[0].text(), "0x1F");
        assert_eq!(toks[1].kind, TokenKind::PLUS);
        assert_eq!(toks[2].text(), "0b10");
    }

    #[test]
    fn scenario_string_literal_keeps_quotes() {
        let toks = tokenize_str("'hello'\n").unwrap();
        assert_eq!(toks[0].kind, TokenKind::STRING);
        assert_eq!(toks[0].text(), "'hello'");
    }

    #[test]
    fn maximal_munch_on_operators() {
        let toks = tokenize_str("a <<= b\n").unwrap();
        assert_eq!(toks[1].kind, TokenKind::LEFTSHIFTEQUAL);
        assert_eq!(toks[1].text(), "<<=");
    }

    #[test]
    fn unterminated_single_quoted_string_is_an_error() {
        let err = tokenize_str("'abc\n").unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnterminatedString);
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let toks = tokenize_str("'''a\nb'''\n").unwrap();
        assert_eq!(toks[0].kind, TokenKind::STRING);
        assert_eq!(toks[0].text(), "'''a\nb'''");
        assert_eq!(toks[1].kind, TokenKind::NEWLINE);
    }

    #[test]
    fn dedent_count_matches_indent_count() {
        let toks = tokenize_str("if x:\n    if y:\n        pass\n").unwrap();
        let indents = toks.iter().filter(|t| t.kind == TokenKind::INDENT).count();
        let dedents = toks.iter().filter(|t| t.kind == TokenKind::DEDENT).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
        assert_eq!(toks.last().unwrap().kind, TokenKind::ENDMARKER);
    }

    #[test]
    fn offsets_are_ordered_and_lines_non_decreasing() {
        let toks = tokenize_str("a = 1\nb = 2\n").unwrap();
        let mut last_line: i64 = 0;
        for t in &toks {
            assert!(t.start <= t.end);
            assert!(t.line as i64 >= last_line);
            last_line = t.line as i64;
        }
    }

    #[test]
    fn utf8_bom_is_stripped_and_tokenizes_normally() {
        let mut bytes = BOM_UTF8.to_vec();
        bytes.extend_from_slice(b"a=1\n");
        let toks = tokenize(&bytes).unwrap();
        assert_eq!(toks[0].text(), "a");
    }

    #[test]
    fn bom_and_disagreeing_magic_comment_is_an_error() {
        let mut bytes = BOM_UTF8.to_vec();
        bytes.extend_from_slice(b"# -*- coding: utf16 -*-\npass\n");
        let err = tokenize(&bytes).unwrap_err();
        assert!(matches!(err.kind, TokenizeErrorKind::Encoding(EncodingError::BomMismatch { .. })));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = tokenize_str("$\n").unwrap_err();
        assert_eq!(err.kind, TokenizeErrorKind::UnknownToken);
    }

    #[test]
    fn scenario_def_with_indent_snapshot() {
        check_tokenize(
            "def f():\n    pass\n",
            expect![[r#"
                NAME("def")
                NAME("f")
                LPAR("(")
                RPAR(")")
                COLON(":")
                NEWLINE("\n")
                INDENT("")
                NAME("pass")
                NEWLINE("\n")
                DEDENT("")
                ENDMARKER("")
            "#]],
        );
    }
}
