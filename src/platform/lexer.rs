//! Minimal JavaScript tokenizer for player script regions
//!
//! Only understands enough of the language to walk small, already isolated
//! code regions: identifiers, numbers, string literals, punctuation and
//! operators. Comments and whitespace are skipped.

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Punct,
}

/// A token borrowing its text from the source region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Numeric value of a decimal number token
    pub fn as_number(&self) -> Option<usize> {
        if self.kind == TokenKind::Number {
            self.text.parse().ok()
        } else {
            None
        }
    }

    /// String literal contents without the surrounding quotes
    pub fn str_value(&self) -> Option<&'a str> {
        if self.kind == TokenKind::Str && self.text.len() >= 2 {
            Some(&self.text[1..self.text.len() - 1])
        } else {
            None
        }
    }
}

const OPERATORS: [&str; 22] = [
    ">>>=", "===", "!==", ">>>", "<<=", ">>=", "==", "!=", "<=", ">=", "&&", "||", "=>", "++",
    "--", "+=", "-=", "*=", "/=", "%=", "<<", ">>",
];

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Tokenize a source region
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let Some(c) = src[pos..].chars().next() else {
            break;
        };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        if src[pos..].starts_with("//") {
            pos = src[pos..].find('\n').map_or(src.len(), |i| pos + i + 1);
            continue;
        }
        if src[pos..].starts_with("/*") {
            pos = src[pos + 2..].find("*/").map_or(src.len(), |i| pos + 2 + i + 2);
            continue;
        }

        let start = pos;
        let kind = if is_ident_start(c) {
            pos = scan_while(src, pos, is_ident_char);
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            // covers 0x1F, 1e3 and 1.5 loosely
            pos = scan_while(src, pos, |ch| ch.is_ascii_alphanumeric() || ch == '.');
            TokenKind::Number
        } else if c == '"' || c == '\'' || c == '`' {
            pos = skip_string(bytes, pos);
            TokenKind::Str
        } else {
            let len = OPERATORS
                .iter()
                .find(|op| src[pos..].starts_with(**op))
                .map_or(c.len_utf8(), |op| op.len());
            pos += len;
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            text: &src[start..pos],
        });
    }

    tokens
}

fn scan_while(src: &str, start: usize, pred: impl Fn(char) -> bool) -> usize {
    src[start..]
        .char_indices()
        .find(|(_, ch)| !pred(*ch))
        .map_or(src.len(), |(i, _)| start + i)
}

/// Return the index just past the closing quote of the string at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Cut out the `{ ... }` region opening at byte `open`, braces included.
///
/// String literals and comments are skipped while counting. Returns `None`
/// when `open` is not a brace or the region never closes.
pub fn extract_balanced(src: &str, open: usize) -> Option<&str> {
    let bytes = src.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = src[i..].find('\n').map_or(bytes.len(), |n| i + n);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = src[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return src.get(open..=i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Split a token slice on a separator at bracket depth zero
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>], sep: &str) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Punct {
            continue;
        }
        match tok.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            t if t == sep && depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }

    parts
}
