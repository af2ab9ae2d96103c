//! Lexer for preprocessed C using logos.
//!
//! Produces a flat token list plus the [`SourceMap`] built from the line
//! markers found along the way. Directives are consumed whole: line
//! markers feed the map, everything else (`#pragma`, or `#define` in
//! headers parsed without a preprocessor) is dropped.


use logos::Logos;

use crate::keywords::{self, Keyword};
use crate::source_map::{parse_line_marker, SourceMap};
use crate::ParseError;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f\x0B]+")]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[token("\n")]
    Newline,

    #[regex(r"\\[ \t]*\r?\n")]
    LineContinuation,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[regex(r"(0[xX][0-9a-fA-F]+|0[bB][01]+|[0-9]+)[uUlLzZ]*")]
    Int,

    #[regex(r"([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFlL]?")]
    #[regex(r"0[xX]([0-9a-fA-F]+\.?[0-9a-fA-F]*|\.[0-9a-fA-F]+)[pP][+-]?[0-9]+[fFlL]?")]
    Float,

    #[regex(r"(u8|[LuU])?'([^'\\\n]|\\[^\n])+'")]
    Char,

    #[regex(r#"(u8|[LuU])?"([^"\\\n]|\\[^\n])*""#)]
    Str,

    #[token("#")]
    Hash,
    #[token("##")]
    HashHash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("^")]
    Caret,
    #[token("|")]
    Pipe,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("=")]
    Eq,
    #[regex(r"(\*|/|%|\+|-|<<|>>|&|\^|\|)=")]
    CompoundAssign,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
}

/// Skip to the closing `*/`. An unterminated comment is a lex error.
fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// Byte range of a token.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct Span {
    pub(crate) start: u32,
    pub(crate) end: u32,
}

impl Span {
    fn from_range(range: std::ops::Range<usize>) -> Self {
        Span {
            start: to_u32(range.start),
            end: to_u32(range.end),
        }
    }
}

/// An integer literal with its C type flags.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct IntLit {
    pub(crate) value: u64,
    pub(crate) unsigned: bool,
    /// Number of `l` suffixes (0, 1 or 2).
    pub(crate) longs: u8,
    /// Written in hex, octal or binary, which lets the literal take an
    /// unsigned type when it does not fit the signed one.
    pub(crate) non_decimal: bool,
}

/// Cooked token kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum TokenKind {
    Ident,
    Keyword(Keyword),
    Int(IntLit),
    Float,
    /// Character literal value; `plain` for unprefixed `'c'`.
    Char {
        value: u32,
        plain: bool,
    },
    /// String literal; the payload is the decoded length in code units.
    Str(u64),
    HashHash,
    Hash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Colon,
    Question,
    Dot,
    Ellipsis,
    Arrow,
    Star,
    Amp,
    Plus,
    Minus,
    Tilde,
    Bang,
    Slash,
    Percent,
    Shl,
    Shr,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    Caret,
    Pipe,
    AmpAmp,
    PipePipe,
    Eq,
    CompoundAssign,
    PlusPlus,
    MinusMinus,
    Eof,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) span: Span,
}

/// Tokens of one source text, ending in [`TokenKind::Eof`].
pub(crate) struct TokenList {
    pub(crate) tokens: Vec<Token>,
    pub(crate) map: SourceMap,
}

/// Tokenize `source`.
#[tracing::instrument(level = "debug", skip_all, fields(file = file, bytes = source.len()))]
pub(crate) fn lex(source: &str, file: &str) -> Result<TokenList, ParseError> {
    let mut tokens = Vec::new();
    let mut map = SourceMap::new(file, source);
    let mut logos = RawToken::lexer(source);
    let mut at_line_start = true;

    while let Some(token_result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();

        let raw = match token_result {
            Ok(raw) => raw,
            Err(()) => {
                let loc = map.locate(source, span.start);
                let message = if slice.starts_with("/*") {
                    "unterminated comment".to_owned()
                } else {
                    format!("invalid character `{}`", slice.escape_debug())
                };
                return Err(ParseError {
                    file: loc.file,
                    line: loc.line,
                    col: loc.col,
                    message,
                });
            }
        };

        let kind = match raw {
            RawToken::LineComment | RawToken::BlockComment | RawToken::LineContinuation => {
                continue;
            }
            RawToken::Newline => {
                at_line_start = true;
                continue;
            }
            RawToken::Hash if at_line_start => {
                let len = directive_len(logos.remainder());
                logos.bump(len);
                let directive = &source[span.start as usize..logos.span().end];
                if let Some((line, marker_file)) = parse_line_marker(directive) {
                    map.add_marker(span.start, marker_file, line);
                }
                continue;
            }
            _ => match cook(raw, slice) {
                Ok(kind) => kind,
                Err(message) => {
                    let loc = map.locate(source, span.start);
                    return Err(ParseError {
                        file: loc.file,
                        line: loc.line,
                        col: loc.col,
                        message,
                    });
                }
            },
        };
        at_line_start = false;
        tokens.push(Token { kind, span });
    }

    let eof = to_u32(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span {
            start: eof,
            end: eof,
        },
    });
    tracing::debug!(tokens = tokens.len(), "lexed");
    Ok(TokenList { tokens, map })
}

/// Length of the rest of a directive line, honouring backslash continuations.
fn directive_len(rest: &str) -> usize {
    let mut from = 0;
    while let Some(nl) = rest[from..].find('\n') {
        let end = from + nl;
        let continued = rest[..end].trim_end_matches([' ', '\t', '\r']).ends_with('\\');
        if !continued {
            return end;
        }
        from = end + 1;
    }
    rest.len()
}

/// Convert a raw token to a `TokenKind`, decoding literals.
fn cook(raw: RawToken, slice: &str) -> Result<TokenKind, String> {
    let kind = match raw {
        RawToken::Ident => match keywords::lookup(slice) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident,
        },
        RawToken::Int => TokenKind::Int(parse_int(slice)?),
        RawToken::Float => TokenKind::Float,
        RawToken::Char => {
            let plain = slice.starts_with('\'');
            let body = &slice[slice.find('\'').unwrap_or(0) + 1..slice.len() - 1];
            let units = unescape(body)?;
            let value = if plain {
                // Multi-character constants pack bytes big-endian, as GCC does.
                units.iter().fold(0u32, |acc, unit| (acc << 8) | (unit & 0xff))
            } else {
                units.first().copied().unwrap_or(0)
            };
            TokenKind::Char { value, plain }
        }
        RawToken::Str => {
            let body = &slice[slice.find('"').unwrap_or(0) + 1..slice.len() - 1];
            TokenKind::Str(unescape(body)?.len() as u64)
        }
        RawToken::Hash => TokenKind::Hash,
        RawToken::HashHash => TokenKind::HashHash,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Question => TokenKind::Question,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Ellipsis => TokenKind::Ellipsis,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Star => TokenKind::Star,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Tilde => TokenKind::Tilde,
        RawToken::Bang => TokenKind::Bang,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::Eq => TokenKind::Eq,
        RawToken::CompoundAssign => TokenKind::CompoundAssign,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::LineComment
        | RawToken::BlockComment
        | RawToken::Newline
        | RawToken::LineContinuation => unreachable!("trivia is filtered before cooking"),
    };
    Ok(kind)
}

fn parse_int(slice: &str) -> Result<IntLit, String> {
    let digits_end = slice
        .find(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L' | 'z' | 'Z'))
        .unwrap_or(slice.len());
    let (digits, suffix) = slice.split_at(digits_end);
    let unsigned = suffix.contains(['u', 'U']);
    let longs = suffix.chars().filter(|c| matches!(c, 'l' | 'L')).count();
    if longs > 2 || suffix.chars().filter(|c| matches!(c, 'u' | 'U')).count() > 1 {
        return Err(format!("invalid suffix `{suffix}` on integer constant"));
    }

    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or(digits.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b").or(digits.strip_prefix("0B")) {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    let value = u64::from_str_radix(body, radix).map_err(|err| match err.kind() {
        std::num::IntErrorKind::PosOverflow => {
            format!("integer literal `{slice}` is too large")
        }
        _ => format!("invalid digit in integer literal `{slice}`"),
    })?;

    #[expect(clippy::cast_possible_truncation, reason = "at most two `l` suffixes")]
    let longs = longs as u8;
    Ok(IntLit {
        value,
        unsigned,
        longs,
        non_decimal: radix != 10,
    })
}

/// Decode the escape sequences of a literal body into code units.
fn unescape(body: &str) -> Result<Vec<u32>, String> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(u32::from(c));
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err("unterminated escape sequence".to_owned());
        };
        let unit = match escape {
            'n' => 0x0a,
            't' => 0x09,
            'r' => 0x0d,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            'e' | 'E' => 0x1b,
            '\\' | '\'' | '"' | '?' => u32::from(escape),
            'x' => {
                let mut value = 0u32;
                let mut seen = false;
                while let Some(digit) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(digit);
                    seen = true;
                    chars.next();
                }
                if !seen {
                    return Err("\\x used with no following hex digits".to_owned());
                }
                value
            }
            'u' | 'U' => {
                let len = if escape == 'u' { 4 } else { 8 };
                let mut value = 0u32;
                for _ in 0..len {
                    let digit = chars
                        .next()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| "incomplete universal character name".to_owned())?;
                    value = value * 16 + digit;
                }
                value
            }
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                value
            }
            other => return Err(format!("unknown escape sequence `\\{other}`")),
        };
        out.push(unit);
    }
    Ok(out)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "headers larger than 4 GiB are not supported"
)]
fn to_u32(n: usize) -> u32 {
    n as u32
}
