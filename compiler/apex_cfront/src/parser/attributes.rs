//! GNU `__attribute__`, MSVC `__declspec` and C23 `[[...]]` attributes.
//!
//! Only attributes that change layout are interpreted: `packed`,
//! `aligned`, and `mode`. Everything else is skipped by bracket matching.

use super::{PResult, Parser};
use crate::keywords::Keyword;
use crate::lexer::TokenKind;

/// Layout-relevant attributes collected from one position.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub(super) struct Attrs {
    pub(super) packed: bool,
    pub(super) align: Option<u64>,
    /// Integer width in bytes requested by `mode(...)`.
    pub(super) mode: Option<u64>,
}

impl Attrs {
    /// Alignment attributes only ever raise alignment.
    pub(super) fn raise_align(&mut self, align: u64) {
        self.align = Some(self.align.map_or(align, |current| current.max(align)));
    }

    pub(super) fn merge(&mut self, other: Attrs) {
        self.packed |= other.packed;
        if let Some(align) = other.align {
            self.raise_align(align);
        }
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }
}

/// `__packed__` -> `packed`
fn normalize(name: &str) -> &str {
    let name = name.strip_prefix("__").unwrap_or(name);
    name.strip_suffix("__").unwrap_or(name)
}

impl Parser<'_> {
    fn at_attribute(&self) -> bool {
        match self.peek() {
            TokenKind::Keyword(Keyword::Attribute | Keyword::Declspec) => true,
            TokenKind::LBracket => self.peek_at(1) == TokenKind::LBracket,
            _ => false,
        }
    }

    /// Parse any run of attributes at the cursor.
    pub(super) fn attributes(&mut self, attrs: &mut Attrs) -> PResult<()> {
        while self.at_attribute() {
            match self.advance().kind {
                TokenKind::Keyword(Keyword::Attribute) => self.gnu_attribute_list(attrs)?,
                TokenKind::Keyword(Keyword::Declspec) => self.declspec(attrs)?,
                _ => {
                    // `[[`: the first bracket is already consumed.
                    self.skip_balanced()?;
                    self.expect(TokenKind::RBracket, "`]]` to close attribute")?;
                }
            }
        }
        Ok(())
    }

    /// Attributes and `asm` labels that may follow a declarator.
    pub(super) fn trailing_attributes(&mut self, attrs: &mut Attrs) -> PResult<()> {
        loop {
            if self.check_keyword(Keyword::Asm) {
                self.advance();
                if !self.check(TokenKind::LParen) {
                    return Err(self.error("expected `(` after `asm`"));
                }
                self.skip_balanced()?;
            } else if self.at_attribute() {
                self.attributes(attrs)?;
            } else {
                return Ok(());
            }
        }
    }

    fn gnu_attribute_list(&mut self, attrs: &mut Attrs) -> PResult<()> {
        self.expect(TokenKind::LParen, "`((` after `__attribute__`")?;
        self.expect(TokenKind::LParen, "`((` after `__attribute__`")?;
        loop {
            if self.eat(TokenKind::RParen) {
                break;
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            let token = self.advance();
            if !matches!(token.kind, TokenKind::Ident | TokenKind::Keyword(_)) {
                return Err(self.error_at(token.span, "expected an attribute name"));
            }
            match normalize(self.text(token)) {
                "packed" => attrs.packed = true,
                "aligned" => {
                    if self.eat(TokenKind::LParen) {
                        let align = self.alignment_value()?;
                        self.expect(TokenKind::RParen, "`)` after alignment")?;
                        attrs.raise_align(align);
                    } else {
                        attrs.raise_align(self.target.max_align());
                    }
                }
                "mode" => {
                    self.expect(TokenKind::LParen, "`(` after `mode`")?;
                    let (mode, _) = self.expect_ident("a machine mode")?;
                    self.expect(TokenKind::RParen, "`)` after machine mode")?;
                    attrs.mode = self.mode_size(normalize(&mode));
                }
                _ => {
                    if self.check(TokenKind::LParen) {
                        self.skip_balanced()?;
                    }
                }
            }
        }
        self.expect(TokenKind::RParen, "`))` to close `__attribute__`")?;
        Ok(())
    }

    fn declspec(&mut self, attrs: &mut Attrs) -> PResult<()> {
        self.expect(TokenKind::LParen, "`(` after `__declspec`")?;
        while !self.eat(TokenKind::RParen) {
            let token = self.advance();
            match token.kind {
                TokenKind::Ident if self.text(token) == "align" => {
                    self.expect(TokenKind::LParen, "`(` after `align`")?;
                    let align = self.alignment_value()?;
                    self.expect(TokenKind::RParen, "`)` after alignment")?;
                    attrs.raise_align(align);
                }
                TokenKind::Eof => return Err(self.error("expected `)` to close `__declspec`")),
                _ => {
                    if self.check(TokenKind::LParen) {
                        self.skip_balanced()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A constant expression that must be a positive power of two.
    pub(super) fn alignment_value(&mut self) -> PResult<u64> {
        let span = self.current_span();
        let value = self.constant_expression()?.value;
        match u64::try_from(value) {
            Ok(align) if align.is_power_of_two() => Ok(align),
            _ => Err(self.error_at(span, "requested alignment is not a positive power of 2")),
        }
    }

    fn mode_size(&self, mode: &str) -> Option<u64> {
        match mode {
            "QI" | "byte" => Some(1),
            "HI" => Some(2),
            "SI" => Some(4),
            "DI" => Some(8),
            "TI" => Some(16),
            "word" | "pointer" => Some(self.target.pointer_size()),
            _ => None,
        }
    }
}
