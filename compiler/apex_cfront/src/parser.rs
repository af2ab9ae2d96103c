//! Recursive-descent parser for C declarations.
//!
//! Only what shapes types is modelled: typedefs, tag definitions, record
//! members, and the declarators of variables and functions. Function
//! bodies, initializers and `asm` blocks are skipped by bracket matching.
//!
//! # Module Structure
//!
//! - `specifiers`: declaration specifiers and builtin type resolution
//! - `declarator`: pointers, arrays, parameter lists, type names
//! - `record`: struct, union and enum bodies, with layout
//! - `attributes`: `__attribute__`, `__declspec`, `[[...]]`
//! - `expr`: integer constant expressions

mod attributes;
mod declarator;
mod expr;
mod record;
mod specifiers;


use apex_ir::{DeclId, DeclKind, RecordKind, TranslationUnit, TypeData, TypeRef, UnitBuilder};
use rustc_hash::FxHashMap;

use crate::keywords::Keyword;
use crate::lexer::{Span, Token, TokenKind};
use crate::source_map::SourceMap;
use crate::{ParseError, Target};

use self::expr::Const;

pub(crate) type PResult<T> = Result<T, ParseError>;

/// A tag in the single struct/union/enum namespace.
#[derive(Copy, Clone, Debug)]
enum Tag {
    Record { ty: TypeRef, kind: RecordKind },
    Enum { ty: TypeRef, defined: bool },
}

/// A laid-out member, kept for `__builtin_offsetof`.
#[derive(Clone, Debug)]
struct FieldSlot {
    name: String,
    offset_bits: u64,
    bit_field: bool,
    ty: TypeRef,
}

/// Names visible at file scope.
#[derive(Default)]
struct Scope {
    typedefs: FxHashMap<String, TypeRef>,
    tags: FxHashMap<String, Tag>,
    constants: FxHashMap<String, Const>,
    fields: FxHashMap<TypeRef, Vec<FieldSlot>>,
}

/// Parser state.
pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    map: &'a SourceMap,
    target: &'a Target,
    pos: usize,
    unit: UnitBuilder,
    scope: Scope,
    /// Declaration that new tags and fields attach to.
    parent: DeclId,
    /// Nesting depth of parameter lists.
    in_params: u32,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        source: &'a str,
        tokens: &'a [Token],
        map: &'a SourceMap,
        target: &'a Target,
    ) -> Self {
        let unit = UnitBuilder::new();
        let parent = unit.root();
        Parser {
            source,
            tokens,
            map,
            target,
            pos: 0,
            unit,
            scope: Scope::default(),
            parent,
            in_params: 0,
        }
    }

    /// Parse every external declaration and freeze the unit.
    pub(crate) fn parse_translation_unit(mut self) -> PResult<TranslationUnit> {
        while !self.at_eof() {
            self.external_declaration()?;
        }
        tracing::debug!(
            typedefs = self.scope.typedefs.len(),
            tags = self.scope.tags.len(),
            "parsed translation unit"
        );
        Ok(self.unit.finish())
    }

    fn external_declaration(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Semi => {
                self.advance();
                return Ok(());
            }
            TokenKind::Keyword(Keyword::StaticAssert) => return self.skip_static_assert(),
            TokenKind::Keyword(Keyword::Asm) => {
                self.advance();
                self.skip_balanced()?;
                self.expect(TokenKind::Semi, "`;` after top-level asm")?;
                return Ok(());
            }
            _ => {}
        }

        let spec = self.declaration_specifiers()?;
        if self.eat(TokenKind::Semi) {
            return Ok(());
        }

        loop {
            let mut decl = self.declarator(false)?;
            self.trailing_attributes(&mut decl.attrs)?;
            let Some((name, _)) = decl.name.clone() else {
                return Err(self.error("expected an identifier in declaration"));
            };
            let ty = self.apply_declarator(spec.ty, &decl)?;
            let ty = self.apply_mode(ty, spec.attrs.mode.or(decl.attrs.mode));

            if spec.storage.contains(specifiers::Storage::TYPEDEF) {
                let align = decl.attrs.align.or(spec.attrs.align);
                self.define_typedef(&name, ty, align);
            } else if self.is_function(ty) {
                let id = self.unit.add_decl(self.parent, DeclKind::FunctionDecl, &name);
                self.unit.set_decl_type(id, ty);
                if !matches!(
                    self.peek(),
                    TokenKind::Comma | TokenKind::Semi | TokenKind::Eq
                ) {
                    // Function definition, possibly with K&R parameter declarations.
                    while !self.check(TokenKind::LBrace) {
                        if self.at_eof() {
                            return Err(self.error("expected a function body"));
                        }
                        self.skip_token()?;
                    }
                    self.skip_balanced()?;
                    return Ok(());
                }
            } else {
                let id = self.unit.add_decl(self.parent, DeclKind::VarDecl, &name);
                self.unit.set_decl_type(id, ty);
                if self.eat(TokenKind::Eq) {
                    self.skip_initializer()?;
                }
            }

            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::Semi, "`;` after declaration")?;
            return Ok(());
        }
    }

    fn define_typedef(&mut self, name: &str, ty: TypeRef, align: Option<u64>) {
        let id = self.unit.add_decl(self.parent, DeclKind::TypedefDecl, name);
        let alias = self.unit.typedef(id, name, ty, align);
        self.unit.set_decl_type(id, alias);
        self.scope.typedefs.insert(name.to_owned(), alias);
    }

    // --- type queries over the unit under construction ---

    /// Strip typedefs and elaborated wrappers.
    fn shape(&self, mut ty: TypeRef) -> TypeRef {
        loop {
            match self.unit.type_data(ty) {
                TypeData::Typedef { underlying, .. } => ty = *underlying,
                TypeData::Elaborated { named } => ty = *named,
                _ => return ty,
            }
        }
    }

    fn is_function(&self, ty: TypeRef) -> bool {
        matches!(
            self.unit.type_data(self.shape(ty)),
            TypeData::Function { .. }
        )
    }

    /// Whether values of `ty` convert as unsigned in constant expressions.
    fn is_unsigned(&self, ty: TypeRef) -> bool {
        match self.unit.type_data(self.shape(ty)) {
            TypeData::Builtin { name, .. } => {
                name.starts_with("unsigned")
                    || name == "_Bool"
                    || (name == "char" && !self.target.char_signed)
            }
            TypeData::Pointer { .. } => true,
            _ => false,
        }
    }

    // --- cursor ---

    #[inline]
    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    /// Kind of the token `n` ahead; [`TokenKind::Eof`] past the end.
    #[inline]
    fn peek_at(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    #[inline]
    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    #[inline]
    fn at_eof(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    /// Consume the current token. Never moves past EOF.
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    #[inline]
    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek() == TokenKind::Keyword(keyword)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    /// Source text of a token.
    fn text(&self, token: Token) -> &'a str {
        &self.source[token.span.start as usize..token.span.end as usize]
    }

    fn expect_ident(&mut self, what: &str) -> PResult<(String, Span)> {
        let token = self.expect(TokenKind::Ident, what)?;
        Ok((self.text(token).to_owned(), token.span))
    }

    fn error(&self, message: &str) -> ParseError {
        let found = if self.at_eof() {
            "end of input".to_owned()
        } else {
            format!("`{}`", self.text(self.tokens[self.pos]))
        };
        self.error_at(self.current_span(), &format!("{message}, found {found}"))
    }

    fn error_at(&self, span: Span, message: &str) -> ParseError {
        let loc = self.map.locate(self.source, span.start);
        ParseError {
            file: loc.file,
            line: loc.line,
            col: loc.col,
            message: message.to_owned(),
        }
    }

    // --- skipping ---

    /// Skip one token, or a whole bracketed group if it opens one.
    fn skip_token(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.skip_balanced(),
            _ => {
                self.advance();
                Ok(())
            }
        }
    }

    /// Skip from an opening bracket to its matching closer, inclusive.
    fn skip_balanced(&mut self) -> PResult<()> {
        let open = self.current_span();
        let mut stack: Vec<TokenKind> = Vec::new();
        loop {
            let kind = self.peek();
            match kind {
                TokenKind::LParen => stack.push(TokenKind::RParen),
                TokenKind::LBracket => stack.push(TokenKind::RBracket),
                TokenKind::LBrace => stack.push(TokenKind::RBrace),
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if stack.pop() != Some(kind) {
                        return Err(self.error("mismatched bracket"));
                    }
                }
                TokenKind::Eof => return Err(self.error_at(open, "unbalanced bracket")),
                _ => {}
            }
            self.advance();
            if stack.is_empty() {
                return Ok(());
            }
        }
    }

    /// Skip an initializer up to the `,` or `;` that ends it.
    fn skip_initializer(&mut self) -> PResult<()> {
        while !matches!(self.peek(), TokenKind::Comma | TokenKind::Semi) {
            if self.at_eof() {
                return Err(self.error("expected `;` after initializer"));
            }
            self.skip_token()?;
        }
        Ok(())
    }

    fn skip_static_assert(&mut self) -> PResult<()> {
        self.advance();
        if !self.check(TokenKind::LParen) {
            return Err(self.error("expected `(` after `_Static_assert`"));
        }
        self.skip_balanced()?;
        self.expect(TokenKind::Semi, "`;` after `_Static_assert`")?;
        Ok(())
    }
}
