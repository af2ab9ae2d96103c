//! Declarators, parameter lists and type names.
//!
//! A declarator is parsed into a small tree first and applied to the base
//! type afterwards: pointers wrap the base, then suffixes apply from the
//! rightmost inward, then a parenthesized inner declarator wraps the
//! result. That reproduces C's inside-out reading of `int (*f(int))[3]`.

use apex_ir::{Qualifiers, TypeData, TypeRef};
use smallvec::SmallVec;

use super::attributes::Attrs;
use super::{PResult, Parser};
use crate::keywords::Keyword;
use crate::lexer::{Span, TokenKind};
use crate::stack::ensure_sufficient_stack;
use crate::target::Scalar;

/// A parsed declarator before it is applied to a base type.
#[derive(Clone, Debug, Default)]
pub(super) struct Declarator {
    /// Declared name; hoisted out of nested declarators.
    pub(super) name: Option<(String, Span)>,
    /// Qualifiers of each `*`, outermost first.
    pointers: SmallVec<[Qualifiers; 2]>,
    suffixes: SmallVec<[Suffix; 2]>,
    inner: Option<Box<Declarator>>,
    pub(super) attrs: Attrs,
}

#[derive(Clone, Debug)]
enum Suffix {
    /// `[len]`, with the span of the bound for diagnostics.
    Array(Option<u64>, Span),
    Function {
        params: SmallVec<[TypeRef; 8]>,
        variadic: bool,
        prototyped: bool,
    },
}

impl Parser<'_> {
    /// Parse a declarator. With `abstract_ok` the name may be omitted, as in
    /// parameters and type names.
    pub(super) fn declarator(&mut self, abstract_ok: bool) -> PResult<Declarator> {
        ensure_sufficient_stack(|| self.declarator_inner(abstract_ok))
    }

    fn declarator_inner(&mut self, abstract_ok: bool) -> PResult<Declarator> {
        let mut decl = Declarator::default();
        self.attributes(&mut decl.attrs)?;

        while self.eat(TokenKind::Star) {
            let mut quals = Qualifiers::empty();
            loop {
                match self.peek() {
                    TokenKind::Keyword(Keyword::Const) => quals |= Qualifiers::CONST,
                    TokenKind::Keyword(Keyword::Volatile) => quals |= Qualifiers::VOLATILE,
                    TokenKind::Keyword(Keyword::Restrict) => quals |= Qualifiers::RESTRICT,
                    TokenKind::Keyword(Keyword::Atomic | Keyword::Nullability) => {}
                    TokenKind::Keyword(Keyword::Attribute | Keyword::Declspec) => {
                        self.attributes(&mut decl.attrs)?;
                        continue;
                    }
                    _ => break,
                }
                self.advance();
            }
            decl.pointers.push(quals);
        }

        match self.peek() {
            TokenKind::Ident => {
                let token = self.advance();
                decl.name = Some((self.text(token).to_owned(), token.span));
            }
            TokenKind::LParen if self.paren_starts_declarator(abstract_ok) => {
                self.advance();
                let mut inner = self.declarator(abstract_ok)?;
                self.expect(TokenKind::RParen, "`)` to close declarator")?;
                decl.name = inner.name.take();
                decl.attrs.merge(inner.attrs);
                decl.inner = Some(Box::new(inner));
            }
            _ if !abstract_ok => {
                return Err(self.error("expected an identifier or `(`"));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                TokenKind::LBracket if self.peek_at(1) != TokenKind::LBracket => {
                    let suffix = self.array_suffix()?;
                    decl.suffixes.push(suffix);
                }
                TokenKind::LParen => {
                    let suffix = self.parameter_list()?;
                    decl.suffixes.push(suffix);
                }
                _ => break,
            }
        }
        Ok(decl)
    }

    /// In an abstract declarator `(` may open either a nested declarator,
    /// `(*)(int)`, or a parameter list, `(int)`.
    fn paren_starts_declarator(&self, abstract_ok: bool) -> bool {
        if !abstract_ok {
            return true;
        }
        match self.peek_at(1) {
            TokenKind::Star | TokenKind::LParen => true,
            TokenKind::LBracket => self.peek_at(2) != TokenKind::LBracket,
            TokenKind::Keyword(Keyword::Attribute | Keyword::Declspec) => true,
            TokenKind::Ident => !self.is_typedef_name(self.pos + 1),
            _ => false,
        }
    }

    fn is_typedef_name(&self, index: usize) -> bool {
        self.tokens.get(index).is_some_and(|token| {
            token.kind == TokenKind::Ident && self.scope.typedefs.contains_key(self.text(*token))
        })
    }

    fn array_suffix(&mut self) -> PResult<Suffix> {
        let open = self.advance().span;
        while matches!(
            self.peek(),
            TokenKind::Keyword(
                Keyword::Static
                    | Keyword::Const
                    | Keyword::Volatile
                    | Keyword::Restrict
                    | Keyword::Atomic
            )
        ) {
            self.advance();
        }
        if self.eat(TokenKind::RBracket) {
            return Ok(Suffix::Array(None, open));
        }
        if self.check(TokenKind::Star) && self.peek_at(1) == TokenKind::RBracket {
            self.advance();
            self.advance();
            return Ok(Suffix::Array(None, open));
        }

        let start = self.pos;
        let span = self.current_span();
        let value = match self.constant_expression() {
            Ok(value) => value,
            Err(_) if self.in_params > 0 => {
                // Variable-length parameter arrays decay to pointers anyway.
                self.pos = start;
                while !self.eat(TokenKind::RBracket) {
                    if self.at_eof() {
                        return Err(self.error("expected `]`"));
                    }
                    self.skip_token()?;
                }
                return Ok(Suffix::Array(None, open));
            }
            Err(err) => return Err(err),
        };
        self.expect(TokenKind::RBracket, "`]` after array bound")?;
        let len = u64::try_from(value.value)
            .map_err(|_| self.error_at(span, "array has negative size"))?;
        Ok(Suffix::Array(Some(len), span))
    }

    fn parameter_list(&mut self) -> PResult<Suffix> {
        self.advance();
        let unprototyped = Suffix::Function {
            params: SmallVec::new(),
            variadic: false,
            prototyped: false,
        };
        if self.eat(TokenKind::RParen) {
            return Ok(unprototyped);
        }
        if self.check_keyword(Keyword::Void) && self.peek_at(1) == TokenKind::RParen {
            self.advance();
            self.advance();
            return Ok(Suffix::Function {
                params: SmallVec::new(),
                variadic: false,
                prototyped: true,
            });
        }
        if self.check(TokenKind::Ident) && !self.is_typedef_name(self.pos) {
            // K&R identifier list.
            while !self.eat(TokenKind::RParen) {
                if self.at_eof() {
                    return Err(self.error("expected `)` after identifier list"));
                }
                self.skip_token()?;
            }
            return Ok(unprototyped);
        }

        self.in_params += 1;
        let result = self.parameters();
        self.in_params -= 1;
        result
    }

    fn parameters(&mut self) -> PResult<Suffix> {
        let mut params = SmallVec::new();
        let mut variadic = false;
        loop {
            if self.eat(TokenKind::Ellipsis) {
                variadic = true;
                self.expect(TokenKind::RParen, "`)` after `...`")?;
                break;
            }
            let spec = self.declaration_specifiers()?;
            let mut decl = self.declarator(true)?;
            self.trailing_attributes(&mut decl.attrs)?;
            let ty = self.apply_declarator(spec.ty, &decl)?;
            let ty = self.apply_mode(ty, spec.attrs.mode.or(decl.attrs.mode));
            params.push(self.adjust_parameter(ty));
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "`)` after parameters")?;
            break;
        }
        Ok(Suffix::Function {
            params,
            variadic,
            prototyped: true,
        })
    }

    /// Array and function parameters are adjusted to pointers.
    fn adjust_parameter(&mut self, ty: TypeRef) -> TypeRef {
        let element = match self.unit.type_data(self.shape(ty)) {
            TypeData::Array { element, .. } => Some(*element),
            _ => None,
        };
        match element {
            Some(element) => self.pointer_to(element),
            None if self.is_function(ty) => self.pointer_to(ty),
            None => ty,
        }
    }

    pub(super) fn pointer_to(&mut self, ty: TypeRef) -> TypeRef {
        let layout = self.target.scalar(Scalar::Pointer);
        self.unit.pointer(ty, layout.size, layout.align)
    }

    /// Build the declared type from a base type and a declarator.
    pub(super) fn apply_declarator(
        &mut self,
        base: TypeRef,
        decl: &Declarator,
    ) -> PResult<TypeRef> {
        let mut ty = base;
        for &quals in &decl.pointers {
            ty = self.pointer_to(ty);
            ty = self.unit.qualified(ty, quals);
        }
        for suffix in decl.suffixes.iter().rev() {
            ty = match suffix {
                Suffix::Array(len, span) => {
                    self.check_array_bits(ty, *len, *span)?;
                    self.unit.array(ty, *len)
                }
                Suffix::Function {
                    params,
                    variadic,
                    prototyped,
                } => self
                    .unit
                    .function(ty, params.to_vec(), *variadic, *prototyped),
            };
        }
        match &decl.inner {
            Some(inner) => self.apply_declarator(ty, inner),
            None => Ok(ty),
        }
    }

    /// Layout works in bits; an array whose size in bits overflows `u64`
    /// cannot be placed.
    fn check_array_bits(&self, element: TypeRef, len: Option<u64>, span: Span) -> PResult<()> {
        let (Some(len), Some(size)) = (len, self.unit.size_of(element)) else {
            return Ok(());
        };
        match size.checked_mul(len).and_then(|bytes| bytes.checked_mul(8)) {
            Some(_) => Ok(()),
            None => Err(self.error_at(span, "array is too large")),
        }
    }

    /// `specifier-qualifier-list abstract-declarator?`, as in casts and `sizeof`.
    pub(super) fn type_name(&mut self) -> PResult<TypeRef> {
        let spec = self.declaration_specifiers()?;
        let decl = self.declarator(true)?;
        if let Some((name, span)) = &decl.name {
            return Err(self.error_at(*span, &format!("unexpected identifier `{name}` in type name")));
        }
        let ty = self.apply_declarator(spec.ty, &decl)?;
        Ok(self.apply_mode(ty, spec.attrs.mode))
    }

    /// Whether the token `n` ahead begins a type name.
    pub(super) fn starts_type_name(&self, n: usize) -> bool {
        match self.peek_at(n) {
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Const
                    | Keyword::Volatile
                    | Keyword::Restrict
                    | Keyword::Atomic
                    | Keyword::Nullability
                    | Keyword::Void
                    | Keyword::Char
                    | Keyword::Short
                    | Keyword::Int
                    | Keyword::Long
                    | Keyword::Float
                    | Keyword::Double
                    | Keyword::Signed
                    | Keyword::Unsigned
                    | Keyword::Bool
                    | Keyword::Complex
                    | Keyword::Int128
                    | Keyword::Int128T
                    | Keyword::UInt128T
                    | Keyword::Float16
                    | Keyword::Float32
                    | Keyword::Float64
                    | Keyword::Float128
                    | Keyword::Float32x
                    | Keyword::Float64x
                    | Keyword::VaList
                    | Keyword::Struct
                    | Keyword::Union
                    | Keyword::Enum
            ),
            TokenKind::Ident => self.is_typedef_name(self.pos + n),
            _ => false,
        }
    }
}
