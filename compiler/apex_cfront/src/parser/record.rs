//! Struct, union and enum specifiers.

use apex_ir::{DeclId, DeclKind, RecordKind, TypeData, TypeRef};

use super::attributes::Attrs;
use super::expr::Const;
use super::{FieldSlot, PResult, Parser, Tag};
use crate::keywords::Keyword;
use crate::layout::{layout_record, FieldSpec, RecordAttrs, TooLarge};
use crate::lexer::{Span, TokenKind};
use crate::target::Scalar;
use crate::ParseError;

/// One declarator of a member declaration, before layout.
struct MemberDecl {
    name: String,
    ty: TypeRef,
    bit_width: Option<u32>,
    attrs: Attrs,
    span: Span,
}

/// A member declared inside a record body.
struct Member {
    decl: DeclId,
    name: String,
    ty: TypeRef,
    spec: FieldSpec,
    flexible: bool,
}

fn decl_kind(kind: RecordKind) -> DeclKind {
    match kind {
        RecordKind::Struct => DeclKind::StructDecl,
        RecordKind::Union => DeclKind::UnionDecl,
    }
}

fn keyword(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Struct => "struct",
        RecordKind::Union => "union",
    }
}

impl Parser<'_> {
    /// Spelling for a tag without a name, keyed by where its keyword sits.
    fn unnamed_spelling(&self, keyword: &str, at: Span) -> String {
        let loc = self.map.locate(self.source, at.start);
        let file = loc.file.rsplit(['/', '\\']).next().unwrap_or(&loc.file);
        format!(
            "{keyword} (unnamed {keyword} at {file}:{}:{})",
            loc.line, loc.col
        )
    }

    fn tag_mismatch(&self, name: &str, span: Span) -> ParseError {
        self.error_at(
            span,
            &format!("use of `{name}` with tag type that does not match previous declaration"),
        )
    }

    /// After `struct` or `union`. Returns the record type, and whether this
    /// was the definition of an unnamed record.
    pub(super) fn record_specifier(
        &mut self,
        kind: RecordKind,
        keyword_span: Span,
    ) -> PResult<(TypeRef, bool)> {
        let mut attrs = Attrs::default();
        self.attributes(&mut attrs)?;
        let name = if self.check(TokenKind::Ident) {
            Some(self.expect_ident("a tag name")?)
        } else {
            None
        };
        self.attributes(&mut attrs)?;

        if !self.check(TokenKind::LBrace) {
            let Some((name, span)) = name else {
                return Err(self.error(&format!("expected a name or `{{` after `{}`", keyword(kind))));
            };
            return Ok((self.record_reference(kind, &name, span)?, false));
        }

        let (decl, ty) = match &name {
            Some((name, span)) => self.record_for_definition(kind, name, *span)?,
            None => {
                let spelling = self.unnamed_spelling(keyword(kind), keyword_span);
                let decl = self.unit.add_decl(self.parent, decl_kind(kind), "");
                let ty = self.unit.record(decl, kind, &spelling);
                self.unit.set_decl_type(decl, ty);
                (decl, ty)
            }
        };
        self.record_body(ty, decl, kind, attrs)?;
        Ok((ty, name.is_none()))
    }

    /// `struct Tag` without a body: the existing tag or a new incomplete one.
    fn record_reference(&mut self, kind: RecordKind, name: &str, span: Span) -> PResult<TypeRef> {
        match self.scope.tags.get(name) {
            Some(&Tag::Record { ty, kind: existing }) if existing == kind => Ok(ty),
            Some(_) => Err(self.tag_mismatch(name, span)),
            None => {
                let decl = self.unit.add_decl(self.parent, decl_kind(kind), name);
                let spelling = format!("{} {name}", keyword(kind));
                let ty = self.unit.record(decl, kind, &spelling);
                self.unit.set_decl_type(decl, ty);
                self.scope.tags.insert(name.to_owned(), Tag::Record { ty, kind });
                Ok(ty)
            }
        }
    }

    /// Declaration for a named definition, completing an earlier forward
    /// declaration when there is one.
    fn record_for_definition(
        &mut self,
        kind: RecordKind,
        name: &str,
        span: Span,
    ) -> PResult<(DeclId, TypeRef)> {
        let existing = match self.scope.tags.get(name) {
            Some(&Tag::Record { ty, kind: existing }) if existing == kind => Some(ty),
            Some(_) => return Err(self.tag_mismatch(name, span)),
            None => None,
        };
        if let Some(ty) = existing {
            if let TypeData::Record {
                layout: Some(_), ..
            } = self.unit.type_data(ty)
            {
                return Err(self.error_at(
                    span,
                    &format!("redefinition of `{} {name}`", keyword(kind)),
                ));
            }
        }

        let decl = self.unit.add_decl(self.parent, decl_kind(kind), name);
        let ty = match existing {
            Some(ty) => ty,
            None => {
                let spelling = format!("{} {name}", keyword(kind));
                let ty = self.unit.record(decl, kind, &spelling);
                self.scope.tags.insert(name.to_owned(), Tag::Record { ty, kind });
                ty
            }
        };
        self.unit.set_decl_type(decl, ty);
        Ok((decl, ty))
    }

    fn record_body(
        &mut self,
        ty: TypeRef,
        decl: DeclId,
        kind: RecordKind,
        mut attrs: Attrs,
    ) -> PResult<()> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let outer = std::mem::replace(&mut self.parent, decl);
        let members = self.member_declarations(kind);
        self.parent = outer;
        let members = members?;
        self.attributes(&mut attrs)?;

        let specs: Vec<FieldSpec> = members.iter().map(|member| member.spec).collect();
        let laid = layout_record(
            kind,
            &specs,
            RecordAttrs {
                packed: attrs.packed,
                align: attrs.align,
            },
        )
        .map_err(|TooLarge| self.error("record is too large"))?;

        let mut slots = Vec::with_capacity(members.len());
        for (member, placed) in members.into_iter().zip(laid.fields) {
            self.unit.set_field_layout(member.decl, placed);
            slots.push(FieldSlot {
                name: member.name,
                offset_bits: placed.offset_bits,
                bit_field: member.spec.bit_width.is_some(),
                ty: member.ty,
            });
        }
        tracing::trace!(
            fields = slots.len(),
            size = laid.record.size,
            align = laid.record.align,
            "laid out record"
        );
        self.scope.fields.insert(ty, slots);
        self.unit.complete_record(ty, decl, laid.record);
        Ok(())
    }

    /// Member declarations up to and including the closing `}`.
    fn member_declarations(&mut self, kind: RecordKind) -> PResult<Vec<Member>> {
        let mut members: Vec<Member> = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(members);
                }
                TokenKind::Semi => {
                    self.advance();
                    continue;
                }
                TokenKind::Keyword(Keyword::StaticAssert) => {
                    self.skip_static_assert()?;
                    continue;
                }
                TokenKind::Eof => return Err(self.error("expected `}` to close record")),
                _ => {}
            }

            let start = self.current_span();
            let spec = self.declaration_specifiers()?;
            if self.eat(TokenKind::Semi) {
                if spec.anonymous_record {
                    let anonymous = MemberDecl {
                        name: String::new(),
                        ty: spec.ty,
                        bit_width: None,
                        attrs: spec.attrs,
                        span: start,
                    };
                    self.push_member(&mut members, kind, anonymous)?;
                }
                continue;
            }

            loop {
                let span = self.current_span();
                let (name, ty, mut attrs) = if self.check(TokenKind::Colon) {
                    (String::new(), spec.ty, Attrs::default())
                } else {
                    let mut decl = self.declarator(false)?;
                    self.trailing_attributes(&mut decl.attrs)?;
                    let ty = self.apply_declarator(spec.ty, &decl)?;
                    let ty = self.apply_mode(ty, spec.attrs.mode.or(decl.attrs.mode));
                    let name = decl.name.map(|(name, _)| name).unwrap_or_default();
                    (name, ty, decl.attrs)
                };
                let width = if self.eat(TokenKind::Colon) {
                    Some(self.bit_field_width(ty, &name, span)?)
                } else {
                    None
                };
                self.trailing_attributes(&mut attrs)?;
                attrs.merge(spec.attrs);
                let member = MemberDecl {
                    name,
                    ty,
                    bit_width: width,
                    attrs,
                    span,
                };
                self.push_member(&mut members, kind, member)?;

                if self.eat(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::Semi, "`;` after member declaration")?;
                break;
            }
        }
    }

    fn push_member(
        &mut self,
        members: &mut Vec<Member>,
        kind: RecordKind,
        member: MemberDecl,
    ) -> PResult<()> {
        let MemberDecl {
            name,
            ty,
            bit_width,
            attrs,
            span,
        } = member;
        if members.last().is_some_and(|member| member.flexible) {
            return Err(self.error_at(span, "flexible array member must be the last member"));
        }
        let size = self.unit.size_of(ty);
        let flexible = size.is_none()
            && matches!(
                self.unit.type_data(self.shape(ty)),
                TypeData::Array { len: None, .. }
            )
            && self.unit.size_of(self.array_element(ty)).is_some();
        if size.is_none() && !flexible {
            let what = if name.is_empty() { "member" } else { &name };
            return Err(self.error_at(span, &format!("field `{what}` has incomplete type")));
        }
        if flexible && kind == RecordKind::Union {
            return Err(self.error_at(span, "flexible array member in a union"));
        }

        let align = self.unit.align_of(ty).unwrap_or(1);
        let decl = self.unit.add_decl(self.parent, DeclKind::FieldDecl, &name);
        self.unit.set_decl_type(decl, ty);
        let named = !name.is_empty();
        members.push(Member {
            decl,
            name,
            ty,
            spec: FieldSpec {
                size,
                align,
                bit_width,
                named,
                align_attr: attrs.align,
                packed: attrs.packed,
            },
            flexible,
        });
        Ok(())
    }

    fn array_element(&self, ty: TypeRef) -> TypeRef {
        match self.unit.type_data(self.shape(ty)) {
            TypeData::Array { element, .. } => *element,
            _ => ty,
        }
    }

    fn bit_field_width(&mut self, ty: TypeRef, name: &str, span: Span) -> PResult<u32> {
        let value = self.constant_expression()?;
        let Some((size, _)) = self.integer_layout(ty) else {
            return Err(self.error_at(span, &format!("bit-field `{name}` has non-integral type")));
        };
        let width = u32::try_from(value.value)
            .map_err(|_| self.error_at(span, &format!("bit-field `{name}` has negative width")))?;
        if u64::from(width) > size * 8 {
            return Err(self.error_at(
                span,
                &format!(
                    "width of bit-field `{name}` ({width} bits) exceeds the width of its type ({} bits)",
                    size * 8
                ),
            ));
        }
        if width == 0 && !name.is_empty() {
            return Err(self.error_at(span, &format!("named bit-field `{name}` has zero width")));
        }
        Ok(width)
    }

    /// After `enum`.
    pub(super) fn enum_specifier(&mut self, keyword_span: Span) -> PResult<TypeRef> {
        let mut attrs = Attrs::default();
        self.attributes(&mut attrs)?;
        let name = if self.check(TokenKind::Ident) {
            Some(self.expect_ident("an enum name")?)
        } else {
            None
        };
        let fixed = if self.eat(TokenKind::Colon) {
            Some(self.type_name()?)
        } else {
            None
        };
        let int = self.target.scalar(Scalar::Int);
        let (fixed_size, fixed_align) = match fixed {
            Some(fixed) => (
                self.unit.size_of(fixed).unwrap_or(int.size),
                self.unit.align_of(fixed).unwrap_or(int.align),
            ),
            None => (int.size, int.align),
        };

        let existing = match &name {
            Some((name, span)) => match self.scope.tags.get(name.as_str()) {
                Some(&Tag::Enum { ty, defined }) => Some((ty, defined)),
                Some(_) => return Err(self.tag_mismatch(name, *span)),
                None => None,
            },
            None => None,
        };

        if !self.check(TokenKind::LBrace) {
            let Some((name, _)) = name else {
                return Err(self.error("expected a name or `{` after `enum`"));
            };
            if let Some((ty, _)) = existing {
                return Ok(ty);
            }
            let decl = self.unit.add_decl(self.parent, DeclKind::EnumDecl, &name);
            let ty = self
                .unit
                .enumeration(decl, &format!("enum {name}"), fixed_size, fixed_align);
            self.unit.set_decl_type(decl, ty);
            self.scope.tags.insert(name, Tag::Enum { ty, defined: false });
            return Ok(ty);
        }

        if let (Some((name, span)), Some((_, true))) = (&name, existing) {
            return Err(self.error_at(*span, &format!("redefinition of `enum {name}`")));
        }
        let spelling = match &name {
            Some((name, _)) => format!("enum {name}"),
            None => self.unnamed_spelling("enum", keyword_span),
        };
        let decl = self.unit.add_decl(
            self.parent,
            DeclKind::EnumDecl,
            name.as_ref().map_or("", |(name, _)| name.as_str()),
        );
        let ty = match existing {
            Some((ty, _)) => ty,
            None => self.unit.enumeration(decl, &spelling, fixed_size, fixed_align),
        };
        self.unit.set_decl_type(decl, ty);
        if let Some((name, _)) = &name {
            self.scope.tags.insert(name.clone(), Tag::Enum { ty, defined: true });
        }

        let values = self.enumerators(decl, ty)?;
        self.attributes(&mut attrs)?;

        let (size, align) = if fixed.is_some() {
            (fixed_size, fixed_align)
        } else {
            self.enum_layout(&values, attrs.packed)
        };
        self.unit.complete_enum(ty, decl, size, align);
        Ok(ty)
    }

    /// Enumerator list up to and including `}`; returns the values.
    fn enumerators(&mut self, decl: DeclId, ty: TypeRef) -> PResult<Vec<i128>> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut values = Vec::new();
        let mut next = Const::int(0);
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            let (name, _) = self.expect_ident("an enumerator name")?;
            self.attributes(&mut Attrs::default())?;
            let value = if self.eat(TokenKind::Eq) {
                self.constant_expression()?
            } else {
                next
            };

            let constant = self.unit.add_decl(decl, DeclKind::EnumConstantDecl, &name);
            self.unit.set_decl_type(constant, ty);
            let fits_int = i32::try_from(value.value).is_ok();
            let typed = if fits_int { Const::int(value.value) } else { value };
            self.scope.constants.insert(name, typed);
            values.push(value.value);

            let successor = value.value + 1;
            next = if i32::try_from(successor).is_ok() {
                Const::int(successor)
            } else {
                Const {
                    value: successor,
                    unsigned: value.unsigned,
                    size: value.size.max(8),
                }
            };

            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBrace, "`,` or `}` after enumerator")?;
                break;
            }
        }
        Ok(values)
    }

    /// Underlying size and alignment from the range of values.
    fn enum_layout(&self, values: &[i128], packed: bool) -> (u64, u64) {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let fits = |bytes: u32| {
            let bits = bytes * 8;
            if min < 0 {
                min >= -(1i128 << (bits - 1)) && max < (1i128 << (bits - 1))
            } else {
                max < (1i128 << bits)
            }
        };
        let (bytes, scalar) = if packed {
            match [1u32, 2, 4].into_iter().find(|&bytes| fits(bytes)) {
                Some(1) => (1, Scalar::Char),
                Some(2) => (2, Scalar::Short),
                Some(_) => (4, Scalar::Int),
                None => (8, Scalar::LongLong),
            }
        } else if fits(4) {
            (4, Scalar::Int)
        } else {
            (8, Scalar::LongLong)
        };
        (bytes, self.target.scalar(scalar).align)
    }
}
