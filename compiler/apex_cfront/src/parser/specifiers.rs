//! Declaration specifiers.
//!
//! Collects storage classes, qualifiers, attributes and type specifiers in
//! any order, then resolves the type specifiers to one base type: a
//! builtin spelled the canonical way (`unsigned long`, `long double`), a
//! typedef name, or a tag type.

use apex_ir::{Qualifiers, RecordKind, TypeData, TypeRef};

use super::attributes::Attrs;
use super::{PResult, Parser};
use crate::keywords::Keyword;
use crate::lexer::{Span, TokenKind};
use crate::target::Scalar;

bitflags::bitflags! {
    /// Storage classes and function specifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub(super) struct Storage: u8 {
        const TYPEDEF = 1 << 0;
        const EXTERN = 1 << 1;
        const STATIC = 1 << 2;
        const AUTO = 1 << 3;
        const REGISTER = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
        const INLINE = 1 << 6;
        const NORETURN = 1 << 7;
    }
}

/// Parsed declaration specifiers.
#[derive(Clone, Debug)]
pub(super) struct DeclSpec {
    pub(super) storage: Storage,
    /// Base type with qualifiers applied.
    pub(super) ty: TypeRef,
    pub(super) attrs: Attrs,
    /// The specifiers defined an unnamed struct or union, which makes a
    /// bare `struct { ... };` inside a record an anonymous member.
    pub(super) anonymous_record: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Base {
    Void,
    Char,
    Int,
    Float,
    Double,
    Bool,
    Int128,
    Float16,
    Float32,
    Float64,
    Float128,
    Float32x,
    Float64x,
    VaList,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
enum Width {
    #[default]
    Default,
    Short,
    Long,
    LongLong,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
enum Sign {
    #[default]
    Default,
    Signed,
    Unsigned,
}

/// Type specifier words seen so far.
#[derive(Copy, Clone, Debug, Default)]
struct TypeSpec {
    base: Option<Base>,
    width: Width,
    sign: Sign,
    complex: bool,
    /// Typedef name, tag type or `_Atomic(T)`.
    named: Option<TypeRef>,
}

impl TypeSpec {
    fn is_empty(&self) -> bool {
        self.base.is_none()
            && self.width == Width::Default
            && self.sign == Sign::Default
            && !self.complex
            && self.named.is_none()
    }
}

impl Parser<'_> {
    pub(super) fn declaration_specifiers(&mut self) -> PResult<DeclSpec> {
        let start = self.pos;
        let mut storage = Storage::empty();
        let mut quals = Qualifiers::empty();
        let mut attrs = Attrs::default();
        let mut spec = TypeSpec::default();
        let mut anonymous_record = false;

        loop {
            let token = self.tokens[self.pos];
            let span = token.span;
            match token.kind {
                TokenKind::Keyword(keyword) => {
                    let flag = match keyword {
                        Keyword::Typedef => Some(Storage::TYPEDEF),
                        Keyword::Extern => Some(Storage::EXTERN),
                        Keyword::Static => Some(Storage::STATIC),
                        Keyword::Auto => Some(Storage::AUTO),
                        Keyword::Register => Some(Storage::REGISTER),
                        Keyword::ThreadLocal => Some(Storage::THREAD_LOCAL),
                        Keyword::Inline => Some(Storage::INLINE),
                        Keyword::Noreturn => Some(Storage::NORETURN),
                        _ => None,
                    };
                    if let Some(flag) = flag {
                        self.advance();
                        storage |= flag;
                        continue;
                    }

                    match keyword {
                        Keyword::Extension | Keyword::Nullability => {
                            self.advance();
                        }
                        Keyword::Const => {
                            self.advance();
                            quals |= Qualifiers::CONST;
                        }
                        Keyword::Volatile => {
                            self.advance();
                            quals |= Qualifiers::VOLATILE;
                        }
                        Keyword::Restrict => {
                            self.advance();
                            quals |= Qualifiers::RESTRICT;
                        }
                        Keyword::Atomic => {
                            self.advance();
                            if self.eat(TokenKind::LParen) {
                                let ty = self.type_name()?;
                                self.expect(TokenKind::RParen, "`)` after `_Atomic` type")?;
                                self.set_named(&mut spec, ty, span)?;
                            }
                        }
                        Keyword::Alignas => {
                            self.advance();
                            let align = self.alignas_argument()?;
                            attrs.raise_align(align);
                        }
                        Keyword::Attribute | Keyword::Declspec => self.attributes(&mut attrs)?,
                        Keyword::Void => self.set_base(&mut spec, Base::Void)?,
                        Keyword::Char => self.set_base(&mut spec, Base::Char)?,
                        Keyword::Int => self.set_base(&mut spec, Base::Int)?,
                        Keyword::Float => self.set_base(&mut spec, Base::Float)?,
                        Keyword::Double => self.set_base(&mut spec, Base::Double)?,
                        Keyword::Bool => self.set_base(&mut spec, Base::Bool)?,
                        Keyword::Int128 => self.set_base(&mut spec, Base::Int128)?,
                        Keyword::Float16 => self.set_base(&mut spec, Base::Float16)?,
                        Keyword::Float32 => self.set_base(&mut spec, Base::Float32)?,
                        Keyword::Float64 => self.set_base(&mut spec, Base::Float64)?,
                        Keyword::Float128 => self.set_base(&mut spec, Base::Float128)?,
                        Keyword::Float32x => self.set_base(&mut spec, Base::Float32x)?,
                        Keyword::Float64x => self.set_base(&mut spec, Base::Float64x)?,
                        Keyword::VaList => self.set_base(&mut spec, Base::VaList)?,
                        Keyword::Int128T | Keyword::UInt128T => {
                            self.set_base(&mut spec, Base::Int128)?;
                            spec.sign = if keyword == Keyword::Int128T {
                                Sign::Signed
                            } else {
                                Sign::Unsigned
                            };
                        }
                        Keyword::Short => {
                            self.advance();
                            if spec.width != Width::Default {
                                return Err(self.error_at(span, "duplicate `short`"));
                            }
                            spec.width = Width::Short;
                        }
                        Keyword::Long => {
                            self.advance();
                            spec.width = match spec.width {
                                Width::Default => Width::Long,
                                Width::Long => Width::LongLong,
                                Width::Short | Width::LongLong => {
                                    return Err(self.error_at(span, "`long` is too long"));
                                }
                            };
                        }
                        Keyword::Signed | Keyword::Unsigned => {
                            self.advance();
                            if spec.sign != Sign::Default {
                                return Err(
                                    self.error_at(span, "duplicate signedness specifier")
                                );
                            }
                            spec.sign = if keyword == Keyword::Signed {
                                Sign::Signed
                            } else {
                                Sign::Unsigned
                            };
                        }
                        Keyword::Complex => {
                            self.advance();
                            spec.complex = true;
                        }
                        Keyword::Struct | Keyword::Union => {
                            self.advance();
                            let kind = if keyword == Keyword::Struct {
                                RecordKind::Struct
                            } else {
                                RecordKind::Union
                            };
                            let (ty, anonymous) = self.record_specifier(kind, span)?;
                            let elaborated = self.unit.elaborated(ty);
                            self.set_named(&mut spec, elaborated, span)?;
                            anonymous_record = anonymous;
                        }
                        Keyword::Enum => {
                            self.advance();
                            let ty = self.enum_specifier(span)?;
                            let elaborated = self.unit.elaborated(ty);
                            self.set_named(&mut spec, elaborated, span)?;
                        }
                        _ => break,
                    }
                }
                TokenKind::Ident if spec.is_empty() => {
                    let name = self.text(token);
                    match self.scope.typedefs.get(name) {
                        Some(&ty) => {
                            self.advance();
                            spec.named = Some(ty);
                        }
                        None => {
                            if matches!(self.peek_at(1), TokenKind::Ident | TokenKind::Star) {
                                return Err(
                                    self.error_at(span, &format!("unknown type name `{name}`"))
                                );
                            }
                            break;
                        }
                    }
                }
                TokenKind::LBracket if self.peek_at(1) == TokenKind::LBracket => {
                    self.attributes(&mut attrs)?;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.error("expected a declaration"));
        }

        let base = self.resolve_type_spec(&spec, self.tokens[start].span)?;
        let ty = self.unit.qualified(base, quals);
        Ok(DeclSpec {
            storage,
            ty,
            attrs,
            anonymous_record,
        })
    }

    fn set_base(&mut self, spec: &mut TypeSpec, base: Base) -> PResult<()> {
        let span = self.advance().span;
        if spec.base.is_some() || spec.named.is_some() {
            return Err(self.error_at(span, "cannot combine with previous type specifier"));
        }
        spec.base = Some(base);
        Ok(())
    }

    fn set_named(&mut self, spec: &mut TypeSpec, ty: TypeRef, span: Span) -> PResult<()> {
        if !spec.is_empty() {
            return Err(self.error_at(span, "cannot combine with previous type specifier"));
        }
        spec.named = Some(ty);
        Ok(())
    }

    /// `_Alignas(type-name)` or `_Alignas(constant-expression)`.
    fn alignas_argument(&mut self) -> PResult<u64> {
        self.expect(TokenKind::LParen, "`(` after `_Alignas`")?;
        let span = self.current_span();
        let align = if self.starts_type_name(0) {
            let ty = self.type_name()?;
            self.unit
                .align_of(ty)
                .ok_or_else(|| self.error_at(span, "`_Alignas` of an incomplete type"))?
        } else {
            self.alignment_value()?
        };
        self.expect(TokenKind::RParen, "`)` after `_Alignas`")?;
        Ok(align)
    }

    /// Resolve accumulated type specifier words to a base type.
    fn resolve_type_spec(&mut self, spec: &TypeSpec, span: Span) -> PResult<TypeRef> {
        if let Some(named) = spec.named {
            return Ok(named);
        }
        let invalid = |this: &Self| this.error_at(span, "invalid combination of type specifiers");
        let unsigned = spec.sign == Sign::Unsigned;
        let pick = |signed_name: &'static str, unsigned_name: &'static str| {
            if unsigned {
                unsigned_name
            } else {
                signed_name
            }
        };

        let integer = matches!(spec.base, None | Some(Base::Int | Base::Char | Base::Int128));
        if spec.sign != Sign::Default && !integer {
            return Err(invalid(self));
        }

        let (name, scalar) = match (spec.base, spec.width) {
            (Some(Base::Void), Width::Default) => {
                return Ok(self.unit.builtin("void", None, 1));
            }
            (Some(Base::Bool), Width::Default) => ("_Bool", Scalar::Bool),
            (Some(Base::Char), Width::Default) => {
                let name = match spec.sign {
                    Sign::Default => "char",
                    Sign::Signed => "signed char",
                    Sign::Unsigned => "unsigned char",
                };
                (name, Scalar::Char)
            }
            (None | Some(Base::Int), Width::Short) => {
                (pick("short", "unsigned short"), Scalar::Short)
            }
            (None | Some(Base::Int), Width::Long) => (pick("long", "unsigned long"), Scalar::Long),
            (None | Some(Base::Int), Width::LongLong) => {
                (pick("long long", "unsigned long long"), Scalar::LongLong)
            }
            (None | Some(Base::Int), Width::Default) => {
                if spec.complex && spec.base.is_none() && spec.sign == Sign::Default {
                    ("double", Scalar::Double)
                } else {
                    (pick("int", "unsigned int"), Scalar::Int)
                }
            }
            (Some(Base::Int128), Width::Default) => {
                (pick("__int128", "unsigned __int128"), Scalar::Int128)
            }
            (Some(Base::Float), Width::Default) => ("float", Scalar::Float),
            (Some(Base::Double), Width::Default) => ("double", Scalar::Double),
            (Some(Base::Double), Width::Long) => ("long double", Scalar::LongDouble),
            (Some(Base::Float16), Width::Default) => ("_Float16", Scalar::Float16),
            (Some(Base::Float32), Width::Default) => ("_Float32", Scalar::Float),
            (Some(Base::Float64 | Base::Float32x), Width::Default) => ("_Float64", Scalar::Double),
            (Some(Base::Float64x), Width::Default) => ("_Float64x", Scalar::LongDouble),
            (Some(Base::Float128), Width::Default) => ("_Float128", Scalar::Float128),
            (Some(Base::VaList), Width::Default) => ("__builtin_va_list", Scalar::VaList),
            _ => return Err(invalid(self)),
        };

        let layout = self.target.scalar(scalar);
        if spec.complex {
            let floating = matches!(
                scalar,
                Scalar::Float
                    | Scalar::Double
                    | Scalar::LongDouble
                    | Scalar::Float16
                    | Scalar::Float128
            );
            if !floating {
                return Err(invalid(self));
            }
            let name = format!("_Complex {name}");
            return Ok(self.unit.builtin(&name, Some(layout.size * 2), layout.align));
        }
        Ok(self.unit.builtin(name, Some(layout.size), layout.align))
    }

    /// Apply a GCC `mode` attribute to an integer type.
    pub(super) fn apply_mode(&mut self, ty: TypeRef, mode: Option<u64>) -> TypeRef {
        let Some(bytes) = mode else {
            return ty;
        };
        let integer = match self.unit.type_data(self.shape(ty)) {
            TypeData::Builtin { name, .. } => {
                name.contains("char")
                    || name.contains("short")
                    || name.contains("int")
                    || name.contains("long") && !name.contains("double")
            }
            _ => false,
        };
        if !integer {
            return ty;
        }
        let unsigned = self.is_unsigned(ty);
        let pick = |signed_name: &'static str, unsigned_name: &'static str| {
            if unsigned {
                unsigned_name
            } else {
                signed_name
            }
        };
        let (name, scalar) = match bytes {
            1 => (pick("signed char", "unsigned char"), Scalar::Char),
            2 => (pick("short", "unsigned short"), Scalar::Short),
            4 => (pick("int", "unsigned int"), Scalar::Int),
            8 if self.target.scalar(Scalar::Long).size == 8 => {
                (pick("long", "unsigned long"), Scalar::Long)
            }
            8 => (pick("long long", "unsigned long long"), Scalar::LongLong),
            16 => (pick("__int128", "unsigned __int128"), Scalar::Int128),
            _ => return ty,
        };
        let layout = self.target.scalar(scalar);
        self.unit.builtin(name, Some(layout.size), layout.align)
    }
}
