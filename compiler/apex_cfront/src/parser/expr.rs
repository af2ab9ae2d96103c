//! Integer constant expressions.
//!
//! Enough of C's expression grammar to evaluate array bounds, bit-field
//! widths, enumerator values and alignment arguments: integer and
//! character literals, enumerators, `sizeof`, `_Alignof`,
//! `__builtin_offsetof`, casts, and every unary, binary and conditional
//! operator. Values carry their C type (width and signedness) so that
//! wrap-around and unsigned comparisons match the target.

use apex_ir::{TypeData, TypeRef};

use super::{PResult, Parser};
use crate::keywords::Keyword;
use crate::lexer::{IntLit, Span, TokenKind};
use crate::stack::ensure_sufficient_stack;
use crate::target::Scalar;

/// An integer constant and its type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Const {
    pub(crate) value: i128,
    pub(crate) unsigned: bool,
    /// Width of the type in bytes.
    pub(crate) size: u64,
}

impl Const {
    pub(crate) fn int(value: i128) -> Self {
        Const {
            value,
            unsigned: false,
            size: 4,
        }
    }

    /// Wrap the value into the range of its type.
    pub(crate) fn normalize(self) -> Self {
        let bits = self.size.clamp(1, 16) * 8;
        if bits >= 128 {
            return self;
        }
        let modulus = 1i128 << bits;
        let mut value = self.value.rem_euclid(modulus);
        if !self.unsigned && value >= modulus / 2 {
            value -= modulus;
        }
        Const { value, ..self }
    }

    fn convert(self, unsigned: bool, size: u64) -> Self {
        Const {
            value: self.value,
            unsigned,
            size,
        }
        .normalize()
    }

    fn truthy(self) -> bool {
        self.value != 0
    }

    /// Integer promotion.
    fn promote(self) -> Self {
        if self.size < 4 {
            Const::int(self.value)
        } else {
            self
        }
    }
}

/// Usual arithmetic conversions: the common type of two operands.
fn common_type(lhs: Const, rhs: Const) -> (bool, u64) {
    let (lhs, rhs) = (lhs.promote(), rhs.promote());
    match lhs.size.cmp(&rhs.size) {
        std::cmp::Ordering::Equal => (lhs.unsigned || rhs.unsigned, lhs.size),
        std::cmp::Ordering::Greater => (lhs.unsigned, lhs.size),
        std::cmp::Ordering::Less => (rhs.unsigned, rhs.size),
    }
}

fn precedence(kind: TokenKind) -> Option<u8> {
    let prec = match kind {
        TokenKind::PipePipe => 1,
        TokenKind::AmpAmp => 2,
        TokenKind::Pipe => 3,
        TokenKind::Caret => 4,
        TokenKind::Amp => 5,
        TokenKind::EqEq | TokenKind::NotEq => 6,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => 7,
        TokenKind::Shl | TokenKind::Shr => 8,
        TokenKind::Plus | TokenKind::Minus => 9,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 10,
        _ => return None,
    };
    Some(prec)
}

fn is_floating(name: &str) -> bool {
    name.contains("float")
        || name.contains("double")
        || name.contains("_Float")
        || name.contains("_Complex")
}

impl Parser<'_> {
    /// Parse and evaluate a conditional expression.
    pub(crate) fn constant_expression(&mut self) -> PResult<Const> {
        ensure_sufficient_stack(|| self.conditional())
    }

    fn conditional(&mut self) -> PResult<Const> {
        let cond = self.binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.constant_expression()?;
        self.expect(TokenKind::Colon, "`:` in conditional expression")?;
        let otherwise = self.constant_expression()?;
        let (unsigned, size) = common_type(then, otherwise);
        let chosen = if cond.truthy() { then } else { otherwise };
        Ok(chosen.convert(unsigned, size))
    }

    fn binary(&mut self, min: u8) -> PResult<Const> {
        let mut lhs = self.unary()?;
        loop {
            let op = self.peek();
            let Some(prec) = precedence(op) else {
                break;
            };
            if prec < min {
                break;
            }
            let span = self.advance().span;
            let rhs = self.binary(prec + 1)?;
            lhs = self.apply_binary(op, lhs, rhs, span)?;
        }
        Ok(lhs)
    }

    fn apply_binary(&self, op: TokenKind, lhs: Const, rhs: Const, span: Span) -> PResult<Const> {
        let flag = |value: bool| Ok(Const::int(i128::from(value)));
        match op {
            TokenKind::AmpAmp => return flag(lhs.truthy() && rhs.truthy()),
            TokenKind::PipePipe => return flag(lhs.truthy() || rhs.truthy()),
            TokenKind::Shl | TokenKind::Shr => {
                let lhs = lhs.promote();
                let bits = lhs.size * 8;
                let amount = u32::try_from(rhs.value)
                    .ok()
                    .filter(|&amount| u64::from(amount) < bits)
                    .ok_or_else(|| self.error_at(span, "shift count out of range"))?;
                let value = if op == TokenKind::Shl {
                    lhs.value.wrapping_shl(amount)
                } else {
                    lhs.value >> amount
                };
                return Ok(Const { value, ..lhs }.normalize());
            }
            _ => {}
        }

        let (unsigned, size) = common_type(lhs, rhs);
        let a = lhs.convert(unsigned, size).value;
        let b = rhs.convert(unsigned, size).value;
        let value = match op {
            TokenKind::EqEq => return flag(a == b),
            TokenKind::NotEq => return flag(a != b),
            TokenKind::Lt => return flag(a < b),
            TokenKind::Gt => return flag(a > b),
            TokenKind::LtEq => return flag(a <= b),
            TokenKind::GtEq => return flag(a >= b),
            TokenKind::Plus => a.wrapping_add(b),
            TokenKind::Minus => a.wrapping_sub(b),
            TokenKind::Star => a.wrapping_mul(b),
            TokenKind::Slash | TokenKind::Percent => {
                if b == 0 {
                    return Err(self.error_at(span, "division by zero in constant expression"));
                }
                if op == TokenKind::Slash {
                    a.wrapping_div(b)
                } else {
                    a.wrapping_rem(b)
                }
            }
            TokenKind::Amp => a & b,
            TokenKind::Pipe => a | b,
            TokenKind::Caret => a ^ b,
            _ => unreachable!("precedence() admits only binary operators"),
        };
        Ok(Const {
            value,
            unsigned,
            size,
        }
        .normalize())
    }

    fn unary(&mut self) -> PResult<Const> {
        match self.peek() {
            TokenKind::Plus => {
                self.advance();
                Ok(self.unary()?.promote())
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?.promote();
                Ok(Const {
                    value: operand.value.wrapping_neg(),
                    ..operand
                }
                .normalize())
            }
            TokenKind::Tilde => {
                self.advance();
                let operand = self.unary()?.promote();
                Ok(Const {
                    value: !operand.value,
                    ..operand
                }
                .normalize())
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.unary()?;
                Ok(Const::int(i128::from(!operand.truthy())))
            }
            TokenKind::Keyword(Keyword::Extension) => {
                self.advance();
                self.unary()
            }
            TokenKind::Keyword(Keyword::Sizeof) => self.sizeof_expr(),
            TokenKind::Keyword(Keyword::Alignof) => self.alignof_expr(),
            TokenKind::LParen if self.starts_type_name(1) => {
                let span = self.advance().span;
                let ty = self.type_name()?;
                self.expect(TokenKind::RParen, "`)` after cast type")?;
                let operand = self.unary()?;
                self.cast(ty, operand, span)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> PResult<Const> {
        let token = self.tokens[self.pos];
        match token.kind {
            TokenKind::Int(lit) => {
                self.advance();
                Ok(self.int_literal(lit))
            }
            TokenKind::Char { value, plain } => {
                self.advance();
                let value = match u8::try_from(value) {
                    Ok(byte) if plain && self.target.char_signed => {
                        i128::from(i8::from_ne_bytes([byte]))
                    }
                    _ => i128::from(value),
                };
                Ok(Const::int(value))
            }
            TokenKind::Float => Err(self.error_at(
                token.span,
                "floating-point constants are not supported in integer constant expressions",
            )),
            TokenKind::Ident => {
                self.advance();
                let name = self.text(token);
                self.scope.constants.get(name).copied().ok_or_else(|| {
                    self.error_at(
                        token.span,
                        &format!("`{name}` is not an integer constant"),
                    )
                })
            }
            TokenKind::LParen => {
                self.advance();
                let value = self.constant_expression()?;
                self.expect(TokenKind::RParen, "`)` to close expression")?;
                Ok(value)
            }
            TokenKind::Keyword(Keyword::Offsetof) => self.offsetof(),
            _ => Err(self.error("expected a constant expression")),
        }
    }

    /// Type an integer literal by the first candidate that holds its value.
    fn int_literal(&self, lit: IntLit) -> Const {
        let long = self.target.scalar(Scalar::Long).size;
        let candidates: &[u64] = match lit.longs {
            0 => &[4, long, 8],
            1 => &[long, 8],
            _ => &[8],
        };
        let value = u128::from(lit.value);
        for &size in candidates {
            let bits = size * 8;
            let unsigned_max = (1u128 << bits) - 1;
            let signed_max = unsigned_max >> 1;
            if !lit.unsigned && value <= signed_max {
                return Const {
                    value: i128::from(lit.value),
                    unsigned: false,
                    size,
                };
            }
            if (lit.unsigned || lit.non_decimal) && value <= unsigned_max {
                return Const {
                    value: i128::from(lit.value),
                    unsigned: true,
                    size,
                };
            }
        }
        Const {
            value: i128::from(lit.value),
            unsigned: true,
            size: 8,
        }
    }

    fn size_t(&self, value: u64) -> Const {
        Const {
            value: i128::from(value),
            unsigned: true,
            size: self.target.pointer_size(),
        }
    }

    fn sizeof_expr(&mut self) -> PResult<Const> {
        let span = self.advance().span;
        if self.check(TokenKind::LParen) && self.starts_type_name(1) {
            self.advance();
            let ty = self.type_name()?;
            self.expect(TokenKind::RParen, "`)` after type")?;
            let size = self.unit.size_of(ty).ok_or_else(|| {
                self.error_at(span, "invalid application of `sizeof` to an incomplete type")
            })?;
            return Ok(self.size_t(size));
        }

        let parenthesized_string =
            self.check(TokenKind::LParen) && matches!(self.peek_at(1), TokenKind::Str(_));
        if parenthesized_string || matches!(self.peek(), TokenKind::Str(_)) {
            if parenthesized_string {
                self.advance();
            }
            let mut len = 0;
            while let TokenKind::Str(part) = self.peek() {
                self.advance();
                len += part;
            }
            if parenthesized_string {
                self.expect(TokenKind::RParen, "`)` after string literal")?;
            }
            return Ok(self.size_t(len + 1));
        }

        let operand = self.unary()?;
        Ok(self.size_t(operand.size))
    }

    fn alignof_expr(&mut self) -> PResult<Const> {
        let span = self.advance().span;
        self.expect(TokenKind::LParen, "`(` after `_Alignof`")?;
        if !self.starts_type_name(0) {
            return Err(self.error("expected a type name"));
        }
        let ty = self.type_name()?;
        self.expect(TokenKind::RParen, "`)` after type")?;
        let align = self.unit.align_of(ty).ok_or_else(|| {
            self.error_at(span, "invalid application of `_Alignof` to an incomplete type")
        })?;
        Ok(self.size_t(align))
    }

    /// Width and signedness of an integer-like type.
    pub(super) fn integer_layout(&self, ty: TypeRef) -> Option<(u64, bool)> {
        match self.unit.type_data(self.shape(ty)) {
            TypeData::Builtin {
                name,
                size: Some(size),
                ..
            } if !is_floating(name) => Some((*size, self.is_unsigned(ty))),
            TypeData::Enum { size, .. } => Some((*size, false)),
            TypeData::Pointer { size, .. } => Some((*size, true)),
            _ => None,
        }
    }

    fn cast(&self, ty: TypeRef, operand: Const, span: Span) -> PResult<Const> {
        let is_bool = matches!(
            self.unit.type_data(self.shape(ty)),
            TypeData::Builtin { name, .. } if name == "_Bool"
        );
        if is_bool {
            return Ok(Const {
                value: i128::from(operand.truthy()),
                unsigned: true,
                size: 1,
            });
        }
        let (size, unsigned) = self
            .integer_layout(ty)
            .ok_or_else(|| self.error_at(span, "cast to a non-integer type in a constant expression"))?;
        Ok(operand.convert(unsigned, size))
    }

    /// `__builtin_offsetof(type, member-designator)`.
    fn offsetof(&mut self) -> PResult<Const> {
        self.advance();
        self.expect(TokenKind::LParen, "`(` after `__builtin_offsetof`")?;
        let ty = self.type_name()?;
        self.expect(TokenKind::Comma, "`,` after type")?;

        let mut current = self.shape(ty);
        let mut bits = 0u64;
        loop {
            let (name, span) = self.expect_ident("a member name")?;
            let (offset, bit_field, field_ty) = self
                .find_field(current, &name)
                .ok_or_else(|| self.error_at(span, &format!("no member named `{name}`")))?;
            if bit_field {
                return Err(self.error_at(span, "cannot compute offset of a bit-field"));
            }
            bits = bits
                .checked_add(offset)
                .ok_or_else(|| self.error_at(span, "member offset is out of range"))?;
            current = self.shape(field_ty);

            while self.check(TokenKind::LBracket) {
                let open = self.advance().span;
                let index = self.constant_expression()?;
                self.expect(TokenKind::RBracket, "`]` after index")?;
                let element = match self.unit.type_data(current) {
                    TypeData::Array { element, .. } => *element,
                    _ => return Err(self.error_at(open, "subscript of a non-array member")),
                };
                let stride = self
                    .unit
                    .size_of(element)
                    .ok_or_else(|| self.error_at(open, "array of incomplete element type"))?;
                let index = u64::try_from(index.value)
                    .map_err(|_| self.error_at(open, "negative array index"))?;
                bits = index
                    .checked_mul(stride)
                    .and_then(|bytes| bytes.checked_mul(8))
                    .and_then(|step| bits.checked_add(step))
                    .ok_or_else(|| self.error_at(open, "array index is out of range"))?;
                current = self.shape(element);
            }

            if !self.eat(TokenKind::Dot) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` after member designator")?;
        Ok(self.size_t(bits / 8))
    }

    /// Find a member by name, descending into anonymous members.
    fn find_field(&self, record: TypeRef, name: &str) -> Option<(u64, bool, TypeRef)> {
        let slots = self.scope.fields.get(&record)?;
        for slot in slots {
            if slot.name == name {
                return Some((slot.offset_bits, slot.bit_field, slot.ty));
            }
            if slot.name.is_empty() {
                let inner = self.shape(slot.ty);
                if let Some((offset, bit_field, ty)) = self.find_field(inner, name) {
                    return Some((slot.offset_bits + offset, bit_field, ty));
                }
            }
        }
        None
    }
}
