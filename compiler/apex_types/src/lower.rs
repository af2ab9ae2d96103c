//! Lowering front-end type handles into pool nodes.

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

use apex_ir::{AstProvider, DeclKind, RecordKind, RecordLayout, TypeKind, TypeRef};

use crate::pool::TypeKey;
use crate::{
    ArrayType, FunctionPointer, LowerError, Pointer, PrimitiveType, QualifiedType, RecordType,
    Type, TypeAlias, TypeIdx, TypePool,
};

/// Longest typedef chain followed before the input is declared malformed.
pub const MAX_ALIAS_STEPS: usize = 1024;

/// Lowers [`TypeRef`]s from an [`AstProvider`] into a [`TypePool`].
///
/// Lowering is deterministic: the same handle always yields the same
/// index, and nodes already in the pool are reused rather than rebuilt.
pub struct Canonicalizer<'a, P: AstProvider + ?Sized> {
    ast: &'a P,
    pool: &'a mut TypePool,
}

impl<'a, P: AstProvider + ?Sized> Canonicalizer<'a, P> {
    pub fn new(ast: &'a P, pool: &'a mut TypePool) -> Self {
        Canonicalizer { ast, pool }
    }

    /// The pool being filled.
    pub fn pool(&self) -> &TypePool {
        &*self.pool
    }

    /// Lower one type handle.
    pub fn lower(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        let quals = self.ast.qualifiers(ty);
        let inner = self.lower_unqualified(ty)?;
        if quals.is_empty() || matches!(self.pool.get(inner), Type::Primitive(_)) {
            return Ok(inner);
        }
        Ok(self.pool.intern(
            TypeKey::Qualified { quals, inner },
            Type::Qualified(QualifiedType { quals, inner }),
        ))
    }

    /// Lower the shape of `ty`; primitives keep the qualifiers they spell.
    fn lower_unqualified(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        match self.ast.type_kind(ty) {
            TypeKind::Typedef => self.lower_alias(ty),
            TypeKind::Pointer => self.lower_pointer(ty),
            TypeKind::Elaborated => {
                let named = self
                    .ast
                    .named_type(ty)
                    .ok_or_else(|| self.malformed(ty, "elaborated type names nothing"))?;
                if self.ast.type_kind(named) == TypeKind::Enum {
                    return Ok(self.lower_primitive(ty));
                }
                self.lower(named)
            }
            TypeKind::Record => self.lower_record(ty),
            TypeKind::ConstantArray | TypeKind::IncompleteArray => self.lower_array(ty),
            TypeKind::Builtin
            | TypeKind::Enum
            | TypeKind::FunctionProto
            | TypeKind::FunctionNoProto => Ok(self.lower_primitive(ty)),
        }
    }

    /// Follow typedef steps until a non-typedef kind is reached.
    pub fn resolve_alias_chain(&self, ty: TypeRef) -> Result<TypeRef, LowerError> {
        let mut current = ty;
        let mut steps = 0;
        while self.ast.type_kind(current) == TypeKind::Typedef {
            if steps == MAX_ALIAS_STEPS {
                return Err(LowerError::UnterminatedAliasChain {
                    spelling: self.ast.type_spelling(ty),
                    steps,
                });
            }
            current = self.ast.canonical_step(current);
            steps += 1;
        }
        Ok(current)
    }

    /// Strip typedefs and elaborated wrappers to reach the type's shape.
    fn strip_sugar(&self, ty: TypeRef) -> Result<TypeRef, LowerError> {
        let mut current = self.resolve_alias_chain(ty)?;
        while self.ast.type_kind(current) == TypeKind::Elaborated {
            let named = self
                .ast
                .named_type(current)
                .ok_or_else(|| self.malformed(current, "elaborated type names nothing"))?;
            current = self.resolve_alias_chain(named)?;
        }
        Ok(current)
    }

    fn lower_alias(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        let decl = self
            .ast
            .declaration(ty)
            .ok_or_else(|| self.malformed(ty, "typedef without a declaration"))?;
        if let Some(existing) = self.pool.find(&TypeKey::Alias(decl)) {
            return Ok(existing);
        }
        let resolved = self.resolve_alias_chain(ty)?;
        let target = self.lower(resolved)?;
        let name = self.ast.decl_spelling(decl).to_owned();
        tracing::trace!(%name, "lowered typedef");
        Ok(self
            .pool
            .intern(TypeKey::Alias(decl), Type::Alias(TypeAlias { name, target })))
    }

    fn lower_pointer(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        let pointee = self
            .ast
            .pointee(ty)
            .ok_or_else(|| self.malformed(ty, "pointer without a pointee"))?;
        let size = self
            .ast
            .size_of(ty)
            .ok_or_else(|| self.malformed(ty, "pointer without a size"))?;

        let shape = self.strip_sugar(pointee)?;
        if self.ast.type_kind(shape).is_function() {
            return self.lower_function_pointer(shape, size);
        }

        let pointee = self.lower(pointee)?;
        Ok(self
            .pool
            .intern(TypeKey::Pointer(pointee), Type::Pointer(Pointer { pointee, size })))
    }

    fn lower_function_pointer(&mut self, func: TypeRef, size: u64) -> Result<TypeIdx, LowerError> {
        let ret = self
            .ast
            .result_type(func)
            .ok_or_else(|| self.malformed(func, "function type without a result"))?;
        let ret = self.lower(ret)?;
        let ast = self.ast;
        let params = ast
            .argument_types(func)
            .iter()
            .map(|param| self.lower(*param))
            .collect::<Result<Vec<_>, _>>()?;
        let variadic = self.ast.is_variadic(func);
        let prototyped = self.ast.is_prototyped(func);

        let key = TypeKey::FunctionPointer {
            ret,
            params: params.clone().into_boxed_slice(),
            variadic,
            prototyped,
        };
        Ok(self.pool.intern(
            key,
            Type::FunctionPointer(FunctionPointer {
                ret,
                params,
                variadic,
                prototyped,
                size,
            }),
        ))
    }

    fn lower_record(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        let decl = self
            .ast
            .declaration(ty)
            .ok_or_else(|| self.malformed(ty, "record without a declaration"))?;
        if let Some(existing) = self.pool.find(&TypeKey::Record(decl)) {
            return Ok(existing);
        }
        let kind = match self.ast.decl_kind(decl) {
            DeclKind::UnionDecl => RecordKind::Union,
            _ => RecordKind::Struct,
        };
        let layout = match (self.ast.size_of(ty), self.ast.align_of(ty)) {
            (Some(size), Some(align)) => Some(RecordLayout { size, align }),
            _ => None,
        };
        let record = RecordType {
            name: self.ast.type_spelling(ty),
            kind,
            decl,
            layout,
        };
        Ok(self.pool.intern(TypeKey::Record(decl), Type::Record(record)))
    }

    fn lower_array(&mut self, ty: TypeRef) -> Result<TypeIdx, LowerError> {
        let element = self
            .ast
            .array_element(ty)
            .ok_or_else(|| self.malformed(ty, "array without an element type"))?;
        let element = self.lower(element)?;
        let len = self.ast.array_len(ty);
        let size = self.ast.size_of(ty);
        Ok(self.pool.intern(
            TypeKey::Array { element, len },
            Type::Array(ArrayType { element, len, size }),
        ))
    }

    fn lower_primitive(&mut self, ty: TypeRef) -> TypeIdx {
        let spelling = self.ast.type_spelling(ty);
        let decl = match self.ast.type_kind(ty) {
            TypeKind::Enum => self.ast.declaration(ty),
            TypeKind::Elaborated => self.ast.named_type(ty).and_then(|e| self.ast.declaration(e)),
            _ => None,
        };
        let key = TypeKey::Primitive {
            spelling: spelling.clone(),
            decl,
        };
        if let Some(existing) = self.pool.find(&key) {
            return existing;
        }
        let prim = PrimitiveType {
            spelling,
            size: self.ast.size_of(ty),
            align: self.ast.align_of(ty),
        };
        self.pool.intern(key, Type::Primitive(prim))
    }

    fn malformed(&self, ty: TypeRef, reason: &'static str) -> LowerError {
        LowerError::MalformedType {
            spelling: self.ast.type_spelling(ty),
            reason,
        }
    }
}
