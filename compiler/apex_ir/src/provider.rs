//! The query interface the signature engine consumes.

use crate::{DeclId, DeclKind, Qualifiers, TypeKind, TypeRef};

/// Structural queries over a parsed translation unit.
///
/// Every method is a pure lookup. Queries that do not apply to the kind of
/// the handle return `None` (or an empty slice / `false`) rather than
/// panicking, so consumers can match on [`TypeKind`] first and treat a
/// missing answer as malformed input.
pub trait AstProvider {
    /// The translation-unit declaration at the top of the tree.
    fn root(&self) -> DeclId;

    /// Kind tag of a declaration.
    fn decl_kind(&self, decl: DeclId) -> DeclKind;

    /// Declared name; empty for anonymous records and unnamed fields.
    fn decl_spelling(&self, decl: DeclId) -> &str;

    /// Child declarations in document order.
    fn decl_children(&self, decl: DeclId) -> &[DeclId];

    /// The type a declaration introduces or has.
    fn decl_type(&self, decl: DeclId) -> Option<TypeRef>;

    /// Bit offset of a field from the start of its record.
    fn field_offset_bits(&self, decl: DeclId) -> Option<u64>;

    /// Declared width of a bit-field member.
    fn field_bit_width(&self, decl: DeclId) -> Option<u32>;

    /// Kind tag of a type.
    fn type_kind(&self, ty: TypeRef) -> TypeKind;

    /// Qualifiers on this handle. The shape queries ignore them.
    fn qualifiers(&self, ty: TypeRef) -> Qualifiers;

    /// C spelling of a type, e.g. `const char *` or `int (*)(int)`.
    fn type_spelling(&self, ty: TypeRef) -> String;

    /// Follow one alias step: a typedef yields its underlying type, any
    /// other type yields itself.
    fn canonical_step(&self, ty: TypeRef) -> TypeRef;

    /// Size in bytes; `None` for incomplete types.
    fn size_of(&self, ty: TypeRef) -> Option<u64>;

    /// Alignment in bytes; `None` for incomplete types.
    fn align_of(&self, ty: TypeRef) -> Option<u64>;

    /// Pointee of a pointer type.
    fn pointee(&self, ty: TypeRef) -> Option<TypeRef>;

    /// Return type of a function type.
    fn result_type(&self, ty: TypeRef) -> Option<TypeRef>;

    /// Parameter types of a function type, in order.
    fn argument_types(&self, ty: TypeRef) -> &[TypeRef];

    /// Whether a function type ends in `...`.
    fn is_variadic(&self, ty: TypeRef) -> bool;

    /// Whether a function type carries a parameter list (`f(void)`, not `f()`).
    fn is_prototyped(&self, ty: TypeRef) -> bool;

    /// Underlying tag type of an elaborated type.
    fn named_type(&self, ty: TypeRef) -> Option<TypeRef>;

    /// Element type of an array type.
    fn array_element(&self, ty: TypeRef) -> Option<TypeRef>;

    /// Bound of a constant array type.
    fn array_len(&self, ty: TypeRef) -> Option<u64>;

    /// Declaration behind a record, enum or typedef type. For records this
    /// is the defining declaration once one has been seen.
    fn declaration(&self, ty: TypeRef) -> Option<DeclId>;
}
