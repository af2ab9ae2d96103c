//! In-memory translation unit.
//!
//! A flat arena of declarations and types addressed by [`DeclId`] and
//! [`TypeRef`]. Types only ever refer to handles created before them (the
//! builder hands out a handle before it can be referenced), so every chain
//! of typedefs, pointers and arrays bottoms out; the one exception is record
//! layout, which is filled in after the record handle already exists.

mod builder;


pub use builder::UnitBuilder;

use crate::{AstProvider, DeclId, DeclKind, Qualifiers, RecordKind, TypeKind, TypeRef};

/// Size and alignment of a complete record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordLayout {
    pub size: u64,
    pub align: u64,
}

/// Placement of a field inside its record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldLayout {
    /// Offset from the start of the record, in bits.
    pub offset_bits: u64,
    /// Declared width, for bit-fields only.
    pub bit_width: Option<u32>,
}

/// Shape of a type stored in the unit.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    /// Builtin scalar. `size` is `None` for `void`.
    Builtin {
        name: String,
        size: Option<u64>,
        align: u64,
    },
    /// Enumeration; `spelling` includes the `enum` keyword.
    Enum {
        decl: DeclId,
        spelling: String,
        size: u64,
        align: u64,
    },
    /// Typedef name with an optional `aligned` override.
    Typedef {
        decl: DeclId,
        name: String,
        underlying: TypeRef,
        align: Option<u64>,
    },
    Pointer {
        pointee: TypeRef,
        size: u64,
        align: u64,
    },
    Function {
        ret: TypeRef,
        params: Vec<TypeRef>,
        variadic: bool,
        prototyped: bool,
    },
    /// Struct or union; `layout` is `None` until the definition closes.
    Record {
        decl: DeclId,
        kind: RecordKind,
        spelling: String,
        layout: Option<RecordLayout>,
    },
    /// A tag type referenced with its keyword.
    Elaborated { named: TypeRef },
    Array { element: TypeRef, len: Option<u64> },
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) struct TypeEntry {
    pub(crate) data: TypeData,
    pub(crate) quals: Qualifiers,
}

#[derive(Clone, Debug)]
pub(crate) struct DeclData {
    pub(crate) kind: DeclKind,
    pub(crate) spelling: String,
    pub(crate) children: Vec<DeclId>,
    pub(crate) ty: Option<TypeRef>,
    pub(crate) field: Option<FieldLayout>,
}

/// A frozen translation unit produced by [`UnitBuilder::finish`].
#[derive(Clone, Debug)]
pub struct TranslationUnit {
    decls: Vec<DeclData>,
    types: Vec<TypeEntry>,
}

impl TranslationUnit {
    /// Number of declarations, including the root.
    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Number of distinct type handles.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Shape of a type, without its qualifiers.
    pub fn type_data(&self, ty: TypeRef) -> &TypeData {
        &self.entry(ty).data
    }

    /// Qualifiers applied to a type handle.
    pub fn qualifiers(&self, ty: TypeRef) -> Qualifiers {
        self.entry(ty).quals
    }

    #[inline]
    fn decl(&self, decl: DeclId) -> &DeclData {
        &self.decls[decl.index()]
    }

    #[inline]
    fn entry(&self, ty: TypeRef) -> &TypeEntry {
        &self.types[ty.index()]
    }

    /// Spell `ty` around an inner declarator fragment, C style: the
    /// fragment for `int (*)(int)` is built outward from the pointer.
    fn spell(&self, ty: TypeRef, inner: &str) -> String {
        let entry = self.entry(ty);
        match &entry.data {
            TypeData::Pointer { pointee, .. } => {
                let mut decl = String::from("*");
                if !entry.quals.is_empty() {
                    decl.push_str(&entry.quals.to_string());
                    if !inner.is_empty() {
                        decl.push(' ');
                    }
                }
                decl.push_str(inner);
                let pointee_kind = self.type_kind(*pointee);
                if pointee_kind.is_function() || pointee_kind.is_array() {
                    decl = format!("({decl})");
                }
                self.spell(*pointee, &decl)
            }
            TypeData::Array { element, len } => {
                let decl = match len {
                    Some(len) => format!("{inner}[{len}]"),
                    None => format!("{inner}[]"),
                };
                self.spell(*element, &decl)
            }
            TypeData::Function {
                ret,
                params,
                variadic,
                prototyped,
            } => {
                let mut list: Vec<String> = params.iter().map(|p| self.spell(*p, "")).collect();
                if *variadic {
                    list.push("...".to_owned());
                } else if list.is_empty() && *prototyped {
                    list.push("void".to_owned());
                }
                let decl = format!("{inner}({})", list.join(", "));
                self.spell(*ret, &decl)
            }
            TypeData::Elaborated { named } => {
                let base = self.base_name(*named);
                join_declarator(&qualify(entry.quals, &base), inner)
            }
            TypeData::Builtin { .. }
            | TypeData::Enum { .. }
            | TypeData::Typedef { .. }
            | TypeData::Record { .. } => {
                let base = self.base_name(ty);
                join_declarator(&qualify(entry.quals, &base), inner)
            }
        }
    }

    /// Unqualified name of a named type.
    fn base_name(&self, ty: TypeRef) -> String {
        match &self.entry(ty).data {
            TypeData::Builtin { name, .. } | TypeData::Typedef { name, .. } => name.clone(),
            TypeData::Enum { spelling, .. } | TypeData::Record { spelling, .. } => {
                spelling.clone()
            }
            TypeData::Elaborated { named } => self.base_name(*named),
            TypeData::Pointer { .. } | TypeData::Function { .. } | TypeData::Array { .. } => {
                self.spell(ty, "")
            }
        }
    }
}

/// Size of `ty` in bytes, looked up in a type table.
pub(crate) fn size_in(types: &[TypeEntry], ty: TypeRef) -> Option<u64> {
    match &types[ty.index()].data {
        TypeData::Builtin { size, .. } => *size,
        TypeData::Enum { size, .. } | TypeData::Pointer { size, .. } => Some(*size),
        TypeData::Typedef { underlying, .. } => size_in(types, *underlying),
        TypeData::Function { .. } => None,
        TypeData::Record { layout, .. } => layout.map(|l| l.size),
        TypeData::Elaborated { named } => size_in(types, *named),
        TypeData::Array { element, len } => {
            let len = (*len)?;
            size_in(types, *element)?.checked_mul(len)
        }
    }
}

/// Alignment of `ty` in bytes, looked up in a type table.
pub(crate) fn align_in(types: &[TypeEntry], ty: TypeRef) -> Option<u64> {
    match &types[ty.index()].data {
        TypeData::Builtin { align, .. }
        | TypeData::Enum { align, .. }
        | TypeData::Pointer { align, .. } => Some(*align),
        TypeData::Typedef {
            underlying, align, ..
        } => match align {
            Some(align) => Some(*align),
            None => align_in(types, *underlying),
        },
        TypeData::Function { .. } => None,
        TypeData::Record { layout, .. } => layout.map(|l| l.align),
        TypeData::Elaborated { named } => align_in(types, *named),
        TypeData::Array { element, .. } => align_in(types, *element),
    }
}

fn qualify(quals: Qualifiers, base: &str) -> String {
    if quals.is_empty() {
        base.to_owned()
    } else {
        format!("{quals} {base}")
    }
}

fn join_declarator(base: &str, inner: &str) -> String {
    if inner.is_empty() {
        base.to_owned()
    } else {
        format!("{base} {inner}")
    }
}

impl AstProvider for TranslationUnit {
    fn root(&self) -> DeclId {
        DeclId::from_raw(0)
    }

    fn qualifiers(&self, ty: TypeRef) -> Qualifiers {
        self.entry(ty).quals
    }

    fn decl_kind(&self, decl: DeclId) -> DeclKind {
        self.decl(decl).kind
    }

    fn decl_spelling(&self, decl: DeclId) -> &str {
        &self.decl(decl).spelling
    }

    fn decl_children(&self, decl: DeclId) -> &[DeclId] {
        &self.decl(decl).children
    }

    fn decl_type(&self, decl: DeclId) -> Option<TypeRef> {
        self.decl(decl).ty
    }

    fn field_offset_bits(&self, decl: DeclId) -> Option<u64> {
        self.decl(decl).field.map(|f| f.offset_bits)
    }

    fn field_bit_width(&self, decl: DeclId) -> Option<u32> {
        self.decl(decl).field.and_then(|f| f.bit_width)
    }

    fn type_kind(&self, ty: TypeRef) -> TypeKind {
        match &self.entry(ty).data {
            TypeData::Builtin { .. } => TypeKind::Builtin,
            TypeData::Enum { .. } => TypeKind::Enum,
            TypeData::Typedef { .. } => TypeKind::Typedef,
            TypeData::Pointer { .. } => TypeKind::Pointer,
            TypeData::Function {
                prototyped: true, ..
            } => TypeKind::FunctionProto,
            TypeData::Function {
                prototyped: false, ..
            } => TypeKind::FunctionNoProto,
            TypeData::Record { .. } => TypeKind::Record,
            TypeData::Elaborated { .. } => TypeKind::Elaborated,
            TypeData::Array { len: Some(_), .. } => TypeKind::ConstantArray,
            TypeData::Array { len: None, .. } => TypeKind::IncompleteArray,
        }
    }

    fn type_spelling(&self, ty: TypeRef) -> String {
        self.spell(ty, "")
    }

    fn canonical_step(&self, ty: TypeRef) -> TypeRef {
        match &self.entry(ty).data {
            TypeData::Typedef { underlying, .. } => *underlying,
            _ => ty,
        }
    }

    fn size_of(&self, ty: TypeRef) -> Option<u64> {
        size_in(&self.types, ty)
    }

    fn align_of(&self, ty: TypeRef) -> Option<u64> {
        align_in(&self.types, ty)
    }

    fn pointee(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.entry(ty).data {
            TypeData::Pointer { pointee, .. } => Some(*pointee),
            _ => None,
        }
    }

    fn result_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.entry(ty).data {
            TypeData::Function { ret, .. } => Some(*ret),
            _ => None,
        }
    }

    fn argument_types(&self, ty: TypeRef) -> &[TypeRef] {
        match &self.entry(ty).data {
            TypeData::Function { params, .. } => params,
            _ => &[],
        }
    }

    fn is_variadic(&self, ty: TypeRef) -> bool {
        matches!(
            self.entry(ty).data,
            TypeData::Function { variadic: true, .. }
        )
    }

    fn is_prototyped(&self, ty: TypeRef) -> bool {
        matches!(
            self.entry(ty).data,
            TypeData::Function {
                prototyped: true,
                ..
            }
        )
    }

    fn named_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.entry(ty).data {
            TypeData::Elaborated { named } => Some(*named),
            _ => None,
        }
    }

    fn array_element(&self, ty: TypeRef) -> Option<TypeRef> {
        match &self.entry(ty).data {
            TypeData::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    fn array_len(&self, ty: TypeRef) -> Option<u64> {
        match &self.entry(ty).data {
            TypeData::Array { len, .. } => *len,
            _ => None,
        }
    }

    fn declaration(&self, ty: TypeRef) -> Option<DeclId> {
        match &self.entry(ty).data {
            TypeData::Enum { decl, .. }
            | TypeData::Typedef { decl, .. }
            | TypeData::Record { decl, .. } => Some(*decl),
            _ => None,
        }
    }
}
