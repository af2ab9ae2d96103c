//! Kind tags for declarations and types.

use std::fmt;

/// Kind tag of a declaration node.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclKind {
    /// The root of the declaration tree.
    TranslationUnit,
    /// `struct Tag { ... }` or `struct Tag;`
    StructDecl,
    /// `union Tag { ... }` or `union Tag;`
    UnionDecl,
    /// `enum Tag { ... }`
    EnumDecl,
    /// A single enumerator inside an enum.
    EnumConstantDecl,
    /// `typedef T Name;`
    TypedefDecl,
    /// A member of a struct or union.
    FieldDecl,
    /// A function prototype or definition.
    FunctionDecl,
    /// A file-scope variable.
    VarDecl,
}

impl DeclKind {
    /// Struct and union declarations.
    #[inline]
    pub fn is_record(self) -> bool {
        matches!(self, DeclKind::StructDecl | DeclKind::UnionDecl)
    }
}

/// Kind tag of a type, mirroring the classes a C front end distinguishes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    /// `void`, integers, floating types, `_Bool`, builtin `va_list`.
    Builtin,
    /// An enumeration type.
    Enum,
    /// A typedef name.
    Typedef,
    /// A data or function pointer.
    Pointer,
    /// A function type with a parameter list.
    FunctionProto,
    /// A K&R-style function type, `int f()`.
    FunctionNoProto,
    /// A struct or union.
    Record,
    /// A tag type spelled with its keyword (`struct Foo`).
    Elaborated,
    /// `T[N]`
    ConstantArray,
    /// `T[]`
    IncompleteArray,
}

impl TypeKind {
    /// Function types, prototyped or not.
    #[inline]
    pub fn is_function(self) -> bool {
        matches!(self, TypeKind::FunctionProto | TypeKind::FunctionNoProto)
    }

    /// Array types, bounded or not.
    #[inline]
    pub fn is_array(self) -> bool {
        matches!(self, TypeKind::ConstantArray | TypeKind::IncompleteArray)
    }
}

/// Struct or union.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RecordKind {
    Struct,
    Union,
}

impl RecordKind {
    /// The C keyword introducing this record kind.
    pub fn keyword(self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

bitflags::bitflags! {
    /// C type qualifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, word) in [
            (Qualifiers::CONST, "const"),
            (Qualifiers::VOLATILE, "volatile"),
            (Qualifiers::RESTRICT, "restrict"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(word)?;
                first = false;
            }
        }
        Ok(())
    }
}
