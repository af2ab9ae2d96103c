//! The closed set of type shapes a signature is made of.

use apex_ir::{DeclId, Qualifiers, RecordKind, RecordLayout};

use crate::TypeIdx;

/// Leaf type: integers, floats, `_Bool`, `void`, enums and anything else
/// without further structure worth walking.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PrimitiveType {
    pub spelling: String,
    pub size: Option<u64>,
    pub align: Option<u64>,
}

/// A typedef name and the type its alias chain ends at.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeAlias {
    pub name: String,
    pub target: TypeIdx,
}

/// Data pointer. `size` is the target's pointer width.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Pointer {
    pub pointee: TypeIdx,
    pub size: u64,
}

/// Pointer to a function.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionPointer {
    pub ret: TypeIdx,
    pub params: Vec<TypeIdx>,
    pub variadic: bool,
    /// `false` for K&R-style `int (*)()`.
    pub prototyped: bool,
    pub size: u64,
}

/// Struct or union stub. Members are enumerated by the graph walker.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordType {
    /// Display name, keyword included (`struct Foo`).
    pub name: String,
    pub kind: RecordKind,
    pub decl: DeclId,
    /// `None` for incomplete (forward-declared) records.
    pub layout: Option<RecordLayout>,
}

impl RecordType {
    /// A record is complete when the front end reports a positive size.
    pub fn is_complete(&self) -> bool {
        self.layout.is_some_and(|l| l.size > 0)
    }
}

/// Fixed or flexible array.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ArrayType {
    pub element: TypeIdx,
    pub len: Option<u64>,
    pub size: Option<u64>,
}

/// A qualified typedef, record, pointer or array. Primitives carry their
/// qualifiers in the spelling instead.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct QualifiedType {
    pub quals: Qualifiers,
    pub inner: TypeIdx,
}

/// One node of the type graph.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Primitive(PrimitiveType),
    Alias(TypeAlias),
    Pointer(Pointer),
    FunctionPointer(FunctionPointer),
    Record(RecordType),
    Array(ArrayType),
    Qualified(QualifiedType),
}

impl Type {
    /// Types this node refers to directly, in a fixed order.
    ///
    /// Records return nothing here: their members are enumerated lazily by
    /// the walker, which owns the member lists.
    pub fn children(&self) -> Vec<TypeIdx> {
        match self {
            Type::Primitive(_) | Type::Record(_) => Vec::new(),
            Type::Alias(alias) => vec![alias.target],
            Type::Pointer(ptr) => vec![ptr.pointee],
            Type::FunctionPointer(fp) => {
                let mut out = Vec::with_capacity(fp.params.len() + 1);
                out.push(fp.ret);
                out.extend_from_slice(&fp.params);
                out
            }
            Type::Array(arr) => vec![arr.element],
            Type::Qualified(qual) => vec![qual.inner],
        }
    }

    /// The record stub, if this node is one.
    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Type::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Bit-field placement of a member.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BitField {
    pub width: u32,
    /// Offset from the start of the record, in bits.
    pub bit_offset: u64,
}

/// A record member, in declaration order.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Member {
    /// Empty for anonymous struct/union members.
    pub name: String,
    /// Declared type spelling, aliases intact.
    pub spelling: String,
    pub ty: TypeIdx,
    /// Byte offset from the start of the record.
    pub offset: u64,
    /// `None` for flexible array members.
    pub size: Option<u64>,
    pub bit_field: Option<BitField>,
}
