//! Type model for apex signatures.
//!
//! # Representation
//!
//! A [`Type`] is one of seven shapes: primitive, alias, pointer, function
//! pointer, record, array or qualified. Nodes live in a [`TypePool`] and are referred
//! to by [`TypeIdx`]; children are indices, never boxes, so a record that
//! points at itself is just an index cycle.
//!
//! # Identity
//!
//! The pool interns by canonical identity: records and aliases by their
//! declaration handle, pointers, function pointers and arrays by the
//! identity of what they are built from, primitives by spelling. Lowering
//! the same front-end type twice yields the same index, which is what the
//! graph walker's visited set keys on.
//!
//! Qualifiers are part of identity for every kind. A primitive spells them
//! (`const char`); anything else is wrapped in a qualified node over the
//! unqualified type, so `const Info *` and `Info *` are distinct pointers
//! while `Info` keeps a single node.
//!
//! # Lowering
//!
//! [`Canonicalizer`] turns front-end [`apex_ir::TypeRef`]s into pool
//! nodes: it resolves typedef chains, tells function pointers apart from
//! data pointers and unwraps elaborated tag references. Record members are
//! not enumerated here; records come out as stubs.

mod error;
mod idx;
mod lower;
mod model;
mod pool;

pub use error::LowerError;
pub use idx::TypeIdx;
pub use lower::{Canonicalizer, MAX_ALIAS_STEPS};
pub use model::{
    ArrayType, BitField, FunctionPointer, Member, Pointer, PrimitiveType, QualifiedType,
    RecordType, Type, TypeAlias,
};
pub use pool::TypePool;
