//! Translation-unit interface for the apex signature engine.
//!
//! The signature engine never talks to a parser directly. It asks a narrow
//! set of structural questions through [`AstProvider`]: what declarations
//! exist, what type each one has, how big and how aligned a type is, and how
//! one type refers to another (pointee, alias step, parameters, elements).
//!
//! # Handles
//!
//! Declarations and types are referenced by 32-bit handles ([`DeclId`],
//! [`TypeRef`]). A handle is only meaningful for the unit that produced it.
//! Handle equality is identity: two records with the same spelling declared
//! in different places have different [`DeclId`]s.
//!
//! # In-memory units
//!
//! [`TranslationUnit`] is the one concrete provider in the workspace. The C
//! front end fills it through [`UnitBuilder`]; tests build small units by
//! hand with the same builder, which keeps the engine testable without a
//! parser.

mod handle;
mod kind;
mod provider;
mod unit;

pub use handle::{DeclId, TypeRef};
pub use kind::{DeclKind, Qualifiers, RecordKind, TypeKind};
pub use provider::AstProvider;
pub use unit::{FieldLayout, RecordLayout, TranslationUnit, TypeData, UnitBuilder};
