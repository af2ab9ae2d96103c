//! Signature engine errors.

use apex_types::LowerError;

/// Everything that stops a signature from being produced.
///
/// Incomplete records are not errors: they render as name-only stubs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The requested root type is not a complete type of the unit.
    #[error("type `{name}` not found (or not complete) in translation unit")]
    TypeNotFound { name: String },

    /// Two complete definitions of one name that are not the same type.
    #[error("conflicting definitions of `{name}`: `{first}` and `{second}`")]
    ConflictingDefinition {
        name: String,
        first: String,
        second: String,
    },

    /// A field declaration the front end left without a type or offset.
    #[error("field `{field}` of `{record}` has no {what}")]
    MalformedField {
        record: String,
        field: String,
        what: &'static str,
    },

    #[error(transparent)]
    Lower(#[from] LowerError),
}
