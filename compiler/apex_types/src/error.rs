//! Lowering errors.

/// Malformed input from the front end. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// A typedef chain that never reaches a non-typedef type.
    #[error("typedef chain starting at `{spelling}` does not terminate after {steps} steps")]
    UnterminatedAliasChain { spelling: String, steps: usize },

    /// A type whose kind promises structure the front end cannot supply.
    #[error("malformed type `{spelling}`: {reason}")]
    MalformedType {
        spelling: String,
        reason: &'static str,
    },
}
