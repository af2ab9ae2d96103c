//! Front-end errors.

/// A header the front end cannot make sense of.
///
/// Locations are presumed locations: after a line marker they name the
/// original header and line, not the preprocessed stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}:{col}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub message: String,
}

/// A target triple whose data model is not known.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("unsupported target architecture `{arch}` in `{triple}`")]
    UnknownArch { arch: String, triple: String },

    #[error("malformed target triple `{0}`")]
    Malformed(String),
}
