//! C header front end for apex.
//!
//! Parses preprocessed C, or a self-contained header, into an
//! [`apex_ir::TranslationUnit`]. The front end models exactly what shapes
//! types: typedefs, tag definitions, record members with their layout, and
//! the types of file-scope variables and functions. Function bodies and
//! initializers are skipped.
//!
//! # Pipeline
//!
//! ```text
//! source ──lex──▶ tokens + line markers ──parse──▶ TranslationUnit
//!                                          │
//!                                          ├─ constant expressions
//!                                          └─ record layout (per Target)
//! ```
//!
//! Layout follows the SysV rules GCC and Clang use on the selected
//! [`Target`]: natural alignment, tail padding, bit-fields that never
//! straddle a unit of their declared type, and the `packed` and `aligned`
//! attributes.

mod error;
mod keywords;
mod layout;
mod lexer;
mod parser;
mod source_map;
mod stack;
mod target;

pub use error::{ParseError, TargetError};
pub use source_map::{Location, SourceMap};
pub use target::{Arch, DataModel, Os, Scalar, ScalarLayout, Target};

use apex_ir::TranslationUnit;

/// Parse `source` into a translation unit.
///
/// `file_name` names the input in diagnostics until the first line
/// marker; after that, locations follow the markers.
#[tracing::instrument(level = "debug", skip_all, fields(file = file_name, triple = target.triple()))]
pub fn parse(source: &str, file_name: &str, target: &Target) -> Result<TranslationUnit, ParseError> {
    let tokens = lexer::lex(source, file_name)?;
    parser::Parser::new(source, &tokens.tokens, &tokens.map, target).parse_translation_unit()
}
