//! Type signatures of C API types.
//!
//! Three phases, each usable on its own:
//!
//! 1. [`collect_complete_types`] indexes every complete struct, union and
//!    typedef of a translation unit by name.
//! 2. [`GraphWalker`] looks a root up in that index and computes the
//!    [`Closure`] of every type reachable from it: record members, pointees,
//!    function-pointer returns and parameters, alias targets and array
//!    elements.
//! 3. [`render`] turns the closure into a [`Signature`], one text block per
//!    type, sorted so the output is identical for identical input.
//!
//! [`analyze`] runs all three. Diffing the signatures of two versions of a
//! library shows every layout change that can break binary compatibility.

mod collect;
mod error;
mod render;
mod walk;

pub use collect::{collect_complete_types, IndexEntry, RedefinitionPolicy, TypeIndex};
pub use error::SignatureError;
pub use render::{render, signature_of, Signature, SignatureBlock};
pub use walk::{Closure, GraphWalker};

use apex_ir::AstProvider;

/// Knobs for [`analyze`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct AnalyzeOptions {
    pub policy: RedefinitionPolicy,
}

/// Collect, walk and render the signature of `root`.
#[tracing::instrument(level = "debug", skip(ast, options))]
pub fn analyze<P: AstProvider + ?Sized>(
    ast: &P,
    root: &str,
    options: AnalyzeOptions,
) -> Result<Signature, SignatureError> {
    let index = collect_complete_types(ast, options.policy)?;
    let closure = GraphWalker::new(ast, &index).walk(root)?;
    Ok(render(&closure))
}
