//! Stack growth for the recursive-descent parser.
//!
//! Nested declarators and parenthesised constant expressions recurse once
//! per level. Deeply nested input grows the stack instead of overflowing.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
