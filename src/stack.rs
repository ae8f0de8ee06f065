//! Stack safety for deep recursion.
//!
//! The parser and the evaluator recurse once per nesting level, and user
//! functions add their own levels on top, so the host stack is grown on
//! demand with `stacker` instead of being trusted to be large enough.

/// Run `f`, first moving to a fresh stack segment when less than the red
/// zone is left on the current one.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (128KB red zone).
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each newly allocated segment (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
