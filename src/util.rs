use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::RxError;

/// Runs a user-supplied callback, converting a panic into an error signal.
/// Operators call this at every selector/predicate/accumulator boundary so
/// a fault in user code terminates the subscription via `on_error` instead
/// of unwinding through unrelated pipeline frames.
pub(crate) fn guard<R>(f: impl FnOnce() -> R) -> Result<R, RxError> {
  catch_unwind(AssertUnwindSafe(f)).map_err(RxError::from_panic)
}
