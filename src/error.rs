use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// An opaque, clonable error handle delivered through `on_error`.
///
/// The kernel never inspects errors; it carries them through the pipeline
/// unchanged and hands them to whichever observer terminates on them.
/// Cloning is cheap (the underlying diagnostic is shared).
#[derive(Clone)]
pub struct RxError(Arc<dyn Error + Send + Sync>);

impl RxError {
  /// Wraps any error type into a shared handle.
  pub fn new<E>(error: E) -> Self
  where
    E: Error + Send + Sync + 'static,
  {
    RxError(Arc::new(error))
  }

  /// An error carrying only a message.
  pub fn msg(message: impl Into<String>) -> Self {
    RxError(Arc::new(Message(message.into())))
  }

  /// Converts a captured panic payload into an error signal. Panics in
  /// user selectors and subscribe functions surface this way instead of
  /// unwinding through the pipeline.
  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    if let Some(text) = payload.downcast_ref::<&str>() {
      RxError::msg(*text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
      RxError::msg(text.clone())
    } else {
      RxError::msg("user callback panicked")
    }
  }

  /// The underlying diagnostic.
  pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
    self.0.as_ref()
  }

  pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
    self.0.downcast_ref::<E>()
  }
}

impl fmt::Display for RxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0, f)
  }
}

impl fmt::Debug for RxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.0, f)
  }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn message_round_trip() {
    let err = RxError::msg("boom");
    assert_eq!(err.to_string(), "boom");
    assert_eq!(err.clone().to_string(), "boom");
  }

  #[test]
  fn wraps_std_errors() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    let err = RxError::new(io);
    assert!(err.downcast_ref::<std::io::Error>().is_some());
    assert!(err.downcast_ref::<std::fmt::Error>().is_none());
  }

  #[test]
  fn panic_payloads_keep_their_message() {
    let caught =
      std::panic::catch_unwind(|| panic!("selector exploded")).unwrap_err();
    let err = RxError::from_panic(caught);
    assert_eq!(err.to_string(), "selector exploded");
  }
}
