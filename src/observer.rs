//! The three-signal sink contract and the observers the kernel itself
//! builds: callback observers, the null observer, and the auto-detach
//! wrapper that mechanically enforces the Rx contract.

use std::sync::{Arc, Mutex};

use crate::disposable::{Disposable, DisposableLike, SerialDisposable};
use crate::error::RxError;

/// A consumer of the values an observable delivers: any number of
/// `on_next` calls, then at most one of `on_completed` / `on_error`.
pub trait Observer<Item>: Send + Sync {
  fn on_next(&self, value: Item);
  fn on_completed(&self);
  fn on_error(&self, error: RxError);
}

/// Shared observer handle, the currency of every subscription.
pub type ObserverRef<Item> = Arc<dyn Observer<Item>>;

struct EmptyObserver;

impl<Item> Observer<Item> for EmptyObserver {
  fn on_next(&self, _: Item) {}
  fn on_completed(&self) {}
  fn on_error(&self, _: RxError) {}
}

/// The null observer: accepts and drops every signal. Substituted where a
/// sink needs a valid observer after detaching the real one.
pub fn empty<Item: 'static>() -> ObserverRef<Item> {
  Arc::new(EmptyObserver)
}

type NextFn<Item> = Arc<dyn Fn(Item) + Send + Sync>;
type ErrorFn = Box<dyn FnOnce(RxError) + Send>;
type CompletedFn = Box<dyn FnOnce() + Send>;

struct Callbacks<Item> {
  next: NextFn<Item>,
  error: Option<ErrorFn>,
  completed: Option<CompletedFn>,
}

/// Observer built from callbacks. The callback record is cleared when a
/// terminal signal is delivered, so at most one terminal callback ever
/// runs and later signals are dropped.
pub struct FnObserver<Item> {
  callbacks: Mutex<Option<Callbacks<Item>>>,
}

impl<Item> FnObserver<Item> {
  pub(crate) fn new(
    next: NextFn<Item>,
    error: Option<ErrorFn>,
    completed: Option<CompletedFn>,
  ) -> Self {
    FnObserver {
      callbacks: Mutex::new(Some(Callbacks {
        next,
        error,
        completed,
      })),
    }
  }
}

impl<Item> Observer<Item> for FnObserver<Item> {
  fn on_next(&self, value: Item) {
    let next = {
      let callbacks = self.callbacks.lock().unwrap();
      callbacks.as_ref().map(|c| c.next.clone())
    };
    if let Some(next) = next {
      (*next)(value);
    }
  }

  fn on_completed(&self) {
    let callbacks = self.callbacks.lock().unwrap().take();
    if let Some(callbacks) = callbacks {
      if let Some(completed) = callbacks.completed {
        completed();
      }
    }
  }

  fn on_error(&self, error: RxError) {
    let callbacks = self.callbacks.lock().unwrap().take();
    if let Some(callbacks) = callbacks {
      if let Some(on_error) = callbacks.error {
        on_error(error);
      }
    }
  }
}

/// An observer that only cares about values.
pub fn create<Item: 'static>(
  next: impl Fn(Item) + Send + Sync + 'static,
) -> ObserverRef<Item> {
  Arc::new(FnObserver::new(Arc::new(next), None, None))
}

/// An observer with all three callbacks.
pub fn create_all<Item: 'static>(
  next: impl Fn(Item) + Send + Sync + 'static,
  error: impl FnOnce(RxError) + Send + 'static,
  completed: impl FnOnce() + Send + 'static,
) -> ObserverRef<Item> {
  Arc::new(FnObserver::new(
    Arc::new(next),
    Some(Box::new(error)),
    Some(Box::new(completed)),
  ))
}

/// Wraps a downstream observer and owns its subscription.
///
/// Guarantees, on top of forwarding:
/// - after a terminal signal is delivered the inner observer is cleared
///   and the subscription disposed, so nothing further reaches it;
/// - a panic during delivery still disposes the subscription before the
///   panic propagates;
/// - disposing the wrapper clears the inner observer, turning in-flight
///   late signals into no-ops.
pub struct AutoDetachObserver<Item> {
  observer: Mutex<Option<ObserverRef<Item>>>,
  subscription: SerialDisposable,
}

impl<Item> AutoDetachObserver<Item> {
  pub fn new(observer: ObserverRef<Item>) -> Self {
    AutoDetachObserver {
      observer: Mutex::new(Some(observer)),
      subscription: SerialDisposable::new(),
    }
  }

  /// Hands the wrapper the subscription it will tear down on terminal
  /// signals or dispose.
  pub fn set_subscription(&self, subscription: Disposable) {
    self.subscription.set(subscription);
  }
}

struct DisposeOnExit<'a> {
  subscription: &'a SerialDisposable,
  armed: bool,
}

impl Drop for DisposeOnExit<'_> {
  fn drop(&mut self) {
    if self.armed {
      self.subscription.dispose();
    }
  }
}

impl<Item> Observer<Item> for AutoDetachObserver<Item> {
  fn on_next(&self, value: Item) {
    let observer = self.observer.lock().unwrap().clone();
    if let Some(observer) = observer {
      let mut exit = DisposeOnExit {
        subscription: &self.subscription,
        armed: true,
      };
      observer.on_next(value);
      exit.armed = false;
    }
  }

  fn on_completed(&self) {
    let observer = self.observer.lock().unwrap().take();
    if let Some(observer) = observer {
      let _exit = DisposeOnExit {
        subscription: &self.subscription,
        armed: true,
      };
      observer.on_completed();
    }
  }

  fn on_error(&self, error: RxError) {
    let observer = self.observer.lock().unwrap().take();
    if let Some(observer) = observer {
      let _exit = DisposeOnExit {
        subscription: &self.subscription,
        armed: true,
      };
      observer.on_error(error);
    }
  }
}

impl<Item> DisposableLike for AutoDetachObserver<Item> {
  fn dispose(&self) {
    self.observer.lock().unwrap().take();
    self.subscription.dispose();
  }

  fn is_disposed(&self) -> bool {
    self.observer.lock().unwrap().is_none()
  }
}
