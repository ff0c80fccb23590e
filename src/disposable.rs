//! Cancellation primitives.
//!
//! Every subscription in the kernel is represented by a disposable: an
//! idempotent cancellation token. Disposing twice is the same as disposing
//! once, and teardown always runs outside the handle's own lock so that
//! re-entrant dispose calls cannot deadlock.

use std::sync::{Arc, Mutex};

use crate::scheduler::Scheduler;

/// Common surface of every cancellation handle.
pub trait DisposableLike: Send + Sync {
  fn dispose(&self);
  fn is_disposed(&self) -> bool;
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Plain disposable wrapping a teardown callback invoked at most once.
///
/// Clones share the same slot, so disposing any clone runs the callback
/// and marks every clone disposed.
#[derive(Clone)]
pub struct Disposable {
  teardown: Arc<Mutex<Option<Teardown>>>,
}

impl Disposable {
  pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
    Disposable {
      teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
    }
  }

  /// A disposable with nothing to tear down.
  pub fn empty() -> Self {
    Disposable {
      teardown: Arc::new(Mutex::new(None)),
    }
  }

  /// Adapts any disposable into the plain handle shape.
  pub fn wrap(inner: impl DisposableLike + 'static) -> Self {
    Disposable::new(move || inner.dispose())
  }
}

impl DisposableLike for Disposable {
  fn dispose(&self) {
    let teardown = self.teardown.lock().unwrap().take();
    if let Some(teardown) = teardown {
      teardown();
    }
  }

  fn is_disposed(&self) -> bool {
    self.teardown.lock().unwrap().is_none()
  }
}

/// Aggregates child disposables; disposing the composite disposes all of
/// them. Adding to an already-disposed composite disposes the newcomer
/// immediately.
#[derive(Clone)]
pub struct CompositeDisposable {
  children: Arc<Mutex<Option<Vec<Box<dyn DisposableLike>>>>>,
}

impl CompositeDisposable {
  pub fn new() -> Self {
    CompositeDisposable {
      children: Arc::new(Mutex::new(Some(Vec::new()))),
    }
  }

  pub fn add(&self, child: impl DisposableLike + 'static) {
    let mut guard = self.children.lock().unwrap();
    match guard.as_mut() {
      Some(children) => children.push(Box::new(child)),
      None => {
        drop(guard);
        child.dispose();
      }
    }
  }

  pub fn len(&self) -> usize {
    self.children.lock().unwrap().as_ref().map_or(0, Vec::len)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for CompositeDisposable {
  fn default() -> Self {
    CompositeDisposable::new()
  }
}

impl DisposableLike for CompositeDisposable {
  fn dispose(&self) {
    let children = self.children.lock().unwrap().take();
    if let Some(children) = children {
      for child in children {
        child.dispose();
      }
    }
  }

  fn is_disposed(&self) -> bool {
    self.children.lock().unwrap().is_none()
  }
}

struct SerialSlot {
  disposed: bool,
  current: Option<Box<dyn DisposableLike>>,
}

/// Single-slot disposable. Assigning a new occupant disposes the previous
/// one; assigning after dispose disposes the newcomer immediately.
#[derive(Clone)]
pub struct SerialDisposable {
  slot: Arc<Mutex<SerialSlot>>,
}

impl SerialDisposable {
  pub fn new() -> Self {
    SerialDisposable {
      slot: Arc::new(Mutex::new(SerialSlot {
        disposed: false,
        current: None,
      })),
    }
  }

  pub fn set(&self, disposable: impl DisposableLike + 'static) {
    let previous = {
      let mut slot = self.slot.lock().unwrap();
      if slot.disposed {
        drop(slot);
        disposable.dispose();
        return;
      }
      slot.current.replace(Box::new(disposable))
    };
    if let Some(previous) = previous {
      previous.dispose();
    }
  }
}

impl Default for SerialDisposable {
  fn default() -> Self {
    SerialDisposable::new()
  }
}

impl DisposableLike for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut slot = self.slot.lock().unwrap();
      if slot.disposed {
        return;
      }
      slot.disposed = true;
      slot.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  fn is_disposed(&self) -> bool {
    self.slot.lock().unwrap().disposed
  }
}

/// Disposes its wrapped disposable by scheduling the inner `dispose` on a
/// scheduler, so teardown runs where the scheduler runs its work.
#[derive(Clone)]
pub struct ScheduledDisposable {
  scheduler: Scheduler,
  inner: Arc<Mutex<Option<Box<dyn DisposableLike>>>>,
}

impl ScheduledDisposable {
  pub fn new(
    scheduler: Scheduler,
    inner: impl DisposableLike + 'static,
  ) -> Self {
    ScheduledDisposable {
      scheduler,
      inner: Arc::new(Mutex::new(Some(Box::new(inner)))),
    }
  }
}

impl DisposableLike for ScheduledDisposable {
  fn dispose(&self) {
    let inner = self.inner.lock().unwrap().take();
    if let Some(inner) = inner {
      self.scheduler.schedule(move |_| {
        inner.dispose();
        Disposable::empty()
      });
    }
  }

  fn is_disposed(&self) -> bool {
    self.inner.lock().unwrap().is_none()
  }
}

struct RefCountState {
  underlying: Option<Box<dyn DisposableLike>>,
  inner_count: usize,
  primary_disposed: bool,
}

/// Keeps an underlying disposable alive while any handed-out inner
/// disposable is still live. The underlying is disposed once the primary
/// has been disposed and the last inner handle has gone.
#[derive(Clone)]
pub struct RefCountDisposable {
  state: Arc<Mutex<RefCountState>>,
}

impl RefCountDisposable {
  pub fn new(underlying: impl DisposableLike + 'static) -> Self {
    RefCountDisposable {
      state: Arc::new(Mutex::new(RefCountState {
        underlying: Some(Box::new(underlying)),
        inner_count: 0,
        primary_disposed: false,
      })),
    }
  }

  /// Hands out a dependent handle keeping the underlying alive.
  pub fn inner(&self) -> Disposable {
    {
      let mut state = self.state.lock().unwrap();
      if state.underlying.is_none() {
        return Disposable::empty();
      }
      state.inner_count += 1;
    }
    let state = self.state.clone();
    Disposable::new(move || {
      let release = {
        let mut state = state.lock().unwrap();
        state.inner_count -= 1;
        if state.primary_disposed && state.inner_count == 0 {
          state.underlying.take()
        } else {
          None
        }
      };
      if let Some(underlying) = release {
        underlying.dispose();
      }
    })
  }
}

impl DisposableLike for RefCountDisposable {
  fn dispose(&self) {
    let release = {
      let mut state = self.state.lock().unwrap();
      if state.primary_disposed {
        return;
      }
      state.primary_disposed = true;
      if state.inner_count == 0 {
        state.underlying.take()
      } else {
        None
      }
    };
    if let Some(underlying) = release {
      underlying.dispose();
    }
  }

  fn is_disposed(&self) -> bool {
    self.state.lock().unwrap().primary_disposed
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  fn counter() -> (Arc<AtomicUsize>, Disposable) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let d = Disposable::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    (count, d)
  }

  #[test]
  fn dispose_is_idempotent() {
    let (count, d) = counter();
    assert!(!d.is_disposed());
    d.dispose();
    d.dispose();
    d.clone().dispose();
    assert!(d.is_disposed());
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn composite_disposes_children() {
    let (c1, d1) = counter();
    let (c2, d2) = counter();
    let composite = CompositeDisposable::new();
    composite.add(d1);
    composite.add(d2);
    composite.dispose();
    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn add_to_disposed_composite_disposes_immediately() {
    let composite = CompositeDisposable::new();
    composite.dispose();
    let (count, d) = counter();
    composite.add(d);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn serial_swaps_dispose_the_previous() {
    let (c1, d1) = counter();
    let (c2, d2) = counter();
    let serial = SerialDisposable::new();
    serial.set(d1);
    serial.set(d2);
    assert_eq!(c1.load(Ordering::SeqCst), 1);
    assert_eq!(c2.load(Ordering::SeqCst), 0);
    serial.dispose();
    assert_eq!(c2.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn serial_set_after_dispose_disposes_newcomer() {
    let serial = SerialDisposable::new();
    serial.dispose();
    let (count, d) = counter();
    serial.set(d);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn ref_count_waits_for_all_inner_handles() {
    let (count, d) = counter();
    let rc = RefCountDisposable::new(d);
    let a = rc.inner();
    let b = rc.inner();
    rc.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    a.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 0);
    b.dispose();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
