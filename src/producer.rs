//! Reusable subscription-lifecycle skeleton for stateful operators.
//!
//! A `Sink` pairs the downstream observer with the outer cancel
//! disposable. Terminal forwarding tears the subscription down;
//! `dispose` swaps the observer for the null observer so signals racing
//! with disposal are absorbed by a still-valid sink.

use std::sync::{Arc, Mutex};

use crate::disposable::{Disposable, DisposableLike, SerialDisposable};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{self, Observer, ObserverRef};

struct SinkState<Item> {
  observer: ObserverRef<Item>,
  cancel: Option<Disposable>,
}

pub(crate) struct Sink<Item> {
  state: Mutex<SinkState<Item>>,
}

impl<Item: 'static> Sink<Item> {
  pub fn new(observer: ObserverRef<Item>, cancel: Disposable) -> Arc<Self> {
    Arc::new(Sink {
      state: Mutex::new(SinkState {
        observer,
        cancel: Some(cancel),
      }),
    })
  }

  pub fn dispose(&self) {
    let cancel = {
      let mut state = self.state.lock().unwrap();
      state.observer = observer::empty();
      state.cancel.take()
    };
    if let Some(cancel) = cancel {
      cancel.dispose();
    }
  }

  /// A handle that tears `sink` down.
  pub fn disposable(sink: &Arc<Self>) -> Disposable {
    let sink = sink.clone();
    Disposable::new(move || sink.dispose())
  }

  fn detach(&self) -> (ObserverRef<Item>, Option<Disposable>) {
    let mut state = self.state.lock().unwrap();
    let observer =
      std::mem::replace(&mut state.observer, observer::empty());
    (observer, state.cancel.take())
  }
}

impl<Item: 'static> Observer<Item> for Sink<Item> {
  fn on_next(&self, value: Item) {
    let observer = self.state.lock().unwrap().observer.clone();
    observer.on_next(value);
  }

  fn on_completed(&self) {
    let (observer, cancel) = self.detach();
    observer.on_completed();
    if let Some(cancel) = cancel {
      cancel.dispose();
    }
  }

  fn on_error(&self, error: RxError) {
    let (observer, cancel) = self.detach();
    observer.on_error(error);
    if let Some(cancel) = cancel {
      cancel.dispose();
    }
  }
}

/// Builds an observable around the sink skeleton. Per subscription, `run`
/// receives a fresh sink wrapping the downstream observer and returns the
/// upstream subscription; disposing the result tears down both.
pub(crate) fn produce<Item: 'static>(
  run: impl Fn(Arc<Sink<Item>>) -> Disposable + Send + Sync + 'static,
) -> Observable<Item> {
  Observable::create(move |observer| {
    let subscription = SerialDisposable::new();
    let sink = Sink::new(observer, Disposable::wrap(subscription.clone()));
    let teardown = Sink::disposable(&sink);
    subscription.set(run(sink));
    teardown
  })
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[test]
  fn terminal_signals_dispose_the_cancel() {
    let cancelled = Arc::new(AtomicUsize::new(0));
    let c = cancelled.clone();
    let values = Arc::new(Mutex::new(Vec::new()));
    let v = values.clone();
    let sink = Sink::new(
      observer::create(move |value: i32| v.lock().unwrap().push(value)),
      Disposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
      }),
    );
    sink.on_next(1);
    sink.on_completed();
    assert_eq!(*values.lock().unwrap(), vec![1]);
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn dispose_swaps_in_the_null_observer() {
    let values = Arc::new(Mutex::new(Vec::new()));
    let v = values.clone();
    let sink = Sink::new(
      observer::create(move |value: i32| v.lock().unwrap().push(value)),
      Disposable::empty(),
    );
    sink.on_next(1);
    sink.dispose();
    sink.on_next(2);
    sink.on_completed();
    assert_eq!(*values.lock().unwrap(), vec![1]);
  }

  #[test]
  fn produce_wires_upstream_teardown() {
    let upstream_disposed = Arc::new(AtomicUsize::new(0));
    let c = upstream_disposed.clone();
    let source = produce(move |_sink: Arc<Sink<i32>>| {
      let c = c.clone();
      Disposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
      })
    });
    let subscription = source.subscribe(|_| {});
    subscription.dispose();
    assert_eq!(upstream_disposed.load(Ordering::SeqCst), 1);
  }
}
