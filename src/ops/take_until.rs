use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::disposable::{CompositeDisposable, Disposable, DisposableLike};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct TakeUntilState {
  terminated: AtomicBool,
  completed: AtomicBool,
}

/// Any signal from the terminus latches the gate.
struct TerminusObserver<Other> {
  state: Arc<TakeUntilState>,
  _marker: std::marker::PhantomData<fn(Other)>,
}

impl<Other: 'static> Observer<Other> for TerminusObserver<Other> {
  fn on_next(&self, _: Other) {
    self.state.terminated.store(true, Ordering::SeqCst);
  }

  fn on_completed(&self) {
    self.state.terminated.store(true, Ordering::SeqCst);
  }

  fn on_error(&self, _: RxError) {
    self.state.terminated.store(true, Ordering::SeqCst);
  }
}

struct TakeUntilObserver<Item> {
  observer: ObserverRef<Item>,
  state: Arc<TakeUntilState>,
  all: CompositeDisposable,
}

impl<Item: 'static> Observer<Item> for TakeUntilObserver<Item> {
  fn on_next(&self, value: Item) {
    if !self.state.terminated.load(Ordering::SeqCst) {
      self.observer.on_next(value);
    } else if !self.state.completed.swap(true, Ordering::SeqCst) {
      self.observer.on_completed();
      self.all.dispose();
    }
  }

  fn on_completed(&self) {
    if !self.state.completed.swap(true, Ordering::SeqCst) {
      self.state.terminated.store(true, Ordering::SeqCst);
      self.observer.on_completed();
      self.all.dispose();
    }
  }

  fn on_error(&self, error: RxError) {
    self.state.completed.store(true, Ordering::SeqCst);
    self.state.terminated.store(true, Ordering::SeqCst);
    self.observer.on_error(error);
    self.all.dispose();
  }
}

impl<Item: 'static> Observable<Item> {
  /// Passes source values through until `terminus` signals anything (a
  /// value or either terminal); the next source signal after that point
  /// becomes a single downstream completion.
  pub fn take_until<Other: 'static>(
    &self,
    terminus: &Observable<Other>,
  ) -> Observable<Item> {
    let source = self.clone();
    let terminus = terminus.clone();
    Observable::create(move |observer| {
      let state = Arc::new(TakeUntilState {
        terminated: AtomicBool::new(false),
        completed: AtomicBool::new(false),
      });
      let all = CompositeDisposable::new();
      all.add(terminus.subscribe_observer(Arc::new(TerminusObserver {
        state: state.clone(),
        _marker: std::marker::PhantomData,
      })));
      all.add(source.subscribe_observer(Arc::new(TakeUntilObserver {
        observer,
        state,
        all: all.clone(),
      })));
      Disposable::wrap(all)
    })
  }
}
