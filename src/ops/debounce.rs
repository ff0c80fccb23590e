use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::disposable::{
  CompositeDisposable, Disposable, DisposableLike, SerialDisposable,
};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::scheduler::Scheduler;

struct DebounceState<Item> {
  value: Option<Item>,
  id: u64,
}

struct DebounceObserver<Item> {
  observer: ObserverRef<Item>,
  due: Duration,
  scheduler: Scheduler,
  state: Arc<Mutex<DebounceState<Item>>>,
  // newest timer replaces (and cancels) the previous one
  pending: SerialDisposable,
  all: CompositeDisposable,
}

impl<Item: Send + 'static> Observer<Item> for DebounceObserver<Item> {
  fn on_next(&self, value: Item) {
    let current = {
      let mut state = self.state.lock().unwrap();
      state.value = Some(value);
      state.id += 1;
      state.id
    };
    let state = self.state.clone();
    let observer = self.observer.clone();
    let task = self.scheduler.schedule_after(self.due, move |_| {
      let emit = {
        let mut state = state.lock().unwrap();
        if state.id == current {
          state.value.take()
        } else {
          None
        }
      };
      if let Some(value) = emit {
        observer.on_next(value);
      }
      Disposable::empty()
    });
    self.pending.set(task);
  }

  fn on_completed(&self) {
    let flush = {
      let mut state = self.state.lock().unwrap();
      state.id += 1;
      state.value.take()
    };
    if let Some(value) = flush {
      self.observer.on_next(value);
    }
    self.observer.on_completed();
    self.all.dispose();
  }

  fn on_error(&self, error: RxError) {
    {
      let mut state = self.state.lock().unwrap();
      state.id += 1;
      state.value = None;
    }
    self.observer.on_error(error);
    self.all.dispose();
  }
}

impl<Item: Send + 'static> Observable<Item> {
  /// Emits a value only once `due` has passed without a newer one
  /// arriving (emit-after-quiescence). Completion flushes a still-pending
  /// value; an error discards it.
  pub fn debounce(
    &self,
    due: Duration,
    scheduler: &Scheduler,
  ) -> Observable<Item> {
    let source = self.clone();
    let scheduler = scheduler.clone();
    Observable::create(move |observer| {
      let all = CompositeDisposable::new();
      let pending = SerialDisposable::new();
      all.add(pending.clone());
      all.add(source.subscribe_observer(Arc::new(DebounceObserver {
        observer,
        due,
        scheduler: scheduler.clone(),
        state: Arc::new(Mutex::new(DebounceState {
          value: None,
          id: 0,
        })),
        pending,
        all: all.clone(),
      })));
      Disposable::wrap(all)
    })
  }
}
