use std::sync::{Arc, Mutex, Weak};

use crate::disposable::Disposable;
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::subject::{SubjectCore, SubjectLike, SubjectState};

struct AsyncInner<Item> {
  core: SubjectCore<Item>,
  value: Option<Item>,
}

/// Subject that retains only the last value pushed before completion.
/// Nothing is delivered while forwarding; completion emits the buffered
/// value (if any) followed by the completion, to current and future
/// subscribers alike.
pub struct AsyncSubject<Item> {
  inner: Arc<Mutex<AsyncInner<Item>>>,
}

impl<Item> Clone for AsyncSubject<Item> {
  fn clone(&self) -> Self {
    AsyncSubject {
      inner: self.inner.clone(),
    }
  }
}

impl<Item> Default for AsyncSubject<Item> {
  fn default() -> Self {
    AsyncSubject::new()
  }
}

impl<Item> AsyncSubject<Item> {
  pub fn new() -> Self {
    AsyncSubject {
      inner: Arc::new(Mutex::new(AsyncInner {
        core: SubjectCore::new(),
        value: None,
      })),
    }
  }
}

impl<Item: Clone + Send + 'static> AsyncSubject<Item> {
  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    enum Replay<Item> {
      Enrolled(usize),
      Completed(Option<Item>),
      Errored(RxError),
    }
    let replay = {
      let mut inner = self.inner.lock().unwrap();
      match inner.core.state {
        SubjectState::Forwarding => {
          Replay::Enrolled(inner.core.enroll(observer.clone()))
        }
        SubjectState::Completed => Replay::Completed(inner.value.clone()),
        SubjectState::Errored(ref error) => Replay::Errored(error.clone()),
      }
    };
    match replay {
      Replay::Enrolled(index) => {
        let weak = Arc::downgrade(&self.inner);
        Disposable::new(move || detach(&weak, index))
      }
      Replay::Completed(value) => {
        if let Some(value) = value {
          observer.on_next(value);
        }
        observer.on_completed();
        Disposable::empty()
      }
      Replay::Errored(error) => {
        observer.on_error(error);
        Disposable::empty()
      }
    }
  }

  pub fn as_observable(&self) -> Observable<Item> {
    let subject = self.clone();
    Observable::raw(move |observer| subject.subscribe_observer(observer))
  }

  pub fn subscribe(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Disposable {
    self.as_observable().subscribe(next)
  }
}

fn detach<Item>(inner: &Weak<Mutex<AsyncInner<Item>>>, index: usize) {
  if let Some(inner) = inner.upgrade() {
    inner.lock().unwrap().core.tombstone(index);
  }
}

impl<Item: Clone + Send + 'static> Observer<Item> for AsyncSubject<Item> {
  fn on_next(&self, value: Item) {
    let mut inner = self.inner.lock().unwrap();
    if matches!(inner.core.state, SubjectState::Forwarding) {
      inner.value = Some(value);
    }
  }

  fn on_completed(&self) {
    let (drained, value) = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.core.state, SubjectState::Forwarding) {
        return;
      }
      inner.core.state = SubjectState::Completed;
      let drained = inner.core.drain();
      (drained, inner.value.clone())
    };
    for observer in drained {
      if let Some(value) = value.clone() {
        observer.on_next(value);
      }
      observer.on_completed();
    }
  }

  fn on_error(&self, error: RxError) {
    let drained = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.core.state, SubjectState::Forwarding) {
        return;
      }
      inner.core.state = SubjectState::Errored(error.clone());
      inner.core.drain()
    };
    for observer in drained {
      observer.on_error(error.clone());
    }
  }
}

impl<Item: Clone + Send + 'static> SubjectLike<Item> for AsyncSubject<Item> {
  fn as_observer(&self) -> ObserverRef<Item> {
    Arc::new(self.clone())
  }

  fn as_observable(&self) -> Observable<Item> {
    AsyncSubject::as_observable(self)
  }
}
