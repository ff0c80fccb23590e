use std::sync::{Arc, Mutex, Weak};

use crate::disposable::Disposable;
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::subject::{SubjectCore, SubjectLike, SubjectState};

struct BehaviorInner<Item> {
  core: SubjectCore<Item>,
  value: Item,
}

/// Subject with a cached current value.
///
/// Subscribing while forwarding delivers the cached value first, then
/// enrolls. Subscribing after completion delivers the last value and the
/// completion; after an error, the error.
pub struct BehaviorSubject<Item> {
  inner: Arc<Mutex<BehaviorInner<Item>>>,
}

impl<Item> Clone for BehaviorSubject<Item> {
  fn clone(&self) -> Self {
    BehaviorSubject {
      inner: self.inner.clone(),
    }
  }
}

impl<Item: Clone> BehaviorSubject<Item> {
  pub fn new(value: Item) -> Self {
    BehaviorSubject {
      inner: Arc::new(Mutex::new(BehaviorInner {
        core: SubjectCore::new(),
        value,
      })),
    }
  }

  /// The cached current value.
  pub fn value(&self) -> Item {
    self.inner.lock().unwrap().value.clone()
  }
}

impl<Item: Clone + Send + 'static> BehaviorSubject<Item> {
  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    enum Replay<Item> {
      Enrolled(usize, Item),
      Completed(Item),
      Errored(RxError),
    }
    let replay = {
      let mut inner = self.inner.lock().unwrap();
      match inner.core.state {
        SubjectState::Forwarding => {
          let value = inner.value.clone();
          Replay::Enrolled(inner.core.enroll(observer.clone()), value)
        }
        SubjectState::Completed => Replay::Completed(inner.value.clone()),
        SubjectState::Errored(ref error) => Replay::Errored(error.clone()),
      }
    };
    match replay {
      Replay::Enrolled(index, value) => {
        observer.on_next(value);
        let weak = Arc::downgrade(&self.inner);
        Disposable::new(move || detach(&weak, index))
      }
      Replay::Completed(value) => {
        observer.on_next(value);
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

fn detach<Item>(inner: &Weak<Mutex<BehaviorInner<Item>>>, index: usize) {
  if let Some(inner) = inner.upgrade() {
    inner.lock().unwrap().core.tombstone(index);
  }
}

impl<Item: Clone + Send + 'static> Observer<Item> for BehaviorSubject<Item> {
  fn on_next(&self, value: Item) {
    let snapshot = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.core.state, SubjectState::Forwarding) {
        return;
      }
      inner.value = value.clone();
      inner.core.snapshot()
    };
    for observer in snapshot {
      observer.on_next(value.clone());
    }
  }

  fn on_completed(&self) {
    let drained = {
      let mut inner = self.inner.lock().unwrap();
      if !matches!(inner.core.state, SubjectState::Forwarding) {
        return;
      }
      inner.core.state = SubjectState::Completed;
      inner.core.drain()
    };
    for observer in drained {
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

impl<Item: Clone + Send + 'static> SubjectLike<Item>
  for BehaviorSubject<Item>
{
  fn as_observer(&self) -> ObserverRef<Item> {
    Arc::new(self.clone())
  }

  fn as_observable(&self) -> Observable<Item> {
    BehaviorSubject::as_observable(self)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn recording() -> (Arc<Mutex<Vec<String>>>, ObserverRef<i32>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    let l2 = log.clone();
    let l3 = log.clone();
    let observer = crate::observer::create_all(
      move |v: i32| l.lock().unwrap().push(format!("{v}")),
      move |e| l2.lock().unwrap().push(format!("E:{e}")),
      move || l3.lock().unwrap().push("C".into()),
    );
    (log, observer)
  }

  #[test]
  fn replays_the_cached_value_on_subscribe() {
    let subject = BehaviorSubject::new(0);
    let (a_log, a) = recording();
    subject.subscribe_observer(a);
    subject.on_next(1);
    subject.on_next(2);

    let (b_log, b) = recording();
    subject.subscribe_observer(b);
    subject.on_next(3);
    subject.on_completed();

    let (c_log, c) = recording();
    subject.subscribe_observer(c);

    assert_eq!(*a_log.lock().unwrap(), vec!["0", "1", "2", "3", "C"]);
    assert_eq!(*b_log.lock().unwrap(), vec!["2", "3", "C"]);
    assert_eq!(*c_log.lock().unwrap(), vec!["3", "C"]);
  }

  #[test]
  fn error_replay_skips_the_value() {
    let subject = BehaviorSubject::new(10);
    subject.on_error(RxError::msg("dead"));
    let (log, observer) = recording();
    subject.subscribe_observer(observer);
    assert_eq!(*log.lock().unwrap(), vec!["E:dead"]);
  }

  #[test]
  fn value_accessor_tracks_pushes() {
    let subject = BehaviorSubject::new(1);
    assert_eq!(subject.value(), 1);
    subject.on_next(5);
    assert_eq!(subject.value(), 5);
  }
}
