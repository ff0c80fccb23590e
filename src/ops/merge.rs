use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::disposable::{CompositeDisposable, Disposable, DisposableLike};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct MergeObserver<Item> {
  observer: ObserverRef<Item>,
  pending: Arc<AtomicUsize>,
  all: CompositeDisposable,
}

impl<Item: 'static> Observer<Item> for MergeObserver<Item> {
  fn on_next(&self, value: Item) {
    self.observer.on_next(value);
  }

  fn on_completed(&self) {
    if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
      self.observer.on_completed();
      self.all.dispose();
    }
  }

  fn on_error(&self, error: RxError) {
    self.observer.on_error(error);
    self.all.dispose();
  }
}

/// Subscribes to all sources at once and forwards every value. Completes
/// when the last source completes; the first error is forwarded and every
/// sibling subscription disposed.
pub fn merge<Item: 'static>(
  sources: Vec<Observable<Item>>,
) -> Observable<Item> {
  Observable::create(move |observer| {
    if sources.is_empty() {
      observer.on_completed();
      return Disposable::empty();
    }
    let all = CompositeDisposable::new();
    let pending = Arc::new(AtomicUsize::new(sources.len()));
    for source in &sources {
      all.add(source.subscribe_observer(Arc::new(MergeObserver {
        observer: observer.clone(),
        pending: pending.clone(),
        all: all.clone(),
      })));
    }
    Disposable::wrap(all)
  })
}

impl<Item: 'static> Observable<Item> {
  /// Merges this stream with another.
  pub fn merge(&self, other: &Observable<Item>) -> Observable<Item> {
    merge(vec![self.clone(), other.clone()])
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::observable;
  use crate::subject::Subject;

  #[test]
  fn interleaves_values_from_all_sources() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    observable::from_iter([1, 3, 5])
      .merge(&observable::from_iter([2, 4, 6]))
      .subscribe(move |v| c.lock().unwrap().push(v));
    let mut all = collected.lock().unwrap().clone();
    all.sort();
    assert_eq!(all, vec![1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn completes_only_when_every_source_completed() {
    let a = Subject::<i32>::new();
    let b = Subject::<i32>::new();
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    a.as_observable()
      .merge(&b.as_observable())
      .subscribe_complete(|_| {}, move || *c.lock().unwrap() = true);

    a.on_completed();
    assert!(!*completed.lock().unwrap());
    b.on_completed();
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn first_error_wins_and_silences_siblings() {
    let a = Subject::<i32>::new();
    let b = Subject::<i32>::new();
    let values = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(0));
    let v = values.clone();
    let e = errors.clone();
    a.as_observable().merge(&b.as_observable()).subscribe_err(
      move |value| v.lock().unwrap().push(value),
      move |_| *e.lock().unwrap() += 1,
    );

    a.on_next(1);
    b.on_error(RxError::msg("b died"));
    a.on_next(2);
    a.on_error(RxError::msg("a died late"));

    assert_eq!(*values.lock().unwrap(), vec![1]);
    assert_eq!(*errors.lock().unwrap(), 1);
  }

  #[test]
  fn merging_nothing_completes_immediately() {
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    merge(Vec::<Observable<i32>>::new())
      .subscribe_complete(|_| {}, move || *c.lock().unwrap() = true);
    assert!(*completed.lock().unwrap());
  }
}
