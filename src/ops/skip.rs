use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::Arc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct SkipObserver<Item> {
  observer: ObserverRef<Item>,
  remaining: AtomicIsize,
  forwarding: AtomicBool,
}

impl<Item: 'static> Observer<Item> for SkipObserver<Item> {
  fn on_next(&self, value: Item) {
    if self.forwarding.load(Ordering::SeqCst) {
      self.observer.on_next(value);
    } else if self.remaining.fetch_sub(1, Ordering::SeqCst) - 1 == 0 {
      self.forwarding.store(true, Ordering::SeqCst);
    }
  }

  fn on_completed(&self) {
    self.observer.on_completed();
  }

  fn on_error(&self, error: RxError) {
    self.observer.on_error(error);
  }
}

impl<Item: 'static> Observable<Item> {
  /// Drops the first `count` values, then forwards the rest.
  pub fn skip(&self, count: usize) -> Observable<Item> {
    let source = self.clone();
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(SkipObserver {
        observer,
        remaining: AtomicIsize::new(count as isize),
        forwarding: AtomicBool::new(count == 0),
      }))
    })
  }
}
