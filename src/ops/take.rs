use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use crate::disposable::{Disposable, DisposableLike, SerialDisposable};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct TakeObserver<Item> {
  observer: ObserverRef<Item>,
  // `remaining` hands out delivery slots; `to_deliver` counts deliveries
  // actually made, so completion fires exactly once after the n-th value
  // and a later upstream completion is absorbed.
  remaining: AtomicIsize,
  to_deliver: AtomicIsize,
  upstream: SerialDisposable,
}

impl<Item: 'static> Observer<Item> for TakeObserver<Item> {
  fn on_next(&self, value: Item) {
    let slot = self.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
    if slot >= 0 {
      self.observer.on_next(value);
      if self.to_deliver.fetch_sub(1, Ordering::SeqCst) - 1 == 0 {
        self.observer.on_completed();
        self.upstream.dispose();
      }
    }
  }

  fn on_completed(&self) {
    if self.to_deliver.load(Ordering::SeqCst) > 0 {
      self.observer.on_completed();
      self.upstream.dispose();
    }
  }

  fn on_error(&self, error: RxError) {
    self.observer.on_error(error);
    self.upstream.dispose();
  }
}

impl<Item: 'static> Observable<Item> {
  /// Emits the first `count` upstream values, then completes and drops
  /// the upstream subscription. `take(0)` completes immediately.
  pub fn take(&self, count: usize) -> Observable<Item> {
    let source = self.clone();
    Observable::create(move |observer| {
      if count == 0 {
        observer.on_completed();
        return Disposable::empty();
      }
      let upstream = SerialDisposable::new();
      let take_observer = Arc::new(TakeObserver {
        observer,
        remaining: AtomicIsize::new(count as isize),
        to_deliver: AtomicIsize::new(count as isize),
        upstream: upstream.clone(),
      });
      upstream.set(source.subscribe_observer(take_observer));
      Disposable::wrap(upstream)
    })
  }
}
