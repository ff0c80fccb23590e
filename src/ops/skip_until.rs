use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::disposable::{CompositeDisposable, Disposable};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct GateObserver<Other> {
  open: Arc<AtomicBool>,
  _marker: std::marker::PhantomData<fn(Other)>,
}

impl<Other: 'static> Observer<Other> for GateObserver<Other> {
  fn on_next(&self, _: Other) {
    self.open.store(true, Ordering::SeqCst);
  }

  fn on_completed(&self) {
    self.open.store(true, Ordering::SeqCst);
  }

  fn on_error(&self, _: RxError) {
    self.open.store(true, Ordering::SeqCst);
  }
}

struct SkipUntilObserver<Item> {
  observer: ObserverRef<Item>,
  open: Arc<AtomicBool>,
}

impl<Item: 'static> Observer<Item> for SkipUntilObserver<Item> {
  fn on_next(&self, value: Item) {
    if self.open.load(Ordering::SeqCst) {
      self.observer.on_next(value);
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
  /// Drops source values until `terminus` signals once (value or
  /// terminal), then forwards everything.
  pub fn skip_until<Other: 'static>(
    &self,
    terminus: &Observable<Other>,
  ) -> Observable<Item> {
    let source = self.clone();
    let terminus = terminus.clone();
    Observable::create(move |observer| {
      let open = Arc::new(AtomicBool::new(false));
      let all = CompositeDisposable::new();
      all.add(terminus.subscribe_observer(Arc::new(GateObserver {
        open: open.clone(),
        _marker: std::marker::PhantomData,
      })));
      all.add(source.subscribe_observer(Arc::new(SkipUntilObserver {
        observer,
        open,
      })));
      Disposable::wrap(all)
    })
  }
}
