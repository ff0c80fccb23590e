use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::disposable::{CompositeDisposable, Disposable};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct DispatchObserver<Item> {
  observer: ObserverRef<Item>,
  dispatcher: Arc<Dispatcher>,
  cancel: Arc<AtomicBool>,
}

impl<Item: Send + 'static> Observer<Item> for DispatchObserver<Item> {
  fn on_next(&self, value: Item) {
    let observer = self.observer.clone();
    let cancel = self.cancel.clone();
    self.dispatcher.post(move || {
      if !cancel.load(Ordering::SeqCst) {
        observer.on_next(value);
      }
    });
  }

  fn on_completed(&self) {
    let observer = self.observer.clone();
    let cancel = self.cancel.clone();
    self.dispatcher.post(move || {
      if !cancel.load(Ordering::SeqCst) {
        observer.on_completed();
      }
    });
  }

  fn on_error(&self, error: RxError) {
    let observer = self.observer.clone();
    let cancel = self.cancel.clone();
    self.dispatcher.post(move || {
      if !cancel.load(Ordering::SeqCst) {
        observer.on_error(error);
      }
    });
  }
}

impl<Item: Send + 'static> Observable<Item> {
  /// Posts every signal to `dispatcher`; the host decides when signals
  /// actually run by pumping `try_dispatch`/`dispatch_one` from its own
  /// loop.
  pub fn observe_on_dispatcher(
    &self,
    dispatcher: &Arc<Dispatcher>,
  ) -> Observable<Item> {
    let source = self.clone();
    let dispatcher = dispatcher.clone();
    Observable::create(move |observer| {
      let cancel = Arc::new(AtomicBool::new(false));
      let all = CompositeDisposable::new();
      {
        let cancel = cancel.clone();
        all.add(Disposable::new(move || {
          cancel.store(true, Ordering::SeqCst);
        }));
      }
      all.add(source.subscribe_observer(Arc::new(DispatchObserver {
        observer,
        dispatcher: dispatcher.clone(),
        cancel,
      })));
      Disposable::wrap(all)
    })
  }
}
