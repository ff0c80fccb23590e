use std::sync::Arc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::util;

struct FilterObserver<Item> {
  observer: ObserverRef<Item>,
  predicate: Arc<dyn Fn(&Item) -> bool + Send + Sync>,
}

impl<Item: 'static> Observer<Item> for FilterObserver<Item> {
  fn on_next(&self, value: Item) {
    match util::guard(|| (*self.predicate)(&value)) {
      Ok(true) => self.observer.on_next(value),
      Ok(false) => {}
      Err(error) => self.observer.on_error(error),
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
  /// Forwards only values matching `predicate`.
  pub fn filter(
    &self,
    predicate: impl Fn(&Item) -> bool + Send + Sync + 'static,
  ) -> Observable<Item> {
    let source = self.clone();
    let predicate: Arc<dyn Fn(&Item) -> bool + Send + Sync> =
      Arc::new(predicate);
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(FilterObserver {
        observer,
        predicate: predicate.clone(),
      }))
    })
  }
}
