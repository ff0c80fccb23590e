use std::sync::{Arc, Mutex};

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct DistinctUntilChangedObserver<Item> {
  observer: ObserverRef<Item>,
  last: Mutex<Option<Item>>,
}

impl<Item> Observer<Item> for DistinctUntilChangedObserver<Item>
where
  Item: PartialEq + Clone + Send + 'static,
{
  fn on_next(&self, value: Item) {
    let changed = {
      let mut last = self.last.lock().unwrap();
      match last.as_ref() {
        Some(previous) if *previous == value => false,
        _ => {
          *last = Some(value.clone());
          true
        }
      }
    };
    if changed {
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
  /// Suppresses values equal to the previously emitted one.
  pub fn distinct_until_changed(&self) -> Observable<Item>
  where
    Item: PartialEq + Clone + Send,
  {
    let source = self.clone();
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(DistinctUntilChangedObserver {
        observer,
        last: Mutex::new(None),
      }))
    })
  }
}
