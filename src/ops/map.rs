use std::sync::Arc;

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::util;

struct MapObserver<Item, Out> {
  observer: ObserverRef<Out>,
  selector: Arc<dyn Fn(Item) -> Out + Send + Sync>,
}

impl<Item, Out> Observer<Item> for MapObserver<Item, Out>
where
  Item: 'static,
  Out: 'static,
{
  fn on_next(&self, value: Item) {
    match util::guard(|| (*self.selector)(value)) {
      Ok(out) => self.observer.on_next(out),
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
  /// Emits `selector(value)` for every upstream value. A panicking
  /// selector terminates the subscription with `on_error`.
  pub fn map<Out: 'static>(
    &self,
    selector: impl Fn(Item) -> Out + Send + Sync + 'static,
  ) -> Observable<Out> {
    let source = self.clone();
    let selector: Arc<dyn Fn(Item) -> Out + Send + Sync> = Arc::new(selector);
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(MapObserver {
        observer,
        selector: selector.clone(),
      }))
    })
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::observable;

  #[test]
  fn transforms_every_value() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    observable::from_iter([1, 2, 3])
      .map(|v| v * 2)
      .subscribe(move |v| c.lock().unwrap().push(v));
    assert_eq!(*collected.lock().unwrap(), vec![2, 4, 6]);
  }

  #[test]
  fn changes_the_element_type() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    observable::from_iter([1, 2])
      .map(|v: i32| format!("#{v}"))
      .subscribe(move |v| c.lock().unwrap().push(v));
    assert_eq!(*collected.lock().unwrap(), vec!["#1", "#2"]);
  }

  #[test]
  fn selector_panic_becomes_an_error_signal() {
    let error = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let e = error.clone();
    let s = seen.clone();
    observable::from_iter([1, 2, 3])
      .map(|v| {
        if v == 2 {
          panic!("bad value")
        }
        v
      })
      .subscribe_err(
        move |v| s.lock().unwrap().push(v),
        move |err| *e.lock().unwrap() = Some(err.to_string()),
      );
    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(error.lock().unwrap().as_deref(), Some("bad value"));
  }
}
