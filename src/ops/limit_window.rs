use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct LimitWindowObserver<Item> {
  observer: ObserverRef<Item>,
  window: Duration,
  // monotonic clock only
  due: Mutex<Option<Instant>>,
}

impl<Item: 'static> Observer<Item> for LimitWindowObserver<Item> {
  fn on_next(&self, value: Item) {
    let now = Instant::now();
    let emit = {
      let mut due = self.due.lock().unwrap();
      match *due {
        Some(due_at) if now < due_at => false,
        _ => {
          *due = Some(now + self.window);
          true
        }
      }
    };
    if emit {
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
  /// Classic rate limiter: at most one value per `window`; values
  /// arriving inside the window are dropped, not deferred. A zero window
  /// is a passthrough.
  pub fn limit_window(&self, window: Duration) -> Observable<Item> {
    if window.is_zero() {
      return self.clone();
    }
    let source = self.clone();
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(LimitWindowObserver {
        observer,
        window,
        due: Mutex::new(None),
      }))
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::subject::Subject;

  #[test]
  fn drops_values_inside_the_window() {
    let subject = Subject::new();
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    subject
      .as_observable()
      .limit_window(Duration::from_millis(40))
      .subscribe(move |v| c.lock().unwrap().push(v));

    subject.on_next(1);
    subject.on_next(2);
    subject.on_next(3);
    assert_eq!(*collected.lock().unwrap(), vec![1]);

    std::thread::sleep(Duration::from_millis(60));
    subject.on_next(4);
    subject.on_next(5);
    assert_eq!(*collected.lock().unwrap(), vec![1, 4]);
  }

  #[test]
  fn zero_window_forwards_everything() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    crate::observable::from_iter([1, 1, 1])
      .limit_window(Duration::ZERO)
      .subscribe(move |v| c.lock().unwrap().push(v));
    assert_eq!(*collected.lock().unwrap(), vec![1, 1, 1]);
  }
}
