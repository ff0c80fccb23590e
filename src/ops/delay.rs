use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::disposable::{
  CompositeDisposable, Disposable, DisposableLike,
};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::scheduler::Scheduler;

struct DelayObserver<Item> {
  observer: ObserverRef<Item>,
  due: Duration,
  scheduler: Scheduler,
  cancel: Arc<AtomicBool>,
  // only the newest scheduled task is retained; older ones either fired
  // already or are suppressed through the shared cancel flag
  latest: Arc<Mutex<Option<Disposable>>>,
}

impl<Item: Send + 'static> Observer<Item> for DelayObserver<Item> {
  fn on_next(&self, value: Item) {
    let observer = self.observer.clone();
    let cancel = self.cancel.clone();
    let task = self.scheduler.schedule_after(self.due, move |_| {
      if !cancel.load(Ordering::SeqCst) {
        observer.on_next(value);
      }
      Disposable::empty()
    });
    *self.latest.lock().unwrap() = Some(task);
  }

  fn on_completed(&self) {
    let observer = self.observer.clone();
    let cancel = self.cancel.clone();
    let task = self.scheduler.schedule_after(self.due, move |_| {
      if !cancel.load(Ordering::SeqCst) {
        observer.on_completed();
      }
      Disposable::empty()
    });
    *self.latest.lock().unwrap() = Some(task);
  }

  fn on_error(&self, error: RxError) {
    // errors skip the queue
    if !self.cancel.load(Ordering::SeqCst) {
      self.observer.on_error(error);
    }
  }
}

impl<Item: Send + 'static> Observable<Item> {
  /// Re-schedules every `on_next`/`on_completed` on `scheduler` after
  /// `due` from its arrival. Errors are forwarded immediately.
  pub fn delay(&self, due: Duration, scheduler: &Scheduler) -> Observable<Item> {
    let source = self.clone();
    let scheduler = scheduler.clone();
    Observable::create(move |observer| {
      let cancel = Arc::new(AtomicBool::new(false));
      let latest: Arc<Mutex<Option<Disposable>>> = Arc::new(Mutex::new(None));
      let all = CompositeDisposable::new();
      {
        let cancel = cancel.clone();
        all.add(Disposable::new(move || {
          cancel.store(true, Ordering::SeqCst);
        }));
      }
      {
        let latest = latest.clone();
        all.add(Disposable::new(move || {
          if let Some(task) = latest.lock().unwrap().take() {
            task.dispose();
          }
        }));
      }
      all.add(source.subscribe_observer(Arc::new(DelayObserver {
        observer,
        due,
        scheduler: scheduler.clone(),
        cancel,
        latest,
      })));
      Disposable::wrap(all)
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::scheduler::ManualScheduler;
  use crate::subject::Subject;

  #[test]
  fn values_arrive_after_the_delay() {
    let manual = ManualScheduler::new();
    let subject = Subject::new();
    let collected = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(false));
    let v = collected.clone();
    let c = completed.clone();
    subject
      .as_observable()
      .delay(Duration::from_millis(50), &manual.scheduler())
      .subscribe_complete(
        move |value| v.lock().unwrap().push(value),
        move || *c.lock().unwrap() = true,
      );

    subject.on_next(1);
    subject.on_next(2);
    subject.on_completed();
    assert!(collected.lock().unwrap().is_empty());

    manual.advance_and_run(Duration::from_millis(50));
    assert_eq!(*collected.lock().unwrap(), vec![1, 2]);
    assert!(*completed.lock().unwrap());
  }

  #[test]
  fn errors_skip_the_delay() {
    let manual = ManualScheduler::new();
    let subject = Subject::<i32>::new();
    let failed = Arc::new(Mutex::new(false));
    let f = failed.clone();
    subject
      .as_observable()
      .delay(Duration::from_millis(50), &manual.scheduler())
      .subscribe_err(|_| {}, move |_| *f.lock().unwrap() = true);

    subject.on_error(RxError::msg("now"));
    assert!(*failed.lock().unwrap());
  }

  #[test]
  fn dispose_suppresses_pending_deliveries() {
    let manual = ManualScheduler::new();
    let subject = Subject::new();
    let collected = Arc::new(Mutex::new(Vec::new()));
    let v = collected.clone();
    let subscription = subject
      .as_observable()
      .delay(Duration::from_millis(50), &manual.scheduler())
      .subscribe(move |value: i32| v.lock().unwrap().push(value));

    subject.on_next(1);
    subscription.dispose();
    manual.advance_and_run(Duration::from_millis(100));
    assert!(collected.lock().unwrap().is_empty());
  }
}
