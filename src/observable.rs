//! The subscribable source contract, the `create` constructor every
//! operator is built on, subscription sugar, the blocking `for_each`
//! drain, and the simple value producers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::disposable::{Disposable, DisposableLike, SerialDisposable};
use crate::error::RxError;
use crate::observer::{
  AutoDetachObserver, FnObserver, Observer, ObserverRef,
};
use crate::scheduler::{CurrentThreadScheduler, Scheduler};
use crate::util;

type SubscribeFn<Item> =
  Arc<dyn Fn(ObserverRef<Item>) -> Disposable + Send + Sync>;

/// A push-based source of `Item` values. Cloning is cheap and clones
/// subscribe to the same underlying source.
pub struct Observable<Item> {
  subscribe_fn: SubscribeFn<Item>,
}

impl<Item> Clone for Observable<Item> {
  fn clone(&self) -> Self {
    Observable {
      subscribe_fn: self.subscribe_fn.clone(),
    }
  }
}

impl<Item: 'static> Observable<Item> {
  /// An observable that hands observers straight to `subscribe` with no
  /// wrapping. For sources (subjects, connectables) that enforce the
  /// signal contract themselves.
  pub(crate) fn raw(
    subscribe: impl Fn(ObserverRef<Item>) -> Disposable + Send + Sync + 'static,
  ) -> Self {
    Observable {
      subscribe_fn: Arc::new(subscribe),
    }
  }

  /// Builds an observable from a subscribe function.
  ///
  /// Each subscription wraps the observer in an [`AutoDetachObserver`],
  /// runs `subscribe` through the current-thread trampoline when one is
  /// already active on this thread, stores the returned disposable in the
  /// wrapper's serial slot, and converts a panicking subscribe function
  /// into an `on_error` signal.
  pub fn create(
    subscribe: impl Fn(ObserverRef<Item>) -> Disposable + Send + Sync + 'static,
  ) -> Self {
    let subscribe: SubscribeFn<Item> = Arc::new(subscribe);
    Observable::raw(move |observer| {
      let detached = Arc::new(AutoDetachObserver::new(observer));
      if CurrentThreadScheduler::is_schedule_required() {
        let scheduler = Scheduler::new(CurrentThreadScheduler);
        let subscribe = subscribe.clone();
        let target = detached.clone();
        scheduler.schedule(move |_| {
          run_subscribe(&subscribe, &target);
          Disposable::empty()
        });
      } else {
        run_subscribe(&subscribe, &detached);
      }
      Disposable::new(move || detached.dispose())
    })
  }

  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    (*self.subscribe_fn)(observer)
  }

  pub fn subscribe(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Disposable {
    self.subscribe_observer(Arc::new(FnObserver::new(
      Arc::new(next),
      None,
      None,
    )))
  }

  pub fn subscribe_err(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
    error: impl FnOnce(RxError) + Send + 'static,
  ) -> Disposable {
    self.subscribe_observer(Arc::new(FnObserver::new(
      Arc::new(next),
      Some(Box::new(error)),
      None,
    )))
  }

  pub fn subscribe_complete(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
    completed: impl FnOnce() + Send + 'static,
  ) -> Disposable {
    self.subscribe_observer(Arc::new(FnObserver::new(
      Arc::new(next),
      None,
      Some(Box::new(completed)),
    )))
  }

  pub fn subscribe_all(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
    error: impl FnOnce(RxError) + Send + 'static,
    completed: impl FnOnce() + Send + 'static,
  ) -> Disposable {
    self.subscribe_observer(Arc::new(FnObserver::new(
      Arc::new(next),
      Some(Box::new(error)),
      Some(Box::new(completed)),
    )))
  }

  /// Blocks the calling thread, feeding every value to `next`, until the
  /// source terminates. An error signal is returned as `Err`.
  pub fn for_each(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Result<(), RxError> {
    enum Outcome {
      Completed,
      Failed(RxError),
    }
    let gate: Arc<(Mutex<Option<Outcome>>, Condvar)> =
      Arc::new((Mutex::new(None), Condvar::new()));

    let on_error = {
      let gate = gate.clone();
      move |error| {
        let (outcome, wake) = &*gate;
        *outcome.lock().unwrap() = Some(Outcome::Failed(error));
        wake.notify_one();
      }
    };
    let on_completed = {
      let gate = gate.clone();
      move || {
        let (outcome, wake) = &*gate;
        *outcome.lock().unwrap() = Some(Outcome::Completed);
        wake.notify_one();
      }
    };
    self.subscribe_all(next, on_error, on_completed);

    let (outcome, wake) = &*gate;
    let mut outcome = outcome.lock().unwrap();
    while outcome.is_none() {
      outcome = wake.wait(outcome).unwrap();
    }
    match outcome.take() {
      Some(Outcome::Failed(error)) => Err(error),
      _ => Ok(()),
    }
  }
}

fn run_subscribe<Item: 'static>(
  subscribe: &SubscribeFn<Item>,
  detached: &Arc<AutoDetachObserver<Item>>,
) {
  let observer: ObserverRef<Item> = detached.clone();
  match util::guard(|| (**subscribe)(observer)) {
    Ok(subscription) => detached.set_subscription(subscription),
    Err(error) => detached.on_error(error),
  }
}

/// Completes without emitting.
pub fn empty<Item: 'static>() -> Observable<Item> {
  Observable::create(|observer| {
    observer.on_completed();
    Disposable::empty()
  })
}

/// Emits one value, then completes.
pub fn of<Item>(value: Item) -> Observable<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  Observable::create(move |observer| {
    observer.on_next(value.clone());
    observer.on_completed();
    Disposable::empty()
  })
}

/// Terminates every subscription with `error`.
pub fn throw<Item: 'static>(error: RxError) -> Observable<Item> {
  Observable::create(move |observer| {
    observer.on_error(error.clone());
    Disposable::empty()
  })
}

/// Emits the items of `iter`, then completes. The iterable is cloned per
/// subscription.
pub fn from_iter<Item, I>(iter: I) -> Observable<Item>
where
  Item: 'static,
  I: IntoIterator<Item = Item> + Clone + Send + Sync + 'static,
{
  Observable::create(move |observer| {
    for value in iter.clone() {
      observer.on_next(value);
    }
    observer.on_completed();
    Disposable::empty()
  })
}

/// Emits 0, 1, 2, ... every `period` on `scheduler`, forever (compose
/// `take`/`take_until` to bound it).
pub fn interval(period: Duration, scheduler: &Scheduler) -> Observable<usize> {
  let scheduler = scheduler.clone();
  Observable::create(move |observer| {
    let pending = SerialDisposable::new();
    schedule_tick(
      &scheduler,
      period,
      observer,
      Arc::new(AtomicUsize::new(0)),
      pending.clone(),
    );
    Disposable::wrap(pending)
  })
}

fn schedule_tick(
  scheduler: &Scheduler,
  period: Duration,
  observer: ObserverRef<usize>,
  tick: Arc<AtomicUsize>,
  pending: SerialDisposable,
) {
  let next = {
    let pending = pending.clone();
    scheduler.schedule_after(period, move |scheduler| {
      let n = tick.fetch_add(1, Ordering::SeqCst);
      observer.on_next(n);
      schedule_tick(scheduler, period, observer, tick, pending);
      Disposable::empty()
    })
  };
  pending.set(next);
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::scheduler::ManualScheduler;

  #[test]
  fn create_delivers_synchronously() {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let c = collected.clone();
    Observable::create(|observer| {
      observer.on_next(1);
      observer.on_next(2);
      observer.on_completed();
      Disposable::empty()
    })
    .subscribe(move |v: i32| c.lock().unwrap().push(v));
    assert_eq!(*collected.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn panicking_subscribe_surfaces_as_error() {
    let error = Arc::new(Mutex::new(None));
    let c = error.clone();
    Observable::<i32>::create(|_| panic!("subscribe blew up")).subscribe_err(
      |_| {},
      move |e| {
        *c.lock().unwrap() = Some(e.to_string());
      },
    );
    assert_eq!(
      error.lock().unwrap().as_deref(),
      Some("subscribe blew up")
    );
  }

  #[test]
  fn disposing_after_completion_is_harmless() {
    let count = Arc::new(Mutex::new(0));
    let c = count.clone();
    let subscription = from_iter(0..10).subscribe(move |_| {
      *c.lock().unwrap() += 1;
    });
    subscription.dispose();
    subscription.dispose();
    assert_eq!(*count.lock().unwrap(), 10);
  }

  #[test]
  fn for_each_returns_captured_errors() {
    let result = throw::<i32>(RxError::msg("bad")).for_each(|_| {});
    assert_eq!(result.unwrap_err().to_string(), "bad");
    assert!(from_iter([1, 2, 3]).for_each(|_| {}).is_ok());
  }

  #[test]
  fn from_iter_completes_after_all_values() {
    let collected = Arc::new(Mutex::new((Vec::new(), false)));
    let c = collected.clone();
    from_iter([10, 20, 30]).subscribe_complete(
      move |v| c.lock().unwrap().0.push(v),
      {
        let c = collected.clone();
        move || c.lock().unwrap().1 = true
      },
    );
    let (values, completed) = &*collected.lock().unwrap();
    assert_eq!(values, &vec![10, 20, 30]);
    assert!(*completed);
  }

  #[test]
  fn interval_ticks_on_the_virtual_clock() {
    let manual = ManualScheduler::new();
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let c = ticks.clone();
    let subscription = interval(Duration::from_millis(10), &manual.scheduler())
      .subscribe(move |n| c.lock().unwrap().push(n));
    manual.advance_and_run(Duration::from_millis(35));
    assert_eq!(*ticks.lock().unwrap(), vec![0, 1, 2]);
    subscription.dispose();
    manual.advance_and_run(Duration::from_millis(30));
    assert_eq!(*ticks.lock().unwrap(), vec![0, 1, 2]);
  }
}
