use std::sync::Arc;

use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{self, Scheduler};
use crate::subject::AsyncSubject;
use crate::util;

/// Turns a synchronous function into an asynchronous one: each call
/// schedules one execution on `scheduler` and returns an observable that
/// caches the result (or the captured panic, as an error) for any number
/// of subscribers at any time.
pub fn to_async_on<Arg, Ret>(
  f: impl Fn(Arg) -> Ret + Send + Sync + 'static,
  scheduler: &Scheduler,
) -> impl Fn(Arg) -> Observable<Ret>
where
  Arg: Send + 'static,
  Ret: Clone + Send + 'static,
{
  let f = Arc::new(f);
  let scheduler = scheduler.clone();
  move |arg: Arg| {
    let subject = AsyncSubject::new();
    let result = subject.clone();
    let f = f.clone();
    scheduler.schedule(move |_| {
      match util::guard(|| (*f)(arg)) {
        Ok(value) => {
          result.on_next(value);
          result.on_completed();
        }
        Err(error) => result.on_error(error),
      }
      Disposable::empty()
    });
    subject.as_observable()
  }
}

/// `to_async_on` against the process-wide default pool.
pub fn to_async<Arg, Ret>(
  f: impl Fn(Arg) -> Ret + Send + Sync + 'static,
) -> impl Fn(Arg) -> Observable<Ret>
where
  Arg: Send + 'static,
  Ret: Clone + Send + 'static,
{
  to_async_on(f, &scheduler::default_pool())
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;
  use crate::scheduler::ManualScheduler;

  #[test]
  fn result_reaches_subscribers_after_the_run() {
    let manual = ManualScheduler::new();
    let double = to_async_on(|v: i32| v * 2, &manual.scheduler());

    let result = double(21);
    let got = Arc::new(Mutex::new(None));
    let g = got.clone();
    result.subscribe(move |v| *g.lock().unwrap() = Some(v));
    assert!(got.lock().unwrap().is_none());

    manual.run_tasks();
    assert_eq!(*got.lock().unwrap(), Some(42));

    // late subscribers replay the cached result
    let late = Arc::new(Mutex::new(None));
    let l = late.clone();
    result.subscribe(move |v| *l.lock().unwrap() = Some(v));
    assert_eq!(*late.lock().unwrap(), Some(42));
  }

  #[test]
  fn panics_surface_as_error_signals() {
    let manual = ManualScheduler::new();
    let fail = to_async_on(
      |_: i32| -> i32 { panic!("computation fell over") },
      &manual.scheduler(),
    );
    let result = fail(1);
    manual.run_tasks();
    let error = Arc::new(Mutex::new(None));
    let e = error.clone();
    result.subscribe_err(
      |_| {},
      move |err| *e.lock().unwrap() = Some(err.to_string()),
    );
    assert_eq!(
      error.lock().unwrap().as_deref(),
      Some("computation fell over")
    );
  }

  #[test]
  fn runs_on_the_default_pool() {
    let add = to_async(|(a, b): (i32, i32)| a + b);
    let got = Arc::new(Mutex::new(None));
    let g = got.clone();
    add((2, 3))
      .for_each(move |v| *g.lock().unwrap() = Some(v))
      .unwrap();
    assert_eq!(*got.lock().unwrap(), Some(5));
  }
}
