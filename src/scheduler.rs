//! Scheduling contract and the bundled scheduler implementations.
//!
//! A scheduler decides where and when work runs. The kernel only relies on
//! the three-operation contract (`schedule`, `schedule_after`, `now`);
//! everything else about an implementation - thread pool, dedicated
//! thread, virtual clock - is its own business.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::disposable::Disposable;

mod current_thread;
pub use current_thread::CurrentThreadScheduler;
mod thread_pool;
pub use thread_pool::{SpawnHandle, ThreadPoolScheduler};
mod new_thread;
pub use new_thread::NewThreadScheduler;
mod manual;
pub use manual::ManualScheduler;

/// A boxed scheduled action. Actions receive the scheduler they run on so
/// they can schedule recursively, and return a disposable for any nested
/// work they started.
pub type Action = Box<dyn FnOnce(&Scheduler) -> Disposable + Send>;

/// Implemented by concrete schedulers. `handle` is the public [`Scheduler`]
/// wrapping this core; it is threaded through so actions can recurse.
pub trait SchedulerCore: Send + Sync {
  fn schedule_core(
    &self,
    handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable;

  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// Cloneable scheduler handle.
#[derive(Clone)]
pub struct Scheduler(Arc<dyn SchedulerCore>);

impl Scheduler {
  pub fn new(core: impl SchedulerCore + 'static) -> Self {
    Scheduler(Arc::new(core))
  }

  /// Runs `action` as soon as this scheduler allows.
  pub fn schedule(
    &self,
    action: impl FnOnce(&Scheduler) -> Disposable + Send + 'static,
  ) -> Disposable {
    self.0.schedule_core(self, None, Box::new(action))
  }

  /// Runs `action` after at least `delay`.
  pub fn schedule_after(
    &self,
    delay: Duration,
    action: impl FnOnce(&Scheduler) -> Disposable + Send + 'static,
  ) -> Disposable {
    self.0.schedule_core(self, Some(delay), Box::new(action))
  }

  /// Scheduler-local monotonic time.
  pub fn now(&self) -> Instant {
    self.0.now()
  }
}

/// Runs actions inline on the calling thread; `schedule_after` sleeps.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl SchedulerCore for ImmediateScheduler {
  fn schedule_core(
    &self,
    handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable {
    if let Some(delay) = due {
      if !delay.is_zero() {
        std::thread::sleep(delay);
      }
    }
    action(handle)
  }
}

lazy_static::lazy_static! {
  static ref DEFAULT_POOL: Scheduler =
    Scheduler::new(ThreadPoolScheduler::new());
}

/// The process-wide shared thread pool, used as the default scheduler by
/// `to_async` and available to hosts that do not care which pool runs
/// their work.
pub fn default_pool() -> Scheduler {
  DEFAULT_POOL.clone()
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use super::*;

  #[test]
  fn immediate_runs_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    let scheduler = Scheduler::new(ImmediateScheduler);
    scheduler.schedule(move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Disposable::empty()
    });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn actions_can_recurse_via_the_handle() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    let scheduler = Scheduler::new(ImmediateScheduler);
    scheduler.schedule(move |s| {
      c.fetch_add(1, Ordering::SeqCst);
      let c = c.clone();
      s.schedule(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Disposable::empty()
      })
    });
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }
}
