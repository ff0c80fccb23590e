use std::sync::Mutex;
use std::time::Duration;

use futures::executor::ThreadPool;
use futures::future::RemoteHandle;
use futures::task::SpawnExt;
use futures_timer::Delay;

use crate::disposable::{Disposable, DisposableLike};
use crate::scheduler::{Action, Scheduler, SchedulerCore};

/// Scheduler backed by the futures executor thread pool; delayed work uses
/// a timer future instead of parking a pool thread.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  pub fn new() -> Self {
    ThreadPoolScheduler {
      pool: ThreadPool::new().expect("spawn scheduler thread pool failed."),
    }
  }
}

impl Default for ThreadPoolScheduler {
  fn default() -> Self {
    ThreadPoolScheduler::new()
  }
}

impl SchedulerCore for ThreadPoolScheduler {
  fn schedule_core(
    &self,
    handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable {
    let handle = handle.clone();
    let delay = due.unwrap_or_default();
    let future = async move {
      if !delay.is_zero() {
        Delay::new(delay).await;
      }
      let _ = action(&handle);
    };
    let remote = self
      .pool
      .spawn_with_handle(future)
      .expect("spawn task to thread pool failed.");
    Disposable::wrap(SpawnHandle::new(remote))
  }
}

/// Cancellation handle for a spawned task: disposing drops the remote
/// handle (aborting the task); dropping without disposing lets the task
/// run to completion.
pub struct SpawnHandle {
  handle: Mutex<Option<RemoteHandle<()>>>,
}

impl SpawnHandle {
  pub fn new(handle: RemoteHandle<()>) -> Self {
    SpawnHandle {
      handle: Mutex::new(Some(handle)),
    }
  }
}

impl DisposableLike for SpawnHandle {
  fn dispose(&self) {
    self.handle.lock().unwrap().take();
  }

  fn is_disposed(&self) -> bool {
    self.handle.lock().unwrap().is_none()
  }
}

impl Drop for SpawnHandle {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.get_mut().unwrap().take() {
      handle.forget()
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use super::*;

  #[test]
  fn runs_off_the_calling_thread() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    let scheduler = Scheduler::new(ThreadPoolScheduler::new());
    scheduler.schedule(move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Disposable::empty()
    });
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn delayed_work_waits_and_can_be_cancelled() {
    let hits = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::new(ThreadPoolScheduler::new());

    let c = hits.clone();
    scheduler.schedule_after(Duration::from_millis(30), move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Disposable::empty()
    });
    let c = hits.clone();
    let cancelled =
      scheduler.schedule_after(Duration::from_millis(30), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Disposable::empty()
      });
    cancelled.dispose();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }
}
