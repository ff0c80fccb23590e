use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::disposable::Disposable;
use crate::scheduler::{Action, Scheduler, SchedulerCore};

/// Spawns a dedicated thread per scheduled action. Expensive but isolated;
/// useful for long-running or blocking actions that must not occupy a
/// pool thread.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl SchedulerCore for NewThreadScheduler {
  fn schedule_core(
    &self,
    handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let handle = handle.clone();
    let delay = due.unwrap_or_default();
    std::thread::Builder::new()
      .name("rx-new-thread".into())
      .spawn(move || {
        if !delay.is_zero() {
          std::thread::sleep(delay);
        }
        if !flag.load(Ordering::SeqCst) {
          let _ = action(&handle);
        }
      })
      .expect("spawn scheduler thread failed.");
    Disposable::new(move || cancelled.store(true, Ordering::SeqCst))
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::AtomicUsize;
  use std::sync::mpsc;

  use super::*;
  use crate::disposable::DisposableLike;

  #[test]
  fn runs_on_its_own_thread() {
    let (tx, rx) = mpsc::channel();
    let scheduler = Scheduler::new(NewThreadScheduler);
    scheduler.schedule(move |_| {
      tx.send(std::thread::current().name().map(str::to_owned))
        .unwrap();
      Disposable::empty()
    });
    let name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(name.as_deref(), Some("rx-new-thread"));
  }

  #[test]
  fn dispose_before_due_suppresses_the_action() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    let scheduler = Scheduler::new(NewThreadScheduler);
    let pending =
      scheduler.schedule_after(Duration::from_millis(50), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Disposable::empty()
      });
    pending.dispose();
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
