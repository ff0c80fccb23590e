//! Virtual-time scheduler for deterministic tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::disposable::Disposable;
use crate::scheduler::{Action, Scheduler, SchedulerCore};

struct ManualTask {
  due: Instant,
  seq: u64,
  cancelled: Arc<AtomicBool>,
  action: Action,
}

struct ManualCore {
  now: Instant,
  next_seq: u64,
  tasks: Vec<ManualTask>,
}

/// Scheduler driven by an explicit clock. Nothing runs until the test
/// advances the clock; due tasks then run on the calling thread in due
/// order. Tasks scheduled while running (recursion) join the queue.
#[derive(Clone)]
pub struct ManualScheduler {
  core: Arc<Mutex<ManualCore>>,
}

impl ManualScheduler {
  pub fn new() -> Self {
    ManualScheduler {
      core: Arc::new(Mutex::new(ManualCore {
        now: Instant::now(),
        next_seq: 0,
        tasks: Vec::new(),
      })),
    }
  }

  /// A handle sharing this scheduler's clock and queue.
  pub fn scheduler(&self) -> Scheduler {
    Scheduler::new(self.clone())
  }

  /// Moves the clock forward without running anything.
  pub fn advance(&self, by: Duration) {
    self.core.lock().unwrap().now += by;
  }

  /// Runs every task whose due time has been reached, in due order.
  pub fn run_tasks(&self) {
    let handle = self.scheduler();
    loop {
      let task = {
        let mut core = self.core.lock().unwrap();
        let now = core.now;
        let next = core
          .tasks
          .iter()
          .enumerate()
          .filter(|(_, t)| t.due <= now)
          .min_by_key(|(_, t)| (t.due, t.seq))
          .map(|(index, _)| index);
        match next {
          Some(index) => Some(core.tasks.remove(index)),
          None => None,
        }
      };
      let task = match task {
        Some(task) => task,
        None => break,
      };
      if !task.cancelled.load(Ordering::SeqCst) {
        let _ = (task.action)(&handle);
      }
    }
  }

  /// Advances the clock to `now + by`, running every task that falls due
  /// on the way. The clock steps through each task's due time before the
  /// task runs, so recursive schedules (an interval, say) fire for every
  /// period inside the window, not just once.
  pub fn advance_and_run(&self, by: Duration) {
    let handle = self.scheduler();
    let target = self.core.lock().unwrap().now + by;
    loop {
      let task = {
        let mut core = self.core.lock().unwrap();
        let next = core
          .tasks
          .iter()
          .enumerate()
          .filter(|(_, t)| t.due <= target)
          .min_by_key(|(_, t)| (t.due, t.seq))
          .map(|(index, _)| index);
        match next {
          Some(index) => {
            let task = core.tasks.remove(index);
            if task.due > core.now {
              core.now = task.due;
            }
            Some(task)
          }
          None => {
            core.now = target;
            None
          }
        }
      };
      let task = match task {
        Some(task) => task,
        None => break,
      };
      if !task.cancelled.load(Ordering::SeqCst) {
        let _ = (task.action)(&handle);
      }
    }
  }

  pub fn pending_tasks(&self) -> usize {
    self.core.lock().unwrap().tasks.len()
  }
}

impl Default for ManualScheduler {
  fn default() -> Self {
    ManualScheduler::new()
  }
}

impl SchedulerCore for ManualScheduler {
  fn schedule_core(
    &self,
    _handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable {
    let cancelled = Arc::new(AtomicBool::new(false));
    {
      let mut core = self.core.lock().unwrap();
      let due = core.now + due.unwrap_or_default();
      let seq = core.next_seq;
      core.next_seq += 1;
      core.tasks.push(ManualTask {
        due,
        seq,
        cancelled: cancelled.clone(),
        action,
      });
    }
    Disposable::new(move || cancelled.store(true, Ordering::SeqCst))
  }

  fn now(&self) -> Instant {
    self.core.lock().unwrap().now
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::AtomicUsize;

  use super::*;
  use crate::disposable::DisposableLike;

  #[test]
  fn tasks_wait_for_the_clock() {
    let hits = Arc::new(AtomicUsize::new(0));
    let manual = ManualScheduler::new();
    let scheduler = manual.scheduler();
    let c = hits.clone();
    scheduler.schedule_after(Duration::from_millis(100), move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Disposable::empty()
    });
    manual.run_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    manual.advance_and_run(Duration::from_millis(99));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    manual.advance_and_run(Duration::from_millis(1));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn due_order_beats_schedule_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let manual = ManualScheduler::new();
    let scheduler = manual.scheduler();
    for (label, delay) in [("late", 20u64), ("early", 10)] {
      let order = order.clone();
      scheduler.schedule_after(Duration::from_millis(delay), move |_| {
        order.lock().unwrap().push(label);
        Disposable::empty()
      });
    }
    manual.advance_and_run(Duration::from_millis(30));
    assert_eq!(*order.lock().unwrap(), vec!["early", "late"]);
  }

  #[test]
  fn recursive_tasks_run_in_the_same_drain() {
    let hits = Arc::new(AtomicUsize::new(0));
    let manual = ManualScheduler::new();
    let scheduler = manual.scheduler();
    let c = hits.clone();
    scheduler.schedule(move |s| {
      c.fetch_add(1, Ordering::SeqCst);
      let c = c.clone();
      s.schedule(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Disposable::empty()
      })
    });
    manual.run_tasks();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn a_large_advance_steps_through_recursive_schedules() {
    fn tick(s: &Scheduler, hits: Arc<AtomicUsize>) -> Disposable {
      s.schedule_after(Duration::from_millis(10), move |s| {
        hits.fetch_add(1, Ordering::SeqCst);
        tick(s, hits)
      })
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let manual = ManualScheduler::new();
    tick(&manual.scheduler(), hits.clone());
    manual.advance_and_run(Duration::from_millis(35));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn disposed_tasks_do_not_run() {
    let hits = Arc::new(AtomicUsize::new(0));
    let manual = ManualScheduler::new();
    let scheduler = manual.scheduler();
    let c = hits.clone();
    let pending =
      scheduler.schedule_after(Duration::from_millis(10), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Disposable::empty()
      });
    pending.dispose();
    manual.advance_and_run(Duration::from_millis(20));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
