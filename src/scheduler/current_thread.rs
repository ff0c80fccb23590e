//! Trampoline scheduler.
//!
//! The first action scheduled on a thread installs a queue and runs
//! directly; actions scheduled while one is already running are enqueued
//! (ordered by due time) and executed iteratively after the current one
//! returns. Synchronous producer chains of arbitrary depth therefore never
//! grow the stack.

use std::cell::RefCell;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::disposable::Disposable;
use crate::scheduler::{Action, Scheduler, SchedulerCore};

struct Entry {
  due: Instant,
  seq: u64,
  cancelled: Arc<AtomicBool>,
  action: Action,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Entry {
  // reversed so the BinaryHeap pops the earliest entry first
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

struct Trampoline {
  queue: BinaryHeap<Entry>,
  next_seq: u64,
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<Trampoline>> = RefCell::new(None);
}

/// Clears the thread-local queue even if an action panics, so the thread
/// is usable for a fresh trampoline afterwards.
struct Uninstall;

impl Drop for Uninstall {
  fn drop(&mut self) {
    TRAMPOLINE.with(|t| *t.borrow_mut() = None);
  }
}

/// The process-wide current-thread trampoline scheduler.
#[derive(Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// True when the calling thread is outside any trampoline, i.e. a
  /// `schedule` call is required to establish one.
  pub fn is_schedule_required() -> bool {
    TRAMPOLINE.with(|t| t.borrow().is_none())
  }

  fn drain(handle: &Scheduler) {
    loop {
      let entry = TRAMPOLINE
        .with(|t| t.borrow_mut().as_mut().and_then(|tr| tr.queue.pop()));
      let entry = match entry {
        Some(entry) => entry,
        None => break,
      };
      if entry.cancelled.load(Ordering::SeqCst) {
        continue;
      }
      let now = Instant::now();
      if entry.due > now {
        std::thread::sleep(entry.due - now);
      }
      let _ = (entry.action)(handle);
    }
  }
}

impl SchedulerCore for CurrentThreadScheduler {
  fn schedule_core(
    &self,
    handle: &Scheduler,
    due: Option<Duration>,
    action: Action,
  ) -> Disposable {
    let delay = due.unwrap_or_default();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel = {
      let cancelled = cancelled.clone();
      Disposable::new(move || cancelled.store(true, Ordering::SeqCst))
    };

    let owns_trampoline = TRAMPOLINE.with(|t| {
      let mut slot = t.borrow_mut();
      match slot.as_mut() {
        Some(trampoline) => {
          let seq = trampoline.next_seq;
          trampoline.next_seq += 1;
          trampoline.queue.push(Entry {
            due: Instant::now() + delay,
            seq,
            cancelled: cancelled.clone(),
            action,
          });
          None
        }
        None => {
          *slot = Some(Trampoline {
            queue: BinaryHeap::new(),
            next_seq: 0,
          });
          Some(action)
        }
      }
    });

    if let Some(action) = owns_trampoline {
      let _uninstall = Uninstall;
      if !delay.is_zero() {
        std::thread::sleep(delay);
      }
      if !cancelled.load(Ordering::SeqCst) {
        let _ = action(handle);
      }
      Self::drain(handle);
    }
    cancel
  }
}
