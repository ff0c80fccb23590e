//! Out-of-band dispatch queue for host-pumped delivery.
//!
//! `observe_on_dispatcher` posts every signal here as a thunk; the host
//! drains the queue from whatever loop it owns (a UI thread, a game loop)
//! with `try_dispatch` or `dispatch_one`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

type Thunk = Box<dyn FnOnce() + Send>;

pub struct Dispatcher {
  pending: Mutex<VecDeque<Thunk>>,
  wake: Condvar,
}

impl Dispatcher {
  pub fn new() -> Self {
    Dispatcher {
      pending: Mutex::new(VecDeque::new()),
      wake: Condvar::new(),
    }
  }

  /// Enqueues work and wakes one blocked `dispatch_one` caller.
  pub fn post(&self, work: impl FnOnce() + Send + 'static) {
    self.pending.lock().unwrap().push_back(Box::new(work));
    self.wake.notify_one();
  }

  /// Runs one pending thunk if there is one. Never blocks.
  pub fn try_dispatch(&self) -> bool {
    let work = self.pending.lock().unwrap().pop_front();
    match work {
      Some(work) => {
        work();
        true
      }
      None => false,
    }
  }

  /// Blocks until work arrives, then runs exactly one thunk.
  pub fn dispatch_one(&self) -> bool {
    let work = {
      let mut pending = self.pending.lock().unwrap();
      while pending.is_empty() {
        pending = self.wake.wait(pending).unwrap();
      }
      pending.pop_front()
    };
    match work {
      Some(work) => {
        work();
        true
      }
      None => false,
    }
  }

  pub fn len(&self) -> usize {
    self.pending.lock().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for Dispatcher {
  fn default() -> Self {
    Dispatcher::new()
  }
}
