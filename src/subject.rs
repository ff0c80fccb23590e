//! Multicast bridges: objects that are observer and observable at once.
//!
//! All subjects share the same internals: a three-state machine
//! (forwarding / completed / errored), a tombstoned observer list under a
//! mutex, and weak back-references from subscription disposables so that
//! an abandoned subject is not kept alive by its subscribers' handles.
//! Delivery always snapshots the list under the lock and releases it
//! before signalling, so re-entrant subscribe/dispose cannot deadlock.

use std::sync::{Arc, Mutex, Weak};

use smallvec::SmallVec;

use crate::disposable::Disposable;
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

mod async_subject;
pub use async_subject::AsyncSubject;
mod behavior;
pub use behavior::BehaviorSubject;
mod grouped;
pub use grouped::GroupedSubject;

/// Both halves of a subject, as `multicast` consumes them.
pub trait SubjectLike<Item>: Clone + Send + Sync + 'static {
  fn as_observer(&self) -> ObserverRef<Item>;
  fn as_observable(&self) -> Observable<Item>;
}

pub(crate) enum SubjectState {
  Forwarding,
  Completed,
  Errored(RxError),
}

pub(crate) type Snapshot<Item> = SmallVec<[ObserverRef<Item>; 4]>;

pub(crate) struct SubjectCore<Item> {
  pub state: SubjectState,
  observers: Vec<Option<ObserverRef<Item>>>,
  free_slots: usize,
}

impl<Item> SubjectCore<Item> {
  pub fn new() -> Self {
    SubjectCore {
      state: SubjectState::Forwarding,
      observers: Vec::new(),
      free_slots: 0,
    }
  }

  /// Enrolls an observer, reusing a tombstone slot when one is free, and
  /// returns the slot index for the subscription's back-reference.
  pub fn enroll(&mut self, observer: ObserverRef<Item>) -> usize {
    if self.free_slots > 0 {
      for (index, slot) in self.observers.iter_mut().enumerate() {
        if slot.is_none() {
          *slot = Some(observer);
          self.free_slots -= 1;
          return index;
        }
      }
    }
    self.observers.push(Some(observer));
    self.observers.len() - 1
  }

  /// Live observers, for delivery outside the lock.
  pub fn snapshot(&self) -> Snapshot<Item> {
    self.observers.iter().flatten().cloned().collect()
  }

  /// Takes the whole list; terminal delivery empties the subject.
  pub fn drain(&mut self) -> Snapshot<Item> {
    self.free_slots = 0;
    std::mem::take(&mut self.observers)
      .into_iter()
      .flatten()
      .collect()
  }

  pub fn tombstone(&mut self, index: usize) {
    let removed = self
      .observers
      .get_mut(index)
      .map(|slot| slot.take().is_some())
      .unwrap_or(false);
    if removed {
      self.free_slots += 1;
    }
  }

  pub fn subscribed_count(&self) -> usize {
    self.observers.len() - self.free_slots
  }
}

/// Plain multicast subject: subscribers receive exactly the signals
/// emitted after they enrolled.
pub struct Subject<Item> {
  core: Arc<Mutex<SubjectCore<Item>>>,
}

impl<Item> Clone for Subject<Item> {
  fn clone(&self) -> Self {
    Subject {
      core: self.core.clone(),
    }
  }
}

impl<Item> Default for Subject<Item> {
  fn default() -> Self {
    Subject::new()
  }
}

impl<Item> Subject<Item> {
  pub fn new() -> Self {
    Subject {
      core: Arc::new(Mutex::new(SubjectCore::new())),
    }
  }

  pub fn subscribed_count(&self) -> usize {
    self.core.lock().unwrap().subscribed_count()
  }
}

impl<Item: 'static> Subject<Item> {
  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    enum Replay {
      Enrolled(usize),
      Completed,
      Errored(RxError),
    }
    let replay = {
      let mut core = self.core.lock().unwrap();
      match core.state {
        SubjectState::Forwarding => Replay::Enrolled(core.enroll(observer.clone())),
        SubjectState::Completed => Replay::Completed,
        SubjectState::Errored(ref error) => Replay::Errored(error.clone()),
      }
    };
    match replay {
      Replay::Enrolled(index) => {
        let weak = Arc::downgrade(&self.core);
        Disposable::new(move || detach(&weak, index))
      }
      Replay::Completed => {
        observer.on_completed();
        Disposable::empty()
      }
      Replay::Errored(error) => {
        observer.on_error(error);
        Disposable::empty()
      }
    }
  }

  pub fn as_observable(&self) -> Observable<Item> {
    let subject = self.clone();
    Observable::raw(move |observer| subject.subscribe_observer(observer))
  }

  pub fn subscribe(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Disposable {
    self.as_observable().subscribe(next)
  }
}

fn detach<Item>(core: &Weak<Mutex<SubjectCore<Item>>>, index: usize) {
  if let Some(core) = core.upgrade() {
    core.lock().unwrap().tombstone(index);
  }
}

impl<Item: Clone + 'static> Observer<Item> for Subject<Item> {
  fn on_next(&self, value: Item) {
    let snapshot = {
      let core = self.core.lock().unwrap();
      if !matches!(core.state, SubjectState::Forwarding) {
        return;
      }
      core.snapshot()
    };
    for observer in snapshot {
      observer.on_next(value.clone());
    }
  }

  fn on_completed(&self) {
    let drained = {
      let mut core = self.core.lock().unwrap();
      if !matches!(core.state, SubjectState::Forwarding) {
        return;
      }
      core.state = SubjectState::Completed;
      core.drain()
    };
    for observer in drained {
      observer.on_completed();
    }
  }

  fn on_error(&self, error: RxError) {
    let drained = {
      let mut core = self.core.lock().unwrap();
      if !matches!(core.state, SubjectState::Forwarding) {
        return;
      }
      core.state = SubjectState::Errored(error.clone());
      core.drain()
    };
    for observer in drained {
      observer.on_error(error.clone());
    }
  }
}

impl<Item: Clone + Send + 'static> SubjectLike<Item> for Subject<Item> {
  fn as_observer(&self) -> ObserverRef<Item> {
    Arc::new(self.clone())
  }

  fn as_observable(&self) -> Observable<Item> {
    Subject::as_observable(self)
  }
}
