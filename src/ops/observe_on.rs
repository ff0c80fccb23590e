use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::disposable::{CompositeDisposable, Disposable};
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::scheduler::Scheduler;

enum Signal<Item> {
  Next(Item),
  Completed,
  Error(RxError),
}

struct ObserveOnObserver<Item> {
  observer: ObserverRef<Item>,
  scheduler: Scheduler,
  queue: Arc<Mutex<VecDeque<Signal<Item>>>>,
  active: Arc<AtomicBool>,
  disposed: Arc<AtomicBool>,
}

impl<Item: Send + 'static> ObserveOnObserver<Item> {
  fn push(&self, signal: Signal<Item>) {
    self.queue.lock().unwrap().push_back(signal);
    self.ensure_active();
  }

  /// At most one drain task is in flight; signals arriving while it runs
  /// are appended and the drainer keeps going.
  fn ensure_active(&self) {
    if !self.active.swap(true, Ordering::SeqCst) {
      let observer = self.observer.clone();
      let queue = self.queue.clone();
      let active = self.active.clone();
      let disposed = self.disposed.clone();
      self.scheduler.schedule(move |_| {
        drain(&observer, &queue, &active, &disposed);
        Disposable::empty()
      });
    }
  }
}

fn drain<Item>(
  observer: &ObserverRef<Item>,
  queue: &Mutex<VecDeque<Signal<Item>>>,
  active: &AtomicBool,
  disposed: &AtomicBool,
) {
  loop {
    let signal = queue.lock().unwrap().pop_front();
    match signal {
      Some(signal) => {
        if disposed.load(Ordering::SeqCst) {
          continue;
        }
        match signal {
          Signal::Next(value) => observer.on_next(value),
          Signal::Completed => observer.on_completed(),
          Signal::Error(error) => observer.on_error(error),
        }
      }
      None => {
        active.store(false, Ordering::SeqCst);
        // a producer may have appended between the pop and the reset;
        // whoever wins the swap continues draining
        if queue.lock().unwrap().is_empty()
          || active.swap(true, Ordering::SeqCst)
        {
          break;
        }
      }
    }
  }
}

impl<Item: Send + 'static> Observer<Item> for ObserveOnObserver<Item> {
  fn on_next(&self, value: Item) {
    self.push(Signal::Next(value));
  }

  fn on_completed(&self) {
    self.push(Signal::Completed);
  }

  fn on_error(&self, error: RxError) {
    self.push(Signal::Error(error));
  }
}

impl<Item: Send + 'static> Observable<Item> {
  /// Marshals every downstream signal through a per-subscription FIFO
  /// drained on `scheduler`, preserving order.
  pub fn observe_on(&self, scheduler: &Scheduler) -> Observable<Item> {
    let source = self.clone();
    let scheduler = scheduler.clone();
    Observable::create(move |observer| {
      let disposed = Arc::new(AtomicBool::new(false));
      let all = CompositeDisposable::new();
      {
        let disposed = disposed.clone();
        all.add(Disposable::new(move || {
          disposed.store(true, Ordering::SeqCst);
        }));
      }
      all.add(source.subscribe_observer(Arc::new(ObserveOnObserver {
        observer,
        scheduler: scheduler.clone(),
        queue: Arc::new(Mutex::new(VecDeque::new())),
        active: Arc::new(AtomicBool::new(false)),
        disposed,
      })));
      Disposable::wrap(all)
    })
  }
}
