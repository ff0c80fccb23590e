//! Connectable observables: multicast with an explicit ignition switch,
//! plus the ref-count machinery that flips the switch automatically.

use std::sync::{Arc, Mutex};

use crate::disposable::{
  Disposable, DisposableLike, SerialDisposable,
};
use crate::observable::Observable;
use crate::observer::ObserverRef;
use crate::producer::produce;
use crate::subject::{AsyncSubject, BehaviorSubject, Subject, SubjectLike};

/// An observable whose upstream subscription is deferred until
/// [`connect`](ConnectableObservable::connect). Subscribing only enrolls
/// with the backing subject; no signal flows until connected.
pub struct ConnectableObservable<Item> {
  source: Observable<Item>,
  subject_observer: ObserverRef<Item>,
  subject_observable: Observable<Item>,
  connection: Arc<Mutex<Option<Disposable>>>,
}

impl<Item> Clone for ConnectableObservable<Item> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      subject_observer: self.subject_observer.clone(),
      subject_observable: self.subject_observable.clone(),
      connection: self.connection.clone(),
    }
  }
}

impl<Item: 'static> ConnectableObservable<Item> {
  /// Subscribes the subject to the source. Idempotent while a connection
  /// exists; the returned disposable tears down the current shared
  /// upstream subscription.
  pub fn connect(&self) -> Disposable {
    {
      let mut connection = self.connection.lock().unwrap();
      if connection.is_none() {
        *connection = Some(
          self.source.subscribe_observer(self.subject_observer.clone()),
        );
      }
    }
    let connection = self.connection.clone();
    Disposable::new(move || {
      let current = connection.lock().unwrap().take();
      if let Some(current) = current {
        current.dispose();
      }
    })
  }

  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    self.subject_observable.subscribe_observer(observer)
  }

  pub fn subscribe(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Disposable {
    self.subject_observable.subscribe(next)
  }

  pub fn as_observable(&self) -> Observable<Item> {
    self.subject_observable.clone()
  }

  /// Plain observable that connects on the first subscription and
  /// disconnects when the last subscriber is gone.
  pub fn ref_count(&self) -> Observable<Item> {
    ref_count(self.clone())
  }
}

/// Routes `source` through `subject` behind a connect switch.
pub fn multicast<Item, S>(
  source: &Observable<Item>,
  subject: &S,
) -> ConnectableObservable<Item>
where
  Item: 'static,
  S: SubjectLike<Item>,
{
  ConnectableObservable {
    source: source.clone(),
    subject_observer: subject.as_observer(),
    subject_observable: subject.as_observable(),
    connection: Arc::new(Mutex::new(None)),
  }
}

/// Multicast through a plain subject.
pub fn publish<Item>(source: &Observable<Item>) -> ConnectableObservable<Item>
where
  Item: Clone + Send + 'static,
{
  multicast(source, &Subject::new())
}

/// Multicast through a behavior subject seeded with `initial`.
pub fn publish_value<Item>(
  source: &Observable<Item>,
  initial: Item,
) -> ConnectableObservable<Item>
where
  Item: Clone + Send + 'static,
{
  multicast(source, &BehaviorSubject::new(initial))
}

/// Multicast through an async subject: subscribers get only the final
/// value, whenever they arrive.
pub fn publish_last<Item>(
  source: &Observable<Item>,
) -> ConnectableObservable<Item>
where
  Item: Clone + Send + 'static,
{
  multicast(source, &AsyncSubject::new())
}

/// Connects immediately and exposes the subject side as an ordinary
/// observable. The connection is never torn down by the kernel.
pub fn connect_forever<Item: 'static>(
  connectable: &ConnectableObservable<Item>,
) -> Observable<Item> {
  let _ = connectable.connect();
  connectable.as_observable()
}

struct RefCountState {
  count: usize,
  connection: Option<Disposable>,
}

/// Converts a connectable into a plain observable counting downstream
/// subscriptions: connect on 0 -> 1, disconnect on 1 -> 0.
pub fn ref_count<Item: 'static>(
  connectable: ConnectableObservable<Item>,
) -> Observable<Item> {
  let state = Arc::new(Mutex::new(RefCountState {
    count: 0,
    connection: None,
  }));
  produce(move |sink| {
    let subscription = SerialDisposable::new();
    let observer: ObserverRef<Item> = sink;
    subscription.set(connectable.subscribe_observer(observer));

    {
      let mut state = state.lock().unwrap();
      state.count += 1;
      if state.count == 1 {
        state.connection = Some(connectable.connect());
      }
    }

    let state = state.clone();
    Disposable::new(move || {
      subscription.dispose();
      let connection = {
        let mut state = state.lock().unwrap();
        state.count -= 1;
        if state.count == 0 {
          state.connection.take()
        } else {
          None
        }
      };
      if let Some(connection) = connection {
        connection.dispose();
      }
    })
  })
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::observable;
  use crate::observer::Observer;

  fn counting_source(
    subscriptions: Arc<AtomicUsize>,
  ) -> Observable<i32> {
    Observable::create(move |observer| {
      subscriptions.fetch_add(1, Ordering::SeqCst);
      observer.on_next(1);
      observer.on_next(2);
      Disposable::empty()
    })
  }

  #[test]
  fn no_signal_flows_before_connect() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let connectable = publish(&counting_source(subscriptions.clone()));
    let values = Arc::new(Mutex::new(Vec::new()));
    let v = values.clone();
    connectable.subscribe(move |value| v.lock().unwrap().push(value));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 0);
    assert!(values.lock().unwrap().is_empty());

    connectable.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(*values.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn connect_is_idempotent_while_connected() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let connectable = publish(&counting_source(subscriptions.clone()));
    let first = connectable.connect();
    connectable.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    first.dispose();
    connectable.connect();
    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn ref_count_connects_once_and_reconnects_after_drain() {
    let connections = Arc::new(AtomicUsize::new(0));
    let subject = Subject::<i32>::new();
    let c = connections.clone();
    let upstream = subject.clone();
    let source = Observable::create(move |observer| {
      c.fetch_add(1, Ordering::SeqCst);
      upstream.subscribe_observer(observer)
    });
    let shared = publish(&source).ref_count();

    let a_values = Arc::new(Mutex::new(Vec::new()));
    let v = a_values.clone();
    let a = shared.subscribe(move |value| v.lock().unwrap().push(value));
    let b = shared.subscribe(|_| {});
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    subject.on_next(7);
    assert_eq!(*a_values.lock().unwrap(), vec![7]);

    a.dispose();
    b.dispose();
    // drained: a fresh subscriber triggers a fresh connection
    let c2 = shared.subscribe(|_| {});
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    c2.dispose();
  }

  #[test]
  fn publish_last_hands_late_subscribers_the_final_value() {
    let source = observable::from_iter([1, 2, 3]);
    let connectable = publish_last(&source);
    connectable.connect();
    let got = Arc::new(Mutex::new(Vec::new()));
    let g = got.clone();
    connectable.subscribe(move |v| g.lock().unwrap().push(v));
    assert_eq!(*got.lock().unwrap(), vec![3]);
  }

  #[test]
  fn connect_forever_starts_the_flow() {
    let subject = Subject::<i32>::new();
    let upstream = subject.clone();
    let source =
      Observable::create(move |observer| upstream.subscribe_observer(observer));
    let connectable = publish(&source);
    let flowing = connect_forever(&connectable);
    let values = Arc::new(Mutex::new(Vec::new()));
    let v = values.clone();
    flowing.subscribe(move |value| v.lock().unwrap().push(value));
    subject.on_next(5);
    assert_eq!(*values.lock().unwrap(), vec![5]);
  }
}
