//! rxkernel - an in-process reactive-streams kernel.
//!
//! Push-based producers ([`Observable`](observable::Observable)) deliver
//! an ordered stream of values, optionally terminated by a completion or
//! an error, to consumers ([`Observer`](observer::Observer)). Subjects
//! multicast one upstream to many downstreams, disposables cancel
//! subscriptions, and schedulers decide where and when signals run.
//!
//! ```
//! use rxkernel::prelude::*;
//!
//! let doubled = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! let sink = doubled.clone();
//! observable::from_iter([1, 2, 3])
//!   .map(|v| v * 2)
//!   .subscribe(move |v| sink.lock().unwrap().push(v));
//! assert_eq!(*doubled.lock().unwrap(), vec![2, 4, 6]);
//! ```

pub mod connectable;
pub mod dispatcher;
pub mod disposable;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub(crate) mod producer;
pub mod scheduler;
pub mod subject;
mod util;

pub mod prelude {
  pub use crate::connectable::{
    connect_forever, multicast, publish, publish_last, publish_value,
    ref_count, ConnectableObservable,
  };
  pub use crate::dispatcher::Dispatcher;
  pub use crate::disposable::{
    CompositeDisposable, Disposable, DisposableLike, RefCountDisposable,
    ScheduledDisposable, SerialDisposable,
  };
  pub use crate::error::RxError;
  pub use crate::observable::{self, Observable};
  pub use crate::observer::{
    self, AutoDetachObserver, Observer, ObserverRef,
  };
  pub use crate::ops::{merge, to_async, to_async_on, GroupedObservable};
  pub use crate::scheduler::{
    self, CurrentThreadScheduler, ImmediateScheduler, ManualScheduler,
    NewThreadScheduler, Scheduler, SchedulerCore, ThreadPoolScheduler,
  };
  pub use crate::subject::{
    AsyncSubject, BehaviorSubject, GroupedSubject, Subject, SubjectLike,
  };
}
