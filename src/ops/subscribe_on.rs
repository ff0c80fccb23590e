use std::sync::Arc;

use crate::disposable::{
  CompositeDisposable, Disposable, ScheduledDisposable, SerialDisposable,
};
use crate::observable::Observable;
use crate::scheduler::Scheduler;

impl<Item: 'static> Observable<Item> {
  /// Performs the act of subscribing on `scheduler`; disposal of the
  /// resulting upstream subscription is scheduled there too.
  pub fn subscribe_on(&self, scheduler: &Scheduler) -> Observable<Item> {
    let source = self.clone();
    let scheduler = scheduler.clone();
    Observable::create(move |observer| {
      let all = CompositeDisposable::new();
      let slot = SerialDisposable::new();
      all.add(slot.clone());
      let source = source.clone();
      all.add(scheduler.schedule(move |scheduler| {
        let subscription = source.subscribe_observer(observer);
        slot.set(ScheduledDisposable::new(scheduler.clone(), subscription));
        Disposable::empty()
      }));
      Disposable::wrap(all)
    })
  }
}
