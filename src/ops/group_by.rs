use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::disposable::Disposable;
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::subject::GroupedSubject;
use crate::util;

/// The per-key stream `group_by` emits: a key plus the observable side of
/// that key's grouped subject.
pub struct GroupedObservable<Key, Item> {
  key: Key,
  observable: Observable<Item>,
}

impl<Key: Clone, Item> Clone for GroupedObservable<Key, Item> {
  fn clone(&self) -> Self {
    GroupedObservable {
      key: self.key.clone(),
      observable: self.observable.clone(),
    }
  }
}

impl<Key, Item: 'static> GroupedObservable<Key, Item> {
  pub fn key(&self) -> &Key {
    &self.key
  }

  pub fn as_observable(&self) -> Observable<Item> {
    self.observable.clone()
  }

  pub fn subscribe(
    &self,
    next: impl Fn(Item) + Send + Sync + 'static,
  ) -> Disposable {
    self.observable.subscribe(next)
  }
}

struct GroupByObserver<Item, Key, Value> {
  observer: ObserverRef<GroupedObservable<Key, Value>>,
  key_selector: Arc<dyn Fn(&Item) -> Key + Send + Sync>,
  value_selector: Arc<dyn Fn(&Item) -> Value + Send + Sync>,
  groups: Mutex<BTreeMap<Key, GroupedSubject<Key, Value>>>,
}

impl<Item, Key, Value> GroupByObserver<Item, Key, Value>
where
  Key: Ord + Clone,
{
  fn drain_groups(&self) -> Vec<GroupedSubject<Key, Value>> {
    let groups = std::mem::take(&mut *self.groups.lock().unwrap());
    groups.into_values().collect()
  }
}

impl<Item, Key, Value> Observer<Item> for GroupByObserver<Item, Key, Value>
where
  Item: 'static,
  Key: Ord + Clone + Send + Sync + 'static,
  Value: Clone + Send + 'static,
{
  fn on_next(&self, value: Item) {
    let key = match util::guard(|| (*self.key_selector)(&value)) {
      Ok(key) => key,
      Err(error) => {
        self.observer.on_error(error);
        return;
      }
    };

    let (group, is_new) = {
      let mut groups = self.groups.lock().unwrap();
      match groups.entry(key.clone()) {
        Entry::Occupied(slot) => (slot.get().clone(), false),
        Entry::Vacant(slot) => {
          let group = GroupedSubject::new(key);
          slot.insert(group.clone());
          (group, true)
        }
      }
    };

    if is_new {
      self.observer.on_next(GroupedObservable {
        key: group.key().clone(),
        observable: group.as_observable(),
      });
    }

    match util::guard(|| (*self.value_selector)(&value)) {
      Ok(value) => group.on_next(value),
      Err(error) => self.observer.on_error(error),
    }
  }

  fn on_completed(&self) {
    for group in self.drain_groups() {
      group.on_completed();
    }
    self.observer.on_completed();
  }

  fn on_error(&self, error: RxError) {
    for group in self.drain_groups() {
      group.on_error(error.clone());
    }
    self.observer.on_error(error);
  }
}

impl<Item: 'static> Observable<Item> {
  /// Partitions the stream into per-key substreams. A value's key picks
  /// its group (creating it, and emitting it downstream, on first
  /// sight); the value selector decides what flows into the group.
  /// Terminal signals propagate to every group and then downstream.
  pub fn group_by<Key, Value>(
    &self,
    key_selector: impl Fn(&Item) -> Key + Send + Sync + 'static,
    value_selector: impl Fn(&Item) -> Value + Send + Sync + 'static,
  ) -> Observable<GroupedObservable<Key, Value>>
  where
    Key: Ord + Clone + Send + Sync + 'static,
    Value: Clone + Send + 'static,
  {
    let source = self.clone();
    let key_selector: Arc<dyn Fn(&Item) -> Key + Send + Sync> =
      Arc::new(key_selector);
    let value_selector: Arc<dyn Fn(&Item) -> Value + Send + Sync> =
      Arc::new(value_selector);
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(GroupByObserver {
        observer,
        key_selector: key_selector.clone(),
        value_selector: value_selector.clone(),
        groups: Mutex::new(BTreeMap::new()),
      }))
    })
  }
}
