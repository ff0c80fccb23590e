use std::sync::Arc;

use crate::disposable::Disposable;
use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};
use crate::subject::{Subject, SubjectLike};

/// A plain subject that additionally carries the key it multicasts for.
/// `group_by` feeds one of these per distinct key.
pub struct GroupedSubject<Key, Item> {
  key: Key,
  subject: Subject<Item>,
}

impl<Key: Clone, Item> Clone for GroupedSubject<Key, Item> {
  fn clone(&self) -> Self {
    GroupedSubject {
      key: self.key.clone(),
      subject: self.subject.clone(),
    }
  }
}

impl<Key, Item> GroupedSubject<Key, Item> {
  pub fn new(key: Key) -> Self {
    GroupedSubject {
      key,
      subject: Subject::new(),
    }
  }

  pub fn key(&self) -> &Key {
    &self.key
  }
}

impl<Key, Item: 'static> GroupedSubject<Key, Item> {
  pub fn subscribe_observer(&self, observer: ObserverRef<Item>) -> Disposable {
    self.subject.subscribe_observer(observer)
  }

  pub fn as_observable(&self) -> Observable<Item> {
    self.subject.as_observable()
  }
}

impl<Key, Item> Observer<Item> for GroupedSubject<Key, Item>
where
  Key: Send + Sync,
  Item: Clone + 'static,
{
  fn on_next(&self, value: Item) {
    self.subject.on_next(value);
  }

  fn on_completed(&self) {
    self.subject.on_completed();
  }

  fn on_error(&self, error: RxError) {
    self.subject.on_error(error);
  }
}

impl<Key, Item> SubjectLike<Item> for GroupedSubject<Key, Item>
where
  Key: Clone + Send + Sync + 'static,
  Item: Clone + Send + 'static,
{
  fn as_observer(&self) -> ObserverRef<Item> {
    Arc::new(self.clone())
  }

  fn as_observable(&self) -> Observable<Item> {
    GroupedSubject::as_observable(self)
  }
}

#[cfg(test)]
mod test {
  use std::sync::Mutex;

  use super::*;

  #[test]
  fn carries_its_key_and_multicasts() {
    let group = GroupedSubject::<&str, i32>::new("evens");
    assert_eq!(*group.key(), "evens");
    let values = Arc::new(Mutex::new(Vec::new()));
    let v = values.clone();
    group
      .as_observable()
      .subscribe(move |value| v.lock().unwrap().push(value));
    group.on_next(2);
    group.on_next(4);
    group.on_completed();
    group.on_next(6);
    assert_eq!(*values.lock().unwrap(), vec![2, 4]);
  }
}
