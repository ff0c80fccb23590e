use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::{Observer, ObserverRef};

struct CollectObserver<Item, C> {
  observer: ObserverRef<C>,
  collection: Mutex<Option<C>>,
  _marker: std::marker::PhantomData<fn(Item)>,
}

impl<Item, C> Observer<Item> for CollectObserver<Item, C>
where
  Item: 'static,
  C: Extend<Item> + Send + 'static,
{
  fn on_next(&self, value: Item) {
    let mut collection = self.collection.lock().unwrap();
    if let Some(collection) = collection.as_mut() {
      collection.extend(std::iter::once(value));
    }
  }

  fn on_completed(&self) {
    let collection = self.collection.lock().unwrap().take();
    if let Some(collection) = collection {
      self.observer.on_next(collection);
      self.observer.on_completed();
    }
  }

  fn on_error(&self, error: RxError) {
    self.collection.lock().unwrap().take();
    self.observer.on_error(error);
  }
}

impl<Item: 'static> Observable<Item> {
  /// Gathers the whole stream into one collection, emitted at upstream
  /// completion. Errors discard the partial collection.
  pub fn collect<C>(&self) -> Observable<C>
  where
    C: Default + Extend<Item> + Send + 'static,
  {
    let source = self.clone();
    Observable::create(move |observer| {
      source.subscribe_observer(Arc::new(CollectObserver {
        observer,
        collection: Mutex::new(Some(C::default())),
        _marker: std::marker::PhantomData,
      }))
    })
  }

  pub fn to_vec(&self) -> Observable<Vec<Item>>
  where
    Item: Send,
  {
    self.collect()
  }

  pub fn to_set(&self) -> Observable<BTreeSet<Item>>
  where
    Item: Ord + Send,
  {
    self.collect()
  }
}
