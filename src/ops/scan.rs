use std::sync::{Arc, Mutex};

use crate::error::RxError;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::producer::{produce, Sink};
use crate::util;

struct ScanObserver<Item, Acc> {
  sink: Arc<Sink<Acc>>,
  accumulator: Arc<dyn Fn(Acc, Item) -> Acc + Send + Sync>,
  seed: Acc,
  accumulation: Mutex<Option<Acc>>,
}

impl<Item, Acc> Observer<Item> for ScanObserver<Item, Acc>
where
  Item: 'static,
  Acc: Clone + Send + Sync + 'static,
{
  fn on_next(&self, value: Item) {
    let outcome = {
      let mut accumulation = self.accumulation.lock().unwrap();
      let acc = accumulation.take().unwrap_or_else(|| self.seed.clone());
      match util::guard(|| (*self.accumulator)(acc, value)) {
        Ok(next) => {
          *accumulation = Some(next.clone());
          Ok(next)
        }
        Err(error) => Err(error),
      }
    };
    match outcome {
      Ok(next) => self.sink.on_next(next),
      Err(error) => self.sink.on_error(error),
    }
  }

  fn on_completed(&self) {
    // an upstream that never produced a value still surfaces the seed
    let flush = {
      let accumulation = self.accumulation.lock().unwrap();
      if accumulation.is_none() {
        Some(self.seed.clone())
      } else {
        None
      }
    };
    if let Some(seed) = flush {
      self.sink.on_next(seed);
    }
    self.sink.on_completed();
  }

  fn on_error(&self, error: RxError) {
    self.sink.on_error(error);
  }
}

struct Scan1Observer<Item> {
  sink: Arc<Sink<Item>>,
  accumulator: Arc<dyn Fn(Item, Item) -> Item + Send + Sync>,
  accumulation: Mutex<Option<Item>>,
}

impl<Item> Observer<Item> for Scan1Observer<Item>
where
  Item: Clone + Send + 'static,
{
  fn on_next(&self, value: Item) {
    let outcome = {
      let mut accumulation = self.accumulation.lock().unwrap();
      match accumulation.take() {
        None => {
          // the first value only primes the accumulator
          *accumulation = Some(value);
          None
        }
        Some(acc) => match util::guard(|| (*self.accumulator)(acc, value)) {
          Ok(next) => {
            *accumulation = Some(next.clone());
            Some(Ok(next))
          }
          Err(error) => Some(Err(error)),
        },
      }
    };
    match outcome {
      Some(Ok(next)) => self.sink.on_next(next),
      Some(Err(error)) => self.sink.on_error(error),
      None => {}
    }
  }

  fn on_completed(&self) {
    self.sink.on_completed();
  }

  fn on_error(&self, error: RxError) {
    self.sink.on_error(error);
  }
}

impl<Item: 'static> Observable<Item> {
  /// Running accumulation with an explicit seed: emits the accumulator
  /// value after every upstream value; an empty upstream emits the seed
  /// before completing.
  pub fn scan<Acc>(
    &self,
    seed: Acc,
    accumulator: impl Fn(Acc, Item) -> Acc + Send + Sync + 'static,
  ) -> Observable<Acc>
  where
    Acc: Clone + Send + Sync + 'static,
  {
    let source = self.clone();
    let accumulator: Arc<dyn Fn(Acc, Item) -> Acc + Send + Sync> =
      Arc::new(accumulator);
    produce(move |sink| {
      source.subscribe_observer(Arc::new(ScanObserver {
        sink,
        accumulator: accumulator.clone(),
        seed: seed.clone(),
        accumulation: Mutex::new(None),
      }))
    })
  }

  /// Seedless accumulation: the first value primes the accumulator
  /// without being emitted; emission starts with the second value. An
  /// empty upstream completes silently.
  pub fn scan1(
    &self,
    accumulator: impl Fn(Item, Item) -> Item + Send + Sync + 'static,
  ) -> Observable<Item>
  where
    Item: Clone + Send + 'static,
  {
    let source = self.clone();
    let accumulator: Arc<dyn Fn(Item, Item) -> Item + Send + Sync> =
      Arc::new(accumulator);
    produce(move |sink| {
      source.subscribe_observer(Arc::new(Scan1Observer {
        sink,
        accumulator: accumulator.clone(),
        accumulation: Mutex::new(None),
      }))
    })
  }
}
