//! Composition operators. Each operator lives in its own module and is
//! exposed as a method on [`Observable`](crate::observable::Observable);
//! `merge` and `to_async` are also plain functions.

pub mod collect;
pub mod debounce;
pub mod delay;
pub mod distinct_until_changed;
pub mod filter;
pub mod group_by;
pub mod limit_window;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod observe_on_dispatcher;
pub mod scan;
pub mod skip;
pub mod skip_until;
pub mod subscribe_on;
pub mod take;
pub mod take_until;
pub mod to_async;

pub use group_by::GroupedObservable;
pub use merge::merge;
pub use to_async::{to_async, to_async_on};
