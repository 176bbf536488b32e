//! Kubernetes controller runtime
//!
//! Supplies the watch/reflect/reconcile machinery used by the operator's
//! controllers: see the [`controller`], [`reflector`], [`watcher`],
//! [`scheduler`] and [`finalizer`] modules.

pub mod cache;
pub mod controller;
pub mod coordination;
pub mod events;
pub mod finalizer;
pub mod indexer;
pub mod lease;
mod lock;
pub mod metrics;
pub mod observer;
pub mod predicate;
pub mod raw_json;
pub mod reflector;
pub mod scheduler;
pub mod utils;
pub mod watcher;

pub use controller::{applier, Action, Context, Controller};
pub use reflector::reflector;
pub use scheduler::scheduler;
pub use watcher::watcher;
