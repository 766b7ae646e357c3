//! Lifecycle notifications and the observer registration seam.

mod event;
mod notifier;

pub use event::{StreamKind, TaskEvent};
pub use notifier::{Notifier, SubscriptionId, TaskObserver};
