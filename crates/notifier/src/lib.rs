//! `notifier` crate: live lifecycle notifications.
//!
//! The engine only sees the [`Notifier`] capability. [`Broadcaster`] is the
//! fan-out implementation: a mutex-guarded set of subscribers that is safe
//! to share between concurrent runs. Delivery is best effort and never
//! reports failure back to the caller.

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod subscriber;

pub use broadcaster::{Broadcaster, NoopNotifier, Notifier};
pub use error::NotifyError;
pub use event::{EventType, Notification};
pub use subscriber::{ChannelSubscriber, Subscriber, SubscriberId};
