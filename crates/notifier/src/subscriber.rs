//! Subscriber abstraction and the channel-backed implementation.

use tokio::sync::mpsc;

use crate::NotifyError;

/// Identifier handed out by the broadcaster on subscribe.
pub type SubscriberId = u64;

/// A live observer, e.g. one websocket session.
pub trait Subscriber: Send + Sync {
    /// Whether the subscriber can still receive messages.
    fn is_open(&self) -> bool;

    /// Deliver one encoded notification.
    fn send(&self, id: SubscriberId, message: &str) -> Result<(), NotifyError>;
}

/// Forwards encoded notifications into an unbounded tokio channel.
///
/// Dropping the receiver closes the subscriber; the broadcaster removes it on
/// the next broadcast.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, id: SubscriberId, message: &str) -> Result<(), NotifyError> {
        self.tx
            .send(message.to_owned())
            .map_err(|_| NotifyError::Closed(id))
    }
}
