//! Notification delivery errors. These never leave the broadcaster.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("subscriber {0} is closed")]
    Closed(u64),

    #[error("delivery to subscriber {id} failed: {message}")]
    Delivery { id: u64, message: String },
}
