//! Outbound message channel.

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};

use super::OutboundMessage;

/// Sending half of the host channel.
///
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct Messenger {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Messenger {
    /// Wraps an existing sender.
    #[inline]
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Creates a messenger and the receiver the host reads from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Sends a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the host dropped the receiver.
    pub fn send(&self, message: OutboundMessage) -> Result<()> {
        trace!(kind = message.kind(), "Sending message");
        self.tx.send(message).map_err(|_| Error::ChannelClosed)
    }

    /// Returns `true` if the host dropped the receiver.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
