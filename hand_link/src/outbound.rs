//! Bounded outbound publish buffer.
//!
//! Implements the core's [`Outbound`] capability on top of a bounded
//! channel. `enqueue` is `try_send`: it returns immediately, succeeding
//! with a message id or failing with `Full`/`Closed`. The session layer
//! owns the receiving end and drains it at transport pace; a slow or dead
//! link costs dropped telemetry, never a blocked producer task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use hand_core::telemetry::{MessageId, Outbound, OutboundError, PublishOptions};

/// One message waiting for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Id returned to the enqueuer.
    pub id: MessageId,
    /// Destination topic.
    pub topic: String,
    /// Serialized payload bytes.
    pub payload: Vec<u8>,
    /// Delivery options for the transport.
    pub options: PublishOptions,
}

/// Producer side of the outbound buffer.
pub struct OutboundBuffer {
    sender: SyncSender<OutboundFrame>,
    next_id: AtomicU64,
}

impl OutboundBuffer {
    /// Create a buffer of the given depth and return it with its drain end.
    pub fn with_depth(depth: usize) -> (Self, Receiver<OutboundFrame>) {
        let (sender, receiver) = sync_channel(depth);
        (
            Self {
                sender,
                next_id: AtomicU64::new(1),
            },
            receiver,
        )
    }
}

impl Outbound for OutboundBuffer {
    fn enqueue(
        &self,
        topic: &str,
        payload: &[u8],
        options: PublishOptions,
    ) -> Result<MessageId, OutboundError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let frame = OutboundFrame {
            id,
            topic: topic.to_string(),
            payload: payload.to_vec(),
            options,
        };
        match self.sender.try_send(frame) {
            Ok(()) => Ok(id),
            Err(TrySendError::Full(_)) => Err(OutboundError::Full),
            Err(TrySendError::Disconnected(_)) => Err(OutboundError::Closed),
        }
    }
}
