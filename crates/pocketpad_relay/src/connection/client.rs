//! Client connection representation.
//!
//! Each live connection owns the sending half of a bounded outbound queue.
//! The transport drains the receiving half into its socket.

use std::time::SystemTime;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::ConnectionId;
use crate::error::RelayError;
use crate::messaging::Frame;

/// Represents an individual client connection known to the relay.
#[derive(Debug)]
pub struct ClientConnection {
    /// Transport-assigned identifier
    pub id: ConnectionId,

    /// When this connection was established
    pub connected_at: SystemTime,

    outbound: mpsc::Sender<Frame>,
}

impl ClientConnection {
    /// Creates a connection with an outbound queue of `capacity` frames.
    ///
    /// Returns the receiver the transport must drain.
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id,
            connected_at: SystemTime::now(),
            outbound,
        };
        (connection, rx)
    }

    /// Queues a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Result<(), RelayError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull(self.id.clone()),
            TrySendError::Closed(_) => RelayError::UnknownConnection(self.id.clone()),
        })
    }
}
