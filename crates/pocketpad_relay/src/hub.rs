//! Subscriber set for outbound delivery.
//!
//! The hub holds one [`ClientConnection`] per live connection. Broadcasting
//! walks the current set and queues a shared [`Frame`] on each connection
//! with `try_send`: a full or closed queue only costs that connection its
//! frame, never delays the others.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::{ClientConnection, ConnectionId};
use crate::error::RelayError;
use crate::messaging::Frame;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued on
    pub delivered: usize,
    /// Connections skipped because their queue was full or closed
    pub dropped: usize,
}

impl BroadcastReport {
    fn record(&mut self, result: &Result<(), RelayError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(_) => self.dropped += 1,
        }
    }
}

/// Connection subscriber set owned by the transport.
#[derive(Debug)]
pub struct Hub {
    connections: DashMap<ConnectionId, ClientConnection>,
    queue_capacity: usize,
    frames_dropped: AtomicU64,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            queue_capacity,
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Adds a connection and returns the receiver for its outbound frames.
    ///
    /// Subscribing an id twice replaces the earlier queue.
    pub fn subscribe(&self, id: ConnectionId) -> mpsc::Receiver<Frame> {
        let (connection, rx) = ClientConnection::new(id.clone(), self.queue_capacity);
        self.connections.insert(id, connection);
        rx
    }

    /// Removes a connection. Its queue closes once drained.
    pub fn unsubscribe(&self, id: &ConnectionId) -> Option<ClientConnection> {
        self.connections.remove(id).map(|(_, connection)| connection)
    }

    pub fn is_subscribed(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Total frames skipped since the hub was created.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|c| c.key().clone()).collect()
    }

    /// Queues `frame` on a single connection.
    pub fn send_to(&self, id: &ConnectionId, frame: Frame) -> Result<(), RelayError> {
        let result = match self.connections.get(id) {
            Some(connection) => connection.try_deliver(frame),
            None => Err(RelayError::UnknownConnection(id.clone())),
        };
        if let Err(e) = &result {
            self.note_drop(e);
        }
        result
    }

    /// Queues `frame` on every live connection, including the sender.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for connection in self.connections.iter() {
            let result = connection.try_deliver(frame.clone());
            if let Err(e) = &result {
                self.note_drop(e);
            }
            report.record(&result);
        }
        report
    }

    /// Queues `frame` on the given connections. Ids that are not live count
    /// as dropped.
    pub fn broadcast_to<'a, I>(&self, ids: I, frame: &Frame) -> BroadcastReport
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        let mut report = BroadcastReport::default();
        for id in ids {
            let result = self.send_to(id, frame.clone());
            report.record(&result);
        }
        report
    }

    fn note_drop(&self, error: &RelayError) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        debug!("Skipping outbound frame: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber_once() {
        let hub = Hub::new(8);
        let mut receivers: Vec<_> = ["a", "b", "c"].iter().map(|id| hub.subscribe(conn(id))).collect();

        let frame = Frame::new("controller-input", json!({"type": "AXIS"}));
        let report = hub.broadcast(&frame);
        assert_eq!(report, BroadcastReport { delivered: 3, dropped: 0 });

        for rx in receivers.iter_mut() {
            assert_eq!(rx.try_recv().unwrap(), frame);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_slow_subscriber_does_not_block_others() {
        let hub = Hub::new(1);
        let _slow = hub.subscribe(conn("slow"));
        let mut fast = hub.subscribe(conn("fast"));

        let first = Frame::new("ping", json!({"t": 1}));
        let second = Frame::new("ping", json!({"t": 2}));

        assert_eq!(hub.broadcast(&first).delivered, 2);
        assert_eq!(fast.try_recv().unwrap(), first);

        let report = hub.broadcast(&second);
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(fast.try_recv().unwrap(), second);
        assert_eq!(hub.frames_dropped(), 1);
    }

    #[test]
    fn test_closed_subscriber_is_skipped() {
        let hub = Hub::new(4);
        let closed = hub.subscribe(conn("gone"));
        let mut open = hub.subscribe(conn("here"));
        drop(closed);

        let report = hub.broadcast(&Frame::new("ping", json!({"t": 5})));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert!(open.try_recv().is_ok());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let hub = Hub::new(4);
        let mut rx = hub.subscribe(conn("a"));
        let removed = hub.unsubscribe(&conn("a")).unwrap();
        assert_eq!(removed.id, conn("a"));
        assert!(hub.unsubscribe(&conn("a")).is_none());
        assert!(!hub.is_subscribed(&conn("a")));

        assert_eq!(hub.broadcast(&Frame::new("ping", json!({}))).delivered, 0);
        // sender dropped with the connection
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }

    #[test]
    fn test_send_to_and_broadcast_to() {
        let hub = Hub::new(4);
        let mut a = hub.subscribe(conn("a"));
        let mut b = hub.subscribe(conn("b"));
        let frame = Frame::new("controller-input", json!({"player": 1}));

        assert!(hub.send_to(&conn("a"), frame.clone()).is_ok());
        assert!(matches!(
            hub.send_to(&conn("zzz"), frame.clone()),
            Err(RelayError::UnknownConnection(_))
        ));

        let targets = [conn("b"), conn("missing")];
        let report = hub.broadcast_to(targets.iter(), &frame);
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });

        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn test_per_subscriber_order_is_preserved() {
        let hub = Hub::new(64);
        let mut rx = hub.subscribe(conn("a"));
        for i in 0..32 {
            hub.broadcast(&Frame::new("controller-input", json!({"seq": i})));
        }
        for i in 0..32 {
            assert_eq!(*rx.try_recv().unwrap().payload, json!({"seq": i}));
        }
    }
}
