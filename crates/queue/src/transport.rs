//! Queue transport: the channel between submitters and workers.
//!
//! The transport carries only an ephemeral `(id, name, payload)` reference;
//! the record store remains the source of truth. Delivery is at-least-once:
//! a delivery that is received but never acknowledged (consumer dropped it,
//! worker panicked) goes back on the queue and will be handed to another
//! consumer. Consumers must therefore deduplicate by job id.
//!
//! Ordering is roughly FIFO; no strict ordering is guaranteed across
//! concurrent producers.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jobrelay_core::JobId;

/// One pending unit of work as carried by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub job_id: JobId,
    pub name: String,
    pub payload: serde_json::Value,
}

/// Transport-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The transport no longer accepts publishes.
    #[error("transport closed")]
    Closed,
    #[error("transport internal error: {0}")]
    Internal(String),
}

/// Failure while waiting for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveError {
    /// Nothing arrived within the timeout; the consumer may retry.
    #[error("receive timed out")]
    Timeout,
    /// The transport is closed and fully drained.
    #[error("transport closed")]
    Closed,
}

/// Queue transport abstraction.
///
/// `publish` returns once the delivery is accepted by the queue, not once it
/// has executed. `consume` hands out an independent consumer; concurrent
/// consumers share the queue (each delivery goes to exactly one of them,
/// redeliveries aside).
pub trait QueueTransport: Send + Sync {
    fn publish(&self, delivery: Delivery) -> Result<(), TransportError>;

    fn consume(&self) -> Consumer;
}

impl<T> QueueTransport for Arc<T>
where
    T: QueueTransport + ?Sized,
{
    fn publish(&self, delivery: Delivery) -> Result<(), TransportError> {
        (**self).publish(delivery)
    }

    fn consume(&self) -> Consumer {
        (**self).consume()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Delivery>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl Shared {
    fn requeue(&self, delivery: Delivery) {
        if let Ok(mut state) = self.state.lock() {
            // Redeliveries go to the front so an interrupted job is retried
            // before newer work.
            state.ready.push_front(delivery);
            self.available.notify_one();
        }
    }
}

/// A delivery handed to a consumer, pending acknowledgment.
///
/// Dropping it without calling [`ReceivedDelivery::ack`] puts the delivery
/// back on the queue (at-least-once semantics).
#[derive(Debug)]
pub struct ReceivedDelivery {
    delivery: Delivery,
    acked: bool,
    shared: Arc<Shared>,
}

impl ReceivedDelivery {
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Acknowledge completion; the delivery will not be redelivered.
    pub fn ack(mut self) {
        self.acked = true;
    }
}

impl Drop for ReceivedDelivery {
    fn drop(&mut self) {
        if !self.acked {
            self.shared.requeue(self.delivery.clone());
        }
    }
}

/// Blocking pull handle over the queue.
///
/// Restartable: a new consumer can be created at any time and picks up from
/// the shared queue.
#[derive(Debug)]
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Block until a delivery is available or the transport is drained and
    /// closed.
    pub fn recv(&self) -> Result<ReceivedDelivery, ReceiveError> {
        loop {
            match self.recv_timeout(Duration::from_secs(1)) {
                Err(ReceiveError::Timeout) => continue,
                other => return other,
            }
        }
    }

    /// Block for up to `timeout` waiting for a delivery.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ReceivedDelivery, ReceiveError> {
        let mut state = self.shared.state.lock().map_err(|_| ReceiveError::Closed)?;

        loop {
            if let Some(delivery) = state.ready.pop_front() {
                return Ok(ReceivedDelivery {
                    delivery,
                    acked: false,
                    shared: self.shared.clone(),
                });
            }
            if state.closed {
                return Err(ReceiveError::Closed);
            }

            let (next, wait) = self
                .shared
                .available
                .wait_timeout(state, timeout)
                .map_err(|_| ReceiveError::Closed)?;
            state = next;

            if wait.timed_out() && state.ready.is_empty() {
                return Err(if state.closed {
                    ReceiveError::Closed
                } else {
                    ReceiveError::Timeout
                });
            }
        }
    }
}

/// In-memory queue transport.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    shared: Arc<Shared>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Stop accepting publishes. Consumers drain what is queued, then see
    /// `ReceiveError::Closed`.
    pub fn close(&self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.closed = true;
        }
        self.shared.available.notify_all();
    }

    /// Number of deliveries currently waiting for a consumer.
    pub fn depth(&self) -> usize {
        self.shared
            .state
            .lock()
            .map(|s| s.ready.len())
            .unwrap_or(0)
    }
}

impl QueueTransport for InMemoryTransport {
    fn publish(&self, delivery: Delivery) -> Result<(), TransportError> {
        let mut state = self
            .shared
            .state
            .lock()
            .map_err(|e| TransportError::Internal(e.to_string()))?;
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.ready.push_back(delivery);
        self.shared.available.notify_one();
        Ok(())
    }

    fn consume(&self) -> Consumer {
        Consumer {
            shared: self.shared.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(name: &str) -> Delivery {
        Delivery {
            job_id: JobId::new(),
            name: name.to_string(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn publish_then_consume_is_fifo() {
        let transport = InMemoryTransport::new();
        transport.publish(delivery("a")).unwrap();
        transport.publish(delivery("b")).unwrap();

        let consumer = transport.consume();
        let first = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(first.delivery().name, "a");
        first.ack();

        let second = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(second.delivery().name, "b");
        second.ack();
    }

    #[test]
    fn empty_queue_times_out() {
        let transport = InMemoryTransport::new();
        let consumer = transport.consume();
        assert_eq!(
            consumer
                .recv_timeout(Duration::from_millis(20))
                .map(|_| ())
                .unwrap_err(),
            ReceiveError::Timeout
        );
    }

    #[test]
    fn unacked_delivery_is_redelivered() {
        let transport = InMemoryTransport::new();
        transport.publish(delivery("a")).unwrap();

        let consumer = transport.consume();
        let received = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
        let id = received.delivery().job_id;
        drop(received); // consumer "crashed" before acking

        let again = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(again.delivery().job_id, id);
        again.ack();

        // Acked for good this time.
        assert_eq!(transport.depth(), 0);
        assert_eq!(
            consumer
                .recv_timeout(Duration::from_millis(20))
                .map(|_| ())
                .unwrap_err(),
            ReceiveError::Timeout
        );
    }

    #[test]
    fn panicking_consumer_thread_requeues() {
        let transport = InMemoryTransport::arc();
        transport.publish(delivery("a")).unwrap();

        let worker = {
            let transport = transport.clone();
            std::thread::spawn(move || {
                let consumer = transport.consume();
                let _received = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
                panic!("worker died mid-execution");
            })
        };
        assert!(worker.join().is_err());

        let consumer = transport.consume();
        let recovered = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(recovered.delivery().name, "a");
        recovered.ack();
    }

    #[test]
    fn close_rejects_publish_and_drains_consumers() {
        let transport = InMemoryTransport::new();
        transport.publish(delivery("a")).unwrap();
        transport.close();

        assert!(matches!(
            transport.publish(delivery("b")),
            Err(TransportError::Closed)
        ));

        let consumer = transport.consume();
        let last = consumer.recv().unwrap();
        assert_eq!(last.delivery().name, "a");
        last.ack();

        assert_eq!(consumer.recv().map(|_| ()).unwrap_err(), ReceiveError::Closed);
    }

    #[test]
    fn deliveries_are_shared_not_broadcast() {
        let transport = InMemoryTransport::new();
        for i in 0..4 {
            transport.publish(delivery(&format!("t{i}"))).unwrap();
        }

        let a = transport.consume();
        let b = transport.consume();

        let mut seen = Vec::new();
        for consumer in [&a, &b, &a, &b] {
            let received = consumer.recv_timeout(Duration::from_millis(100)).unwrap();
            seen.push(received.delivery().name.clone());
            received.ack();
        }

        seen.sort();
        assert_eq!(seen, vec!["t0", "t1", "t2", "t3"]);
    }
}
