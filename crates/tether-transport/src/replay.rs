//! Replay cache: bounded per-endpoint backlog of frames that could not be
//! sent while disconnected.
//!
//! The cap is hard. A queue holding `capacity` frames rejects the next one.

use std::collections::{HashMap, VecDeque};

use metrics::counter;
use tether_core::{LogicalEndpoint, PhysicalAddress};
use tether_settings::ReplaySettings;
use tracing::{debug, warn};

use crate::connection::ConnectionRegistry;
use crate::errors::{Result, TransportError};
use crate::identity::IdentityResolver;

/// Outcome of a [`ReplayCache::flush`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Frames handed to the socket.
    pub sent: usize,
    /// Frames that could not be sent and went back on the queue.
    pub requeued: usize,
}

/// Per-endpoint FIFO queues of deferred frames.
#[derive(Debug)]
pub struct ReplayCache {
    capacity: usize,
    queues: HashMap<LogicalEndpoint, VecDeque<String>>,
}

impl ReplayCache {
    /// Create an empty cache.
    pub fn new(settings: &ReplaySettings) -> Self {
        Self {
            capacity: settings.capacity,
            queues: HashMap::new(),
        }
    }

    /// Per-endpoint capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `message` to the endpoint's backlog.
    ///
    /// Returns `false` and drops the message when the backlog is full.
    pub fn enqueue(&mut self, endpoint: &LogicalEndpoint, message: String) -> bool {
        let queue = self.queues.entry(endpoint.clone()).or_default();
        if queue.len() >= self.capacity {
            counter!("tether_replay_dropped_total").increment(1);
            warn!(
                %endpoint,
                capacity = self.capacity,
                "replay backlog full, dropping message"
            );
            return false;
        }
        queue.push_back(message);
        counter!("tether_replay_enqueued_total").increment(1);
        debug!(%endpoint, pending = queue.len(), "message deferred");
        true
    }

    /// Send the backlog of whichever endpoint `address` serves.
    ///
    /// The backlog is snapshotted and cleared first. Entries that fail to send
    /// are appended after anything queued in the meantime, in their original
    /// order.
    pub fn flush(
        &mut self,
        address: &PhysicalAddress,
        identity: &IdentityResolver,
        connections: &mut ConnectionRegistry,
    ) -> Result<FlushReport> {
        if !connections.contains(address) {
            return Err(TransportError::UnknownAddress {
                address: address.clone(),
            });
        }
        let Some(endpoint) = identity.endpoint_of(address) else {
            debug!(%address, "no endpoint bound, nothing to replay");
            return Ok(FlushReport::default());
        };
        let snapshot = match self.queues.get_mut(endpoint) {
            Some(queue) if !queue.is_empty() => std::mem::take(queue),
            _ => return Ok(FlushReport::default()),
        };

        let mut report = FlushReport::default();
        let mut failed = Vec::new();
        for message in snapshot {
            if matches!(connections.send(address, &message), Ok(true)) {
                report.sent += 1;
            } else {
                failed.push(message);
            }
        }

        if !failed.is_empty() {
            report.requeued = failed.len();
            self.queues
                .entry(endpoint.clone())
                .or_default()
                .extend(failed);
            warn!(%endpoint, requeued = report.requeued, "replay interrupted, requeued");
        }
        debug!(%endpoint, sent = report.sent, "replay flushed");
        Ok(report)
    }

    /// Number of frames waiting for `endpoint`.
    pub fn pending(&self, endpoint: &LogicalEndpoint) -> usize {
        self.queues.get(endpoint).map_or(0, VecDeque::len)
    }

    /// Drop the backlog for `endpoint`, returning how many frames were lost.
    pub fn clear(&mut self, endpoint: &LogicalEndpoint) -> usize {
        self.queues.remove(endpoint).map_or(0, |q| q.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSocketFactory;
    use proptest::prelude::*;
    use tether_core::logging::capture_logs;
    use tracing::Level;

    struct Fixture {
        cache: ReplayCache,
        identity: IdentityResolver,
        connections: ConnectionRegistry,
        factory: MockSocketFactory,
        endpoint: LogicalEndpoint,
        address: PhysicalAddress,
    }

    fn fixture(capacity: usize) -> Fixture {
        let factory = MockSocketFactory::new();
        let mut connections = ConnectionRegistry::new(Box::new(factory.clone()));
        let endpoint = LogicalEndpoint::from("E");
        let address = PhysicalAddress::from("ws://localhost/api");
        let _ = connections.initialize(&address);
        let mut identity = IdentityResolver::new();
        let _ = identity.bind(endpoint.clone(), address.clone());
        Fixture {
            cache: ReplayCache::new(&ReplaySettings { capacity }),
            identity,
            connections,
            factory,
            endpoint,
            address,
        }
    }

    impl Fixture {
        fn flush(&mut self) -> FlushReport {
            self.cache
                .flush(&self.address, &self.identity, &mut self.connections)
                .unwrap()
        }
    }

    // ── enqueue ─────────────────────────────────────────────────────

    #[test]
    fn capacity_is_a_hard_cap() {
        let mut f = fixture(100);
        let (logs, _guard) = capture_logs();
        for n in 0..101 {
            let accepted = f.cache.enqueue(&f.endpoint, format!("m{n}"));
            assert_eq!(accepted, n < 100, "enqueue {n}");
        }
        assert_eq!(f.cache.pending(&f.endpoint), 100);
        assert!(logs.has_event(Level::WARN, "replay backlog full"));
    }

    #[test]
    fn queues_are_per_endpoint() {
        let mut f = fixture(1);
        let other = LogicalEndpoint::from("F");
        assert!(f.cache.enqueue(&f.endpoint, "a".into()));
        assert!(f.cache.enqueue(&other, "b".into()));
        assert!(!f.cache.enqueue(&f.endpoint, "c".into()));
        assert_eq!(f.cache.pending(&other), 1);
    }

    // ── flush ───────────────────────────────────────────────────────

    #[test]
    fn flush_sends_in_order_when_open() {
        let mut f = fixture(100);
        for n in 0..101 {
            let _ = f.cache.enqueue(&f.endpoint, format!("m{n}"));
        }
        f.connections.mark_open(&f.address).unwrap();

        let report = f.flush();
        assert_eq!(report, FlushReport { sent: 100, requeued: 0 });
        let expected: Vec<String> = (0..100).map(|n| format!("m{n}")).collect();
        assert_eq!(f.factory.sent(&f.address), expected);
        assert_eq!(f.cache.pending(&f.endpoint), 0);
    }

    #[test]
    fn flush_while_closed_requeues_everything() {
        let mut f = fixture(10);
        let _ = f.cache.enqueue(&f.endpoint, "a".into());
        let _ = f.cache.enqueue(&f.endpoint, "b".into());

        let report = f.flush();
        assert_eq!(report, FlushReport { sent: 0, requeued: 2 });
        assert_eq!(f.cache.pending(&f.endpoint), 2);
        assert!(f.factory.sent(&f.address).is_empty());

        f.connections.mark_open(&f.address).unwrap();
        let report = f.flush();
        assert_eq!(report.sent, 2);
        assert_eq!(f.factory.sent(&f.address), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn flush_with_nothing_pending() {
        let mut f = fixture(10);
        f.connections.mark_open(&f.address).unwrap();
        assert_eq!(f.flush(), FlushReport::default());
    }

    #[test]
    fn flush_unbound_address_is_empty() {
        let mut f = fixture(10);
        let _ = f.cache.enqueue(&f.endpoint, "a".into());
        let _ = f.identity.unbind(&f.endpoint);
        assert_eq!(f.flush(), FlushReport::default());
        assert_eq!(f.cache.pending(&f.endpoint), 1);
    }

    #[test]
    fn flush_unknown_address_fails_fast() {
        let mut f = fixture(10);
        let stranger = PhysicalAddress::from("ws://nowhere");
        assert!(matches!(
            f.cache.flush(&stranger, &f.identity, &mut f.connections),
            Err(TransportError::UnknownAddress { .. })
        ));
    }

    #[test]
    fn clear_reports_lost_frames() {
        let mut f = fixture(10);
        let _ = f.cache.enqueue(&f.endpoint, "a".into());
        assert_eq!(f.cache.clear(&f.endpoint), 1);
        assert_eq!(f.cache.clear(&f.endpoint), 0);
    }

    // ── properties ──────────────────────────────────────────────────

    proptest! {
        #[test]
        fn flush_delivers_accepted_prefix_exactly_once(
            capacity in 1usize..20,
            count in 0usize..40,
        ) {
            let mut f = fixture(capacity);
            for n in 0..count {
                let _ = f.cache.enqueue(&f.endpoint, n.to_string());
            }
            f.connections.mark_open(&f.address).unwrap();
            let report = f.flush();
            let _ = f.flush();

            let expected: Vec<String> = (0..count.min(capacity)).map(|n| n.to_string()).collect();
            prop_assert_eq!(report.sent, expected.len());
            prop_assert_eq!(f.factory.sent(&f.address), expected);
        }
    }
}
