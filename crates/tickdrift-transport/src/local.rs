//! In-process network
//!
//! Delivers straight into the target machine's sink. Used for
//! single-process clusters and for tests; supports marking machines
//! unreachable to exercise the send-failure path.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use tickdrift_core::{Ack, ClockMessage, MachineId, SimError, SimResult};

use crate::{MessageSink, Transport};

/// Shared in-process network; wrap in `Arc` and hand one clone to each machine
#[derive(Default)]
pub struct LocalNetwork {
    sinks: RwLock<BTreeMap<MachineId, Arc<dyn MessageSink>>>,
    unreachable: RwLock<BTreeSet<MachineId>>,
    delivered: AtomicU64,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a machine's inbox. Done once per machine before any loop starts.
    pub fn register(&self, id: MachineId, sink: Arc<dyn MessageSink>) {
        self.sinks.write().insert(id, sink);
    }

    /// All registered ids except `id`, ascending
    pub fn peers_of(&self, id: MachineId) -> Vec<MachineId> {
        self.sinks
            .read()
            .keys()
            .copied()
            .filter(|peer| *peer != id)
            .collect()
    }

    /// Make sends to `id` fail until `heal` is called
    pub fn partition(&self, id: MachineId) {
        self.unreachable.write().insert(id);
    }

    pub fn heal(&self, id: MachineId) {
        self.unreachable.write().remove(&id);
    }

    /// Messages successfully delivered so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn deliver_to(&self, target: MachineId, message: ClockMessage) -> SimResult<Ack> {
        if self.unreachable.read().contains(&target) {
            return Err(SimError::ConnectionFailed(format!(
                "machine {} is partitioned",
                target
            )));
        }

        let sink = self
            .sinks
            .read()
            .get(&target)
            .cloned()
            .ok_or(SimError::UnknownPeer(target))?;

        sink.deliver(message);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(Ack::ok())
    }
}

impl Transport for LocalNetwork {
    fn send(
        &self,
        target: MachineId,
        message: ClockMessage,
    ) -> impl Future<Output = SimResult<Ack>> + Send {
        let result = self.deliver_to(target, message);
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tickdrift_core::MessageKind;

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<ClockMessage>>,
    }

    impl MessageSink for RecordingSink {
        fn deliver(&self, message: ClockMessage) {
            self.received.lock().push(message);
        }
    }

    fn message(clock: u64) -> ClockMessage {
        ClockMessage::new(MachineId(0), clock, 1.0, 0, MessageKind::Send)
    }

    #[tokio::test]
    async fn test_delivers_to_registered_sink() {
        let network = Arc::new(LocalNetwork::new());
        let sink = Arc::new(RecordingSink::default());
        network.register(MachineId(1), sink.clone());

        let ack = network.send(MachineId(1), message(4)).await.unwrap();
        assert_eq!(ack, Ack::ok());
        assert_eq!(sink.received.lock()[0].logical_clock, 4);
        assert_eq!(network.delivered(), 1);
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let network = LocalNetwork::new();
        assert!(matches!(
            network.send(MachineId(3), message(1)).await,
            Err(SimError::UnknownPeer(MachineId(3)))
        ));
    }

    #[tokio::test]
    async fn test_partition_and_heal() {
        let network = LocalNetwork::new();
        let sink = Arc::new(RecordingSink::default());
        network.register(MachineId(1), sink.clone());

        network.partition(MachineId(1));
        assert!(network.send(MachineId(1), message(1)).await.is_err());
        assert!(sink.received.lock().is_empty());

        network.heal(MachineId(1));
        assert!(network.send(MachineId(1), message(2)).await.is_ok());
        assert_eq!(sink.received.lock().len(), 1);
    }

    #[test]
    fn test_peers_exclude_self() {
        let network = LocalNetwork::new();
        for id in [2, 0, 1] {
            network.register(MachineId(id), Arc::new(RecordingSink::default()));
        }
        assert_eq!(network.peers_of(MachineId(1)), vec![MachineId(0), MachineId(2)]);
    }
}
