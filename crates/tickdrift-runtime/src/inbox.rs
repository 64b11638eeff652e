//! Inbound message queue
//!
//! Unbounded FIFO with many producers (transport handlers) and a single
//! consumer (the owning machine's loop). Consumers poll; nothing blocks
//! waiting for a message.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use tickdrift_core::ClockMessage;
use tickdrift_transport::MessageSink;

type Queue = Arc<Mutex<VecDeque<ClockMessage>>>;

/// Consumer side, owned by exactly one machine
#[derive(Default)]
pub struct Inbox {
    queue: Queue,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer handle for transports and tests
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Dequeue the oldest message, `None` when empty
    pub fn pop(&mut self) -> Option<ClockMessage> {
        self.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Producer side. Cheap to clone; never blocks beyond the queue lock.
#[derive(Clone)]
pub struct InboxSender {
    queue: Queue,
}

impl InboxSender {
    pub fn push(&self, message: ClockMessage) {
        self.queue.lock().push_back(message);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl MessageSink for InboxSender {
    fn deliver(&self, message: ClockMessage) {
        self.push(message);
    }
}
