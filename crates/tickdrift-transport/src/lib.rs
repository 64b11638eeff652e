//! tickdrift Transport Layer - moving ClockMessages between machines
//!
//! This crate provides:
//! - The `Transport` (outbound) and `MessageSink` (inbound) seams used by machines
//! - A TCP request/reply RPC carrying `SendMessage(ClockMessage) -> Ack`
//! - An in-process network for single-process runs and tests

use std::future::Future;
use std::sync::Arc;

use tickdrift_core::{Ack, ClockMessage, MachineId, SimResult};

pub mod codec;
pub mod tcp;
pub mod local;

pub use codec::*;
pub use tcp::*;
pub use local::*;

/// Outbound half: deliver a message to a peer and wait for its Ack.
///
/// The returned future completes only once the peer has acknowledged or the
/// call has failed; there is no fire-and-forget path.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        target: MachineId,
        message: ClockMessage,
    ) -> impl Future<Output = SimResult<Ack>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        target: MachineId,
        message: ClockMessage,
    ) -> impl Future<Output = SimResult<Ack>> + Send {
        (**self).send(target, message)
    }
}

/// Inbound half: called by the transport for every message that arrives.
/// Must not block and must not drop messages.
pub trait MessageSink: Send + Sync + 'static {
    fn deliver(&self, message: ClockMessage);
}
