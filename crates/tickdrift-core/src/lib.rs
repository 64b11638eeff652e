//! tickdrift Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every tickdrift crate:
//! - Machine identity (MachineId)
//! - The RPC message schema (ClockMessage, Ack)
//! - Event kinds and the per-machine log record format
//! - The error type used across the workspace

pub mod id;
pub mod message;
pub mod record;
pub mod error;

pub use id::*;
pub use message::*;
pub use record::*;
pub use error::*;
