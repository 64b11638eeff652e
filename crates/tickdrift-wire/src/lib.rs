//! tickdrift Wire Protocol - Binary frame format
//!
//! This crate implements the wire format for the RPC protocol:
//! - Fixed header (8 bytes: version, kind, reserved, body length)
//! - SendMessage request body (ClockMessage)
//! - Ack reply body

pub mod header;
pub mod envelope;

pub use header::*;
pub use envelope::*;
