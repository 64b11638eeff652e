//! tickdrift Clock Engine - Logical time for simulated machines
//!
//! This crate implements:
//! - The Lamport clock update rules (send, receive, internal)
//! - Tick rates that set each machine's processing speed
//! - Drift statistics describing how far receives pull a clock forward

pub mod lamport;
pub mod rate;
pub mod drift;

pub use lamport::*;
pub use rate::*;
pub use drift::*;
