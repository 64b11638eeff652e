//! tickdrift Runtime - Machine actors and their orchestration
//!
//! Each machine runs one event loop per tick:
//! 1. Sleep for the tick period
//! 2. Stop if the stop signal is set
//! 3. Receive one queued message, if any
//! 4. Otherwise draw an action: send to one peer, send to all peers, or
//!    an internal step
//!
//! Every clock transition is followed by exactly one event log record.

pub mod config;
pub mod inbox;
pub mod event_log;
pub mod scheduler;
pub mod machine;
pub mod cluster;
pub mod telemetry;

pub use config::*;
pub use inbox::*;
pub use event_log::*;
pub use scheduler::*;
pub use machine::*;
pub use cluster::*;
pub use telemetry::*;
