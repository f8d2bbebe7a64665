//! Cross-process rendezvous barrier.
//!
//! Each participant keeps a named lock open for the lifetime of its process;
//! that open handle is what peers observe as "present". While waiting, the
//! participant also holds the claim on its own lock and scans its peers under a
//! shared gate lock until every peer is present.
//!
//! All participants must begin waiting before any can be expected to finish:
//! presence only lasts as long as the participant's process, so a peer that
//! starts scanning after another process has passed *and exited* will never
//! see it.

mod config;
mod participant;
mod registry;

pub use config::{BarrierConfig, DEFAULT_GATE_LOCK_NAME, DEFAULT_POLL_INTERVAL};
pub use participant::{BarrierEvent, BarrierState, Participant};
pub use registry::BarrierRegistry;
