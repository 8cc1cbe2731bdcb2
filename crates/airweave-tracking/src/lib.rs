//! Per-type counters and Redis pubsub progress snapshots (spec §4.11, C13).

pub mod publisher;
pub mod tracker;

pub use publisher::{FinalStatus, StatePublisher};
pub use tracker::{Action, Stats, Tracker};
