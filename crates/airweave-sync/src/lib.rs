//! The sync orchestrator (spec §4.8, C10): wires a source, the action
//! resolver, chunking/embedding, and the action dispatcher into a bounded,
//! worker-pooled pipeline with cancellation and guaranteed cleanup.

pub mod batching;
pub mod cancellation;
pub mod orchestrator;
pub mod prepare;

pub use batching::BatchingConfig;
pub use cancellation::CancellationToken;
pub use orchestrator::{JobOutcome, SyncOrchestrator, SyncOutcome};
