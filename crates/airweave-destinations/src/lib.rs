//! The destination adapter contract (spec §4.5, C6): a pgvector-backed
//! implementation plus an in-process one used by archive-only/replay-only
//! sync presets and tests.

pub mod destination;
pub mod memory;
pub mod pgvector_destination;
pub mod registry;

pub use destination::{
    Destination, ProcessingRequirement, RawRecord, SearchHit, SearchRequest, SearchStrategy,
    SparseVector, TemporalConfig, VectorRecord,
};
pub use memory::InMemoryDestination;
pub use pgvector_destination::PgVectorDestination;
pub use registry::DestinationRegistry;
