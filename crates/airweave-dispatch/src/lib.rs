//! Concurrent action dispatch to destinations, archive, and metadata store
//! (spec §4.7, C9).

pub mod archive_handler;
pub mod batch;
pub mod builder;
pub mod destination_handler;
pub mod dispatcher;
pub mod handler;
pub mod metadata_handler;

pub use archive_handler::ArchiveHandler;
pub use batch::{DispatchBatch, PreparedInsert, PreparedUpdate};
pub use builder::DispatcherBuilder;
pub use destination_handler::DestinationHandler;
pub use dispatcher::ActionDispatcher;
pub use handler::ActionHandler;
pub use metadata_handler::MetadataHandler;
