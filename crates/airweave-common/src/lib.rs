//! Shared types for the Airweave ingestion core: the entity model (C3), the
//! error taxonomy (spec §7), sync configuration, and destination slot roles.
//!
//! Every other crate in the workspace depends on this one; it depends on
//! nothing workspace-local.

pub mod destination_slot;
pub mod entity;
pub mod error;
pub mod stored_entity;
pub mod sync_config;

pub use destination_slot::{DestinationSlot, SlotRole};
pub use entity::{
    content_hash, Breadcrumb, ChunkEntity, CodeFileEntity, DeletionSignal, Entity, EntityCommon,
    EntityKey, EmailEntity, EmailHeaders, FileEntity,
};
pub use error::{AirweaveError, Result};
pub use stored_entity::StoredEntityRecord;
pub use sync_config::{BehaviorConfig, CursorConfig, DestinationsConfig, HandlersConfig, SyncConfig};
