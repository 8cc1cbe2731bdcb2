//! The relational metadata store (spec §3, §6; component C4/part of the
//! action resolver's dependency). Postgres via `sqlx`, grounded on
//! `rootsignal-domains::entities::models::embedding.rs` for query shape and
//! `rootsignal-api::db::models::archive.rs` for multi-table store layout.

pub mod collection;
pub mod connection;
pub mod cursor;
pub mod entity;
pub mod pool;
pub mod rate_limit_config;
pub mod sync;

pub use collection::{CollectionRow, CollectionStore};
pub use connection::{ConnectionRow, ConnectionStore};
pub use cursor::CursorStore;
pub use entity::EntityStore;
pub use pool::connect_and_migrate;
pub use rate_limit_config::SourceRateLimitConfigStore;
pub use sync::{JobCounters, JobStatus, SyncJobRow, SyncJobStore, SyncRow, SyncStore};
