//! Slot role management (spec §4.9, C11): list, fork, switch, and the
//! resync-from-source signal that precedes a fork.
//!
//! `switch` is the only operation with a cross-row invariant (at most one
//! ACTIVE slot), so it runs inside its own transaction rather than going
//! through `SyncStore`'s single-statement helpers.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::destination_slot::{DestinationSlot, SlotRole};
use airweave_common::error::{AirweaveError, Result};
use airweave_metadata::SyncStore;

pub struct Multiplexer<'a> {
    pool: &'a PgPool,
}

/// Returned by [`Multiplexer::resync_from_source`]: a request for the sync
/// orchestrator to run a full, cursor-skipping sync before the caller forks
/// a new slot from the refreshed archive. The multiplexer has no handle on
/// the orchestrator itself (that would invert the dependency direction), so
/// it only hands back the parameters that request needs.
#[derive(Debug, Clone, Copy)]
pub struct ResyncRequest {
    pub sync_id: Uuid,
    pub skip_cursor: bool,
}

impl<'a> Multiplexer<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, sync_id: Uuid) -> Result<Vec<DestinationSlot>> {
        let rows = SyncStore::new(self.pool).list_slots(sync_id).await?;
        let mut slots: Vec<DestinationSlot> = rows
            .into_iter()
            .map(|(connection_id, role, created_at)| DestinationSlot {
                role: SlotRole::parse(&role).unwrap_or(SlotRole::Deprecated),
                created_at,
                connection_id,
            })
            .collect();
        slots.sort();
        Ok(slots)
    }

    /// Adds a new SHADOW slot for `connection_id`. Idempotent: forking the
    /// same connection twice just leaves it SHADOW.
    pub async fn fork(&self, sync_id: Uuid, connection_id: Uuid) -> Result<()> {
        SyncStore::new(self.pool)
            .add_slot(sync_id, connection_id, SlotRole::Shadow.as_str())
            .await
    }

    /// Promotes `connection_id` to ACTIVE and demotes the previous ACTIVE
    /// (if any) to DEPRECATED, atomically. Succeeds with no demotion when
    /// there was no previous ACTIVE slot (spec §4.9).
    pub async fn switch(&self, sync_id: Uuid, connection_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let previous_active: Option<(Uuid,)> = sqlx::query_as(
            "SELECT connection_id FROM sync_connection WHERE sync_id = $1 AND role = 'ACTIVE'",
        )
        .bind(sync_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        if let Some((previous_id,)) = previous_active {
            if previous_id != connection_id {
                sqlx::query(
                    "UPDATE sync_connection SET role = 'DEPRECATED' WHERE sync_id = $1 AND connection_id = $2",
                )
                .bind(sync_id)
                .bind(previous_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO sync_connection (sync_id, connection_id, role, created_at)
            VALUES ($1, $2, 'ACTIVE', $3)
            ON CONFLICT (sync_id, connection_id) DO UPDATE SET role = 'ACTIVE'
            "#,
        )
        .bind(sync_id)
        .bind(connection_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    /// Spec §4.9: forking a new destination from the archive is usually
    /// preceded by refreshing that archive with a full sync. This just
    /// packages the request; the orchestrator (`airweave-sync`) runs it.
    pub fn resync_from_source(&self, sync_id: Uuid) -> ResyncRequest {
        ResyncRequest {
            sync_id,
            skip_cursor: true,
        }
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("multiplexer store error: {e}"))
}
