//! The `collection` table: a logical index with an immutable vector size and
//! embedding model (spec §3 Collection).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub vector_size: i32,
    pub embedding_model_name: String,
    pub created_at: DateTime<Utc>,
}

pub struct CollectionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        vector_size: i32,
        embedding_model_name: &str,
    ) -> Result<CollectionRow> {
        sqlx::query_as::<_, CollectionRow>(
            r#"
            INSERT INTO collection (id, organization_id, name, vector_size, embedding_model_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(vector_size)
        .bind(embedding_model_name)
        .fetch_one(self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<CollectionRow>> {
        sqlx::query_as::<_, CollectionRow>("SELECT * FROM collection WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> AirweaveError {
    AirweaveError::SyncFailure(format!("collection store error: {e}"))
}
