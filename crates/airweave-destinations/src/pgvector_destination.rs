//! A Postgres/pgvector-backed destination. Query shapes are adapted
//! directly from `rootsignal-domains::entities::models::embedding.rs`:
//! `ON CONFLICT ... DO UPDATE` upsert, `<=>` cosine-distance ordering for
//! search, bind-parameterized `query`/`query_as`.

use async_trait::async_trait;
use pgvector::Vector;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

use crate::destination::{
    Destination, ProcessingRequirement, RawRecord, SearchHit, SearchRequest, VectorRecord,
};

pub struct PgVectorDestination {
    pool: PgPool,
    table: &'static str,
}

impl PgVectorDestination {
    /// `table` must already exist with a pgvector column named `embedding`;
    /// creating/attaching the physical collection is the factory's job
    /// (spec §4.5) and is out of scope for this adapter, which only issues
    /// DML against a table it's handed.
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self { pool, table }
    }

    fn db_err(e: sqlx::Error) -> AirweaveError {
        AirweaveError::SyncFailure(format!("destination store error: {e}"))
    }
}

#[async_trait]
impl Destination for PgVectorDestination {
    fn processing_requirement(&self) -> ProcessingRequirement {
        ProcessingRequirement::ChunksAndEmbeddings
    }

    fn has_keyword_index(&self) -> bool {
        false
    }

    async fn bulk_insert(&self, records: &[VectorRecord]) -> Result<()> {
        for record in records {
            let embedding = Vector::from(record.dense.clone());
            sqlx::query(&format!(
                r#"
                INSERT INTO {table} (id, parent_id, sync_id, collection_id, embedding, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET
                    embedding = EXCLUDED.embedding,
                    payload = EXCLUDED.payload
                "#,
                table = self.table
            ))
            .bind(record.id)
            .bind(record.parent_id)
            .bind(record.sync_id)
            .bind(record.collection_id)
            .bind(&embedding)
            .bind(&record.payload)
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;
        }
        Ok(())
    }

    async fn bulk_insert_raw(&self, _records: &[RawRecord]) -> Result<()> {
        Err(AirweaveError::Validation(
            "pgvector destination requires chunked, embedded entities".into(),
        ))
    }

    async fn bulk_delete(&self, entity_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE sync_id = $1 AND id = ANY($2)",
            self.table
        ))
        .bind(sync_id)
        .bind(entity_ids)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn bulk_delete_by_parent_ids(&self, parent_ids: &[Uuid], sync_id: Uuid) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE sync_id = $1 AND parent_id = ANY($2)",
            self.table
        ))
        .bind(sync_id)
        .bind(parent_ids)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn delete_by_sync_id(&self, sync_id: Uuid) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE sync_id = $1", self.table))
            .bind(sync_id)
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn delete_by_collection_id(&self, collection_id: Uuid) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE collection_id = $1",
            self.table
        ))
        .bind(collection_id)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let Some(dense) = request.dense else {
            return Err(AirweaveError::Validation(
                "pgvector destination requires a dense query vector".into(),
            ));
        };
        let embedding = Vector::from(dense);

        let rows: Vec<(Uuid, f64, Value)> = sqlx::query_as(&format!(
            r#"
            SELECT id, (embedding <=> $1) as distance, payload
            FROM {table}
            WHERE collection_id = $2
            ORDER BY embedding <=> $1
            LIMIT $3 OFFSET $4
            "#,
            table = self.table
        ))
        .bind(&embedding)
        .bind(request.collection_id)
        .bind(request.limit as i64)
        .bind(request.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(rows
            .into_iter()
            .map(|(entity_id, distance, payload)| SearchHit {
                entity_id,
                score: (1.0 - distance) as f32,
                payload,
            })
            .collect())
    }
}
