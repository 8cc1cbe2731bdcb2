//! The per-sync archive manifest (spec §3 Archive (ARF) layout, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub sync_id: Uuid,
    pub source_short_name: String,
    pub collection_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub jobs: Vec<JobSummary>,
}

impl Manifest {
    pub fn new(sync_id: Uuid, source_short_name: impl Into<String>, collection_id: Uuid) -> Self {
        Self {
            sync_id,
            source_short_name: source_short_name.into(),
            collection_id,
            created_at: Utc::now(),
            jobs: Vec::new(),
        }
    }

    pub fn record_job(&mut self, job_id: Uuid) {
        self.jobs.push(JobSummary {
            job_id,
            started_at: Utc::now(),
        });
    }
}
