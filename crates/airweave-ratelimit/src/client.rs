//! Client-facing rate limiter, keyed by organization (spec §4.1 gate 1).

use redis::aio::ConnectionManager;
use uuid::Uuid;

use airweave_common::error::{AirweaveError, Result};

use crate::sliding_window::check_and_record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingPlan {
    Developer,
    Pro,
    Team,
    Enterprise,
}

impl BillingPlan {
    /// Requests per second. `None` means unlimited (Enterprise).
    pub fn limit(self) -> Option<u32> {
        match self {
            BillingPlan::Developer => Some(10),
            BillingPlan::Pro => Some(25),
            BillingPlan::Team => Some(50),
            BillingPlan::Enterprise => None,
        }
    }
}

const WINDOW_SECS: u64 = 1;

pub struct ClientLimiter {
    enabled: bool,
}

impl ClientLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub async fn check(
        &self,
        conn: &mut ConnectionManager,
        organization_id: Uuid,
        plan: BillingPlan,
        now_secs: f64,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let Some(limit) = plan.limit() else {
            return Ok(());
        };

        let key = format!("rate_limit:org:{organization_id}");
        let status = check_and_record(conn, &key, limit, WINDOW_SECS, now_secs).await;

        if !status.allowed {
            return Err(AirweaveError::RateLimitExceeded {
                retry_after: status.retry_after,
                limit: status.limit,
                remaining: status.remaining,
            });
        }
        Ok(())
    }
}
