//! Rate-limited HTTP client wrapper injected into every source adapter
//! (spec §4.4, §6). Grounded on the `reqwest::Client` field + rate-limit
//! sleep in `rootsignal-domains::scraping::adapters::http::HttpIngestor`,
//! replacing the fixed sleep with the real source limiter so a tripped
//! limit surfaces as the same pseudo-429 a real upstream 429 would.

use std::sync::Arc;

use airweave_common::error::{AirweaveError, Result};
use airweave_ratelimit::{SourceLimiter, SourceLimiterScope, SourceRateLimitConfig};
use redis::aio::ConnectionManager;
use uuid::Uuid;

/// Wraps a plain `reqwest::Client`, checking the source rate limiter before
/// every request. Adapters never talk to `reqwest` directly so they cannot
/// bypass the limiter.
pub struct RateLimitedHttpClient {
    inner: reqwest::Client,
    redis: ConnectionManager,
    limiter: Arc<SourceLimiter>,
    organization_id: Uuid,
    source_short_name: String,
    scope: SourceLimiterScope,
    config: SourceRateLimitConfig,
}

impl RateLimitedHttpClient {
    pub fn new(
        inner: reqwest::Client,
        redis: ConnectionManager,
        limiter: Arc<SourceLimiter>,
        organization_id: Uuid,
        source_short_name: impl Into<String>,
        scope: SourceLimiterScope,
        config: SourceRateLimitConfig,
    ) -> Self {
        Self {
            inner,
            redis,
            limiter,
            organization_id,
            source_short_name: source_short_name.into(),
            scope,
            config,
        }
    }

    async fn gate(&mut self) -> Result<()> {
        let now_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock is after epoch")
            .as_secs_f64();

        self.limiter
            .check(
                &mut self.redis,
                self.organization_id,
                &self.source_short_name,
                self.scope,
                self.config,
                now_secs,
            )
            .await
    }

    pub async fn get(&mut self, url: &str) -> Result<reqwest::Response> {
        self.gate().await?;
        self.inner.get(url).send().await.map_err(map_reqwest_err)
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&mut self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(1.0);
            return Err(AirweaveError::as_http_429(retry_after));
        }
        if !status.is_success() {
            return Err(AirweaveError::ProviderTransient(format!(
                "GET {url} returned {status}"
            )));
        }
        response.json::<T>().await.map_err(map_reqwest_err)
    }
}

fn map_reqwest_err(e: reqwest::Error) -> AirweaveError {
    if e.is_timeout() || e.is_connect() {
        AirweaveError::ProviderTransient(e.to_string())
    } else {
        AirweaveError::ProviderPermanent(e.to_string())
    }
}
