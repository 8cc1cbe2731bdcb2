//! Shared error taxonomy (spec §7).
//!
//! Every crate in the workspace that returns a typed error converts into or
//! wraps `AirweaveError` at its public boundary. Internal trace data (e.g. a
//! raw `sqlx::Error`) is logged via `tracing` at the point it's captured and
//! never rendered into the message a caller sees beyond `kind()` + `message()`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AirweaveError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limit exceeded: retry after {retry_after:.2}s ({remaining}/{limit} remaining)")]
    RateLimitExceeded {
        retry_after: f64,
        limit: u32,
        remaining: u32,
    },

    #[error("source rate limit exceeded: retry after {retry_after:.2}s")]
    SourceRateLimitExceeded { retry_after: f64 },

    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    #[error("permanent provider error: {0}")]
    ProviderPermanent(String),

    #[error("sync failure: {0}")]
    SyncFailure(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] std::io::Error),
}

impl AirweaveError {
    /// Stable, machine-readable kind string for the HTTP/API boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::SourceRateLimitExceeded { .. } => "source_rate_limit_exceeded",
            Self::ProviderTransient(_) => "provider_transient",
            Self::ProviderPermanent(_) => "provider_permanent",
            Self::SyncFailure(_) => "sync_failure",
            Self::Cancelled => "cancelled",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Per spec §4.1: source-side 429s are converted to this shape at the
    /// HTTP client wrapper boundary so adapters see one rate-limit code path
    /// whether the limiter tripped internally or the upstream API returned a
    /// real 429.
    pub fn as_http_429(retry_after: f64) -> Self {
        Self::SourceRateLimitExceeded { retry_after }
    }
}

pub type Result<T> = std::result::Result<T, AirweaveError>;
