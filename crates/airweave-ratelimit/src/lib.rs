//! Rate limiting (spec §4.1): three independent gates — client-facing,
//! source-facing, and per-pod — each grounded on a distinct part of
//! `examples/original_source/backend/airweave/core/rate_limiter_service.py`
//! and composed rather than unified, since they fail differently (the first
//! two fail open on Redis errors and reject over-limit callers; the third
//! paces callers in-process and never talks to Redis at all).

pub mod client;
pub mod per_pod;
pub mod sliding_window;
pub mod source;

pub use client::{BillingPlan, ClientLimiter};
pub use per_pod::PerPodLimiter;
pub use sliding_window::{check_and_record, WindowStatus};
pub use source::{SourceLimiter, SourceLimiterScope, SourceRateLimitConfig};
