//! The sliding-window algorithm shared by the client and source limiters
//! (spec §4.1): a Redis sorted set keyed by caller, scored by Unix epoch
//! seconds. Grounded on
//! `examples/original_source/backend/airweave/core/rate_limiter_service.py`,
//! translated from a Redis pipeline (`zremrangebyscore` + `zcount`) into a
//! `redis::pipe()` transaction so trim-and-count is atomic with respect to
//! other callers, as spec §4.1 requires.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Outcome of a sliding-window check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after: f64,
}

/// Checks and (if allowed) records a call against `key` in a sliding window
/// of `window_secs` seconds, admitting at most `limit` calls.
///
/// On any Redis error, fails open: the call reports `allowed = true`. Per
/// spec §4.1 this applies to both the client and the source limiter — the
/// source limiter's fail-open is safe because a real upstream 429 is the
/// final backstop.
pub async fn check_and_record(
    conn: &mut ConnectionManager,
    key: &str,
    limit: u32,
    window_secs: u64,
    now: f64,
) -> WindowStatus {
    match try_check_and_record(conn, key, limit, window_secs, now).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, key, "redis error during rate limit check; failing open");
            WindowStatus {
                allowed: true,
                limit,
                remaining: limit,
                retry_after: 0.0,
            }
        }
    }
}

async fn try_check_and_record(
    conn: &mut ConnectionManager,
    key: &str,
    limit: u32,
    window_secs: u64,
    now: f64,
) -> redis::RedisResult<WindowStatus> {
    let window_start = now - window_secs as f64;

    // Trim expired entries and count survivors atomically.
    let (_removed, count): (i64, i64) = redis::pipe()
        .atomic()
        .zrembyscore(key, 0, window_start)
        .zcount(key, window_start, now)
        .query_async(conn)
        .await?;

    if count >= limit as i64 {
        let oldest: Vec<(String, f64)> = conn.zrange_withscores(key, 0, 0).await?;
        let retry_after = oldest
            .first()
            .map(|(_, score)| (*score + window_secs as f64 - now).max(0.1))
            .unwrap_or(window_secs as f64);

        return Ok(WindowStatus {
            allowed: false,
            limit,
            remaining: 0,
            retry_after,
        });
    }

    // Member must be unique per call or concurrent same-second calls collide
    // in the ZSET; a monotonic-ish float score plus itself as the member
    // keeps ties apart without needing a random suffix.
    let member = format!("{now:.6}");
    let mut pipe = redis::pipe();
    pipe.atomic()
        .zadd(key, &member, now)
        .expire(key, (window_secs * 2) as i64);
    pipe.query_async::<()>(conn).await?;

    Ok(WindowStatus {
        allowed: true,
        limit,
        remaining: (limit as i64 - count - 1).max(0) as u32,
        retry_after: 0.0,
    })
}
