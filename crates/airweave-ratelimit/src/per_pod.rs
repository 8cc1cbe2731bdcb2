//! Per-process sliding window for calls to shared third-party AI/text
//! processing APIs (spec §4.1 gate 3, §5): one organization's sync should
//! not be able to monopolize a pod's whole share of a rate-limited API.
//!
//! Unlike the Redis-backed limiters, this waits synchronously (spec §5:
//! "paces rather than fails") up to its own acquire timeout, which is
//! hour-scale rather than request-scale.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use airweave_common::error::{AirweaveError, Result};

pub struct PerPodLimiter {
    limit: usize,
    window: Duration,
    acquire_timeout: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl PerPodLimiter {
    pub fn new(limit: usize, window: Duration, acquire_timeout: Duration) -> Self {
        Self {
            limit,
            window,
            acquire_timeout,
            calls: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Singleton-shaped default for a shared embedding API: 60 calls/second
    /// per pod, willing to pace a caller for up to an hour before failing.
    pub fn for_shared_api(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(1), Duration::from_secs(3600))
    }

    /// Blocks (cooperatively) until a slot is free or `acquire_timeout`
    /// elapses, in which case it returns `ProviderTransient` so the caller's
    /// existing retry/backoff path handles it like any other transient
    /// upstream failure.
    pub async fn acquire(&self) -> Result<()> {
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            let wait = {
                let mut calls = self.calls.lock();
                let now = Instant::now();
                while let Some(&front) = calls.front() {
                    if now.duration_since(front) >= self.window {
                        calls.pop_front();
                    } else {
                        break;
                    }
                }

                if calls.len() < self.limit {
                    calls.push_back(now);
                    return Ok(());
                }

                let oldest = *calls.front().expect("len >= limit > 0 implies non-empty");
                self.window.saturating_sub(now.duration_since(oldest))
            };

            if Instant::now() + wait > deadline {
                return Err(AirweaveError::ProviderTransient(
                    "per-pod rate limit acquire timed out".into(),
                ));
            }

            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_limit_immediately() {
        let limiter = PerPodLimiter::new(3, Duration::from_millis(50), Duration::from_secs(1));
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
    }

    #[tokio::test]
    async fn paces_rather_than_rejecting_within_window() {
        let limiter = PerPodLimiter::new(1, Duration::from_millis(30), Duration::from_secs(1));
        limiter.acquire().await.unwrap();
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
