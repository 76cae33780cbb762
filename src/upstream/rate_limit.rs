//! Sliding-window admission for quota-constrained upstreams.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Per-upstream sliding-window rate limiter.
///
/// Each named upstream gets an independent window of admission timestamps.
/// The window check counts entries strictly newer than `now - window`; an
/// entry whose age equals the window length has already left it. Two tasks
/// can observe the same free slot at window-boundary granularity, which is
/// fine: the ceiling is enforced per admission decision, and the upstream
/// quota has slack.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests: max_requests as usize,
            window,
        }
    }

    /// Admit one call against `upstream`'s window.
    ///
    /// Suspends until a slot frees if the window is full; never rejects.
    /// The admission timestamp is recorded here, before the caller issues
    /// the network call.
    pub async fn acquire(&self, upstream: &str) {
        loop {
            let wait = {
                let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
                let window = windows.entry(upstream.to_string()).or_default();
                let now = Instant::now();

                while window
                    .front()
                    .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
                {
                    window.pop_front();
                }

                if window.len() < self.max_requests {
                    window.push_back(now);
                    None
                } else {
                    // Oldest entry exits the window at oldest + window.
                    let oldest = window[0];
                    Some(self.window.saturating_sub(now.saturating_duration_since(oldest)))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    tracing::debug!(upstream, delay_ms = delay.as_millis() as u64, "rate limit deferral");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Count of admissions currently inside `upstream`'s window.
    pub fn in_window(&self, upstream: &str) -> usize {
        let windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        windows
            .get(upstream)
            .map(|w| {
                w.iter()
                    .filter(|t| now.saturating_duration_since(**t) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_ceiling_without_delay() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1000));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("idx").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window("idx"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn third_call_waits_a_full_window() {
        // ceiling=2 per 1000ms; five back-to-back calls.
        let limiter = RateLimiter::new(2, Duration::from_millis(1000));
        let mut admissions = Vec::new();
        for _ in 0..5 {
            limiter.acquire("idx").await;
            admissions.push(Instant::now());
        }
        assert!(admissions[2] - admissions[0] >= Duration::from_millis(1000));
        assert!(admissions[4] - admissions[2] >= Duration::from_millis(1000));
        // All five were eventually admitted.
        assert_eq!(admissions.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn window_count_never_exceeds_ceiling() {
        let limiter = RateLimiter::new(4, Duration::from_millis(500));
        for _ in 0..20 {
            limiter.acquire("idx").await;
            assert!(limiter.in_window("idx") <= 4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn upstreams_have_independent_windows() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1000));
        let start = Instant::now();
        limiter.acquire("drugs").await;
        limiter.acquire("documents").await;
        // Second upstream was not throttled by the first's window.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_frees_exactly_when_oldest_leaves() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1000));
        limiter.acquire("idx").await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let before = Instant::now();
        limiter.acquire("idx").await;
        // Waited the remaining 600ms, not a fresh full window.
        assert_eq!(Instant::now() - before, Duration::from_millis(600));
    }
}
