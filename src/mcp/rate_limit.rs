use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RateLimitResult {
    Allowed { remaining: u32 },
    RateLimited { retry_after: Duration },
}

/// Admits at most `max_per_window` calls per client key in any rolling
/// 60-second window.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    seen: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub(crate) fn per_minute(max_per_window: u32) -> Self {
        Self {
            max_per_window,
            window: WINDOW,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut map = self.seen.lock().await;
        let hits = map.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_per_window as usize {
            let retry_after = hits
                .front()
                .map(|first| self.window.saturating_sub(now.duration_since(*first)))
                .unwrap_or(self.window);
            return RateLimitResult::RateLimited { retry_after };
        }

        hits.push_back(now);
        let remaining = self.max_per_window - hits.len() as u32;

        // Keys whose window has drained are dropped so the map only holds active clients.
        map.retain(|_, v| {
            v.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
        RateLimitResult::Allowed { remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sixth_call_in_window_is_rejected_per_key() {
        let limiter = RateLimiter::per_minute(5);
        for i in 0..5 {
            assert_eq!(
                limiter.check("client-a").await,
                RateLimitResult::Allowed { remaining: 4 - i }
            );
        }
        assert!(matches!(
            limiter.check("client-a").await,
            RateLimitResult::RateLimited { .. }
        ));
        assert!(matches!(
            limiter.check("client-b").await,
            RateLimitResult::Allowed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn window_rolls_forward() {
        let limiter = RateLimiter::per_minute(2);
        limiter.check("k").await;
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check("k").await;

        match limiter.check("k").await {
            RateLimitResult::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(
            limiter.check("k").await,
            RateLimitResult::Allowed { remaining: 0 }
        );
    }
}
