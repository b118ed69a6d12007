//! Process-wide request limiter
//!
//! One `RateLimiter` is created at start-up and shared by every fetch. It
//! bounds concurrent network requests, bounds concurrent cache file access
//! separately, and enforces a minimum interval between outgoing requests.

use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

/// Global concurrency and pacing limits for the remote source
pub struct RateLimiter {
    /// Bounds requests in flight
    requests: Semaphore,

    /// Bounds open cache files, independently of the network
    files: Semaphore,

    /// Minimum time between two outgoing requests
    min_interval: Duration,

    /// When the last request was released
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new limiter
    ///
    /// # Arguments
    ///
    /// * `max_requests` - Maximum concurrent network requests
    /// * `max_files` - Maximum concurrent cache reads/writes
    /// * `min_interval` - Pacing floor between requests
    pub fn new(max_requests: usize, max_files: usize, min_interval: Duration) -> Self {
        Self {
            requests: Semaphore::new(max_requests.max(1)),
            files: Semaphore::new(max_files.max(1)),
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// A limiter with no pacing, for tests and local sources
    pub fn unpaced(max_requests: usize) -> Self {
        Self::new(max_requests, 64, Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for a request slot
    ///
    /// Returns `None` only if the limiter has been closed.
    pub async fn acquire_request(&self) -> Option<SemaphorePermit<'_>> {
        self.requests.acquire().await.ok()
    }

    /// Waits for a cache file slot
    pub async fn acquire_file(&self) -> Option<SemaphorePermit<'_>> {
        self.files.acquire().await.ok()
    }

    /// Sleeps until the pacing floor allows another request
    ///
    /// The timestamp lock is held across the sleep, so concurrent callers
    /// queue behind each other and none can slip under the floor.
    pub async fn pace(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::trace!("Pacing: sleeping {:?} before next request", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pace_enforces_interval() {
        let limiter = RateLimiter::new(4, 4, Duration::from_millis(40));
        let start = Instant::now();

        limiter.pace().await;
        limiter.pace().await;
        limiter.pace().await;

        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(8, 8, Duration::from_millis(30)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.pace().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // First call is free, the other three each wait one interval
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_unpaced_does_not_sleep() {
        let limiter = RateLimiter::unpaced(2);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_request_permits_are_bounded() {
        let limiter = RateLimiter::new(1, 1, Duration::ZERO);
        let first = limiter.acquire_request().await;
        assert!(first.is_some());

        let second = tokio::time::timeout(Duration::from_millis(20), limiter.acquire_request()).await;
        assert!(second.is_err());

        drop(first);
        assert!(limiter.acquire_request().await.is_some());
    }
}
