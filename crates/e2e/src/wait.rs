//! Bounded polling for eventually-consistent UI state
//!
//! Nothing in the page-objects sleeps blindly. Every wait is a check polled on
//! an interval schedule until it holds or the timeout expires, and expiry is
//! an error that names what was being waited for.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::error::{E2eError, E2eResult};

/// Playwright's own expect() schedule; the last interval repeats.
pub const DEFAULT_INTERVALS_MS: [u64; 4] = [100, 250, 500, 1000];

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub timeout: Duration,
    pub intervals: Vec<Duration>,
}

impl PollOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            intervals: DEFAULT_INTERVALS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    pub fn with_intervals(mut self, intervals: Vec<Duration>) -> Self {
        if !intervals.is_empty() {
            self.intervals = intervals;
        }
        self
    }

    fn interval(&self, attempt: usize) -> Duration {
        self.intervals
            .get(attempt)
            .or_else(|| self.intervals.last())
            .copied()
            .unwrap_or(Duration::from_millis(100))
    }
}

/// Poll `check` until it yields a value.
///
/// Absence errors from the check count as "not yet"; any other error is
/// returned immediately. The check runs one final time at the deadline.
pub async fn poll_for<T, F, Fut>(opts: &PollOptions, what: &str, mut check: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) if e.is_absence() => {
                trace!("poll '{}' attempt {}: {}", what, attempt, e);
            }
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= opts.timeout {
            return Err(E2eError::timeout(what, elapsed));
        }

        sleep(opts.interval(attempt).min(opts.timeout - elapsed)).await;
        attempt += 1;
    }
}

/// Poll a boolean check until it is true.
pub async fn poll_until<F, Fut>(opts: &PollOptions, what: &str, mut check: F) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    poll_for(opts, what, || {
        let fut = check();
        async move { fut.await.map(|ok| ok.then_some(())) }
    })
    .await
}

/// Debounce-settle: read, pause `delay`, read again, and accept only once two
/// consecutive reads agree.
pub async fn settle<T, F, Fut>(
    opts: &PollOptions,
    delay: Duration,
    what: &str,
    mut read: F,
) -> E2eResult<T>
where
    T: PartialEq + Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let start = Instant::now();
    let mut last = read().await?;

    loop {
        sleep(delay).await;
        let current = read().await?;
        if current == last {
            return Ok(current);
        }

        trace!("settle '{}': {:?} -> {:?}", what, last, current);
        if start.elapsed() >= opts.timeout {
            return Err(E2eError::timeout(
                format!("{} to stop changing", what),
                start.elapsed(),
            ));
        }
        last = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(timeout_ms: u64) -> PollOptions {
        PollOptions::new(Duration::from_millis(timeout_ms))
            .with_intervals(vec![Duration::from_millis(5)])
    }

    #[tokio::test]
    async fn test_poll_until_succeeds_after_retries() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        poll_until(&fast(500), "third call", move || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out_with_description() {
        let err = poll_until(&fast(30), "never", || async { Ok(false) })
            .await
            .unwrap_err();
        match err {
            E2eError::Timeout { what, waited } => {
                assert_eq!(what, "never");
                assert!(waited >= Duration::from_millis(30));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_absence_errors_keep_polling() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let value = poll_for(&fast(500), "element", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(E2eError::ElementNotFound("row".into()))
            } else {
                Ok(Some(7))
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_immediately() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let err = poll_for::<(), _, _>(&fast(500), "element", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(E2eError::BridgeClosed)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::BridgeClosed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settle_waits_for_two_equal_reads() {
        let reads = [3usize, 5, 8, 8];
        let idx = AtomicUsize::new(0);
        let idx = &idx;
        let reads = &reads;
        let count = settle(&fast(500), Duration::from_millis(1), "rows", move || async move {
            let i = idx.fetch_add(1, Ordering::SeqCst).min(reads.len() - 1);
            Ok(reads[i])
        })
        .await
        .unwrap();
        assert_eq!(count, 8);
        assert_eq!(idx.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_interval_schedule_repeats_last() {
        let opts = PollOptions::new(Duration::from_secs(1));
        assert_eq!(opts.interval(0), Duration::from_millis(100));
        assert_eq!(opts.interval(3), Duration::from_millis(1000));
        assert_eq!(opts.interval(10), Duration::from_millis(1000));
    }
}
