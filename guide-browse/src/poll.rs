//! Startup validation poll
//!
//! A freshly started server answers its root browse with nothing until its
//! index is ready. The startup poll re-queries the root on a fixed
//! interval until data appears, matching the service's own asynchronous
//! readiness signal. The interval, an optional attempt bound and the
//! cancellation handle are all explicit.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use guide_model::{DirectoryClass, DirectoryObject};

use crate::engine::{QueryEngine, ROOT};
use crate::error::{BrowseError, Result};

/// Parameters for [`wait_for_content`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between attempts. Default: 1 second.
    pub interval: Duration,
    /// Give up after this many empty attempts. Default: unbounded.
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Cooperative cancellation handle.
///
/// Cloned freely; `cancel()` from any thread wakes every waiter
/// immediately, so a polling loop stops within its current sleep rather
/// than after another query.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake all waiters.
    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner()) = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `timeout`, returning early with `true` if cancelled.
    fn wait(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

/// Poll the root container of `udn` until it returns content.
///
/// Returns the first non-empty root listing, `Cancelled` when the token is
/// signalled (checked before every query, and the inter-attempt sleep is
/// interrupted immediately), or `AttemptsExhausted` when the optional
/// bound runs out.
pub fn wait_for_content(
    engine: &QueryEngine,
    udn: &str,
    options: &PollOptions,
    cancel: &CancelToken,
) -> Result<Vec<DirectoryObject>> {
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(BrowseError::Cancelled);
        }

        let objects = engine.browse(udn, ROOT, DirectoryClass::Container, None);
        if !objects.is_empty() {
            tracing::info!(udn, attempts, "Server root has content");
            return Ok(objects);
        }

        attempts += 1;
        if let Some(max) = options.max_attempts {
            if attempts >= max {
                return Err(BrowseError::AttemptsExhausted(attempts));
            }
        }
        tracing::debug!(udn, attempts, "Root still empty, waiting");
        if cancel.wait(options.interval) {
            return Err(BrowseError::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::connected_engine;
    use guide_model::names;
    use guide_transport::Row;
    use std::time::Instant;

    #[test]
    fn test_returns_content_when_present() {
        let (engine, handle, _hub) = connected_engine();
        handle.directory().seed_container(
            "s1",
            ROOT,
            vec![Row::new()
                .with(names::ID, "0/Channels")
                .with(names::TITLE, "Channels")
                .with(names::CLASS, "object.container")],
        );

        let objects = wait_for_content(
            &engine,
            "s1",
            &PollOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(handle.directory().query_count(), 1);
    }

    #[test]
    fn test_attempt_bound() {
        let (engine, handle, _hub) = connected_engine();
        let options = PollOptions {
            interval: Duration::from_millis(5),
            max_attempts: Some(3),
        };

        let result = wait_for_content(&engine, "s1", &options, &CancelToken::new());
        assert!(matches!(result, Err(BrowseError::AttemptsExhausted(3))));
        assert_eq!(handle.directory().query_count(), 3);
    }

    #[test]
    fn test_cancel_interrupts_sleep_and_stops_querying() {
        let (engine, handle, _hub) = connected_engine();
        let options = PollOptions {
            interval: Duration::from_secs(5),
            max_attempts: None,
        };
        let cancel = CancelToken::new();

        let poll_cancel = cancel.clone();
        let poll_engine = Arc::clone(&engine);
        let poller = std::thread::spawn(move || {
            wait_for_content(&poll_engine, "s1", &options, &poll_cancel)
        });

        // Let the first query run, then cancel mid-sleep.
        crate::testutil::wait_until("first attempt", || handle.directory().query_count() == 1);
        let cancelled_at = Instant::now();
        cancel.cancel();

        let result = poller.join().unwrap();
        assert!(matches!(result, Err(BrowseError::Cancelled)));
        // Terminated well within the 5 s interval, with no further query.
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
        assert_eq!(handle.directory().query_count(), 1);
    }

    #[test]
    fn test_pre_cancelled_token_issues_no_query() {
        let (engine, handle, _hub) = connected_engine();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = wait_for_content(&engine, "s1", &PollOptions::default(), &cancel);
        assert!(matches!(result, Err(BrowseError::Cancelled)));
        assert_eq!(handle.directory().query_count(), 0);
    }
}
