//! Background Expiry Sweeper
//!
//! This module implements a background task that periodically scans the store
//! for expired entries and removes them. This is called "active expiry" as
//! opposed to "lazy expiry" (which hides expired entries on read).
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry is cheap but never frees anything: a key set with a timeout
//! and never read again would stay in memory forever.
//!
//! ## Design
//!
//! Every store owns exactly one sweeper, running as a Tokio task:
//! 1. Runs a sweep under the write lock, bounded by a small time budget
//! 2. Sleeps for a fixed interval (default: 1s)
//! 3. Repeats until the store is closed or dropped
//!
//! A sweep that runs out of budget stops early. The entries it didn't reach
//! are picked up by a later run and stay invisible to readers meanwhile.

use crate::context::{CancelHandle, Context};
use crate::storage::engine::StoreInner;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Pause between the end of one sweep and the start of the next (default: 1s)
    pub interval: Duration,

    /// Time a single sweep may hold the write lock before deferring (default: 1ms)
    pub budget: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            budget: Duration::from_millis(1),
        }
    }
}

impl ExpiryConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pause between sweeps.
    ///
    /// # Example
    ///
    /// ```
    /// use memkv::ExpiryConfig;
    /// use std::time::Duration;
    ///
    /// let config = ExpiryConfig::default()
    ///     .with_interval(Duration::from_millis(250))
    ///     .with_budget(Duration::from_micros(500));
    /// assert_eq!(config.interval, Duration::from_millis(250));
    /// ```
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the per-sweep time budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

/// A handle to a running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub(crate) struct ExpirySweeper {
    cancel: CancelHandle,
}

impl ExpirySweeper {
    /// Starts the sweeper for `inner` as a background task on `runtime`.
    pub(crate) fn start(runtime: &Handle, inner: Arc<StoreInner>, config: ExpiryConfig) -> Self {
        let (ctx, cancel) = Context::with_cancel();

        info!(
            interval_ms = config.interval.as_millis(),
            budget_us = config.budget.as_micros(),
            "Background expiry sweeper started"
        );
        runtime.spawn(sweeper_loop(inner, config, ctx));

        Self { cancel }
    }

    /// Stops the sweeper without waiting for it to exit.
    ///
    /// Returns `false` if it was already stopped.
    pub(crate) fn stop(&self) -> bool {
        let stopped = self.cancel.cancel();
        if stopped {
            info!("Background expiry sweeper stopped");
        }
        stopped
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(inner: Arc<StoreInner>, config: ExpiryConfig, ctx: Context) {
    loop {
        if ctx.is_done() {
            debug!("Expiry sweeper received shutdown signal");
            return;
        }

        let run = ctx.with_timeout(config.budget);
        let reclaimed = inner.sweep(&run);
        if reclaimed > 0 {
            debug!(reclaimed, "Expired entries reclaimed");
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = ctx.done() => {
                debug!("Expiry sweeper received shutdown signal");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::clock::{Clock, SystemClock};
    use crate::Store;

    fn fast_config() -> ExpiryConfig {
        ExpiryConfig::default()
            .with_interval(Duration::from_millis(10))
            .with_budget(Duration::from_millis(50))
    }

    #[test]
    fn test_default_config() {
        let config = ExpiryConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.budget, Duration::from_millis(1));
        assert_eq!(ExpiryConfig::new(), config);
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let store = Store::with_config(fast_config());
        let ctx = Context::background();

        // Add some keys with short TTL
        for i in 0..10 {
            store
                .set_with_timeout(&ctx, format!("key{}", i), "value", Duration::from_millis(20))
                .unwrap();
        }

        // Add a persistent key
        store.set(&ctx, "persistent", "value").unwrap();

        // Wait for keys to expire and be cleaned up
        tokio::time::sleep(Duration::from_millis(200)).await;

        for i in 0..10 {
            assert!(!store.is_resident(&format!("key{}", i)));
        }
        assert!(store.is_resident("persistent"));
        assert!(store.stats().reclaimed >= 10);
    }

    #[tokio::test]
    async fn test_reclaims_within_one_interval() {
        let store = Store::new();
        let ctx = Context::background();

        store
            .set_with_timeout(&ctx, "key", "wazzup", Duration::from_nanos(1))
            .unwrap();
        std::thread::sleep(Duration::from_micros(10));

        // Expired, hidden from readers, but not yet reclaimed.
        assert!(store.is_resident("key"));
        assert!(!store.contains(&ctx, "key").unwrap());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!store.is_resident("key"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_close() {
        let store = Store::with_config(fast_config());
        let ctx = Context::background();

        store.close().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        store
            .set_with_timeout(&ctx, "key", "value", Duration::from_millis(10))
            .unwrap();

        // Keys should NOT be cleaned up since the sweeper is stopped
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_resident("key"));

        // ...but lazy expiry still hides them
        assert!(!store.contains(&ctx, "key").unwrap());
    }

    #[tokio::test]
    async fn test_sweeper_task_exits_on_drop() {
        let inner = Arc::new(StoreInner::new(Arc::new(SystemClock) as Arc<dyn Clock>));

        {
            let _sweeper = ExpirySweeper::start(&Handle::current(), Arc::clone(&inner), fast_config());
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert_eq!(Arc::strong_count(&inner), 2);
            // Sweeper is dropped here
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Arc::strong_count(&inner), 1);
    }

    #[tokio::test]
    async fn test_stop_reports_first_call_only() {
        let inner = Arc::new(StoreInner::new(Arc::new(SystemClock) as Arc<dyn Clock>));
        let sweeper = ExpirySweeper::start(&Handle::current(), inner, fast_config());

        assert!(!sweeper.is_stopped());
        assert!(sweeper.stop());
        assert!(!sweeper.stop());
        assert!(sweeper.is_stopped());
    }
}
