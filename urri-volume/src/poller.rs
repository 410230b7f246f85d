//! Recurring poll task
//!
//! Owns the one scheduled poll for an accessory. The task waits one refresh
//! interval, polls, and waits again, so poll latency adds to the interval.
//! [`Poller::poll_now`] cancels the pending wait and polls immediately.
//! Dropping the poller aborts the task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::SyncEngine;
use crate::error::{AccessoryError, Result};

/// Handle to the background poll loop
#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    task_handle: Option<JoinHandle<()>>,
    shutdown_signal: Arc<AtomicBool>,
    wake: Arc<Notify>,
    poll_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

impl Poller {
    /// Spawn the poll loop; must be called inside a tokio runtime
    pub fn start(engine: Arc<SyncEngine>, interval: Duration) -> Self {
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let poll_count = Arc::new(AtomicU64::new(0));
        let error_count = Arc::new(AtomicU64::new(0));

        let task_handle = tokio::spawn(Self::polling_loop(
            engine,
            interval,
            Arc::clone(&shutdown_signal),
            Arc::clone(&wake),
            Arc::clone(&poll_count),
            Arc::clone(&error_count),
        ));

        Self {
            interval,
            task_handle: Some(task_handle),
            shutdown_signal,
            wake,
            poll_count,
            error_count,
        }
    }

    async fn polling_loop(
        engine: Arc<SyncEngine>,
        interval: Duration,
        shutdown_signal: Arc<AtomicBool>,
        wake: Arc<Notify>,
        poll_count: Arc<AtomicU64>,
        error_count: Arc<AtomicU64>,
    ) {
        debug!(?interval, "starting poll loop");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wake.notified() => debug!("poll requested early"),
            }

            if shutdown_signal.load(Ordering::Relaxed) {
                break;
            }

            poll_count.fetch_add(1, Ordering::Relaxed);
            if engine.poll().await.is_err() {
                error_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        debug!("poll loop ended");
    }

    /// Drop the pending wait and poll right away
    ///
    /// If a poll is in progress, the next one starts as soon as it finishes.
    pub fn poll_now(&self) {
        self.wake.notify_one();
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of polls started so far
    pub fn poll_count(&self) -> u64 {
        self.poll_count.load(Ordering::Relaxed)
    }

    /// Number of polls that failed
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the loop and wait for the task to finish
    ///
    /// A poll whose request is still outstanding is abandoned.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown_signal.store(true, Ordering::Relaxed);

        let Some(task_handle) = self.task_handle.take() else {
            return Ok(());
        };
        task_handle.abort();

        match task_handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(AccessoryError::PollTask(e.to_string())),
        }

        info!(polls = self.poll_count(), "poller stopped");
        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        if let Some(task_handle) = self.task_handle.take() {
            task_handle.abort();
        }
    }
}
