// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window start-rate gate.
//!
//! A gate hands out at most `limit` permits per window. A background task
//! owned by the gate overwrites the pool back to `limit` on every window
//! boundary, whether or not the operations holding earlier permits have
//! finished. Releasing a permit only updates the in-flight count; it never
//! returns quota to the pool, so the gate caps how many operations *start*
//! per window rather than how many run at once.

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::metrics::GateMetrics;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Point-in-time view of a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateSnapshot {
    /// Permits per window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Permits left in the current window
    pub available: u32,
    /// Permits held and not yet released
    pub in_flight: usize,
    /// Window resets performed since construction
    pub resets: u64,
    /// Whether the reset loop has been stopped
    pub is_shutdown: bool,
}

/// Permits left in the current window.
#[derive(Debug)]
struct Pool {
    available: u32,
}

struct GateInner {
    limit: u32,
    window: Duration,
    /// Grants and resets both happen under this lock.
    pool: Mutex<Pool>,
    /// Woken on every reset and on shutdown.
    reset_notify: Notify,
    in_flight: AtomicUsize,
    resets: AtomicU64,
    shutdown: CancellationToken,
    metrics: Option<GateMetrics>,
}

impl GateInner {
    fn pool(&self) -> MutexGuard<'_, Pool> {
        // The pool is a plain counter; a panic elsewhere cannot leave it torn.
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take one permit from the current window, if any is left.
    fn take(&self) -> bool {
        let mut pool = self.pool();
        if pool.available == 0 {
            return false;
        }
        pool.available -= 1;
        if let Some(metrics) = &self.metrics {
            metrics.available_permits.set(i64::from(pool.available));
        }
        true
    }

    /// Overwrite the pool with a full window of permits.
    fn reset(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let spent = {
            let mut pool = self.pool();
            let spent = self.limit - pool.available;
            pool.available = self.limit;
            if let Some(metrics) = &self.metrics {
                metrics.available_permits.set(i64::from(self.limit));
            }
            spent
        };
        self.reset_notify.notify_waiters();

        let resets = self.resets.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(metrics) = &self.metrics {
            metrics.resets.inc();
        }
        debug!(
            resets,
            spent,
            in_flight = self.in_flight.load(Ordering::Relaxed),
            "Window reset"
        );
    }

    fn record_grant(&self) -> usize {
        let in_flight = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(metrics) = &self.metrics {
            metrics.permits_granted.inc();
            metrics.in_flight.inc();
        }
        in_flight
    }

    fn record_release(&self) {
        let released = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1))
            .is_ok();
        if released {
            if let Some(metrics) = &self.metrics {
                metrics.in_flight.dec();
            }
        }
    }

    fn record_wait(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.acquire_waits.inc();
        }
    }

    fn record_abandon(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.acquire_abandoned.inc();
        }
    }
}

impl Drop for GateInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Drives window resets until shutdown or until every gate handle is gone.
async fn reset_loop(
    inner: Weak<GateInner>,
    shutdown: CancellationToken,
    start: Instant,
    window: Duration,
) {
    // Construction filled the pool for the window starting at `start`.
    let mut ticker = time::interval_at(start + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.reset();
            }
        }
    }
    debug!("Window reset loop stopped");
}

/// Gate capping how many operations may start per fixed window.
///
/// Cloning is cheap; clones share the same pool and reset loop. Construction
/// must happen inside a tokio runtime because it spawns the reset loop.
#[derive(Clone)]
pub struct FixedWindowGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for FixedWindowGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowGate")
            .field("limit", &self.inner.limit)
            .field("window", &self.inner.window)
            .field("available", &self.available())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl FixedWindowGate {
    /// Create a gate allowing `limit` starts per `window`.
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::build(limit, window, None)
    }

    /// Create a gate that reports its activity to `metrics`.
    pub fn with_metrics(limit: u32, window: Duration, metrics: GateMetrics) -> Result<Self> {
        Self::build(limit, window, Some(metrics))
    }

    /// Create a gate from configuration.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.limit, config.window_duration())
    }

    fn build(limit: u32, window: Duration, metrics: Option<GateMetrics>) -> Result<Self> {
        if limit == 0 {
            return Err(GateError::invalid("limit", "must be greater than zero"));
        }
        if window.is_zero() {
            return Err(GateError::invalid("window", "must be greater than zero"));
        }

        if let Some(metrics) = &metrics {
            metrics.available_permits.set(i64::from(limit));
        }

        let shutdown = CancellationToken::new();
        let inner = Arc::new(GateInner {
            limit,
            window,
            pool: Mutex::new(Pool { available: limit }),
            reset_notify: Notify::new(),
            in_flight: AtomicUsize::new(0),
            resets: AtomicU64::new(0),
            shutdown: shutdown.clone(),
            metrics,
        });

        tokio::spawn(reset_loop(
            Arc::downgrade(&inner),
            shutdown,
            Instant::now(),
            window,
        ));

        info!(limit, window_ms = window.as_millis() as u64, "Fixed-window gate started");
        Ok(Self { inner })
    }

    /// Wait for a permit in the current or a later window.
    ///
    /// Resolves immediately while the window has permits left; otherwise
    /// waits for the next reset. Waiters woken by a reset race for its
    /// permits; those that lose wait for the following one. Dropping the
    /// returned future before it resolves costs no permit.
    ///
    /// After [`shutdown`](Self::shutdown) the permits left in the current
    /// window are still handed out. Only a caller that would have to wait
    /// fails, with [`GateError::Shutdown`], since no reset will come.
    pub async fn acquire(&self) -> Result<WindowPermit> {
        let mut waited = false;
        loop {
            // Register before checking the pool so a reset in between is not lost.
            let notified = self.inner.reset_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.take() {
                return Ok(self.grant());
            }
            if self.inner.shutdown.is_cancelled() {
                return Err(GateError::Shutdown);
            }

            if !waited {
                waited = true;
                self.inner.record_wait();
                debug!(
                    limit = self.inner.limit,
                    in_flight = self.in_flight(),
                    "Window exhausted, waiting for next reset"
                );
            }

            tokio::select! {
                _ = notified => {}
                _ = self.inner.shutdown.cancelled() => {}
            }
        }
    }

    /// Take a permit only if the current window still has one.
    pub fn try_acquire(&self) -> Option<WindowPermit> {
        self.inner.take().then(|| self.grant())
    }

    /// Like [`acquire`](Self::acquire), giving up when `cancel` fires.
    ///
    /// An abandoned wait is not charged a permit.
    pub async fn acquire_with_cancel(&self, cancel: &CancellationToken) -> Result<WindowPermit> {
        tokio::select! {
            biased;
            permit = self.acquire() => permit,
            _ = cancel.cancelled() => {
                self.inner.record_abandon();
                warn!(limit = self.inner.limit, "Permit acquisition cancelled");
                Err(GateError::Cancelled)
            }
        }
    }

    /// Like [`acquire`](Self::acquire), giving up after `timeout`.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<WindowPermit> {
        match time::timeout(timeout, self.acquire()).await {
            Ok(permit) => permit,
            Err(_) => {
                self.inner.record_abandon();
                warn!(?timeout, "Permit acquisition timed out");
                Err(GateError::TimedOut(timeout))
            }
        }
    }

    /// Run `operation` under a permit.
    ///
    /// The permit is released when the operation finishes, fails, or the
    /// returned future is dropped part way through.
    pub async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let permit = self.acquire().await?;
        let output = operation.await;
        permit.release();
        Ok(output)
    }

    /// Stop the reset loop.
    ///
    /// Permits left in the current window can still be acquired. Callers
    /// waiting on an exhausted window, and later callers once it is
    /// exhausted, fail with [`GateError::Shutdown`].
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        info!(
            resets = self.resets(),
            available = self.available(),
            in_flight = self.in_flight(),
            "Fixed-window gate shut down"
        );
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn limit(&self) -> u32 {
        self.inner.limit
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Permits left in the current window.
    pub fn available(&self) -> u32 {
        self.inner.pool().available
    }

    /// Permits handed out and not yet released.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Window resets performed since construction.
    pub fn resets(&self) -> u64 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            limit: self.inner.limit,
            window_ms: self.inner.window.as_millis() as u64,
            available: self.available(),
            in_flight: self.in_flight(),
            resets: self.resets(),
            is_shutdown: self.is_shutdown(),
        }
    }

    fn grant(&self) -> WindowPermit {
        let in_flight = self.inner.record_grant();
        debug!(in_flight, available = self.available(), "Permit granted");
        WindowPermit {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Proof that an operation was allowed to start in some window.
///
/// Dropping the permit releases it. Release only lowers the in-flight
/// count; the window's quota stays spent until the next reset.
#[must_use = "dropping the permit releases it immediately"]
pub struct WindowPermit {
    inner: Arc<GateInner>,
}

impl WindowPermit {
    /// Release the permit explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for WindowPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowPermit")
            .field("limit", &self.inner.limit)
            .finish()
    }
}

impl Drop for WindowPermit {
    fn drop(&mut self) {
        self.inner.record_release();
    }
}
