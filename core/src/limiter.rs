//! Process-wide admission control for outbound calls.
//!
//! # Design
//! Every call goes through `RateLimiter::schedule`. Admission is serialized by
//! an async gate (tokio's `Mutex` hands out the lock in FIFO order). The
//! caller holding the gate waits until `min_time` (re-read after every
//! wake-up) has passed since the previous start and a concurrency slot is free, takes the slot, records its
//! start time and releases the gate. Slots are returned when the scheduled
//! future completes or is dropped.
//!
//! One limiter is shared by every client in the process (`global`), so the
//! aggregate request rate respects the API limit. Clients hold an
//! `Arc<RateLimiter>`, which lets tests inject private instances.
//!
//! There is no feedback from rate-limit responses: a 2300 error does not
//! slow future admissions.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{Mutex as Gate, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// `max_concurrent` must stay strictly below this.
pub const MAX_CONCURRENT_CEILING: u32 = 20;
/// `min_time` must stay strictly above this.
pub const MIN_TIME_FLOOR: Duration = Duration::from_millis(50);

pub const DEFAULT_MAX_CONCURRENT: u32 = 1;
pub const DEFAULT_MIN_TIME: Duration = Duration::from_millis(50);

static GLOBAL: OnceLock<Arc<RateLimiter>> = OnceLock::new();

/// The effective limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    pub max_concurrent: u32,
    /// Minimum spacing between two call starts.
    pub min_time: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_time: DEFAULT_MIN_TIME,
        }
    }
}

/// Caller-supplied tuning. Out-of-range values are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LimiterOptions {
    pub max_concurrent: Option<u32>,
    pub min_time_ms: Option<u64>,
}

#[derive(Debug)]
struct State {
    settings: LimiterSettings,
    running: usize,
    queued: usize,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<State>,
    /// Start time of the most recently admitted call.
    gate: Gate<Option<Instant>>,
    released: Notify,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterSettings::default())
    }
}

impl RateLimiter {
    /// A limiter with exactly `settings`. Only `max_concurrent` is clamped
    /// to at least one; the configuration bounds apply to `configure`.
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            state: Mutex::new(State {
                settings: LimiterSettings {
                    max_concurrent: settings.max_concurrent.max(1),
                    min_time: settings.min_time,
                },
                running: 0,
                queued: 0,
            }),
            gate: Gate::new(None),
            released: Notify::new(),
        }
    }

    /// The process-wide limiter, created with default settings on first use.
    pub fn global() -> Arc<RateLimiter> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(RateLimiter::default())))
    }

    /// Install `limiter` as the process-wide instance. Fails, handing the
    /// limiter back, if `global` was already initialized.
    pub fn install_global(limiter: Arc<RateLimiter>) -> Result<(), Arc<RateLimiter>> {
        GLOBAL.set(limiter)
    }

    pub fn settings(&self) -> LimiterSettings {
        self.state.lock().settings
    }

    /// Calls currently executing.
    pub fn running(&self) -> usize {
        self.state.lock().running
    }

    /// Calls waiting for admission.
    pub fn queued(&self) -> usize {
        self.state.lock().queued
    }

    /// Apply the in-range parts of `options` and return the resulting
    /// settings. Takes effect for every pending and future admission.
    pub fn configure(&self, options: LimiterOptions) -> LimiterSettings {
        let settings = {
            let mut state = self.state.lock();
            if let Some(max_concurrent) = options.max_concurrent {
                if max_concurrent > 0 && max_concurrent < MAX_CONCURRENT_CEILING {
                    state.settings.max_concurrent = max_concurrent;
                } else {
                    debug!(max_concurrent, "ignoring out-of-range limiter option");
                }
            }
            if let Some(min_time_ms) = options.min_time_ms {
                let min_time = Duration::from_millis(min_time_ms);
                if min_time > MIN_TIME_FLOOR {
                    state.settings.min_time = min_time;
                } else {
                    debug!(min_time_ms, "ignoring out-of-range limiter option");
                }
            }
            state.settings
        };
        // A raised ceiling may admit the caller parked at the gate.
        self.released.notify_one();
        settings
    }

    /// Run `task` once admitted and return its output.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.admit().await;
        task().await
    }

    async fn admit(&self) -> Slot<'_> {
        let _waiting = Waiting::enter(self);
        let mut last_start = self.gate.lock().await;

        // `min_time` may be raised while this caller sleeps.
        if let Some(previous) = *last_start {
            loop {
                let ready_at = previous + self.state.lock().settings.min_time;
                if Instant::now() >= ready_at {
                    break;
                }
                sleep_until(ready_at).await;
            }
        }

        loop {
            let released = self.released.notified();
            {
                let mut state = self.state.lock();
                if state.running < state.settings.max_concurrent as usize {
                    state.running += 1;
                    *last_start = Some(Instant::now());
                    return Slot { limiter: self };
                }
            }
            released.await;
        }
    }
}

/// A held concurrency slot.
struct Slot<'a> {
    limiter: &'a RateLimiter,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.limiter.state.lock().running -= 1;
        self.limiter.released.notify_one();
    }
}

/// Counts a caller in `queued` until admission finishes or is abandoned.
struct Waiting<'a> {
    limiter: &'a RateLimiter,
}

impl<'a> Waiting<'a> {
    fn enter(limiter: &'a RateLimiter) -> Self {
        limiter.state.lock().queued += 1;
        Self { limiter }
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.limiter.state.lock().queued -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn unspaced(max_concurrent: u32) -> RateLimiter {
        RateLimiter::new(LimiterSettings {
            max_concurrent,
            min_time: Duration::ZERO,
        })
    }

    fn max_concurrent(n: u32) -> LimiterOptions {
        LimiterOptions {
            max_concurrent: Some(n),
            ..Default::default()
        }
    }

    fn min_time_ms(ms: u64) -> LimiterOptions {
        LimiterOptions {
            min_time_ms: Some(ms),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let settings = RateLimiter::default().settings();
        assert_eq!(settings.max_concurrent, 1);
        assert_eq!(settings.min_time, Duration::from_millis(50));
    }

    #[test]
    fn max_concurrent_bounds() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.configure(max_concurrent(50)).max_concurrent, 1);
        assert_eq!(limiter.configure(max_concurrent(5)).max_concurrent, 5);
        assert_eq!(limiter.configure(max_concurrent(20)).max_concurrent, 5);
        assert_eq!(limiter.configure(max_concurrent(0)).max_concurrent, 5);
        assert_eq!(limiter.configure(max_concurrent(19)).max_concurrent, 19);
    }

    #[test]
    fn min_time_bounds() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.configure(min_time_ms(1)).min_time, Duration::from_millis(50));
        assert_eq!(limiter.configure(min_time_ms(100)).min_time, Duration::from_millis(100));
        assert_eq!(limiter.configure(min_time_ms(50)).min_time, Duration::from_millis(100));
    }

    #[test]
    fn partial_options_apply_independently() {
        let limiter = RateLimiter::default();
        let settings = limiter.configure(LimiterOptions {
            max_concurrent: Some(99),
            min_time_ms: Some(200),
        });
        assert_eq!(settings.max_concurrent, 1);
        assert_eq!(settings.min_time, Duration::from_millis(200));
    }

    #[test]
    fn global_is_shared() {
        assert!(Arc::ptr_eq(&RateLimiter::global(), &RateLimiter::global()));
        assert!(RateLimiter::install_global(Arc::new(RateLimiter::default())).is_err());
    }

    #[tokio::test]
    async fn schedule_returns_task_output() {
        let limiter = unspaced(1);
        let out = limiter.schedule(|| async { 41 + 1 }).await;
        assert_eq!(out, 42);
        assert_eq!(limiter.running(), 0);
        assert_eq!(limiter.queued(), 0);
    }

    #[tokio::test]
    async fn never_exceeds_max_concurrent() {
        let limiter = Arc::new(unspaced(3));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    limiter
                        .schedule(|| async {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                        })
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.running(), 0);
    }

    #[tokio::test]
    async fn starts_are_spaced_by_min_time() {
        let limiter = RateLimiter::new(LimiterSettings {
            max_concurrent: 5,
            min_time: Duration::from_millis(60),
        });
        let start = Instant::now();
        for _ in 0..3 {
            limiter.schedule(|| async {}).await;
        }
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn raised_min_time_reaches_a_sleeping_caller() {
        let limiter = Arc::new(RateLimiter::new(LimiterSettings {
            max_concurrent: 5,
            min_time: Duration::from_millis(60),
        }));
        let first = Instant::now();
        limiter.schedule(|| async {}).await;

        let second = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.schedule(|| async { Instant::now() }).await })
        };
        while limiter.queued() == 0 {
            tokio::task::yield_now().await;
        }
        limiter.configure(min_time_ms(200));

        let started = second.await.unwrap();
        assert!(started.duration_since(first) >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn waiting_calls_run_in_submission_order() {
        let limiter = Arc::new(unspaced(1));
        let order = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let holder = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter
                    .schedule(|| async {
                        let _ = release_rx.await;
                    })
                    .await
            })
        };
        while limiter.running() == 0 {
            tokio::task::yield_now().await;
        }

        let mut handles = Vec::new();
        for i in 0..20usize {
            let submitter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                submitter
                    .schedule(|| async move {
                        order.lock().push(i);
                    })
                    .await
            }));
            while limiter.queued() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn raising_max_concurrent_admits_waiting_call() {
        let limiter = Arc::new(unspaced(1));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let holder = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter
                    .schedule(|| async {
                        let _ = release_rx.await;
                    })
                    .await
            })
        };
        while limiter.running() == 0 {
            tokio::task::yield_now().await;
        }

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter
                    .schedule(|| async {
                        let _ = started_tx.send(());
                    })
                    .await
            })
        };
        while limiter.queued() == 0 {
            tokio::task::yield_now().await;
        }

        limiter.configure(max_concurrent(2));
        tokio::time::timeout(Duration::from_secs(1), started_rx)
            .await
            .expect("waiting call was not admitted")
            .unwrap();

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn abandoned_waiter_leaves_the_queue() {
        let limiter = Arc::new(unspaced(1));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let holder = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                limiter
                    .schedule(|| async {
                        let _ = release_rx.await;
                    })
                    .await
            })
        };
        while limiter.running() == 0 {
            tokio::task::yield_now().await;
        }

        let attempt = tokio::time::timeout(Duration::from_millis(20), limiter.schedule(|| async {})).await;
        assert!(attempt.is_err());
        assert_eq!(limiter.queued(), 0);

        release_tx.send(()).unwrap();
        holder.await.unwrap();
        assert_eq!(limiter.running(), 0);
    }
}
