// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract time source.
//!
//! All scheduling in the runtime (debounce windows, rate-limit refills,
//! CPU-time enforcement, retry backoff) goes through [`Clock`] so that it
//! can be driven deterministically in tests. [`SystemClock`] delegates to
//! `tokio::time`; [`FakeClock`] keeps virtual time that only moves when a
//! test calls [`FakeClock::advance`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{mpsc, oneshot};

/// A boxed callback for [`Clock::after_func`].
pub type TimerFn = Box<dyn FnOnce() + Send + 'static>;

/// Abstract time source.
///
/// Implementations must be cheap to clone; clones share the same
/// underlying time state.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time.
    fn system_now(&self) -> SystemTime;

    /// Suspend the calling task for `d`.
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// One-shot timer firing after `d`. The fire is delivered on a
    /// capacity-1 channel without blocking; an unread previous fire is
    /// dropped. The timer fires at most once unless reset.
    fn timer(&self, d: Duration) -> ClockTimer;

    /// Repeating ticker with period `d`. Re-arms at `previous + period`
    /// until stopped.
    fn ticker(&self, d: Duration) -> ClockTicker;

    /// Run `f` once after `d` unless the returned guard is stopped (or
    /// dropped) first.
    fn after_func(&self, d: Duration, f: TimerFn) -> TimerGuard;
}

/// Control handle shared by timers, tickers, and after-func guards.
trait TimerControl: Send + Sync {
    fn stop(&self);
    fn reset(&self, d: Duration);
}

/// Handle to a one-shot timer created by [`Clock::timer`].
pub struct ClockTimer {
    rx: mpsc::Receiver<Instant>,
    ctl: Arc<dyn TimerControl>,
}

impl ClockTimer {
    /// Wait for the timer to fire. Returns `None` if the timer was
    /// stopped before firing.
    pub async fn recv(&mut self) -> Option<Instant> {
        self.rx.recv().await
    }

    /// Non-blocking check for a delivered fire.
    pub fn try_recv(&mut self) -> Option<Instant> {
        self.rx.try_recv().ok()
    }

    /// Cancel the timer. Stopping an already-fired timer is a no-op.
    pub fn stop(&self) {
        self.ctl.stop();
    }

    /// Re-arm the timer to fire `d` from now, whether or not it already
    /// fired.
    pub fn reset(&self, d: Duration) {
        self.ctl.reset(d);
    }
}

impl Drop for ClockTimer {
    fn drop(&mut self) {
        self.ctl.stop();
    }
}

/// Handle to a repeating ticker created by [`Clock::ticker`].
pub struct ClockTicker {
    rx: mpsc::Receiver<Instant>,
    ctl: Arc<dyn TimerControl>,
}

impl ClockTicker {
    /// Wait for the next tick. Returns `None` once stopped and drained.
    pub async fn recv(&mut self) -> Option<Instant> {
        self.rx.recv().await
    }

    /// Non-blocking check for a delivered tick.
    pub fn try_recv(&mut self) -> Option<Instant> {
        self.rx.try_recv().ok()
    }

    /// Stop the ticker. No further ticks are delivered.
    pub fn stop(&self) {
        self.ctl.stop();
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.ctl.stop();
    }
}

/// Cancellation guard returned by [`Clock::after_func`].
///
/// The callback is cancelled when the guard is stopped or dropped;
/// stop-after-fire is a no-op. Hold the guard for as long as the
/// callback should stay armed.
pub struct TimerGuard {
    ctl: Arc<dyn TimerControl>,
}

impl TimerGuard {
    /// Cancel the pending callback if it has not run yet.
    pub fn stop(&self) {
        self.ctl.stop();
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.ctl.stop();
    }
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Wall-clock implementation backed by `tokio::time`.
#[derive(Clone, Default, Debug)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

enum SysCtl {
    Reset(Duration),
    Stop,
}

struct SysTimerControl {
    tx: mpsc::UnboundedSender<SysCtl>,
}

impl TimerControl for SysTimerControl {
    fn stop(&self) {
        let _ = self.tx.send(SysCtl::Stop);
    }

    fn reset(&self, d: Duration) {
        let _ = self.tx.send(SysCtl::Reset(d));
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(d))
    }

    fn timer(&self, d: Duration) -> ClockTimer {
        let (fire_tx, fire_rx) = mpsc::channel(1);
        let (ctl_tx, mut ctl_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut deadline = Some(tokio::time::Instant::now() + d);
            loop {
                match deadline {
                    Some(at) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(at) => {
                                let _ = fire_tx.try_send(Instant::now());
                                deadline = None;
                            }
                            ctl = ctl_rx.recv() => match ctl {
                                Some(SysCtl::Reset(d)) => {
                                    deadline = Some(tokio::time::Instant::now() + d);
                                }
                                Some(SysCtl::Stop) | None => return,
                            },
                        }
                    }
                    // Fired; a reset may re-arm it.
                    None => match ctl_rx.recv().await {
                        Some(SysCtl::Reset(d)) => {
                            deadline = Some(tokio::time::Instant::now() + d);
                        }
                        Some(SysCtl::Stop) | None => return,
                    },
                }
            }
        });
        ClockTimer {
            rx: fire_rx,
            ctl: Arc::new(SysTimerControl { tx: ctl_tx }),
        }
    }

    fn ticker(&self, d: Duration) -> ClockTicker {
        let (fire_tx, fire_rx) = mpsc::channel(1);
        let (ctl_tx, mut ctl_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut next = tokio::time::Instant::now() + d;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(next) => {
                        let _ = fire_tx.try_send(Instant::now());
                        next += d;
                    }
                    ctl = ctl_rx.recv() => match ctl {
                        Some(SysCtl::Reset(d)) => next = tokio::time::Instant::now() + d,
                        Some(SysCtl::Stop) | None => return,
                    },
                }
            }
        });
        ClockTicker {
            rx: fire_rx,
            ctl: Arc::new(SysTimerControl { tx: ctl_tx }),
        }
    }

    fn after_func(&self, d: Duration, f: TimerFn) -> TimerGuard {
        let (ctl_tx, mut ctl_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut deadline = tokio::time::Instant::now() + d;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        f();
                        return;
                    }
                    ctl = ctl_rx.recv() => match ctl {
                        Some(SysCtl::Reset(d)) => deadline = tokio::time::Instant::now() + d,
                        Some(SysCtl::Stop) | None => return,
                    },
                }
            }
        });
        TimerGuard {
            ctl: Arc::new(SysTimerControl { tx: ctl_tx }),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeClock
// ---------------------------------------------------------------------------

enum FakeEntry {
    /// Fires once; stays registered (disarmed) so `reset` can re-arm it.
    Once { tx: mpsc::Sender<Instant> },
    /// Re-arms at `deadline + period` after each fire.
    Tick {
        tx: mpsc::Sender<Instant>,
        period: Duration,
    },
    /// Wakes a single `sleep()` caller, then is removed.
    Sleeper { tx: Option<oneshot::Sender<()>> },
    /// Runs a callback once, then is removed.
    Func { f: Option<TimerFn> },
}

struct FakeTimer {
    deadline: Instant,
    /// Insertion order, to break deadline ties deterministically.
    seq: u64,
    armed: bool,
    entry: FakeEntry,
}

struct FakeInner {
    base: Instant,
    offset: Duration,
    next_id: u64,
    timers: HashMap<u64, FakeTimer>,
}

/// Deterministic clock for tests. Virtual time starts at construction and
/// moves only through [`FakeClock::advance`].
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeInner>>,
    system_base: SystemTime,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

struct FakeTimerControl {
    inner: Arc<Mutex<FakeInner>>,
    id: u64,
}

impl TimerControl for FakeTimerControl {
    fn stop(&self) {
        self.inner.lock().timers.remove(&self.id);
    }

    fn reset(&self, d: Duration) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = inner.base + inner.offset;
        if let Some(timer) = inner.timers.get_mut(&self.id) {
            timer.deadline = now + d;
            timer.armed = true;
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeInner {
                base: Instant::now(),
                offset: Duration::ZERO,
                next_id: 1,
                timers: HashMap::new(),
            })),
            system_base: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    fn register(&self, deadline: Instant, entry: FakeEntry) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.timers.insert(
            id,
            FakeTimer {
                deadline,
                seq: id,
                armed: true,
                entry,
            },
        );
        id
    }

    /// Move virtual time forward by `d`, visiting each timer deadline at
    /// or before the target in strictly increasing order and firing in
    /// deadline order. Tickers re-arm themselves; one-shot timers fire at
    /// most once.
    pub fn advance(&self, d: Duration) {
        let target = {
            let inner = self.inner.lock();
            inner.base + inner.offset + d
        };
        loop {
            // Fire one entry per lock acquisition; callbacks run outside
            // the lock and may re-enter the clock.
            let mut callback: Option<TimerFn> = None;
            {
                let mut guard = self.inner.lock();
                let inner = &mut *guard;
                let due = inner
                    .timers
                    .iter()
                    .filter(|(_, t)| t.armed && t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.seq))
                    .map(|(id, _)| *id);
                let Some(id) = due else {
                    inner.offset = target - inner.base;
                    return;
                };
                let mut remove = false;
                if let Some(t) = inner.timers.get_mut(&id) {
                    let fire_at = t.deadline;
                    inner.offset = fire_at - inner.base;
                    match &mut t.entry {
                        FakeEntry::Once { tx } => {
                            let _ = tx.try_send(fire_at);
                            t.armed = false;
                        }
                        FakeEntry::Tick { tx, period } => {
                            let _ = tx.try_send(fire_at);
                            t.deadline = fire_at + *period;
                        }
                        FakeEntry::Sleeper { tx } => {
                            if let Some(tx) = tx.take() {
                                let _ = tx.send(());
                            }
                            remove = true;
                        }
                        FakeEntry::Func { f } => {
                            callback = f.take();
                            remove = true;
                        }
                    }
                }
                if remove {
                    inner.timers.remove(&id);
                }
            }
            if let Some(f) = callback {
                f();
            }
        }
    }

    /// Number of registered armed timers; for test assertions.
    pub fn pending(&self) -> usize {
        self.inner.lock().timers.values().filter(|t| t.armed).count()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let inner = self.inner.lock();
        inner.base + inner.offset
    }

    fn system_now(&self) -> SystemTime {
        let inner = self.inner.lock();
        self.system_base + inner.offset
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        if d.is_zero() {
            return Box::pin(async {});
        }
        let (tx, rx) = oneshot::channel();
        let deadline = self.now() + d;
        self.register(deadline, FakeEntry::Sleeper { tx: Some(tx) });
        Box::pin(async move {
            let _ = rx.await;
        })
    }

    fn timer(&self, d: Duration) -> ClockTimer {
        let (tx, rx) = mpsc::channel(1);
        let deadline = self.now() + d;
        let id = self.register(deadline, FakeEntry::Once { tx });
        ClockTimer {
            rx,
            ctl: Arc::new(FakeTimerControl {
                inner: Arc::clone(&self.inner),
                id,
            }),
        }
    }

    fn ticker(&self, d: Duration) -> ClockTicker {
        let (tx, rx) = mpsc::channel(1);
        let deadline = self.now() + d;
        let id = self.register(deadline, FakeEntry::Tick { tx, period: d });
        ClockTicker {
            rx,
            ctl: Arc::new(FakeTimerControl {
                inner: Arc::clone(&self.inner),
                id,
            }),
        }
    }

    fn after_func(&self, d: Duration, f: TimerFn) -> TimerGuard {
        let deadline = self.now() + d;
        let id = self.register(deadline, FakeEntry::Func { f: Some(f) });
        TimerGuard {
            ctl: Arc::new(FakeTimerControl {
                inner: Arc::clone(&self.inner),
                id,
            }),
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
