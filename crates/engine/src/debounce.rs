// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key event coalescing.
//!
//! `debounce(key, action)` runs the most recent action for a key once
//! the key has been quiet for `delay`, with a hard cap of `max_delay`
//! measured from the first pending event. One live timer per key;
//! actions run on their own task, never under the debouncer's lock.

use parking_lot::Mutex;
use skylark_core::clock::TimerGuard;
use skylark_core::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The work fired for a key after its quiet period.
pub type DebounceAction = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Pending {
    first_event: Instant,
    guard: TimerGuard,
}

struct State {
    pending: HashMap<String, Pending>,
    stopped: bool,
}

/// Coalesces bursts of per-key events into single actions.
pub struct Debouncer<C: Clock> {
    clock: C,
    delay: Duration,
    max_delay: Duration,
    state: Arc<Mutex<State>>,
}

impl<C: Clock> Debouncer<C> {
    pub fn new(clock: C, delay: Duration, max_delay: Duration) -> Self {
        Self {
            clock,
            delay,
            max_delay,
            state: Arc::new(Mutex::new(State {
                pending: HashMap::new(),
                stopped: false,
            })),
        }
    }

    /// Schedule `action` for `key`, superseding any action already
    /// pending for it. The action fires after `delay` of quiet, or
    /// immediately once `max_delay` has elapsed since the key's first
    /// pending event.
    pub fn debounce(&self, key: impl Into<String>, action: DebounceAction) {
        let key = key.into();
        let now = self.clock.now();

        let fire_now = {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            let first_event = match state.pending.remove(&key) {
                // Dropping the entry cancels the superseded timer (and
                // the action it owned).
                Some(previous) => previous.first_event,
                None => now,
            };
            let cap_left = (first_event + self.max_delay).saturating_duration_since(now);
            if cap_left.is_zero() {
                true
            } else {
                let wait = self.delay.min(cap_left);
                let guard = self.clock.after_func(
                    wait,
                    fire_closure(Arc::clone(&self.state), key.clone(), action),
                );
                state.pending.insert(key, Pending { first_event, guard });
                return;
            }
        };

        if fire_now {
            tracing::trace!(key, "max delay reached, firing immediately");
            spawn_action(action);
        }
    }

    /// Cancel all pending timers and refuse further scheduling.
    /// Idempotent.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.pending.clear();
    }

    /// Number of keys with a pending timer; for tests and introspection.
    pub fn pending_keys(&self) -> usize {
        self.state.lock().pending.len()
    }
}

/// Build the timer callback: drop the key's pending entry, then run the
/// action on its own task.
fn fire_closure(
    state: Arc<Mutex<State>>,
    key: String,
    action: DebounceAction,
) -> Box<dyn FnOnce() + Send> {
    Box::new(move || {
        state.lock().pending.remove(&key);
        spawn_action(action);
    })
}

fn spawn_action(action: DebounceAction) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(action);
        }
        Err(_) => tracing::warn!("debounce action dropped: no runtime"),
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
