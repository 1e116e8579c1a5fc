// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skylark_core::FakeClock;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counter_action(counter: &Arc<AtomicUsize>) -> DebounceAction {
    let counter = Arc::clone(counter);
    Box::pin(async move {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

async fn settle() {
    // Let spawned actions run on the current-thread test runtime.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn fires_once_after_quiet_period() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100), Duration::from_secs(1));
    let fired = Arc::new(AtomicUsize::new(0));

    debouncer.debounce("a.md", counter_action(&fired));
    clock.advance(Duration::from_millis(99));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    clock.advance(Duration::from_millis(1));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(debouncer.pending_keys(), 0);
}

#[tokio::test]
async fn burst_coalesces_to_one_fire() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100), Duration::from_secs(1));
    let fired = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        debouncer.debounce("a.md", counter_action(&fired));
        clock.advance(Duration::from_millis(50));
    }
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0, "still within quiet window");

    clock.advance(Duration::from_millis(100));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn max_delay_caps_a_steady_stream() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(
        clock.clone(),
        Duration::from_millis(100),
        Duration::from_millis(350),
    );
    let fired = Arc::new(AtomicUsize::new(0));

    // Events every 90ms keep resetting the quiet window; the cap fires
    // the action no later than first event + max_delay.
    for _ in 0..5 {
        debouncer.debounce("a.md", counter_action(&fired));
        clock.advance(Duration::from_millis(90));
        settle().await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn keys_are_independent() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100), Duration::from_secs(1));
    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));

    debouncer.debounce("a.md", counter_action(&a));
    clock.advance(Duration::from_millis(60));
    debouncer.debounce("b.md", counter_action(&b));
    assert_eq!(debouncer.pending_keys(), 2);

    clock.advance(Duration::from_millis(40));
    settle().await;
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 0);

    clock.advance(Duration::from_millis(60));
    settle().await;
    assert_eq!(b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn newest_action_supersedes_pending_one() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100), Duration::from_secs(1));
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    debouncer.debounce("a.md", counter_action(&first));
    debouncer.debounce("a.md", counter_action(&second));
    clock.advance(Duration::from_millis(100));
    settle().await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_cancels_everything() {
    let clock = FakeClock::new();
    let debouncer = Debouncer::new(clock.clone(), Duration::from_millis(100), Duration::from_secs(1));
    let fired = Arc::new(AtomicUsize::new(0));

    debouncer.debounce("a.md", counter_action(&fired));
    debouncer.stop();
    debouncer.stop();
    clock.advance(Duration::from_secs(5));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    // Scheduling after stop is refused.
    debouncer.debounce("b.md", counter_action(&fired));
    clock.advance(Duration::from_secs(5));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn action_may_reenter_the_debouncer() {
    let clock = FakeClock::new();
    let debouncer = Arc::new(Debouncer::new(
        clock.clone(),
        Duration::from_millis(100),
        Duration::from_secs(1),
    ));
    let fired = Arc::new(AtomicUsize::new(0));

    let inner_fired = Arc::clone(&fired);
    let reentrant = Arc::clone(&debouncer);
    debouncer.debounce(
        "a.md",
        Box::pin(async move {
            reentrant.debounce("a.md", counter_action(&inner_fired));
        }),
    );
    clock.advance(Duration::from_millis(100));
    settle().await;
    assert_eq!(debouncer.pending_keys(), 1, "re-entered key is pending");

    clock.advance(Duration::from_millis(100));
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
