// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dual token-bucket rate limiting.
//!
//! One bucket counts requests, the other counts tokens; both share a
//! single one-minute window measured from `last_reset`. The window
//! refills exactly once, on the first call after it expires.

use super::ProviderError;
use parking_lot::Mutex;
use skylark_core::{CancelToken, Clock};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

struct Buckets {
    request_tokens: u32,
    token_tokens: u32,
    last_reset: Instant,
}

/// Token-bucket limiter over requests/minute and tokens/minute.
pub struct RateLimiter<C: Clock> {
    clock: C,
    requests_per_minute: u32,
    tokens_per_minute: u32,
    buckets: Mutex<Buckets>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, requests_per_minute: u32, tokens_per_minute: u32) -> Self {
        let buckets = Buckets {
            request_tokens: requests_per_minute,
            token_tokens: tokens_per_minute,
            last_reset: clock.now(),
        };
        Self {
            clock,
            requests_per_minute,
            tokens_per_minute,
            buckets: Mutex::new(buckets),
        }
    }

    fn refill_if_expired(&self, buckets: &mut Buckets, now: Instant) {
        if now.saturating_duration_since(buckets.last_reset) >= WINDOW {
            buckets.request_tokens = self.requests_per_minute;
            buckets.token_tokens = self.tokens_per_minute;
            buckets.last_reset = now;
        }
    }

    /// Take one request token, sleeping through the clock until the
    /// window refills when the bucket is empty. Cancellation wins over
    /// the sleep.
    pub async fn wait(&self, cancel: &CancelToken) -> Result<(), ProviderError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            let window_end = {
                let mut buckets = self.buckets.lock();
                let now = self.clock.now();
                self.refill_if_expired(&mut buckets, now);
                if buckets.request_tokens > 0 {
                    buckets.request_tokens -= 1;
                    return Ok(());
                }
                buckets.last_reset + WINDOW
            };
            // Sleep with the lock released.
            let pause = window_end
                .saturating_duration_since(self.clock.now())
                .max(Duration::from_millis(1));
            tokio::select! {
                _ = self.clock.sleep(pause) => {}
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            }
        }
    }

    /// Charge `count` tokens against the minute's budget. Over-budget
    /// charges fail with the used/total totals in the message.
    pub fn add_tokens(&self, count: u32) -> Result<(), ProviderError> {
        let mut buckets = self.buckets.lock();
        let now = self.clock.now();
        self.refill_if_expired(&mut buckets, now);
        if buckets.token_tokens < count {
            let used = self.tokens_per_minute - buckets.token_tokens;
            return Err(ProviderError::RateLimit(format!(
                "token budget exhausted: {} used + {} requested exceeds {} tokens this minute",
                used, count, self.tokens_per_minute
            )));
        }
        buckets.token_tokens -= count;
        Ok(())
    }

    /// Remaining (requests, tokens) in the current window.
    pub fn remaining(&self) -> (u32, u32) {
        let buckets = self.buckets.lock();
        (buckets.request_tokens, buckets.token_tokens)
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
