// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Cooperative tick scheduling.
//!
//! The frame loop runs on the UI thread: each tick re-arms a
//! [`RepeatingTask`] for the next deadline and the UI polls it every frame.
//! Cancelling bumps the task's generation so an invocation scheduled before
//! a pause or quit can never fire afterwards.

use std::time::{Duration, Instant};

/// Upper bound on a single tick delay.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Delay between ticks at the given playback speed: `max(1, base / speed)` ms.
pub fn tick_delay(base_delay_ms: u64, speed: f64) -> Duration {
    let ms = base_delay_ms as f64 / speed;
    let ms = if ms.is_nan() {
        1.0
    } else {
        ms.floor().clamp(1.0, MAX_DELAY_MS as f64)
    };
    Duration::from_millis(ms as u64)
}

/// Identifies one scheduling generation of a [`RepeatingTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CancelToken(u64);

/// A task that fires at most once per `schedule` call, unless cancelled.
#[derive(Debug, Default)]
pub struct RepeatingTask {
    generation: u64,
    pending: Option<(CancelToken, Instant)>,
}

impl RepeatingTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the task to fire at `at`, replacing any pending invocation.
    pub fn schedule(&mut self, at: Instant) {
        self.pending = Some((CancelToken(self.generation), at));
    }

    /// Arm the task to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration) {
        let at = now.checked_add(delay).unwrap_or(now);
        self.schedule(at);
    }

    /// Drop the pending invocation and start a new generation.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    fn is_current(&self, token: CancelToken) -> bool {
        token.0 == self.generation
    }

    /// Deadline of the pending invocation, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .filter(|(token, _)| self.is_current(*token))
            .map(|(_, at)| at)
    }

    /// Consume the pending invocation if it is due and still current.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some((token, at)) if at <= now => {
                self.pending = None;
                self.is_current(token)
            }
            _ => false,
        }
    }
}
