// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame and timer scheduling port.
//!
//! A [`Scheduler`] only hands out tokens. Whoever drives the event loop later
//! delivers those tokens back to the crossfade via `Crossfade::fire`, which
//! keeps the scheduler free of closures and lets tests run on a simulated
//! clock.
//!
//! [`TimerQueue`] is the deterministic implementation shared by every driver:
//! frame requests fire on the next poll, timeouts fire on the first poll at or
//! after their deadline.

use std::fmt;
use std::time::{Duration, Instant};

/// Handle for a pending frame or timeout callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability to request deferred callbacks.
pub trait Scheduler {
    /// Request a callback on the next display frame.
    fn request_frame(&mut self) -> Token;

    /// Request a callback no earlier than `delay` from now.
    fn set_timeout(&mut self, delay: Duration) -> Token;

    /// Cancel a pending callback. Unknown or already fired tokens are ignored.
    fn cancel(&mut self, token: Token);
}

/// Single-threaded queue of frame and timeout callbacks.
#[derive(Debug)]
pub struct TimerQueue {
    now: Instant,
    next_token: u64,
    frames: Vec<Token>,
    timers: Vec<(Instant, Token)>,
}

impl TimerQueue {
    /// Create a queue whose notion of "now" starts at `now`.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            next_token: 0,
            frames: Vec::new(),
            timers: Vec::new(),
        }
    }

    /// Advance the clock to `now` and return every token that is due.
    ///
    /// Frames requested before this call are all due. Timers are returned in
    /// deadline order. Anything scheduled while the caller processes the
    /// returned tokens waits for the next poll.
    pub fn poll(&mut self, now: Instant) -> Vec<Token> {
        if now > self.now {
            self.now = now;
        }

        let mut due: Vec<Token> = std::mem::take(&mut self.frames);

        self.timers.sort_by_key(|(deadline, token)| (*deadline, *token));
        let split = self
            .timers
            .iter()
            .position(|(deadline, _)| *deadline > self.now)
            .unwrap_or(self.timers.len());
        due.extend(self.timers.drain(..split).map(|(_, token)| token));

        due
    }

    /// When the queue next needs attention, if anything is pending.
    ///
    /// Pending frames report the current time.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        if !self.frames.is_empty() {
            return Some(self.now);
        }
        self.timers.iter().map(|(deadline, _)| *deadline).min()
    }

    #[must_use]
    pub fn has_pending_frame(&self) -> bool {
        !self.frames.is_empty()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.frames.is_empty() && self.timers.is_empty()
    }

    /// Time the queue last advanced to.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    fn issue(&mut self) -> Token {
        self.next_token += 1;
        Token(self.next_token)
    }
}

impl Scheduler for TimerQueue {
    fn request_frame(&mut self) -> Token {
        let token = self.issue();
        self.frames.push(token);
        token
    }

    fn set_timeout(&mut self, delay: Duration) -> Token {
        let token = self.issue();
        self.timers.push((self.now + delay, token));
        token
    }

    fn cancel(&mut self, token: Token) {
        self.frames.retain(|t| *t != token);
        self.timers.retain(|(_, t)| *t != token);
    }
}
