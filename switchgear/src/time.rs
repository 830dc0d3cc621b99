/*
 *
 *    Copyright (c) 2025 Switchgear Authors
 *
 *    Licensed under the Apache License, Version 2.0 (the "License");
 *    you may not use this file except in compliance with the License.
 *    You may obtain a copy of the License at
 *
 *        http://www.apache.org/licenses/LICENSE-2.0
 *
 *    Unless required by applicable law or agreed to in writing, software
 *    distributed under the License is distributed on an "AS IS" BASIS,
 *    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *    See the License for the specific language governing permissions and
 *    limitations under the License.
 */

//! Monotonic millisecond time for the super-loop.
//!
//! The time source is injected as a plain function pointer so the engine
//! never binds to a platform. [`TimeKeeper`] caches one reading per loop
//! iteration; every timing decision taken within a tick observes the same
//! "now" and is therefore self-consistent.

/// A monotonic millisecond counter.
///
/// The counter wraps around after about 49.7 days; all comparisons against
/// it must go through [`elapsed`], which is wrap-safe for windows shorter
/// than half the counter range.
pub type Clock = fn() -> u32;

/// A clock that is permanently stuck at zero.
pub fn dummy_clock() -> u32 {
    0
}

/// A clock backed by [`std::time::Instant`], measured from the first call.
#[cfg(feature = "std")]
pub fn sys_clock() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();

    START.get_or_init(Instant::now).elapsed().as_millis() as u32
}

/// Milliseconds elapsed between `since` and `now`, wrap-safe.
#[inline]
pub fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Caches the clock once per loop iteration.
pub struct TimeKeeper {
    clock: Clock,
    now: u32,
}

impl TimeKeeper {
    pub const fn new(clock: Clock) -> Self {
        Self { clock, now: 0 }
    }

    /// Refreshes the cached timestamp. Called once at the top of each tick.
    pub fn update(&mut self) {
        self.now = (self.clock)();
    }

    /// The timestamp cached by the last [`update`](Self::update).
    pub fn now(&self) -> u32 {
        self.now
    }

    /// A fresh, uncached reading. For the rare caller that cannot use the
    /// per-tick cache.
    pub fn real_now(&self) -> u32 {
        (self.clock)()
    }
}
