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

//! A controllable digital output, typically a relay.

use crate::hal::OutputPin;
use crate::time::elapsed;
use crate::timings;

/// One digital output with on/off state, switching debounce, an optional
/// auto-off timer and an optional protection flag.
///
/// `state` always reflects the last level actually applied to the
/// hardware output. A `set_state` that lands inside the switching
/// debounce window reports "no change" and leaves the hardware alone;
/// that is a normal outcome, not an error.
pub struct Actuator<O> {
    pin: O,
    id: u8,
    state: bool,
    default_state: bool,
    auto_off_ms: u32,
    protected: bool,
    last_switch_ms: u32,
}

impl<O: OutputPin> Actuator<O> {
    /// Creates an actuator on `pin` with the device-unique `id` (> 0).
    pub fn new(pin: O, id: u8) -> Self {
        Self {
            pin,
            id,
            state: false,
            default_state: false,
            auto_off_ms: 0,
            protected: false,
            last_switch_ms: 0,
        }
    }

    /// Turns the actuator off `ms` milliseconds after it was last switched
    /// on. 0 disables the timer.
    pub fn auto_off(mut self, ms: u32) -> Self {
        self.auto_off_ms = ms;
        self
    }

    /// Exempts the actuator from the global "turn off everything
    /// unprotected" sweeps.
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    /// The level applied to the hardware at boot.
    pub fn default_on(mut self, on: bool) -> Self {
        self.default_state = on;
        self
    }

    /// Drives the output to its default level. Called once when the
    /// registry ingests the actuator.
    pub(crate) fn apply_default(&mut self, now: u32) {
        self.state = self.default_state;
        self.pin.set(self.state);
        self.last_switch_ms = now;
    }

    /// Switches the output to `target`.
    ///
    /// Returns false without touching the hardware when the output is
    /// already at `target` or when the last switch was less than
    /// [`timings::ACTUATOR_DEBOUNCE_MS`] ago.
    pub fn set_state(&mut self, target: bool, now: u32) -> bool {
        if self.state == target {
            return false;
        }
        if timings::ACTUATOR_DEBOUNCE_MS != 0
            && elapsed(now, self.last_switch_ms) < timings::ACTUATOR_DEBOUNCE_MS
        {
            return false;
        }

        self.pin.set(target);
        self.state = target;
        self.last_switch_ms = now;
        true
    }

    pub fn toggle(&mut self, now: u32) -> bool {
        self.set_state(!self.state, now)
    }

    /// Switches the output off when the auto-off timer has run out.
    pub fn check_auto_off(&mut self, now: u32) -> bool {
        if self.state
            && self.auto_off_ms != 0
            && elapsed(now, self.last_switch_ms) >= self.auto_off_ms
        {
            self.set_state(false, now)
        } else {
            false
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn state(&self) -> bool {
        self.state
    }

    pub fn default_state(&self) -> bool {
        self.default_state
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn has_auto_off(&self) -> bool {
        self.auto_off_ms != 0
    }
}
