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

//! A status lamp derived from a set of actuator states.

use heapless::Vec;

use crate::hal::OutputPin;
use crate::MAX_ACTUATORS;

/// How the watched actuator states collapse into one lamp level.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    /// On while any watched actuator is on.
    Any,
    /// On while every watched actuator is on.
    All,
    /// On while strictly more than half are on; a tie reads as off.
    Majority,
}

/// A digital output whose level is a function of actuator states.
///
/// The lamp is only refreshed when the scheduler broadcasts new state, and
/// the pin is only written when the computed level actually changed.
pub struct Indicator<O> {
    pin: O,
    mode: IndicatorMode,
    state: bool,
    watched: Vec<u8, MAX_ACTUATORS>,
}

impl<O: OutputPin> Indicator<O> {
    pub fn new(pin: O) -> Self {
        Self {
            pin,
            mode: IndicatorMode::Any,
            state: false,
            watched: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: IndicatorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds an actuator (by registry index) to the watched set.
    pub fn watch(mut self, actuator_index: u8) -> Self {
        // Silently capped: more watched entries than actuators exist
        // cannot occur in a well-formed configuration
        self.watched.push(actuator_index).ok();
        self
    }

    pub(crate) fn watched(&self) -> &[u8] {
        &self.watched
    }

    /// Recomputes the lamp level from `is_on` and writes the pin on
    /// change.
    pub(crate) fn refresh<F: Fn(u8) -> bool>(&mut self, is_on: F) {
        let new_state = match self.mode {
            IndicatorMode::Any => self.watched.iter().any(|&i| is_on(i)),
            IndicatorMode::All => self.watched.iter().all(|&i| is_on(i)),
            IndicatorMode::Majority => {
                let on = self.watched.iter().filter(|&&i| is_on(i)).count();
                on * 2 > self.watched.len()
            }
        };

        if new_state != self.state {
            self.state = new_state;
            self.pin.set(new_state);
        }
    }

    pub fn state(&self) -> bool {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Pin(Rc<Cell<bool>>);

    impl OutputPin for Pin {
        fn set(&mut self, on: bool) {
            self.0.set(on);
        }
    }

    fn lamp(mode: IndicatorMode) -> (Indicator<Pin>, Rc<Cell<bool>>) {
        let level = Rc::new(Cell::new(false));
        let ind = Indicator::new(Pin(level.clone()))
            .mode(mode)
            .watch(0)
            .watch(1)
            .watch(2)
            .watch(3);
        (ind, level)
    }

    fn refresh_with(ind: &mut Indicator<Pin>, states: [bool; 4]) {
        ind.refresh(|i| states[i as usize]);
    }

    #[test]
    fn any_mode() {
        let (mut ind, level) = lamp(IndicatorMode::Any);

        refresh_with(&mut ind, [false, false, false, false]);
        assert!(!level.get());

        refresh_with(&mut ind, [false, false, true, false]);
        assert!(level.get());
    }

    #[test]
    fn all_mode() {
        let (mut ind, level) = lamp(IndicatorMode::All);

        refresh_with(&mut ind, [true, true, true, false]);
        assert!(!level.get());

        refresh_with(&mut ind, [true, true, true, true]);
        assert!(level.get());
    }

    #[test]
    fn majority_mode_resolves_ties_to_off() {
        let (mut ind, level) = lamp(IndicatorMode::Majority);

        // Exactly half on: off
        refresh_with(&mut ind, [true, true, false, false]);
        assert!(!level.get());

        refresh_with(&mut ind, [true, true, true, false]);
        assert!(level.get());
    }

    #[test]
    fn pin_written_only_on_change() {
        let (mut ind, level) = lamp(IndicatorMode::Any);

        refresh_with(&mut ind, [true, false, false, false]);
        assert!(level.get());

        // Force a different hardware level behind the indicator's back;
        // an unchanged recompute must not rewrite the pin
        level.set(false);
        refresh_with(&mut ind, [false, true, false, false]);
        assert!(!level.get());
        assert!(ind.state());
    }
}
