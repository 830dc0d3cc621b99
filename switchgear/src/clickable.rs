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

//! A push-button input and its click classification state machine.

use bitflags::bitflags;
use heapless::Vec;

use crate::hal::InputPin;
use crate::time::elapsed;
use crate::timings;
use crate::MAX_ACTUATORS;

bitflags! {
    /// Capability and bookkeeping bits of a clickable.
    ///
    /// `QUICK`, `VALID` and `CHECKED` are derived by [`Clickable::check`];
    /// the rest come from configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClickFlags: u8 {
        const SHORT = 0x01;
        const LONG = 0x02;
        const SUPER_LONG = 0x04;
        const NET_LONG = 0x08;
        const NET_SUPER_LONG = 0x10;
        /// Short-only button: the short click fires on the debounced
        /// press instead of on release.
        const QUICK = 0x20;
        const VALID = 0x40;
        const CHECKED = 0x80;
    }
}

/// The three press classes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClickKind {
    Short,
    Long,
    SuperLong,
}

/// What a long click does to its linked actuators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LongClickKind {
    /// Turn the group on iff strictly less than half of it is on.
    Normal,
    OnOnly,
    OffOnly,
}

/// What a super-long click switches off.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SuperLongClickKind {
    /// Every unprotected actuator on the device.
    Normal,
    /// Only the unprotected actuators linked to this clickable.
    Selective,
}

/// What happens to a network click when the bridge does not answer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkFallback {
    LocalFallback,
    DoNothing,
}

/// The outcome of one [`Clickable::click_detection`] call.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClickResult {
    NoClick,
    /// Fired on release, after a press shorter than the long threshold.
    ShortClick,
    /// Fired on the debounced press of a short-only button.
    ShortClickQuick,
    LongClick,
    SuperLongClick,
    /// The button is held but no threshold was crossed this call.
    NoClickKeepingClicked,
    /// Released after a plain press on a button with no short action.
    NoClickNotShortClickable,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum FsmState {
    Idle,
    Debouncing,
    Pressed,
    Released,
}

// Ordered: a fired SUPER_LONG suppresses a later LONG in the same press.
#[derive(Debug, PartialEq, Eq, PartialOrd, Clone, Copy)]
enum ActionFired {
    None,
    Long,
    SuperLong,
}

/// A digital input interpreted as a push-button.
///
/// Construction is builder-style; every setter consumes and returns the
/// clickable so configurations read as one chain:
///
/// ```ignore
/// Clickable::new(pin, 7)
///     .link_short(r7)
///     .long(LongClickKind::Normal)
///     .long_ms(900)
///     .link_long(r7)
///     .super_long(SuperLongClickKind::Selective)
///     .link_super_long(r7)
/// ```
pub struct Clickable<I> {
    pin: I,
    id: u8,
    index: u8,

    flags: ClickFlags,
    long_kind: LongClickKind,
    super_long_kind: SuperLongClickKind,
    long_fallback: NetworkFallback,
    super_long_fallback: NetworkFallback,

    debounce_ms: u16,
    long_ms: u16,
    super_long_ms: u16,

    state: FsmState,
    state_change_ms: u32,
    last_action: ActionFired,
    links_overflowed: bool,

    links_short: Vec<u8, MAX_ACTUATORS>,
    links_long: Vec<u8, MAX_ACTUATORS>,
    links_super_long: Vec<u8, MAX_ACTUATORS>,
}

impl<I: InputPin> Clickable<I> {
    /// Creates a clickable on `pin` with the device-unique `id` (> 0).
    /// New clickables are short clickable until told otherwise.
    pub fn new(pin: I, id: u8) -> Self {
        Self {
            pin,
            id,
            index: 0,
            flags: ClickFlags::SHORT,
            long_kind: LongClickKind::Normal,
            super_long_kind: SuperLongClickKind::Normal,
            long_fallback: NetworkFallback::LocalFallback,
            super_long_fallback: NetworkFallback::LocalFallback,
            debounce_ms: timings::CLICKABLE_DEBOUNCE_MS,
            long_ms: timings::CLICKABLE_LONG_CLICK_MS,
            super_long_ms: timings::CLICKABLE_SUPER_LONG_CLICK_MS,
            state: FsmState::Idle,
            state_change_ms: 0,
            last_action: ActionFired::None,
            links_overflowed: false,
            links_short: Vec::new(),
            links_long: Vec::new(),
            links_super_long: Vec::new(),
        }
    }

    /// Enables or disables the short click action.
    pub fn short(mut self, enabled: bool) -> Self {
        self.flags.set(ClickFlags::SHORT, enabled);
        self
    }

    /// Enables the long click action, performed locally.
    pub fn long(mut self, kind: LongClickKind) -> Self {
        self.flags.insert(ClickFlags::LONG);
        self.long_kind = kind;
        self
    }

    /// Enables the long click action, requested from the orchestrator
    /// first and answered locally per `fallback` on timeout.
    pub fn long_networked(mut self, kind: LongClickKind, fallback: NetworkFallback) -> Self {
        self.flags.insert(ClickFlags::LONG | ClickFlags::NET_LONG);
        self.long_kind = kind;
        self.long_fallback = fallback;
        self
    }

    /// Enables the super-long click action, performed locally.
    pub fn super_long(mut self, kind: SuperLongClickKind) -> Self {
        self.flags.insert(ClickFlags::SUPER_LONG);
        self.super_long_kind = kind;
        self
    }

    /// Enables the super-long click action over the network.
    pub fn super_long_networked(
        mut self,
        kind: SuperLongClickKind,
        fallback: NetworkFallback,
    ) -> Self {
        self.flags
            .insert(ClickFlags::SUPER_LONG | ClickFlags::NET_SUPER_LONG);
        self.super_long_kind = kind;
        self.super_long_fallback = fallback;
        self
    }

    pub fn link_short(mut self, actuator_index: u8) -> Self {
        self.links_overflowed |= self.links_short.push(actuator_index).is_err();
        self
    }

    pub fn link_long(mut self, actuator_index: u8) -> Self {
        self.links_overflowed |= self.links_long.push(actuator_index).is_err();
        self
    }

    pub fn link_super_long(mut self, actuator_index: u8) -> Self {
        self.links_overflowed |= self.links_super_long.push(actuator_index).is_err();
        self
    }

    pub fn debounce_ms(mut self, ms: u16) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn long_ms(mut self, ms: u16) -> Self {
        self.long_ms = ms;
        self
    }

    pub fn super_long_ms(mut self, ms: u16) -> Self {
        self.super_long_ms = ms;
        self
    }

    /// Derives the QUICK/VALID/CHECKED bits from the configuration.
    ///
    /// A clickable is valid when at least one click class is enabled and
    /// at least one actuator is linked.
    pub(crate) fn check(&mut self) -> bool {
        self.flags.insert(ClickFlags::CHECKED);
        self.flags.set(
            ClickFlags::QUICK,
            self.flags.contains(ClickFlags::SHORT)
                && !self.flags.contains(ClickFlags::LONG)
                && !self.flags.contains(ClickFlags::SUPER_LONG),
        );

        let clickable = self
            .flags
            .intersects(ClickFlags::SHORT | ClickFlags::LONG | ClickFlags::SUPER_LONG);
        let linked = !self.links_short.is_empty()
            || !self.links_long.is_empty()
            || !self.links_super_long.is_empty();

        self.flags.set(ClickFlags::VALID, clickable && linked);
        self.flags.contains(ClickFlags::VALID)
    }

    /// Reads the input once and advances the state machine.
    ///
    /// At most one transition happens per call; when a held press has
    /// crossed both timed thresholds since the previous call, super-long
    /// wins and the long click is suppressed for the rest of the press.
    pub fn click_detection(&mut self, now: u32) -> ClickResult {
        let pressed = self.pin.is_high();

        match self.state {
            FsmState::Idle => {
                if pressed {
                    self.state = FsmState::Debouncing;
                    self.state_change_ms = now;
                }
                ClickResult::NoClick
            }

            FsmState::Debouncing => {
                if elapsed(now, self.state_change_ms) >= self.debounce_ms as u32 {
                    if pressed {
                        // Press confirmed; this is the official start of
                        // the press.
                        self.state = FsmState::Pressed;
                        self.state_change_ms = now;
                        self.last_action = ActionFired::None;
                        if self.flags.contains(ClickFlags::QUICK) {
                            return ClickResult::ShortClickQuick;
                        }
                    } else {
                        // Bounce or noise
                        self.state = FsmState::Idle;
                    }
                }
                ClickResult::NoClick
            }

            FsmState::Pressed => {
                if pressed {
                    let held = elapsed(now, self.state_change_ms);

                    if self.flags.contains(ClickFlags::SUPER_LONG)
                        && self.last_action < ActionFired::SuperLong
                        && held >= self.super_long_ms as u32
                    {
                        self.last_action = ActionFired::SuperLong;
                        return ClickResult::SuperLongClick;
                    }

                    if self.flags.contains(ClickFlags::LONG)
                        && self.last_action < ActionFired::Long
                        && held >= self.long_ms as u32
                    {
                        self.last_action = ActionFired::Long;
                        return ClickResult::LongClick;
                    }

                    return ClickResult::NoClickKeepingClicked;
                }

                // Released: classify in the same call
                self.state = FsmState::Released;
                self.release()
            }

            FsmState::Released => self.release(),
        }
    }

    fn release(&mut self) -> ClickResult {
        self.state = FsmState::Idle;

        // A quick button already fired on press
        if self.flags.contains(ClickFlags::QUICK) {
            return ClickResult::NoClick;
        }

        if self.last_action == ActionFired::None {
            return if self.flags.contains(ClickFlags::SHORT) {
                ClickResult::ShortClick
            } else {
                ClickResult::NoClickNotShortClickable
            };
        }

        // A timed action already fired during this press
        ClickResult::NoClick
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: u8) {
        self.index = index;
    }

    pub fn flags(&self) -> ClickFlags {
        self.flags
    }

    pub fn is_valid(&self) -> bool {
        self.flags.contains(ClickFlags::VALID)
    }

    pub(crate) fn links_overflowed(&self) -> bool {
        self.links_overflowed
    }

    pub fn long_kind(&self) -> LongClickKind {
        self.long_kind
    }

    pub fn super_long_kind(&self) -> SuperLongClickKind {
        self.super_long_kind
    }

    /// Whether `kind` is delegated to the orchestrator. Short clicks never
    /// are.
    pub fn is_networked(&self, kind: ClickKind) -> bool {
        match kind {
            ClickKind::Long => self.flags.contains(ClickFlags::NET_LONG),
            ClickKind::SuperLong => self.flags.contains(ClickFlags::NET_SUPER_LONG),
            ClickKind::Short => false,
        }
    }

    pub fn fallback_for(&self, kind: ClickKind) -> NetworkFallback {
        match kind {
            ClickKind::Long => self.long_fallback,
            ClickKind::SuperLong => self.super_long_fallback,
            ClickKind::Short => NetworkFallback::DoNothing,
        }
    }

    /// The actuator indices linked to `kind`.
    pub fn links(&self, kind: ClickKind) -> &[u8] {
        match kind {
            ClickKind::Short => &self.links_short,
            ClickKind::Long => &self.links_long,
            ClickKind::SuperLong => &self.links_super_long,
        }
    }
}
