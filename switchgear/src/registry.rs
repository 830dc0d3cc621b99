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

//! Fixed-capacity stores for the device's peripherals.
//!
//! Clickables and indicators refer to actuators only through `u8` indices
//! into the actuator store, assigned sequentially at registration. Ids are
//! the stable external names used on the wire; the id→index maps make the
//! translation O(1)-ish and double as the duplicate-id detector.

use heapless::{LinearMap, Vec};
use log::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::clickable::{ClickFlags, ClickKind, Clickable, LongClickKind, SuperLongClickKind};
use crate::error::{Error, ErrorCode};
use crate::hal::{InputPin, OutputPin};
use crate::indicator::Indicator;
use crate::{MAX_ACTUATORS, MAX_CLICKABLES, MAX_INDICATORS};

pub struct Registry<I, O> {
    actuators: Vec<Actuator<O>, MAX_ACTUATORS>,
    actuator_index_by_id: LinearMap<u8, u8, MAX_ACTUATORS>,
    auto_off_indexes: Vec<u8, MAX_ACTUATORS>,
    clickables: Vec<Clickable<I>, MAX_CLICKABLES>,
    clickable_index_by_id: LinearMap<u8, u8, MAX_CLICKABLES>,
    indicators: Vec<Indicator<O>, MAX_INDICATORS>,
    finalized: bool,
}

impl<I, O> Default for Registry<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> Registry<I, O> {
    pub fn new() -> Self {
        Self {
            actuators: Vec::new(),
            actuator_index_by_id: LinearMap::new(),
            auto_off_indexes: Vec::new(),
            clickables: Vec::new(),
            clickable_index_by_id: LinearMap::new(),
            indicators: Vec::new(),
            finalized: false,
        }
    }
}

impl<I: InputPin, O: OutputPin> Registry<I, O> {
    /// Ingests an actuator, applies its default level to the hardware and
    /// returns its index.
    pub fn add_actuator(&mut self, mut actuator: Actuator<O>, now: u32) -> Result<u8, Error> {
        if self.finalized {
            return Err(ErrorCode::InvalidState.into());
        }
        if actuator.id() == 0 {
            error!("actuator id 0 is reserved");
            return Err(ErrorCode::InvalidConfig.into());
        }
        if self.actuators.is_full() {
            error!("wrong actuators number");
            return Err(ErrorCode::ResourceExhausted.into());
        }

        let index = self.actuators.len() as u8;
        // A duplicate id silently overwrites here; finalize() compares map
        // and store sizes and turns that into a fatal error
        self.actuator_index_by_id
            .insert(actuator.id(), index)
            .map_err(|_| ErrorCode::ResourceExhausted)?;
        actuator.apply_default(now);
        debug!("actuator id {} at index {}", actuator.id(), index);
        self.actuators
            .push(actuator)
            .map_err(|_| ErrorCode::ResourceExhausted)?;
        Ok(index)
    }

    /// Ingests a clickable and returns its index.
    pub fn add_clickable(&mut self, mut clickable: Clickable<I>) -> Result<u8, Error> {
        if self.finalized {
            return Err(ErrorCode::InvalidState.into());
        }
        if clickable.id() == 0 {
            error!("clickable id 0 is reserved");
            return Err(ErrorCode::InvalidConfig.into());
        }
        if self.clickables.is_full() {
            error!("wrong clickables number");
            return Err(ErrorCode::ResourceExhausted.into());
        }

        let index = self.clickables.len() as u8;
        self.clickable_index_by_id
            .insert(clickable.id(), index)
            .map_err(|_| ErrorCode::ResourceExhausted)?;
        clickable.set_index(index);
        debug!("clickable id {} at index {}", clickable.id(), index);
        self.clickables
            .push(clickable)
            .map_err(|_| ErrorCode::ResourceExhausted)?;
        Ok(index)
    }

    /// Ingests an indicator and returns its index.
    pub fn add_indicator(&mut self, indicator: Indicator<O>) -> Result<u8, Error> {
        if self.finalized {
            return Err(ErrorCode::InvalidState.into());
        }
        if self.indicators.is_full() {
            error!("wrong indicators number");
            return Err(ErrorCode::ResourceExhausted.into());
        }

        let index = self.indicators.len() as u8;
        self.indicators
            .push(indicator)
            .map_err(|_| ErrorCode::ResourceExhausted)?;
        Ok(index)
    }

    /// Closes the configuration phase.
    ///
    /// Validates ids and actuator links, derives each clickable's
    /// capability bits and precomputes the auto-off sweep set. Errors here
    /// are configuration-fatal.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }

        if self.actuator_index_by_id.len() != self.actuators.len() {
            error!("duplicate actuators id");
            return Err(ErrorCode::Duplicate.into());
        }
        if self.clickable_index_by_id.len() != self.clickables.len() {
            error!("duplicate clickables id");
            return Err(ErrorCode::Duplicate.into());
        }

        let actuator_count = self.actuators.len() as u8;
        for clickable in &mut self.clickables {
            if clickable.links_overflowed() {
                error!("clickable {} links overflow", clickable.id());
                return Err(ErrorCode::InvalidConfig.into());
            }
            for kind in [ClickKind::Short, ClickKind::Long, ClickKind::SuperLong] {
                if let Some(&bad) = clickable.links(kind).iter().find(|&&i| i >= actuator_count) {
                    error!("clickable {} links missing actuator {}", clickable.id(), bad);
                    return Err(ErrorCode::InvalidConfig.into());
                }
            }
            if !clickable.check() {
                warn!("clickable {} has no action or no linked actuator", clickable.id());
            }
        }

        for indicator in &self.indicators {
            if indicator.watched().iter().any(|&i| i >= actuator_count) {
                error!("indicator watches a missing actuator");
                return Err(ErrorCode::InvalidConfig.into());
            }
        }

        self.auto_off_indexes.clear();
        for (index, actuator) in self.actuators.iter().enumerate() {
            if actuator.has_auto_off() {
                self.auto_off_indexes
                    .push(index as u8)
                    .map_err(|_| ErrorCode::ResourceExhausted)?;
            }
        }

        self.finalized = true;
        info!(
            "registry finalized: {} actuators, {} clickables, {} indicators",
            self.actuators.len(),
            self.clickables.len(),
            self.indicators.len()
        );
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }

    pub fn clickable_count(&self) -> usize {
        self.clickables.len()
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    pub fn actuator(&self, index: u8) -> Option<&Actuator<O>> {
        self.actuators.get(index as usize)
    }

    pub fn clickable(&self, index: u8) -> Option<&Clickable<I>> {
        self.clickables.get(index as usize)
    }

    pub fn actuator_index(&self, id: u8) -> Option<u8> {
        self.actuator_index_by_id.get(&id).copied()
    }

    pub fn clickable_index(&self, id: u8) -> Option<u8> {
        self.clickable_index_by_id.get(&id).copied()
    }

    pub fn actuator_exists(&self, id: u8) -> bool {
        self.actuator_index_by_id.contains_key(&id)
    }

    pub fn clickable_exists(&self, id: u8) -> bool {
        self.clickable_index_by_id.contains_key(&id)
    }

    /// Actuator ids in index order, for DEVICE_DETAILS.
    pub fn actuator_ids(&self) -> Vec<u8, MAX_ACTUATORS> {
        self.actuators.iter().map(|a| a.id()).collect()
    }

    /// Clickable ids in index order, for DEVICE_DETAILS.
    pub fn clickable_ids(&self) -> Vec<u8, MAX_CLICKABLES> {
        self.clickables.iter().map(|c| c.id()).collect()
    }

    /// Actuator states in index order, for ACTUATORS_STATE.
    pub fn state_vector(&self) -> Vec<bool, MAX_ACTUATORS> {
        self.actuators.iter().map(|a| a.state()).collect()
    }

    /// Advances the FSM of the clickable at `index`.
    pub fn click_detection(&mut self, index: u8, now: u32) -> crate::clickable::ClickResult {
        match self.clickables.get_mut(index as usize) {
            Some(clickable) => clickable.click_detection(now),
            None => crate::clickable::ClickResult::NoClick,
        }
    }

    /// Toggles every short-linked actuator of the clickable at `index`.
    pub fn short_click(&mut self, index: u8, now: u32) -> bool {
        let Self {
            clickables,
            actuators,
            ..
        } = self;
        let Some(clickable) = clickables.get(index as usize) else {
            return false;
        };
        if !clickable.flags().contains(ClickFlags::SHORT) {
            return false;
        }

        let mut changed = false;
        for &ai in clickable.links(ClickKind::Short) {
            if let Some(actuator) = actuators.get_mut(ai as usize) {
                changed |= actuator.toggle(now);
            }
        }
        changed
    }

    /// Drives every long-linked actuator of the clickable at `index` to
    /// the level selected by its long click kind.
    pub fn long_click(&mut self, index: u8, now: u32) -> bool {
        let Self {
            clickables,
            actuators,
            ..
        } = self;
        let Some(clickable) = clickables.get(index as usize) else {
            return false;
        };
        if !clickable.flags().contains(ClickFlags::LONG) {
            return false;
        }

        let links = clickable.links(ClickKind::Long);
        let target = match clickable.long_kind() {
            LongClickKind::Normal => {
                let on = links
                    .iter()
                    .filter(|&&i| actuators.get(i as usize).is_some_and(|a| a.state()))
                    .count();
                // Strictly less than half on: switch the group on.
                // Exactly half resolves to off.
                on * 2 < links.len()
            }
            LongClickKind::OnOnly => true,
            LongClickKind::OffOnly => false,
        };

        let mut changed = false;
        for &ai in links {
            if let Some(actuator) = actuators.get_mut(ai as usize) {
                changed |= actuator.set_state(target, now);
            }
        }
        changed
    }

    /// Switches off the unprotected super-long-linked actuators of the
    /// clickable at `index`.
    pub fn super_long_click_selective(&mut self, index: u8, now: u32) -> bool {
        let Self {
            clickables,
            actuators,
            ..
        } = self;
        let Some(clickable) = clickables.get(index as usize) else {
            return false;
        };
        if !clickable.flags().contains(ClickFlags::SUPER_LONG)
            || clickable.super_long_kind() != SuperLongClickKind::Selective
        {
            return false;
        }

        let mut changed = false;
        for &ai in clickable.links(ClickKind::SuperLong) {
            if let Some(actuator) = actuators.get_mut(ai as usize) {
                if !actuator.is_protected() {
                    changed |= actuator.set_state(false, now);
                }
            }
        }
        changed
    }

    /// Performs the local action for any click kind. The NORMAL variant of
    /// a super-long click sweeps the whole device, which is why this lives
    /// on the registry and not on the clickable.
    pub fn click(&mut self, index: u8, kind: ClickKind, now: u32) -> bool {
        match kind {
            ClickKind::Short => self.short_click(index, now),
            ClickKind::Long => self.long_click(index, now),
            ClickKind::SuperLong => {
                let Some(clickable) = self.clickables.get(index as usize) else {
                    return false;
                };
                if !clickable.flags().contains(ClickFlags::SUPER_LONG) {
                    return false;
                }
                match clickable.super_long_kind() {
                    SuperLongClickKind::Normal => self.turn_off_unprotected(now),
                    SuperLongClickKind::Selective => self.super_long_click_selective(index, now),
                }
            }
        }
    }

    /// Switches off every actuator that is not protected.
    pub fn turn_off_unprotected(&mut self, now: u32) -> bool {
        let mut changed = false;
        for actuator in &mut self.actuators {
            if !actuator.is_protected() {
                changed |= actuator.set_state(false, now);
            }
        }
        changed
    }

    /// Switches off every actuator, protected or not.
    pub fn turn_off_all(&mut self, now: u32) -> bool {
        let mut changed = false;
        for actuator in &mut self.actuators {
            changed |= actuator.set_state(false, now);
        }
        changed
    }

    /// Switches the actuator at `index` to `on`.
    pub fn set_actuator_state(&mut self, index: u8, on: bool, now: u32) -> bool {
        match self.actuators.get_mut(index as usize) {
            Some(actuator) => actuator.set_state(on, now),
            None => false,
        }
    }

    /// Applies a full state vector; element value 1 means on, anything
    /// else off. The caller has already checked the length.
    pub fn apply_state_vector(&mut self, states: &[u8], now: u32) -> bool {
        let mut changed = false;
        for (actuator, &s) in self.actuators.iter_mut().zip(states) {
            changed |= actuator.set_state(s == 1, now);
        }
        changed
    }

    /// Runs the auto-off check on the precomputed subset of actuators that
    /// carry a timer.
    pub fn auto_off_sweep(&mut self, now: u32) -> bool {
        let Self {
            actuators,
            auto_off_indexes,
            ..
        } = self;
        let mut changed = false;
        for &index in auto_off_indexes.iter() {
            if let Some(actuator) = actuators.get_mut(index as usize) {
                changed |= actuator.check_auto_off(now);
            }
        }
        changed
    }

    /// Recomputes every indicator from the current actuator states.
    pub fn refresh_indicators(&mut self) {
        let Self {
            indicators,
            actuators,
            ..
        } = self;
        for indicator in indicators.iter_mut() {
            indicator.refresh(|i| actuators.get(i as usize).is_some_and(|a| a.state()));
        }
    }
}
