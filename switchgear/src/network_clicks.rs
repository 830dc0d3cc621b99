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

//! Coordination of clicks delegated to the remote orchestrator.
//!
//! A long or super-long click on a network-enabled clickable is sent to
//! the bridge as a request (`c=0`) and parked here with its request time.
//! Three things can happen to a parked entry:
//!
//! - the bridge ACKs in time: the device emits the confirm (`c=1`) and
//!   the entry is dropped — no local action;
//! - the deadline passes, or the bridge orders a failover: the entry is
//!   dropped and, if the clickable is configured with a local fallback,
//!   the local click action runs;
//! - nothing is configured: the entry is dropped silently.
//!
//! Timeout here is the normal cancellation path, not an error. An ACK for
//! an entry that already expired is ignored because the entry is gone.

use heapless::{LinearMap, Vec};
use log::debug;

use crate::clickable::{ClickKind, NetworkFallback};
use crate::error::Error;
use crate::hal::{InputPin, OutputPin, SerialIo};
use crate::registry::Registry;
use crate::time::elapsed;
use crate::timings;
use crate::transport::SerialLink;
use crate::wire::WireClickKind;
use crate::MAX_CLICKABLES;

/// Pending request tables, one per delegable click kind, keyed by
/// clickable index and holding the request time.
#[derive(Default)]
pub struct NetworkClicks {
    pending_long: LinearMap<u8, u32, MAX_CLICKABLES>,
    pending_super_long: LinearMap<u8, u32, MAX_CLICKABLES>,
}

fn wire_kind(kind: ClickKind) -> Option<WireClickKind> {
    match kind {
        ClickKind::Long => Some(WireClickKind::Long),
        ClickKind::SuperLong => Some(WireClickKind::SuperLong),
        ClickKind::Short => None,
    }
}

impl NetworkClicks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ClickKind) -> Option<&LinearMap<u8, u32, MAX_CLICKABLES>> {
        match kind {
            ClickKind::Long => Some(&self.pending_long),
            ClickKind::SuperLong => Some(&self.pending_super_long),
            ClickKind::Short => None,
        }
    }

    fn table_mut(&mut self, kind: ClickKind) -> Option<&mut LinearMap<u8, u32, MAX_CLICKABLES>> {
        match kind {
            ClickKind::Long => Some(&mut self.pending_long),
            ClickKind::SuperLong => Some(&mut self.pending_super_long),
            ClickKind::Short => None,
        }
    }

    /// True while any request of either kind is parked.
    pub fn any_pending(&self) -> bool {
        !self.pending_long.is_empty() || !self.pending_super_long.is_empty()
    }

    pub fn is_pending(&self, index: u8, kind: ClickKind) -> bool {
        self.table(kind).is_some_and(|t| t.contains_key(&index))
    }

    /// Sends the request record and parks the entry.
    ///
    /// The entry is parked before the write so that a transmit hiccup
    /// still ends in the fallback instead of losing the press.
    pub fn request<S: SerialIo>(
        &mut self,
        link: &mut SerialLink<S>,
        clickable_id: u8,
        index: u8,
        kind: ClickKind,
        now: u32,
    ) -> Result<(), Error> {
        let Some(wire) = wire_kind(kind) else {
            return Ok(());
        };
        if let Some(table) = self.table_mut(kind) {
            // A repeated press refreshes the deadline
            let _ = table.insert(index, now);
        }
        debug!("network click request: clickable {} kind {:?}", clickable_id, kind);
        link.send_network_click(wire, clickable_id, false, now)
    }

    /// Answers an ACK: emits the confirm record and drops the entry.
    ///
    /// Returns whether any entries remain parked (in either table), which
    /// tells the scheduler to keep its timer sweep armed.
    pub fn confirm<S: SerialIo>(
        &mut self,
        link: &mut SerialLink<S>,
        clickable_id: u8,
        index: u8,
        kind: ClickKind,
        now: u32,
    ) -> Result<bool, Error> {
        let Some(wire) = wire_kind(kind) else {
            return Ok(self.any_pending());
        };
        link.send_network_click(wire, clickable_id, true, now)?;
        if let Some(table) = self.table_mut(kind) {
            table.remove(&index);
        }
        debug!("network click confirmed: clickable {}", clickable_id);
        Ok(self.any_pending())
    }

    /// True when no live entry exists for `(index, kind)`.
    ///
    /// An entry past its deadline is removed on the way out, so a late
    /// ACK finds nothing to confirm.
    pub fn is_expired(&mut self, index: u8, kind: ClickKind, now: u32) -> bool {
        let Some(table) = self.table_mut(kind) else {
            return true;
        };
        let Some(&requested) = table.get(&index) else {
            return true;
        };
        if elapsed(now, requested) > timings::NETWORK_CLICK_TIMEOUT_MS {
            table.remove(&index);
            return true;
        }
        false
    }

    /// Retires one entry if it expired (or unconditionally under
    /// `force_failover`), running the configured fallback.
    ///
    /// Returns whether the fallback changed any actuator state.
    pub fn check_one<I: InputPin, O: OutputPin>(
        &mut self,
        registry: &mut Registry<I, O>,
        index: u8,
        kind: ClickKind,
        force_failover: bool,
        now: u32,
    ) -> bool {
        let Some(table) = self.table_mut(kind) else {
            return false;
        };
        let Some(&requested) = table.get(&index) else {
            return false;
        };
        if !force_failover && elapsed(now, requested) <= timings::NETWORK_CLICK_TIMEOUT_MS {
            return false;
        }

        debug!("network click retired: clickable index {} kind {:?}", index, kind);
        let mut changed = false;
        if fallback_of(registry, index, kind) == NetworkFallback::LocalFallback {
            changed = registry.click(index, kind, now);
        }
        if let Some(table) = self.table_mut(kind) {
            table.remove(&index);
        }
        changed
    }

    /// Retires every expired entry in both tables (every entry under
    /// `force_failover`), running fallbacks where configured.
    ///
    /// Returns whether any fallback changed actuator state.
    pub fn check_all<I: InputPin, O: OutputPin>(
        &mut self,
        registry: &mut Registry<I, O>,
        force_failover: bool,
        now: u32,
    ) -> bool {
        let mut changed = false;
        for kind in [ClickKind::Long, ClickKind::SuperLong] {
            // Collect first: the fallback action must not run while the
            // table is being iterated
            let mut due: Vec<u8, MAX_CLICKABLES> = Vec::new();
            if let Some(table) = self.table(kind) {
                for (&index, &requested) in table.iter() {
                    if force_failover || elapsed(now, requested) > timings::NETWORK_CLICK_TIMEOUT_MS
                    {
                        due.push(index).ok();
                    }
                }
            }

            for index in due {
                debug!("network click expired: clickable index {} kind {:?}", index, kind);
                if fallback_of(registry, index, kind) == NetworkFallback::LocalFallback {
                    changed |= registry.click(index, kind, now);
                }
                if let Some(table) = self.table_mut(kind) {
                    table.remove(&index);
                }
            }
        }
        changed
    }
}

fn fallback_of<I: InputPin, O: OutputPin>(
    registry: &Registry<I, O>,
    index: u8,
    kind: ClickKind,
) -> NetworkFallback {
    registry
        .clickable(index)
        .map(|c| c.fallback_for(kind))
        .unwrap_or(NetworkFallback::DoNothing)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::actuator::Actuator;
    use crate::clickable::{Clickable, LongClickKind};
    use crate::hal::SerialIo;

    struct In;

    impl InputPin for In {
        fn is_high(&mut self) -> bool {
            false
        }
    }

    struct Out(Rc<Cell<bool>>);

    impl OutputPin for Out {
        fn set(&mut self, on: bool) {
            self.0.set(on);
        }
    }

    #[derive(Default)]
    struct Loopback {
        inbound: Rc<std::cell::RefCell<VecDeque<u8>>>,
        outbound: Rc<std::cell::RefCell<std::vec::Vec<u8>>>,
    }

    impl SerialIo for Loopback {
        fn has_input(&mut self) -> bool {
            !self.inbound.borrow().is_empty()
        }
        fn read(&mut self) -> Option<u8> {
            self.inbound.borrow_mut().pop_front()
        }
        fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
            self.outbound.borrow_mut().extend_from_slice(data);
            Ok(())
        }
    }

    const T0: u32 = 10_000;

    type Outbound = Rc<std::cell::RefCell<std::vec::Vec<u8>>>;

    fn rig(
        fallback: NetworkFallback,
    ) -> (
        Registry<In, Out>,
        NetworkClicks,
        SerialLink<Loopback>,
        Rc<Cell<bool>>,
        u8,
        Outbound,
    ) {
        let level = Rc::new(Cell::new(false));
        let mut registry = Registry::new();
        let a = registry
            .add_actuator(Actuator::new(Out(level.clone()), 1), 0)
            .unwrap();
        let c = registry
            .add_clickable(
                Clickable::new(In, 1)
                    .long_networked(LongClickKind::Normal, fallback)
                    .link_long(a),
            )
            .unwrap();
        registry.finalize().unwrap();

        let port = Loopback::default();
        let outbound = port.outbound.clone();
        (
            registry,
            NetworkClicks::new(),
            SerialLink::new(port),
            level,
            c,
            outbound,
        )
    }

    #[test]
    fn request_parks_and_emits() {
        let (_registry, mut net, mut link, _level, c, outbound) =
            rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        assert!(net.is_pending(c, ClickKind::Long));
        assert!(net.any_pending());
        assert!(!outbound.borrow().is_empty());
    }

    #[test]
    fn confirm_drops_the_entry_and_reports_whats_left() {
        let (_registry, mut net, mut link, _level, c, ..) = rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        let remain = net.confirm(&mut link, 1, c, ClickKind::Long, T0 + 100).unwrap();
        assert!(!remain);
        assert!(!net.any_pending());
    }

    #[test]
    fn expiry_removes_the_entry_on_the_way_out() {
        let (_registry, mut net, mut link, _level, c, ..) = rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        assert!(!net.is_expired(c, ClickKind::Long, T0 + timings::NETWORK_CLICK_TIMEOUT_MS));
        assert!(net.is_expired(c, ClickKind::Long, T0 + timings::NETWORK_CLICK_TIMEOUT_MS + 1));
        // The late ACK finds nothing
        assert!(!net.is_pending(c, ClickKind::Long));
    }

    #[test]
    fn timeout_runs_the_local_fallback_exactly_once() {
        let (mut registry, mut net, mut link, level, c, ..) = rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();

        // Before the deadline nothing happens
        assert!(!net.check_all(&mut registry, false, T0 + 500));
        assert!(!level.get());

        let due = T0 + timings::NETWORK_CLICK_TIMEOUT_MS + 1;
        assert!(net.check_all(&mut registry, false, due));
        assert!(level.get());
        assert!(!net.any_pending());

        // A second sweep is a no-op
        assert!(!net.check_all(&mut registry, false, due + 100));
    }

    #[test]
    fn do_nothing_fallback_changes_no_state() {
        let (mut registry, mut net, mut link, level, c, ..) = rig(NetworkFallback::DoNothing);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        assert!(!net.check_all(
            &mut registry,
            false,
            T0 + timings::NETWORK_CLICK_TIMEOUT_MS + 1
        ));
        assert!(!level.get());
        assert!(!net.any_pending());
    }

    #[test]
    fn force_failover_ignores_the_deadline() {
        let (mut registry, mut net, mut link, level, c, ..) = rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        assert!(net.check_all(&mut registry, true, T0 + 10));
        assert!(level.get());
        assert!(!net.any_pending());
    }

    #[test]
    fn check_one_targets_a_single_entry() {
        let (mut registry, mut net, mut link, level, c, ..) = rig(NetworkFallback::LocalFallback);

        net.request(&mut link, 1, c, ClickKind::Long, T0).unwrap();
        assert!(!net.check_one(&mut registry, c, ClickKind::SuperLong, true, T0 + 10));
        assert!(net.is_pending(c, ClickKind::Long));

        assert!(net.check_one(&mut registry, c, ClickKind::Long, true, T0 + 10));
        assert!(level.get());
        assert!(!net.any_pending());
    }
}
