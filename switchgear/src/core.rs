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

//! The node root object and its super-loop.
//!
//! [`Node`] owns every subsystem and threads them through one cooperative
//! tick; nothing in the engine blocks, yields or allocates. The tick
//! order is fixed: input polling, inbound drain, network-click timers,
//! auto-off sweep, then the gated state broadcast. Within one tick every
//! timing decision sees the same cached `now`.

use log::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::clickable::{ClickKind, ClickResult, Clickable, NetworkFallback};
use crate::dispatch::dispatch;
use crate::error::Error;
use crate::hal::{InputPin, OutputPin, Reset, SerialIo};
use crate::indicator::Indicator;
use crate::network_clicks::NetworkClicks;
use crate::registry::Registry;
use crate::time::{elapsed, Clock, TimeKeeper};
use crate::timings;
use crate::transport::SerialLink;

/// The engine root: registry, pending network clicks, serial link, time
/// and the scheduler state, owned as one value.
pub struct Node<'n, I, O, S> {
    name: &'n str,
    time: TimeKeeper,
    registry: Registry<I, O>,
    net_clicks: NetworkClicks,
    link: SerialLink<S>,

    must_send_state: bool,
    must_check_net: bool,
    last_poll_ms: u32,
    last_net_check_ms: u32,
    last_auto_off_ms: u32,
}

impl<'n, I: InputPin, O: OutputPin, S: SerialIo> Node<'n, I, O, S> {
    /// Creates an unconfigured node. `name` is the device name announced
    /// in DEVICE_DETAILS.
    pub fn new(name: &'n str, clock: Clock, port: S) -> Self {
        let mut time = TimeKeeper::new(clock);
        time.update();

        Self {
            name,
            time,
            registry: Registry::new(),
            net_clicks: NetworkClicks::new(),
            link: SerialLink::new(port),
            must_send_state: false,
            must_check_net: false,
            last_poll_ms: 0,
            last_net_check_ms: 0,
            last_auto_off_ms: 0,
        }
    }

    /// Registers an actuator and returns the index to link it by.
    pub fn add_actuator(&mut self, actuator: Actuator<O>) -> Result<u8, Error> {
        let now = self.time.now();
        self.registry.add_actuator(actuator, now)
    }

    /// Registers a clickable and returns its index.
    pub fn add_clickable(&mut self, clickable: Clickable<I>) -> Result<u8, Error> {
        self.registry.add_clickable(clickable)
    }

    /// Registers an indicator and returns its index.
    pub fn add_indicator(&mut self, indicator: Indicator<O>) -> Result<u8, Error> {
        self.registry.add_indicator(indicator)
    }

    /// Closes configuration and announces the device: finalizes the
    /// registry and transmits BOOT. The bridge answers with
    /// REQUEST_DETAILS (or BOOT), which makes the device send
    /// DEVICE_DETAILS and ACTUATORS_STATE.
    pub fn setup(&mut self) -> Result<(), Error> {
        self.time.update();
        self.registry.finalize()?;

        let now = self.time.now();
        if let Err(e) = self.link.send_boot(now) {
            warn!("boot announcement failed: {}", e);
        }
        info!("{} up", self.name);
        Ok(())
    }

    /// One iteration of the super-loop.
    pub fn tick(&mut self) {
        self.time.update();
        let now = self.time.now();

        // Input polling runs at most once per millisecond; at a normal
        // loop rate that means every pass of the counter
        if now != self.last_poll_ms {
            self.last_poll_ms = now;

            if let Err(e) = self.link.maybe_ping(now) {
                warn!("ping failed: {}", e);
            }

            for index in 0..self.registry.clickable_count() as u8 {
                match self.registry.click_detection(index, now) {
                    ClickResult::ShortClick | ClickResult::ShortClickQuick => {
                        debug!("clickable index {} short clicked", index);
                        self.must_send_state |= self.registry.short_click(index, now);
                    }
                    ClickResult::LongClick => {
                        debug!("clickable index {} long clicked", index);
                        self.timed_click(index, ClickKind::Long, now);
                    }
                    ClickResult::SuperLongClick => {
                        debug!("clickable index {} super long clicked", index);
                        self.timed_click(index, ClickKind::SuperLong, now);
                    }
                    _ => {}
                }
            }
        }

        // Drain whatever the bridge sent
        while self.link.has_input() {
            let Some(frame) = self.link.poll(now) else {
                break;
            };
            match dispatch(
                &frame,
                &mut self.registry,
                &mut self.net_clicks,
                &mut self.link,
                self.name,
                now,
            ) {
                Ok(outcome) => {
                    self.must_send_state |= outcome.state_changed;
                    self.must_check_net |= outcome.net_click_handled;
                }
                Err(e) => warn!("dispatch failed: {}", e),
            }
        }

        // Deadline sweep for outstanding network clicks
        if self.must_check_net
            && elapsed(now, self.last_net_check_ms) > timings::NETWORK_CLICK_CHECK_INTERVAL_MS
        {
            self.last_net_check_ms = now;
            self.must_send_state |= self.net_clicks.check_all(&mut self.registry, false, now);
            self.must_check_net = self.net_clicks.any_pending();
        }

        // Auto-off sweep
        if elapsed(now, self.last_auto_off_ms) > timings::AUTO_OFF_CHECK_INTERVAL_MS {
            self.last_auto_off_ms = now;
            self.must_send_state |= self.registry.auto_off_sweep(now);
        }

        // Broadcast the new state, unless the bridge spoke too recently;
        // a burst of inbound SET commands coalesces into one broadcast
        if self.must_send_state
            && elapsed(now, self.link.last_received_valid_ms()) > timings::DELAY_AFTER_RECEIVE_MS
        {
            let states = self.registry.state_vector();
            if let Err(e) = self.link.send_state(&states, now) {
                warn!("state broadcast failed: {}", e);
            }
            self.registry.refresh_indicators();
            self.must_send_state = false;
        }
    }

    /// Routes a long or super-long click: to the orchestrator when the
    /// clickable is network-enabled and the link is up, else locally when
    /// a local action applies.
    fn timed_click(&mut self, index: u8, kind: ClickKind, now: u32) {
        let (networked, fallback) = match self.registry.clickable(index) {
            Some(c) => (c.is_networked(kind), c.fallback_for(kind)),
            None => return,
        };

        if networked {
            if self.link.is_connected(now) {
                let id = self
                    .registry
                    .clickable(index)
                    .map(|c| c.id())
                    .unwrap_or_default();
                if let Err(e) = self
                    .net_clicks
                    .request(&mut self.link, id, index, kind, now)
                {
                    warn!("network click request failed: {}", e);
                }
                self.must_check_net = true;
            } else if fallback == NetworkFallback::LocalFallback {
                // Bridge unreachable: act locally right away
                self.must_send_state |= self.registry.click(index, kind, now);
            }
        } else {
            self.must_send_state |= self.registry.click(index, kind, now);
        }
    }

    /// Runs the node forever. A configuration error is fatal: it is
    /// reported on the debug channel, given [`timings::FATAL_RESET_DELAY_MS`]
    /// to drain, and answered with a hardware restart.
    pub fn run<R: Reset>(mut self, mut reset: R) -> ! {
        if let Err(e) = self.setup() {
            fatal(&mut reset, e);
        }
        loop {
            self.tick();
        }
    }

    pub fn registry(&self) -> &Registry<I, O> {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected(self.time.now())
    }
}

/// The unrecoverable-path primitive: report, linger, restart.
pub fn fatal<R: Reset>(reset: &mut R, err: Error) -> ! {
    error!("fatal configuration error: {}", err);
    reset.delay_ms(timings::FATAL_RESET_DELAY_MS);
    reset.restart()
}
