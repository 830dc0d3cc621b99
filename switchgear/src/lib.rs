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

//! Firmware engine for a relay-and-button home-automation node.
//!
//! The engine runs a cooperative super-loop on a single-threaded,
//! interrupt-free runtime. It polls push-button inputs through a per-input
//! finite state machine, drives relay outputs and status lamps, and talks
//! to a network bridge over a framed point-to-point serial link. Local
//! behavior stays deterministic whether or not the bridge is reachable:
//! long and super-long presses can be delegated to a remote orchestrator,
//! with a per-request timeout that falls back to the local action.
//!
//! The whole engine is allocation-free. Every store is a fixed-capacity
//! [`heapless`] collection bounded by the `MAX_*` constants below, and the
//! hardware surface (pins, serial port, clock, watchdog) is abstracted by
//! the small traits in [`hal`].
//!
//! # Example
//! ```no_run
//! use switchgear::actuator::Actuator;
//! use switchgear::clickable::Clickable;
//! use switchgear::Node;
//! # use switchgear::hal::{InputPin, OutputPin, SerialIo};
//! # use switchgear::error::Error;
//! # struct In; impl InputPin for In { fn is_high(&mut self) -> bool { false } }
//! # struct Out; impl OutputPin for Out { fn set(&mut self, _on: bool) {} }
//! # struct Port;
//! # impl SerialIo for Port {
//! #     fn has_input(&mut self) -> bool { false }
//! #     fn read(&mut self) -> Option<u8> { None }
//! #     fn write_all(&mut self, _data: &[u8]) -> Result<(), Error> { Ok(()) }
//! # }
//! # fn pins() -> (In, Out, Port) { (In, Out, Port) }
//! # fn main() -> Result<(), switchgear::error::Error> {
//! let (button_pin, relay_pin, port) = pins();
//!
//! let mut node = Node::new("c1", switchgear::time::sys_clock, port);
//! let r1 = node.add_actuator(Actuator::new(relay_pin, 1).auto_off(600_000))?;
//! node.add_clickable(Clickable::new(button_pin, 1).link_short(r1))?;
//! node.setup()?;
//!
//! loop {
//!     node.tick();
//! }
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod actuator;
pub mod clickable;
pub mod codec;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod hal;
pub mod indicator;
pub mod network_clicks;
pub mod registry;
pub mod time;
pub mod timings;
pub mod transport;
pub mod wire;

pub use crate::core::Node;

/// Upper bound on the number of actuators a device can carry.
pub const MAX_ACTUATORS: usize = 32;

/// Upper bound on the number of clickables a device can carry.
pub const MAX_CLICKABLES: usize = 32;

/// Upper bound on the number of indicators a device can carry.
pub const MAX_INDICATORS: usize = 16;
