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

//! Routing of decoded inbound records.
//!
//! One `match` on the command byte mutates the registry, the pending
//! network clicks or the link, and reports its side effects back to the
//! scheduler. Validation is by convention: 0 is not a valid command, id
//! or click kind, so records with missing keys fall through the same
//! rejection paths as records with bad values, silently.

use log::{debug, warn};
use num_traits::FromPrimitive;

use crate::clickable::ClickKind;
use crate::error::Error;
use crate::hal::{InputPin, OutputPin, SerialIo};
use crate::network_clicks::NetworkClicks;
use crate::registry::Registry;
use crate::transport::SerialLink;
use crate::wire::{Command, Frame, StateField, WireClickKind};

/// Side effects of one dispatched record, ORed into the scheduler's
/// flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// An actuator switched; the scheduler owes the bridge a state
    /// broadcast.
    pub state_changed: bool,
    /// Network-click bookkeeping moved; the scheduler must keep its timer
    /// sweep armed.
    pub net_click_handled: bool,
}

/// Decodes the command of `frame` and executes it.
pub fn dispatch<I: InputPin, O: OutputPin, S: SerialIo>(
    frame: &Frame,
    registry: &mut Registry<I, O>,
    net_clicks: &mut NetworkClicks,
    link: &mut SerialLink<S>,
    device_name: &str,
    now: u32,
) -> Result<DispatchOutcome, Error> {
    let mut outcome = DispatchOutcome::default();

    let Some(command) = Command::from_u8(frame.command) else {
        warn!("unknown or missing command {}", frame.command);
        return Ok(outcome);
    };

    match command {
        Command::SetSingleActuator => {
            let Some(index) = registry.actuator_index(frame.id) else {
                debug!("set single: no actuator id {}", frame.id);
                return Ok(outcome);
            };
            match frame.state {
                StateField::Scalar(s @ (0 | 1)) => {
                    outcome.state_changed = registry.set_actuator_state(index, s == 1, now);
                }
                _ => debug!("set single: bad state field"),
            }
        }

        Command::SetState => match &frame.state {
            StateField::Vector(states) if states.len() == registry.actuator_count() => {
                outcome.state_changed = registry.apply_state_vector(states, now);
            }
            _ => debug!("set state: wrong or missing vector"),
        },

        Command::NetworkClickAck | Command::FailoverClick => {
            network_click_response(frame, command, registry, net_clicks, link, now, &mut outcome)?;
        }

        Command::Failover => {
            outcome.state_changed = net_clicks.check_all(registry, true, now);
        }

        Command::RequestState => {
            link.send_state(&registry.state_vector(), now)?;
        }

        Command::RequestDetails => {
            link.send_details(
                device_name,
                &registry.actuator_ids(),
                &registry.clickable_ids(),
                now,
            )?;
        }

        Command::Boot => {
            link.send_details(
                device_name,
                &registry.actuator_ids(),
                &registry.clickable_ids(),
                now,
            )?;
            link.send_state(&registry.state_vector(), now)?;
        }

        Command::Ping => {}

        // Device-to-bridge commands have no business arriving here
        Command::DeviceDetails | Command::ActuatorsState | Command::NetworkClick => {
            warn!("unexpected inbound command {}", frame.command);
        }
    }

    Ok(outcome)
}

/// Shared tail of NETWORK_CLICK_ACK and FAILOVER_CLICK: resolve the
/// clickable, decode the wire click kind, then either confirm the pending
/// entry (ACK, only while it is still live) or force its fallback.
fn network_click_response<I: InputPin, O: OutputPin, S: SerialIo>(
    frame: &Frame,
    command: Command,
    registry: &mut Registry<I, O>,
    net_clicks: &mut NetworkClicks,
    link: &mut SerialLink<S>,
    now: u32,
    outcome: &mut DispatchOutcome,
) -> Result<(), Error> {
    let Some(index) = registry.clickable_index(frame.id) else {
        debug!("network click response: no clickable id {}", frame.id);
        return Ok(());
    };
    let kind = match WireClickKind::from_u8(frame.kind) {
        Some(WireClickKind::Long) => ClickKind::Long,
        Some(WireClickKind::SuperLong) => ClickKind::SuperLong,
        None => {
            debug!("network click response: bad kind {}", frame.kind);
            return Ok(());
        }
    };

    if command == Command::FailoverClick {
        outcome.state_changed = net_clicks.check_one(registry, index, kind, true, now);
    } else if !net_clicks.is_expired(index, kind, now) {
        outcome.state_changed = net_clicks.confirm(link, frame.id, index, kind, now)?;
        outcome.net_click_handled = outcome.state_changed;
    }
    Ok(())
}
