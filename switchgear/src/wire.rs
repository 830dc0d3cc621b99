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

//! The serial message contract with the bridge.
//!
//! Records are flat objects with single-character keys. The command lives
//! under `p`; 0 is a reserved invalid value for commands, ids and click
//! kinds, which lets a decoder normalize missing keys to 0 and a
//! dispatcher reject them without a separate presence check.

use heapless::Vec;
use num_derive::FromPrimitive;

use crate::MAX_ACTUATORS;

/// Record key: command.
pub const KEY_PAYLOAD: u8 = b'p';
/// Record key: device name.
pub const KEY_NAME: u8 = b'n';
/// Record key: actuator id list.
pub const KEY_ACTUATORS: u8 = b'a';
/// Record key: clickable (button) id list.
pub const KEY_CLICKABLES: u8 = b'b';
/// Record key: state scalar or state vector.
pub const KEY_STATE: u8 = b's';
/// Record key: actuator or clickable id.
pub const KEY_ID: u8 = b'i';
/// Record key: click kind.
pub const KEY_KIND: u8 = b't';
/// Record key: confirm flag.
pub const KEY_CONFIRM: u8 = b'c';

/// Commands carried under the `p` key.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    // Device -> bridge
    DeviceDetails = 1,
    ActuatorsState = 2,
    NetworkClick = 3,

    // Both directions
    Boot = 4,
    Ping = 5,

    // Bridge -> device
    RequestDetails = 10,
    RequestState = 11,
    SetState = 12,
    SetSingleActuator = 13,
    NetworkClickAck = 14,
    Failover = 15,
    FailoverClick = 16,
}

/// Click kinds carried under the `t` key.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WireClickKind {
    Long = 1,
    SuperLong = 2,
}

/// The `s` field of a decoded record.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StateField {
    Missing,
    Scalar(u8),
    Vector(Vec<u8, MAX_ACTUATORS>),
}

/// A decoded inbound record.
///
/// Fields default to 0 when the key is absent, which downstream code
/// treats as invalid by convention.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frame {
    pub command: u8,
    pub id: u8,
    pub kind: u8,
    pub confirm: u8,
    pub state: StateField,
}

impl Frame {
    pub const fn empty() -> Self {
        Self {
            command: 0,
            id: 0,
            kind: 0,
            confirm: 0,
            state: StateField::Missing,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

// BOOT and PING are emitted often and never vary, so both framings keep
// them pre-encoded and write them to the port without going through the
// encoder. The byte sequences are frozen by the protocol.

/// `{"p":4}` + LF, text framing.
pub const JSON_BOOT: &[u8] = b"{\"p\":4}\n";
/// `{"p":5}` + LF, text framing.
pub const JSON_PING: &[u8] = b"{\"p\":5}\n";
/// `{p: 4}`, binary framing.
pub const MSGPACK_BOOT: &[u8] = &[0x81, 0xA1, 0x70, 0x04];
/// `{p: 5}`, binary framing.
pub const MSGPACK_PING: &[u8] = &[0x81, 0xA1, 0x70, 0x05];
