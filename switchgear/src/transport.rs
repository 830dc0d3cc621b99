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

//! The framed serial link to the bridge.
//!
//! Outbound records are encoded into a stack buffer and written as one
//! frame. Inbound bytes accumulate in a fixed buffer until they form a
//! complete record: a full line under text framing, a full MessagePack
//! object under binary framing. The link also keeps the liveness
//! bookkeeping: when the device last spoke (for the keep-alive ping) and
//! when the bridge was last heard from (for the connectivity window and
//! the post-receive broadcast delay).

use heapless::Vec;
use log::{debug, warn};

use crate::error::Error;
use crate::hal::SerialIo;
use crate::time::elapsed;
use crate::timings;
use crate::wire::{Frame, WireClickKind};

#[cfg(not(feature = "msgpack"))]
use crate::codec::json;
#[cfg(feature = "msgpack")]
use crate::codec::msgpack;

use crate::codec::ByteWriter;

/// Capacity of the inbound assembly buffer. A record larger than this
/// cannot be valid and is discarded wholesale.
pub const RX_BUFFER_SIZE: usize = 256;

/// Capacity of the outbound encode buffer, sized for DEVICE_DETAILS at
/// full registry capacity.
pub const TX_BUFFER_SIZE: usize = 512;

pub struct SerialLink<S> {
    port: S,
    last_sent_ms: u32,
    last_received_valid_ms: u32,
    first_valid_received: bool,
    rx: Vec<u8, RX_BUFFER_SIZE>,
}

impl<S: SerialIo> SerialLink<S> {
    pub fn new(port: S) -> Self {
        Self {
            port,
            last_sent_ms: 0,
            last_received_valid_ms: 0,
            first_valid_received: false,
            rx: Vec::new(),
        }
    }

    /// True when the device has been silent long enough to owe the bridge
    /// a keep-alive.
    pub fn can_ping(&self, now: u32) -> bool {
        elapsed(now, self.last_sent_ms) > timings::PING_INTERVAL_MS
    }

    /// True while a valid frame has been received recently enough. Never
    /// true before the first valid frame.
    pub fn is_connected(&self, now: u32) -> bool {
        self.first_valid_received
            && elapsed(now, self.last_received_valid_ms) < timings::CONNECTION_TIMEOUT_MS
    }

    /// When the last valid inbound frame arrived. The scheduler holds the
    /// state broadcast until this is old enough.
    pub fn last_received_valid_ms(&self) -> u32 {
        self.last_received_valid_ms
    }

    pub fn has_input(&mut self) -> bool {
        self.port.has_input() || !self.rx.is_empty()
    }

    fn mark_valid_receive(&mut self, now: u32) {
        self.first_valid_received = true;
        self.last_received_valid_ms = now;
    }

    fn write_frame(&mut self, bytes: &[u8], now: u32) -> Result<(), Error> {
        self.port.write_all(bytes)?;
        self.last_sent_ms = now;
        Ok(())
    }

    /// Emits the pre-encoded BOOT payload.
    pub fn send_boot(&mut self, now: u32) -> Result<(), Error> {
        #[cfg(not(feature = "msgpack"))]
        let payload = crate::wire::JSON_BOOT;
        #[cfg(feature = "msgpack")]
        let payload = crate::wire::MSGPACK_BOOT;

        debug!("tx boot");
        self.write_frame(payload, now)
    }

    /// Emits the pre-encoded PING payload if the quiet interval has
    /// passed; otherwise does nothing.
    pub fn maybe_ping(&mut self, now: u32) -> Result<(), Error> {
        if !self.can_ping(now) {
            return Ok(());
        }

        #[cfg(not(feature = "msgpack"))]
        let payload = crate::wire::JSON_PING;
        #[cfg(feature = "msgpack")]
        let payload = crate::wire::MSGPACK_PING;

        debug!("tx ping");
        self.write_frame(payload, now)
    }

    /// Emits DEVICE_DETAILS.
    pub fn send_details(
        &mut self,
        name: &str,
        actuator_ids: &[u8],
        clickable_ids: &[u8],
        now: u32,
    ) -> Result<(), Error> {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut w = ByteWriter::new(&mut buf);

        #[cfg(not(feature = "msgpack"))]
        json::encode_details(&mut w, name, actuator_ids, clickable_ids)?;
        #[cfg(feature = "msgpack")]
        msgpack::encode_details(&mut w, name, actuator_ids, clickable_ids)?;

        debug!("tx details: {} actuators, {} clickables", actuator_ids.len(), clickable_ids.len());
        let len = w.len();
        self.write_frame(&buf[..len], now)
    }

    /// Emits ACTUATORS_STATE.
    pub fn send_state(&mut self, states: &[bool], now: u32) -> Result<(), Error> {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut w = ByteWriter::new(&mut buf);

        #[cfg(not(feature = "msgpack"))]
        json::encode_state(&mut w, states)?;
        #[cfg(feature = "msgpack")]
        msgpack::encode_state(&mut w, states)?;

        debug!("tx state");
        let len = w.len();
        self.write_frame(&buf[..len], now)
    }

    /// Emits NETWORK_CLICK with the given confirm flag.
    pub fn send_network_click(
        &mut self,
        kind: WireClickKind,
        id: u8,
        confirm: bool,
        now: u32,
    ) -> Result<(), Error> {
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut w = ByteWriter::new(&mut buf);

        #[cfg(not(feature = "msgpack"))]
        json::encode_network_click(&mut w, kind, id, confirm)?;
        #[cfg(feature = "msgpack")]
        msgpack::encode_network_click(&mut w, kind, id, confirm)?;

        debug!("tx network click: kind {:?} id {} confirm {}", kind, id, confirm);
        let len = w.len();
        self.write_frame(&buf[..len], now)
    }

    /// Pulls buffered bytes off the port and returns the next complete,
    /// valid frame, if any.
    ///
    /// Malformed input never takes the link down: a bad line is dropped
    /// and the buffer reset (text framing), undecodable bytes drain the
    /// buffer (binary framing). Only a valid frame refreshes the liveness
    /// window.
    #[cfg(not(feature = "msgpack"))]
    pub fn poll(&mut self, now: u32) -> Option<Frame> {
        while let Some(byte) = self.port.read() {
            if byte == b'\n' {
                // A bare newline between records is noise, not a message
                if self.rx.is_empty() {
                    continue;
                }
                let decoded = json::decode(&self.rx);
                self.rx.clear();
                match decoded {
                    Ok(frame) => {
                        debug!("rx frame: command {}", frame.command);
                        self.mark_valid_receive(now);
                        return Some(frame);
                    }
                    Err(e) => warn!("dropping malformed line: {}", e),
                }
            } else if self.rx.push(byte).is_err() {
                warn!("rx line overflow, resetting buffer");
                self.rx.clear();
            }
        }
        None
    }

    /// See the text-framing `poll`; the binary decoder additionally
    /// treats a record that ends mid-object as wait-for-more.
    #[cfg(feature = "msgpack")]
    pub fn poll(&mut self, now: u32) -> Option<Frame> {
        while let Some(byte) = self.port.read() {
            if self.rx.push(byte).is_err() {
                warn!("rx buffer overflow, draining");
                self.rx.clear();
            }
        }

        if self.rx.is_empty() {
            return None;
        }

        match msgpack::decode(&self.rx) {
            Ok(Some((frame, consumed))) => {
                let remaining = self.rx.len() - consumed;
                let rx: &mut [u8] = &mut self.rx;
                rx.copy_within(consumed.., 0);
                self.rx.truncate(remaining);
                debug!("rx frame: command {}", frame.command);
                self.mark_valid_receive(now);
                Some(frame)
            }
            // Incomplete input: wait for more bytes
            Ok(None) => None,
            Err(e) => {
                warn!("undecodable input ({}), draining buffer", e);
                self.rx.clear();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::ErrorCode;
    use crate::hal::SerialIo;

    #[derive(Default)]
    struct Loopback {
        inbound: VecDeque<u8>,
        outbound: std::vec::Vec<u8>,
    }

    impl SerialIo for Loopback {
        fn has_input(&mut self) -> bool {
            !self.inbound.is_empty()
        }

        fn read(&mut self) -> Option<u8> {
            self.inbound.pop_front()
        }

        fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
            self.outbound.extend_from_slice(data);
            Ok(())
        }
    }

    fn link() -> SerialLink<Loopback> {
        SerialLink::new(Loopback::default())
    }

    #[test]
    fn boot_and_ping_are_byte_exact() {
        let mut l = link();
        l.send_boot(0).unwrap();

        #[cfg(not(feature = "msgpack"))]
        assert_eq!(l.port.outbound, b"{\"p\":4}\n");
        #[cfg(feature = "msgpack")]
        assert_eq!(l.port.outbound, [0x81, 0xA1, 0x70, 0x04]);

        l.port.outbound.clear();
        // Quiet long enough for a ping
        l.maybe_ping(timings::PING_INTERVAL_MS + 1).unwrap();

        #[cfg(not(feature = "msgpack"))]
        assert_eq!(l.port.outbound, b"{\"p\":5}\n");
        #[cfg(feature = "msgpack")]
        assert_eq!(l.port.outbound, [0x81, 0xA1, 0x70, 0x05]);
    }

    #[test]
    fn ping_respects_the_quiet_interval() {
        let mut l = link();
        l.send_boot(1_000).unwrap();
        l.port.outbound.clear();

        l.maybe_ping(1_000 + timings::PING_INTERVAL_MS).unwrap();
        assert!(l.port.outbound.is_empty());

        l.maybe_ping(1_000 + timings::PING_INTERVAL_MS + 1).unwrap();
        assert!(!l.port.outbound.is_empty());

        // Sending anything resets the quiet window
        let stamp = 1_000 + timings::PING_INTERVAL_MS + 1;
        l.port.outbound.clear();
        l.maybe_ping(stamp + 10).unwrap();
        assert!(l.port.outbound.is_empty());
    }

    #[test]
    fn connectivity_needs_a_first_valid_frame() {
        let mut l = link();
        assert!(!l.is_connected(0));

        #[cfg(not(feature = "msgpack"))]
        l.port.inbound.extend(b"{\"p\":5}\n");
        #[cfg(feature = "msgpack")]
        l.port.inbound.extend([0x81, 0xA1, 0x70, 0x05]);

        let frame = l.poll(5_000).expect("a frame");
        assert_eq!(frame.command, 5);
        assert!(l.is_connected(5_000));
        assert!(l.is_connected(5_000 + timings::CONNECTION_TIMEOUT_MS - 1));
        assert!(!l.is_connected(5_000 + timings::CONNECTION_TIMEOUT_MS));
    }

    #[cfg(not(feature = "msgpack"))]
    #[test]
    fn malformed_lines_are_dropped_without_touching_liveness() {
        let mut l = link();
        l.port.inbound.extend(b"not json\n{\"p\":11}\n");

        let frame = l.poll(1_000).expect("the valid frame");
        assert_eq!(frame.command, 11);
        assert!(l.poll(1_000).is_none());
    }

    #[cfg(not(feature = "msgpack"))]
    #[test]
    fn partial_lines_wait_for_more_input() {
        let mut l = link();
        l.port.inbound.extend(b"{\"p\":1");
        assert!(l.poll(1_000).is_none());
        assert!(!l.is_connected(1_000));

        l.port.inbound.extend(b"1}\n");
        let frame = l.poll(1_001).expect("completed frame");
        assert_eq!(frame.command, 11);
    }

    #[cfg(not(feature = "msgpack"))]
    #[test]
    fn oversized_lines_reset_the_buffer() {
        let mut l = link();
        for _ in 0..RX_BUFFER_SIZE + 50 {
            l.port.inbound.push_back(b'x');
        }
        l.port.inbound.extend(b"\n{\"p\":5}\n");

        // The garbage line overflowed and was discarded; the next record
        // still decodes
        let frame = l.poll(1_000).expect("the ping");
        assert_eq!(frame.command, 5);
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn partial_objects_wait_for_more_input() {
        let mut l = link();
        l.port.inbound.extend([0x81, 0xA1]);
        assert!(l.poll(1_000).is_none());

        l.port.inbound.extend([0x70, 0x05]);
        let frame = l.poll(1_001).expect("completed frame");
        assert_eq!(frame.command, 5);
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn undecodable_bytes_drain_the_buffer() {
        let mut l = link();
        l.port.inbound.extend([0xC1, 0xC1]);
        assert!(l.poll(1_000).is_none());
        assert!(l.rx.is_empty());

        l.port.inbound.extend([0x81, 0xA1, 0x70, 0x05]);
        assert_eq!(l.poll(1_001).expect("the ping").command, 5);
    }

    #[test]
    fn write_failures_propagate() {
        struct Broken;

        impl SerialIo for Broken {
            fn has_input(&mut self) -> bool {
                false
            }
            fn read(&mut self) -> Option<u8> {
                None
            }
            fn write_all(&mut self, _data: &[u8]) -> Result<(), Error> {
                Err(ErrorCode::TxFail.into())
            }
        }

        let mut l = SerialLink::new(Broken);
        assert_eq!(l.send_boot(0).unwrap_err().code(), ErrorCode::TxFail);
    }
}
