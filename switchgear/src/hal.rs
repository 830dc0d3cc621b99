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

//! The hardware surface the engine runs against.
//!
//! Everything here is synchronous and non-blocking: reads return only what
//! is already buffered and writes are bounded by short frames. Platform
//! crates implement these traits once; the engine and its tests never see
//! a concrete pin or port type.

use crate::error::Error;

/// A digital input, read as a level.
pub trait InputPin {
    /// True while the input reads high.
    fn is_high(&mut self) -> bool;
}

/// A digital output.
pub trait OutputPin {
    fn set(&mut self, on: bool);
}

/// A non-blocking byte stream to the bridge.
pub trait SerialIo {
    /// True if at least one byte is buffered for reading.
    fn has_input(&mut self) -> bool;

    /// Takes the next buffered byte, if any. Never blocks.
    fn read(&mut self) -> Option<u8>;

    /// Writes a whole frame. Frames are short; the write is synchronous.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error>;
}

/// The platform reset primitive, used for the fatal-configuration path.
pub trait Reset {
    /// Busy-waits for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Restarts the device, typically by arming the watchdog and spinning.
    fn restart(&mut self) -> !;
}
