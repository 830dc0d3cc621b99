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

use core::fmt;

/// The error categories of the engine.
///
/// Configuration codes (`ResourceExhausted`, `Duplicate`, `InvalidConfig`)
/// are fatal: they can only surface while the device is being configured
/// and the runner answers them with a watchdog reset. Everything else is
/// recoverable and stays local to the operation that produced it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// A fixed-capacity store was asked to hold more entries than it can.
    ResourceExhausted,
    /// Two entities of the same kind were registered with the same id.
    Duplicate,
    /// The device configuration is malformed (dangling actuator link,
    /// overflowed link list, finalize called twice, ...).
    InvalidConfig,
    /// An outbound frame did not fit the transmit buffer.
    NoSpace,
    /// An inbound frame ended in the middle of a value.
    TruncatedFrame,
    /// An inbound frame carried bytes that do not decode.
    InvalidData,
    /// An operation was invoked in a state that does not allow it.
    InvalidState,
    /// The serial port refused an outbound write.
    TxFail,
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

/// A thin wrapper around [`ErrorCode`].
///
/// Kept as a separate type so call sites read `Result<_, Error>` and so a
/// richer payload can be attached later without touching every signature.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Error {
    code: ErrorCode,
}

impl Error {
    pub const fn new(code: ErrorCode) -> Self {
        Self { code }
    }

    pub const fn code(&self) -> ErrorCode {
        self.code
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error::{}", self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.code())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{:?}", self.code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
