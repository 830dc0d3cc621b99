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

//! Process-wide timing constants, all in milliseconds.

/// Default clickable (button) debounce.
pub const CLICKABLE_DEBOUNCE_MS: u16 = 20;

/// Default press duration that classifies as a long click.
pub const CLICKABLE_LONG_CLICK_MS: u16 = 400;

/// Default press duration that classifies as a super-long click.
pub const CLICKABLE_SUPER_LONG_CLICK_MS: u16 = 1000;

/// Minimum time between two switches of the same actuator. 0 disables the
/// check.
pub const ACTUATOR_DEBOUNCE_MS: u32 = 100;

/// How long a network click waits for an ACK before its fallback runs.
pub const NETWORK_CLICK_TIMEOUT_MS: u32 = 1000;

/// Minimum interval between two sweeps of the pending network clicks.
pub const NETWORK_CLICK_CHECK_INTERVAL_MS: u32 = 50;

/// Minimum interval between two auto-off sweeps.
pub const AUTO_OFF_CHECK_INTERVAL_MS: u32 = 1000;

/// Quiet time after the last valid inbound frame before a state broadcast
/// goes out. Prevents redundant broadcasts mid-burst of inbound SET
/// commands.
pub const DELAY_AFTER_RECEIVE_MS: u32 = 50;

/// Outbound silence that triggers a keep-alive ping.
pub const PING_INTERVAL_MS: u32 = 10_000;

/// Inbound silence after which the bridge counts as disconnected.
pub const CONNECTION_TIMEOUT_MS: u32 = PING_INTERVAL_MS + 200;

/// Grace delay between reporting a fatal configuration error and the
/// watchdog reset, so the message makes it out of the debug channel.
pub const FATAL_RESET_DELAY_MS: u32 = 10_000;
