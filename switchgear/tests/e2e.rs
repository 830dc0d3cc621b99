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

//! End-to-end scenarios: a full node driven over mock pins and a serial
//! loopback, asserted against the wire. These run under the default text
//! framing; the binary framing is covered by the codec and transport unit
//! tests.

#![cfg(not(feature = "msgpack"))]

mod common;

use common::{connect_bridge, node, run_ms, Level, TestInput, TestOutput, Wires};
use switchgear::actuator::Actuator;
use switchgear::clickable::{Clickable, LongClickKind, NetworkFallback};
use switchgear::indicator::{Indicator, IndicatorMode};
use switchgear::timings;

fn state_broadcasts(wires: &Wires) -> Vec<String> {
    wires
        .lines()
        .into_iter()
        .filter(|l| l.contains("\"p\":2"))
        .collect()
}

fn network_clicks(wires: &Wires) -> Vec<String> {
    wires
        .lines()
        .into_iter()
        .filter(|l| l.contains("\"p\":3"))
        .collect()
}

/// One relay on button 1, plus a lamp watching the relay.
fn simple_device() -> (common::TestNode, Wires, Level, Level, Level) {
    let (mut node, wires) = node("c1");
    let button = Level::default();
    let relay = Level::default();
    let lamp = Level::default();

    let r1 = node
        .add_actuator(Actuator::new(TestOutput(relay.clone()), 1))
        .unwrap();
    node.add_clickable(Clickable::new(TestInput(button.clone()), 1).link_short(r1))
        .unwrap();
    node.add_indicator(
        Indicator::new(TestOutput(lamp.clone()))
            .mode(IndicatorMode::Any)
            .watch(r1),
    )
    .unwrap();

    node.setup().unwrap();
    (node, wires, button, relay, lamp)
}

/// One relay on a network-enabled long-click button with local fallback.
fn networked_device(fallback: NetworkFallback) -> (common::TestNode, Wires, Level, Level) {
    let (mut node, wires) = node("c1");
    let button = Level::default();
    let relay = Level::default();

    let r1 = node
        .add_actuator(Actuator::new(TestOutput(relay.clone()), 1))
        .unwrap();
    node.add_clickable(
        Clickable::new(TestInput(button.clone()), 1)
            .long_networked(LongClickKind::Normal, fallback)
            .link_short(r1)
            .link_long(r1),
    )
    .unwrap();

    node.setup().unwrap();
    (node, wires, button, relay)
}

#[test]
fn boot_is_announced_byte_exact() {
    let (_node, wires, _button, _relay, _lamp) = simple_device();
    assert_eq!(wires.lines(), ["{\"p\":4}"]);
}

// Scenario: a 30 ms press on a short-linked button switches the relay and
// broadcasts the new state.
#[test]
fn short_click_switches_and_broadcasts() {
    let (mut node, wires, button, relay, lamp) = simple_device();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 30);
    button.set(false);
    run_ms(&mut node, 10);

    assert!(relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
    // The lamp follows the broadcast
    assert!(lamp.get());
}

// Scenario: a 500 ms press on a NORMAL long-linked button drives the whole
// group on, with a single broadcast.
#[test]
fn long_click_drives_the_group_once() {
    let (mut node, wires) = node("c1");
    let button = Level::default();
    let (relay1, relay2) = (Level::default(), Level::default());

    let r1 = node
        .add_actuator(Actuator::new(TestOutput(relay1.clone()), 1))
        .unwrap();
    let r2 = node
        .add_actuator(Actuator::new(TestOutput(relay2.clone()), 2))
        .unwrap();
    node.add_clickable(
        Clickable::new(TestInput(button.clone()), 1)
            .long(LongClickKind::Normal)
            .link_short(r1)
            .link_long(r1)
            .link_long(r2),
    )
    .unwrap();
    node.setup().unwrap();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 500);
    button.set(false);
    run_ms(&mut node, 10);

    assert!(relay1.get());
    assert!(relay2.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1,1]}"]);
    // No spurious short click on release
    assert_eq!(network_clicks(&wires), Vec::<String>::new());
}

// Scenario: network-enabled long click with the bridge unreachable falls
// back to the local action immediately, with nothing on the wire.
#[test]
fn disconnected_network_click_acts_locally_at_once() {
    let (mut node, wires, button, relay) = networked_device(NetworkFallback::LocalFallback);
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 450);

    assert!(relay.get());
    assert_eq!(network_clicks(&wires), Vec::<String>::new());

    button.set(false);
    run_ms(&mut node, 10);
    assert_eq!(state_broadcasts(&wires).len(), 1);
}

// Scenario: with the bridge up, the long click goes out as a request and
// nothing happens locally until the ACK deadline passes; then the local
// fallback runs exactly once.
#[test]
fn unanswered_network_click_falls_back_at_the_deadline() {
    let (mut node, wires, button, relay) = networked_device(NetworkFallback::LocalFallback);
    connect_bridge(&mut node, &wires);
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 450);
    assert_eq!(network_clicks(&wires), ["{\"p\":3,\"t\":1,\"i\":1,\"c\":0}"]);
    assert!(!relay.get());
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());

    button.set(false);
    run_ms(&mut node, timings::NETWORK_CLICK_TIMEOUT_MS + 200);

    assert!(relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
    // The request was never re-sent or confirmed
    assert_eq!(network_clicks(&wires).len(), 1);
}

// Scenario: the ACK arrives in time, the device confirms on the wire and
// the local state never changes.
#[test]
fn acknowledged_network_click_confirms_without_local_action() {
    let (mut node, wires, button, relay) = networked_device(NetworkFallback::LocalFallback);
    connect_bridge(&mut node, &wires);
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 450);
    button.set(false);
    assert_eq!(network_clicks(&wires), ["{\"p\":3,\"t\":1,\"i\":1,\"c\":0}"]);

    wires.inject(b"{\"p\":14,\"t\":1,\"i\":1}\n");
    run_ms(&mut node, 10);

    assert_eq!(
        network_clicks(&wires),
        ["{\"p\":3,\"t\":1,\"i\":1,\"c\":0}", "{\"p\":3,\"t\":1,\"i\":1,\"c\":1}"]
    );
    assert!(!relay.get());

    // Long past the old deadline: no fallback fires
    run_ms(&mut node, timings::NETWORK_CLICK_TIMEOUT_MS + 500);
    assert!(!relay.get());
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());
}

// Scenario: an explicit FAILOVER drains the pending table through the
// fallbacks without waiting for deadlines.
#[test]
fn failover_forces_the_fallback() {
    let (mut node, wires, button, relay) = networked_device(NetworkFallback::LocalFallback);
    connect_bridge(&mut node, &wires);
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 450);
    button.set(false);
    run_ms(&mut node, 10);
    assert!(!relay.get());

    wires.inject(b"{\"p\":15}\n");
    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS + 10);

    assert!(relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
}

// A DO_NOTHING fallback drops the timed-out request silently.
#[test]
fn do_nothing_fallback_stays_silent() {
    let (mut node, wires, button, relay) = networked_device(NetworkFallback::DoNothing);
    connect_bridge(&mut node, &wires);
    wires.clear_outbound();
    run_ms(&mut node, 200);

    button.set(true);
    run_ms(&mut node, 450);
    button.set(false);
    run_ms(&mut node, timings::NETWORK_CLICK_TIMEOUT_MS + 500);

    assert!(!relay.get());
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());
}

// Scenario: SET_SINGLE_ACTUATOR turns the relay on and the auto-off timer
// turns it back off at the deadline, each with a broadcast.
#[test]
fn auto_off_retires_a_remote_switch() {
    let (mut node, wires) = node("c1");
    let relay = Level::default();
    node.add_actuator(Actuator::new(TestOutput(relay.clone()), 1).auto_off(600_000))
        .unwrap();
    node.setup().unwrap();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":13,\"i\":1,\"s\":1}\n");
    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS + 10);
    assert!(relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
    wires.clear_outbound();

    // Ten minutes later the sweep switches it off and says so
    common::advance(600_001);
    node.tick();
    assert!(!relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[0]}"]);
}

// The broadcast after inbound mutations is withheld until the line has
// been quiet for DELAY_AFTER_RECEIVE_MS.
#[test]
fn broadcast_is_gated_after_inbound_traffic() {
    let (mut node, wires, _button, relay, _lamp) = simple_device();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":12,\"s\":[1]}\n");
    run_ms(&mut node, 1);
    assert!(relay.get());
    // Applied, but not yet announced
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());

    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS - 2);
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());

    run_ms(&mut node, 5);
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
}

// SET_STATE followed by REQUEST_STATE echoes the same vector back.
#[test]
fn state_round_trips() {
    let (mut node, wires) = node("c1");
    node.add_actuator(Actuator::new(TestOutput(Level::default()), 1))
        .unwrap();
    node.add_actuator(Actuator::new(TestOutput(Level::default()), 2))
        .unwrap();
    node.setup().unwrap();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":12,\"s\":[1,0]}\n");
    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS + 10);
    wires.clear_outbound();

    wires.inject(b"{\"p\":11}\n");
    run_ms(&mut node, 2);
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1,0]}"]);
}

// A wrong-length SET_STATE is rejected without a reply or local change.
#[test]
fn wrong_length_state_vector_is_ignored() {
    let (mut node, wires) = node("c1");
    let relay = Level::default();
    node.add_actuator(Actuator::new(TestOutput(relay.clone()), 1))
        .unwrap();
    node.add_actuator(Actuator::new(TestOutput(Level::default()), 2))
        .unwrap();
    node.setup().unwrap();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":12,\"s\":[1]}\n");
    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS + 10);

    assert!(!relay.get());
    assert_eq!(state_broadcasts(&wires), Vec::<String>::new());
}

// The boot handshake: the bridge answers our BOOT with its own BOOT, and
// the device introduces itself.
#[test]
fn boot_handshake_sends_details_then_state() {
    let (mut node, wires, _button, _relay, _lamp) = simple_device();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":4}\n");
    run_ms(&mut node, 2);

    assert_eq!(
        wires.lines(),
        ["{\"p\":1,\"n\":\"c1\",\"a\":[1],\"b\":[1]}", "{\"p\":2,\"s\":[0]}"]
    );
}

// REQUEST_DETAILS alone yields just the details record.
#[test]
fn request_details_is_answered() {
    let (mut node, wires, _button, _relay, _lamp) = simple_device();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"{\"p\":10}\n");
    run_ms(&mut node, 2);

    assert_eq!(wires.lines(), ["{\"p\":1,\"n\":\"c1\",\"a\":[1],\"b\":[1]}"]);
}

// Garbage on the line never takes the engine down and later records still
// decode.
#[test]
fn line_noise_is_survivable() {
    let (mut node, wires, _button, relay, _lamp) = simple_device();
    wires.clear_outbound();
    run_ms(&mut node, 200);

    wires.inject(b"\n\n<<<garbage>>>\n{\"p\":13,\"i\":1,\"s\":1}\n");
    run_ms(&mut node, timings::DELAY_AFTER_RECEIVE_MS + 10);

    assert!(relay.get());
    assert_eq!(state_broadcasts(&wires), ["{\"p\":2,\"s\":[1]}"]);
}

// The keep-alive ping goes out after the quiet interval, byte-exact.
#[test]
fn ping_fills_outbound_silence() {
    let (mut node, wires, _button, _relay, _lamp) = simple_device();
    wires.clear_outbound();

    run_ms(&mut node, timings::PING_INTERVAL_MS + 2);
    let lines = wires.lines();
    assert_eq!(lines.first().map(String::as_str), Some("{\"p\":5}"));
    // And only one of them until the next quiet interval
    assert_eq!(lines.len(), 1);
}
