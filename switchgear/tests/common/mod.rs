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

//! Shared harness for the end-to-end tests: a virtual clock, pin doubles
//! and a serial loopback, so a whole [`Node`] can be driven tick by tick
//! with scripted inputs and inspected on the wire.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use switchgear::error::Error;
use switchgear::hal::{InputPin, OutputPin, SerialIo};
use switchgear::Node;

thread_local! {
    static NOW: Cell<u32> = const { Cell::new(0) };
}

/// The injected clock; every test thread gets its own timeline.
pub fn test_clock() -> u32 {
    NOW.with(|c| c.get())
}

pub fn set_now(ms: u32) {
    NOW.with(|c| c.set(ms));
}

pub fn advance(ms: u32) {
    NOW.with(|c| c.set(c.get().wrapping_add(ms)));
}

/// A shared digital level, observable from both the test and the engine.
#[derive(Clone, Default)]
pub struct Level(Rc<Cell<bool>>);

impl Level {
    pub fn set(&self, on: bool) {
        self.0.set(on);
    }

    pub fn get(&self) -> bool {
        self.0.get()
    }
}

pub struct TestInput(pub Level);

impl InputPin for TestInput {
    fn is_high(&mut self) -> bool {
        self.0.get()
    }
}

pub struct TestOutput(pub Level);

impl OutputPin for TestOutput {
    fn set(&mut self, on: bool) {
        self.0.set(on);
    }
}

/// Both directions of the serial wire, shared between the test and the
/// port handed to the node.
#[derive(Clone, Default)]
pub struct Wires {
    to_device: Rc<RefCell<VecDeque<u8>>>,
    from_device: Rc<RefCell<Vec<u8>>>,
}

impl Wires {
    /// Queues bytes for the device to read.
    pub fn inject(&self, bytes: &[u8]) {
        self.to_device.borrow_mut().extend(bytes.iter().copied());
    }

    /// Everything the device has transmitted so far, as text.
    pub fn transcript(&self) -> String {
        String::from_utf8(self.from_device.borrow().clone()).expect("utf-8 transcript")
    }

    /// The transmitted records, one per line, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.transcript()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    /// Forgets everything transmitted so far.
    pub fn clear_outbound(&self) {
        self.from_device.borrow_mut().clear();
    }
}

pub struct TestPort(pub Wires);

impl SerialIo for TestPort {
    fn has_input(&mut self) -> bool {
        !self.0.to_device.borrow().is_empty()
    }

    fn read(&mut self) -> Option<u8> {
        self.0.to_device.borrow_mut().pop_front()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        self.0.from_device.borrow_mut().extend_from_slice(data);
        Ok(())
    }
}

pub type TestNode = Node<'static, TestInput, TestOutput, TestPort>;

/// Creates a bare node on a fresh wire pair, with the clock already past
/// the boot-time debounce shadow.
pub fn node(name: &'static str) -> (TestNode, Wires) {
    let _ = env_logger::builder().is_test(true).try_init();
    set_now(100_000);

    let wires = Wires::default();
    let node = Node::new(name, test_clock, TestPort(wires.clone()));
    (node, wires)
}

/// Ticks the node once per simulated millisecond.
pub fn run_ms(node: &mut TestNode, ms: u32) {
    for _ in 0..ms {
        advance(1);
        node.tick();
    }
}

/// Marks the link connected by letting the bridge ping the device, then
/// waits out the post-receive broadcast delay.
pub fn connect_bridge(node: &mut TestNode, wires: &Wires) {
    wires.inject(b"{\"p\":5}\n");
    run_ms(node, 1);
    assert!(node.is_connected());
    run_ms(node, switchgear::timings::DELAY_AFTER_RECEIVE_MS + 1);
}
