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

//! Text framing: one JSON object per LF-terminated line.
//!
//! The decoder accepts exactly the value shapes the protocol uses —
//! unsigned integers, arrays of them, and strings — and skips pairs whose
//! key it does not know. Anything else fails the whole record, which the
//! link answers by dropping the line.

use heapless::Vec;

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{Error, ErrorCode};
use crate::wire::{
    Command, Frame, StateField, WireClickKind, KEY_ACTUATORS, KEY_CLICKABLES, KEY_CONFIRM, KEY_ID,
    KEY_KIND, KEY_NAME, KEY_PAYLOAD, KEY_STATE,
};
use crate::MAX_ACTUATORS;

fn key(w: &mut ByteWriter, k: u8) -> Result<(), Error> {
    w.push(b'"')?;
    w.push(k)?;
    w.push(b'"')?;
    w.push(b':')
}

fn id_array(w: &mut ByteWriter, ids: &[u8]) -> Result<(), Error> {
    w.push(b'[')?;
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            w.push(b',')?;
        }
        w.ascii_uint(*id as u32)?;
    }
    w.push(b']')
}

/// Encodes `{"p":1,"n":<name>,"a":[..],"b":[..]}` + LF.
pub fn encode_details(
    w: &mut ByteWriter,
    name: &str,
    actuator_ids: &[u8],
    clickable_ids: &[u8],
) -> Result<(), Error> {
    w.push(b'{')?;
    key(w, KEY_PAYLOAD)?;
    w.ascii_uint(Command::DeviceDetails as u32)?;
    w.push(b',')?;
    key(w, KEY_NAME)?;
    w.push(b'"')?;
    w.extend_from_slice(name.as_bytes())?;
    w.push(b'"')?;
    w.push(b',')?;
    key(w, KEY_ACTUATORS)?;
    id_array(w, actuator_ids)?;
    w.push(b',')?;
    key(w, KEY_CLICKABLES)?;
    id_array(w, clickable_ids)?;
    w.push(b'}')?;
    w.push(b'\n')
}

/// Encodes `{"p":2,"s":[0,1,..]}` + LF.
pub fn encode_state(w: &mut ByteWriter, states: &[bool]) -> Result<(), Error> {
    w.push(b'{')?;
    key(w, KEY_PAYLOAD)?;
    w.ascii_uint(Command::ActuatorsState as u32)?;
    w.push(b',')?;
    key(w, KEY_STATE)?;
    w.push(b'[')?;
    for (i, on) in states.iter().enumerate() {
        if i > 0 {
            w.push(b',')?;
        }
        w.push(if *on { b'1' } else { b'0' })?;
    }
    w.push(b']')?;
    w.push(b'}')?;
    w.push(b'\n')
}

/// Encodes `{"p":3,"t":<kind>,"i":<id>,"c":<0|1>}` + LF.
pub fn encode_network_click(
    w: &mut ByteWriter,
    kind: WireClickKind,
    id: u8,
    confirm: bool,
) -> Result<(), Error> {
    w.push(b'{')?;
    key(w, KEY_PAYLOAD)?;
    w.ascii_uint(Command::NetworkClick as u32)?;
    w.push(b',')?;
    key(w, KEY_KIND)?;
    w.ascii_uint(kind as u32)?;
    w.push(b',')?;
    key(w, KEY_ID)?;
    w.ascii_uint(id as u32)?;
    w.push(b',')?;
    key(w, KEY_CONFIRM)?;
    w.push(if confirm { b'1' } else { b'0' })?;
    w.push(b'}')?;
    w.push(b'\n')
}

fn skip_ws(r: &mut ByteReader) {
    while let Some(b' ' | b'\t' | b'\r') = r.peek() {
        r.next().ok();
    }
}

fn expect(r: &mut ByteReader, byte: u8) -> Result<(), Error> {
    if r.next()? == byte {
        Ok(())
    } else {
        Err(ErrorCode::InvalidData.into())
    }
}

fn parse_uint(r: &mut ByteReader) -> Result<u32, Error> {
    let mut value: u32 = 0;
    let mut digits = 0;

    while let Some(b @ b'0'..=b'9') = r.peek() {
        r.next()?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as u32))
            .ok_or(ErrorCode::InvalidData)?;
        digits += 1;
    }

    if digits == 0 {
        return Err(ErrorCode::InvalidData.into());
    }
    Ok(value)
}

fn parse_u8(r: &mut ByteReader) -> Result<u8, Error> {
    let value = parse_uint(r)?;
    u8::try_from(value).map_err(|_| ErrorCode::InvalidData.into())
}

fn skip_string(r: &mut ByteReader) -> Result<(), Error> {
    loop {
        match r.next()? {
            b'"' => return Ok(()),
            b'\\' => {
                r.next()?;
            }
            _ => {}
        }
    }
}

// Skips a value under an unknown key: string, unsigned integer, literal,
// or a flat array of those. Nested objects are not part of the contract.
fn skip_value(r: &mut ByteReader) -> Result<(), Error> {
    skip_ws(r);
    match r.peek().ok_or(ErrorCode::TruncatedFrame)? {
        b'"' => {
            r.next()?;
            skip_string(r)
        }
        b'0'..=b'9' => {
            parse_uint(r)?;
            Ok(())
        }
        b't' => literal(r, b"true"),
        b'f' => literal(r, b"false"),
        b'n' => literal(r, b"null"),
        b'[' => {
            r.next()?;
            skip_ws(r);
            if r.peek() == Some(b']') {
                r.next()?;
                return Ok(());
            }
            loop {
                skip_value(r)?;
                skip_ws(r);
                match r.next()? {
                    b',' => {}
                    b']' => return Ok(()),
                    _ => return Err(ErrorCode::InvalidData.into()),
                }
            }
        }
        _ => Err(ErrorCode::InvalidData.into()),
    }
}

fn literal(r: &mut ByteReader, text: &[u8]) -> Result<(), Error> {
    for expected in text {
        if r.next()? != *expected {
            return Err(ErrorCode::InvalidData.into());
        }
    }
    Ok(())
}

fn parse_state(r: &mut ByteReader) -> Result<StateField, Error> {
    skip_ws(r);
    if r.peek() == Some(b'[') {
        r.next()?;
        let mut vector: Vec<u8, MAX_ACTUATORS> = Vec::new();
        skip_ws(r);
        if r.peek() == Some(b']') {
            r.next()?;
            return Ok(StateField::Vector(vector));
        }
        loop {
            skip_ws(r);
            let element = parse_u8(r)?;
            vector.push(element).map_err(|_| ErrorCode::InvalidData)?;
            skip_ws(r);
            match r.next()? {
                b',' => {}
                b']' => return Ok(StateField::Vector(vector)),
                _ => return Err(ErrorCode::InvalidData.into()),
            }
        }
    } else {
        Ok(StateField::Scalar(parse_u8(r)?))
    }
}

/// Decodes one line (without the trailing LF) into a [`Frame`].
pub fn decode(line: &[u8]) -> Result<Frame, Error> {
    let mut r = ByteReader::new(line);
    let mut frame = Frame::empty();

    skip_ws(&mut r);
    expect(&mut r, b'{')?;
    skip_ws(&mut r);

    if r.peek() == Some(b'}') {
        r.next()?;
    } else {
        loop {
            skip_ws(&mut r);
            expect(&mut r, b'"')?;
            let first = r.next()?;
            // Keys longer than one character cannot be part of the
            // contract; remember that and skip their value.
            let mut known = true;
            loop {
                match r.next()? {
                    b'"' => break,
                    b'\\' => {
                        r.next()?;
                        known = false;
                    }
                    _ => known = false,
                }
            }
            skip_ws(&mut r);
            expect(&mut r, b':')?;
            skip_ws(&mut r);

            match first {
                _ if !known => skip_value(&mut r)?,
                k if k == KEY_PAYLOAD => frame.command = parse_u8(&mut r)?,
                k if k == KEY_ID => frame.id = parse_u8(&mut r)?,
                k if k == KEY_KIND => frame.kind = parse_u8(&mut r)?,
                k if k == KEY_CONFIRM => frame.confirm = parse_u8(&mut r)?,
                k if k == KEY_STATE => frame.state = parse_state(&mut r)?,
                _ => skip_value(&mut r)?,
            }

            skip_ws(&mut r);
            match r.next()? {
                b',' => {}
                b'}' => break,
                _ => return Err(ErrorCode::InvalidData.into()),
            }
        }
    }

    skip_ws(&mut r);
    if !r.is_empty() {
        return Err(ErrorCode::InvalidData.into());
    }
    Ok(frame)
}
