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

//! Binary framing: MessagePack objects written back-to-back on the stream.
//!
//! There is no record delimiter, so the decoder works against whatever
//! bytes have accumulated: running out of input mid-object is the normal
//! wait-for-more signal ([`decode`] returns `Ok(None)`), while a byte that
//! cannot start or continue a valid object is a real error and the caller
//! drains its receive buffer.

use byteorder::{BigEndian, ByteOrder};
use heapless::Vec;

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{Error, ErrorCode};
use crate::wire::{
    Command, Frame, StateField, WireClickKind, KEY_ACTUATORS, KEY_CLICKABLES, KEY_CONFIRM, KEY_ID,
    KEY_KIND, KEY_NAME, KEY_PAYLOAD, KEY_STATE,
};
use crate::MAX_ACTUATORS;

const FIXMAP: u8 = 0x80;
const FIXARRAY: u8 = 0x90;
const FIXSTR: u8 = 0xA0;
const NIL: u8 = 0xC0;
const FALSE: u8 = 0xC2;
const TRUE: u8 = 0xC3;
const UINT8: u8 = 0xCC;
const UINT16: u8 = 0xCD;
const UINT32: u8 = 0xCE;
const UINT64: u8 = 0xCF;
const INT8: u8 = 0xD0;
const INT16: u8 = 0xD1;
const INT32: u8 = 0xD2;
const INT64: u8 = 0xD3;
const STR8: u8 = 0xD9;
const ARRAY16: u8 = 0xDC;
const MAP16: u8 = 0xDE;

fn map_header(w: &mut ByteWriter, entries: usize) -> Result<(), Error> {
    debug_assert!(entries <= 15);
    w.push(FIXMAP | entries as u8)
}

fn key(w: &mut ByteWriter, k: u8) -> Result<(), Error> {
    w.push(FIXSTR | 1)?;
    w.push(k)
}

fn uint(w: &mut ByteWriter, value: u32) -> Result<(), Error> {
    if value <= 0x7F {
        w.push(value as u8)
    } else if value <= 0xFF {
        w.push(UINT8)?;
        w.push(value as u8)
    } else if value <= 0xFFFF {
        let mut be = [0u8; 2];
        BigEndian::write_u16(&mut be, value as u16);
        w.push(UINT16)?;
        w.extend_from_slice(&be)
    } else {
        let mut be = [0u8; 4];
        BigEndian::write_u32(&mut be, value);
        w.push(UINT32)?;
        w.extend_from_slice(&be)
    }
}

fn string(w: &mut ByteWriter, s: &str) -> Result<(), Error> {
    let bytes = s.as_bytes();
    if bytes.len() <= 31 {
        w.push(FIXSTR | bytes.len() as u8)?;
    } else if bytes.len() <= 255 {
        w.push(STR8)?;
        w.push(bytes.len() as u8)?;
    } else {
        return Err(ErrorCode::NoSpace.into());
    }
    w.extend_from_slice(bytes)
}

fn array_header(w: &mut ByteWriter, entries: usize) -> Result<(), Error> {
    if entries <= 15 {
        w.push(FIXARRAY | entries as u8)
    } else {
        let mut be = [0u8; 2];
        BigEndian::write_u16(&mut be, entries as u16);
        w.push(ARRAY16)?;
        w.extend_from_slice(&be)
    }
}

/// Encodes `{p: 1, n: <name>, a: [..], b: [..]}`.
pub fn encode_details(
    w: &mut ByteWriter,
    name: &str,
    actuator_ids: &[u8],
    clickable_ids: &[u8],
) -> Result<(), Error> {
    map_header(w, 4)?;
    key(w, KEY_PAYLOAD)?;
    uint(w, Command::DeviceDetails as u32)?;
    key(w, KEY_NAME)?;
    string(w, name)?;
    key(w, KEY_ACTUATORS)?;
    array_header(w, actuator_ids.len())?;
    for id in actuator_ids {
        uint(w, *id as u32)?;
    }
    key(w, KEY_CLICKABLES)?;
    array_header(w, clickable_ids.len())?;
    for id in clickable_ids {
        uint(w, *id as u32)?;
    }
    Ok(())
}

/// Encodes `{p: 2, s: [0, 1, ..]}`.
pub fn encode_state(w: &mut ByteWriter, states: &[bool]) -> Result<(), Error> {
    map_header(w, 2)?;
    key(w, KEY_PAYLOAD)?;
    uint(w, Command::ActuatorsState as u32)?;
    key(w, KEY_STATE)?;
    array_header(w, states.len())?;
    for on in states {
        uint(w, *on as u32)?;
    }
    Ok(())
}

/// Encodes `{p: 3, t: <kind>, i: <id>, c: <0|1>}`.
pub fn encode_network_click(
    w: &mut ByteWriter,
    kind: WireClickKind,
    id: u8,
    confirm: bool,
) -> Result<(), Error> {
    map_header(w, 4)?;
    key(w, KEY_PAYLOAD)?;
    uint(w, Command::NetworkClick as u32)?;
    key(w, KEY_KIND)?;
    uint(w, kind as u32)?;
    key(w, KEY_ID)?;
    uint(w, id as u32)?;
    key(w, KEY_CONFIRM)?;
    uint(w, confirm as u32)
}

fn read_uint(r: &mut ByteReader) -> Result<u32, Error> {
    let marker = r.next()?;
    match marker {
        0x00..=0x7F => Ok(marker as u32),
        UINT8 => Ok(r.next()? as u32),
        UINT16 => Ok(BigEndian::read_u16(r.take(2)?) as u32),
        UINT32 => Ok(BigEndian::read_u32(r.take(4)?)),
        _ => Err(ErrorCode::InvalidData.into()),
    }
}

fn read_u8(r: &mut ByteReader) -> Result<u8, Error> {
    u8::try_from(read_uint(r)?).map_err(|_| ErrorCode::InvalidData.into())
}

fn read_str_len(r: &mut ByteReader) -> Result<usize, Error> {
    let marker = r.next()?;
    match marker {
        0xA0..=0xBF => Ok((marker & 0x1F) as usize),
        STR8 => Ok(r.next()? as usize),
        _ => Err(ErrorCode::InvalidData.into()),
    }
}

fn skip_values(r: &mut ByteReader, count: usize) -> Result<(), Error> {
    for _ in 0..count {
        skip_value(r)?;
    }
    Ok(())
}

fn skip_value(r: &mut ByteReader) -> Result<(), Error> {
    let marker = r.next()?;
    match marker {
        0x00..=0x7F | 0xE0..=0xFF | NIL | FALSE | TRUE => Ok(()),
        UINT8 | INT8 => r.next().map(|_| ()),
        UINT16 | INT16 => r.take(2).map(|_| ()),
        UINT32 | INT32 => r.take(4).map(|_| ()),
        UINT64 | INT64 => r.take(8).map(|_| ()),
        0xA0..=0xBF => r.take((marker & 0x1F) as usize).map(|_| ()),
        STR8 => {
            let len = r.next()? as usize;
            r.take(len).map(|_| ())
        }
        0x90..=0x9F => skip_values(r, (marker & 0x0F) as usize),
        ARRAY16 => {
            let len = BigEndian::read_u16(r.take(2)?) as usize;
            skip_values(r, len)
        }
        _ => Err(ErrorCode::InvalidData.into()),
    }
}

fn read_state(r: &mut ByteReader) -> Result<StateField, Error> {
    let entries = match r.peek().ok_or(ErrorCode::TruncatedFrame)? {
        marker @ 0x90..=0x9F => {
            r.next()?;
            (marker & 0x0F) as usize
        }
        ARRAY16 => {
            r.next()?;
            BigEndian::read_u16(r.take(2)?) as usize
        }
        _ => return Ok(StateField::Scalar(read_u8(r)?)),
    };

    let mut vector: Vec<u8, MAX_ACTUATORS> = Vec::new();
    for _ in 0..entries {
        let element = read_u8(r)?;
        vector.push(element).map_err(|_| ErrorCode::InvalidData)?;
    }
    Ok(StateField::Vector(vector))
}

fn decode_object(r: &mut ByteReader) -> Result<Frame, Error> {
    let marker = r.next()?;
    let entries = match marker {
        0x80..=0x8F => (marker & 0x0F) as usize,
        MAP16 => BigEndian::read_u16(r.take(2)?) as usize,
        _ => return Err(ErrorCode::InvalidData.into()),
    };

    let mut frame = Frame::empty();
    for _ in 0..entries {
        let key_len = read_str_len(r)?;
        let key = r.take(key_len)?;
        if key.len() != 1 {
            skip_value(r)?;
            continue;
        }
        match key[0] {
            k if k == KEY_PAYLOAD => frame.command = read_u8(r)?,
            k if k == KEY_ID => frame.id = read_u8(r)?,
            k if k == KEY_KIND => frame.kind = read_u8(r)?,
            k if k == KEY_CONFIRM => frame.confirm = read_u8(r)?,
            k if k == KEY_STATE => frame.state = read_state(r)?,
            _ => skip_value(r)?,
        }
    }
    Ok(frame)
}

/// Attempts to decode one object from the front of `buf`.
///
/// Returns the frame and the number of bytes it consumed, `Ok(None)` when
/// the buffer ends mid-object (wait for more input), or an error when the
/// bytes cannot form a valid object.
pub fn decode(buf: &[u8]) -> Result<Option<(Frame, usize)>, Error> {
    let mut r = ByteReader::new(buf);
    match decode_object(&mut r) {
        Ok(frame) => Ok(Some((frame, r.pos()))),
        Err(e) if e.code() == ErrorCode::TruncatedFrame => Ok(None),
        Err(e) => Err(e),
    }
}
