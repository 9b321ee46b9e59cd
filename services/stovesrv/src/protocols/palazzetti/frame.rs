//! Frame codec
//!
//! Every frame on the wire is exactly 11 bytes:
//!
//! ```text
//! ┌────┬──────────────────────────────┬──────────┐
//! │ id │ payload (9 bytes)            │ checksum │
//! └────┴──────────────────────────────┴──────────┘
//! checksum = low byte of (id + sum(payload))
//! ```
//!
//! Request payloads start with the register address, LSB first.

use std::fmt;

use bytes::{Buf, BytesMut};
use thiserror::Error;

use super::constants::{FRAME_SIZE, MAX_VALUE_SIZE, PAYLOAD_SIZE, READ_ID, SYNC_ID, WRITE_ID};

/// Frame codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame length: expected {FRAME_SIZE} bytes, got {0}")]
    InvalidLength(usize),

    #[error("Value too long: {len} bytes, at most {MAX_VALUE_SIZE} fit after the address")]
    ValueTooLong { len: usize },
}

/// 16-bit register address
///
/// Referenced as `[MSB, LSB]`, transmitted as `[LSB, MSB]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddress(u16);

impl RegisterAddress {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn from_bytes(msb: u8, lsb: u8) -> Self {
        Self(((msb as u16) << 8) | lsb as u16)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn msb(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn lsb(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Address `n` registers further along a table
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }

    /// Address as it appears in a request payload
    pub const fn wire_bytes(self) -> [u8; 2] {
        [self.lsb(), self.msb()]
    }
}

impl From<[u8; 2]> for RegisterAddress {
    fn from(bytes: [u8; 2]) -> Self {
        Self::from_bytes(bytes[0], bytes[1])
    }
}

impl From<u16> for RegisterAddress {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

#[inline]
fn compute_checksum(id: u8, payload: &[u8; PAYLOAD_SIZE]) -> u8 {
    payload.iter().fold(id, |acc, b| acc.wrapping_add(*b))
}

/// One protocol frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    id: u8,
    payload: [u8; PAYLOAD_SIZE],
    checksum: u8,
}

impl Frame {
    /// Build a frame with a correct checksum; `data` longer than the payload is cut
    pub fn new(id: u8, data: &[u8]) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        let len = data.len().min(PAYLOAD_SIZE);
        payload[..len].copy_from_slice(&data[..len]);
        Self {
            id,
            payload,
            checksum: compute_checksum(id, &payload),
        }
    }

    /// Heartbeat frame as emitted by the stove
    pub fn sync() -> Self {
        Self::new(SYNC_ID, &[])
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }

    /// Checksum carried by the frame (not recomputed)
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    pub fn is_valid(&self) -> bool {
        compute_checksum(self.id, &self.payload) == self.checksum
    }

    pub fn is_sync(&self) -> bool {
        self.id == SYNC_ID
    }

    /// A response matches a request when the ids are equal
    pub fn matches(&self, request: &Frame) -> bool {
        self.id == request.id
    }

    /// Register address carried by a request frame
    pub fn address(&self) -> RegisterAddress {
        RegisterAddress::from_bytes(self.payload[1], self.payload[0])
    }

    /// Wire bytes with a freshly computed checksum
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0] = self.id;
        bytes[1..=PAYLOAD_SIZE].copy_from_slice(&self.payload);
        bytes[FRAME_SIZE - 1] = compute_checksum(self.id, &self.payload);
        bytes
    }

    /// Parse wire bytes; the checksum is kept as carried, check with `is_valid`
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != FRAME_SIZE {
            return Err(FrameError::InvalidLength(bytes.len()));
        }
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[1..=PAYLOAD_SIZE]);
        Ok(Self {
            id: bytes[0],
            payload,
            checksum: bytes[FRAME_SIZE - 1],
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(ID=0x{:02X}, Data=[{}], CS=0x{:02X}, Valid={})",
            self.id,
            common::hex::format_spaced(&self.payload),
            self.checksum,
            self.is_valid()
        )
    }
}

/// Read request for `address`
pub fn construct_read(address: RegisterAddress) -> Frame {
    Frame::new(READ_ID, &address.wire_bytes())
}

/// Write request for `address`; at most 7 value bytes fit
pub fn construct_write(address: RegisterAddress, value: &[u8]) -> Result<Frame, FrameError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(FrameError::ValueTooLong { len: value.len() });
    }
    let mut data = [0u8; PAYLOAD_SIZE];
    data[..2].copy_from_slice(&address.wire_bytes());
    data[2..2 + value.len()].copy_from_slice(value);
    Ok(Frame::new(WRITE_ID, &data))
}

/// Extracts frames from a raw byte stream
///
/// Bytes that do not start a valid frame are dropped one at a time until the
/// stream lines up again.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: BytesMut,
    discarded: u64,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(FRAME_SIZE * 4),
            discarded: 0,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next valid frame in the buffer, if a complete one is there
    pub fn next_frame(&mut self) -> Option<Frame> {
        while self.buffer.len() >= FRAME_SIZE {
            match Frame::decode(&self.buffer[..FRAME_SIZE]) {
                Ok(frame) if frame.is_valid() => {
                    self.buffer.advance(FRAME_SIZE);
                    return Some(frame);
                },
                _ => {
                    self.buffer.advance(1);
                    self.discarded += 1;
                },
            }
        }
        None
    }

    /// Bytes waiting for more input
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discarded byte count since the last call
    pub fn take_discarded(&mut self) -> u64 {
        std::mem::take(&mut self.discarded)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
