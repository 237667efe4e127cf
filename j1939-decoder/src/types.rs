//! Core types for the J1939 decoder library
//!
//! This module defines the values that flow through the decoding pipeline:
//! captured frames going in, decoded parameter records coming out, and the
//! errors attached to individual frames along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used for human-readable output
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Number of bytes in a classic CAN payload
pub const PAYLOAD_LEN: usize = 8;

/// Number of bits in a classic CAN payload
pub const PAYLOAD_BITS: usize = PAYLOAD_LEN * 8;

/// Errors that can occur during decoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Signal field out of range: byte offset {byte_offset}, bit width {bit_width}")]
    OutOfRange { byte_offset: u8, bit_width: u8 },

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// A decoding failure tied to the position of the frame that caused it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("frame {index}: {error}")]
pub struct FrameError {
    /// 0-based position of the frame in the input sequence
    pub index: usize,
    /// What went wrong with this frame
    #[source]
    pub error: DecoderError,
}

impl FrameError {
    pub fn new(index: usize, error: DecoderError) -> Self {
        Self { index, error }
    }
}

/// How the `data` column of a raw frame is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataEncoding {
    /// 64 characters of '0'/'1', most significant bit first
    #[default]
    Bits,
    /// 16 hexadecimal digits, first byte first
    Hex,
}

/// Fixed 8-byte CAN payload
///
/// Always exactly 64 bits. The constructors reject any other length instead of
/// truncating or padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    pub const fn new(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a payload from a byte slice that must hold exactly 8 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PAYLOAD_LEN] = bytes.try_into().map_err(|_| {
            DecoderError::MalformedPayload(format!(
                "expected {} bytes, got {}",
                PAYLOAD_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse a string of 64 '0'/'1' characters (big-endian bit order)
    pub fn from_bit_str(bits: &str) -> Result<Self> {
        let bits = bits.trim();
        let len = bits.chars().count();
        if len != PAYLOAD_BITS {
            return Err(DecoderError::MalformedPayload(format!(
                "expected {} bits, got {}",
                PAYLOAD_BITS, len
            )));
        }

        let mut value: u64 = 0;
        for (pos, ch) in bits.chars().enumerate() {
            let bit = match ch {
                '0' => 0,
                '1' => 1,
                other => {
                    return Err(DecoderError::MalformedPayload(format!(
                        "invalid bit character {:?} at position {}",
                        other, pos
                    )))
                }
            };
            value = (value << 1) | bit;
        }

        Ok(Self(value.to_be_bytes()))
    }

    /// Parse 16 hex digits, first byte first
    ///
    /// Groups may be separated by whitespace, `,`, `:` or `-`, and each group
    /// may carry a `0x` prefix. This accepts plain `00001E...`, `0x00001E...`
    /// and the [`Display`](fmt::Display) form `0x00,0x1E,...`.
    pub fn from_hex_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let digits: String = text
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-'))
            .map(|group| {
                group
                    .strip_prefix("0x")
                    .or_else(|| group.strip_prefix("0X"))
                    .unwrap_or(group)
            })
            .collect();

        let bytes = hex::decode(&digits).map_err(|e| {
            DecoderError::MalformedPayload(format!("invalid hex payload {:?}: {}", text, e))
        })?;
        Self::from_slice(&bytes)
    }

    /// Parse a payload string in the given encoding
    pub fn parse(text: &str, encoding: DataEncoding) -> Result<Self> {
        match encoding {
            DataEncoding::Bits => Self::from_bit_str(text),
            DataEncoding::Hex => Self::from_hex_str(text),
        }
    }

    pub fn bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// The payload as one 64-bit big-endian integer (byte 0 is most significant)
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Render as a 64-character bit string
    pub fn to_bit_string(&self) -> String {
        format!("{:064b}", self.as_u64())
    }
}

impl From<[u8; PAYLOAD_LEN]> for Payload {
    fn from(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Payload {
    type Error = DecoderError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Display for Payload {
    /// Comma separated `0x..` bytes, e.g. `0x00,0x1E,...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "0x{:02X}", byte)?;
        }
        Ok(())
    }
}

/// A captured CAN frame
///
/// The identifier is kept exactly as captured. Whether it fits in 29 bits is
/// checked when the frame is decoded, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame {
    /// Capture time in seconds (fractional part preserved)
    pub timestamp: f64,
    /// Physical channel the frame was captured on (e.g. "can1")
    pub bus: String,
    /// Raw CAN identifier
    pub identifier: u32,
    /// Frame data
    pub payload: Payload,
}

impl CanFrame {
    pub fn new(timestamp: f64, bus: impl Into<String>, identifier: u32, payload: Payload) -> Self {
        Self {
            timestamp,
            bus: bus.into(),
            identifier,
            payload,
        }
    }
}

/// A frame record as supplied by an input collaborator
///
/// Field names follow the common capture export layout
/// (`timestamp,can_line,id,data`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub timestamp: f64,
    #[serde(alias = "can_line", alias = "channel")]
    pub bus: String,
    pub id: String,
    pub data: String,
}

impl RawFrame {
    /// Convert into a typed frame, parsing `data` with the given encoding
    pub fn to_can_frame(&self, encoding: DataEncoding) -> Result<CanFrame> {
        let identifier = crate::identifier::parse_identifier(&self.id)?;
        let payload = Payload::parse(&self.data, encoding)?;
        Ok(CanFrame::new(self.timestamp, self.bus.clone(), identifier, payload))
    }
}

/// Anything the pipeline can turn into a [`CanFrame`]
///
/// Input collaborators that already failed to read a record pass the failure
/// through as `Err`; it is reported against that record's position.
pub trait IntoCanFrame {
    /// Bus the item was captured on, if known before conversion
    ///
    /// Lets the bus filter drop an item without parsing its identifier or data.
    fn bus(&self) -> Option<&str>;

    fn into_can_frame(self, encoding: DataEncoding) -> Result<CanFrame>;
}

impl IntoCanFrame for CanFrame {
    fn bus(&self) -> Option<&str> {
        Some(&self.bus)
    }

    fn into_can_frame(self, _encoding: DataEncoding) -> Result<CanFrame> {
        Ok(self)
    }
}

impl IntoCanFrame for RawFrame {
    fn bus(&self) -> Option<&str> {
        Some(&self.bus)
    }

    fn into_can_frame(self, encoding: DataEncoding) -> Result<CanFrame> {
        self.to_can_frame(encoding)
    }
}

impl<T: IntoCanFrame> IntoCanFrame for Result<T> {
    fn bus(&self) -> Option<&str> {
        self.as_ref().ok().and_then(|frame| frame.bus())
    }

    fn into_can_frame(self, encoding: DataEncoding) -> Result<CanFrame> {
        self.and_then(|frame| frame.into_can_frame(encoding))
    }
}

/// A decoded parameter value - the output of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Capture time of the source frame in seconds
    pub timestamp: f64,
    /// Parameter Group Number of the source frame
    pub pgn: u16,
    /// Value after scale and offset
    pub physical_value: f64,
    /// Source Address of the sending controller
    pub source_address: u8,
    /// Full identifier of the source frame
    pub identifier: u32,
    /// Unscaled field value (useful for debugging)
    pub raw_value: u64,
}

impl DecodedRecord {
    /// Timestamp truncated to whole seconds
    pub fn timestamp_secs(&self) -> i64 {
        self.timestamp.trunc() as i64
    }

    /// PGN as uppercase hex with `0x` prefix, e.g. `0xFEF1`
    pub fn pgn_hex(&self) -> String {
        format!("0x{:X}", self.pgn)
    }

    /// Identifier as 8 uppercase hex digits, e.g. `18FEF100`
    pub fn identifier_hex(&self) -> String {
        format!("{:08X}", self.identifier)
    }

    /// Capture time as a UTC date, if the timestamp is representable
    pub fn datetime(&self) -> Option<Timestamp> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let secs = self.timestamp.floor();
        let nsecs = ((self.timestamp - secs) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(secs as i64, nsecs.min(999_999_999))
    }
}
