//! J1939 identifier decoding
//!
//! A 29-bit extended CAN identifier carries three J1939 fields:
//!
//! ```text
//! bits 28..26   priority
//! bits 23..8    PGN (PDU format byte, PDU specific byte)
//! bits 7..0     source address
//! ```
//!
//! The PGN is taken as the 16 bits above the source address; the data page
//! bits (24, 25) are not part of it. Identifiers
//! wider than 29 bits are rejected rather than masked so capture bugs surface.

use crate::types::{DecoderError, Result};
use serde::Serialize;
use std::fmt;

/// Largest value a 29-bit identifier can hold
pub const MAX_IDENTIFIER: u32 = 0x1FFF_FFFF;

/// PDU formats at or above this value are broadcast (PDU2)
const PDU2_THRESHOLD: u8 = 240;

/// Fields carried by a 29-bit J1939 identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct J1939Identifier {
    /// Message priority, 0 (highest) to 7
    pub priority: u8,
    /// Parameter Group Number (identifier bits 8-23)
    pub pgn: u16,
    /// Address of the transmitting controller
    pub source_address: u8,
}

impl J1939Identifier {
    /// PDU Format byte (high byte of the PGN)
    pub fn pdu_format(&self) -> u8 {
        (self.pgn >> 8) as u8
    }

    /// PDU Specific byte (low byte of the PGN)
    pub fn pdu_specific(&self) -> u8 {
        (self.pgn & 0xFF) as u8
    }

    /// True for broadcast parameter groups
    pub fn is_pdu2(&self) -> bool {
        self.pdu_format() >= PDU2_THRESHOLD
    }

    /// Destination address for peer-to-peer (PDU1) groups
    pub fn destination_address(&self) -> Option<u8> {
        if self.is_pdu2() {
            None
        } else {
            Some(self.pdu_specific())
        }
    }
}

impl fmt::Display for J1939Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PGN 0x{:04X} (P{} SA 0x{:02X})",
            self.pgn, self.priority, self.source_address
        )
    }
}

/// Split a raw 29-bit identifier into priority, PGN and source address
pub fn decode_identifier(raw: u32) -> Result<J1939Identifier> {
    if raw > MAX_IDENTIFIER {
        return Err(DecoderError::InvalidIdentifier(format!(
            "0x{:X} is wider than 29 bits",
            raw
        )));
    }

    Ok(J1939Identifier {
        priority: ((raw >> 26) & 0x7) as u8,
        pgn: ((raw >> 8) & 0xFFFF) as u16,
        source_address: (raw & 0xFF) as u8,
    })
}

/// Parse the hexadecimal text form of an identifier (e.g. `"18FEF100"`)
pub fn parse_identifier(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(DecoderError::InvalidIdentifier(format!(
            "empty identifier {:?}",
            text
        )));
    }

    u32::from_str_radix(digits, 16).map_err(|e| {
        DecoderError::InvalidIdentifier(format!("{:?} is not a hex identifier: {}", text, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_engine_fluid_identifier() {
        let id = decode_identifier(0x18FEF100).unwrap();
        assert_eq!(id.priority, 6);
        assert_eq!(id.pgn, 0xFEF1);
        assert_eq!(id.pgn, 65265);
        assert_eq!(id.source_address, 0x00);
        assert!(id.is_pdu2());
        assert_eq!(id.destination_address(), None);
    }

    #[test]
    fn test_decode_pdu1_identifier() {
        // Request PGN addressed to 0x17 from 0xF9
        let id = decode_identifier(0x18EA17F9).unwrap();
        assert_eq!(id.pgn, 0xEA17);
        assert_eq!(id.pdu_format(), 0xEA);
        assert_eq!(id.destination_address(), Some(0x17));
        assert_eq!(id.source_address, 0xF9);
    }

    #[test]
    fn test_field_extraction_matches_masks() {
        let samples = [
            0u32,
            1,
            0xFF,
            0x0CF00400,
            0x18FEF100,
            0x18FEF2AB,
            0x1CEBFF00,
            0x1555_5555,
            MAX_IDENTIFIER,
        ];
        for raw in samples {
            let id = decode_identifier(raw).unwrap();
            assert_eq!(id.pgn as u32, (raw >> 8) & 0xFFFF, "raw 0x{:X}", raw);
            assert_eq!(id.source_address as u32, raw & 0xFF, "raw 0x{:X}", raw);
            assert_eq!(id.priority as u32, (raw >> 26) & 0x7, "raw 0x{:X}", raw);
        }
    }

    #[test]
    fn test_wide_identifier_rejected() {
        assert!(decode_identifier(MAX_IDENTIFIER).is_ok());
        assert!(matches!(
            decode_identifier(MAX_IDENTIFIER + 1),
            Err(DecoderError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            decode_identifier(0x98FEF100),
            Err(DecoderError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_identifier_forms() {
        assert_eq!(parse_identifier("18FEF100").unwrap(), 0x18FEF100);
        assert_eq!(parse_identifier("0x18fef100").unwrap(), 0x18FEF100);
        assert_eq!(parse_identifier("  0X18FEF100 ").unwrap(), 0x18FEF100);
    }

    #[test]
    fn test_parse_identifier_rejects_garbage() {
        for text in ["", "0x", "18FEG100", "118FEF1000", "-1"] {
            assert!(
                matches!(parse_identifier(text), Err(DecoderError::InvalidIdentifier(_))),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_identifier_display() {
        let id = decode_identifier(0x18FEF100).unwrap();
        assert_eq!(id.to_string(), "PGN 0xFEF1 (P6 SA 0x00)");
    }
}
