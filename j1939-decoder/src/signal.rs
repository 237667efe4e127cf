//! Signal definitions and extraction
//!
//! A signal is a byte-aligned field of up to 8 bits inside the payload of a
//! single-frame parameter group. The payload is treated as one big-endian
//! 64-bit string: bit 0 is the most significant bit of byte 0. A field of
//! `bit_width` bits starting at `byte_offset * 8` is read as an unsigned
//! integer and mapped to a physical value with `raw * scale + offset`.
//!
//! Only unsigned fields are supported. Pressure, level and temperature SPNs
//! of this class are unsigned in J1939; signed fields would need their own
//! sign handling and are not decoded here.

use crate::types::{DecoderError, Payload, Result, PAYLOAD_BITS, PAYLOAD_LEN};
use serde::{Deserialize, Serialize};

/// Widest field this extractor handles without crossing a byte boundary
pub const MAX_BIT_WIDTH: u8 = 8;

/// Engine Fluid Level/Pressure 1 (65265)
pub const PGN_ENGINE_FLUID_LEVEL_PRESSURE_1: u16 = 0xFEF1;

/// Static description of one signal to decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    /// Signal name, also used as the value column header in output
    #[serde(default = "default_name")]
    pub name: String,
    /// Suspect Parameter Number, for documentation
    #[serde(default)]
    pub spn: Option<u32>,
    /// Parameter group that carries the signal
    pub pgn: u16,
    /// 0-based index of the byte holding the signal
    pub byte_offset: u8,
    /// Field width in bits (1-8)
    #[serde(default = "default_bit_width")]
    pub bit_width: u8,
    /// Physical units per raw bit
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Added after scaling
    #[serde(default)]
    pub offset: f64,
    /// Engineering unit (e.g., "kPa")
    #[serde(default)]
    pub unit: String,
}

fn default_name() -> String {
    "physical_value".to_string()
}

fn default_bit_width() -> u8 {
    MAX_BIT_WIDTH
}

fn default_scale() -> f64 {
    1.0
}

impl SignalDefinition {
    /// Create a full-byte signal with unit scale and no offset
    pub fn new(name: impl Into<String>, pgn: u16, byte_offset: u8) -> Self {
        Self {
            name: name.into(),
            spn: None,
            pgn,
            byte_offset,
            bit_width: MAX_BIT_WIDTH,
            scale: 1.0,
            offset: 0.0,
            unit: String::new(),
        }
    }

    /// SPN 100, Engine Oil Pressure: byte 4 of PGN 65265 at 4 kPa/bit
    pub fn engine_oil_pressure() -> Self {
        Self::new("oil_pressure_kpa", PGN_ENGINE_FLUID_LEVEL_PRESSURE_1, 3)
            .with_spn(100)
            .with_scaling(4.0, 0.0)
            .with_unit("kPa")
    }

    /// Builder method: set the SPN
    pub fn with_spn(mut self, spn: u32) -> Self {
        self.spn = Some(spn);
        self
    }

    /// Builder method: set the field width in bits
    pub fn with_bit_width(mut self, bit_width: u8) -> Self {
        self.bit_width = bit_width;
        self
    }

    /// Builder method: set scale and offset
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Builder method: set the engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Check that the field fits in one payload byte and the scaling is usable
    pub fn validate(&self) -> Result<()> {
        self.check_range()?;

        if !self.scale.is_finite() || !self.offset.is_finite() {
            return Err(DecoderError::InvalidSignalDefinition(format!(
                "signal '{}' has non-finite scale {} or offset {}",
                self.name, self.scale, self.offset
            )));
        }

        Ok(())
    }

    /// Map a raw field value to physical units
    pub fn physical_value(&self, raw: u64) -> f64 {
        raw as f64 * self.scale + self.offset
    }

    /// Bit position of the field's most significant bit
    pub fn start_bit(&self) -> usize {
        self.byte_offset as usize * 8
    }

    fn check_range(&self) -> Result<()> {
        let out_of_range = DecoderError::OutOfRange {
            byte_offset: self.byte_offset,
            bit_width: self.bit_width,
        };

        if self.bit_width == 0 || self.bit_width > MAX_BIT_WIDTH {
            return Err(out_of_range);
        }

        let bytes_needed = (self.bit_width as usize + 7) / 8;
        if self.byte_offset as usize + bytes_needed > PAYLOAD_LEN {
            return Err(out_of_range);
        }

        Ok(())
    }
}

/// Read the unscaled field value described by `def`
pub fn extract_raw(payload: &Payload, def: &SignalDefinition) -> Result<u64> {
    def.check_range()?;

    let width = def.bit_width as usize;
    let shift = PAYLOAD_BITS - def.start_bit() - width;
    let mask = (1u64 << width) - 1;

    Ok((payload.as_u64() >> shift) & mask)
}

/// Decode the physical value of `def` from `payload`
pub fn extract_signal(payload: &Payload, def: &SignalDefinition) -> Result<f64> {
    let raw = extract_raw(payload, def)?;
    let physical = def.physical_value(raw);

    log::trace!(
        "{}: raw {} (0b{:0width$b}) -> {} {}",
        def.name,
        raw,
        raw,
        physical,
        def.unit,
        width = def.bit_width as usize
    );

    Ok(physical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with(byte_offset: usize, value: u8) -> Payload {
        let mut bytes = [0u8; PAYLOAD_LEN];
        bytes[byte_offset] = value;
        Payload::new(bytes)
    }

    #[test]
    fn test_oil_pressure_example() {
        let def = SignalDefinition::engine_oil_pressure();
        let payload = payload_with(3, 0x1E);
        assert_eq!(extract_raw(&payload, &def).unwrap(), 30);
        assert_eq!(extract_signal(&payload, &def).unwrap(), 120.0);
    }

    #[test]
    fn test_scale_and_offset_applied() {
        // Coolant temperature style: 1 degC/bit, -40 offset
        let def = SignalDefinition::new("coolant_temp", 0xFEEE, 0)
            .with_scaling(1.0, -40.0)
            .with_unit("degC");
        let payload = payload_with(0, 0x64);
        assert_eq!(extract_signal(&payload, &def).unwrap(), 60.0);

        let def = SignalDefinition::new("fuel_level", 0xFEFC, 1).with_scaling(0.4, 0.0);
        let payload = payload_with(1, 250);
        assert!((extract_signal(&payload, &def).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_every_byte_value() {
        let def = SignalDefinition::new("probe", 0xFEF1, 3).with_scaling(4.0, 0.0);
        for value in 0..=u8::MAX {
            let payload = payload_with(3, value);
            assert_eq!(
                extract_signal(&payload, &def).unwrap(),
                value as f64 * 4.0
            );
        }
    }

    #[test]
    fn test_only_target_byte_is_read() {
        let def = SignalDefinition::new("probe", 0xFEF1, 3);
        let payload = Payload::new([0xFF, 0xFF, 0xFF, 0x1E, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(extract_raw(&payload, &def).unwrap(), 0x1E);
    }

    #[test]
    fn test_narrow_field_reads_high_bits() {
        // 0b1011_0110: top 2 bits = 0b10, top 4 bits = 0b1011
        let payload = payload_with(2, 0b1011_0110);
        let two_bits = SignalDefinition::new("status", 0xFEF1, 2).with_bit_width(2);
        let four_bits = SignalDefinition::new("nibble", 0xFEF1, 2).with_bit_width(4);
        let one_bit = SignalDefinition::new("flag", 0xFEF1, 2).with_bit_width(1);

        assert_eq!(extract_raw(&payload, &two_bits).unwrap(), 0b10);
        assert_eq!(extract_raw(&payload, &four_bits).unwrap(), 0b1011);
        assert_eq!(extract_raw(&payload, &one_bit).unwrap(), 1);
    }

    #[test]
    fn test_last_byte_is_valid() {
        let def = SignalDefinition::new("last", 0xFEF1, 7);
        assert!(def.validate().is_ok());
        assert_eq!(extract_raw(&payload_with(7, 0xAB), &def).unwrap(), 0xAB);
    }

    #[test]
    fn test_out_of_range_definitions() {
        let payload = Payload::default();
        let cases = [
            SignalDefinition::new("past_end", 0xFEF1, 8),
            SignalDefinition::new("far_past_end", 0xFEF1, 200),
            SignalDefinition::new("crosses_byte", 0xFEF1, 3).with_bit_width(9),
            SignalDefinition::new("two_bytes", 0xFEF1, 7).with_bit_width(16),
            SignalDefinition::new("empty", 0xFEF1, 0).with_bit_width(0),
        ];

        for def in cases {
            assert!(
                matches!(
                    extract_signal(&payload, &def),
                    Err(DecoderError::OutOfRange { .. })
                ),
                "{} should be out of range",
                def.name
            );
            assert!(matches!(def.validate(), Err(DecoderError::OutOfRange { .. })));
        }
    }

    #[test]
    fn test_non_finite_scaling_rejected() {
        let def = SignalDefinition::new("nan", 0xFEF1, 0).with_scaling(f64::NAN, 0.0);
        assert!(matches!(
            def.validate(),
            Err(DecoderError::InvalidSignalDefinition(_))
        ));

        let def = SignalDefinition::new("inf", 0xFEF1, 0).with_scaling(1.0, f64::INFINITY);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let def = SignalDefinition::engine_oil_pressure();
        let payload = Payload::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        let first = extract_signal(&payload, &def).unwrap();
        let second = extract_signal(&payload, &def).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
        assert_eq!(first, 0x78 as f64 * 4.0);
    }

    #[test]
    fn test_definition_defaults_from_serde() {
        let def: SignalDefinition =
            serde_json::from_str(r#"{"pgn": 65265, "byte_offset": 3}"#).unwrap();
        assert_eq!(def.name, "physical_value");
        assert_eq!(def.bit_width, 8);
        assert_eq!(def.scale, 1.0);
        assert_eq!(def.offset, 0.0);
        assert_eq!(def.spn, None);
    }
}
