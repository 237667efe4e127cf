//! Configuration loading and parsing
//!
//! The run configuration can come from a TOML file, from command-line flags,
//! or both. Flags override individual signal fields from the file.

use anyhow::{bail, Context, Result};
use j1939_decoder::{DataEncoding, DecoderConfig, SignalDefinition};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    pub signal: Option<SignalDefinition>,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub filtering: FilteringConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub data_encoding: DataEncoding,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilteringConfig {
    pub buses: Option<Vec<String>>,
    pub source_addresses: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl AppConfig {
    /// Decoder library configuration derived from this file
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            bus_filter: self.filtering.buses.clone(),
            source_filter: self.filtering.source_addresses.clone(),
            data_encoding: self.input.data_encoding,
        }
    }
}

/// Signal fields given on the command line
#[derive(Debug, Clone, Default)]
pub struct SignalOverrides {
    pub name: Option<String>,
    pub spn: Option<u32>,
    pub pgn: Option<u16>,
    pub byte_offset: Option<u8>,
    pub bit_width: Option<u8>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub unit: Option<String>,
}

/// Combine a base definition (preset or config file) with command-line fields
///
/// Without a base, at least the PGN and byte offset must be given.
pub fn resolve_signal(
    base: Option<SignalDefinition>,
    overrides: &SignalOverrides,
) -> Result<SignalDefinition> {
    let mut signal = match (base, overrides.pgn, overrides.byte_offset) {
        (Some(signal), _, _) => signal,
        (None, Some(pgn), Some(byte_offset)) => {
            SignalDefinition::new("physical_value", pgn, byte_offset)
        }
        (None, _, _) => bail!(
            "No signal definition: use --preset, a [signal] table in --config, or --pgn with --byte-offset"
        ),
    };

    if let Some(name) = &overrides.name {
        signal.name = name.clone();
    }
    if let Some(spn) = overrides.spn {
        signal.spn = Some(spn);
    }
    if let Some(pgn) = overrides.pgn {
        signal.pgn = pgn;
    }
    if let Some(byte_offset) = overrides.byte_offset {
        signal.byte_offset = byte_offset;
    }
    if let Some(bit_width) = overrides.bit_width {
        signal.bit_width = bit_width;
    }
    if let Some(scale) = overrides.scale {
        signal.scale = scale;
    }
    if let Some(offset) = overrides.offset {
        signal.offset = offset;
    }
    if let Some(unit) = &overrides.unit {
        signal.unit = unit.clone();
    }

    Ok(signal)
}

/// Parse a PGN given as decimal (`65265`) or `0x`-prefixed hex (`0xFEF1`)
pub fn parse_pgn(text: &str) -> std::result::Result<u16, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid PGN {:?}: {}", text, e))
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(signal) = &config.signal {
        signal
            .validate()
            .with_context(|| format!("Invalid [signal] in config file: {:?}", path))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [signal]
            name = "oil_pressure_kpa"
            spn = 100
            pgn = 0xFEF1
            byte_offset = 3
            scale = 4.0
            unit = "kPa"

            [input]
            data_encoding = "hex"

            [filtering]
            buses = ["can1"]
            source_addresses = [0]

            [output]
            format = "json"
            strict = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        let signal = config.signal.clone().unwrap();
        assert_eq!(signal, SignalDefinition::engine_oil_pressure());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.strict);
        assert!(!config.output.parallel);

        let decoder_config = config.decoder_config();
        assert_eq!(decoder_config.data_encoding, DataEncoding::Hex);
        assert!(decoder_config.should_process_bus("can1"));
        assert!(!decoder_config.should_process_bus("can2"));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.signal.is_none());
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.input.data_encoding, DataEncoding::Bits);
    }

    #[test]
    fn test_resolve_signal_overrides_base() {
        let overrides = SignalOverrides {
            byte_offset: Some(4),
            unit: Some("psi".to_string()),
            ..Default::default()
        };
        let signal =
            resolve_signal(Some(SignalDefinition::engine_oil_pressure()), &overrides).unwrap();
        assert_eq!(signal.byte_offset, 4);
        assert_eq!(signal.unit, "psi");
        assert_eq!(signal.pgn, 0xFEF1);
        assert_eq!(signal.scale, 4.0);
    }

    #[test]
    fn test_resolve_signal_from_flags_only() {
        let overrides = SignalOverrides {
            pgn: Some(0xFEEE),
            byte_offset: Some(0),
            offset: Some(-40.0),
            ..Default::default()
        };
        let signal = resolve_signal(None, &overrides).unwrap();
        assert_eq!(signal.pgn, 0xFEEE);
        assert_eq!(signal.offset, -40.0);
        assert_eq!(signal.bit_width, 8);

        let incomplete = SignalOverrides {
            pgn: Some(0xFEEE),
            ..Default::default()
        };
        assert!(resolve_signal(None, &incomplete).is_err());
    }

    #[test]
    fn test_parse_pgn() {
        assert_eq!(parse_pgn("0xFEF1"), Ok(0xFEF1));
        assert_eq!(parse_pgn("0Xfef1"), Ok(0xFEF1));
        assert_eq!(parse_pgn("65265"), Ok(0xFEF1));
        assert!(parse_pgn("FEF1").is_err());
        assert!(parse_pgn("0x1FEF1").is_err());
    }
}
