//! J1939 Decoder Library
//!
//! A stateless library for decoding SAE J1939 signals out of captured CAN
//! frames into physical engineering units.
//!
//! # Architecture
//!
//! Three pieces form a straight pipeline:
//! - [`identifier`]: splits a 29-bit CAN identifier into priority, PGN and
//!   source address
//! - [`signal`]: extracts a byte-aligned, linearly scaled field from an
//!   8-byte payload
//! - [`decoder`]: runs frames through both, keeps those matching the target
//!   PGN and collects per-frame errors without aborting
//!
//! The library does NOT:
//! - Read or write capture files
//! - Print reports
//! - Reassemble transport-protocol (multi-frame) messages
//!
//! File handling and reporting live in the application layer (j1939-cli).
//!
//! # Example Usage
//!
//! ```
//! use j1939_decoder::{CanFrame, Decoder, Payload, SignalDefinition};
//!
//! let decoder = Decoder::new(SignalDefinition::engine_oil_pressure()).unwrap();
//!
//! let frames = vec![
//!     CanFrame::new(1630324545.12, "can1", 0x18FEF100, Payload::new([0, 0, 0, 0x1E, 0, 0, 0, 0])),
//!     CanFrame::new(1630324545.22, "can1", 0x18FEF200, Payload::new([0; 8])),
//! ];
//!
//! let report = decoder.process(frames);
//! assert_eq!(report.records.len(), 1);
//! assert_eq!(report.records[0].physical_value, 120.0);
//! assert!(report.errors.is_empty());
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod identifier;
pub mod signal;
pub mod stats;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::{process, DecodeReport, Decoder, DecodingIterator};
pub use identifier::{decode_identifier, parse_identifier, J1939Identifier, MAX_IDENTIFIER};
pub use signal::{extract_raw, extract_signal, SignalDefinition};
pub use stats::SignalStats;
pub use types::{
    CanFrame, DataEncoding, DecodedRecord, DecoderError, FrameError, IntoCanFrame, Payload,
    RawFrame, Result, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
