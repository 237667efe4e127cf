//! Decoder configuration types
//!
//! The target signal is passed to the decoder on its own; this holds the
//! optional knobs around it (frame filters and the input data encoding).

use crate::types::DataEncoding;
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Optional: only decode frames captured on these buses
    #[serde(default)]
    pub bus_filter: Option<Vec<String>>,

    /// Optional: only decode frames sent from these source addresses
    #[serde(default)]
    pub source_filter: Option<Vec<u8>>,

    /// Encoding of the `data` field in raw input records
    #[serde(default)]
    pub data_encoding: DataEncoding,
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set bus filter
    pub fn with_bus_filter<S: Into<String>>(mut self, buses: impl IntoIterator<Item = S>) -> Self {
        self.bus_filter = Some(buses.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: set source address filter
    pub fn with_source_filter(mut self, sources: Vec<u8>) -> Self {
        self.source_filter = Some(sources);
        self
    }

    /// Builder method: set the raw data encoding
    pub fn with_data_encoding(mut self, encoding: DataEncoding) -> Self {
        self.data_encoding = encoding;
        self
    }

    /// Check if a bus should be processed
    pub fn should_process_bus(&self, bus: &str) -> bool {
        match &self.bus_filter {
            Some(buses) => buses.iter().any(|b| b == bus),
            None => true,
        }
    }

    /// Check if a source address should be processed
    pub fn should_process_source(&self, source_address: u8) -> bool {
        match &self.source_filter {
            Some(sources) => sources.contains(&source_address),
            None => true,
        }
    }
}
