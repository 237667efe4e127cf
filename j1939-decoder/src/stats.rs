//! Summary statistics over decoded records
//!
//! Computed after the pipeline has run, as a fold over its output. Nothing
//! here feeds back into decoding.

use crate::types::DecodedRecord;
use serde::Serialize;

/// Count, range and mean of decoded physical values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SignalStats {
    /// Fold over physical values. Returns `None` for an empty sequence.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (count, sum, min, max) = values.into_iter().fold(
            (0usize, 0.0f64, f64::INFINITY, f64::NEG_INFINITY),
            |(count, sum, min, max), v| (count + 1, sum + v, min.min(v), max.max(v)),
        );

        if count == 0 {
            return None;
        }

        Some(Self {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }

    /// Statistics of the `physical_value` of each record
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DecodedRecord>) -> Option<Self> {
        Self::from_values(records.into_iter().map(|r| r.physical_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: f64) -> DecodedRecord {
        DecodedRecord {
            timestamp: 0.0,
            pgn: 0xFEF1,
            physical_value: value,
            source_address: 0,
            identifier: 0x18FEF100,
            raw_value: 0,
        }
    }

    #[test]
    fn test_empty_has_no_stats() {
        assert_eq!(SignalStats::from_values(Vec::new()), None);
        assert_eq!(SignalStats::from_records(&Vec::<DecodedRecord>::new()), None);
    }

    #[test]
    fn test_constant_values() {
        let records = vec![record(120.0), record(120.0), record(120.0)];
        let stats = SignalStats::from_records(&records).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 120.0);
        assert_eq!(stats.max, 120.0);
        assert_eq!(stats.mean, 120.0);
    }

    #[test]
    fn test_mixed_values() {
        let stats = SignalStats::from_values([100.0, 396.0, 212.0, 4.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 4.0);
        assert_eq!(stats.max, 396.0);
        assert_eq!(stats.mean, 178.0);
    }

    #[test]
    fn test_negative_values() {
        let stats = SignalStats::from_values([-40.0, 10.0]).unwrap();
        assert_eq!(stats.min, -40.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean, -15.0);
    }
}
