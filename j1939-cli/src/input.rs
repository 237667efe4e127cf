//! CSV frame input
//!
//! Reads captured frames from CSV files laid out as
//! `timestamp,can_line,id,data` (the column for the bus may also be named
//! `bus` or `channel`). Rows are deserialized lazily; a row that cannot be
//! read becomes an `InvalidData` item so the decoder reports it against its
//! position instead of stopping the run. Column names are matched after
//! trimming and lowercasing.

use anyhow::{bail, Context, Result};
use j1939_decoder::{DecoderError, RawFrame};
use std::fs::File;
use std::path::Path;

const REQUIRED_COLUMNS: &[&[&str]] = &[
    &["timestamp"],
    &["bus", "can_line", "channel"],
    &["id"],
    &["data"],
];

/// Lazy reader of raw frames from a CSV file
pub struct FrameReader {
    records: csv::DeserializeRecordsIntoIter<File, RawFrame>,
    row: usize,
}

impl FrameReader {
    /// Open a CSV file and check its header
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open input file: {:?}", path))?;

        let headers = normalize_headers(
            reader
                .headers()
                .with_context(|| format!("Failed to read CSV header: {:?}", path))?,
        );
        check_columns(&headers)?;
        reader.set_headers(headers);

        log::info!("Reading frames from {:?}", path);

        Ok(Self {
            records: reader.into_deserialize(),
            row: 0,
        })
    }
}

impl Iterator for FrameReader {
    type Item = j1939_decoder::Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.row += 1;
        let row = self.row;

        Some(record.map_err(|e| DecoderError::InvalidData(format!("row {}: {}", row, e))))
    }
}

/// Trim and lowercase column names so `Timestamp` and ` ID` match the record fields
fn normalize_headers(headers: &csv::StringRecord) -> csv::StringRecord {
    headers
        .iter()
        .map(|header| header.trim().to_ascii_lowercase())
        .collect()
}

/// Fail if any required column is missing from the header
fn check_columns(headers: &csv::StringRecord) -> Result<()> {
    for names in REQUIRED_COLUMNS {
        let found = headers
            .iter()
            .any(|header| names.contains(&header));
        if !found {
            bail!("Input is missing a column named {}", names.join(" / "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const OIL_30: &str = "0000000000000000000000000001111000000000000000000000000000000000";

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_capture_layout() {
        let file = write_csv(&format!(
            "timestamp,can_line,id,data\n1630324545.121231,can1,18FEF100,{0}\n1630324545.221231,can1,18FEF200,{0}\n",
            OIL_30
        ));

        let frames: Vec<_> = FrameReader::open(file.path()).unwrap().collect();
        assert_eq!(frames.len(), 2);

        let first = frames[0].as_ref().unwrap();
        assert_eq!(first.timestamp, 1630324545.121231);
        assert_eq!(first.bus, "can1");
        assert_eq!(first.id, "18FEF100");
        assert_eq!(first.data, OIL_30);
    }

    #[test]
    fn test_bad_row_becomes_item_error() {
        let file = write_csv(&format!(
            "timestamp,bus,id,data\nnot-a-time,can1,18FEF100,{0}\n2.0,can1,18FEF100,{0}\n",
            OIL_30
        ));

        let frames: Vec<_> = FrameReader::open(file.path()).unwrap().collect();
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            Err(DecoderError::InvalidData(msg)) => assert!(msg.starts_with("row 1:")),
            other => panic!("expected InvalidData, got {:?}", other),
        }
        assert!(frames[1].is_ok());
    }

    #[test]
    fn test_mixed_case_header() {
        let file = write_csv(&format!(
            "Timestamp, CAN_Line ,ID,Data\n1630324545.121231,can1,18FEF100,{0}\n",
            OIL_30
        ));

        let frames: Vec<_> = FrameReader::open(file.path()).unwrap().collect();
        assert_eq!(frames.len(), 1);
        let frame = frames[0].as_ref().unwrap();
        assert_eq!(frame.bus, "can1");
        assert_eq!(frame.id, "18FEF100");
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let file = write_csv("timestamp,bus,data\n1.0,can1,00\n");
        assert!(FrameReader::open(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(FrameReader::open(Path::new("/nonexistent/frames.csv")).is_err());
    }
}
