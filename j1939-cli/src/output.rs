//! Decoded record output (CSV/JSON) and raw frame dumps

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use j1939_decoder::{CanFrame, DecodedRecord, SignalDefinition};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Open the output file, or stdout when no path is given
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    timestamp: i64,
    pgn: String,
    signal: &'a str,
    physical_value: f64,
    unit: &'a str,
    source_address: u8,
    original_can_id: String,
}

/// Write decoded records in the chosen format
///
/// CSV columns: `timestamp,pgn,<signal name>,source_address,original_can_id`.
pub fn write_records<W: Write>(
    writer: W,
    records: &[DecodedRecord],
    signal: &SignalDefinition,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(writer, records, signal),
        OutputFormat::Json => write_json(writer, records, signal),
    }
}

fn write_csv<W: Write>(writer: W, records: &[DecodedRecord], signal: &SignalDefinition) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "timestamp",
        "pgn",
        signal.name.as_str(),
        "source_address",
        "original_can_id",
    ])?;

    for record in records {
        csv_writer.write_record([
            record.timestamp_secs().to_string(),
            record.pgn_hex(),
            record.physical_value.to_string(),
            record.source_address.to_string(),
            record.identifier_hex(),
        ])?;
    }

    csv_writer.flush().context("Failed to write decoded records")?;
    Ok(())
}

fn write_json<W: Write>(mut writer: W, records: &[DecodedRecord], signal: &SignalDefinition) -> Result<()> {
    let rows: Vec<JsonRecord> = records
        .iter()
        .map(|record| JsonRecord {
            timestamp: record.timestamp_secs(),
            pgn: record.pgn_hex(),
            signal: &signal.name,
            physical_value: record.physical_value,
            unit: &signal.unit,
            source_address: record.source_address,
            original_can_id: record.identifier_hex(),
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &rows).context("Failed to write decoded records")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write raw frames as `timestamp,can_id,data_length,data`
///
/// The timestamp is truncated to whole seconds, the identifier is `0x` hex and
/// the data is a comma separated list of `0x..` bytes.
pub fn write_dump<W: Write>(writer: W, frames: &[CanFrame]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["timestamp", "can_id", "data_length", "data"])?;

    for frame in frames {
        csv_writer.write_record([
            (frame.timestamp.trunc() as i64).to_string(),
            format!("0x{:X}", frame.identifier),
            frame.payload.bytes().len().to_string(),
            frame.payload.to_string(),
        ])?;
    }

    csv_writer.flush().context("Failed to write frame dump")?;
    Ok(())
}
