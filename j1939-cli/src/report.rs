//! Console summary of a decoding run

use chrono::SecondsFormat;
use j1939_decoder::{DecodeReport, SignalDefinition};
use std::io::{self, Write};

/// Most frame errors listed individually before the rest are counted
const MAX_LISTED_ERRORS: usize = 10;

/// Print counts, frame errors and statistics for a finished run
pub fn print_summary<W: Write>(
    out: &mut W,
    report: &DecodeReport,
    signal: &SignalDefinition,
) -> io::Result<()> {
    let label = match signal.spn {
        Some(spn) => format!("SPN {} ({})", spn, signal.name),
        None => signal.name.clone(),
    };

    writeln!(out, "\n=== DECODING SUMMARY ===")?;
    writeln!(out, "Target: {} in PGN 0x{:X}", label, signal.pgn)?;
    writeln!(out, "Frames read:     {}", report.frames_seen)?;
    writeln!(out, "Records decoded: {}", report.records.len())?;
    writeln!(out, "Frames skipped:  {}", report.frames_skipped())?;
    writeln!(out, "Frame errors:    {}", report.errors.len())?;

    if !report.errors.is_empty() {
        writeln!(out, "\nFrame errors:")?;
        for error in report.errors.iter().take(MAX_LISTED_ERRORS) {
            writeln!(out, "  {}", error)?;
        }
        if report.errors.len() > MAX_LISTED_ERRORS {
            writeln!(out, "  ... and {} more", report.errors.len() - MAX_LISTED_ERRORS)?;
        }
    }

    let stats = match report.stats() {
        Some(stats) => stats,
        None => {
            writeln!(out, "\nNo valid {} records found in the input data", label)?;
            return Ok(());
        }
    };

    let first = report.records.first().and_then(|r| r.datetime());
    let last = report.records.last().and_then(|r| r.datetime());
    if let (Some(first), Some(last)) = (first, last) {
        writeln!(
            out,
            "Time range:      {} .. {}",
            first.to_rfc3339_opts(SecondsFormat::Millis, true),
            last.to_rfc3339_opts(SecondsFormat::Millis, true)
        )?;
    }

    writeln!(out, "\n{} Statistics:", label)?;
    writeln!(out, "Average: {:.2} {}", stats.mean, signal.unit)?;
    writeln!(out, "Maximum: {:.2} {}", stats.max, signal.unit)?;
    writeln!(out, "Minimum: {:.2} {}", stats.min, signal.unit)?;

    Ok(())
}
