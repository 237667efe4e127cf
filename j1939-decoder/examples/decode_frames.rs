//! Standalone J1939 decoding demo
//!
//! Builds a short oil-pressure capture in memory (one frame every 100 ms,
//! one malformed row, one frame from another PGN) and decodes it.
//!
//! Usage:
//!   cargo run --example decode_frames [-- <frame count>]

use j1939_decoder::{Decoder, DecoderError, RawFrame, SignalDefinition};
use std::env;

fn capture(count: usize) -> Vec<RawFrame> {
    let mut frames = Vec::with_capacity(count + 2);

    for i in 0..count {
        // 100-396 kPa in 4 kPa steps
        let raw = 25 + (i * 7) % 75;
        let mut bytes = [0u8; 8];
        bytes[3] = raw as u8;
        frames.push(RawFrame {
            timestamp: 1630324545.0 + i as f64 * 0.1,
            bus: "can1".to_string(),
            id: "18FEF100".to_string(),
            data: bytes.iter().map(|b| format!("{:08b}", b)).collect(),
        });
    }

    frames.push(RawFrame {
        timestamp: 1630324546.0,
        bus: "can1".to_string(),
        id: "18FEF200".to_string(),
        data: "0".repeat(64),
    });
    frames.push(RawFrame {
        timestamp: 1630324546.1,
        bus: "can1".to_string(),
        id: "18FEF100".to_string(),
        data: "0".repeat(63),
    });

    frames
}

fn main() -> Result<(), DecoderError> {
    env_logger::init();

    let count = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(20);

    let decoder = Decoder::new(SignalDefinition::engine_oil_pressure())?;
    let report = decoder.process(capture(count));

    println!("=== DECODED RECORDS ===");
    for record in &report.records {
        println!(
            "{} {} {:>6.1} {} (SA 0x{:02X})",
            record.timestamp_secs(),
            record.pgn_hex(),
            record.physical_value,
            decoder.signal().unit,
            record.source_address
        );
    }

    println!("\n=== FRAME ERRORS ===");
    for error in &report.errors {
        println!("{}", error);
    }

    if let Some(stats) = report.stats() {
        println!("\nEngine Oil Pressure Statistics:");
        println!("Average: {:.2} kPa", stats.mean);
        println!("Maximum: {:.2} kPa", stats.max);
        println!("Minimum: {:.2} kPa", stats.min);
    }

    Ok(())
}
