//! J1939 Decoder CLI Application
//!
//! Command-line front end for the j1939-decoder library. It adds what the
//! library deliberately leaves out:
//! - Reading captured frames from CSV
//! - Writing decoded records (CSV/JSON)
//! - Run configuration (TOML + flags)
//! - Console summary and statistics

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use j1939_decoder::{DataEncoding, Decoder, IntoCanFrame, SignalDefinition};
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod input;
mod output;
mod report;

use config::{AppConfig, OutputFormat, SignalOverrides};
use input::FrameReader;

/// J1939 Decoder - Extract physical signal values from captured CAN frames
#[derive(Parser, Debug)]
#[command(name = "j1939-cli")]
#[command(about = "Decode J1939 signals from captured CAN frames", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one signal from a frame capture
    Decode(DecodeArgs),
    /// Convert frame rows to timestamp/id/bytes without signal decoding
    Dump(DumpArgs),
}

#[derive(ClapArgs, Debug)]
struct DecodeArgs {
    /// CSV file with timestamp, can_line, id and data columns
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output file for decoded records (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start from a built-in signal definition
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Signal name (also the value column header)
    #[arg(long)]
    name: Option<String>,

    /// Suspect Parameter Number
    #[arg(long)]
    spn: Option<u32>,

    /// Target PGN, decimal or 0x-prefixed hex
    #[arg(long, value_parser = config::parse_pgn)]
    pgn: Option<u16>,

    /// 0-based byte holding the signal
    #[arg(long)]
    byte_offset: Option<u8>,

    /// Signal width in bits (1-8)
    #[arg(long)]
    bit_width: Option<u8>,

    /// Physical units per bit
    #[arg(long, allow_hyphen_values = true)]
    scale: Option<f64>,

    /// Physical offset added after scaling
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,

    /// Engineering unit label
    #[arg(long)]
    unit: Option<String>,

    /// Output format (default: csv, or the config file's choice)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// The data column holds hex bytes instead of a bit string
    #[arg(long)]
    hex_data: bool,

    /// Exit with an error if any frame fails to decode
    #[arg(long)]
    strict: bool,

    /// Decode frames on all cores
    #[arg(long)]
    parallel: bool,
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    /// CSV file with timestamp, can_line, id and data columns
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of input rows to convert
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    max_rows: usize,

    /// The data column holds hex bytes instead of a bit string
    #[arg(long)]
    hex_data: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// SPN 100 Engine Oil Pressure (PGN 0xFEF1, byte 4, 4 kPa/bit)
    OilPressure,
}

impl Preset {
    fn definition(self) -> SignalDefinition {
        match self {
            Preset::OilPressure => SignalDefinition::engine_oil_pressure(),
        }
    }
}

impl DecodeArgs {
    fn overrides(&self) -> SignalOverrides {
        SignalOverrides {
            name: self.name.clone(),
            spn: self.spn,
            pgn: self.pgn,
            byte_offset: self.byte_offset,
            bit_width: self.bit_width,
            scale: self.scale,
            offset: self.offset,
            unit: self.unit.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("J1939 Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", j1939_decoder::VERSION);

    match &args.command {
        Command::Decode(decode_args) => decode_mode(decode_args, args.quiet),
        Command::Dump(dump_args) => dump_mode(dump_args),
    }
}

/// Decode mode - resolve the signal, decode the capture, write records
fn decode_mode(args: &DecodeArgs, quiet: bool) -> Result<()> {
    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let base = args
        .preset
        .map(Preset::definition)
        .or_else(|| app_config.signal.clone());
    let signal = config::resolve_signal(base, &args.overrides())?;

    let mut decoder_config = app_config.decoder_config();
    if args.hex_data {
        decoder_config = decoder_config.with_data_encoding(DataEncoding::Hex);
    }

    let decoder = Decoder::with_config(signal, decoder_config)
        .context("Invalid signal definition")?;

    let reader = FrameReader::open(&args.input)?;
    let report = if args.parallel || app_config.output.parallel {
        let frames: Vec<_> = reader.collect();
        log::debug!("Decoding {} frames in parallel", frames.len());
        decoder.process_parallel(frames)
    } else {
        decoder.process(reader)
    };

    let format = args.format.unwrap_or(app_config.output.format);
    let writer = output::open_output(args.output.as_deref())?;
    output::write_records(writer, &report.records, decoder.signal(), format)?;

    if let Some(path) = &args.output {
        log::info!("Output saved to: {:?}", path);
    }

    if !quiet {
        // Keep stdout clean for the records when they are written there
        if args.output.is_some() {
            report::print_summary(&mut io::stdout().lock(), &report, decoder.signal())?;
        } else {
            report::print_summary(&mut io::stderr().lock(), &report, decoder.signal())?;
        }
    }

    if (args.strict || app_config.output.strict) && !report.is_clean() {
        bail!(
            "{} of {} frames failed to decode (strict mode)",
            report.errors.len(),
            report.frames_seen
        );
    }

    Ok(())
}

/// Dump mode - convert rows to typed frames and write them back out
fn dump_mode(args: &DumpArgs) -> Result<()> {
    let encoding = if args.hex_data {
        DataEncoding::Hex
    } else {
        DataEncoding::Bits
    };

    let mut frames = Vec::new();
    for (index, item) in FrameReader::open(&args.input)?.take(args.max_rows).enumerate() {
        match item.into_can_frame(encoding) {
            Ok(frame) => frames.push(frame),
            Err(e) => log::warn!("Skipping row {}: {}", index + 1, e),
        }
    }

    let writer = output::open_output(args.output.as_deref())?;
    output::write_dump(writer, &frames)?;

    log::info!("Successfully processed {} rows", frames.len());
    if let Some(path) = &args.output {
        log::info!("Output saved to: {:?}", path);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
