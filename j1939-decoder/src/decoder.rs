//! Main decoder API
//!
//! The [`Decoder`] pairs one validated [`SignalDefinition`] with a
//! [`DecoderConfig`] and turns a sequence of frames into decoded records.
//!
//! Each frame is handled on its own:
//! 1. Apply the bus filter
//! 2. Convert the input item to a [`CanFrame`] (boundary parsing)
//! 3. Decode the identifier
//! 4. Apply the source filter and compare the PGN with the target
//! 5. Extract the signal and emit a [`DecodedRecord`]
//!
//! A filtered or non-matching frame produces nothing. A frame that fails at
//! steps 2, 3 or 5 produces a [`FrameError`] carrying its position, and
//! decoding carries on with the next frame.

use crate::config::DecoderConfig;
use crate::identifier::decode_identifier;
use crate::signal::{extract_raw, SignalDefinition};
use crate::stats::SignalStats;
use crate::types::{CanFrame, DecodedRecord, FrameError, IntoCanFrame, Result};
use rayon::prelude::*;
use std::borrow::Cow;

/// Outcome of decoding one input item: nothing, a record, or a frame error
type FrameOutcome = Option<std::result::Result<DecodedRecord, FrameError>>;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone)]
pub struct Decoder {
    signal: SignalDefinition,
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder for `signal` with default configuration
    ///
    /// Fails if the signal definition is invalid. Nothing is decoded with a
    /// bad definition.
    pub fn new(signal: SignalDefinition) -> Result<Self> {
        Self::with_config(signal, DecoderConfig::default())
    }

    /// Create a decoder for `signal` with the given configuration
    pub fn with_config(signal: SignalDefinition, config: DecoderConfig) -> Result<Self> {
        signal.validate()?;

        log::debug!(
            "Decoder ready: '{}' in PGN 0x{:04X}, byte {}, {} bit(s), x{} {:+}",
            signal.name,
            signal.pgn,
            signal.byte_offset,
            signal.bit_width,
            signal.scale,
            signal.offset
        );

        Ok(Self { signal, config })
    }

    /// The target signal definition
    pub fn signal(&self) -> &SignalDefinition {
        &self.signal
    }

    /// The decoder configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a single frame
    ///
    /// # Returns
    /// * `Ok(Some(record))` if the frame carries the target signal
    /// * `Ok(None)` if the frame is filtered out or belongs to another PGN
    /// * `Err(_)` if the identifier is malformed
    pub fn decode_frame(&self, frame: &CanFrame) -> Result<Option<DecodedRecord>> {
        if !self.config.should_process_bus(&frame.bus) {
            log::trace!("Bus '{}' filtered out", frame.bus);
            return Ok(None);
        }

        let id = decode_identifier(frame.identifier)?;

        if !self.config.should_process_source(id.source_address) {
            log::trace!("Source 0x{:02X} filtered out", id.source_address);
            return Ok(None);
        }

        if id.pgn != self.signal.pgn {
            log::trace!(
                "PGN 0x{:04X} does not match target 0x{:04X}",
                id.pgn,
                self.signal.pgn
            );
            return Ok(None);
        }

        let raw_value = extract_raw(&frame.payload, &self.signal)?;
        let physical_value = self.signal.physical_value(raw_value);

        log::trace!(
            "{} at {}: {} -> {} {}",
            id,
            frame.timestamp,
            raw_value,
            physical_value,
            self.signal.unit
        );

        Ok(Some(DecodedRecord {
            timestamp: frame.timestamp,
            pgn: id.pgn,
            physical_value,
            source_address: id.source_address,
            identifier: frame.identifier,
            raw_value,
        }))
    }

    /// Lazily decode a sequence of frames
    ///
    /// The iterator yields one item per matching or failing frame, in input
    /// order. Dropping it early stops reading from `frames`.
    pub fn iter<I>(&self, frames: I) -> DecodingIterator<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: IntoCanFrame,
    {
        DecodingIterator::new(frames.into_iter(), Cow::Borrowed(self))
    }

    /// Decode a whole sequence, collecting records and frame errors
    pub fn process<I>(&self, frames: I) -> DecodeReport
    where
        I: IntoIterator,
        I::Item: IntoCanFrame,
    {
        let mut iter = self.iter(frames);
        let mut report = DecodeReport::default();

        for outcome in iter.by_ref() {
            report.push(outcome);
        }
        report.frames_seen = iter.frames_seen();

        log::debug!(
            "Decoded {} record(s) from {} frame(s), {} error(s)",
            report.records.len(),
            report.frames_seen,
            report.errors.len()
        );

        report
    }

    /// Decode a materialized batch across worker threads
    ///
    /// Produces the same report as [`Decoder::process`] for the same input.
    pub fn process_parallel<T>(&self, frames: Vec<T>) -> DecodeReport
    where
        T: IntoCanFrame + Send,
    {
        let frames_seen = frames.len();
        let outcomes: Vec<FrameOutcome> = frames
            .into_par_iter()
            .enumerate()
            .map(|(index, item)| self.decode_item(index, item))
            .collect();

        let mut report = DecodeReport {
            frames_seen,
            ..DecodeReport::default()
        };
        for outcome in outcomes.into_iter().flatten() {
            report.push(outcome);
        }

        log::debug!(
            "Decoded {} record(s) from {} frame(s) in parallel, {} error(s)",
            report.records.len(),
            report.frames_seen,
            report.errors.len()
        );

        report
    }

    fn decode_item<T: IntoCanFrame>(&self, index: usize, item: T) -> FrameOutcome {
        if let Some(bus) = item.bus() {
            if !self.config.should_process_bus(bus) {
                log::trace!("Bus '{}' filtered out before parsing", bus);
                return None;
            }
        }

        item.into_can_frame(self.config.data_encoding)
            .and_then(|frame| self.decode_frame(&frame))
            .transpose()
            .map(|outcome| {
                outcome.map_err(|e| {
                    log::warn!("Skipping frame {}: {}", index, e);
                    FrameError::new(index, e)
                })
            })
    }
}

/// Decode `frames` against `target`, validating the definition first
///
/// Returns an owning lazy iterator; see [`Decoder::iter`].
pub fn process<I>(frames: I, target: SignalDefinition) -> Result<DecodingIterator<'static, I::IntoIter>>
where
    I: IntoIterator,
    I::Item: IntoCanFrame,
{
    let decoder = Decoder::new(target)?;
    Ok(DecodingIterator::new(frames.into_iter(), Cow::Owned(decoder)))
}

/// Iterator that decodes frames into records
///
/// Non-matching frames are consumed without yielding anything.
pub struct DecodingIterator<'a, I> {
    frames: I,
    decoder: Cow<'a, Decoder>,
    position: usize,
}

impl<'a, I> DecodingIterator<'a, I>
where
    I: Iterator,
    I::Item: IntoCanFrame,
{
    fn new(frames: I, decoder: Cow<'a, Decoder>) -> Self {
        Self {
            frames,
            decoder,
            position: 0,
        }
    }

    /// Number of input frames consumed so far
    pub fn frames_seen(&self) -> usize {
        self.position
    }
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator,
    I::Item: IntoCanFrame,
{
    type Item = std::result::Result<DecodedRecord, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.frames.next()?;
            let index = self.position;
            self.position += 1;

            if let Some(outcome) = self.decoder.decode_item(index, item) {
                return Some(outcome);
            }
        }
    }
}

/// Result of decoding a batch of frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Decoded records, in input order
    pub records: Vec<DecodedRecord>,
    /// Frames that could not be decoded, in input order
    pub errors: Vec<FrameError>,
    /// Total number of input frames
    pub frames_seen: usize,
}

impl DecodeReport {
    fn push(&mut self, outcome: std::result::Result<DecodedRecord, FrameError>) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(error) => self.errors.push(error),
        }
    }

    /// Frames that were neither decoded nor failed (other PGNs, filtered out)
    pub fn frames_skipped(&self) -> usize {
        self.frames_seen - self.records.len() - self.errors.len()
    }

    /// True if no frame failed
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Statistics over the decoded physical values
    pub fn stats(&self) -> Option<SignalStats> {
        SignalStats::from_records(&self.records)
    }

    /// Treat any frame error as fatal, returning the first one
    pub fn into_strict(self) -> std::result::Result<Vec<DecodedRecord>, FrameError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.records),
        }
    }
}
