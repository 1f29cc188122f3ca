// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The external loop decoder.
//!
//! Loop files are decoded by a vendor library. A [`Decoder`] represents the
//! initialized library and shuts it down when dropped; a [`LoopHandle`] is
//! one opened loop file and is destroyed when dropped. Handles borrow their
//! decoder, so every handle is gone before the library shuts down.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::audio::SampleBuffer;
use crate::timing::{GlobalTiming, TimingError};

pub mod mock;
#[cfg(feature = "rex-sdk")]
pub mod rex;

/// Error types for the decoder library.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Unable to initialize decoder: {0}")]
    Initialize(String),

    #[error("Unable to open loop: {0}")]
    Create(String),

    #[error("Unable to read loop info: {0}")]
    Info(String),

    #[error("Unable to set output sample rate to {0}")]
    SetSampleRate(i32),

    #[error("Unable to read info for slice {index}: {reason}")]
    SliceInfo { index: usize, reason: String },

    #[error("Unable to render slice {index}: {reason}")]
    Render { index: usize, reason: String },
}

/// Global metadata for an opened loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopInfo {
    pub channels: i32,
    pub sample_rate: i32,
    pub slice_count: i32,
    /// Tempo in milli-BPM.
    pub tempo: i32,
    /// Tempo the loop was recorded at in milli-BPM, 0 if unknown.
    pub original_tempo: i32,
    /// Loop length in ticks (15360 per quarter note).
    pub ppq_length: i32,
    pub time_signature_numerator: i32,
    pub time_signature_denominator: i32,
    pub bit_depth: i32,
}

impl LoopInfo {
    /// The timing used to lay out slices.
    pub fn timing(&self) -> Result<GlobalTiming, TimingError> {
        GlobalTiming::new(
            self.sample_rate,
            self.channels,
            self.bit_depth,
            self.tempo,
            self.ppq_length,
        )
    }

    /// The number of slices, treating a negative count as none.
    pub fn slices(&self) -> usize {
        usize::try_from(self.slice_count).unwrap_or(0)
    }
}

impl fmt::Display for LoopInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ch={} SR={} Slices={} Tempo={:.3} BPM",
            self.channels,
            self.sample_rate,
            self.slice_count,
            f64::from(self.tempo) / 1000.0
        )?;
        if self.original_tempo != 0 {
            write!(f, " (Orig={:.3} BPM)", f64::from(self.original_tempo) / 1000.0)?;
        }
        write!(
            f,
            " PPQ Len={} TS={}/{} BD={}",
            self.ppq_length,
            self.time_signature_numerator,
            self.time_signature_denominator,
            self.bit_depth
        )
    }
}

/// Position and length of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceInfo {
    /// Start of the slice in loop ticks.
    pub tick_position: i32,
    /// Number of frames the slice renders to.
    pub frame_count: i32,
}

impl SliceInfo {
    /// The frame count, treating a negative length as empty.
    pub fn frames(&self) -> usize {
        usize::try_from(self.frame_count).unwrap_or(0)
    }
}

/// An initialized decoder library.
pub trait Decoder: fmt::Display {
    /// Opens a loop from the complete contents of a loop file.
    fn open<'a>(&'a self, data: &[u8]) -> Result<Box<dyn LoopHandle + 'a>, DecoderError>;
}

/// An opened loop.
pub trait LoopHandle {
    /// Reads the global loop metadata. The reported sample rate is the
    /// current output rate.
    fn info(&self) -> Result<LoopInfo, DecoderError>;

    /// Sets the rate slices are rendered at.
    fn set_output_sample_rate(&mut self, sample_rate: i32) -> Result<(), DecoderError>;

    /// Reads the position and length of a slice.
    fn slice_info(&self, index: usize) -> Result<SliceInfo, DecoderError>;

    /// Renders frames of a slice into a planar buffer with one channel per
    /// loop channel.
    fn render_slice(&mut self, index: usize, frames: usize) -> Result<SampleBuffer, DecoderError>;
}

/// Gets the decoder for the given SDK directory. Directories whose name begins
/// with "mock" get the mock decoder.
pub fn get_decoder(sdk_path: &Path) -> Result<Box<dyn Decoder>, DecoderError> {
    let is_mock = sdk_path
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|name| name.starts_with("mock"));
    if is_mock {
        info!(path = ?sdk_path, "Using mock decoder");
        return Ok(Box::new(mock::Decoder::new()));
    }

    if !check_sdk_path(sdk_path) {
        return Err(DecoderError::Initialize(format!(
            "{}: not a usable SDK directory",
            sdk_path.display()
        )));
    }
    sdk_decoder(sdk_path)
}

#[cfg(feature = "rex-sdk")]
fn sdk_decoder(sdk_path: &Path) -> Result<Box<dyn Decoder>, DecoderError> {
    Ok(Box::new(rex::Decoder::initialize(sdk_path)?))
}

#[cfg(not(feature = "rex-sdk"))]
fn sdk_decoder(sdk_path: &Path) -> Result<Box<dyn Decoder>, DecoderError> {
    Err(DecoderError::Initialize(format!(
        "{}: built without the rex-sdk feature",
        sdk_path.display()
    )))
}

/// Logs anything obviously wrong with the SDK directory before the library
/// tries to load from it. Returns false if the library can't be there.
pub fn check_sdk_path(sdk_path: &Path) -> bool {
    if !sdk_path.exists() {
        warn!(path = ?sdk_path, "SDK path does not exist");
        return false;
    }
    if !sdk_path.is_dir() {
        warn!(path = ?sdk_path, "SDK path is not a directory");
        return false;
    }

    #[cfg(target_os = "macos")]
    {
        let library = sdk_path
            .join("Contents")
            .join("MacOS")
            .join("REX Shared Library");
        if !library.exists() {
            warn!(path = ?library, "SDK bundle binary not found");
            return false;
        }
    }

    true
}
