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

//! A scripted decoder. The "loop file" is a YAML description of the loop
//! rather than a real container, e.g.:
//!
//! ```yaml
//! sample_rate: 44100
//! channels: 2
//! tempo: 120000
//! loop_length: 61440
//! slices:
//!   - tick: 0
//!     frames: 1000
//!     value: 0.5
//!   - tick: 15360
//!     frames: 1000
//!     fail: true
//! ```
//!
//! Each slice renders as a constant value on every channel. Slices marked
//! `fail` report a render error.

use std::fmt;
use std::sync::{Arc, Mutex};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::{debug, info, span, Level};

use super::{DecoderError, LoopInfo, SliceInfo};
use crate::audio::SampleBuffer;

/// Lowest and highest output rates the vendor library accepts.
const MIN_OUTPUT_SAMPLE_RATE: i32 = 11025;
const MAX_OUTPUT_SAMPLE_RATE: i32 = 192000;

#[derive(Deserialize, Clone)]
struct MockLoop {
    sample_rate: i32,
    channels: i32,
    #[serde(default = "default_bit_depth")]
    bit_depth: i32,
    tempo: i32,
    #[serde(default)]
    original_tempo: i32,
    loop_length: i32,
    #[serde(default = "default_time_signature")]
    time_signature_numerator: i32,
    #[serde(default = "default_time_signature")]
    time_signature_denominator: i32,
    #[serde(default)]
    slices: Vec<MockSlice>,
}

#[derive(Deserialize, Clone)]
struct MockSlice {
    tick: i32,
    frames: i32,
    #[serde(default = "default_value")]
    value: f32,
    #[serde(default)]
    fail: bool,
}

fn default_bit_depth() -> i32 {
    16
}

fn default_time_signature() -> i32 {
    4
}

fn default_value() -> f32 {
    0.5
}

/// A mock decoder. Records its lifecycle so tests can check it.
pub struct Decoder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Decoder {
    /// Initializes the mock decoder.
    pub fn new() -> Decoder {
        let decoder = Decoder {
            events: Arc::new(Mutex::new(Vec::new())),
        };
        decoder.record("initialize".to_string());
        decoder
    }

    /// A shared view of the lifecycle calls, which outlives the decoder.
    #[cfg(test)]
    pub fn event_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.events.clone()
    }

    fn record(&self, event: String) {
        debug!(event = %event, "Mock decoder call");
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Decoder for Decoder {
    fn open<'a>(
        &'a self,
        data: &[u8],
    ) -> Result<Box<dyn super::LoopHandle + 'a>, DecoderError> {
        let span = span!(Level::INFO, "open loop (mock)");
        let _enter = span.enter();

        let text =
            std::str::from_utf8(data).map_err(|e| DecoderError::Create(e.to_string()))?;
        let description = Config::builder()
            .add_source(File::from_str(text, FileFormat::Yaml))
            .build()
            .and_then(|config| config.try_deserialize::<MockLoop>())
            .map_err(|e| DecoderError::Create(e.to_string()))?;

        info!(slices = description.slices.len(), "Opened mock loop");
        self.record("create".to_string());

        Ok(Box::new(LoopHandle {
            decoder: self,
            output_sample_rate: description.sample_rate,
            description,
        }))
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.record("shutdown".to_string());
    }
}

impl fmt::Display for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mock decoder")
    }
}

/// A loop opened by the mock decoder.
pub struct LoopHandle<'a> {
    decoder: &'a Decoder,
    description: MockLoop,
    output_sample_rate: i32,
}

impl LoopHandle<'_> {
    fn slice(&self, index: usize) -> Option<&MockSlice> {
        self.description.slices.get(index)
    }
}

impl super::LoopHandle for LoopHandle<'_> {
    fn info(&self) -> Result<LoopInfo, DecoderError> {
        let description = &self.description;
        Ok(LoopInfo {
            channels: description.channels,
            sample_rate: self.output_sample_rate,
            slice_count: description.slices.len() as i32,
            tempo: description.tempo,
            original_tempo: description.original_tempo,
            ppq_length: description.loop_length,
            time_signature_numerator: description.time_signature_numerator,
            time_signature_denominator: description.time_signature_denominator,
            bit_depth: description.bit_depth,
        })
    }

    fn set_output_sample_rate(&mut self, sample_rate: i32) -> Result<(), DecoderError> {
        if !(MIN_OUTPUT_SAMPLE_RATE..=MAX_OUTPUT_SAMPLE_RATE).contains(&sample_rate) {
            return Err(DecoderError::SetSampleRate(sample_rate));
        }

        self.decoder
            .record(format!("set_output_sample_rate({})", sample_rate));
        self.output_sample_rate = sample_rate;
        Ok(())
    }

    fn slice_info(&self, index: usize) -> Result<SliceInfo, DecoderError> {
        let slice = self.slice(index).ok_or_else(|| DecoderError::SliceInfo {
            index,
            reason: "no such slice".to_string(),
        })?;

        Ok(SliceInfo {
            tick_position: slice.tick,
            frame_count: slice.frames,
        })
    }

    fn render_slice(&mut self, index: usize, frames: usize) -> Result<SampleBuffer, DecoderError> {
        let slice = self.slice(index).ok_or_else(|| DecoderError::Render {
            index,
            reason: "no such slice".to_string(),
        })?;
        if slice.fail {
            return Err(DecoderError::Render {
                index,
                reason: "scripted failure".to_string(),
            });
        }

        let value = slice.value;
        let channels = usize::try_from(self.description.channels).unwrap_or(0);
        let mut buffer = SampleBuffer::new(channels, frames);
        for channel in 0..channels {
            buffer.channel_mut(channel).fill(value);
        }
        Ok(buffer)
    }
}

impl Drop for LoopHandle<'_> {
    fn drop(&mut self) {
        self.decoder.record("destroy".to_string());
    }
}
