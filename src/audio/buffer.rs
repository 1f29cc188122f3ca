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
use std::fmt;

/// Planar floating point audio: one `Vec<f32>` per channel, every channel
/// holding exactly `frames` samples.
///
/// Access is bounds checked against `[0, frames)` and out of range access
/// panics. Any clamping of placement offsets belongs to the caller.
#[derive(Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl SampleBuffer {
    /// Creates a zero filled buffer.
    pub fn new(channel_count: usize, frames: usize) -> SampleBuffer {
        SampleBuffer {
            channels: vec![vec![0.0; frames]; channel_count],
            frames,
        }
    }

    /// Wraps already decoded planar channels. Returns None if the channels
    /// are not all the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Option<SampleBuffer> {
        let frames = channels.first().map(|c| c.len()).unwrap_or(0);
        if channels.iter().any(|c| c.len() != frames) {
            return None;
        }

        Some(SampleBuffer { channels, frames })
    }

    /// The number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// The number of sample frames per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Reads a single sample.
    pub fn get(&self, channel: usize, frame: usize) -> f32 {
        self.check(channel, frame);
        self.channels[channel][frame]
    }

    /// Writes a single sample.
    pub fn set(&mut self, channel: usize, frame: usize, value: f32) {
        self.check(channel, frame);
        self.channels[channel][frame] = value;
    }

    /// All samples of one channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range for {} channel buffer",
            channel,
            self.channels.len()
        );
        &self.channels[channel]
    }

    /// Mutable access to all samples of one channel.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range for {} channel buffer",
            channel,
            self.channels.len()
        );
        &mut self.channels[channel]
    }

    /// Borrows every channel as a slice, in channel order.
    pub fn planar(&self) -> Vec<&[f32]> {
        self.channels.iter().map(|c| c.as_slice()).collect()
    }

    /// Resets every sample to silence.
    pub fn fill_zero(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.fill(0.0);
        }
    }

    fn check(&self, channel: usize, frame: usize) {
        assert!(
            channel < self.channels.len(),
            "channel {} out of range for {} channel buffer",
            channel,
            self.channels.len()
        );
        assert!(
            frame < self.frames,
            "frame {} out of range for buffer of {} frames",
            frame,
            self.frames
        );
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("channels", &self.channels.len())
            .field("frames", &self.frames)
            .finish()
    }
}
