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

use super::wav::WavError;

/// Output bit depths the WAV writer can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 16-bit signed integer samples.
    Sixteen,
    /// 24-bit signed integer samples, packed into 3 bytes.
    TwentyFour,
    /// 32-bit signed integer samples.
    ThirtyTwo,
}

impl BitDepth {
    /// Maps a bit count to a depth. Anything that isn't 16, 24 or 32 falls back
    /// to 16-bit, which is what older loop files without a usable depth expect.
    ///
    /// The fallback covers the header too: a loop reporting 20 bits is written
    /// with 16-bit samples and a 16-bit header. The legacy tool wrote the raw
    /// 20 into the header over 2-byte samples; this crate keeps the header
    /// consistent with the data instead.
    pub fn from_bits(bits: i32) -> BitDepth {
        BitDepth::try_from_bits(bits).unwrap_or(BitDepth::Sixteen)
    }

    /// Maps a bit count to a depth, or None if there is no native encoding.
    pub fn try_from_bits(bits: i32) -> Option<BitDepth> {
        match bits {
            16 => Some(BitDepth::Sixteen),
            24 => Some(BitDepth::TwentyFour),
            32 => Some(BitDepth::ThirtyTwo),
            _ => None,
        }
    }

    /// Returns true if the given bit count has a native encoding.
    pub fn is_supported(bits: i32) -> bool {
        BitDepth::try_from_bits(bits).is_some()
    }

    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// Bytes per sample.
    pub fn bytes(self) -> u16 {
        self.bits() / 8
    }

    /// The largest positive integer a full scale sample maps to.
    pub fn max_magnitude(self) -> f64 {
        match self {
            BitDepth::Sixteen => 32767.0,
            BitDepth::TwentyFour => 8388607.0,
            BitDepth::ThirtyTwo => 2147483647.0,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// The format parameters written into a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Number of interleaved channels (1 or 2).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Encoded bit depth.
    pub bit_depth: BitDepth,
}

impl WavFormat {
    /// Creates a new WavFormat.
    pub fn new(channels: u16, sample_rate: u32, bit_depth: BitDepth) -> Result<Self, WavError> {
        if !(1..=2).contains(&channels) {
            return Err(WavError::UnsupportedChannelCount(channels));
        }
        if sample_rate == 0 {
            return Err(WavError::InvalidSampleRate);
        }

        Ok(WavFormat {
            channels,
            sample_rate,
            bit_depth,
        })
    }

    /// Bytes per frame across all channels.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bit_depth.bytes()
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }
}
