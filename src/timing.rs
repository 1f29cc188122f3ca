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

//! Musical time to sample time conversion for loop files.

use crate::audio::{wav, BitDepth};

/// Ticks per quarter note in loop files.
pub const TICKS_PER_QUARTER_NOTE: f64 = 15360.0;

/// Error types for degenerate timing metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    #[error("Tempo must be greater than 0 (got {0} milli-BPM)")]
    InvalidTempo(i32),

    #[error("Loop length must be greater than 0 (got {0} ticks)")]
    InvalidLoopLength(i32),

    #[error("Sample rate must be greater than 0 (got {0})")]
    InvalidSampleRate(i32),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(i32),

    #[error("Loop of {frames} frames is too long to write as a WAV file")]
    LoopTooLong { frames: u64 },
}

/// The timing and format metadata shared by every slice of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalTiming {
    sample_rate: u32,
    channels: u16,
    bit_depth: i32,
    tempo_milli_bpm: i32,
    loop_length_ticks: i32,
}

impl GlobalTiming {
    /// Creates the timing for a loop. Tempo and loop length are checked when
    /// a duration is actually computed.
    pub fn new(
        sample_rate: i32,
        channels: i32,
        bit_depth: i32,
        tempo_milli_bpm: i32,
        loop_length_ticks: i32,
    ) -> Result<GlobalTiming, TimingError> {
        let sample_rate = u32::try_from(sample_rate)
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or(TimingError::InvalidSampleRate(sample_rate))?;
        if !(1..=2).contains(&channels) {
            return Err(TimingError::UnsupportedChannelCount(channels));
        }

        Ok(GlobalTiming {
            sample_rate,
            channels: channels as u16,
            bit_depth,
            tempo_milli_bpm,
            loop_length_ticks,
        })
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count, 1 or 2.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The bit depth reported by the loop, which may be one we can't encode.
    pub fn raw_bit_depth(&self) -> i32 {
        self.bit_depth
    }

    /// The output bit depth, falling back to 16-bit for unrecognized values.
    pub fn bit_depth(&self) -> BitDepth {
        BitDepth::from_bits(self.bit_depth)
    }

    /// Tempo in beats per minute.
    pub fn tempo_bpm(&self) -> f64 {
        f64::from(self.tempo_milli_bpm) / 1000.0
    }

    /// The length of the whole loop in sample frames:
    /// `round(sample_rate * (60 / bpm) * (ticks / 15360))`.
    ///
    /// Fails with [TimingError::LoopTooLong] if a loop that long can't be
    /// written at the loop's own channel count and bit depth.
    pub fn total_frames(&self) -> Result<usize, TimingError> {
        self.validate()?;

        let seconds_per_beat = 60.0 / self.tempo_bpm();
        let beats = f64::from(self.loop_length_ticks) / TICKS_PER_QUARTER_NOTE;
        let frames = (f64::from(self.sample_rate) * seconds_per_beat * beats).round();

        let block_align = self.channels * self.bit_depth().bytes();
        if frames > wav::max_frames(block_align) as f64 {
            return Err(TimingError::LoopTooLong {
                frames: frames as u64,
            });
        }
        Ok(frames as usize)
    }

    /// Maps a tick position to a frame offset in a loop of total_frames frames.
    /// The result is not clamped: a tick at or past the loop end maps to an
    /// offset at or past total_frames.
    pub fn frame_offset(
        &self,
        tick_position: i32,
        total_frames: usize,
    ) -> Result<i64, TimingError> {
        self.validate()?;

        let relative = f64::from(tick_position) / f64::from(self.loop_length_ticks);
        Ok((relative * total_frames as f64).round() as i64)
    }

    fn validate(&self) -> Result<(), TimingError> {
        if self.tempo_milli_bpm <= 0 {
            return Err(TimingError::InvalidTempo(self.tempo_milli_bpm));
        }
        if self.loop_length_ticks <= 0 {
            return Err(TimingError::InvalidLoopLength(self.loop_length_ticks));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(tempo: i32, loop_length: i32) -> GlobalTiming {
        GlobalTiming::new(44100, 2, 16, tempo, loop_length).unwrap()
    }

    #[test]
    fn test_total_frames_one_beat() {
        assert_eq!(timing(120000, 15360).total_frames().unwrap(), 22050);
    }

    #[test]
    fn test_total_frames_one_bar() {
        // 4 beats at 120 BPM = 2 seconds
        assert_eq!(timing(120000, 61440).total_frames().unwrap(), 88200);
        // 4 beats at 93.5 BPM
        let expected = (44100.0_f64 * (60.0 / 93.5) * 4.0).round() as usize;
        assert_eq!(timing(93500, 61440).total_frames().unwrap(), expected);
    }

    #[test]
    fn test_total_frames_rejects_degenerate_timing() {
        assert_eq!(
            timing(0, 15360).total_frames(),
            Err(TimingError::InvalidTempo(0))
        );
        assert_eq!(
            timing(-120000, 15360).total_frames(),
            Err(TimingError::InvalidTempo(-120000))
        );
        assert_eq!(
            timing(120000, 0).total_frames(),
            Err(TimingError::InvalidLoopLength(0))
        );
    }

    #[test]
    fn test_total_frames_rejects_unwritable_length() {
        // 1 milli-BPM over the longest loop asks for petabytes of audio.
        let result = timing(1, i32::MAX).total_frames();
        assert!(matches!(result, Err(TimingError::LoopTooLong { .. })));

        // The limit depends on the frame size: 16-bit stereo is 4 bytes.
        let limit = (u32::MAX - 36) / 4;
        // 1 BPM gives 2646000 frames per beat.
        let beats_over = i32::try_from(u64::from(limit) / 2646000 + 1).unwrap();
        let result = timing(1000, beats_over * 15360).total_frames();
        assert!(matches!(
            result,
            Err(TimingError::LoopTooLong { frames }) if frames > u64::from(limit)
        ));

        let beats_under = beats_over - 1;
        let frames = timing(1000, beats_under * 15360).total_frames().unwrap();
        assert!(frames <= limit as usize);
    }

    #[test]
    fn test_frame_offset() {
        let timing = timing(120000, 61440);
        assert_eq!(timing.frame_offset(0, 88200).unwrap(), 0);
        assert_eq!(timing.frame_offset(15360, 88200).unwrap(), 22050);
        assert_eq!(timing.frame_offset(61440, 88200).unwrap(), 88200);
        // 1/3 of the loop rounds to the nearest frame
        assert_eq!(timing.frame_offset(20480, 88200).unwrap(), 29400);
        assert_eq!(timing.frame_offset(1, 88200).unwrap(), 1);
    }

    #[test]
    fn test_new_validates_format() {
        assert_eq!(
            GlobalTiming::new(0, 2, 16, 120000, 15360),
            Err(TimingError::InvalidSampleRate(0))
        );
        assert_eq!(
            GlobalTiming::new(44100, 3, 16, 120000, 15360),
            Err(TimingError::UnsupportedChannelCount(3))
        );
        assert_eq!(
            GlobalTiming::new(44100, 0, 16, 120000, 15360),
            Err(TimingError::UnsupportedChannelCount(0))
        );
    }

    #[test]
    fn test_bit_depth_fallback() {
        let timing = GlobalTiming::new(44100, 1, 12, 120000, 15360).unwrap();
        assert_eq!(timing.raw_bit_depth(), 12);
        assert_eq!(timing.bit_depth(), BitDepth::Sixteen);
    }
}
