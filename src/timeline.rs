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

//! Rebuilds a full length loop from individually rendered slices.
//!
//! Every slice is copied to the frame its tick position maps to. Frames that
//! land at or past the end of the loop are dropped, and where two slices
//! overlap the slice with the higher index wins. Nothing is summed.

use tracing::debug;

use crate::audio::SampleBuffer;
use crate::timing::{GlobalTiming, TimingError};

/// Error types for loop reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("Slice {slice} has {actual} channels, loop has {expected}")]
    ChannelMismatch {
        slice: usize,
        expected: u16,
        actual: usize,
    },
}

/// A slice whose audio was rendered successfully.
#[derive(Debug, Clone)]
pub struct RenderedSlice {
    /// Zero based slice index within the loop.
    pub index: usize,
    /// Start of the slice in loop ticks.
    pub tick_position: i32,
    /// The rendered audio.
    pub audio: SampleBuffer,
}

/// Assembles the full loop buffer. Slices are placed in ascending index order
/// regardless of the order they are passed in. Slices that failed to render
/// are simply absent, leaving their region silent.
pub fn reconstruct(
    timing: &GlobalTiming,
    slices: &[RenderedSlice],
) -> Result<SampleBuffer, TimelineError> {
    let total_frames = timing.total_frames()?;
    let mut full = SampleBuffer::new(usize::from(timing.channels()), total_frames);

    let mut ordered: Vec<&RenderedSlice> = slices.iter().collect();
    ordered.sort_by_key(|slice| slice.index);

    for slice in ordered {
        if slice.audio.channel_count() != usize::from(timing.channels()) {
            return Err(TimelineError::ChannelMismatch {
                slice: slice.index,
                expected: timing.channels(),
                actual: slice.audio.channel_count(),
            });
        }

        let start = timing.frame_offset(slice.tick_position, total_frames)?;
        let placed = place(&mut full, &slice.audio, start);
        debug!(
            slice = slice.index + 1,
            start,
            frames = slice.audio.frames(),
            placed,
            "Placed slice"
        );
    }

    Ok(full)
}

/// Copies source into dest starting at frame start, dropping whatever falls
/// outside dest. Returns the number of frames copied.
fn place(dest: &mut SampleBuffer, source: &SampleBuffer, start: i64) -> usize {
    let dest_frames = dest.frames() as i64;
    let end = start.saturating_add(source.frames() as i64);

    let from = start.clamp(0, dest_frames);
    let to = end.clamp(0, dest_frames);
    if from >= to {
        return 0;
    }

    let source_from = (from - start) as usize;
    let count = (to - from) as usize;
    for channel in 0..dest.channel_count() {
        dest.channel_mut(channel)[from as usize..from as usize + count]
            .copy_from_slice(&source.channel(channel)[source_from..source_from + count]);
    }

    count
}
