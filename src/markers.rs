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

//! Slice marker offsets and the sequencer command script built from them.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::decoder::SliceInfo;
use crate::timing::{GlobalTiming, TimingError};

/// The default text in front of each marker command, addressing the sample
/// currently selected in Renoise.
pub const DEFAULT_COMMAND_PREFIX: &str = "renoise.song().selected_sample:";

/// Maps every slice to a marker offset in the full loop, in slice order.
///
/// Markers are 1-based sequencer positions, so an offset of 0 becomes 1. The
/// list is not sorted by position.
pub fn map_markers(
    timing: &GlobalTiming,
    slices: &[SliceInfo],
    total_frames: usize,
) -> Result<Vec<u64>, TimingError> {
    slices
        .iter()
        .map(|slice| {
            let offset = timing.frame_offset(slice.tick_position, total_frames)?;
            Ok(offset.max(1) as u64)
        })
        .collect()
}

/// One `insert_slice_marker` command per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScript {
    prefix: String,
    commands: Vec<String>,
}

impl MarkerScript {
    /// Creates an empty script whose commands all start with prefix.
    pub fn new(prefix: &str) -> MarkerScript {
        MarkerScript {
            prefix: prefix.to_string(),
            commands: Vec::new(),
        }
    }

    /// Appends a marker command.
    pub fn push(&mut self, marker: u64) {
        self.commands
            .push(format!("{}insert_slice_marker({})", self.prefix, marker));
    }

    /// The commands in insertion order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Writes the script to the given file, replacing any existing content.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.to_string())
    }
}

impl fmt::Display for MarkerScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in self.commands.iter() {
            writeln!(f, "{}", command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(tick_position: i32) -> SliceInfo {
        SliceInfo {
            tick_position,
            frame_count: 100,
        }
    }

    #[test]
    fn test_map_markers() {
        let timing = GlobalTiming::new(44100, 2, 16, 120000, 61440).unwrap();
        let total_frames = timing.total_frames().unwrap();
        let markers = map_markers(
            &timing,
            &[slice(0), slice(15360), slice(30720), slice(46080)],
            total_frames,
        )
        .unwrap();

        assert_eq!(markers, vec![1, 22050, 44100, 66150]);
    }

    #[test]
    fn test_map_markers_keeps_slice_order() {
        let timing = GlobalTiming::new(44100, 2, 16, 120000, 61440).unwrap();
        let markers = map_markers(&timing, &[slice(30720), slice(15360)], 88200).unwrap();

        assert_eq!(markers, vec![44100, 22050]);
    }

    #[test]
    fn test_map_markers_clamps_to_one() {
        let timing = GlobalTiming::new(44100, 1, 16, 120000, 15360).unwrap();
        let markers = map_markers(&timing, &[slice(0), slice(-100)], 22050).unwrap();

        assert_eq!(markers, vec![1, 1]);
    }

    #[test]
    fn test_map_markers_degenerate_timing() {
        let timing = GlobalTiming::new(44100, 1, 16, 120000, 0).unwrap();
        assert_eq!(
            map_markers(&timing, &[slice(0)], 0),
            Err(TimingError::InvalidLoopLength(0))
        );
    }

    #[test]
    fn test_script_formatting() {
        let mut script = MarkerScript::new(DEFAULT_COMMAND_PREFIX);
        assert!(script.is_empty());

        script.push(1);
        script.push(22050);

        assert_eq!(script.len(), 2);
        assert_eq!(
            script.to_string(),
            "renoise.song().selected_sample:insert_slice_marker(1)\n\
             renoise.song().selected_sample:insert_slice_marker(22050)\n"
        );
    }

    #[test]
    fn test_script_without_prefix() {
        let mut script = MarkerScript::new("");
        script.push(42);
        assert_eq!(script.commands(), &["insert_slice_marker(42)".to_string()]);
    }

    #[test]
    fn test_script_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.txt");

        let mut script = MarkerScript::new("");
        script.push(7);
        script.write_to(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "insert_slice_marker(7)\n");
    }
}
