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

//! Runs one extraction: decodes a loop file, writes every slice, the marker
//! command script and the reconstructed full loop.
//!
//! Failures to read the loop or its metadata abort the run. A slice that
//! fails to render is skipped, and an output file that can't be written is
//! logged and counted; either way the run carries on.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, span, warn, Level};

use crate::audio::{wav, write_wav_file, BitDepth, WavFormat};
use crate::config::Export;
use crate::decoder::{Decoder, SliceInfo};
use crate::markers::{map_markers, MarkerScript};
use crate::timeline::{reconstruct, RenderedSlice};
use crate::timing::TimingError;

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Length of the full loop in frames.
    pub total_frames: usize,
    /// Slices rendered successfully.
    pub slices_rendered: usize,
    /// Slices skipped because their info or audio couldn't be read.
    pub slices_skipped: usize,
    /// Output files written.
    pub artifacts_written: usize,
    /// Output files that failed to write.
    pub artifacts_failed: usize,
    /// One marker command per rendered slice.
    pub script: MarkerScript,
}

/// The file the full loop is written to: the output path with a .wav extension.
pub fn full_loop_path(output: &Path) -> PathBuf {
    output.with_extension("wav")
}

/// The file a slice is written to, e.g. `loop_slice003.wav` for index 2.
pub fn slice_path(output: &Path, suffix: &str, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!("{}{}{:03}.wav", stem, suffix, index + 1))
}

/// Extracts the loop at input.
pub fn run(
    decoder: &dyn Decoder,
    input: &Path,
    output: &Path,
    commands: &Path,
    export: &Export,
) -> Result<RunReport, Box<dyn Error>> {
    let span = span!(Level::INFO, "extract");
    let _enter = span.enter();

    let data = fs::read(input)
        .map_err(|e| format!("Failed to open loop file {}: {}", input.display(), e))?;
    info!(path = ?input, size = data.len(), "Loaded loop file");

    let mut handle = decoder.open(&data)?;

    // Render at the loop's native rate, then re-read the info so that every
    // calculation below sees the negotiated rate.
    let info = handle.info()?;
    handle.set_output_sample_rate(info.sample_rate)?;
    let info = handle.info()?;
    info!("{}", info);

    let timing = info.timing()?;
    let total_frames = timing.total_frames()?;
    info!(total_frames, "Full loop length");

    let mut slices: Vec<(usize, SliceInfo)> = Vec::with_capacity(info.slices());
    let mut slices_skipped = 0;
    for index in 0..info.slices() {
        match handle.slice_info(index) {
            Ok(slice) if slice.frame_count <= 0 => {
                warn!(
                    slice = index + 1,
                    len = slice.frame_count,
                    "Skipping slice with no frames"
                );
                slices_skipped += 1;
            }
            Ok(slice) => {
                debug!(
                    slice = index + 1,
                    ppq = slice.tick_position,
                    len = slice.frame_count,
                    "Slice info"
                );
                slices.push((index, slice));
            }
            Err(e) => {
                warn!(slice = index + 1, err = %e, "Skipping slice");
                slices_skipped += 1;
            }
        }
    }

    let infos: Vec<SliceInfo> = slices.iter().map(|(_, slice)| *slice).collect();
    let markers = map_markers(&timing, &infos, total_frames)?;

    let bit_depth = export.bit_depth(timing.raw_bit_depth());
    if export.bits_per_sample().is_none() && !BitDepth::is_supported(timing.raw_bit_depth()) {
        warn!(
            bit_depth = timing.raw_bit_depth(),
            "Unsupported bit depth, writing 16-bit"
        );
    }
    let format = WavFormat::new(timing.channels(), timing.sample_rate(), bit_depth)?;

    // A wider configured depth can push a loop that fits at its own depth
    // past what a WAV data chunk can hold.
    if export.write_full_loop() && total_frames > wav::max_frames(format.block_align()) {
        return Err(TimingError::LoopTooLong {
            frames: total_frames as u64,
        }
        .into());
    }

    let mut report = RunReport {
        total_frames,
        slices_rendered: 0,
        slices_skipped,
        artifacts_written: 0,
        artifacts_failed: 0,
        script: MarkerScript::new(export.command_prefix()),
    };

    let mut rendered: Vec<RenderedSlice> = Vec::with_capacity(slices.len());
    for ((index, slice), marker) in slices.into_iter().zip(markers) {
        let audio = match handle.render_slice(index, slice.frames()) {
            Ok(audio) => audio,
            Err(e) => {
                warn!(slice = index + 1, err = %e, "Skipping slice");
                report.slices_skipped += 1;
                continue;
            }
        };
        report.slices_rendered += 1;

        if export.write_slices() {
            let path = slice_path(output, export.slice_name_suffix(), index);
            match write_wav_file(&path, &format, &audio) {
                Ok(()) => {
                    info!(path = ?path, marker, len = audio.frames(), "Wrote slice");
                    report.artifacts_written += 1;
                }
                Err(e) => {
                    error!(path = ?path, err = %e, "Failed to write slice");
                    report.artifacts_failed += 1;
                }
            }
        }

        report.script.push(marker);
        rendered.push(RenderedSlice {
            index,
            tick_position: slice.tick_position,
            audio,
        });
    }

    if report.script.is_empty() {
        warn!("No slices were rendered, the command file will be empty");
    }

    match report.script.write_to(commands) {
        Ok(()) => {
            info!(path = ?commands, commands = report.script.len(), "Saved commands");
            report.artifacts_written += 1;
        }
        Err(e) => {
            error!(path = ?commands, err = %e, "Failed to save commands");
            report.artifacts_failed += 1;
        }
    }

    if export.write_full_loop() {
        let full = reconstruct(&timing, &rendered)?;
        let path = full_loop_path(output);
        match write_wav_file(&path, &format, &full) {
            Ok(()) => {
                info!(path = ?path, frames = full.frames(), "Full loop saved");
                report.artifacts_written += 1;
            }
            Err(e) => {
                error!(path = ?path, err = %e, "Failed to write full loop");
                report.artifacts_failed += 1;
            }
        }
    }

    Ok(report)
}
