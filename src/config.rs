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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use crate::audio::BitDepth;
use crate::markers::DEFAULT_COMMAND_PREFIX;

const DEFAULT_SLICE_NAME_SUFFIX: &str = "_slice";

/// Typed error for config load/parse failures, carrying the offending file.
#[derive(Debug, thiserror::Error)]
#[error("Unable to load config {}: {source}", .path.display())]
pub struct ConfigError {
    path: PathBuf,
    #[source]
    source: config::ConfigError,
}

/// A YAML representation of the export configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Export {
    /// Output bits per sample (default: the loop's own bit depth).
    bits_per_sample: Option<u16>,

    /// Whether to write one WAV file per slice (default: true).
    write_slices: Option<bool>,

    /// Whether to write the reconstructed full loop (default: true).
    write_full_loop: Option<bool>,

    /// Text in front of every marker command.
    command_prefix: Option<String>,

    /// Text between the output file stem and the slice number (default: "_slice").
    slice_name_suffix: Option<String>,
}

impl Export {
    /// New will create a new export configuration with every value defaulted.
    pub fn new() -> Export {
        Export::default()
    }

    /// Parse an export configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Export, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .build()
            .and_then(|config| config.try_deserialize::<Export>())
            .map_err(|source| ConfigError {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Overrides the output bits per sample.
    pub fn with_bits_per_sample(mut self, bits_per_sample: Option<u16>) -> Export {
        if bits_per_sample.is_some() {
            self.bits_per_sample = bits_per_sample;
        }
        self
    }

    /// Turns off writing slice files.
    pub fn without_slices(mut self) -> Export {
        self.write_slices = Some(false);
        self
    }

    /// Turns off writing the full loop.
    pub fn without_full_loop(mut self) -> Export {
        self.write_full_loop = Some(false);
        self
    }

    /// The requested bits per sample, if any.
    pub fn bits_per_sample(&self) -> Option<u16> {
        self.bits_per_sample
    }

    /// The bit depth to write, given the loop's own depth. Unsupported values
    /// fall back to 16-bit.
    pub fn bit_depth(&self, native_bits: i32) -> BitDepth {
        BitDepth::from_bits(self.bits_per_sample.map_or(native_bits, i32::from))
    }

    /// Returns whether slice files should be written (default: true).
    pub fn write_slices(&self) -> bool {
        self.write_slices.unwrap_or(true)
    }

    /// Returns whether the full loop should be written (default: true).
    pub fn write_full_loop(&self) -> bool {
        self.write_full_loop.unwrap_or(true)
    }

    /// Returns the marker command prefix.
    pub fn command_prefix(&self) -> &str {
        self.command_prefix
            .as_deref()
            .unwrap_or(DEFAULT_COMMAND_PREFIX)
    }

    /// Returns the slice file name suffix.
    pub fn slice_name_suffix(&self) -> &str {
        self.slice_name_suffix
            .as_deref()
            .unwrap_or(DEFAULT_SLICE_NAME_SUFFIX)
    }
}
