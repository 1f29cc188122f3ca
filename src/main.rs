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
use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{crate_version, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rx2wav::config::Export;
use rx2wav::{decoder, extract};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Extracts REX2 loop slices as WAV files and writes Renoise slice markers."
)]
struct Cli {
    /// The REX2 loop file to read.
    input: PathBuf,
    /// The WAV file to write the full loop to. Slice files are named after it.
    output: PathBuf,
    /// The text file to write the slice marker commands to.
    commands: PathBuf,
    /// The directory containing the REX SDK shared library.
    sdk_path: PathBuf,
    /// An export configuration file (YAML).
    #[arg[short, long]]
    config: Option<PathBuf>,
    /// Output bits per sample (16, 24 or 32). Defaults to the loop's own depth.
    #[arg[short, long]]
    bits_per_sample: Option<u16>,
    /// Don't write the individual slice files.
    #[arg[long]]
    no_slices: bool,
    /// Don't write the reconstructed full loop.
    #[arg[long]]
    no_full_loop: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Malformed invocations exit with 1 rather than clap's usual 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let mut export = match &cli.config {
        Some(path) => Export::deserialize(path)?,
        None => Export::new(),
    };
    export = export.with_bits_per_sample(cli.bits_per_sample);
    if cli.no_slices {
        export = export.without_slices();
    }
    if cli.no_full_loop {
        export = export.without_full_loop();
    }

    let decoder = decoder::get_decoder(&cli.sdk_path)?;
    info!(decoder = %decoder, "Decoder ready");

    let report = extract::run(
        decoder.as_ref(),
        &cli.input,
        &cli.output,
        &cli.commands,
        &export,
    )?;

    println!("--- Renoise Commands ---");
    print!("{}", report.script);
    println!("-----------------------");
    println!(
        "Slices: {} rendered, {} skipped. Files: {} written, {} failed.",
        report.slices_rendered,
        report.slices_skipped,
        report.artifacts_written,
        report.artifacts_failed
    );

    Ok(())
}
