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
use std::fs;
use std::process::Command;

use rx2wav::audio::{read_header, BitDepth, WavFormat};

const LOOP: &str = r#"
sample_rate: 44100
channels: 2
bit_depth: 24
tempo: 120000
loop_length: 30720
slices:
  - tick: 0
    frames: 500
  - tick: 15360
    frames: 500
    value: -0.25
"#;

fn rx2wav() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rx2wav"))
}

#[test]
fn test_extracts_with_mock_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("beat.rx2");
    fs::write(&input, LOOP).unwrap();

    let output = rx2wav()
        .arg(&input)
        .arg(dir.path().join("beat.wav"))
        .arg(dir.path().join("beat.txt"))
        .arg(dir.path().join("mock-sdk"))
        .output()
        .unwrap();

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("insert_slice_marker(1)"));
    assert!(stdout.contains("insert_slice_marker(22050)"));

    assert_eq!(
        fs::read_to_string(dir.path().join("beat.txt")).unwrap(),
        "renoise.song().selected_sample:insert_slice_marker(1)\n\
         renoise.song().selected_sample:insert_slice_marker(22050)\n"
    );

    let reader = hound::WavReader::open(dir.path().join("beat.wav")).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 24);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.duration(), 44100);
    assert!(dir.path().join("beat_slice002.wav").exists());

    let slice = fs::File::open(dir.path().join("beat_slice001.wav")).unwrap();
    let (format, data_size) = read_header(slice).unwrap();
    assert_eq!(format, WavFormat::new(2, 44100, BitDepth::TwentyFour).unwrap());
    assert_eq!(data_size, 500 * 6);
}

#[test]
fn test_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("beat.rx2");
    let config = dir.path().join("export.yaml");
    fs::write(&input, LOOP).unwrap();
    fs::write(&config, "command_prefix: \"\"\nwrite_slices: false\n").unwrap();

    let output = rx2wav()
        .arg(&input)
        .arg(dir.path().join("beat.wav"))
        .arg(dir.path().join("beat.txt"))
        .arg(dir.path().join("mock-sdk"))
        .arg("--config")
        .arg(&config)
        .args(["--bits-per-sample", "16"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        fs::read_to_string(dir.path().join("beat.txt")).unwrap(),
        "insert_slice_marker(1)\ninsert_slice_marker(22050)\n"
    );
    assert!(!dir.path().join("beat_slice001.wav").exists());

    let reader = hound::WavReader::open(dir.path().join("beat.wav")).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 16);
}

#[test]
fn test_wrong_argument_count_exits_1() {
    let output = rx2wav().arg("only-one.rx2").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_input_exits_1() {
    let dir = tempfile::tempdir().unwrap();

    let output = rx2wav()
        .arg(dir.path().join("missing.rx2"))
        .arg(dir.path().join("beat.wav"))
        .arg(dir.path().join("beat.txt"))
        .arg(dir.path().join("mock-sdk"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("beat.wav").exists());
}

#[test]
fn test_degenerate_timing_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("beat.rx2");
    fs::write(&input, LOOP.replace("tempo: 120000", "tempo: 0")).unwrap();

    let output = rx2wav()
        .arg(&input)
        .arg(dir.path().join("beat.wav"))
        .arg(dir.path().join("beat.txt"))
        .arg(dir.path().join("mock-sdk"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unwritable_loop_length_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("beat.rx2");
    let description = LOOP
        .replace("tempo: 120000", "tempo: 1")
        .replace("loop_length: 30720", "loop_length: 2147483647");
    fs::write(&input, description).unwrap();

    let output = rx2wav()
        .arg(&input)
        .arg(dir.path().join("beat.wav"))
        .arg(dir.path().join("beat.txt"))
        .arg(dir.path().join("mock-sdk"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1), "{:?}", output);
    assert!(!dir.path().join("beat.wav").exists());
    assert!(!dir.path().join("beat.txt").exists());
    assert!(!dir.path().join("beat_slice001.wav").exists());
}
