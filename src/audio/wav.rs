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

//! Byte exact PCM WAV serialization.
//!
//! The layout is the canonical 44 byte RIFF/WAVE header (a 16 byte `fmt `
//! chunk with audio format 1) followed by a single `data` chunk of
//! interleaved, little-endian, signed integer samples.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::buffer::SampleBuffer;
use super::format::{BitDepth, WavFormat};

/// Size of everything in the RIFF chunk that precedes the sample data.
const HEADER_SIZE_AFTER_RIFF: u32 = 36;

/// Size of the `fmt ` chunk body for plain PCM.
const FMT_CHUNK_SIZE: u32 = 16;

/// WAVE_FORMAT_PCM.
const AUDIO_FORMAT_PCM: u16 = 1;

/// Error types for WAV serialization.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(u16),

    #[error("Sample rate must be greater than 0")]
    InvalidSampleRate,

    #[error("Buffer has {actual} channels, format expects {expected}")]
    ChannelMismatch { expected: u16, actual: usize },

    #[error("{frames} frames do not fit in a WAV data chunk")]
    DataTooLarge { frames: usize },

    #[error("Malformed WAV header: {0}")]
    Malformed(String),

    #[error("Unable to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts a float sample to a signed integer at the given depth. The sample
/// is clamped to [-1.0, 1.0] and rounded half away from zero.
pub fn encode_sample(sample: f32, bit_depth: BitDepth) -> i32 {
    let clamped = f64::from(sample.clamp(-1.0, 1.0));
    (clamped * bit_depth.max_magnitude()).round() as i32
}

/// The largest number of frames whose data chunk still fits in a WAV file
/// with the given frame size.
pub fn max_frames(block_align: u16) -> usize {
    ((u32::MAX - HEADER_SIZE_AFTER_RIFF) / u32::from(block_align.max(1))) as usize
}

/// Writes a complete WAV stream for the buffer to the given sink.
///
/// The header always describes the samples that follow. Loops that report
/// a depth other than 16, 24 or 32 are written through
/// [BitDepth::from_bits], so both the samples and the header's
/// `bitsPerSample` are 16-bit. The legacy tool kept the raw reported depth
/// in the header while writing 2-byte samples, which produced files whose
/// header disagreed with their data. This writer does not reproduce that.
pub fn write_wav<W: Write>(
    mut out: W,
    format: &WavFormat,
    buffer: &SampleBuffer,
) -> Result<(), WavError> {
    if buffer.channel_count() != usize::from(format.channels) {
        return Err(WavError::ChannelMismatch {
            expected: format.channels,
            actual: buffer.channel_count(),
        });
    }

    let frames = buffer.frames();
    if frames > max_frames(format.block_align()) {
        return Err(WavError::DataTooLarge { frames });
    }
    let data_size = frames as u32 * u32::from(format.block_align());

    // RIFF header
    out.write_all(b"RIFF")?;
    out.write_all(&(HEADER_SIZE_AFTER_RIFF + data_size).to_le_bytes())?;
    out.write_all(b"WAVE")?;

    // fmt chunk
    out.write_all(b"fmt ")?;
    out.write_all(&FMT_CHUNK_SIZE.to_le_bytes())?;
    out.write_all(&AUDIO_FORMAT_PCM.to_le_bytes())?;
    out.write_all(&format.channels.to_le_bytes())?;
    out.write_all(&format.sample_rate.to_le_bytes())?;
    out.write_all(&format.byte_rate().to_le_bytes())?;
    out.write_all(&format.block_align().to_le_bytes())?;
    out.write_all(&format.bit_depth.bits().to_le_bytes())?;

    // data chunk
    out.write_all(b"data")?;
    out.write_all(&data_size.to_le_bytes())?;

    let channels = buffer.planar();
    for frame in 0..frames {
        for channel in channels.iter() {
            let sample = encode_sample(channel[frame], format.bit_depth);
            match format.bit_depth {
                BitDepth::Sixteen => out.write_all(&(sample as i16).to_le_bytes())?,
                BitDepth::TwentyFour => out.write_all(&sample.to_le_bytes()[..3])?,
                BitDepth::ThirtyTwo => out.write_all(&sample.to_le_bytes())?,
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Reads and checks a 44 byte header as written by [write_wav], returning the
/// format and the size of the data chunk in bytes.
pub fn read_header<R: Read>(mut input: R) -> Result<(WavFormat, u32), WavError> {
    let mut header = [0u8; 44];
    input.read_exact(&mut header)?;

    let u16_at = |offset: usize| u16::from_le_bytes([header[offset], header[offset + 1]]);
    let u32_at = |offset: usize| {
        u32::from_le_bytes([
            header[offset],
            header[offset + 1],
            header[offset + 2],
            header[offset + 3],
        ])
    };

    for (offset, id) in [(0, b"RIFF"), (8, b"WAVE"), (12, b"fmt "), (36, b"data")] {
        if &header[offset..offset + 4] != id {
            return Err(WavError::Malformed(format!(
                "expected {:?} at byte {}",
                String::from_utf8_lossy(id),
                offset
            )));
        }
    }

    let fmt_size = u32_at(16);
    if fmt_size != FMT_CHUNK_SIZE {
        return Err(WavError::Malformed(format!(
            "fmt chunk is {} bytes, expected {}",
            fmt_size, FMT_CHUNK_SIZE
        )));
    }
    let audio_format = u16_at(20);
    if audio_format != AUDIO_FORMAT_PCM {
        return Err(WavError::Malformed(format!(
            "audio format {} is not PCM",
            audio_format
        )));
    }

    let bits = u16_at(34);
    let bit_depth = BitDepth::try_from_bits(i32::from(bits))
        .ok_or_else(|| WavError::Malformed(format!("unsupported bits per sample {}", bits)))?;
    let format = WavFormat::new(u16_at(22), u32_at(24), bit_depth)?;

    if u32_at(28) != format.byte_rate() || u16_at(32) != format.block_align() {
        return Err(WavError::Malformed(
            "byte rate or block align disagree with the format".to_string(),
        ));
    }

    let data_size = u32_at(40);
    if data_size % u32::from(format.block_align()) != 0 {
        return Err(WavError::Malformed(format!(
            "data size {} is not a whole number of frames",
            data_size
        )));
    }
    if data_size.checked_add(HEADER_SIZE_AFTER_RIFF) != Some(u32_at(4)) {
        return Err(WavError::Malformed(format!(
            "RIFF size {} does not match data size {}",
            u32_at(4),
            data_size
        )));
    }

    Ok((format, data_size))
}

/// Creates (or truncates) the file at path and writes the buffer into it. The
/// file is closed before this returns.
pub fn write_wav_file(
    path: &Path,
    format: &WavFormat,
    buffer: &SampleBuffer,
) -> Result<(), WavError> {
    let file = File::create(path).map_err(|source| WavError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    write_wav(BufWriter::new(file), format, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    fn encode(buffer: &SampleBuffer, channels: u16, bit_depth: BitDepth) -> Vec<u8> {
        let format = WavFormat::new(channels, 44100, bit_depth).unwrap();
        let mut bytes = Vec::new();
        write_wav(&mut bytes, &format, buffer).unwrap();
        bytes
    }

    #[test]
    fn test_header_layout() {
        let buffer = SampleBuffer::new(2, 10);
        let bytes = encode(&buffer, 2, BitDepth::TwentyFour);

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + 60);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 6);
        assert_eq!(u16_at(&bytes, 32), 6);
        assert_eq!(u16_at(&bytes, 34), 24);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 60);
        assert_eq!(bytes.len(), 44 + 60);
    }

    #[test]
    fn test_silent_16_bit_data_size() {
        let buffer = SampleBuffer::new(2, 1000);
        let bytes = encode(&buffer, 2, BitDepth::Sixteen);

        let (format, data_size) = read_header(bytes.as_slice()).unwrap();
        assert_eq!(format, WavFormat::new(2, 44100, BitDepth::Sixteen).unwrap());
        assert_eq!(data_size, 1000 * 2 * 2);
        assert_eq!(bytes.len(), 44 + data_size as usize);
        assert!(bytes[44..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_header_reports_written_format() {
        for bit_depth in [BitDepth::Sixteen, BitDepth::TwentyFour, BitDepth::ThirtyTwo] {
            for channels in [1, 2] {
                let format = WavFormat::new(channels, 48000, bit_depth).unwrap();
                let buffer = SampleBuffer::new(usize::from(channels), 37);
                let mut bytes = Vec::new();
                write_wav(&mut bytes, &format, &buffer).unwrap();

                let (read, data_size) = read_header(bytes.as_slice()).unwrap();
                assert_eq!(read, format, "{} {} channel", bit_depth, channels);
                assert_eq!(data_size, 37 * u32::from(format.block_align()));
                assert_eq!(bytes.len(), 44 + data_size as usize);
            }
        }
    }

    #[test]
    fn test_read_header_rejects_malformed() {
        let buffer = SampleBuffer::new(1, 4);
        let good = encode(&buffer, 1, BitDepth::Sixteen);

        let mut bad_id = good.clone();
        bad_id[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            read_header(bad_id.as_slice()),
            Err(WavError::Malformed(_))
        ));

        let mut float_format = good.clone();
        float_format[20] = 3;
        assert!(matches!(
            read_header(float_format.as_slice()),
            Err(WavError::Malformed(_))
        ));

        let mut long_fmt = good.clone();
        long_fmt[16] = 18;
        assert!(matches!(
            read_header(long_fmt.as_slice()),
            Err(WavError::Malformed(_))
        ));

        let mut wrong_riff_size = good.clone();
        wrong_riff_size[4] += 2;
        assert!(matches!(
            read_header(wrong_riff_size.as_slice()),
            Err(WavError::Malformed(_))
        ));

        let mut eight_bit = good.clone();
        eight_bit[34] = 8;
        assert!(matches!(
            read_header(eight_bit.as_slice()),
            Err(WavError::Malformed(_))
        ));

        assert!(matches!(read_header(&good[..20]), Err(WavError::Io(_))));
    }

    #[test]
    fn test_max_frames() {
        assert_eq!(max_frames(2), ((u32::MAX - 36) / 2) as usize);
        assert_eq!(max_frames(8), ((u32::MAX - 36) / 8) as usize);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = SampleBuffer::new(1, 0);
        let bytes = encode(&buffer, 1, BitDepth::Sixteen);

        assert_eq!(bytes.len(), 44);
        assert_eq!(u32_at(&bytes, 4), 36);
        assert_eq!(u32_at(&bytes, 40), 0);
    }

    #[test]
    fn test_interleaving_is_frame_major() {
        let buffer =
            SampleBuffer::from_channels(vec![vec![1.0, 0.0], vec![-1.0, 0.5]]).unwrap();
        let bytes = encode(&buffer, 2, BitDepth::Sixteen);
        let data = &bytes[44..];

        let samples: Vec<i16> = data
            .chunks(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32767, 0, 16384]);
    }

    #[test]
    fn test_encode_full_scale() {
        assert_eq!(encode_sample(1.0, BitDepth::Sixteen), 32767);
        assert_eq!(encode_sample(-1.0, BitDepth::Sixteen), -32767);
        assert_eq!(encode_sample(1.0, BitDepth::TwentyFour), 8388607);
        assert_eq!(encode_sample(-1.0, BitDepth::TwentyFour), -8388607);
        assert_eq!(encode_sample(1.0, BitDepth::ThirtyTwo), 2147483647);
        assert_eq!(encode_sample(-1.0, BitDepth::ThirtyTwo), -2147483647);
    }

    #[test]
    fn test_encode_rounds_half_away_from_zero() {
        // 0.5 * 32767 = 16383.5
        assert_eq!(encode_sample(0.5, BitDepth::Sixteen), 16384);
        assert_eq!(encode_sample(-0.5, BitDepth::Sixteen), -16384);
    }

    #[test]
    fn test_out_of_range_samples_clamp() {
        for bit_depth in [BitDepth::Sixteen, BitDepth::TwentyFour, BitDepth::ThirtyTwo] {
            let over = SampleBuffer::from_channels(vec![vec![1.5, -2.0]]).unwrap();
            let limit = SampleBuffer::from_channels(vec![vec![1.0, -1.0]]).unwrap();

            assert_eq!(
                encode(&over, 1, bit_depth),
                encode(&limit, 1, bit_depth),
                "{} clamping",
                bit_depth
            );
        }
    }

    #[test]
    fn test_24_bit_packing() {
        let buffer = SampleBuffer::from_channels(vec![vec![-1.0]]).unwrap();
        let bytes = encode(&buffer, 1, BitDepth::TwentyFour);

        // -8388607 = 0xFF800001
        assert_eq!(&bytes[44..], &[0x01, 0x00, 0x80]);
    }

    #[test]
    fn test_channel_mismatch() {
        let format = WavFormat::new(2, 44100, BitDepth::Sixteen).unwrap();
        let buffer = SampleBuffer::new(1, 4);
        let mut bytes = Vec::new();

        assert!(matches!(
            write_wav(&mut bytes, &format, &buffer),
            Err(WavError::ChannelMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_write_wav_file_readable_by_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let format = WavFormat::new(2, 48000, BitDepth::TwentyFour).unwrap();
        let buffer =
            SampleBuffer::from_channels(vec![vec![0.0, 0.5, 1.0], vec![0.0, -0.5, -1.0]])
                .unwrap();

        write_wav_file(&path, &format, &buffer).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.duration(), 3);

        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 0, 4194304, -4194304, 8388607, -8388607]);
    }

    #[test]
    fn test_write_wav_file_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let format = WavFormat::new(1, 44100, BitDepth::Sixteen).unwrap();

        let result = write_wav_file(&path, &format, &SampleBuffer::new(1, 1));
        assert!(matches!(result, Err(WavError::Create { .. })));
    }
}
