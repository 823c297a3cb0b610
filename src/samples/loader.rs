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

//! Decoding and transcoding of catalog samples into playable buffers.

use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::audio::decode::{decode_file, DecodeError};

/// A fully decoded sample, interleaved at the output sample rate. Immutable once built
/// and shared between overlapping sessions through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    samples: Vec<f32>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedBuffer {
        DecodedBuffer {
            samples,
            channel_count,
            sample_rate,
        }
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channel_count == 0 {
            return 0;
        }
        self.samples.len() / self.channel_count as usize
    }

    /// Returns the interleaved samples of one frame.
    pub fn frame(&self, frame: usize) -> Option<&[f32]> {
        let channels = self.channel_count as usize;
        let start = frame.checked_mul(channels)?;
        self.samples.get(start..start + channels)
    }

    /// Returns the playing time of the buffer.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}

/// Turns sample files into buffers matching the output device's sample rate.
#[derive(Debug, Clone, Copy)]
pub struct SampleLoader {
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> SampleLoader {
        SampleLoader { target_sample_rate }
    }

    /// Decodes the file at the given path, transcoding it if needed.
    pub fn load(&self, path: &Path) -> Result<DecodedBuffer, DecodeError> {
        let decoded = decode_file(path)?;

        let (samples, sample_rate) = if decoded.sample_rate != self.target_sample_rate {
            info!(
                path = ?path,
                source_rate = decoded.sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding sample"
            );
            (
                transcode_samples(
                    &decoded.samples,
                    decoded.channel_count,
                    decoded.sample_rate,
                    self.target_sample_rate,
                ),
                self.target_sample_rate,
            )
        } else {
            (decoded.samples, decoded.sample_rate)
        };

        let buffer = DecodedBuffer::new(samples, decoded.channel_count, sample_rate);
        info!(
            path = ?path,
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            duration_ms = buffer.duration().as_millis(),
            memory_kb = buffer.memory_size() / 1024,
            "Sample decoded"
        );
        Ok(buffer)
    }
}

/// Transcodes interleaved samples from one sample rate to another using linear
/// interpolation. Feedback sounds are short one-shots, so this is good enough.
fn transcode_samples(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let channels = channel_count as usize;
    if channels == 0 || source_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_transcode_length() {
        let source_rate = 44100;
        let source_samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let result = transcode_samples(&source_samples, 1, source_rate, 48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_transcode_keeps_channels_apart() {
        // L=1.0, R=-1.0 throughout.
        let source_samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];

        let result = transcode_samples(&source_samples, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert_eq!(result.len() % 2, 0);
        for frame in result.chunks(2) {
            assert!((frame[0] - 1.0).abs() < 1e-6);
            assert!((frame[1] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_buffer_frames() {
        let buffer = DecodedBuffer::new(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 2, 48000);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.frame(1), Some(&[0.3f32, 0.4][..]));
        assert_eq!(buffer.frame(3), None);
    }

    #[test]
    fn test_load_transcodes_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tick.wav");
        write_wav(&path, 1, 24000, &vec![0.5; 240]).unwrap();

        let buffer = SampleLoader::new(48000).load(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 48000);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.frames(), 480);
    }
}
