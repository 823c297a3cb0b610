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
// Mixing of every playing session onto the shared output, independent of the backend.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::playsync::CancelHandle;
use crate::samples::DecodedBuffer;

/// Core audio mixing logic that's independent of any audio backend.
#[derive(Clone)]
pub struct AudioMixer {
    /// Sources currently rendering.
    active_sources: Arc<Mutex<Vec<ActiveSource>>>,
    num_channels: u16,
    sample_rate: u32,
}

/// One playing sample in the mixer.
pub struct ActiveSource {
    /// Unique ID for this source, shared with its playback session.
    pub id: u64,
    /// The catalog index being played.
    pub sample_index: usize,
    /// The decoded sample, shared with the library.
    pub buffer: Arc<DecodedBuffer>,
    /// The next frame to render.
    pub position: usize,
    /// Frames left before the duration bound, or None for unbounded.
    pub remaining_frames: Option<u64>,
    /// Whether to wrap to the start when the buffer runs out.
    pub looping: bool,
    /// Set by the mixer on natural completion.
    pub is_finished: Arc<AtomicBool>,
    /// Set by the owner to stop the source early.
    pub cancel_handle: CancelHandle,
}

impl ActiveSource {
    /// Adds up to `num_frames` frames of this source into the interleaved output.
    /// Returns false once the source has finished.
    fn render(&mut self, output: &mut [f32], num_channels: usize, num_frames: usize) -> bool {
        let total_frames = self.buffer.frames();
        let source_channels = self.buffer.channel_count() as usize;

        for out_frame in output.chunks_exact_mut(num_channels).take(num_frames) {
            if self.remaining_frames == Some(0) {
                return self.finish();
            }
            if self.position >= total_frames {
                if self.looping && total_frames > 0 {
                    self.position = 0;
                } else {
                    return self.finish();
                }
            }

            if let Some(frame) = self.buffer.frame(self.position) {
                if source_channels == 1 {
                    for out in out_frame.iter_mut() {
                        *out += frame[0];
                    }
                } else {
                    for (out, sample) in out_frame.iter_mut().zip(frame) {
                        *out += *sample;
                    }
                }
            }

            self.position += 1;
            if let Some(remaining) = self.remaining_frames.as_mut() {
                *remaining -= 1;
            }
        }

        // Finished as soon as the last frame is rendered.
        if self.remaining_frames == Some(0) || (!self.looping && self.position >= total_frames) {
            return self.finish();
        }
        true
    }

    fn finish(&self) -> bool {
        self.is_finished.store(true, Ordering::Release);
        false
    }
}

impl AudioMixer {
    /// Creates a new audio mixer.
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        Self {
            active_sources: Arc::new(Mutex::new(Vec::new())),
            num_channels,
            sample_rate,
        }
    }

    /// Adds a new audio source to the mixer.
    pub fn add_source(&self, source: ActiveSource) {
        self.active_sources.lock().push(source);
    }

    /// Mixes `num_frames` frames into the interleaved output buffer, overwriting it.
    /// Cancelled sources are dropped before rendering.
    pub fn process_into_output(&self, output: &mut [f32], num_frames: usize) {
        let num_channels = self.num_channels as usize;
        let len = (num_frames * num_channels).min(output.len());
        let output = &mut output[..len];
        output.fill(0.0);

        let mut sources = self.active_sources.lock();
        sources.retain_mut(|source| {
            if source.cancel_handle.is_cancelled() {
                return false;
            }
            source.render(output, num_channels, num_frames)
        });
    }

    /// Mixes `num_frames` frames into a new buffer.
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames, num_frames);
        frames
    }

    /// Cancels and drops every source.
    pub fn stop_all(&self) {
        let mut sources = self.active_sources.lock();
        for source in sources.iter() {
            source.cancel_handle.cancel();
        }
        sources.clear();
    }

    /// Returns the number of sources still rendering.
    pub fn active_count(&self) -> usize {
        self.active_sources.lock().len()
    }

    /// Gets the number of output channels.
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: u64, samples: Vec<f32>, channels: u16) -> (ActiveSource, Arc<AtomicBool>) {
        let is_finished = Arc::new(AtomicBool::new(false));
        (
            ActiveSource {
                id,
                sample_index: 0,
                buffer: Arc::new(DecodedBuffer::new(samples, channels, 44100)),
                position: 0,
                remaining_frames: None,
                looping: false,
                is_finished: is_finished.clone(),
                cancel_handle: CancelHandle::new(),
            },
            is_finished,
        )
    }

    #[test]
    fn test_mono_source_feeds_every_channel() {
        let mixer = AudioMixer::new(2, 44100);
        let (source, _) = source(1, vec![0.5, 0.8], 1);
        mixer.add_source(source);

        let frames = mixer.process_frames(2);
        assert_eq!(frames, vec![0.5, 0.5, 0.8, 0.8]);
    }

    #[test]
    fn test_overlapping_sources_are_summed() {
        let mixer = AudioMixer::new(2, 44100);
        let (first, _) = source(1, vec![0.5, 0.25], 2);
        let (second, _) = source(2, vec![0.125, 0.5], 2);
        mixer.add_source(first);
        mixer.add_source(second);

        let frame = mixer.process_frames(1);
        assert_eq!(frame, vec![0.625, 0.75]);
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_extra_source_channels_are_dropped() {
        let mixer = AudioMixer::new(2, 44100);
        let (source, _) = source(1, vec![0.1, 0.2, 0.3, 0.4], 4);
        mixer.add_source(source);

        assert_eq!(mixer.process_frames(1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_natural_completion_marks_finished() {
        let mixer = AudioMixer::new(1, 44100);
        let (source, is_finished) = source(1, vec![0.5, 0.5, 0.5], 1);
        mixer.add_source(source);

        mixer.process_frames(2);
        assert!(!is_finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 1);

        let frames = mixer.process_frames(4);
        assert_eq!(frames, vec![0.5, 0.0, 0.0, 0.0]);
        assert!(is_finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_duration_bound_and_looping() {
        let mixer = AudioMixer::new(1, 44100);
        let (mut source, is_finished) = source(1, vec![0.1, 0.2], 1);
        source.looping = true;
        source.remaining_frames = Some(5);
        mixer.add_source(source);

        let frames = mixer.process_frames(8);
        assert_eq!(frames, vec![0.1, 0.2, 0.1, 0.2, 0.1, 0.0, 0.0, 0.0]);
        assert!(is_finished.load(Ordering::Acquire));
    }

    #[test]
    fn test_cancelled_source_is_dropped() {
        let mixer = AudioMixer::new(1, 44100);
        let (source, is_finished) = source(1, vec![0.5; 16], 1);
        let cancel_handle = source.cancel_handle.clone();
        mixer.add_source(source);

        mixer.process_frames(4);
        cancel_handle.cancel();

        assert_eq!(mixer.process_frames(4), vec![0.0; 4]);
        assert_eq!(mixer.active_count(), 0);
        assert!(!is_finished.load(Ordering::Acquire));
    }
}
