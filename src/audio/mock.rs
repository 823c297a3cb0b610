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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::audio::mixer::{ActiveSource, AudioMixer};
use crate::playsync::CancelHandle;

const CLOCK_TICK: Duration = Duration::from_millis(10);

/// A record of one source handed to the mock device.
#[derive(Clone, Debug)]
pub struct Played {
    /// The mixer source ID, equal to the session ID.
    pub id: u64,
    /// The catalog index that was played.
    pub sample_index: usize,
    cancel_handle: CancelHandle,
    is_finished: Arc<AtomicBool>,
}

impl Played {
    /// Returns true if the source was stopped by its owner.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_handle.is_cancelled()
    }

    /// Returns true if the source played to its natural end.
    pub fn is_finished(&self) -> bool {
        self.is_finished.load(Ordering::Acquire)
    }
}

/// A mock device. Doesn't produce sound, but mixes exactly like a real device and
/// remembers every source it was given.
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: AudioMixer,
    history: Arc<Mutex<Vec<Played>>>,
    /// Cleared once the clock runs, so a long-lived device doesn't keep every source.
    recording: Arc<AtomicBool>,
}

impl Device {
    /// Gets a mock device with the given output format. Frames are only rendered through
    /// [`Device::render`] until the clock is started.
    pub fn with_format(name: &str, num_channels: u16, sample_rate: u32) -> Device {
        Device {
            name: name.to_string(),
            mixer: AudioMixer::new(num_channels, sample_rate),
            history: Arc::new(Mutex::new(Vec::new())),
            recording: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Starts a thread that renders frames in real time and throws them away, so sessions
    /// complete naturally as they would on hardware.
    pub fn start_clock(&self) {
        let mixer = self.mixer.clone();
        let frames_per_tick =
            (mixer.sample_rate() as u128 * CLOCK_TICK.as_millis() / 1000) as usize;
        info!(device = self.name, "Starting mock device clock");
        self.recording.store(false, Ordering::Relaxed);
        self.history.lock().clear();
        thread::spawn(move || {
            let mut scratch = vec![0.0f32; frames_per_tick * mixer.num_channels() as usize];
            loop {
                mixer.process_into_output(&mut scratch, frames_per_tick);
                thread::sleep(CLOCK_TICK);
            }
        });
    }

    /// Renders the given number of frames and returns them interleaved.
    pub fn render(&self, num_frames: usize) -> Vec<f32> {
        self.mixer.process_frames(num_frames)
    }

    /// Returns every source handed to the device, in order.
    pub fn history(&self) -> Vec<Played> {
        self.history.lock().clone()
    }

    /// Returns the catalog indices played so far, in order.
    pub fn played(&self) -> Vec<usize> {
        self.history.lock().iter().map(|p| p.sample_index).collect()
    }

    /// Returns the record for the given source ID.
    pub fn source(&self, id: u64) -> Option<Played> {
        self.history.lock().iter().find(|p| p.id == id).cloned()
    }

    /// Returns the number of sources still rendering.
    pub fn active_count(&self) -> usize {
        self.mixer.active_count()
    }
}

impl crate::audio::Device for Device {
    fn add_source(&self, source: ActiveSource) -> Result<(), Box<dyn Error>> {
        debug!(
            device = self.name,
            id = source.id,
            sample = source.sample_index,
            "Adding source (mock)"
        );
        if self.recording.load(Ordering::Relaxed) {
            self.history.lock().push(Played {
                id: source.id,
                sample_index: source.sample_index,
                cancel_handle: source.cancel_handle.clone(),
                is_finished: source.is_finished.clone(),
            });
        }
        self.mixer.add_source(source);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn num_channels(&self) -> u16 {
        self.mixer.num_channels()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{next_source_id, Device as _};
    use crate::samples::DecodedBuffer;

    fn source(sample_index: usize) -> ActiveSource {
        ActiveSource {
            id: next_source_id(),
            sample_index,
            buffer: Arc::new(DecodedBuffer::new(vec![0.5; 4], 1, 1000)),
            position: 0,
            remaining_frames: None,
            looping: false,
            is_finished: Arc::new(AtomicBool::new(false)),
            cancel_handle: CancelHandle::new(),
        }
    }

    #[test]
    fn test_records_sources_until_clock_starts() {
        let device = Device::with_format("mock", 1, 1000);
        device.add_source(source(1)).unwrap();
        device.add_source(source(2)).unwrap();
        assert_eq!(device.played(), vec![1, 2]);

        device.start_clock();
        assert!(device.played().is_empty());
        for index in 0..100 {
            device.add_source(source(index)).unwrap();
        }
        assert!(device.history().is_empty());
    }
}
