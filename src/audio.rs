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
use std::sync::atomic::{AtomicU64, Ordering};
use std::{error::Error, fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod decode;
pub mod mixer;
pub mod mock;

/// Global counter for mixer source IDs. IDs start at 1; 0 marks a session that never
/// reached a device.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Returns a fresh mixer source ID.
pub fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The single shared output device. Every source handed to it is mixed with whatever
/// else is playing.
pub trait Device: fmt::Display + Send + Sync {
    /// Starts rendering the given source. Returns as soon as the source is queued.
    fn add_source(&self, source: mixer::ActiveSource) -> Result<(), Box<dyn Error>>;

    /// The output sample rate. Buffers must be decoded at this rate.
    fn sample_rate(&self) -> u32;

    /// The number of output channels.
    fn num_channels(&self) -> u16;

}

/// A listed output device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the configured output device. Names starting with "mock" select the mock device,
/// driven by its own clock.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        let mock = mock::Device::with_format(device, config.channels(), config.sample_rate());
        mock.start_clock();
        return Ok(Arc::new(mock));
    }

    Ok(Arc::new(cpal::Device::get(config)?))
}
