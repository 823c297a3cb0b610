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
    collections::VecDeque,
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, warn, Level};

use crate::audio::mixer::{ActiveSource, AudioMixer};
use crate::audio::{Device as AudioDevice, DeviceInfo};
use crate::config;

/// Frames mixed per producer pass.
const BLOCK_FRAMES: usize = 256;

/// How long to wait for the output thread to report the stream running.
const STREAM_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Interleaved samples waiting for the output callback. Sized for roughly 50ms.
struct SampleRing {
    samples: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> SampleRing {
        SampleRing {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns how many samples can be pushed without overflowing.
    fn space(&self) -> usize {
        self.capacity.saturating_sub(self.samples.lock().len())
    }

    fn push(&self, block: &[f32]) {
        self.samples.lock().extend(block.iter().copied());
    }

    /// Fills the callback buffer. The callback never blocks: on contention or underrun
    /// the missing part is silence.
    fn pop_into<T>(&self, data: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let mut filled = 0;
        if let Some(mut samples) = self.samples.try_lock() {
            let available = data.len().min(samples.len());
            for (dst, src) in data.iter_mut().zip(samples.drain(..available)) {
                *dst = T::from_sample(src);
                filled += 1;
            }
        }
        for dst in data[filled..].iter_mut() {
            *dst = T::EQUILIBRIUM;
        }
    }
}

/// Owns the mixer thread and the thread holding the cpal stream.
struct OutputManager {
    mixer: AudioMixer,
    source_tx: crossbeam_channel::Sender<ActiveSource>,
    running: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl OutputManager {
    /// Starts mixing for the given device.
    fn start(
        device: cpal::Device,
        sample_format: cpal::SampleFormat,
        stream_config: cpal::StreamConfig,
    ) -> Result<OutputManager, Box<dyn Error>> {
        let num_channels = stream_config.channels;
        let sample_rate = stream_config.sample_rate;
        let mixer = AudioMixer::new(num_channels, sample_rate);
        let (source_tx, source_rx) = crossbeam_channel::unbounded::<ActiveSource>();
        let running = Arc::new(AtomicBool::new(true));

        let capacity = (sample_rate as usize * num_channels as usize / 20).max(1024);
        let ring = Arc::new(SampleRing::new(capacity));

        let producer = {
            let mixer = mixer.clone();
            let ring = ring.clone();
            let running = running.clone();
            thread::spawn(move || {
                let block_samples = BLOCK_FRAMES * num_channels as usize;
                let mut scratch = vec![0.0f32; block_samples];

                while running.load(Ordering::Relaxed) {
                    while let Ok(source) = source_rx.try_recv() {
                        mixer.add_source(source);
                    }

                    if ring.space() >= block_samples {
                        mixer.process_into_output(&mut scratch, BLOCK_FRAMES);
                        ring.push(&scratch);
                    } else {
                        thread::sleep(Duration::from_micros(500));
                    }
                }
            })
        };

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let output = {
            let running = running.clone();
            thread::spawn(move || {
                let span = span!(Level::INFO, "cpal output");
                let _enter = span.enter();

                let stream = match sample_format {
                    cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, ring),
                    cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, ring),
                    cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, ring),
                    cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, ring),
                    other => {
                        error!(format = ?other, "Unsupported output sample format");
                        let _ = ready_tx.send(Err(format!("unsupported sample format {:?}", other)));
                        return;
                    }
                };

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!(err = %e, "Failed to create output stream");
                        let _ = ready_tx.send(Err(format!("failed to create output stream: {}", e)));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    error!(err = %e, "Failed to start output stream");
                    let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
                    return;
                }
                info!("Output stream started");
                let _ = ready_tx.send(Ok(()));

                // The stream lives as long as this thread.
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(100));
                }
            })
        };

        let manager = OutputManager {
            mixer,
            source_tx,
            running,
            threads: vec![producer, output],
        };
        // On failure the manager is dropped here, which stops the producer.
        wait_for_stream(&ready_rx, STREAM_START_TIMEOUT)?;
        Ok(manager)
    }
}

/// Waits for the output thread to report whether its stream is playing.
fn wait_for_stream(
    ready_rx: &crossbeam_channel::Receiver<Result<(), String>>,
    timeout: Duration,
) -> Result<(), Box<dyn Error>> {
    match ready_rx.recv_timeout(timeout) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
            Err("timed out waiting for the output stream to start".into())
        }
        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
            Err("output thread exited before the stream started".into())
        }
    }
}

impl Drop for OutputManager {
    fn drop(&mut self) {
        self.mixer.stop_all();
        self.running.store(false, Ordering::Relaxed);
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    ring: Arc<SampleRing>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    device.build_output_stream(
        stream_config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| ring.pop_into(data),
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

/// The shared output device backed by cpal.
pub struct Device {
    name: String,
    host_id: cpal::HostId,
    output_manager: OutputManager,
}

impl Device {
    /// Lists output devices on every available host.
    pub fn list() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|(info, _)| info)
            .collect())
    }

    fn list_cpal_devices() -> Result<Vec<(DeviceInfo, cpal::Device)>, Box<dyn Error>> {
        // Suppress noisy backend output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = configs.map(|c| c.channels()).max().unwrap_or(0);
                if max_channels == 0 {
                    continue;
                }
                let Ok(description) = device.description() else {
                    continue;
                };

                devices.push((
                    DeviceInfo {
                        name: description.name().to_string(),
                        host: host_id.name().to_string(),
                        max_channels,
                    },
                    device,
                ));
            }
        }

        devices.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
        Ok(devices)
    }

    /// Opens the configured device, or the host default for "default".
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let (name, host_id, device) = if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            let name = device
                .description()
                .map(|d| d.name().to_string())
                .unwrap_or_else(|_| "default".to_string());
            (name, host.id(), device)
        } else {
            let (info, device) = Device::list_cpal_devices()?
                .into_iter()
                .find(|(info, _)| info.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?;
            let host_id = cpal::available_hosts()
                .into_iter()
                .find(|id| id.name() == info.host)
                .ok_or("device host disappeared")?;
            (info.name, host_id, device)
        };

        let default_config = device.default_output_config()?;
        let sample_format = default_config.sample_format();
        let stream_config = cpal::StreamConfig {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            buffer_size: match config.stream_buffer_size() {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };
        if default_config.sample_rate() != stream_config.sample_rate {
            warn!(
                device = name,
                default_rate = default_config.sample_rate(),
                requested_rate = stream_config.sample_rate,
                "Requested sample rate differs from the device default"
            );
        }

        info!(
            device = name,
            host = host_id.name(),
            channels = stream_config.channels,
            sample_rate = stream_config.sample_rate,
            format = ?sample_format,
            "Opening output device"
        );
        let output_manager = OutputManager::start(device, sample_format, stream_config)?;

        Ok(Device {
            name,
            host_id,
            output_manager,
        })
    }
}

impl AudioDevice for Device {
    fn add_source(&self, source: ActiveSource) -> Result<(), Box<dyn Error>> {
        self.output_manager.source_tx.send(source)?;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.output_manager.mixer.sample_rate()
    }

    fn num_channels(&self) -> u16 {
        self.output_manager.mixer.num_channels()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.num_channels(),
            self.host_id.name()
        )
    }
}
