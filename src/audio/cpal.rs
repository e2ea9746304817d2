// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, info, span, Level};

use crate::audio::sequencer::{Sequencer, SequencerHandle};
use crate::audio::{AudioFragment, Device as AudioDevice, SampleFormat};
use crate::config;
use crate::error::Error;

/// The longest drain waits for the queue to empty.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(5);

/// A small wrapper around a cpal::Device. Used for storing some extra
/// data that makes sequential fragment playback more convenient.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The output stream. Only present for devices opened with `get`.
    output: Option<OutputManager>,
}

/// Owns the thread that keeps the cpal stream alive.
struct OutputManager {
    /// Queues fragments on the stream's sequencer.
    handle: SequencerHandle,
    /// The sample rate the stream was opened with.
    sample_rate: u32,
    /// Cleared to shut the output thread down.
    running: Arc<AtomicBool>,
    /// Handle to the output thread.
    output_thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// f32 callback: the sequencer writes directly into the cpal buffer.
fn create_f32_callback(
    mut sequencer: Sequencer,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        sequencer.fill(data);
    }
}

/// Integer callback: fill a scratch buffer and convert.
fn create_int_callback<T: cpal::SizedSample + cpal::FromSample<f32>>(
    mut sequencer: Sequencer,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut scratch: Vec<f32> = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        scratch.resize(data.len(), 0.0);
        sequencer.fill(&mut scratch);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

impl Drop for OutputManager {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl OutputManager {
    /// Opens the output stream on its own thread. The stream is created inside the thread
    /// because cpal streams can't always be moved between threads.
    fn start(device: cpal::Device, config: &config::Audio) -> Result<OutputManager, Error> {
        let channels = config.channels();
        let sample_rate = config.sample_rate();
        let sample_format = config
            .sample_format()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        let bits_per_sample = config.bits_per_sample();

        let (sequencer, handle) = Sequencer::new(channels);
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        let output_thread = {
            let running = running.clone();
            thread::spawn(move || {
                let stream_config = cpal::StreamConfig {
                    channels,
                    sample_rate: cpal::SampleRate(sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };
                let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);

                let stream_result = match (sample_format, bits_per_sample) {
                    (SampleFormat::Float, _) => device.build_output_stream(
                        &stream_config,
                        create_f32_callback(sequencer),
                        on_error,
                        None,
                    ),
                    (SampleFormat::Int, 16) => device.build_output_stream(
                        &stream_config,
                        create_int_callback::<i16>(sequencer),
                        on_error,
                        None,
                    ),
                    (SampleFormat::Int, 32) => device.build_output_stream(
                        &stream_config,
                        create_int_callback::<i32>(sequencer),
                        on_error,
                        None,
                    ),
                    (SampleFormat::Int, bits) => {
                        let _ = ready_tx.send(Err(format!(
                            "unsupported bit depth {} for integer output",
                            bits
                        )));
                        return;
                    }
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                info!("CPAL output stream started successfully");

                // Keep the stream alive until the manager is dropped.
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(100));
                }
                debug!("CPAL output stream stopped");
            })
        };

        let mut manager = OutputManager {
            handle,
            sample_rate,
            running,
            output_thread: Some(output_thread),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(manager),
            Ok(Err(e)) => Err(Error::DeviceUnavailable(e)),
            Err(_) => {
                manager.output_thread = None;
                Err(Error::DeviceUnavailable(
                    "output thread exited before the stream started".to_string(),
                ))
            }
        }
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Error> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, Error> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id)
                .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
            let host_devices = match host.devices() {
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
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    let Ok(name) = device.name() else {
                        continue;
                    };
                    devices.push(Device {
                        name,
                        max_channels,
                        host_id,
                        device,
                        output: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and opens its output stream. The name "default" selects the
    /// host's default output device.
    pub fn get(config: &config::Audio) -> Result<Device, Error> {
        let name = config.device();
        let found = if name == "default" {
            let host = cpal::default_host();
            host.default_output_device().and_then(|device| {
                let max_channels = device
                    .supported_output_configs()
                    .ok()?
                    .map(|output_config| output_config.channels())
                    .max()?;
                Some(Device {
                    name: device.name().ok()?,
                    max_channels,
                    host_id: host.id(),
                    device,
                    output: None,
                })
            })
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
        };

        let mut device = found.ok_or_else(|| {
            Error::DeviceUnavailable(format!("no device found with name {}", name))
        })?;
        if device.max_channels < config.channels() {
            return Err(Error::DeviceUnavailable(format!(
                "{} channels requested, audio device {} only has {}",
                config.channels(),
                device.name,
                device.max_channels
            )));
        }

        device.output = Some(OutputManager::start(device.device.clone(), config)?);
        Ok(device)
    }
}

impl AudioDevice for Device {
    fn start(&self, fragment: &AudioFragment) -> Result<(), Error> {
        let span = span!(Level::INFO, "play fragment (cpal)");
        let _enter = span.enter();

        let output = self.output.as_ref().ok_or_else(|| {
            Error::DeviceUnavailable(format!("device {} has not been opened", self.name))
        })?;

        let format = fragment.format();
        if format.sample_rate != output.sample_rate {
            return Err(Error::DeviceUnavailable(format!(
                "fragment {} is {}Hz but device {} is running at {}Hz",
                fragment.name(),
                format.sample_rate,
                self.name,
                output.sample_rate
            )));
        }

        debug!(
            device = self.name,
            fragment = fragment.name(),
            frames = fragment.frames(),
            "Queueing fragment."
        );
        output.handle.play(fragment).map_err(|_| {
            Error::DeviceUnavailable(format!("output stream for {} has stopped", self.name))
        })
    }

    fn stop(&self) {
        if let Some(output) = &self.output {
            if output.handle.stop().is_err() {
                debug!(device = self.name, "Output stream already stopped.");
            }
        }
    }

    fn drain(&self) {
        let Some(output) = &self.output else {
            return;
        };

        let start = Instant::now();
        while !output.handle.is_drained() {
            if start.elapsed() > DRAIN_TIMEOUT {
                error!(device = self.name, "Timed out waiting for the output to drain.");
                return;
            }
            thread::sleep(DRAIN_POLL);
        }

        // The last buffer handed to cpal still has to reach the speakers.
        let buffer = Duration::from_secs_f64(
            output.handle.buffer_frames() as f64 / f64::from(output.sample_rate.max(1)),
        );
        thread::sleep(buffer);
        debug!(device = self.name, "Output drained.");
    }
}
