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
use std::any::Any;
use std::{fmt, sync::Arc};

use crate::config;
use crate::error::Error;

pub mod cpal;
pub mod decode;
pub mod encode;
pub mod format;
pub mod fragment;
pub mod mock;
pub mod sequencer;

pub use decode::decode_file;
pub use encode::write_wav_file;
pub use format::{AudioFormat, SampleFormat};
pub use fragment::AudioFragment;

pub trait Device: Any + fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts playing the fragment and returns immediately. Fragments started while another
    /// is still sounding are queued behind it.
    fn start(&self, fragment: &AudioFragment) -> Result<(), Error>;

    /// Silences the device and drops anything still queued.
    fn stop(&self);

    /// Blocks until everything started on the device has been played out.
    fn drain(&self);
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Error> {
    cpal::Device::list()
}

/// Gets a device for the given configuration. Device names starting with "mock" produce a
/// device that doesn't make any sound.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Error> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
