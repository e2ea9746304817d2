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
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use tracing::{info, span, Level};

use crate::audio::AudioFragment;
use crate::error::Error;

/// A mock device. Doesn't actually play anything, but remembers what it was asked to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    started: Arc<Mutex<Vec<String>>>,
    stops: Arc<AtomicUsize>,
    drains: Arc<AtomicUsize>,
    unavailable_on: Option<String>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            started: Arc::new(Mutex::new(Vec::new())),
            stops: Arc::new(AtomicUsize::new(0)),
            drains: Arc::new(AtomicUsize::new(0)),
            unavailable_on: None,
        }
    }

    /// Gets a mock device that reports itself unavailable when asked to play the named fragment.
    pub fn unavailable_on(name: &str, fragment: &str) -> Device {
        Device {
            unavailable_on: Some(fragment.to_string()),
            ..Device::get(name)
        }
    }

    /// Returns the names of the fragments started on this device, in order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().expect("Error getting lock").clone()
    }

    /// Returns the number of times the device was stopped.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::Relaxed)
    }

    /// Returns the number of times the device was drained.
    pub fn drains(&self) -> usize {
        self.drains.load(Ordering::Relaxed)
    }
}

impl crate::audio::Device for Device {
    fn start(&self, fragment: &AudioFragment) -> Result<(), Error> {
        let span = span!(Level::INFO, "play fragment (mock)");
        let _enter = span.enter();

        if self.unavailable_on.as_deref() == Some(fragment.name()) {
            return Err(Error::DeviceUnavailable(format!(
                "{} refused to play {}",
                self.name,
                fragment.name()
            )));
        }

        info!(
            device = self.name,
            fragment = fragment.name(),
            duration = format!("{:?}", fragment.duration()),
            "Playing fragment."
        );
        self.started
            .lock()
            .expect("Error getting lock")
            .push(fragment.name().to_string());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    fn drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{AudioFormat, Device as _};

    #[test]
    fn test_mock_records_fragments() {
        let device = Device::get("mock");
        let format = AudioFormat::default();
        device
            .start(&AudioFragment::new("M1", format, vec![0.0; 4]))
            .unwrap();
        device
            .start(&AudioFragment::new("T2", format, vec![0.0; 4]))
            .unwrap();
        device.stop();
        device.drain();

        assert_eq!(vec!["M1".to_string(), "T2".to_string()], device.started());
        assert_eq!(1, device.stops());
        assert_eq!(1, device.drains());
    }

    #[test]
    fn test_mock_unavailable() {
        let device = Device::unavailable_on("mock", "T2");
        let result = device.start(&AudioFragment::new("T2", AudioFormat::default(), vec![]));
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
        assert!(device.started().is_empty());
    }
}
