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
use std::{error::Error, str::FromStr, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;

use crate::audio::SampleFormat;

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(50);
const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNELS: u16 = 2;

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct Audio {
    /// The audio device.
    #[serde(default = "default_device")]
    device: String,

    /// How long before the end of a measure the next measure is started (default: 50ms).
    safety_margin: Option<String>,

    /// Output stream sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Output stream channel count (default: 2)
    channels: Option<u16>,

    /// Output sample format (default: "float")
    sample_format: Option<String>,

    /// Output bits per sample for integer output (default: 16)
    bits_per_sample: Option<u16>,
}

impl Default for Audio {
    fn default() -> Self {
        Audio::new(DEFAULT_DEVICE)
    }
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            safety_margin: None,
            sample_rate: None,
            channels: None,
            sample_format: None,
            bits_per_sample: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Overrides the device.
    pub fn set_device(&mut self, device: &str) {
        self.device = device.to_string();
    }

    /// Returns the safety margin subtracted from each measure's duration during playback.
    pub fn safety_margin(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.safety_margin {
            Some(safety_margin) => Ok(DurationString::from_string(safety_margin.clone())?.into()),
            None => Ok(DEFAULT_SAFETY_MARGIN),
        }
    }

    /// Returns the output sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the output channel count (default: 2)
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS).max(1)
    }

    /// Returns the output sample format (default: Float)
    pub fn sample_format(&self) -> Result<SampleFormat, Box<dyn Error>> {
        match self.sample_format.as_deref() {
            Some(format) => SampleFormat::from_str(format),
            None => Ok(SampleFormat::Float),
        }
    }

    /// Returns the output bits per sample (default: 16)
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample.unwrap_or(16)
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_audio_defaults() {
        let audio = Audio::new("mock");
        assert_eq!("mock", audio.device());
        assert_eq!(Duration::from_millis(50), audio.safety_margin().unwrap());
        assert_eq!(44100, audio.sample_rate());
        assert_eq!(2, audio.channels());
        assert_eq!(SampleFormat::Float, audio.sample_format().unwrap());
        assert_eq!(16, audio.bits_per_sample());
    }

    #[test]
    fn test_audio_deserialize() {
        let yaml = r#"
            device: mock-device
            safety_margin: 20ms
            sample_rate: 48000
            channels: 1
            sample_format: int
            bits_per_sample: 32
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!("mock-device", audio.device());
        assert_eq!(Duration::from_millis(20), audio.safety_margin().unwrap());
        assert_eq!(48000, audio.sample_rate());
        assert_eq!(1, audio.channels());
        assert_eq!(SampleFormat::Int, audio.sample_format().unwrap());
        assert_eq!(32, audio.bits_per_sample());
    }

    #[test]
    fn test_audio_invalid_values() {
        let yaml = r#"
            safety_margin: soon
            sample_format: double
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!("default", audio.device());
        assert!(audio.safety_margin().is_err());
        assert!(audio.sample_format().is_err());
    }
}
