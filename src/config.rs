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
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::Error;
use crate::renderer::RenderSettings;

pub mod audio;

pub use audio::Audio;

/// The prefix for environment variable overrides, e.g. WUERFELSPIEL_AUDIO__DEVICE=mock.
const ENV_PREFIX: &str = "WUERFELSPIEL";
const DEFAULT_FRAGMENTS: &str = "resources";
const DEFAULT_EXTENSION: &str = "wav";

/// Rendering options.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Render {
    /// Trailing frames trimmed from every fragment but the last (default: 0).
    tail_trim_frames: Option<u64>,
}

impl Render {
    /// Returns the number of trailing frames trimmed from each non-final fragment.
    pub fn tail_trim_frames(&self) -> u64 {
        self.tail_trim_frames.unwrap_or(0)
    }
}

/// Everything the dice game can be configured with. All fields are optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    /// The directory holding the measure fragments.
    fragments: Option<String>,
    /// The file extension of the measure fragments.
    extension: Option<String>,
    /// Seed for the dice. Compositions are random when absent.
    seed: Option<u64>,
    /// The audio device configuration.
    audio: Option<Audio>,
    /// Rendering options.
    render: Option<Render>,
}

impl Settings {
    /// Loads settings from the optional YAML file, then applies WUERFELSPIEL_* environment
    /// variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Settings, Error> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Returns the fragment directory (default: resources).
    pub fn fragments(&self) -> PathBuf {
        PathBuf::from(self.fragments.as_deref().unwrap_or(DEFAULT_FRAGMENTS))
    }

    /// Overrides the fragment directory.
    pub fn set_fragments(&mut self, fragments: &str) {
        self.fragments = Some(fragments.to_string());
    }

    /// Returns the fragment file extension (default: wav).
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }

    /// Returns the dice seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Overrides the dice seed.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Overrides the audio device.
    pub fn set_device(&mut self, device: &str) {
        self.audio.get_or_insert_with(Audio::default).set_device(device);
    }

    /// Returns the rendering options.
    pub fn render(&self) -> Render {
        self.render.clone().unwrap_or_default()
    }

    /// Builds the renderer settings from the audio and render sections.
    pub fn render_settings(&self) -> Result<RenderSettings, Error> {
        let safety_margin = self.audio().safety_margin().map_err(|e| {
            Error::Config(ConfigError::Message(format!("invalid safety margin: {}", e)))
        })?;
        Ok(RenderSettings {
            safety_margin,
            tail_trim_frames: self.render().tail_trim_frames(),
        })
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::time::Duration;

    use config::FileFormat;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(PathBuf::from("resources"), settings.fragments());
        assert_eq!("wav", settings.extension());
        assert_eq!(None, settings.seed());
        assert_eq!("default", settings.audio().device());
        assert_eq!(0, settings.render().tail_trim_frames());

        let render_settings = settings.render_settings().unwrap();
        assert_eq!(Duration::from_millis(50), render_settings.safety_margin);
        assert_eq!(0, render_settings.tail_trim_frames);
    }

    #[test]
    fn test_deserialize() {
        let yaml = r#"
            fragments: /srv/waltz
            extension: flac
            seed: 1787
            audio:
              device: mock-device
              safety_margin: 10ms
            render:
              tail_trim_frames: 60000
        "#;

        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(PathBuf::from("/srv/waltz"), settings.fragments());
        assert_eq!("flac", settings.extension());
        assert_eq!(Some(1787), settings.seed());
        assert_eq!("mock-device", settings.audio().device());
        assert_eq!(60000, settings.render().tail_trim_frames());

        let render_settings = settings.render_settings().unwrap();
        assert_eq!(Duration::from_millis(10), render_settings.safety_margin);
        assert_eq!(60000, render_settings.tail_trim_frames);
    }

    #[test]
    fn test_load_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("waltz.yaml");
        fs::write(&path, "fragments: measures\naudio:\n  device: mock\n").unwrap();

        let mut settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(PathBuf::from("measures"), settings.fragments());
        assert_eq!("mock", settings.audio().device());

        settings.set_device("mock-other");
        settings.set_fragments("elsewhere");
        settings.set_seed(5);
        assert_eq!("mock-other", settings.audio().device());
        assert_eq!(PathBuf::from("elsewhere"), settings.fragments());
        assert_eq!(Some(5), settings.seed());
    }

    #[test]
    fn test_load_missing_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let result = Settings::load(Some(&tempdir.path().join("missing.yaml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_safety_margin() {
        let yaml = "audio:\n  safety_margin: eventually\n";
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(matches!(settings.render_settings(), Err(Error::Config(_))));
    }
}
