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
use std::{sync::Arc, time::Duration};

use super::AudioFormat;

/// Decoded audio for one measure. Samples are interleaved and scaled to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFragment {
    name: String,
    format: AudioFormat,
    samples: Arc<[f32]>,
}

impl AudioFragment {
    /// Creates a fragment from interleaved samples. Trailing samples that don't fill a whole
    /// frame are dropped.
    pub fn new(name: impl Into<String>, format: AudioFormat, mut samples: Vec<f32>) -> Self {
        let channels = usize::from(format.channels.max(1));
        samples.truncate(samples.len() - samples.len() % channels);
        AudioFragment {
            name: name.into(),
            format,
            samples: samples.into(),
        }
    }

    /// Replaces the name of the fragment.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        AudioFragment {
            name: name.into(),
            ..self
        }
    }

    /// Gets the name of the fragment, usually the measure identifier or file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the format of the fragment.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Gets the interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Gets a shared handle to the samples, used to hand them to an output stream without copying.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        self.samples.clone()
    }

    /// Gets the number of frames (samples per channel).
    pub fn frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.format.channels.max(1))) as u64
    }

    /// Gets the playing time of the fragment.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.format.sample_rate.max(1)))
    }
}
