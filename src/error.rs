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
use std::path::PathBuf;

use crate::audio::AudioFormat;

/// Errors produced while composing, playing or rendering a waltz.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no fragment for measure {measure} at {}", path.display())]
    FragmentNotFound { measure: String, path: PathBuf },

    #[error("unable to decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unable to write '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("fragment {index} has format {found}, expected {expected}")]
    FormatMismatch {
        index: usize,
        expected: AudioFormat,
        found: AudioFormat,
    },

    #[error("there are no fragments to render")]
    NothingToRender,

    #[error("playback was cancelled")]
    Cancelled,

    #[error("invalid measure identifier '{0}'")]
    InvalidMeasure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config load/parse error: {0}")]
    Config(#[from] config::ConfigError),
}
