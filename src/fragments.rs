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

use tracing::debug;

use crate::audio::{decode_file, AudioFragment};
use crate::error::Error;
use crate::measures::Measure;

/// Maps a measure identifier to its decoded audio.
pub trait FragmentResolver {
    fn resolve(&self, measure: &Measure) -> Result<AudioFragment, Error>;
}

/// Resolves measures to `<root>/<ID>.<extension>`, e.g. resources/M96.wav.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
    extension: String,
}

impl DirectoryResolver {
    pub fn new<P: Into<PathBuf>>(root: P, extension: &str) -> DirectoryResolver {
        DirectoryResolver {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Gets the path the measure's fragment is expected at.
    pub fn path_for(&self, measure: &Measure) -> PathBuf {
        self.root.join(format!("{}.{}", measure, self.extension))
    }
}

impl FragmentResolver for DirectoryResolver {
    fn resolve(&self, measure: &Measure) -> Result<AudioFragment, Error> {
        let path = self.path_for(measure);
        if !path.is_file() {
            return Err(Error::FragmentNotFound {
                measure: measure.to_string(),
                path,
            });
        }

        let fragment = decode_file(&path)?.with_name(measure.to_string());
        debug!(
            measure = measure.to_string(),
            path = path.display().to_string(),
            frames = fragment.frames(),
            "Resolved fragment."
        );
        Ok(fragment)
    }
}
