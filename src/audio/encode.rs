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
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use hound::{WavSpec, WavWriter};
use tracing::{debug, warn};

use super::{AudioFragment, SampleFormat};
use crate::error::Error;

/// Writes the fragment to the destination as a WAV file in the fragment's format. The file
/// is written next to the destination first and renamed into place once complete, so a
/// failed write never leaves a truncated WAV at the destination.
pub fn write_wav_file<P: AsRef<Path>>(
    fragment: &AudioFragment,
    destination: P,
) -> Result<(), Error> {
    let destination = destination.as_ref();
    let partial = partial_path(destination);

    let result = write_partial(fragment, &partial)
        .and_then(|()| fs::rename(&partial, destination).map_err(Error::from));
    if result.is_err() && partial.exists() {
        if let Err(e) = fs::remove_file(&partial) {
            warn!(
                file = %partial.display(),
                err = %e,
                "Unable to remove partially written file."
            );
        }
    }
    result
}

fn write_partial(fragment: &AudioFragment, path: &Path) -> Result<(), Error> {
    let encode_error = |source: hound::Error| Error::Encode {
        path: path.to_path_buf(),
        source,
    };

    let format = fragment.format();
    let (sample_format, bits_per_sample) = match format.sample_format {
        SampleFormat::Float => (hound::SampleFormat::Float, 32),
        SampleFormat::Int => (
            hound::SampleFormat::Int,
            match format.bits_per_sample {
                8 | 16 | 24 | 32 => format.bits_per_sample,
                _ => 16,
            },
        ),
    };
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec).map_err(encode_error)?;
    match sample_format {
        hound::SampleFormat::Float => {
            for &sample in fragment.samples() {
                writer.write_sample(sample).map_err(encode_error)?;
            }
        }
        hound::SampleFormat::Int => {
            let max = ((1i64 << (bits_per_sample - 1)) - 1) as f32;
            for &sample in fragment.samples() {
                let scaled = (sample.clamp(-1.0, 1.0) * max).round() as i32;
                writer.write_sample(scaled).map_err(encode_error)?;
            }
        }
    }
    writer.finalize().map_err(encode_error)?;

    debug!(
        file = %path.display(),
        frames = fragment.frames(),
        "Wrote WAV data."
    );
    Ok(())
}

/// The sibling path used while the destination is being written.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("waltz"));
    name.push(".part");
    destination.with_file_name(name)
}
