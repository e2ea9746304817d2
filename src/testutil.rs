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
use std::{any::TypeId, error::Error, fs::File, path::PathBuf};

use hound::{Sample, SampleFormat, WavSpec, WavWriter};

/// Writes a 32-bit WAV file. Each inner vector holds one channel; channels are interleaved
/// frame by frame and must all be the same length.
pub fn write_wav<S: Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let sample_format = if TypeId::of::<S>() == TypeId::of::<f32>() {
        SampleFormat::Float
    } else if TypeId::of::<S>() == TypeId::of::<i32>() {
        SampleFormat::Int
    } else {
        return Err("Unsupported sample format".into());
    };
    write_samples(path, samples, sample_rate, 32, sample_format)
}

/// Writes an integer WAV file with the given bit depth.
pub fn write_wav_with_bits<S: Sample + Copy>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), Box<dyn Error>> {
    write_samples(path, samples, sample_rate, bits_per_sample, SampleFormat::Int)
}

/// Writes a mono 16-bit measure file named after the measure, filled with a constant value.
pub fn write_measure(
    dir: &std::path::Path,
    measure: &str,
    frames: usize,
    value: i16,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join(format!("{}.wav", measure));
    write_wav_with_bits(path.clone(), vec![vec![value; frames]], 44100, 16)?;
    Ok(path)
}

fn write_samples<S: Sample + Copy>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<(), Box<dyn Error>> {
    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let frames = samples.first().map(|channel| channel.len()).unwrap_or(0);
    assert!(
        samples.iter().all(|channel| channel.len() == frames),
        "Channels must be the same length"
    );

    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;
    for frame in 0..frames {
        for channel in &samples {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    Ok(())
}
