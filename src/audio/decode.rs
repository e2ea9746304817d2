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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::{AudioFormat, AudioFragment, SampleFormat};
use crate::error::Error;
use crate::util::filename_display;

/// Decodes an entire audio file (WAV, FLAC, MP3, etc.) into a fragment.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<AudioFragment, Error> {
    let path = path.as_ref();
    let decode_error = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| decode_error(e.to_string()))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error("no audio track found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| decode_error("sample rate not specified".to_string()))?;
    let bits_per_sample = params.bits_per_sample.unwrap_or(16) as u16;
    let sample_format = if params.codec == symphonia::core::codecs::CODEC_TYPE_PCM_F32LE
        || params.codec == symphonia::core::codecs::CODEC_TYPE_PCM_F32BE
        || params.codec == symphonia::core::codecs::CODEC_TYPE_PCM_F64LE
        || params.codec == symphonia::core::codecs::CODEC_TYPE_PCM_F64BE
    {
        SampleFormat::Float
    } else {
        SampleFormat::Int
    };

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs()
        .make(&params, &decoder_opts)
        .map_err(|e| decode_error(e.to_string()))?;

    // Prefer the container's channel count. Some formats only reveal it once the first
    // packet has been decoded.
    let mut channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut samples = Vec::new();
    while let Some((decoded, decoded_channels)) = read_and_decode_next_packet(
        &mut || format_reader.next_packet(),
        decoder.as_mut(),
        track_id,
    )
    .map_err(|e| decode_error(e.to_string()))?
    {
        if channels == 0 {
            channels = decoded_channels as u16;
        }
        samples.extend_from_slice(&decoded);
    }

    if channels == 0 {
        return Err(decode_error("channels not specified".to_string()));
    }

    let format = AudioFormat {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format,
    };
    let fragment = AudioFragment::new(filename_display(path), format, samples);
    debug!(
        file = filename_display(path),
        frames = fragment.frames(),
        format = %format,
        "Decoded fragment."
    );
    Ok(fragment)
}

/// Reads and decodes the next packet for the given track. Returns `Ok(None)` at the end of
/// the stream. Any decoder error fails the whole fragment.
fn read_and_decode_next_packet(
    next_packet: &mut dyn FnMut() -> Result<Packet, SymphoniaError>,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Option<(Vec<f32>, usize)>, SymphoniaError> {
    loop {
        let packet = match next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            // Some readers report the end of the stream as a decode error.
            Err(SymphoniaError::DecodeError(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                decoder.decode(&packet)?
            }
            Err(e) => return Err(e),
        };

        let (samples, channels) = decode_buffer_to_f32(decoded);
        if channels > 0 && !samples.is_empty() {
            return Ok(Some((samples, channels)));
        }
    }
}

/// Converts a decoded AudioBufferRef to interleaved f32 samples and returns the channel count
/// observed in the decoded buffer.
fn decode_buffer_to_f32(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_planar_samples(&buf, |sample| sample),
        AudioBufferRef::F64(buf) => interleave_planar_samples(&buf, |sample| sample as f32),
        AudioBufferRef::S8(buf) => interleave_planar_samples(&buf, scale_s8),
        AudioBufferRef::S16(buf) => interleave_planar_samples(&buf, scale_s16),
        AudioBufferRef::S24(buf) => interleave_planar_samples(&buf, |sample| {
            scale_s24(sample.inner())
        }),
        AudioBufferRef::S32(buf) => interleave_planar_samples(&buf, scale_s32),
        AudioBufferRef::U8(buf) => interleave_planar_samples(&buf, scale_u8),
        AudioBufferRef::U16(buf) => interleave_planar_samples(&buf, scale_u16),
        AudioBufferRef::U24(buf) => interleave_planar_samples(&buf, |sample| {
            scale_u24(sample.inner())
        }),
        AudioBufferRef::U32(buf) => interleave_planar_samples(&buf, scale_u32),
    }
}

fn interleave_planar_samples<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    let planes = buf.planes();
    let mut samples = Vec::with_capacity(frames * channels);
    for frame_idx in 0..frames {
        for plane in planes.planes().iter().take(channels) {
            samples.push(convert(plane[frame_idx]));
        }
    }
    (samples, channels)
}

#[inline]
pub(crate) fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
pub(crate) fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
pub(crate) fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
pub(crate) fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
pub(crate) fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod test {
    use std::fs;

    use symphonia::core::audio::{AsAudioBufferRef, Channels, SignalSpec};
    use symphonia::core::codecs::{CodecDescriptor, CodecParameters, FinalizeResult};

    use super::*;
    use crate::testutil::{write_wav, write_wav_with_bits};

    #[test]
    fn test_integer_scaling_signed_ranges() {
        assert!((scale_s8(0) - 0.0).abs() < 1e-7);
        assert!(scale_s8(i8::MAX) <= 1.0 + 1e-7);
        assert!(scale_s8(i8::MIN) >= -1.0 - 1e-7);

        assert!((scale_s16(0) - 0.0).abs() < 1e-7);
        assert!(scale_s16(i16::MAX) <= 1.0 + 1e-7);
        assert!(scale_s16(i16::MIN) >= -1.0 - 1e-7);

        assert!((scale_s24(0) - 0.0).abs() < 1e-7);
        assert!(scale_s24((1 << 23) - 1) <= 1.0 + 1e-7);
        assert!(scale_s24(-(1 << 23)) >= -1.0 - 1e-7);

        assert!((scale_s32(0) - 0.0).abs() < 1e-7);
        assert!(scale_s32(i32::MAX) <= 1.0 + 1e-7);
        assert!(scale_s32(i32::MIN) >= -1.0 - 1e-7);
    }

    #[test]
    fn test_integer_scaling_unsigned_ranges() {
        assert!((scale_u8(0) + 1.0).abs() < 1e-7);
        assert!((scale_u8(u8::MAX) - 1.0).abs() < 1e-7);
        assert!((scale_u16(0) + 1.0).abs() < 1e-7);
        assert!((scale_u16(u16::MAX) - 1.0).abs() < 1e-7);
        assert!((scale_u24((1 << 24) - 1) - 1.0).abs() < 1e-6);
        assert!((scale_u32(0) + 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_decode_float_wav() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("M1.wav");
        write_wav(path.clone(), vec![vec![0.25f32, -0.5, 0.75, 0.0]], 8000).unwrap();

        let fragment = decode_file(&path).unwrap();
        assert_eq!("M1.wav", fragment.name());
        assert_eq!(1, fragment.format().channels);
        assert_eq!(8000, fragment.format().sample_rate);
        assert_eq!(SampleFormat::Float, fragment.format().sample_format);
        assert_eq!(4, fragment.frames());
        assert_eq!(&[0.25, -0.5, 0.75, 0.0], fragment.samples());
    }

    #[test]
    fn test_decode_int16_wav() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("T1.wav");
        write_wav_with_bits(
            path.clone(),
            vec![vec![0i16, 16384, -16384, 32767, 0, -32768]],
            44100,
            16,
        )
        .unwrap();

        let fragment = decode_file(&path).unwrap();
        assert_eq!(SampleFormat::Int, fragment.format().sample_format);
        assert_eq!(16, fragment.format().bits_per_sample);
        assert_eq!(6, fragment.frames());
        assert!((fragment.samples()[1] - 0.5).abs() < 1e-4);
        assert!((fragment.samples()[2] + 0.5).abs() < 1e-4);
    }

    /// A decoder that rejects every packet, as a decoder does with a corrupt frame.
    struct CorruptDecoder {
        params: CodecParameters,
        buffer: AudioBuffer<f32>,
    }

    impl Decoder for CorruptDecoder {
        fn try_new(
            params: &CodecParameters,
            _: &DecoderOptions,
        ) -> symphonia::core::errors::Result<Self> {
            Ok(CorruptDecoder {
                params: params.clone(),
                buffer: AudioBuffer::new(0, SignalSpec::new(44100, Channels::FRONT_LEFT)),
            })
        }

        fn supported_codecs() -> &'static [CodecDescriptor] {
            &[]
        }

        fn reset(&mut self) {}

        fn codec_params(&self) -> &CodecParameters {
            &self.params
        }

        fn decode(&mut self, _: &Packet) -> symphonia::core::errors::Result<AudioBufferRef<'_>> {
            Err(SymphoniaError::DecodeError("invalid main_data_begin"))
        }

        fn finalize(&mut self) -> FinalizeResult {
            FinalizeResult::default()
        }

        fn last_decoded(&self) -> AudioBufferRef<'_> {
            self.buffer.as_audio_buffer_ref()
        }
    }

    #[test]
    fn test_corrupt_packet_fails() {
        let mut decoder =
            CorruptDecoder::try_new(&CodecParameters::new(), &DecoderOptions::default()).unwrap();
        let mut packets = 0;
        let mut next_packet = || -> Result<Packet, SymphoniaError> {
            packets += 1;
            Ok(Packet::new_from_slice(0, 0, 1152, &[0xff; 16]))
        };

        let result = read_and_decode_next_packet(&mut next_packet, &mut decoder, 0);
        assert!(matches!(result, Err(SymphoniaError::DecodeError(_))));
        assert_eq!(1, packets);
    }

    #[test]
    fn test_end_of_stream() {
        let mut decoder =
            CorruptDecoder::try_new(&CodecParameters::new(), &DecoderOptions::default()).unwrap();
        let mut next_packet = || -> Result<Packet, SymphoniaError> {
            Err(SymphoniaError::IoError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "end of stream",
            )))
        };

        let result = read_and_decode_next_packet(&mut next_packet, &mut decoder, 0);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_decode_missing_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let result = decode_file(tempdir.path().join("nope.wav"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_decode_garbage_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("garbage.wav");
        fs::write(&path, b"this is not audio at all").unwrap();
        assert!(matches!(decode_file(&path), Err(Error::Decode { .. })));
    }
}
