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
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, span, warn, Level};

use crate::audio::{decode_file, write_wav_file, AudioFormat, AudioFragment, Device};
use crate::error::Error;
use crate::fragments::FragmentResolver;
use crate::measures::{Composition, Measure};
use crate::playsync::CancelHandle;
use crate::util::{duration_minutes_seconds, filename_display};

/// The default time subtracted from each fragment's duration before the next one is started.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(50);

/// Tunables for playback and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Subtracted from each fragment's duration during playback.
    pub safety_margin: Duration,
    /// Trailing frames removed from every fragment except the last when rendering to a file.
    pub tail_trim_frames: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            safety_margin: DEFAULT_SAFETY_MARGIN,
            tail_trim_frames: 0,
        }
    }
}

/// Describes a rendered waltz file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    /// The number of fragments joined.
    pub fragments: usize,
    /// The number of frames written.
    pub frames: u64,
    /// The format of the written file.
    pub format: AudioFormat,
    /// The playing time of the written file.
    pub duration: Duration,
}

impl fmt::Display for RenderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fragments, {} frames, {} ({})",
            self.fragments,
            self.frames,
            self.format,
            duration_minutes_seconds(self.duration)
        )
    }
}

/// Plays or renders a sequence of measures.
pub struct WaltzRenderer<R: FragmentResolver> {
    resolver: R,
    device: Arc<dyn Device>,
    settings: RenderSettings,
}

impl<R: FragmentResolver> WaltzRenderer<R> {
    pub fn new(
        resolver: R,
        device: Arc<dyn Device>,
        settings: RenderSettings,
    ) -> WaltzRenderer<R> {
        WaltzRenderer {
            resolver,
            device,
            settings,
        }
    }

    /// Plays the composition on the device, blocking until the last measure has been played
    /// out.
    pub fn play_composition(
        &self,
        composition: &Composition,
        cancel: &CancelHandle,
    ) -> Result<(), Error> {
        self.play_measures(composition.measures(), cancel)
    }

    /// Plays the measures in order. Each measure is resolved just before it's started, and
    /// the next one is started once the previous one has played for its duration minus the
    /// safety margin. The last measure is waited out in full and the device drained. The
    /// first failure stops the device; later measures are never resolved.
    pub fn play_measures(&self, measures: &[Measure], cancel: &CancelHandle) -> Result<(), Error> {
        let span = span!(Level::INFO, "play measures");
        let _enter = span.enter();

        info!(
            device = self.device.to_string(),
            measures = measures.len(),
            "Playing waltz."
        );

        let mut expected: Option<AudioFormat> = None;
        let mut remaining = Duration::ZERO;
        for (index, measure) in measures.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(self.cancelled(index));
            }

            let fragment = self
                .start_measure(index, measure, &mut expected)
                .map_err(|e| self.aborted(index, measure, e))?;

            let wait = fragment.duration().saturating_sub(self.settings.safety_margin);
            remaining = fragment.duration() - wait;
            debug!(
                index,
                measure = measure.to_string(),
                wait = format!("{:?}", wait),
                "Started measure."
            );
            if cancel.wait_timeout(wait) {
                return Err(self.cancelled(index));
            }
        }

        if cancel.wait_timeout(remaining) {
            return Err(self.cancelled(measures.len().saturating_sub(1)));
        }
        self.device.drain();

        info!(measures = measures.len(), "Finished playing waltz.");
        Ok(())
    }

    /// Resolves the measure, checks its format against the first measure's and starts it.
    fn start_measure(
        &self,
        index: usize,
        measure: &Measure,
        expected: &mut Option<AudioFormat>,
    ) -> Result<AudioFragment, Error> {
        let fragment = self.resolver.resolve(measure)?;

        let format = fragment.format();
        match *expected {
            Some(expected) if expected != format => {
                return Err(Error::FormatMismatch {
                    index,
                    expected,
                    found: format,
                });
            }
            Some(_) => {}
            None => *expected = Some(format),
        }

        self.device.start(&fragment)?;
        Ok(fragment)
    }

    fn aborted(&self, index: usize, measure: &Measure, err: Error) -> Error {
        warn!(index, measure = measure.to_string(), err = %err, "Stopping playback.");
        self.device.stop();
        err
    }

    fn cancelled(&self, index: usize) -> Error {
        info!(index, "Playback cancelled, stopping device.");
        self.device.stop();
        Error::Cancelled
    }
}

/// Resolves every measure of the composition and writes them to a single WAV file.
pub fn render_composition<R: FragmentResolver + ?Sized, P: AsRef<Path>>(
    resolver: &R,
    composition: &Composition,
    destination: P,
    tail_trim_frames: u64,
) -> Result<RenderSummary, Error> {
    let span = span!(Level::INFO, "render composition");
    let _enter = span.enter();

    let fragments = composition
        .iter()
        .map(|measure| resolver.resolve(measure))
        .collect::<Result<Vec<AudioFragment>, Error>>()?;
    write_fragments(&fragments, tail_trim_frames, destination.as_ref())
}

/// Decodes the given files and writes them, in order, to a single WAV file.
pub fn render_to_file<S: AsRef<Path>, P: AsRef<Path>>(
    sources: &[S],
    destination: P,
    tail_trim_frames: u64,
) -> Result<RenderSummary, Error> {
    let span = span!(Level::INFO, "render files");
    let _enter = span.enter();

    if sources.is_empty() {
        return Err(Error::NothingToRender);
    }
    let fragments = sources
        .iter()
        .map(|source| {
            debug!(file = filename_display(source.as_ref()), "Decoding fragment.");
            decode_file(source)
        })
        .collect::<Result<Vec<AudioFragment>, Error>>()?;
    write_fragments(&fragments, tail_trim_frames, destination.as_ref())
}

fn write_fragments(
    fragments: &[AudioFragment],
    tail_trim_frames: u64,
    destination: &Path,
) -> Result<RenderSummary, Error> {
    let waltz = concatenate(fragments, tail_trim_frames)?;
    write_wav_file(&waltz, destination)?;

    let summary = RenderSummary {
        fragments: fragments.len(),
        frames: waltz.frames(),
        format: waltz.format(),
        duration: waltz.duration(),
    };
    info!(
        destination = destination.display().to_string(),
        fragments = summary.fragments,
        frames = summary.frames,
        format = %summary.format,
        "Rendered waltz."
    );
    Ok(summary)
}

/// Joins the fragments into one. All fragments must share the first fragment's format.
/// `tail_trim_frames` trailing frames are dropped from every fragment but the last; a fragment
/// shorter than the trim contributes nothing.
pub fn concatenate(
    fragments: &[AudioFragment],
    tail_trim_frames: u64,
) -> Result<AudioFragment, Error> {
    let (first, _) = fragments.split_first().ok_or(Error::NothingToRender)?;
    let format = first.format();
    let channels = usize::from(format.channels.max(1));
    let trim = usize::try_from(tail_trim_frames).unwrap_or(usize::MAX);

    let mut samples = Vec::with_capacity(fragments.iter().map(|f| f.samples().len()).sum());
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.format() != format {
            return Err(Error::FormatMismatch {
                index,
                expected: format,
                found: fragment.format(),
            });
        }

        let frames = fragment.samples().len() / channels;
        let keep = if index + 1 == fragments.len() {
            frames
        } else {
            frames.saturating_sub(trim)
        };
        samples.extend_from_slice(&fragment.samples()[..keep * channels]);
    }

    Ok(AudioFragment::new("waltz", format, samples))
}
