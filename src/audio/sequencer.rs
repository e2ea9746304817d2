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
// Back-to-back fragment playback that's independent of any audio backend.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::AudioFragment;

/// Commands sent from the player thread to the output callback.
pub enum Command {
    /// Queue a fragment behind whatever is currently playing.
    Play(Voice),
    /// Drop everything that's queued or playing.
    Stop,
}

/// A fragment being played out of the sequencer.
pub struct Voice {
    samples: Arc<[f32]>,
    channels: usize,
    frame: usize,
}

impl Voice {
    pub fn new(fragment: &AudioFragment) -> Voice {
        Voice {
            samples: fragment.shared_samples(),
            channels: usize::from(fragment.format().channels.max(1)),
            frame: 0,
        }
    }

    fn total_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    fn is_finished(&self) -> bool {
        self.frame >= self.total_frames()
    }

    /// Copies frames into the interleaved output starting at the given output frame. Source
    /// channels are wrapped onto the output channels, so mono fragments play on every channel.
    /// Returns the number of frames written.
    fn write_into(
        &mut self,
        output: &mut [f32],
        output_channels: usize,
        start_frame: usize,
    ) -> usize {
        let mut written = 0;
        for out_frame in output.chunks_mut(output_channels).skip(start_frame) {
            if self.is_finished() {
                break;
            }
            let base = self.frame * self.channels;
            for (channel, sample) in out_frame.iter_mut().enumerate() {
                *sample = self.samples[base + channel % self.channels];
            }
            self.frame += 1;
            written += 1;
        }
        written
    }
}

/// Handle used to queue fragments on a sequencer owned by another thread.
#[derive(Clone)]
pub struct SequencerHandle {
    tx: Sender<Command>,
    frames_queued: Arc<AtomicU64>,
    frames_played: Arc<AtomicU64>,
    buffer_frames: Arc<AtomicU64>,
}

impl SequencerHandle {
    /// Queues the fragment to play after anything already queued.
    pub fn play(
        &self,
        fragment: &AudioFragment,
    ) -> Result<(), crossbeam_channel::SendError<Command>> {
        self.frames_queued
            .fetch_add(fragment.frames(), Ordering::Relaxed);
        self.tx.send(Command::Play(Voice::new(fragment)))
    }

    /// Stops playback and clears the queue.
    pub fn stop(&self) -> Result<(), crossbeam_channel::SendError<Command>> {
        self.tx.send(Command::Stop)?;
        // Whatever was still queued will never be played.
        self.frames_queued
            .store(self.frames_played(), Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of frames written to the output so far.
    pub fn frames_played(&self) -> u64 {
        self.frames_played.load(Ordering::Relaxed)
    }

    /// Returns true once every queued frame has been written to the output.
    pub fn is_drained(&self) -> bool {
        self.frames_played() >= self.frames_queued.load(Ordering::Relaxed)
    }

    /// Returns the size in frames of the last output buffer the sequencer filled.
    pub fn buffer_frames(&self) -> u64 {
        self.buffer_frames.load(Ordering::Relaxed)
    }
}

/// Plays queued fragments one after another with no gap between them.
pub struct Sequencer {
    rx: Receiver<Command>,
    queue: VecDeque<Voice>,
    channels: usize,
    frames_played: Arc<AtomicU64>,
    buffer_frames: Arc<AtomicU64>,
}

impl Sequencer {
    /// Creates a sequencer that writes the given number of interleaved output channels.
    pub fn new(channels: u16) -> (Sequencer, SequencerHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let frames_played = Arc::new(AtomicU64::new(0));
        let buffer_frames = Arc::new(AtomicU64::new(0));
        (
            Sequencer {
                rx,
                queue: VecDeque::new(),
                channels: usize::from(channels.max(1)),
                frames_played: frames_played.clone(),
                buffer_frames: buffer_frames.clone(),
            },
            SequencerHandle {
                tx,
                frames_queued: Arc::new(AtomicU64::new(0)),
                frames_played,
                buffer_frames,
            },
        )
    }

    /// Fills the interleaved output buffer. Anything not covered by a queued fragment is silence.
    pub fn fill(&mut self, output: &mut [f32]) {
        while let Ok(command) = self.rx.try_recv() {
            match command {
                Command::Play(voice) => self.queue.push_back(voice),
                Command::Stop => self.queue.clear(),
            }
        }

        output.fill(0.0);
        let total_frames = output.len() / self.channels;
        self.buffer_frames
            .store(total_frames as u64, Ordering::Relaxed);
        let mut frame = 0;
        while frame < total_frames {
            let Some(voice) = self.queue.front_mut() else {
                break;
            };
            frame += voice.write_into(output, self.channels, frame);
            if voice.is_finished() {
                self.queue.pop_front();
            }
        }
        self.frames_played.fetch_add(frame as u64, Ordering::Relaxed);
    }
}
