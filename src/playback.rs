// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

//! Playback sessions against the shared output device.
//!
//! Playback is best-effort feedback: [`PlaybackEngine::play`] never fails. Anything that
//! prevents a sound from starting yields a session that is already stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::audio::{self, mixer::ActiveSource, Device};
use crate::playsync::CancelHandle;
use crate::samples::{NotReady, SampleLibrary};

/// How a sample should be played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayOptions {
    /// Where in the sample to start.
    pub offset: Duration,
    /// Stop after this much playing time. None plays the whole sample, or forever when
    /// looping.
    pub duration: Option<Duration>,
    /// Restart the sample when it runs out.
    pub looping: bool,
}

/// Whether a session is still producing sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Playing,
    Stopped,
}

#[derive(Debug)]
struct SessionHandle {
    cancel_handle: CancelHandle,
    is_finished: Arc<AtomicBool>,
}

/// One sound instance on the output device.
#[derive(Debug)]
pub struct PlaybackSession {
    id: u64,
    sample_index: usize,
    started_at: Instant,
    handle: Option<SessionHandle>,
}

impl PlaybackSession {
    /// A session that never started.
    fn noop(sample_index: usize) -> PlaybackSession {
        PlaybackSession {
            id: 0,
            sample_index,
            started_at: Instant::now(),
            handle: None,
        }
    }

    /// Returns the session ID, shared with the mixer source. 0 for a session that never
    /// reached the device.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the catalog index being played.
    pub fn sample_index(&self) -> usize {
        self.sample_index
    }

    /// Returns the current state. A session is stopped once it was stopped explicitly or
    /// once it played to its end.
    pub fn state(&self) -> SessionState {
        match &self.handle {
            Some(handle)
                if !handle.cancel_handle.is_cancelled()
                    && !handle.is_finished.load(Ordering::Acquire) =>
            {
                SessionState::Playing
            }
            _ => SessionState::Stopped,
        }
    }

    /// Returns true while the session is playing.
    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }
}

/// Starts and stops sessions on the shared output device.
pub struct PlaybackEngine {
    library: Arc<SampleLibrary>,
    device: Arc<dyn Device>,
}

impl PlaybackEngine {
    /// Creates a new playback engine.
    pub fn new(library: Arc<SampleLibrary>, device: Arc<dyn Device>) -> PlaybackEngine {
        PlaybackEngine { library, device }
    }

    /// Plays the whole sample at the given index once.
    pub fn play(&self, index: usize) -> PlaybackSession {
        self.play_with(index, PlayOptions::default())
    }

    /// Plays the sample at the given index. Returns immediately; the sound renders on the
    /// device's own clock.
    pub fn play_with(&self, index: usize, options: PlayOptions) -> PlaybackSession {
        let buffer = match self.library.get(index) {
            Ok(buffer) => buffer,
            Err(e @ NotReady::OutOfBounds { .. }) => {
                warn!(index, error = %e, "Ignoring play request");
                return PlaybackSession::noop(index);
            }
            Err(e) => {
                debug!(index, error = %e, "Sample not ready, skipping playback");
                return PlaybackSession::noop(index);
            }
        };

        let rate = buffer.sample_rate() as f64;
        let position = (options.offset.as_secs_f64() * rate).round() as usize;
        let remaining_frames = options
            .duration
            .map(|duration| (duration.as_secs_f64() * rate).round() as u64);

        let id = audio::next_source_id();
        let cancel_handle = CancelHandle::new();
        let is_finished = Arc::new(AtomicBool::new(false));
        let source = ActiveSource {
            id,
            sample_index: index,
            buffer,
            position,
            remaining_frames,
            looping: options.looping,
            is_finished: is_finished.clone(),
            cancel_handle: cancel_handle.clone(),
        };

        if let Err(e) = self.device.add_source(source) {
            error!(index, error = %e, "Failed to hand sample to the output device");
            return PlaybackSession::noop(index);
        }

        debug!(
            index,
            session = id,
            offset_ms = options.offset.as_millis(),
            looping = options.looping,
            "Session started"
        );
        PlaybackSession {
            id,
            sample_index: index,
            started_at: Instant::now(),
            handle: Some(SessionHandle {
                cancel_handle,
                is_finished,
            }),
        }
    }

    /// Stops the session and releases its handle. Stopping a stopped session does nothing.
    pub fn stop(&self, session: &mut PlaybackSession) {
        let Some(handle) = session.handle.take() else {
            return;
        };

        if handle.cancel_handle.cancel() {
            debug!(
                index = session.sample_index,
                session = session.id,
                played_ms = session.started_at.elapsed().as_millis(),
                "Session stopped"
            );
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("device", &self.device.to_string())
            .field("library", &self.library)
            .finish()
    }
}
