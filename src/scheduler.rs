use crate::types::{MAX_TEMPO, MIN_TEMPO};
use log::{debug, trace};
use std::time::{Duration, Instant};

/// Shortest gap between two playback steps before tempo scaling.
pub const MIN_STEP_MS: f64 = 300.0;

/// Identifies one armed timer. Stopping or re-arming invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pending {
    pub token: ScheduleToken,
    pub due: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Stopped,
    Playing {
        /// Composition index of the stroke last played.
        index: usize,
        pending: Option<Pending>,
    },
}

/// Cyclic playback over a composition of `len` strokes.
///
/// The scheduler only tracks position and the single armed timer; the
/// caller plays each step and arms the next one with `schedule`.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    next_token: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Stopped,
            next_token: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    /// Index of the stroke currently sounding, if playing.
    pub fn current(&self) -> Option<usize> {
        match self.state {
            PlaybackState::Playing { index, .. } => Some(index),
            PlaybackState::Stopped => None,
        }
    }

    /// Stopped → Playing at index 0. Returns the index to play, or `None`
    /// for an empty composition or when already playing.
    pub fn start(&mut self, len: usize) -> Option<usize> {
        if len == 0 || self.is_playing() {
            return None;
        }
        debug!("playback start ({} strokes)", len);
        self.state = PlaybackState::Playing {
            index: 0,
            pending: None,
        };
        Some(0)
    }

    /// Arm the timer for the step after the current one. Replaces any
    /// previously armed timer. Returns `None` when stopped.
    pub fn schedule(&mut self, delay: Duration, now: Instant) -> Option<ScheduleToken> {
        let token = ScheduleToken(self.next_token);
        match &mut self.state {
            PlaybackState::Stopped => None,
            PlaybackState::Playing { pending, .. } => {
                self.next_token += 1;
                *pending = Some(Pending {
                    token,
                    due: now + delay,
                });
                trace!("armed {:?} in {:?}", token, delay);
                Some(token)
            }
        }
    }

    /// When the armed timer is due.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PlaybackState::Playing {
                pending: Some(p), ..
            } => Some(p.due),
            _ => None,
        }
    }

    pub fn pending_token(&self) -> Option<ScheduleToken> {
        match self.state {
            PlaybackState::Playing {
                pending: Some(p), ..
            } => Some(p.token),
            _ => None,
        }
    }

    /// Consume the armed timer and advance. Returns the next index
    /// (wrapping after the last stroke), or `None` if `token` is stale, the
    /// timer is not due yet, or playback stopped.
    pub fn fire(&mut self, token: ScheduleToken, now: Instant, len: usize) -> Option<usize> {
        let PlaybackState::Playing { index, pending } = &mut self.state else {
            return None;
        };
        match *pending {
            Some(p) if p.token == token && now >= p.due && len > 0 => {
                *pending = None;
                *index = (*index + 1) % len;
                Some(*index)
            }
            _ => None,
        }
    }

    /// Playing → Stopped, dropping the armed timer. Returns whether
    /// playback was running.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.is_playing();
        if was_playing {
            debug!("playback stop");
        }
        self.state = PlaybackState::Stopped;
        was_playing
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Gap after a stroke of `duration_px`: max(300 ms, duration) / tempo.
/// The stroke length in pixels doubles as milliseconds.
pub fn step_delay(duration_px: f64, tempo: f64) -> Duration {
    let tempo = if tempo.is_finite() {
        tempo.clamp(MIN_TEMPO, MAX_TEMPO)
    } else {
        1.0
    };
    let base = if duration_px.is_finite() {
        duration_px.max(MIN_STEP_MS)
    } else {
        MIN_STEP_MS
    };
    Duration::from_micros((base / tempo * 1000.0).round() as u64)
}
