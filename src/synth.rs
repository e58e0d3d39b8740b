//! Oscillator + gain voices and a mono mixer.
//!
//! Every note is a fixed 0.5 s voice: the wave shape follows the stroke's
//! instrument and the gain ramps exponentially from the stroke's volume
//! down to 0.001. Voices finish on their own; the mixer drops them once
//! they are done.

use crate::types::{Instrument, NoteRequest, NOTE_SECONDS};
use crossbeam_channel::Receiver;
use log::{debug, trace};

/// Gain at the end of the envelope.
pub const RELEASE_GAIN: f64 = 0.001;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

// ─── Wave shapes over phase ∈ [0, 1) ────────────────────────────────────────

pub fn sine(phase: f64) -> f64 {
    (std::f64::consts::TAU * phase).sin()
}

pub fn square(phase: f64) -> f64 {
    if phase.rem_euclid(1.0) < 0.5 {
        1.0
    } else {
        -1.0
    }
}

pub fn sawtooth(phase: f64) -> f64 {
    let p = phase.rem_euclid(1.0);
    2.0 * (p - (p + 0.5).floor())
}

pub fn triangle(phase: f64) -> f64 {
    let p = phase.rem_euclid(1.0);
    1.0 - 4.0 * (p - 0.25 - (p - 0.25 + 0.5).floor()).abs()
}

pub fn waveform(instrument: Instrument, phase: f64) -> f64 {
    match instrument {
        Instrument::Sine => sine(phase),
        Instrument::Square => square(phase),
        Instrument::Sawtooth => sawtooth(phase),
        Instrument::Triangle => triangle(phase),
    }
}

// ─── Voice ──────────────────────────────────────────────────────────────────

/// One self-terminating note.
#[derive(Debug, Clone)]
pub struct Voice {
    instrument: Instrument,
    phase: f64,
    phase_step: f64,
    gain: f64,
    /// Per-sample gain multiplier of the exponential ramp.
    decay: f64,
    remaining: u64,
}

impl Voice {
    pub fn new(request: &NoteRequest, sample_rate: u32) -> Self {
        let sr = sample_rate.max(1) as f64;
        let total = (NOTE_SECONDS * sr).round() as u64;
        let volume = if request.volume.is_finite() {
            request.volume.clamp(0.0, 1.0)
        } else {
            0.0
        };

        // A ramp from 0 has no exponential shape; such voices stay silent.
        let decay = if volume > RELEASE_GAIN && total > 0 {
            (RELEASE_GAIN / volume).powf(1.0 / total as f64)
        } else {
            1.0
        };

        Self {
            instrument: request.instrument,
            phase: 0.0,
            phase_step: request.frequency_hz.max(0.0) / sr,
            gain: volume,
            decay,
            remaining: total,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Next sample, or 0.0 once finished.
    pub fn next_sample(&mut self) -> f64 {
        if self.remaining == 0 {
            return 0.0;
        }
        let out = self.gain * waveform(self.instrument, self.phase);
        self.phase = (self.phase + self.phase_step).fract();
        self.gain *= self.decay;
        self.remaining -= 1;
        out
    }
}

// ─── Mixer ──────────────────────────────────────────────────────────────────

/// Sums active voices into mono f32 output. Notes arrive on a channel so
/// the audio callback never blocks on the controller.
pub struct Mixer {
    rx: Option<Receiver<NoteRequest>>,
    voices: Vec<Voice>,
    sample_rate: u32,
    notes_started: u64,
}

impl Mixer {
    pub fn new(rx: Receiver<NoteRequest>, sample_rate: u32) -> Self {
        Self {
            rx: Some(rx),
            voices: Vec::new(),
            sample_rate,
            notes_started: 0,
        }
    }

    /// A mixer fed only through `trigger`.
    pub fn detached(sample_rate: u32) -> Self {
        Self {
            rx: None,
            voices: Vec::new(),
            sample_rate,
            notes_started: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn notes_started(&self) -> u64 {
        self.notes_started
    }

    pub fn trigger(&mut self, request: &NoteRequest) {
        trace!("voice start: {}", request);
        self.voices.push(Voice::new(request, self.sample_rate));
        self.notes_started += 1;
    }

    /// Pull pending note requests without blocking.
    pub fn drain_requests(&mut self) {
        let Some(rx) = self.rx.take() else {
            return;
        };
        while let Ok(req) = rx.try_recv() {
            self.trigger(&req);
        }
        self.rx = Some(rx);
    }

    /// Fill `out` with the mix of all voices, clamped to [-1, 1].
    pub fn fill(&mut self, out: &mut [f32]) {
        self.drain_requests();
        for sample in out.iter_mut() {
            let mut acc = 0.0f64;
            for voice in &mut self.voices {
                acc += voice.next_sample();
            }
            *sample = acc.clamp(-1.0, 1.0) as f32;
        }
        let before = self.voices.len();
        self.voices.retain(|v| !v.is_finished());
        if self.voices.len() != before {
            let active = self.voices.len();
            debug!("{} voice(s) finished, {} active", before - active, active);
        }
    }
}
