use crate::types::*;

/// Pitch range every mapped frequency is clamped to.
pub const MIN_FREQUENCY_HZ: f64 = 20.0;
pub const MAX_FREQUENCY_HZ: f64 = 2000.0;

/// Used when a root note name is not in the table.
pub const FALLBACK_BASE_HZ: f64 = 440.0;

/// The canvas spans this many octaves of the selected scale.
pub const OCTAVE_SPAN: i64 = 2;

/// Static description of a scale: semitone offsets within one octave.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub kind: ScaleKind,
    pub name: &'static str,
    pub intervals: &'static [u8],
    pub shortcut: char,
}

/// Static description of a root note (A4 = 440 Hz, equal temperament).
#[derive(Debug, Clone, Copy)]
pub struct Note {
    pub name: NoteName,
    pub frequency: f64,
    pub shortcut: char,
}

pub const SCALES: [Scale; 4] = [
    Scale {
        kind: ScaleKind::Major,
        name: "Major",
        intervals: &[0, 2, 4, 5, 7, 9, 11],
        shortcut: '1',
    },
    Scale {
        kind: ScaleKind::Minor,
        name: "Minor",
        intervals: &[0, 2, 3, 5, 7, 8, 10],
        shortcut: '2',
    },
    Scale {
        kind: ScaleKind::Pentatonic,
        name: "Pentatonic",
        intervals: &[0, 2, 4, 7, 9],
        shortcut: '3',
    },
    Scale {
        kind: ScaleKind::Chromatic,
        name: "Chromatic",
        intervals: &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        shortcut: '4',
    },
];

// Octave 4 frequencies; the keyboard row q..] maps C..B.
pub const NOTES: [Note; 12] = [
    Note { name: NoteName::C, frequency: 261.63, shortcut: 'q' },
    Note { name: NoteName::CSharp, frequency: 277.18, shortcut: 'w' },
    Note { name: NoteName::D, frequency: 293.66, shortcut: 'e' },
    Note { name: NoteName::DSharp, frequency: 311.13, shortcut: 'r' },
    Note { name: NoteName::E, frequency: 329.63, shortcut: 't' },
    Note { name: NoteName::F, frequency: 349.23, shortcut: 'y' },
    Note { name: NoteName::FSharp, frequency: 369.99, shortcut: 'u' },
    Note { name: NoteName::G, frequency: 392.0, shortcut: 'i' },
    Note { name: NoteName::GSharp, frequency: 415.3, shortcut: 'o' },
    Note { name: NoteName::A, frequency: 440.0, shortcut: 'p' },
    Note { name: NoteName::ASharp, frequency: 466.16, shortcut: '[' },
    Note { name: NoteName::B, frequency: 493.88, shortcut: ']' },
];

pub fn scale(kind: ScaleKind) -> &'static Scale {
    // SCALES is in ScaleKind declaration order.
    &SCALES[kind as usize]
}

pub fn note(name: NoteName) -> &'static Note {
    &NOTES[name as usize]
}

impl NoteName {
    pub fn frequency(&self) -> f64 {
        note(*self).frequency
    }

    pub fn shortcut(&self) -> char {
        note(*self).shortcut
    }
}

impl ScaleKind {
    pub fn intervals(&self) -> &'static [u8] {
        scale(*self).intervals
    }

    pub fn display_name(&self) -> &'static str {
        scale(*self).name
    }

    pub fn shortcut(&self) -> char {
        scale(*self).shortcut
    }
}

/// Tabulated frequency for a note name, 440 Hz if the name is unknown.
pub fn base_frequency(name: &str) -> f64 {
    NoteName::from_name(name)
        .map(|n| n.frequency())
        .unwrap_or(FALLBACK_BASE_HZ)
}

/// Map a vertical canvas coordinate to a frequency in Hz.
///
/// The canvas height is split into `2 * intervals.len()` bands, bottom to
/// top; each band is one scale degree above the root. y = 0 (top) lands on
/// the root two octaves up. Total over all inputs: out-of-canvas y and
/// degenerate heights still produce a value inside the clamp range.
pub fn frequency_from_position(
    y: f64,
    canvas_height: f64,
    scale: ScaleKind,
    root: NoteName,
) -> f64 {
    frequency_for_intervals(y, canvas_height, scale.intervals(), root.frequency())
}

pub fn frequency_for_intervals(y: f64, canvas_height: f64, intervals: &[u8], base_hz: f64) -> f64 {
    if intervals.is_empty() {
        return base_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
    }
    let relative = if canvas_height > 0.0 && canvas_height.is_finite() {
        1.0 - y / canvas_height
    } else {
        0.0
    };

    let n = intervals.len() as i64;
    // `as` saturates and maps NaN to 0.
    let scale_position = (relative * (n * OCTAVE_SPAN) as f64).floor() as i64;
    let octave = scale_position.div_euclid(n);
    let degree = scale_position.rem_euclid(n) as usize;

    let semitones = octave as f64 + intervals[degree] as f64 / 12.0;
    let hz = base_hz * 2.0_f64.powf(semitones);
    if hz.is_nan() {
        return MIN_FREQUENCY_HZ;
    }
    hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

// ─── Shortcut lookups ───────────────────────────────────────────────────────

/// Instrument keys compare case-insensitively.
pub fn instrument_by_shortcut(key: &str) -> Option<Instrument> {
    let c = single_char(key)?.to_ascii_lowercase();
    Instrument::ALL.iter().copied().find(|i| i.shortcut() == c)
}

/// Scale keys compare exactly.
pub fn scale_by_shortcut(key: &str) -> Option<ScaleKind> {
    let c = single_char(key)?;
    SCALES.iter().find(|s| s.shortcut == c).map(|s| s.kind)
}

/// Note keys compare case-insensitively.
pub fn note_by_shortcut(key: &str) -> Option<NoteName> {
    let c = single_char(key)?.to_ascii_lowercase();
    NOTES.iter().find(|n| n.shortcut == c).map(|n| n.name)
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}
