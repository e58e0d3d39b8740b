use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Geometry ───────────────────────────────────────────────────────────────

/// A point in canvas-local pixel space. y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Pixel dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(768.0, 384.0)
    }
}

// ─── Instruments ────────────────────────────────────────────────────────────

/// Oscillator wave shape a stroke is voiced with.
/// Serializes as lowercase strings ("sine", "square", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [
        Instrument::Sine,
        Instrument::Square,
        Instrument::Sawtooth,
        Instrument::Triangle,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Instrument::Sine => "sine",
            Instrument::Square => "square",
            Instrument::Sawtooth => "sawtooth",
            Instrument::Triangle => "triangle",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Instrument::Sine => "Sine Wave",
            Instrument::Square => "Square Wave",
            Instrument::Sawtooth => "Sawtooth",
            Instrument::Triangle => "Triangle",
        }
    }

    pub fn shortcut(&self) -> char {
        match self {
            Instrument::Sine => 'a',
            Instrument::Square => 's',
            Instrument::Sawtooth => 'd',
            Instrument::Triangle => 'f',
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.id() == name)
    }

    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown instrument {:?}, using sine", name);
            Instrument::Sine
        })
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ─── Scales ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Major,
    Minor,
    Pentatonic,
    Chromatic,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 4] = [
        ScaleKind::Major,
        ScaleKind::Minor,
        ScaleKind::Pentatonic,
        ScaleKind::Chromatic,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::Minor => "minor",
            ScaleKind::Pentatonic => "pentatonic",
            ScaleKind::Chromatic => "chromatic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.id() == name)
    }

    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown scale {:?}, using major", name);
            ScaleKind::Major
        })
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ─── Note names ─────────────────────────────────────────────────────────────

/// The 12 chromatic pitch names a composition can be rooted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.name() == name)
    }

    /// Unknown names fall back to A, the 440 Hz reference pitch.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown root note {:?}, using A (440 Hz)", name);
            NoteName::A
        })
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Application selections ─────────────────────────────────────────────────

pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 1.0;
pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 2.0;

/// The user-controlled selections read when a stroke is finalized and at
/// each playback step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub instrument: Instrument,
    pub scale: ScaleKind,
    pub root_note: NoteName,
    volume: f64,
    tempo: f64,
}

impl Settings {
    pub fn new(
        instrument: Instrument,
        scale: ScaleKind,
        root_note: NoteName,
        volume: f64,
        tempo: f64,
    ) -> Self {
        let mut s = Self {
            instrument,
            scale,
            root_note,
            volume: 0.0,
            tempo: 1.0,
        };
        s.set_volume(volume);
        s.set_tempo(tempo);
        s
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = if volume.is_finite() {
            volume.clamp(MIN_VOLUME, MAX_VOLUME)
        } else {
            MIN_VOLUME
        };
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = if tempo.is_finite() {
            tempo.clamp(MIN_TEMPO, MAX_TEMPO)
        } else {
            1.0
        };
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Instrument::Sine, ScaleKind::Major, NoteName::C, 0.1, 1.0)
    }
}

// ─── Strokes ────────────────────────────────────────────────────────────────

/// One finished gesture plus the musical parameters active when it was
/// released. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub path: Vec<Point>,
    /// Path length rendered as text.
    pub note: String,
    /// Path length in pixels; drives the inter-stroke delay.
    pub duration: f64,
    pub instrument: Instrument,
    pub scale: ScaleKind,
    pub root_note: NoteName,
    pub volume: f64,
    /// Display color, fixed by (instrument, scale, root_note).
    pub color: String,
}

impl Stroke {
    /// Vertical coordinate that voices the stroke (its last point).
    pub fn voicing_y(&self) -> Option<f64> {
        self.path.last().map(|p| p.y)
    }
}

/// Ordered strokes of the current session.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    strokes: Vec<Stroke>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stroke> {
        self.strokes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }
}

// ─── Messages to audio sinks ────────────────────────────────────────────────

/// Fixed lifetime of every synthesized note.
pub const NOTE_SECONDS: f64 = 0.5;

/// A request for one short oscillator + gain note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRequest {
    pub frequency_hz: f64,
    pub instrument: Instrument,
    pub volume: f64,
    /// Composition index during playback; None for the release preview.
    pub stroke_index: Option<usize>,
}

impl fmt::Display for NoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idx = match self.stroke_index {
            Some(i) => format!("#{}", i),
            None => "preview".to_string(),
        };
        write!(
            f,
            "{:<8} {:>7.2} Hz  {:<8}  vol={:.2}",
            idx, self.frequency_hz, self.instrument, self.volume
        )
    }
}
