//! Deterministic stroke colors from (instrument, scale, root note).
//!
//! The instrument picks the base hue family, the scale nudges saturation,
//! lightness and hue, and the root note rotates hue around a circle-of-fifths
//! layout. The same triple always yields the same hex string.

use crate::types::*;

/// Per-instrument base color.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentBase {
    pub hue: f64,
    pub saturation_base: f64,
    pub lightness_base: f64,
}

/// Per-scale additive modifiers.
#[derive(Debug, Clone, Copy)]
pub struct ScaleModifier {
    pub saturation_mod: f64,
    pub lightness_mod: f64,
    pub hue_mod: f64,
}

/// Per-note hue rotation and brightness offset.
#[derive(Debug, Clone, Copy)]
pub struct NoteProperties {
    pub hue_shift: f64,
    pub brightness: f64,
}

pub fn instrument_base(instrument: Instrument) -> InstrumentBase {
    match instrument {
        // Blue
        Instrument::Sine => InstrumentBase {
            hue: 210.0,
            saturation_base: 0.85,
            lightness_base: 0.6,
        },
        // Red
        Instrument::Square => InstrumentBase {
            hue: 0.0,
            saturation_base: 0.8,
            lightness_base: 0.55,
        },
        // Magenta
        Instrument::Sawtooth => InstrumentBase {
            hue: 300.0,
            saturation_base: 0.75,
            lightness_base: 0.5,
        },
        // Green
        Instrument::Triangle => InstrumentBase {
            hue: 120.0,
            saturation_base: 0.7,
            lightness_base: 0.65,
        },
    }
}

pub fn scale_modifier(scale: ScaleKind) -> ScaleModifier {
    match scale {
        ScaleKind::Major => ScaleModifier {
            saturation_mod: 0.1,
            lightness_mod: 0.05,
            hue_mod: 15.0,
        },
        ScaleKind::Minor => ScaleModifier {
            saturation_mod: -0.05,
            lightness_mod: -0.05,
            hue_mod: -15.0,
        },
        ScaleKind::Pentatonic => ScaleModifier {
            saturation_mod: 0.15,
            lightness_mod: 0.1,
            hue_mod: 0.0,
        },
        ScaleKind::Chromatic => ScaleModifier {
            saturation_mod: -0.1,
            lightness_mod: 0.0,
            hue_mod: -5.0,
        },
    }
}

pub fn note_properties(note: NoteName) -> NoteProperties {
    let (hue_shift, brightness) = match note {
        NoteName::C => (0.0, 0.0),
        NoteName::G => (30.0, 0.02),
        NoteName::D => (60.0, 0.04),
        NoteName::A => (90.0, 0.06),
        NoteName::E => (120.0, 0.08),
        NoteName::B => (150.0, 0.1),
        NoteName::F => (-30.0, 0.02),
        NoteName::CSharp => (15.0, 0.01),
        NoteName::DSharp => (45.0, 0.03),
        NoteName::FSharp => (75.0, 0.05),
        NoteName::GSharp => (105.0, 0.07),
        NoteName::ASharp => (135.0, 0.09),
    };
    NoteProperties { hue_shift, brightness }
}

/// Hue in degrees [0, 360), saturation and lightness in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

pub const MIN_LIGHTNESS: f64 = 0.2;
pub const MAX_LIGHTNESS: f64 = 0.8;

/// Alpha byte appended to colors of strokes that are not playing.
pub const DIMMED_ALPHA_HEX: &str = "33";

pub fn stroke_hsl(instrument: Instrument, scale: ScaleKind, note: NoteName) -> Hsl {
    let base = instrument_base(instrument);
    let sm = scale_modifier(scale);
    let np = note_properties(note);

    let h = (base.hue + np.hue_shift + sm.hue_mod).rem_euclid(360.0);
    let s = (base.saturation_base + sm.saturation_mod).clamp(0.0, 1.0);
    let l = (base.lightness_base + sm.lightness_mod + np.brightness)
        .clamp(MIN_LIGHTNESS, MAX_LIGHTNESS);
    Hsl { h, s, l }
}

/// "#rrggbb" for a stroke drawn with these parameters.
pub fn stroke_color(instrument: Instrument, scale: ScaleKind, note: NoteName) -> String {
    hsl_to_hex(stroke_hsl(instrument, scale, note))
}

/// "#rrggbbaa" variant.
pub fn stroke_color_with_alpha(
    instrument: Instrument,
    scale: ScaleKind,
    note: NoteName,
    alpha: f64,
) -> String {
    hsla_to_hex(stroke_hsl(instrument, scale, note), alpha)
}

pub fn hsl_to_hex(hsl: Hsl) -> String {
    let (r, g, b) = hsl_to_rgb(hsl);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

pub fn hsla_to_hex(hsl: Hsl, alpha: f64) -> String {
    let (r, g, b) = hsl_to_rgb(hsl);
    let a = unit_to_byte(alpha);
    format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
}

/// Append the low-opacity alpha byte to a "#rrggbb" color.
/// Colors that already carry alpha are returned unchanged.
pub fn dimmed(hex: &str) -> String {
    if hex.len() == 7 {
        format!("{}{}", hex, DIMMED_ALPHA_HEX)
    } else {
        hex.to_string()
    }
}

/// Parse "#rrggbb" or "#rrggbbaa" (alpha defaults to 255).
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let a = if digits.len() == 8 { byte(6)? } else { 255 };
    Some((byte(0)?, byte(2)?, byte(4)?, a))
}

fn hsl_to_rgb(hsl: Hsl) -> (u8, u8, u8) {
    let h = hsl.h.rem_euclid(360.0);
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (unit_to_byte(r + m), unit_to_byte(g + m), unit_to_byte(b + m))
}

fn unit_to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
