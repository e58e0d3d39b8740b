//! Session configuration: initial selections and canvas geometry.
//!
//! Loaded from an optional JSON file; the CLI overrides individual fields.
//! Unknown instrument / scale / note names resolve to defaults with a warning.

use crate::types::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instrument: String,
    pub scale: String,
    pub root_note: String,
    pub volume: f64,
    pub tempo: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Console refresh limit (Hz); 0 redraws on every change.
    pub display_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        let canvas = CanvasSize::default();
        Self {
            instrument: Instrument::Sine.id().to_string(),
            scale: ScaleKind::Major.id().to_string(),
            root_note: NoteName::C.name().to_string(),
            volume: 0.1,
            tempo: 1.0,
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            display_hz: 30,
        }
    }
}

impl Config {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                warn!("Could not read config file {:?}: {}; using defaults", path, e);
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(c) => {
                info!("Loaded config from {:?}", path);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to parse config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Settings::new(
            Instrument::from_name_or_default(&self.instrument),
            ScaleKind::from_name_or_default(&self.scale),
            NoteName::from_name_or_default(&self.root_note),
            self.volume,
            self.tempo,
        )
    }

    /// Non-positive dimensions fall back to the default canvas.
    pub fn canvas(&self) -> CanvasSize {
        let d = CanvasSize::default();
        let w = if self.canvas_width > 0.0 { self.canvas_width } else { d.width };
        let h = if self.canvas_height > 0.0 { self.canvas_height } else { d.height };
        CanvasSize::new(w, h)
    }
}
