use crate::color::stroke_color;
use crate::types::*;
use log::{debug, trace};

/// A line piece to render as the pointer moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecorderState {
    Idle,
    Drawing { path: Vec<Point> },
}

/// Accumulates points while the pointer is held and turns them into a
/// `Stroke` on release.
#[derive(Debug, Clone)]
pub struct StrokeRecorder {
    state: RecorderState,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, RecorderState::Drawing { .. })
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Idle → Drawing with `point` as the first point of the path.
    /// A second `begin` without a release restarts the path.
    pub fn begin(&mut self, point: Point) {
        trace!("stroke begin at ({:.1}, {:.1})", point.x, point.y);
        self.state = RecorderState::Drawing { path: vec![point] };
    }

    /// Append a point. Returns the segment from the previous point, or
    /// `None` when idle.
    pub fn extend(&mut self, point: Point) -> Option<Segment> {
        match &mut self.state {
            RecorderState::Idle => None,
            RecorderState::Drawing { path } => {
                let segment = path.last().map(|&from| Segment { from, to: point });
                path.push(point);
                segment
            }
        }
    }

    /// Drawing → Idle. Builds the stroke from the selections current at
    /// release time. Empty paths produce nothing.
    pub fn finish(&mut self, settings: &Settings) -> Option<Stroke> {
        let state = std::mem::replace(&mut self.state, RecorderState::Idle);
        let path = match state {
            RecorderState::Idle => return None,
            RecorderState::Drawing { path } => path,
        };
        if path.is_empty() {
            return None;
        }

        let length = path_length(&path);
        debug!("stroke finished: {} points, length {:.1}px", path.len(), length);
        Some(Stroke {
            path,
            note: length.to_string(),
            duration: length,
            instrument: settings.instrument,
            scale: settings.scale,
            root_note: settings.root_note,
            volume: settings.volume(),
            color: stroke_color(settings.instrument, settings.scale, settings.root_note),
        })
    }
}

impl Default for StrokeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of Euclidean distances between consecutive points.
pub fn path_length(path: &[Point]) -> f64 {
    path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}
