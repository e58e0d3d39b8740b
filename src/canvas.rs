use crate::color::dimmed;
use crate::recorder::Segment;
use crate::types::*;
use std::time::Instant;

/// Horizontal grid lines split the canvas into pitch rows.
pub const GRID_ROWS: usize = 12;
/// Vertical grid lines split the canvas into time columns.
pub const GRID_COLUMNS: usize = 16;
pub const GRID_COLOR: &str = "#e5e7eb";
pub const INK_COLOR: &str = "#000000";
pub const GRID_LINE_WIDTH: f64 = 1.0;
pub const STROKE_LINE_WIDTH: f64 = 2.0;

/// Session summary a surface may show next to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub settings: Settings,
    pub strokes: usize,
    /// Index being played, None when stopped.
    pub playing: Option<usize>,
    pub last_note: Option<NoteRequest>,
}

/// A 2D drawable the controller renders into.
pub trait Surface {
    fn resize(&mut self, size: CanvasSize);
    fn clear(&mut self);
    fn set_stroke(&mut self, color: &str, width: f64);
    /// Stroke a polyline with the current color and width.
    fn line_path(&mut self, points: &[Point]);
    /// Hand the finished frame to the display. Default: nothing to flush.
    fn present(&mut self) {}
    fn set_status(&mut self, _status: &Status) {}
    /// Earliest time a frame held back by `present` may be written.
    fn pending_until(&self) -> Option<Instant> {
        None
    }
    /// Write the held-back frame once `now` reaches `pending_until`.
    fn flush_pending(&mut self, _now: Instant) {}
}

/// Stand-in when no drawing surface is available; every call is a no-op.
#[derive(Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn resize(&mut self, _size: CanvasSize) {}
    fn clear(&mut self) {}
    fn set_stroke(&mut self, _color: &str, _width: f64) {}
    fn line_path(&mut self, _points: &[Point]) {}
}

/// Clear and draw the reference grid, then leave the pen black at width 2.
pub fn draw_grid(surface: &mut dyn Surface, size: CanvasSize) {
    surface.clear();
    surface.set_stroke(GRID_COLOR, GRID_LINE_WIDTH);

    let row = size.height / GRID_ROWS as f64;
    let col = size.width / GRID_COLUMNS as f64;

    for i in 0..=GRID_ROWS {
        let y = i as f64 * row;
        surface.line_path(&[Point::new(0.0, y), Point::new(size.width, y)]);
    }
    for i in 0..=GRID_COLUMNS {
        let x = i as f64 * col;
        surface.line_path(&[Point::new(x, 0.0), Point::new(x, size.height)]);
    }

    surface.set_stroke(INK_COLOR, STROKE_LINE_WIDTH);
}

/// Grid plus every stroke. With `highlight`, only that stroke is drawn at
/// full opacity and the rest use the dimmed color.
pub fn draw_composition(
    surface: &mut dyn Surface,
    size: CanvasSize,
    composition: &Composition,
    highlight: Option<usize>,
) {
    draw_grid(surface, size);
    for (i, stroke) in composition.iter().enumerate() {
        let color = match highlight {
            Some(h) if h != i => dimmed(&stroke.color),
            _ => stroke.color.clone(),
        };
        surface.set_stroke(&color, STROKE_LINE_WIDTH);
        surface.line_path(&stroke.path);
    }
    surface.present();
}

/// Incremental piece of the stroke being drawn.
pub fn draw_segment(surface: &mut dyn Surface, segment: &Segment, color: &str) {
    surface.set_stroke(color, STROKE_LINE_WIDTH);
    surface.line_path(&[segment.from, segment.to]);
    surface.present();
}
