use crate::types::Point;

/// Canvas placement in client (window) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasBounds {
    pub fn at_origin(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    fn to_local(&self, client_x: f64, client_y: f64) -> Point {
        Point::new(client_x - self.left, client_y - self.top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// Pointer left the canvas; ends a stroke like `Up`.
    Leave,
}

/// One input modality's way of turning a raw event into a canvas-local point.
pub trait PointerInput {
    fn canvas_point(&self, bounds: &CanvasBounds) -> Option<Point>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInput {
    pub client_x: f64,
    pub client_y: f64,
}

impl PointerInput for MouseInput {
    fn canvas_point(&self, bounds: &CanvasBounds) -> Option<Point> {
        Some(bounds.to_local(self.client_x, self.client_y))
    }
}

/// Active touches in client coordinates. Only the first touch draws.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchInput {
    pub touches: Vec<(f64, f64)>,
}

impl PointerInput for TouchInput {
    fn canvas_point(&self, bounds: &CanvasBounds) -> Option<Point> {
        self.touches
            .first()
            .map(|&(x, y)| bounds.to_local(x, y))
    }
}
