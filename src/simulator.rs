use crate::controller::AppEvent;
use crate::pointer::{CanvasBounds, MouseInput, PointerInput, PointerPhase, TouchInput};
use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use std::f64::consts::PI;
use std::thread;
use std::time::Duration;

/// Where the simulated canvas sits inside the simulated window.
const CANVAS_LEFT: f64 = 24.0;
const CANVAS_TOP: f64 = 96.0;

/// Replays scripted drawing sessions onto the controller's event channel
/// in real time, so the whole pipeline runs without a window.
pub struct Simulator {
    tx: Sender<AppEvent>,
    bounds: CanvasBounds,
    point_interval: Duration,
    /// How long to let playback run after the script; None holds forever.
    hold: Option<Duration>,
    strokes_drawn: usize,
}

#[derive(Debug, Clone, Copy)]
enum Modality {
    Mouse,
    Touch,
}

/// Shapes in unit canvas coordinates: (0,0) top-left, (1,1) bottom-right.
#[derive(Debug, Clone)]
enum Shape {
    Line {
        from: (f64, f64),
        to: (f64, f64),
        steps: usize,
    },
    Arc {
        center: (f64, f64),
        radius: f64,
        start_deg: f64,
        end_deg: f64,
        steps: usize,
    },
    Zigzag {
        from: (f64, f64),
        to: (f64, f64),
        teeth: usize,
        amplitude: f64,
    },
}

#[derive(Debug, Clone)]
enum Gesture {
    Hold { ms: u64 },
    Key(&'static str),
    Draw(Shape),
    Tempo(f64),
    Volume(f64),
    TogglePlayback,
}

/// Demo scripts accepted by `Simulator::run`.
pub const DEMOS: [&str; 2] = ["basic", "scales"];

impl Simulator {
    pub fn new(tx: Sender<AppEvent>, canvas: CanvasSize, hold_secs: u64) -> Self {
        Self {
            tx,
            bounds: CanvasBounds {
                left: CANVAS_LEFT,
                top: CANVAS_TOP,
                width: canvas.width,
                height: canvas.height,
            },
            point_interval: Duration::from_millis(8),
            hold: if hold_secs == 0 { None } else { Some(Duration::from_secs(hold_secs)) },
            strokes_drawn: 0,
        }
    }

    pub fn with_point_interval(mut self, interval: Duration) -> Self {
        self.point_interval = interval;
        self
    }

    /// Run a demo script, then hold and send `Shutdown`.
    /// Blocks the calling thread.
    pub fn run(&mut self, demo: &str) {
        let gestures = match demo {
            "scales" => scales_sequence(),
            "basic" => basic_sequence(),
            other => {
                warn!("Unknown demo {:?}, running \"basic\"", other);
                basic_sequence()
            }
        };
        info!("Simulator starting {:?} ({} gestures)...", demo, gestures.len());

        for gesture in &gestures {
            if !self.execute(gesture) {
                info!("Controller hung up; simulator stopping");
                return;
            }
        }

        match self.hold {
            Some(hold) => {
                info!("Script complete. Playing for {:?}...", hold);
                thread::sleep(hold);
                let _ = self.tx.send(AppEvent::Shutdown);
            }
            None => {
                info!("Script complete. Holding...");
                loop {
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }

    /// Returns false once the controller has gone away.
    fn execute(&mut self, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Hold { ms } => {
                thread::sleep(Duration::from_millis(*ms));
                true
            }
            Gesture::Key(k) => {
                info!("  key {:?}", k);
                self.send(AppEvent::Key(k.to_string()))
            }
            Gesture::Tempo(t) => {
                info!("  tempo {:.2}", t);
                self.send(AppEvent::SetTempo(*t))
            }
            Gesture::Volume(v) => {
                info!("  volume {:.2}", v);
                self.send(AppEvent::SetVolume(*v))
            }
            Gesture::TogglePlayback => {
                info!("  toggle playback");
                self.send(AppEvent::TogglePlayback)
            }
            Gesture::Draw(shape) => {
                let modality = if self.strokes_drawn % 2 == 0 {
                    Modality::Mouse
                } else {
                    Modality::Touch
                };
                self.strokes_drawn += 1;
                let points = shape_points(shape);
                info!("  draw {} ({} points, {:?})", shape_name(shape), points.len(), modality);
                self.draw(&points, modality)
            }
        }
    }

    fn draw(&self, unit_points: &[(f64, f64)], modality: Modality) -> bool {
        let mut last = None;
        for (i, &(u, v)) in unit_points.iter().enumerate() {
            let client_x = self.bounds.left + u * self.bounds.width;
            let client_y = self.bounds.top + v * self.bounds.height;
            let local = match modality {
                Modality::Mouse => MouseInput { client_x, client_y }.canvas_point(&self.bounds),
                Modality::Touch => TouchInput {
                    touches: vec![(client_x, client_y)],
                }
                .canvas_point(&self.bounds),
            };
            let Some(point) = local else { continue };
            let phase = if i == 0 { PointerPhase::Down } else { PointerPhase::Move };
            if !self.send(AppEvent::Pointer(phase, point)) {
                return false;
            }
            last = Some(point);
            thread::sleep(self.point_interval);
        }

        // A lifted finger reports no touches; the stroke ends where it was.
        let end = match modality {
            Modality::Mouse => last,
            Modality::Touch => TouchInput::default().canvas_point(&self.bounds).or(last),
        };
        match end {
            Some(p) => self.send(AppEvent::Pointer(PointerPhase::Up, p)),
            None => true,
        }
    }

    fn send(&self, event: AppEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

fn shape_name(shape: &Shape) -> &'static str {
    match shape {
        Shape::Line { .. } => "line",
        Shape::Arc { .. } => "arc",
        Shape::Zigzag { .. } => "zigzag",
    }
}

fn shape_points(shape: &Shape) -> Vec<(f64, f64)> {
    match shape {
        Shape::Line { from, to, steps } => {
            let n = (*steps).max(1);
            (0..=n)
                .map(|i| {
                    let t = smoothstep(i as f64 / n as f64);
                    (lerp(from.0, to.0, t), lerp(from.1, to.1, t))
                })
                .collect()
        }
        Shape::Arc { center, radius, start_deg, end_deg, steps } => {
            let n = (*steps).max(1);
            (0..=n)
                .map(|i| {
                    let deg = lerp(*start_deg, *end_deg, i as f64 / n as f64);
                    let rad = deg * PI / 180.0;
                    // Canvas aspect is 2:1; keep the arc round on screen.
                    (center.0 + radius * 0.5 * rad.cos(), center.1 - radius * rad.sin())
                })
                .collect()
        }
        Shape::Zigzag { from, to, teeth, amplitude } => {
            let n = (*teeth).max(1) * 2;
            (0..=n)
                .map(|i| {
                    let t = i as f64 / n as f64;
                    let offset = if i % 2 == 0 { 0.0 } else { *amplitude };
                    (lerp(from.0, to.0, t), lerp(from.1, to.1, t) - offset)
                })
                .collect()
        }
    }
}

/// Four instruments, one stroke each, then play.
fn basic_sequence() -> Vec<Gesture> {
    vec![
        Gesture::Hold { ms: 300 },
        Gesture::Volume(0.2),
        // Sine, major, C: a rising line
        Gesture::Key("a"),
        Gesture::Key("1"),
        Gesture::Key("q"),
        Gesture::Draw(Shape::Line { from: (0.05, 0.9), to: (0.3, 0.3), steps: 24 }),
        Gesture::Hold { ms: 400 },
        // Triangle: an arch over the middle
        Gesture::Key("f"),
        Gesture::Draw(Shape::Arc {
            center: (0.5, 0.7),
            radius: 0.4,
            start_deg: 180.0,
            end_deg: 0.0,
            steps: 32,
        }),
        Gesture::Hold { ms: 400 },
        // Square, G root: short zigzag high up
        Gesture::Key("s"),
        Gesture::Key("i"),
        Gesture::Draw(Shape::Zigzag {
            from: (0.7, 0.25),
            to: (0.85, 0.2),
            teeth: 3,
            amplitude: 0.05,
        }),
        Gesture::Hold { ms: 400 },
        // Sawtooth: a low dab
        Gesture::Key("d"),
        Gesture::Draw(Shape::Line { from: (0.9, 0.85), to: (0.95, 0.9), steps: 4 }),
        Gesture::Hold { ms: 600 },
        Gesture::TogglePlayback,
    ]
}

/// One stroke per scale at rising heights, faster tempo.
fn scales_sequence() -> Vec<Gesture> {
    let mut g = vec![Gesture::Hold { ms: 300 }, Gesture::Volume(0.15), Gesture::Key("a")];
    let keys = [("1", "q"), ("2", "e"), ("3", "t"), ("4", "p")];
    for (i, (scale_key, root_key)) in keys.iter().enumerate() {
        let x = 0.08 + i as f64 * 0.22;
        let y = 0.85 - i as f64 * 0.2;
        g.push(Gesture::Key(scale_key));
        g.push(Gesture::Key(root_key));
        g.push(Gesture::Draw(Shape::Line { from: (x, y), to: (x + 0.15, y - 0.05), steps: 12 }));
        g.push(Gesture::Hold { ms: 350 });
    }
    g.push(Gesture::Key("f"));
    g.push(Gesture::Draw(Shape::Zigzag {
        from: (0.1, 0.5),
        to: (0.9, 0.5),
        teeth: 6,
        amplitude: 0.1,
    }));
    g.push(Gesture::Tempo(1.5));
    g.push(Gesture::Hold { ms: 500 });
    g.push(Gesture::TogglePlayback);
    g
}

// ─── Math helpers ───────────────────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Smooth interpolation (ease in/out)
fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
