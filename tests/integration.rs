//! End-to-end tests for the drawing → playback pipeline.
//!
//! These run a real controller thread:
//!   events → Controller::run → NoteRequest channel → assertions
//!
//! Timing is wall-clock, so the assertions leave generous slack.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use stroke_synth::console_display::AsciiSurface;
use stroke_synth::controller::{AppEvent, Controller};
use stroke_synth::pointer::PointerPhase;
use stroke_synth::simulator::Simulator;
use stroke_synth::synth::Mixer;
use stroke_synth::types::*;

// ─── Helpers ───────────────────────────────────────────────────────────────

const WAIT: Duration = Duration::from_secs(2);

struct Harness {
    tx: Sender<AppEvent>,
    notes: Receiver<NoteRequest>,
    handle: JoinHandle<Controller>,
}

impl Harness {
    fn start(canvas: CanvasSize) -> Self {
        Self::start_with(Controller::new(Settings::default(), canvas))
    }

    fn start_with(controller: Controller) -> Self {
        let (tx, rx) = bounded::<AppEvent>(1024);
        let (note_tx, notes) = unbounded::<NoteRequest>();
        let mut controller = controller.with_note_sink(note_tx);
        let handle = thread::Builder::new()
            .name("test-controller".into())
            .spawn(move || {
                controller.run(rx);
                controller
            })
            .unwrap();
        Self { tx, notes, handle }
    }

    fn send(&self, event: AppEvent) {
        self.tx.send(event).unwrap();
    }

    /// Draw a polyline as one stroke.
    fn stroke(&self, points: &[(f64, f64)]) {
        for (i, &(x, y)) in points.iter().enumerate() {
            let phase = if i == 0 { PointerPhase::Down } else { PointerPhase::Move };
            self.send(AppEvent::Pointer(phase, Point::new(x, y)));
        }
        let &(x, y) = points.last().unwrap();
        self.send(AppEvent::Pointer(PointerPhase::Up, Point::new(x, y)));
    }

    fn next_note(&self) -> NoteRequest {
        self.notes.recv_timeout(WAIT).expect("expected a note")
    }

    fn shutdown(self) -> Controller {
        self.send(AppEvent::Shutdown);
        self.handle.join().unwrap()
    }
}

fn assert_hz(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.05,
        "expected {expected} Hz, got {actual} Hz"
    );
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// C major, 100 px canvas: y=95 → C4, y=50 → C5, y=5 → B5.
const C4: f64 = 261.63;
const C5: f64 = 523.26;
const B5: f64 = 987.77;

// ─── Tests ─────────────────────────────────────────────────────────────────

#[test]
fn test_preview_then_looped_playback_in_order() {
    let h = Harness::start(CanvasSize::new(200.0, 100.0));
    h.send(AppEvent::SetTempo(2.0));

    h.stroke(&[(10.0, 95.0), (20.0, 95.0)]);
    h.stroke(&[(30.0, 50.0), (40.0, 50.0)]);
    h.stroke(&[(50.0, 5.0), (60.0, 5.0)]);

    let previews: Vec<NoteRequest> = (0..3).map(|_| h.next_note()).collect();
    assert!(previews.iter().all(|n| n.stroke_index.is_none()));
    assert_hz(previews[0].frequency_hz, C4);
    assert_hz(previews[1].frequency_hz, C5);
    assert_hz(previews[2].frequency_hz, B5);

    h.send(AppEvent::TogglePlayback);
    let order: Vec<usize> = (0..7)
        .map(|_| h.next_note().stroke_index.expect("playback note"))
        .collect();
    assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);

    // Stop: at most one step already in flight, then silence.
    h.send(AppEvent::TogglePlayback);
    thread::sleep(Duration::from_millis(50));
    let _ = h.notes.try_iter().count();
    assert!(
        h.notes.recv_timeout(Duration::from_millis(500)).is_err(),
        "no notes after stop"
    );

    let controller = h.shutdown();
    assert!(!controller.is_playing());
    assert_eq!(controller.composition().len(), 3);
}

#[test]
fn test_step_delay_follows_stroke_length_and_tempo() {
    let h = Harness::start(CanvasSize::new(1000.0, 100.0));
    h.send(AppEvent::SetTempo(2.0));

    // 600 px → 300 ms at 2x; 10 px → minimum 300 ms / 2 = 150 ms.
    h.stroke(&[(0.0, 50.0), (600.0, 50.0)]);
    h.stroke(&[(0.0, 50.0), (10.0, 50.0)]);
    h.next_note();
    h.next_note();

    h.send(AppEvent::TogglePlayback);
    let mut stamps = Vec::new();
    for _ in 0..3 {
        let note = h.next_note();
        stamps.push((note.stroke_index, Instant::now()));
    }
    assert_eq!(stamps[0].0, Some(0));
    assert_eq!(stamps[1].0, Some(1));
    assert_eq!(stamps[2].0, Some(0));

    let long_gap = stamps[1].1 - stamps[0].1;
    let short_gap = stamps[2].1 - stamps[1].1;
    assert!(long_gap >= Duration::from_millis(270), "long gap {long_gap:?}");
    assert!(long_gap < Duration::from_millis(600), "long gap {long_gap:?}");
    assert!(short_gap >= Duration::from_millis(120), "short gap {short_gap:?}");
    assert!(short_gap < long_gap, "short {short_gap:?} vs long {long_gap:?}");

    h.shutdown();
}

#[test]
fn test_empty_composition_does_not_play() {
    let h = Harness::start(CanvasSize::new(200.0, 100.0));
    h.send(AppEvent::TogglePlayback);
    assert!(h.notes.recv_timeout(Duration::from_millis(400)).is_err());
    let controller = h.shutdown();
    assert!(!controller.is_playing());
}

#[test]
fn test_stroke_keeps_settings_from_when_it_was_drawn() {
    let h = Harness::start(CanvasSize::new(200.0, 100.0));
    h.send(AppEvent::Key("s".into()));
    h.send(AppEvent::SetVolume(0.4));
    h.stroke(&[(0.0, 50.0), (10.0, 50.0)]);
    let preview = h.next_note();
    assert_eq!(preview.instrument, Instrument::Square);
    assert!((preview.volume - 0.4).abs() < 1e-12);

    // Later selections do not touch the recorded stroke.
    h.send(AppEvent::Key("a".into()));
    h.send(AppEvent::SetVolume(0.9));
    h.send(AppEvent::TogglePlayback);
    let played = h.next_note();
    assert_eq!(played.instrument, Instrument::Square);
    assert!((played.volume - 0.4).abs() < 1e-12);

    let controller = h.shutdown();
    assert_eq!(controller.settings().instrument, Instrument::Sine);
    assert_eq!(controller.composition().get(0).map(|s| s.instrument), Some(Instrument::Square));
}

#[test]
fn test_mixer_renders_controller_notes() {
    let (tx, rx) = bounded::<AppEvent>(64);
    let (note_tx, note_rx) = unbounded::<NoteRequest>();
    let mut controller = Controller::new(Settings::default(), CanvasSize::new(200.0, 100.0))
        .with_note_sink(note_tx);
    let handle = thread::spawn(move || controller.run(rx));

    tx.send(AppEvent::SetVolume(0.5)).unwrap();
    tx.send(AppEvent::Pointer(PointerPhase::Down, Point::new(0.0, 50.0))).unwrap();
    tx.send(AppEvent::Pointer(PointerPhase::Move, Point::new(30.0, 50.0))).unwrap();
    tx.send(AppEvent::Pointer(PointerPhase::Leave, Point::new(30.0, 50.0))).unwrap();
    tx.send(AppEvent::Shutdown).unwrap();
    handle.join().unwrap();

    let mut mixer = Mixer::new(note_rx, 8000);
    let mut buf = vec![0.0f32; 800];
    mixer.fill(&mut buf);
    assert_eq!(mixer.notes_started(), 1);
    assert!(buf.iter().any(|s| s.abs() > 0.1));
    assert!(buf.iter().all(|s| s.abs() <= 0.5 + 1e-6));

    // Half a second of audio later the voice has decayed away.
    let mut tail = vec![0.0f32; 4000];
    mixer.fill(&mut tail);
    assert_eq!(mixer.active_voices(), 0);
}

#[test]
fn test_console_surface_shows_strokes() {
    let buf = SharedBuf::default();
    let surface = AsciiSurface::with_writer(40, 10, 0, Box::new(buf.clone()));
    let controller = Controller::new(Settings::default(), CanvasSize::new(200.0, 100.0))
        .with_surface(Box::new(surface));
    let h = Harness::start_with(controller);

    h.stroke(&[(10.0, 10.0), (190.0, 90.0)]);
    h.next_note();
    h.shutdown();

    let out = String::from_utf8_lossy(&buf.0.lock().unwrap()).to_string();
    assert!(out.contains('█'), "ink drawn to console");
    assert!(out.contains('·'), "grid drawn to console");
}

/// Canvas rows of the most recent frame, without the status header.
fn last_canvas(buf: &SharedBuf) -> String {
    let out = String::from_utf8_lossy(&buf.0.lock().unwrap()).to_string();
    let frame = out.rsplit("\x1b[2J").next().unwrap_or_default().to_string();
    match frame.split_once('╠') {
        Some((_, canvas)) => canvas.to_string(),
        None => frame.clone(),
    }
}

#[test]
fn test_console_catches_up_after_stop_within_refresh_limit() {
    let buf = SharedBuf::default();
    // 5 Hz: anything presented within 200 ms of the last frame is held back.
    let surface = AsciiSurface::with_writer(40, 10, 5, Box::new(buf.clone()));
    let controller = Controller::new(Settings::default(), CanvasSize::new(200.0, 100.0))
        .with_surface(Box::new(surface));
    let h = Harness::start_with(controller);

    h.stroke(&[(10.0, 20.0), (190.0, 20.0)]);
    h.stroke(&[(10.0, 80.0), (190.0, 80.0)]);
    h.next_note();
    h.next_note();

    // Let the refresh window pass so the first step's dimmed frame is written.
    thread::sleep(Duration::from_millis(250));
    h.send(AppEvent::TogglePlayback);
    assert_eq!(h.next_note().stroke_index, Some(0));
    h.send(AppEvent::TogglePlayback);

    // No further events: the loop itself must write the stopped frame.
    thread::sleep(Duration::from_millis(400));
    let canvas = last_canvas(&buf);
    assert!(canvas.contains('█'), "strokes still drawn");
    assert!(!canvas.contains('░'), "no dimmed strokes after stop");
    let out = String::from_utf8_lossy(&buf.0.lock().unwrap()).to_string();
    assert!(out.rsplit("\x1b[2J").next().unwrap_or_default().contains("stopped"));

    h.shutdown();
}

#[test]
fn test_simulator_drives_full_session() {
    let canvas = CanvasSize::new(400.0, 200.0);
    let (tx, rx) = bounded::<AppEvent>(4096);
    let (note_tx, notes) = unbounded::<NoteRequest>();
    let mut controller = Controller::new(Settings::default(), canvas).with_note_sink(note_tx);
    let ctrl = thread::spawn(move || {
        controller.run(rx);
        controller
    });

    let sim = thread::spawn(move || {
        Simulator::new(tx, canvas, 1)
            .with_point_interval(Duration::ZERO)
            .run("basic");
    });
    sim.join().unwrap();
    let controller = ctrl.join().unwrap();

    assert_eq!(controller.composition().len(), 4);
    let instruments: Vec<Instrument> =
        controller.composition().iter().map(|s| s.instrument).collect();
    assert_eq!(
        instruments,
        vec![Instrument::Sine, Instrument::Triangle, Instrument::Square, Instrument::Sawtooth]
    );

    let all: Vec<NoteRequest> = notes.try_iter().collect();
    let previews = all.iter().filter(|n| n.stroke_index.is_none()).count();
    let played: Vec<usize> = all.iter().filter_map(|n| n.stroke_index).collect();
    assert_eq!(previews, 4);
    assert!(played.len() >= 2, "playback ran during hold: {played:?}");
    assert_eq!(&played[..2], &[0, 1]);
    assert!(all.iter().all(|n| n.frequency_hz >= 20.0 && n.frequency_hz <= 2000.0));
}
