use crate::canvas::{draw_composition, draw_grid, draw_segment, NullSurface, Status, Surface};
use crate::color::stroke_color;
use crate::keyboard::Shortcut;
use crate::pointer::PointerPhase;
use crate::recorder::StrokeRecorder;
use crate::scheduler::{step_delay, PlaybackScheduler};
use crate::theory::frequency_from_position;
use crate::types::*;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, trace};
use std::time::Instant;

/// Canvas height assumed when the surface reports none.
pub const FALLBACK_CANVAS_HEIGHT: f64 = 300.0;

/// Everything the controller reacts to. Pointer coordinates are already
/// canvas-local (see `pointer::PointerInput`).
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Pointer(PointerPhase, Point),
    /// A raw key from the keyboard, resolved through `Shortcut`.
    Key(String),
    SetInstrument(Instrument),
    SetScale(ScaleKind),
    SetRootNote(NoteName),
    SetVolume(f64),
    SetTempo(f64),
    TogglePlayback,
    Clear,
    Resize(CanvasSize),
    Shutdown,
}

/// Owns the session: selections, the stroke being drawn, the composition
/// and the playback timer. All mutation goes through `handle` and
/// `fire_due`, so drawing and playback never interleave.
pub struct Controller {
    settings: Settings,
    recorder: StrokeRecorder,
    composition: Composition,
    scheduler: PlaybackScheduler,
    canvas: CanvasSize,
    surface: Box<dyn Surface + Send>,
    note_txs: Vec<Sender<NoteRequest>>,
    last_note: Option<NoteRequest>,
    notes_played: u64,
}

impl Controller {
    pub fn new(settings: Settings, canvas: CanvasSize) -> Self {
        Self {
            settings,
            recorder: StrokeRecorder::new(),
            composition: Composition::new(),
            scheduler: PlaybackScheduler::new(),
            canvas,
            surface: Box::new(NullSurface),
            note_txs: Vec::new(),
            last_note: None,
            notes_played: 0,
        }
    }

    pub fn with_surface(mut self, mut surface: Box<dyn Surface + Send>) -> Self {
        surface.resize(self.canvas);
        self.surface = surface;
        self.redraw();
        self
    }

    /// Add an audio sink. Every triggered note is sent to each sink.
    pub fn with_note_sink(mut self, tx: Sender<NoteRequest>) -> Self {
        self.note_txs.push(tx);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn is_drawing(&self) -> bool {
        self.recorder.is_drawing()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    /// Apply one event. Returns false when the controller should shut down.
    pub fn handle(&mut self, event: AppEvent, now: Instant) -> bool {
        trace!("event: {:?}", event);
        match event {
            AppEvent::Pointer(phase, point) => self.on_pointer(phase, point),
            AppEvent::Key(key) => self.on_key(&key, now),
            AppEvent::SetInstrument(i) => {
                self.settings.instrument = i;
                self.refresh_status();
            }
            AppEvent::SetScale(s) => {
                self.settings.scale = s;
                self.refresh_status();
            }
            AppEvent::SetRootNote(n) => {
                self.settings.root_note = n;
                self.refresh_status();
            }
            AppEvent::SetVolume(v) => {
                self.settings.set_volume(v);
                self.refresh_status();
            }
            AppEvent::SetTempo(t) => {
                self.settings.set_tempo(t);
                self.refresh_status();
            }
            AppEvent::TogglePlayback => self.toggle_playback(now),
            AppEvent::Clear => self.clear(),
            AppEvent::Resize(size) => {
                self.canvas = size;
                self.surface.resize(size);
                self.redraw();
            }
            AppEvent::Shutdown => {
                self.stop_playback();
                return false;
            }
        }
        true
    }

    fn on_key(&mut self, key: &str, now: Instant) {
        let Some(shortcut) = Shortcut::from_key(key) else {
            trace!("unmapped key {:?}", key);
            return;
        };
        match shortcut {
            Shortcut::Instrument(i) => {
                debug!("instrument → {}", i);
                self.settings.instrument = i;
            }
            Shortcut::Scale(s) => {
                debug!("scale → {}", s);
                self.settings.scale = s;
            }
            Shortcut::RootNote(n) => {
                debug!("root → {}", n);
                self.settings.root_note = n;
            }
            Shortcut::TogglePlayback => self.toggle_playback(now),
        }
        self.refresh_status();
    }

    fn on_pointer(&mut self, phase: PointerPhase, point: Point) {
        if self.scheduler.is_playing() {
            return;
        }
        match phase {
            PointerPhase::Down => self.recorder.begin(point),
            PointerPhase::Move => {
                if let Some(segment) = self.recorder.extend(point) {
                    let s = &self.settings;
                    let color = stroke_color(s.instrument, s.scale, s.root_note);
                    draw_segment(self.surface.as_mut(), &segment, &color);
                }
            }
            PointerPhase::Up | PointerPhase::Leave => {
                if let Some(stroke) = self.recorder.finish(&self.settings) {
                    if let Some(y) = stroke.voicing_y() {
                        self.trigger(y, &stroke, None);
                    }
                    self.composition.push(stroke);
                    info!("Stroke {} added", self.composition.len());
                    self.refresh_status();
                }
            }
        }
    }

    fn toggle_playback(&mut self, now: Instant) {
        if self.scheduler.is_playing() {
            self.stop_playback();
        } else {
            self.start_playback(now);
        }
    }

    pub fn start_playback(&mut self, now: Instant) {
        if self.recorder.is_drawing() {
            debug!("playback requested mid-stroke; ignoring");
            return;
        }
        match self.scheduler.start(self.composition.len()) {
            Some(index) => {
                info!("Playback started ({} strokes)", self.composition.len());
                self.play_step(index, now);
            }
            None => debug!("nothing to play"),
        }
    }

    pub fn stop_playback(&mut self) {
        if self.scheduler.stop() {
            info!("Playback stopped after {} notes", self.notes_played);
            self.redraw();
        }
    }

    fn clear(&mut self) {
        if self.scheduler.is_playing() {
            debug!("clear ignored during playback");
            return;
        }
        self.composition.clear();
        info!("Composition cleared");
        draw_grid(self.surface.as_mut(), self.canvas);
        self.refresh_status();
    }

    /// Run the playback step whose timer is due, if any.
    pub fn fire_due(&mut self, now: Instant) {
        let Some(token) = self.scheduler.pending_token() else {
            return;
        };
        if let Some(index) = self.scheduler.fire(token, now, self.composition.len()) {
            self.play_step(index, now);
        }
    }

    fn play_step(&mut self, index: usize, now: Instant) {
        let Some(stroke) = self.composition.get(index).cloned() else {
            self.scheduler.stop();
            return;
        };
        if let Some(y) = stroke.voicing_y() {
            self.trigger(y, &stroke, Some(index));
        }
        self.set_status_only();
        draw_composition(self.surface.as_mut(), self.canvas, &self.composition, Some(index));

        let delay = step_delay(stroke.duration, self.settings.tempo());
        if self.scheduler.schedule(delay, now).is_some() {
            trace!("next step in {:?}", delay);
        }
    }

    fn trigger(&mut self, y: f64, stroke: &Stroke, stroke_index: Option<usize>) {
        let height = if self.canvas.height > 0.0 {
            self.canvas.height
        } else {
            FALLBACK_CANVAS_HEIGHT
        };
        let request = NoteRequest {
            frequency_hz: frequency_from_position(y, height, stroke.scale, stroke.root_note),
            instrument: stroke.instrument,
            volume: stroke.volume,
            stroke_index,
        };
        debug!("note {}", request);
        self.notes_played += 1;
        self.last_note = Some(request);
        self.note_txs.retain(|tx| tx.send(request).is_ok());
    }

    fn status(&self) -> Status {
        Status {
            settings: self.settings,
            strokes: self.composition.len(),
            playing: self.scheduler.current(),
            last_note: self.last_note,
        }
    }

    fn set_status_only(&mut self) {
        let status = self.status();
        self.surface.set_status(&status);
    }

    fn refresh_status(&mut self) {
        self.set_status_only();
        self.surface.present();
    }

    fn redraw(&mut self) {
        self.set_status_only();
        let highlight = self.scheduler.current();
        draw_composition(self.surface.as_mut(), self.canvas, &self.composition, highlight);
    }

    /// Process events until `Shutdown` or until every sender hangs up.
    /// Waits on the channel only until the next playback step or held-back
    /// frame is due.
    pub fn run(&mut self, rx: Receiver<AppEvent>) {
        info!("Controller running ({}×{} canvas)", self.canvas.width, self.canvas.height);
        loop {
            let event = match self.next_wakeup() {
                Some(deadline) => match rx.recv_deadline(deadline) {
                    Ok(e) => Some(e),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(e) => Some(e),
                    Err(_) => break,
                },
            };
            let now = Instant::now();
            if let Some(event) = event {
                if !self.handle(event, now) {
                    break;
                }
            }
            self.fire_due(now);
            self.surface.flush_pending(Instant::now());
        }
        self.stop_playback();
        if let Some(due) = self.surface.pending_until() {
            self.surface.flush_pending(due);
        }
        info!(
            "Controller shutting down: {} strokes, {} notes played",
            self.composition.len(),
            self.notes_played
        );
    }

    fn next_wakeup(&self) -> Option<Instant> {
        match (self.scheduler.deadline(), self.surface.pending_until()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};
    use std::time::Duration;

    const H: f64 = 400.0;

    fn controller() -> (Controller, Receiver<NoteRequest>) {
        let (tx, rx) = unbounded();
        let c = Controller::new(Settings::default(), CanvasSize::new(800.0, H)).with_note_sink(tx);
        (c, rx)
    }

    fn draw(c: &mut Controller, points: &[(f64, f64)], now: Instant) {
        let (first, rest) = points.split_first().unwrap();
        c.handle(AppEvent::Pointer(PointerPhase::Down, Point::new(first.0, first.1)), now);
        for &(x, y) in rest {
            c.handle(AppEvent::Pointer(PointerPhase::Move, Point::new(x, y)), now);
        }
        c.handle(AppEvent::Pointer(PointerPhase::Up, Point::new(0.0, 0.0)), now);
    }

    fn drain(rx: &Receiver<NoteRequest>) -> Vec<NoteRequest> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_release_previews_and_appends() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 100.0), (100.0, 100.0), (100.0, H)], t0);

        assert_eq!(c.composition().len(), 1);
        let stroke = c.composition().get(0).unwrap();
        assert_eq!(stroke.duration, 400.0);

        let notes = drain(&rx);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].stroke_index, None);
        // Last point is at the bottom: root note.
        assert!((notes[0].frequency_hz - 261.63).abs() < 1e-9);
    }

    #[test]
    fn test_up_without_down_adds_nothing() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        c.handle(AppEvent::Pointer(PointerPhase::Move, Point::new(1.0, 1.0)), t0);
        c.handle(AppEvent::Pointer(PointerPhase::Leave, Point::new(1.0, 1.0)), t0);
        assert!(c.composition().is_empty());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_leave_finishes_stroke() {
        let (mut c, _rx) = controller();
        let t0 = Instant::now();
        c.handle(AppEvent::Pointer(PointerPhase::Down, Point::new(10.0, 10.0)), t0);
        c.handle(AppEvent::Pointer(PointerPhase::Leave, Point::new(10.0, 10.0)), t0);
        assert_eq!(c.composition().len(), 1);
        assert!(!c.is_drawing());
    }

    #[test]
    fn test_keys_change_selection_for_next_stroke() {
        let (mut c, _rx) = controller();
        let t0 = Instant::now();
        for k in ["s", "2", "t"] {
            c.handle(AppEvent::Key(k.into()), t0);
        }
        draw(&mut c, &[(0.0, 0.0), (10.0, 0.0)], t0);
        let s = c.composition().get(0).unwrap();
        assert_eq!(s.instrument, Instrument::Square);
        assert_eq!(s.scale, ScaleKind::Minor);
        assert_eq!(s.root_note, NoteName::E);
        assert_eq!(s.color, stroke_color(Instrument::Square, ScaleKind::Minor, NoteName::E));
    }

    #[test]
    fn test_playback_requires_strokes() {
        let (mut c, rx) = controller();
        c.handle(AppEvent::TogglePlayback, Instant::now());
        assert!(!c.is_playing());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn test_playback_loops_in_order() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, H), (10.0, H)], t0);
        draw(&mut c, &[(0.0, 0.0), (10.0, 0.0)], t0);
        draw(&mut c, &[(0.0, H / 2.0), (10.0, H / 2.0)], t0);
        drain(&rx);

        c.handle(AppEvent::TogglePlayback, t0);
        let mut now = t0;
        for _ in 0..6 {
            now += Duration::from_millis(300);
            c.fire_due(now);
        }
        let order: Vec<_> = drain(&rx).iter().map(|n| n.stroke_index.unwrap()).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_stop_cancels_pending_step() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        for _ in 0..3 {
            draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        }
        drain(&rx);

        c.handle(AppEvent::TogglePlayback, t0);
        c.fire_due(t0 + Duration::from_millis(300));
        assert_eq!(drain(&rx).len(), 2);

        c.handle(AppEvent::TogglePlayback, t0 + Duration::from_millis(350));
        assert!(!c.is_playing());
        assert_eq!(c.scheduler().deadline(), None);
        c.fire_due(t0 + Duration::from_secs(10));
        assert!(drain(&rx).is_empty(), "no step may fire after stop");
    }

    #[test]
    fn test_tempo_scales_delay() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0); // 10px → 300ms floor
        draw(&mut c, &[(0.0, 50.0), (500.0, 50.0)], t0); // 500px
        drain(&rx);

        c.handle(AppEvent::SetTempo(2.0), t0);
        c.handle(AppEvent::TogglePlayback, t0);
        assert_eq!(c.scheduler().deadline(), Some(t0 + Duration::from_millis(150)));

        c.fire_due(t0 + Duration::from_millis(150));
        assert_eq!(c.scheduler().deadline(), Some(t0 + Duration::from_millis(400)));
        assert_eq!(drain(&rx).len(), 2);
    }

    #[test]
    fn test_drawing_ignored_while_playing() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        c.handle(AppEvent::TogglePlayback, t0);
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        assert_eq!(c.composition().len(), 1);
        assert!(!c.is_drawing());
        // preview + first playback step only
        assert_eq!(drain(&rx).len(), 2);
    }

    #[test]
    fn test_clear_ignored_while_playing() {
        let (mut c, _rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        c.handle(AppEvent::TogglePlayback, t0);
        c.handle(AppEvent::Clear, t0);
        assert_eq!(c.composition().len(), 1);

        c.handle(AppEvent::TogglePlayback, t0);
        c.handle(AppEvent::Clear, t0);
        assert!(c.composition().is_empty());
    }

    #[test]
    fn test_space_key_toggles() {
        let (mut c, _rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        c.handle(AppEvent::Key(" ".into()), t0);
        assert!(c.is_playing());
        c.handle(AppEvent::Key(" ".into()), t0);
        assert!(!c.is_playing());
    }

    #[test]
    fn test_playback_uses_current_canvas_height() {
        let (mut c, rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 200.0), (10.0, 200.0)], t0);
        drain(&rx);
        // y = 200 is the bottom of a 200px canvas.
        c.handle(AppEvent::Resize(CanvasSize::new(800.0, 200.0)), t0);
        c.handle(AppEvent::TogglePlayback, t0);
        let n = drain(&rx);
        assert!((n[0].frequency_hz - 261.63).abs() < 1e-9);
    }

    #[test]
    fn test_shutdown_stops() {
        let (mut c, _rx) = controller();
        let t0 = Instant::now();
        draw(&mut c, &[(0.0, 50.0), (10.0, 50.0)], t0);
        c.handle(AppEvent::TogglePlayback, t0);
        assert!(!c.handle(AppEvent::Shutdown, t0));
        assert!(!c.is_playing());
    }
}
