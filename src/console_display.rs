use crate::canvas::{Status, Surface, GRID_COLOR};
use crate::color::parse_hex;
use crate::types::*;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const GRID_GLYPH: char = '·';
const INK_GLYPH: char = '█';
const DIM_GLYPH: char = '░';
const GRID_RGB: (u8, u8, u8) = (90, 90, 110);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    rgb: (u8, u8, u8),
}

#[derive(Debug, Clone, Copy)]
struct Pen {
    glyph: char,
    rgb: (u8, u8, u8),
}

/// Renders the canvas as a character grid on a terminal.
///
/// Canvas pixels are scaled down to `cols × rows` cells; lines are
/// rasterized cell by cell. Dimmed colors (alpha below one half) use a
/// light shade glyph so the playing stroke stands out.
pub struct AsciiSurface {
    size: CanvasSize,
    cols: usize,
    rows: usize,
    cells: Vec<Option<Cell>>,
    pen: Pen,
    status: Option<Status>,
    min_interval: Duration,
    last_present: Option<Instant>,
    /// A frame was skipped by the refresh limit and still needs writing.
    dirty: bool,
    out: Box<dyn Write + Send>,
}

impl AsciiSurface {
    pub fn new(cols: usize, rows: usize, update_hz: u32) -> Self {
        Self::with_writer(cols, rows, update_hz, Box::new(io::stdout()))
    }

    pub fn with_writer(
        cols: usize,
        rows: usize,
        update_hz: u32,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let min_interval = if update_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / update_hz as f64)
        };
        Self {
            size: CanvasSize::default(),
            cols,
            rows,
            cells: vec![None; cols * rows],
            pen: Pen { glyph: INK_GLYPH, rgb: (0, 0, 0) },
            status: None,
            min_interval,
            last_present: None,
            dirty: false,
            out,
        }
    }

    /// Cell rows as plain glyphs, ' ' for empty cells.
    pub fn plain_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|c| c.map_or(' ', |c| c.glyph)).collect())
            .collect()
    }

    pub fn glyph_at(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells[row * self.cols + col].map(|c| c.glyph)
    }

    fn to_cell(&self, p: &Point) -> (i64, i64) {
        let fx = if self.size.width > 0.0 { p.x / self.size.width } else { 0.0 };
        let fy = if self.size.height > 0.0 { p.y / self.size.height } else { 0.0 };
        let c = (fx * self.cols as f64).floor() as i64;
        let r = (fy * self.rows as f64).floor() as i64;
        (c.clamp(0, self.cols as i64 - 1), r.clamp(0, self.rows as i64 - 1))
    }

    fn plot(&mut self, c: i64, r: i64) {
        let idx = r as usize * self.cols + c as usize;
        let pen = self.pen;
        // Grid never paints over ink.
        let covers_ink = matches!(self.cells[idx], Some(cell) if cell.glyph != GRID_GLYPH);
        if pen.glyph == GRID_GLYPH && covers_ink {
            return;
        }
        self.cells[idx] = Some(Cell { glyph: pen.glyph, rgb: pen.rgb });
    }

    /// Bresenham between two cells.
    fn line(&mut self, from: (i64, i64), to: (i64, i64)) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x, y);
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn write_frame(&mut self, now: Instant) {
        self.last_present = Some(now);
        self.dirty = false;
        let frame = self.render();
        let _ = self.out.write_all(frame.as_bytes());
        let _ = self.out.flush();
    }

    fn render(&self) -> String {
        let mut s = String::new();
        let width = self.cols;
        s.push_str("\x1b[2J\x1b[H");
        s.push_str(&format!("╔{}╗\n", "═".repeat(width)));
        if let Some(st) = &self.status {
            for line in status_lines(st) {
                s.push_str(&format!("║{}║\n", fit(&line, width)));
            }
            s.push_str(&format!("╠{}╣\n", "═".repeat(width)));
        }
        for row in self.cells.chunks(self.cols) {
            s.push('║');
            for cell in row {
                match cell {
                    Some(Cell { glyph, rgb: (r, g, b) }) => {
                        s.push_str(&format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, glyph));
                    }
                    None => s.push(' '),
                }
            }
            s.push_str("║\n");
        }
        s.push_str(&format!("╚{}╝\n", "═".repeat(width)));
        s
    }
}

impl Surface for AsciiSurface {
    fn resize(&mut self, size: CanvasSize) {
        self.size = size;
    }

    fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    fn set_stroke(&mut self, color: &str, _width: f64) {
        self.pen = if color == GRID_COLOR {
            Pen { glyph: GRID_GLYPH, rgb: GRID_RGB }
        } else {
            match parse_hex(color) {
                Some((r, g, b, a)) if a < 128 => Pen { glyph: DIM_GLYPH, rgb: (r, g, b) },
                Some((r, g, b, _)) => Pen { glyph: INK_GLYPH, rgb: (r, g, b) },
                None => Pen { glyph: '#', rgb: (200, 200, 200) },
            }
        };
    }

    fn line_path(&mut self, points: &[Point]) {
        match points {
            [] => {}
            [only] => {
                let (c, r) = self.to_cell(only);
                self.plot(c, r);
            }
            _ => {
                for w in points.windows(2) {
                    let a = self.to_cell(&w[0]);
                    let b = self.to_cell(&w[1]);
                    self.line(a, b);
                }
            }
        }
    }

    fn present(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_present {
            if now.duration_since(last) < self.min_interval {
                self.dirty = true;
                return;
            }
        }
        self.write_frame(now);
    }

    fn pending_until(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        self.last_present.map(|last| last + self.min_interval)
    }

    fn flush_pending(&mut self, now: Instant) {
        match self.pending_until() {
            Some(due) if now >= due => self.write_frame(now),
            _ => {}
        }
    }

    fn set_status(&mut self, status: &Status) {
        self.status = Some(status.clone());
    }
}

fn status_lines(st: &Status) -> Vec<String> {
    let s = &st.settings;
    let playing = match st.playing {
        Some(i) => format!("▶ playing #{}", i),
        None => "■ stopped".to_string(),
    };
    let last = match &st.last_note {
        Some(n) => format!("{:.1} Hz ({})", n.frequency_hz, hz_to_note_name(n.frequency_hz)),
        None => "---".to_string(),
    };
    vec![
        format!(
            " {} [{}]  {} [{}]  root {} [{}]",
            s.instrument.display_name(),
            s.instrument.shortcut(),
            s.scale.display_name(),
            s.scale.shortcut(),
            s.root_note,
            s.root_note.shortcut(),
        ),
        format!(
            " vol {} {:>3.0}%  tempo {} {:.2}x",
            make_bar(s.volume() as f32, 10),
            s.volume() * 100.0,
            make_bar(((s.tempo() - MIN_TEMPO) / (MAX_TEMPO - MIN_TEMPO)) as f32, 10),
            s.tempo(),
        ),
        format!(" strokes: {}  {}  last: {}", st.strokes, playing, last),
    ]
}

/// Pad or cut to exactly `width` characters.
fn fit(line: &str, width: usize) -> String {
    let mut s: String = line.chars().take(width).collect();
    while s.chars().count() < width {
        s.push(' ');
    }
    s
}

fn make_bar(val: f32, width: usize) -> String {
    let filled = (val.clamp(0.0, 1.0) * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn hz_to_note_name(hz: f64) -> String {
    if hz < 20.0 {
        return "---".to_string();
    }
    let midi = 69.0 + 12.0 * (hz / 440.0).log2();
    let note_num = midi.round() as i32;
    let cents = ((midi - note_num as f64) * 100.0).round() as i32;

    let name = NoteName::ALL[note_num.rem_euclid(12) as usize];
    let octave = note_num.div_euclid(12) - 1;

    if cents == 0 {
        format!("{}{}", name, octave)
    } else if cents > 0 {
        format!("{}{}+{}", name, octave, cents)
    } else {
        format!("{}{}{}", name, octave, cents)
    }
}
