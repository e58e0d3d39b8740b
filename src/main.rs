use stroke_synth::config::Config;
use stroke_synth::console_display::AsciiSurface;
use stroke_synth::controller::{AppEvent, Controller};
use stroke_synth::keyboard;
use stroke_synth::simulator::{self, Simulator};
use stroke_synth::synth::{Mixer, DEFAULT_SAMPLE_RATE};
use stroke_synth::types::*;
#[cfg(feature = "audio")]
use stroke_synth::audio_output;

use clap::Parser;
use crossbeam_channel::{bounded, unbounded, Receiver};
use log::{info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "stroke-synth")]
#[command(about = "Draw strokes on a canvas and play them back as a looped melody")]
struct Cli {
    /// JSON config file with initial selections and canvas size
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to --config and exit
    #[arg(long, requires = "config")]
    save_config: bool,

    /// Simulator demo script: "basic" or "scales". "none" disables it.
    /// Defaults to "basic", or "none" with --interactive.
    #[arg(long)]
    demo: Option<String>,

    /// Initial instrument: sine, square, sawtooth, triangle
    #[arg(long)]
    instrument: Option<String>,

    /// Initial scale: major, minor, pentatonic, chromatic
    #[arg(long)]
    scale: Option<String>,

    /// Initial root note (C, C#, D, ... B)
    #[arg(long)]
    root: Option<String>,

    /// Initial volume (0.0 - 1.0)
    #[arg(long)]
    volume: Option<f64>,

    /// Initial tempo multiplier (0.5 - 2.0)
    #[arg(long)]
    tempo: Option<f64>,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Render the canvas on the terminal
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long)]
    display_hz: Option<u32>,

    /// Console size in character cells (columns)
    #[arg(long, default_value_t = 64)]
    cols: usize,

    /// Console size in character cells (rows)
    #[arg(long, default_value_t = 16)]
    rows: usize,

    /// Disable the audio device even when built with the "audio" feature
    #[arg(long)]
    no_audio: bool,

    /// Read shortcut keys and commands from stdin
    #[arg(long)]
    interactive: bool,

    /// Seconds to keep playing after the demo script (0 = until quit)
    #[arg(long, default_value_t = 8)]
    hold_secs: u64,
}

impl Cli {
    fn demo(&self) -> &str {
        match &self.demo {
            Some(d) => d.as_str(),
            None if self.interactive => "none",
            None => "basic",
        }
    }

    fn apply(&self, mut config: Config) -> Config {
        if let Some(i) = &self.instrument {
            config.instrument = i.clone();
        }
        if let Some(s) = &self.scale {
            config.scale = s.clone();
        }
        if let Some(r) = &self.root {
            config.root_note = r.clone();
        }
        if let Some(v) = self.volume {
            config.volume = v;
        }
        if let Some(t) = self.tempo {
            config.tempo = t;
        }
        if let Some(w) = self.width {
            config.canvas_width = w;
        }
        if let Some(h) = self.height {
            config.canvas_height = h;
        }
        if let Some(hz) = self.display_hz {
            config.display_hz = hz;
        }
        config
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    let base = cli
        .config
        .as_deref()
        .and_then(Config::load)
        .unwrap_or_default();
    let config = cli.apply(base);

    if cli.save_config {
        if let Some(path) = &cli.config {
            if let Err(e) = config.save(path) {
                warn!("Could not save config to {:?}: {}", path, e);
                std::process::exit(1);
            }
        }
        return;
    }

    let settings = config.settings();
    let canvas = config.canvas();
    let audio_enabled = cfg!(feature = "audio") && !cli.no_audio;
    let demo = cli.demo().to_string();
    let demo_enabled = demo != "none";

    info!("═══════════════════════════════════════════════");
    info!("  STROKE SYNTH v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "  {} · {} · root {} · vol {:.2} · tempo {:.2}x",
        settings.instrument.display_name(),
        settings.scale.display_name(),
        settings.root_note,
        settings.volume(),
        settings.tempo()
    );
    info!("  Canvas: {}×{}", canvas.width, canvas.height);
    if demo_enabled { info!("  Input: simulator ({})", demo); }
    if cli.interactive { info!("  Input: keyboard (stdin)"); }
    if cli.console { info!("  UI: Console canvas {}×{}", cli.cols, cli.rows); }
    info!("  Audio: {}", if audio_enabled { "device" } else { "silent mixer" });
    info!("═══════════════════════════════════════════════");

    if demo_enabled && !simulator::DEMOS.contains(&demo.as_str()) {
        warn!("Unknown demo {:?}; known demos: {:?}", demo, simulator::DEMOS);
    }

    // Channel: inputs → controller
    let (event_tx, event_rx) = bounded::<AppEvent>(4096);

    // Channel: controller → audio
    let (note_tx, note_rx) = unbounded::<NoteRequest>();

    let mut controller = Controller::new(settings, canvas).with_note_sink(note_tx);
    if cli.console {
        controller = controller.with_surface(Box::new(AsciiSurface::new(
            cli.cols,
            cli.rows,
            config.display_hz,
        )));
    }

    // ─── Audio sink ─────────────────────────────────────────────────
    // The stream must outlive the controller loop below.
    #[cfg(feature = "audio")]
    let _audio = start_audio(audio_enabled, note_rx);
    #[cfg(not(feature = "audio"))]
    spawn_silent_mixer(note_rx);

    // ─── Input sources ──────────────────────────────────────────────
    if cli.interactive {
        if let Err(e) = keyboard::spawn_stdin_reader(event_tx.clone()) {
            warn!("Keyboard input unavailable: {}", e);
        }
    }

    if demo_enabled {
        let sim_tx = event_tx.clone();
        let hold = cli.hold_secs;
        let spawned = thread::Builder::new().name("simulator".into()).spawn(move || {
            Simulator::new(sim_tx, canvas, hold).run(&demo);
        });
        if let Err(e) = spawned {
            warn!("Could not start simulator: {}", e);
        }
    }

    if !demo_enabled && !cli.interactive {
        warn!("No input source (--demo none without --interactive); exiting");
        return;
    }

    // Only the input threads hold senders from here on.
    drop(event_tx);

    // ─── Controller on the main thread (returns on quit) ────────────
    controller.run(event_rx);
}

#[cfg(feature = "audio")]
fn start_audio(enabled: bool, note_rx: Receiver<NoteRequest>) -> Option<audio_output::AudioOutput> {
    if !enabled {
        spawn_silent_mixer(note_rx);
        return None;
    }
    match audio_output::AudioOutput::start(note_rx.clone()) {
        Ok(out) => {
            info!("Audio output at {} Hz", out.sample_rate());
            Some(out)
        }
        Err(e) => {
            warn!("Audio output failed ({}); continuing silently", e);
            spawn_silent_mixer(note_rx);
            None
        }
    }
}

/// Render notes in real time into a discarded buffer so voice lifecycles
/// still run (and log at debug level) without a device.
fn spawn_silent_mixer(note_rx: Receiver<NoteRequest>) {
    const BLOCK: usize = 480;
    let spawned = thread::Builder::new().name("silent-mixer".into()).spawn(move || {
        let mut mixer = Mixer::new(note_rx, DEFAULT_SAMPLE_RATE);
        let mut buf = vec![0.0f32; BLOCK];
        let block = Duration::from_secs_f64(BLOCK as f64 / DEFAULT_SAMPLE_RATE as f64);
        loop {
            mixer.fill(&mut buf);
            thread::sleep(block);
        }
    });
    if let Err(e) = spawned {
        warn!("Could not start silent mixer: {}", e);
    }
}
