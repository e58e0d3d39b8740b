use crate::controller::AppEvent;
use crate::theory::{instrument_by_shortcut, note_by_shortcut, scale_by_shortcut};
use crate::types::*;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Instrument(Instrument),
    Scale(ScaleKind),
    RootNote(NoteName),
    TogglePlayback,
}

impl Shortcut {
    /// Resolve a single key. Instruments win over scales, scales over notes.
    pub fn from_key(key: &str) -> Option<Self> {
        if let Some(i) = instrument_by_shortcut(key) {
            return Some(Shortcut::Instrument(i));
        }
        if let Some(s) = scale_by_shortcut(key) {
            return Some(Shortcut::Scale(s));
        }
        if let Some(n) = note_by_shortcut(key) {
            return Some(Shortcut::RootNote(n));
        }
        if key == " " || key.eq_ignore_ascii_case("space") {
            return Some(Shortcut::TogglePlayback);
        }
        None
    }
}

/// Translate one line typed on stdin into controller events.
///
/// Command words: `play` / `space` toggle playback, `clear`, `quit`.
/// `volume <0..1>` and `tempo <0.5..2>` set the sliders. Anything else is
/// read as a run of shortcut keys, one event per character.
pub fn parse_line(line: &str) -> Vec<AppEvent> {
    let trimmed = line.trim();
    let mut words = trimmed.split_whitespace();
    match words.next() {
        None => {
            // A bare space line toggles, like the space bar.
            if line.contains(' ') {
                vec![AppEvent::TogglePlayback]
            } else {
                Vec::new()
            }
        }
        Some("play") | Some("space") => vec![AppEvent::TogglePlayback],
        Some("clear") => vec![AppEvent::Clear],
        Some("quit") | Some("exit") => vec![AppEvent::Shutdown],
        Some(word @ ("volume" | "tempo")) => match words.next().map(str::parse::<f64>) {
            Some(Ok(v)) if word == "volume" => vec![AppEvent::SetVolume(v)],
            Some(Ok(v)) => vec![AppEvent::SetTempo(v)],
            _ => {
                warn!("usage: {} <number>", word);
                Vec::new()
            }
        },
        Some(_) => trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| AppEvent::Key(c.to_string()))
            .collect(),
    }
}

/// Read stdin on a background thread and forward parsed events.
/// The thread ends at EOF or when the controller hangs up.
pub fn spawn_stdin_reader(tx: Sender<AppEvent>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("stdin-keys".into()).spawn(move || {
        info!("Keyboard: type shortcut keys then Enter (a/s/d/f, 1-4, q..], play, clear, quit)");
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    break;
                }
            };
            for event in parse_line(&line) {
                debug!("key event: {:?}", event);
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
        debug!("stdin closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_resolution() {
        assert_eq!(Shortcut::from_key("s"), Some(Shortcut::Instrument(Instrument::Square)));
        assert_eq!(Shortcut::from_key("D"), Some(Shortcut::Instrument(Instrument::Sawtooth)));
        assert_eq!(Shortcut::from_key("2"), Some(Shortcut::Scale(ScaleKind::Minor)));
        assert_eq!(Shortcut::from_key("t"), Some(Shortcut::RootNote(NoteName::E)));
        assert_eq!(Shortcut::from_key("["), Some(Shortcut::RootNote(NoteName::ASharp)));
        assert_eq!(Shortcut::from_key(" "), Some(Shortcut::TogglePlayback));
        assert_eq!(Shortcut::from_key("z"), None);
        assert_eq!(Shortcut::from_key("9"), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("play"), vec![AppEvent::TogglePlayback]);
        assert_eq!(parse_line(" "), vec![AppEvent::TogglePlayback]);
        assert_eq!(parse_line("clear"), vec![AppEvent::Clear]);
        assert_eq!(parse_line("quit"), vec![AppEvent::Shutdown]);
        assert_eq!(parse_line("tempo 1.5"), vec![AppEvent::SetTempo(1.5)]);
        assert_eq!(parse_line("volume 0.3"), vec![AppEvent::SetVolume(0.3)]);
        assert!(parse_line("tempo fast").is_empty());
        assert!(parse_line("").is_empty());
    }

    #[test]
    fn test_parse_key_runs() {
        assert_eq!(
            parse_line("s2 t"),
            vec![
                AppEvent::Key("s".into()),
                AppEvent::Key("2".into()),
                AppEvent::Key("t".into()),
            ]
        );
    }
}
