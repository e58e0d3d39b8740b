use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam_channel::Receiver;
use log::{error, info};

use crate::synth::Mixer;
use crate::types::NoteRequest;

/// Live audio playback via cpal.
///
/// Holds the cpal `Stream` alive. Drop this to stop output.
/// Note requests arrive on the channel and are mixed inside the
/// realtime callback; the same mono signal goes to every channel.
pub struct AudioOutput {
    _stream: Stream,
    sample_rate: u32,
}

impl AudioOutput {
    /// Open the default output device and start streaming silence until
    /// the first note arrives.
    pub fn start(rx: Receiver<NoteRequest>) -> Result<Self, String> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| "No default audio output device found".to_string())?;

        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = device
            .default_output_config()
            .map_err(|e| format!("No supported output config: {e}"))?;

        let sample_rate = supported.sample_rate().0;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let channels = config.channels as usize;

        info!(
            "Output config: {}Hz  {} ch  {:?}",
            sample_rate, channels, format
        );

        let mut mixer = Mixer::new(rx, sample_rate);
        let mut mono: Vec<f32> = Vec::new();
        let err_fn = |e: cpal::StreamError| error!("Audio stream error: {e}");

        let stream = match format {
            SampleFormat::F32 => device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _| {
                        render(&mut mixer, &mut mono, data, channels, |s| s);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string())?,
            SampleFormat::I16 => device
                .build_output_stream(
                    &config,
                    move |data: &mut [i16], _| {
                        render(&mut mixer, &mut mono, data, channels, to_i16);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string())?,
            SampleFormat::U16 => device
                .build_output_stream(
                    &config,
                    move |data: &mut [u16], _| {
                        render(&mut mixer, &mut mono, data, channels, to_u16);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| e.to_string())?,
            fmt => {
                return Err(format!(
                    "Unsupported sample format {fmt:?}. Use an F32 or I16 device."
                ))
            }
        };

        stream.play().map_err(|e| e.to_string())?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Mix one callback's worth of frames and spread them across channels.
fn render<T: Copy>(
    mixer: &mut Mixer,
    mono: &mut Vec<f32>,
    data: &mut [T],
    channels: usize,
    convert: impl Fn(f32) -> T,
) {
    let channels = channels.max(1);
    let frames = data.len() / channels;
    mono.resize(frames, 0.0);
    mixer.fill(mono);
    for (frame, &s) in data.chunks_mut(channels).zip(mono.iter()) {
        let v = convert(s);
        frame.iter_mut().for_each(|out| *out = v);
    }
}

// ─── Per-format sample conversion ───────────────────────────────────────────

fn to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn to_u16(s: f32) -> u16 {
    // U16: 0 = -1.0, 32768 = 0.0, 65535 = +1.0
    ((s.clamp(-1.0, 1.0) * 32767.0) + 32768.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Instrument;

    #[test]
    fn test_conversions() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_u16(0.0), 32768);
        assert_eq!(to_u16(-1.0), 1);
        assert_eq!(to_u16(1.0), 65535);
    }

    #[test]
    fn test_render_duplicates_to_all_channels() {
        let mut mixer = Mixer::detached(8000);
        mixer.trigger(&NoteRequest {
            frequency_hz: 440.0,
            instrument: Instrument::Square,
            volume: 0.5,
            stroke_index: None,
        });
        let mut mono = Vec::new();
        let mut data = vec![0.0f32; 16];
        render(&mut mixer, &mut mono, &mut data, 2, |s| s);
        assert_eq!(mono.len(), 8);
        for frame in data.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(data.iter().any(|&s| s != 0.0));
    }
}
