pub mod canvas;
pub mod color;
pub mod config;
pub mod console_display;
pub mod controller;
pub mod keyboard;
pub mod pointer;
pub mod recorder;
pub mod scheduler;
pub mod simulator;
pub mod synth;
pub mod theory;
pub mod types;

#[cfg(feature = "audio")]
pub mod audio_output;
