//! musicreader - frame-indexed audio analysis synchronised with playback.
//!
//! An audio file is decoded once into fixed-size frames. While a player runs,
//! a polling loop maps its position to a frame and publishes that frame's
//! amplitude, spectrum and waveform through [`playback::Signals`].

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use config::{Config, ReaderConfig};
pub use playback::{Reader, ReaderState};
