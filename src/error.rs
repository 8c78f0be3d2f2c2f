use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn an audio asset into PCM samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("audio asset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read audio asset")]
    Io(#[from] std::io::Error),
    #[error("unsupported audio asset: {0}")]
    Unsupported(String),
    #[error("no audio track found")]
    NoAudioTrack,
    #[error("decoder failure")]
    Codec(#[from] symphonia::core::errors::Error),
}

/// Failure reported by a playback transport.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no audio output device: {0}")]
    NoOutputDevice(String),
    #[error("failed to open {} for playback: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("no asset opened")]
    NotOpened,
}

#[derive(Debug, Error)]
#[error("failed to write WAV file {}", path.display())]
pub struct WavError {
    pub path: PathBuf,
    #[source]
    pub source: hound::Error,
}

/// Fatal to a single `load_file` attempt. The reader stays out of `Ready`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("load superseded by a newer load_file call")]
    Superseded,
}

/// Transport command rejected by the reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("no audio file loaded")]
    NotLoaded,
    #[error(transparent)]
    Player(#[from] PlayerError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("frame_size must be a power of two >= 2, got {0}")]
    FrameSize(usize),
    #[error("fft_bins must be within 1..={max}, got {bins}")]
    FftBins { bins: usize, max: usize },
    #[error("frame_delay_ms must be positive")]
    FrameDelay,
    #[error("log compression {name} must be positive, got {value}")]
    LogShape { name: &'static str, value: f32 },
}
