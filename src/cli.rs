use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "musicreader", about = "Play an audio file with a live amplitude and spectrum meter")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Config file (defaults to ./musicreader.toml or the global config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analysis refresh rate (15, 30 or 60)
    #[arg(long, default_value_t = 15)]
    pub fps: u32,

    /// Number of spectrum bins to publish
    #[arg(long, default_value_t = 64)]
    pub bins: usize,

    /// Publish raw FFT magnitudes (no peak normalisation or log shaping)
    #[arg(long)]
    pub raw: bool,

    /// Load only; wait for Enter before playing
    #[arg(long)]
    pub no_autoplay: bool,

    /// Follow a wall clock instead of an audio device
    #[arg(long)]
    pub silent: bool,

    /// Print the track summary as JSON and exit
    #[arg(long)]
    pub summary: bool,

    /// Write a synthetic test signal to this WAV file and exit
    #[arg(long, value_name = "OUT.wav")]
    pub generate: Option<PathBuf>,

    /// Signal shape for --generate
    #[arg(long, value_enum, default_value_t = Sweep::Linear)]
    pub sweep: Sweep,

    /// Length of the generated signal in seconds
    #[arg(long, default_value_t = 5.0)]
    pub duration: f32,

    /// Tone frequency for --sweep tone
    #[arg(long, default_value_t = 440.0)]
    pub freq: f32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sweep {
    Tone,
    Linear,
    Exponential,
}

/// Frame delay for a refresh rate, matching the documented 16/32/64ms steps.
pub fn frame_delay_for_fps(fps: u32) -> u64 {
    match fps {
        0..=15 => 64,
        16..=30 => 32,
        _ => 16,
    }
}
