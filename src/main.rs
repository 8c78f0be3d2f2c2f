mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Sweep};
use musicreader::audio::decode::SymphoniaDecoder;
use musicreader::audio::features::FrameAnalysis;
use musicreader::audio::synth;
use musicreader::config::{self, ReaderConfig, DEFAULT_FFT_BINS};
use musicreader::playback::{ClockPlayer, Player, Reader, ReaderState, RodioPlayer};

const GENERATE_RATE: u32 = 44100;
const METER_BANDS: usize = 16;
const METER_WIDTH: usize = 20;
const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Some(ref out) = cli.generate {
        return generate(out, &cli);
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    let uri = input.to_string_lossy().into_owned();

    let mut reader_config = resolve_config(&cli);

    // Summary mode: decode and index only, no device needed
    if cli.summary {
        reader_config.play_on_load = false;
        let reader = Reader::new(
            reader_config,
            Box::new(SymphoniaDecoder),
            Arc::new(ClockPlayer::new()),
        )
        .context("Invalid reader configuration")?;
        reader
            .load_file(&uri)
            .with_context(|| format!("Failed to load {}", input.display()))?;
        let summary = reader.summary().context("No track loaded")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    log::info!("musicreader - frame-synchronised audio analysis");
    log::info!("Input: {}", input.display());
    log::info!(
        "Frames: {} samples, {} bins, every {}ms",
        reader_config.frame_size,
        reader_config.fft_bins,
        reader_config.frame_delay_ms
    );

    let autoplay = reader_config.play_on_load;
    let reader = Reader::new(reader_config, Box::new(SymphoniaDecoder), open_player(cli.silent))
        .context("Invalid reader configuration")?;

    log::info!("Decoding audio...");
    reader
        .load_file(&uri)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let summary = reader.summary().context("No track loaded")?;
    log::info!(
        "Total frames: {}, Duration: {:.1}s, {}Hz, {} channel(s)",
        summary.frame_count,
        summary.duration,
        summary.sample_rate,
        summary.channels
    );

    if !autoplay {
        println!("Loaded. Press Enter to play.");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        reader.play()?;
    }

    run_meter(&reader, summary.duration)?;

    log::info!("Done!");
    Ok(())
}

/// Load config: explicit --config path, or auto-detect musicreader.toml / global config.
/// Config values apply only where the CLI is at its default.
fn resolve_config(cli: &Cli) -> ReaderConfig {
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("musicreader.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("musicreader").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("musicreader").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut reader_config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg.reader
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                ReaderConfig::default()
            }
        },
        None => ReaderConfig::default(),
    };

    if cli.fps != 15 {
        reader_config.frame_delay_ms = cli::frame_delay_for_fps(cli.fps);
    }
    if cli.bins != DEFAULT_FFT_BINS {
        reader_config.fft_bins = cli.bins;
    }
    if cli.raw {
        reader_config.normalized = false;
    }
    if cli.no_autoplay {
        reader_config.play_on_load = false;
    }
    reader_config
}

fn open_player(silent: bool) -> Arc<dyn Player> {
    if silent {
        return Arc::new(ClockPlayer::new());
    }
    match RodioPlayer::new() {
        Ok(player) => Arc::new(player),
        Err(err) => {
            log::warn!("{}, following a silent clock instead", err);
            Arc::new(ClockPlayer::new())
        }
    }
}

fn generate(out: &Path, cli: &Cli) -> Result<()> {
    let samples = match cli.sweep {
        Sweep::Tone => synth::sine(cli.freq, 0.5, cli.duration, GENERATE_RATE),
        Sweep::Linear => {
            synth::linear_sweep(cli.duration, GENERATE_RATE, (200.0, 880.0), (0.2, 1.0))
        }
        Sweep::Exponential => {
            synth::exponential_sweep(cli.duration, GENERATE_RATE, (220.0, 880.0), (0.2, 1.0))
        }
    };
    synth::write_wav(out, &samples, GENERATE_RATE)?;
    log::info!(
        "Wrote {:?} signal ({:.1}s) to {}",
        cli.sweep,
        cli.duration,
        out.display()
    );
    Ok(())
}

fn run_meter(reader: &Reader, duration: f32) -> Result<()> {
    let pb = ProgressBar::new((duration * 1000.0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:30.cyan/blue} {msg}")?
            .progress_chars("=>-"),
    );

    let signals = reader.signals();
    let mut version = signals.version();
    loop {
        if let Some((latest, analysis)) = signals.wait_newer(version, Duration::from_millis(250)) {
            version = latest;
            pb.set_message(meter(&analysis));
        }
        pb.set_position(reader.position().as_millis() as u64);
        if reader.state() != ReaderState::Playing {
            break;
        }
    }

    pb.finish_with_message("Playback finished");
    Ok(())
}

fn meter(analysis: &FrameAnalysis) -> String {
    let filled = ((analysis.amplitude.clamp(0.0, 1.0)) * METER_WIDTH as f32).round() as usize;
    let level: String = (0..METER_WIDTH)
        .map(|i| if i < filled { '#' } else { '.' })
        .collect();

    let bands = coarse_bands(&analysis.spectrum, METER_BANDS);
    let scale = bands.iter().cloned().fold(1.0f32, f32::max);
    let bars: String = bands
        .iter()
        .map(|&v| {
            let idx = ((v / scale) * (LEVELS.len() - 1) as f32).round() as usize;
            LEVELS[idx.min(LEVELS.len() - 1)]
        })
        .collect();

    format!("{} {:.3} |{}|", level, analysis.amplitude, bars)
}

/// Average `spectrum` down to `count` bands.
fn coarse_bands(spectrum: &[f32], count: usize) -> Vec<f32> {
    if spectrum.is_empty() {
        return vec![0.0; count];
    }
    let per_band = spectrum.len().div_ceil(count).max(1);
    spectrum
        .chunks(per_band)
        .map(|band| band.iter().sum::<f32>() / band.len() as f32)
        .collect()
}
