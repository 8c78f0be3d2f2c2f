use rayon::prelude::*;

use super::features::{FrameAnalysis, TrackSummary};
use super::fft::FftKernel;
use super::frames::FrameIndex;
use super::spectrum::SpectralShaper;
use crate::config::ReaderConfig;

/// Per-tick frame analysis with reusable scratch buffers.
pub struct FrameAnalyzer {
    kernel: FftKernel,
    shaper: SpectralShaper,
    bins: usize,
    normalize_frame: bool,
    scratch: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl FrameAnalyzer {
    pub fn new(config: &ReaderConfig) -> Self {
        let kernel = FftKernel::new(config.frame_size);
        let half = kernel.bins();
        Self {
            kernel,
            shaper: SpectralShaper::new(config.spectrum_mode(), config.log_shape()),
            bins: config.fft_bins.min(half),
            normalize_frame: config.normalized,
            scratch: vec![0.0; config.frame_size],
            magnitudes: vec![0.0; half],
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn frame_size(&self) -> usize {
        self.kernel.size()
    }

    pub fn silence(&self) -> FrameAnalysis {
        FrameAnalysis::silence(self.bins, self.kernel.size())
    }

    /// Amplitude and shaped spectrum for frame `index` holding `raw` samples.
    pub fn analyze(&mut self, index: usize, raw: &[f32]) -> FrameAnalysis {
        let input: &[f32] = if self.normalize_frame {
            peak_normalize(raw, &mut self.scratch);
            &self.scratch[..raw.len().min(self.scratch.len())]
        } else {
            raw
        };

        let amplitude = rms(input);

        // Shape over the full half-spectrum so normalization sees the true peak,
        // then truncate.
        self.kernel.magnitudes(input, &mut self.magnitudes);
        self.shaper.apply(&mut self.magnitudes);

        FrameAnalysis {
            frame: Some(index),
            amplitude,
            spectrum: self.magnitudes[..self.bins].to_vec(),
            waveform: raw.to_vec(),
        }
    }
}

/// Root-mean-square; empty input is 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Scale `input` by its largest absolute sample into `out`. An all-zero frame
/// divides by 1.
pub fn peak_normalize(input: &[f32], out: &mut [f32]) {
    let peak = input.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    let divisor = if peak > 0.0 { peak } else { 1.0 };
    for (o, s) in out.iter_mut().zip(input) {
        *o = s / divisor;
    }
}

pub fn summarize(
    frames: &FrameIndex,
    sample_rate: u32,
    channels: usize,
    total_samples: usize,
) -> TrackSummary {
    let (peak_amplitude, peak_rms) = frames
        .samples()
        .par_chunks_exact(frames.frame_size().max(1))
        .map(|frame| {
            let peak = frame.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
            (peak, rms(frame))
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1.max(b.1)));

    let duration = if sample_rate > 0 {
        total_samples as f32 / sample_rate as f32
    } else {
        0.0
    };

    log::info!(
        "Track: {} frames, {:.1}s, peak_amp={:.4}, peak_rms={:.4}",
        frames.len(),
        duration,
        peak_amplitude,
        peak_rms
    );

    TrackSummary {
        sample_rate,
        channels,
        total_samples,
        frame_count: frames.len(),
        duration,
        peak_amplitude,
        peak_rms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frames::segment;
    use crate::audio::spectrum::SpectrumMode;
    use std::f32::consts::PI;

    fn tone(freq: f32, amplitude: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn raw_config() -> ReaderConfig {
        ReaderConfig {
            normalized: false,
            ..Default::default()
        }
    }

    #[test]
    fn rms_of_constant_and_empty() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn peak_normalize_guards_silence() {
        let mut out = [9.0f32; 4];
        peak_normalize(&[0.0; 4], &mut out);
        assert_eq!(out, [0.0; 4]);

        peak_normalize(&[0.1, -0.4, 0.2, 0.0], &mut out);
        assert_eq!(out, [0.25, -1.0, 0.5, 0.0]);
    }

    #[test]
    fn raw_analysis_of_sine() {
        let mut analyzer = FrameAnalyzer::new(&raw_config());
        let frame = tone(440.0, 0.5, 1024);
        let result = analyzer.analyze(3, &frame);

        assert_eq!(result.frame, Some(3));
        assert_eq!(result.spectrum.len(), 64);
        assert_eq!(result.waveform, frame);
        assert!((result.amplitude - 0.5 / 2f32.sqrt()).abs() < 0.01);

        let peak = result
            .spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, (440.0f32 * 1024.0 / 44100.0).round() as usize);
    }

    #[test]
    fn normalized_analysis_scales_frame_and_compresses_spectrum() {
        let mut analyzer = FrameAnalyzer::new(&ReaderConfig::default());
        let frame = tone(440.0, 0.1, 1024);
        let result = analyzer.analyze(0, &frame);

        // Peak-normalized sine has RMS ~ 1/sqrt(2) whatever its input level.
        assert!((result.amplitude - 1.0 / 2f32.sqrt()).abs() < 0.01);
        assert!(result.spectrum.iter().all(|m| (0.0..=1.0).contains(m)));
        assert!(result.spectrum.iter().any(|&m| (m - 1.0).abs() < 1e-6));
        // Waveform stays raw.
        assert_eq!(result.waveform, frame);
    }

    #[test]
    fn silent_frame_stays_finite() {
        for normalized in [false, true] {
            let cfg = ReaderConfig {
                normalized,
                spectrum_mode: Some(SpectrumMode::Log10),
                ..Default::default()
            };
            let mut analyzer = FrameAnalyzer::new(&cfg);
            let result = analyzer.analyze(0, &[0.0; 1024]);
            assert_eq!(result.amplitude, 0.0);
            assert!(result.spectrum.iter().all(|&m| m == 0.0));
        }
    }

    #[test]
    fn silence_has_configured_shape() {
        let analyzer = FrameAnalyzer::new(&ReaderConfig {
            fft_bins: 16,
            frame_size: 256,
            ..Default::default()
        });
        let silence = analyzer.silence();
        assert!(silence.is_silence());
        assert_eq!(silence.spectrum, vec![0.0; 16]);
        assert_eq!(silence.waveform.len(), 256);
    }

    #[test]
    fn summary_reports_peaks() {
        let mut samples = tone(440.0, 0.5, 4096);
        samples.extend(vec![0.0; 100]);
        let total = samples.len();
        let frames = segment(samples, 1024);
        let summary = summarize(&frames, 44100, 1, total);

        assert_eq!(summary.frame_count, 4);
        assert_eq!(summary.total_samples, 4196);
        assert!((summary.duration - 4196.0 / 44100.0).abs() < 1e-6);
        assert!(summary.peak_amplitude <= 0.5 && summary.peak_amplitude > 0.49);
        assert!((summary.peak_rms - 0.3536).abs() < 0.01);
    }
}
