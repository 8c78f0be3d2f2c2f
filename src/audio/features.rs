use serde::Serialize;

/// One published analysis snapshot. Amplitude, spectrum and waveform always come
/// from the same frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameAnalysis {
    /// Frame the values were derived from; `None` for the neutral state.
    pub frame: Option<usize>,
    /// RMS of the (optionally peak-normalized) frame
    pub amplitude: f32,
    /// Shaped magnitudes, truncated to the configured bin count
    pub spectrum: Vec<f32>,
    /// Raw frame samples
    pub waveform: Vec<f32>,
}

impl FrameAnalysis {
    /// Zero amplitude, zero-filled spectrum and waveform.
    pub fn silence(bins: usize, frame_size: usize) -> Self {
        Self {
            frame: None,
            amplitude: 0.0,
            spectrum: vec![0.0; bins],
            waveform: vec![0.0; frame_size],
        }
    }

    pub fn is_silence(&self) -> bool {
        self.frame.is_none()
    }
}

/// Whole-track facts computed once after decoding.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackSummary {
    pub sample_rate: u32,
    pub channels: usize,
    pub total_samples: usize,
    pub frame_count: usize,
    /// Seconds
    pub duration: f32,
    pub peak_amplitude: f32,
    /// Loudest frame RMS
    pub peak_rms: f32,
}
