use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpectrumMode {
    /// Magnitudes pass through unchanged.
    Raw,
    /// Divided by the spectrum maximum.
    Linear,
    /// `ln(1 + gain·x) / ln(1 + gain)` over linear-normalized magnitudes.
    NaturalLog,
    /// `(log10(1 + gain·x) / log10(1 + gain))^power` over linear-normalized magnitudes.
    Log10,
}

/// Presentation constants for log compression. Tuned for bar heights, not physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogShape {
    pub gain: f32,
    pub power: f32,
}

impl Default for LogShape {
    fn default() -> Self {
        Self {
            gain: crate::config::DEFAULT_LOG_GAIN,
            power: crate::config::DEFAULT_LOG_POWER,
        }
    }
}

impl LogShape {
    /// Compress one linear value. Input is clamped to [0,1] first; output is in [0,1].
    pub fn log10(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let scaled = (1.0 + self.gain * x).log10() / (1.0 + self.gain).log10();
        scaled.powf(self.power).clamp(0.0, 1.0)
    }

    pub fn natural_log(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        ((self.gain * x).ln_1p() / self.gain.ln_1p()).clamp(0.0, 1.0)
    }
}

/// Applies a [`SpectrumMode`] to a magnitude buffer in place.
#[derive(Debug, Clone, Copy)]
pub struct SpectralShaper {
    pub mode: SpectrumMode,
    pub shape: LogShape,
}

impl SpectralShaper {
    pub fn new(mode: SpectrumMode, shape: LogShape) -> Self {
        Self { mode, shape }
    }

    pub fn apply(&self, magnitudes: &mut [f32]) {
        match self.mode {
            SpectrumMode::Raw => {}
            SpectrumMode::Linear => normalize_linear(magnitudes),
            SpectrumMode::NaturalLog => {
                normalize_linear(magnitudes);
                for m in magnitudes.iter_mut() {
                    *m = self.shape.natural_log(*m);
                }
            }
            SpectrumMode::Log10 => {
                normalize_linear(magnitudes);
                for m in magnitudes.iter_mut() {
                    *m = self.shape.log10(*m);
                }
            }
        }
    }
}

/// Divide by the maximum magnitude. A non-positive maximum divides by 1.
pub fn normalize_linear(magnitudes: &mut [f32]) {
    let max = magnitudes.iter().copied().fold(0.0f32, f32::max);
    let divisor = if max > 0.0 { max } else { 1.0 };
    for m in magnitudes.iter_mut() {
        *m /= divisor;
    }
}
