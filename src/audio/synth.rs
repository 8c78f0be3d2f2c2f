use std::f32::consts::PI;
use std::path::Path;

use crate::error::WavError;

/// Constant sine, `secs` long.
pub fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
    let total = (secs * sample_rate as f32) as usize;
    (0..total)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * freq as f64 * t).sin() as f32
        })
        .collect()
}

/// Sine whose frequency and amplitude ramp linearly across the duration.
pub fn linear_sweep(
    secs: f32,
    sample_rate: u32,
    freq: (f32, f32),
    amplitude: (f32, f32),
) -> Vec<f32> {
    let total = (secs * sample_rate as f32) as usize;
    let mut phase = 0.0f32;
    (0..total)
        .map(|i| {
            let progress = i as f32 / sample_rate as f32 / secs;
            let f = freq.0 + (freq.1 - freq.0) * progress;
            let a = amplitude.0 + (amplitude.1 - amplitude.0) * progress;
            let sample = a * phase.sin();
            phase = (phase + 2.0 * PI * f / sample_rate as f32) % (2.0 * PI);
            sample
        })
        .collect()
}

/// Sine whose frequency and amplitude ramp geometrically (equal ratio per second).
pub fn exponential_sweep(
    secs: f32,
    sample_rate: u32,
    freq: (f32, f32),
    amplitude: (f32, f32),
) -> Vec<f32> {
    let total = (secs * sample_rate as f32) as usize;
    let freq_ratio = freq.1 / freq.0;
    let amp_ratio = amplitude.1 / amplitude.0;
    let mut phase = 0.0f32;
    (0..total)
        .map(|i| {
            let progress = i as f32 / sample_rate as f32 / secs;
            let f = freq.0 * freq_ratio.powf(progress);
            let a = amplitude.0 * amp_ratio.powf(progress);
            let sample = a * phase.sin();
            phase = (phase + 2.0 * PI * f / sample_rate as f32) % (2.0 * PI);
            sample
        })
        .collect()
}

/// Write mono 16-bit PCM.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), WavError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let write_err = |source: hound::Error| WavError {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)?;
    log::info!(
        "Wrote {} samples ({:.1}s @ {}Hz) to {}",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::rms;

    #[test]
    fn sine_has_expected_length_and_level() {
        let samples = sine(440.0, 0.5, 2.0, 44100);
        assert_eq!(samples.len(), 88200);
        assert!((rms(&samples) - 0.5 / 2f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn sweeps_ramp_amplitude() {
        for samples in [
            linear_sweep(1.0, 8000, (200.0, 880.0), (0.2, 1.0)),
            exponential_sweep(1.0, 8000, (220.0, 880.0), (0.2, 1.0)),
        ] {
            assert_eq!(samples.len(), 8000);
            let head = rms(&samples[..800]);
            let tail = rms(&samples[7200..]);
            assert!(tail > head * 2.0, "head={head} tail={tail}");
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn write_wav_reports_unwritable_path() {
        let path = Path::new("/no/such/dir/tone.wav");
        let err = write_wav(path, &sine(440.0, 0.5, 0.1, 8000), 8000).unwrap_err();
        assert_eq!(err.path, path);
        assert!(matches!(err.source, hound::Error::IoError(_)));
    }
}
