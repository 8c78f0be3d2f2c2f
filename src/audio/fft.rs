use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Reusable transform for one fixed power-of-two size.
///
/// The working buffer is allocated once, so [`FftKernel::magnitudes`] does not
/// allocate and can run on every polling tick.
pub struct FftKernel {
    size: usize,
    buffer: Vec<Complex<f64>>,
}

impl FftKernel {
    /// `size` must be a power of two. Other sizes are not supported.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two(), "FFT size must be a power of two");
        Self {
            size,
            buffer: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of meaningful output bins for real input (Nyquist half).
    pub fn bins(&self) -> usize {
        self.size / 2
    }

    /// Transform `samples` and write the first `out.len()` magnitudes (at most
    /// `size / 2`) into `out`. Missing input samples are treated as zero.
    pub fn magnitudes(&mut self, samples: &[f32], out: &mut [f32]) {
        self.transform(samples);
        for (slot, c) in out.iter_mut().zip(&self.buffer[..self.size / 2]) {
            *slot = c.norm() as f32;
        }
    }

    fn transform(&mut self, samples: &[f32]) {
        let n = self.size;
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(samples.get(i).copied().unwrap_or(0.0) as f64, 0.0);
        }

        // Bit-reversal permutation
        let mut j = 0;
        for i in 1..n {
            let mut bit = n >> 1;
            while j & bit != 0 {
                j ^= bit;
                bit >>= 1;
            }
            j |= bit;
            if i < j {
                self.buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let angle = -2.0 * PI / len as f64;
            let step = Complex::new(angle.cos(), angle.sin());
            let half = len / 2;
            for block in self.buffer.chunks_exact_mut(len) {
                let (even, odd) = block.split_at_mut(half);
                let mut w = Complex::new(1.0, 0.0);
                for (e, o) in even.iter_mut().zip(odd.iter_mut()) {
                    let t = w * *o;
                    let u = *e;
                    *e = u + t;
                    *o = u - t;
                    w *= step;
                }
            }
            len <<= 1;
        }
    }
}

/// One-shot magnitude spectrum (`samples.len() / 2` bins). Allocates; prefer
/// [`FftKernel`] in loops.
pub fn fft(samples: &[f32]) -> Vec<f32> {
    let mut kernel = FftKernel::new(samples.len());
    let mut out = vec![0.0; kernel.bins()];
    kernel.magnitudes(samples, &mut out);
    out
}
