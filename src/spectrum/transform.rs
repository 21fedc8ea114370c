use rustfft::{num_complex::Complex, FftPlanner};

use crate::audio::signal::Signal;
use crate::error::{EngineError, Result};

/// Full-length DFT of a signal, indexed by FFT bin.
///
/// Bin 0 is DC; for even `N` bin `N/2` is the Nyquist bin. No windowing or
/// zero-padding is applied, so `len()` equals the source sample count.
#[derive(Clone, Debug)]
pub struct SpectralFrame {
    bins: Vec<Complex<f64>>,
    sample_rate: u32,
}

impl SpectralFrame {
    pub fn from_bins(bins: Vec<Complex<f64>>, sample_rate: u32) -> Self {
        Self { bins, sample_rate }
    }

    pub fn bins(&self) -> &[Complex<f64>] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm()).collect()
    }

    pub fn phases(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.arg()).collect()
    }

    /// Frequency of every bin in Hz, negative above the midpoint.
    pub fn frequencies(&self) -> Vec<f64> {
        fft_frequencies(self.bins.len(), self.sample_rate)
    }
}

/// Bin-to-Hz mapping in the conventional FFT order:
/// `[0, 1, ..., ceil(n/2)-1, -floor(n/2), ..., -1] * rate / n`.
pub fn fft_frequencies(n: usize, sample_rate: u32) -> Vec<f64> {
    let resolution = sample_rate as f64 / n as f64;
    let positive = n.div_ceil(2);
    (0..n)
        .map(|k| {
            if k < positive {
                k as f64 * resolution
            } else {
                (k as f64 - n as f64) * resolution
            }
        })
        .collect()
}

/// Forward transform of the whole sample buffer.
pub fn forward(signal: &Signal) -> Result<SpectralFrame> {
    if signal.is_empty() {
        return Err(EngineError::InvalidSignal(
            "cannot transform an empty buffer".into(),
        ));
    }

    let mut buffer: Vec<Complex<f64>> = signal
        .samples()
        .iter()
        .map(|&s| Complex::new(s as f64, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);

    Ok(SpectralFrame::from_bins(buffer, signal.sample_rate()))
}

/// Inverse transform, keeping only the real part.
///
/// Conjugate symmetry is the caller's responsibility; any imaginary residue
/// from an asymmetric spectrum is dropped here.
pub fn inverse(bins: &[Complex<f64>]) -> Result<Vec<f64>> {
    if bins.is_empty() {
        return Err(EngineError::InvalidSignal(
            "cannot transform an empty buffer".into(),
        ));
    }

    let mut buffer = bins.to_vec();
    let n = buffer.len();

    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut buffer);

    // rustfft leaves the inverse unnormalized
    let scale = 1.0 / n as f64;
    Ok(buffer.iter().map(|c| c.re * scale).collect())
}

/// True when `bins[n-k] == conj(bins[k])` for every `k`, within `tolerance`.
pub fn is_conjugate_symmetric(bins: &[Complex<f64>], tolerance: f64) -> bool {
    let n = bins.len();
    (0..n).all(|k| {
        let mirror = (n - k) % n;
        (bins[mirror] - bins[k].conj()).norm() <= tolerance
    })
}
