use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use super::transform::{inverse, SpectralFrame};
use crate::error::{EngineError, Result};

const FULL_SCALE: f64 = i16::MAX as f64;

/// How reconstructed real samples are mapped back to 16-bit integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RescaleMode {
    /// Cast toward zero, saturating at the 16-bit limits.
    Truncate,
    /// `round(x / max|x| * 32767)`.
    #[serde(alias = "peak-normalize")]
    #[value(alias = "peak-normalize")]
    Peak,
}

/// Replaces every positive-frequency bin's amplitude with `magnitudes[k]`
/// while keeping the phase of `original`, then mirrors the first half onto
/// the second so the result is conjugate-symmetric.
///
/// DC, and the Nyquist bin of an even-length frame, are their own mirror
/// and are forced real.
pub fn apply_magnitudes(original: &SpectralFrame, magnitudes: &[f64]) -> Result<Vec<Complex<f64>>> {
    let n = original.len();
    if n == 0 {
        return Err(EngineError::InvalidSignal(
            "cannot reconstruct an empty spectrum".into(),
        ));
    }
    if magnitudes.len() != n {
        return Err(EngineError::InvalidSignal(format!(
            "magnitude buffer has {} bins, spectrum has {}",
            magnitudes.len(),
            n
        )));
    }

    let half = n / 2;
    let mut bins = original.bins().to_vec();

    for k in 0..=half {
        bins[k] = Complex::from_polar(magnitudes[k], original.bins()[k].arg());
    }

    bins[0].im = 0.0;
    for k in 1..=half {
        let mirror = n - k;
        if mirror == k {
            bins[k].im = 0.0;
        } else {
            bins[mirror] = bins[k].conj();
        }
    }

    Ok(bins)
}

/// Full pipeline: amplitude replacement, symmetry restore, inverse
/// transform and rescale to 16-bit samples.
pub fn reconstruct(
    original: &SpectralFrame,
    magnitudes: &[f64],
    mode: RescaleMode,
) -> Result<Vec<i16>> {
    let bins = apply_magnitudes(original, magnitudes)?;
    let real = inverse(&bins)?;
    Ok(rescale(&real, mode))
}

pub fn rescale(values: &[f64], mode: RescaleMode) -> Vec<i16> {
    match mode {
        RescaleMode::Truncate => {
            let mut clipped = 0usize;
            let out = values
                .iter()
                .map(|&v| {
                    let t = v.trunc();
                    if t > i16::MAX as f64 || t < i16::MIN as f64 {
                        clipped += 1;
                    }
                    // `as` saturates on overflow
                    t as i16
                })
                .collect();
            if clipped > 0 {
                log::warn!("{} samples clipped to the 16-bit range", clipped);
            }
            out
        }
        RescaleMode::Peak => {
            let peak = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            if peak == 0.0 {
                return vec![0; values.len()];
            }
            values
                .iter()
                .map(|v| (v / peak * FULL_SCALE).round() as i16)
                .collect()
        }
    }
}
