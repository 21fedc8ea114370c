use std::sync::Arc;

use serde::Serialize;

use super::bands::{Band, BandScheme};
use crate::error::{EngineError, Result};

/// Gain value that leaves a band unchanged.
pub const NEUTRAL_GAIN: u8 = 5;
pub const MAX_GAIN: u8 = 10;
/// Factor change per gain step away from neutral.
pub const DEFAULT_GAIN_STEP: f64 = 0.2;

/// Maps a gain value in `0..=10` to a magnitude multiplier.
///
/// `5` is exactly unity. `0` always mutes, whatever the step; the linear
/// part is clamped at zero so the mapping never decreases.
pub fn gain_factor(gain: u8, step: f64) -> f64 {
    if gain == 0 {
        return 0.0;
    }
    (1.0 + (gain as f64 - NEUTRAL_GAIN as f64) * step).max(0.0)
}

/// Per-band gain and level summary, for reporting.
#[derive(Clone, Debug, Serialize)]
pub struct BandLevel {
    pub label: String,
    pub low_hz: f64,
    pub high_hz: f64,
    pub gain: u8,
    pub factor: f64,
    pub bins: usize,
    pub input_db: f64,
    pub output_db: f64,
}

/// Holds one gain per band of the active scheme and the magnitude buffers
/// derived from them.
///
/// `original` is captured once per load and shared; `modified` is rebuilt
/// band by band, so editing one band never touches the bins of another.
#[derive(Clone, Debug)]
pub struct GainController {
    bands: Vec<Band>,
    gains: Vec<u8>,
    step: f64,
    frequencies: Arc<[f64]>,
    original: Arc<[f64]>,
    modified: Vec<f64>,
}

impl GainController {
    pub fn new(
        scheme: &BandScheme,
        frequencies: Arc<[f64]>,
        original_magnitude: Arc<[f64]>,
        step: f64,
    ) -> Self {
        debug_assert_eq!(frequencies.len(), original_magnitude.len());
        Self {
            bands: scheme.bands.clone(),
            gains: vec![NEUTRAL_GAIN; scheme.len()],
            step,
            frequencies,
            modified: original_magnitude.to_vec(),
            original: original_magnitude,
        }
    }

    pub fn set_gain(&mut self, band_index: usize, gain: u8) -> Result<()> {
        if band_index >= self.bands.len() {
            return Err(EngineError::BandOutOfRange {
                index: band_index,
                count: self.bands.len(),
            });
        }
        if gain > MAX_GAIN {
            return Err(EngineError::GainOutOfRange(gain));
        }

        self.gains[band_index] = gain;
        let factor = gain_factor(gain, self.step);
        let band = &self.bands[band_index];

        let mut touched = 0usize;
        for (k, &freq) in self.frequencies.iter().enumerate() {
            if !band.contains(freq) {
                continue;
            }
            self.modified[k] = if gain == 0 {
                0.0
            } else {
                self.original[k] * factor
            };
            touched += 1;
        }

        log::debug!(
            "Band {} ({}) gain={} factor={:.2}, {} bins",
            band_index,
            band.label,
            gain,
            factor,
            touched
        );
        Ok(())
    }

    /// All gains back to neutral, modified magnitudes back to the original.
    pub fn reset(&mut self) {
        self.gains.iter_mut().for_each(|g| *g = NEUTRAL_GAIN);
        self.modified.copy_from_slice(&self.original);
    }

    pub fn gains(&self) -> &[u8] {
        &self.gains
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn original_magnitude(&self) -> &[f64] {
        &self.original
    }

    pub fn modified_magnitude(&self) -> &[f64] {
        &self.modified
    }

    /// Bins whose frequency lies inside the band.
    pub fn band_bins(&self, band_index: usize) -> Vec<usize> {
        let Some(band) = self.bands.get(band_index) else {
            return Vec::new();
        };
        self.frequencies
            .iter()
            .enumerate()
            .filter(|(_, f)| band.contains(**f))
            .map(|(k, _)| k)
            .collect()
    }

    pub fn band_levels(&self) -> Vec<BandLevel> {
        self.bands
            .iter()
            .enumerate()
            .map(|(i, band)| {
                let bins = self.band_bins(i);
                BandLevel {
                    label: band.label.clone(),
                    low_hz: band.low_hz,
                    high_hz: band.high_hz,
                    gain: self.gains[i],
                    factor: gain_factor(self.gains[i], self.step),
                    bins: bins.len(),
                    input_db: rms_db(&self.original, &bins),
                    output_db: rms_db(&self.modified, &bins),
                }
            })
            .collect()
    }
}

fn rms_db(magnitudes: &[f64], bins: &[usize]) -> f64 {
    if bins.is_empty() {
        return f64::NEG_INFINITY;
    }
    let mean_sq = bins.iter().map(|&k| magnitudes[k] * magnitudes[k]).sum::<f64>() / bins.len() as f64;
    20.0 * mean_sq.sqrt().max(1e-12).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::bands::{BandRegistry, SchemeContext};
    use crate::spectrum::transform::fft_frequencies;

    fn controller(n: usize, rate: u32, step: f64) -> GainController {
        let scheme = BandRegistry::new()
            .get_scheme("Uniform", SchemeContext { nyquist_hz: rate as f64 / 2.0 })
            .unwrap();
        let freqs: Arc<[f64]> = fft_frequencies(n, rate).into();
        let mags: Arc<[f64]> = (0..n).map(|k| 1.0 + k as f64).collect::<Vec<_>>().into();
        GainController::new(&scheme, freqs, mags, step)
    }

    #[test]
    fn neutral_is_unity() {
        assert_eq!(gain_factor(NEUTRAL_GAIN, 0.2), 1.0);
        assert_eq!(gain_factor(NEUTRAL_GAIN, 0.5), 1.0);
        assert!(gain_factor(10, 0.2) > 1.0);
        assert!(gain_factor(3, 0.2) < 1.0);
    }

    #[test]
    fn zero_mutes_for_any_step() {
        for step in [0.1, 0.2, 0.5] {
            assert_eq!(gain_factor(0, step), 0.0);
        }
    }

    #[test]
    fn factor_is_monotonic() {
        for step in [0.2, 0.5] {
            let factors: Vec<f64> = (0..=MAX_GAIN).map(|g| gain_factor(g, step)).collect();
            assert!(factors.windows(2).all(|w| w[0] <= w[1]), "step {}", step);
        }
    }

    #[test]
    fn edits_only_touch_the_band() {
        let mut gc = controller(40, 40, 0.2);
        // Uniform over 20 Hz nyquist: band 1 is [2, 4) Hz -> bins 2 and 3
        assert_eq!(gc.band_bins(1), vec![2, 3]);

        gc.set_gain(1, 10).unwrap();
        assert_eq!(gc.modified_magnitude()[2], 3.0 * 2.0);
        assert_eq!(gc.modified_magnitude()[3], 4.0 * 2.0);
        assert_eq!(gc.modified_magnitude()[4], 5.0);
        // mirror bins are never in a band
        assert_eq!(gc.modified_magnitude()[38], 39.0);

        gc.set_gain(0, 0).unwrap();
        assert_eq!(gc.modified_magnitude()[0], 0.0);
        assert_eq!(gc.modified_magnitude()[2], 6.0, "band 1 untouched by band 0 edit");
    }

    #[test]
    fn monotonic_band_magnitude() {
        for step in [0.2, 0.5] {
            let mut gc = controller(64, 64, step);
            let bins = gc.band_bins(3);
            let mut previous = vec![-1.0; bins.len()];
            for gain in 0..=MAX_GAIN {
                gc.set_gain(3, gain).unwrap();
                for (p, &k) in previous.iter_mut().zip(&bins) {
                    let m = gc.modified_magnitude()[k];
                    assert!(m >= *p);
                    *p = m;
                }
            }
        }
    }

    #[test]
    fn reset_restores_original() {
        let mut gc = controller(32, 32, 0.5);
        gc.set_gain(2, 9).unwrap();
        gc.set_gain(5, 0).unwrap();
        gc.reset();
        assert!(gc.gains().iter().all(|&g| g == NEUTRAL_GAIN));
        assert_eq!(gc.modified_magnitude(), gc.original_magnitude());
    }

    #[test]
    fn rejects_bad_edits_without_change() {
        let mut gc = controller(32, 32, 0.2);
        let before = gc.modified_magnitude().to_vec();
        assert!(matches!(
            gc.set_gain(10, 5),
            Err(EngineError::BandOutOfRange { index: 10, count: 10 })
        ));
        assert!(matches!(gc.set_gain(0, 11), Err(EngineError::GainOutOfRange(11))));
        assert_eq!(gc.modified_magnitude(), &before[..]);
        assert!(gc.gains().iter().all(|&g| g == NEUTRAL_GAIN));
    }

    #[test]
    fn levels_report_gain() {
        let mut gc = controller(40, 40, 0.2);
        gc.set_gain(1, 10).unwrap();
        let levels = gc.band_levels();
        assert_eq!(levels.len(), 10);
        assert_eq!(levels[1].gain, 10);
        assert!((levels[1].output_db - levels[1].input_db - 20.0 * 2f64.log10()).abs() < 1e-9);
        assert_eq!(levels[0].input_db, levels[0].output_db);
    }
}
