use serde::Serialize;

use crate::error::{EngineError, Result};

/// Name of the signal-dependent scheme of ten equal-width bands.
pub const UNIFORM: &str = "Uniform";

const UNIFORM_BAND_COUNT: usize = 10;

/// One labeled frequency range, `[low_hz, high_hz)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Band {
    pub label: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Band {
    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz < self.high_hz
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandScheme {
    pub name: String,
    pub bands: Vec<Band>,
}

impl BandScheme {
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Index of the band whose label matches, ignoring case.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.bands
            .iter()
            .position(|b| b.label.eq_ignore_ascii_case(label))
    }
}

/// What a scheme may depend on from the loaded signal.
#[derive(Clone, Copy, Debug)]
pub struct SchemeContext {
    pub nyquist_hz: f64,
}

struct FixedScheme {
    name: &'static str,
    bands: &'static [(&'static str, f64, f64)],
}

const FIXED_SCHEMES: &[FixedScheme] = &[
    FixedScheme {
        name: "Musical Instruments",
        bands: &[
            ("Drums", 0.0, 150.0),
            ("Bass Guitar", 150.0, 500.0),
            ("Piano", 500.0, 2000.0),
            ("Violin", 2000.0, 8000.0),
        ],
    },
    FixedScheme {
        name: "Animal Sounds",
        bands: &[
            ("Whale", 0.0, 500.0),
            ("Dog", 500.0, 1500.0),
            ("Cat", 1500.0, 4000.0),
            ("Bird", 4000.0, 12000.0),
        ],
    },
    FixedScheme {
        name: "ECG Abnormalities",
        bands: &[
            ("Bradycardia", 0.0, 1.0),
            ("Normal Sinus", 1.0, 1.7),
            ("Tachycardia", 1.7, 3.0),
            ("Atrial Fibrillation", 3.0, 10.0),
        ],
    },
];

/// Registry of every band scheme, keyed by name.
///
/// Lookup ignores case, spaces, dashes and underscores, so `"ecg-abnormalities"`
/// resolves to `"ECG Abnormalities"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BandRegistry;

impl BandRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn names(&self) -> Vec<&'static str> {
        std::iter::once(UNIFORM)
            .chain(FIXED_SCHEMES.iter().map(|s| s.name))
            .collect()
    }

    /// Canonical name of a scheme, if it exists.
    pub fn resolve(&self, name: &str) -> Option<&'static str> {
        let key = normalize(name);
        self.names().into_iter().find(|n| normalize(n) == key)
    }

    pub fn get_scheme(&self, name: &str, context: SchemeContext) -> Result<BandScheme> {
        let canonical = self
            .resolve(name)
            .ok_or_else(|| EngineError::UnknownScheme(name.to_string()))?;

        if canonical == UNIFORM {
            return Ok(uniform_scheme(context.nyquist_hz));
        }

        let fixed = FIXED_SCHEMES
            .iter()
            .find(|s| s.name == canonical)
            .ok_or_else(|| EngineError::UnknownScheme(name.to_string()))?;

        Ok(BandScheme {
            name: fixed.name.to_string(),
            bands: fixed
                .bands
                .iter()
                .map(|&(label, low_hz, high_hz)| Band {
                    label: label.to_string(),
                    low_hz,
                    high_hz,
                })
                .collect(),
        })
    }
}

/// Ten equal slices of `[0, nyquist)`.
fn uniform_scheme(nyquist_hz: f64) -> BandScheme {
    let width = nyquist_hz / UNIFORM_BAND_COUNT as f64;
    let bands = (0..UNIFORM_BAND_COUNT)
        .map(|i| {
            let low_hz = i as f64 * width;
            let high_hz = if i + 1 == UNIFORM_BAND_COUNT {
                nyquist_hz
            } else {
                (i + 1) as f64 * width
            };
            Band {
                label: format!("{:.0}-{:.0} Hz", low_hz, high_hz),
                low_hz,
                high_hz,
            }
        })
        .collect();

    BandScheme {
        name: UNIFORM.to_string(),
        bands,
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
