use crate::error::{EngineError, Result};

/// Mono 16-bit signal plus its sample rate.
///
/// Signals are never edited in place; loading or reconstructing always
/// produces a fresh instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Signal {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidSignal(
                "sample rate must be positive".into(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds (`sample_count / sample_rate`).
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Time in seconds of the sample at `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / self.sample_rate as f64
    }
}
