use std::sync::Arc;

use crate::audio::signal::Signal;
use crate::audio::{decode, encode, tabular};
use crate::error::{EngineError, Result};
use crate::spectrum::bands::{BandRegistry, BandScheme, SchemeContext, UNIFORM};
use crate::spectrum::gain::{BandLevel, GainController, DEFAULT_GAIN_STEP};
use crate::spectrum::reconstruct::{reconstruct, RescaleMode};
use crate::spectrum::transform::{forward, SpectralFrame};

/// Where the loaded signal came from. Picks the default rescale rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalSource {
    Wave,
    Tabular,
}

impl SignalSource {
    /// Waveforms truncate, tabular data is peak-normalized.
    pub fn default_rescale(self) -> RescaleMode {
        match self {
            SignalSource::Wave => RescaleMode::Truncate,
            SignalSource::Tabular => RescaleMode::Peak,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub gain_step: f64,
    /// `None` follows [`SignalSource::default_rescale`].
    pub rescale: Option<RescaleMode>,
    pub scheme: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            gain_step: DEFAULT_GAIN_STEP,
            rescale: None,
            scheme: UNIFORM.to_string(),
        }
    }
}

/// Everything derived from one loaded signal. Replaced as a whole on load.
#[derive(Clone, Debug)]
struct Session {
    source: SignalSource,
    input: Signal,
    spectrum: SpectralFrame,
    frequencies: Arc<[f64]>,
    original_magnitude: Arc<[f64]>,
    scheme: BandScheme,
    gains: GainController,
    rescale: RescaleMode,
    output: Signal,
}

impl Session {
    fn render(&self, gains: &GainController, rescale: RescaleMode) -> Result<Signal> {
        let samples = reconstruct(&self.spectrum, gains.modified_magnitude(), rescale)?;
        // output shares the input's sample rate
        Signal::new(samples, self.input.sample_rate())
    }
}

/// The band-gain engine: sole owner of the loaded signal, its spectrum,
/// the gain state and the reconstructed output.
///
/// Every mutator computes its result off to the side and commits only on
/// success, so a failed call leaves the engine exactly as it was.
#[derive(Debug)]
pub struct Engine {
    settings: EngineSettings,
    registry: BandRegistry,
    session: Option<Session>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        let registry = BandRegistry::new();
        let scheme = registry
            .resolve(&settings.scheme)
            .ok_or_else(|| EngineError::UnknownScheme(settings.scheme.clone()))?;
        Ok(Self {
            settings: EngineSettings {
                scheme: scheme.to_string(),
                ..settings
            },
            registry,
            session: None,
        })
    }

    pub fn registry(&self) -> &BandRegistry {
        &self.registry
    }

    pub fn load_wave(&mut self, bytes: &[u8]) -> Result<()> {
        let signal = decode::load_wave(bytes)?;
        self.load(signal, SignalSource::Wave)
    }

    pub fn load_tabular(&mut self, rows: &[Vec<f64>], fallback_rate: u32) -> Result<()> {
        let signal = tabular::load_tabular(rows, fallback_rate)?;
        self.load(signal, SignalSource::Tabular)
    }

    /// Replaces the input signal and everything derived from it. The output
    /// is rebuilt with neutral gains.
    pub fn load(&mut self, signal: Signal, source: SignalSource) -> Result<()> {
        let spectrum = forward(&signal)?;
        let frequencies: Arc<[f64]> = spectrum.frequencies().into();
        let original_magnitude: Arc<[f64]> = spectrum.magnitudes().into();

        let scheme = self.registry.get_scheme(
            &self.settings.scheme,
            SchemeContext {
                nyquist_hz: signal.nyquist_hz(),
            },
        )?;
        let gains = GainController::new(
            &scheme,
            frequencies.clone(),
            original_magnitude.clone(),
            self.settings.gain_step,
        );
        let rescale = self
            .settings
            .rescale
            .unwrap_or_else(|| source.default_rescale());

        let samples = reconstruct(&spectrum, gains.modified_magnitude(), rescale)?;
        let output = Signal::new(samples, signal.sample_rate())?;

        log::info!(
            "Loaded {} samples at {}Hz ({:.2}s), scheme '{}', rescale {:?}",
            signal.len(),
            signal.sample_rate(),
            signal.duration(),
            scheme.name,
            rescale
        );

        self.session = Some(Session {
            source,
            input: signal,
            spectrum,
            frequencies,
            original_magnitude,
            scheme,
            gains,
            rescale,
            output,
        });
        Ok(())
    }

    /// Activates a scheme. Gains reset to neutral; previous gains are
    /// discarded rather than remapped.
    pub fn select_scheme(&mut self, name: &str) -> Result<()> {
        let canonical = self
            .registry
            .resolve(name)
            .ok_or_else(|| EngineError::UnknownScheme(name.to_string()))?;

        if let Some(session) = self.session.as_mut() {
            let scheme = self.registry.get_scheme(
                canonical,
                SchemeContext {
                    nyquist_hz: session.input.nyquist_hz(),
                },
            )?;
            let gains = GainController::new(
                &scheme,
                session.frequencies.clone(),
                session.original_magnitude.clone(),
                self.settings.gain_step,
            );
            let output = session.render(&gains, session.rescale)?;

            log::info!("Scheme '{}' ({} bands)", scheme.name, scheme.len());
            session.scheme = scheme;
            session.gains = gains;
            session.output = output;
        }

        self.settings.scheme = canonical.to_string();
        Ok(())
    }

    /// Sets one band's gain and rebuilds the output signal.
    pub fn set_gain(&mut self, band_index: usize, gain: u8) -> Result<()> {
        let session = self.session.as_mut().ok_or(EngineError::NoSignal)?;

        let mut gains = session.gains.clone();
        gains.set_gain(band_index, gain)?;
        let output = session.render(&gains, session.rescale)?;

        session.gains = gains;
        session.output = output;
        Ok(())
    }

    /// Sets a gain by band label instead of index.
    pub fn set_gain_by_label(&mut self, label: &str, gain: u8) -> Result<()> {
        let session = self.session.as_ref().ok_or(EngineError::NoSignal)?;
        let index = session
            .scheme
            .position(label)
            .ok_or_else(|| EngineError::UnknownBand {
                scheme: session.scheme.name.clone(),
                label: label.to_string(),
            })?;
        self.set_gain(index, gain)
    }

    pub fn reset_gains(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(EngineError::NoSignal)?;

        let mut gains = session.gains.clone();
        gains.reset();
        let output = session.render(&gains, session.rescale)?;

        session.gains = gains;
        session.output = output;
        Ok(())
    }

    /// Switches the integer rescale rule and rebuilds the output.
    pub fn set_rescale(&mut self, mode: RescaleMode) -> Result<()> {
        self.settings.rescale = Some(mode);
        if let Some(session) = self.session.as_mut() {
            let output = session.render(&session.gains, mode)?;
            session.rescale = mode;
            session.output = output;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn scheme_name(&self) -> &str {
        &self.settings.scheme
    }

    pub fn source(&self) -> Option<SignalSource> {
        self.session.as_ref().map(|s| s.source)
    }

    pub fn input(&self) -> Option<&Signal> {
        self.session.as_ref().map(|s| &s.input)
    }

    pub fn output(&self) -> Option<&Signal> {
        self.session.as_ref().map(|s| &s.output)
    }

    pub fn spectrum(&self) -> Option<&SpectralFrame> {
        self.session.as_ref().map(|s| &s.spectrum)
    }

    pub fn scheme(&self) -> Option<&BandScheme> {
        self.session.as_ref().map(|s| &s.scheme)
    }

    pub fn gains(&self) -> Option<&GainController> {
        self.session.as_ref().map(|s| &s.gains)
    }

    pub fn rescale(&self) -> Option<RescaleMode> {
        self.session.as_ref().map(|s| s.rescale)
    }

    pub fn band_levels(&self) -> Vec<BandLevel> {
        self.session
            .as_ref()
            .map(|s| s.gains.band_levels())
            .unwrap_or_default()
    }

    pub fn export_wave(&self) -> Result<Vec<u8>> {
        let output = self.output().ok_or(EngineError::NoSignal)?;
        encode::export_wave(output)
    }

    pub fn export_tabular(&self) -> Result<Vec<Vec<f64>>> {
        let output = self.output().ok_or(EngineError::NoSignal)?;
        Ok(tabular::export_tabular(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::gain::NEUTRAL_GAIN;
    use crate::spectrum::reconstruct::apply_magnitudes;
    use std::f64::consts::PI;

    fn sine(freq: f64, amplitude: f64, rate: u32, seconds: f64) -> Signal {
        let n = (rate as f64 * seconds) as usize;
        let samples = (0..n)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / rate as f64).sin()).round() as i16)
            .collect();
        Signal::new(samples, rate).unwrap()
    }

    fn chord(rate: u32, n: usize) -> Signal {
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / rate as f64;
                let v = 4000.0 * (2.0 * PI * 60.0 * t).sin()
                    + 3000.0 * (2.0 * PI * 700.0 * t).sin()
                    + 2000.0 * (2.0 * PI * 2500.0 * t).sin()
                    + 1000.0 * (2.0 * PI * 6000.0 * t).sin();
                v.round() as i16
            })
            .collect();
        Signal::new(samples, rate).unwrap()
    }

    fn engine_with(signal: Signal) -> Engine {
        let mut engine = Engine::new(EngineSettings::default()).unwrap();
        engine.load(signal, SignalSource::Wave).unwrap();
        engine
    }

    #[test]
    fn neutral_gains_reproduce_input_for_every_scheme() {
        for (n, rate) in [(4410usize, 44100u32), (4411, 22050)] {
            let mut engine = engine_with(chord(rate, n));
            let names = engine.registry().names();
            for name in names {
                engine.select_scheme(name).unwrap();
                let input = engine.input().unwrap().samples().to_vec();
                let output = engine.output().unwrap().samples();
                assert_eq!(input.len(), output.len());
                for (a, b) in input.iter().zip(output) {
                    assert!((*a as i32 - *b as i32).abs() <= 1, "{}: {} vs {}", name, a, b);
                }
            }
        }
    }

    #[test]
    fn scenario_a_isolates_a_sine() {
        let input = sine(440.0, 8000.0, 8000, 1.0);
        let mut engine = engine_with(input.clone());
        let scheme = engine.scheme().unwrap().clone();
        assert_eq!(scheme.name, UNIFORM);
        let target = scheme.bands.iter().position(|b| b.contains(440.0)).unwrap();

        for i in 0..scheme.len() {
            engine.set_gain(i, if i == target { 10 } else { 0 }).unwrap();
        }

        let output = engine.output().unwrap();
        assert_eq!(output.sample_rate(), 8000);
        for (a, b) in input.samples().iter().zip(output.samples()) {
            assert!((2 * *a as i32 - *b as i32).abs() <= 4, "{} vs {}", a, b);
        }

        let spectrum = forward(output).unwrap();
        let mags = spectrum.magnitudes();
        let peak = (0..mags.len() / 2)
            .max_by(|&a, &b| mags[a].total_cmp(&mags[b]))
            .unwrap();
        assert_eq!(spectrum.frequencies()[peak], 440.0);
    }

    #[test]
    fn zero_gain_mutes_band_bins_exactly() {
        let mut engine = engine_with(chord(16000, 1600));
        engine.select_scheme("Musical Instruments").unwrap();
        engine.set_gain(2, 0).unwrap();

        let gains = engine.gains().unwrap();
        let bins = apply_magnitudes(engine.spectrum().unwrap(), gains.modified_magnitude()).unwrap();
        let band_bins = gains.band_bins(2);
        assert!(!band_bins.is_empty());
        for k in band_bins {
            assert_eq!(bins[k].norm(), 0.0);
            assert_eq!(bins[bins.len() - k].norm(), 0.0);
        }

        // 700 Hz component is gone from the output
        let out = forward(engine.output().unwrap()).unwrap();
        let mags = out.magnitudes();
        let before = engine.spectrum().unwrap().magnitudes();
        assert!(mags[70] < 1e-3 * before[70]);
    }

    #[test]
    fn scenario_c_scheme_switch_resets_gains() {
        let mut engine = engine_with(chord(22050, 2205));
        assert_eq!(engine.gains().unwrap().gains().len(), 10);
        engine.set_gain(3, 9).unwrap();
        engine.set_gain(7, 0).unwrap();

        engine.select_scheme("animal sounds").unwrap();
        assert_eq!(engine.scheme_name(), "Animal Sounds");
        let gains = engine.gains().unwrap();
        assert_eq!(gains.gains(), &[NEUTRAL_GAIN; 4]);
        assert_eq!(gains.modified_magnitude(), gains.original_magnitude());
    }

    #[test]
    fn new_load_invalidates_previous_state() {
        let mut engine = engine_with(chord(22050, 2205));
        engine.set_gain(0, 0).unwrap();

        engine
            .load(sine(100.0, 1000.0, 8000, 0.5), SignalSource::Wave)
            .unwrap();
        let gains = engine.gains().unwrap();
        assert_eq!(gains.original_magnitude().len(), 4000);
        assert!(gains.gains().iter().all(|&g| g == NEUTRAL_GAIN));
        assert_eq!(engine.scheme().unwrap().bands[9].high_hz, 4000.0);
    }

    #[test]
    fn failed_operations_leave_state_alone() {
        let mut engine = engine_with(chord(22050, 2205));
        engine.set_gain(1, 8).unwrap();
        let before_output = engine.output().unwrap().clone();
        let before_gains = engine.gains().unwrap().gains().to_vec();

        assert!(matches!(
            engine.set_gain(42, 3),
            Err(EngineError::BandOutOfRange { .. })
        ));
        assert!(matches!(engine.set_gain(1, 11), Err(EngineError::GainOutOfRange(11))));
        assert!(matches!(
            engine.select_scheme("Nonexistent"),
            Err(EngineError::UnknownScheme(_))
        ));
        assert!(matches!(
            engine.load_tabular(&[vec![0.0], vec![0.0]], 8000),
            Err(EngineError::DegenerateSignal)
        ));
        assert!(engine.load_tabular(&[], 8000).is_err());
        assert!(engine.load_wave(b"junk").is_err());

        assert_eq!(engine.output().unwrap(), &before_output);
        assert_eq!(engine.gains().unwrap().gains(), &before_gains[..]);
        assert_eq!(engine.scheme_name(), UNIFORM);
        assert_eq!(engine.input().unwrap().sample_rate(), 22050);
    }

    #[test]
    fn scenario_b_silent_tabular_creates_nothing() {
        let mut engine = Engine::new(EngineSettings::default()).unwrap();
        let rows = tabular::parse_rows(b"0.0,0\n0.1,0\n0.2,0\n", false).unwrap();
        assert!(matches!(
            engine.load_tabular(&rows, 8000),
            Err(EngineError::DegenerateSignal)
        ));
        assert!(!engine.is_loaded());
        assert!(matches!(engine.set_gain(0, 5), Err(EngineError::NoSignal)));
        assert!(matches!(engine.export_wave(), Err(EngineError::NoSignal)));
    }

    #[test]
    fn round_trip_preserves_sample_count() {
        let original = chord(8000, 1234);
        let wav = encode::export_wave(&original).unwrap();

        let mut engine = Engine::new(EngineSettings::default()).unwrap();
        engine.load_wave(&wav).unwrap();
        let rows = engine.export_tabular().unwrap();
        assert_eq!(rows.len(), 1234);

        engine.load_tabular(&rows, 8000).unwrap();
        assert_eq!(engine.source(), Some(SignalSource::Tabular));
        assert_eq!(engine.rescale(), Some(RescaleMode::Peak));
        let wav_again = engine.export_wave().unwrap();
        let decoded = decode::load_wave(&wav_again).unwrap();
        assert_eq!(decoded.len(), 1234);
        assert_eq!(decoded.sample_rate(), 8000);

        // peak-normalized copy of the exported rows, within rounding
        let peak = rows.iter().map(|r| r[0].abs()).fold(0.0, f64::max);
        for (row, b) in rows.iter().zip(decoded.samples()) {
            let expected = row[0] / peak * 32767.0;
            assert!((expected - *b as f64).abs() <= 2.0, "{} vs {}", expected, b);
        }
    }

    #[test]
    fn rescale_switch_rebuilds_output() {
        let mut engine = engine_with(sine(50.0, 1000.0, 1000, 1.0));
        engine.set_rescale(RescaleMode::Peak).unwrap();
        let peak = engine
            .output()
            .unwrap()
            .samples()
            .iter()
            .map(|s| (*s as i32).abs())
            .max()
            .unwrap();
        assert_eq!(peak, 32767);
        engine.reset_gains().unwrap();
        assert_eq!(engine.rescale(), Some(RescaleMode::Peak));
    }

    #[test]
    fn gain_by_label() {
        let mut engine = engine_with(chord(22050, 2205));
        engine.select_scheme("Musical Instruments").unwrap();
        engine.set_gain_by_label("piano", 7).unwrap();
        assert_eq!(engine.gains().unwrap().gains()[2], 7);
        assert!(matches!(
            engine.set_gain_by_label("kazoo", 7),
            Err(EngineError::UnknownBand { .. })
        ));
    }
}
