use serde::{Deserialize, Serialize};

use super::clock::PlaybackClock;
use crate::audio::signal::Signal;

/// Width of the trailing window shown in cine mode.
pub const DEFAULT_CINE_WINDOW_SECS: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Whole signal, with a needle at the playback position.
    Full,
    /// Only `[position - window, position]`.
    Cine,
}

/// Data handed to a plot for one redraw.
#[derive(Clone, Debug, Serialize)]
pub struct View {
    pub mode: ViewMode,
    pub start_secs: f64,
    pub end_secs: f64,
    pub needle_secs: f64,
    pub time: Vec<f64>,
    pub samples: Vec<i16>,
}

impl View {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Renders the view of `signal` at `position` seconds.
///
/// In cine mode the buffer only holds samples inside the window; anything
/// outside it is absent, not masked.
pub fn render(signal: &Signal, position: f64, mode: ViewMode, window_secs: f64) -> View {
    let duration = signal.duration();
    let needle = position.clamp(0.0, duration);

    let (start_secs, end_secs, range) = match mode {
        ViewMode::Full => (0.0, duration, 0..signal.len()),
        ViewMode::Cine => {
            let start = (needle - window_secs.max(0.0)).max(0.0);
            let rate = signal.sample_rate() as f64;
            let first = (start * rate).ceil() as usize;
            let last = ((needle * rate).floor() as usize).min(signal.len().saturating_sub(1));
            let range = if signal.is_empty() || first > last {
                0..0
            } else {
                first..last + 1
            };
            (start, needle, range)
        }
    };

    let time = range.clone().map(|i| signal.time_at(i)).collect();
    let samples = signal.samples()[range].to_vec();

    View {
        mode,
        start_secs,
        end_secs,
        needle_secs: needle,
        time,
        samples,
    }
}

/// One playback clock shared by the input and output plots, plus the view
/// mode. Switching mode never touches the clock.
#[derive(Clone, Debug)]
pub struct Transport {
    clock: PlaybackClock,
    mode: ViewMode,
    window_secs: f64,
}

impl Transport {
    pub fn new(clock: PlaybackClock, mode: ViewMode, window_secs: f64) -> Self {
        Self {
            clock,
            mode,
            window_secs,
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if mode != self.mode {
            log::debug!(
                "View mode {:?} -> {:?} at {:.3}s",
                self.mode,
                mode,
                self.clock.position()
            );
        }
        self.mode = mode;
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    pub fn view(&self, signal: &Signal) -> View {
        render(signal, self.clock.position(), self.mode, self.window_secs)
    }
}
