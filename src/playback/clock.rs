use serde::Serialize;

/// Cadence at which the external player reports its position.
pub const DEFAULT_TICK_MS: u64 = 35;
/// Seek distance for `forward` / `backward`.
pub const DEFAULT_SEEK_STEP_MS: u64 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Playback position in seconds, driven by position reports from an
/// external player.
///
/// While playing the position only moves forward on ticks; seeks move it
/// in either direction regardless of the timer.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    position: f64,
    duration: f64,
    state: PlaybackState,
    seek_step: f64,
}

impl PlaybackClock {
    pub fn new(duration: f64, seek_step_ms: u64) -> Self {
        Self {
            position: 0.0,
            duration: duration.max(0.0),
            state: PlaybackState::Stopped,
            seek_step: seek_step_ms as f64 / 1000.0,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn play(&mut self) {
        if self.position >= self.duration {
            self.position = 0.0;
        }
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position = 0.0;
    }

    /// Back to the start, then play.
    pub fn rewind(&mut self) {
        self.position = 0.0;
        self.state = PlaybackState::Playing;
    }

    pub fn forward(&mut self) {
        self.seek(self.position + self.seek_step);
    }

    pub fn backward(&mut self) {
        self.seek(self.position - self.seek_step);
    }

    pub fn seek(&mut self, position: f64) {
        self.position = position.clamp(0.0, self.duration);
    }

    /// Applies a position report. Ignored unless playing; never moves
    /// backwards. Returns whether the report was accepted.
    pub fn on_tick(&mut self, reported: f64) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let next = reported.clamp(0.0, self.duration);
        if next > self.position {
            self.position = next;
        }
        if self.position >= self.duration {
            log::debug!("Playback reached end at {:.3}s", self.duration);
            self.state = PlaybackState::Stopped;
        }
        true
    }
}
