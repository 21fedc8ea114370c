use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::tabular::DEFAULT_TABULAR_RATE;
use crate::engine::EngineSettings;
use crate::playback::clock::{DEFAULT_SEEK_STEP_MS, DEFAULT_TICK_MS};
use crate::playback::view::DEFAULT_CINE_WINDOW_SECS;
use crate::spectrum::bands::UNIFORM;
use crate::spectrum::gain::DEFAULT_GAIN_STEP;
use crate::spectrum::reconstruct::RescaleMode;

pub const LOCAL_CONFIG: &str = "bandshaper.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tabular: TabularConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_gain_step")]
    pub gain_step: f64,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default)]
    pub rescale: Option<RescaleMode>,
}

#[derive(Debug, Deserialize)]
pub struct TabularConfig {
    #[serde(default)]
    pub has_header: bool,
    #[serde(default = "default_fallback_rate")]
    pub fallback_sample_rate: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_seek_step_ms")]
    pub seek_step_ms: u64,
    #[serde(default = "default_cine_window")]
    pub cine_window_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gain_step: default_gain_step(),
            scheme: default_scheme(),
            rescale: None,
        }
    }
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            has_header: false,
            fallback_sample_rate: default_fallback_rate(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            seek_step_ms: default_seek_step_ms(),
            cine_window_secs: default_cine_window(),
        }
    }
}

impl EngineConfig {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            gain_step: self.gain_step,
            rescale: self.rescale,
            scheme: self.scheme.clone(),
        }
    }
}

fn default_gain_step() -> f64 { DEFAULT_GAIN_STEP }
fn default_scheme() -> String { UNIFORM.into() }
fn default_fallback_rate() -> u32 { DEFAULT_TABULAR_RATE }
fn default_tick_ms() -> u64 { DEFAULT_TICK_MS }
fn default_seek_step_ms() -> u64 { DEFAULT_SEEK_STEP_MS }
fn default_cine_window() -> f64 { DEFAULT_CINE_WINDOW_SECS }

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `./bandshaper.toml`, else the per-user config file.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("bandshaper").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandshaper").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
