//! Spectral band-gain engine: load a sampled signal, scale the frequency
//! content of named bands, and reconstruct a playable 16-bit signal.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod spectrum;

pub use engine::{Engine, EngineSettings, SignalSource};
pub use error::{EngineError, Result};
