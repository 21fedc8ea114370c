use thiserror::Error;

/// Errors reported by the band-gain engine.
///
/// A failed operation never leaves partially written state behind: the
/// previously loaded signal, spectrum and gains stay exactly as they were.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No samples or rows in the input.
    #[error("input contains no samples")]
    EmptyInput,
    /// All amplitudes are zero, so peak normalization would divide by zero.
    #[error("input is silent (peak amplitude is zero)")]
    DegenerateSignal,
    /// Transform requested on an empty buffer, or a nonsensical sample rate.
    #[error("invalid signal: {0}")]
    InvalidSignal(String),
    /// A tabular row is empty, non-numeric or has the wrong column count.
    #[error("malformed tabular input at row {row}: {reason}")]
    MalformedTabular { row: usize, reason: String },
    #[error("unknown band scheme '{0}'")]
    UnknownScheme(String),
    #[error("scheme '{scheme}' has no band '{label}'")]
    UnknownBand { scheme: String, label: String },
    #[error("band index {index} out of range (scheme has {count} bands)")]
    BandOutOfRange { index: usize, count: usize },
    #[error("gain {0} out of range 0..=10")]
    GainOutOfRange(u8),
    /// An edit or export was requested before any signal was loaded.
    #[error("no signal loaded")]
    NoSignal,
    #[error("audio decode failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("WAV encode failed: {0}")]
    Encode(#[from] hound::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
