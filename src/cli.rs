use clap::Parser;
use std::path::PathBuf;

use bandshaper::playback::view::ViewMode;
use bandshaper::spectrum::reconstruct::RescaleMode;

#[derive(Parser, Debug)]
#[command(name = "bandshaper", about = "Edit the frequency bands of a recorded signal")]
pub struct Cli {
    /// Input signal (WAV or other audio container, or CSV time series)
    pub input: Option<PathBuf>,

    /// Output file; a .csv extension writes tabular output
    #[arg(short, long, default_value = "output.wav")]
    pub output: PathBuf,

    /// Band scheme name
    #[arg(short, long, default_value = "Uniform")]
    pub scheme: String,

    /// Band gains as BAND=VALUE (band index or label, value 0-10, 5 is neutral)
    #[arg(short, long, value_delimiter = ',')]
    pub gain: Vec<String>,

    /// Factor change per gain step away from neutral
    #[arg(long, default_value_t = 0.2)]
    pub step: f64,

    /// Integer rescale rule (default: truncate for audio, peak for CSV)
    #[arg(long, value_enum)]
    pub rescale: Option<RescaleMode>,

    /// CSV input starts with a header row
    #[arg(long)]
    pub has_header: bool,

    /// Sample rate for CSV input without a uniform time column
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// List available band schemes and exit
    #[arg(long)]
    pub list_schemes: bool,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Simulate playback and write per-tick views of the output as JSON
    #[arg(long)]
    pub timeline: Option<PathBuf>,

    /// View mode used for the timeline
    #[arg(long, value_enum, default_value_t = ViewMode::Full)]
    pub view: ViewMode,

    /// Cine window width in seconds
    #[arg(long, default_value_t = 3.0)]
    pub window: f64,

    /// Config file (defaults to ./bandshaper.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Target of a `BAND=VALUE` gain argument.
#[derive(Debug, PartialEq)]
pub enum BandRef {
    Index(usize),
    Label(String),
}

pub fn parse_gain(spec: &str) -> anyhow::Result<(BandRef, u8)> {
    let (band, value) = spec
        .rsplit_once('=')
        .ok_or_else(|| anyhow::anyhow!("Gain '{}' must look like BAND=VALUE", spec))?;
    let band = band.trim();
    if band.is_empty() {
        anyhow::bail!("Gain '{}' has no band", spec);
    }
    let value: u8 = value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Gain value in '{}' must be an integer 0-10", spec))?;
    let band = match band.parse::<usize>() {
        Ok(index) => BandRef::Index(index),
        Err(_) => BandRef::Label(band.to_string()),
    };
    Ok((band, value))
}
