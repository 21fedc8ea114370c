mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::BufWriter;
use std::path::Path;

use bandshaper::audio::{decode, tabular};
use bandshaper::config::{self, Config};
use bandshaper::playback::clock::{PlaybackClock, PlaybackState};
use bandshaper::playback::view::{Transport, View};
use bandshaper::spectrum::bands::SchemeContext;
use bandshaper::Engine;
use cli::{BandRef, Cli};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let cfg = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    // Config values apply only when the CLI is at its default
    if cli.scheme == "Uniform" { cli.scheme = cfg.engine.scheme.clone(); }
    if cli.step == 0.2 { cli.step = cfg.engine.gain_step; }
    if cli.rescale.is_none() { cli.rescale = cfg.engine.rescale; }
    if !cli.has_header { cli.has_header = cfg.tabular.has_header; }
    if cli.sample_rate == 44100 { cli.sample_rate = cfg.tabular.fallback_sample_rate; }
    if cli.window == 3.0 { cli.window = cfg.playback.cine_window_secs; }

    let mut settings = cfg.engine.settings();
    settings.scheme = cli.scheme.clone();
    settings.gain_step = cli.step;
    settings.rescale = cli.rescale;
    let mut engine = Engine::new(settings)?;

    if cli.list_schemes {
        return list_schemes(&engine, cli.json);
    }

    let input = cli.input.as_ref().context("Input file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("bandshaper - spectral band-gain editor");
    log::info!("Input: {}", input.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Scheme: {} (step {})", engine.scheme_name(), cli.step);

    // 1. Load
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    if is_tabular(input) {
        let rows = tabular::parse_rows(&bytes, cli.has_header)
            .with_context(|| format!("Failed to parse CSV: {}", input.display()))?;
        engine
            .load_tabular(&rows, cli.sample_rate)
            .with_context(|| format!("Failed to load CSV: {}", input.display()))?;
    } else {
        let ext = input.extension().and_then(|e| e.to_str());
        let signal = decode::decode_audio(&bytes, ext)
            .with_context(|| format!("Failed to decode audio: {}", input.display()))?;
        engine.load(signal, bandshaper::SignalSource::Wave)?;
    }

    // 2. Apply gains
    for spec in &cli.gain {
        let (band, value) = cli::parse_gain(spec)?;
        let applied = match band {
            BandRef::Index(index) => engine.set_gain(index, value),
            BandRef::Label(ref label) => engine.set_gain_by_label(label, value),
        };
        applied.with_context(|| format!("Failed to apply gain '{}'", spec))?;
    }

    // 3. Report
    let levels = engine.band_levels();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
    } else {
        for (i, level) in levels.iter().enumerate() {
            log::info!(
                "  [{:2}] {:<22} gain={:2} x{:.2}  {:7.1} dB -> {:7.1} dB ({} bins)",
                i,
                level.label,
                level.gain,
                level.factor,
                level.input_db,
                level.output_db,
                level.bins
            );
        }
    }

    // 4. Export
    export(&engine, &cli.output)?;

    // 5. Timeline
    if let Some(ref path) = cli.timeline {
        let mut transport = Transport::new(
            PlaybackClock::new(
                engine.input().map_or(0.0, |s| s.duration()),
                cfg.playback.seek_step_ms,
            ),
            cli.view,
            cli.window,
        );
        write_timeline(&engine, &mut transport, cfg.playback.tick_ms, path)?;
    }

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt"))
}

fn list_schemes(engine: &Engine, json: bool) -> Result<()> {
    // Uniform depends on the loaded signal; show it for CD-rate audio
    let context = SchemeContext { nyquist_hz: 22050.0 };
    let registry = engine.registry();
    let schemes = registry
        .names()
        .into_iter()
        .map(|name| registry.get_scheme(name, context))
        .collect::<bandshaper::Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schemes)?);
        return Ok(());
    }

    println!("Available band schemes:");
    for scheme in &schemes {
        println!("  {}", scheme.name);
        for (i, band) in scheme.bands.iter().enumerate() {
            println!(
                "    [{:2}] {:<22} {:>9.1} - {:>9.1} Hz",
                i, band.label, band.low_hz, band.high_hz
            );
        }
    }
    println!("(Uniform shown for a 44100 Hz signal; it always spans 0 to Nyquist)");
    Ok(())
}

fn export(engine: &Engine, path: &Path) -> Result<()> {
    let output = engine.output().context("No output signal to export")?;
    if is_tabular(path) {
        let rows = engine.export_tabular()?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        tabular::write_rows(&rows, BufWriter::new(file))
            .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
    } else {
        let bytes = engine.export_wave()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write WAV: {}", path.display()))?;
    }
    log::info!(
        "Exported {} samples at {}Hz",
        output.len(),
        output.sample_rate()
    );
    Ok(())
}

#[derive(Serialize)]
struct ViewSummary {
    start_secs: f64,
    end_secs: f64,
    samples: usize,
    min: i16,
    max: i16,
}

impl From<&View> for ViewSummary {
    fn from(view: &View) -> Self {
        Self {
            start_secs: view.start_secs,
            end_secs: view.end_secs,
            samples: view.samples.len(),
            min: view.samples.iter().copied().min().unwrap_or(0),
            max: view.samples.iter().copied().max().unwrap_or(0),
        }
    }
}

#[derive(Serialize)]
struct TimelineEntry {
    position_secs: f64,
    state: PlaybackState,
    input: ViewSummary,
    output: ViewSummary,
}

/// Plays the signal on a simulated tick timer and records what both plots
/// would receive on every tick.
fn write_timeline(
    engine: &Engine,
    transport: &mut Transport,
    tick_ms: u64,
    path: &Path,
) -> Result<()> {
    let input = engine.input().context("No input signal")?;
    let output = engine.output().context("No output signal")?;

    let tick = tick_ms.max(1) as f64 / 1000.0;
    let total_ticks = (transport.clock().duration() / tick).ceil() as u64;

    log::info!(
        "Simulating playback: {} ticks of {}ms, {:?} view ({}s window)",
        total_ticks,
        tick_ms,
        transport.mode(),
        transport.window_secs()
    );

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let mut entries = Vec::with_capacity(total_ticks as usize);
    transport.clock_mut().play();
    while transport.clock().is_playing() {
        let reported = transport.clock().position() + tick;
        transport.clock_mut().on_tick(reported);

        entries.push(TimelineEntry {
            position_secs: transport.clock().position(),
            state: transport.clock().state(),
            input: ViewSummary::from(&transport.view(input)),
            output: ViewSummary::from(&transport.view(output)),
        });
        pb.inc(1);
    }
    pb.finish_with_message("Timeline complete");

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create timeline: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &entries)
        .with_context(|| format!("Failed to write timeline: {}", path.display()))?;

    log::info!("Timeline: {} entries -> {}", entries.len(), path.display());
    Ok(())
}
