use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::Signal;
use crate::error::{EngineError, Result};

/// Decodes a PCM waveform container into a mono 16-bit [`Signal`].
pub fn load_wave(bytes: &[u8]) -> Result<Signal> {
    decode_audio(bytes, Some("wav"))
}

/// Decodes any container symphonia can probe. Multichannel input is
/// downmixed to mono by averaging; non-16-bit sample formats are converted.
pub fn decode_audio(bytes: &[u8], extension: Option<&str>) -> Result<Signal> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::InvalidSignal("no audio track found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EngineError::InvalidSignal("unknown sample rate".into()))?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut all_samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let mut sample_buf = SampleBuffer::<i16>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples();

        if channels == 1 {
            all_samples.extend_from_slice(samples);
        } else {
            for frame in samples.chunks(channels) {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                all_samples.push((sum / channels as i32) as i16);
            }
        }
    }

    if all_samples.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.2}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f64 / sample_rate as f64
    );

    Signal::new(all_samples, sample_rate)
}
