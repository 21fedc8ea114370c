use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::signal::Signal;
use crate::error::Result;

/// Encodes a signal as a mono 16-bit PCM WAV file, at the signal's own
/// sample rate.
pub fn export_wave(signal: &Signal) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: signal.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in signal.samples() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    log::debug!(
        "Encoded {} samples at {}Hz ({} bytes)",
        signal.len(),
        signal.sample_rate(),
        cursor.get_ref().len()
    );

    Ok(cursor.into_inner())
}
