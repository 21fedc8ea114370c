use std::io::Write;

use csv::{ReaderBuilder, Trim, WriterBuilder};

use super::signal::Signal;
use crate::error::{EngineError, Result};

/// Sample rate used when the rows carry no usable time column.
pub const DEFAULT_TABULAR_RATE: u32 = 44100;

/// Column label written on tabular export.
pub const EXPORT_HEADER: &str = "Frequency";

const FULL_SCALE: f64 = i16::MAX as f64;

/// Parses comma-separated numeric text into rows of cells.
///
/// Every row must have the same number of columns as the first one.
pub fn parse_rows(bytes: &[u8], has_header: bool) -> Result<Vec<Vec<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let first_row = if has_header { 2 } else { 1 };
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = first_row + i;

        let cells = record
            .iter()
            .map(|cell| match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(EngineError::MalformedTabular {
                    row,
                    reason: format!("non-numeric cell '{}'", cell),
                }),
            })
            .collect::<Result<Vec<f64>>>()?;

        if let Some(first) = rows.first() {
            if first.len() != cells.len() {
                return Err(EngineError::MalformedTabular {
                    row,
                    reason: format!("expected {} columns, found {}", first.len(), cells.len()),
                });
            }
        }
        rows.push(cells);
    }

    Ok(rows)
}

/// Builds a signal from tabular rows.
///
/// Two columns are `(time, amplitude)`; the time column only contributes the
/// sample rate, and only when its spacing is uniform. One column is pure
/// amplitude. Amplitudes are peak-normalized to the 16-bit range.
pub fn load_tabular(rows: &[Vec<f64>], fallback_rate: u32) -> Result<Signal> {
    if rows.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    for (i, row) in rows.iter().enumerate() {
        match row.len() {
            1 | 2 => {}
            0 => {
                return Err(EngineError::MalformedTabular {
                    row: i + 1,
                    reason: "row has no columns".into(),
                })
            }
            n => {
                return Err(EngineError::MalformedTabular {
                    row: i + 1,
                    reason: format!("expected 1 or 2 columns, found {}", n),
                })
            }
        }
        if row.len() != rows[0].len() {
            return Err(EngineError::MalformedTabular {
                row: i + 1,
                reason: "inconsistent column count".into(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::MalformedTabular {
                row: i + 1,
                reason: "non-finite value".into(),
            });
        }
    }

    let two_columns = rows[0].len() == 2;
    let amplitudes: Vec<f64> = rows.iter().map(|r| r[r.len() - 1]).collect();

    let sample_rate = if two_columns {
        let times: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        match uniform_rate(&times) {
            Some(rate) => rate,
            None => {
                log::warn!(
                    "Time column is not uniformly spaced; using {}Hz",
                    fallback_rate
                );
                fallback_rate
            }
        }
    } else {
        fallback_rate
    };

    let samples = normalize_to_i16(&amplitudes)?;

    log::info!(
        "Loaded tabular signal: {} samples, {}Hz, {} column(s)",
        samples.len(),
        sample_rate,
        rows[0].len()
    );

    Signal::new(samples, sample_rate)
}

/// Rows for tabular export: one reconstructed sample value per row.
pub fn export_tabular(signal: &Signal) -> Vec<Vec<f64>> {
    signal.samples().iter().map(|&s| vec![s as f64]).collect()
}

/// Serializes rows as CSV text under a single `Frequency` header.
pub fn write_rows<W: Write>(rows: &[Vec<f64>], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
    writer.write_record([EXPORT_HEADER])?;
    for row in rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// `round(value / max|value| * 32767)` for every value.
pub fn normalize_to_i16(values: &[f64]) -> Result<Vec<i16>> {
    if values.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let peak = values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return Err(EngineError::DegenerateSignal);
    }
    Ok(values
        .iter()
        .map(|v| (v / peak * FULL_SCALE).round() as i16)
        .collect())
}

fn uniform_rate(times: &[f64]) -> Option<u32> {
    if times.len() < 2 {
        return None;
    }
    let dt = times[1] - times[0];
    if dt <= 0.0 {
        return None;
    }
    let tolerance = dt * 1e-3;
    let uniform = times
        .windows(2)
        .all(|w| ((w[1] - w[0]) - dt).abs() <= tolerance);
    if !uniform {
        return None;
    }
    let rate = (1.0 / dt).round();
    (rate >= 1.0 && rate <= u32::MAX as f64).then_some(rate as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_column_is_amplitude() {
        let rows = parse_rows(b"1\n-2\n0.5\n", false).unwrap();
        let signal = load_tabular(&rows, 1000).unwrap();
        assert_eq!(signal.sample_rate(), 1000);
        assert_eq!(signal.samples(), &[16384, -32767, 8192]);
    }

    #[test]
    fn two_columns_derive_rate_from_time() {
        let rows = parse_rows(b"0.0,0.1\n0.001,0.2\n0.002,-0.4\n0.003,0.0\n", false).unwrap();
        let signal = load_tabular(&rows, DEFAULT_TABULAR_RATE).unwrap();
        assert_eq!(signal.sample_rate(), 1000);
        assert_eq!(signal.samples(), &[8192, 16384, -32767, 0]);
    }

    #[test]
    fn uneven_time_falls_back() {
        let rows = vec![vec![0.0, 1.0], vec![0.1, 1.0], vec![0.5, 1.0]];
        let signal = load_tabular(&rows, 8000).unwrap();
        assert_eq!(signal.sample_rate(), 8000);
    }

    #[test]
    fn silent_input_is_degenerate() {
        let rows = parse_rows(b"0\n0\n0\n", false).unwrap();
        assert!(matches!(
            load_tabular(&rows, 8000),
            Err(EngineError::DegenerateSignal)
        ));
    }

    #[test]
    fn empty_input() {
        let rows = parse_rows(b"", false).unwrap();
        assert!(matches!(load_tabular(&rows, 8000), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn non_numeric_cell_reports_row() {
        match parse_rows(b"1\n2\nabc\n", false) {
            Err(EngineError::MalformedTabular { row, .. }) => assert_eq!(row, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn ragged_rows_rejected() {
        assert!(matches!(
            parse_rows(b"1,2\n3\n", false),
            Err(EngineError::MalformedTabular { row: 2, .. })
        ));
        assert!(matches!(
            load_tabular(&[vec![1.0, 2.0, 3.0]], 8000),
            Err(EngineError::MalformedTabular { row: 1, .. })
        ));
        assert!(matches!(
            load_tabular(&[vec![]], 8000),
            Err(EngineError::MalformedTabular { row: 1, .. })
        ));
    }

    #[test]
    fn header_is_skipped_when_requested() {
        let rows = parse_rows(b"Frequency\n10\n-5\n", true).unwrap();
        assert_eq!(rows, vec![vec![10.0], vec![-5.0]]);
    }

    #[test]
    fn written_rows_parse_back() {
        let signal = Signal::new(vec![3, -7, 32767], 8000).unwrap();
        let mut out = Vec::new();
        write_rows(&export_tabular(&signal), &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("Frequency\n"));

        let rows = parse_rows(&out, true).unwrap();
        assert_eq!(rows, vec![vec![3.0], vec![-7.0], vec![32767.0]]);
    }
}
