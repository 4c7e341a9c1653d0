//! Raw order-parameter series handling.
//!
//! The external observable step writes one plain-text file per run, one
//! floating point value per line, sampled every [`SAMPLE_STRIDE`]
//! simulation steps. The series itself is transient; only its steady-state
//! reduction is persisted.
//!
//! [`SAMPLE_STRIDE`]: ../constant.SAMPLE_STRIDE.html

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::util::{find_files_with_extension, read_text_file};
use crate::{ORDER_PARAMETER_DIR_NAME, SAMPLE_STRIDE};

/// Extension of raw series files.
const SERIES_EXTENSION: &str = "txt";

/// Finds the raw series file left behind by the most recent run, inside
/// the `order_parameter` directory under the given output root.
///
/// After a single run there should be exactly one; if several are present
/// the first in sorted order is taken.
pub fn find_series_file(output_root: &Path) -> Result<PathBuf> {
    let dir = output_root.join(ORDER_PARAMETER_DIR_NAME);
    let files = find_files_with_extension(&dir, SERIES_EXTENSION);
    match files.into_iter().next() {
        Some(f) => Ok(f),
        None => Err(Error::NoSeriesFile(dir.to_string_lossy().to_string())),
    }
}

/// Loads a raw series from a plain-text file, one value per line. Blank
/// lines are skipped. An empty series is an error.
pub fn load_series(path: &Path) -> Result<Vec<f64>> {
    let content = read_text_file(path)?;
    let mut values = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        values.push(line.parse::<f64>()?);
    }
    if values.is_empty() {
        return Err(Error::EmptySeries(path.to_string_lossy().to_string()));
    }
    Ok(values)
}

/// Converts a simulation-step cutoff to a series index.
pub fn cutoff_index(cutoff_step: u64) -> usize {
    (cutoff_step / SAMPLE_STRIDE) as usize
}

/// Arithmetic mean of a slice. Empty input yields NaN, callers guard
/// against it.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reduces a series and a cutoff (in simulation steps) to the mean over
/// the steady-state tail `series[cutoff_step / stride ..]`.
///
/// The interactive selector never yields an out-of-bounds cutoff, but the
/// bound is re-validated here because this is also called outside the
/// interactive path, e.g. for summary-time recomputation.
pub fn steady_state_mean(series: &[f64], cutoff_step: u64) -> Result<f64> {
    let index = cutoff_index(cutoff_step);
    if index >= series.len() {
        return Err(Error::CutoffOutOfRange {
            step: cutoff_step,
            index,
            len: series.len(),
        });
    }
    Ok(mean(&series[index..]))
}

#[test]
fn reduce_equals_tail_mean() {
    let series: Vec<f64> = (1..=9).map(|i| i as f64 / 10.0).collect();
    // 9 samples at stride 5 cover steps 0, 5, ..., 40; cutoff step 20 is
    // sample 4, so the tail is [0.5, 0.6, 0.7, 0.8, 0.9].
    let reduced = steady_state_mean(&series, 20).unwrap();
    assert!((reduced - 0.7).abs() < 1e-12);
}

#[test]
fn reduce_cutoff_zero_spans_whole_series() {
    let series = vec![0.2, 0.4, 0.6];
    let reduced = steady_state_mean(&series, 0).unwrap();
    assert!((reduced - 0.4).abs() < 1e-12);
}

#[test]
fn reduce_non_multiple_of_stride_truncates() {
    let series = vec![0.1, 0.2, 0.3, 0.4];
    // step 7 maps to sample 1
    let reduced = steady_state_mean(&series, 7).unwrap();
    assert!((reduced - 0.3).abs() < 1e-12);
}

#[test]
fn reduce_rejects_out_of_range_cutoff() {
    let series = vec![0.1, 0.2, 0.3];
    assert!(steady_state_mean(&series, 15).is_err());
    assert!(steady_state_mean(&series, 10).is_ok());
}

#[test]
fn load_series_skips_blank_lines() {
    use std::fs;
    let path = std::env::temp_dir().join("vicsek_series_blank_test.txt");
    fs::write(&path, "0.1\n\n0.2\n  \n0.3\n").unwrap();
    let series = load_series(&path).unwrap();
    assert_eq!(series, vec![0.1, 0.2, 0.3]);
    fs::remove_file(&path).unwrap();
}

#[test]
fn load_series_rejects_empty_file() {
    use std::fs;
    let path = std::env::temp_dir().join("vicsek_series_empty_test.txt");
    fs::write(&path, "\n\n").unwrap();
    assert!(load_series(&path).is_err());
    fs::remove_file(&path).unwrap();
}

#[test]
fn find_series_file_errors_when_missing() {
    let root = std::env::temp_dir().join("vicsek_series_missing_test");
    assert!(find_series_file(&root).is_err());
}
