//! Study-level aggregation.
//!
//! Two deliberately distinct strategies live here and must not be
//! conflated:
//!
//! - [`group_results`] works from persisted [`RunResult`]s. Per parameter
//!   value it computes the sample mean of the per-run steady-state means,
//!   the sample standard deviation (Bessel-corrected) and the standard
//!   error used as the plotted error bar. This is the strategy of record
//!   whenever run results exist.
//! - [`analyze_study`] works straight from a directory tree of raw series
//!   when no run results are available. It discards a fixed leading
//!   warm-up fraction of each series, pools all remaining samples of a
//!   parameter value into one population, and reports population
//!   statistics over the pool. An across-run mean of per-run means and a
//!   pooled population mean are not numerically equivalent.
//!
//! [`group_results`]: fn.group_results.html
//! [`analyze_study`]: fn.analyze_study.html
//! [`RunResult`]: ../store/struct.RunResult.html

use std::fs;
use std::path::Path;

use crate::config::{parse_identity, ParameterKind};
use crate::error::Result;
use crate::series::{load_series, mean};
use crate::store::RunResult;
use crate::util::get_top_dirs_at;
use crate::{ORDER_PARAMETER_DIR_NAME, RAW_DATA_DIR_NAME};

/// Across-run sample statistics for one parameter value. Derived on
/// demand from the result store, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterGroupStats {
    pub parameter_value: f64,
    /// Sample mean of the per-run steady-state means.
    pub mean: f64,
    /// Sample standard deviation, `n-1` denominator when `n > 1`, else 0.
    pub std_dev: f64,
    /// `std_dev / sqrt(n)`, 0 when `n <= 1`.
    pub standard_error: f64,
    /// Number of contributing runs.
    pub runs: usize,
}

/// Groups run results of one sweep by parameter value and computes sample
/// statistics per group. Pure function of the store contents; output is
/// sorted by parameter value and independent of processing order.
pub fn group_results(results: &[RunResult], kind: ParameterKind) -> Vec<ParameterGroupStats> {
    let mut pairs: Vec<(f64, f64)> = results
        .iter()
        .filter(|r| r.parameter_type == kind)
        .map(|r| (r.parameter_value, r.steady_state_mean))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut groups = Vec::new();
    let mut i = 0;
    while i < pairs.len() {
        let value = pairs[i].0;
        let mut samples = Vec::new();
        while i < pairs.len() && pairs[i].0 == value {
            samples.push(pairs[i].1);
            i += 1;
        }
        groups.push(group_stats(value, &samples));
    }
    groups
}

fn group_stats(parameter_value: f64, samples: &[f64]) -> ParameterGroupStats {
    let n = samples.len();
    let sample_mean = mean(samples);
    let std_dev = if n > 1 {
        let ss: f64 = samples.iter().map(|x| (x - sample_mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    let standard_error = if n > 1 {
        std_dev / (n as f64).sqrt()
    } else {
        0.0
    };
    ParameterGroupStats {
        parameter_value,
        mean: sample_mean,
        std_dev,
        standard_error,
        runs: n,
    }
}

/// Pooled population statistics for one parameter value, computed
/// directly from raw series on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PooledStudySummary {
    pub parameter_value: f64,
    /// Population mean over all samples of all runs.
    pub mean: f64,
    /// Population standard deviation over the same pool.
    pub std_dev: f64,
    /// `std_dev / sqrt(total samples)`.
    pub standard_error: f64,
    pub runs: usize,
    /// Population mean over the pool with the leading warm-up fraction of
    /// each series removed.
    pub steady_state_mean: f64,
    pub steady_state_std: f64,
}

/// Analyzes one sweep directly from its `raw_data` directory tree, with
/// run directories named `{tag}_{value}_run_{n}`, each holding an
/// `order_parameter` series file.
///
/// This is the coarse, non-interactive fallback for when no per-run
/// results exist: `warmup_fraction` of each series is discarded as
/// warm-up instead of a human-chosen cutoff.
pub fn analyze_study(
    study_dir: &Path,
    kind: ParameterKind,
    warmup_fraction: f64,
) -> Result<Vec<PooledStudySummary>> {
    let raw_data = study_dir.join(RAW_DATA_DIR_NAME);
    if !raw_data.is_dir() {
        warn!("study path {} does not exist", raw_data.to_string_lossy());
        return Ok(Vec::new());
    }

    // group run series files by parameter value
    let mut groups: Vec<(f64, Vec<std::path::PathBuf>)> = Vec::new();
    for run_dir in get_top_dirs_at(&raw_data) {
        let name = match run_dir.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };
        let (run_kind, value, _run) = match parse_identity(name) {
            Ok(parsed) => parsed,
            Err(_) => {
                debug!("ignoring non-run directory: {}", name);
                continue;
            }
        };
        if run_kind != kind {
            continue;
        }
        let series_file =
            crate::util::find_files_with_extension(&run_dir.join(ORDER_PARAMETER_DIR_NAME), "txt")
                .into_iter()
                .next();
        let series_file = match series_file {
            Some(f) => f,
            None => {
                warn!("no series file under run directory: {}", name);
                continue;
            }
        };
        match groups.iter_mut().find(|(v, _)| *v == value) {
            Some((_, files)) => files.push(series_file),
            None => groups.push((value, vec![series_file])),
        }
    }
    groups.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut summaries = Vec::new();
    for (value, files) in groups {
        info!("analyzing {} = {} with {} runs", kind, value, files.len());
        summaries.push(pooled_stats(value, &files, warmup_fraction));
    }
    Ok(summaries)
}

fn pooled_stats(
    parameter_value: f64,
    series_files: &[std::path::PathBuf],
    warmup_fraction: f64,
) -> PooledStudySummary {
    let mut pool = Vec::new();
    let mut steady_pool = Vec::new();
    for file in series_files {
        let series = match load_series(file) {
            Ok(s) => s,
            Err(e) => {
                warn!("error loading {}: {}", file.to_string_lossy(), e);
                continue;
            }
        };
        let skip = (series.len() as f64 * warmup_fraction) as usize;
        steady_pool.extend_from_slice(if skip < series.len() {
            &series[skip..]
        } else {
            &series[..]
        });
        pool.extend(series);
    }

    if pool.is_empty() {
        warn!("no valid data found for parameter {}", parameter_value);
        return PooledStudySummary {
            parameter_value,
            mean: 0.0,
            std_dev: 0.0,
            standard_error: 0.0,
            runs: 0,
            steady_state_mean: 0.0,
            steady_state_std: 0.0,
        };
    }

    let (pool_mean, pool_std) = population_stats(&pool);
    let (steady_mean, steady_std) = population_stats(&steady_pool);
    PooledStudySummary {
        parameter_value,
        mean: pool_mean,
        std_dev: pool_std,
        standard_error: pool_std / (pool.len() as f64).sqrt(),
        runs: series_files.len(),
        steady_state_mean: steady_mean,
        steady_state_std: steady_std,
    }
}

fn population_stats(samples: &[f64]) -> (f64, f64) {
    let m = mean(samples);
    let ss: f64 = samples.iter().map(|x| (x - m).powi(2)).sum();
    (m, (ss / samples.len() as f64).sqrt())
}

/// Writes pooled summaries as a tab-separated processed-statistics file,
/// one row per parameter value.
pub fn write_summary(
    summaries: &[PooledStudySummary],
    output_file: &Path,
    parameter_name: &str,
) -> Result<()> {
    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut out = String::new();
    out.push_str(&format!(
        "# {} vs Order Parameter Statistics\n",
        parameter_name
    ));
    out.push_str(&format!(
        "# {}\tMean_va\tStd_va\tStderr_va\tRuns\tSteady_mean\tSteady_std\n",
        parameter_name
    ));
    for s in summaries {
        out.push_str(&format!(
            "{:.3}\t{:.6}\t{:.6}\t{:.6}\t{}\t{:.6}\t{:.6}\n",
            s.parameter_value,
            s.mean,
            s.std_dev,
            s.standard_error,
            s.runs,
            s.steady_state_mean,
            s.steady_state_std
        ));
    }
    fs::write(output_file, out)?;
    Ok(())
}

#[cfg(test)]
fn test_result(kind: ParameterKind, value: f64, run: u32, steady_mean: f64) -> RunResult {
    RunResult {
        config_file: format!("configs/{}_{}_run_{}.json", kind.tag(), value, run),
        parameter_type: kind,
        parameter_value: value,
        run_number: run,
        cutoff_step: 100,
        steady_state_mean: steady_mean,
        total_steps: 2000,
        seed: None,
    }
}

#[test]
fn group_single_result_has_zero_spread() {
    let results = vec![test_result(ParameterKind::Noise, 1.0, 1, 0.6)];
    let groups = group_results(&results, ParameterKind::Noise);
    assert_eq!(groups.len(), 1);
    assert!((groups[0].mean - 0.6).abs() < 1e-12);
    assert_eq!(groups[0].std_dev, 0.0);
    assert_eq!(groups[0].standard_error, 0.0);
    assert_eq!(groups[0].runs, 1);
}

#[test]
fn group_identical_results_have_zero_spread() {
    let results: Vec<RunResult> = (1..=4)
        .map(|run| test_result(ParameterKind::Noise, 2.0, run, 0.55))
        .collect();
    let groups = group_results(&results, ParameterKind::Noise);
    assert_eq!(groups.len(), 1);
    assert!((groups[0].mean - 0.55).abs() < 1e-12);
    assert!(groups[0].std_dev.abs() < 1e-12);
    assert!(groups[0].standard_error.abs() < 1e-12);
}

#[test]
fn group_two_results_bessel_corrected() {
    let results = vec![
        test_result(ParameterKind::Density, 1.0, 1, 0.80),
        test_result(ParameterKind::Density, 1.0, 2, 0.84),
    ];
    let groups = group_results(&results, ParameterKind::Density);
    assert_eq!(groups.len(), 1);
    assert!((groups[0].mean - 0.82).abs() < 1e-12);
    assert!((groups[0].std_dev - 0.028284271247461905).abs() < 1e-12);
    assert!((groups[0].standard_error - 0.02).abs() < 1e-12);
}

#[test]
fn group_filters_by_kind_and_sorts_by_value() {
    let results = vec![
        test_result(ParameterKind::Noise, 2.0, 1, 0.3),
        test_result(ParameterKind::Density, 1.0, 1, 0.9),
        test_result(ParameterKind::Noise, 0.5, 1, 0.8),
    ];
    let groups = group_results(&results, ParameterKind::Noise);
    assert_eq!(groups.len(), 2);
    assert!((groups[0].parameter_value - 0.5).abs() < 1e-12);
    assert!((groups[1].parameter_value - 2.0).abs() < 1e-12);
}

#[test]
fn pooled_analysis_discards_warmup_and_pools_runs() {
    let root = std::env::temp_dir().join("vicsek_pooled_stats_test");
    let _ = fs::remove_dir_all(&root);
    let study = root.join("eta_study");
    for (run, body) in [
        (1, "0.0\n0.0\n0.4\n0.4\n0.4\n"),
        (2, "0.0\n0.0\n0.8\n0.8\n0.8\n"),
    ]
    .iter()
    {
        let dir = study
            .join(RAW_DATA_DIR_NAME)
            .join(format!("eta_1.0_run_{}", run))
            .join(ORDER_PARAMETER_DIR_NAME);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("v_a.txt"), body).unwrap();
    }

    let summaries = analyze_study(&study, ParameterKind::Noise, 0.2).unwrap();
    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s.runs, 2);
    // full pool: four zeros and six 0.4/0.8 samples
    assert!((s.mean - 0.36).abs() < 1e-12);
    // warm-up skips one leading sample per 5-sample series
    assert!((s.steady_state_mean - 0.45).abs() < 1e-12);

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn pooled_and_grouped_strategies_differ() {
    // two runs of different lengths with the same per-run mean structure:
    // across-run mean weighs runs equally, the pool weighs samples
    let across = mean(&[mean(&[0.2, 0.4]), mean(&[0.8])]);
    let pooled = mean(&[0.2, 0.4, 0.8]);
    assert!((across - 0.55).abs() < 1e-12);
    assert!((pooled - 0.4666666666666667).abs() < 1e-12);
    assert!((across - pooled).abs() > 1e-3);
}
