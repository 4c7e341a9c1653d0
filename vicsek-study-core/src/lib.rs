//! This library implements the run-processing workflow and statistics
//! engine for Vicsek-model parameter studies.
//!
//! A study is a batch of independent, stochastic simulation runs sweeping
//! a single control parameter (noise or density), replicated several times
//! per value. Each run is executed by an opaque external process which
//! leaves an order-parameter time series on disk. The workflow turns those
//! series into one steady-state mean per run, persists the per-run results
//! so the batch is resumable, and finally aggregates per-parameter sample
//! statistics with standard errors.
//!
//! Programming interface is centered around the [`Workflow`] structure,
//! which sequences catalog discovery, external execution, interactive
//! cutoff selection and result persistence. The two seams that touch the
//! outside world are both traits: [`RunExecutor`] for the external
//! simulator and [`LinePrompt`] for operator input, so the whole pipeline
//! can be driven by fakes in tests.
//!
//! Aggregation comes in two deliberately distinct flavors:
//! [`stats::group_results`] computes across-run sample statistics from
//! persisted [`RunResult`]s, while [`stats::analyze_study`] pools raw
//! series straight from a study directory tree when no per-run results
//! exist. The two are not numerically equivalent.
//!
//! [`Workflow`]: workflow/struct.Workflow.html
//! [`RunExecutor`]: executor/trait.RunExecutor.html
//! [`LinePrompt`]: cutoff/trait.LinePrompt.html
//! [`RunResult`]: store/struct.RunResult.html
//! [`stats::group_results`]: stats/fn.group_results.html
//! [`stats::analyze_study`]: stats/fn.analyze_study.html

#![allow(unused)]

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use config::{ConfigCatalog, ParameterKind, RunConfig, StudyConfig};
pub use cutoff::{CutoffOutcome, LinePrompt};
pub use error::{Error, Result};
pub use executor::{RunExecutor, SubprocessExecutor};
pub use store::{ResultStore, RunResult};
pub use workflow::Workflow;

pub mod config;
pub mod cutoff;
pub mod error;
pub mod executor;
pub mod series;
pub mod stats;
pub mod store;
pub mod workflow;

mod util;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Number of simulation steps between consecutive samples in a raw
/// order-parameter series. Cutoffs are expressed in simulation steps and
/// divided by this stride to get a series index.
pub const SAMPLE_STRIDE: u64 = 5;

/// Fraction of each raw series discarded as warm-up by the pooled,
/// non-interactive aggregation strategy.
pub const DEFAULT_WARMUP_FRACTION: f64 = 0.2;

/// Default file name of the persisted result store document.
pub const RESULTS_FILE: &str = "individual_run_results.json";

/// Name of the directory the external observable step writes raw series to.
pub const ORDER_PARAMETER_DIR_NAME: &str = "order_parameter";

/// Name of the per-sweep directory holding run configuration documents.
pub const CONFIGS_DIR_NAME: &str = "configs";
/// Name of the per-sweep directory holding raw per-run output trees.
pub const RAW_DATA_DIR_NAME: &str = "raw_data";
