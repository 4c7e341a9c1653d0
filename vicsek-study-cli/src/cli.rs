//! Application definition.

#![allow(dead_code)]
#![allow(unused)]

extern crate simplelog;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Error, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use study::config::{ConfigCatalog, ParameterKind};
use study::executor::SubprocessExecutor;
use study::stats::{analyze_study, group_results, write_summary};
use study::store::ResultStore;
use study::workflow::Workflow;
use study::{DEFAULT_WARMUP_FRACTION, RESULTS_FILE};

use crate::prompt::TerminalPrompt;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");

pub fn app<'a, 'b>() -> App<'a, 'b> {
    let mut app = App::new("vicsek-study")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .version(VERSION)
        .author(AUTHORS)
        .about("Process Vicsek parameter-study runs into steady-state statistics \
                from the command line.")
        .arg(Arg::with_name("verbosity")
            .long("verbosity")
            .short("v")
            .takes_value(true)
            .default_value("info")
            .value_name("verb")
            .global(true)
            .help("Set the verbosity of the log output"))

        // run subcommand
        .subcommand(SubCommand::with_name("run")
            .display_order(10)
            .about("Run the resumable per-run processing workflow")
            .long_about("Run the resumable per-run processing workflow.\n\n\
            For every config document not yet present in the results file, \n\
            the external simulate and observe steps are invoked, the raw \n\
            order-parameter series is shown for interactive steady-state \n\
            cutoff selection, and the resulting per-run mean is persisted. \n\
            Already-processed configs are skipped, so the batch can be \n\
            interrupted and resumed at any time.")
            .arg(Arg::with_name("path")
                .value_name("study-root")
                .default_value("./")
                .help("Path to the study root holding the sweep directories"))
            .arg(Arg::with_name("results")
                .long("results")
                .short("r")
                .takes_value(true)
                .value_name("path")
                .default_value(RESULTS_FILE)
                .help("Path to the persisted results document"))
            .arg(Arg::with_name("output-root")
                .long("output-root")
                .takes_value(true)
                .value_name("path")
                .help("Directory under which the observe step writes the raw \
                series (defaults to the study root)"))
            .arg(Arg::with_name("sim-cmd")
                .long("sim-cmd")
                .takes_value(true)
                .value_name("command")
                .help("External simulate command; '{config}' is replaced with \
                the config path relative to the study root"))
            .arg(Arg::with_name("obs-cmd")
                .long("obs-cmd")
                .takes_value(true)
                .value_name("command")
                .help("External observable-computation command"))
        )

        // summary subcommand
        .subcommand(SubCommand::with_name("summary")
            .display_order(11)
            .about("Print per-parameter statistics from an existing results document")
            .arg(Arg::with_name("results")
                .value_name("path")
                .default_value(RESULTS_FILE)
                .help("Path to the persisted results document"))
        )

        // analyze subcommand
        .subcommand(SubCommand::with_name("analyze")
            .display_order(12)
            .about("Pooled statistics straight from raw series on disk")
            .long_about("Pooled statistics straight from raw series on disk.\n\n\
            Used when no per-run results exist: a fixed leading fraction of \n\
            each series is discarded as warm-up and all remaining samples of \n\
            a parameter value are pooled into one population. Not equivalent \n\
            to the across-run statistics of `summary`.")
            .arg(Arg::with_name("path")
                .value_name("results-root")
                .default_value("results")
                .help("Directory holding the per-sweep raw_data trees"))
            .arg(Arg::with_name("warmup")
                .long("warmup")
                .takes_value(true)
                .value_name("fraction")
                .help("Leading fraction of each series discarded as warm-up \
                (default 0.2)"))
        );

    app
}

/// Runs based on specified subcommand.
pub fn start(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("run", Some(m)) => start_run(m),
        ("summary", Some(m)) => start_summary(m),
        ("analyze", Some(m)) => start_analyze(m),
        _ => Ok(()),
    }
}

fn start_run(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);

    let mut path = env::current_dir()?;
    if let Some(p_str) = matches.value_of("path") {
        let p = PathBuf::from(p_str);
        if p.is_relative() {
            path = path.join(p);
        } else {
            path = p;
        }
    }
    path = path.canonicalize().unwrap_or(path);

    let results_path = PathBuf::from(matches.value_of("results").unwrap_or(RESULTS_FILE));
    let output_root = matches
        .value_of("output-root")
        .map(PathBuf::from)
        .unwrap_or_else(|| path.clone());

    let simulate_cmd = match matches.value_of("sim-cmd") {
        Some(cmd) => cmd.split_whitespace().map(|s| s.to_string()).collect(),
        None => SubprocessExecutor::default_simulate_cmd(),
    };
    let observe_cmd = match matches.value_of("obs-cmd") {
        Some(cmd) => cmd.split_whitespace().map(|s| s.to_string()).collect(),
        None => SubprocessExecutor::default_observe_cmd(),
    };

    // run a loop allowing graceful shutdown
    let interrupted = Arc::new(AtomicBool::new(false));
    let i = interrupted.clone();
    ctrlc::set_handler(move || {
        i.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let mut workflow = Workflow::new(
        ConfigCatalog::new(path.clone()),
        ResultStore::load(results_path),
        SubprocessExecutor::new(path, simulate_cmd, observe_cmd),
        TerminalPrompt::new()?,
        output_root,
        interrupted,
    );

    let report = workflow.run()?;
    info!(
        "workflow pass finished: {} processed, {} skipped, {} failed",
        report.processed, report.skipped, report.failed
    );
    if report.interrupted {
        return Err(Error::msg("workflow interrupted by user"));
    }
    Ok(())
}

fn start_summary(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);

    let results_path = PathBuf::from(matches.value_of("results").unwrap_or(RESULTS_FILE));
    let store = ResultStore::load(&results_path);
    if store.is_empty() {
        println!("No results available in {:?}", results_path);
        return Ok(());
    }

    for (kind, label) in [
        (ParameterKind::Noise, "ETA STUDY:"),
        (ParameterKind::Density, "RHO STUDY:"),
    ]
    .iter()
    {
        let groups = group_results(store.results(), *kind);
        if groups.is_empty() {
            continue;
        }
        println!("{}", label);
        for g in groups {
            println!(
                "  {} = {:4.1}: <v_a> = {:.4} +/- {:.4} (sigma = {:.4}, n={})",
                kind.tag(),
                g.parameter_value,
                g.mean,
                g.standard_error,
                g.std_dev,
                g.runs
            );
        }
    }
    println!("Total processed runs: {}", store.len());
    Ok(())
}

fn start_analyze(matches: &ArgMatches) -> Result<()> {
    setup_log_verbosity(matches);

    let root = PathBuf::from(matches.value_of("path").unwrap_or("results"));
    let warmup = match matches.value_of("warmup") {
        Some(f_str) => f_str.parse::<f64>()?,
        None => DEFAULT_WARMUP_FRACTION,
    };
    if !(0.0..1.0).contains(&warmup) {
        return Err(Error::msg("warm-up fraction must be in [0, 1)"));
    }

    for kind in [ParameterKind::Noise, ParameterKind::Density].iter() {
        let study_dir = root.join(format!("{}_study", kind.tag()));
        let summaries = analyze_study(&study_dir, *kind, warmup)?;
        if summaries.is_empty() {
            continue;
        }
        println!("{} study:", kind.tag());
        for s in &summaries {
            println!(
                "  {} = {:4.1}: mean = {:.4} +/- {:.4} (steady = {:.4}, runs={})",
                kind.tag(),
                s.parameter_value,
                s.mean,
                s.standard_error,
                s.steady_state_mean,
                s.runs
            );
        }
        let out_file = study_dir
            .join("processed")
            .join(format!("{}_statistics.txt", kind.tag()));
        write_summary(&summaries, &out_file, kind.tag())?;
        println!("processed statistics written to {:?}", out_file);
    }
    Ok(())
}

fn setup_log_verbosity(matches: &ArgMatches) {
    use self::simplelog::{Config, LevelFilter, TermLogger};
    let level_filter = match matches.value_of("verbosity") {
        Some(s) => match s {
            "0" | "none" => LevelFilter::Off,
            "1" | "err" | "error" | "min" => LevelFilter::Error,
            "2" | "warn" | "warning" | "default" => LevelFilter::Warn,
            "3" | "info" => LevelFilter::Info,
            "4" | "debug" => LevelFilter::Debug,
            "5" | "trace" | "max" | "all" => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        },
        _ => LevelFilter::Warn,
    };
    let mut config_builder = simplelog::ConfigBuilder::new();
    let logger_conf = config_builder
        .set_time_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Debug)
        .set_location_level(LevelFilter::Error)
        .set_time_format_str("%H:%M:%S%.6f")
        .build();
    TermLogger::init(level_filter, logger_conf, simplelog::TerminalMode::Mixed);
}
