//! Sequencing of the run-processing workflow.
//!
//! The controller is strictly sequential: one external invocation
//! outstanding at a time, blocking on operator input during cutoff
//! selection, with the interrupt flag checked only between discrete
//! steps. Resumption falls out of the result store: a config whose
//! identity is already present is reported and skipped, so rerunning the
//! workflow after a failure or interrupt picks up exactly where it left
//! off. Failed runs produce no result and are simply retried by a later
//! rerun.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{ConfigCatalog, ParameterKind, RunConfig, StudyConfig};
use crate::cutoff::{select_cutoff, CutoffOutcome, LinePrompt};
use crate::error::Result;
use crate::executor::RunExecutor;
use crate::series::{find_series_file, load_series, steady_state_mean};
use crate::stats::group_results;
use crate::store::{ResultStore, RunResult};

/// Outcome of processing a single configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A new result was computed and persisted.
    Processed,
    /// The store already held a result for this identity; no-op.
    AlreadyProcessed,
    /// The operator skipped the run; no result produced.
    Skipped,
    /// External execution or parsing failed; no result produced.
    Failed,
    /// The input channel closed; the workflow stops.
    Aborted,
}

/// Counts reported after a workflow pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowReport {
    pub processed: usize,
    pub already_processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
}

/// Drives catalog discovery, external execution, cutoff selection,
/// reduction and persistence for a whole study batch.
pub struct Workflow<E: RunExecutor, P: LinePrompt> {
    catalog: ConfigCatalog,
    store: ResultStore,
    executor: E,
    prompt: P,
    /// Root under which the external observe step leaves the raw series.
    output_root: PathBuf,
    interrupted: Arc<AtomicBool>,
}

impl<E: RunExecutor, P: LinePrompt> Workflow<E, P> {
    pub fn new(
        catalog: ConfigCatalog,
        store: ResultStore,
        executor: E,
        prompt: P,
        output_root: PathBuf,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Workflow {
            catalog,
            store,
            executor,
            prompt,
            output_root,
            interrupted,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Executes the complete workflow pass.
    pub fn run(&mut self) -> Result<WorkflowReport> {
        let mut report = WorkflowReport::default();

        if !self.store.is_empty() {
            self.prompt.say(&format!(
                "Found {} existing processed results",
                self.store.len()
            ));
            match self.ask_yes_no("Generate final summary from existing data? [y/n]: ")? {
                Some(true) => {
                    self.print_summary();
                    return Ok(report);
                }
                Some(false) => (),
                None => {
                    report.interrupted = true;
                    return Ok(report);
                }
            }
        }

        let configs = self.catalog.list_configs();
        if configs.is_empty() {
            self.prompt
                .say("No configuration files found, nothing to do.");
            return Ok(report);
        }

        let remaining: Vec<PathBuf> = configs
            .iter()
            .filter(|c| !self.store.contains(&c.to_string_lossy()))
            .cloned()
            .collect();
        self.prompt.say(&format!(
            "Found {} configurations to process ({} already processed, {} remaining)",
            configs.len(),
            configs.len() - remaining.len(),
            remaining.len()
        ));

        let total = remaining.len();
        for (i, config_path) in remaining.into_iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("interrupt received, stopping; persisted results remain intact");
                report.interrupted = true;
                break;
            }
            self.prompt
                .say(&format!(">>> Run {}/{} <<<", i + 1, total));
            match self.process_single(config_path)? {
                RunOutcome::Processed => report.processed += 1,
                RunOutcome::AlreadyProcessed => report.already_processed += 1,
                RunOutcome::Skipped => report.skipped += 1,
                RunOutcome::Failed => {
                    report.failed += 1;
                    self.prompt
                        .say("Run processing failed - continuing with next run...");
                }
                RunOutcome::Aborted => {
                    report.interrupted = true;
                    break;
                }
            }
        }

        if !self.store.is_empty() && !report.interrupted {
            match self.ask_yes_no("Generate final study summary? [y/n]: ")? {
                Some(true) => self.print_summary(),
                _ => (),
            }
        }

        Ok(report)
    }

    /// Processes one configuration through the complete pipeline:
    /// execute, discover series, select cutoff, reduce, persist.
    pub fn process_single(&mut self, config_path: PathBuf) -> Result<RunOutcome> {
        let config = match RunConfig::from_path(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("cannot process config: {}", e);
                return Ok(RunOutcome::Failed);
            }
        };
        let identity = config.identity();

        self.prompt.say(&format!(
            "PROCESSING: {}={}, run {}",
            config.kind, config.value, config.run
        ));

        if let Some(existing) = self.store.get(&identity) {
            self.prompt.say(&format!(
                "Already processed (cutoff: {}, mean: {:.6})",
                existing.cutoff_step, existing.steady_state_mean
            ));
            return Ok(RunOutcome::AlreadyProcessed);
        }

        match self.executor.execute(&config) {
            Ok(true) => (),
            Ok(false) => {
                self.prompt.say("Skipping due to simulation failure");
                return Ok(RunOutcome::Failed);
            }
            Err(e) => {
                error!("executor error for {}: {}", identity, e);
                return Ok(RunOutcome::Failed);
            }
        }

        let series = match find_series_file(&self.output_root).and_then(|f| load_series(&f)) {
            Ok(s) => s,
            Err(e) => {
                warn!("no usable raw series for {}: {}", identity, e);
                return Ok(RunOutcome::Failed);
            }
        };

        let cutoff_step = match select_cutoff(&series, &mut self.prompt)? {
            CutoffOutcome::Chosen { cutoff_step, .. } => cutoff_step,
            CutoffOutcome::Skipped => {
                self.prompt.say("Skipping run (no cutoff specified)");
                return Ok(RunOutcome::Skipped);
            }
            CutoffOutcome::Aborted => return Ok(RunOutcome::Aborted),
        };

        // independent recomputation; the selector preview is advisory
        let mean = steady_state_mean(&series, cutoff_step)?;

        let study_config = match StudyConfig::load(&config) {
            Ok(c) => c,
            Err(e) => {
                error!("cannot parse config document {}: {}", identity, e);
                return Ok(RunOutcome::Failed);
            }
        };

        let result = RunResult {
            config_file: identity.clone(),
            parameter_type: config.kind,
            parameter_value: config.value,
            run_number: config.run,
            cutoff_step,
            steady_state_mean: mean,
            total_steps: study_config.total_steps(),
            seed: study_config.seed(),
        };
        self.store.append_and_persist(result)?;

        self.prompt.say(&format!(
            "Processed successfully: {} = {}, cutoff {} steps, steady-state mean {:.6}",
            config.kind, config.value, cutoff_step, mean
        ));
        Ok(RunOutcome::Processed)
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<Option<bool>> {
        match self.prompt.read_line(question)? {
            Some(line) => {
                let answer = line.trim().to_lowercase();
                Ok(Some(answer == "y" || answer == "yes"))
            }
            None => Ok(None),
        }
    }

    /// Prints grouped statistics per sweep in the final-report shape.
    /// Plotting itself is an external concern; everything it needs is
    /// recomputable from the store without resimulation.
    fn print_summary(&mut self) {
        self.prompt.say("FINAL RESULTS SUMMARY");
        for (kind, label) in [
            (ParameterKind::Noise, "ETA STUDY:"),
            (ParameterKind::Density, "RHO STUDY:"),
        ]
        .iter()
        {
            let groups = group_results(self.store.results(), *kind);
            if groups.is_empty() {
                continue;
            }
            self.prompt.say(label);
            for g in groups {
                self.prompt.say(&format!(
                    "  {} = {:4.1}: <v_a> = {:.4} +/- {:.4} (sigma = {:.4}, n={})",
                    kind.tag(),
                    g.parameter_value,
                    g.mean,
                    g.standard_error,
                    g.std_dev,
                    g.runs
                ));
            }
        }
        self.prompt
            .say(&format!("Total processed runs: {}", self.store.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutoff::ScriptedPrompt;
    use crate::{CONFIGS_DIR_NAME, ORDER_PARAMETER_DIR_NAME};
    use std::fs;
    use std::path::Path;

    /// Plants a canned raw series instead of invoking a simulator.
    struct FakeExecutor {
        output_root: PathBuf,
        series_body: String,
        succeed: bool,
        calls: usize,
    }

    impl FakeExecutor {
        fn new(output_root: &Path, series_body: &str) -> Self {
            FakeExecutor {
                output_root: output_root.to_path_buf(),
                series_body: series_body.to_string(),
                succeed: true,
                calls: 0,
            }
        }
    }

    impl RunExecutor for FakeExecutor {
        fn execute(&mut self, _config: &RunConfig) -> Result<bool> {
            self.calls += 1;
            if !self.succeed {
                return Ok(false);
            }
            let dir = self.output_root.join(ORDER_PARAMETER_DIR_NAME);
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("v_a.txt"), &self.series_body)?;
            Ok(true)
        }
    }

    fn write_config(root: &Path, name: &str) {
        let dir = root.join("eta_study").join(CONFIGS_DIR_NAME);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(name),
            r#"{"r": 1.0, "v": 0.03, "l": 20.0, "n": 800, "steps": 200,
                "noise": 1.0, "seed": 7}"#,
        )
        .unwrap();
    }

    fn fixture_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("vicsek_workflow_{}", tag));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn workflow_at(
        root: &Path,
        prompt: ScriptedPrompt,
    ) -> Workflow<FakeExecutor, ScriptedPrompt> {
        Workflow::new(
            ConfigCatalog::new(root),
            ResultStore::load(root.join("results.json")),
            FakeExecutor::new(root, "0.1\n0.3\n0.5\n0.7\n0.9\n"),
            prompt,
            root.to_path_buf(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn workflow_processes_batch_and_persists() {
        let root = fixture_root("batch");
        write_config(&root, "eta_1.0_run_1.json");
        write_config(&root, "eta_1.0_run_2.json");

        // per run: cutoff 10 (sample 2) and confirm; decline final summary
        let prompt = ScriptedPrompt::new(&["10", "y", "10", "y", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 0);
        assert!(!report.interrupted);

        let store = ResultStore::load(root.join("results.json"));
        assert_eq!(store.len(), 2);
        // mean of [0.5, 0.7, 0.9], seed carried over from the config
        assert!((store.results()[0].steady_state_mean - 0.7).abs() < 1e-12);
        assert_eq!(store.results()[0].seed, Some(7));
        assert_eq!(store.results()[0].total_steps, 200);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_is_idempotent_per_identity() {
        let root = fixture_root("idem");
        write_config(&root, "eta_1.0_run_1.json");

        let prompt = ScriptedPrompt::new(&["0", "y", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        workflow.run().unwrap();
        assert_eq!(workflow.store().len(), 1);

        // second pass over the same batch: decline the existing-data
        // summary, the lone config is a reported no-op
        let prompt = ScriptedPrompt::new(&["n", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(workflow.store().len(), 1);

        // direct re-processing of the identity reports the first result
        let config = root
            .join("eta_study")
            .join(CONFIGS_DIR_NAME)
            .join("eta_1.0_run_1.json");
        let outcome = workflow.process_single(config).unwrap();
        assert_eq!(outcome, RunOutcome::AlreadyProcessed);
        assert_eq!(workflow.store().len(), 1);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_resumes_after_partial_pass() {
        let root = fixture_root("resume");
        write_config(&root, "eta_1.0_run_1.json");
        write_config(&root, "eta_2.0_run_1.json");

        // first pass: process the first run, skip the second
        let prompt = ScriptedPrompt::new(&["0", "y", "skip", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);

        // second pass: only the skipped run remains
        let prompt = ScriptedPrompt::new(&["n", "0", "y", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.already_processed, 0);

        let store = ResultStore::load(root.join("results.json"));
        assert_eq!(store.len(), 2);
        let mut identities: Vec<&str> =
            store.results().iter().map(|r| r.config_file.as_str()).collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), 2);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_skips_failed_runs_without_result() {
        let root = fixture_root("fail");
        write_config(&root, "eta_1.0_run_1.json");

        let prompt = ScriptedPrompt::new(&["n"]);
        let mut workflow = workflow_at(&root, prompt);
        workflow.executor.succeed = false;
        let report = workflow.run().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 0);
        assert!(workflow.store().is_empty());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_reports_nothing_to_do() {
        let root = fixture_root("empty");
        let prompt = ScriptedPrompt::new(&[]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report, WorkflowReport::default());
        assert!(workflow
            .prompt
            .said
            .iter()
            .any(|m| m.contains("nothing to do")));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_stops_on_interrupt_between_runs() {
        let root = fixture_root("interrupt");
        write_config(&root, "eta_1.0_run_1.json");

        let prompt = ScriptedPrompt::new(&["0", "y", "n"]);
        let interrupted = Arc::new(AtomicBool::new(true));
        let mut workflow = Workflow::new(
            ConfigCatalog::new(&root),
            ResultStore::load(root.join("results.json")),
            FakeExecutor::new(&root, "0.1\n0.2\n"),
            prompt,
            root.clone(),
            interrupted,
        );
        let report = workflow.run().unwrap();
        assert!(report.interrupted);
        assert_eq!(report.processed, 0);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn workflow_summarizes_existing_data_and_exits() {
        let root = fixture_root("summary");
        write_config(&root, "eta_1.0_run_1.json");

        let prompt = ScriptedPrompt::new(&["0", "y", "n"]);
        let mut workflow = workflow_at(&root, prompt);
        workflow.run().unwrap();

        let prompt = ScriptedPrompt::new(&["y"]);
        let mut workflow = workflow_at(&root, prompt);
        let report = workflow.run().unwrap();
        assert_eq!(report.processed, 0);
        assert!(workflow
            .prompt
            .said
            .iter()
            .any(|m| m.contains("FINAL RESULTS SUMMARY")));

        fs::remove_dir_all(&root).unwrap();
    }
}
