//! External simulator invocation.
//!
//! The simulator and the observable-computation step are opaque external
//! processes. They produce their output as a side effect on a known
//! output location, never as a return value, so the executor only reports
//! success or failure. The workflow is generic over [`RunExecutor`] so
//! tests can substitute a fake that plants canned raw series instead of
//! running anything.
//!
//! [`RunExecutor`]: trait.RunExecutor.html

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::RunConfig;
use crate::error::{Error, Result};

/// Placeholder in command templates substituted with the config document
/// path relative to the working directory.
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// Capability interface over the external simulation engine.
pub trait RunExecutor {
    /// Executes the simulate and observe steps for one configuration.
    /// `Ok(false)` means an external step failed; the run is skipped, not
    /// retried. Errors are reserved for the executor itself misbehaving.
    fn execute(&mut self, config: &RunConfig) -> Result<bool>;
}

/// Invokes the external engine as two subprocesses per run: a simulate
/// step followed by an observable-computation step. Both must exit 0.
/// Captured output streams are surfaced only on failure.
pub struct SubprocessExecutor {
    working_dir: PathBuf,
    simulate_cmd: Vec<String>,
    observe_cmd: Vec<String>,
}

impl SubprocessExecutor {
    pub fn new(
        working_dir: PathBuf,
        simulate_cmd: Vec<String>,
        observe_cmd: Vec<String>,
    ) -> Self {
        SubprocessExecutor {
            working_dir,
            simulate_cmd,
            observe_cmd,
        }
    }

    /// Command templates reproducing the reference engine invocation.
    pub fn default_simulate_cmd() -> Vec<String> {
        vec![
            "mvn".to_string(),
            "exec:java".to_string(),
            "-Dexec.mainClass=ar.edu.itba.sims.Main".to_string(),
            format!("-Dinput={}", CONFIG_PLACEHOLDER),
            "-Dexec.cleanupDaemonThreads=true".to_string(),
        ]
    }

    pub fn default_observe_cmd() -> Vec<String> {
        vec![
            "mvn".to_string(),
            "exec:java".to_string(),
            "-Dexec.mainClass=ar.edu.itba.sims.Observables".to_string(),
            "-Dexec.args=v_a".to_string(),
            "-Dexec.cleanupDaemonThreads=true".to_string(),
        ]
    }

    fn run_command(&self, template: &[String], config: &RunConfig) -> Result<bool> {
        if template.is_empty() {
            return Err(Error::Other("empty external command template".to_string()));
        }
        let config_rel = relative_to(&config.path, &self.working_dir);
        let args: Vec<String> = template
            .iter()
            .map(|a| a.replace(CONFIG_PLACEHOLDER, &config_rel))
            .collect();
        debug!("invoking external process: {:?}", args);

        let output = Command::new(&args[0])
            .args(&args[1..])
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| Error::ProcessSpawnError(args[0].clone(), e.to_string()))?;

        if output.status.success() {
            Ok(true)
        } else {
            error!(
                "external process {:?} exited with {}",
                args, output.status
            );
            error!("stdout: {}", String::from_utf8_lossy(&output.stdout));
            error!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            Ok(false)
        }
    }
}

impl RunExecutor for SubprocessExecutor {
    fn execute(&mut self, config: &RunConfig) -> Result<bool> {
        info!("running simulation for {}", config.identity());
        if !self.run_command(&self.simulate_cmd, config)? {
            return Ok(false);
        }
        info!("computing order parameter for {}", config.identity());
        self.run_command(&self.observe_cmd, config)
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

#[test]
fn config_placeholder_is_substituted() {
    let template = SubprocessExecutor::default_simulate_cmd();
    let substituted: Vec<String> = template
        .iter()
        .map(|a| a.replace(CONFIG_PLACEHOLDER, "c/eta_study/configs/eta_1.0_run_1.json"))
        .collect();
    assert!(substituted
        .iter()
        .any(|a| a == "-Dinput=c/eta_study/configs/eta_1.0_run_1.json"));
}

#[test]
fn relative_to_strips_base_prefix() {
    let base = Path::new("/work/study");
    let path = Path::new("/work/study/configs/eta_1.0_run_1.json");
    assert_eq!(relative_to(path, base), "configs/eta_1.0_run_1.json");
    // paths outside the base are passed through untouched
    let foreign = Path::new("/elsewhere/x.json");
    assert_eq!(relative_to(foreign, base), "/elsewhere/x.json");
}
