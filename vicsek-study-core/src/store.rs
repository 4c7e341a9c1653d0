//! Durable per-run result records.
//!
//! Results are kept as a single JSON array document, rewritten in full
//! after every successfully processed run (last-writer-wins persistence,
//! not an append log). The store is owned by exactly one workflow
//! process; it carries no lock, so concurrent workflow instances writing
//! the same document lose updates. That constraint is documented here on
//! purpose rather than papered over.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ParameterKind;
use crate::error::Result;

/// Steady-state reduction of one successfully processed run. Created at
/// most once per config identity, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Config document path, the unique identity of the run.
    pub config_file: String,
    pub parameter_type: ParameterKind,
    pub parameter_value: f64,
    pub run_number: u32,
    /// Simulation step (not series index) where steady state begins.
    pub cutoff_step: u64,
    pub steady_state_mean: f64,
    pub total_steps: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Ordered collection of run results backed by a JSON document.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    results: Vec<RunResult>,
}

impl ResultStore {
    /// Loads the persisted document at the given path, best-effort.
    ///
    /// A missing document yields an empty store. A document that exists
    /// but fails to decode also yields an empty store, but that is a
    /// data-loss path: the next persisted write overwrites whatever was
    /// there, so the failure is logged loudly for the operator instead of
    /// being swallowed.
    pub fn load<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        if !path.is_file() {
            debug!("no result store at {}, starting empty", path.to_string_lossy());
            return ResultStore {
                path,
                results: Vec::new(),
            };
        }
        let results = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<RunResult>>(&content) {
                Ok(results) => {
                    info!("loaded {} previous results", results.len());
                    results
                }
                Err(e) => {
                    warn!(
                        "result store at {} is unreadable ({}); starting empty, \
                         existing data will be overwritten on the next save",
                        path.to_string_lossy(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(
                    "failed reading result store at {} ({}); starting empty",
                    path.to_string_lossy(),
                    e
                );
                Vec::new()
            }
        };
        ResultStore { path, results }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Membership check used by the controller to skip already-processed
    /// configs. This pre-check, not a storage constraint, is what keeps
    /// the document free of duplicate identities.
    pub fn contains(&self, config_identity: &str) -> bool {
        self.results.iter().any(|r| r.config_file == config_identity)
    }

    pub fn get(&self, config_identity: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.config_file == config_identity)
    }

    /// Appends a result and rewrites the whole persisted document.
    pub fn append_and_persist(&mut self, result: RunResult) -> Result<()> {
        self.results.push(result);
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let document = serde_json::to_string_pretty(&self.results)?;
        fs::write(&self.path, document)?;
        info!("saved {} results", self.results.len());
        Ok(())
    }
}

#[test]
fn store_round_trips_results_with_seed() {
    let path = std::env::temp_dir().join("vicsek_store_roundtrip_test.json");
    let _ = fs::remove_file(&path);

    let mut store = ResultStore::load(&path);
    assert!(store.is_empty());
    store
        .append_and_persist(RunResult {
            config_file: "configs/eta_1.2_run_3.json".to_string(),
            parameter_type: ParameterKind::Noise,
            parameter_value: 1.2,
            run_number: 3,
            cutoff_step: 500,
            steady_state_mean: 0.73,
            total_steps: 2000,
            seed: Some(42),
        })
        .unwrap();

    let reloaded = ResultStore::load(&path);
    assert_eq!(reloaded.len(), 1);
    let result = reloaded.get("configs/eta_1.2_run_3.json").unwrap();
    assert_eq!(result.seed, Some(42));
    assert_eq!(result.cutoff_step, 500);
    assert!(reloaded.contains("configs/eta_1.2_run_3.json"));
    assert!(!reloaded.contains("configs/eta_1.2_run_4.json"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn store_loads_documents_without_seed() {
    let path = std::env::temp_dir().join("vicsek_store_noseed_test.json");
    fs::write(
        &path,
        r#"[{"config_file": "configs/rho_0.5_run_1.json",
            "parameter_type": "rho", "parameter_value": 0.5,
            "run_number": 1, "cutoff_step": 100,
            "steady_state_mean": 0.41, "total_steps": 2000}]"#,
    )
    .unwrap();

    let store = ResultStore::load(&path);
    assert_eq!(store.len(), 1);
    assert_eq!(store.results()[0].seed, None);

    fs::remove_file(&path).unwrap();
}

#[test]
fn store_falls_back_to_empty_on_corrupt_document() {
    let path = std::env::temp_dir().join("vicsek_store_corrupt_test.json");
    fs::write(&path, "{ not json ]").unwrap();

    let store = ResultStore::load(&path);
    assert!(store.is_empty());

    fs::remove_file(&path).unwrap();
}
