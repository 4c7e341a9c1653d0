//! Run configuration discovery and parsing.
//!
//! A study batch is laid out on disk as two independent parameter sweeps,
//! each a directory of JSON config documents named
//! `{tag}_{value}_run_{n}.json` where the tag is `eta` (noise) or `rho`
//! (density). The file name is the identity of a run; the document body
//! carries the simulation parameters handed to the external process.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::util::find_files_with_extension;
use crate::CONFIGS_DIR_NAME;

/// Directory names of the two fixed parameter sweeps, relative to the
/// study root.
pub const SWEEP_DIR_NAMES: &[&str] = &["eta_study", "rho_study"];

/// Extension of run configuration documents.
const CONFIG_EXTENSION: &str = "json";

/// Control parameter swept by a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Angular noise amplitude, tag `eta`.
    #[serde(rename = "eta")]
    Noise,
    /// Particle density, tag `rho`.
    #[serde(rename = "rho")]
    Density,
}

impl ParameterKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ParameterKind::Noise => "eta",
            ParameterKind::Density => "rho",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "eta" => Ok(ParameterKind::Noise),
            "rho" => Ok(ParameterKind::Density),
            _ => Err(Error::UnknownParameterTag(tag.to_string())),
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Parses a filename-shaped run identity of the form
/// `{tag}_{value}_run_{n}` (a trailing `.json` is ignored).
///
/// Any other shape is a hard error for that single identity.
pub fn parse_identity(name: &str) -> Result<(ParameterKind, f64, u32)> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 4 || parts[2] != "run" {
        return Err(Error::InvalidConfigIdentity(name.to_string()));
    }
    let kind = ParameterKind::from_tag(parts[0])
        .map_err(|_| Error::InvalidConfigIdentity(name.to_string()))?;
    let value = parts[1].parse::<f64>()?;
    let run = parts[3].parse::<u32>()?;
    if run < 1 {
        return Err(Error::InvalidConfigIdentity(name.to_string()));
    }
    Ok((kind, value, run))
}

/// Identity of a single run, discovered from a config document path.
/// Immutable once discovered.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Path of the config document, used as the stable identity string.
    pub path: PathBuf,
    pub kind: ParameterKind,
    pub value: f64,
    pub run: u32,
}

impl RunConfig {
    /// Creates a run identity from a config document path by parsing its
    /// file name.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidConfigIdentity(path.to_string_lossy().to_string()))?;
        let (kind, value, run) = parse_identity(name)?;
        Ok(RunConfig {
            path,
            kind,
            value,
            run,
        })
    }

    /// Identity string as stored in the result document.
    pub fn identity(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Common simulation parameters shared by both study variants, as found
/// in the config document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// Interaction radius.
    pub r: f64,
    /// Particle velocity.
    pub v: f64,
    /// Box length.
    pub l: f64,
    /// Particle count.
    pub n: u32,
    /// Total simulation steps.
    pub steps: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseStudyConfig {
    /// Noise amplitude eta, the swept parameter.
    pub noise: f64,
    #[serde(flatten)]
    pub params: SimParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityStudyConfig {
    /// Fixed noise amplitude used while density is swept.
    pub noise: f64,
    #[serde(flatten)]
    pub params: SimParams,
}

impl DensityStudyConfig {
    /// Density implied by particle count and box size.
    pub fn density(&self) -> f64 {
        self.params.n as f64 / (self.params.l * self.params.l)
    }
}

/// Typed run configuration document. The variant is selected by the
/// identity tag, so a malformed document fails at parse time instead of
/// at some later field access.
#[derive(Debug, Clone, PartialEq)]
pub enum StudyConfig {
    Noise(NoiseStudyConfig),
    Density(DensityStudyConfig),
}

impl StudyConfig {
    /// Loads and parses the config document behind a run identity.
    pub fn load(run: &RunConfig) -> Result<Self> {
        let content = crate::util::read_text_file(&run.path)?;
        match run.kind {
            ParameterKind::Noise => Ok(StudyConfig::Noise(serde_json::from_str(&content)?)),
            ParameterKind::Density => Ok(StudyConfig::Density(serde_json::from_str(&content)?)),
        }
    }

    pub fn params(&self) -> &SimParams {
        match self {
            StudyConfig::Noise(c) => &c.params,
            StudyConfig::Density(c) => &c.params,
        }
    }

    pub fn total_steps(&self) -> u64 {
        self.params().steps
    }

    pub fn seed(&self) -> Option<u64> {
        self.params().seed
    }
}

/// Enumerates the config documents of the two parameter sweeps.
///
/// Scanning has no side effects; absent sweep directories simply
/// contribute nothing, so a missing study root yields an empty batch and
/// the controller reports there is nothing to do.
#[derive(Debug, Clone)]
pub struct ConfigCatalog {
    root: PathBuf,
}

impl ConfigCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        ConfigCatalog { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the deterministic sorted union of config document paths
    /// across both sweeps. Identities are parsed later, one by one, so a
    /// single unparsable name doesn't fail the whole batch.
    pub fn list_configs(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for sweep in SWEEP_DIR_NAMES {
            let dir = self.root.join(sweep).join(CONFIGS_DIR_NAME);
            if !dir.is_dir() {
                debug!("sweep config dir not present: {}", dir.to_string_lossy());
                continue;
            }
            paths.extend(find_files_with_extension(&dir, CONFIG_EXTENSION));
        }
        paths.sort();
        paths
    }
}

#[test]
fn parse_identity_noise() {
    let (kind, value, run) = parse_identity("eta_1.2_run_3.json").unwrap();
    assert_eq!(kind, ParameterKind::Noise);
    assert!((value - 1.2).abs() < 1e-12);
    assert_eq!(run, 3);
}

#[test]
fn parse_identity_density() {
    let (kind, value, run) = parse_identity("rho_0.5_run_12").unwrap();
    assert_eq!(kind, ParameterKind::Density);
    assert!((value - 0.5).abs() < 1e-12);
    assert_eq!(run, 12);
}

#[test]
fn parse_identity_rejects_garbage() {
    assert!(parse_identity("bogus.json").is_err());
    assert!(parse_identity("eta_1.2_step_3.json").is_err());
    assert!(parse_identity("phi_1.2_run_3.json").is_err());
    assert!(parse_identity("eta_abc_run_3.json").is_err());
    assert!(parse_identity("eta_1.2_run_x.json").is_err());
    assert!(parse_identity("eta_1.2_run_0.json").is_err());
}

#[test]
fn study_config_parses_typed_document() {
    let doc = r#"{"r": 1.0, "v": 0.03, "l": 20.0, "n": 800, "steps": 2000,
                  "noise": 1.2, "seed": 42, "interaction": "average"}"#;
    let config: NoiseStudyConfig = serde_json::from_str(doc).unwrap();
    assert!((config.noise - 1.2).abs() < 1e-12);
    assert_eq!(config.params.steps, 2000);
    assert_eq!(config.params.seed, Some(42));
}

#[test]
fn study_config_rejects_missing_fields() {
    // no particle count
    let doc = r#"{"r": 1.0, "v": 0.03, "l": 20.0, "steps": 2000, "noise": 1.2}"#;
    assert!(serde_json::from_str::<NoiseStudyConfig>(doc).is_err());
}

#[test]
fn catalog_lists_sorted_union() {
    use std::fs;
    let root = std::env::temp_dir().join("vicsek_catalog_test");
    let eta_dir = root.join("eta_study").join(CONFIGS_DIR_NAME);
    let rho_dir = root.join("rho_study").join(CONFIGS_DIR_NAME);
    fs::create_dir_all(&eta_dir).unwrap();
    fs::create_dir_all(&rho_dir).unwrap();
    fs::write(eta_dir.join("eta_1.2_run_2.json"), "{}").unwrap();
    fs::write(eta_dir.join("eta_1.2_run_1.json"), "{}").unwrap();
    fs::write(rho_dir.join("rho_0.5_run_1.json"), "{}").unwrap();
    fs::write(rho_dir.join("notes.txt"), "ignored").unwrap();

    let catalog = ConfigCatalog::new(&root);
    let configs = catalog.list_configs();
    assert_eq!(configs.len(), 3);
    let mut sorted = configs.clone();
    sorted.sort();
    assert_eq!(configs, sorted);

    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn catalog_empty_when_root_absent() {
    let catalog = ConfigCatalog::new("/definitely/not/a/real/path");
    assert!(catalog.list_configs().is_empty());
}
