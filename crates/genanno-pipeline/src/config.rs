//! Pipeline configuration
//!
//! Values are layered with `figment`, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`genanno --config genanno.toml`)
//! 3. `GENANNO_*` environment variables, nested with `__`
//!    (`GENANNO_RUN__THREADS=16`, `GENANNO_DATABASES__KEGG=/db/kegg.dmnd`)
//! 4. command-line flags, applied by the CLI after extraction
//!
//! A `.env` file in the working directory is loaded first with `dotenvy`.

use crate::canonical::Thresholds;
use crate::error::{PipelineError, Result};
use crate::models::DatabaseTarget;
use crate::partition::DEFAULT_CHUNK_RESIDUES;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Defaults
// ============================================================================

/// Default output prefix
pub const DEFAULT_PREFIX: &str = "out";

/// Default evalue ceiling for DIAMOND searches
pub const DEFAULT_EVALUE: f64 = 1e-6;

/// Default minimum query coverage (percent) for DIAMOND hits
pub const DEFAULT_COVERAGE: f64 = 30.0;

/// Default hits kept per query by DIAMOND
pub const DEFAULT_MAX_TARGET_SEQS: u32 = 5;

/// Default evalue ceiling for InterProScan signature matches
pub const DEFAULT_MOTIF_EVALUE: f64 = 1.0;

/// Default threads per search task
pub const DEFAULT_THREADS: usize = 4;

/// Default number of tasks running at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default seconds between progress reports
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GENANNO_";

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub run: RunConfig,
    pub search: SearchConfig,
    pub tools: ToolsConfig,
    pub databases: DatabasesConfig,
}

/// Run layout and scheduling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub prefix: String,
    pub work_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Threads handed to each search tool invocation
    pub threads: usize,
    /// Maximum tasks running at once
    pub concurrency: usize,
    pub poll_interval_secs: u64,
    /// Residue budget per protein chunk
    pub chunk_residues: u64,
    /// Interpreter for generated task scripts
    pub shell: String,
    pub targets: Vec<DatabaseTarget>,
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            work_dir: PathBuf::from("work"),
            out_dir: PathBuf::from("."),
            threads: DEFAULT_THREADS,
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            chunk_residues: DEFAULT_CHUNK_RESIDUES,
            shell: "bash".to_string(),
            targets: DatabaseTarget::ALL.to_vec(),
            progress: false,
        }
    }
}

/// Search and filtering thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub evalue: f64,
    /// Minimum query coverage in percent
    pub coverage: f64,
    /// Minimum subject coverage in percent (0 disables)
    pub subject_coverage: f64,
    pub max_target_seqs: u32,
    pub motif_evalue: f64,
    pub interproscan_applications: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            evalue: DEFAULT_EVALUE,
            coverage: DEFAULT_COVERAGE,
            subject_coverage: 0.0,
            max_target_seqs: DEFAULT_MAX_TARGET_SEQS,
            motif_evalue: DEFAULT_MOTIF_EVALUE,
            interproscan_applications: vec!["Pfam".to_string(), "TIGRFAM".to_string()],
        }
    }
}

/// External tool executables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub diamond: String,
    pub interproscan: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            diamond: "diamond".to_string(),
            interproscan: "interproscan.sh".to_string(),
        }
    }
}

/// Reference databases and lookup tables
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabasesConfig {
    pub refseq: Option<PathBuf>,
    pub kegg: Option<PathBuf>,
    pub cog: Option<PathBuf>,
    pub swissprot: Option<PathBuf>,
    /// `TIGRFAMS.link`: id, description, symbol, EC, GO
    pub tigrfams_link: Option<PathBuf>,
    /// COG definition table: id, functional class, description, symbol
    pub cog_definitions: Option<PathBuf>,
    /// Subject id to KO mapping
    pub kegg_ko_map: Option<PathBuf>,
    /// Gene Ontology in OBO format
    pub go_obo: Option<PathBuf>,
}

impl DatabasesConfig {
    /// DIAMOND database configured for a target
    pub fn diamond_db(&self, target: DatabaseTarget) -> Option<&Path> {
        match target {
            DatabaseTarget::Refseq => self.refseq.as_deref(),
            DatabaseTarget::Kegg => self.kegg.as_deref(),
            DatabaseTarget::Cog => self.cog.as_deref(),
            DatabaseTarget::SwissProt => self.swissprot.as_deref(),
            DatabaseTarget::FunctionalMotif => None,
        }
    }
}

impl PipelineConfig {
    /// The layered provider without CLI overrides
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load `.env`, layer defaults, TOML and environment, then validate
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(PipelineError::InputMissing(path.to_path_buf()));
            }
        }

        let config: PipelineConfig = Self::figment(config_file)
            .extract()
            .map_err(|e| PipelineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.run.prefix.trim().is_empty() {
            return Err(PipelineError::config("run.prefix cannot be empty"));
        }
        if self.run.chunk_residues == 0 {
            return Err(PipelineError::config("run.chunk_residues must be greater than 0"));
        }
        if self.run.concurrency == 0 {
            return Err(PipelineError::config("run.concurrency must be greater than 0"));
        }
        if self.run.threads == 0 {
            return Err(PipelineError::config("run.threads must be greater than 0"));
        }
        if self.run.poll_interval_secs == 0 {
            return Err(PipelineError::config("run.poll_interval_secs must be greater than 0"));
        }
        for (name, value) in [
            ("search.coverage", self.search.coverage),
            ("search.subject_coverage", self.search.subject_coverage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PipelineError::config(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("search.evalue", self.search.evalue),
            ("search.motif_evalue", self.search.motif_evalue),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(PipelineError::config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.search.max_target_seqs == 0 {
            return Err(PipelineError::config("search.max_target_seqs must be greater than 0"));
        }
        if self.search.interproscan_applications.is_empty() {
            return Err(PipelineError::config(
                "search.interproscan_applications cannot be empty",
            ));
        }
        Ok(())
    }

    /// Canonicalization thresholds for one target
    ///
    /// InterProScan matches have no meaningful query coverage, so the motif
    /// branch filters on evalue only.
    pub fn thresholds(&self, target: DatabaseTarget) -> Thresholds {
        match target {
            DatabaseTarget::FunctionalMotif => Thresholds {
                min_qcov: 0.0,
                min_scov: 0.0,
                max_evalue: self.search.motif_evalue,
            },
            _ => Thresholds {
                min_qcov: self.search.coverage,
                min_scov: self.search.subject_coverage,
                max_evalue: self.search.evalue,
            },
        }
    }
}
