//! Run manifest (`annotate.json`)
//!
//! Records what was run, against which databases, how every task ended and
//! a SHA-256 fingerprint of each output.

use crate::engine::{RunReport, TaskOutcome};
use crate::error::Result;
use crate::io::write_file;
use chrono::{DateTime, Utc};
use genanno_common::checksum::sha256_file;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "annotate.json";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutputEntry {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub version: String,
    pub prefix: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub inputs: BTreeMap<String, PathBuf>,
    /// Search command lines per target
    pub software: BTreeMap<String, String>,
    pub databases: BTreeMap<String, PathBuf>,
    pub tasks: Vec<TaskOutcome>,
    pub outputs: Vec<OutputEntry>,
}

impl RunManifest {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            prefix: prefix.into(),
            started_at: Utc::now(),
            finished_at: None,
            inputs: BTreeMap::new(),
            software: BTreeMap::new(),
            databases: BTreeMap::new(),
            tasks: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(&mut self, name: impl Into<String>, path: &Path) {
        self.inputs.insert(name.into(), path.to_path_buf());
    }

    pub fn software(&mut self, name: impl Into<String>, invocation: impl Into<String>) {
        self.software.insert(name.into(), invocation.into());
    }

    pub fn database(&mut self, name: impl Into<String>, path: &Path) {
        self.databases.insert(name.into(), path.to_path_buf());
    }

    pub fn record_report(&mut self, report: &RunReport) {
        self.tasks = report.tasks.clone();
    }

    /// Fingerprint an output file
    pub fn add_output(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::metadata(path)?.len();
        let sha256 = sha256_file(path)?;
        self.outputs.push(OutputEntry {
            path: path.to_path_buf(),
            bytes,
            sha256,
        });
        Ok(())
    }

    /// Stamp the finish time and write pretty JSON to `path`
    pub fn write(&mut self, path: &Path) -> Result<()> {
        self.finished_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self)?;
        write_file(path, &format!("{}\n", json))
    }
}
