//! Database search adapters
//!
//! One adapter per [`DatabaseTarget`]. An adapter renders the shell script
//! that searches one protein chunk, names the raw output file for that chunk,
//! and declares how to parse it ([`RawHitSchema`]). Nothing is shared between
//! chunks: each (chunk, target) pair owns its own raw file.

pub mod schema;

pub use schema::{split_go_terms, RawHitSchema, BLAST_COLUMNS};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::models::DatabaseTarget;
use std::path::{Path, PathBuf};

/// Fixed search parameters for one target
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub evalue: f64,
    pub max_target_seqs: u32,
    pub threads: usize,
    pub applications: Vec<String>,
}

/// Renders and validates the search for one target
#[derive(Debug, Clone)]
pub struct SearchAdapter {
    target: DatabaseTarget,
    params: SearchParams,
    executable: String,
    database: Option<PathBuf>,
    /// Lookup tables the canonicalizer will read; checked up front
    lookups: Vec<PathBuf>,
}

impl SearchAdapter {
    pub fn new(target: DatabaseTarget, config: &PipelineConfig) -> Self {
        let executable = if target.uses_diamond() {
            config.tools.diamond.clone()
        } else {
            config.tools.interproscan.clone()
        };

        let dbs = &config.databases;
        let lookups = match target {
            DatabaseTarget::Kegg => dbs.kegg_ko_map.iter().cloned().collect(),
            DatabaseTarget::Cog => dbs.cog_definitions.iter().cloned().collect(),
            DatabaseTarget::FunctionalMotif => dbs
                .tigrfams_link
                .iter()
                .chain(dbs.go_obo.iter())
                .cloned()
                .collect(),
            DatabaseTarget::Refseq | DatabaseTarget::SwissProt => Vec::new(),
        };

        Self {
            target,
            params: SearchParams {
                evalue: config.search.evalue,
                max_target_seqs: config.search.max_target_seqs,
                threads: config.run.threads,
                applications: config.search.interproscan_applications.clone(),
            },
            executable,
            database: dbs.diamond_db(target).map(Path::to_path_buf),
            lookups,
        }
    }

    pub fn target(&self) -> DatabaseTarget {
        self.target
    }

    pub fn schema(&self) -> RawHitSchema {
        RawHitSchema::for_target(self.target)
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Check that the reference data this branch needs is on disk
    ///
    /// DIAMOND accepts either the configured path or `<path>.dmnd`. Returns
    /// the database path when the target has one.
    pub fn check_reference(&self) -> Result<Option<PathBuf>> {
        for lookup in &self.lookups {
            if !lookup.is_file() {
                return Err(PipelineError::InputMissing(lookup.clone()));
            }
        }

        if !self.target.uses_diamond() {
            return Ok(None);
        }

        let db = self.database.as_ref().ok_or_else(|| {
            PipelineError::config(format!("no database configured for {}", self.target))
        })?;

        let mut dmnd = db.clone().into_os_string();
        dmnd.push(".dmnd");
        let dmnd = PathBuf::from(dmnd);

        if db.is_file() || dmnd.is_file() {
            Ok(Some(db.clone()))
        } else {
            Err(PipelineError::InputMissing(db.clone()))
        }
    }

    /// Raw output path for a chunk: `<dir>/<chunk stem>.<suffix>`
    pub fn raw_output(&self, chunk: &Path, dir: &Path) -> PathBuf {
        let stem = chunk
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk".to_string());
        dir.join(format!("{}.{}", stem, self.target.raw_suffix()))
    }

    /// Shell script searching one chunk into `raw_output`
    pub fn script(&self, chunk: &Path, raw_output: &Path) -> String {
        let mut script = String::from("set -euo pipefail\n");

        if self.target.uses_diamond() {
            let db = self
                .database
                .as_deref()
                .map(shell_quote)
                .unwrap_or_else(|| "''".to_string());
            script.push_str(&format!(
                "{exe} blastp --query {query} --db {db} \\\n  --outfmt 6 {cols} \\\n  --max-target-seqs {n} --evalue {evalue:e} --threads {threads} \\\n  --out {out}\n",
                exe = shell_quote(Path::new(&self.executable)),
                query = shell_quote(chunk),
                db = db,
                cols = BLAST_COLUMNS.join(" "),
                n = self.params.max_target_seqs,
                evalue = self.params.evalue,
                threads = self.params.threads,
                out = shell_quote(raw_output),
            ));
        } else {
            script.push_str(&format!(
                "{exe} -i {query} -appl {apps} -iprlookup -goterms -t p -f TSV \\\n  -cpu {threads} -o {out}\n",
                exe = shell_quote(Path::new(&self.executable)),
                query = shell_quote(chunk),
                apps = self.params.applications.join(","),
                threads = self.params.threads,
                out = shell_quote(raw_output),
            ));
        }

        script
    }

    /// The command line recorded in the run manifest
    pub fn invocation(&self) -> String {
        if self.target.uses_diamond() {
            format!(
                "{} blastp --outfmt 6 {} --max-target-seqs {} --evalue {:e} --threads {}",
                self.executable,
                BLAST_COLUMNS.join(" "),
                self.params.max_target_seqs,
                self.params.evalue,
                self.params.threads
            )
        } else {
            format!(
                "{} -appl {} -iprlookup -goterms -t p -f TSV",
                self.executable,
                self.params.applications.join(",")
            )
        }
    }
}

/// Single-quote a path for POSIX shells
pub fn shell_quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    if !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:,@".contains(c))
    {
        return text.into_owned();
    }
    format!("'{}'", text.replace('\'', r"'\''"))
}
