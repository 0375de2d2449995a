//! End-to-end annotation run
//!
//! ```text
//! proteins ──partition──► chunks ──┬─ check ─► search ×N ─► canonicalize  (per target)
//!                                  └─ ...
//! gene model + canonical tables ──► fuse ──► GFF3, summary, merged table, species, manifest
//! ```
//!
//! Searches and canonicalization run on a [`TaskEngine`]. A target whose
//! branch fails contributes nothing; fusion still runs with the remaining
//! tables. An unreadable protein set fails every search branch without
//! submitting any task. Only a missing gene model aborts the run.

use crate::annotation_table::write_merged_table;
use crate::canonical::{self, Canonicalizer};
use crate::config::PipelineConfig;
use crate::coverage::CoverageStat;
use crate::engine::{RunReport, Task, TaskEngine, TaskId};
use crate::error::{PipelineError, Result};
use crate::fasta::ProteinSet;
use crate::fusion::{write_gff, FusionEngine, FusionInputs};
use crate::gff::GeneModel;
use crate::go::GoOntology;
use crate::io::create_output;
use crate::manifest::{RunManifest, MANIFEST_FILE};
use crate::models::{AnnotationSource, DatabaseTarget};
use crate::partition::{partition, write_chunks};
use crate::phase::{Gather, Scatter};
use crate::search::SearchAdapter;
use crate::species::write_species;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// Layout
// ============================================================================

/// Directories of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub work_dir: PathBuf,
    pub chunks_dir: PathBuf,
    pub tables_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl RunLayout {
    /// Relative directories are resolved against the current directory;
    /// task scripts run inside the work dir.
    pub fn new(work_dir: &Path, out_dir: &Path) -> Self {
        let work_dir = absolute(work_dir);
        let out_dir = absolute(out_dir);
        Self {
            chunks_dir: work_dir.join("chunks"),
            tables_dir: work_dir.join("tables"),
            work_dir,
            out_dir,
        }
    }

    /// Raw search output of one target
    pub fn raw_dir(&self, target: DatabaseTarget) -> PathBuf {
        self.work_dir.join(target.slug())
    }

    /// Raw files already present for `target`, sorted by name
    pub fn existing_raw_files(&self, target: DatabaseTarget) -> Result<Vec<PathBuf>> {
        let dir = self.raw_dir(target);
        if !dir.is_dir() {
            return Err(PipelineError::InputMissing(dir));
        }
        let suffix = format!(".{}", target.raw_suffix());
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(&suffix));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn create(&self) -> Result<()> {
        for dir in [&self.work_dir, &self.chunks_dir, &self.tables_dir, &self.out_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// File stem of a FASTA input, without `.gz` and the sequence extension
pub fn input_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proteins".to_string());
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

// ============================================================================
// Fusion outputs
// ============================================================================

/// Files written by the fusion step
#[derive(Debug, Clone)]
pub struct FusedOutputs {
    pub gff: PathBuf,
    pub summary: PathBuf,
    pub merged: PathBuf,
    pub species: PathBuf,
    pub coverage: CoverageStat,
}

impl FusedOutputs {
    pub fn paths(&self) -> [&Path; 4] {
        [&self.gff, &self.summary, &self.merged, &self.species]
    }
}

/// Fuse `inputs` onto `model` and write every final product into `out_dir`
pub fn write_fused(
    model: &GeneModel,
    inputs: &FusionInputs,
    out_dir: &Path,
    prefix: &str,
) -> Result<FusedOutputs> {
    std::fs::create_dir_all(out_dir)?;
    let fusion = FusionEngine::new().fuse(model, inputs);

    let gff = out_dir.join(format!("{}.genomic.gff3", prefix));
    let mut out = create_output(&gff)?;
    write_gff(&mut out, model, &fusion)?;
    out.flush()?;

    let coverage = CoverageStat::compute(&fusion.annotated_sets(), model.locus_count());
    let summary = out_dir.join(format!("{}.function_summary.tsv", prefix));
    coverage.write(&summary)?;

    let merged = out_dir.join(format!("{}.merge.annotate.tsv", prefix));
    write_merged_table(&merged, model, &fusion)?;

    let species = out_dir.join(format!("{}.species.tsv", prefix));
    write_species(&species, inputs.table(AnnotationSource::Refseq))?;

    info!(
        loci = model.locus_count(),
        annotated = coverage.at_least_one.count,
        out_dir = %out_dir.display(),
        "Wrote annotation products"
    );

    Ok(FusedOutputs {
        gff,
        summary,
        merged,
        species,
        coverage,
    })
}

/// Fuse canonical tables already on disk (`genanno fuse`)
pub fn fuse_tables(gff: &Path, tables_dir: &Path, prefix: &str, out_dir: &Path) -> Result<FusedOutputs> {
    let model = GeneModel::from_path(gff)?;
    let inputs = FusionInputs::load(tables_dir, prefix)?;
    write_fused(&model, &inputs, out_dir, prefix)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Result of a full run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: RunReport,
    pub outputs: FusedOutputs,
    pub manifest: PathBuf,
    /// Targets whose tables were fused
    pub completed: Vec<DatabaseTarget>,
    pub failed: Vec<DatabaseTarget>,
}

pub struct AnnotationPipeline {
    config: Arc<PipelineConfig>,
    layout: RunLayout,
}

impl AnnotationPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let layout = RunLayout::new(&config.run.work_dir, &config.run.out_dir);
        Self {
            config: Arc::new(config),
            layout,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Configured targets, each once, in configuration order
    fn targets(&self) -> Vec<DatabaseTarget> {
        let mut targets = Vec::new();
        for target in &self.config.run.targets {
            if !targets.contains(target) {
                targets.push(*target);
            }
        }
        targets
    }

    /// Submit check, search scatter and canonicalize gather of one target
    fn submit_branch<E: TaskEngine>(
        &self,
        engine: &mut E,
        target: DatabaseTarget,
        chunks: &[PathBuf],
    ) -> Result<TaskId> {
        let slug = target.slug();
        let adapter = Arc::new(SearchAdapter::new(target, &self.config));
        let raw_dir = self.layout.raw_dir(target);
        std::fs::create_dir_all(&raw_dir)?;

        let check = {
            let adapter = adapter.clone();
            engine.submit(
                Task::native(format!("check_{}", slug), move || {
                    adapter.check_reference()?;
                    Ok(())
                }),
                &[],
            )
        };

        let indexed: Vec<(usize, PathBuf)> =
            chunks.iter().cloned().enumerate().map(|(i, p)| (i + 1, p)).collect();
        let handle = Scatter::new(format!("search_{}", slug), &indexed)
            .after(check)
            .submit(engine, |(index, chunk)| {
                let raw = adapter.raw_output(chunk, &raw_dir);
                Task::shell(format!("{}_{:03}", slug, index), adapter.script(chunk, &raw))
            });

        let raw_files: Vec<PathBuf> =
            chunks.iter().map(|chunk| adapter.raw_output(chunk, &raw_dir)).collect();
        let config = self.config.clone();
        let tables_dir = self.layout.tables_dir.clone();

        let canonicalize = Task::native(format!("canonicalize_{}", slug), move || {
            let canonicalizer = Canonicalizer::from_config(target, &config)?;
            let output = canonicalizer.canonicalize(&raw_files)?;
            let ontology = match (target, &config.databases.go_obo) {
                (DatabaseTarget::FunctionalMotif, Some(obo)) => Some(GoOntology::from_path(obo)?),
                _ => None,
            };
            canonical::write_outputs(target, &output, &tables_dir, &config.run.prefix, ontology.as_ref())?;
            Ok(())
        });

        Ok(Gather::new(canonicalize).after(&handle).after_task(check).submit(engine))
    }

    /// Run the whole pipeline on `engine`
    pub async fn run<E: TaskEngine>(
        &self,
        engine: &mut E,
        proteins: &Path,
        gff: &Path,
    ) -> Result<PipelineOutcome> {
        if !gff.is_file() {
            return Err(PipelineError::InputMissing(gff.to_path_buf()));
        }

        let prefix = self.config.run.prefix.as_str();
        let mut manifest = RunManifest::new(prefix);
        manifest.input("proteins", proteins);
        manifest.input("gff", gff);

        let model = GeneModel::from_path(gff)?;
        self.layout.create()?;

        let targets = self.targets();
        let mut gathers: BTreeMap<DatabaseTarget, TaskId> = BTreeMap::new();
        match ProteinSet::from_path(proteins) {
            Ok(protein_set) => {
                info!(
                    proteins = protein_set.len(),
                    residues = protein_set.residues(),
                    loci = model.locus_count(),
                    "Loaded inputs"
                );
                let chunks = partition(&protein_set, self.config.run.chunk_residues, &input_stem(proteins));
                let chunk_paths = write_chunks(&chunks, &self.layout.chunks_dir)?;

                for target in &targets {
                    let adapter = SearchAdapter::new(*target, &self.config);
                    manifest.software(target.as_str(), adapter.invocation());
                    if let Some(db) = self.config.databases.diamond_db(*target) {
                        manifest.database(target.as_str(), db);
                    }
                    let id = self.submit_branch(engine, *target, &chunk_paths)?;
                    gathers.insert(*target, id);
                }
            }
            Err(e) => {
                error!(
                    path = %proteins.display(),
                    error = %e,
                    targets = targets.len(),
                    "Protein set unavailable; no search branch can run"
                );
            }
        }
        if let Some(obo) = &self.config.databases.go_obo {
            manifest.database("GO", obo);
        }

        let report = engine
            .run(
                self.config.run.concurrency,
                Duration::from_secs(self.config.run.poll_interval_secs),
            )
            .await
            .map_err(|e| PipelineError::task("engine", format!("{:#}", e)))?;

        let mut inputs = FusionInputs::load(&self.layout.tables_dir, prefix)?;
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for target in DatabaseTarget::ALL {
            if !targets.contains(&target) {
                inputs = inputs.without_target(target);
                continue;
            }
            match gathers.get(&target) {
                Some(id) if report.succeeded(*id) => completed.push(target),
                _ => {
                    warn!(target = %target, "Branch did not complete; its tables are treated as empty");
                    failed.push(target);
                    inputs = inputs.without_target(target);
                }
            }
        }

        let outputs = write_fused(&model, &inputs, &self.layout.out_dir, prefix)?;

        manifest.record_report(&report);
        for path in outputs.paths() {
            manifest.add_output(path)?;
        }
        let manifest_path = self.layout.out_dir.join(MANIFEST_FILE);
        manifest.write(&manifest_path)?;

        info!(
            completed = completed.len(),
            failed = failed.len(),
            manifest = %manifest_path.display(),
            "Annotation run finished"
        );

        Ok(PipelineOutcome {
            report,
            outputs,
            manifest: manifest_path,
            completed,
            failed,
        })
    }
}
