//! `genanno canonicalize` command implementation
//!
//! Re-reduces raw search output left in the work directory, e.g. after
//! searches were run by hand or thresholds changed. Targets are processed
//! concurrently, each on the blocking pool.

use super::load_config;
use crate::canonical::{write_outputs, Canonicalizer};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::go::GoOntology;
use crate::models::DatabaseTarget;
use crate::pipeline::RunLayout;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

fn canonicalize_target(
    config: &PipelineConfig,
    layout: &RunLayout,
    target: DatabaseTarget,
) -> Result<Vec<PathBuf>> {
    let raw_files = layout.existing_raw_files(target)?;
    info!(target = %target, files = raw_files.len(), "Canonicalizing raw output");

    let canonicalizer = Canonicalizer::from_config(target, config)?;
    let output = canonicalizer.canonicalize(&raw_files)?;
    let ontology = match (target, &config.databases.go_obo) {
        (DatabaseTarget::FunctionalMotif, Some(obo)) => Some(GoOntology::from_path(obo)?),
        _ => None,
    };
    std::fs::create_dir_all(&layout.tables_dir)?;
    write_outputs(target, &output, &layout.tables_dir, &config.run.prefix, ontology.as_ref())
}

pub async fn run(
    config_file: Option<&Path>,
    targets: &[DatabaseTarget],
    work_dir: Option<PathBuf>,
    prefix: Option<String>,
) -> Result<()> {
    let config = load_config(config_file, |config| {
        if !targets.is_empty() {
            config.run.targets = targets.to_vec();
        }
        if let Some(dir) = work_dir {
            config.run.work_dir = dir;
        }
        if let Some(prefix) = prefix {
            config.run.prefix = prefix;
        }
    })?;

    let layout = Arc::new(RunLayout::new(&config.run.work_dir, &config.run.out_dir));
    let concurrency = config.run.concurrency;
    let targets = config.run.targets.clone();
    let config = Arc::new(config);

    let results: Vec<(DatabaseTarget, Result<Vec<PathBuf>>)> = stream::iter(targets)
        .map(|target| {
            let config = config.clone();
            let layout = layout.clone();
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    canonicalize_target(&config, &layout, target)
                })
                .await
                .unwrap_or_else(|e| Err(PipelineError::task(target.slug(), e.to_string())));
                (target, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut failed = 0usize;
    for (target, result) in &results {
        match result {
            Ok(paths) => {
                for path in paths {
                    println!("Wrote {}", path.display());
                }
            }
            Err(e) => {
                error!(target = %target, error = %e, "Canonicalization failed");
                eprintln!("{}: {}", target, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(PipelineError::task(
            "canonicalize",
            format!("{} of {} targets failed", failed, results.len()),
        ));
    }
    Ok(())
}
