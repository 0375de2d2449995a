//! `genanno run` command implementation

use super::load_config;
use crate::cli::RunOverrides;
use crate::engine::LocalEngine;
use crate::error::Result;
use crate::pipeline::AnnotationPipeline;
use std::path::Path;
use tracing::info;

/// Run the full pipeline on the local engine
pub async fn run(
    config_file: Option<&Path>,
    proteins: &Path,
    gff: &Path,
    overrides: &RunOverrides,
) -> Result<()> {
    let config = load_config(config_file, |config| overrides.apply(config))?;
    info!(
        prefix = %config.run.prefix,
        targets = config.run.targets.len(),
        work_dir = %config.run.work_dir.display(),
        "Starting annotation run"
    );

    let mut engine = LocalEngine::new(&config.run.work_dir, config.run.shell.clone())
        .with_progress(config.run.progress);
    let pipeline = AnnotationPipeline::new(config);
    let outcome = pipeline.run(&mut engine, proteins, gff).await?;

    let (ok, failed, skipped) = outcome.report.counts();
    println!("Tasks: {} succeeded, {} failed, {} skipped", ok, failed, skipped);
    for target in &outcome.failed {
        println!("  {} did not complete; its annotations are missing", target);
    }
    println!();
    print!("{}", outcome.outputs.coverage.render());
    println!();
    for path in outcome.outputs.paths() {
        println!("Wrote {}", path.display());
    }
    println!("Wrote {}", outcome.manifest.display());

    Ok(())
}
