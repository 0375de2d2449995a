//! `genanno fuse` command implementation

use super::load_config;
use crate::error::Result;
use crate::pipeline::fuse_tables;
use std::path::{Path, PathBuf};

/// Fuse canonical tables from a previous run onto `gff`
pub async fn run(
    config_file: Option<&Path>,
    gff: &Path,
    tables_dir: &Path,
    prefix: Option<String>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_file, |config| {
        if let Some(prefix) = prefix {
            config.run.prefix = prefix;
        }
        if let Some(dir) = out_dir {
            config.run.out_dir = dir;
        }
    })?;

    let outputs = fuse_tables(gff, tables_dir, &config.run.prefix, &config.run.out_dir)?;
    print!("{}", outputs.coverage.render());
    for path in outputs.paths() {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
