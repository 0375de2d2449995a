//! `genanno partition` command implementation

use super::load_config;
use crate::error::Result;
use crate::fasta::ProteinSet;
use crate::partition::{partition, write_chunks};
use crate::pipeline::input_stem;
use std::path::Path;

/// Write residue-bounded chunks of `proteins` into `out_dir`
pub async fn run(
    config_file: Option<&Path>,
    proteins: &Path,
    out_dir: &Path,
    chunk_residues: Option<u64>,
) -> Result<()> {
    let config = load_config(config_file, |config| {
        if let Some(budget) = chunk_residues {
            config.run.chunk_residues = budget;
        }
    })?;

    let set = ProteinSet::from_path(proteins)?;
    let chunks = partition(&set, config.run.chunk_residues, &input_stem(proteins));
    let paths = write_chunks(&chunks, out_dir)?;

    for (chunk, path) in chunks.iter().zip(&paths) {
        println!("{}\t{}\t{}", path.display(), chunk.len(), chunk.residues());
    }
    println!(
        "{} proteins, {} residues in {} chunks",
        set.len(),
        set.residues(),
        paths.len()
    );
    Ok(())
}
