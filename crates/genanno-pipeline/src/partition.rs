//! Protein partitioner
//!
//! Splits a [`ProteinSet`] into residue-bounded chunks for the search scatter.
//! Chunks preserve input order, never split a protein, and are named from
//! their position alone so reruns produce the same file names.

use crate::error::Result;
use crate::fasta::{write_record, FastaRecord, ProteinSet};
use crate::io::create_output;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default cumulative residue budget per chunk
pub const DEFAULT_CHUNK_RESIDUES: u64 = 5_000_000;

/// A contiguous run of proteins searched as one task
#[derive(Debug, Clone)]
pub struct ProteinChunk {
    /// 1-based position in the partition
    pub index: usize,
    pub name: String,
    pub records: Vec<FastaRecord>,
}

impl ProteinChunk {
    pub fn residues(&self) -> u64 {
        self.records.iter().map(FastaRecord::residues).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `<stem>.part_<NNN>.fasta`
pub fn chunk_name(stem: &str, index: usize) -> String {
    format!("{}.part_{:03}.fasta", stem, index)
}

/// Partition proteins into chunks of at most `budget` residues
///
/// A protein longer than the budget gets a chunk of its own. An empty set
/// yields no chunks.
pub fn partition(proteins: &ProteinSet, budget: u64, stem: &str) -> Vec<ProteinChunk> {
    let mut chunks: Vec<ProteinChunk> = Vec::new();
    let mut current: Vec<FastaRecord> = Vec::new();
    let mut current_residues = 0u64;

    let flush = |records: Vec<FastaRecord>, chunks: &mut Vec<ProteinChunk>| {
        let index = chunks.len() + 1;
        chunks.push(ProteinChunk {
            index,
            name: chunk_name(stem, index),
            records,
        });
    };

    for record in proteins.records() {
        let residues = record.residues();
        if !current.is_empty() && current_residues.saturating_add(residues) > budget {
            flush(std::mem::take(&mut current), &mut chunks);
            current_residues = 0;
        }
        current_residues = current_residues.saturating_add(residues);
        current.push(record.clone());
    }

    if !current.is_empty() {
        flush(current, &mut chunks);
    }

    info!(
        proteins = proteins.len(),
        chunks = chunks.len(),
        budget,
        "Partitioned protein set"
    );
    chunks
}

/// Write each chunk as FASTA under `dir`, returning paths in chunk order
pub fn write_chunks(chunks: &[ProteinChunk], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let path = dir.join(&chunk.name);
        let mut out = create_output(&path)?;
        for record in &chunk.records {
            write_record(&mut out, record)?;
        }
        out.flush()?;
        debug!(chunk = %chunk.name, proteins = chunk.len(), residues = chunk.residues(), "Wrote chunk");
        paths.push(path);
    }

    Ok(paths)
}
