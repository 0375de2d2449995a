//! FASTA reading and writing for protein sets and chunks

use crate::error::{PipelineError, Result};
use crate::io::open_input;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Residues per line when writing FASTA
pub const LINE_WIDTH: usize = 60;

/// One protein sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            sequence: sequence.into(),
        }
    }

    pub fn residues(&self) -> u64 {
        self.sequence.len() as u64
    }

    fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        let (id, description) = match header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id, Some(rest.trim().to_string()).filter(|d| !d.is_empty())),
            None => (header, None),
        };
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            description,
            sequence: String::new(),
        })
    }
}

/// Parse FASTA records from any buffered reader
///
/// Sequence text before the first header is skipped with a warning, as are
/// headers with an empty identifier.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();

        if let Some(header) = line.strip_prefix('>') {
            records.extend(current.take());
            current = FastaRecord::from_header(header);
            if current.is_none() {
                warn!(line = idx + 1, "Skipping FASTA record with empty identifier");
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        match current.as_mut() {
            Some(record) => record
                .sequence
                .extend(line.chars().filter(|c| !c.is_whitespace())),
            None => warn!(line = idx + 1, "Skipping sequence line outside a record"),
        }
    }

    records.extend(current);
    Ok(records)
}

/// Write one record, wrapping the sequence at [`LINE_WIDTH`]
pub fn write_record<W: Write>(out: &mut W, record: &FastaRecord) -> Result<()> {
    match &record.description {
        Some(desc) => writeln!(out, ">{} {}", record.id, desc)?,
        None => writeln!(out, ">{}", record.id)?,
    }
    let bytes = record.sequence.as_bytes();
    for line in bytes.chunks(LINE_WIDTH) {
        out.write_all(line)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

// ============================================================================
// Protein set
// ============================================================================

/// The translated CDS set of one sample, keyed by locus id
#[derive(Debug, Clone, Default)]
pub struct ProteinSet {
    records: Vec<FastaRecord>,
}

impl ProteinSet {
    /// Build a set, dropping repeated ids after the first occurrence
    pub fn new(records: Vec<FastaRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id.clone()) {
                kept.push(record);
            } else {
                warn!(id = %record.id, "Duplicate protein id; keeping the first record");
            }
        }
        Self { records: kept }
    }

    /// Read a plain or gzip-compressed protein FASTA
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_input(path)?;
        let set = Self::new(parse_fasta(reader)?);
        info!(path = %path.display(), proteins = set.len(), residues = set.residues(), "Loaded protein set");
        Ok(set)
    }

    pub fn records(&self) -> &[FastaRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FastaRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn residues(&self) -> u64 {
        self.records.iter().map(FastaRecord::residues).sum()
    }

    pub fn get(&self, id: &str) -> Option<&FastaRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

impl TryFrom<&str> for ProteinSet {
    type Error = PipelineError;

    fn try_from(content: &str) -> Result<Self> {
        Ok(Self::new(parse_fasta(content.as_bytes())?))
    }
}
