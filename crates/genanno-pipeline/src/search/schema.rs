// Raw hit schemas declared by the search adapters

use crate::error::{PipelineError, Result};
use crate::models::{DatabaseTarget, RawHit};

/// DIAMOND `--outfmt 6` columns requested by every blastp adapter
pub const BLAST_COLUMNS: [&str; 15] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore", "qlen", "slen", "stitle",
];

/// Layout of a target's raw output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawHitSchema {
    /// 15-column tabular alignment output
    Blast15,
    /// InterProScan TSV (11 to 15 columns)
    InterProTsv,
}

impl RawHitSchema {
    pub fn for_target(target: DatabaseTarget) -> Self {
        if target.uses_diamond() {
            RawHitSchema::Blast15
        } else {
            RawHitSchema::InterProTsv
        }
    }

    /// Parse one line; `Ok(None)` for blank and `#` comment lines
    pub fn parse_line(&self, line: &str, line_no: usize) -> Result<Option<RawHit>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        match self {
            RawHitSchema::Blast15 => parse_blast(line, line_no).map(Some),
            RawHitSchema::InterProTsv => parse_interpro(line, line_no).map(Some),
        }
    }
}

fn field<T: std::str::FromStr>(cols: &[&str], idx: usize, name: &str, line_no: usize) -> Result<T> {
    let raw = cols.get(idx).map(|s| s.trim()).unwrap_or_default();
    raw.parse::<T>()
        .map_err(|_| PipelineError::parse(line_no, format!("invalid {} '{}'", name, raw)))
}

fn optional<T: std::str::FromStr>(
    cols: &[&str],
    idx: usize,
    name: &str,
    line_no: usize,
) -> Result<Option<T>> {
    match cols.get(idx).map(|s| s.trim()) {
        None | Some("") | Some("-") => Ok(None),
        Some(_) => field(cols, idx, name, line_no).map(Some),
    }
}

fn parse_blast(line: &str, line_no: usize) -> Result<RawHit> {
    let cols: Vec<&str> = line.splitn(BLAST_COLUMNS.len(), '\t').collect();
    if cols.len() != BLAST_COLUMNS.len() {
        return Err(PipelineError::parse(
            line_no,
            format!("expected {} columns, got {}", BLAST_COLUMNS.len(), cols.len()),
        ));
    }

    Ok(RawHit {
        query_id: cols[0].trim().to_string(),
        subject_id: cols[1].trim().to_string(),
        identity: optional(&cols, 2, "pident", line_no)?,
        qstart: field(&cols, 6, "qstart", line_no)?,
        qend: field(&cols, 7, "qend", line_no)?,
        sstart: optional(&cols, 8, "sstart", line_no)?,
        send: optional(&cols, 9, "send", line_no)?,
        evalue: Some(field(&cols, 10, "evalue", line_no)?),
        bitscore: Some(field(&cols, 11, "bitscore", line_no)?),
        qlen: optional(&cols, 12, "qlen", line_no)?,
        slen: optional(&cols, 13, "slen", line_no)?,
        title: cols[14].trim().to_string(),
        analysis: None,
        go_terms: Vec::new(),
    })
}

/// Split an InterProScan GO cell: `GO:0003677(InterPro)|GO:0006260(PANTHER)`
pub fn split_go_terms(cell: &str) -> Vec<String> {
    cell.split(['|', ';'])
        .map(|term| term.split('(').next().unwrap_or(term).trim())
        .filter(|term| term.starts_with("GO:"))
        .map(String::from)
        .collect()
}

fn parse_interpro(line: &str, line_no: usize) -> Result<RawHit> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < 9 {
        return Err(PipelineError::parse(
            line_no,
            format!("expected at least 9 InterProScan columns, got {}", cols.len()),
        ));
    }

    let go_terms = cols.get(13).map(|cell| split_go_terms(cell)).unwrap_or_default();

    Ok(RawHit {
        query_id: cols[0].trim().to_string(),
        subject_id: cols[4].trim().to_string(),
        identity: None,
        qstart: field(&cols, 6, "start", line_no)?,
        qend: field(&cols, 7, "end", line_no)?,
        sstart: None,
        send: None,
        evalue: optional(&cols, 8, "evalue", line_no)?,
        bitscore: None,
        qlen: optional(&cols, 2, "sequence length", line_no)?,
        slen: None,
        title: cols[5].trim().to_string(),
        analysis: Some(cols[3].trim().to_string()),
        go_terms,
    })
}
