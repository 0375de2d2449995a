//! Canonical hit tables
//!
//! One tab-separated file per annotation source, `-` standing in for empty
//! fields. The same layout is read back by fusion and by `genanno fuse`.

use crate::error::{PipelineError, Result};
use crate::io::{create_output, open_input};
use crate::models::CanonicalHit;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::warn;

pub const CANONICAL_HEADER: &str =
    "#qseqid\tsseqid\tdbxref\tclass\tname\tdesc\tqstart\tqend\tevalue\tscore\tnote";

const COLUMNS: usize = 11;

fn cell(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => "-".to_string(),
        Some(v) => v.replace(['\t', '\n', '\r'], " "),
    }
}

fn opt_cell(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != "-").then(|| value.to_string())
}

/// Format one row (no trailing newline)
pub fn format_row(hit: &CanonicalHit) -> String {
    let evalue = hit.evalue.map(|e| format!("{:e}", e));
    let score = hit.score.map(|s| format!("{}", s));
    [
        cell(Some(&hit.query_id)),
        cell(Some(&hit.subject_id)),
        cell(Some(&hit.dbxref)),
        cell(hit.class.as_deref()),
        cell(hit.symbol.as_deref()),
        cell(hit.description.as_deref()),
        hit.qstart.to_string(),
        hit.qend.to_string(),
        cell(evalue.as_deref()),
        cell(score.as_deref()),
        cell(hit.note.as_deref()),
    ]
    .join("\t")
}

/// Write the header plus rows in the order given
pub fn write_canonical_table<W: Write>(out: &mut W, hits: &[CanonicalHit]) -> Result<()> {
    writeln!(out, "{}", CANONICAL_HEADER)?;
    for hit in hits {
        writeln!(out, "{}", format_row(hit))?;
    }
    Ok(())
}

pub fn write_canonical_file(path: &Path, hits: &[CanonicalHit]) -> Result<()> {
    let mut out = create_output(path)?;
    write_canonical_table(&mut out, hits)?;
    out.flush()?;
    Ok(())
}

fn parse_row(line: &str, line_no: usize) -> Result<CanonicalHit> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != COLUMNS {
        return Err(PipelineError::parse(
            line_no,
            format!("expected {} columns, got {}", COLUMNS, cols.len()),
        ));
    }

    let coord = |idx: usize, name: &str| {
        cols[idx].trim().parse::<u64>().map_err(|_| {
            PipelineError::parse(line_no, format!("invalid {} '{}'", name, cols[idx]))
        })
    };
    let number = |idx: usize, name: &str| -> Result<Option<f64>> {
        match opt_cell(cols[idx]) {
            None => Ok(None),
            Some(v) => v.parse::<f64>().map(Some).map_err(|_| {
                PipelineError::parse(line_no, format!("invalid {} '{}'", name, v))
            }),
        }
    };

    let query_id = opt_cell(cols[0]).ok_or_else(|| PipelineError::parse(line_no, "empty qseqid"))?;

    Ok(CanonicalHit {
        query_id,
        subject_id: opt_cell(cols[1]).unwrap_or_default(),
        dbxref: opt_cell(cols[2]).unwrap_or_default(),
        class: opt_cell(cols[3]),
        symbol: opt_cell(cols[4]),
        description: opt_cell(cols[5]),
        qstart: coord(6, "qstart")?,
        qend: coord(7, "qend")?,
        evalue: number(8, "evalue")?,
        score: number(9, "score")?,
        note: opt_cell(cols[10]),
    })
}

/// Parse a canonical table, skipping malformed rows
pub fn parse_canonical_table<R: BufRead>(reader: R) -> Result<Vec<CanonicalHit>> {
    let mut hits = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_row(line, idx + 1) {
            Ok(hit) => hits.push(hit),
            Err(e) => warn!("Skipping line {} due to parse error: {}", idx + 1, e),
        }
    }
    Ok(hits)
}

pub fn read_canonical_table(path: &Path) -> Result<Vec<CanonicalHit>> {
    parse_canonical_table(open_input(path)?)
}
