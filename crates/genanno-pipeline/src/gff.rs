//! GFF3 structural gene model
//!
//! Only what fusion needs: the nine columns kept verbatim for re-emission, an
//! ordered attribute view, and the CDS loci in first-seen order.

use crate::error::{PipelineError, Result};
use crate::io::open_input;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

/// One feature row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffRecord {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: String,
    pub phase: String,
    /// Raw column 9, re-emitted as-is
    pub attributes: String,
}

impl GffRecord {
    /// Parse a tab-separated feature row
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() != 9 {
            return Err(PipelineError::parse(
                line_no,
                format!("expected 9 columns, got {}", cols.len()),
            ));
        }

        let coord = |value: &str, name: &str| {
            value.trim().parse::<u64>().map_err(|_| {
                PipelineError::parse(line_no, format!("invalid {} coordinate '{}'", name, value))
            })
        };

        Ok(Self {
            seqid: cols[0].to_string(),
            source: cols[1].to_string(),
            feature_type: cols[2].to_string(),
            start: coord(cols[3], "start")?,
            end: coord(cols[4], "end")?,
            score: cols[5].to_string(),
            strand: cols[6].to_string(),
            phase: cols[7].to_string(),
            attributes: cols[8].to_string(),
        })
    }

    pub fn is_cds(&self) -> bool {
        self.feature_type == "CDS"
    }

    /// Attribute pairs in column order; entries without `=` are dropped
    pub fn attribute_pairs(&self) -> Vec<(&str, &str)> {
        self.attributes
            .split(';')
            .filter_map(|kv| kv.trim().split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attribute_pairs()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Value of the leading attribute (`ID=` or `Parent=` in practice).
    /// `None` for an empty or `.` attribute column.
    pub fn locus_key(&self) -> Option<&str> {
        self.attributes
            .split(';')
            .next()
            .and_then(|first| first.split_once('='))
            .map(|(_, value)| value.trim())
            .filter(|v| !v.is_empty() && *v != ".")
    }

    /// Feature length in bases
    pub fn span(&self) -> u64 {
        self.end.abs_diff(self.start) + 1
    }

    /// Re-emit the row with extra `key=value` attributes appended
    pub fn to_line_with(&self, extra: &[(&str, String)]) -> String {
        if extra.is_empty() {
            return self.to_line();
        }

        let mut attributes = self.attributes.trim_end_matches(';').to_string();
        if attributes == "." {
            attributes.clear();
        }
        for (key, value) in extra {
            if !attributes.is_empty() {
                attributes.push(';');
            }
            attributes.push_str(key);
            attributes.push('=');
            attributes.push_str(value);
        }

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            attributes
        )
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.source,
            self.feature_type,
            self.start,
            self.end,
            self.score,
            self.strand,
            self.phase,
            self.attributes
        )
    }
}

/// Per-locus facts derived from the CDS rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub id: String,
    pub seqid: String,
    pub strand: String,
    pub start: u64,
    pub end: u64,
    /// `ab initio prediction:<source>` from the first CDS row
    pub default_inference: String,
}

impl Locus {
    pub fn span(&self) -> u64 {
        self.end.abs_diff(self.start) + 1
    }
}

/// A parsed GFF3 file: feature rows in input order plus the CDS loci
#[derive(Debug, Clone, Default)]
pub struct GeneModel {
    rows: Vec<GffRecord>,
    loci: Vec<Locus>,
    index: HashMap<String, usize>,
}

impl GeneModel {
    /// Read a plain or gzip-compressed GFF3 file
    ///
    /// A missing file is the one fatal condition for fusion, so it maps to
    /// [`PipelineError::InputMissing`]; malformed rows are skipped.
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_input(path)?;
        let model = Self::parse(reader)?;
        info!(
            path = %path.display(),
            rows = model.rows.len(),
            loci = model.loci.len(),
            "Loaded structural gene model"
        );
        Ok(model)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut model = Self::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.starts_with("##FASTA") {
                break;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match GffRecord::parse(line, idx + 1) {
                Ok(record) => model.push(record),
                Err(e) => warn!("Skipping line {} due to parse error: {}", idx + 1, e),
            }
        }

        Ok(model)
    }

    fn push(&mut self, record: GffRecord) {
        if record.is_cds() {
            match record.locus_key() {
                Some(key) => match self.index.get(key) {
                    Some(&i) => {
                        let locus = &mut self.loci[i];
                        locus.start = locus.start.min(record.start.min(record.end));
                        locus.end = locus.end.max(record.end.max(record.start));
                    }
                    None => {
                        self.index.insert(key.to_string(), self.loci.len());
                        self.loci.push(Locus {
                            id: key.to_string(),
                            seqid: record.seqid.clone(),
                            strand: record.strand.clone(),
                            start: record.start.min(record.end),
                            end: record.end.max(record.start),
                            default_inference: format!("ab initio prediction:{}", record.source),
                        });
                    }
                },
                None => warn!(
                    seqid = %record.seqid,
                    start = record.start,
                    "CDS row without attributes; it will not receive annotations"
                ),
            }
        }
        self.rows.push(record);
    }

    pub fn rows(&self) -> &[GffRecord] {
        &self.rows
    }

    /// Distinct CDS loci in first-seen order
    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    pub fn locus(&self, id: &str) -> Option<&Locus> {
        self.index.get(id).map(|&i| &self.loci[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Denominator of every coverage percentage
    pub fn locus_count(&self) -> usize {
        self.loci.len()
    }
}
