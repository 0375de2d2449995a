//! Core data types shared by the search, canonicalization and fusion stages

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Database targets (one search branch each)
// ============================================================================

/// A reference resource searched as one scatter branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseTarget {
    Refseq,
    Kegg,
    Cog,
    /// Pfam, TIGRFAM and GO from a single InterProScan call
    #[serde(rename = "motif", alias = "functionalmotif", alias = "interpro")]
    FunctionalMotif,
    #[serde(alias = "swiss-prot")]
    SwissProt,
}

impl DatabaseTarget {
    pub const ALL: [DatabaseTarget; 5] = [
        DatabaseTarget::Refseq,
        DatabaseTarget::Kegg,
        DatabaseTarget::Cog,
        DatabaseTarget::FunctionalMotif,
        DatabaseTarget::SwissProt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseTarget::Refseq => "Refseq",
            DatabaseTarget::Kegg => "KEGG",
            DatabaseTarget::Cog => "COG",
            DatabaseTarget::FunctionalMotif => "FunctionalMotif",
            DatabaseTarget::SwissProt => "SwissProt",
        }
    }

    /// Lowercase name used for work directories and task names
    pub fn slug(&self) -> &'static str {
        match self {
            DatabaseTarget::Refseq => "refseq",
            DatabaseTarget::Kegg => "kegg",
            DatabaseTarget::Cog => "cog",
            DatabaseTarget::FunctionalMotif => "motif",
            DatabaseTarget::SwissProt => "swissprot",
        }
    }

    /// Suffix of the per-chunk raw output file
    pub fn raw_suffix(&self) -> &'static str {
        match self {
            DatabaseTarget::Refseq => "refseq.m6",
            DatabaseTarget::Kegg => "KEGG.m6",
            DatabaseTarget::Cog => "COG.m6",
            DatabaseTarget::FunctionalMotif => "ipr.out",
            DatabaseTarget::SwissProt => "SwissProt.m6",
        }
    }

    /// Annotation sources whose canonical tables this target produces
    pub fn sources(&self) -> &'static [AnnotationSource] {
        match self {
            DatabaseTarget::Refseq => &[AnnotationSource::Refseq],
            DatabaseTarget::Kegg => &[AnnotationSource::Kegg],
            DatabaseTarget::Cog => &[AnnotationSource::Cog],
            DatabaseTarget::FunctionalMotif => &[
                AnnotationSource::Tigrfams,
                AnnotationSource::Pfam,
                AnnotationSource::Go,
            ],
            DatabaseTarget::SwissProt => &[AnnotationSource::SwissProt],
        }
    }

    /// Whether the branch is searched with DIAMOND blastp (vs. InterProScan)
    pub fn uses_diamond(&self) -> bool {
        !matches!(self, DatabaseTarget::FunctionalMotif)
    }
}

impl std::fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DatabaseTarget {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "refseq" => Ok(DatabaseTarget::Refseq),
            "kegg" => Ok(DatabaseTarget::Kegg),
            "cog" => Ok(DatabaseTarget::Cog),
            "motif" | "functionalmotif" | "interpro" | "ipr" => Ok(DatabaseTarget::FunctionalMotif),
            "swissprot" | "swiss-prot" => Ok(DatabaseTarget::SwissProt),
            other => Err(PipelineError::config(format!(
                "unknown database target '{}' (expected refseq, kegg, cog, motif or swissprot)",
                other
            ))),
        }
    }
}

// ============================================================================
// Annotation sources (fused and accounted)
// ============================================================================

/// One of the seven sources that feed fusion and coverage accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationSource {
    Go,
    Tigrfams,
    Pfam,
    Cog,
    Refseq,
    SwissProt,
    Kegg,
}

impl AnnotationSource {
    /// Row order of the coverage summary
    pub const SUMMARY_ORDER: [AnnotationSource; 7] = [
        AnnotationSource::Cog,
        AnnotationSource::Kegg,
        AnnotationSource::Go,
        AnnotationSource::Refseq,
        AnnotationSource::Pfam,
        AnnotationSource::Tigrfams,
        AnnotationSource::SwissProt,
    ];

    /// Sources that produce hit tables (everything except GO)
    pub const HIT_SOURCES: [AnnotationSource; 6] = [
        AnnotationSource::Tigrfams,
        AnnotationSource::Pfam,
        AnnotationSource::Cog,
        AnnotationSource::Refseq,
        AnnotationSource::SwissProt,
        AnnotationSource::Kegg,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AnnotationSource::Go => "GO",
            AnnotationSource::Tigrfams => "TIGRFAMs",
            AnnotationSource::Pfam => "Pfam",
            AnnotationSource::Cog => "COG",
            AnnotationSource::Refseq => "Refseq",
            AnnotationSource::SwissProt => "SwissProt",
            AnnotationSource::Kegg => "KEGG",
        }
    }

    pub fn target(&self) -> DatabaseTarget {
        match self {
            AnnotationSource::Go | AnnotationSource::Tigrfams | AnnotationSource::Pfam => {
                DatabaseTarget::FunctionalMotif
            }
            AnnotationSource::Cog => DatabaseTarget::Cog,
            AnnotationSource::Refseq => DatabaseTarget::Refseq,
            AnnotationSource::SwissProt => DatabaseTarget::SwissProt,
            AnnotationSource::Kegg => DatabaseTarget::Kegg,
        }
    }

    /// `<prefix>.<label>.tsv`
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{}.{}.tsv", prefix, self.label())
    }
}

impl std::fmt::Display for AnnotationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Hits
// ============================================================================

/// One tool-reported alignment or signature match
///
/// Only lives while a target's raw files are being reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub query_id: String,
    pub subject_id: String,
    pub identity: Option<f64>,
    pub qstart: u64,
    pub qend: u64,
    /// `None` when the tool reports `-` (some InterProScan analyses)
    pub evalue: Option<f64>,
    pub bitscore: Option<f64>,
    pub qlen: Option<u64>,
    pub slen: Option<u64>,
    pub sstart: Option<u64>,
    pub send: Option<u64>,
    /// DIAMOND `stitle`, or the signature description for InterProScan
    pub title: String,
    /// InterProScan analysis name (`Pfam`, `TIGRFAM`, ...)
    pub analysis: Option<String>,
    pub go_terms: Vec<String>,
}

impl RawHit {
    /// Query coverage in percent, if the query length is known
    pub fn query_coverage(&self) -> Option<f64> {
        coverage(self.qstart, self.qend, self.qlen)
    }

    /// Subject coverage in percent, if the subject length is known
    pub fn subject_coverage(&self) -> Option<f64> {
        match (self.sstart, self.send) {
            (Some(start), Some(end)) => coverage(start, end, self.slen),
            _ => None,
        }
    }
}

fn coverage(start: u64, end: u64, len: Option<u64>) -> Option<f64> {
    let len = len.filter(|l| *l > 0)?;
    Some((start.abs_diff(end) + 1) as f64 / len as f64 * 100.0)
}

/// The surviving best hit for one (query, source) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalHit {
    pub query_id: String,
    pub subject_id: String,
    pub dbxref: String,
    pub class: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub qstart: u64,
    pub qend: u64,
    pub evalue: Option<f64>,
    pub score: Option<f64>,
    pub note: Option<String>,
}

impl CanonicalHit {
    /// Description up to the first `;`, trimmed; `None` when blank
    pub fn product(&self) -> Option<&str> {
        self.description
            .as_deref()
            .and_then(|d| d.split(';').next())
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// EC numbers carried in an `EC:` note
    pub fn ec_numbers(&self) -> Vec<&str> {
        match self.note.as_deref().and_then(|n| n.strip_prefix("EC:")) {
            Some(ecs) => ecs.split_whitespace().collect(),
            None => Vec::new(),
        }
    }

    /// Taxon carried in a `Taxon:` note
    pub fn taxon(&self) -> Option<&str> {
        self.note
            .as_deref()
            .and_then(|n| n.strip_prefix("Taxon:"))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
