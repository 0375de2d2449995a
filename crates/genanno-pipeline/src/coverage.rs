//! Functional-completeness summary
//!
//! Percentages are relative to the number of CDS loci in the structural
//! model, not to the number of proteins that were searched.

use crate::error::Result;
use crate::io::write_file;
use crate::models::AnnotationSource;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;

/// A count and its share of the locus total
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Share {
    pub count: usize,
    pub pct: f64,
}

impl Share {
    fn of(count: usize, total: usize) -> Self {
        let pct = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        Self { count, pct }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageStat {
    /// In summary order
    pub per_source: Vec<(AnnotationSource, Share)>,
    pub all_databases: Share,
    pub at_least_one: Share,
    pub overall: usize,
}

impl CoverageStat {
    /// `annotated` maps each source to the loci it annotated; loci outside
    /// the model must already be excluded
    pub fn compute(annotated: &BTreeMap<AnnotationSource, BTreeSet<String>>, total: usize) -> Self {
        let empty = BTreeSet::new();
        let sets: Vec<(AnnotationSource, &BTreeSet<String>)> = AnnotationSource::SUMMARY_ORDER
            .iter()
            .map(|source| (*source, annotated.get(source).unwrap_or(&empty)))
            .collect();

        let mut all: Option<BTreeSet<&String>> = None;
        let mut union: BTreeSet<&String> = BTreeSet::new();
        for (_, set) in &sets {
            all = Some(match all {
                None => set.iter().collect(),
                Some(acc) => acc.into_iter().filter(|id| set.contains(*id)).collect(),
            });
            union.extend(set.iter());
        }

        Self {
            per_source: sets
                .iter()
                .map(|(source, set)| (*source, Share::of(set.len(), total)))
                .collect(),
            all_databases: Share::of(all.map(|s| s.len()).unwrap_or(0), total),
            at_least_one: Share::of(union.len(), total),
            overall: total,
        }
    }

    pub fn get(&self, source: AnnotationSource) -> Option<Share> {
        self.per_source.iter().find(|(s, _)| *s == source).map(|(_, share)| *share)
    }

    /// `label<TAB>count<TAB>pct`
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut row = |label: &str, share: &Share| {
            let _ = writeln!(out, "{}\t{}\t{:.2}", label, share.count, share.pct);
        };
        for (source, share) in &self.per_source {
            row(source.label(), share);
        }
        row("all databases", &self.all_databases);
        row("at least one databases", &self.at_least_one);
        let _ = writeln!(out, "Overall\t{}\t100", self.overall);
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_file(path, &self.render())
    }
}
