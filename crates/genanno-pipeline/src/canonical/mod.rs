//! Hit canonicalization
//!
//! Reduces every raw file of one target to at most one [`CanonicalHit`] per
//! (query, source): rows below the coverage or evalue thresholds are dropped,
//! the survivors compete on bit score, then evalue, then input order, and
//! the winner is normalized by the target's [`Normalizer`].
//!
//! Every query lives in exactly one protein chunk, so the result does not
//! depend on the order in which chunk files are read.

pub mod normalize;
pub mod reference;
pub mod table;

pub use normalize::{Normalizer, TargetNormalizer};
pub use table::{read_canonical_table, write_canonical_file, CANONICAL_HEADER};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::go::{classify, write_go_file, GoOntology};
use crate::io::open_input;
use crate::models::{AnnotationSource, CanonicalHit, DatabaseTarget, RawHit};
use crate::search::RawHitSchema;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Thresholds
// ============================================================================

/// Post-search filters for one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum query coverage in percent
    pub min_qcov: f64,
    /// Minimum subject coverage in percent; 0 disables
    pub min_scov: f64,
    pub max_evalue: f64,
}

impl Thresholds {
    /// Coverage is only checked when the tool reported the length; a
    /// missing evalue passes and ranks last
    pub fn accepts(&self, hit: &RawHit) -> bool {
        if hit.evalue.is_some_and(|e| e > self.max_evalue) {
            return false;
        }
        if self.min_qcov > 0.0 && hit.query_coverage().is_some_and(|c| c < self.min_qcov) {
            return false;
        }
        if self.min_scov > 0.0 && hit.subject_coverage().is_some_and(|c| c < self.min_scov) {
            return false;
        }
        true
    }
}

// ============================================================================
// Best-hit selection
// ============================================================================

/// Whether `candidate` beats the current best
pub fn outranks(candidate: &RawHit, current: &RawHit) -> bool {
    let score = |h: &RawHit| h.bitscore.unwrap_or(f64::NEG_INFINITY);
    let evalue = |h: &RawHit| h.evalue.unwrap_or(f64::INFINITY);

    match score(candidate).total_cmp(&score(current)) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => evalue(candidate) < evalue(current),
    }
}

/// Current best raw hit per source and query
#[derive(Debug, Default)]
pub struct BestHits {
    by_source: BTreeMap<AnnotationSource, BTreeMap<String, RawHit>>,
}

impl BestHits {
    /// Offer a hit; returns true when it became the best for its query
    pub fn offer(&mut self, source: AnnotationSource, hit: RawHit) -> bool {
        let table = self.by_source.entry(source).or_default();
        match table.get(&hit.query_id) {
            Some(current) if !outranks(&hit, current) => false,
            _ => {
                table.insert(hit.query_id.clone(), hit);
                true
            }
        }
    }

    pub fn get(&self, source: AnnotationSource, query_id: &str) -> Option<&RawHit> {
        self.by_source.get(&source).and_then(|t| t.get(query_id))
    }

    /// Winners of one source, sorted by query id
    pub fn hits(&self, source: AnnotationSource) -> impl Iterator<Item = &RawHit> {
        self.by_source.get(&source).into_iter().flat_map(|t| t.values())
    }
}

// ============================================================================
// Canonicalizer
// ============================================================================

/// Row accounting for one canonicalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceStats {
    pub rows: usize,
    pub malformed: usize,
    pub filtered: usize,
    pub unsourced: usize,
}

/// Canonical tables produced from one target
#[derive(Debug, Default)]
pub struct CanonicalOutput {
    pub tables: BTreeMap<AnnotationSource, Vec<CanonicalHit>>,
    /// GO ids per query (FunctionalMotif only)
    pub go_ids: BTreeMap<String, BTreeSet<String>>,
    pub stats: ReduceStats,
}

impl CanonicalOutput {
    pub fn table(&self, source: AnnotationSource) -> &[CanonicalHit] {
        self.tables.get(&source).map(Vec::as_slice).unwrap_or_default()
    }
}

pub struct Canonicalizer {
    target: DatabaseTarget,
    thresholds: Thresholds,
    schema: RawHitSchema,
    normalizer: TargetNormalizer,
}

impl Canonicalizer {
    pub fn new(target: DatabaseTarget, thresholds: Thresholds, normalizer: TargetNormalizer) -> Self {
        Self {
            target,
            thresholds,
            schema: RawHitSchema::for_target(target),
            normalizer,
        }
    }

    /// Build from configuration, loading the target's lookup tables
    pub fn from_config(target: DatabaseTarget, config: &PipelineConfig) -> Result<Self> {
        let normalizer = TargetNormalizer::load(target, &config.databases)?;
        Ok(Self::new(target, config.thresholds(target), normalizer))
    }

    pub fn target(&self) -> DatabaseTarget {
        self.target
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Feed one raw file into the running selection
    pub fn reduce<R: BufRead>(
        &self,
        reader: R,
        best: &mut BestHits,
        go_ids: &mut BTreeMap<String, BTreeSet<String>>,
        stats: &mut ReduceStats,
    ) -> Result<()> {
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let hit = match self.schema.parse_line(&line, idx + 1) {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping line {} due to parse error: {}", idx + 1, e);
                    stats.malformed += 1;
                    continue;
                }
            };
            stats.rows += 1;

            if !self.thresholds.accepts(&hit) {
                stats.filtered += 1;
                continue;
            }

            if !hit.go_terms.is_empty() {
                go_ids
                    .entry(hit.query_id.clone())
                    .or_default()
                    .extend(hit.go_terms.iter().cloned());
            }

            match self.normalizer.source_for(&hit) {
                Some(source) => {
                    best.offer(source, hit);
                }
                None => stats.unsourced += 1,
            }
        }
        Ok(())
    }

    /// Reduce all gathered raw files of this target
    pub fn canonicalize(&self, raw_files: &[PathBuf]) -> Result<CanonicalOutput> {
        let mut best = BestHits::default();
        let mut output = CanonicalOutput::default();

        for path in raw_files {
            debug!(path = %path.display(), target = %self.target, "Reducing raw hits");
            self.reduce(open_input(path)?, &mut best, &mut output.go_ids, &mut output.stats)?;
        }

        for source in self.target.sources() {
            if *source == AnnotationSource::Go {
                continue;
            }
            let hits: Vec<CanonicalHit> =
                best.hits(*source).map(|hit| self.normalizer.normalize(hit)).collect();
            output.tables.insert(*source, hits);
        }

        info!(
            target = %self.target,
            files = raw_files.len(),
            rows = output.stats.rows,
            malformed = output.stats.malformed,
            filtered = output.stats.filtered,
            queries = output.tables.values().map(Vec::len).sum::<usize>(),
            "Canonicalized raw hits"
        );

        Ok(output)
    }
}

/// Write every table `target` owns into `out_dir`
///
/// Tables are written even when empty so a rerun overwrites stale output.
/// GO needs an ontology; without one the GO table is header-only.
pub fn write_outputs(
    target: DatabaseTarget,
    output: &CanonicalOutput,
    out_dir: &Path,
    prefix: &str,
    ontology: Option<&GoOntology>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for source in target.sources() {
        let path = out_dir.join(source.table_name(prefix));
        if *source == AnnotationSource::Go {
            let annotations = match ontology {
                Some(ontology) => classify(&output.go_ids, ontology),
                None => {
                    if !output.go_ids.is_empty() {
                        warn!(
                            queries = output.go_ids.len(),
                            "No GO ontology configured; GO terms are not classified"
                        );
                    }
                    Vec::new()
                }
            };
            write_go_file(&path, &annotations)?;
        } else {
            write_canonical_file(&path, output.table(*source))?;
        }
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::canonical::normalize::{MotifNormalizer, RefseqNormalizer};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn blast_line(q: &str, s: &str, evalue: &str, bits: &str, qstart: u64, qend: u64, qlen: u64) -> String {
        format!(
            "{q}\t{s}\t90.0\t{len}\t0\t0\t{qstart}\t{qend}\t1\t{len}\t{evalue}\t{bits}\t{qlen}\t{len}\t{s} protein {s} [Org]",
            len = qend - qstart + 1
        )
    }

    fn refseq() -> Canonicalizer {
        Canonicalizer::new(
            DatabaseTarget::Refseq,
            Thresholds {
                min_qcov: 30.0,
                min_scov: 0.0,
                max_evalue: 1e-6,
            },
            TargetNormalizer::Refseq(RefseqNormalizer::new().unwrap()),
        )
    }

    #[test]
    fn test_thresholds() {
        let t = refseq();
        let parse = |l: &str| RawHitSchema::Blast15.parse_line(l, 1).unwrap().unwrap();
        assert!(t.thresholds().accepts(&parse(&blast_line("g1", "s", "1e-10", "50", 1, 30, 100))));
        assert!(!t.thresholds().accepts(&parse(&blast_line("g1", "s", "1e-10", "50", 1, 29, 100))));
        assert!(!t.thresholds().accepts(&parse(&blast_line("g1", "s", "1e-5", "50", 1, 100, 100))));
    }

    #[test]
    fn test_tie_break_bitscore_then_evalue_then_first() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.refseq.m6");
        let lines = [
            blast_line("g1", "WP_1.1", "1e-20", "100", 1, 100, 100),
            blast_line("g1", "WP_2.1", "1e-30", "120", 1, 100, 100),
            blast_line("g1", "WP_3.1", "1e-40", "120", 1, 100, 100),
            blast_line("g1", "WP_4.1", "1e-40", "120", 1, 100, 100),
            "g1\tbroken".to_string(),
            blast_line("g2", "WP_5.1", "1e-3", "900", 1, 100, 100),
        ];
        std::fs::write(&a, lines.join("\n")).unwrap();

        let out = refseq().canonicalize(&[a]).unwrap();
        let table = out.table(AnnotationSource::Refseq);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].subject_id, "WP_3.1");
        assert_eq!(out.stats.malformed, 1);
        assert_eq!(out.stats.filtered, 1);
    }

    #[test]
    fn test_missing_raw_file_is_an_error() {
        assert!(refseq().canonicalize(&[PathBuf::from("/nonexistent/x.m6")]).is_err());
    }

    #[test]
    fn test_motif_sources_and_go_collection() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("p.part_001.ipr.out");
        std::fs::write(
            &raw,
            "g1\tmd5\t300\tTIGRFAM\tTIGR00362\tDnaA\t1\t290\t1e-100\tT\t01-01-2026\tIPR1\tx\tGO:0006270(InterPro)|GO:0005524(InterPro)\n\
             g1\tmd5\t300\tPfam\tPF00308\tBacterial dnaA protein\t5\t200\t1e-50\tT\t01-01-2026\n\
             g1\tmd5\t300\tPfam\tPF11638\tDnaA N-terminal domain\t1\t60\t1e-20\tT\t01-01-2026\n\
             g2\tmd5\t120\tGene3D\tG3DSA:1\t-\t1\t100\t1e-10\tT\t01-01-2026\tIPR2\ty\tGO:0003677\n",
        )
        .unwrap();

        let canon = Canonicalizer::new(
            DatabaseTarget::FunctionalMotif,
            Thresholds {
                min_qcov: 0.0,
                min_scov: 0.0,
                max_evalue: 1.0,
            },
            TargetNormalizer::FunctionalMotif(MotifNormalizer::default()),
        );
        let out = canon.canonicalize(&[raw]).unwrap();

        assert_eq!(out.table(AnnotationSource::Tigrfams).len(), 1);
        let pfam = out.table(AnnotationSource::Pfam);
        assert_eq!(pfam.len(), 1);
        assert_eq!(pfam[0].subject_id, "PF00308");
        assert_eq!(out.stats.unsourced, 1);
        assert_eq!(out.go_ids["g1"].len(), 2);
        assert!(out.go_ids["g2"].contains("GO:0003677"));

        let written =
            write_outputs(DatabaseTarget::FunctionalMotif, &out, dir.path(), "out", None).unwrap();
        assert_eq!(written.len(), 3);
        let go = std::fs::read_to_string(dir.path().join("out.GO.tsv")).unwrap();
        assert_eq!(go.lines().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_at_most_one_hit_with_max_score(
            rows in proptest::collection::vec((0usize..5, 1u32..500, 1u32..100), 1..60)
        ) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("x.refseq.m6");
            let lines: Vec<String> = rows
                .iter()
                .enumerate()
                .map(|(i, (q, bits, exp))| {
                    blast_line(&format!("g{}", q), &format!("WP_{}.1", i), &format!("1e-{}", exp + 6), &bits.to_string(), 1, 100, 100)
                })
                .collect();
            std::fs::write(&path, lines.join("\n")).unwrap();

            let out = refseq().canonicalize(&[path]).unwrap();
            let table = out.table(AnnotationSource::Refseq);

            let queries: BTreeSet<&str> = table.iter().map(|h| h.query_id.as_str()).collect();
            prop_assert_eq!(queries.len(), table.len());

            for hit in table {
                let q: usize = hit.query_id[1..].parse().unwrap();
                let best_bits = rows.iter().filter(|r| r.0 == q).map(|r| r.1).max().unwrap();
                prop_assert_eq!(hit.score, Some(best_bits as f64));
                let best_exp = rows
                    .iter()
                    .filter(|r| r.0 == q && r.1 == best_bits)
                    .map(|r| r.2)
                    .max()
                    .unwrap();
                prop_assert_eq!(hit.evalue, Some(format!("1e-{}", best_exp + 6).parse::<f64>().unwrap()));
            }
        }
    }
}
